use criterion::{black_box, criterion_group, criterion_main, Criterion};
use sim_core::{NullSink, SimConfig};
use sim_rules::{ActionCatalog, EventCatalog};
use sim_runtime::{run_commands, CommandMap, PopupPolicy, Session};
use std::path::PathBuf;
use std::sync::Arc;

fn catalogs() -> (Arc<ActionCatalog>, Arc<EventCatalog>) {
    let data = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../assets/data");
    let actions = ActionCatalog::from_path(data.join("actions.json")).expect("actions");
    let events = EventCatalog::from_path(data.join("events.json")).expect("events");
    (Arc::new(actions), Arc::new(events))
}

fn bench_turns(c: &mut Criterion) {
    let (actions, events) = catalogs();
    let config = Arc::new(SimConfig::default());
    let script = CommandMap::default().parse("c x n").expect("script");

    c.bench_function("session_52_turns", |b| {
        b.iter(|| {
            let mut session = Session::new(
                Arc::clone(&actions),
                Arc::clone(&events),
                Arc::clone(&config),
                Some("bench"),
            );
            for _ in 0..52 {
                run_commands(&mut session, &script, PopupPolicy::FirstAffordable, &mut NullSink);
                if session.is_over() {
                    break;
                }
            }
            black_box(session.state().turn)
        })
    });

    c.bench_function("check_events", |b| {
        let session = Session::new(
            Arc::clone(&actions),
            Arc::clone(&events),
            Arc::clone(&config),
            Some("bench"),
        );
        b.iter(|| {
            let mut s = session.clone();
            black_box(s.check_events(&mut NullSink))
        })
    });
}

criterion_group!(benches, bench_turns);
criterion_main!(benches);
