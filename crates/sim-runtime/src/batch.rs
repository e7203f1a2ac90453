//! Many independent sessions in parallel, one per rayon task.

use crate::command::{
    resolve_popups, run_commands, CommandMap, CommandParseError, PopupPolicy, RunSummary,
};
use crate::session::Session;
use rayon::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sim_core::{NullSink, SimConfig};
use sim_rules::{ActionCatalog, EventCatalog};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

/// Parameters of one batch run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BatchConfig {
    pub sessions: usize,
    pub max_turns: u32,
    pub base_seed: String,
    /// Command string played at the start of every turn.
    pub script: String,
    pub policy: PopupPolicy,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            sessions: 8,
            max_turns: 200,
            base_seed: "batch".to_string(),
            script: "c".to_string(),
            policy: PopupPolicy::FirstAffordable,
        }
    }
}

/// How a session ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Ending {
    Victory,
    Defeat,
    /// Reached the turn cap or stopped on a popup.
    Unfinished,
    Cancelled,
}

/// Final state of one session.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SessionSummary {
    pub seed: String,
    pub ending: Ending,
    pub reason: Option<String>,
    pub final_turn: u32,
    pub money: Decimal,
    pub safety: Decimal,
    pub reputation: Decimal,
    pub actions_succeeded: u32,
    pub actions_failed: u32,
    pub events_fired: u32,
}

/// Aggregate over all sessions, in seed order.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct BatchReport {
    pub sessions: Vec<SessionSummary>,
    pub victories: usize,
    pub defeats: usize,
    pub unfinished: usize,
    pub cancelled: usize,
    pub mean_final_turn: f64,
}

impl BatchReport {
    fn from_sessions(sessions: Vec<SessionSummary>) -> Self {
        let count = |e: Ending| sessions.iter().filter(|s| s.ending == e).count();
        let mean_final_turn = if sessions.is_empty() {
            0.0
        } else {
            sessions.iter().map(|s| f64::from(s.final_turn)).sum::<f64>() / sessions.len() as f64
        };
        Self {
            victories: count(Ending::Victory),
            defeats: count(Ending::Defeat),
            unfinished: count(Ending::Unfinished),
            cancelled: count(Ending::Cancelled),
            mean_final_turn,
            sessions,
        }
    }
}

/// Run `config.sessions` games with seeds `"<base_seed>-<i>"`. The script is
/// parsed once up front; `cancel` is checked between turns.
pub fn run_batch(
    actions: Arc<ActionCatalog>,
    events: Arc<EventCatalog>,
    sim: Arc<SimConfig>,
    config: &BatchConfig,
    commands: &CommandMap,
    cancel: &AtomicBool,
) -> Result<BatchReport, CommandParseError> {
    let script = commands.parse(&config.script)?;
    let sessions: Vec<SessionSummary> = (0..config.sessions)
        .into_par_iter()
        .map(|i| {
            let seed = format!("{}-{}", config.base_seed, i);
            let mut session = Session::new(
                Arc::clone(&actions),
                Arc::clone(&events),
                Arc::clone(&sim),
                Some(&seed),
            );
            let mut sink = NullSink;
            let mut tally = RunSummary::default();
            let mut cancelled = false;
            while !session.is_over() && session.state().turn < config.max_turns {
                if cancel.load(Ordering::Relaxed) {
                    cancelled = true;
                    break;
                }
                let run = run_commands(&mut session, &script, config.policy, &mut sink);
                tally.actions_succeeded += run.actions_succeeded;
                tally.actions_failed += run.actions_failed;
                tally.events_fired += run.events_fired;
                if run.blocked_on.is_some() || session.is_over() {
                    break;
                }
                tally.events_fired += session.check_events(&mut sink).fired.len() as u32;
                if resolve_popups(&mut session, config.policy, &mut sink, &mut tally).is_some() {
                    break;
                }
                if !session.end_turn(&mut sink).success {
                    break;
                }
            }
            summarize(seed, &session, &tally, cancelled)
        })
        .collect();
    let report = BatchReport::from_sessions(sessions);
    info!(
        sessions = report.sessions.len(),
        victories = report.victories,
        defeats = report.defeats,
        mean_final_turn = report.mean_final_turn,
        "batch finished"
    );
    Ok(report)
}

fn summarize(
    seed: String,
    session: &Session,
    tally: &RunSummary,
    cancelled: bool,
) -> SessionSummary {
    let state = session.state();
    let ending = if state.game_over && state.victory {
        Ending::Victory
    } else if state.game_over {
        Ending::Defeat
    } else if cancelled {
        Ending::Cancelled
    } else {
        Ending::Unfinished
    };
    SessionSummary {
        seed,
        ending,
        reason: state.game_over_reason.clone(),
        final_turn: state.turn,
        money: state.money,
        safety: state.safety,
        reputation: state.reputation,
        actions_succeeded: tally.actions_succeeded,
        actions_failed: tally.actions_failed,
        events_fired: tally.events_fired,
    }
}
