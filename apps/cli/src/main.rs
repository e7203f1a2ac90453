#![deny(warnings)]

//! Headless CLI: scripted play, batch runs, economy inspection and catalog
//! validation.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use persistence::SaveGame;
use serde::Serialize;
use sim_core::{
    format_money, EmployeeSnapshot, MessageCategory, NotificationSink, ResourceSnapshot,
    SimConfig,
};
use sim_econ::EconomicCycle;
use sim_rules::{ActionCatalog, EventCatalog, Trigger};
use sim_runtime::{run_batch, run_commands, BatchConfig, CommandMap, PopupPolicy, Session};
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "lab-sim")]
#[command(author, version, about = "Lab Tycoon simulation", long_about = None)]
struct Cli {
    /// Simulation config (YAML). Defaults are used when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding actions.json and events.json
    #[arg(long, global = true, default_value = "assets/data")]
    data: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Play a command string, e.g. "h c x n*3"
    Play {
        #[arg(short, long, default_value = "")]
        commands: String,

        #[arg(short, long)]
        seed: Option<String>,

        /// Resume from a save file
        #[arg(long)]
        load: Option<PathBuf>,

        /// Write a save file when done
        #[arg(long)]
        save: Option<PathBuf>,

        #[arg(short, long, value_enum, default_value = "first-affordable")]
        policy: PolicyArg,
    },
    /// Run many scripted sessions in parallel
    Batch {
        #[arg(short = 'n', long, default_value = "8")]
        sessions: usize,

        #[arg(short, long, default_value = "200")]
        turns: u32,

        /// Command string played every turn
        #[arg(long, default_value = "c")]
        script: String,

        #[arg(short, long, default_value = "batch")]
        seed: String,

        #[arg(short, long, value_enum, default_value = "first-affordable")]
        policy: PolicyArg,
    },
    /// Show the economic phase at a turn
    Phase {
        #[arg(short, long)]
        turn: u32,

        #[arg(short, long, default_value = "lab-tycoon")]
        seed: String,
    },
    /// Load and check the catalogs and config
    Validate,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PolicyArg {
    FirstAffordable,
    Dismiss,
    Stop,
}

impl From<PolicyArg> for PopupPolicy {
    fn from(p: PolicyArg) -> Self {
        match p {
            PolicyArg::FirstAffordable => PopupPolicy::FirstAffordable,
            PolicyArg::Dismiss => PopupPolicy::Dismiss,
            PolicyArg::Stop => PopupPolicy::Stop,
        }
    }
}

/// Prints player-facing messages to stdout.
struct ConsoleSink;

impl NotificationSink for ConsoleSink {
    fn display_message(&mut self, text: &str, category: MessageCategory) {
        println!("[{category}] {text}");
    }

    fn play_sound(&mut self, _tag: &str) {}

    fn update_resource_display(&mut self, _snapshot: &ResourceSnapshot) {}

    fn update_employee_display(&mut self, _snapshot: &EmployeeSnapshot) {}
}

fn load_config(path: Option<&Path>) -> Result<SimConfig> {
    match path {
        Some(p) => SimConfig::from_path(p).with_context(|| format!("loading {}", p.display())),
        None => Ok(SimConfig::default()),
    }
}

fn load_catalogs(dir: &Path) -> Result<(Arc<ActionCatalog>, Arc<EventCatalog>)> {
    let actions = ActionCatalog::from_path(dir.join("actions.json"))?;
    let events = EventCatalog::from_path(dir.join("events.json"))?;
    Ok((Arc::new(actions), Arc::new(events)))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Arc::new(load_config(cli.config.as_deref())?);

    match cli.command {
        Commands::Play {
            commands,
            seed,
            load,
            save,
            policy,
        } => {
            let (actions, events) = load_catalogs(&cli.data)?;
            let script = CommandMap::default().parse(&commands)?;
            let mut session = match load {
                Some(path) => SaveGame::read(&path)?.into_session(actions, events, config),
                None => Session::new(actions, events, config, seed.as_deref()),
            };
            info!(seed = %session.state().seed, steps = script.len(), "playing");
            let mut sink = ConsoleSink;
            let summary = run_commands(&mut session, &script, policy.into(), &mut sink);
            let state = session.state();
            println!(
                "Turn {} | money {} | compute {:.0} | safety {:.0} | reputation {:.0} | staff {}",
                state.turn,
                format_money(state.money),
                state.compute,
                state.safety,
                state.reputation,
                state.total_employees()
            );
            if let Some(event) = &summary.blocked_on {
                println!("Waiting on a decision: {event}");
            }
            if state.game_over {
                let outcome = if state.victory { "won" } else { "lost" };
                println!(
                    "Game {outcome}: {}",
                    state.game_over_reason.as_deref().unwrap_or("unknown")
                );
            }
            if let Some(path) = save {
                SaveGame::from_session(&session).write(&path)?;
            }
        }
        Commands::Batch {
            sessions,
            turns,
            script,
            seed,
            policy,
        } => {
            let (actions, events) = load_catalogs(&cli.data)?;
            let batch = BatchConfig {
                sessions,
                max_turns: turns,
                base_seed: seed,
                script,
                policy: policy.into(),
            };
            let cancel = AtomicBool::new(false);
            let report = run_batch(
                actions,
                events,
                config,
                &batch,
                &CommandMap::default(),
                &cancel,
            )?;
            print_json(&report)?;
        }
        Commands::Phase { turn, seed } => {
            let economy = EconomicCycle::at_turn(&seed, turn);
            print_json(economy.current())?;
        }
        Commands::Validate => {
            config.validate()?;
            let (actions, events) = load_catalogs(&cli.data)?;
            let mut broken = 0;
            for ev in events.iter() {
                let condition = match &ev.trigger {
                    Trigger::Threshold { condition } => Some(condition),
                    Trigger::TurnAndResource { condition, .. }
                    | Trigger::TurnThreshold { condition, .. } => condition.as_ref(),
                    Trigger::Unknown(kind) => {
                        warn!(event = %ev.id, trigger = %kind, "unknown trigger type");
                        broken += 1;
                        None
                    }
                    Trigger::Random { .. } => None,
                };
                if let Some(err) = condition.and_then(|c| c.error()) {
                    warn!(event = %ev.id, error = %err, "condition does not compile");
                    broken += 1;
                }
            }
            let bindings = CommandMap::default();
            for (letter, command) in bindings.iter() {
                if let sim_runtime::Command::Action(id) = command {
                    if actions.get(id).is_none() {
                        warn!(%letter, action = %id, "command bound to a missing action");
                    }
                }
            }
            println!(
                "Catalogs OK | actions: {} | categories: {} | events: {}",
                actions.len(),
                actions.categories().len(),
                events.len()
            );
            if broken > 0 {
                bail!("{broken} event trigger(s) can never fire");
            }
        }
    }
    Ok(())
}
