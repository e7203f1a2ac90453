//! Compact command strings for scripted play, e.g. `"h*2 c x n"`.
//!
//! Each letter maps to an action or a turn operation. `X*N` repeats a
//! letter N times (1 to 99). Whitespace and commas separate tokens and are
//! otherwise ignored. A string is parsed completely before anything runs.

use crate::session::Session;
use serde::{Deserialize, Serialize};
use sim_core::NotificationSink;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

/// Upper bound for a repeat count.
pub const MAX_REPEAT: u32 = 99;

/// One step of a script.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Action(String),
    CheckEvents,
    EndTurn,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandParseError {
    #[error("unknown command '{letter}' at position {position}")]
    UnknownCommand { letter: char, position: usize },
    #[error("repeat count at position {position} must be between 1 and 99, got '{text}'")]
    BadRepeat { position: usize, text: String },
    #[error("unexpected '{found}' at position {position}")]
    Unexpected { found: char, position: usize },
}

/// Letter-to-command bindings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandMap {
    bindings: BTreeMap<char, Command>,
}

impl Default for CommandMap {
    fn default() -> Self {
        Self::default_bindings()
    }
}

impl CommandMap {
    /// Empty map; bind letters with [`CommandMap::bind`].
    pub fn empty() -> Self {
        Self {
            bindings: BTreeMap::new(),
        }
    }

    /// Bindings for the shipped action catalog.
    pub fn default_bindings() -> Self {
        let mut map = Self::empty();
        for (letter, id) in [
            ('h', "hire_safety_researcher"),
            ('e', "hire_engineer"),
            ('c', "buy_compute"),
            ('r', "safety_research"),
            ('p', "publish_paper"),
            ('u', "upgrade_cluster"),
            ('s', "apply_seed_grant"),
            ('v', "raise_venture_round"),
            ('g', "government_contract"),
            ('k', "corporate_partnership"),
            ('a', "sell_api_access"),
            ('o', "outreach_campaign"),
        ] {
            map.bind(letter, Command::Action(id.to_string()));
        }
        map.bind('x', Command::CheckEvents);
        map.bind('n', Command::EndTurn);
        map
    }

    /// Bind `letter` (case-insensitive), replacing any earlier binding.
    pub fn bind(&mut self, letter: char, command: Command) -> &mut Self {
        self.bindings.insert(letter.to_ascii_lowercase(), command);
        self
    }

    pub fn get(&self, letter: char) -> Option<&Command> {
        self.bindings.get(&letter.to_ascii_lowercase())
    }

    pub fn iter(&self) -> impl Iterator<Item = (char, &Command)> {
        self.bindings.iter().map(|(c, cmd)| (*c, cmd))
    }

    /// Expand a command string into steps. Nothing is returned unless the
    /// whole string is valid.
    pub fn parse(&self, text: &str) -> Result<Vec<Command>, CommandParseError> {
        let chars: Vec<char> = text.chars().collect();
        let mut out = Vec::new();
        let mut i = 0;
        while i < chars.len() {
            let ch = chars[i];
            if ch.is_whitespace() || ch == ',' {
                i += 1;
                continue;
            }
            let command = self
                .get(ch)
                .ok_or(if ch.is_alphabetic() {
                    CommandParseError::UnknownCommand {
                        letter: ch,
                        position: i,
                    }
                } else {
                    CommandParseError::Unexpected {
                        found: ch,
                        position: i,
                    }
                })?;
            i += 1;
            let mut count = 1;
            if chars.get(i) == Some(&'*') {
                let start = i + 1;
                let mut end = start;
                while end < chars.len() && chars[end].is_ascii_digit() {
                    end += 1;
                }
                let digits: String = chars[start..end].iter().collect();
                count = digits
                    .parse::<u32>()
                    .ok()
                    .filter(|n| (1..=MAX_REPEAT).contains(n))
                    .ok_or(CommandParseError::BadRepeat {
                        position: i,
                        text: digits,
                    })?;
                i = end;
            }
            out.extend(std::iter::repeat(command.clone()).take(count as usize));
        }
        Ok(out)
    }
}

/// How scripted play resolves popup events before ending a turn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PopupPolicy {
    /// Take the first option that succeeds; dismiss if none does.
    #[default]
    FirstAffordable,
    /// Dismiss every popup unanswered.
    Dismiss,
    /// Stop the script and leave the popup pending.
    Stop,
}

/// Tally of one scripted run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub actions_succeeded: u32,
    pub actions_failed: u32,
    pub events_fired: u32,
    pub popups_resolved: u32,
    pub turns_ended: u32,
    /// Popup that halted the run under [`PopupPolicy::Stop`].
    pub blocked_on: Option<String>,
}

/// Clear pending popups according to `policy`. Returns the popup left
/// pending under [`PopupPolicy::Stop`].
pub fn resolve_popups(
    session: &mut Session,
    policy: PopupPolicy,
    sink: &mut dyn NotificationSink,
    summary: &mut RunSummary,
) -> Option<String> {
    loop {
        let event_id = session.pending_popups().next()?.to_string();
        match policy {
            PopupPolicy::Stop => return Some(event_id),
            PopupPolicy::Dismiss => {
                session.dismiss(&event_id);
            }
            PopupPolicy::FirstAffordable => {
                let options: Vec<String> = session
                    .events()
                    .get_options(&event_id)
                    .map(|opts| opts.iter().map(|o| o.id.clone()).collect())
                    .unwrap_or_default();
                let chosen = options
                    .iter()
                    .any(|opt| session.choose(&event_id, opt, sink).success);
                if !chosen {
                    session.dismiss(&event_id);
                }
            }
        }
        summary.popups_resolved += 1;
    }
}

/// Run parsed commands in order, stopping once the game is over.
pub fn run_commands(
    session: &mut Session,
    commands: &[Command],
    policy: PopupPolicy,
    sink: &mut dyn NotificationSink,
) -> RunSummary {
    let mut summary = RunSummary::default();
    for command in commands {
        if session.is_over() {
            break;
        }
        match command {
            Command::Action(id) => {
                if session.execute_action(id, sink).success {
                    summary.actions_succeeded += 1;
                } else {
                    summary.actions_failed += 1;
                }
            }
            Command::CheckEvents => {
                summary.events_fired += session.check_events(sink).fired.len() as u32;
            }
            Command::EndTurn => {
                if let Some(blocked) = resolve_popups(session, policy, sink, &mut summary) {
                    debug!(event = %blocked, "script halted on pending popup");
                    summary.blocked_on = Some(blocked);
                    break;
                }
                if session.end_turn(sink).success {
                    summary.turns_ended += 1;
                }
            }
        }
    }
    summary
}
