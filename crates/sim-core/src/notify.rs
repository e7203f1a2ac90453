//! Notification sink the simulation reports through.
//!
//! The core never renders. It calls a [`NotificationSink`] with messages,
//! sound tags and refreshed snapshots; a frontend decides what to do with
//! them.

use crate::effect::Resource;
use crate::state::GameState;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{error, info, warn};

/// Severity/kind of a player-facing message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageCategory {
    Info,
    Success,
    Warning,
    Error,
    Event,
}

impl fmt::Display for MessageCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MessageCategory::Info => "INFO",
            MessageCategory::Success => "SUCCESS",
            MessageCategory::Warning => "WARNING",
            MessageCategory::Error => "ERROR",
            MessageCategory::Event => "EVENT",
        })
    }
}

/// Resource values at one point in time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    pub turn: u32,
    pub values: BTreeMap<Resource, Decimal>,
}

impl ResourceSnapshot {
    /// Capture the numeric resources of `state`.
    pub fn of(state: &GameState) -> Self {
        Self {
            turn: state.turn,
            values: Resource::ALL
                .iter()
                .map(|r| (*r, state.resource(*r)))
                .collect(),
        }
    }
}

/// Head counts at one point in time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeSnapshot {
    pub counts: BTreeMap<String, i64>,
    pub total: i64,
}

impl EmployeeSnapshot {
    /// Capture the employee map of `state`.
    pub fn of(state: &GameState) -> Self {
        Self {
            counts: state.employees.clone(),
            total: state.total_employees(),
        }
    }
}

/// Receiver for everything the simulation wants shown or played.
pub trait NotificationSink {
    fn display_message(&mut self, text: &str, category: MessageCategory);
    fn play_sound(&mut self, tag: &str);
    fn update_resource_display(&mut self, snapshot: &ResourceSnapshot);
    fn update_employee_display(&mut self, snapshot: &EmployeeSnapshot);

    /// Push both snapshots for `state`.
    fn refresh(&mut self, state: &GameState) {
        self.update_resource_display(&ResourceSnapshot::of(state));
        self.update_employee_display(&EmployeeSnapshot::of(state));
    }
}

/// Sink that drops everything. Useful for batch runs.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl NotificationSink for NullSink {
    fn display_message(&mut self, _text: &str, _category: MessageCategory) {}
    fn play_sound(&mut self, _tag: &str) {}
    fn update_resource_display(&mut self, _snapshot: &ResourceSnapshot) {}
    fn update_employee_display(&mut self, _snapshot: &EmployeeSnapshot) {}
}

/// One message captured by [`RecordingSink`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedMessage {
    pub text: String,
    pub category: MessageCategory,
}

/// Sink that records every call, in order. Used by tests and replays.
#[derive(Clone, Debug, Default)]
pub struct RecordingSink {
    pub messages: Vec<RecordedMessage>,
    pub sounds: Vec<String>,
    pub resource_updates: Vec<ResourceSnapshot>,
    pub employee_updates: Vec<EmployeeSnapshot>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Texts of all recorded messages.
    pub fn texts(&self) -> Vec<&str> {
        self.messages.iter().map(|m| m.text.as_str()).collect()
    }

    /// Most recent resource snapshot, if any.
    pub fn last_resources(&self) -> Option<&ResourceSnapshot> {
        self.resource_updates.last()
    }
}

impl NotificationSink for RecordingSink {
    fn display_message(&mut self, text: &str, category: MessageCategory) {
        self.messages.push(RecordedMessage {
            text: text.to_string(),
            category,
        });
    }

    fn play_sound(&mut self, tag: &str) {
        self.sounds.push(tag.to_string());
    }

    fn update_resource_display(&mut self, snapshot: &ResourceSnapshot) {
        self.resource_updates.push(snapshot.clone());
    }

    fn update_employee_display(&mut self, snapshot: &EmployeeSnapshot) {
        self.employee_updates.push(snapshot.clone());
    }
}

/// Sink that forwards messages to `tracing`. Used by the headless CLI.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn display_message(&mut self, text: &str, category: MessageCategory) {
        match category {
            MessageCategory::Error => error!(%category, "{text}"),
            MessageCategory::Warning => warn!(%category, "{text}"),
            _ => info!(%category, "{text}"),
        }
    }

    fn play_sound(&mut self, tag: &str) {
        tracing::debug!(tag, "sound");
    }

    fn update_resource_display(&mut self, snapshot: &ResourceSnapshot) {
        tracing::debug!(turn = snapshot.turn, values = ?snapshot.values, "resources");
    }

    fn update_employee_display(&mut self, snapshot: &EmployeeSnapshot) {
        tracing::debug!(total = snapshot.total, "employees");
    }
}
