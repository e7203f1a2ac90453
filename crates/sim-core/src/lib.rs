#![deny(warnings)]

//! Core domain models and invariants for Lab Tycoon.
//!
//! This crate defines the serializable session state, the closed set of
//! addressable effect targets, the seeded RNG service, the restricted
//! condition language used by data-driven rules, and the notification sink
//! the simulation reports through.

pub mod condition;
pub mod config;
pub mod effect;
pub mod notify;
pub mod rng;
pub mod state;

pub use condition::{Condition, ConditionError};
pub use config::{ConfigError, SimConfig};
pub use effect::{EffectPathError, EffectTarget, Resource};
pub use notify::{
    EmployeeSnapshot, MessageCategory, NotificationSink, NullSink, RecordedMessage,
    RecordingSink, ResourceSnapshot, TracingSink,
};
pub use rng::RngService;
pub use state::{GameState, Project};

use rust_decimal::{Decimal, RoundingStrategy};

/// Format a monetary amount the way player-facing messages show it,
/// e.g. `50000` becomes `$50,000` and `-1250` becomes `-$1,250`.
/// Half dollars round away from zero.
pub fn format_money(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    let sign = if rounded < Decimal::ZERO { "-" } else { "" };
    let digits = rounded.abs().trunc().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{sign}${grouped}")
}

/// Format a non-monetary quantity: whole numbers without a fraction,
/// anything else to two places.
pub fn format_amount(amount: Decimal) -> String {
    if amount.fract().is_zero() {
        amount.trunc().normalize().to_string()
    } else {
        let mut shown = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        shown.rescale(2);
        shown.to_string()
    }
}
