#![deny(warnings)]

//! Turn loop, sessions and scripted play for the Lab Tycoon simulation.
//!
//! A [`Session`] owns one game's mutable state and drives it through the
//! shared, immutable rule catalogs. [`run_batch`] plays many sessions in
//! parallel from a command script.

pub mod batch;
pub mod command;
pub mod session;
pub mod turn;

pub use batch::{run_batch, BatchConfig, BatchReport, Ending, SessionSummary};
pub use command::{
    resolve_popups, run_commands, Command, CommandMap, CommandParseError, PopupPolicy, RunSummary,
};
pub use session::{EventCheck, Session, SessionParts};
pub use turn::{end_turn, ResourceDelta, TurnReport};
