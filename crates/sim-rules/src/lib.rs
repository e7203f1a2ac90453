#![deny(warnings)]

//! Rules catalogs for Lab Tycoon: player actions and game events.
//!
//! Catalogs are loaded from JSON once, validated up front, and are immutable
//! afterwards so any number of sessions can share them. Every per-action or
//! per-event problem is returned as a failed outcome instead of an error;
//! only loading can fail fatally.

pub mod actions;
pub mod error;
pub mod events;
pub mod ledger;

pub use actions::{ActionCatalog, ActionDefinition, ActionOutcome, CategoryInfo, Requirements};
pub use error::{CatalogLoadError, EventFailure, RequirementFailure};
pub use events::{
    EventCatalog, EventDefinition, EventKind, EventOption, EventOutcome, EventTracker, Trigger,
};
pub use ledger::{AppliedDelta, Costs, Effects};
