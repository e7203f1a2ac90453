//! Load-time and per-rule error types.

use rust_decimal::Decimal;
use sim_core::Resource;
use sim_econ::FundingSource;
use std::fmt;
use thiserror::Error;

/// Fatal error raised while loading a catalog. No partial catalog is ever
/// returned alongside it.
#[derive(Debug, Error)]
pub enum CatalogLoadError {
    /// Catalog file is missing or unreadable.
    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// Catalog is not valid JSON or does not match the expected shape.
    #[error("malformed catalog: {0}")]
    Json(#[from] serde_json::Error),
    /// An entry failed schema validation.
    #[error("invalid catalog entry {id}: {reason}")]
    Invalid { id: String, reason: String },
}

impl CatalogLoadError {
    pub(crate) fn invalid(id: &str, reason: impl Into<String>) -> Self {
        CatalogLoadError::Invalid {
            id: id.to_string(),
            reason: reason.into(),
        }
    }
}

/// The first requirement that blocks an action or event option.
///
/// `Display` yields the player-facing reason.
#[derive(Clone, Debug, PartialEq)]
pub enum RequirementFailure {
    /// Id is absent from the catalog.
    UnknownAction(String),
    /// The session has already ended.
    GameOver,
    /// `min_turn` not reached.
    TooEarly { required: u32, current: u32 },
    /// An employee minimum is not met.
    MissingEmployees {
        kind: String,
        required: i64,
        have: i64,
    },
    /// A cost exceeds the current balance.
    InsufficientResource {
        resource: Resource,
        need: Decimal,
        have: Decimal,
    },
    /// The funding source is closed at the lab's reputation this turn.
    FundingLocked {
        source: FundingSource,
        required: Decimal,
        have: Decimal,
    },
}

impl RequirementFailure {
    /// How much of the resource is missing, for `InsufficientResource`.
    pub fn shortfall(&self) -> Option<Decimal> {
        match self {
            RequirementFailure::InsufficientResource { need, have, .. } => Some(need - have),
            _ => None,
        }
    }
}

impl fmt::Display for RequirementFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequirementFailure::UnknownAction(id) => write!(f, "Unknown action: {id}"),
            RequirementFailure::GameOver => f.write_str("The game is over"),
            RequirementFailure::TooEarly { required, current } => {
                write!(f, "Available from turn {required} (now turn {current})")
            }
            RequirementFailure::MissingEmployees {
                kind,
                required,
                have,
            } => write!(f, "Need {required} {kind} (have {have})"),
            RequirementFailure::InsufficientResource {
                resource,
                need,
                have,
            } => write!(
                f,
                "Need {} (have {})",
                resource.format(*need),
                resource.format(*have)
            ),
            RequirementFailure::FundingLocked {
                source,
                required,
                have,
            } => write!(
                f,
                "{source} funding needs reputation {} (have {})",
                sim_core::format_amount(*required),
                sim_core::format_amount(*have)
            ),
        }
    }
}

impl std::error::Error for RequirementFailure {}

/// Why an event could not be executed.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum EventFailure {
    #[error("Unknown event: {0}")]
    UnknownEvent(String),
    #[error("Event {event} has no option {option}")]
    UnknownOption { event: String, option: String },
    #[error("Event {0} requires a choice")]
    RequiresChoice(String),
    #[error("Event {0} has no choices")]
    NotPopup(String),
    #[error("Event {0} is not awaiting a choice")]
    NotPending(String),
    #[error("The game is over")]
    GameOver,
    #[error("{0}")]
    Unaffordable(RequirementFailure),
}
