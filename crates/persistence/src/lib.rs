#![deny(warnings)]

//! Save games: a versioned JSON snapshot of one session.
//!
//! Catalogs and configuration are not saved; they are supplied again on
//! load. The economy is rebuilt from the seed and turn.

use serde::{Deserialize, Serialize};
use sim_core::{GameState, SimConfig};
use sim_rules::{ActionCatalog, EventCatalog};
use sim_runtime::{Session, SessionParts};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Format version written by this crate.
pub const SAVE_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("failed to access save file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed save: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported save version {0}")]
    Version(u32),
}

/// On-disk form of a session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SaveGame {
    pub version: u32,
    pub state: GameState,
    #[serde(default)]
    pub triggered_events: Vec<String>,
    #[serde(default)]
    pub pending_popups: Vec<String>,
    #[serde(default)]
    pub events_checked_turn: Option<u32>,
}

impl SaveGame {
    pub fn from_session(session: &Session) -> Self {
        let parts = session.parts();
        Self {
            version: SAVE_VERSION,
            state: parts.state,
            triggered_events: parts.triggered_events,
            pending_popups: parts.pending_popups,
            events_checked_turn: parts.events_checked_turn,
        }
    }

    /// Rebuild a live session against the given catalogs.
    pub fn into_session(
        self,
        actions: Arc<ActionCatalog>,
        events: Arc<EventCatalog>,
        config: Arc<SimConfig>,
    ) -> Session {
        Session::restore(
            actions,
            events,
            config,
            SessionParts {
                state: self.state,
                triggered_events: self.triggered_events,
                pending_popups: self.pending_popups,
                events_checked_turn: self.events_checked_turn,
            },
        )
    }

    pub fn to_json(&self) -> Result<String, PersistError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self, PersistError> {
        let save: SaveGame = serde_json::from_str(text)?;
        if save.version != SAVE_VERSION {
            return Err(PersistError::Version(save.version));
        }
        Ok(save)
    }

    pub fn write(&self, path: impl AsRef<Path>) -> Result<(), PersistError> {
        let path = path.as_ref();
        std::fs::write(path, self.to_json()?).map_err(|source| PersistError::Io {
            path: path.display().to_string(),
            source,
        })?;
        info!(path = %path.display(), turn = self.state.turn, "game saved");
        Ok(())
    }

    pub fn read(path: impl AsRef<Path>) -> Result<Self, PersistError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| PersistError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let save = Self::from_json(&text)?;
        info!(path = %path.display(), turn = save.state.turn, "game loaded");
        Ok(save)
    }
}
