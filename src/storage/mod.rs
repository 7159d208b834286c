//! Persistence layer.
//!
//! Saves and loads the session state to/from a single JSON file.
//! Writes go to a sibling temp file that is renamed into place, so a
//! failed write never leaves a half-written snapshot behind. Loading is
//! fail-safe: a missing or unreadable file yields a fresh session.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::types::SessionState;

/// Default state file path.
pub const DEFAULT_STATE_FILE: &str = "redblack_state.json";

/// Owner of the on-disk session snapshot.
pub struct SessionStore {
    path: PathBuf,
    starting_bankroll: Decimal,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>, starting_bankroll: Decimal) -> Self {
        Self {
            path: path.into(),
            starting_bankroll,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn starting_bankroll(&self) -> Decimal {
        self.starting_bankroll
    }

    /// Load the saved session, or a fresh one if the file is missing or
    /// cannot be parsed. Never fails.
    pub fn load(&self) -> SessionState {
        match self.try_load() {
            Ok(Some(state)) => {
                info!(
                    path = %self.path.display(),
                    bankroll = %state.bankroll,
                    cycles = state.cycle_count,
                    wagers = state.wagers.len(),
                    "Session loaded from disk"
                );
                state
            }
            Ok(None) => {
                info!(path = %self.path.display(), "No saved session found, starting fresh");
                self.reset()
            }
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Saved session unreadable, starting fresh"
                );
                self.reset()
            }
        }
    }

    /// Load the saved session, distinguishing "absent" from "corrupt".
    pub fn try_load(&self) -> Result<Option<SessionState>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let json = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read session from {}", self.path.display()))?;
        let state: SessionState = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse session from {}", self.path.display()))?;
        Ok(Some(state))
    }

    /// Write the session snapshot.
    pub fn save(&self, state: &SessionState) -> Result<()> {
        let json = serde_json::to_string_pretty(state).context("Failed to serialise session")?;

        let tmp = self.tmp_path();
        std::fs::write(&tmp, &json)
            .with_context(|| format!("Failed to write session to {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to move session into {}", self.path.display()))?;

        debug!(path = %self.path.display(), bankroll = %state.bankroll, "Session saved");
        Ok(())
    }

    /// A freshly initialised session at the configured starting bankroll.
    pub fn reset(&self) -> SessionState {
        SessionState::new(self.starting_bankroll)
    }

    /// Delete the state file (for testing or a hard reset).
    pub fn delete(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)
                .with_context(|| format!("Failed to delete session file {}", self.path.display()))?;
        }
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| DEFAULT_STATE_FILE.into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
