//! JSON state files that make the pipelines resumable.
//!
//! Each pipeline keeps one state document bound to the export file it was
//! started from. [`StateFile`] loads it (falling back to a fresh state when
//! the file is missing, corrupt, or belongs to another export) and rewrites
//! it wholesale on every checkpoint.
//!
//! **Write rules:**
//! - The document is serialized to a sibling temp file, then renamed over the
//!   target, so a crash mid-write never leaves a truncated state file.
//! - A single process owns a state file for the duration of a run.

mod state;

use std::path::{Path, PathBuf};

use cookido_shared::{CookidoError, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub use state::{ImportState, OrganizeState};

/// A state document tied to one export file.
pub trait PersistedState: Serialize + DeserializeOwned {
    /// Empty state for `export_file`.
    fn fresh(export_file: &str) -> Self;

    /// The export file this state was created from.
    fn export_file(&self) -> &str;
}

/// Handle to a state file on disk.
#[derive(Debug, Clone)]
pub struct StateFile {
    path: PathBuf,
}

impl StateFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the saved state for `export_file`, or start fresh.
    ///
    /// A missing file, an unreadable or corrupt file, and a file recorded
    /// for a different export all yield a fresh state.
    pub fn load_or_new<S: PersistedState>(&self, export_file: &str) -> S {
        match self.read::<S>() {
            Ok(Some(state)) if state.export_file() == export_file => {
                info!(path = %self.path.display(), "resuming from saved state");
                state
            }
            Ok(Some(state)) => {
                info!(
                    saved_for = state.export_file(),
                    export_file, "state file belongs to another export, starting fresh"
                );
                S::fresh(export_file)
            }
            Ok(None) => {
                debug!(path = %self.path.display(), "no state file, starting fresh");
                S::fresh(export_file)
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "could not load state file, starting fresh");
                S::fresh(export_file)
            }
        }
    }

    fn read<S: PersistedState>(&self) -> Result<Option<S>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content =
            std::fs::read_to_string(&self.path).map_err(|e| CookidoError::io(&self.path, e))?;
        let state = serde_json::from_str(&content).map_err(|e| {
            CookidoError::Storage(format!("invalid state file {}: {e}", self.path.display()))
        })?;
        Ok(Some(state))
    }

    /// Persist `state`, replacing the previous checkpoint atomically.
    pub fn save<S: PersistedState>(&self, state: &S) -> Result<()> {
        let json = serde_json::to_string_pretty(state)
            .map_err(|e| CookidoError::Storage(format!("failed to serialize state: {e}")))?;

        let tmp = self.temp_path();
        if let Some(parent) = tmp.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| CookidoError::io(parent, e))?;
        }
        std::fs::write(&tmp, json).map_err(|e| CookidoError::io(&tmp, e))?;

        if let Err(e) = std::fs::rename(&tmp, &self.path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(CookidoError::io(&self.path, e));
        }
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "state.json".into());
        self.path
            .with_file_name(format!(".{name}.{}.tmp", Uuid::now_v7()))
    }
}
