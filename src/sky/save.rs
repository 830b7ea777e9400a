//! Snapshot persistence
//!
//! The whole `SkyState` is written as pretty JSON. Loading is tolerant:
//! missing fields take their defaults and a missing file is a fresh state.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::sky::constants::save::MAX_FILE_SIZE;
use crate::sky::state::SkyState;

/// Errors that can occur while saving or loading a snapshot
#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Snapshot format error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Snapshot too large ({0} bytes > {1} limit)")]
    TooLarge(u64, u64),
}

impl SkyState {
    /// Load a snapshot, or a fresh state if the file does not exist
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SaveError> {
        let path = path.as_ref();

        if !path.exists() {
            debug!("No existing snapshot at {}", path.display());
            return Ok(Self::new());
        }

        let metadata = fs::metadata(path)?;
        if metadata.len() > MAX_FILE_SIZE {
            return Err(SaveError::TooLarge(metadata.len(), MAX_FILE_SIZE));
        }

        let contents = fs::read_to_string(path)?;
        let state: SkyState = serde_json::from_str(&contents)?;

        if let Err(violation) = state.constellations.verify() {
            tracing::warn!("Loaded snapshot has an inconsistent constellation set: {}", violation);
        }

        info!(
            "Loaded snapshot: {} bodies, {} constellations",
            state.bodies.len(),
            state.constellations.len()
        );
        Ok(state)
    }

    /// Write the snapshot, creating the parent directory if needed
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SaveError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        // Write beside the target and rename so a crash never truncates the last good save
        let contents = serde_json::to_string_pretty(self)?;
        let staging = staging_path(path);
        fs::write(&staging, contents)?;
        if let Err(e) = fs::rename(&staging, path) {
            let _ = fs::remove_file(&staging);
            return Err(e.into());
        }

        debug!("Saved {} bodies to {}", self.bodies.len(), path.display());
        Ok(())
    }
}

/// `sky.json` -> `sky.json.tmp` in the same directory
fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
