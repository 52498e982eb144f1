//! Record of the last update, kept between runs.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::engine::ReifyOutcome;

/// Persisted state.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct UpdateState {
    /// Most recent successful update.
    pub last_update: Option<UpdateRecord>,
    /// Number of successful updates recorded.
    #[serde(default)]
    pub updates: u64,
}

/// One successful update.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct UpdateRecord {
    /// When the update finished.
    pub finished_at: DateTime<Local>,
    /// Directory that was reified.
    pub path: PathBuf,
    /// Whether the global install was updated.
    pub global: bool,
    /// What the engine reported.
    pub outcome: ReifyOutcome,
}

/// Load state from disk.
///
/// A missing file is created empty, and a file that fails to parse is wiped.
///
/// # Errors
///
/// Returns an error if the state file cannot be read or written.
pub fn load(path: &Path) -> anyhow::Result<UpdateState> {
    log::debug!("Checking if state file exists at {}...", path.display());
    if !path.exists() {
        log::warn!(
            "Could not find state at {}, so creating and using an empty state...",
            path.display()
        );
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("could not create path to state file")?;
        }
        save(path, &UpdateState::default())?;
    }

    log::debug!("Loading state from {}...", path.display());
    let state =
        serde_json::from_str(&fs::read_to_string(path).context("could not read state file")?);
    match state {
        Ok(state) => {
            log::trace!("Loaded state: {state:#?}");
            Ok(state)
        }
        Err(err) => {
            log::warn!(
                "Could not deserialize state file at {}, wiping it and trying again...",
                path.display()
            );
            log::debug!("State deserialization error: {err}");
            save(path, &UpdateState::default())?;
            load(path)
        }
    }
}

/// Save state to disk.
///
/// # Errors
///
/// Returns an error if the state cannot be serialized or written.
pub fn save(path: &Path, state: &UpdateState) -> anyhow::Result<()> {
    log::debug!("Saving state to {}...", path.display());
    fs::write(
        path,
        serde_json::to_string_pretty(state).context("could not serialize state")?,
    )
    .context("could not write to state file")?;
    log::trace!("Saved state: {state:#?}");
    Ok(())
}
