//! On-disk persistence of ledger state.
//!
//! Snapshots are pretty-printed JSON. Writes go to a sibling temp file first
//! and are renamed into place, so a crash never leaves a torn snapshot.

use std::path::Path;

use chrono::{DateTime, Utc};
use realty_types::constants::SNAPSHOT_FORMAT_VERSION;
use realty_types::{EscrowError, EscrowRecord, LedgerConfig, LedgerEvent, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Everything the ledger owns. Collaborator state is persisted separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub format_version: u32,
    pub config: LedgerConfig,
    /// Records in asset id order.
    pub records: Vec<EscrowRecord>,
    pub journal: Vec<LedgerEvent>,
    pub taken_at: DateTime<Utc>,
}

impl LedgerSnapshot {
    /// # Errors
    /// `Serialization` if the snapshot was written by an incompatible version.
    pub fn check_version(&self) -> Result<()> {
        if self.format_version != SNAPSHOT_FORMAT_VERSION {
            return Err(EscrowError::Serialization(format!(
                "snapshot format v{} is not supported (expected v{SNAPSHOT_FORMAT_VERSION})",
                self.format_version
            )));
        }
        Ok(())
    }
}

/// Serialize `value` as JSON to `path`, replacing any existing file atomically.
pub fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(value)?;
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, json)?;
    std::fs::rename(&tmp, path)?;
    debug!(path = %path.display(), "snapshot written");
    Ok(())
}

/// Read and deserialize a JSON file written by [`save_json`].
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| EscrowError::Io(format!("reading {}: {e}", path.display())))?;
    serde_json::from_str(&raw)
        .map_err(|e| EscrowError::Serialization(format!("parsing {}: {e}", path.display())))
}
