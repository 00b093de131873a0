//! Loader outcomes: the loader's last word on each plugin id.
//!
//! The host writes a [`LoadSnapshot`] to `<home>/state/plugin-load.json`
//! after every load pass; the CLI reads it back so `plugins list` can show
//! live state without talking to the host.

use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::PluginCapabilities;
use crate::error::{PluginError, PluginResult};

/// What the loader reported for one plugin id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadOutcome {
    /// Whether the plugin is running.
    pub loaded: bool,
    /// Why it is not, if it failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// What the plugin registered while loading.
    #[serde(default)]
    pub capabilities: PluginCapabilities,
}

impl LoadOutcome {
    /// A successful load.
    #[must_use]
    pub fn loaded(capabilities: PluginCapabilities) -> Self {
        Self {
            loaded: true,
            error: None,
            capabilities,
        }
    }

    /// A failed load.
    #[must_use]
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            loaded: false,
            error: Some(error.into()),
            capabilities: PluginCapabilities::default(),
        }
    }

    /// Skipped without error (for example, disabled).
    #[must_use]
    pub fn skipped() -> Self {
        Self::default()
    }
}

/// Source of loader outcomes, keyed by plugin id.
pub trait LoadOutcomes {
    /// Snapshot of the current outcomes.
    fn outcomes(&self) -> HashMap<String, LoadOutcome>;
}

impl LoadOutcomes for HashMap<String, LoadOutcome> {
    fn outcomes(&self) -> HashMap<String, LoadOutcome> {
        self.clone()
    }
}

/// Loader outcomes persisted as JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadSnapshot {
    /// When the load pass finished.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub written_at: Option<DateTime<Utc>>,
    /// Outcome per plugin id.
    #[serde(default)]
    pub plugins: BTreeMap<String, LoadOutcome>,
}

impl LoadSnapshot {
    /// Read a snapshot. A missing file is an empty snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::SnapshotError`] if the file exists but cannot be
    /// read or parsed.
    pub fn load(path: &Path) -> PluginResult<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(snapshot_err(path, format!("failed to read: {e}"))),
        };
        let snapshot: Self = serde_json::from_str(&content)
            .map_err(|e| snapshot_err(path, format!("failed to parse: {e}")))?;
        debug!(path = %path.display(), plugins = snapshot.plugins.len(), "read load snapshot");
        Ok(snapshot)
    }

    /// Write the snapshot atomically, stamping `written_at`.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::SnapshotError`] if the file cannot be written.
    pub fn save(&mut self, path: &Path) -> PluginResult<()> {
        self.written_at = Some(Utc::now());
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| snapshot_err(path, format!("failed to serialize: {e}")))?;

        let parent: PathBuf = path.parent().map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        std::fs::create_dir_all(&parent)
            .map_err(|e| snapshot_err(path, format!("failed to create parent directory: {e}")))?;
        let mut tmp = tempfile::NamedTempFile::new_in(&parent)
            .map_err(|e| snapshot_err(path, format!("failed to create temp file: {e}")))?;
        tmp.write_all(content.as_bytes())
            .map_err(|e| snapshot_err(path, format!("failed to write: {e}")))?;
        tmp.persist(path)
            .map_err(|e| snapshot_err(path, format!("failed to replace: {e}")))?;
        Ok(())
    }

    /// Record the outcome for `id`, replacing any earlier one.
    pub fn insert(&mut self, id: impl Into<String>, outcome: LoadOutcome) {
        self.plugins.insert(id.into(), outcome);
    }
}

impl LoadOutcomes for LoadSnapshot {
    fn outcomes(&self) -> HashMap<String, LoadOutcome> {
        self.plugins
            .iter()
            .map(|(id, outcome)| (id.clone(), outcome.clone()))
            .collect()
    }
}

fn snapshot_err(path: &Path, message: String) -> PluginError {
    PluginError::SnapshotError {
        path: path.to_path_buf(),
        message,
    }
}
