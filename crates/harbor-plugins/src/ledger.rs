//! Install ledger: where each installed plugin came from.
//!
//! The ledger (`<extensions_dir>/.installs.toml`) lets the status registry tell
//! archive installs from registry installs long after the staging directory
//! is gone.
//!
//! # Format
//!
//! ```toml
//! schema_version = 1
//!
//! [[install]]
//! id = "voice-call"
//! version = "0.0.1"
//! source = "registry:@harbor/voice-call@0.0.1"
//! installed_at = "2026-01-01T00:00:00Z"
//! ```
//!
//! Writers hold an exclusive `fs2` lock on `.installs.lk` across the whole
//! read-modify-write cycle and replace the file atomically. Readers take a
//! shared lock when the lock file exists.
//!
//! Both files are dot-prefixed so they never occupy a plugin id.

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{PluginError, PluginResult};
use crate::plugin::PluginId;

/// Current ledger schema version.
const SCHEMA_VERSION: u32 = 1;

/// Ledger file name inside the extensions directory.
pub const LEDGER_FILE_NAME: &str = ".installs.toml";

/// The install ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallLedger {
    schema_version: u32,
    #[serde(default, rename = "install")]
    entries: Vec<InstallRecord>,
}

/// One installed plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallRecord {
    /// The installed id (directory name under the extensions directory).
    pub id: PluginId,
    /// Manifest version at install time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Where the package came from.
    pub source: InstallSource,
    /// When the install completed.
    pub installed_at: DateTime<Utc>,
}

/// Where an installed package came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum InstallSource {
    /// A local `.tgz` archive (absolute path at install time).
    Archive(String),
    /// An npm registry specifier.
    Registry(String),
}

impl InstallSource {
    /// Whether the package was fetched from a registry.
    #[must_use]
    pub fn is_registry(&self) -> bool {
        matches!(self, Self::Registry(_))
    }
}

impl fmt::Display for InstallSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Archive(path) => write!(f, "archive:{path}"),
            Self::Registry(spec) => write!(f, "registry:{spec}"),
        }
    }
}

impl From<InstallSource> for String {
    fn from(source: InstallSource) -> Self {
        source.to_string()
    }
}

/// Anything that is not `registry:` counts as an archive install.
impl From<String> for InstallSource {
    fn from(s: String) -> Self {
        if let Some(spec) = s.strip_prefix("registry:") {
            Self::Registry(spec.to_string())
        } else if let Some(path) = s.strip_prefix("archive:") {
            Self::Archive(path.to_string())
        } else {
            Self::Archive(s)
        }
    }
}

impl InstallRecord {
    /// Create a record stamped with the current time.
    #[must_use]
    pub fn new(id: PluginId, version: Option<String>, source: InstallSource) -> Self {
        Self {
            id,
            version,
            source,
            installed_at: Utc::now(),
        }
    }
}

impl InstallLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            entries: Vec::new(),
        }
    }

    /// Path of the ledger for an extensions directory.
    #[must_use]
    pub fn path_in(extensions_dir: &Path) -> PathBuf {
        extensions_dir.join(LEDGER_FILE_NAME)
    }

    /// Load the ledger, returning an empty one if the file doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::LedgerError`] if the file exists but cannot be
    /// read or parsed.
    pub fn load_or_default(path: &Path) -> PluginResult<Self> {
        let _lock = acquire_lock(path, LockMode::Shared)?;

        match std::fs::read_to_string(path) {
            Ok(content) => Self::parse(path, &content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::new()),
            Err(e) => Err(ledger_err(path, format!("failed to read ledger: {e}"))),
        }
    }

    fn parse(path: &Path, content: &str) -> PluginResult<Self> {
        let ledger: Self = toml::from_str(content)
            .map_err(|e| ledger_err(path, format!("failed to parse ledger: {e}")))?;

        if ledger.schema_version != SCHEMA_VERSION {
            warn!(
                path = %path.display(),
                found = ledger.schema_version,
                expected = SCHEMA_VERSION,
                "install ledger schema version mismatch, loading best-effort"
            );
        }
        Ok(ledger)
    }

    /// Load, mutate and save the ledger under one exclusive lock.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::LedgerError`] if the ledger cannot be read,
    /// parsed or written, or whatever `f` returns.
    pub fn update<F>(path: &Path, f: F) -> PluginResult<()>
    where
        F: FnOnce(&mut Self) -> PluginResult<()>,
    {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ledger_err(path, format!("failed to create parent directory: {e}")))?;
        }

        let _lock = acquire_lock(path, LockMode::Exclusive)?;

        let mut ledger = match std::fs::read_to_string(path) {
            Ok(content) => Self::parse(path, &content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::new(),
            Err(e) => return Err(ledger_err(path, format!("failed to read ledger: {e}"))),
        };

        f(&mut ledger)?;
        ledger.write_atomically(path)
    }

    /// Caller must hold the exclusive lock.
    fn write_atomically(&self, path: &Path) -> PluginResult<()> {
        let body = toml::to_string_pretty(self)
            .map_err(|e| ledger_err(path, format!("failed to serialize ledger: {e}")))?;
        let content = format!("# Written by harbor. Do not edit manually.\n\n{body}");

        let parent = path.parent().unwrap_or(Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(parent)
            .map_err(|e| ledger_err(path, format!("failed to create temp file: {e}")))?;
        tmp.write_all(content.as_bytes())
            .map_err(|e| ledger_err(path, format!("failed to write temp ledger: {e}")))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| ledger_err(path, format!("failed to sync temp ledger: {e}")))?;
        tmp.persist(path)
            .map_err(|e| ledger_err(path, format!("failed to replace ledger: {e}")))?;

        debug!(path = %path.display(), entries = self.entries.len(), "saved install ledger");
        Ok(())
    }

    /// Add a record, replacing any earlier record for the same id.
    pub fn record(&mut self, entry: InstallRecord) {
        self.remove(&entry.id);
        self.entries.push(entry);
    }

    /// Remove the record for `id`. Returns `true` if one was removed.
    pub fn remove(&mut self, id: &PluginId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != *id);
        self.entries.len() < before
    }

    /// Look up the record for an id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&InstallRecord> {
        self.entries.iter().find(|e| e.id.as_str() == id)
    }

    /// All records, in insertion order.
    #[must_use]
    pub fn entries(&self) -> &[InstallRecord] {
        &self.entries
    }
}

impl Default for InstallLedger {
    fn default() -> Self {
        Self::new()
    }
}

fn ledger_err(path: &Path, message: String) -> PluginError {
    PluginError::LedgerError {
        path: path.to_path_buf(),
        message,
    }
}

#[derive(Clone, Copy)]
enum LockMode {
    Shared,
    Exclusive,
}

/// Lock the `.lk` sibling of `ledger_path`; the lock is released on drop.
///
/// Shared mode never creates files: without a lock file there is no writer
/// to coordinate with.
fn acquire_lock(ledger_path: &Path, mode: LockMode) -> PluginResult<Option<std::fs::File>> {
    let lock_path = ledger_path.with_extension("lk");

    match mode {
        LockMode::Shared => match std::fs::File::open(&lock_path) {
            Ok(file) => {
                FileExt::lock_shared(&file).map_err(|e| {
                    ledger_err(ledger_path, format!("failed to acquire shared lock: {e}"))
                })?;
                Ok(Some(file))
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ledger_err(ledger_path, format!("failed to open lock file: {e}"))),
        },
        LockMode::Exclusive => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .truncate(false)
                .write(true)
                .read(true)
                .open(&lock_path)
                .map_err(|e| ledger_err(ledger_path, format!("failed to open lock file: {e}")))?;
            file.lock_exclusive().map_err(|e| {
                ledger_err(ledger_path, format!("failed to acquire exclusive lock: {e}"))
            })?;
            Ok(Some(file))
        },
    }
}
