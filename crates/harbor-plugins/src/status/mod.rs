//! Plugin status reporting.
//!
//! A [`StatusReport`] is rebuilt from scratch on every query: configured load
//! paths, the extensions directory and the built-in list are scanned, each
//! plugin's manifest is read, and the result is joined with the loader's
//! outcomes by id.

mod outcomes;
mod registry;

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub use outcomes::{LoadOutcome, LoadOutcomes, LoadSnapshot};
pub use registry::{BuiltinPlugin, PluginSettings, StatusRegistry};

/// Whether a plugin is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginStatus {
    /// The loader reports it as running.
    Loaded,
    /// Present but not running.
    Disabled,
    /// Present but broken.
    Error,
}

impl PluginStatus {
    /// Lowercase label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Loaded => "loaded",
            Self::Disabled => "disabled",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for PluginStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a plugin became known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PluginSource {
    /// An explicitly configured load path.
    Path,
    /// Installed from a local archive.
    ArchiveInstall,
    /// Installed from a registry specifier.
    RegistryInstall,
    /// Shipped with the host.
    Builtin,
}

impl PluginSource {
    /// Kebab-case label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Path => "path",
            Self::ArchiveInstall => "archive-install",
            Self::RegistryInstall => "registry-install",
            Self::Builtin => "builtin",
        }
    }
}

impl fmt::Display for PluginSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a loaded plugin registered with the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PluginCapabilities {
    /// Agent tools.
    pub tool_names: Vec<String>,
    /// Gateway RPC methods.
    pub gateway_methods: Vec<String>,
    /// CLI subcommands.
    pub cli_commands: Vec<String>,
    /// Background services.
    pub services: Vec<String>,
}

impl PluginCapabilities {
    /// Whether nothing was registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tool_names.is_empty()
            && self.gateway_methods.is_empty()
            && self.cli_commands.is_empty()
            && self.services.is_empty()
    }
}

/// One plugin as seen by a status query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginRecord {
    /// Plugin id.
    pub id: String,
    /// Declared package name, or the id when unknown.
    pub display_name: String,
    /// Current status.
    pub status: PluginStatus,
    /// Origin category.
    pub source: PluginSource,
    /// Where it was found (a path, or `builtin`).
    pub origin: String,
    /// Manifest version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Why the plugin is in [`PluginStatus::Error`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Manifest description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Loader-reported registrations.
    #[serde(flatten)]
    pub capabilities: PluginCapabilities,
}

/// Severity of a [`Diagnostic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticLevel {
    /// Informational.
    Info,
    /// Something is shadowed or degraded.
    Warn,
    /// Something is broken.
    Error,
}

impl fmt::Display for DiagnosticLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        })
    }
}

/// A finding produced while building a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    /// Severity.
    pub level: DiagnosticLevel,
    /// The plugin concerned, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin_id: Option<String>,
    /// Human-readable explanation.
    pub message: String,
}

impl Diagnostic {
    pub(crate) fn new(level: DiagnosticLevel, plugin_id: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            level,
            plugin_id: plugin_id.map(str::to_string),
            message: message.into(),
        }
    }
}

/// Result of one status query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    /// The scanned extensions directory.
    pub extensions_dir: PathBuf,
    /// Plugins in discovery order.
    pub plugins: Vec<PluginRecord>,
    /// Findings from the scan.
    pub diagnostics: Vec<Diagnostic>,
}

impl StatusReport {
    /// Look a plugin up by id, then by display name.
    #[must_use]
    pub fn find(&self, key: &str) -> Option<&PluginRecord> {
        self.plugins
            .iter()
            .find(|p| p.id == key)
            .or_else(|| self.plugins.iter().find(|p| p.display_name == key))
    }

    /// Number of plugins in [`PluginStatus::Loaded`].
    #[must_use]
    pub fn loaded_count(&self) -> usize {
        self.plugins
            .iter()
            .filter(|p| p.status == PluginStatus::Loaded)
            .count()
    }
}
