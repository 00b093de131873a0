use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Plugin discovery and enablement.
    pub plugins: PluginsSection,
    /// Logging settings for the CLI.
    pub logging: LoggingSection,
}

impl Config {
    /// Set `plugins.entries.<id>.enabled`.
    pub fn set_plugin_enabled(&mut self, id: &str, enabled: bool) {
        self.plugins.set_enabled(id, enabled);
    }

    /// Append to `plugins.load.paths` unless already present.
    ///
    /// Returns `true` if the path was added.
    pub fn add_load_path(&mut self, path: &str) -> bool {
        self.plugins.add_load_path(path)
    }
}

// ---------------------------------------------------------------------------
// PluginsSection
// ---------------------------------------------------------------------------

/// Plugin discovery and enablement settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginsSection {
    /// Master switch. When `false`, the host loads no plugins at all.
    pub enabled: bool,
    /// Override for the installed extensions directory. Empty means
    /// `<home>/extensions`.
    pub extensions_dir: String,
    /// Explicitly configured plugin locations.
    pub load: LoadSection,
    /// Per-plugin settings keyed by plugin id.
    pub entries: BTreeMap<String, PluginEntry>,
}

impl Default for PluginsSection {
    fn default() -> Self {
        Self {
            enabled: true,
            extensions_dir: String::new(),
            load: LoadSection::default(),
            entries: BTreeMap::new(),
        }
    }
}

/// Explicit plugin load paths (`[plugins.load]`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadSection {
    /// Paths to plugin directories or entry files. `~` is expanded by the
    /// consumer.
    pub paths: Vec<String>,
}

/// Settings for a single plugin (`[plugins.entries.<id>]`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginEntry {
    /// Explicit enable flag. Unset means "use the host default".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

impl PluginsSection {
    /// Explicit enable flag for a plugin, if one is configured.
    #[must_use]
    pub fn entry_enabled(&self, id: &str) -> Option<bool> {
        self.entries.get(id).and_then(|e| e.enabled)
    }

    /// All explicit enable flags as an `id -> enabled` map.
    #[must_use]
    pub fn enabled_flags(&self) -> HashMap<String, bool> {
        self.entries
            .iter()
            .filter_map(|(id, entry)| entry.enabled.map(|e| (id.clone(), e)))
            .collect()
    }

    /// Set the enable flag for a plugin, creating the entry if needed.
    pub fn set_enabled(&mut self, id: &str, enabled: bool) {
        self.entries.entry(id.to_owned()).or_default().enabled = Some(enabled);
    }

    /// Append a load path unless it is already configured.
    ///
    /// Returns `true` if the path was added.
    pub fn add_load_path(&mut self, path: &str) -> bool {
        if self.load.paths.iter().any(|p| p == path) {
            return false;
        }
        self.load.paths.push(path.to_owned());
        true
    }
}

// ---------------------------------------------------------------------------
// LoggingSection
// ---------------------------------------------------------------------------

/// Logging and tracing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Global log level filter (`"trace"`, `"debug"`, `"info"`, `"warn"`,
    /// `"error"`).
    pub level: String,
    /// Output format: `"pretty"`, `"compact"`, `"json"` or `"full"`.
    pub format: String,
    /// Where log lines go: `"stderr"`, `"stdout"` or `"file"`.
    pub target: String,
    /// Directory for `target = "file"`. Empty means `<home>/logs`.
    pub directory: String,
    /// Per-crate tracing directives (e.g. `["harbor_plugins=debug"]`).
    pub directives: Vec<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "warn".to_owned(),
            format: "compact".to_owned(),
            target: "stderr".to_owned(),
            directory: String::new(),
            directives: Vec::new(),
        }
    }
}
