//! Origin scanning and outcome reconciliation.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::{
    Diagnostic, DiagnosticLevel, LoadOutcome, LoadOutcomes, PluginCapabilities, PluginRecord,
    PluginSource, PluginStatus, StatusReport,
};
use crate::ledger::InstallLedger;
use crate::manifest::{PluginManifest, read_manifest};
use crate::plugin::PluginId;

/// Origin label for built-in plugins.
const BUILTIN_ORIGIN: &str = "builtin";

/// A plugin compiled into the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltinPlugin {
    /// Plugin id.
    pub id: String,
    /// Shown instead of the id when set.
    pub display_name: Option<String>,
    /// Host-reported version.
    pub version: Option<String>,
    /// Short description.
    pub description: Option<String>,
}

impl BuiltinPlugin {
    /// A built-in plugin with only an id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: None,
            version: None,
            description: None,
        }
    }
}

/// The configuration a status query needs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginSettings {
    /// Explicitly configured plugin paths, already `~`-expanded.
    pub load_paths: Vec<PathBuf>,
    /// Per-id enabled flags.
    pub enabled: HashMap<String, bool>,
}

impl PluginSettings {
    fn disabled(&self, id: &str) -> bool {
        self.enabled.get(id) == Some(&false)
    }
}

/// Builds [`StatusReport`]s.
#[derive(Debug, Clone)]
pub struct StatusRegistry {
    extensions_dir: PathBuf,
    settings: PluginSettings,
    builtins: Vec<BuiltinPlugin>,
    outcomes: HashMap<String, LoadOutcome>,
}

/// A plugin found on disk before it is joined with loader state.
struct Discovered {
    id: String,
    source: PluginSource,
    origin: String,
    manifest: Result<PluginManifest, String>,
}

impl StatusRegistry {
    /// A registry with no built-ins and no loader outcomes.
    #[must_use]
    pub fn new(extensions_dir: impl Into<PathBuf>, settings: PluginSettings) -> Self {
        Self {
            extensions_dir: extensions_dir.into(),
            settings,
            builtins: Vec::new(),
            outcomes: HashMap::new(),
        }
    }

    /// Report these built-in plugins after all filesystem origins.
    #[must_use]
    pub fn with_builtins(mut self, builtins: Vec<BuiltinPlugin>) -> Self {
        self.builtins = builtins;
        self
    }

    /// Join records against `source`'s current outcomes.
    #[must_use]
    pub fn with_outcomes(mut self, source: &dyn LoadOutcomes) -> Self {
        self.outcomes = source.outcomes();
        self
    }

    /// Scan every origin and reconcile with loader outcomes.
    ///
    /// Never fails: unreadable plugins become [`PluginStatus::Error`] records
    /// and unreadable directories become diagnostics.
    #[must_use]
    pub fn report(&self) -> StatusReport {
        let mut report = StatusReport {
            extensions_dir: self.extensions_dir.clone(),
            plugins: Vec::new(),
            diagnostics: Vec::new(),
        };
        let mut seen: HashMap<String, String> = HashMap::new();

        let mut discovered = self.scan_load_paths();
        discovered.extend(self.scan_extensions_dir(&mut report.diagnostics));

        for found in discovered {
            if shadowed(&mut seen, &found.id, &found.origin, &mut report.diagnostics) {
                continue;
            }
            let record = self.resolve(found, &mut report.diagnostics);
            report.plugins.push(record);
        }

        for builtin in &self.builtins {
            if shadowed(&mut seen, &builtin.id, BUILTIN_ORIGIN, &mut report.diagnostics) {
                continue;
            }
            report.plugins.push(self.resolve_builtin(builtin));
        }

        let mut orphaned: Vec<(&String, &String)> = self
            .outcomes
            .iter()
            .filter(|(id, _)| !seen.contains_key(*id))
            .filter_map(|(id, o)| o.error.as_ref().map(|e| (id, e)))
            .collect();
        orphaned.sort();
        for (id, error) in orphaned {
            report.diagnostics.push(Diagnostic::new(
                DiagnosticLevel::Error,
                None,
                format!("plugin '{id}' failed to load but was not found in any origin: {error}"),
            ));
        }

        debug!(
            plugins = report.plugins.len(),
            diagnostics = report.diagnostics.len(),
            "built plugin status report"
        );
        report
    }

    fn scan_load_paths(&self) -> Vec<Discovered> {
        self.settings
            .load_paths
            .iter()
            .map(|path| {
                let origin = path.display().to_string();
                if !path.exists() {
                    return Discovered {
                        id: last_component(path),
                        source: PluginSource::Path,
                        origin,
                        manifest: Err(format!("configured path not found: {}", path.display())),
                    };
                }
                let is_file = path.is_file();
                let dir = if is_file {
                    path.parent().map_or_else(|| path.clone(), Path::to_path_buf)
                } else {
                    path.clone()
                };
                let manifest = read_manifest(&dir).map_err(|e| e.to_string());
                // Loose entry files share a directory, so they fall back to their own stem.
                let fallback = || if is_file { file_stem(path) } else { last_component(&dir) };
                let id = manifest
                    .as_ref()
                    .ok()
                    .and_then(|m| PluginId::from_package_name(&m.declared_name).ok())
                    .map_or_else(fallback, |id| id.to_string());
                Discovered {
                    id,
                    source: PluginSource::Path,
                    origin,
                    manifest,
                }
            })
            .collect()
    }

    fn scan_extensions_dir(&self, diagnostics: &mut Vec<Diagnostic>) -> Vec<Discovered> {
        let entries = match std::fs::read_dir(&self.extensions_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!(dir = %self.extensions_dir.display(), error = %e, "failed to read extensions directory");
                diagnostics.push(Diagnostic::new(
                    DiagnosticLevel::Warn,
                    None,
                    format!(
                        "failed to read extensions directory {}: {e}",
                        self.extensions_dir.display()
                    ),
                ));
                return Vec::new();
            },
        };

        let ledger_path = InstallLedger::path_in(&self.extensions_dir);
        let ledger = match InstallLedger::load_or_default(&ledger_path) {
            Ok(ledger) => Some(ledger),
            Err(e) => {
                warn!(error = %e, "install ledger unreadable; sources unknown");
                diagnostics.push(Diagnostic::new(DiagnosticLevel::Warn, None, e.to_string()));
                None
            },
        };

        let mut dirs: Vec<(String, PathBuf)> = entries
            .filter_map(Result::ok)
            .filter_map(|entry| {
                let name = entry.file_name().to_str()?.to_string();
                let path = entry.path();
                (!name.starts_with('.') && path.is_dir()).then_some((name, path))
            })
            .collect();
        dirs.sort();

        dirs.into_iter()
            .map(|(name, path)| {
                let source = match ledger.as_ref().and_then(|l| l.get(&name)) {
                    Some(record) if record.source.is_registry() => PluginSource::RegistryInstall,
                    _ => PluginSource::ArchiveInstall,
                };
                Discovered {
                    manifest: read_manifest(&path).map_err(|e| e.to_string()),
                    id: name,
                    source,
                    origin: path.display().to_string(),
                }
            })
            .collect()
    }

    fn resolve(&self, found: Discovered, diagnostics: &mut Vec<Diagnostic>) -> PluginRecord {
        let manifest = match found.manifest {
            Ok(manifest) => manifest,
            Err(message) => {
                diagnostics.push(Diagnostic::new(
                    DiagnosticLevel::Error,
                    Some(&found.id),
                    message.clone(),
                ));
                return PluginRecord {
                    display_name: found.id.clone(),
                    id: found.id,
                    status: PluginStatus::Error,
                    source: found.source,
                    origin: found.origin,
                    version: None,
                    error: Some(message),
                    description: None,
                    capabilities: PluginCapabilities::default(),
                };
            },
        };

        if self.settings.disabled(&found.id) {
            diagnostics.push(Diagnostic::new(
                DiagnosticLevel::Info,
                Some(&found.id),
                "disabled in config",
            ));
        }

        let (status, error, capabilities) = self.join(&found.id);
        PluginRecord {
            id: found.id,
            display_name: manifest.declared_name,
            status,
            source: found.source,
            origin: found.origin,
            version: manifest.version,
            error,
            description: manifest.description,
            capabilities,
        }
    }

    fn resolve_builtin(&self, builtin: &BuiltinPlugin) -> PluginRecord {
        let (status, error, capabilities) = self.join(&builtin.id);
        PluginRecord {
            id: builtin.id.clone(),
            display_name: builtin.display_name.clone().unwrap_or_else(|| builtin.id.clone()),
            status,
            source: PluginSource::Builtin,
            origin: BUILTIN_ORIGIN.to_string(),
            version: builtin.version.clone(),
            error,
            description: builtin.description.clone(),
            capabilities,
        }
    }

    /// Status, error and capabilities for a readable plugin.
    fn join(&self, id: &str) -> (PluginStatus, Option<String>, PluginCapabilities) {
        match self.outcomes.get(id) {
            Some(outcome) if outcome.loaded => {
                (PluginStatus::Loaded, None, outcome.capabilities.clone())
            },
            Some(LoadOutcome {
                error: Some(error),
                capabilities,
                ..
            }) => (PluginStatus::Error, Some(error.clone()), capabilities.clone()),
            Some(outcome) => (PluginStatus::Disabled, None, outcome.capabilities.clone()),
            None => (PluginStatus::Disabled, None, PluginCapabilities::default()),
        }
    }
}

/// Record `id` as seen, or emit a shadowing warning if it already was.
fn shadowed(
    seen: &mut HashMap<String, String>,
    id: &str,
    origin: &str,
    diagnostics: &mut Vec<Diagnostic>,
) -> bool {
    if let Some(first) = seen.get(id) {
        diagnostics.push(Diagnostic::new(
            DiagnosticLevel::Warn,
            Some(id),
            format!("duplicate plugin id; {origin} is shadowed by {first}"),
        ));
        return true;
    }
    seen.insert(id.to_string(), origin.to_string());
    false
}

fn last_component(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.display().to_string(),
        |n| n.to_string_lossy().into_owned(),
    )
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map_or_else(|| last_component(path), |s| s.to_string_lossy().into_owned())
}
