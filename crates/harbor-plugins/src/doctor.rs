//! Error-level view over a status report.

use crate::status::{Diagnostic, DiagnosticLevel, PluginRecord, PluginStatus, StatusReport};

/// The parts of a [`StatusReport`] that need attention.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DoctorSummary {
    /// Plugins in [`PluginStatus::Error`].
    pub errored: Vec<PluginRecord>,
    /// Error-level diagnostics.
    pub diagnostics: Vec<Diagnostic>,
}

impl DoctorSummary {
    /// Filter `report` down to its errors.
    #[must_use]
    pub fn from_report(report: &StatusReport) -> Self {
        Self {
            errored: report
                .plugins
                .iter()
                .filter(|p| p.status == PluginStatus::Error)
                .cloned()
                .collect(),
            diagnostics: report
                .diagnostics
                .iter()
                .filter(|d| d.level == DiagnosticLevel::Error)
                .cloned()
                .collect(),
        }
    }

    /// Nothing to report.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.errored.is_empty() && self.diagnostics.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::status::{PluginCapabilities, PluginSource};

    fn record(id: &str, status: PluginStatus) -> PluginRecord {
        PluginRecord {
            id: id.into(),
            display_name: id.into(),
            status,
            source: PluginSource::ArchiveInstall,
            origin: format!("/ext/{id}"),
            version: None,
            error: (status == PluginStatus::Error).then(|| "boom".to_string()),
            description: None,
            capabilities: PluginCapabilities::default(),
        }
    }

    fn diagnostic(level: DiagnosticLevel) -> Diagnostic {
        Diagnostic {
            level,
            plugin_id: None,
            message: level.to_string(),
        }
    }

    #[test]
    fn keeps_only_errors() {
        let report = StatusReport {
            extensions_dir: PathBuf::from("/ext"),
            plugins: vec![
                record("ok", PluginStatus::Loaded),
                record("off", PluginStatus::Disabled),
                record("bad", PluginStatus::Error),
            ],
            diagnostics: vec![
                diagnostic(DiagnosticLevel::Info),
                diagnostic(DiagnosticLevel::Warn),
                diagnostic(DiagnosticLevel::Error),
            ],
        };

        let summary = DoctorSummary::from_report(&report);
        assert!(!summary.is_clean());
        assert_eq!(summary.errored.len(), 1);
        assert_eq!(summary.errored[0].id, "bad");
        assert_eq!(summary.diagnostics, vec![diagnostic(DiagnosticLevel::Error)]);
    }

    #[test]
    fn healthy_report_is_clean() {
        let report = StatusReport {
            extensions_dir: PathBuf::from("/ext"),
            plugins: vec![record("ok", PluginStatus::Loaded)],
            diagnostics: vec![diagnostic(DiagnosticLevel::Warn)],
        };
        assert!(DoctorSummary::from_report(&report).is_clean());
    }
}
