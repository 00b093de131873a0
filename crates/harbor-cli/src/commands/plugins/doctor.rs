use colored::Colorize;
use harbor_plugins::{DoctorSummary, StatusReport};

use super::helpers::PluginEnv;

/// Report plugin load issues.
pub(crate) fn plugins_doctor() -> anyhow::Result<()> {
    let env = PluginEnv::load()?;
    println!("{}", render(&env.report()));
    Ok(())
}

fn render(report: &StatusReport) -> String {
    let summary = DoctorSummary::from_report(report);
    if summary.is_clean() {
        return "No plugin issues detected.".to_string();
    }

    let mut lines = Vec::new();
    if !summary.errored.is_empty() {
        lines.push("Plugin errors:".bold().red().to_string());
        for record in &summary.errored {
            lines.push(format!(
                "- {}: {} ({})",
                record.id,
                record.error.as_deref().unwrap_or("failed to load"),
                record.source
            ));
        }
    }
    if !summary.diagnostics.is_empty() {
        if !lines.is_empty() {
            lines.push(String::new());
        }
        lines.push("Diagnostics:".bold().yellow().to_string());
        for diag in &summary.diagnostics {
            let target = diag
                .plugin_id
                .as_deref()
                .map(|id| format!("{id}: "))
                .unwrap_or_default();
            lines.push(format!("- {target}{}", diag.message));
        }
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use harbor_plugins::{
        Diagnostic, DiagnosticLevel, PluginCapabilities, PluginRecord, PluginSource, PluginStatus,
    };

    use super::*;

    fn report(plugins: Vec<PluginRecord>, diagnostics: Vec<Diagnostic>) -> StatusReport {
        StatusReport {
            extensions_dir: PathBuf::from("/ext"),
            plugins,
            diagnostics,
        }
    }

    #[test]
    fn clean_report_message() {
        assert_eq!(render(&report(Vec::new(), Vec::new())), "No plugin issues detected.");
    }

    #[test]
    fn lists_errors_and_diagnostics() {
        let broken = PluginRecord {
            id: "broken".into(),
            display_name: "broken".into(),
            status: PluginStatus::Error,
            source: PluginSource::ArchiveInstall,
            origin: "/ext/broken".into(),
            version: None,
            error: Some("bad manifest".into()),
            description: None,
            capabilities: PluginCapabilities::default(),
        };
        let orphan = Diagnostic {
            level: DiagnosticLevel::Error,
            plugin_id: None,
            message: "plugin 'gone' failed to load".into(),
        };

        let out = render(&report(vec![broken], vec![orphan]));
        assert!(out.contains("- broken: bad manifest (archive-install)"));
        assert!(out.contains("- plugin 'gone' failed to load"));
    }
}
