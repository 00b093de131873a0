use colored::Colorize;
use harbor_plugins::{PluginRecord, PluginStatus};

use super::helpers::PluginEnv;
use crate::theme::{Theme, truncate};

/// Flags for `harbor plugins list`.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ListOptions {
    pub(crate) json: bool,
    pub(crate) enabled_only: bool,
    pub(crate) verbose: bool,
}

/// List discovered plugins.
pub(crate) fn list_plugins(opts: ListOptions) -> anyhow::Result<()> {
    let env = PluginEnv::load()?;
    let report = env.report();

    let mut plugins: Vec<&PluginRecord> = report
        .plugins
        .iter()
        .filter(|p| !opts.enabled_only || p.status == PluginStatus::Loaded)
        .collect();
    plugins.sort_by(|a, b| a.id.cmp(&b.id));

    if opts.json {
        let payload = serde_json::json!({
            "extensionsDir": report.extensions_dir,
            "plugins": plugins,
            "diagnostics": report.diagnostics,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    if !env.config.plugins.enabled {
        println!("{}", Theme::warning("Plugins are disabled (plugins.enabled = false)"));
    }

    if plugins.is_empty() {
        println!("No plugins found.");
        return Ok(());
    }

    let loaded = plugins
        .iter()
        .filter(|p| p.status == PluginStatus::Loaded)
        .count();
    println!(
        "{} {}",
        Theme::header("Plugins"),
        Theme::dimmed(&format!("({loaded}/{} loaded)", plugins.len()))
    );
    println!();
    for plugin in &plugins {
        println!("{}", format_line(plugin, opts.verbose));
        if opts.verbose {
            println!();
        }
    }

    Ok(())
}

fn format_line(plugin: &PluginRecord, verbose: bool) -> String {
    let name = plugin.display_name.white();
    let id_suffix = if plugin.display_name == plugin.id {
        String::new()
    } else {
        Theme::dimmed(&format!(" ({})", plugin.id))
    };
    let status = Theme::status(plugin.status);

    if !verbose {
        let desc = plugin.description.as_deref().map_or_else(
            || Theme::dimmed("(no description)"),
            |d| Theme::dimmed(&truncate(d, 60)),
        );
        return format!("{name}{id_suffix} {status} - {desc}");
    }

    let mut lines = vec![
        format!("{name}{id_suffix} {status}"),
        format!("  source: {}", Theme::dimmed(plugin.source.as_str())),
        format!("  origin: {}", plugin.origin),
    ];
    if let Some(version) = &plugin.version {
        lines.push(format!("  version: {version}"));
    }
    if let Some(error) = &plugin.error {
        lines.push(format!("  error: {error}").red().to_string());
    }
    lines.join("\n")
}
