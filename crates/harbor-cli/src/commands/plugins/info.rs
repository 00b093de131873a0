use anyhow::bail;

use super::helpers::PluginEnv;
use crate::theme::Theme;

/// Show details for one plugin, matched by id or display name.
pub(crate) fn plugin_info(key: &str, json: bool) -> anyhow::Result<()> {
    let env = PluginEnv::load()?;
    let report = env.report();
    let Some(plugin) = report.find(key) else {
        bail!("Plugin not found: {key}");
    };

    if json {
        println!("{}", serde_json::to_string_pretty(plugin)?);
        return Ok(());
    }

    println!("{}", Theme::header(&plugin.display_name));
    if plugin.display_name != plugin.id {
        println!("{}", Theme::dimmed(&format!("id: {}", plugin.id)));
    }
    if let Some(description) = &plugin.description {
        println!("{description}");
    }
    println!();
    println!("{}", Theme::kv("Status", plugin.status.as_str()));
    println!("{}", Theme::kv("Source", plugin.source.as_str()));
    println!("{}", Theme::kv("Origin", &plugin.origin));
    if let Some(version) = &plugin.version {
        println!("{}", Theme::kv("Version", version));
    }

    let caps = &plugin.capabilities;
    for (label, names) in [
        ("Tools", &caps.tool_names),
        ("Gateway methods", &caps.gateway_methods),
        ("CLI commands", &caps.cli_commands),
        ("Services", &caps.services),
    ] {
        if !names.is_empty() {
            println!("{}", Theme::kv(label, &names.join(", ")));
        }
    }

    if let Some(error) = &plugin.error {
        println!("{}", Theme::error(&format!("Error: {error}")));
    }

    Ok(())
}
