//! Harbor CLI - manage plugins for the Harbor plugin host.
//!
//! Reads `~/.harbor/config.toml` (or `$HARBOR_HOME/config.toml`), scans the
//! extensions directory and the configured load paths, and installs new
//! plugins from local paths, `.tgz` archives or the npm registry.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod config_bridge;
mod theme;

use commands::plugins;

/// Harbor - plugin host
#[derive(Parser)]
#[command(name = "harbor")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage plugins and extensions
    Plugins {
        #[command(subcommand)]
        command: PluginCommands,
    },
}

#[derive(Subcommand)]
enum PluginCommands {
    /// List discovered plugins
    List {
        /// Print JSON
        #[arg(long)]
        json: bool,
        /// Only show loaded plugins
        #[arg(long)]
        enabled: bool,
        /// Show detailed entries
        #[arg(long)]
        verbose: bool,
    },
    /// Show plugin details
    Info {
        /// Plugin id or display name
        id: String,
        /// Print JSON
        #[arg(long)]
        json: bool,
    },
    /// Enable a plugin in config
    Enable {
        /// Plugin id
        id: String,
    },
    /// Disable a plugin in config
    Disable {
        /// Plugin id
        id: String,
    },
    /// Install a plugin (path, archive, or npm spec)
    Install {
        /// Path (.ts/.js/.tgz) or an npm package spec
        #[arg(value_name = "PATH_OR_SPEC")]
        source: String,
        /// npm registry base URL
        #[arg(long, env = "HARBOR_NPM_REGISTRY")]
        registry: Option<String>,
    },
    /// Report plugin load issues
    Doctor,
}

/// Install the tracing subscriber from config, with `--verbose` forcing debug.
fn init_logging(verbose: bool) {
    let loaded = harbor_core::HarborHome::resolve().ok().and_then(|home| {
        harbor_config::Config::load(home.root())
            .ok()
            .map(|cfg| (cfg, home))
    });

    let log_config = if let Some((cfg, home)) = &loaded {
        let mut lc = config_bridge::to_log_config(cfg, home);
        if verbose {
            "debug".clone_into(&mut lc.level);
        }
        lc
    } else {
        let level = if verbose { "debug" } else { "warn" };
        harbor_telemetry::LogConfig::new(level)
            .with_format(harbor_telemetry::LogFormat::Compact)
    };
    if let Err(e) = harbor_telemetry::setup_logging(&log_config) {
        eprintln!("Failed to initialize logging: {e}");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Plugins { command } => match command {
            PluginCommands::List {
                json,
                enabled,
                verbose,
            } => plugins::list_plugins(plugins::ListOptions {
                json,
                enabled_only: enabled,
                verbose,
            }),
            PluginCommands::Info { id, json } => plugins::plugin_info(&id, json),
            PluginCommands::Enable { id } => plugins::set_plugin_enabled(&id, true),
            PluginCommands::Disable { id } => plugins::set_plugin_enabled(&id, false),
            PluginCommands::Install { source, registry } => {
                plugins::install_plugin(&source, registry.as_deref()).await
            },
            PluginCommands::Doctor => plugins::plugins_doctor(),
        },
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_list_flags() {
        let cli = Cli::try_parse_from(["harbor", "plugins", "list", "--json", "--verbose"]).unwrap();
        let Commands::Plugins {
            command: PluginCommands::List { json, enabled, verbose },
        } = cli.command
        else {
            panic!("expected list");
        };
        assert!(json && verbose && !enabled);
        assert!(!cli.verbose);
    }

    #[test]
    fn parses_install_source() {
        let cli = Cli::try_parse_from(["harbor", "plugins", "install", "@harbor/voice-call@1.0.0"])
            .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Plugins {
                command: PluginCommands::Install { ref source, .. }
            } if source == "@harbor/voice-call@1.0.0"
        ));
    }
}
