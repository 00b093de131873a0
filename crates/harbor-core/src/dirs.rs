//! Directory scaffolding for the Harbor home directory.
//!
//! [`HarborHome`] is the global state directory at `~/.harbor/` (or
//! `$HARBOR_HOME`). Installed extensions, the user config file and the
//! loader's last-known outcomes all live here.
//!
//! # Layout
//!
//! ```text
//! ~/.harbor/                        (HarborHome)
//! ├── config.toml                   (plugin load paths, enable flags, logging)
//! ├── extensions/                   (installed plugins, one directory per id)
//! │   ├── <plugin-id>/
//! │   └── .installs.toml            (install ledger: where each id came from)
//! ├── logs/                         (log files when file logging is enabled)
//! └── state/
//!     └── plugin-load.json          (last load outcomes written by the host)
//! ```

use std::io;
use std::path::{Path, PathBuf};

/// Environment variable that overrides the home directory location.
pub const HOME_ENV_VAR: &str = "HARBOR_HOME";

/// Global Harbor home directory (`~/.harbor/` or `$HARBOR_HOME`).
#[derive(Debug, Clone)]
pub struct HarborHome {
    root: PathBuf,
}

impl HarborHome {
    /// Resolve the home directory.
    ///
    /// Checks `$HARBOR_HOME` first, then falls back to `$HOME/.harbor/`.
    ///
    /// # Errors
    ///
    /// Returns an error if `$HARBOR_HOME` is relative, or if neither
    /// `$HARBOR_HOME` nor `$HOME` is set.
    pub fn resolve() -> io::Result<Self> {
        Self::resolve_from(
            std::env::var(HOME_ENV_VAR).ok(),
            std::env::var("HOME").ok(),
        )
    }

    /// Resolve from explicit variable values instead of the process environment.
    fn resolve_from(custom: Option<String>, home: Option<String>) -> io::Result<Self> {
        let root = if let Some(custom) = custom.filter(|c| !c.is_empty()) {
            let p = PathBuf::from(&custom);
            if !p.is_absolute() {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "HARBOR_HOME must be an absolute path",
                ));
            }
            p
        } else {
            let home = home.ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    "neither HARBOR_HOME nor HOME environment variable is set",
                )
            })?;
            PathBuf::from(home).join(".harbor")
        };

        Ok(Self { root })
    }

    /// Create from an explicit path (useful for testing).
    #[must_use]
    pub fn from_path(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Ensure the root, `extensions/` and `state/` directories exist.
    ///
    /// # Errors
    ///
    /// Returns an error if directory creation fails.
    pub fn ensure(&self) -> io::Result<()> {
        std::fs::create_dir_all(self.extensions_dir())?;
        std::fs::create_dir_all(self.state_dir())?;
        Ok(())
    }

    /// Root directory path.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// User config file (`~/.harbor/config.toml`).
    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        self.root.join("config.toml")
    }

    /// Installed extensions directory (`~/.harbor/extensions/`).
    #[must_use]
    pub fn extensions_dir(&self) -> PathBuf {
        self.root.join("extensions")
    }

    /// Logs directory (`~/.harbor/logs/`).
    #[must_use]
    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    /// Runtime state directory (`~/.harbor/state/`).
    #[must_use]
    pub fn state_dir(&self) -> PathBuf {
        self.root.join("state")
    }

    /// Snapshot of the loader's last outcomes (`~/.harbor/state/plugin-load.json`).
    #[must_use]
    pub fn load_snapshot_path(&self) -> PathBuf {
        self.state_dir().join("plugin-load.json")
    }
}

/// Expand a leading `~` in a user-supplied path against `$HOME`.
///
/// Paths without a leading `~`, or when `$HOME` is unset, are returned as-is.
#[must_use]
pub fn expand_user_path(raw: &str) -> PathBuf {
    expand_with_home(raw, std::env::var("HOME").ok().as_deref())
}

fn expand_with_home(raw: &str, home: Option<&str>) -> PathBuf {
    let trimmed = raw.trim();
    match (trimmed, home) {
        ("~", Some(home)) => PathBuf::from(home),
        (rest, Some(home)) if rest.starts_with("~/") => {
            PathBuf::from(home).join(rest.trim_start_matches("~/"))
        },
        _ => PathBuf::from(trimmed),
    }
}
