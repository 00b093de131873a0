#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
//! Configuration for the Harbor plugin host.
//!
//! The configuration store holds the plugin settings the installer and the
//! status registry consume as plain data (explicit load paths and per-plugin
//! `enabled` flags) plus logging settings for the CLI.
//!
//! # Usage
//!
//! ```rust,no_run
//! use harbor_config::Config;
//!
//! let config = Config::load(std::path::Path::new("/home/me/.harbor")).unwrap();
//! for path in &config.plugins.load.paths {
//!     println!("configured plugin path: {path}");
//! }
//! ```
//!
//! # Configuration Precedence
//!
//! From highest to lowest priority:
//!
//! 1. **User** (`<home>/config.toml`)
//! 2. **Environment variables** (`HARBOR_LOG`, `HARBOR_LOG_DIR`, `HARBOR_EXTENSIONS_DIR`), fallback only
//! 3. **Embedded defaults** (`defaults.toml` compiled into binary)
//!
//! Writes (`Config::update`) only ever touch the user file and are applied
//! under an advisory lock with an atomic rename.

/// Environment variable fallback resolution.
pub mod env;
/// Configuration error types.
pub mod error;
/// Configuration file discovery and loading.
pub mod loader;
/// Layered configuration merging.
pub mod merge;
/// Locked, atomic configuration writes.
pub mod store;
/// Configuration struct definitions.
pub mod types;
/// Configuration validation rules.
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use types::*;

impl Config {
    /// Load configuration with the full precedence chain.
    ///
    /// `home_dir` is the Harbor home directory; the user file is
    /// `home_dir/config.toml`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the user file is malformed or the final
    /// configuration fails validation.
    pub fn load(home_dir: &std::path::Path) -> ConfigResult<Self> {
        loader::load(home_dir)
    }

    /// Load configuration from a single file (no layering).
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be read, parsed, or fails
    /// validation.
    pub fn load_file(path: &std::path::Path) -> ConfigResult<Self> {
        loader::load_file(path)
    }

    /// Atomically load, mutate, validate and save the user config file.
    ///
    /// See [`store::update`].
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be read, parsed or
    /// written, or if the mutated configuration fails validation.
    pub fn update<F>(path: &std::path::Path, f: F) -> ConfigResult<Self>
    where
        F: FnOnce(&mut Self),
    {
        store::update(path, f)
    }
}
