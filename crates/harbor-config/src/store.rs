//! Locked, atomic writes to the user config file.
//!
//! Only the user file is rewritten. Embedded defaults and environment
//! fallbacks are never persisted.

use std::io::Write;
use std::path::Path;

use fs2::FileExt;
use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::loader::try_load_file;
use crate::types::Config;
use crate::validate;

/// Load the user file at `path`, apply `f`, validate and write it back.
///
/// The read-modify-write cycle runs under an exclusive advisory lock on a
/// `.lk` sibling of `path`; the write goes through a temp file in the same
/// directory followed by a rename. A missing file starts from
/// [`Config::default`].
///
/// Returns the configuration that was written.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read, parsed or written,
/// or if the mutated configuration fails validation (nothing is written in
/// that case).
pub fn update<F>(path: &Path, f: F) -> ConfigResult<Config>
where
    F: FnOnce(&mut Config),
{
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| write_err(path, "create parent directory", &e))?;
    }

    let _lock = acquire_lock(path)?;

    let mut config: Config = match try_load_file(path)? {
        Some(value) => value
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::ParseError {
                path: path.display().to_string(),
                source: e,
            })?,
        None => Config::default(),
    };

    f(&mut config);
    validate::validate(&config)?;

    let body = toml::to_string_pretty(&config).map_err(|e| ConfigError::WriteError {
        path: path.display().to_string(),
        message: format!("failed to serialize config: {e}"),
    })?;

    let parent = path.parent().unwrap_or(Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(parent)
        .map_err(|e| write_err(path, "create temp file", &e))?;
    tmp.write_all(body.as_bytes())
        .map_err(|e| write_err(path, "write temp file", &e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| write_err(path, "sync temp file", &e))?;
    tmp.persist(path)
        .map_err(|e| write_err(path, "rename temp file", &e.error))?;

    debug!(path = %path.display(), "saved config");
    Ok(config)
}

fn acquire_lock(path: &Path) -> ConfigResult<std::fs::File> {
    let lock_path = path.with_extension("lk");
    let lock_file = std::fs::OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .read(true)
        .open(&lock_path)
        .map_err(|e| write_err(path, "open lock file", &e))?;
    lock_file
        .lock_exclusive()
        .map_err(|e| write_err(path, "acquire exclusive file lock", &e))?;
    Ok(lock_file)
}

fn write_err(path: &Path, action: &str, e: &std::io::Error) -> ConfigError {
    ConfigError::WriteError {
        path: path.display().to_string(),
        message: format!("failed to {action}: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let written = update(&path, |c| c.plugins.set_enabled("voice-call", false)).unwrap();
        assert_eq!(written.plugins.entry_enabled("voice-call"), Some(false));

        let reloaded = crate::loader::load_file(&path).unwrap();
        assert_eq!(reloaded.plugins.entry_enabled("voice-call"), Some(false));
    }

    #[test]
    fn update_preserves_existing_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[plugins.load]\npaths = [\"/opt/a\"]\n\n[logging]\nlevel = \"info\"\n",
        )
        .unwrap();

        update(&path, |c| {
            c.plugins.add_load_path("/opt/b");
        })
        .unwrap();

        let reloaded = crate::loader::load_file(&path).unwrap();
        assert_eq!(reloaded.plugins.load.paths, vec!["/opt/a", "/opt/b"]);
        assert_eq!(reloaded.logging.level, "info");
    }

    #[test]
    fn invalid_mutation_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[logging]\nlevel = \"info\"\n").unwrap();

        let result = update(&path, |c| c.logging.format = "xml".to_owned());
        assert!(matches!(result, Err(ConfigError::ValidationError { .. })));

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "[logging]\nlevel = \"info\"\n");
    }

    #[test]
    fn malformed_file_is_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "not = [valid").unwrap();

        let result = update(&path, |c| c.plugins.set_enabled("x", true));
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "not = [valid");
    }
}
