//! Conflict-safe promotion of a validated package into the extensions directory.
//!
//! The extensions directory is shared between processes without a lock. A
//! cheap existence check gives a friendly early error, but the authoritative
//! conflict signal is the atomic `create_dir` that claims the id: only one
//! caller can create `extensions_dir/<id>`. The claimed (empty) directory is
//! then replaced by the validated source in a single `rename`.

use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{PluginError, PluginResult};
use crate::plugin::PluginId;

/// Move `source` to `extensions_dir/<id>`, never overwriting an existing
/// entry.
///
/// `source` should live on the same filesystem as `extensions_dir` so the
/// final rename is atomic. Returns the target directory.
///
/// # Errors
///
/// Returns [`PluginError::AlreadyExists`] if the id is taken (nothing is
/// touched), or [`PluginError::Filesystem`] if the claim or rename fails (the
/// claim is removed again).
pub fn place(source: &Path, extensions_dir: &Path, id: &PluginId) -> PluginResult<PathBuf> {
    let target = target_dir(extensions_dir, id);

    if target.symlink_metadata().is_ok() {
        return Err(already_exists(id, target));
    }

    std::fs::create_dir_all(extensions_dir)
        .map_err(|e| PluginError::fs("failed to create", extensions_dir, e))?;

    claim(&target, id)?;

    if let Err(e) = replace_claim(source, &target) {
        if let Err(cleanup) = std::fs::remove_dir(&target) {
            warn!(
                plugin_id = %id,
                target = %target.display(),
                error = %cleanup,
                "failed to release plugin directory claim"
            );
        }
        return Err(PluginError::fs("failed to move package into", target, e));
    }

    Ok(target)
}

/// Where `id` lives inside `extensions_dir`.
#[must_use]
pub fn target_dir(extensions_dir: &Path, id: &PluginId) -> PathBuf {
    extensions_dir.join(id.as_str())
}

/// Atomically reserve `target`. Exactly one concurrent caller succeeds.
fn claim(target: &Path, id: &PluginId) -> PluginResult<()> {
    match std::fs::create_dir(target) {
        Ok(()) => {
            debug!(plugin_id = %id, target = %target.display(), "claimed plugin directory");
            Ok(())
        },
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            Err(already_exists(id, target.to_path_buf()))
        },
        Err(e) => Err(PluginError::fs("failed to claim", target, e)),
    }
}

#[cfg(unix)]
fn replace_claim(source: &Path, claimed: &Path) -> io::Result<()> {
    // rename(2) replaces an empty target directory atomically.
    std::fs::rename(source, claimed)
}

#[cfg(not(unix))]
fn replace_claim(source: &Path, claimed: &Path) -> io::Result<()> {
    std::fs::remove_dir(claimed)?;
    std::fs::rename(source, claimed)
}

fn already_exists(id: &PluginId, path: PathBuf) -> PluginError {
    PluginError::AlreadyExists {
        id: id.to_string(),
        path,
    }
}
