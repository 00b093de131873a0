//! Archive install pipeline, shared by local archives and fetched tarballs.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, error, info};

use super::{InstallOutcome, Installer};
use crate::archive::{extract_archive, find_package_root};
use crate::error::{PluginError, PluginResult};
use crate::ledger::{InstallLedger, InstallRecord, InstallSource};
use crate::manifest::read_manifest;
use crate::placement::place;
use crate::plugin::PluginId;

/// Prefix of the per-call staging directory inside the extensions directory.
const STAGING_PREFIX: &str = ".staging-";

impl Installer {
    pub(super) fn archive_pipeline(&self, archive: &Path) -> PluginResult<InstallOutcome> {
        if !archive.is_file() {
            return Err(PluginError::SourceNotFound(format!(
                "archive not found: {}",
                archive.display()
            )));
        }
        let archive = archive
            .canonicalize()
            .map_err(|e| PluginError::fs("failed to resolve", archive, e))?;

        self.install_from_tarball(&archive, InstallSource::Archive(archive.display().to_string()))
    }

    /// Extract, validate, place and record. `archive` must exist.
    pub(super) fn install_from_tarball(
        &self,
        archive: &Path,
        source: InstallSource,
    ) -> PluginResult<InstallOutcome> {
        let staging = self.staging_dir()?;
        let unpacked = staging.path().join("unpacked");
        std::fs::create_dir(&unpacked).map_err(|e| PluginError::fs("failed to create", &unpacked, e))?;

        extract_archive(archive, &unpacked)?;

        let package_root = find_package_root(&unpacked).ok_or_else(|| PluginError::ManifestMissing {
            path: archive.to_path_buf(),
            message: "no package.json found in archive".into(),
        })?;
        debug!(root = %package_root.display(), "located package root");

        let manifest = read_manifest(&package_root)?;
        manifest.ensure_installable(&package_root)?;
        let plugin_id = PluginId::from_package_name(&manifest.declared_name)?;

        let target_dir = place(&package_root, &self.extensions_dir, &plugin_id)?;

        let record = InstallRecord::new(plugin_id.clone(), manifest.version.clone(), source);
        let ledger_path = InstallLedger::path_in(&self.extensions_dir);
        if let Err(e) = InstallLedger::update(&ledger_path, |ledger| {
            ledger.record(record);
            Ok(())
        }) {
            return Err(roll_back(&target_dir, &staging, e));
        }

        info!(
            plugin_id = %plugin_id,
            version = manifest.version.as_deref().unwrap_or("-"),
            target = %target_dir.display(),
            "installed plugin"
        );
        Ok(InstallOutcome::Installed {
            plugin_id,
            target_dir,
        })
    }

    fn staging_dir(&self) -> PluginResult<TempDir> {
        std::fs::create_dir_all(&self.extensions_dir)
            .map_err(|e| PluginError::fs("failed to create", &self.extensions_dir, e))?;
        tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(&self.extensions_dir)
            .map_err(|e| PluginError::fs("failed to create staging directory in", &self.extensions_dir, e))
    }
}

/// Move a placed package back into staging so the id is free again.
///
/// Returns `cause` when the id was freed. Otherwise the error names the
/// directory left behind.
fn roll_back(target_dir: &Path, staging: &TempDir, cause: PluginError) -> PluginError {
    let parked: PathBuf = staging.path().join("rolled-back");
    match std::fs::rename(target_dir, &parked) {
        Ok(()) => cause,
        Err(e) => {
            error!(
                target = %target_dir.display(),
                error = %e,
                "failed to roll back placed plugin after ledger failure"
            );
            PluginError::RollbackFailed {
                target: target_dir.to_path_buf(),
                message: format!("{cause} (rollback failed: {e})"),
            }
        },
    }
}
