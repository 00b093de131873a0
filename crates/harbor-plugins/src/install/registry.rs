//! Registry-spec install pipeline.

use tracing::debug;

use super::{InstallOutcome, Installer};
use crate::error::{PluginError, PluginResult};
use crate::ledger::InstallSource;
use crate::npm::NpmSpec;
use crate::spec::looks_like_path;

/// Prefix of the per-call download directory inside the extensions directory.
const DOWNLOAD_PREFIX: &str = ".download-";

impl Installer {
    pub(super) async fn registry_pipeline(&self, raw: &str) -> PluginResult<InstallOutcome> {
        let raw = raw.trim();
        if looks_like_path(raw) {
            return Err(PluginError::SourceNotFound(format!("path not found: {raw}")));
        }
        let spec = NpmSpec::parse(raw)?;

        let fetcher = self.fetcher.as_ref().ok_or_else(|| PluginError::FetchFailed {
            spec: spec.to_string(),
            message: "registry installs are not available (no package fetcher configured)".into(),
        })?;

        std::fs::create_dir_all(&self.extensions_dir)
            .map_err(|e| PluginError::fs("failed to create", &self.extensions_dir, e))?;
        let download = tempfile::Builder::new()
            .prefix(DOWNLOAD_PREFIX)
            .tempdir_in(&self.extensions_dir)
            .map_err(|e| PluginError::fs("failed to create download directory in", &self.extensions_dir, e))?;

        debug!(spec = %spec, "fetching package");
        let tarball = fetcher
            .fetch(&spec, download.path())
            .await
            .map_err(|e| PluginError::FetchFailed {
                spec: spec.to_string(),
                message: e.to_string(),
            })?;
        if !tarball.is_file() {
            return Err(PluginError::FetchFailed {
                spec: spec.to_string(),
                message: format!("fetcher reported {} but no file exists", tarball.display()),
            });
        }

        self.install_from_tarball(&tarball, InstallSource::Registry(spec.to_string()))
    }
}
