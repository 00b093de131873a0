//! Install pipeline entry point.
//!
//! [`Installer::install`] classifies the raw argument and dispatches:
//!
//! - existing directory or file → [`InstallOutcome::Linked`] (nothing copied)
//! - existing `.tgz` / `.tar.gz` → archive pipeline
//! - anything else → registry pipeline via the injected [`PackageFetcher`],
//!   then the same archive pipeline
//!
//! Both pipelines stage into a hidden `.staging-*` directory inside the
//! extensions directory, validate the manifest there, and only then promote
//! the package with [`crate::placement::place`]. The staging directory is a
//! [`tempfile::TempDir`], so it disappears on every exit path.

mod archive;
mod registry;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::error::{InstallErrorKind, PluginError, PluginResult};
use crate::manifest::read_manifest;
use crate::npm::NpmSpec;
use crate::plugin::PluginId;
use crate::spec::InstallSpec;

/// Downloads a registry package to a local tarball.
#[async_trait]
pub trait PackageFetcher: Send + Sync {
    /// Fetch `spec` into `dest` (an existing, call-scoped directory) and
    /// return the path of the downloaded `.tgz`.
    ///
    /// # Errors
    ///
    /// Any error is reported to the caller as
    /// [`InstallErrorKind::FetchFailed`] with its message preserved.
    async fn fetch(&self, spec: &NpmSpec, dest: &Path) -> PluginResult<PathBuf>;
}

/// Result of one install call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    /// The package was copied into the extensions directory.
    Installed {
        /// Derived plugin id.
        plugin_id: PluginId,
        /// `extensions_dir/<plugin_id>`.
        target_dir: PathBuf,
    },
    /// An existing local path should be loaded in place.
    Linked {
        /// Plugin id, when the path is a directory with a readable manifest.
        plugin_id: Option<PluginId>,
        /// Canonical path to add to the configured load paths.
        path: PathBuf,
    },
    /// Nothing was installed.
    Failed {
        /// Failure category.
        kind: InstallErrorKind,
        /// Human-readable explanation.
        message: String,
    },
}

impl InstallOutcome {
    /// Whether the call failed.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// The failure kind, if any.
    #[must_use]
    pub fn error_kind(&self) -> Option<InstallErrorKind> {
        match self {
            Self::Failed { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

impl From<PluginError> for InstallOutcome {
    fn from(err: PluginError) -> Self {
        Self::Failed {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl From<PluginResult<InstallOutcome>> for InstallOutcome {
    fn from(result: PluginResult<InstallOutcome>) -> Self {
        result.unwrap_or_else(Self::from)
    }
}

/// Installs plugins into one extensions directory.
#[derive(Clone)]
pub struct Installer {
    extensions_dir: PathBuf,
    fetcher: Option<Arc<dyn PackageFetcher>>,
}

impl std::fmt::Debug for Installer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Installer")
            .field("extensions_dir", &self.extensions_dir)
            .field("has_fetcher", &self.fetcher.is_some())
            .finish()
    }
}

impl Installer {
    /// Create an installer without registry support.
    #[must_use]
    pub fn new(extensions_dir: impl Into<PathBuf>) -> Self {
        Self {
            extensions_dir: extensions_dir.into(),
            fetcher: None,
        }
    }

    /// Enable registry installs through `fetcher`.
    #[must_use]
    pub fn with_fetcher(mut self, fetcher: Arc<dyn PackageFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// The directory plugins are installed into.
    #[must_use]
    pub fn extensions_dir(&self) -> &Path {
        &self.extensions_dir
    }

    /// Install whatever `raw` refers to.
    pub async fn install(&self, raw: &str) -> InstallOutcome {
        match InstallSpec::classify(raw) {
            InstallSpec::Path(path) => link(&path).into(),
            InstallSpec::Archive(path) => self.install_archive(&path),
            InstallSpec::RegistrySpec(spec) => self.install_registry_spec(&spec).await,
        }
    }

    /// Install a local `.tgz` archive.
    #[must_use]
    pub fn install_archive(&self, archive: &Path) -> InstallOutcome {
        self.archive_pipeline(archive).into()
    }

    /// Fetch a registry package and install it.
    pub async fn install_registry_spec(&self, raw: &str) -> InstallOutcome {
        self.registry_pipeline(raw).await.into()
    }
}

/// Describe an existing local path for in-place loading.
fn link(path: &Path) -> PluginResult<InstallOutcome> {
    let path = path
        .canonicalize()
        .map_err(|e| PluginError::SourceNotFound(format!("path not found: {} ({e})", path.display())))?;

    let plugin_id = if path.is_dir() {
        match read_manifest(&path).and_then(|m| PluginId::from_package_name(&m.declared_name)) {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "linked path has no usable manifest");
                None
            },
        }
    } else {
        None
    };

    Ok(InstallOutcome::Linked { plugin_id, path })
}
