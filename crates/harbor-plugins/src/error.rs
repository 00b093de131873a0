//! Plugin error types.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

/// Errors from plugin installation and discovery.
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    /// The install source does not exist or is not a usable specifier.
    #[error("{0}")]
    SourceNotFound(String),

    /// `package.json` is absent or unreadable.
    #[error("package.json missing in {path}: {message}")]
    ManifestMissing {
        /// Directory that was searched.
        path: PathBuf,
        /// What was wrong.
        message: String,
    },

    /// `package.json` exists but a required field is missing or malformed.
    #[error("invalid package.json in {path}: {message}")]
    ManifestInvalid {
        /// Path to the manifest file.
        path: PathBuf,
        /// Which field is wrong and how.
        message: String,
    },

    /// The derived plugin id is not usable as a directory name.
    #[error("invalid plugin id: {0}")]
    InvalidId(String),

    /// A plugin with this id is already installed.
    #[error("plugin already exists: {} (delete it first)", path.display())]
    AlreadyExists {
        /// The conflicting id.
        id: String,
        /// The existing directory.
        path: PathBuf,
    },

    /// The package could not be fetched from the registry.
    #[error("fetch failed for {spec}: {message}")]
    FetchFailed {
        /// The specifier that was requested.
        spec: String,
        /// Underlying failure.
        message: String,
    },

    /// Tarball extraction failure.
    #[error("extraction error: {message}")]
    ExtractionError {
        /// Description of the extraction failure.
        message: String,
    },

    /// Unsafe entry type in archive (e.g. symlink, hardlink, device node).
    #[error("unsafe archive entry type '{entry_type}' at {path}")]
    UnsafeEntryType {
        /// The entry type that was rejected.
        entry_type: String,
        /// The path of the entry.
        path: String,
    },

    /// Path traversal detected in archive entry.
    #[error("path traversal detected: {path}")]
    PathTraversal {
        /// The offending path.
        path: String,
    },

    /// Invalid npm package name.
    #[error("invalid package name '{name}': {reason}")]
    InvalidPackageName {
        /// The invalid name.
        name: String,
        /// Why the name is invalid.
        reason: String,
    },

    /// Malformed npm package specifier.
    #[error("invalid package specifier '{0}'")]
    InvalidSpecifier(String),

    /// npm registry API failure.
    #[error("registry error: {message}")]
    RegistryError {
        /// Description of the registry failure.
        message: String,
    },

    /// SRI integrity verification failed.
    #[error("integrity mismatch for {package}: expected {expected}")]
    IntegrityError {
        /// Package that failed verification.
        package: String,
        /// Expected SRI hash string.
        expected: String,
    },

    /// Tarball exceeds maximum allowed size.
    #[error("package too large: {size} bytes (limit: {limit} bytes)")]
    PackageTooLarge {
        /// Actual size in bytes.
        size: u64,
        /// Maximum allowed size in bytes.
        limit: u64,
    },

    /// Tarball URL or redirect points away from the registry origin.
    #[error("SSRF blocked: tarball URL {url} does not match registry")]
    SsrfBlocked {
        /// The blocked URL.
        url: String,
    },

    /// Install ledger read/write/parse error.
    #[error("install ledger error at {path}: {message}")]
    LedgerError {
        /// Path to the ledger.
        path: PathBuf,
        /// Error description.
        message: String,
    },

    /// Loader snapshot read/write/parse error.
    #[error("load snapshot error at {path}: {message}")]
    SnapshotError {
        /// Path to the snapshot.
        path: PathBuf,
        /// Error description.
        message: String,
    },

    /// A placed plugin could not be moved out of the way after a later step failed.
    #[error("{message}; {} is still installed and must be removed before retrying", target.display())]
    RollbackFailed {
        /// Directory that is still in place.
        target: PathBuf,
        /// The failure that triggered the rollback and why the rollback failed.
        message: String,
    },

    /// Filesystem operation failed.
    #[error("{action} {}: {source}", path.display())]
    Filesystem {
        /// What was being attempted (e.g. `"failed to create"`).
        action: &'static str,
        /// Path involved.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PluginError {
    /// Shorthand for [`PluginError::Filesystem`].
    pub(crate) fn fs(
        action: &'static str,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::Filesystem {
            action,
            path: path.into(),
            source,
        }
    }

    /// Classify this error for reporting at the install boundary.
    #[must_use]
    pub fn kind(&self) -> InstallErrorKind {
        match self {
            Self::SourceNotFound(_) | Self::InvalidPackageName { .. } | Self::InvalidSpecifier(_) => {
                InstallErrorKind::SourceNotFound
            },
            Self::ManifestMissing { .. } => InstallErrorKind::ManifestMissing,
            Self::ManifestInvalid { .. } => InstallErrorKind::ManifestInvalid,
            Self::InvalidId(_) => InstallErrorKind::InvalidId,
            Self::AlreadyExists { .. } => InstallErrorKind::AlreadyExists,
            Self::FetchFailed { .. }
            | Self::RegistryError { .. }
            | Self::IntegrityError { .. }
            | Self::PackageTooLarge { .. }
            | Self::SsrfBlocked { .. } => InstallErrorKind::FetchFailed,
            Self::ExtractionError { .. }
            | Self::UnsafeEntryType { .. }
            | Self::PathTraversal { .. } => InstallErrorKind::ExtractionFailed,
            Self::LedgerError { .. }
            | Self::SnapshotError { .. }
            | Self::RollbackFailed { .. }
            | Self::Filesystem { .. }
            | Self::Io(_) => InstallErrorKind::FilesystemError,
        }
    }
}

/// Result type for plugin operations.
pub type PluginResult<T> = Result<T, PluginError>;

/// Why an install failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstallErrorKind {
    /// The path does not exist or the specifier is malformed.
    SourceNotFound,
    /// The archive could not be unpacked safely.
    ExtractionFailed,
    /// No `package.json` was found in the package.
    ManifestMissing,
    /// `package.json` lacks a required field.
    ManifestInvalid,
    /// The derived id is not a safe directory name.
    InvalidId,
    /// The id is already installed.
    AlreadyExists,
    /// The registry fetch failed.
    FetchFailed,
    /// The filesystem refused an operation.
    FilesystemError,
}

impl InstallErrorKind {
    /// Stable kebab-case label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SourceNotFound => "source-not-found",
            Self::ExtractionFailed => "extraction-failed",
            Self::ManifestMissing => "manifest-missing",
            Self::ManifestInvalid => "manifest-invalid",
            Self::InvalidId => "invalid-id",
            Self::AlreadyExists => "already-exists",
            Self::FetchFailed => "fetch-failed",
            Self::FilesystemError => "filesystem-error",
        }
    }
}

impl fmt::Display for InstallErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn already_exists_message() {
        let err = PluginError::AlreadyExists {
            id: "voice-call".into(),
            path: PathBuf::from("/x/extensions/voice-call"),
        };
        assert!(err.to_string().contains("already exists"));
        assert_eq!(err.kind(), InstallErrorKind::AlreadyExists);
    }

    #[test]
    fn archive_safety_errors_are_extraction_failures() {
        let err = PluginError::PathTraversal {
            path: "../etc/passwd".into(),
        };
        assert_eq!(err.kind(), InstallErrorKind::ExtractionFailed);
    }

    #[test]
    fn bad_specifiers_are_source_not_found() {
        let err = PluginError::InvalidPackageName {
            name: "Nope".into(),
            reason: "uppercase".into(),
        };
        assert_eq!(err.kind(), InstallErrorKind::SourceNotFound);
    }

    #[test]
    fn kind_serializes_kebab_case() {
        let json = serde_json::to_string(&InstallErrorKind::ManifestInvalid).unwrap();
        assert_eq!(json, "\"manifest-invalid\"");
        assert_eq!(InstallErrorKind::ManifestInvalid.to_string(), "manifest-invalid");
    }
}
