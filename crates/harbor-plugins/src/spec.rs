//! Install argument classification.

use std::path::{Path, PathBuf};

use harbor_core::expand_user_path;

/// Archive suffixes recognised by the installer (matched case-insensitively).
const ARCHIVE_SUFFIXES: &[&str] = &[".tgz", ".tar.gz"];

/// Suffixes that mark an argument as an intended file path.
const PATH_LIKE_SUFFIXES: &[&str] = &[".ts", ".js", ".mjs", ".cjs", ".tgz", ".tar.gz"];

/// What a raw install argument refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallSpec {
    /// An existing directory or file that is not an archive.
    Path(PathBuf),
    /// An existing `.tgz` / `.tar.gz` file.
    Archive(PathBuf),
    /// Anything else, treated as a package-registry specifier.
    RegistrySpec(String),
}

impl InstallSpec {
    /// Classify a raw install argument.
    ///
    /// Existence is checked first (after expanding a leading `~`), then the
    /// archive extension; everything that does not exist on disk is a
    /// registry specifier. Never fails.
    #[must_use]
    pub fn classify(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Self::RegistrySpec(String::new());
        }

        let path = expand_user_path(trimmed);
        if path.exists() {
            if is_archive_path(&path) {
                Self::Archive(path)
            } else {
                Self::Path(path)
            }
        } else {
            Self::RegistrySpec(trimmed.to_string())
        }
    }
}

/// Whether the file name ends in a supported archive suffix.
#[must_use]
pub fn is_archive_path(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|name| has_suffix(name, ARCHIVE_SUFFIXES))
}

/// Whether a raw argument reads like a filesystem path rather than a
/// package name.
#[must_use]
pub fn looks_like_path(raw: &str) -> bool {
    let raw = raw.trim();
    raw.starts_with('.')
        || raw.starts_with('~')
        || raw.starts_with('/')
        || has_suffix(raw, PATH_LIKE_SUFFIXES)
}

fn has_suffix(value: &str, suffixes: &[&str]) -> bool {
    let lower = value.to_ascii_lowercase();
    suffixes.iter().any(|s| lower.ends_with(s))
}
