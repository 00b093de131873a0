//! Serde types for npm registry metadata responses.

use std::collections::HashMap;

use serde::Deserialize;

/// Package document returned by `GET <registry>/<name>`.
#[derive(Debug, Clone, Deserialize)]
pub struct PackageMetadata {
    /// Package name.
    #[serde(default)]
    pub name: String,
    /// Dist-tag to version mapping (e.g. `{"latest": "1.0.0"}`).
    #[serde(rename = "dist-tags", default)]
    pub dist_tags: HashMap<String, String>,
    /// Per-version metadata keyed by version string.
    #[serde(default)]
    pub versions: HashMap<String, VersionMetadata>,
}

impl PackageMetadata {
    /// Resolve a requested version or dist-tag (default `latest`) to concrete
    /// version metadata. Dist-tags are checked before exact versions.
    #[must_use]
    pub fn resolve(&self, requested: Option<&str>) -> Option<&VersionMetadata> {
        let wanted = requested.unwrap_or("latest");
        let version = self
            .dist_tags
            .get(wanted)
            .map_or(wanted, String::as_str);
        self.versions.get(version)
    }
}

/// Metadata for one published version.
#[derive(Debug, Clone, Deserialize)]
pub struct VersionMetadata {
    /// Version string.
    #[serde(default)]
    pub version: String,
    /// Distribution info.
    pub dist: DistInfo,
}

/// Where to download a version and how to verify it.
#[derive(Debug, Clone, Deserialize)]
pub struct DistInfo {
    /// Tarball download URL.
    pub tarball: String,
    /// SRI integrity string (e.g. `"sha512-<base64>"`).
    #[serde(default)]
    pub integrity: Option<String>,
}
