//! `package.json` manifest reading.
//!
//! Only the fields the host needs are interpreted: `name`, `version`,
//! `description` and the `harbor.extensions` entry-point list. Everything
//! else is kept verbatim in [`PluginManifest::raw`]. Package code is never
//! executed.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{PluginError, PluginResult};

/// Manifest filename expected at the package root.
pub const MANIFEST_FILE: &str = "package.json";

/// Key under which the host-specific settings live in `package.json`.
const HOST_KEY: &str = "harbor";

/// Maximum manifest size (1 MB).
const MAX_MANIFEST_SIZE: u64 = 1_048_576;

/// The subset of `package.json` the host understands.
#[derive(Debug, Clone, PartialEq)]
pub struct PluginManifest {
    /// The `name` field, possibly scoped (`@scope/name`).
    pub declared_name: String,
    /// The `version` field, if present.
    pub version: Option<String>,
    /// Relative entry-point paths from `harbor.extensions`, in declared order.
    pub extension_entry_points: Vec<String>,
    /// The `description` field, if present.
    pub description: Option<String>,
    /// The full manifest object.
    pub raw: Map<String, Value>,
}

impl PluginManifest {
    /// Parse a manifest from its JSON text.
    ///
    /// `path` is only used for error messages.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::ManifestMissing`] if the text is not a JSON
    /// object, or [`PluginError::ManifestInvalid`] if `name` or
    /// `harbor.extensions` is malformed.
    pub fn parse(path: &Path, content: &str) -> PluginResult<Self> {
        let value: Value =
            serde_json::from_str(content).map_err(|e| PluginError::ManifestMissing {
                path: path.to_path_buf(),
                message: format!("not valid JSON: {e}"),
            })?;
        let Value::Object(raw) = value else {
            return Err(PluginError::ManifestMissing {
                path: path.to_path_buf(),
                message: "not a JSON object".into(),
            });
        };

        let invalid = |message: String| PluginError::ManifestInvalid {
            path: path.to_path_buf(),
            message,
        };

        let declared_name = match raw.get("name") {
            Some(Value::String(name)) if name.trim().is_empty() => {
                return Err(invalid("`name` must not be empty".into()));
            },
            // The id is derived from the name verbatim, so padding is never stripped.
            Some(Value::String(name)) if name.trim() != name.as_str() => {
                return Err(invalid(format!(
                    "`name` must not have leading or trailing whitespace, got {name:?}"
                )));
            },
            Some(Value::String(name)) => name.clone(),
            Some(_) => return Err(invalid("`name` must be a string".into())),
            None => return Err(invalid("missing `name`".into())),
        };

        let extension_entry_points = match raw.get(HOST_KEY).and_then(|h| h.get("extensions")) {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_str().map(str::to_string).ok_or_else(|| {
                        invalid(format!(
                            "`{HOST_KEY}.extensions` entries must be strings, got {item}"
                        ))
                    })
                })
                .collect::<PluginResult<Vec<_>>>()?,
            Some(other) => {
                return Err(invalid(format!(
                    "`{HOST_KEY}.extensions` must be an array, got {other}"
                )));
            },
        };

        Ok(Self {
            declared_name,
            version: optional_string(&raw, "version"),
            extension_entry_points,
            description: optional_string(&raw, "description"),
            raw,
        })
    }

    /// Require at least one declared entry point.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::ManifestInvalid`] naming `harbor.extensions`
    /// when the list is empty.
    pub fn ensure_installable(&self, path: &Path) -> PluginResult<()> {
        if self.extension_entry_points.is_empty() {
            return Err(PluginError::ManifestInvalid {
                path: path.to_path_buf(),
                message: format!("package.json missing `{HOST_KEY}.extensions`"),
            });
        }
        Ok(())
    }
}

fn optional_string(raw: &Map<String, Value>, key: &str) -> Option<String> {
    raw.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Read `package.json` from `dir`.
///
/// # Errors
///
/// Returns [`PluginError::ManifestMissing`] if the file is absent,
/// unreadable, oversized or not a JSON object, and
/// [`PluginError::ManifestInvalid`] if a required field is malformed.
pub fn read_manifest(dir: &Path) -> PluginResult<PluginManifest> {
    let path = manifest_path(dir);
    let missing = |message: String| PluginError::ManifestMissing {
        path: dir.to_path_buf(),
        message,
    };

    let size = std::fs::metadata(&path).map_err(|e| missing(e.to_string()))?.len();
    if size > MAX_MANIFEST_SIZE {
        return Err(missing(format!(
            "manifest is {size} bytes, exceeding the {MAX_MANIFEST_SIZE} byte limit"
        )));
    }

    let content = std::fs::read_to_string(&path).map_err(|e| missing(e.to_string()))?;

    let manifest = PluginManifest::parse(&path, &content)?;
    debug!(
        path = %path.display(),
        name = %manifest.declared_name,
        entry_points = manifest.extension_entry_points.len(),
        "read plugin manifest"
    );
    Ok(manifest)
}

/// Path of the manifest inside `dir`.
#[must_use]
pub fn manifest_path(dir: &Path) -> PathBuf {
    dir.join(MANIFEST_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> PluginResult<PluginManifest> {
        PluginManifest::parse(Path::new("/pkg/package.json"), json)
    }

    #[test]
    fn parses_full_manifest() {
        let m = parse(
            r#"{
                "name": "@harbor/voice-call",
                "version": "0.0.1",
                "description": "Place calls",
                "harbor": { "extensions": ["./dist/index.js", "./dist/extra.js"] }
            }"#,
        )
        .unwrap();

        assert_eq!(m.declared_name, "@harbor/voice-call");
        assert_eq!(m.version.as_deref(), Some("0.0.1"));
        assert_eq!(m.description.as_deref(), Some("Place calls"));
        assert_eq!(
            m.extension_entry_points,
            vec!["./dist/index.js", "./dist/extra.js"]
        );
        assert!(m.raw.contains_key("harbor"));
    }

    #[test]
    fn missing_extensions_parses_but_is_not_installable() {
        let m = parse(r#"{ "name": "nope", "version": "0.0.1" }"#).unwrap();
        assert!(m.extension_entry_points.is_empty());

        let err = m.ensure_installable(Path::new("/pkg")).unwrap_err();
        assert!(matches!(err, PluginError::ManifestInvalid { .. }));
        assert!(err.to_string().contains("harbor.extensions"));
    }

    #[test]
    fn empty_extensions_is_not_installable() {
        let m = parse(r#"{ "name": "nope", "harbor": { "extensions": [] } }"#).unwrap();
        assert!(m.ensure_installable(Path::new("/pkg")).is_err());
    }

    #[test]
    fn missing_name_is_invalid() {
        let err = parse(r#"{ "harbor": { "extensions": ["a.js"] } }"#).unwrap_err();
        assert!(matches!(err, PluginError::ManifestInvalid { .. }));
        assert!(err.to_string().contains("name"));
    }

    #[test]
    fn padded_name_is_invalid() {
        for name in [" voice-call", "voice-call\n", "\t@harbor/voice-call "] {
            let json = serde_json::json!({ "name": name }).to_string();
            let err = parse(&json).unwrap_err();
            assert!(matches!(err, PluginError::ManifestInvalid { .. }), "{name:?}");
            assert!(err.to_string().contains("whitespace"), "{err}");
        }
        let err = parse(r#"{ "name": "   " }"#).unwrap_err();
        assert!(err.to_string().contains("must not be empty"), "{err}");
    }

    #[test]
    fn name_is_kept_verbatim() {
        let m = parse(r#"{ "name": "@Harbor/Voice Call" }"#).unwrap();
        assert_eq!(m.declared_name, "@Harbor/Voice Call");
    }

    #[test]
    fn non_string_name_is_invalid() {
        let err = parse(r#"{ "name": 42 }"#).unwrap_err();
        assert!(matches!(err, PluginError::ManifestInvalid { .. }));
    }

    #[test]
    fn non_array_extensions_is_invalid() {
        let err = parse(r#"{ "name": "x", "harbor": { "extensions": "index.js" } }"#).unwrap_err();
        assert!(matches!(err, PluginError::ManifestInvalid { .. }));
        assert!(err.to_string().contains("harbor.extensions"));
    }

    #[test]
    fn non_string_entry_is_invalid() {
        let err = parse(r#"{ "name": "x", "harbor": { "extensions": ["a.js", 3] } }"#).unwrap_err();
        assert!(err.to_string().contains("harbor.extensions"));
    }

    #[test]
    fn non_object_is_missing() {
        let err = parse("[1, 2, 3]").unwrap_err();
        assert!(matches!(err, PluginError::ManifestMissing { .. }));
        let err = parse("{ not json").unwrap_err();
        assert!(matches!(err, PluginError::ManifestMissing { .. }));
    }

    #[test]
    fn read_manifest_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(MANIFEST_FILE),
            r#"{ "name": "disk-plugin", "harbor": { "extensions": ["index.js"] } }"#,
        )
        .unwrap();

        let m = read_manifest(dir.path()).unwrap();
        assert_eq!(m.declared_name, "disk-plugin");
        assert_eq!(m.version, None);
    }

    #[test]
    fn oversized_manifest_is_rejected_by_size() {
        let dir = tempfile::tempdir().unwrap();
        let file = std::fs::File::create(dir.path().join(MANIFEST_FILE)).unwrap();
        file.set_len(MAX_MANIFEST_SIZE + 1).unwrap();

        let err = read_manifest(dir.path()).unwrap_err();
        assert!(matches!(err, PluginError::ManifestMissing { .. }));
        assert!(err.to_string().contains("byte limit"), "{err}");
    }

    #[test]
    fn read_manifest_absent_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_manifest(dir.path()).unwrap_err();
        assert!(matches!(err, PluginError::ManifestMissing { .. }));
    }
}
