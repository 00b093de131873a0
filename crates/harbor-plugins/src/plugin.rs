//! Plugin identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{PluginError, PluginResult};

/// Filesystem-safe plugin identifier, unique within the extensions directory.
///
/// Derived from the manifest's declared package name: `@scope/name` becomes
/// `name`, anything else is used verbatim. The id doubles as the directory
/// name under the extensions directory, so it must not be empty, contain a
/// path separator, or be `.`/`..`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct PluginId(String);

/// Deserialize with validation so a crafted ledger cannot smuggle in a
/// traversal payload.
impl<'de> Deserialize<'de> for PluginId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::new(s).map_err(serde::de::Error::custom)
    }
}

impl PluginId {
    /// Create a `PluginId` from an already-derived id string.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::InvalidId`] if the string is not a safe
    /// directory name.
    pub fn new(id: impl Into<String>) -> PluginResult<Self> {
        let id = id.into();
        validate(&id)?;
        Ok(Self(id))
    }

    /// Derive the id from a declared package name.
    ///
    /// ```
    /// use harbor_plugins::PluginId;
    ///
    /// assert_eq!(PluginId::from_package_name("@acme/voice-call").unwrap().as_str(), "voice-call");
    /// assert_eq!(PluginId::from_package_name("voice-call").unwrap().as_str(), "voice-call");
    /// assert!(PluginId::from_package_name("@acme/").is_err());
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::InvalidId`] if the derived id is empty,
    /// contains `/` or `\`, or is `.`/`..`.
    pub fn from_package_name(declared_name: &str) -> PluginResult<Self> {
        let derived = match declared_name
            .strip_prefix('@')
            .and_then(|scoped| scoped.split_once('/'))
        {
            Some((_scope, name)) => name,
            None => declared_name,
        };
        Self::new(derived).map_err(|e| match e {
            PluginError::InvalidId(reason) => {
                PluginError::InvalidId(format!("{reason} (derived from '{declared_name}')"))
            },
            other => other,
        })
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check whether a string is a valid plugin id without constructing one.
    #[must_use]
    pub fn is_valid_id(id: &str) -> bool {
        validate(id).is_ok()
    }
}

fn validate(id: &str) -> PluginResult<()> {
    if id.is_empty() {
        return Err(PluginError::InvalidId("plugin id must not be empty".into()));
    }
    if id.contains('/') || id.contains('\\') {
        return Err(PluginError::InvalidId(format!(
            "plugin id must not contain path separators, got: {id}"
        )));
    }
    if id == "." || id == ".." {
        return Err(PluginError::InvalidId(format!(
            "plugin id must not be a relative path component, got: {id}"
        )));
    }
    Ok(())
}

impl fmt::Display for PluginId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PluginId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn scoped_name_drops_scope() {
        let id = PluginId::from_package_name("@harbor/voice-call").unwrap();
        assert_eq!(id.as_str(), "voice-call");
    }

    #[test]
    fn unscoped_name_is_verbatim() {
        let id = PluginId::from_package_name("Weird Name_1").unwrap();
        assert_eq!(id.as_str(), "Weird Name_1");
    }

    #[test]
    fn at_without_slash_is_verbatim() {
        let id = PluginId::from_package_name("@lonely").unwrap();
        assert_eq!(id.as_str(), "@lonely");
    }

    #[test]
    fn rejects_unsafe_ids() {
        for name in ["", "@scope/", "@scope/a/b", "a/b", "a\\b", ".", "..", "@scope/.."] {
            let err = PluginId::from_package_name(name).unwrap_err();
            assert!(
                matches!(err, PluginError::InvalidId(_)),
                "expected InvalidId for {name:?}, got {err:?}"
            );
        }
    }

    #[test]
    fn error_mentions_declared_name() {
        let err = PluginId::from_package_name("@scope/..").unwrap_err();
        assert!(err.to_string().contains("@scope/.."));
    }

    #[test]
    fn deserialize_rejects_traversal() {
        let result: Result<PluginId, _> = serde_json::from_str("\"../etc\"");
        assert!(result.is_err());
        let ok: PluginId = serde_json::from_str("\"voice-call\"").unwrap();
        assert_eq!(ok.as_str(), "voice-call");
    }

    proptest! {
        #[test]
        fn unscoped_names_map_to_themselves(name in "[a-zA-Z0-9_][a-zA-Z0-9._ -]{0,40}") {
            prop_assume!(name != "." && name != "..");
            let id = PluginId::from_package_name(&name).unwrap();
            prop_assert_eq!(id.as_str(), name.as_str());
        }

        #[test]
        fn scoped_names_map_to_their_suffix(
            scope in "[a-z0-9][a-z0-9-]{0,10}",
            name in "[a-z0-9][a-z0-9._-]{0,20}",
        ) {
            let id = PluginId::from_package_name(&format!("@{scope}/{name}")).unwrap();
            prop_assert_eq!(id.as_str(), name.as_str());
        }
    }
}
