//! npm package specifier parsing and validation.
//!
//! Accepts `@scope/name@version`, `@scope/name`, `name@version` and `name`.
//! Scope and name must match `[a-z0-9][a-z0-9._-]*` and the full name must
//! not exceed 214 characters.

use std::fmt;

use crate::error::{PluginError, PluginResult};

/// Maximum npm package name length (scope + name combined).
const MAX_PACKAGE_NAME_LENGTH: usize = 214;

/// A parsed npm package specifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NpmSpec {
    /// Optional scope (without the `@` prefix).
    pub scope: Option<String>,
    /// Package name (without scope).
    pub name: String,
    /// Optional version or dist-tag (e.g. `"1.0.0"`, `"latest"`).
    pub version: Option<String>,
}

impl NpmSpec {
    /// Parse a package specifier.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::InvalidSpecifier`] if the structure is wrong and
    /// [`PluginError::InvalidPackageName`] if a name component breaks npm's
    /// naming rules.
    pub fn parse(raw: &str) -> PluginResult<Self> {
        let raw = raw.trim();
        let malformed = || PluginError::InvalidSpecifier(raw.to_string());

        if raw.is_empty() {
            return Err(malformed());
        }

        let (scope, rest) = match raw.strip_prefix('@') {
            Some(scoped) => {
                let (scope, rest) = scoped.split_once('/').ok_or_else(malformed)?;
                if scope.is_empty() || scope.starts_with('@') {
                    return Err(malformed());
                }
                (Some(scope), rest)
            },
            None => (None, raw),
        };

        let (name, version) = match rest.split_once('@') {
            Some((name, version)) => {
                if version.is_empty() {
                    return Err(malformed());
                }
                (name, Some(version))
            },
            None => (rest, None),
        };
        if name.is_empty() {
            return Err(malformed());
        }

        let spec = Self {
            scope: scope.map(str::to_string),
            name: name.to_string(),
            version: version.map(str::to_string),
        };
        spec.validate()?;
        Ok(spec)
    }

    fn validate(&self) -> PluginResult<()> {
        let full_name = self.full_name();
        if full_name.len() > MAX_PACKAGE_NAME_LENGTH {
            return Err(PluginError::InvalidPackageName {
                name: full_name,
                reason: format!("exceeds maximum length of {MAX_PACKAGE_NAME_LENGTH} characters"),
            });
        }
        if let Some(scope) = &self.scope {
            check_component(scope, "scope")?;
        }
        check_component(&self.name, "name")
    }

    /// Full package name including scope (e.g. `@scope/name` or `name`).
    #[must_use]
    pub fn full_name(&self) -> String {
        match &self.scope {
            Some(scope) => format!("@{scope}/{}", self.name),
            None => self.name.clone(),
        }
    }

    /// Path segment for registry metadata requests (`@scope%2Fname` or `name`).
    ///
    /// Components are already restricted to URL-safe characters by
    /// validation.
    #[must_use]
    pub fn registry_path(&self) -> String {
        match &self.scope {
            Some(scope) => format!("@{scope}%2F{}", self.name),
            None => self.name.clone(),
        }
    }

    /// Tarball file name (`<name>-<version>.tgz`).
    #[must_use]
    pub fn tarball_file_name(&self, resolved_version: &str) -> String {
        format!("{}-{resolved_version}.tgz", self.name)
    }
}

fn check_component(value: &str, kind: &str) -> PluginResult<()> {
    let invalid = |reason: String| PluginError::InvalidPackageName {
        name: value.to_string(),
        reason,
    };

    let mut chars = value.chars();
    let Some(first) = chars.next() else {
        return Err(invalid(format!("{kind} cannot be empty")));
    };
    if !(first.is_ascii_lowercase() || first.is_ascii_digit()) {
        return Err(invalid(format!(
            "{kind} must start with a lowercase letter or digit"
        )));
    }
    if let Some(bad) =
        chars.find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | '-')))
    {
        return Err(invalid(format!(
            "{kind} contains invalid character '{bad}' (allowed: a-z, 0-9, '.', '_', '-')"
        )));
    }
    Ok(())
}

impl fmt::Display for NpmSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name())?;
        if let Some(version) = &self.version {
            write!(f, "@{version}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scoped_with_version() {
        let spec = NpmSpec::parse("@harbor/voice-call@1.0.0").unwrap();
        assert_eq!(spec.scope.as_deref(), Some("harbor"));
        assert_eq!(spec.name, "voice-call");
        assert_eq!(spec.version.as_deref(), Some("1.0.0"));
        assert_eq!(spec.to_string(), "@harbor/voice-call@1.0.0");
        assert_eq!(spec.registry_path(), "@harbor%2Fvoice-call");
    }

    #[test]
    fn unscoped_forms() {
        let bare = NpmSpec::parse("  voice-call ").unwrap();
        assert_eq!(bare.scope, None);
        assert_eq!(bare.version, None);
        assert_eq!(bare.full_name(), "voice-call");

        let tagged = NpmSpec::parse("voice-call@latest").unwrap();
        assert_eq!(tagged.version.as_deref(), Some("latest"));
        assert_eq!(tagged.tarball_file_name("2.0.0"), "voice-call-2.0.0.tgz");
    }

    #[test]
    fn structural_errors() {
        for raw in ["", "@", "@/x", "@@foo/bar", "@scope/", "@scope", "name@", "@s/n@"] {
            let err = NpmSpec::parse(raw).unwrap_err();
            assert!(
                matches!(err, PluginError::InvalidSpecifier(_)),
                "expected InvalidSpecifier for {raw:?}, got {err:?}"
            );
        }
    }

    #[test]
    fn naming_rule_errors() {
        for raw in ["Voice-Call", ".hidden", "pkg/../../etc/passwd", "_under", "@Scope/x"] {
            let err = NpmSpec::parse(raw).unwrap_err();
            assert!(
                err.to_string().contains("invalid package name"),
                "expected naming error for {raw:?}, got {err}"
            );
        }
    }

    #[test]
    fn overly_long_name() {
        let long = "a".repeat(MAX_PACKAGE_NAME_LENGTH + 1);
        assert!(NpmSpec::parse(&long).unwrap_err().to_string().contains("maximum length"));
    }

    #[test]
    fn allowed_punctuation() {
        for raw in ["my-pkg", "my_pkg", "my.pkg", "0pkg", "@my-scope/my.pkg@1.0.0-beta.1"] {
            NpmSpec::parse(raw).unwrap();
        }
    }
}
