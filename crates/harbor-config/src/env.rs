//! Environment variable fallbacks.
//!
//! Environment variables only fill fields the config files left unset or
//! empty. They never override an explicit value.

use std::collections::HashMap;

/// Prefix of every environment variable the config layer reads.
const ENV_PREFIX: &str = "HARBOR_";

/// Mapping of environment variable name to dotted config field.
const ENV_FALLBACKS: &[(&str, &str)] = &[
    ("HARBOR_LOG", "logging.level"),
    ("HARBOR_EXTENSIONS_DIR", "plugins.extensions_dir"),
    ("HARBOR_LOG_DIR", "logging.directory"),
];

/// Snapshot the `HARBOR_*` variables from the process environment.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars()
        .filter(|(k, _)| k.starts_with(ENV_PREFIX))
        .collect()
}

/// Apply env var fallbacks to `merged` for fields that are unset or empty.
///
/// `logging.level` ships with a non-empty default, so `HARBOR_LOG` replaces
/// it whenever the user file did not set one; `user_set` lists the dotted
/// fields the user file provided explicitly.
///
/// Returns the number of fields filled from the environment.
pub fn apply_env_fallbacks(
    merged: &mut toml::Value,
    user_set: &[String],
    env_vars: &HashMap<String, String>,
) -> usize {
    let mut applied: usize = 0;
    for (var, field) in ENV_FALLBACKS {
        let Some(value) = env_vars.get(*var).filter(|v| !v.trim().is_empty()) else {
            continue;
        };
        if user_set.iter().any(|f| f == field) {
            continue;
        }
        if set_string_field(merged, field, value) {
            applied = applied.saturating_add(1);
        }
    }
    applied
}

/// Dotted paths of every string leaf in `value` that is non-empty.
#[must_use]
pub fn non_empty_string_fields(value: &toml::Value) -> Vec<String> {
    let mut out = Vec::new();
    collect_fields(value, "", &mut out);
    out
}

fn collect_fields(value: &toml::Value, prefix: &str, out: &mut Vec<String>) {
    match value {
        toml::Value::Table(table) => {
            for (key, child) in table {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                collect_fields(child, &path, out);
            }
        },
        toml::Value::String(s) if !s.is_empty() => out.push(prefix.to_owned()),
        _ => {},
    }
}

fn set_string_field(root: &mut toml::Value, dotted: &str, value: &str) -> bool {
    let mut parts: Vec<&str> = dotted.split('.').collect();
    let Some(leaf) = parts.pop() else {
        return false;
    };

    let mut cursor = root;
    for part in parts {
        let Some(table) = cursor.as_table_mut() else {
            return false;
        };
        cursor = table
            .entry(part.to_owned())
            .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
    }

    match cursor.as_table_mut() {
        Some(table) => {
            table.insert(leaf.to_owned(), toml::Value::String(value.to_owned()));
            true
        },
        None => false,
    }
}
