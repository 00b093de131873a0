//! Layer merging for the embedded defaults and the user file.

/// Recursively deep-merge `overlay` into `base`.
///
/// - Tables merge recursively per-field.
/// - Scalars and arrays from the overlay **replace** the base value.
pub fn deep_merge(base: &mut toml::Value, overlay: &toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                if let Some(base_val) = base_table.get_mut(key) {
                    deep_merge(base_val, overlay_val);
                } else {
                    base_table.insert(key.clone(), overlay_val.clone());
                }
            }
        },
        (base, overlay) => {
            *base = overlay.clone();
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> toml::Value {
        toml::from_str(s).unwrap()
    }

    #[test]
    fn nested_tables_merge_per_field() {
        let mut base = parse(
            r#"
            [plugins]
            enabled = true
            extensions_dir = ""
        "#,
        );
        let overlay = parse(
            r#"
            [plugins]
            extensions_dir = "/srv/ext"
        "#,
        );

        deep_merge(&mut base, &overlay);
        assert_eq!(base["plugins"]["enabled"].as_bool(), Some(true));
        assert_eq!(base["plugins"]["extensions_dir"].as_str(), Some("/srv/ext"));
    }

    #[test]
    fn arrays_are_replaced_not_concatenated() {
        let mut base = parse(r#"paths = ["a", "b"]"#);
        let overlay = parse(r#"paths = ["c"]"#);

        deep_merge(&mut base, &overlay);
        let paths: Vec<_> = base["paths"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(toml::Value::as_str)
            .collect();
        assert_eq!(paths, vec!["c"]);
    }

    #[test]
    fn new_keys_are_inserted() {
        let mut base = parse("[plugins.entries]");
        let overlay = parse(
            r"
            [plugins.entries.voice-call]
            enabled = false
        ",
        );

        deep_merge(&mut base, &overlay);
        assert_eq!(
            base["plugins"]["entries"]["voice-call"]["enabled"].as_bool(),
            Some(false)
        );
    }
}
