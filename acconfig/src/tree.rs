//! Operations on the YAML document behind [`Config`](crate::Config).
//!
//! Keys are lower-cased when the document is loaded, so every lookup
//! lower-cases the requested segment as well.

use anyhow::{Result, bail};
use serde_yaml::{Mapping, Value};

fn key(segment: &str) -> Value {
    Value::String(segment.to_lowercase())
}

/// Follows `path` from `root`.
pub(crate) fn lookup<'a>(root: &'a Value, path: &[&str]) -> Result<&'a Value> {
    let mut node = root;
    for (depth, segment) in path.iter().enumerate() {
        let Value::Mapping(map) = node else {
            bail!("{} is a value, not a section", path[..depth].join("."));
        };
        match map.get(key(segment)) {
            Some(child) => node = child,
            None => bail!("No configuration entry at {}", path[..=depth].join(".")),
        }
    }
    Ok(node)
}

/// Stores `value` at `path`, creating intermediate sections. A scalar found
/// where a section is needed is replaced by an empty section.
pub(crate) fn insert(root: &mut Value, path: &[&str], value: Value) -> Result<()> {
    let Some((last, parents)) = path.split_last() else {
        *root = value;
        return Ok(());
    };

    let mut node = root;
    for segment in parents {
        let Value::Mapping(map) = node else {
            bail!("Cannot descend into '{}': parent is not a section", segment);
        };
        let child = map
            .entry(key(segment))
            .or_insert_with(|| Value::Mapping(Mapping::new()));
        if !child.is_mapping() {
            *child = Value::Mapping(Mapping::new());
        }
        node = child;
    }

    match node {
        Value::Mapping(map) => {
            map.insert(key(last), value);
            Ok(())
        }
        _ => bail!("Cannot set '{}': parent is not a section", last),
    }
}

/// Overlays `overlay` onto `base`: sections are merged key by key, anything
/// else in `overlay` replaces what `base` had.
pub(crate) fn merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
            for (k, v) in overlay_map {
                if let Some(existing) = base_map.get_mut(&k) {
                    merge(existing, v);
                } else {
                    base_map.insert(k, v);
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

/// Recursively lower-cases every string key.
pub(crate) fn lowercase_keys(value: Value) -> Value {
    match value {
        Value::Mapping(map) => Value::Mapping(
            map.into_iter()
                .map(|(k, v)| {
                    let k = match k {
                        Value::String(s) => Value::String(s.to_lowercase()),
                        other => other,
                    };
                    (k, lowercase_keys(v))
                })
                .collect(),
        ),
        Value::Sequence(items) => Value::Sequence(items.into_iter().map(lowercase_keys).collect()),
        other => other,
    }
}

/// Reads an environment value as YAML (`42`, `true`, `[a, b]`...), falling
/// back to a plain string.
pub(crate) fn parse_scalar(raw: &str) -> Value {
    serde_yaml::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Selects the variables starting with `prefix` and turns
/// `PREFIX__SECTION__KEY=value` into `(["SECTION", "KEY"], value)`.
pub(crate) fn env_overrides(
    prefix: &str,
    vars: impl IntoIterator<Item = (String, String)>,
) -> Vec<(String, Vec<String>, Value)> {
    vars.into_iter()
        .filter_map(|(name, raw)| {
            let path = name
                .strip_prefix(prefix)?
                .split("__")
                .map(str::to_string)
                .collect::<Vec<_>>();
            let value = parse_scalar(&raw);
            Some((name, path, value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_yaml::Number;

    use super::*;

    fn yaml(text: &str) -> Value {
        serde_yaml::from_str(text).unwrap()
    }

    #[test]
    fn test_merge_keeps_untouched_defaults() {
        let mut base = yaml("player:\n  backend: simulated\n  poll_interval_ms: 1000\n");
        merge(&mut base, yaml("player:\n  poll_interval_ms: 250\n"));

        assert_eq!(
            lookup(&base, &["player", "backend"]).unwrap(),
            &Value::String("simulated".into())
        );
        assert_eq!(
            lookup(&base, &["player", "poll_interval_ms"]).unwrap(),
            &Value::Number(Number::from(250))
        );
    }

    #[test]
    fn test_lookup_is_case_insensitive_after_lowercasing() {
        let doc = lowercase_keys(yaml("Player:\n  Poll_Interval_MS: 10\n"));
        assert!(lookup(&doc, &["PLAYER", "poll_interval_ms"]).is_ok());
        assert!(lookup(&doc, &["player", "poll_interval_ms", "deeper"]).is_err());
        assert!(lookup(&doc, &["catalog"]).is_err());
    }

    #[test]
    fn test_insert_creates_and_replaces_sections() {
        let mut doc = yaml("catalog: none\n");
        insert(&mut doc, &["catalog", "manifest"], Value::String("a.json".into())).unwrap();
        insert(&mut doc, &["host", "logger", "min_level"], Value::String("DEBUG".into())).unwrap();

        assert_eq!(
            lookup(&doc, &["catalog", "manifest"]).unwrap(),
            &Value::String("a.json".into())
        );
        assert_eq!(
            lookup(&doc, &["host", "logger", "min_level"]).unwrap(),
            &Value::String("DEBUG".into())
        );
    }

    #[test]
    fn test_parse_scalar() {
        assert_eq!(parse_scalar("42"), Value::Number(Number::from(42)));
        assert_eq!(parse_scalar("true"), Value::Bool(true));
        assert_eq!(parse_scalar("rodio"), Value::String("rodio".into()));
    }

    #[test]
    fn test_env_overrides_filter_by_prefix() {
        let vars = vec![
            ("APP__PLAYER__BACKEND".to_string(), "rodio".to_string()),
            ("HOME".to_string(), "/root".to_string()),
        ];
        let overrides = env_overrides("APP__", vars);
        assert_eq!(overrides.len(), 1);
        assert_eq!(overrides[0].1, vec!["PLAYER", "BACKEND"]);
        assert_eq!(overrides[0].2, Value::String("rodio".into()));
    }
}
