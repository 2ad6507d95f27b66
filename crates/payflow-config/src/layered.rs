use anyhow::{Context, Result};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;

/// Load + merge YAML files in order, then canonicalize to JSON and hash.
/// Later files override earlier files via deep-merge.
pub fn load_layered_yaml(paths: &[&str]) -> Result<LoadedConfig> {
    let mut merged = Value::Object(Default::default());

    for p in paths {
        let s = fs::read_to_string(p).with_context(|| format!("read config: {p}"))?;
        let yaml_val: serde_yaml::Value =
            serde_yaml::from_str(&s).with_context(|| format!("parse yaml: {p}"))?;
        let json_val = serde_json::to_value(yaml_val).context("yaml->json conversion failed")?;
        deep_merge(&mut merged, json_val);
    }

    let canonical = canonicalize_json(&merged);

    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    let hash = hex::encode(hasher.finalize());

    Ok(LoadedConfig {
        config_json: serde_json::from_str(&canonical).context("canonical json parse failed")?,
        canonical_json: canonical,
        config_hash: hash,
    })
}

/// Apply `PAYFLOW_*`-prefixed environment variable overrides on top of an
/// already-merged config. Dotted keys (`PAYFLOW_PDR__MAX_PARALLELISM`) map
/// to nested `pdr.max_parallelism`, mirroring the layered-YAML deep-merge
/// semantics so env overrides behave like one more layer.
pub fn apply_env_overrides(base: &mut Value, vars: impl IntoIterator<Item = (String, String)>) {
    for (key, val) in vars {
        let Some(rest) = key.strip_prefix("PAYFLOW_") else {
            continue;
        };
        let path: Vec<&str> = rest.split("__").collect();
        set_path(base, &path, coerce_scalar(&val));
    }
}

/// Best-effort scalar coercion so an env-var string lands in the config JSON
/// as the same type a YAML author would have written (`"16"` -> `16`,
/// `"true"` -> `true`), matching what `serde_json::from_value` expects when
/// deserializing into a typed struct.
fn coerce_scalar(raw: &str) -> Value {
    if let Ok(i) = raw.parse::<i64>() {
        return Value::from(i);
    }
    if let Ok(f) = raw.parse::<f64>() {
        return Value::from(f);
    }
    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(raw.to_string()),
    }
}

fn set_path(root: &mut Value, path: &[&str], val: Value) {
    if path.is_empty() {
        return;
    }
    if !root.is_object() {
        *root = Value::Object(Default::default());
    }
    let map = root.as_object_mut().expect("forced to object above");
    let key = path[0].to_ascii_lowercase();
    if path.len() == 1 {
        map.insert(key, val);
    } else {
        let entry = map.entry(key).or_insert_with(|| Value::Object(Default::default()));
        set_path(entry, &path[1..], val);
    }
}

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config_json: Value,
    pub canonical_json: String,
    pub config_hash: String,
}

/// Deep-merge: objects merge recursively; arrays replaced; scalars overwritten.
fn deep_merge(dst: &mut Value, src: Value) {
    match (dst, src) {
        (Value::Object(dst_map), Value::Object(src_map)) => {
            for (k, v) in src_map {
                match dst_map.get_mut(&k) {
                    Some(existing) => deep_merge(existing, v),
                    None => {
                        dst_map.insert(k, v);
                    }
                }
            }
        }
        (dst_slot, src_val) => {
            *dst_slot = src_val;
        }
    }
}

/// Canonicalize JSON by sorting all object keys recursively and emitting compact JSON.
fn canonicalize_json(v: &Value) -> String {
    let sorted = sort_keys(v);
    serde_json::to_string(&sorted).expect("json serialization must not fail")
}

fn sort_keys(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut keys: Vec<_> = map.keys().cloned().collect();
            keys.sort();
            let mut new = serde_json::Map::new();
            for k in keys {
                new.insert(k.clone(), sort_keys(&map[&k]));
            }
            Value::Object(new)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sort_keys).collect()),
        _ => v.clone(),
    }
}
