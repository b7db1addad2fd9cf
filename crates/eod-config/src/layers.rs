use anyhow::{Context, Result};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::path::Path;

use crate::typed::EodConfig;

/// The merged tree plus its identity.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// sha256 of `canonical_json`, lowercase hex.
    pub config_hash: String,
    /// Compact JSON with object keys in sorted order.
    pub canonical_json: String,
    pub config_json: Value,
}

impl LoadedConfig {
    fn from_tree(tree: Value) -> Result<Self> {
        // serde_json::Map is BTreeMap-backed here, so keys come out sorted
        let canonical_json = serde_json::to_string(&tree).context("serialize merged config")?;
        Ok(Self {
            config_hash: sha256_hex(canonical_json.as_bytes()),
            canonical_json,
            config_json: tree,
        })
    }

    /// Typed view with defaults for every absent key.
    pub fn typed(&self) -> Result<EodConfig> {
        EodConfig::from_json(&self.config_json)
    }
}

/// Read and merge `paths` in order; later files win.
pub fn load_layered_yaml<P: AsRef<Path>>(paths: &[P]) -> Result<LoadedConfig> {
    let mut tree = Value::Object(Map::new());
    for path in paths.iter().map(AsRef::as_ref) {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config layer {}", path.display()))?;
        let layer =
            parse_layer(&text).with_context(|| format!("parse config layer {}", path.display()))?;
        overlay(&mut tree, layer);
    }
    LoadedConfig::from_tree(tree)
}

/// Same as [`load_layered_yaml`] over in-memory documents.
pub fn load_layered_yaml_from_strings(yaml_docs: &[&str]) -> Result<LoadedConfig> {
    let mut tree = Value::Object(Map::new());
    for (i, text) in yaml_docs.iter().enumerate() {
        let layer = parse_layer(text).with_context(|| format!("parse config layer #{}", i + 1))?;
        overlay(&mut tree, layer);
    }
    LoadedConfig::from_tree(tree)
}

/// YAML text as a JSON value. An empty document yields `Null`.
fn parse_layer(text: &str) -> Result<Value> {
    let yaml: serde_yaml::Value = serde_yaml::from_str(text).context("invalid yaml")?;
    serde_json::to_value(yaml).context("yaml value has no json form")
}

/// Objects merge key by key; anything else in `layer` replaces the slot.
/// A `Null` layer leaves `base` untouched.
fn overlay(base: &mut Value, layer: Value) {
    match (base, layer) {
        (_, Value::Null) => {}
        (Value::Object(into), Value::Object(from)) => {
            for (key, val) in from {
                if val.is_object() {
                    if let Some(slot) = into.get_mut(&key) {
                        overlay(slot, val);
                        continue;
                    }
                }
                into.insert(key, val);
            }
        }
        (slot, other) => *slot = other,
    }
}

/// Lowercase hex SHA-256 of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
