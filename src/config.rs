//! The ambient `Config` facade: loading YAML/JSON into a `ConfigValue`
//! tree, combining multiple sources, and driving the resolver.
//!
//! This is deliberately small: no lexer, no full grammar, no include
//! loader, no typed getter surface (duration/size parsing). What remains
//! here is just enough to turn source text into the tree the resolver
//! core actually operates on.

use indexmap::IndexMap;
use serde::Deserialize;
use std::path::Path as FsPath;

use crate::error::{Error, Result};
use crate::origin::Origin;
use crate::path::Path as KeyPath;
use crate::resolver::{self, ResolveOptions};
use crate::substitution;
use crate::value::{merge_objects, ConfigValue, ConfigValueKind, ObjectValue};

/// The shape serde deserializes YAML/JSON text into before it is lifted
/// into `ConfigValue` (which additionally carries `NodeId`, `Origin`, and
/// a cached resolved-status). `untagged` plus declaring `Integer` ahead of
/// `Float` keeps e.g. `5` deserializing as an integer and `5.0` as a float.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Sequence(Vec<RawValue>),
    Mapping(IndexMap<String, RawValue>),
}

fn raw_to_config_value(raw: RawValue, origin: &Origin) -> Result<ConfigValue> {
    Ok(match raw {
        RawValue::Null => ConfigValue::null(origin.clone()),
        RawValue::Bool(b) => ConfigValue::bool(b, origin.clone()),
        RawValue::Integer(i) => ConfigValue::integer(i, origin.clone()),
        RawValue::Float(f) => ConfigValue::float(f, origin.clone()),
        // Leaf strings are scanned for `${...}`/`${?...}` here: this is
        // the one place a plain string becomes either a literal or a
        // Reference/Concatenation node.
        RawValue::String(s) => substitution::scan(&s, origin.clone()).map_err(Error::parse)?,
        RawValue::Sequence(items) => {
            let items = items
                .into_iter()
                .map(|item| raw_to_config_value(item, origin))
                .collect::<Result<Vec<_>>>()?;
            ConfigValue::list(items, origin.clone())
        }
        RawValue::Mapping(map) => {
            let mut entries = IndexMap::with_capacity(map.len());
            for (key, value) in map {
                entries.insert(key, raw_to_config_value(value, origin)?);
            }
            ConfigValue::object(ObjectValue::new(entries), origin.clone())
        }
    })
}

/// Deep merge of two already-converted trees, per ADR-004: mappings merge
/// recursively (`merge_objects`), a `null` entry removes a key, and
/// anything else is last-writer-wins (`overlay` replaces `base` outright,
/// including on a type mismatch). This is the ambient facade's merge for
/// combining whole parsed documents; it is a plain eager structural merge
/// and does not build `DelayedMerge` stacks — that mechanism exists for
/// the resolver to walk *unresolved* override chains an include loader
/// would otherwise produce, and is exercised directly in `resolver.rs`'s
/// tests instead.
fn merge_values(base: ConfigValue, overlay: ConfigValue) -> ConfigValue {
    let both_objects = matches!(
        (&base.kind, &overlay.kind),
        (ConfigValueKind::Object(_), ConfigValueKind::Object(_))
    );
    if !both_objects {
        return overlay;
    }
    let origin = overlay.origin.clone();
    match (base.kind, overlay.kind) {
        (ConfigValueKind::Object(b), ConfigValueKind::Object(o)) => {
            ConfigValue::object(merge_objects(b, o), origin)
        }
        _ => unreachable!("checked both_objects above"),
    }
}

/// The main configuration container: an unresolved (or resolved, after
/// calling [`Config::resolve`]) `ConfigValue` tree.
#[derive(Debug, Clone)]
pub struct Config {
    root: ConfigValue,
}

impl Config {
    /// Wraps an already-built tree, e.g. one assembled directly for tests.
    pub fn new(root: ConfigValue) -> Self {
        Self { root }
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Self::from_yaml_named(yaml, "<yaml>")
    }

    pub fn from_yaml_file(path: impl AsRef<FsPath>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::io(format!("failed to read '{}': {}", path.display(), e)))?;
        Self::from_yaml_named(&content, &path.display().to_string())
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_json_named(json, "<json>")
    }

    pub fn from_json_file(path: impl AsRef<FsPath>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::io(format!("failed to read '{}': {}", path.display(), e)))?;
        Self::from_json_named(&content, &path.display().to_string())
    }

    fn from_yaml_named(yaml: &str, name: &str) -> Result<Self> {
        let raw: RawValue = serde_yaml::from_str(yaml)?;
        let root = raw_to_config_value(raw, &Origin::new(name))?;
        Ok(Self { root })
    }

    fn from_json_named(json: &str, name: &str) -> Result<Self> {
        let raw: RawValue = serde_json::from_str(json)?;
        let root = raw_to_config_value(raw, &Origin::new(name))?;
        Ok(Self { root })
    }

    /// Merges `other` on top of `self` per ADR-004 (see `merge_values`).
    pub fn merge(&mut self, other: Config) {
        let base = std::mem::replace(&mut self.root, ConfigValue::null(Origin::unknown()));
        self.root = merge_values(base, other.root);
    }

    /// Runs the substitution resolver over this config's tree, returning
    /// a new, fully-resolved `Config`. Does not mutate `self`.
    pub fn resolve(&self, options: ResolveOptions) -> Result<Config> {
        let root = resolver::resolve(self.root.clone(), options)?;
        Ok(Config { root })
    }

    /// Looks up a dotted path against this config's current tree (raw if
    /// `resolve()` hasn't been called, resolved if it has).
    pub fn get(&self, path: &str) -> Result<&ConfigValue> {
        let key_path = KeyPath::parse(path)?;
        let mut current = &self.root;
        for segment in key_path.segments() {
            current = current
                .as_object()
                .and_then(|obj| obj.get(segment))
                .ok_or_else(|| Error::path_not_found(path))?;
        }
        Ok(current)
    }

    /// The raw (possibly unresolved) root tree.
    pub fn root(&self) -> &ConfigValue {
        &self.root
    }
}
