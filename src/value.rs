//! The resolver's tree type: `ConfigValue`.
//!
//! `ConfigValue` is the tagged variant the whole crate resolves over. Every
//! node carries a stable `NodeId` (assigned once, at construction, from a
//! process-wide counter) so that memoization and cycle detection can use
//! object identity without relying on pointers or structural hashing —
//! two clones of the same originally-parsed node keep sharing an identity,
//! while two independently-built nodes with identical content do not.
//!
//! Resolved status is the conjunction of a composite's children and is
//! cached at construction rather than recomputed on each check.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;

use crate::origin::Origin;
use crate::substitution::SubstitutionExpression;

pub type NodeId = u64;

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

fn next_node_id() -> NodeId {
    NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed)
}

/// A numeric leaf. Kept as a tagged integer/float pair, not a bare `f64`,
/// so concatenation stringification round-trips integers without a
/// trailing `.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Integer(i64),
    Float(f64),
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Integer(i) => write!(f, "{}", i),
            Number::Float(n) => write!(f, "{}", n),
        }
    }
}

/// An object node: key order is the insertion order of the last-winning
/// merge, preserved for rendering but not significant for lookup.
#[derive(Debug, Clone)]
pub struct ObjectValue {
    pub entries: IndexMap<String, ConfigValue>,
    /// When true, this object does not fall through to lower-priority
    /// layers in an enclosing `DelayedMerge` stack for keys it lacks.
    pub ignores_fallbacks: bool,
}

impl ObjectValue {
    pub fn new(entries: IndexMap<String, ConfigValue>) -> Self {
        Self {
            entries,
            ignores_fallbacks: false,
        }
    }

    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.entries.get(key)
    }

    fn all_resolved(&self) -> bool {
        self.entries.values().all(|v| v.resolved)
    }
}

/// Deep merge of two objects: `overlay` wins on conflicting keys, a key
/// present only in `overlay` is added, and a key absent from `overlay`
/// but present in `base` is kept. An explicit `null` in `overlay` removes
/// the key. Shared by the resolver's object-concatenation join and by the
/// ambient `Config` facade's ADR-004 merge.
pub fn merge_objects(mut base: ObjectValue, overlay: ObjectValue) -> ObjectValue {
    for (key, overlay_value) in overlay.entries {
        if overlay_value.is_null() {
            base.entries.shift_remove(&key);
            continue;
        }
        if let Some(base_value) = base.entries.get_mut(&key) {
            let taken = std::mem::replace(base_value, ConfigValue::null(Origin::unknown()));
            *base_value = match (taken.kind, overlay_value.kind) {
                (ConfigValueKind::Object(b), ConfigValueKind::Object(o)) => {
                    ConfigValue::object(merge_objects(b, o), overlay_value.origin)
                }
                (_, other) => ConfigValue::new(other, overlay_value.origin),
            };
        } else {
            base.entries.insert(key, overlay_value);
        }
    }
    base.ignores_fallbacks = base.ignores_fallbacks || overlay.ignores_fallbacks;
    base
}

/// A broad shape used to check concatenation/merge compatibility without
/// matching on the full variant set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueCategory {
    Scalar,
    List,
    Object,
}

#[derive(Debug, Clone)]
pub enum ConfigValueKind {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    List(Vec<ConfigValue>),
    Object(ObjectValue),
    /// An unresolved `${...}`/`${?...}`. `prefix_length` counts how many
    /// path segments were prepended when this reference was inherited
    /// from an included file, so lookups fall back to the including
    /// file's scope when the prefixed path misses.
    Reference(SubstitutionExpression, usize),
    /// Textual juxtaposition of values (`a ${b} c`).
    Concatenation(Vec<ConfigValue>),
    /// An unresolved override stack, top priority first.
    DelayedMerge(Vec<ConfigValue>),
    /// Same as `DelayedMerge`, but the eventual result is known to be an
    /// object — relevant to `ResolveSource` lookup, which must be able to
    /// walk into it before it is fully resolved.
    DelayedMergeObject(Vec<ConfigValue>),
}

#[derive(Debug, Clone)]
pub struct ConfigValue {
    pub id: NodeId,
    pub origin: Origin,
    pub kind: ConfigValueKind,
    /// Cached at construction: true iff this value transitively contains
    /// no substitutions, concatenations, or delayed merges.
    pub resolved: bool,
}

fn is_resolved(kind: &ConfigValueKind) -> bool {
    match kind {
        ConfigValueKind::Null
        | ConfigValueKind::Bool(_)
        | ConfigValueKind::Number(_)
        | ConfigValueKind::String(_) => true,
        ConfigValueKind::List(items) => items.iter().all(|v| v.resolved),
        ConfigValueKind::Object(obj) => obj.all_resolved(),
        // These always need at least one more resolution step, even when
        // every child already happens to be resolved: the step is what
        // performs the lookup, join, or stack-walk that produces the
        // final leaf/list/object.
        ConfigValueKind::Reference(..)
        | ConfigValueKind::Concatenation(_)
        | ConfigValueKind::DelayedMerge(_)
        | ConfigValueKind::DelayedMergeObject(_) => false,
    }
}

impl ConfigValue {
    fn new(kind: ConfigValueKind, origin: Origin) -> Self {
        let resolved = is_resolved(&kind);
        Self {
            id: next_node_id(),
            origin,
            kind,
            resolved,
        }
    }

    pub fn null(origin: Origin) -> Self {
        Self::new(ConfigValueKind::Null, origin)
    }

    pub fn bool(b: bool, origin: Origin) -> Self {
        Self::new(ConfigValueKind::Bool(b), origin)
    }

    pub fn number(n: Number, origin: Origin) -> Self {
        Self::new(ConfigValueKind::Number(n), origin)
    }

    pub fn integer(i: i64, origin: Origin) -> Self {
        Self::number(Number::Integer(i), origin)
    }

    pub fn float(f: f64, origin: Origin) -> Self {
        Self::number(Number::Float(f), origin)
    }

    pub fn string(s: impl Into<String>, origin: Origin) -> Self {
        Self::new(ConfigValueKind::String(s.into()), origin)
    }

    pub fn list(items: Vec<ConfigValue>, origin: Origin) -> Self {
        Self::new(ConfigValueKind::List(items), origin)
    }

    pub fn object(obj: ObjectValue, origin: Origin) -> Self {
        Self::new(ConfigValueKind::Object(obj), origin)
    }

    pub fn reference(expr: SubstitutionExpression, prefix_length: usize, origin: Origin) -> Self {
        Self::new(ConfigValueKind::Reference(expr, prefix_length), origin)
    }

    pub fn concatenation(pieces: Vec<ConfigValue>, origin: Origin) -> Self {
        Self::new(ConfigValueKind::Concatenation(pieces), origin)
    }

    pub fn delayed_merge(stack: Vec<ConfigValue>, origin: Origin) -> Self {
        Self::new(ConfigValueKind::DelayedMerge(stack), origin)
    }

    pub fn delayed_merge_object(stack: Vec<ConfigValue>, origin: Origin) -> Self {
        Self::new(ConfigValueKind::DelayedMergeObject(stack), origin)
    }

    pub fn is_null(&self) -> bool {
        matches!(self.kind, ConfigValueKind::Null)
    }

    pub fn as_object(&self) -> Option<&ObjectValue> {
        match &self.kind {
            ConfigValueKind::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[ConfigValue]> {
        match &self.kind {
            ConfigValueKind::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match &self.kind {
            ConfigValueKind::Null => "null",
            ConfigValueKind::Bool(_) => "boolean",
            ConfigValueKind::Number(_) => "number",
            ConfigValueKind::String(_) => "string",
            ConfigValueKind::List(_) => "list",
            ConfigValueKind::Object(_) => "object",
            ConfigValueKind::Reference(..) => "reference",
            ConfigValueKind::Concatenation(_) => "concatenation",
            ConfigValueKind::DelayedMerge(_) => "delayed-merge",
            ConfigValueKind::DelayedMergeObject(_) => "delayed-merge-object",
        }
    }

    /// The shape a *resolved* leaf/list/object falls into, for concatenation
    /// and merge compatibility checks. Only meaningful once `resolved` is
    /// true for everything but `Object`/`List`, which may be checked while
    /// still carrying unresolved children (the category itself doesn't
    /// change as children resolve).
    pub fn category(&self) -> ValueCategory {
        match &self.kind {
            ConfigValueKind::List(_) => ValueCategory::List,
            ConfigValueKind::Object(_) => ValueCategory::Object,
            _ => ValueCategory::Scalar,
        }
    }

    /// Render a resolved scalar for use inside a concatenation. HOCON
    /// renders `null` as the empty string in this position.
    pub fn render_scalar(&self) -> String {
        match &self.kind {
            ConfigValueKind::Null => String::new(),
            ConfigValueKind::Bool(b) => b.to_string(),
            ConfigValueKind::Number(n) => n.to_string(),
            ConfigValueKind::String(s) => s.clone(),
            _ => String::new(),
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ConfigValueKind::Null => write!(f, "null"),
            ConfigValueKind::Bool(b) => write!(f, "{}", b),
            ConfigValueKind::Number(n) => write!(f, "{}", n),
            ConfigValueKind::String(s) => write!(f, "{:?}", s),
            ConfigValueKind::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            ConfigValueKind::Object(obj) => {
                write!(f, "{{")?;
                for (i, (k, v)) in obj.entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
            ConfigValueKind::Reference(expr, _) => write!(f, "{}", expr),
            ConfigValueKind::Concatenation(_) => write!(f, "<concatenation>"),
            ConfigValueKind::DelayedMerge(_) => write!(f, "<delayed-merge>"),
            ConfigValueKind::DelayedMergeObject(_) => write!(f, "<delayed-merge-object>"),
        }
    }
}
