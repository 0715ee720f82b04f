//! The substitution resolution engine.
//!
//! `resolve(root, options)` walks a `ConfigValue` tree built by the parser
//! (out of scope here) and rewrites every `Reference`, `Concatenation`,
//! `DelayedMerge`, and `DelayedMergeObject` node into a concrete value,
//! honoring HOCON's lazy, memoized, cycle-safe substitution semantics.
//!
//! The engine is implemented as a mutable `ResolveContext` rather than the
//! functional-threading form sketched as the canonical description of the
//! algorithm: memos, the cycle-marker set, and the trace stack are all
//! restored to the caller's view on every return path, which is all the
//! functional form actually guarantees.

use std::collections::HashSet;

use indexmap::IndexMap;
use log::{debug, trace};

use crate::error::{Error, Result};
use crate::memo::Memos;
use crate::origin::Origin;
use crate::path::Path;
use crate::substitution::SubstitutionExpression;
use crate::value::{merge_objects, ConfigValue, ConfigValueKind, NodeId, ObjectValue, ValueCategory};

/// Depth bound for the resolution trace. Load-bearing: converts
/// pathological or mis-restricted inputs into a `BugOrBroken` error
/// instead of a stack overflow.
const MAX_DEPTH: usize = 30;

/// Knobs the resolver consumes. See spec §4.3.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveOptions {
    /// If true, a path that misses in the tree falls back to the process
    /// environment (segments joined with `_`, see `Path::env_key`).
    pub use_system_environment: bool,
    /// If true, substitutions that remain unresolvable are kept as-is in
    /// the output instead of causing a fatal error.
    pub allow_unresolved: bool,
}

impl ResolveOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_system_environment(mut self) -> Self {
        self.use_system_environment = true;
        self
    }

    pub fn with_allow_unresolved(mut self) -> Self {
        self.allow_unresolved = true;
        self
    }
}

/// A resolution step either produces a concrete value, or — when an
/// optional `${?...}` could not be satisfied — signals that the enclosing
/// list/concatenation/object entry should drop the value entirely.
#[derive(Debug, Clone)]
enum Step {
    Value(ConfigValue),
    Absent,
}

/// Internal control-flow signal. `NotPossible` is spec.md's
/// `NotPossibleToResolve`: recoverable, and caught only by the nearest
/// enclosing `Reference`. Anything else is a fatal error that propagates
/// straight to the caller of `resolve`.
enum Signal {
    Fatal(Error),
    NotPossible,
}

impl From<Error> for Signal {
    fn from(e: Error) -> Self {
        Signal::Fatal(e)
    }
}

type StepResult = std::result::Result<Step, Signal>;

/// What a path lookup against the tree produced.
#[derive(Debug, Clone)]
enum LookupResult {
    Found(ConfigValue),
    NotFound,
}

/// The engine. Threads memos, the cycle-marker set, and a restriction
/// path through recursive descent into the tree.
pub struct ResolveContext {
    memos: Memos,
    options: ResolveOptions,
    restrict_to_child: Option<Path>,
    /// Node identities currently "in flight" — the `InTrace` state from
    /// spec.md §4.6's state machine. Re-entering a marked node is a cycle.
    cycle_markers: HashSet<NodeId>,
    /// Diagnostic-only depth counter (mirrors spec.md's `resolveStack`).
    depth: usize,
    /// Substitution paths currently being chased, for error messages —
    /// e.g. `a -> b -> a` when `a` and `b` reference each other.
    ref_trace: Vec<String>,
}

impl ResolveContext {
    fn new(options: ResolveOptions) -> Self {
        Self {
            memos: Memos::new(),
            options,
            restrict_to_child: None,
            cycle_markers: HashSet::new(),
            depth: 0,
            ref_trace: Vec::new(),
        }
    }

    /// One resolution step for `original`, per spec.md §4.6:
    /// depth guard, memo check, cycle check, dispatch, memoize.
    fn resolve_node(&mut self, original: &ConfigValue, source: &mut ResolveSource) -> StepResult {
        if self.depth > MAX_DEPTH {
            debug!("resolve stack depth exceeded {}", MAX_DEPTH);
            return Err(Signal::Fatal(Error::bug(format!(
                "resolve too deep: exceeded depth {}",
                MAX_DEPTH
            ))));
        }

        let id = original.id;

        if let Some(cached) = self.memos.get(id, self.restrict_to_child.as_ref()) {
            trace!("memo hit for node {}", id);
            return Ok(Step::Value(cached.clone()));
        }

        if self.cycle_markers.contains(&id) {
            debug!("cycle detected resolving node {}", id);
            return Err(Signal::NotPossible);
        }

        self.depth += 1;
        self.cycle_markers.insert(id);

        let outcome = self.dispatch(original, source);

        self.cycle_markers.remove(&id);
        self.depth -= 1;

        let step = outcome?;

        if let Step::Value(ref v) = step {
            if v.resolved {
                self.memos = self.memos.put(id, None, v.clone());
            } else if let Some(restriction) = self.restrict_to_child.clone() {
                self.memos = self.memos.put(id, Some(restriction), v.clone());
            } else if self.options.allow_unresolved {
                self.memos = self.memos.put(id, None, v.clone());
            }
        }

        Ok(step)
    }

    fn dispatch(&mut self, original: &ConfigValue, source: &mut ResolveSource) -> StepResult {
        match &original.kind {
            ConfigValueKind::Null
            | ConfigValueKind::Bool(_)
            | ConfigValueKind::Number(_)
            | ConfigValueKind::String(_) => Ok(Step::Value(original.clone())),
            ConfigValueKind::List(items) => self.resolve_list(items, &original.origin, source),
            ConfigValueKind::Object(obj) => {
                self.resolve_object(obj, original.id, &original.origin, source)
            }
            ConfigValueKind::Reference(expr, prefix) => {
                self.resolve_reference(expr, *prefix, &original.origin, source)
            }
            ConfigValueKind::Concatenation(pieces) => {
                self.resolve_concatenation(pieces, &original.origin, source)
            }
            ConfigValueKind::DelayedMerge(stack) => {
                self.resolve_delayed_merge(original.id, stack, &original.origin, source)
            }
            ConfigValueKind::DelayedMergeObject(stack) => {
                self.resolve_delayed_merge(original.id, stack, &original.origin, source)
            }
        }
    }

    fn resolve_list(
        &mut self,
        items: &[ConfigValue],
        origin: &Origin,
        source: &mut ResolveSource,
    ) -> StepResult {
        let saved = self.restrict_to_child.take();
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            match self.resolve_node(item, source) {
                Ok(Step::Value(v)) => out.push(v),
                Ok(Step::Absent) => {}
                Err(e) => {
                    self.restrict_to_child = saved;
                    return Err(e);
                }
            }
        }
        self.restrict_to_child = saved;
        Ok(Step::Value(ConfigValue::list(out, origin.clone())))
    }

    /// Resolves an object's entries, honoring `restrict_to_child`: when
    /// set, only the entry on the restriction path is resolved and
    /// siblings are copied through unresolved, per spec.md §4.7.
    ///
    /// While resolving, this object's own node-id is registered with
    /// `source` as a self-reference override pointing at the
    /// partially-built object, so a `${self.sibling}` substitution inside
    /// one of this object's own values sees the in-progress result rather
    /// than re-entering (and cycling on) the original node.
    fn resolve_object(
        &mut self,
        obj: &ObjectValue,
        id: NodeId,
        origin: &Origin,
        source: &mut ResolveSource,
    ) -> StepResult {
        let restriction = self.restrict_to_child.clone();
        let mut built: IndexMap<String, ConfigValue> = IndexMap::with_capacity(obj.entries.len());

        for (key, child) in obj.entries.iter() {
            let on_restriction_path = match &restriction {
                None => true,
                Some(r) => r.first() == key,
            };

            if !on_restriction_path {
                built.insert(key.clone(), child.clone());
                source.set_override(id, partial_object(&built, origin, obj.ignores_fallbacks));
                continue;
            }

            let child_restriction = restriction.as_ref().and_then(|r| r.remainder());
            let saved = std::mem::replace(&mut self.restrict_to_child, child_restriction);
            let step = self.resolve_node(child, source);
            self.restrict_to_child = saved;

            match step {
                Ok(Step::Value(v)) => {
                    built.insert(key.clone(), v);
                }
                Ok(Step::Absent) => {
                    // Dropped: `${?missing}` inside an object entry removes the key.
                }
                Err(e) => {
                    source.clear_override(id);
                    return Err(e);
                }
            }
            source.set_override(id, partial_object(&built, origin, obj.ignores_fallbacks));
        }

        source.clear_override(id);
        let result = ObjectValue {
            entries: built,
            ignores_fallbacks: obj.ignores_fallbacks,
        };
        Ok(Step::Value(ConfigValue::object(result, origin.clone())))
    }

    fn resolve_reference(
        &mut self,
        expr: &SubstitutionExpression,
        prefix_length: usize,
        origin: &Origin,
        source: &mut ResolveSource,
    ) -> StepResult {
        self.ref_trace.push(expr.path.render());
        let result = self.resolve_reference_inner(expr, prefix_length, origin, source);
        self.ref_trace.pop();
        result
    }

    fn resolve_reference_inner(
        &mut self,
        expr: &SubstitutionExpression,
        prefix_length: usize,
        origin: &Origin,
        source: &mut ResolveSource,
    ) -> StepResult {
        let lookup = source.lookup_subst(self, expr, prefix_length)?;

        let found = match lookup {
            LookupResult::Found(v) => v,
            LookupResult::NotFound => {
                return self.unsatisfied(expr, prefix_length, origin);
            }
        };

        let saved = self.restrict_to_child.take();
        let result = self.resolve_node(&found, source);
        self.restrict_to_child = saved;

        match result {
            Ok(step) => Ok(step),
            Err(Signal::NotPossible) => self.unsatisfied(expr, prefix_length, origin),
            Err(fatal) => Err(fatal),
        }
    }

    /// What to do when a reference's target is missing or caught a cycle:
    /// drop it if optional, keep it verbatim if `allow_unresolved`, else
    /// raise a fatal `UnresolvedSubstitution` naming the chase trace.
    fn unsatisfied(
        &self,
        expr: &SubstitutionExpression,
        prefix_length: usize,
        origin: &Origin,
    ) -> StepResult {
        if expr.optional {
            Ok(Step::Absent)
        } else if self.options.allow_unresolved {
            Ok(Step::Value(ConfigValue::reference(
                expr.clone(),
                prefix_length,
                origin.clone(),
            )))
        } else {
            Err(Signal::Fatal(Error::unresolved_substitution(
                expr.path.render(),
                origin.clone(),
                self.ref_trace.clone(),
            )))
        }
    }

    fn resolve_concatenation(
        &mut self,
        pieces: &[ConfigValue],
        origin: &Origin,
        source: &mut ResolveSource,
    ) -> StepResult {
        let saved = self.restrict_to_child.take();
        let mut resolved_pieces = Vec::with_capacity(pieces.len());
        let mut saw_unresolved = false;

        for piece in pieces {
            match self.resolve_node(piece, source) {
                Ok(Step::Value(v)) => {
                    if !v.resolved {
                        saw_unresolved = true;
                    }
                    resolved_pieces.push(v);
                }
                Ok(Step::Absent) => {
                    // Optional substitution dropped from the piece list.
                }
                Err(e) => {
                    self.restrict_to_child = saved;
                    return Err(e);
                }
            }
        }
        self.restrict_to_child = saved;

        if saw_unresolved {
            // Only reachable with `allow_unresolved`: a piece came back as
            // a bare kept-as-is `Reference`. The concatenation as a whole
            // stays unresolved rather than joining a placeholder.
            return Ok(Step::Value(ConfigValue::concatenation(
                resolved_pieces,
                origin.clone(),
            )));
        }

        if resolved_pieces.is_empty() {
            return Ok(Step::Value(ConfigValue::string("", origin.clone())));
        }

        let categories: Vec<ValueCategory> =
            resolved_pieces.iter().map(|p| p.category()).collect();

        if categories.iter().any(|c| *c == ValueCategory::Object) {
            if categories.iter().any(|c| *c != ValueCategory::Object) {
                return Err(Signal::Fatal(Error::wrong_type(
                    origin.clone(),
                    "object",
                    "mixed categories in concatenation",
                )));
            }
            let merged = resolved_pieces
                .into_iter()
                .map(|p| match p.kind {
                    ConfigValueKind::Object(o) => o,
                    _ => unreachable!("checked category above"),
                })
                .reduce(merge_objects)
                .expect("non-empty pieces checked above");
            Ok(Step::Value(ConfigValue::object(merged, origin.clone())))
        } else if categories.iter().any(|c| *c == ValueCategory::List) {
            if categories.iter().any(|c| *c != ValueCategory::List) {
                return Err(Signal::Fatal(Error::wrong_type(
                    origin.clone(),
                    "list",
                    "mixed categories in concatenation",
                )));
            }
            let mut items = Vec::new();
            for p in resolved_pieces {
                if let ConfigValueKind::List(v) = p.kind {
                    items.extend(v);
                }
            }
            Ok(Step::Value(ConfigValue::list(items, origin.clone())))
        } else {
            let joined: String = resolved_pieces.iter().map(|p| p.render_scalar()).collect();
            Ok(Step::Value(ConfigValue::string(joined, origin.clone())))
        }
    }

    /// Walks a `DelayedMerge`/`DelayedMergeObject` stack top-down,
    /// resolving each layer and merging objects as it goes; a non-object
    /// resolved layer shadows everything beneath it (spec.md §4.6).
    fn resolve_delayed_merge(
        &mut self,
        id: NodeId,
        stack: &[ConfigValue],
        origin: &Origin,
        source: &mut ResolveSource,
    ) -> StepResult {
        let mut acc: Option<ObjectValue> = None;
        let mut shadow: Option<ConfigValue> = None;

        for layer in stack {
            let effective = source.effective(layer);
            let resolved = if effective.resolved {
                effective
            } else {
                let saved = self.restrict_to_child.take();
                let step = self.resolve_node(&effective, source);
                self.restrict_to_child = saved;
                match step {
                    Ok(Step::Value(v)) => v,
                    Ok(Step::Absent) => continue,
                    Err(e) => {
                        source.clear_override(id);
                        return Err(e);
                    }
                }
            };

            match resolved.kind {
                ConfigValueKind::Object(layer_obj) => {
                    let stop = layer_obj.ignores_fallbacks;
                    acc = Some(match acc {
                        None => layer_obj,
                        Some(higher) => merge_objects(layer_obj, higher),
                    });
                    if let Some(ref a) = acc {
                        source.set_override(id, ConfigValue::object(a.clone(), origin.clone()));
                    }
                    if stop {
                        break;
                    }
                }
                _ => {
                    if acc.is_none() {
                        shadow = Some(resolved);
                    }
                    break;
                }
            }
        }

        source.clear_override(id);

        if let Some(obj) = acc {
            Ok(Step::Value(ConfigValue::object(obj, origin.clone())))
        } else if let Some(v) = shadow {
            Ok(Step::Value(v))
        } else {
            Ok(Step::Value(ConfigValue::null(origin.clone())))
        }
    }
}

fn partial_object(
    built: &IndexMap<String, ConfigValue>,
    origin: &Origin,
    ignores_fallbacks: bool,
) -> ConfigValue {
    ConfigValue::object(
        ObjectValue {
            entries: built.clone(),
            ignores_fallbacks,
        },
        origin.clone(),
    )
}

/// The "where do I look up a path" side of substitution resolution: a
/// snapshot of the original (unresolved) root tree, plus a set of
/// self-reference overrides registered by the engine while an object or
/// delayed-merge node is mid-resolution (spec.md §4.5).
pub struct ResolveSource {
    root: ConfigValue,
    overrides: std::collections::HashMap<NodeId, ConfigValue>,
}

impl ResolveSource {
    pub fn new(root: ConfigValue) -> Self {
        Self {
            root,
            overrides: std::collections::HashMap::new(),
        }
    }

    fn set_override(&mut self, id: NodeId, value: ConfigValue) {
        self.overrides.insert(id, value);
    }

    fn clear_override(&mut self, id: NodeId) {
        self.overrides.remove(&id);
    }

    /// The node to actually look inside for `node`'s identity: its
    /// registered override if one is in flight, otherwise `node` itself.
    fn effective(&self, node: &ConfigValue) -> ConfigValue {
        self.overrides
            .get(&node.id)
            .cloned()
            .unwrap_or_else(|| node.clone())
    }

    fn lookup_subst(
        &mut self,
        ctx: &mut ResolveContext,
        expr: &SubstitutionExpression,
        prefix_length: usize,
    ) -> std::result::Result<LookupResult, Signal> {
        if prefix_length > 0 {
            if let Some(stripped) = expr.path.sub_path(prefix_length) {
                trace!("trying prefix-stripped path {}", stripped);
                if let LookupResult::Found(v) = self.resolve_path(ctx, &stripped)? {
                    return Ok(LookupResult::Found(v));
                }
            }
        }
        self.resolve_path(ctx, &expr.path)
    }

    fn resolve_path(
        &mut self,
        ctx: &mut ResolveContext,
        path: &Path,
    ) -> std::result::Result<LookupResult, Signal> {
        let root = self.root.clone();
        match self.lookup_in(root, path, ctx)? {
            LookupResult::Found(v) => Ok(LookupResult::Found(v)),
            LookupResult::NotFound => {
                if ctx.options.use_system_environment {
                    if let Ok(val) = std::env::var(path.env_key()) {
                        trace!("environment fallback for {} -> {}", path, path.env_key());
                        return Ok(LookupResult::Found(ConfigValue::string(
                            val,
                            Origin::new("<environment>"),
                        )));
                    }
                }
                Ok(LookupResult::NotFound)
            }
        }
    }

    fn lookup_in(
        &mut self,
        node: ConfigValue,
        path: &Path,
        ctx: &mut ResolveContext,
    ) -> std::result::Result<LookupResult, Signal> {
        let node = self.effective(&node);
        match node.kind {
            ConfigValueKind::Object(obj) => match obj.entries.get(path.first()) {
                None => Ok(LookupResult::NotFound),
                Some(child) => {
                    let child = child.clone();
                    match path.remainder() {
                        Some(rem) => self.lookup_in(child, &rem, ctx),
                        None => Ok(LookupResult::Found(child)),
                    }
                }
            },
            ConfigValueKind::DelayedMergeObject(stack) | ConfigValueKind::DelayedMerge(stack) => {
                self.lookup_in_stack(stack, path, ctx)
            }
            ConfigValueKind::Reference(..) | ConfigValueKind::Concatenation(_) => {
                match ctx.resolve_node(&node, self)? {
                    Step::Value(v) => self.lookup_in(v, path, ctx),
                    Step::Absent => Ok(LookupResult::NotFound),
                }
            }
            _ => Ok(LookupResult::NotFound),
        }
    }

    fn lookup_in_stack(
        &mut self,
        stack: Vec<ConfigValue>,
        path: &Path,
        ctx: &mut ResolveContext,
    ) -> std::result::Result<LookupResult, Signal> {
        for layer in stack {
            let layer = self.effective(&layer);
            let resolved_layer = if layer.resolved {
                layer
            } else {
                match ctx.resolve_node(&layer, self)? {
                    Step::Value(v) => v,
                    Step::Absent => continue,
                }
            };
            match &resolved_layer.kind {
                ConfigValueKind::Object(obj) => {
                    if let Some(child) = obj.entries.get(path.first()) {
                        let child = child.clone();
                        return match path.remainder() {
                            Some(rem) => self.lookup_in(child, &rem, ctx),
                            None => Ok(LookupResult::Found(child)),
                        };
                    }
                    if obj.ignores_fallbacks {
                        return Ok(LookupResult::NotFound);
                    }
                }
                _ => return Ok(LookupResult::NotFound),
            }
        }
        Ok(LookupResult::NotFound)
    }
}

/// Resolves `root` per `options`: the crate's one public entry point.
/// `NotPossibleToResolve` escaping all the way here (it should only ever
/// be caught by a `Reference`) is reported as an internal bug.
pub fn resolve(root: ConfigValue, options: ResolveOptions) -> Result<ConfigValue> {
    let mut ctx = ResolveContext::new(options);
    let mut source = ResolveSource::new(root.clone());
    match ctx.resolve_node(&root, &mut source) {
        Ok(Step::Value(v)) => Ok(v),
        Ok(Step::Absent) => Ok(ConfigValue::null(root.origin.clone())),
        Err(Signal::Fatal(e)) => Err(e),
        Err(Signal::NotPossible) => Err(Error::bug(
            "NotPossibleToResolve escaped to the top level resolve() call",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::substitution::SubstitutionExpression;
    use crate::value::Number;

    fn origin() -> Origin {
        Origin::new("test")
    }

    fn obj(entries: Vec<(&str, ConfigValue)>) -> ConfigValue {
        let mut map = IndexMap::new();
        for (k, v) in entries {
            map.insert(k.to_string(), v);
        }
        ConfigValue::object(ObjectValue::new(map), origin())
    }

    fn reference(path: &str) -> ConfigValue {
        ConfigValue::reference(
            SubstitutionExpression::required(Path::parse(path).unwrap()),
            0,
            origin(),
        )
    }

    fn optional_reference(path: &str) -> ConfigValue {
        ConfigValue::reference(
            SubstitutionExpression::optional(Path::parse(path).unwrap()),
            0,
            origin(),
        )
    }

    /// A reference as it would look after an include loader prepended
    /// `prefix_length` segments to its path (spec.md §3/§4.5).
    fn reference_with_prefix(path: &str, prefix_length: usize) -> ConfigValue {
        ConfigValue::reference(
            SubstitutionExpression::required(Path::parse(path).unwrap()),
            prefix_length,
            origin(),
        )
    }

    fn int(n: i64) -> ConfigValue {
        ConfigValue::number(Number::Integer(n), origin())
    }

    fn get<'a>(v: &'a ConfigValue, key: &str) -> &'a ConfigValue {
        v.as_object().unwrap().get(key).unwrap()
    }

    #[test]
    fn simple_substitution() {
        // { a = 1, b = ${a} }
        let root = obj(vec![("a", int(1)), ("b", reference("a"))]);
        let resolved = resolve(root, ResolveOptions::new()).unwrap();

        assert!(matches!(get(&resolved, "a").kind, ConfigValueKind::Number(Number::Integer(1))));
        assert!(matches!(get(&resolved, "b").kind, ConfigValueKind::Number(Number::Integer(1))));
    }

    #[test]
    fn required_cycle_is_fatal() {
        // { a = ${b}, b = ${a} }
        let root = obj(vec![("a", reference("b")), ("b", reference("a"))]);
        let err = resolve(root, ResolveOptions::new()).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::UnresolvedSubstitution);

        // spec.md §8 requires the trace to name both nodes in the cycle.
        // Check for the rendered chase order itself ("b -> a"), not just
        // the bare letters, since "Trace:" itself contains an 'a'.
        let cause = err.cause.expect("cycle error should carry a trace");
        assert!(
            cause.contains("b -> a"),
            "trace {:?} should name both 'a' and 'b'",
            cause
        );
    }

    #[test]
    fn optional_missing_drops_the_entry() {
        // { a = ${?missing}, b = 2 }
        let root = obj(vec![("a", optional_reference("missing")), ("b", int(2))]);
        let resolved = resolve(root, ResolveOptions::new()).unwrap();

        let resolved_obj = resolved.as_object().unwrap();
        assert!(resolved_obj.get("a").is_none());
        assert!(matches!(resolved_obj.get("b").unwrap().kind, ConfigValueKind::Number(Number::Integer(2))));
    }

    #[test]
    fn required_missing_is_fatal_without_allow_unresolved() {
        let root = obj(vec![("a", reference("missing"))]);
        let err = resolve(root, ResolveOptions::new()).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::UnresolvedSubstitution);
    }

    #[test]
    fn allow_unresolved_keeps_the_reference() {
        // { a = ${a} } with allow_unresolved = true
        let mut map = IndexMap::new();
        map.insert("a".to_string(), reference("a"));
        let root = ConfigValue::object(ObjectValue::new(map), origin());

        let resolved = resolve(root, ResolveOptions::new().with_allow_unresolved()).unwrap();
        assert!(matches!(get(&resolved, "a").kind, ConfigValueKind::Reference(..)));
    }

    #[test]
    fn concatenation_joins_objects() {
        let piece_a = {
            let mut m = IndexMap::new();
            m.insert("x".to_string(), int(1));
            ConfigValue::object(ObjectValue::new(m), origin())
        };
        let piece_b = {
            let mut m = IndexMap::new();
            m.insert("y".to_string(), int(2));
            ConfigValue::object(ObjectValue::new(m), origin())
        };
        let concat = ConfigValue::concatenation(vec![piece_a, piece_b], origin());
        let root = obj(vec![("c", concat)]);

        let resolved = resolve(root, ResolveOptions::new()).unwrap();
        let c = get(&resolved, "c");
        let c_obj = c.as_object().unwrap();
        assert!(matches!(c_obj.get("x").unwrap().kind, ConfigValueKind::Number(Number::Integer(1))));
        assert!(matches!(c_obj.get("y").unwrap().kind, ConfigValueKind::Number(Number::Integer(2))));
    }

    #[test]
    fn concatenation_joins_lists() {
        // { a = [1], b = [2], c = ${a} ${b} }
        let a = ConfigValue::list(vec![int(1)], origin());
        let b = ConfigValue::list(vec![int(2)], origin());
        let concat = ConfigValue::concatenation(vec![reference("a"), reference("b")], origin());
        let root = obj(vec![("a", a), ("b", b), ("c", concat)]);

        let resolved = resolve(root, ResolveOptions::new()).unwrap();
        let items = get(&resolved, "c").as_list().unwrap();
        assert_eq!(items.len(), 2);
        assert!(matches!(items[0].kind, ConfigValueKind::Number(Number::Integer(1))));
        assert!(matches!(items[1].kind, ConfigValueKind::Number(Number::Integer(2))));
    }

    #[test]
    fn concatenation_mixing_categories_is_wrong_type() {
        let concat = ConfigValue::concatenation(
            vec![ConfigValue::list(vec![int(1)], origin()), int(2)],
            origin(),
        );
        let root = obj(vec![("c", concat)]);
        let err = resolve(root, ResolveOptions::new()).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::WrongType);
    }

    #[test]
    fn string_concatenation_stringifies_scalars() {
        let concat = ConfigValue::concatenation(
            vec![
                ConfigValue::string("count=", origin()),
                int(3),
                ConfigValue::string("!", origin()),
            ],
            origin(),
        );
        let root = obj(vec![("c", concat)]);
        let resolved = resolve(root, ResolveOptions::new()).unwrap();
        assert!(matches!(&get(&resolved, "c").kind, ConfigValueKind::String(s) if s == "count=3!"));
    }

    #[test]
    fn delayed_merge_object_fills_missing_keys_from_lower_layers() {
        // Equivalent to `{ a = { x = 1 }, b = ${a} { y = 2 } }`:
        // b's DelayedMergeObject stack is [ {y=2}, ${a} ] (top first).
        let top = {
            let mut m = IndexMap::new();
            m.insert("y".to_string(), int(2));
            ConfigValue::object(ObjectValue::new(m), origin())
        };
        let stack = vec![top, reference("a")];
        let b = ConfigValue::delayed_merge_object(stack, origin());

        let a = {
            let mut m = IndexMap::new();
            m.insert("x".to_string(), int(1));
            ConfigValue::object(ObjectValue::new(m), origin())
        };
        let root = obj(vec![("a", a), ("b", b)]);

        let resolved = resolve(root, ResolveOptions::new()).unwrap();
        let b_obj = get(&resolved, "b").as_object().unwrap();
        assert!(matches!(b_obj.get("x").unwrap().kind, ConfigValueKind::Number(Number::Integer(1))));
        assert!(matches!(b_obj.get("y").unwrap().kind, ConfigValueKind::Number(Number::Integer(2))));
    }

    #[test]
    fn delayed_merge_non_object_layer_shadows_lower_layers() {
        let stack = vec![int(5), reference("a")];
        let b = ConfigValue::delayed_merge(stack, origin());
        let root = obj(vec![("a", int(1)), ("b", b)]);

        let resolved = resolve(root, ResolveOptions::new()).unwrap();
        assert!(matches!(get(&resolved, "b").kind, ConfigValueKind::Number(Number::Integer(5))));
    }

    #[test]
    fn delayed_merge_stops_at_ignores_fallbacks_layer() {
        // Stack (top first): { y = 2 }, { z = 3, ignores fallbacks }, { x = 1 }.
        // The flagged layer must stop the merge: `x` from the layer below
        // it is never pulled in, even though it's otherwise missing above.
        let top = {
            let mut m = IndexMap::new();
            m.insert("y".to_string(), int(2));
            ConfigValue::object(ObjectValue::new(m), origin())
        };
        let stopper = {
            let mut m = IndexMap::new();
            m.insert("z".to_string(), int(3));
            ConfigValue::object(
                ObjectValue {
                    entries: m,
                    ignores_fallbacks: true,
                },
                origin(),
            )
        };
        let bottom = {
            let mut m = IndexMap::new();
            m.insert("x".to_string(), int(1));
            ConfigValue::object(ObjectValue::new(m), origin())
        };

        let merged = ConfigValue::delayed_merge_object(vec![top, stopper, bottom], origin());
        let root = obj(vec![("m", merged)]);

        let resolved = resolve(root, ResolveOptions::new()).unwrap();
        let m_obj = get(&resolved, "m").as_object().unwrap();
        assert!(m_obj.get("y").is_some());
        assert!(m_obj.get("z").is_some());
        assert!(
            m_obj.get("x").is_none(),
            "fallback should have stopped at the ignores_fallbacks layer"
        );
    }

    #[test]
    fn lookup_in_stack_respects_ignores_fallbacks() {
        // "m"'s top layer lacks "x" and ignores fallbacks, so a substitution
        // chasing "m.x" must miss even though a lower layer in the same
        // stack has "x" — the lookup must not fall through past the flagged
        // layer any more than the merge itself would.
        let top = {
            let mut m = IndexMap::new();
            m.insert("y".to_string(), int(1));
            ConfigValue::object(
                ObjectValue {
                    entries: m,
                    ignores_fallbacks: true,
                },
                origin(),
            )
        };
        let bottom = {
            let mut m = IndexMap::new();
            m.insert("x".to_string(), int(2));
            ConfigValue::object(ObjectValue::new(m), origin())
        };
        let merge_stack = ConfigValue::delayed_merge_object(vec![top, bottom], origin());

        // "c" comes before "m" so the lookup chases the original,
        // not-yet-resolved stack instead of an already-merged sibling.
        let root = obj(vec![("c", reference("m.x")), ("m", merge_stack)]);
        let err = resolve(root, ResolveOptions::new()).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::UnresolvedSubstitution);
    }

    #[test]
    fn prefix_stripped_path_hits_the_including_scope() {
        // { host = "localhost", database = { ref = ${database.host} } },
        // where "ref"'s reference carries prefix_length = 1 because an
        // include loader prepended "database" onto its path. The
        // stripped path ("host") must be tried first and found against
        // the including file's own top-level scope.
        let database = obj(vec![("ref", reference_with_prefix("database.host", 1))]);
        let root = obj(vec![
            ("host", ConfigValue::string("localhost", origin())),
            ("database", database),
        ]);

        let resolved = resolve(root, ResolveOptions::new()).unwrap();
        let database = get(&resolved, "database").as_object().unwrap();
        assert!(matches!(&database.get("ref").unwrap().kind, ConfigValueKind::String(s) if s == "localhost"));
    }

    #[test]
    fn prefix_falls_back_to_full_path_when_stripped_path_misses() {
        // Same shape, but there is no top-level "host" to strip down to —
        // the resolver must retry with the full, unstripped path and find
        // "database.host" instead.
        let database = obj(vec![
            ("host", ConfigValue::string("dbhost", origin())),
            ("ref", reference_with_prefix("database.host", 1)),
        ]);
        let root = obj(vec![("database", database)]);

        let resolved = resolve(root, ResolveOptions::new()).unwrap();
        let database = get(&resolved, "database").as_object().unwrap();
        assert!(matches!(&database.get("ref").unwrap().kind, ConfigValueKind::String(s) if s == "dbhost"));
    }

    #[test]
    fn environment_fallback_joins_with_underscore() {
        std::env::set_var("HOCON_RESOLVE_TEST_VAR", "value-from-env");
        let root = obj(vec![("h", reference("HOCON_RESOLVE_TEST_VAR"))]);
        let resolved = resolve(root, ResolveOptions::new().with_system_environment()).unwrap();
        assert!(matches!(&get(&resolved, "h").kind, ConfigValueKind::String(s) if s == "value-from-env"));
        std::env::remove_var("HOCON_RESOLVE_TEST_VAR");
    }

    #[test]
    fn restriction_is_transparent() {
        // Resolving the whole tree and then looking up a path equals a
        // restricted resolve of just that path (spec.md §8, property 6).
        let root = {
            let mut m = IndexMap::new();
            m.insert("a".to_string(), int(1));
            m.insert("b".to_string(), reference("a"));
            ConfigValue::object(ObjectValue::new(m), origin())
        };

        let full = resolve(root.clone(), ResolveOptions::new()).unwrap();
        let mut ctx = ResolveContext::new(ResolveOptions::new());
        ctx.restrict_to_child = Some(Path::single("b"));
        let mut source = ResolveSource::new(root.clone());
        let restricted = match ctx.resolve_node(&root, &mut source).unwrap() {
            Step::Value(v) => v,
            Step::Absent => panic!("root should never be absent"),
        };

        assert_eq!(
            get(&full, "b").render_scalar(),
            get(&restricted, "b").render_scalar()
        );
    }

    #[test]
    fn idempotent_on_already_resolved_tree() {
        let root = obj(vec![("a", int(1)), ("b", ConfigValue::string("x", origin()))]);
        let once = resolve(root, ResolveOptions::new()).unwrap();
        let twice = resolve(once.clone(), ResolveOptions::new()).unwrap();
        assert_eq!(once.to_string(), twice.to_string());
    }
}
