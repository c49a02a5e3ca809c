//! Recursive conversion of host values into JSON-safe trees
//!
//! [`Serializer::serialize`] never fails. Every value classifies into exactly
//! one rule, checked in order:
//!
//! 1. primitives pass through (non-finite floats become `"Infinity"`,
//!    `"-Infinity"` or `"NaN"` strings, since the output is strict JSON)
//! 2. registered [`UnstructureHook`]s, newest first (bytes and timestamps by default)
//! 3. lists, tuples and sets become arrays
//! 4. dicts become objects with stringified keys
//! 5. callables become `"<function NAME>"`
//! 6. modules and types become their canonical text
//! 7. slotted objects and attribute bags become objects, minus `__` names
//! 8. other iterables become arrays
//! 9. anything left becomes `{}`
//!
//! A path-scoped set of object ids guards against cycles: an object met again
//! while it is still being rendered yields a short `"<cycle TYPE>"` string.
//! Siblings that merely share an object are each rendered in full, up to a
//! per-call budget of rendered objects (`"<truncated>"` once it is spent), so
//! densely connected graphs still produce bounded output.

pub mod base85;
pub mod hooks;

pub use hooks::{BytesEncoding, BytesHook, ClassHook, TimestampHook, UnstructureHook};

use crate::config::SerializerConfig;
use crate::value::{Heap, Object, ObjectId, Value};
use serde_json::{Map, Number, Value as JsonValue};
use std::collections::HashSet;
use tracing::{debug, trace};

pub const UNKNOWN_NAME: &str = "<unknown>";
pub const MAX_DEPTH_PLACEHOLDER: &str = "<max depth>";
pub const TRUNCATED_PLACEHOLDER: &str = "<truncated>";
const PLACEHOLDER_TYPE_WIDTH: usize = 24;
const MAX_NAME_HOPS: usize = 8;

/// Per-call traversal state: the objects on the current path and the
/// number of objects that may still be rendered
struct Walk {
    visiting: HashSet<ObjectId>,
    budget: usize,
}

/// Converts values living in a [`Heap`] into `serde_json` trees
pub struct Serializer {
    config: SerializerConfig,
    hooks: Vec<Box<dyn UnstructureHook>>,
}

impl Serializer {
    /// Create a serializer with the bytes and timestamp hooks installed
    pub fn new(config: SerializerConfig) -> Self {
        let hooks: Vec<Box<dyn UnstructureHook>> = vec![
            Box::new(TimestampHook),
            Box::new(BytesHook::new(config.bytes_encoding)),
        ];
        Self { config, hooks }
    }

    /// Register a hook ahead of every hook registered before it
    pub fn register_hook(&mut self, hook: Box<dyn UnstructureHook>) {
        debug!(hook = hook.name(), "Registering unstructure hook");
        self.hooks.insert(0, hook);
    }

    /// Serialize one value with a fresh cycle guard and node budget
    pub fn serialize(&self, heap: &Heap, value: &Value) -> JsonValue {
        let mut walk = self.walk(heap);
        self.unstructure(heap, value, &mut walk, 0)
    }

    /// Serialize a frame's local bindings into one JSON object
    ///
    /// All bindings share one node budget.
    pub fn serialize_locals(&self, heap: &Heap, locals: &[(String, Value)]) -> JsonValue {
        let mut walk = self.walk(heap);
        let mut map = Map::with_capacity(locals.len());
        for (name, value) in locals {
            map.insert(name.clone(), self.unstructure(heap, value, &mut walk, 0));
        }
        JsonValue::Object(map)
    }

    /// Objects one call may render: never more than every heap object at
    /// every acyclic depth, and never more than the configured cap
    fn walk(&self, heap: &Heap) -> Walk {
        Walk {
            visiting: HashSet::new(),
            budget: heap
                .len()
                .saturating_mul(self.config.max_depth)
                .min(self.config.max_nodes),
        }
    }

    fn unstructure(
        &self,
        heap: &Heap,
        value: &Value,
        walk: &mut Walk,
        depth: usize,
    ) -> JsonValue {
        match value {
            Value::None => JsonValue::Null,
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Int(n) => JsonValue::Number((*n).into()),
            Value::Float(x) => float_to_json(*x),
            Value::Str(s) => JsonValue::String(s.clone()),
            Value::Ref(id) => self.unstructure_object(heap, *id, walk, depth),
        }
    }

    fn unstructure_object(
        &self,
        heap: &Heap,
        id: ObjectId,
        walk: &mut Walk,
        depth: usize,
    ) -> JsonValue {
        let Some(object) = heap.get(id) else {
            debug!(%id, "Dangling object reference, rendering empty map");
            return JsonValue::Object(Map::new());
        };

        for hook in &self.hooks {
            if let Some(json) = hook.unstructure(object) {
                return json;
            }
        }

        if walk.visiting.contains(&id) {
            return JsonValue::String(cycle_placeholder(object));
        }

        if depth >= self.config.max_depth {
            return JsonValue::String(MAX_DEPTH_PLACEHOLDER.to_string());
        }

        if walk.budget == 0 {
            return JsonValue::String(TRUNCATED_PLACEHOLDER.to_string());
        }
        walk.budget -= 1;

        walk.visiting.insert(id);
        let json = self.classify(heap, object, walk, depth + 1);
        walk.visiting.remove(&id);
        json
    }

    fn classify(
        &self,
        heap: &Heap,
        object: &Object,
        walk: &mut Walk,
        depth: usize,
    ) -> JsonValue {
        match object {
            // Only reached when a registered hook declined these
            Object::Bytes(data) => {
                JsonValue::String(self.config.bytes_encoding.encode(data))
            }
            Object::Timestamp(at) => JsonValue::String(hooks::isoformat(at)),

            Object::List(items)
            | Object::Tuple(items)
            | Object::Set(items)
            | Object::FrozenSet(items) => self.array(heap, items, walk, depth),

            Object::Dict(entries) => {
                let mut map = Map::with_capacity(entries.len());
                for (key, value) in entries {
                    let key = self.key_text(heap, key, walk, depth);
                    map.insert(key, self.unstructure(heap, value, walk, depth));
                }
                JsonValue::Object(map)
            }

            Object::Callable { .. } => {
                JsonValue::String(format!("<function {}>", resolve_callable_name(heap, object)))
            }

            Object::Module { name } => JsonValue::String(format!("<module '{name}'>")),
            Object::Type { name } => JsonValue::String(format!("<class '{name}'>")),

            Object::Slotted { slots: fields, .. } | Object::Instance { attrs: fields, .. } => {
                let mut map = Map::new();
                for (name, value) in fields.iter().filter(|(name, _)| !name.starts_with("__")) {
                    map.insert(name.clone(), self.unstructure(heap, value, walk, depth));
                }
                JsonValue::Object(map)
            }

            Object::Iterable { items, .. } => self.array(heap, items, walk, depth),

            Object::Opaque { class } => {
                trace!(class = class.as_str(), "Unrepresentable value, rendering empty map");
                JsonValue::Object(Map::new())
            }
        }
    }

    fn array(
        &self,
        heap: &Heap,
        items: &[Value],
        walk: &mut Walk,
        depth: usize,
    ) -> JsonValue {
        JsonValue::Array(
            items
                .iter()
                .map(|item| self.unstructure(heap, item, walk, depth))
                .collect(),
        )
    }

    /// Text form of a mapping key
    fn key_text(
        &self,
        heap: &Heap,
        key: &Value,
        walk: &mut Walk,
        depth: usize,
    ) -> String {
        match key {
            Value::Str(s) => s.clone(),
            Value::Ref(_) => match self.unstructure(heap, key, walk, depth) {
                JsonValue::String(s) => s,
                other => other.to_string(),
            },
            primitive => self.unstructure(heap, primitive, walk, depth).to_string(),
        }
    }
}

impl Default for Serializer {
    fn default() -> Self {
        Self::new(SerializerConfig::default())
    }
}

fn float_to_json(x: f64) -> JsonValue {
    match Number::from_f64(x) {
        Some(n) => JsonValue::Number(n),
        None if x.is_nan() => JsonValue::String("NaN".to_string()),
        None if x > 0.0 => JsonValue::String("Infinity".to_string()),
        None => JsonValue::String("-Infinity".to_string()),
    }
}

fn cycle_placeholder(object: &Object) -> String {
    let type_name: String = object.type_name().chars().take(PLACEHOLDER_TYPE_WIDTH).collect();
    format!("<cycle {type_name}>")
}

/// Best-effort name of a callable, following wrapped callables a few hops
fn resolve_callable_name(heap: &Heap, object: &Object) -> String {
    let mut current = object;
    for _ in 0..MAX_NAME_HOPS {
        match current {
            Object::Callable { name: Some(name), .. } => return name.clone(),
            Object::Callable {
                name: None,
                wraps: Some(target),
                ..
            } => match heap.get(*target) {
                Some(next) => current = next,
                None => break,
            },
            _ => break,
        }
    }
    UNKNOWN_NAME.to_string()
}
