//! Host value model
//!
//! Traced programs hold arbitrary, possibly cyclic, values in their locals. This
//! module models them as a closed set of tagged variants: inline primitives
//! ([`Value`]) and heap objects ([`Object`]) addressed by [`ObjectId`]. Object
//! identity is the id, never structural equality, which is what the serializer's
//! cycle guard keys on.

pub mod heap;

pub use heap::Heap;

use chrono::NaiveDateTime;
use std::fmt;

/// Identity of an object living in a [`Heap`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub(crate) u32);

impl ObjectId {
    /// Raw arena index of the object
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

/// A value held in a local slot, attribute, or container element
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Ref(ObjectId),
}

impl Value {
    /// The referenced object id, if this value is a heap reference
    pub fn as_ref_id(&self) -> Option<ObjectId> {
        match self {
            Value::Ref(id) => Some(*id),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n as i64)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<ObjectId> for Value {
    fn from(id: ObjectId) -> Self {
        Value::Ref(id)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(Value::None)
    }
}

/// Flavor of a callable object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallableKind {
    Function,
    BoundMethod,
    Lambda,
    Partial,
    Builtin,
}

/// A heap object
///
/// Variants are listed roughly in the order the serializer classifies them.
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    Bytes(Vec<u8>),
    Timestamp(NaiveDateTime),
    List(Vec<Value>),
    Tuple(Vec<Value>),
    Set(Vec<Value>),
    FrozenSet(Vec<Value>),
    /// Insertion-ordered mapping with arbitrary keys
    Dict(Vec<(Value, Value)>),
    /// `name` may be missing; `wraps` points at the wrapped callable for
    /// partial applications and bound methods.
    Callable {
        kind: CallableKind,
        name: Option<String>,
        wraps: Option<ObjectId>,
    },
    Module {
        name: String,
    },
    Type {
        name: String,
    },
    /// Object with a fixed, declared attribute set
    Slotted {
        class: String,
        slots: Vec<(String, Value)>,
    },
    /// Object with a free-form attribute bag
    Instance {
        class: String,
        attrs: Vec<(String, Value)>,
    },
    /// Anything else that can still be iterated
    Iterable {
        class: String,
        items: Vec<Value>,
    },
    Opaque {
        class: String,
    },
}

impl Object {
    /// Host-level type name, used in placeholders and logs
    pub fn type_name(&self) -> &str {
        match self {
            Object::Bytes(_) => "bytes",
            Object::Timestamp(_) => "datetime",
            Object::List(_) => "list",
            Object::Tuple(_) => "tuple",
            Object::Set(_) => "set",
            Object::FrozenSet(_) => "frozenset",
            Object::Dict(_) => "dict",
            Object::Callable { kind, .. } => match kind {
                CallableKind::Function | CallableKind::Lambda => "function",
                CallableKind::BoundMethod => "method",
                CallableKind::Partial => "partial",
                CallableKind::Builtin => "builtin_function_or_method",
            },
            Object::Module { .. } => "module",
            Object::Type { .. } => "type",
            Object::Slotted { class, .. }
            | Object::Instance { class, .. }
            | Object::Iterable { class, .. }
            | Object::Opaque { class } => class,
        }
    }

    /// Look up a named attribute on slotted objects and instances
    pub fn attr(&self, name: &str) -> Option<&Value> {
        match self {
            Object::Slotted { slots: fields, .. } | Object::Instance { attrs: fields, .. } => {
                fields.iter().find(|(k, _)| k == name).map(|(_, v)| v)
            }
            _ => None,
        }
    }
}
