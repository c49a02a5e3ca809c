//! Arena holding the objects a traced program can reference

use super::{CallableKind, Object, ObjectId, Value};
use chrono::NaiveDateTime;

/// Arena of host objects
///
/// Objects are never freed while the heap lives, so an [`ObjectId`] stays valid
/// for the whole tracing session. Mutation goes through [`Heap::get_mut`] and the
/// `set_*`/`push_*` helpers, which is how cycles get built: allocate first,
/// then point an attribute back at the object.
#[derive(Debug, Default, Clone)]
pub struct Heap {
    objects: Vec<Object>,
}

impl Heap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move an object into the heap and return its identity
    pub fn alloc(&mut self, object: Object) -> ObjectId {
        let id = ObjectId(self.objects.len() as u32);
        self.objects.push(object);
        id
    }

    pub fn get(&self, id: ObjectId) -> Option<&Object> {
        self.objects.get(id.index())
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut Object> {
        self.objects.get_mut(id.index())
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn bytes(&mut self, data: impl Into<Vec<u8>>) -> Value {
        Value::Ref(self.alloc(Object::Bytes(data.into())))
    }

    pub fn timestamp(&mut self, at: NaiveDateTime) -> Value {
        Value::Ref(self.alloc(Object::Timestamp(at)))
    }

    pub fn list(&mut self, items: Vec<Value>) -> Value {
        Value::Ref(self.alloc(Object::List(items)))
    }

    pub fn tuple(&mut self, items: Vec<Value>) -> Value {
        Value::Ref(self.alloc(Object::Tuple(items)))
    }

    pub fn set(&mut self, items: Vec<Value>) -> Value {
        Value::Ref(self.alloc(Object::Set(items)))
    }

    pub fn dict(&mut self, entries: Vec<(Value, Value)>) -> Value {
        Value::Ref(self.alloc(Object::Dict(entries)))
    }

    pub fn function(&mut self, name: impl Into<String>) -> Value {
        Value::Ref(self.alloc(Object::Callable {
            kind: CallableKind::Function,
            name: Some(name.into()),
            wraps: None,
        }))
    }

    pub fn lambda(&mut self) -> Value {
        Value::Ref(self.alloc(Object::Callable {
            kind: CallableKind::Lambda,
            name: Some("<lambda>".to_string()),
            wraps: None,
        }))
    }

    /// A partial application; its name resolves through `target`
    pub fn partial(&mut self, target: ObjectId) -> Value {
        Value::Ref(self.alloc(Object::Callable {
            kind: CallableKind::Partial,
            name: None,
            wraps: Some(target),
        }))
    }

    pub fn instance(&mut self, class: impl Into<String>, attrs: Vec<(&str, Value)>) -> Value {
        Value::Ref(self.alloc(Object::Instance {
            class: class.into(),
            attrs: attrs.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
        }))
    }

    pub fn slotted(&mut self, class: impl Into<String>, slots: Vec<(&str, Value)>) -> Value {
        Value::Ref(self.alloc(Object::Slotted {
            class: class.into(),
            slots: slots.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
        }))
    }

    /// Set (or add) an attribute on an instance or slotted object.
    ///
    /// Returns false when `id` is not an attribute-carrying object.
    pub fn set_attr(&mut self, id: ObjectId, name: &str, value: Value) -> bool {
        let fields = match self.get_mut(id) {
            Some(Object::Instance { attrs, .. }) => attrs,
            Some(Object::Slotted { slots, .. }) => slots,
            _ => return false,
        };
        match fields.iter_mut().find(|(k, _)| k == name) {
            Some((_, slot)) => *slot = value,
            None => fields.push((name.to_string(), value)),
        }
        true
    }

    /// Append an element to a list, tuple, set, or iterable.
    pub fn push_item(&mut self, id: ObjectId, value: Value) -> bool {
        match self.get_mut(id) {
            Some(Object::List(items))
            | Some(Object::Tuple(items))
            | Some(Object::Set(items))
            | Some(Object::FrozenSet(items))
            | Some(Object::Iterable { items, .. }) => {
                items.push(value);
                true
            }
            _ => false,
        }
    }

    /// Insert or replace a dict entry, comparing keys by value.
    pub fn insert_entry(&mut self, id: ObjectId, key: Value, value: Value) -> bool {
        match self.get_mut(id) {
            Some(Object::Dict(entries)) => {
                match entries.iter_mut().find(|(k, _)| *k == key) {
                    Some((_, slot)) => *slot = value,
                    None => entries.push((key, value)),
                }
                true
            }
            _ => false,
        }
    }
}
