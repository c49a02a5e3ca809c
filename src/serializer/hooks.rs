//! Registrable leaf conversions consulted before the structural rules
//!
//! A hook turns one concrete kind of object into a finished JSON leaf. The
//! serializer asks every registered hook, newest first, before it falls back to
//! treating an object as a container, struct, or iterable.

use super::base85;
use crate::value::Object;
use base64::Engine;
use chrono::{NaiveDateTime, Timelike};
use serde_json::Value as JsonValue;

/// Trait for leaf conversions of specific object kinds
pub trait UnstructureHook: Send + Sync {
    /// Name used in debug logs
    fn name(&self) -> &str;

    /// Convert the object, or return `None` to let the next rule decide
    fn unstructure(&self, object: &Object) -> Option<JsonValue>;
}

/// Text encoding applied to byte strings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BytesEncoding {
    #[default]
    Base85,
    Base64,
}

impl BytesEncoding {
    pub fn encode(&self, data: &[u8]) -> String {
        match self {
            BytesEncoding::Base85 => base85::encode(data),
            BytesEncoding::Base64 => base64::engine::general_purpose::STANDARD.encode(data),
        }
    }
}

/// ISO-8601 text with a microsecond fraction only when it is non-zero
pub fn isoformat(at: &NaiveDateTime) -> String {
    let micros = at.nanosecond() / 1_000;
    if micros == 0 {
        at.format("%Y-%m-%dT%H:%M:%S").to_string()
    } else {
        format!("{}.{:06}", at.format("%Y-%m-%dT%H:%M:%S"), micros)
    }
}

pub struct BytesHook {
    encoding: BytesEncoding,
}

impl BytesHook {
    pub fn new(encoding: BytesEncoding) -> Self {
        Self { encoding }
    }
}

impl UnstructureHook for BytesHook {
    fn name(&self) -> &str {
        "bytes"
    }

    fn unstructure(&self, object: &Object) -> Option<JsonValue> {
        match object {
            Object::Bytes(data) => Some(JsonValue::String(self.encoding.encode(data))),
            _ => None,
        }
    }
}

pub struct TimestampHook;

impl UnstructureHook for TimestampHook {
    fn name(&self) -> &str {
        "datetime"
    }

    fn unstructure(&self, object: &Object) -> Option<JsonValue> {
        match object {
            Object::Timestamp(at) => Some(JsonValue::String(isoformat(at))),
            _ => None,
        }
    }
}

type RenderFn = Box<dyn Fn(&Object) -> JsonValue + Send + Sync>;

/// Special-cases every object whose type name equals `class`
///
/// ```
/// use framelog::serializer::{ClassHook, Serializer};
/// use framelog::value::{Heap, Value};
/// use serde_json::json;
///
/// let mut heap = Heap::new();
/// let price = heap.slotted("Decimal", vec![("_int", Value::from("1999")), ("_exp", Value::from(-2))]);
///
/// let mut serializer = Serializer::default();
/// serializer.register_hook(Box::new(ClassHook::new("Decimal", |_| json!("19.99"))));
/// assert_eq!(serializer.serialize(&heap, &price), json!("19.99"));
/// ```
pub struct ClassHook {
    class: String,
    render: RenderFn,
}

impl ClassHook {
    pub fn new<F>(class: impl Into<String>, render: F) -> Self
    where
        F: Fn(&Object) -> JsonValue + Send + Sync + 'static,
    {
        Self {
            class: class.into(),
            render: Box::new(render),
        }
    }
}

impl UnstructureHook for ClassHook {
    fn name(&self) -> &str {
        &self.class
    }

    fn unstructure(&self, object: &Object) -> Option<JsonValue> {
        if object.type_name() == self.class {
            Some((self.render)(object))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32, us: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_micro_opt(h, mi, s, us)
            .unwrap()
    }

    #[test]
    fn test_isoformat_with_micros() {
        assert_eq!(isoformat(&at(1, 2, 3, 4, 5, 6, 7)), "0001-02-03T04:05:06.000007");
    }

    #[test]
    fn test_isoformat_without_micros() {
        assert_eq!(isoformat(&at(2020, 1, 1, 0, 0, 0, 0)), "2020-01-01T00:00:00");
    }

    #[test]
    fn test_isoformat_reparses_to_same_instant() {
        let original = at(1999, 12, 31, 23, 59, 58, 123456);
        let text = isoformat(&original);
        let parsed = NaiveDateTime::parse_from_str(&text, "%Y-%m-%dT%H:%M:%S%.f").unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_bytes_hook_encodings() {
        let object = Object::Bytes(b"123".to_vec());
        assert_eq!(BytesHook::new(BytesEncoding::Base85).unstructure(&object), Some(json!("F)}j")));
        assert_eq!(BytesHook::new(BytesEncoding::Base64).unstructure(&object), Some(json!("MTIz")));
        assert_eq!(BytesHook::new(BytesEncoding::Base85).unstructure(&Object::List(vec![])), None);
    }

    #[test]
    fn test_timestamp_hook_ignores_other_objects() {
        assert_eq!(TimestampHook.unstructure(&Object::Bytes(vec![])), None);
    }

    #[test]
    fn test_class_hook_matches_type_name() {
        let hook = ClassHook::new("Decimal", |_| json!("1.5"));
        let decimal = Object::Opaque {
            class: "Decimal".to_string(),
        };
        let other = Object::Opaque {
            class: "Fraction".to_string(),
        };
        assert_eq!(hook.unstructure(&decimal), Some(json!("1.5")));
        assert_eq!(hook.unstructure(&other), None);
        assert_eq!(hook.name(), "Decimal");
    }
}
