use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use std::borrow::Cow;

/// Error message for frames below a protocol's minimum length.
pub const FRAME_TOO_SHORT: &str = "Frame too short";

/// A decoded field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
    List(Vec<Value>),
    Map(Vec<(String, Value)>),
}

impl Value {
    /// Byte sequence as a list of integers.
    pub fn bytes(bytes: &[u8]) -> Self {
        Value::List(bytes.iter().map(|&b| Value::Int(b as i64)).collect())
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<u8> for Value {
    fn from(v: u8) -> Self {
        Value::Int(v as i64)
    }
}

impl From<u16> for Value {
    fn from(v: u16) -> Self {
        Value::Int(v as i64)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::Int(v as i64)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(v) => serializer.serialize_bool(*v),
            Value::Int(v) => serializer.serialize_i64(*v),
            Value::Str(v) => serializer.serialize_str(v),
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (k, v) in entries {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
        }
    }
}

/// Outcome of decoding a single frame.
///
/// When `valid` is false `error` says why and `fields` may be partial. When
/// `valid` is true `error` is `None` and `fields` carries `raw`, the original
/// bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeResult {
    pub valid: bool,
    pub error: Option<String>,
    /// Protocol-specific fields, in the order the decoder emitted them.
    pub fields: Vec<(Cow<'static, str>, Value)>,
}

impl DecodeResult {
    pub fn ok() -> Self {
        Self {
            valid: true,
            error: None,
            fields: Vec::with_capacity(8),
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            valid: false,
            error: Some(error.into()),
            fields: Vec::new(),
        }
    }

    pub fn with_field<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<Cow<'static, str>>,
        V: Into<Value>,
    {
        self.push_field(key, value);
        self
    }

    /// Sets `key`, replacing any earlier value under the same name.
    pub fn push_field<K, V>(&mut self, key: K, value: V)
    where
        K: Into<Cow<'static, str>>,
        V: Into<Value>,
    {
        let key = key.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((key, value)),
        }
    }

    pub fn with_raw(self, frame: &[u8]) -> Self {
        self.with_field("raw", Value::bytes(frame))
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }
}

impl Serialize for DecodeResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("valid", &self.valid)?;
        if let Some(error) = &self.error {
            map.serialize_entry("error", error)?;
        }
        for (k, v) in &self.fields {
            if k != "valid" && k != "error" {
                map.serialize_entry(k.as_ref(), v)?;
            }
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_has_error_and_no_fields() {
        let result = DecodeResult::failure(FRAME_TOO_SHORT);
        assert!(!result.valid);
        assert_eq!(result.error.as_deref(), Some("Frame too short"));
        assert!(result.fields.is_empty());
    }

    #[test]
    fn test_push_field_replaces_existing() {
        let result = DecodeResult::ok()
            .with_field("dlc", 2u8)
            .with_field("dlc", 3u8);
        assert_eq!(result.fields.len(), 1);
        assert_eq!(result.field("dlc"), Some(&Value::Int(3)));
    }

    #[test]
    fn test_serialize_flattens_fields() -> Result<(), serde_json::Error> {
        let result = DecodeResult::ok()
            .with_field("operation", "read")
            .with_raw(&[0xA1, 0x55]);
        assert_eq!(
            serde_json::to_string(&result)?,
            r#"{"valid":true,"operation":"read","raw":[161,85]}"#
        );

        let failure = DecodeResult::failure(FRAME_TOO_SHORT);
        assert_eq!(
            serde_json::to_string(&failure)?,
            r#"{"valid":false,"error":"Frame too short"}"#
        );
        Ok(())
    }

    #[test]
    fn test_serialize_nested_map() -> Result<(), serde_json::Error> {
        let value = Value::Map(vec![
            ("temperature".into(), Value::Int(21)),
            ("unit".into(), Value::from("C")),
            ("spare".into(), Value::from(None::<u8>)),
        ]);
        assert_eq!(
            serde_json::to_string(&value)?,
            r#"{"temperature":21,"unit":"C","spare":null}"#
        );
        Ok(())
    }
}
