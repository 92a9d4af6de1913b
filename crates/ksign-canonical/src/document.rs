use std::cell::RefCell;
use std::fmt;

use serde::de::{self, DeserializeSeed, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::canonicalizer::CanonicalizationError;

/// Helper for building JSON paths while parsing.
#[derive(Debug, Clone)]
pub(crate) struct Path {
    segments: Vec<String>,
}

impl Path {
    pub(crate) fn root() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    fn push_field(&self, field: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(field.to_string());
        Self { segments }
    }

    fn push_index(&self, index: usize) -> Self {
        let mut segments = self.segments.clone();
        segments.push(format!("[{}]", index));
        Self { segments }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            write!(f, "root")
        } else {
            write!(f, "{}", self.segments.join("."))
        }
    }
}

/// A JSON object whose keys are unique at every depth.
///
/// `serde_json` keeps the last of two duplicate members and drops the other
/// silently, so documents must enter the system through [`Document::parse`]
/// or through `Deserialize`, both of which reject duplicates instead.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct Document(Map<String, Value>);

impl Document {
    /// Creates an empty document.
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Parses a document from JSON text, rejecting duplicate keys and non-object roots.
    pub fn parse(bytes: &[u8]) -> Result<Self, CanonicalizationError> {
        let value = parse_strict(bytes)?;
        Self::try_from(value)
    }

    /// Returns the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns `true` if `key` is a top-level field.
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Inserts a top-level field, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    /// Removes a top-level field, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// Iterates over the top-level field names.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    /// Number of top-level fields.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the document has no fields.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrows the underlying JSON object.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Converts the document into a JSON value.
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl TryFrom<Value> for Document {
    type Error = CanonicalizationError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(CanonicalizationError::InvalidStructure(format!(
                "root: expected object, found {}",
                kind_of(&other)
            ))),
        }
    }
}

impl From<Document> for Value {
    fn from(document: Document) -> Self {
        document.into_value()
    }
}

impl<'de> Deserialize<'de> for Document {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let StrictValue(value) = StrictValue::deserialize(deserializer)?;
        Document::try_from(value).map_err(de::Error::custom)
    }
}

/// Any JSON value, deserialized with duplicate-key rejection at every depth.
#[derive(Debug, Clone, PartialEq)]
pub struct StrictValue(pub Value);

impl<'de> Deserialize<'de> for StrictValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let fault = RefCell::new(None);
        StrictSeed {
            path: Path::root(),
            fault: &fault,
        }
        .deserialize(deserializer)
        .map(StrictValue)
    }
}

/// Parses any JSON value, rejecting duplicate keys at every depth.
pub fn parse_strict(bytes: &[u8]) -> Result<Value, CanonicalizationError> {
    let fault = RefCell::new(None);
    let mut deserializer = serde_json::Deserializer::from_slice(bytes);
    let parsed = StrictSeed {
        path: Path::root(),
        fault: &fault,
    }
    .deserialize(&mut deserializer)
    .and_then(|value| deserializer.end().map(|()| value));

    match parsed {
        Ok(value) => Ok(value),
        Err(err) => Err(fault
            .into_inner()
            .unwrap_or_else(|| CanonicalizationError::InvalidJson(err.to_string()))),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Seed that tracks the current path and records the first structural fault.
struct StrictSeed<'a> {
    path: Path,
    fault: &'a RefCell<Option<CanonicalizationError>>,
}

impl<'a> StrictSeed<'a> {
    fn child(&self, path: Path) -> Self {
        Self {
            path,
            fault: self.fault,
        }
    }

    fn fail<E: de::Error>(&self, fault: CanonicalizationError) -> E {
        let err = E::custom(&fault);
        let mut slot = self.fault.borrow_mut();
        if slot.is_none() {
            *slot = Some(fault);
        }
        err
    }
}

impl<'de, 'a> DeserializeSeed<'de> for StrictSeed<'a> {
    type Value = Value;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<Value, D::Error> {
        deserializer.deserialize_any(self)
    }
}

impl<'de, 'a> Visitor<'de> for StrictSeed<'a> {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON value")
    }

    fn visit_unit<E>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_bool<E>(self, v: bool) -> Result<Value, E> {
        Ok(Value::Bool(v))
    }

    fn visit_i64<E>(self, v: i64) -> Result<Value, E> {
        Ok(Value::Number(v.into()))
    }

    fn visit_u64<E>(self, v: u64) -> Result<Value, E> {
        Ok(Value::Number(v.into()))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Value, E> {
        match Number::from_f64(v) {
            Some(n) => Ok(Value::Number(n)),
            None => Err(self.fail(CanonicalizationError::NonFiniteNumber(
                self.path.to_string(),
            ))),
        }
    }

    fn visit_str<E>(self, v: &str) -> Result<Value, E> {
        Ok(Value::String(v.to_owned()))
    }

    fn visit_string<E>(self, v: String) -> Result<Value, E> {
        Ok(Value::String(v))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
        let mut items = Vec::new();
        while let Some(item) = seq.next_element_seed(self.child(self.path.push_index(items.len())))? {
            items.push(item);
        }
        Ok(Value::Array(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Value, A::Error> {
        let mut map = Map::new();
        while let Some(key) = access.next_key::<String>()? {
            let path = self.path.push_field(&key);
            if map.contains_key(&key) {
                return Err(self.fail(CanonicalizationError::DuplicateKey(path.to_string())));
            }
            let value = access.next_value_seed(self.child(path))?;
            map.insert(key, value);
        }
        Ok(Value::Object(map))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_accepts_plain_object() {
        let doc = Document::parse(br#"{"b": 1, "a": [true, null, 1.5]}"#).unwrap();
        assert_eq!(doc.len(), 2);
        assert_eq!(doc.get("a"), Some(&json!([true, null, 1.5])));
    }

    #[test]
    fn parse_rejects_top_level_duplicate() {
        let err = Document::parse(br#"{"a": 1, "a": 2}"#).unwrap_err();
        assert!(matches!(err, CanonicalizationError::DuplicateKey(ref p) if p == "a"));
    }

    #[test]
    fn parse_reports_nested_duplicate_path() {
        let err = Document::parse(br#"{"x": [{"k": 1}, {"k": 1, "k": 2}]}"#).unwrap_err();
        match err {
            CanonicalizationError::DuplicateKey(path) => assert_eq!(path, "x.[1].k"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn parse_rejects_non_object_root() {
        let err = Document::parse(b"[1, 2]").unwrap_err();
        assert!(matches!(err, CanonicalizationError::InvalidStructure(_)));
    }

    #[test]
    fn parse_rejects_trailing_garbage() {
        let err = Document::parse(br#"{"a": 1} x"#).unwrap_err();
        assert!(matches!(err, CanonicalizationError::InvalidJson(_)));
    }

    #[test]
    fn same_key_in_sibling_objects_is_fine() {
        let doc = Document::parse(br#"{"a": {"k": 1}, "b": {"k": 2}}"#).unwrap();
        assert_eq!(doc.get("b"), Some(&json!({"k": 2})));
    }

    #[test]
    fn deserialize_impl_rejects_duplicates() {
        let result: Result<Document, _> = serde_json::from_str(r#"{"a": {"z": 1, "z": 1}}"#);
        let message = result.unwrap_err().to_string();
        assert!(message.contains("duplicate key detected at a.z"), "{message}");
    }
}
