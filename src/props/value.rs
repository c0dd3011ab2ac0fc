//! Prop values and schema-ordered prop maps.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde_json::{Map, Value};

use super::function::PropFn;

// ============================================================================
// PropValue
// ============================================================================

/// A raw or resolved prop value.
///
/// Functions compare by identity; everything else compares structurally.
#[derive(Clone)]
pub enum PropValue {
    /// Absent value.
    Null,
    /// Text.
    String(String),
    /// Integer.
    Number(i64),
    /// Flag.
    Boolean(bool),
    /// Structural object.
    Object(Value),
    /// Structural list.
    Array(Vec<Value>),
    /// Callable reference.
    Function(PropFn),
}

impl PropValue {
    /// Returns `true` if the value counts as provided.
    ///
    /// Null and the empty string are treated as absent.
    #[inline]
    #[must_use]
    pub fn is_provided(&self) -> bool {
        match self {
            Self::Null => false,
            Self::String(s) => !s.is_empty(),
            _ => true,
        }
    }

    /// Returns the variant name, for diagnostics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::String(_) => "string",
            Self::Number(_) => "number",
            Self::Boolean(_) => "boolean",
            Self::Object(_) => "object",
            Self::Array(_) => "array",
            Self::Function(_) => "function",
        }
    }

    /// Returns the string value, if any.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the number value, if any.
    #[inline]
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the boolean value, if any.
    #[inline]
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the callable, if any.
    #[inline]
    #[must_use]
    pub fn as_function(&self) -> Option<&PropFn> {
        match self {
            Self::Function(f) => Some(f),
            _ => None,
        }
    }

    /// Converts to JSON.
    ///
    /// Returns `None` for functions, which have no structural form.
    #[must_use]
    pub fn to_json(&self) -> Option<Value> {
        match self {
            Self::Null => Some(Value::Null),
            Self::String(s) => Some(Value::String(s.clone())),
            Self::Number(n) => Some(Value::from(*n)),
            Self::Boolean(b) => Some(Value::Bool(*b)),
            Self::Object(v) => Some(v.clone()),
            Self::Array(items) => Some(Value::Array(items.clone())),
            Self::Function(_) => None,
        }
    }
}

impl PartialEq for PropValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => a == b,
            (Self::Function(a), Self::Function(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Debug for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("Null"),
            Self::String(s) => f.debug_tuple("String").field(s).finish(),
            Self::Number(n) => f.debug_tuple("Number").field(n).finish(),
            Self::Boolean(b) => f.debug_tuple("Boolean").field(b).finish(),
            Self::Object(v) => f.debug_tuple("Object").field(v).finish(),
            Self::Array(v) => f.debug_tuple("Array").field(v).finish(),
            Self::Function(func) => f.debug_tuple("Function").field(func).finish(),
        }
    }
}

// ============================================================================
// PropValue - Conversions
// ============================================================================

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for PropValue {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for PropValue {
    fn from(value: i32) -> Self {
        Self::Number(i64::from(value))
    }
}

impl From<u32> for PropValue {
    fn from(value: u32) -> Self {
        Self::Number(i64::from(value))
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<PropFn> for PropValue {
    fn from(value: PropFn) -> Self {
        Self::Function(value)
    }
}

impl From<Value> for PropValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Boolean(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Number(i),
                None => Self::String(n.to_string()),
            },
            Value::String(s) => Self::String(s),
            Value::Array(items) => Self::Array(items),
            object @ Value::Object(_) => Self::Object(object),
        }
    }
}

// ============================================================================
// PropMap
// ============================================================================

/// Insertion-ordered prop map.
///
/// Resolved maps follow schema order, which is also the order props appear
/// in the initial query string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropMap {
    entries: Vec<(String, PropValue)>,
}

impl PropMap {
    /// Creates an empty map.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a prop, builder style.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<PropValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Inserts or replaces a prop, keeping the original position on replace.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<PropValue>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(key, _)| *key == name) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Returns a prop value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&PropValue> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// Returns `true` if the prop is present (even if null).
    #[inline]
    #[must_use]
    pub fn contains_key(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Returns the string value of a prop, if it is a string.
    #[must_use]
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(PropValue::as_str)
    }

    /// Returns the callable of a prop, if it is a function.
    #[must_use]
    pub fn get_function(&self, name: &str) -> Option<&PropFn> {
        self.get(name).and_then(PropValue::as_function)
    }

    /// Number of props.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates props in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropValue)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Iterates prop names in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    /// Returns a copy with `other`'s entries laid over this map.
    #[must_use]
    pub fn merged(&self, other: &PropMap) -> PropMap {
        let mut merged = self.clone();
        for (name, value) in other.iter() {
            merged.insert(name, value.clone());
        }
        merged
    }

    /// Returns a copy without the named props.
    #[must_use]
    pub fn without(&self, names: &[&str]) -> PropMap {
        Self {
            entries: self
                .entries
                .iter()
                .filter(|(key, _)| !names.contains(&key.as_str()))
                .cloned()
                .collect(),
        }
    }

    /// Converts to a JSON object, skipping functions.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let object: Map<String, Value> = self
            .entries
            .iter()
            .filter_map(|(key, value)| value.to_json().map(|json| (key.clone(), json)))
            .collect();
        Value::Object(object)
    }

    /// Builds a raw map from a JSON object.
    ///
    /// Non-object input yields an empty map.
    #[must_use]
    pub fn from_json(value: &Value) -> PropMap {
        let mut map = PropMap::new();
        if let Some(object) = value.as_object() {
            for (key, value) in object {
                map.insert(key.clone(), PropValue::from(value.clone()));
            }
        }
        map
    }
}

impl<K: Into<String>, V: Into<PropValue>> FromIterator<(K, V)> for PropMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = PropMap::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

// ============================================================================
// Tests
// ============================================================================
