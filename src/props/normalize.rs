//! Prop normalization.
//!
//! Resolves raw options into a fully typed prop map that contains exactly
//! the definition's schema keys, in schema order.
//!
//! # Per-prop pipeline
//!
//! 1. Provided only if present and not null / empty string.
//! 2. Absent: copy the aliased prop, else apply the default.
//! 3. Required and still absent: [`Error::RequiredPropMissing`].
//! 4. Coerce by declared type (see [`coerce`]).
//! 5. Run the validator: [`Error::InvalidProp`] on rejection.
//!
//! Normalizing an already-normalized map yields the same map.

// ============================================================================
// Imports
// ============================================================================

use serde_json::Value;
use tracing::debug;

use crate::component::ComponentDefinition;
use crate::error::{Error, Result};

use super::function::PropFn;
use super::schema::{PropDefault, PropDefinition, PropType};
use super::value::{PropMap, PropValue};

// ============================================================================
// Normalization
// ============================================================================

/// Resolves raw props against a definition's schema.
///
/// # Errors
///
/// - [`Error::RequiredPropMissing`] if a required prop has no value
/// - [`Error::InvalidProp`] if a value cannot be coerced or fails validation
pub fn normalize_props(definition: &ComponentDefinition, raw: &PropMap) -> Result<PropMap> {
    let tag = definition.tag();

    for key in raw.keys() {
        if definition.prop(key).is_none() {
            debug!(tag, prop = key, "Dropping unknown prop");
        }
    }

    let mut resolved = PropMap::new();

    for prop in definition.schema() {
        let name = prop.name();

        let provided = raw.get(name).filter(|value| value.is_provided()).cloned();
        let value = match provided {
            Some(value) => Some(value),
            None => fallback(definition, prop, raw, &resolved),
        };

        if prop.is_required() && value.is_none() {
            return Err(Error::required_prop_missing(tag, name));
        }

        let coerced = coerce(tag, prop, value)?;

        if let Some(validator) = prop.validator() {
            validator(&coerced, &resolved).map_err(|message| Error::invalid_prop(tag, name, message))?;
        }

        resolved.insert(name, coerced);
    }

    Ok(resolved)
}

/// Merges a partial update over the current map and re-normalizes.
///
/// # Errors
///
/// Same as [`normalize_props`].
pub fn merge_props(
    definition: &ComponentDefinition,
    current: &PropMap,
    partial: &PropMap,
) -> Result<PropMap> {
    normalize_props(definition, &current.merged(partial))
}

/// Returns the props forwarded to the child.
#[must_use]
pub fn props_for_child(definition: &ComponentDefinition, props: &PropMap) -> PropMap {
    props
        .iter()
        .filter(|(name, _)| definition.prop(name).is_some_and(PropDefinition::sends_to_child))
        .map(|(name, value)| (name, value.clone()))
        .collect()
}

/// Value for an absent prop: the aliased prop, else the default.
fn fallback(
    definition: &ComponentDefinition,
    prop: &PropDefinition,
    raw: &PropMap,
    resolved: &PropMap,
) -> Option<PropValue> {
    let aliased = prop.alias_of().and_then(|alias| {
        resolved
            .get(alias)
            .or_else(|| raw.get(alias))
            .filter(|value| value.is_provided())
            .cloned()
    });

    aliased
        .or_else(|| match prop.default_rule() {
            Some(PropDefault::Value(value)) => Some(value.clone()),
            Some(PropDefault::Producer(producer)) => Some(producer(resolved, definition)),
            None => None,
        })
        .filter(PropValue::is_provided)
}

// ============================================================================
// Coercion
// ============================================================================

/// Coerces a (possibly absent) value to the prop's declared type.
///
/// | Type | Absent | Provided |
/// |------|--------|----------|
/// | boolean | `false` | truthiness |
/// | string | `""` | identity; numbers/booleans rendered, objects as JSON |
/// | number | `0` | base-10 integer parse of the text form, `0` on failure |
/// | object / array | null | structural copy; JSON text is parsed |
/// | function | no-op if flagged, else null | wrapped by the pipeline |
///
/// # Errors
///
/// [`Error::InvalidProp`] when the value cannot represent the type.
pub fn coerce(tag: &str, prop: &PropDefinition, value: Option<PropValue>) -> Result<PropValue> {
    let name = prop.name();
    let mismatch = |value: &PropValue| {
        Error::invalid_prop(
            tag,
            name,
            format!("expected {}, got {}", prop.prop_type(), value.kind()),
        )
    };

    let coerced = match (prop.prop_type(), value) {
        (PropType::Boolean, None) => PropValue::Boolean(false),
        (PropType::Boolean, Some(value)) => PropValue::Boolean(truthy(&value)),

        (PropType::String, None) => PropValue::String(String::new()),
        (PropType::String, Some(PropValue::Function(f))) => {
            return Err(mismatch(&PropValue::Function(f)));
        }
        (PropType::String, Some(value)) => PropValue::String(text_of(&value)),

        (PropType::Number, None) => PropValue::Number(0),
        (PropType::Number, Some(PropValue::Number(n))) => PropValue::Number(n),
        (PropType::Number, Some(PropValue::Function(f))) => {
            return Err(mismatch(&PropValue::Function(f)));
        }
        (PropType::Number, Some(value)) => PropValue::Number(parse_int(&text_of(&value))),

        (PropType::Object, None) | (PropType::Array, None) => PropValue::Null,
        (PropType::Object, Some(value)) => match structural(&value)? {
            Some(object @ Value::Object(_)) => PropValue::Object(object),
            _ => return Err(mismatch(&value)),
        },
        (PropType::Array, Some(value)) => match structural(&value)? {
            Some(Value::Array(items)) => PropValue::Array(items),
            _ => return Err(mismatch(&value)),
        },

        (PropType::Function, None) if prop.is_noop() => {
            PropValue::Function(PropFn::noop().decorate(prop.wrappers()))
        }
        (PropType::Function, None) => PropValue::Null,
        (PropType::Function, Some(PropValue::Function(f))) => {
            PropValue::Function(f.decorate(prop.wrappers()))
        }
        (PropType::Function, Some(value)) => return Err(mismatch(&value)),
    };

    Ok(coerced)
}

/// Truthiness of a provided value.
fn truthy(value: &PropValue) -> bool {
    match value {
        PropValue::Null => false,
        PropValue::String(s) => !s.is_empty(),
        PropValue::Number(n) => *n != 0,
        PropValue::Boolean(b) => *b,
        PropValue::Object(_) | PropValue::Array(_) | PropValue::Function(_) => true,
    }
}

/// Text form of a non-function value.
fn text_of(value: &PropValue) -> String {
    match value {
        PropValue::Null | PropValue::Function(_) => String::new(),
        PropValue::String(s) => s.clone(),
        PropValue::Number(n) => n.to_string(),
        PropValue::Boolean(b) => b.to_string(),
        PropValue::Object(v) => v.to_string(),
        PropValue::Array(items) => Value::Array(items.clone()).to_string(),
    }
}

/// Structural copy of an object/array value, parsing JSON text.
///
/// Returns `Ok(None)` for values with no structural form.
fn structural(value: &PropValue) -> Result<Option<Value>> {
    let text = match value {
        PropValue::Object(v) => v.to_string(),
        PropValue::Array(items) => Value::Array(items.clone()).to_string(),
        PropValue::String(s) => s.clone(),
        _ => return Ok(None),
    };
    Ok(serde_json::from_str(&text).ok())
}

/// Parses the leading base-10 integer of `text`, or 0.
///
/// Accepts leading whitespace and an optional sign; stops at the first
/// non-digit. Overflow yields 0.
#[must_use]
pub fn parse_int(text: &str) -> i64 {
    let text = text.trim_start();
    let (negative, rest) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };

    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    let digits = &rest[..end];

    match digits.parse::<i64>() {
        Ok(n) if negative => -n,
        Ok(n) => n,
        Err(_) => 0,
    }
}

// ============================================================================
// Tests
// ============================================================================
