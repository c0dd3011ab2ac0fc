//! Initial-transport serialization.
//!
//! Query-eligible props seed the child's starting location so it can begin
//! rendering before any round trip.
//!
//! | Type | Encoding |
//! |------|----------|
//! | boolean | `1` when true, omitted when false |
//! | string / number | as-is |
//! | object / array | JSON text |
//! | function | skipped |
//!
//! Keys and values are percent-encoded and joined as `key=value` with `&`.

// ============================================================================
// Imports
// ============================================================================

use url::Url;

use crate::component::ComponentDefinition;
use crate::error::{Error, Result};

use super::schema::{PROP_ENV, PROP_URL};
use super::value::{PropMap, PropValue};

// ============================================================================
// Serialization
// ============================================================================

/// Serializes query-eligible props, in schema order.
#[must_use]
pub fn to_query(definition: &ComponentDefinition, props: &PropMap) -> String {
    let mut pairs = Vec::new();

    for prop in definition.schema() {
        let Some(key) = prop.query_key() else {
            continue;
        };
        let Some(value) = props.get(prop.name()).and_then(query_value) else {
            continue;
        };
        pairs.push(format!(
            "{}={}",
            urlencoding::encode(key),
            urlencoding::encode(&value)
        ));
    }

    pairs.join("&")
}

/// Text form of a value in the query, or `None` if it is skipped.
fn query_value(value: &PropValue) -> Option<String> {
    match value {
        PropValue::Null
        | PropValue::Function(_)
        | PropValue::Boolean(false)
        | PropValue::Number(0) => None,
        PropValue::Boolean(true) => Some("1".to_string()),
        PropValue::String(s) if s.is_empty() => None,
        PropValue::String(s) => Some(s.clone()),
        PropValue::Number(n) => Some(n.to_string()),
        PropValue::Object(_) | PropValue::Array(_) => value.to_json().map(|json| json.to_string()),
    }
}

/// Decodes a query string into raw key/value pairs.
///
/// # Errors
///
/// [`Error::Protocol`] if a component is not valid UTF-8 after decoding.
pub fn from_query(query: &str) -> Result<Vec<(String, String)>> {
    let decode = |part: &str| {
        urlencoding::decode(part)
            .map(|cow| cow.into_owned())
            .map_err(|e| Error::protocol(format!("Invalid query encoding: {e}")))
    };

    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            Ok((decode(key)?, decode(value)?))
        })
        .collect()
}

// ============================================================================
// URL Building
// ============================================================================

/// Resolves the base URL for a render.
///
/// Order: the `url` prop, the URL registered for the `env` prop, the
/// definition's base URL.
///
/// # Errors
///
/// [`Error::Config`] if no URL is available.
pub fn base_url<'a>(definition: &'a ComponentDefinition, props: &'a PropMap) -> Result<&'a str> {
    if let Some(url) = props.get_str(PROP_URL).filter(|url| !url.is_empty()) {
        return Ok(url);
    }

    let env = props
        .get_str(PROP_ENV)
        .filter(|env| !env.is_empty())
        .unwrap_or(definition.default_env());

    definition.url_for_env(env).ok_or_else(|| {
        Error::config(format!(
            "[{}] No url configured for env {env}",
            definition.tag()
        ))
    })
}

/// Builds the child's initial URL: base URL plus the props query.
///
/// An existing query on the base URL is kept and extended.
///
/// # Errors
///
/// - [`Error::Config`] if no URL is available
/// - [`Error::Url`] if the URL does not parse
pub fn build_url(definition: &ComponentDefinition, props: &PropMap) -> Result<Url> {
    let mut url = Url::parse(base_url(definition, props)?)?;
    let query = to_query(definition, props);

    if !query.is_empty() {
        let combined = match url.query() {
            Some(existing) if !existing.is_empty() => format!("{existing}&{query}"),
            _ => query,
        };
        url.set_query(Some(&combined));
    }

    Ok(url)
}

// ============================================================================
// Tests
// ============================================================================
