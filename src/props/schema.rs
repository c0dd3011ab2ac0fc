//! Prop definitions and the builtin prop set.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

use crate::component::ComponentDefinition;

use super::function::Wrappers;
use super::value::{PropMap, PropValue};

// ============================================================================
// Builtin Prop Names
// ============================================================================

/// Environment name used to pick the widget URL.
pub const PROP_ENV: &str = "env";
/// Unique id of the rendered instance, as seen by the child.
pub const PROP_UID: &str = "uid";
/// Explicit URL override.
pub const PROP_URL: &str = "url";
/// Handshake timeout in milliseconds (0 disables it).
pub const PROP_TIMEOUT: &str = "timeout";
/// Dimension overrides for this render.
pub const PROP_DIMENSIONS: &str = "dimensions";
/// Called when the handshake completes.
pub const PROP_ON_ENTER: &str = "on_enter";
/// Called once the instance is destroyed.
pub const PROP_ON_CLOSE: &str = "on_close";
/// Called when the handshake times out.
pub const PROP_ON_TIMEOUT: &str = "on_timeout";
/// Called with remote errors.
pub const PROP_ON_ERROR: &str = "on_error";

/// Reserved names, in schema order.
pub const BUILTIN_PROPS: [&str; 9] = [
    PROP_ENV,
    PROP_UID,
    PROP_URL,
    PROP_TIMEOUT,
    PROP_DIMENSIONS,
    PROP_ON_ENTER,
    PROP_ON_CLOSE,
    PROP_ON_TIMEOUT,
    PROP_ON_ERROR,
];

// ============================================================================
// Types
// ============================================================================

/// Produces a default from the props resolved so far.
pub type DefaultProducer = Arc<dyn Fn(&PropMap, &ComponentDefinition) -> PropValue + Send + Sync>;

/// Validates a coerced value against the props resolved so far.
pub type Validator = Arc<dyn Fn(&PropValue, &PropMap) -> Result<(), String> + Send + Sync>;

// ============================================================================
// PropType
// ============================================================================

/// Declared type of a prop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropType {
    /// Text.
    String,
    /// Base-10 integer.
    Number,
    /// Truthiness flag.
    Boolean,
    /// Callable.
    Function,
    /// Structural object.
    Object,
    /// Structural list.
    Array,
}

impl PropType {
    /// Returns the lowercase type name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Function => "function",
            Self::Object => "object",
            Self::Array => "array",
        }
    }
}

impl fmt::Display for PropType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// PropDefault
// ============================================================================

/// Default applied to an absent prop.
#[derive(Clone)]
pub enum PropDefault {
    /// Constant value.
    Value(PropValue),
    /// Computed from props resolved so far and the definition.
    Producer(DefaultProducer),
}

impl fmt::Debug for PropDefault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Producer(_) => f.write_str("Producer(..)"),
        }
    }
}

// ============================================================================
// QueryParam
// ============================================================================

/// Whether a prop is part of the initial query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum QueryParam {
    /// Not sent in the query.
    #[default]
    Skip,
    /// Sent under the prop's own name.
    Named,
    /// Sent under a custom key.
    Key(String),
}

// ============================================================================
// PropDefinition
// ============================================================================

/// Definition of a single prop.
///
/// Built with a type constructor and chained flag setters:
///
/// ```ignore
/// let amount = PropDefinition::number("amount").required().query_param();
/// let on_done = PropDefinition::function("on_done").noop().once();
/// ```
#[derive(Clone)]
pub struct PropDefinition {
    name: String,
    prop_type: PropType,
    required: bool,
    default: Option<PropDefault>,
    alias: Option<String>,
    wrappers: Wrappers,
    noop: bool,
    send_to_child: bool,
    query_param: QueryParam,
    validator: Option<Validator>,
}

impl fmt::Debug for PropDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropDefinition")
            .field("name", &self.name)
            .field("prop_type", &self.prop_type)
            .field("required", &self.required)
            .field("default", &self.default)
            .field("alias", &self.alias)
            .field("query_param", &self.query_param)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// PropDefinition - Constructors
// ============================================================================

impl PropDefinition {
    /// Creates an optional prop of the given type.
    #[must_use]
    pub fn new(name: impl Into<String>, prop_type: PropType) -> Self {
        Self {
            name: name.into(),
            prop_type,
            required: false,
            default: None,
            alias: None,
            wrappers: Wrappers::default(),
            noop: false,
            send_to_child: true,
            query_param: QueryParam::Skip,
            validator: None,
        }
    }

    /// Creates a string prop.
    #[inline]
    #[must_use]
    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, PropType::String)
    }

    /// Creates a number prop.
    #[inline]
    #[must_use]
    pub fn number(name: impl Into<String>) -> Self {
        Self::new(name, PropType::Number)
    }

    /// Creates a boolean prop.
    #[inline]
    #[must_use]
    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, PropType::Boolean)
    }

    /// Creates a function prop.
    #[inline]
    #[must_use]
    pub fn function(name: impl Into<String>) -> Self {
        Self::new(name, PropType::Function)
    }

    /// Creates an object prop.
    #[inline]
    #[must_use]
    pub fn object(name: impl Into<String>) -> Self {
        Self::new(name, PropType::Object)
    }

    /// Creates an array prop.
    #[inline]
    #[must_use]
    pub fn array(name: impl Into<String>) -> Self {
        Self::new(name, PropType::Array)
    }
}

// ============================================================================
// PropDefinition - Builder Methods
// ============================================================================

impl PropDefinition {
    /// Marks the prop as required.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Sets a constant default.
    #[must_use]
    pub fn default_value(mut self, value: impl Into<PropValue>) -> Self {
        self.default = Some(PropDefault::Value(value.into()));
        self
    }

    /// Sets a computed default.
    #[must_use]
    pub fn default_with<F>(mut self, producer: F) -> Self
    where
        F: Fn(&PropMap, &ComponentDefinition) -> PropValue + Send + Sync + 'static,
    {
        self.default = Some(PropDefault::Producer(Arc::new(producer)));
        self
    }

    /// Copies another prop's value when this one is absent.
    #[must_use]
    pub fn alias(mut self, other: impl Into<String>) -> Self {
        self.alias = Some(other.into());
        self
    }

    /// Function only: only the first call runs.
    #[must_use]
    pub fn once(mut self) -> Self {
        self.wrappers.once = true;
        self
    }

    /// Function only: the first successful result is cached.
    #[must_use]
    pub fn memoize(mut self) -> Self {
        self.wrappers.memoize = true;
        self
    }

    /// Function only: calls are deferred into a future.
    #[must_use]
    pub fn promisify(mut self) -> Self {
        self.wrappers.promisify = true;
        self
    }

    /// Function only: substitute a no-op when absent.
    #[must_use]
    pub fn noop(mut self) -> Self {
        self.noop = true;
        self
    }

    /// Keeps the prop on the parent side only.
    #[must_use]
    pub fn parent_only(mut self) -> Self {
        self.send_to_child = false;
        self
    }

    /// Includes the prop in the initial query under its own name.
    #[must_use]
    pub fn query_param(mut self) -> Self {
        self.query_param = QueryParam::Named;
        self
    }

    /// Includes the prop in the initial query under a custom key.
    #[must_use]
    pub fn query_param_as(mut self, key: impl Into<String>) -> Self {
        self.query_param = QueryParam::Key(key.into());
        self
    }

    /// Sets a validator run after coercion.
    #[must_use]
    pub fn validate<F>(mut self, validator: F) -> Self
    where
        F: Fn(&PropValue, &PropMap) -> Result<(), String> + Send + Sync + 'static,
    {
        self.validator = Some(Arc::new(validator));
        self
    }
}

// ============================================================================
// PropDefinition - Accessors
// ============================================================================

impl PropDefinition {
    /// Prop name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared type.
    #[inline]
    #[must_use]
    pub fn prop_type(&self) -> PropType {
        self.prop_type
    }

    /// Whether the prop must resolve to a provided value.
    #[inline]
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Default, if any.
    #[inline]
    #[must_use]
    pub fn default_rule(&self) -> Option<&PropDefault> {
        self.default.as_ref()
    }

    /// Aliased prop name, if any.
    #[inline]
    #[must_use]
    pub fn alias_of(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// Requested function wrappers.
    #[inline]
    #[must_use]
    pub fn wrappers(&self) -> Wrappers {
        self.wrappers
    }

    /// Whether a no-op replaces an absent function.
    #[inline]
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.noop
    }

    /// Whether the prop is forwarded to the child.
    #[inline]
    #[must_use]
    pub fn sends_to_child(&self) -> bool {
        self.send_to_child
    }

    /// Query key, if the prop is part of the initial query.
    #[must_use]
    pub fn query_key(&self) -> Option<&str> {
        match &self.query_param {
            QueryParam::Skip => None,
            QueryParam::Named => Some(&self.name),
            QueryParam::Key(key) => Some(key),
        }
    }

    /// Validator, if any.
    #[inline]
    #[must_use]
    pub fn validator(&self) -> Option<&Validator> {
        self.validator.as_ref()
    }
}

// ============================================================================
// Builtins
// ============================================================================

/// Returns the builtin props, in schema order.
///
/// User props are appended after these and may not reuse their names.
#[must_use]
pub fn builtin_props() -> Vec<PropDefinition> {
    vec![
        PropDefinition::string(PROP_ENV)
            .default_with(|_, definition| PropValue::from(definition.default_env()))
            .query_param(),
        PropDefinition::string(PROP_UID)
            .default_with(|_, _| PropValue::from(Uuid::new_v4().to_string()))
            .query_param(),
        PropDefinition::string(PROP_URL).parent_only(),
        PropDefinition::number(PROP_TIMEOUT).parent_only(),
        PropDefinition::object(PROP_DIMENSIONS),
        PropDefinition::function(PROP_ON_ENTER)
            .noop()
            .once()
            .promisify(),
        PropDefinition::function(PROP_ON_CLOSE)
            .noop()
            .once()
            .promisify(),
        PropDefinition::function(PROP_ON_TIMEOUT)
            .noop()
            .once()
            .promisify(),
        PropDefinition::function(PROP_ON_ERROR).promisify(),
    ]
}

// ============================================================================
// Tests
// ============================================================================
