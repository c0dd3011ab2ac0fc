//! Component definition and its validating builder.
//!
//! # Example
//!
//! ```ignore
//! use widget_embed::{ComponentDefinition, PropDefinition, RenderContext};
//!
//! let definition = ComponentDefinition::builder("login")
//!     .url("https://auth.example.com/login")
//!     .dimensions(450, 600)
//!     .default_context(RenderContext::Popup)
//!     .singleton()
//!     .prop(PropDefinition::string("client_id").required().query_param())
//!     .build()?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use rustc_hash::{FxHashMap, FxHashSet};
use url::Url;

use crate::error::{Error, Result};
use crate::props::schema::{BUILTIN_PROPS, builtin_props};
use crate::props::PropDefinition;

use super::context::{ContextSet, RenderContext};
use super::dimensions::Dimensions;

// ============================================================================
// Constants
// ============================================================================

/// Environment used when none is configured.
pub const DEFAULT_ENV: &str = "production";

/// Valid component tags: lowercase, starting with a letter.
static TAG_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z][a-z0-9-]*$").expect("tag pattern is valid")
});

// ============================================================================
// ComponentDefinition
// ============================================================================

/// Immutable definition of an embeddable widget.
///
/// Create with [`ComponentDefinition::builder`].
pub struct ComponentDefinition {
    tag: String,
    url: Option<String>,
    env_urls: FxHashMap<String, String>,
    default_env: String,
    dimensions: Dimensions,
    contexts: ContextSet,
    default_context: Option<RenderContext>,
    singleton: bool,
    schema: Vec<PropDefinition>,
}

impl fmt::Debug for ComponentDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDefinition")
            .field("tag", &self.tag)
            .field("url", &self.url)
            .field("contexts", &self.contexts)
            .field("default_context", &self.default_context)
            .field("singleton", &self.singleton)
            .field("props", &self.schema.len())
            .finish_non_exhaustive()
    }
}

impl ComponentDefinition {
    /// Creates a builder for a definition with the given tag.
    #[inline]
    #[must_use]
    pub fn builder(tag: impl Into<String>) -> DefinitionBuilder {
        DefinitionBuilder::new(tag)
    }

    /// Unique tag.
    #[inline]
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Base URL, if configured.
    #[inline]
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// URL for an environment, falling back to the base URL.
    #[must_use]
    pub fn url_for_env(&self, env: &str) -> Option<&str> {
        self.env_urls
            .get(env)
            .map(String::as_str)
            .or(self.url.as_deref())
    }

    /// Environment used when the `env` prop is absent.
    #[inline]
    #[must_use]
    pub fn default_env(&self) -> &str {
        &self.default_env
    }

    /// Requested dimensions.
    #[inline]
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Allowed render contexts.
    #[inline]
    #[must_use]
    pub fn contexts(&self) -> ContextSet {
        self.contexts
    }

    /// Declared default context.
    #[inline]
    #[must_use]
    pub fn default_context(&self) -> Option<RenderContext> {
        self.default_context
    }

    /// Whether at most one instance may be live.
    #[inline]
    #[must_use]
    pub fn is_singleton(&self) -> bool {
        self.singleton
    }

    /// Full schema: builtins followed by user props.
    #[inline]
    #[must_use]
    pub fn schema(&self) -> &[PropDefinition] {
        &self.schema
    }

    /// Looks up a prop definition by name.
    #[must_use]
    pub fn prop(&self, name: &str) -> Option<&PropDefinition> {
        self.schema.iter().find(|prop| prop.name() == name)
    }
}

// ============================================================================
// DefinitionBuilder
// ============================================================================

/// Builder for [`ComponentDefinition`].
#[derive(Debug)]
pub struct DefinitionBuilder {
    tag: String,
    url: Option<String>,
    env_urls: FxHashMap<String, String>,
    default_env: Option<String>,
    dimensions: Dimensions,
    contexts: ContextSet,
    default_context: Option<RenderContext>,
    singleton: bool,
    props: Vec<PropDefinition>,
}

impl DefinitionBuilder {
    /// Creates a builder with every context allowed and default dimensions.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            url: None,
            env_urls: FxHashMap::default(),
            default_env: None,
            dimensions: Dimensions::default(),
            contexts: ContextSet::all(),
            default_context: None,
            singleton: false,
            props: Vec::new(),
        }
    }

    /// Sets the base URL.
    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Sets the URL used for one environment.
    #[must_use]
    pub fn env_url(mut self, env: impl Into<String>, url: impl Into<String>) -> Self {
        self.env_urls.insert(env.into(), url.into());
        self
    }

    /// Sets the environment used when the `env` prop is absent.
    #[must_use]
    pub fn default_env(mut self, env: impl Into<String>) -> Self {
        self.default_env = Some(env.into());
        self
    }

    /// Sets the requested width and height (centered).
    #[must_use]
    pub fn dimensions(mut self, width: u32, height: u32) -> Self {
        self.dimensions = Dimensions::new(width, height);
        self
    }

    /// Sets the full dimensions policy.
    #[must_use]
    pub fn with_dimensions(mut self, dimensions: Dimensions) -> Self {
        self.dimensions = dimensions;
        self
    }

    /// Restricts the allowed contexts.
    #[must_use]
    pub fn contexts(mut self, contexts: impl IntoIterator<Item = RenderContext>) -> Self {
        self.contexts = contexts.into_iter().collect();
        self
    }

    /// Sets the preferred context when none is requested.
    #[must_use]
    pub fn default_context(mut self, context: RenderContext) -> Self {
        self.default_context = Some(context);
        self
    }

    /// Allows at most one live instance.
    #[must_use]
    pub fn singleton(mut self) -> Self {
        self.singleton = true;
        self
    }

    /// Adds a user prop.
    #[must_use]
    pub fn prop(mut self, prop: PropDefinition) -> Self {
        self.props.push(prop);
        self
    }

    /// Builds the definition with validation.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] if the tag is malformed, no URL is configured, a
    /// URL does not parse, no context is allowed, the default context is
    /// not allowed, a prop reuses a builtin or duplicate name, or an alias
    /// points at an unknown prop.
    pub fn build(self) -> Result<ComponentDefinition> {
        self.validate_tag()?;
        self.validate_urls()?;
        self.validate_contexts()?;

        let mut schema = builtin_props();
        let mut seen: FxHashSet<String> = BUILTIN_PROPS.iter().map(|s| s.to_string()).collect();

        for prop in self.props {
            if BUILTIN_PROPS.contains(&prop.name()) {
                return Err(Error::config(format!(
                    "[{}] Prop name is reserved: {}",
                    self.tag,
                    prop.name()
                )));
            }
            if !seen.insert(prop.name().to_string()) {
                return Err(Error::config(format!(
                    "[{}] Duplicate prop: {}",
                    self.tag,
                    prop.name()
                )));
            }
            schema.push(prop);
        }

        if let Some((prop, alias)) = schema
            .iter()
            .filter_map(|prop| prop.alias_of().map(|alias| (prop.name(), alias)))
            .find(|(_, alias)| !seen.contains(*alias))
        {
            return Err(Error::config(format!(
                "[{}] Prop {prop} aliases unknown prop {alias}",
                self.tag
            )));
        }

        Ok(ComponentDefinition {
            tag: self.tag,
            url: self.url,
            env_urls: self.env_urls,
            default_env: self.default_env.unwrap_or_else(|| DEFAULT_ENV.to_string()),
            dimensions: self.dimensions,
            contexts: self.contexts,
            default_context: self.default_context,
            singleton: self.singleton,
            schema,
        })
    }
}

// ============================================================================
// Validation
// ============================================================================

impl DefinitionBuilder {
    fn validate_tag(&self) -> Result<()> {
        if TAG_PATTERN.is_match(&self.tag) {
            Ok(())
        } else {
            Err(Error::config(format!(
                "Invalid component tag {:?}: expected lowercase letters, digits and '-'",
                self.tag
            )))
        }
    }

    fn validate_urls(&self) -> Result<()> {
        if self.url.is_none() && self.env_urls.is_empty() {
            return Err(Error::config(format!(
                "[{}] A url or at least one env url is required",
                self.tag
            )));
        }

        for url in self.url.iter().chain(self.env_urls.values()) {
            Url::parse(url)
                .map_err(|e| Error::config(format!("[{}] Invalid url {url}: {e}", self.tag)))?;
        }
        Ok(())
    }

    fn validate_contexts(&self) -> Result<()> {
        if self.contexts.is_empty() {
            return Err(Error::config(format!(
                "[{}] At least one render context must be allowed",
                self.tag
            )));
        }

        if let Some(context) = self.default_context
            && !self.contexts.contains(context)
        {
            return Err(Error::config(format!(
                "[{}] Default context {context} is not allowed",
                self.tag
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
