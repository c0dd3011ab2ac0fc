//! Builder pattern for registry configuration.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use widget_embed::Registry;
//!
//! let registry = Registry::builder()
//!     .host(host)
//!     .channel(channel)
//!     .default_timeout(Duration::from_secs(10))
//!     .build()?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::component::{ComponentDefinition, RenderContext};
use crate::error::{Error, Result};
use crate::host::WindowHost;
use crate::identifiers::WindowId;
use crate::render::{ChildWindowName, DriverTable};
use crate::transport::Channel;

use super::core::Registry;

// ============================================================================
// RegistryConfig
// ============================================================================

/// Page-level configuration shared by every controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Window this page runs in.
    pub window: WindowId,

    /// This page's own child window name, when it is itself a child.
    pub window_name: Option<String>,

    /// Parent window, when this page is itself a child.
    pub parent_window: Option<WindowId>,

    /// Handshake timeout used when a component sets none (zero disables).
    pub default_timeout: Duration,
}

// ============================================================================
// RegistryBuilder
// ============================================================================

/// Builder for configuring a [`Registry`].
///
/// Use [`Registry::builder()`] to create a new builder.
#[derive(Default)]
pub struct RegistryBuilder {
    /// Window and page primitives.
    host: Option<Arc<dyn WindowHost>>,
    /// Message channel.
    channel: Option<Arc<dyn Channel>>,
    /// Own window.
    window: Option<WindowId>,
    /// Own child window name.
    window_name: Option<String>,
    /// Parent window.
    parent_window: Option<WindowId>,
    /// Default handshake timeout.
    default_timeout: Duration,
    /// Disabled render contexts.
    disabled: Vec<RenderContext>,
    /// Definitions registered on build.
    components: Vec<ComponentDefinition>,
}

impl fmt::Debug for RegistryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryBuilder")
            .field("has_host", &self.host.is_some())
            .field("has_channel", &self.channel.is_some())
            .field("window", &self.window)
            .field("window_name", &self.window_name)
            .field("parent_window", &self.parent_window)
            .field("default_timeout", &self.default_timeout)
            .field("components", &self.components.len())
            .finish()
    }
}

// ============================================================================
// RegistryBuilder Implementation
// ============================================================================

impl RegistryBuilder {
    /// Creates a builder with no configuration.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the window host.
    #[inline]
    #[must_use]
    pub fn host<H: WindowHost + 'static>(mut self, host: Arc<H>) -> Self {
        self.host = Some(host as Arc<dyn WindowHost>);
        self
    }

    /// Sets the message channel.
    #[inline]
    #[must_use]
    pub fn channel<C: Channel + 'static>(mut self, channel: Arc<C>) -> Self {
        self.channel = Some(channel as Arc<dyn Channel>);
        self
    }

    /// Sets this page's window; a fresh id is used otherwise.
    #[inline]
    #[must_use]
    pub fn window(mut self, window: WindowId) -> Self {
        self.window = Some(window);
        self
    }

    /// Sets this page's own child window name.
    ///
    /// Required, with a parent window, to render through the parent.
    #[inline]
    #[must_use]
    pub fn window_name(mut self, name: impl Into<String>) -> Self {
        self.window_name = Some(name.into());
        self
    }

    /// Sets the parent window.
    #[inline]
    #[must_use]
    pub fn parent_window(mut self, window: WindowId) -> Self {
        self.parent_window = Some(window);
        self
    }

    /// Sets the default handshake timeout.
    #[inline]
    #[must_use]
    pub fn default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Disables a render context for every component.
    #[inline]
    #[must_use]
    pub fn disable_context(mut self, context: RenderContext) -> Self {
        self.disabled.push(context);
        self
    }

    /// Registers a component on build.
    #[inline]
    #[must_use]
    pub fn component(mut self, definition: ComponentDefinition) -> Self {
        self.components.push(definition);
        self
    }

    /// Builds the registry with validation.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the host or channel is not set
    /// - [`Error::Config`] if the window name is not a child window name
    /// - [`Error::Config`] if two components share a tag
    pub fn build(self) -> Result<Registry> {
        let host = self.host.ok_or_else(|| {
            Error::config(
                "Window host is required. Use .host() to set it.\n\
                 Example: Registry::builder().host(Arc::new(my_host))",
            )
        })?;
        let channel = self.channel.ok_or_else(|| {
            Error::config("Message channel is required. Use .channel() to set it.")
        })?;

        if let Some(name) = &self.window_name
            && !ChildWindowName::is_child_name(name)
        {
            return Err(Error::config(format!(
                "Window name {name:?} is not a child window name"
            )));
        }

        let drivers = self
            .disabled
            .into_iter()
            .fold(DriverTable::standard(), DriverTable::without);

        let config = RegistryConfig {
            window: self.window.unwrap_or_else(WindowId::next),
            window_name: self.window_name,
            parent_window: self.parent_window,
            default_timeout: self.default_timeout,
        };

        let registry = Registry::new(host, channel, config, drivers);
        for definition in self.components {
            registry.register(definition)?;
        }
        Ok(registry)
    }
}
