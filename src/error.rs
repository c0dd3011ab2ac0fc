//! Error types for widget-embed.
//!
//! This module defines all error types used throughout the crate.
//! Every component-scoped variant names the offending component's tag.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use widget_embed::{Error, RenderOptions, Result};
//!
//! fn example(controller: &ParentController) -> Result<()> {
//!     match controller.render(RenderOptions::new()) {
//!         Err(e) if e.is_popup_blocked() => {
//!             // Ask the user to click again, then retry.
//!             Ok(())
//!         }
//!         other => other,
//!     }
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::InvalidContext`], [`Error::RequiredPropMissing`], [`Error::InvalidProp`], [`Error::SingletonViolation`], [`Error::UnknownComponent`] |
//! | Environment | [`Error::PopupBlocked`], [`Error::MissingElement`], [`Error::NoAvailableContext`] |
//! | Lifecycle | [`Error::AlreadyRendered`], [`Error::RelayUnavailable`], [`Error::Destroyed`] |
//! | Remote | [`Error::Remote`], [`Error::Timeout`] |
//! | Transport | [`Error::Transport`], [`Error::Protocol`], [`Error::RequestTimeout`], [`Error::ChannelClosed`] |
//! | External | [`Error::Url`], [`Error::Json`] |

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use thiserror::Error;
use tokio::sync::oneshot::error::RecvError;

use crate::component::RenderContext;
use crate::identifiers::RequestId;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when a definition or registry configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// Requested render context is not allowed for the component.
    #[error("[{tag}] Invalid context: {context} ({reason})")]
    InvalidContext {
        /// Component tag.
        tag: String,
        /// The rejected context.
        context: RenderContext,
        /// Why the context was rejected.
        reason: String,
    },

    /// A required prop is missing after defaults were applied.
    #[error("[{tag}] Required prop missing: {prop}")]
    RequiredPropMissing {
        /// Component tag.
        tag: String,
        /// Name of the missing prop.
        prop: String,
    },

    /// A prop was rejected by its validator.
    #[error("[{tag}] Invalid prop {prop}: {message}")]
    InvalidProp {
        /// Component tag.
        tag: String,
        /// Name of the rejected prop.
        prop: String,
        /// Validator message.
        message: String,
    },

    /// A second instance of a singleton component was rendered.
    #[error("[{tag}] Singleton component is already rendered")]
    SingletonViolation {
        /// Component tag.
        tag: String,
    },

    /// No definition registered for a tag.
    #[error("Unknown component: {tag}")]
    UnknownComponent {
        /// The unregistered tag.
        tag: String,
    },

    // ========================================================================
    // Environment Errors
    // ========================================================================
    /// The browser blocked the popup window.
    ///
    /// Retry from a direct user gesture.
    #[error("[{tag}] Popup blocked")]
    PopupBlocked {
        /// Component tag.
        tag: String,
    },

    /// The target element could not be resolved.
    #[error("[{tag}] Element not found: {selector}")]
    MissingElement {
        /// Component tag.
        tag: String,
        /// Selector that matched nothing.
        selector: String,
    },

    /// No allowed render context qualifies.
    #[error("[{tag}] No available render context")]
    NoAvailableContext {
        /// Component tag.
        tag: String,
    },

    // ========================================================================
    // Lifecycle Errors
    // ========================================================================
    /// Render called on an instance that is not idle.
    #[error("[{tag}] Already rendered (state: {state})")]
    AlreadyRendered {
        /// Component tag.
        tag: String,
        /// Lifecycle state at the time of the call.
        state: String,
    },

    /// Relay rendering is not possible from this context.
    #[error("[{tag}] Cannot render to parent: {reason}")]
    RelayUnavailable {
        /// Component tag.
        tag: String,
        /// Missing prerequisite.
        reason: String,
    },

    /// Operation on an instance that has been destroyed.
    #[error("[{tag}] Component destroyed")]
    Destroyed {
        /// Component tag.
        tag: String,
    },

    // ========================================================================
    // Remote Errors
    // ========================================================================
    /// Error reported by the child context.
    #[error("[{tag}] Remote error: {message}")]
    Remote {
        /// Component tag.
        tag: String,
        /// Message sent by the child.
        message: String,
    },

    /// The child did not complete the handshake in time.
    #[error("[{tag}] Timeout after {timeout_ms}ms waiting for init")]
    Timeout {
        /// Component tag.
        tag: String,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    // ========================================================================
    // Transport Errors
    // ========================================================================
    /// Message could not be delivered.
    #[error("Transport error: {message}")]
    Transport {
        /// Description of the delivery failure.
        message: String,
    },

    /// Protocol violation or unexpected message.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    /// Request timed out waiting for a reply.
    #[error("Request {request_id} timed out after {timeout_ms}ms")]
    RequestTimeout {
        /// The request ID that timed out.
        request_id: RequestId,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// URL parse error.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Channel receive error.
    #[error("Channel closed")]
    ChannelClosed(#[from] RecvError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an invalid context error.
    #[inline]
    pub fn invalid_context(
        tag: impl Into<String>,
        context: RenderContext,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidContext {
            tag: tag.into(),
            context,
            reason: reason.into(),
        }
    }

    /// Creates a required prop missing error.
    #[inline]
    pub fn required_prop_missing(tag: impl Into<String>, prop: impl Into<String>) -> Self {
        Self::RequiredPropMissing {
            tag: tag.into(),
            prop: prop.into(),
        }
    }

    /// Creates an invalid prop error.
    #[inline]
    pub fn invalid_prop(
        tag: impl Into<String>,
        prop: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidProp {
            tag: tag.into(),
            prop: prop.into(),
            message: message.into(),
        }
    }

    /// Creates a singleton violation error.
    #[inline]
    pub fn singleton_violation(tag: impl Into<String>) -> Self {
        Self::SingletonViolation { tag: tag.into() }
    }

    /// Creates an unknown component error.
    #[inline]
    pub fn unknown_component(tag: impl Into<String>) -> Self {
        Self::UnknownComponent { tag: tag.into() }
    }

    /// Creates a popup blocked error.
    #[inline]
    pub fn popup_blocked(tag: impl Into<String>) -> Self {
        Self::PopupBlocked { tag: tag.into() }
    }

    /// Creates a missing element error.
    #[inline]
    pub fn missing_element(tag: impl Into<String>, selector: impl Into<String>) -> Self {
        Self::MissingElement {
            tag: tag.into(),
            selector: selector.into(),
        }
    }

    /// Creates a no available context error.
    #[inline]
    pub fn no_available_context(tag: impl Into<String>) -> Self {
        Self::NoAvailableContext { tag: tag.into() }
    }

    /// Creates an already rendered error.
    #[inline]
    pub fn already_rendered(tag: impl Into<String>, state: impl ToString) -> Self {
        Self::AlreadyRendered {
            tag: tag.into(),
            state: state.to_string(),
        }
    }

    /// Creates a relay unavailable error.
    #[inline]
    pub fn relay_unavailable(tag: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::RelayUnavailable {
            tag: tag.into(),
            reason: reason.into(),
        }
    }

    /// Creates a destroyed error.
    #[inline]
    pub fn destroyed(tag: impl Into<String>) -> Self {
        Self::Destroyed { tag: tag.into() }
    }

    /// Creates a remote error.
    #[inline]
    pub fn remote(tag: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Remote {
            tag: tag.into(),
            message: message.into(),
        }
    }

    /// Creates a handshake timeout error.
    #[inline]
    pub fn timeout(tag: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            tag: tag.into(),
            timeout_ms,
        }
    }

    /// Creates a transport error.
    #[inline]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates a request timeout error.
    #[inline]
    pub fn request_timeout(request_id: RequestId, timeout_ms: u64) -> Self {
        Self::RequestTimeout {
            request_id,
            timeout_ms,
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if the browser blocked a popup.
    #[inline]
    #[must_use]
    pub fn is_popup_blocked(&self) -> bool {
        matches!(self, Self::PopupBlocked { .. })
    }

    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::RequestTimeout { .. })
    }

    /// Returns `true` if this is a configuration error.
    ///
    /// Configuration errors are never worth retrying.
    #[inline]
    #[must_use]
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::Config { .. }
                | Self::InvalidContext { .. }
                | Self::RequiredPropMissing { .. }
                | Self::InvalidProp { .. }
                | Self::SingletonViolation { .. }
                | Self::UnknownComponent { .. }
                | Self::Url(_)
        )
    }

    /// Returns `true` if this is a lifecycle error.
    #[inline]
    #[must_use]
    pub fn is_lifecycle_error(&self) -> bool {
        matches!(
            self,
            Self::AlreadyRendered { .. } | Self::RelayUnavailable { .. } | Self::Destroyed { .. }
        )
    }

    /// Returns `true` if this is a transport error.
    #[inline]
    #[must_use]
    pub fn is_transport_error(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. }
                | Self::Protocol { .. }
                | Self::RequestTimeout { .. }
                | Self::ChannelClosed(_)
        )
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// Recoverable errors may succeed on retry.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::PopupBlocked { .. }
                | Self::Timeout { .. }
                | Self::RequestTimeout { .. }
                | Self::Transport { .. }
        )
    }

    /// Returns the component tag this error names, if any.
    #[must_use]
    pub fn tag(&self) -> Option<&str> {
        match self {
            Self::InvalidContext { tag, .. }
            | Self::RequiredPropMissing { tag, .. }
            | Self::InvalidProp { tag, .. }
            | Self::SingletonViolation { tag }
            | Self::UnknownComponent { tag }
            | Self::PopupBlocked { tag }
            | Self::MissingElement { tag, .. }
            | Self::NoAvailableContext { tag }
            | Self::AlreadyRendered { tag, .. }
            | Self::RelayUnavailable { tag, .. }
            | Self::Destroyed { tag }
            | Self::Remote { tag, .. }
            | Self::Timeout { tag, .. } => Some(tag),
            _ => None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
