//! Widget Embed - parent-side controller for embedded cross-window widgets.
//!
//! This library renders third-party widgets into a host page as an inline
//! frame, a popup or a lightbox, and drives each one through a handshake
//! and message protocol with the page running inside the child window.
//!
//! # Architecture
//!
//! The library follows a parent/child model:
//!
//! - **Parent (this crate)**: opens child windows, owns their lifecycle,
//!   pushes props, reacts to child messages
//! - **Child (the widget page)**: sends INIT, receives props, may ask to
//!   resize, close, report an error or render a sibling
//!
//! Key design principles:
//!
//! - Each [`ParentController`] exclusively owns one child window
//! - Props are resolved against a typed schema before anything is sent
//! - Windows and messaging are injected through [`WindowHost`] and [`Channel`]
//! - Teardown is ordered, runs exactly once and is the only release point
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use widget_embed::{
//!     ComponentDefinition, LoopbackChannel, PropDefinition, PropMap, Registry, RenderOptions,
//! };
//!
//! # async fn example(host: Arc<impl widget_embed::WindowHost + 'static>) -> widget_embed::Result<()> {
//! let channel = Arc::new(LoopbackChannel::new());
//! let registry = Registry::builder()
//!     .host(host)
//!     .channel(Arc::clone(&channel))
//!     .component(
//!         ComponentDefinition::builder("pay-button")
//!             .url("https://pay.example.com/button")
//!             .prop(PropDefinition::string("amount").required().query_param())
//!             .build()?,
//!     )
//!     .build()?;
//! registry.attach(&channel);
//!
//! let button = registry.create("pay-button", &PropMap::new().with("amount", "9.99"))?;
//! button.render(RenderOptions::new().element("#pay"))?;
//! button.wait_init().await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`component`] | Component definitions, render contexts, dimensions |
//! | [`props`] | Prop schema, values, normalization, query transport |
//! | [`render`] | Render drivers, context selection, placement, window names |
//! | [`parent`] | [`ParentController`] lifecycle |
//! | [`registry`] | Per-page [`Registry`] |
//! | [`protocol`] | Message types |
//! | [`transport`] | [`Channel`] trait and loopback channel |
//! | [`host`] | [`WindowHost`] trait |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |

// ============================================================================
// Modules
// ============================================================================

/// Component definitions.
///
/// Use [`ComponentDefinition::builder()`] to describe a widget.
pub mod component;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Window and page primitives.
pub mod host;

/// Type-safe identifiers.
///
/// Newtype wrappers prevent mixing incompatible IDs at compile time.
pub mod identifiers;

/// Parent-side component lifecycle.
pub mod parent;

/// Prop schema and normalization.
pub mod props;

/// Parent/child message types.
pub mod protocol;

/// Per-page component registry.
pub mod registry;

/// Render drivers and placement.
pub mod render;

/// Message transport.
pub mod transport;

#[cfg(test)]
pub(crate) mod test_support;

// ============================================================================
// Re-exports
// ============================================================================

// Component types
pub use component::{ComponentDefinition, ContextSet, DefinitionBuilder, Dimensions, RenderContext};

// Error types
pub use error::{Error, Result};

// Host types
pub use host::{ElementRef, WindowHost};

// Identifier types
pub use identifiers::{InstanceId, ListenerId, OverlayId, RequestId, WindowId};

// Parent types
pub use parent::{LifecycleState, ParentController, RenderOptions};

// Prop types
pub use props::{PropDefinition, PropFn, PropMap, PropType, PropValue};

// Protocol types
pub use protocol::{Message, MessageKind, RenderRequest, Reply};

// Registry types
pub use registry::{Registry, RegistryBuilder, RegistryConfig};

// Render types
pub use render::{ChildWindowName, RenderDriver};

// Transport types
pub use transport::{Channel, LoopbackChannel};
