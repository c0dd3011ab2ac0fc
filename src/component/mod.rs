//! Component definitions.
//!
//! A [`ComponentDefinition`] is the immutable description of an embeddable
//! widget: its tag, where it is served from, how large it is, which render
//! contexts it may use and which props it accepts.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`ComponentDefinition`] | Immutable widget definition |
//! | [`DefinitionBuilder`] | Validating fluent builder |
//! | [`RenderContext`] | iframe / popup / lightbox |
//! | [`ContextSet`] | Allowed render contexts |
//! | [`Dimensions`] | Requested widget size and optional position |
//!
//! # Example
//!
//! ```ignore
//! use widget_embed::{ComponentDefinition, PropDefinition, RenderContext};
//!
//! let definition = ComponentDefinition::builder("checkout")
//!     .url("https://pay.example.com/checkout")
//!     .env_url("sandbox", "https://sandbox.pay.example.com/checkout")
//!     .dimensions(400, 300)
//!     .contexts([RenderContext::Iframe, RenderContext::Popup])
//!     .prop(PropDefinition::string("amount").required().query_param())
//!     .build()?;
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Render context enum and allowed-context set.
pub mod context;

/// Component definition and builder.
pub mod definition;

/// Widget dimensions.
pub mod dimensions;

// ============================================================================
// Re-exports
// ============================================================================

pub use context::{ContextSet, RenderContext};
pub use definition::{ComponentDefinition, DefinitionBuilder};
pub use dimensions::Dimensions;
