//! Parent-side component lifecycle.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `controller` | [`ParentController`]: render, update, resize, teardown |
//! | `handlers` | Messages from the child |
//! | `relay` | Rendering through the parent page, and sibling renders |
//! | `state` | [`LifecycleState`] |
//! | `init` | Single-settlement handshake gate |
//! | `cleanup` | Ordered teardown actions |
//! | `options` | [`RenderOptions`] |

// ============================================================================
// Submodules
// ============================================================================

/// Ordered teardown actions.
pub mod cleanup;

/// Component controller.
pub mod controller;

/// Message handlers.
mod handlers;

/// Handshake gate.
pub mod init;

/// Render options.
pub mod options;

/// Relay rendering.
mod relay;

/// Lifecycle states.
pub mod state;

// ============================================================================
// Re-exports
// ============================================================================

pub use cleanup::CleanupRegistry;
pub use controller::ParentController;
pub use init::{GateState, InitGate};
pub use options::RenderOptions;
pub use state::LifecycleState;
