//! Message transport between windows.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  Parent page    │        Channel::send         │  Child window   │
//! │                 │─────── Message ─────────────►│                 │
//! │  Registry       │◄────── Reply ────────────────│  (widget)       │
//! │  → controllers  │                              │                 │
//! └─────────────────┘                              └─────────────────┘
//! ```
//!
//! Incoming messages are routed by the registry to the controller that
//! listens on the sending window.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `channel` | The `Channel` trait |
//! | `loopback` | In-process channel with correlation and timeouts |

// ============================================================================
// Submodules
// ============================================================================

/// The `Channel` trait.
pub mod channel;

/// In-process correlated channel.
pub mod loopback;

// ============================================================================
// Re-exports
// ============================================================================

pub use channel::Channel;
pub use loopback::{EndpointHandler, LoopbackChannel, endpoint};
