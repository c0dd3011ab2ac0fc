//! Parent/child messaging protocol.
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | `Message` | Either | Request handled by the receiving window |
//! | `Reply` | Back to sender | Acknowledgement or handshake result |
//! | `Envelope` | Either | Message plus source, target and correlation id |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `message` | Message kinds, payloads and replies |

// ============================================================================
// Submodules
// ============================================================================

/// Message kinds, payloads and replies.
pub mod message;

// ============================================================================
// Re-exports
// ============================================================================

pub use message::{Envelope, Message, MessageKind, RenderRequest, Reply};
