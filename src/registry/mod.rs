//! Per-page component registry.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `core` | [`Registry`]: definitions, live instances, routing |
//! | `builder` | [`RegistryBuilder`] and [`RegistryConfig`] |

// ============================================================================
// Submodules
// ============================================================================

/// Registry configuration builder.
pub mod builder;

/// Registry implementation.
pub mod core;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::{RegistryBuilder, RegistryConfig};
pub use self::core::Registry;
