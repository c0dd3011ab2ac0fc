//! Prop schema and normalization.
//!
//! Raw render options are resolved against a definition's schema into a
//! fully typed [`PropMap`], which is then transported to the child: first as
//! the initial URL query, then whole through the handshake and updates.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `schema` | [`PropDefinition`] and the builtin props |
//! | `value` | [`PropValue`] and [`PropMap`] |
//! | `function` | [`PropFn`] and the wrapper pipeline |
//! | `normalize` | Raw → resolved map, update merge |
//! | `query` | Initial-transport query string and URL |

// ============================================================================
// Submodules
// ============================================================================

/// Callable props and the wrapper pipeline.
pub mod function;

/// Prop normalization.
pub mod normalize;

/// Initial-transport serialization.
pub mod query;

/// Prop definitions and builtins.
pub mod schema;

/// Prop values and maps.
pub mod value;

// ============================================================================
// Re-exports
// ============================================================================

pub use function::{Invocation, PropFn, Wrappers};
pub use normalize::{merge_props, normalize_props, props_for_child};
pub use query::{build_url, from_query, to_query};
pub use schema::{PropDefault, PropDefinition, PropType, QueryParam};
pub use value::{PropMap, PropValue};
