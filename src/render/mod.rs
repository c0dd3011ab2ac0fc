//! Render drivers and window placement.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `driver` | Per-context open strategies and the driver table |
//! | `select` | Render context selection |
//! | `position` | Centering on screen |
//! | `window_name` | Encoded child window names |

// ============================================================================
// Submodules
// ============================================================================

/// Per-context open strategies.
pub mod driver;

/// Screen placement.
pub mod position;

/// Render context selection.
pub mod select;

/// Child window names.
pub mod window_name;

// ============================================================================
// Re-exports
// ============================================================================

pub use driver::{DriverTable, RenderDriver};
pub use position::{Rect, Size, center_axis, place};
pub use select::select_context;
pub use window_name::{ChildWindowName, ParentLink};
