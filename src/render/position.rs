//! Screen placement for popups and lightboxes.

use serde::{Deserialize, Serialize};

use crate::component::Dimensions;

// ============================================================================
// Size / Rect
// ============================================================================

/// Width and height in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Size {
    /// Creates a size.
    #[inline]
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Positioned rectangle in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width.
    pub width: u32,
    /// Height.
    pub height: u32,
}

// ============================================================================
// Placement
// ============================================================================

/// Centers a widget axis on a screen axis.
///
/// Clamped to 0 when the widget is as large as or larger than the screen.
#[inline]
#[must_use]
pub const fn center_axis(screen: u32, widget: u32) -> u32 {
    if widget >= screen {
        0
    } else {
        screen / 2 - widget / 2
    }
}

/// Places a widget on screen: centered, unless a coordinate is fixed.
#[must_use]
pub fn place(screen: Size, dimensions: Dimensions) -> Rect {
    Rect {
        x: dimensions
            .x
            .unwrap_or_else(|| center_axis(screen.width, dimensions.width)),
        y: dimensions
            .y
            .unwrap_or_else(|| center_axis(screen.height, dimensions.height)),
        width: dimensions.width,
        height: dimensions.height,
    }
}

// ============================================================================
// Tests
// ============================================================================
