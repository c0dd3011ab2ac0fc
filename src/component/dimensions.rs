//! Widget dimensions.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Constants
// ============================================================================

/// Default widget width in pixels.
pub const DEFAULT_WIDTH: u32 = 300;

/// Default widget height in pixels.
pub const DEFAULT_HEIGHT: u32 = 150;

// ============================================================================
// Dimensions
// ============================================================================

/// Requested widget size, with optional fixed screen coordinates.
///
/// An explicit `x` or `y` overrides centering on that axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Fixed horizontal position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<u32>,
    /// Fixed vertical position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<u32>,
}

impl Default for Dimensions {
    fn default() -> Self {
        Self::new(DEFAULT_WIDTH, DEFAULT_HEIGHT)
    }
}

impl Dimensions {
    /// Creates centered dimensions.
    #[inline]
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            x: None,
            y: None,
        }
    }

    /// Pins the widget to fixed coordinates.
    #[inline]
    #[must_use]
    pub const fn at(mut self, x: u32, y: u32) -> Self {
        self.x = Some(x);
        self.y = Some(y);
        self
    }

    /// Overlays fields present in a `dimensions` prop object.
    ///
    /// Non-numeric or missing fields keep the current value.
    #[must_use]
    pub fn merged_with(mut self, value: &Value) -> Self {
        let field = |key: &str| {
            value
                .get(key)
                .and_then(Value::as_u64)
                .and_then(|n| u32::try_from(n).ok())
        };

        if let Some(width) = field("width") {
            self.width = width;
        }
        if let Some(height) = field("height") {
            self.height = height;
        }
        if let Some(x) = field("x") {
            self.x = Some(x);
        }
        if let Some(y) = field("y") {
            self.y = Some(y);
        }
        self
    }
}

// ============================================================================
// Tests
// ============================================================================
