//! Render context enum and allowed-context set.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ============================================================================
// RenderContext
// ============================================================================

/// Isolation strategy used to host a widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderContext {
    /// Inline frame mounted into a page element.
    Iframe,
    /// New top-level window.
    Popup,
    /// Frame positioned as a centered modal over the page.
    Lightbox,
}

impl RenderContext {
    /// All contexts, in declaration order.
    pub const ALL: [RenderContext; 3] = [Self::Iframe, Self::Popup, Self::Lightbox];

    /// Returns the lowercase wire name.
    #[inline]
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Iframe => "iframe",
            Self::Popup => "popup",
            Self::Lightbox => "lightbox",
        }
    }

    /// Returns `true` if rendering in this context shows a page overlay.
    #[inline]
    #[must_use]
    pub const fn has_overlay(&self) -> bool {
        matches!(self, Self::Popup | Self::Lightbox)
    }

    /// Returns `true` if the child lives in a frame the parent can resize.
    #[inline]
    #[must_use]
    pub const fn is_frame(&self) -> bool {
        matches!(self, Self::Iframe | Self::Lightbox)
    }

    const fn bit(self) -> u8 {
        match self {
            Self::Iframe => 0b001,
            Self::Popup => 0b010,
            Self::Lightbox => 0b100,
        }
    }
}

impl fmt::Display for RenderContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RenderContext {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "iframe" => Ok(Self::Iframe),
            "popup" => Ok(Self::Popup),
            "lightbox" => Ok(Self::Lightbox),
            other => Err(format!("unknown render context: {other}")),
        }
    }
}

// ============================================================================
// ContextSet
// ============================================================================

/// Set of render contexts a component may use.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextSet(u8);

impl ContextSet {
    /// Every context allowed.
    #[inline]
    #[must_use]
    pub const fn all() -> Self {
        Self(0b111)
    }

    /// No context allowed.
    #[inline]
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Returns `true` if `context` is allowed.
    #[inline]
    #[must_use]
    pub const fn contains(&self, context: RenderContext) -> bool {
        self.0 & context.bit() != 0
    }

    /// Adds a context.
    #[inline]
    pub fn insert(&mut self, context: RenderContext) {
        self.0 |= context.bit();
    }

    /// Returns `true` if no context is allowed.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Iterates allowed contexts in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = RenderContext> + '_ {
        RenderContext::ALL
            .into_iter()
            .filter(move |context| self.contains(*context))
    }
}

impl Default for ContextSet {
    fn default() -> Self {
        Self::all()
    }
}

impl FromIterator<RenderContext> for ContextSet {
    fn from_iter<I: IntoIterator<Item = RenderContext>>(iter: I) -> Self {
        let mut set = Self::empty();
        for context in iter {
            set.insert(context);
        }
        set
    }
}

impl fmt::Debug for ContextSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_round_trip() {
        for context in RenderContext::ALL {
            assert_eq!(context.as_str().parse::<RenderContext>(), Ok(context));
        }
        assert!("modal".parse::<RenderContext>().is_err());
    }

    #[test]
    fn test_context_serde_lowercase() {
        let json = serde_json::to_string(&RenderContext::Lightbox).expect("serialize");
        assert_eq!(json, "\"lightbox\"");
    }

    #[test]
    fn test_overlay_flags() {
        assert!(!RenderContext::Iframe.has_overlay());
        assert!(RenderContext::Popup.has_overlay());
        assert!(RenderContext::Lightbox.has_overlay());
        assert!(!RenderContext::Popup.is_frame());
    }

    #[test]
    fn test_context_set() {
        let set: ContextSet = [RenderContext::Popup].into_iter().collect();
        assert!(set.contains(RenderContext::Popup));
        assert!(!set.contains(RenderContext::Iframe));
        assert_eq!(set.iter().count(), 1);
        assert!(ContextSet::empty().is_empty());
        assert_eq!(ContextSet::default(), ContextSet::all());
    }
}
