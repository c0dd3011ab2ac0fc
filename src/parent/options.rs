//! Per-render options.

use crate::component::RenderContext;
use crate::host::ElementRef;

/// Options for a single render call.
///
/// # Example
///
/// ```
/// use widget_embed::{ElementRef, RenderContext, RenderOptions};
///
/// let options = RenderOptions::new()
///     .element(ElementRef::new("#checkout"))
///     .context(RenderContext::Iframe);
/// assert_eq!(options.forced_context(), Some(RenderContext::Iframe));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// Mount element.
    pub(crate) element: Option<ElementRef>,
    /// Forced render context.
    pub(crate) context: Option<RenderContext>,
}

impl RenderOptions {
    /// Creates empty options: no element, context chosen automatically.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the mount element.
    #[inline]
    #[must_use]
    pub fn element(mut self, element: impl Into<ElementRef>) -> Self {
        self.element = Some(element.into());
        self
    }

    /// Forces a render context.
    #[inline]
    #[must_use]
    pub fn context(mut self, context: RenderContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Returns the mount element.
    #[inline]
    #[must_use]
    pub fn mount_element(&self) -> Option<&ElementRef> {
        self.element.as_ref()
    }

    /// Returns the forced context.
    #[inline]
    #[must_use]
    pub fn forced_context(&self) -> Option<RenderContext> {
        self.context
    }
}
