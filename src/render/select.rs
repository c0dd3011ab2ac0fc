//! Render context selection.

use crate::component::{ComponentDefinition, RenderContext};
use crate::error::{Error, Result};

/// Picks the render context for a render call.
///
/// - a forced context must be allowed by the definition
/// - a mount element forces iframe
/// - otherwise: the definition's default, then lightbox, then popup
///
/// # Errors
///
/// - [`Error::InvalidContext`] if the forced or element-implied context is
///   not allowed
/// - [`Error::NoAvailableContext`] if nothing is allowed
pub fn select_context(
    definition: &ComponentDefinition,
    forced: Option<RenderContext>,
    has_element: bool,
) -> Result<RenderContext> {
    let allowed = definition.contexts();

    if let Some(context) = forced {
        if !allowed.contains(context) {
            return Err(Error::invalid_context(
                definition.tag(),
                context,
                "context not allowed",
            ));
        }
        return Ok(context);
    }

    if has_element {
        if !allowed.contains(RenderContext::Iframe) {
            return Err(Error::invalid_context(
                definition.tag(),
                RenderContext::Iframe,
                "element given but iframe not allowed",
            ));
        }
        return Ok(RenderContext::Iframe);
    }

    definition
        .default_context()
        .into_iter()
        .chain([RenderContext::Lightbox, RenderContext::Popup])
        .find(|context| allowed.contains(*context))
        .ok_or_else(|| Error::no_available_context(definition.tag()))
}

// ============================================================================
// Tests
// ============================================================================
