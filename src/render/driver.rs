//! Render drivers: how each context opens its window.
//!
//! | Driver | Window | Overlay | Mount |
//! |--------|--------|---------|-------|
//! | iframe | inline frame | no | required element |
//! | popup | top-level window, centered | yes | none |
//! | lightbox | frame positioned as a centered modal | yes | element or page body |
//!
//! Every driver registers its own teardown on the controller: the window is
//! removed and its watchers are unregistered when the controller is
//! destroyed.

// ============================================================================
// Imports
// ============================================================================

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::component::RenderContext;
use crate::error::{Error, Result};
use crate::host::{ElementRef, FrameSpec, FrameStyle, PopupSpec};
use crate::identifiers::WindowId;
use crate::parent::ParentController;

use super::position::place;

// ============================================================================
// RenderDriver
// ============================================================================

/// Strategy for opening a child window in one render context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderDriver {
    /// Inline frame inside the target element.
    Iframe,
    /// Centered top-level popup.
    Popup,
    /// Centered modal frame.
    Lightbox,
}

impl RenderDriver {
    /// Returns the driver for a context.
    #[inline]
    #[must_use]
    pub const fn for_context(context: RenderContext) -> Self {
        match context {
            RenderContext::Iframe => Self::Iframe,
            RenderContext::Popup => Self::Popup,
            RenderContext::Lightbox => Self::Lightbox,
        }
    }

    /// Returns the context this driver renders.
    #[inline]
    #[must_use]
    pub const fn context(&self) -> RenderContext {
        match self {
            Self::Iframe => RenderContext::Iframe,
            Self::Popup => RenderContext::Popup,
            Self::Lightbox => RenderContext::Lightbox,
        }
    }

    /// Opens the child window under `name` without loading a URL.
    ///
    /// Registers teardown and a close watcher on the controller.
    ///
    /// # Errors
    ///
    /// - [`Error::MissingElement`] if a required or given element is absent
    /// - [`Error::PopupBlocked`] if the popup did not open
    /// - host errors creating the frame
    pub fn open(
        &self,
        controller: &ParentController,
        element: Option<&ElementRef>,
        name: &str,
    ) -> Result<WindowId> {
        let tag = controller.tag();
        let host = controller.host();
        let dimensions = controller.render_dimensions();

        if let Some(element) = element
            && !host.element_exists(element)
        {
            return Err(Error::missing_element(tag, element.selector()));
        }

        let window = match self {
            Self::Iframe => {
                let element = element.ok_or_else(|| Error::missing_element(tag, "<none>"))?;
                host.create_frame(&FrameSpec {
                    name,
                    element: Some(element),
                    style: FrameStyle::Inline {
                        width: dimensions.width,
                        height: dimensions.height,
                    },
                })?
            }

            Self::Popup => {
                let rect = place(host.screen_size(), dimensions);
                let window = host
                    .open_popup(&PopupSpec { name, rect })
                    .ok_or_else(|| Error::popup_blocked(tag))?;

                if host.is_closed(window) {
                    return Err(Error::popup_blocked(tag));
                }
                window
            }

            Self::Lightbox => {
                let rect = place(host.screen_size(), dimensions);
                host.create_frame(&FrameSpec {
                    name,
                    element,
                    style: FrameStyle::Lightbox(rect),
                })?
            }
        };

        debug!(tag, %window, driver = ?self, "Child window opened");

        let closer = controller.host_handle();
        controller.register_cleanup("close window", move || closer.close_window(window));

        let weak = controller.downgrade();
        let listener = host.watch_close(
            window,
            Box::new(move || {
                if let Some(controller) = weak.upgrade() {
                    debug!(tag = controller.tag(), %window, "Child window closed out of band");
                    controller.destroy();
                }
            }),
        );
        let unlistener = controller.host_handle();
        controller.register_cleanup("close watcher", move || unlistener.unlisten(listener));

        if matches!(self, Self::Popup) {
            let closer = controller.host_handle();
            let listener = host.on_unload(Box::new(move || closer.close_window(window)));
            let unlistener = controller.host_handle();
            controller.register_cleanup("unload watcher", move || unlistener.unlisten(listener));
        }

        Ok(window)
    }

    /// Prepares a render that the parent page performs on our behalf.
    ///
    /// Popups are opened locally first, so the window exists under `name`
    /// before the parent is asked to render into it. Frames live in the
    /// parent page and are left to it.
    ///
    /// # Errors
    ///
    /// See [`RenderDriver::open`].
    pub fn render_to_parent(
        &self,
        controller: &ParentController,
        element: Option<&ElementRef>,
        name: &str,
    ) -> Result<Option<WindowId>> {
        match self {
            Self::Popup => self.open(controller, element, name).map(Some),
            Self::Iframe | Self::Lightbox => Ok(None),
        }
    }
}

// ============================================================================
// DriverTable
// ============================================================================

/// Maps render contexts to their drivers.
#[derive(Debug, Clone)]
pub struct DriverTable {
    drivers: FxHashMap<RenderContext, RenderDriver>,
}

impl DriverTable {
    /// Creates a table with the standard driver for every context.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            drivers: RenderContext::ALL
                .into_iter()
                .map(|context| (context, RenderDriver::for_context(context)))
                .collect(),
        }
    }

    /// Returns the driver for a context.
    #[inline]
    #[must_use]
    pub fn get(&self, context: RenderContext) -> Option<RenderDriver> {
        self.drivers.get(&context).copied()
    }

    /// Removes a context, so renders in it fail.
    #[must_use]
    pub fn without(mut self, context: RenderContext) -> Self {
        self.drivers.remove(&context);
        self
    }

    /// Returns the number of registered drivers.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.drivers.len()
    }

    /// Returns `true` if no driver is registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty()
    }
}

impl Default for DriverTable {
    fn default() -> Self {
        Self::standard()
    }
}

// ============================================================================
// Tests
// ============================================================================
