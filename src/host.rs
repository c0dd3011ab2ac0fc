//! Window and page primitives consumed by the controller.
//!
//! The host is the embedding environment: it owns real windows, frames and
//! DOM elements. The controller only ever talks to it through
//! [`WindowHost`], so the same state machine drives a browser binding, a
//! webview shell or a test double.
//!
//! # Callbacks
//!
//! Watchers (`watch_close`, `on_unload`, `on_first_click`) take a one-shot
//! [`HostCallback`] and return a [`ListenerId`] that the controller passes to
//! [`WindowHost::unlisten`] during cleanup. A host must not invoke a callback
//! after it was unlistened.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::component::RenderContext;
use crate::error::Result;
use crate::identifiers::{ListenerId, OverlayId, WindowId};
use crate::render::position::{Rect, Size};

// ============================================================================
// Types
// ============================================================================

/// One-shot callback invoked by the host.
pub type HostCallback = Box<dyn FnOnce() + Send>;

// ============================================================================
// ElementRef
// ============================================================================

/// Reference to a page element, by selector.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementRef(String);

impl ElementRef {
    /// Creates an element reference.
    #[inline]
    #[must_use]
    pub fn new(selector: impl Into<String>) -> Self {
        Self(selector.into())
    }

    /// Returns the selector.
    #[inline]
    #[must_use]
    pub fn selector(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ElementRef {
    fn from(selector: &str) -> Self {
        Self::new(selector)
    }
}

// ============================================================================
// Frame / Popup Requests
// ============================================================================

/// How a frame is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStyle {
    /// Inline inside the target element, sized but not positioned.
    Inline {
        /// Frame width.
        width: u32,
        /// Frame height.
        height: u32,
    },
    /// Positioned as a centered modal.
    Lightbox(Rect),
}

/// Request to create a frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameSpec<'a> {
    /// Window name assigned to the frame.
    pub name: &'a str,
    /// Mount element; `None` mounts into the page body.
    pub element: Option<&'a ElementRef>,
    /// Layout.
    pub style: FrameStyle,
}

/// Request to open a popup.
#[derive(Debug, Clone, Copy)]
pub struct PopupSpec<'a> {
    /// Window name assigned to the popup.
    pub name: &'a str,
    /// Screen placement.
    pub rect: Rect,
}

// ============================================================================
// WindowHost
// ============================================================================

/// Window, frame and element primitives of the embedding environment.
pub trait WindowHost: Send + Sync {
    /// Screen size used to center popups and lightboxes.
    fn screen_size(&self) -> Size;

    /// Returns `true` if the element exists in the page.
    fn element_exists(&self, element: &ElementRef) -> bool;

    /// Creates a frame without loading anything into it.
    ///
    /// # Errors
    ///
    /// Host-specific failure to create the frame.
    fn create_frame(&self, spec: &FrameSpec<'_>) -> Result<WindowId>;

    /// Opens a popup without loading anything into it.
    ///
    /// Returns `None` when the browser refused to open it. Opening a name
    /// that is already open returns the existing popup.
    fn open_popup(&self, spec: &PopupSpec<'_>) -> Option<WindowId>;

    /// Returns `true` if the window is closed or unknown.
    fn is_closed(&self, window: WindowId) -> bool;

    /// Navigates a window.
    ///
    /// # Errors
    ///
    /// Host-specific navigation failure.
    fn load_url(&self, window: WindowId, url: &Url) -> Result<()>;

    /// Closes a popup or removes a frame.
    fn close_window(&self, window: WindowId);

    /// Resizes a frame.
    fn resize_frame(&self, window: WindowId, width: u32, height: u32);

    /// Writes the loading placeholder into a freshly opened window.
    fn inject_placeholder(&self, window: WindowId, tag: &str);

    /// Shows the page overlay for a popup or lightbox.
    fn show_overlay(&self, tag: &str, context: RenderContext, window: WindowId) -> OverlayId;

    /// Removes an overlay.
    fn remove_overlay(&self, overlay: OverlayId);

    /// Calls `callback` when the window closes out of band.
    fn watch_close(&self, window: WindowId, callback: HostCallback) -> ListenerId;

    /// Calls `callback` when the page unloads.
    fn on_unload(&self, callback: HostCallback) -> ListenerId;

    /// Calls `callback` on the element's first click.
    fn on_first_click(&self, element: &ElementRef, callback: HostCallback) -> ListenerId;

    /// Unregisters a watcher.
    fn unlisten(&self, listener: ListenerId);

    /// Finds a named frame or popup through a parent window.
    fn find_frame(&self, parent: WindowId, name: &str) -> Option<WindowId>;

    /// Points an element's navigation (link or form target) at a window name.
    ///
    /// # Errors
    ///
    /// Host-specific failure, e.g. the element is neither a link nor a form.
    fn retarget_navigation(&self, element: &ElementRef, window_name: &str) -> Result<()>;
}
