//! Rendering through the parent page.
//!
//! A component running inside a child window can ask the top-level page to
//! render a sibling next to it. The requester names the sibling window,
//! sends RENDER to its own parent and then listens on the sibling directly.
//!
//! ```text
//! child window ── RENDER{tag, context, window_name} ──► parent page
//!      │                                                    │
//!      │                                        opens sibling under name
//!      └──────────── find_frame(parent, name) ◄─────────────┘
//! ```

// ============================================================================
// Imports
// ============================================================================

use serde_json::json;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::props::PropFn;
use crate::protocol::{Message, RenderRequest};
use crate::render::{ChildWindowName, select_context};

use super::controller::{OpenMode, ParentController};
use super::init::GateState;
use super::options::RenderOptions;
use super::state::LifecycleState;

// ============================================================================
// Requesting side
// ============================================================================

impl ParentController {
    /// Renders through the parent page instead of this one.
    ///
    /// # Errors
    ///
    /// - [`Error::RelayUnavailable`] if this page has no parent window or is
    ///   not itself a child window, or the sibling cannot be found
    /// - [`Error::AlreadyRendered`] unless idle
    /// - context selection and driver errors
    /// - errors returned by the parent for the RENDER request
    pub async fn render_to_parent(&self, options: RenderOptions) -> Result<()> {
        self.relay(options, None).await
    }

    /// Renders through the parent page, loading the sibling by submitting a
    /// form into it instead of loading its URL.
    ///
    /// `submit` is invoked by the parent once the sibling window exists.
    ///
    /// # Errors
    ///
    /// See [`ParentController::render_to_parent`].
    pub async fn hijack_to_parent(&self, options: RenderOptions, submit: PropFn) -> Result<()> {
        self.relay(options, Some(submit)).await
    }

    async fn relay(&self, options: RenderOptions, submit: Option<PropFn>) -> Result<()> {
        self.ensure_idle()?;

        let registry = self
            .registry()
            .ok_or_else(|| Error::relay_unavailable(self.tag(), "registry dropped"))?;
        let parent = registry
            .config()
            .parent_window
            .ok_or_else(|| Error::relay_unavailable(self.tag(), "no parent window"))?;
        let origin = registry.config().window_name.clone().ok_or_else(|| {
            Error::relay_unavailable(self.tag(), "this window is not a child window")
        })?;

        let context = select_context(
            &self.inner.definition,
            options.context,
            options.element.is_some(),
        )?;
        let driver = self.driver_for(context)?;
        let name = ChildWindowName::relay(self.id(), self.tag(), context, origin).encode()?;

        {
            let mut state = self.inner.state.lock();
            if state.lifecycle != LifecycleState::Idle {
                return Err(Error::already_rendered(self.tag(), state.lifecycle));
            }
            state.lifecycle = LifecycleState::Opening;
            state.context = Some(context);
            state.window_name = Some(name.clone());
        }

        let result = async {
            let local = driver.render_to_parent(self, None, &name)?;
            if let Some(window) = local {
                self.set_window(window, LifecycleState::Opening);
            }

            let request = RenderRequest {
                tag: self.tag().to_string(),
                context,
                element: options.element.clone(),
                props: self.props(),
                window_name: name.clone(),
                hijack_submit: submit,
            };

            debug!(tag = self.tag(), %parent, %context, "Sending render request to parent");
            self.inner
                .channel
                .send(
                    self.inner.self_window,
                    parent,
                    Message::Render(Box::new(request)),
                )
                .await?;

            let window = match local {
                Some(window) => window,
                None => self.host().find_frame(parent, &name).ok_or_else(|| {
                    Error::relay_unavailable(self.tag(), "sibling window not found")
                })?,
            };

            self.set_window(window, LifecycleState::Rendered);
            self.start_listening(window)
        }
        .await;

        match result {
            Ok(()) => {
                info!(tag = self.tag(), id = %self.id(), %context, "Component rendered through parent");
                Ok(())
            }
            Err(e) => {
                warn!(tag = self.tag(), error = %e, "Relayed render failed");
                self.destroy_with(GateState::Failed {
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }
}

// ============================================================================
// Receiving side
// ============================================================================

impl ParentController {
    /// Renders a sibling on behalf of this controller's child.
    pub(crate) async fn handle_render(&self, request: RenderRequest) -> Result<()> {
        let registry = self
            .registry()
            .ok_or_else(|| Error::relay_unavailable(&request.tag, "registry dropped"))?;

        debug!(
            requester = self.tag(),
            tag = %request.tag,
            context = %request.context,
            "Render requested by child"
        );

        let sibling = registry.create(&request.tag, &request.props)?;
        let options = RenderOptions {
            element: request.element,
            context: Some(request.context),
        };

        match request.hijack_submit {
            Some(submit) => {
                sibling.render_with(&options, Some(request.window_name.clone()), OpenMode::Submit)?;
                if let Err(e) = submit
                    .call(vec![json!({ "window_name": request.window_name })])
                    .await
                {
                    sibling.destroy();
                    return Err(e);
                }
            }
            None => {
                sibling.render_with(&options, Some(request.window_name), OpenMode::LoadUrl)?;
            }
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
