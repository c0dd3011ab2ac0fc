//! Handlers for messages sent by the child.

use tracing::{debug, info, trace};

use crate::component::RenderContext;
use crate::error::{Error, Result};
use crate::props::props_for_child;
use crate::props::schema::PROP_ON_ENTER;
use crate::protocol::{Message, Reply};

use super::controller::ParentController;
use super::init::GateState;
use super::state::LifecycleState;

impl ParentController {
    /// Handles one message from the child window.
    ///
    /// # Errors
    ///
    /// - [`Error::Destroyed`] once teardown started
    /// - [`Error::Protocol`] for messages a parent never receives
    /// - errors from the specific handler
    pub async fn handle_message(&self, message: Message) -> Result<Reply> {
        trace!(tag = self.tag(), id = %self.id(), kind = %message.kind(), "Message received");

        if self.state().is_terminal() {
            debug!(tag = self.tag(), kind = %message.kind(), "Message for destroyed component");
            return Err(Error::destroyed(self.tag()));
        }

        match message {
            Message::Init => self.handle_init(),

            Message::Props { .. } => Err(Error::protocol(format!(
                "[{}] props messages only travel parent to child",
                self.tag()
            ))),

            Message::Resize { width, height } => {
                self.handle_resize(width, height).await?;
                Ok(Reply::Ack)
            }

            Message::Close => {
                debug!(tag = self.tag(), "Child requested close");
                self.destroy();
                Ok(Reply::Ack)
            }

            Message::Render(request) => {
                self.handle_render(*request).await?;
                Ok(Reply::Ack)
            }

            Message::Error { message } => {
                self.report_error(Error::remote(self.tag(), message.clone()));
                self.destroy_with(GateState::Failed { message });
                Ok(Reply::Ack)
            }
        }
    }

    /// Completes the handshake and returns the child's props.
    fn handle_init(&self) -> Result<Reply> {
        let (context, props, first) = {
            let mut state = self.inner.state.lock();
            if state.lifecycle.is_terminal() {
                return Err(Error::destroyed(self.tag()));
            }
            let context = state.context.ok_or_else(|| {
                Error::protocol(format!("[{}] INIT before render", self.tag()))
            })?;

            let first = self.inner.gate.settle(GateState::Ready);
            if !first && !self.inner.gate.is_ready() {
                return Err(Error::destroyed(self.tag()));
            }

            state.lifecycle = LifecycleState::Ready;
            let props = props_for_child(&self.inner.definition, &state.props);
            state.sent_props = Some(props.clone());
            (context, props, first)
        };

        if first {
            info!(tag = self.tag(), id = %self.id(), %context, "Component ready");
            self.fire(PROP_ON_ENTER, Vec::new());
        }

        Ok(Reply::Init { context, props })
    }

    /// Resizes on the child's request.
    ///
    /// Frames are resized by the host; popups are told to resize themselves.
    async fn handle_resize(&self, width: u32, height: u32) -> Result<()> {
        let (context, window) = self.live_window()?;
        debug!(tag = self.tag(), width, height, %context, "Resize requested");

        match context {
            RenderContext::Iframe | RenderContext::Lightbox => {
                self.host().resize_frame(window, width, height);
            }
            RenderContext::Popup => {
                self.inner
                    .channel
                    .send(self.inner.self_window, window, Message::Resize { width, height })
                    .await?;
            }
        }
        Ok(())
    }
}
