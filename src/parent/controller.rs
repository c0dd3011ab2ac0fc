//! Parent-side controller for one rendered component.
//!
//! A [`ParentController`] owns one child window from open to teardown:
//!
//! 1. `render` selects a context, opens the window through its driver,
//!    loads the initial URL, listens for the child and arms the timeout.
//! 2. The child's INIT settles the handshake gate and receives the props.
//! 3. Prop updates are pushed after the handshake.
//! 4. `destroy` tears everything down exactly once.
//!
//! # Thread Safety
//!
//! Controllers are cheap to clone and `Send + Sync`. State lives behind a
//! `parking_lot::Mutex` that is never held across an `.await`.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use futures_util::FutureExt;
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::runtime::Handle;
use tracing::{debug, error, info, warn};

use crate::component::{ComponentDefinition, Dimensions, RenderContext};
use crate::error::{Error, Result};
use crate::host::{ElementRef, WindowHost};
use crate::identifiers::{InstanceId, WindowId};
use crate::props::schema::{PROP_DIMENSIONS, PROP_ON_CLOSE, PROP_ON_ERROR, PROP_TIMEOUT};
use crate::props::{Invocation, PropMap, PropValue, build_url, merge_props, props_for_child};
use crate::protocol::Message;
use crate::registry::Registry;
use crate::registry::core::RegistryInner;
use crate::render::{ChildWindowName, RenderDriver, select_context};
use crate::transport::Channel;

use super::cleanup::CleanupRegistry;
use super::init::{GateState, InitGate};
use super::options::RenderOptions;
use super::state::LifecycleState;

// ============================================================================
// Types
// ============================================================================

/// How the child window gets its content.
#[derive(Debug, Clone)]
pub(crate) enum OpenMode {
    /// Load the initial URL.
    LoadUrl,
    /// The element's own navigation loads it.
    Hijack(ElementRef),
    /// A form submitted by the requester loads it.
    Submit,
}

/// Mutable controller state.
pub(crate) struct ControllerState {
    pub(crate) lifecycle: LifecycleState,
    pub(crate) props: PropMap,
    pub(crate) context: Option<RenderContext>,
    pub(crate) window: Option<WindowId>,
    pub(crate) window_name: Option<String>,
    /// Props last delivered to the child.
    pub(crate) sent_props: Option<PropMap>,
}

/// Shared controller internals.
pub(crate) struct ControllerInner {
    pub(crate) id: InstanceId,
    pub(crate) definition: Arc<ComponentDefinition>,
    pub(crate) registry: Weak<RegistryInner>,
    pub(crate) host: Arc<dyn WindowHost>,
    pub(crate) channel: Arc<dyn Channel>,
    /// Window this page runs in; source of outgoing messages.
    pub(crate) self_window: WindowId,
    pub(crate) default_timeout: Duration,
    pub(crate) state: Mutex<ControllerState>,
    pub(crate) gate: InitGate,
    pub(crate) cleanup: CleanupRegistry,
}

// ============================================================================
// ParentController
// ============================================================================

/// Controller for one component instance.
#[derive(Clone)]
pub struct ParentController {
    pub(crate) inner: Arc<ControllerInner>,
}

/// Non-owning controller handle, used by watchers and timers.
#[derive(Clone)]
pub(crate) struct WeakController(Weak<ControllerInner>);

impl WeakController {
    /// Upgrades to a controller if it is still alive.
    pub(crate) fn upgrade(&self) -> Option<ParentController> {
        self.0.upgrade().map(|inner| ParentController { inner })
    }
}

// ============================================================================
// ParentController - Display
// ============================================================================

impl fmt::Debug for ParentController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("ParentController")
            .field("id", &self.inner.id)
            .field("tag", &self.tag())
            .field("state", &state.lifecycle)
            .field("context", &state.context)
            .field("window", &state.window)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// ParentController - Construction
// ============================================================================

impl ParentController {
    /// Creates an idle controller with already normalized props.
    pub(crate) fn new(
        registry: &Registry,
        definition: Arc<ComponentDefinition>,
        props: PropMap,
    ) -> Self {
        let inner = ControllerInner {
            id: InstanceId::generate(),
            definition,
            registry: Arc::downgrade(&registry.inner),
            host: registry.host_handle(),
            channel: registry.channel_handle(),
            self_window: registry.window(),
            default_timeout: registry.config().default_timeout,
            state: Mutex::new(ControllerState {
                lifecycle: LifecycleState::Idle,
                props,
                context: None,
                window: None,
                window_name: None,
                sent_props: None,
            }),
            gate: InitGate::new(),
            cleanup: CleanupRegistry::new(),
        };

        Self {
            inner: Arc::new(inner),
        }
    }
}

// ============================================================================
// ParentController - Accessors
// ============================================================================

impl ParentController {
    /// Returns the instance id.
    #[inline]
    #[must_use]
    pub fn id(&self) -> InstanceId {
        self.inner.id
    }

    /// Returns the component tag.
    #[inline]
    #[must_use]
    pub fn tag(&self) -> &str {
        self.inner.definition.tag()
    }

    /// Returns the component definition.
    #[inline]
    #[must_use]
    pub fn definition(&self) -> &Arc<ComponentDefinition> {
        &self.inner.definition
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        self.inner.state.lock().lifecycle
    }

    /// Returns the render context, once chosen.
    #[must_use]
    pub fn context(&self) -> Option<RenderContext> {
        self.inner.state.lock().context
    }

    /// Returns the child window while it is owned.
    #[must_use]
    pub fn window(&self) -> Option<WindowId> {
        self.inner.state.lock().window
    }

    /// Returns the child window name, once assigned.
    #[must_use]
    pub fn window_name(&self) -> Option<String> {
        self.inner.state.lock().window_name.clone()
    }

    /// Returns a copy of the resolved props.
    #[must_use]
    pub fn props(&self) -> PropMap {
        self.inner.state.lock().props.clone()
    }

    /// Returns `true` once destroyed.
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.state() == LifecycleState::Destroyed
    }

    /// Returns `true` once the handshake completed.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.inner.gate.is_ready()
    }

    /// Waits for the child's handshake.
    ///
    /// # Errors
    ///
    /// - [`Error::Timeout`] if the child did not INIT in time
    /// - [`Error::Remote`] if the child reported an error first
    /// - [`Error::Destroyed`] if the instance was destroyed first
    pub async fn wait_init(&self) -> Result<()> {
        self.inner.gate.wait(self.tag()).await
    }

    pub(crate) fn host(&self) -> &dyn WindowHost {
        self.inner.host.as_ref()
    }

    pub(crate) fn host_handle(&self) -> Arc<dyn WindowHost> {
        Arc::clone(&self.inner.host)
    }

    pub(crate) fn registry(&self) -> Option<Registry> {
        self.inner.registry.upgrade().map(Registry::from_inner)
    }

    pub(crate) fn downgrade(&self) -> WeakController {
        WeakController(Arc::downgrade(&self.inner))
    }

    pub(crate) fn register_cleanup(&self, name: &'static str, action: impl FnOnce() + Send + 'static) {
        self.inner.cleanup.register(name, action);
    }

    /// Definition dimensions, overridden by the `dimensions` prop.
    pub(crate) fn render_dimensions(&self) -> Dimensions {
        let base = self.inner.definition.dimensions();
        match self.inner.state.lock().props.get(PROP_DIMENSIONS) {
            Some(PropValue::Object(value)) => base.merged_with(value),
            _ => base,
        }
    }

    /// Handshake timeout: the `timeout` prop, else the registry default.
    pub(crate) fn handshake_timeout(&self) -> Duration {
        match self
            .inner
            .state
            .lock()
            .props
            .get(PROP_TIMEOUT)
            .and_then(PropValue::as_i64)
        {
            Some(ms) if ms > 0 => Duration::from_millis(ms.unsigned_abs()),
            _ => self.inner.default_timeout,
        }
    }
}

// ============================================================================
// ParentController - Render
// ============================================================================

impl ParentController {
    /// Renders the component.
    ///
    /// # Errors
    ///
    /// - [`Error::AlreadyRendered`] unless idle
    /// - [`Error::InvalidContext`] / [`Error::NoAvailableContext`] from context selection
    /// - [`Error::SingletonViolation`] if a singleton is already live
    /// - [`Error::MissingElement`] / [`Error::PopupBlocked`] from the driver
    /// - [`Error::Config`] / [`Error::Url`] if the URL cannot be built
    ///
    /// Failures after the window was opened tear the instance down.
    pub fn render(&self, options: RenderOptions) -> Result<()> {
        self.render_with(&options, None, OpenMode::LoadUrl)
    }

    /// Intercepts the first click on `element` and renders on it.
    ///
    /// # Errors
    ///
    /// [`Error::AlreadyRendered`] unless idle.
    pub fn hijack(&self, element: ElementRef, context: Option<RenderContext>) -> Result<()> {
        self.ensure_idle()?;

        let weak = self.downgrade();
        let target = element.clone();
        let listener = self.host().on_first_click(
            &element,
            Box::new(move || {
                let Some(controller) = weak.upgrade() else {
                    return;
                };
                if let Err(e) = controller.render_hijack(target, context) {
                    warn!(tag = controller.tag(), error = %e, "Hijacked render failed");
                }
            }),
        );

        let host = self.host_handle();
        self.register_cleanup("click interceptor", move || host.unlisten(listener));
        if let Some(registry) = self.registry() {
            registry.arm(self);
        }

        debug!(tag = self.tag(), id = %self.id(), %element, "Click interceptor installed");
        Ok(())
    }

    /// Renders into a window loaded by `element`'s own navigation.
    ///
    /// The element is retargeted at the child window name; no URL is loaded.
    ///
    /// # Errors
    ///
    /// See [`ParentController::render`].
    pub fn render_hijack(&self, element: ElementRef, context: Option<RenderContext>) -> Result<()> {
        let options = RenderOptions {
            element: None,
            context,
        };
        self.render_with(&options, None, OpenMode::Hijack(element))
    }

    /// Shared render path.
    pub(crate) fn render_with(
        &self,
        options: &RenderOptions,
        name: Option<String>,
        mode: OpenMode,
    ) -> Result<()> {
        self.ensure_idle()?;

        let definition = &self.inner.definition;
        let context = select_context(definition, options.context, options.element.is_some())?;
        self.check_singleton()?;

        let name = match name {
            Some(name) => name,
            None => ChildWindowName::direct(self.id(), self.tag(), context).encode()?,
        };

        {
            let mut state = self.inner.state.lock();
            if state.lifecycle != LifecycleState::Idle {
                return Err(Error::already_rendered(self.tag(), state.lifecycle));
            }
            state.lifecycle = LifecycleState::Opening;
            state.context = Some(context);
            state.window_name = Some(name.clone());
        }

        if let Err(e) = self.open_and_listen(context, options, &name, mode) {
            warn!(tag = self.tag(), id = %self.id(), error = %e, "Render failed");
            self.teardown(
                GateState::Failed {
                    message: e.to_string(),
                },
                false,
            );
            return Err(e);
        }

        info!(
            tag = self.tag(),
            id = %self.id(),
            %context,
            "Component rendered"
        );
        Ok(())
    }

    fn open_and_listen(
        &self,
        context: RenderContext,
        options: &RenderOptions,
        name: &str,
        mode: OpenMode,
    ) -> Result<()> {
        let driver = self.driver_for(context)?;

        if let OpenMode::Hijack(element) = &mode {
            self.host().retarget_navigation(element, name)?;
        }

        let window = driver.open(self, options.element.as_ref(), name)?;
        self.set_window(window, LifecycleState::Rendered);

        if matches!(mode, OpenMode::LoadUrl) {
            self.host().inject_placeholder(window, self.tag());
        }

        if context.has_overlay() {
            let overlay = self.host().show_overlay(self.tag(), context, window);
            let host = self.host_handle();
            self.register_cleanup("overlay", move || host.remove_overlay(overlay));
        }

        if matches!(mode, OpenMode::LoadUrl) {
            let url = {
                let state = self.inner.state.lock();
                build_url(&self.inner.definition, &state.props)?
            };
            debug!(tag = self.tag(), %url, "Loading child url");
            self.host().load_url(window, &url)?;
        }

        self.start_listening(window)
    }

    /// Listens on the child window, arms the timeout and goes live.
    pub(crate) fn start_listening(&self, window: WindowId) -> Result<()> {
        if let Some(registry) = self.registry() {
            registry.listen(window, self);
            let id = self.id();
            let weak = Arc::downgrade(&registry.inner);
            self.register_cleanup("listener", move || {
                if let Some(inner) = weak.upgrade() {
                    Registry::from_inner(inner).unlisten(window, id);
                }
            });
        }

        self.arm_timeout()?;

        {
            let mut state = self.inner.state.lock();
            if state.lifecycle.is_terminal() {
                return Err(Error::destroyed(self.tag()));
            }
            state.lifecycle = LifecycleState::WaitingForInit;
        }

        if let Some(registry) = self.registry() {
            registry.activate(self);
        }
        Ok(())
    }

    pub(crate) fn ensure_idle(&self) -> Result<()> {
        let state = self.inner.state.lock().lifecycle;
        if state == LifecycleState::Idle {
            Ok(())
        } else {
            Err(Error::already_rendered(self.tag(), state))
        }
    }

    fn check_singleton(&self) -> Result<()> {
        if !self.inner.definition.is_singleton() {
            return Ok(());
        }
        match self.registry() {
            Some(registry) if registry.has_active(self.tag()) => {
                Err(Error::singleton_violation(self.tag()))
            }
            _ => Ok(()),
        }
    }

    pub(crate) fn driver_for(&self, context: RenderContext) -> Result<RenderDriver> {
        match self.registry() {
            Some(registry) => registry.driver(context).ok_or_else(|| {
                Error::invalid_context(self.tag(), context, "no driver registered")
            }),
            None => Ok(RenderDriver::for_context(context)),
        }
    }

    pub(crate) fn set_window(&self, window: WindowId, lifecycle: LifecycleState) {
        let mut state = self.inner.state.lock();
        state.window = Some(window);
        if !state.lifecycle.is_terminal() {
            state.lifecycle = lifecycle;
        }
    }

    fn arm_timeout(&self) -> Result<()> {
        let timeout = self.handshake_timeout();
        if timeout.is_zero() {
            return Ok(());
        }

        let handle = Handle::try_current()
            .map_err(|_| Error::config("Handshake timeouts require a Tokio runtime"))?;

        let weak = self.downgrade();
        let timeout_ms = timeout.as_millis() as u64;
        let task = handle.spawn(async move {
            tokio::time::sleep(timeout).await;
            if let Some(controller) = weak.upgrade() {
                controller.handle_timeout(timeout_ms);
            }
        });

        let abort = task.abort_handle();
        self.register_cleanup("timeout", move || abort.abort());
        debug!(tag = self.tag(), timeout_ms, "Handshake timeout armed");
        Ok(())
    }

    fn handle_timeout(&self, timeout_ms: u64) {
        if self.state().is_terminal() {
            return;
        }
        if !self.inner.gate.settle(GateState::TimedOut { timeout_ms }) {
            debug!(tag = self.tag(), "Timeout after handshake ignored");
            return;
        }

        warn!(tag = self.tag(), id = %self.id(), timeout_ms, "Handshake timed out");
        let err = Error::timeout(self.tag(), timeout_ms);
        self.fire(
            crate::props::schema::PROP_ON_TIMEOUT,
            vec![json!({ "message": err.to_string() })],
        );
        self.destroy_with(GateState::TimedOut { timeout_ms });
    }
}

// ============================================================================
// ParentController - Updates
// ============================================================================

impl ParentController {
    /// Merges `partial` into the props and pushes the result to the child.
    ///
    /// Before the handshake the push waits for it. Updates that change
    /// nothing send nothing.
    ///
    /// # Errors
    ///
    /// - prop errors from normalization
    /// - the handshake failure if the instance dies before INIT
    /// - transport errors sending PROPS
    pub async fn update_props(&self, partial: PropMap) -> Result<()> {
        let (changed, idle) = {
            let mut state = self.inner.state.lock();
            if state.lifecycle.is_terminal() {
                return Err(Error::destroyed(self.tag()));
            }
            let merged = merge_props(&self.inner.definition, &state.props, &partial)?;
            let changed = merged != state.props;
            state.props = merged;
            (changed, state.lifecycle == LifecycleState::Idle)
        };

        if !changed {
            debug!(tag = self.tag(), "Prop update changed nothing");
            return Ok(());
        }

        // Not rendered yet: the first render carries the new props.
        if idle {
            return Ok(());
        }

        self.inner.gate.wait(self.tag()).await?;

        let pending = {
            let mut state = self.inner.state.lock();
            let props = props_for_child(&self.inner.definition, &state.props);
            match state.window {
                Some(window) if state.sent_props.as_ref() != Some(&props) => {
                    state.sent_props = Some(props.clone());
                    Some((window, props))
                }
                _ => None,
            }
        };

        if let Some((window, props)) = pending {
            debug!(tag = self.tag(), %window, "Pushing props");
            self.inner
                .channel
                .send(self.inner.self_window, window, Message::Props { props })
                .await?;
        }
        Ok(())
    }
}

// ============================================================================
// ParentController - Resize
// ============================================================================

impl ParentController {
    /// Resizes the child frame.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidContext`] for popups, which only the child can resize
    /// - [`Error::Destroyed`] if no window is owned
    pub fn resize(&self, width: u32, height: u32) -> Result<()> {
        let (context, window) = self.live_window()?;
        if context == RenderContext::Popup {
            return Err(Error::invalid_context(
                self.tag(),
                context,
                "popups can only be resized by the child",
            ));
        }
        self.host().resize_frame(window, width, height);
        Ok(())
    }

    /// Returns the context and window of a live instance.
    pub(crate) fn live_window(&self) -> Result<(RenderContext, WindowId)> {
        let state = self.inner.state.lock();
        match (state.lifecycle.is_live(), state.context, state.window) {
            (true, Some(context), Some(window)) => Ok((context, window)),
            _ => Err(Error::destroyed(self.tag())),
        }
    }
}

// ============================================================================
// ParentController - Teardown
// ============================================================================

impl ParentController {
    /// Tells the child to close, then destroys.
    ///
    /// A failed CLOSE notification is logged; destruction always proceeds.
    pub async fn close(&self) {
        let window = {
            let state = self.inner.state.lock();
            if state.lifecycle.is_terminal() {
                return;
            }
            state.window
        };

        if let Some(window) = window
            && self.inner.gate.is_ready()
            && let Err(e) = self
                .inner
                .channel
                .send(self.inner.self_window, window, Message::Close)
                .await
        {
            warn!(tag = self.tag(), error = %e, "Close notification failed");
        }

        self.destroy();
    }

    /// Destroys the instance. Safe to call repeatedly and re-entrantly.
    pub fn destroy(&self) {
        self.destroy_with(GateState::Destroyed);
    }

    /// Destroys, settling a pending handshake with `reason`.
    pub(crate) fn destroy_with(&self, reason: GateState) {
        self.teardown(reason, true);
    }

    /// Runs the teardown; `on_close` fires only for an instance that rendered.
    fn teardown(&self, reason: GateState, notify_close: bool) {
        let previous = {
            let mut state = self.inner.state.lock();
            if state.lifecycle.is_terminal() {
                return;
            }
            let previous = state.lifecycle;
            state.lifecycle = LifecycleState::Closing;
            previous
        };

        self.inner.gate.settle(reason);
        let ran = self.inner.cleanup.run_all();

        {
            let mut state = self.inner.state.lock();
            state.window = None;
            state.lifecycle = LifecycleState::Destroyed;
        }

        if let Some(registry) = self.registry() {
            registry.deactivate(self.id());
        }

        info!(tag = self.tag(), id = %self.id(), cleanups = ran, "Component destroyed");

        if notify_close && previous != LifecycleState::Idle {
            self.fire(PROP_ON_CLOSE, Vec::new());
        }
    }
}

// ============================================================================
// ParentController - Callbacks
// ============================================================================

impl ParentController {
    /// Invokes a callback prop; async bodies finish on the runtime.
    pub(crate) fn fire(&self, prop: &str, args: Vec<Value>) {
        let callback = self.inner.state.lock().props.get_function(prop).cloned();
        let Some(callback) = callback else {
            return;
        };

        let tag = self.tag().to_string();
        let name = prop.to_string();

        match callback.invoke(args) {
            Invocation::Ready(Ok(_)) => {}
            Invocation::Ready(Err(e)) => {
                warn!(tag = %tag, callback = %name, error = %e, "Callback failed");
            }
            Invocation::Deferred(mut future) => {
                // Already-resolved outcomes are handled inline; only truly
                // async bodies are handed to the runtime.
                if let Some(result) = (&mut future).now_or_never() {
                    if let Err(e) = result {
                        warn!(tag = %tag, callback = %name, error = %e, "Callback failed");
                    }
                    return;
                }
                match Handle::try_current() {
                    Ok(handle) => {
                        handle.spawn(async move {
                            if let Err(e) = future.await {
                                warn!(tag = %tag, callback = %name, error = %e, "Callback failed");
                            }
                        });
                    }
                    Err(_) => {
                        debug!(tag = %tag, callback = %name, "No runtime, async callback dropped");
                    }
                }
            }
        }
    }

    /// Delivers an error to `on_error`, or re-raises it to the registry.
    pub(crate) fn report_error(&self, err: Error) {
        let has_handler = self
            .inner
            .state
            .lock()
            .props
            .get_function(PROP_ON_ERROR)
            .is_some();

        if has_handler {
            self.fire(PROP_ON_ERROR, vec![json!({ "message": err.to_string() })]);
            return;
        }

        error!(tag = self.tag(), id = %self.id(), error = %err, "Unhandled component error");
        if let Some(registry) = self.registry() {
            registry.report_unhandled(err);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::host::FrameStyle;
    use crate::props::{PropDefinition, PropFn};
    use crate::protocol::MessageKind;
    use crate::render::Rect;
    use crate::test_support::{HostCall, MockHost, RecordingChannel, registry, widget};

    fn counter() -> (Arc<AtomicUsize>, PropFn) {
        let count = Arc::new(AtomicUsize::new(0));
        let inner = Arc::clone(&count);
        let callback = PropFn::new(move |_| {
            inner.fetch_add(1, Ordering::SeqCst);
            Ok(Value::Null)
        });
        (count, callback)
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    /// Callback recording whether its controller was destroyed when it ran.
    fn destroyed_recorder() -> (Arc<Mutex<Option<WeakController>>>, Arc<Mutex<Vec<bool>>>, PropFn) {
        let slot: Arc<Mutex<Option<WeakController>>> = Arc::new(Mutex::new(None));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (target, sink) = (Arc::clone(&slot), Arc::clone(&seen));
        let callback = PropFn::new(move |_| {
            let controller = target.lock().as_ref().and_then(WeakController::upgrade);
            sink.lock().extend(controller.map(|c| c.is_destroyed()));
            Ok(Value::Null)
        });
        (slot, seen, callback)
    }

    fn labelled(tag: &str) -> ComponentDefinition {
        ComponentDefinition::builder(tag)
            .url("https://widget.example.com/embed")
            .dimensions(400, 300)
            .prop(PropDefinition::string("label").query_param())
            .build()
            .expect("valid definition")
    }

    #[tokio::test]
    async fn test_render_iframe_loads_url() {
        let host = MockHost::new();
        let channel = RecordingChannel::new();
        let registry = registry(&host, &channel, [widget("card-widget")]);

        let card = registry.create("card-widget", &PropMap::new()).unwrap();
        card.render(RenderOptions::new().element("#mount")).unwrap();

        assert_eq!(card.state(), LifecycleState::WaitingForInit);
        assert_eq!(card.context(), Some(RenderContext::Iframe));
        assert_eq!(host.opened_count(), 1);
        assert_eq!(host.overlay_count(), 0);
        assert_eq!(registry.active_count(), 1);

        let urls = host.loaded_urls();
        assert_eq!(urls.len(), 1);
        assert_eq!(urls[0].host_str(), Some("widget.example.com"));
        assert!(urls[0].query().unwrap().starts_with("env=production&uid="));

        let window = card.window().unwrap();
        assert!(host.calls().contains(&HostCall::Placeholder(window)));
    }

    #[tokio::test]
    async fn test_render_twice_fails() {
        let host = MockHost::new();
        let channel = RecordingChannel::new();
        let registry = registry(&host, &channel, [widget("card-widget")]);

        let card = registry.create("card-widget", &PropMap::new()).unwrap();
        card.render(RenderOptions::new()).unwrap();
        let err = card.render(RenderOptions::new()).unwrap_err();
        assert!(matches!(err, Error::AlreadyRendered { .. }));
        assert_eq!(host.opened_count(), 1);
    }

    #[tokio::test]
    async fn test_disallowed_context_opens_no_window() {
        let host = MockHost::new();
        let channel = RecordingChannel::new();
        let definition = ComponentDefinition::builder("frame-only")
            .url("https://widget.example.com")
            .contexts([RenderContext::Iframe])
            .build()
            .unwrap();
        let registry = registry(&host, &channel, [definition]);

        let widget = registry.create("frame-only", &PropMap::new()).unwrap();
        let err = widget
            .render(RenderOptions::new().context(RenderContext::Popup))
            .unwrap_err();

        assert!(matches!(err, Error::InvalidContext { .. }));
        assert_eq!(host.opened_count(), 0);
        assert_eq!(widget.state(), LifecycleState::Idle);
        assert_eq!(registry.active_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_element_opens_no_window() {
        let host = MockHost::new();
        let channel = RecordingChannel::new();
        let registry = registry(&host, &channel, [widget("card-widget")]);

        let card = registry.create("card-widget", &PropMap::new()).unwrap();
        let err = card.render(RenderOptions::new().element("#nope")).unwrap_err();

        assert!(matches!(err, Error::MissingElement { ref selector, .. } if selector == "#nope"));
        assert_eq!(host.opened_count(), 0);
        assert_eq!(registry.active_count(), 0);
    }

    #[tokio::test]
    async fn test_singleton_rejects_second_instance() {
        let host = MockHost::new();
        let channel = RecordingChannel::new();
        let definition = ComponentDefinition::builder("login-widget")
            .url("https://widget.example.com")
            .singleton()
            .build()
            .unwrap();
        let registry = registry(&host, &channel, [definition]);

        let first = registry.create("login-widget", &PropMap::new()).unwrap();
        first.render(RenderOptions::new()).unwrap();

        let second = registry.create("login-widget", &PropMap::new()).unwrap();
        let err = second.render(RenderOptions::new()).unwrap_err();
        assert!(matches!(err, Error::SingletonViolation { .. }));
        assert_eq!(host.opened_count(), 1);

        first.destroy();
        second.render(RenderOptions::new()).unwrap();
        assert_eq!(registry.active_count(), 1);
    }

    #[tokio::test]
    async fn test_popup_is_centered_with_overlay() {
        let host = MockHost::new();
        let channel = RecordingChannel::new();
        let registry = registry(&host, &channel, [widget("card-widget")]);

        let card = registry.create("card-widget", &PropMap::new()).unwrap();
        card.render(RenderOptions::new().context(RenderContext::Popup))
            .unwrap();

        let rect = host.calls().into_iter().find_map(|call| match call {
            HostCall::OpenPopup { rect, .. } => Some(rect),
            _ => None,
        });
        assert_eq!(
            rect,
            Some(Rect {
                x: 200,
                y: 150,
                width: 400,
                height: 300
            })
        );
        assert_eq!(host.overlay_count(), 1);
    }

    #[tokio::test]
    async fn test_lightbox_mounts_into_body() {
        let host = MockHost::new();
        let channel = RecordingChannel::new();
        let registry = registry(&host, &channel, [widget("card-widget")]);

        let card = registry.create("card-widget", &PropMap::new()).unwrap();
        card.render(RenderOptions::new()).unwrap();

        assert_eq!(card.context(), Some(RenderContext::Lightbox));
        let frame = host.calls().into_iter().find_map(|call| match call {
            HostCall::CreateFrame { element, style, .. } => Some((element, style)),
            _ => None,
        });
        assert_eq!(
            frame,
            Some((
                None,
                FrameStyle::Lightbox(Rect {
                    x: 200,
                    y: 150,
                    width: 400,
                    height: 300
                })
            ))
        );
    }

    #[tokio::test]
    async fn test_dimensions_prop_overrides_definition() {
        let host = MockHost::new();
        let channel = RecordingChannel::new();
        let registry = registry(&host, &channel, [widget("card-widget")]);

        let props = PropMap::new().with("dimensions", serde_json::json!({ "width": 600 }));
        let card = registry.create("card-widget", &props).unwrap();
        card.render(RenderOptions::new().context(RenderContext::Popup))
            .unwrap();

        let rect = host.calls().into_iter().find_map(|call| match call {
            HostCall::OpenPopup { rect, .. } => Some(rect),
            _ => None,
        });
        assert_eq!(rect.map(|r| (r.x, r.width)), Some((100, 600)));
    }

    #[tokio::test]
    async fn test_popup_blocked_leaves_no_active_entry() {
        let host = MockHost::new();
        host.block_popups();
        let channel = RecordingChannel::new();
        let registry = registry(&host, &channel, [widget("card-widget")]);

        let card = registry.create("card-widget", &PropMap::new()).unwrap();
        let err = card
            .render(RenderOptions::new().context(RenderContext::Popup))
            .unwrap_err();

        assert!(err.is_popup_blocked());
        assert_eq!(registry.active_count(), 0);
        assert!(card.is_destroyed());
        assert!(host.loaded_urls().is_empty());
    }

    #[tokio::test]
    async fn test_double_destroy_runs_cleanup_once() {
        let host = MockHost::new();
        let channel = RecordingChannel::new();
        let registry = registry(&host, &channel, [widget("card-widget")]);

        let (closed, on_close) = counter();
        let card = registry
            .create("card-widget", &PropMap::new().with("on_close", on_close))
            .unwrap();
        card.render(RenderOptions::new().context(RenderContext::Popup))
            .unwrap();
        let window = card.window().unwrap();

        card.destroy();
        card.destroy();
        settle().await;

        assert!(card.is_destroyed());
        assert_eq!(card.window(), None);
        assert_eq!(host.closed_count(window), 1);
        assert_eq!(closed.load(Ordering::SeqCst), 1);
        assert_eq!(registry.active_count(), 0);
        // Only the registry's own unload watcher is left.
        assert_eq!(host.listener_count(), 1);
        assert!(matches!(card.wait_init().await, Err(Error::Destroyed { .. })));
    }

    #[tokio::test]
    async fn test_out_of_band_close_destroys() {
        let host = MockHost::new();
        let channel = RecordingChannel::new();
        let registry = registry(&host, &channel, [widget("card-widget")]);

        let card = registry.create("card-widget", &PropMap::new()).unwrap();
        card.render(RenderOptions::new().context(RenderContext::Popup))
            .unwrap();

        host.simulate_close(card.window().unwrap());

        assert!(card.is_destroyed());
        assert_eq!(registry.active_count(), 0);
    }

    #[tokio::test]
    async fn test_page_unload_destroys_everything() {
        let host = MockHost::new();
        let channel = RecordingChannel::new();
        let registry = registry(&host, &channel, [widget("card-widget")]);

        let a = registry.create("card-widget", &PropMap::new()).unwrap();
        a.render(RenderOptions::new().context(RenderContext::Popup))
            .unwrap();
        let b = registry.create("card-widget", &PropMap::new()).unwrap();
        b.render(RenderOptions::new().element("#mount")).unwrap();

        host.simulate_unload();

        assert!(a.is_destroyed());
        assert!(b.is_destroyed());
        assert_eq!(registry.active_count(), 0);
    }

    #[tokio::test]
    async fn test_update_before_init_waits_for_handshake() {
        let host = MockHost::new();
        let channel = RecordingChannel::new();
        let registry = registry(&host, &channel, [labelled("label-widget")]);

        let widget = registry
            .create("label-widget", &PropMap::new().with("label", "a"))
            .unwrap();
        widget.render(RenderOptions::new()).unwrap();

        let update = {
            let widget = widget.clone();
            tokio::spawn(async move { widget.update_props(PropMap::new().with("label", "b")).await })
        };
        settle().await;
        assert!(!update.is_finished());
        assert_eq!(channel.count(MessageKind::Props), 0);

        let reply = widget.handle_message(Message::Init).await.unwrap();
        let (_, props) = reply.into_init().unwrap();
        assert_eq!(props.get_str("label"), Some("b"));

        update.await.unwrap().unwrap();
        // The handshake already carried the latest props.
        assert_eq!(channel.count(MessageKind::Props), 0);
    }

    #[tokio::test]
    async fn test_identical_updates_send_once() {
        let host = MockHost::new();
        let channel = RecordingChannel::new();
        let registry = registry(&host, &channel, [labelled("label-widget")]);

        let widget = registry
            .create("label-widget", &PropMap::new().with("label", "a"))
            .unwrap();
        widget.render(RenderOptions::new()).unwrap();
        widget.handle_message(Message::Init).await.unwrap();

        widget
            .update_props(PropMap::new().with("label", "c"))
            .await
            .unwrap();
        widget
            .update_props(PropMap::new().with("label", "c"))
            .await
            .unwrap();

        assert_eq!(channel.count(MessageKind::Props), 1);
        let sent = channel.sent();
        let Message::Props { props } = &sent[0].message else {
            panic!("expected props message");
        };
        assert_eq!(sent[0].target, widget.window().unwrap());
        assert_eq!(props.get_str("label"), Some("c"));
        assert!(!props.contains_key("url"));
        assert!(!props.contains_key("timeout"));
    }

    #[tokio::test]
    async fn test_update_fails_when_destroyed_before_init() {
        let host = MockHost::new();
        let channel = RecordingChannel::new();
        let registry = registry(&host, &channel, [labelled("label-widget")]);

        let widget = registry.create("label-widget", &PropMap::new()).unwrap();
        widget.render(RenderOptions::new()).unwrap();

        let update = {
            let widget = widget.clone();
            tokio::spawn(async move { widget.update_props(PropMap::new().with("label", "x")).await })
        };
        settle().await;
        widget.destroy();

        let err = update.await.unwrap().unwrap_err();
        assert!(matches!(err, Error::Destroyed { .. }));
        assert_eq!(channel.count(MessageKind::Props), 0);
    }

    #[tokio::test]
    async fn test_timeout_fires_once_and_late_init_is_ignored() {
        let host = MockHost::new();
        let channel = RecordingChannel::new();
        let registry = registry(&host, &channel, [widget("card-widget")]);

        let (timeouts, on_timeout) = counter();
        let (entered, on_enter) = counter();
        let card = registry
            .create(
                "card-widget",
                &PropMap::new()
                    .with("timeout", 100)
                    .with("on_timeout", on_timeout)
                    .with("on_enter", on_enter),
            )
            .unwrap();
        card.render(RenderOptions::new()).unwrap();

        tokio::time::sleep(Duration::from_millis(250)).await;

        assert!(card.is_destroyed());
        assert_eq!(timeouts.load(Ordering::SeqCst), 1);
        assert!(card.wait_init().await.unwrap_err().is_timeout());

        let late = card.handle_message(Message::Init).await;
        assert!(matches!(late, Err(Error::Destroyed { .. })));
        settle().await;
        assert_eq!(entered.load(Ordering::SeqCst), 0);
        assert_eq!(timeouts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_timeout_after_init_is_noop() {
        let host = MockHost::new();
        let channel = RecordingChannel::new();
        let registry = registry(&host, &channel, [widget("card-widget")]);

        let card = registry
            .create("card-widget", &PropMap::new().with("timeout", 50))
            .unwrap();
        card.render(RenderOptions::new()).unwrap();
        card.handle_message(Message::Init).await.unwrap();

        tokio::time::sleep(Duration::from_millis(120)).await;

        assert_eq!(card.state(), LifecycleState::Ready);
        card.wait_init().await.unwrap();
    }

    #[tokio::test]
    async fn test_on_timeout_runs_before_destroy() {
        let host = MockHost::new();
        let channel = RecordingChannel::new();
        let registry = registry(&host, &channel, [widget("card-widget")]);

        let (slot, seen, on_timeout) = destroyed_recorder();
        let card = registry
            .create(
                "card-widget",
                &PropMap::new().with("timeout", 50).with("on_timeout", on_timeout),
            )
            .unwrap();
        *slot.lock() = Some(card.downgrade());
        card.render(RenderOptions::new()).unwrap();

        tokio::time::sleep(Duration::from_millis(150)).await;

        assert!(card.is_destroyed());
        assert_eq!(*seen.lock(), vec![false]);
    }

    #[tokio::test]
    async fn test_timeout_loses_to_settled_handshake() {
        let host = MockHost::new();
        let channel = RecordingChannel::new();
        let registry = registry(&host, &channel, [widget("card-widget")]);

        let (timeouts, on_timeout) = counter();
        let card = registry
            .create("card-widget", &PropMap::new().with("on_timeout", on_timeout))
            .unwrap();
        card.render(RenderOptions::new()).unwrap();

        assert!(card.inner.gate.settle(GateState::Ready));
        card.handle_timeout(100);

        assert_eq!(timeouts.load(Ordering::SeqCst), 0);
        assert!(!card.is_destroyed());
        assert!(card.inner.gate.is_ready());
    }

    #[tokio::test]
    async fn test_failed_render_skips_on_close() {
        let host = MockHost::new();
        host.block_popups();
        let channel = RecordingChannel::new();
        let registry = registry(&host, &channel, [widget("card-widget")]);

        let (closed, on_close) = counter();
        let card = registry
            .create("card-widget", &PropMap::new().with("on_close", on_close))
            .unwrap();
        assert!(
            card.render(RenderOptions::new().context(RenderContext::Popup))
                .is_err()
        );

        assert!(card.is_destroyed());
        assert_eq!(closed.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_close_notifies_ready_child() {
        let host = MockHost::new();
        let channel = RecordingChannel::new();
        let registry = registry(&host, &channel, [widget("card-widget")]);

        let card = registry.create("card-widget", &PropMap::new()).unwrap();
        card.render(RenderOptions::new()).unwrap();
        card.handle_message(Message::Init).await.unwrap();

        card.close().await;

        assert_eq!(channel.count(MessageKind::Close), 1);
        assert!(card.is_destroyed());
    }

    #[tokio::test]
    async fn test_close_before_init_skips_notification() {
        let host = MockHost::new();
        let channel = RecordingChannel::new();
        let registry = registry(&host, &channel, [widget("card-widget")]);

        let card = registry.create("card-widget", &PropMap::new()).unwrap();
        card.render(RenderOptions::new()).unwrap();
        card.close().await;

        assert!(channel.sent().is_empty());
        assert!(card.is_destroyed());
    }

    #[tokio::test]
    async fn test_failed_close_notification_still_destroys() {
        let host = MockHost::new();
        let channel = RecordingChannel::new();
        channel.respond_with(|_| Err(Error::transport("window gone")));
        let registry = registry(&host, &channel, [widget("card-widget")]);

        let card = registry.create("card-widget", &PropMap::new()).unwrap();
        card.render(RenderOptions::new()).unwrap();
        card.handle_message(Message::Init).await.unwrap();

        card.close().await;

        assert!(card.is_destroyed());
        assert_eq!(registry.active_count(), 0);
    }

    #[tokio::test]
    async fn test_parent_resize() {
        let host = MockHost::new();
        let channel = RecordingChannel::new();
        let registry = registry(&host, &channel, [widget("card-widget")]);

        let frame = registry.create("card-widget", &PropMap::new()).unwrap();
        frame.render(RenderOptions::new().element("#mount")).unwrap();
        frame.resize(500, 200).unwrap();
        assert!(host.calls().contains(&HostCall::ResizeFrame {
            window: frame.window().unwrap(),
            width: 500,
            height: 200
        }));

        let popup = registry.create("card-widget", &PropMap::new()).unwrap();
        popup
            .render(RenderOptions::new().context(RenderContext::Popup))
            .unwrap();
        assert!(matches!(
            popup.resize(500, 200),
            Err(Error::InvalidContext { .. })
        ));
    }

    #[tokio::test]
    async fn test_hijack_retargets_and_never_loads() {
        let host = MockHost::new();
        host.add_element("#checkout-link");
        let channel = RecordingChannel::new();
        let registry = registry(&host, &channel, [widget("card-widget")]);

        let card = registry.create("card-widget", &PropMap::new()).unwrap();
        card.hijack(ElementRef::new("#checkout-link"), Some(RenderContext::Popup))
            .unwrap();
        assert_eq!(host.opened_count(), 0);

        host.click("#checkout-link");

        assert_eq!(card.state(), LifecycleState::WaitingForInit);
        assert!(host.calls().contains(&HostCall::Retarget {
            element: "#checkout-link".to_string(),
            name: card.window_name().unwrap(),
        }));
        assert!(host.loaded_urls().is_empty());
        assert_eq!(host.overlay_count(), 1);
        assert_eq!(registry.active_count(), 1);
    }

    #[tokio::test]
    async fn test_window_name_identifies_instance() {
        let host = MockHost::new();
        let channel = RecordingChannel::new();
        let registry = registry(&host, &channel, [widget("card-widget")]);

        let card = registry.create("card-widget", &PropMap::new()).unwrap();
        card.render(RenderOptions::new()).unwrap();

        let name = ChildWindowName::decode(&card.window_name().unwrap()).unwrap();
        assert_eq!(name.id, card.id());
        assert_eq!(name.tag, "card-widget");
        assert_eq!(name.context, RenderContext::Lightbox);
        assert!(!name.is_relay());
        assert_eq!(host.window_by_name(&card.window_name().unwrap()), card.window());
    }

    #[test]
    fn test_render_without_runtime_when_no_timeout() {
        let host = MockHost::new();
        let channel = RecordingChannel::new();
        let registry = registry(&host, &channel, [widget("card-widget")]);

        let card = registry.create("card-widget", &PropMap::new()).unwrap();
        card.render(RenderOptions::new()).unwrap();
        card.destroy();
        assert!(card.is_destroyed());
    }

    #[test]
    fn test_on_close_runs_without_runtime() {
        let host = MockHost::new();
        let channel = RecordingChannel::new();
        let registry = registry(&host, &channel, [widget("card-widget")]);

        let (closed, on_close) = counter();
        let card = registry
            .create("card-widget", &PropMap::new().with("on_close", on_close))
            .unwrap();
        card.render(RenderOptions::new()).unwrap();
        card.destroy();

        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }
}
