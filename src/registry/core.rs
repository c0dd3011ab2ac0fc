//! Component registry: definitions, live instances and message routing.
//!
//! One [`Registry`] exists per page. It owns the host and channel handles,
//! the registered definitions, the set of live instances and the map from
//! child windows to the controllers listening on them.
//!
//! # Example
//!
//! ```ignore
//! use widget_embed::{ComponentDefinition, PropMap, Registry, RenderOptions};
//!
//! let registry = Registry::builder()
//!     .host(host)
//!     .channel(channel)
//!     .component(
//!         ComponentDefinition::builder("pay-button")
//!             .url("https://pay.example.com/button")
//!             .build()?,
//!     )
//!     .build()?;
//!
//! let button = registry.create("pay-button", &PropMap::new())?;
//! button.render(RenderOptions::new().element("#pay"))?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use crate::component::{ComponentDefinition, RenderContext};
use crate::error::{Error, Result};
use crate::host::WindowHost;
use crate::identifiers::{InstanceId, ListenerId, WindowId};
use crate::parent::ParentController;
use crate::parent::controller::WeakController;
use crate::props::{PropMap, normalize_props};
use crate::protocol::{Message, Reply};
use crate::render::{DriverTable, RenderDriver};
use crate::transport::{Channel, EndpointHandler, LoopbackChannel, endpoint};

use super::builder::{RegistryBuilder, RegistryConfig};

// ============================================================================
// Types
// ============================================================================

/// Controller listening on a child window.
struct Listener {
    id: InstanceId,
    controller: WeakController,
}

/// Internal shared state for the registry.
pub(crate) struct RegistryInner {
    /// Window and page primitives.
    pub host: Arc<dyn WindowHost>,

    /// Message channel to other windows.
    pub channel: Arc<dyn Channel>,

    /// Page configuration.
    pub config: RegistryConfig,

    /// Registered definitions by tag.
    definitions: RwLock<FxHashMap<String, Arc<ComponentDefinition>>>,

    /// Live instances.
    active: Mutex<FxHashMap<InstanceId, ParentController>>,

    /// Idle instances waiting on a click interceptor.
    armed: Mutex<FxHashMap<InstanceId, WeakController>>,

    /// Child windows and the controllers listening on them.
    listeners: Mutex<FxHashMap<WindowId, Listener>>,

    /// Drivers by render context.
    drivers: DriverTable,

    /// Errors nobody handled.
    unhandled_tx: mpsc::UnboundedSender<Error>,
    unhandled_rx: Mutex<Option<mpsc::UnboundedReceiver<Error>>>,

    /// Page unload watcher.
    unload_listener: Mutex<Option<ListenerId>>,
}

// ============================================================================
// Registry
// ============================================================================

/// Per-page component registry.
#[derive(Clone)]
pub struct Registry {
    /// Shared inner state.
    pub(crate) inner: Arc<RegistryInner>,
}

// ============================================================================
// Registry - Display
// ============================================================================

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("window", &self.inner.config.window)
            .field("components", &self.inner.definitions.read().len())
            .field("active", &self.active_count())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Registry - Construction
// ============================================================================

impl Registry {
    /// Creates a configuration builder.
    #[inline]
    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Creates a registry from validated parts.
    pub(crate) fn new(
        host: Arc<dyn WindowHost>,
        channel: Arc<dyn Channel>,
        config: RegistryConfig,
        drivers: DriverTable,
    ) -> Self {
        let (unhandled_tx, unhandled_rx) = mpsc::unbounded_channel();

        let inner = Arc::new(RegistryInner {
            host,
            channel,
            config,
            definitions: RwLock::new(FxHashMap::default()),
            active: Mutex::new(FxHashMap::default()),
            armed: Mutex::new(FxHashMap::default()),
            listeners: Mutex::new(FxHashMap::default()),
            drivers,
            unhandled_tx,
            unhandled_rx: Mutex::new(Some(unhandled_rx)),
            unload_listener: Mutex::new(None),
        });

        let registry = Self { inner };
        registry.watch_unload();
        registry
    }

    pub(crate) fn from_inner(inner: Arc<RegistryInner>) -> Self {
        Self { inner }
    }

    /// Destroys every live instance when the page unloads.
    fn watch_unload(&self) {
        let weak = Arc::downgrade(&self.inner);
        let listener = self.inner.host.on_unload(Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                debug!("Page unloading");
                Registry::from_inner(inner).destroy_all();
            }
        }));
        *self.inner.unload_listener.lock() = Some(listener);
    }
}

// ============================================================================
// Registry - Definitions
// ============================================================================

impl Registry {
    /// Registers a component definition.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] if the tag is already registered.
    pub fn register(&self, definition: ComponentDefinition) -> Result<Arc<ComponentDefinition>> {
        let mut definitions = self.inner.definitions.write();
        if definitions.contains_key(definition.tag()) {
            return Err(Error::config(format!(
                "Component {} is already registered",
                definition.tag()
            )));
        }

        let definition = Arc::new(definition);
        definitions.insert(definition.tag().to_string(), Arc::clone(&definition));
        debug!(tag = definition.tag(), "Component registered");
        Ok(definition)
    }

    /// Looks up a definition by tag.
    #[must_use]
    pub fn definition(&self, tag: &str) -> Option<Arc<ComponentDefinition>> {
        self.inner.definitions.read().get(tag).cloned()
    }

    /// Returns the registered tags.
    #[must_use]
    pub fn tags(&self) -> Vec<String> {
        let mut tags: Vec<_> = self.inner.definitions.read().keys().cloned().collect();
        tags.sort();
        tags
    }
}

// ============================================================================
// Registry - Instances
// ============================================================================

impl Registry {
    /// Creates an idle controller with normalized props.
    ///
    /// # Errors
    ///
    /// - [`Error::UnknownComponent`] if the tag is not registered
    /// - prop errors from normalization
    pub fn create(&self, tag: &str, props: &PropMap) -> Result<ParentController> {
        let definition = self
            .definition(tag)
            .ok_or_else(|| Error::unknown_component(tag))?;
        let props = normalize_props(&definition, props)?;
        Ok(ParentController::new(self, definition, props))
    }

    /// Creates and renders a controller.
    ///
    /// # Errors
    ///
    /// See [`Registry::create`] and [`ParentController::render`].
    pub fn render(
        &self,
        tag: &str,
        props: &PropMap,
        options: crate::parent::RenderOptions,
    ) -> Result<ParentController> {
        let controller = self.create(tag, props)?;
        controller.render(options)?;
        Ok(controller)
    }

    /// Returns the number of live instances.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.inner.active.lock().len()
    }

    /// Returns the live instances of a tag.
    #[must_use]
    pub fn instances(&self, tag: &str) -> Vec<ParentController> {
        self.inner
            .active
            .lock()
            .values()
            .filter(|controller| controller.tag() == tag)
            .cloned()
            .collect()
    }

    /// Destroys every live instance and releases pending click interceptors.
    pub fn destroy_all(&self) {
        let mut controllers: Vec<ParentController> = {
            let mut active = self.inner.active.lock();
            active.drain().map(|(_, controller)| controller).collect()
        };
        let armed: Vec<WeakController> = {
            let mut armed = self.inner.armed.lock();
            armed.drain().map(|(_, controller)| controller).collect()
        };
        controllers.extend(armed.iter().filter_map(WeakController::upgrade));

        info!(count = controllers.len(), "Destroying all components");

        for controller in controllers {
            controller.destroy();
        }
    }

    pub(crate) fn has_active(&self, tag: &str) -> bool {
        self.inner
            .active
            .lock()
            .values()
            .any(|controller| controller.tag() == tag)
    }

    pub(crate) fn arm(&self, controller: &ParentController) {
        self.inner
            .armed
            .lock()
            .insert(controller.id(), controller.downgrade());
    }

    pub(crate) fn activate(&self, controller: &ParentController) {
        self.inner.armed.lock().remove(&controller.id());
        self.inner
            .active
            .lock()
            .insert(controller.id(), controller.clone());
    }

    pub(crate) fn deactivate(&self, id: InstanceId) {
        self.inner.armed.lock().remove(&id);
        self.inner.active.lock().remove(&id);
    }
}

// ============================================================================
// Registry - Routing
// ============================================================================

impl Registry {
    /// Routes a message from `source` to the controller listening on it.
    ///
    /// # Errors
    ///
    /// - [`Error::Protocol`] if no live controller listens on `source`
    /// - errors from the controller's handler
    pub async fn dispatch(&self, source: WindowId, message: Message) -> Result<Reply> {
        let controller = {
            let listeners = self.inner.listeners.lock();
            listeners
                .get(&source)
                .and_then(|listener| listener.controller.upgrade())
        };

        let Some(controller) = controller else {
            warn!(%source, kind = %message.kind(), "Message from unknown window");
            return Err(Error::protocol(format!(
                "No component listens on window {source}"
            )));
        };

        trace!(%source, tag = controller.tag(), kind = %message.kind(), "Dispatching");
        controller.handle_message(message).await
    }

    /// Returns a channel endpoint that dispatches into this registry.
    #[must_use]
    pub fn endpoint(&self) -> EndpointHandler {
        let weak = Arc::downgrade(&self.inner);
        endpoint(move |envelope| {
            let weak = weak.clone();
            async move {
                let inner = weak
                    .upgrade()
                    .ok_or_else(|| Error::transport("Registry dropped"))?;
                Registry::from_inner(inner)
                    .dispatch(envelope.source, envelope.message)
                    .await
            }
        })
    }

    /// Registers this page's window on a loopback channel.
    pub fn attach(&self, channel: &LoopbackChannel) {
        channel.register(self.window(), self.endpoint());
    }

    pub(crate) fn listen(&self, window: WindowId, controller: &ParentController) {
        let previous = self.inner.listeners.lock().insert(
            window,
            Listener {
                id: controller.id(),
                controller: controller.downgrade(),
            },
        );
        if previous.is_some() {
            debug!(%window, "Listener replaced");
        }
    }

    /// Stops routing `window`, if `id` still owns it.
    pub(crate) fn unlisten(&self, window: WindowId, id: InstanceId) {
        let mut listeners = self.inner.listeners.lock();
        if listeners.get(&window).is_some_and(|listener| listener.id == id) {
            listeners.remove(&window);
        }
    }
}

// ============================================================================
// Registry - Accessors
// ============================================================================

impl Registry {
    /// Returns the page configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &RegistryConfig {
        &self.inner.config
    }

    /// Returns this page's window.
    #[inline]
    #[must_use]
    pub fn window(&self) -> WindowId {
        self.inner.config.window
    }

    /// Takes the stream of errors no `on_error` handled.
    ///
    /// Returns `None` after the first call.
    pub fn unhandled_errors(&self) -> Option<mpsc::UnboundedReceiver<Error>> {
        self.inner.unhandled_rx.lock().take()
    }

    pub(crate) fn report_unhandled(&self, err: Error) {
        let _ = self.inner.unhandled_tx.send(err);
    }

    pub(crate) fn driver(&self, context: RenderContext) -> Option<RenderDriver> {
        self.inner.drivers.get(context)
    }

    pub(crate) fn host_handle(&self) -> Arc<dyn WindowHost> {
        Arc::clone(&self.inner.host)
    }

    pub(crate) fn channel_handle(&self) -> Arc<dyn Channel> {
        Arc::clone(&self.inner.channel)
    }
}

impl Drop for RegistryInner {
    fn drop(&mut self) {
        if let Some(listener) = self.unload_listener.get_mut().take() {
            self.host.unlisten(listener);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
