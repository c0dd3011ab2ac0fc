//! Test doubles for the host and the channel.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use url::Url;

use crate::component::{ComponentDefinition, RenderContext};
use crate::error::{Error, Result};
use crate::host::{ElementRef, FrameSpec, FrameStyle, HostCallback, PopupSpec, WindowHost};
use crate::identifiers::{ListenerId, OverlayId, WindowId};
use crate::protocol::{Message, MessageKind, Reply};
use crate::registry::Registry;
use crate::render::{Rect, Size};
use crate::transport::Channel;

// ============================================================================
// Tracing
// ============================================================================

/// Installs a test subscriber once; honours `RUST_LOG`.
pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ============================================================================
// MockHost
// ============================================================================

/// Host call recorded by [`MockHost`].
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum HostCall {
    CreateFrame {
        window: WindowId,
        name: String,
        element: Option<String>,
        style: FrameStyle,
    },
    OpenPopup {
        window: WindowId,
        name: String,
        rect: Rect,
    },
    LoadUrl {
        window: WindowId,
        url: String,
    },
    CloseWindow(WindowId),
    ResizeFrame {
        window: WindowId,
        width: u32,
        height: u32,
    },
    Placeholder(WindowId),
    ShowOverlay {
        window: WindowId,
        context: RenderContext,
    },
    RemoveOverlay(OverlayId),
    Retarget {
        element: String,
        name: String,
    },
}

enum WatchKind {
    Close(WindowId),
    Unload,
    Click(String),
}

struct MockWindow {
    name: String,
    closed: bool,
}

/// Recording in-memory [`WindowHost`].
pub(crate) struct MockHost {
    screen: Size,
    elements: Mutex<Vec<String>>,
    block_popups: AtomicBool,
    windows: Mutex<FxHashMap<WindowId, MockWindow>>,
    watchers: Mutex<FxHashMap<ListenerId, (WatchKind, HostCallback)>>,
    calls: Mutex<Vec<HostCall>>,
}

impl MockHost {
    /// 800x600 screen with a `#mount` element.
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            screen: Size::new(800, 600),
            elements: Mutex::new(vec!["#mount".to_string()]),
            block_popups: AtomicBool::new(false),
            windows: Mutex::new(FxHashMap::default()),
            watchers: Mutex::new(FxHashMap::default()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn add_element(&self, selector: &str) {
        self.elements.lock().push(selector.to_string());
    }

    pub(crate) fn block_popups(&self) {
        self.block_popups.store(true, Ordering::SeqCst);
    }

    pub(crate) fn calls(&self) -> Vec<HostCall> {
        self.calls.lock().clone()
    }

    /// Number of windows ever opened.
    pub(crate) fn opened_count(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| matches!(call, HostCall::CreateFrame { .. } | HostCall::OpenPopup { .. }))
            .count()
    }

    pub(crate) fn loaded_urls(&self) -> Vec<Url> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                HostCall::LoadUrl { url, .. } => Url::parse(url).ok(),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn closed_count(&self, window: WindowId) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| **call == HostCall::CloseWindow(window))
            .count()
    }

    pub(crate) fn overlay_count(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| matches!(call, HostCall::ShowOverlay { .. }))
            .count()
    }

    pub(crate) fn window_by_name(&self, name: &str) -> Option<WindowId> {
        self.windows
            .lock()
            .iter()
            .find(|(_, window)| window.name == name && !window.closed)
            .map(|(id, _)| *id)
    }

    /// Number of registered watchers.
    pub(crate) fn listener_count(&self) -> usize {
        self.watchers.lock().len()
    }

    /// Closes a window from outside, firing its close watchers.
    pub(crate) fn simulate_close(&self, window: WindowId) {
        if let Some(entry) = self.windows.lock().get_mut(&window) {
            entry.closed = true;
        }
        self.fire(|kind| matches!(kind, WatchKind::Close(w) if *w == window));
    }

    /// Fires every unload watcher.
    pub(crate) fn simulate_unload(&self) {
        self.fire(|kind| matches!(kind, WatchKind::Unload));
    }

    /// Clicks an element, firing its first-click interceptors.
    pub(crate) fn click(&self, selector: &str) {
        self.fire(|kind| matches!(kind, WatchKind::Click(s) if s == selector));
    }

    fn fire(&self, matches: impl Fn(&WatchKind) -> bool) {
        let callbacks: Vec<HostCallback> = {
            let mut watchers = self.watchers.lock();
            let ids: Vec<ListenerId> = watchers
                .iter()
                .filter(|(_, (kind, _))| matches(kind))
                .map(|(id, _)| *id)
                .collect();
            ids.into_iter()
                .filter_map(|id| watchers.remove(&id).map(|(_, callback)| callback))
                .collect()
        };
        for callback in callbacks {
            callback();
        }
    }

    fn open_window(&self, name: &str) -> WindowId {
        let window = WindowId::next();
        self.windows.lock().insert(
            window,
            MockWindow {
                name: name.to_string(),
                closed: false,
            },
        );
        window
    }

    fn record(&self, call: HostCall) {
        self.calls.lock().push(call);
    }

    fn watch(&self, kind: WatchKind, callback: HostCallback) -> ListenerId {
        let id = ListenerId::next();
        self.watchers.lock().insert(id, (kind, callback));
        id
    }
}

impl WindowHost for MockHost {
    fn screen_size(&self) -> Size {
        self.screen
    }

    fn element_exists(&self, element: &ElementRef) -> bool {
        self.elements
            .lock()
            .iter()
            .any(|selector| selector == element.selector())
    }

    fn create_frame(&self, spec: &FrameSpec<'_>) -> Result<WindowId> {
        let window = self.open_window(spec.name);
        self.record(HostCall::CreateFrame {
            window,
            name: spec.name.to_string(),
            element: spec.element.map(|e| e.selector().to_string()),
            style: spec.style,
        });
        Ok(window)
    }

    fn open_popup(&self, spec: &PopupSpec<'_>) -> Option<WindowId> {
        if self.block_popups.load(Ordering::SeqCst) {
            return None;
        }
        let window = self
            .window_by_name(spec.name)
            .unwrap_or_else(|| self.open_window(spec.name));
        self.record(HostCall::OpenPopup {
            window,
            name: spec.name.to_string(),
            rect: spec.rect,
        });
        Some(window)
    }

    fn is_closed(&self, window: WindowId) -> bool {
        self.windows
            .lock()
            .get(&window)
            .is_none_or(|window| window.closed)
    }

    fn load_url(&self, window: WindowId, url: &Url) -> Result<()> {
        if self.is_closed(window) {
            return Err(Error::transport(format!("Window {window} is closed")));
        }
        self.record(HostCall::LoadUrl {
            window,
            url: url.to_string(),
        });
        Ok(())
    }

    fn close_window(&self, window: WindowId) {
        if let Some(entry) = self.windows.lock().get_mut(&window) {
            entry.closed = true;
        }
        self.record(HostCall::CloseWindow(window));
    }

    fn resize_frame(&self, window: WindowId, width: u32, height: u32) {
        self.record(HostCall::ResizeFrame {
            window,
            width,
            height,
        });
    }

    fn inject_placeholder(&self, window: WindowId, _tag: &str) {
        self.record(HostCall::Placeholder(window));
    }

    fn show_overlay(&self, _tag: &str, context: RenderContext, window: WindowId) -> OverlayId {
        self.record(HostCall::ShowOverlay { window, context });
        OverlayId::next()
    }

    fn remove_overlay(&self, overlay: OverlayId) {
        self.record(HostCall::RemoveOverlay(overlay));
    }

    fn watch_close(&self, window: WindowId, callback: HostCallback) -> ListenerId {
        self.watch(WatchKind::Close(window), callback)
    }

    fn on_unload(&self, callback: HostCallback) -> ListenerId {
        self.watch(WatchKind::Unload, callback)
    }

    fn on_first_click(&self, element: &ElementRef, callback: HostCallback) -> ListenerId {
        self.watch(WatchKind::Click(element.selector().to_string()), callback)
    }

    fn unlisten(&self, listener: ListenerId) {
        self.watchers.lock().remove(&listener);
    }

    fn find_frame(&self, _parent: WindowId, name: &str) -> Option<WindowId> {
        self.window_by_name(name)
    }

    fn retarget_navigation(&self, element: &ElementRef, window_name: &str) -> Result<()> {
        self.record(HostCall::Retarget {
            element: element.selector().to_string(),
            name: window_name.to_string(),
        });
        Ok(())
    }
}

// ============================================================================
// RecordingChannel
// ============================================================================

type Responder = Box<dyn Fn(&Message) -> Result<Reply> + Send + Sync>;

/// Message recorded by [`RecordingChannel`].
#[derive(Debug, Clone)]
pub(crate) struct SentMessage {
    pub(crate) target: WindowId,
    pub(crate) message: Message,
}

/// [`Channel`] that records messages and replies with `Ack`.
pub(crate) struct RecordingChannel {
    sent: Mutex<Vec<SentMessage>>,
    responder: Mutex<Option<Responder>>,
}

impl RecordingChannel {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
            responder: Mutex::new(None),
        })
    }

    /// Replies through `responder` instead of acknowledging.
    pub(crate) fn respond_with(
        &self,
        responder: impl Fn(&Message) -> Result<Reply> + Send + Sync + 'static,
    ) {
        *self.responder.lock() = Some(Box::new(responder));
    }

    pub(crate) fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().clone()
    }

    pub(crate) fn sent_kinds(&self) -> Vec<MessageKind> {
        self.sent
            .lock()
            .iter()
            .map(|sent| sent.message.kind())
            .collect()
    }

    pub(crate) fn count(&self, kind: MessageKind) -> usize {
        self.sent
            .lock()
            .iter()
            .filter(|sent| sent.message.kind() == kind)
            .count()
    }
}

#[async_trait]
impl Channel for RecordingChannel {
    async fn send(&self, _source: WindowId, target: WindowId, message: Message) -> Result<Reply> {
        let reply = match self.responder.lock().as_ref() {
            Some(responder) => responder(&message),
            None => Ok(Reply::Ack),
        };
        self.sent.lock().push(SentMessage { target, message });
        reply
    }
}

// ============================================================================
// Fixtures
// ============================================================================

/// Definition allowing every context.
pub(crate) fn widget(tag: &str) -> ComponentDefinition {
    ComponentDefinition::builder(tag)
        .url("https://widget.example.com/embed")
        .dimensions(400, 300)
        .build()
        .expect("valid definition")
}

/// Registry over a mock host and recording channel.
pub(crate) fn registry(
    host: &Arc<MockHost>,
    channel: &Arc<RecordingChannel>,
    definitions: impl IntoIterator<Item = ComponentDefinition>,
) -> Registry {
    init_tracing();
    definitions
        .into_iter()
        .fold(
            Registry::builder()
                .host(Arc::clone(host))
                .channel(Arc::clone(channel)),
            |builder, definition| builder.component(definition),
        )
        .build()
        .expect("valid registry")
}
