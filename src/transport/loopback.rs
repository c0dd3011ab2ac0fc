//! In-process channel with request/reply correlation.
//!
//! Windows register an [`EndpointHandler`] under their [`WindowId`]. Sends
//! are queued to an event loop task that routes each envelope to the
//! target's handler and correlates the reply by [`RequestId`].
//!
//! Envelopes between the same two windows are handled one at a time, in
//! the order they were sent. Different window pairs run concurrently.
//!
//! # Event Loop
//!
//! The channel spawns a tokio task that handles:
//!
//! - Outgoing envelopes from [`Channel::send`]
//! - Completed handler calls
//! - Removal of timed-out correlation entries
//! - Dropping the delivery queues of unregistered windows
//! - Shutdown, failing every pending request

// ============================================================================
// Imports
// ============================================================================

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::{RequestId, WindowId};
use crate::protocol::{Envelope, Message, Reply};

use super::channel::Channel;

// ============================================================================
// Constants
// ============================================================================

/// Default timeout for a request.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum pending requests before rejecting new ones.
const MAX_PENDING_REQUESTS: usize = 100;

// ============================================================================
// Types
// ============================================================================

/// Handles envelopes delivered to one window.
pub type EndpointHandler = Arc<dyn Fn(Envelope) -> BoxFuture<'static, Result<Reply>> + Send + Sync>;

/// Wraps an async function as an [`EndpointHandler`].
pub fn endpoint<F, Fut>(handler: F) -> EndpointHandler
where
    F: Fn(Envelope) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Reply>> + Send + 'static,
{
    Arc::new(move |envelope: Envelope| -> BoxFuture<'static, Result<Reply>> {
        Box::pin(handler(envelope))
    })
}

/// Map of request IDs to reply channels.
type CorrelationMap = FxHashMap<RequestId, oneshot::Sender<Result<Reply>>>;

/// Map of windows to their handlers.
type EndpointMap = FxHashMap<WindowId, EndpointHandler>;

/// Ordered delivery queue for one `(source, target)` pair.
type Lane = mpsc::UnboundedSender<(Envelope, EndpointHandler)>;

/// Map of window pairs to their delivery queues, owned by the event loop.
type LaneMap = FxHashMap<(WindowId, WindowId), Lane>;

// ============================================================================
// LoopbackCommand
// ============================================================================

/// Internal commands for the event loop.
enum LoopbackCommand {
    /// Route an envelope and wait for its reply.
    Send {
        envelope: Envelope,
        reply_tx: oneshot::Sender<Result<Reply>>,
    },
    /// A handler finished.
    Complete {
        request_id: RequestId,
        result: Result<Reply>,
    },
    /// Remove a timed-out correlation entry.
    RemoveCorrelation(RequestId),
    /// Drop the delivery queues touching a window.
    DropLanes(WindowId),
    /// Shutdown the channel.
    Shutdown,
}

// ============================================================================
// LoopbackChannel
// ============================================================================

/// In-process [`Channel`] for windows living in the same runtime.
///
/// # Thread Safety
///
/// `LoopbackChannel` is `Send + Sync` and cheap to clone; clones share the
/// same event loop, endpoints and correlation map.
#[derive(Clone)]
pub struct LoopbackChannel {
    /// Channel for sending commands to the event loop.
    command_tx: mpsc::UnboundedSender<LoopbackCommand>,
    /// Correlation map (shared with event loop).
    correlation: Arc<Mutex<CorrelationMap>>,
    /// Registered endpoints (shared with event loop).
    endpoints: Arc<Mutex<EndpointMap>>,
    /// Per-request timeout.
    request_timeout: Duration,
}

impl LoopbackChannel {
    /// Creates a channel with the default request timeout (30s).
    ///
    /// Spawns the event loop task; must be called inside a Tokio runtime.
    #[must_use]
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_REQUEST_TIMEOUT)
    }

    /// Creates a channel with a custom request timeout.
    #[must_use]
    pub fn with_timeout(request_timeout: Duration) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let correlation = Arc::new(Mutex::new(CorrelationMap::default()));
        let endpoints = Arc::new(Mutex::new(EndpointMap::default()));

        tokio::spawn(Self::run_event_loop(
            command_rx,
            command_tx.downgrade(),
            Arc::clone(&correlation),
            Arc::clone(&endpoints),
        ));

        Self {
            command_tx,
            correlation,
            endpoints,
            request_timeout,
        }
    }

    /// Registers the handler for a window, replacing any previous one.
    pub fn register(&self, window: WindowId, handler: EndpointHandler) {
        self.endpoints.lock().insert(window, handler);
        debug!(%window, "Endpoint registered");
    }

    /// Removes the handler for a window.
    pub fn unregister(&self, window: WindowId) {
        if self.endpoints.lock().remove(&window).is_some() {
            let _ = self.command_tx.send(LoopbackCommand::DropLanes(window));
            debug!(%window, "Endpoint unregistered");
        }
    }

    /// Returns the number of pending requests.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.correlation.lock().len()
    }

    /// Shuts down the event loop, failing pending requests.
    pub fn shutdown(&self) {
        let _ = self.command_tx.send(LoopbackCommand::Shutdown);
    }

    /// Sends an envelope and waits for the reply.
    async fn send_envelope(&self, envelope: Envelope) -> Result<Reply> {
        let request_id = envelope.id;

        {
            let correlation = self.correlation.lock();
            if correlation.len() >= MAX_PENDING_REQUESTS {
                warn!(
                    pending = correlation.len(),
                    max = MAX_PENDING_REQUESTS,
                    "Too many pending requests"
                );
                return Err(Error::transport(format!(
                    "Too many pending requests: {}/{}",
                    correlation.len(),
                    MAX_PENDING_REQUESTS
                )));
            }
        }

        let (reply_tx, reply_rx) = oneshot::channel();

        self.command_tx
            .send(LoopbackCommand::Send { envelope, reply_tx })
            .map_err(|_| Error::transport("Channel closed"))?;

        match timeout(self.request_timeout, reply_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(Error::ChannelClosed(e)),
            Err(_) => {
                let _ = self
                    .command_tx
                    .send(LoopbackCommand::RemoveCorrelation(request_id));

                Err(Error::request_timeout(
                    request_id,
                    self.request_timeout.as_millis() as u64,
                ))
            }
        }
    }

    /// Event loop that routes envelopes to endpoints.
    async fn run_event_loop(
        mut command_rx: mpsc::UnboundedReceiver<LoopbackCommand>,
        command_tx: mpsc::WeakUnboundedSender<LoopbackCommand>,
        correlation: Arc<Mutex<CorrelationMap>>,
        endpoints: Arc<Mutex<EndpointMap>>,
    ) {
        let mut lanes = LaneMap::default();

        while let Some(command) = command_rx.recv().await {
            match command {
                LoopbackCommand::Send { envelope, reply_tx } => {
                    Self::handle_send_command(
                        envelope,
                        reply_tx,
                        &command_tx,
                        &correlation,
                        &endpoints,
                        &mut lanes,
                    );
                }

                LoopbackCommand::Complete { request_id, result } => {
                    let tx = correlation.lock().remove(&request_id);
                    match tx {
                        Some(tx) => {
                            let _ = tx.send(result);
                        }
                        None => warn!(%request_id, "Reply for unknown request"),
                    }
                }

                LoopbackCommand::RemoveCorrelation(request_id) => {
                    correlation.lock().remove(&request_id);
                    debug!(%request_id, "Removed timed-out correlation");
                }

                LoopbackCommand::DropLanes(window) => {
                    lanes.retain(|(source, target), _| *source != window && *target != window);
                }

                LoopbackCommand::Shutdown => {
                    debug!("Shutdown command received");
                    break;
                }
            }
        }

        Self::fail_pending_requests(&correlation);

        debug!("Event loop terminated");
    }

    /// Routes one envelope to its target's handler.
    fn handle_send_command(
        envelope: Envelope,
        reply_tx: oneshot::Sender<Result<Reply>>,
        command_tx: &mpsc::WeakUnboundedSender<LoopbackCommand>,
        correlation: &Arc<Mutex<CorrelationMap>>,
        endpoints: &Arc<Mutex<EndpointMap>>,
        lanes: &mut LaneMap,
    ) {
        let request_id = envelope.id;
        let source = envelope.source;
        let target = envelope.target;

        let Some(handler) = endpoints.lock().get(&target).cloned() else {
            let _ = reply_tx.send(Err(Error::transport(format!(
                "No endpoint for window {target}"
            ))));
            return;
        };

        correlation.lock().insert(request_id, reply_tx);

        trace!(
            %request_id,
            source = %envelope.source,
            %target,
            kind = %envelope.message.kind(),
            "Envelope routed"
        );

        // Handlers may send their own messages, so they run off the loop.
        let lane = lanes
            .entry((source, target))
            .or_insert_with(|| Self::spawn_lane(source, target, command_tx.clone()));

        if let Err(mpsc::error::SendError((envelope, handler))) = lane.send((envelope, handler)) {
            let lane = Self::spawn_lane(source, target, command_tx.clone());
            let _ = lane.send((envelope, handler));
            lanes.insert((source, target), lane);
        }
    }

    /// Spawns the worker draining one window pair's queue in order.
    fn spawn_lane(
        source: WindowId,
        target: WindowId,
        command_tx: mpsc::WeakUnboundedSender<LoopbackCommand>,
    ) -> Lane {
        let (lane_tx, mut lane_rx) = mpsc::unbounded_channel::<(Envelope, EndpointHandler)>();

        tokio::spawn(async move {
            while let Some((envelope, handler)) = lane_rx.recv().await {
                let request_id = envelope.id;
                let result = handler(envelope).await;
                let Some(command_tx) = command_tx.upgrade() else {
                    break;
                };
                let _ = command_tx.send(LoopbackCommand::Complete { request_id, result });
            }
            trace!(%source, %target, "Lane closed");
        });

        lane_tx
    }

    /// Fails all pending requests.
    fn fail_pending_requests(correlation: &Arc<Mutex<CorrelationMap>>) {
        let pending: Vec<_> = correlation.lock().drain().collect();
        let count = pending.len();

        for (_, tx) in pending {
            let _ = tx.send(Err(Error::transport("Channel shut down")));
        }

        if count > 0 {
            debug!(count, "Failed pending requests on shutdown");
        }
    }
}

impl Default for LoopbackChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Channel for LoopbackChannel {
    async fn send(&self, source: WindowId, target: WindowId, message: Message) -> Result<Reply> {
        self.send_envelope(Envelope::new(source, target, message))
            .await
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::props::PropMap;

    fn ack_handler(count: Arc<AtomicUsize>) -> EndpointHandler {
        endpoint(move |envelope: Envelope| {
            let count = Arc::clone(&count);
            async move {
                count.fetch_add(1, Ordering::SeqCst);
                match envelope.message {
                    Message::Init => Ok(Reply::Init {
                        context: crate::component::RenderContext::Iframe,
                        props: PropMap::new().with("from", envelope.source.as_u64() as i64),
                    }),
                    _ => Ok(Reply::Ack),
                }
            }
        })
    }

    #[test]
    fn test_constants() {
        assert_eq!(DEFAULT_REQUEST_TIMEOUT.as_secs(), 30);
        assert_eq!(MAX_PENDING_REQUESTS, 100);
    }

    #[tokio::test]
    async fn test_routes_to_target_and_correlates_reply() {
        let channel = LoopbackChannel::new();
        let count = Arc::new(AtomicUsize::new(0));
        let source = WindowId::next();
        let target = WindowId::next();
        channel.register(target, ack_handler(Arc::clone(&count)));

        let reply = channel.send(source, target, Message::Init).await.unwrap();
        let (_, props) = reply.into_init().unwrap();
        assert_eq!(
            props.get("from").and_then(|v| v.as_i64()),
            Some(source.as_u64() as i64)
        );

        assert!(channel.send(source, target, Message::Close).await.unwrap().is_ack());
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert_eq!(channel.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_same_pair_is_handled_in_send_order() {
        let channel = LoopbackChannel::new();
        let source = WindowId::next();
        let target = WindowId::next();
        let order = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&order);
        channel.register(
            target,
            endpoint(move |envelope: Envelope| {
                let sink = Arc::clone(&sink);
                async move {
                    if matches!(envelope.message, Message::Resize { .. }) {
                        tokio::time::sleep(Duration::from_millis(30)).await;
                    }
                    sink.lock().push(envelope.message.kind());
                    Ok(Reply::Ack)
                }
            }),
        );

        let (first, second) = tokio::join!(
            channel.send(source, target, Message::Resize { width: 1, height: 1 }),
            channel.send(source, target, Message::Close),
        );

        assert!(first.unwrap().is_ack());
        assert!(second.unwrap().is_ack());
        assert_eq!(
            *order.lock(),
            vec![
                crate::protocol::MessageKind::Resize,
                crate::protocol::MessageKind::Close
            ]
        );
    }

    #[tokio::test]
    async fn test_unknown_target_is_transport_error() {
        let channel = LoopbackChannel::new();
        let err = channel
            .send(WindowId::next(), WindowId::next(), Message::Close)
            .await
            .unwrap_err();
        assert!(err.is_transport_error());
    }

    #[tokio::test]
    async fn test_handler_error_is_returned() {
        let channel = LoopbackChannel::new();
        let target = WindowId::next();
        channel.register(
            target,
            endpoint(|_| async { Err(Error::protocol("rejected")) }),
        );

        let err = channel
            .send(WindowId::next(), target, Message::Init)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Protocol { .. }));
    }

    #[tokio::test]
    async fn test_request_timeout_clears_correlation() {
        let channel = LoopbackChannel::with_timeout(Duration::from_millis(20));
        let target = WindowId::next();
        channel.register(
            target,
            endpoint(|_| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(Reply::Ack)
            }),
        );

        let err = channel
            .send(WindowId::next(), target, Message::Close)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::RequestTimeout { timeout_ms: 20, .. }));

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(channel.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_unregister_removes_endpoint() {
        let channel = LoopbackChannel::new();
        let target = WindowId::next();
        channel.register(target, ack_handler(Arc::new(AtomicUsize::new(0))));
        channel.unregister(target);

        assert!(
            channel
                .send(WindowId::next(), target, Message::Close)
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_shutdown_fails_pending() {
        let channel = LoopbackChannel::new();
        let target = WindowId::next();
        channel.register(
            target,
            endpoint(|_| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(Reply::Ack)
            }),
        );

        let sender = channel.clone();
        let pending =
            tokio::spawn(async move { sender.send(WindowId::next(), target, Message::Close).await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        channel.shutdown();

        let result = pending.await.unwrap();
        assert!(result.unwrap_err().is_transport_error());
    }
}
