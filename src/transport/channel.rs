//! Message channel between windows.

use async_trait::async_trait;

use crate::error::Result;
use crate::identifiers::WindowId;
use crate::protocol::{Message, Reply};

/// Delivers messages to other windows and returns their replies.
///
/// Implementations own delivery across the window boundary: addressing,
/// correlation, serialization of callable props and request timeouts.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Sends `message` from `source` to `target` and waits for the reply.
    ///
    /// # Errors
    ///
    /// - [`Error::Transport`](crate::Error::Transport) if the target cannot be reached
    /// - [`Error::RequestTimeout`](crate::Error::RequestTimeout) if no reply arrives in time
    /// - any error returned by the receiving side's handler
    async fn send(&self, source: WindowId, target: WindowId, message: Message) -> Result<Reply>;
}
