//! Parent/child message types.
//!
//! Messages travel in memory through a [`Channel`](crate::transport::Channel):
//! payloads may carry callable props, so the channel, not this module, is
//! responsible for how they cross a real window boundary.
//!
//! # Kinds
//!
//! | Kind | Direction | Payload | Reply |
//! |------|-----------|---------|-------|
//! | `init` | child → parent | none | [`Reply::Init`] |
//! | `props` | parent → child | full prop map | [`Reply::Ack`] |
//! | `resize` | child → parent, parent → popup | width, height | [`Reply::Ack`] |
//! | `close` | both | none | [`Reply::Ack`] |
//! | `render` | child → parent | [`RenderRequest`] | [`Reply::Ack`] |
//! | `error` | child → parent | message | [`Reply::Ack`] |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::component::RenderContext;
use crate::error::{Error, Result};
use crate::host::ElementRef;
use crate::identifiers::{RequestId, WindowId};
use crate::props::{PropFn, PropMap};

// ============================================================================
// MessageKind
// ============================================================================

/// Message kind, with its wire name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    /// Child handshake.
    Init,
    /// Prop update.
    Props,
    /// Resize request.
    Resize,
    /// Close request.
    Close,
    /// Sibling render request.
    Render,
    /// Child-side failure.
    Error,
}

impl MessageKind {
    /// Returns the wire name.
    #[inline]
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Props => "props",
            Self::Resize => "resize",
            Self::Close => "close",
            Self::Render => "render",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// RenderRequest
// ============================================================================

/// Request from a child to render a sibling component through the parent.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    /// Tag of the component to render.
    pub tag: String,
    /// Context to render in.
    pub context: RenderContext,
    /// Mount element in the parent page.
    pub element: Option<ElementRef>,
    /// Props for the sibling.
    pub props: PropMap,
    /// Name the sibling window must be opened under.
    pub window_name: String,
    /// Submits the child's form into the opened window.
    ///
    /// When set, the parent opens the window without loading a URL.
    pub hijack_submit: Option<PropFn>,
}

// ============================================================================
// Message
// ============================================================================

/// Message exchanged between parent and child.
#[derive(Debug, Clone)]
pub enum Message {
    /// Child is loaded and asks for its props.
    Init,
    /// Full, latest prop map for the child.
    Props {
        /// Props visible to the child.
        props: PropMap,
    },
    /// Resize the child window.
    Resize {
        /// New width in pixels.
        width: u32,
        /// New height in pixels.
        height: u32,
    },
    /// Close the child.
    Close,
    /// Render a sibling through the parent.
    Render(Box<RenderRequest>),
    /// Child-side failure.
    Error {
        /// Error description.
        message: String,
    },
}

impl Message {
    /// Returns the message kind.
    #[inline]
    #[must_use]
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::Init => MessageKind::Init,
            Self::Props { .. } => MessageKind::Props,
            Self::Resize { .. } => MessageKind::Resize,
            Self::Close => MessageKind::Close,
            Self::Render(_) => MessageKind::Render,
            Self::Error { .. } => MessageKind::Error,
        }
    }
}

// ============================================================================
// Reply
// ============================================================================

/// Reply to a [`Message`].
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Handled, nothing to return.
    Ack,
    /// Handshake result.
    Init {
        /// Context the child was rendered in.
        context: RenderContext,
        /// Props visible to the child.
        props: PropMap,
    },
}

impl Reply {
    /// Extracts the handshake result.
    ///
    /// # Errors
    ///
    /// [`Error::Protocol`] if this is not an INIT reply.
    pub fn into_init(self) -> Result<(RenderContext, PropMap)> {
        match self {
            Self::Init { context, props } => Ok((context, props)),
            Self::Ack => Err(Error::protocol("Expected INIT reply, got ack")),
        }
    }

    /// Returns `true` for a plain acknowledgement.
    #[inline]
    #[must_use]
    pub fn is_ack(&self) -> bool {
        matches!(self, Self::Ack)
    }
}

// ============================================================================
// Envelope
// ============================================================================

/// Message addressed between two windows, with its correlation id.
#[derive(Debug, Clone)]
pub struct Envelope {
    /// Correlation id.
    pub id: RequestId,
    /// Sending window.
    pub source: WindowId,
    /// Receiving window.
    pub target: WindowId,
    /// Message.
    pub message: Message,
}

impl Envelope {
    /// Creates an envelope with a fresh correlation id.
    #[inline]
    #[must_use]
    pub fn new(source: WindowId, target: WindowId, message: Message) -> Self {
        Self {
            id: RequestId::generate(),
            source,
            target,
            message,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_wire_names() {
        assert_eq!(Message::Init.kind().as_str(), "init");
        assert_eq!(
            Message::Resize {
                width: 1,
                height: 2
            }
            .kind(),
            MessageKind::Resize
        );
        assert_eq!(
            serde_json::to_string(&MessageKind::Props).unwrap(),
            "\"props\""
        );
        let parsed: MessageKind = serde_json::from_str("\"render\"").unwrap();
        assert_eq!(parsed, MessageKind::Render);
    }

    #[test]
    fn test_reply_into_init() {
        let reply = Reply::Init {
            context: RenderContext::Popup,
            props: PropMap::new().with("a", 1),
        };
        let (context, props) = reply.into_init().unwrap();
        assert_eq!(context, RenderContext::Popup);
        assert_eq!(props.get("a").and_then(|v| v.as_i64()), Some(1));

        assert!(Reply::Ack.into_init().is_err());
    }

    #[test]
    fn test_envelope_ids_are_unique() {
        let a = Envelope::new(WindowId::from_raw(1), WindowId::from_raw(2), Message::Close);
        let b = Envelope::new(WindowId::from_raw(1), WindowId::from_raw(2), Message::Close);
        assert_ne!(a.id, b.id);
    }
}
