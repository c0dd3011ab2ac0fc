//! Child window names.
//!
//! Every child window is opened under a name that identifies it:
//!
//! ```text
//! __widget__<tag>__<base64url(JSON payload)>__
//! ```
//!
//! The payload carries the instance id, tag, render context and the parent
//! link. A relayed render carries the name of the window that asked for it,
//! so the sibling can be found by name through the shared parent.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};

use crate::component::RenderContext;
use crate::error::{Error, Result};
use crate::identifiers::InstanceId;

// ============================================================================
// Constants
// ============================================================================

const PREFIX: &str = "__widget__";
const SEPARATOR: &str = "__";

// ============================================================================
// ParentLink
// ============================================================================

/// How the child reaches its parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ParentLink {
    /// Opened directly by the parent.
    Direct,
    /// Opened on behalf of another window.
    Relay {
        /// Window name of the window that requested the render.
        origin: String,
    },
}

// ============================================================================
// ChildWindowName
// ============================================================================

/// Decoded child window name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildWindowName {
    /// Instance that owns the window.
    pub id: InstanceId,
    /// Component tag.
    pub tag: String,
    /// Render context.
    pub context: RenderContext,
    /// Parent link.
    pub parent: ParentLink,
}

impl ChildWindowName {
    /// Creates a name for a window opened directly by its parent.
    #[must_use]
    pub fn direct(id: InstanceId, tag: impl Into<String>, context: RenderContext) -> Self {
        Self {
            id,
            tag: tag.into(),
            context,
            parent: ParentLink::Direct,
        }
    }

    /// Creates a name for a window rendered on behalf of `origin`.
    #[must_use]
    pub fn relay(
        id: InstanceId,
        tag: impl Into<String>,
        context: RenderContext,
        origin: impl Into<String>,
    ) -> Self {
        Self {
            id,
            tag: tag.into(),
            context,
            parent: ParentLink::Relay {
                origin: origin.into(),
            },
        }
    }

    /// Returns `true` if the window was rendered on behalf of another one.
    #[inline]
    #[must_use]
    pub fn is_relay(&self) -> bool {
        matches!(self.parent, ParentLink::Relay { .. })
    }

    /// Encodes the window name.
    ///
    /// # Errors
    ///
    /// [`Error::Json`] if the payload fails to serialize.
    pub fn encode(&self) -> Result<String> {
        let payload = serde_json::to_vec(self)?;
        Ok(format!(
            "{PREFIX}{}{SEPARATOR}{}{SEPARATOR}",
            self.tag,
            URL_SAFE_NO_PAD.encode(payload)
        ))
    }

    /// Decodes a window name.
    ///
    /// # Errors
    ///
    /// [`Error::Protocol`] if the name is not a child window name or its
    /// payload is malformed.
    pub fn decode(name: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::protocol(format!("Invalid window name: {reason}"));

        let body = name
            .strip_prefix(PREFIX)
            .and_then(|rest| rest.strip_suffix(SEPARATOR))
            .ok_or_else(|| invalid("missing markers"))?;

        // Tags never contain underscores, so the first separator ends the tag.
        let (tag, encoded) = body
            .split_once(SEPARATOR)
            .ok_or_else(|| invalid("missing payload"))?;

        let bytes = URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|e| invalid(&e.to_string()))?;
        let decoded: Self =
            serde_json::from_slice(&bytes).map_err(|e| invalid(&e.to_string()))?;

        if decoded.tag != tag {
            return Err(invalid("tag mismatch"));
        }

        Ok(decoded)
    }

    /// Returns `true` if `name` looks like a child window name.
    #[inline]
    #[must_use]
    pub fn is_child_name(name: &str) -> bool {
        name.starts_with(PREFIX) && name.ends_with(SEPARATOR) && name.len() > PREFIX.len()
    }
}

impl fmt::Display for ChildWindowName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.tag, self.context, self.id)
    }
}

// ============================================================================
// Tests
// ============================================================================
