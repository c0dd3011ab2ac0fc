//! Controller lifecycle states.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle of a parent controller.
///
/// ```text
/// Idle → Opening → Rendered → WaitingForInit → Ready → Closing → Destroyed
/// ```
///
/// Timeouts and remote errors go straight to `Closing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// Created, not rendered.
    Idle,
    /// Opening the child window.
    Opening,
    /// Window open, not yet listening.
    Rendered,
    /// Listening, waiting for the child's INIT.
    WaitingForInit,
    /// Handshake complete.
    Ready,
    /// Tearing down.
    Closing,
    /// Torn down.
    Destroyed,
}

impl LifecycleState {
    /// Returns the state name.
    #[inline]
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Opening => "opening",
            Self::Rendered => "rendered",
            Self::WaitingForInit => "waiting_for_init",
            Self::Ready => "ready",
            Self::Closing => "closing",
            Self::Destroyed => "destroyed",
        }
    }

    /// Returns `true` once teardown has started.
    #[inline]
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Closing | Self::Destroyed)
    }

    /// Returns `true` while a child window may be open.
    #[inline]
    #[must_use]
    pub const fn is_live(&self) -> bool {
        matches!(
            self,
            Self::Opening | Self::Rendered | Self::WaitingForInit | Self::Ready
        )
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
