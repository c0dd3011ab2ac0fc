//! Single-settlement handshake gate.
//!
//! The gate starts pending and is settled exactly once: ready on the child's
//! INIT, or failed when the controller times out, errors or is destroyed.
//! Later settlements are ignored.

// ============================================================================
// Imports
// ============================================================================

use tokio::sync::watch;

use crate::error::{Error, Result};

// ============================================================================
// GateState
// ============================================================================

/// State of an [`InitGate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateState {
    /// Waiting for the handshake.
    Pending,
    /// Handshake completed.
    Ready,
    /// Destroyed before the handshake.
    Destroyed,
    /// No handshake within the timeout.
    TimedOut {
        /// Timeout in milliseconds.
        timeout_ms: u64,
    },
    /// Child reported an error before the handshake.
    Failed {
        /// Error description.
        message: String,
    },
}

impl GateState {
    /// Converts a settled state into the waiter's result.
    fn into_result(self, tag: &str) -> Result<()> {
        match self {
            Self::Ready => Ok(()),
            Self::Pending | Self::Destroyed => Err(Error::destroyed(tag)),
            Self::TimedOut { timeout_ms } => Err(Error::timeout(tag, timeout_ms)),
            Self::Failed { message } => Err(Error::remote(tag, message)),
        }
    }
}

// ============================================================================
// InitGate
// ============================================================================

/// Handshake gate shared by everything that must wait for the child.
#[derive(Debug)]
pub struct InitGate {
    tx: watch::Sender<GateState>,
}

impl InitGate {
    /// Creates a pending gate.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = watch::channel(GateState::Pending);
        Self { tx }
    }

    /// Settles the gate. Returns `false` if it was already settled.
    pub fn settle(&self, state: GateState) -> bool {
        if state == GateState::Pending {
            return false;
        }

        self.tx.send_if_modified(|current| {
            if *current == GateState::Pending {
                *current = state;
                true
            } else {
                false
            }
        })
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> GateState {
        self.tx.borrow().clone()
    }

    /// Returns `true` once settled.
    #[inline]
    #[must_use]
    pub fn is_settled(&self) -> bool {
        *self.tx.borrow() != GateState::Pending
    }

    /// Returns `true` if the handshake completed.
    #[inline]
    #[must_use]
    pub fn is_ready(&self) -> bool {
        *self.tx.borrow() == GateState::Ready
    }

    /// Waits until settled.
    ///
    /// # Errors
    ///
    /// - [`Error::Destroyed`] if destroyed before the handshake
    /// - [`Error::Timeout`] if the handshake timed out
    /// - [`Error::Remote`] if the child reported an error
    pub async fn wait(&self, tag: &str) -> Result<()> {
        let mut rx = self.tx.subscribe();
        let state = rx
            .wait_for(|state| *state != GateState::Pending)
            .await
            .map(|state| state.clone())
            .map_err(|_| Error::destroyed(tag))?;
        state.into_result(tag)
    }
}

impl Default for InitGate {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_settles_once() {
        let gate = InitGate::new();
        assert!(!gate.is_settled());
        assert!(gate.settle(GateState::Ready));
        assert!(!gate.settle(GateState::Destroyed));
        assert_eq!(gate.state(), GateState::Ready);
        assert!(!gate.settle(GateState::Pending));
    }

    #[tokio::test]
    async fn test_waiters_wake_on_settle() {
        let gate = Arc::new(InitGate::new());
        let waiter = {
            let gate = Arc::clone(&gate);
            tokio::spawn(async move { gate.wait("gate-widget").await })
        };

        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(!waiter.is_finished());
        gate.settle(GateState::Ready);

        waiter.await.unwrap().unwrap();
    }

    #[test]
    fn test_wait_is_pending_until_settled() {
        use tokio_test::{assert_pending, assert_ready_ok, task};

        let gate = InitGate::new();
        let mut wait = task::spawn(gate.wait("gate-widget"));
        assert_pending!(wait.poll());

        gate.settle(GateState::Ready);
        assert!(wait.is_woken());
        assert_ready_ok!(wait.poll());
    }

    #[tokio::test]
    async fn test_failure_states_map_to_errors() {
        let gate = InitGate::new();
        gate.settle(GateState::TimedOut { timeout_ms: 100 });
        let err = gate.wait("gate-widget").await.unwrap_err();
        assert!(err.is_timeout());

        let gate = InitGate::new();
        gate.settle(GateState::Destroyed);
        assert!(matches!(
            gate.wait("gate-widget").await,
            Err(Error::Destroyed { .. })
        ));

        let gate = InitGate::new();
        gate.settle(GateState::Failed {
            message: "boom".into(),
        });
        assert!(matches!(
            gate.wait("gate-widget").await,
            Err(Error::Remote { .. })
        ));
    }
}
