//! Type-safe identifier wrappers.
//!
//! Newtype wrappers prevent mixing incompatible IDs at compile time.
//!
//! | Type | Backing | Purpose |
//! |------|---------|---------|
//! | [`InstanceId`] | UUID v4 | One rendered component instance |
//! | [`RequestId`] | UUID v4 | Request/reply correlation |
//! | [`WindowId`] | `u64` | Window, popup or frame handle issued by the host |
//! | [`ListenerId`] | `u64` | Host watcher registration (close, unload, click) |
//! | [`OverlayId`] | `u64` | Overlay element injected by the host |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// InstanceId
// ============================================================================

/// Unique identifier of a component instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(Uuid);

impl InstanceId {
    /// Generates a fresh random instance ID.
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    #[inline]
    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// RequestId
// ============================================================================

/// Unique identifier for request/reply correlation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Generates a fresh random request ID.
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Counter-backed IDs
// ============================================================================

macro_rules! counter_id {
    ($(#[$meta:meta])* $name:ident, $counter:ident) => {
        static $counter: AtomicU64 = AtomicU64::new(1);

        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Allocates the next process-unique ID.
            #[inline]
            #[must_use]
            pub fn next() -> Self {
                Self($counter.fetch_add(1, Ordering::Relaxed))
            }

            /// Wraps a raw value issued elsewhere.
            #[inline]
            #[must_use]
            pub const fn from_raw(value: u64) -> Self {
                Self(value)
            }

            /// Returns the raw value.
            #[inline]
            #[must_use]
            pub const fn as_u64(&self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

counter_id!(
    /// Handle to a window, popup or frame issued by the host.
    WindowId,
    NEXT_WINDOW_ID
);

counter_id!(
    /// Handle to a watcher registered with the host.
    ListenerId,
    NEXT_LISTENER_ID
);

counter_id!(
    /// Handle to an overlay injected by the host.
    OverlayId,
    NEXT_OVERLAY_ID
);

// ============================================================================
// Tests
// ============================================================================
