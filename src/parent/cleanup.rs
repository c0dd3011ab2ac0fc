//! Ordered teardown actions.
//!
//! Actions run last-registered-first, exactly once. An action registered
//! after cleanup already ran is executed immediately.

use parking_lot::Mutex;
use tracing::trace;

/// Teardown action.
pub type CleanupAction = Box<dyn FnOnce() + Send>;

#[derive(Default)]
struct CleanupState {
    actions: Vec<(&'static str, CleanupAction)>,
    cleaned: bool,
}

/// Registry of teardown actions for one controller.
#[derive(Default)]
pub struct CleanupRegistry {
    state: Mutex<CleanupState>,
}

impl CleanupRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an action, or runs it now if cleanup already happened.
    pub fn register(&self, name: &'static str, action: impl FnOnce() + Send + 'static) {
        {
            let mut state = self.state.lock();
            if !state.cleaned {
                state.actions.push((name, Box::new(action)));
                return;
            }
        }

        trace!(action = name, "Cleanup already ran, running action now");
        action();
    }

    /// Runs every registered action, newest first.
    ///
    /// Returns the number of actions run; `0` on every call after the first.
    pub fn run_all(&self) -> usize {
        let actions = {
            let mut state = self.state.lock();
            if state.cleaned {
                return 0;
            }
            state.cleaned = true;
            std::mem::take(&mut state.actions)
        };

        let count = actions.len();
        for (name, action) in actions.into_iter().rev() {
            trace!(action = name, "Running cleanup");
            action();
        }
        count
    }

    /// Returns `true` once [`run_all`](Self::run_all) was called.
    #[must_use]
    pub fn is_cleaned(&self) -> bool {
        self.state.lock().cleaned
    }

    /// Returns the number of pending actions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().actions.len()
    }

    /// Returns `true` if no action is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for CleanupRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("CleanupRegistry")
            .field("pending", &state.actions.len())
            .field("cleaned", &state.cleaned)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    #[test]
    fn test_runs_lifo_once() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let cleanup = CleanupRegistry::new();
        for i in 0..3 {
            let order = Arc::clone(&order);
            cleanup.register("push", move || order.lock().push(i));
        }

        assert_eq!(cleanup.run_all(), 3);
        assert_eq!(cleanup.run_all(), 0);
        assert_eq!(*order.lock(), vec![2, 1, 0]);
        assert!(cleanup.is_cleaned());
    }

    #[test]
    fn test_late_registration_runs_immediately() {
        let cleanup = CleanupRegistry::new();
        cleanup.run_all();

        let ran = Arc::new(Mutex::new(false));
        let flag = Arc::clone(&ran);
        cleanup.register("late", move || *flag.lock() = true);

        assert!(*ran.lock());
        assert!(cleanup.is_empty());
    }
}
