//! Callable props and the function wrapper pipeline.
//!
//! Function props are composed through an explicit ordered pipeline:
//!
//! | Order | Wrapper | Effect |
//! |-------|---------|--------|
//! | 1 | `once` | only the first invocation reaches the inner function |
//! | 2 | `memoize` | the first successful result is returned for every later call |
//! | 3 | `promisify` | the body runs immediately and its outcome is delivered through a future |
//!
//! Each wrapper is applied at most once per callable, which keeps prop
//! normalization idempotent.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use serde_json::Value;

use crate::error::Result;

// ============================================================================
// Types
// ============================================================================

/// Type-erased callable.
type Callable = dyn Fn(Vec<Value>) -> Invocation + Send + Sync;

// ============================================================================
// Invocation
// ============================================================================

/// Outcome of invoking a [`PropFn`].
pub enum Invocation {
    /// Completed synchronously.
    Ready(Result<Value>),
    /// Completes when the future resolves.
    Deferred(BoxFuture<'static, Result<Value>>),
}

impl Invocation {
    /// Waits for the outcome.
    pub async fn resolve(self) -> Result<Value> {
        match self {
            Self::Ready(result) => result,
            Self::Deferred(future) => future.await,
        }
    }

    /// Returns `true` if the outcome is delivered through a future.
    #[inline]
    #[must_use]
    pub fn is_deferred(&self) -> bool {
        matches!(self, Self::Deferred(_))
    }
}

// ============================================================================
// Wrappers
// ============================================================================

/// Wrapper flags, requested by a prop definition or applied to a callable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Wrappers {
    /// Only the first call runs.
    pub once: bool,
    /// First successful result is cached.
    pub memoize: bool,
    /// Outcomes are delivered through a future.
    pub promisify: bool,
}

impl Wrappers {
    /// Returns `true` if no wrapper is requested.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        !self.once && !self.memoize && !self.promisify
    }
}

// ============================================================================
// PropFn
// ============================================================================

/// A callable prop value.
///
/// Cloning is cheap and preserves identity: clones compare equal with
/// [`PropFn::ptr_eq`].
#[derive(Clone)]
pub struct PropFn {
    callable: Arc<Callable>,
    applied: Wrappers,
}

impl fmt::Debug for PropFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropFn")
            .field("applied", &self.applied)
            .finish_non_exhaustive()
    }
}

impl PropFn {
    /// Creates a callable from a synchronous function.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Vec<Value>) -> Result<Value> + Send + Sync + 'static,
    {
        Self::from_callable(Arc::new(move |args: Vec<Value>| Invocation::Ready(f(args))))
    }

    /// Creates a callable from an async function.
    pub fn new_async<F, Fut>(f: F) -> Self
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        Self::from_callable(Arc::new(move |args: Vec<Value>| {
            Invocation::Deferred(Box::pin(f(args)))
        }))
    }

    /// Creates a callable that does nothing and returns null.
    #[must_use]
    pub fn noop() -> Self {
        Self::new(|_| Ok(Value::Null))
    }

    fn from_callable(callable: Arc<Callable>) -> Self {
        Self {
            callable,
            applied: Wrappers::default(),
        }
    }

    /// Invokes the callable.
    pub fn invoke(&self, args: Vec<Value>) -> Invocation {
        (*self.callable)(args)
    }

    /// Invokes the callable and waits for its outcome.
    pub async fn call(&self, args: Vec<Value>) -> Result<Value> {
        self.invoke(args).resolve().await
    }

    /// Returns `true` if both handles refer to the same callable.
    #[inline]
    #[must_use]
    pub fn ptr_eq(&self, other: &PropFn) -> bool {
        Arc::ptr_eq(&self.callable, &other.callable)
    }

    /// Returns the wrappers already applied.
    #[inline]
    #[must_use]
    pub fn applied(&self) -> Wrappers {
        self.applied
    }

    /// Applies the requested wrappers in pipeline order.
    ///
    /// Wrappers already applied are skipped; if nothing is left to apply the
    /// same callable is returned.
    #[must_use]
    pub fn decorate(self, requested: Wrappers) -> Self {
        let mut decorated = self;
        if requested.once && !decorated.applied.once {
            decorated = decorated.wrap_once();
        }
        if requested.memoize && !decorated.applied.memoize {
            decorated = decorated.wrap_memoize();
        }
        if requested.promisify && !decorated.applied.promisify {
            decorated = decorated.wrap_promisify();
        }
        decorated
    }

    fn wrap_once(self) -> Self {
        let inner = self.callable;
        let called = AtomicBool::new(false);
        Self {
            callable: Arc::new(move |args: Vec<Value>| {
                if called.swap(true, Ordering::SeqCst) {
                    return Invocation::Ready(Ok(Value::Null));
                }
                (*inner)(args)
            }),
            applied: Wrappers {
                once: true,
                ..self.applied
            },
        }
    }

    fn wrap_memoize(self) -> Self {
        let inner = self.callable;
        let cache: Arc<Mutex<Option<Value>>> = Arc::new(Mutex::new(None));
        Self {
            callable: Arc::new(move |args: Vec<Value>| {
                if let Some(value) = cache.lock().clone() {
                    return Invocation::Ready(Ok(value));
                }
                match (*inner)(args) {
                    Invocation::Ready(Ok(value)) => {
                        *cache.lock() = Some(value.clone());
                        Invocation::Ready(Ok(value))
                    }
                    Invocation::Ready(Err(e)) => Invocation::Ready(Err(e)),
                    Invocation::Deferred(future) => {
                        let cache = Arc::clone(&cache);
                        Invocation::Deferred(Box::pin(async move {
                            let value = future.await?;
                            *cache.lock() = Some(value.clone());
                            Ok(value)
                        }))
                    }
                }
            }),
            applied: Wrappers {
                memoize: true,
                ..self.applied
            },
        }
    }

    fn wrap_promisify(self) -> Self {
        let inner = self.callable;
        Self {
            callable: Arc::new(move |args: Vec<Value>| {
                // The inner body runs now; only its outcome is delivered later.
                match (*inner)(args) {
                    Invocation::Ready(result) => {
                        Invocation::Deferred(Box::pin(futures_util::future::ready(result)))
                    }
                    deferred @ Invocation::Deferred(_) => deferred,
                }
            }),
            applied: Wrappers {
                promisify: true,
                ..self.applied
            },
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::AtomicUsize;

    use serde_json::json;

    use crate::error::Error;

    fn counting() -> (PropFn, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let f = PropFn::new(move |_| {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(json!(n))
        });
        (f, count)
    }

    #[tokio::test]
    async fn test_once_runs_inner_once() {
        let (f, count) = counting();
        let f = f.decorate(Wrappers {
            once: true,
            ..Default::default()
        });

        assert_eq!(f.call(vec![]).await.expect("call"), json!(1));
        assert_eq!(f.call(vec![]).await.expect("call"), Value::Null);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_memoize_returns_first_result() {
        let (f, count) = counting();
        let f = f.decorate(Wrappers {
            memoize: true,
            ..Default::default()
        });

        assert_eq!(f.call(vec![json!("a")]).await.expect("call"), json!(1));
        assert_eq!(f.call(vec![json!("b")]).await.expect("call"), json!(1));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_memoize_does_not_cache_errors() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let f = PropFn::new(move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(Error::protocol("first call fails"))
            } else {
                Ok(json!("ok"))
            }
        })
        .decorate(Wrappers {
            memoize: true,
            ..Default::default()
        });

        assert!(f.call(vec![]).await.is_err());
        assert_eq!(f.call(vec![]).await.expect("call"), json!("ok"));
    }

    #[tokio::test]
    async fn test_promisify_runs_body_immediately() {
        let (f, count) = counting();
        let f = f.decorate(Wrappers {
            promisify: true,
            ..Default::default()
        });

        let invocation = f.invoke(vec![]);
        assert!(invocation.is_deferred());
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(invocation.resolve().await.expect("call"), json!(1));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_promisify_without_runtime() {
        let (f, count) = counting();
        let f = f.decorate(Wrappers {
            once: true,
            memoize: true,
            promisify: true,
        });

        drop(f.invoke(vec![]));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_decorate_is_idempotent() {
        let wrappers = Wrappers {
            once: true,
            memoize: true,
            promisify: true,
        };
        let once = PropFn::noop().decorate(wrappers);
        let twice = once.clone().decorate(wrappers);
        assert!(once.ptr_eq(&twice));
        assert_eq!(twice.applied(), wrappers);
    }

    #[test]
    fn test_decorate_nothing_keeps_identity() {
        let f = PropFn::noop();
        assert!(f.clone().decorate(Wrappers::default()).ptr_eq(&f));
    }

    #[tokio::test]
    async fn test_async_callable() {
        let f = PropFn::new_async(|args| async move { Ok(json!(args.len())) });
        assert_eq!(f.call(vec![json!(1), json!(2)]).await.expect("call"), json!(2));
    }
}
