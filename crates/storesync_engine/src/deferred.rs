//! Single-resolution gate for work that must wait for the handshake.

use parking_lot::Mutex;
use std::fmt;
use tokio::sync::watch;

/// A continuation waiting on a [`Deferred`].
pub type Continuation = Box<dyn FnOnce() + Send>;

/// A gate that opens exactly once.
///
/// Continuations registered before resolution run in registration order
/// when the gate opens. Continuations registered afterwards run
/// immediately. Resolving twice does nothing.
pub struct Deferred {
    inner: Mutex<Pending>,
    resolved: watch::Sender<bool>,
}

struct Pending {
    resolved: bool,
    continuations: Vec<Continuation>,
}

impl Deferred {
    /// Creates an unresolved gate.
    pub fn new() -> Self {
        let (resolved, _) = watch::channel(false);
        Self {
            inner: Mutex::new(Pending {
                resolved: false,
                continuations: Vec::new(),
            }),
            resolved,
        }
    }

    /// Returns true once the gate has opened.
    pub fn is_resolved(&self) -> bool {
        self.inner.lock().resolved
    }

    /// Opens the gate and runs waiting continuations.
    ///
    /// Returns false if the gate was already open.
    pub fn resolve(&self) -> bool {
        let continuations = {
            let mut inner = self.inner.lock();
            if inner.resolved {
                return false;
            }
            inner.resolved = true;
            std::mem::take(&mut inner.continuations)
        };
        self.resolved.send_replace(true);
        for continuation in continuations {
            continuation();
        }
        true
    }

    /// Runs `continuation` once the gate is open.
    pub fn then(&self, continuation: impl FnOnce() + Send + 'static) {
        let mut inner = self.inner.lock();
        if inner.resolved {
            drop(inner);
            continuation();
        } else {
            inner.continuations.push(Box::new(continuation));
        }
    }

    /// Returns the number of continuations waiting.
    pub fn waiting(&self) -> usize {
        self.inner.lock().continuations.len()
    }

    /// Waits until the gate is open.
    pub async fn wait(&self) {
        let mut receiver = self.resolved.subscribe();
        // The sender lives as long as `self`, so the channel cannot close.
        let _ = receiver.wait_for(|resolved| *resolved).await;
    }
}

impl Default for Deferred {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Deferred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("Deferred")
            .field("resolved", &inner.resolved)
            .field("waiting", &inner.continuations.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn continuations_wait_for_resolution() {
        let deferred = Deferred::new();
        let runs = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&runs);
        deferred.then(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        assert_eq!(deferred.waiting(), 1);

        assert!(deferred.resolve());
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(deferred.is_resolved());
    }

    #[test]
    fn resolves_only_once() {
        let deferred = Deferred::new();
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        deferred.then(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(deferred.resolve());
        assert!(!deferred.resolve());
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn late_continuations_run_immediately() {
        let deferred = Deferred::new();
        deferred.resolve();
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        deferred.then(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(deferred.waiting(), 0);
    }

    #[test]
    fn continuation_order_is_registration_order() {
        let deferred = Deferred::new();
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
        for i in 0..3 {
            let order = Arc::clone(&order);
            deferred.then(move || order.lock().push(i));
        }
        deferred.resolve();
        assert_eq!(*order.lock(), vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn wait_returns_after_resolve() {
        let deferred = Arc::new(Deferred::new());
        let waiter = {
            let deferred = Arc::clone(&deferred);
            tokio::spawn(async move { deferred.wait().await })
        };
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());
        deferred.resolve();
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn wait_on_resolved_gate_is_immediate() {
        let deferred = Deferred::new();
        deferred.resolve();
        deferred.wait().await;
    }
}
