//! Execution-context checks for blocking calls.
//!
//! Every [`RpcRequester`](crate::RpcRequester) call blocks the calling thread
//! for a full network round trip. Threads that must stay responsive (UI loops,
//! async executors, event pumps) mark themselves with
//! [`restrict_current_thread`], or callers pass [`CallContext::Restricted`]
//! explicitly; a blocking call from such a context is a programmer error.

use std::{cell::Cell, marker::PhantomData};

thread_local! {
    static RESTRICTED_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Capability of the calling context with regard to blocking I/O.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallContext {
    /// Blocking network I/O is allowed.
    Blocking,
    /// Latency-sensitive context; blocking calls abort.
    Restricted,
}

impl CallContext {
    /// Context of the current thread, as marked by [`restrict_current_thread`].
    pub fn current() -> Self {
        if RESTRICTED_DEPTH.with(|depth| depth.get()) > 0 {
            CallContext::Restricted
        } else {
            CallContext::Blocking
        }
    }

    pub fn allows_blocking(self) -> bool {
        self == CallContext::Blocking
    }
}

/// Marks the current thread as restricted until the guard is dropped.
///
/// Guards nest: the thread stays restricted until the outermost guard is gone.
#[must_use = "the thread is only restricted while the guard is alive"]
pub fn restrict_current_thread() -> RestrictedGuard {
    RESTRICTED_DEPTH.with(|depth| depth.set(depth.get() + 1));
    RestrictedGuard {
        _not_send: PhantomData,
    }
}

/// RAII marker returned by [`restrict_current_thread`].
#[derive(Debug)]
pub struct RestrictedGuard {
    // the marker is thread-local, the guard must be dropped on the same thread
    _not_send: PhantomData<*const ()>,
}

impl Drop for RestrictedGuard {
    fn drop(&mut self) {
        RESTRICTED_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}
