//! Cancel observers
//!
//! Components embedding a dial-plan execution can subscribe to be told that the
//! call ended before it was answered. Observers are fixed at construction and
//! are notified at most once per call.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::error;

use crate::types::CancelCause;

/// Callback invoked with the cancel cause
pub type CancelObserver = Box<dyn Fn(CancelCause) + Send + Sync>;

/// Observers notified exactly once when a call is cancelled or times out
#[derive(Default)]
pub struct CancelObservers {
    observers: Vec<CancelObserver>,
    notified: AtomicBool,
}

impl CancelObservers {
    pub fn new(observers: Vec<CancelObserver>) -> Self {
        Self {
            observers,
            notified: AtomicBool::new(false),
        }
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Notify every observer with `cause`.
    ///
    /// Only the first call has any effect. Returns the number of observers
    /// that completed without panicking.
    pub fn notify(&self, cause: CancelCause) -> usize {
        if self.notified.swap(true, Ordering::AcqRel) {
            return 0;
        }

        let mut delivered = 0;
        for (index, observer) in self.observers.iter().enumerate() {
            match catch_unwind(AssertUnwindSafe(|| observer(cause))) {
                Ok(()) => delivered += 1,
                Err(_) => error!(observer = index, %cause, "Cancel observer panicked"),
            }
        }
        delivered
    }

    pub fn was_notified(&self) -> bool {
        self.notified.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for CancelObservers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelObservers")
            .field("observers", &self.observers.len())
            .field("notified", &self.was_notified())
            .finish()
    }
}
