//! Terminal-outcome guard
//!
//! A call may be answered by dial-plan logic at the same moment the caller
//! hangs up or the peer times out. Every terminal transition goes through
//! [`TerminalGuard::try_terminate`]; exactly one caller ever gets `true`.

use std::sync::atomic::{AtomicBool, Ordering};

/// Single-writer-wins gate over the terminal state of one call
#[derive(Debug, Default)]
pub struct TerminalGuard {
    terminated: AtomicBool,
}

impl TerminalGuard {
    pub fn new() -> Self {
        Self {
            terminated: AtomicBool::new(false),
        }
    }

    /// Claim the terminal transition.
    ///
    /// Returns `true` only for the first caller. Later callers must treat the
    /// action as a no-op.
    pub fn try_terminate(&self) -> bool {
        self.terminated
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Whether a terminal transition has been claimed. Never reverts.
    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::Acquire)
    }
}
