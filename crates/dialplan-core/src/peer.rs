//! Signaling peer contract
//!
//! The signaling peer is the caller's side of the call at the protocol level.
//! It is owned by the transaction layer; this crate only drives it and reacts
//! to the signals it raises.

use std::sync::{RwLock, Weak};

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{AnswerRequest, CallResponse, SipDialogue};

/// Server side user agent for one inbound call
#[async_trait]
pub trait SignalingPeer: Send + Sync {
    /// Account identity owning the call
    fn owner(&self) -> &str;

    /// Whether the peer links two legs itself
    fn is_b2b(&self) -> bool;

    /// Send a provisional response
    async fn progress(&self, response: &CallResponse) -> Result<()>;

    /// Reject the call with a final non-2xx response
    async fn reject(&self, response: &CallResponse) -> Result<()>;

    /// Answer the call, returning the local dialogue when one was established
    async fn answer(&self, request: &AnswerRequest) -> Result<Option<SipDialogue>>;

    /// Subscribe to the peer's signals. Held weakly by the peer.
    fn register_signal_handler(&self, handler: Weak<dyn PeerSignalHandler>);
}

/// Signals raised by the signaling peer
///
/// Handlers are invoked on the peer's own callback thread and must not block.
pub trait PeerSignalHandler: Send + Sync {
    /// The caller sent a CANCEL
    fn on_cancelled(&self);

    /// The peer's no-ring timer expired before an answer
    fn on_no_ring_timeout(&self);

    /// The server transaction has been torn down
    fn on_transaction_complete(&self);

    /// Diagnostic message from the transaction layer
    fn on_trace_message(&self, message: &str);
}

/// Registration slot for peers that raise signals to a single handler
#[derive(Default)]
pub struct PeerSignalSlot {
    handler: RwLock<Option<Weak<dyn PeerSignalHandler>>>,
}

impl PeerSignalSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, handler: Weak<dyn PeerSignalHandler>) {
        if let Ok(mut slot) = self.handler.write() {
            *slot = Some(handler);
        }
    }

    fn with_handler(&self, f: impl FnOnce(&dyn PeerSignalHandler)) {
        let handler = match self.handler.read() {
            Ok(slot) => slot.as_ref().and_then(Weak::upgrade),
            Err(_) => None,
        };
        match handler {
            Some(handler) => f(handler.as_ref()),
            None => tracing::debug!("No live signal handler registered, signal dropped"),
        }
    }

    pub fn raise_cancelled(&self) {
        self.with_handler(|h| h.on_cancelled());
    }

    pub fn raise_no_ring_timeout(&self) {
        self.with_handler(|h| h.on_no_ring_timeout());
    }

    pub fn raise_transaction_complete(&self) {
        self.with_handler(|h| h.on_transaction_complete());
    }

    pub fn raise_trace_message(&self, message: &str) {
        self.with_handler(|h| h.on_trace_message(message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct Counting {
        cancelled: AtomicUsize,
        traces: AtomicUsize,
    }

    impl PeerSignalHandler for Counting {
        fn on_cancelled(&self) {
            self.cancelled.fetch_add(1, Ordering::SeqCst);
        }
        fn on_no_ring_timeout(&self) {}
        fn on_transaction_complete(&self) {}
        fn on_trace_message(&self, _message: &str) {
            self.traces.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_slot_dispatches_to_live_handler() {
        let slot = PeerSignalSlot::new();
        let handler = Arc::new(Counting::default());
        let dyn_handler: Arc<dyn PeerSignalHandler> = handler.clone();
        slot.register(Arc::downgrade(&dyn_handler));

        slot.raise_cancelled();
        slot.raise_trace_message("INVITE received");
        assert_eq!(handler.cancelled.load(Ordering::SeqCst), 1);
        assert_eq!(handler.traces.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_slot_drops_signal_after_handler_gone() {
        let slot = PeerSignalSlot::new();
        let handler: Arc<dyn PeerSignalHandler> = Arc::new(Counting::default());
        slot.register(Arc::downgrade(&handler));
        drop(handler);

        // Must not panic
        slot.raise_cancelled();
        slot.raise_transaction_complete();
    }
}
