//! Per-call execution context
//!
//! State of one inbound call while its dial plan runs. Everything except the
//! terminal flag, the trace buffer and the send-trace toggle is a read-only
//! snapshot taken when the execution starts.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use uuid::Uuid;

use crate::guard::TerminalGuard;
use crate::trace::TraceLog;
use crate::types::{ContextKind, DialPlan, SipProvider};

#[derive(Debug)]
pub struct CallExecutionContext {
    execution_id: String,
    dial_plan: Arc<DialPlan>,
    providers: Arc<[SipProvider]>,
    caller_network_id: Option<String>,
    customer_id: String,
    kind: ContextKind,
    guard: TerminalGuard,
    trace: TraceLog,
    send_trace: AtomicBool,
}

impl CallExecutionContext {
    pub fn new(
        dial_plan: Arc<DialPlan>,
        providers: Arc<[SipProvider]>,
        caller_network_id: Option<String>,
        customer_id: String,
        kind: ContextKind,
    ) -> Self {
        Self {
            execution_id: Uuid::new_v4().to_string(),
            dial_plan,
            providers,
            caller_network_id,
            customer_id,
            kind,
            guard: TerminalGuard::new(),
            trace: TraceLog::new(),
            send_trace: AtomicBool::new(true),
        }
    }

    /// Unique id of this execution, used to correlate log lines
    pub fn execution_id(&self) -> &str {
        &self.execution_id
    }

    pub fn dial_plan(&self) -> &Arc<DialPlan> {
        &self.dial_plan
    }

    pub fn providers(&self) -> &[SipProvider] {
        &self.providers
    }

    /// Local network of the caller, for same-network detection
    pub fn caller_network_id(&self) -> Option<&str> {
        self.caller_network_id.as_deref()
    }

    pub fn customer_id(&self) -> &str {
        &self.customer_id
    }

    pub fn kind(&self) -> ContextKind {
        self.kind
    }

    /// Whether the call has reached a terminal outcome
    pub fn is_answered(&self) -> bool {
        self.guard.is_terminated()
    }

    pub fn guard(&self) -> &TerminalGuard {
        &self.guard
    }

    pub fn trace(&self) -> &TraceLog {
        &self.trace
    }

    pub fn send_trace(&self) -> bool {
        self.send_trace.load(Ordering::Acquire)
    }

    pub fn set_send_trace(&self, send: bool) {
        self.send_trace.store(send, Ordering::Release);
    }
}
