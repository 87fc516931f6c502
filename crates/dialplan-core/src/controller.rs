//! Call-outcome controller
//!
//! Drives a single inbound call from the moment its dial plan starts executing
//! until it reaches exactly one terminal outcome. Two kinds of callers race on
//! it:
//!
//! - dial-plan logic calling [`progress`](CallOutcomeController::progress),
//!   [`answer`](CallOutcomeController::answer) and
//!   [`fail`](CallOutcomeController::fail)
//! - the signaling peer raising cancel, no-ring timeout and transaction
//!   complete through [`PeerSignalHandler`]
//!
//! Every terminal transition claims the context's [`TerminalGuard`](crate::guard::TerminalGuard)
//! first; losers are logged and dropped. Nothing on these paths waits on I/O
//! other than the signaling peer itself. Trace persistence is handed to the
//! [`TraceWorker`](crate::trace::TraceWorker).

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Weak};

use tracing::{debug, error};

use crate::bridge::{BridgeNotifier, CallManager};
use crate::context::CallExecutionContext;
use crate::error::Result;
use crate::execution::{ExecutionCountRelease, ExecutionCounter};
use crate::monitor::{MonitorEvent, MonitorEventKind, MonitorSink};
use crate::observers::{CancelObserver, CancelObservers};
use crate::peer::{PeerSignalHandler, SignalingPeer};
use crate::trace::TraceSubmitter;
use crate::types::{
    AnswerRequest, CallResponse, CancelCause, ContextKind, DialPlan, SipProvider, Transition,
};

/// Status used when a call is cancelled administratively
const REQUEST_TERMINATED: u16 = 487;

/// Orchestrates the terminal outcome of one call under dial-plan execution
pub struct CallOutcomeController {
    context: CallExecutionContext,
    peer: Arc<dyn SignalingPeer>,
    monitor: Arc<dyn MonitorSink>,
    bridge: Option<BridgeNotifier>,
    trace_submitter: Option<TraceSubmitter>,
    observers: CancelObservers,
    execution_release: Option<ExecutionCountRelease>,
}

impl CallOutcomeController {
    pub fn builder(
        dial_plan: Arc<DialPlan>,
        peer: Arc<dyn SignalingPeer>,
        monitor: Arc<dyn MonitorSink>,
    ) -> CallOutcomeControllerBuilder {
        CallOutcomeControllerBuilder::new(dial_plan, peer, monitor)
    }

    pub fn context(&self) -> &CallExecutionContext {
        &self.context
    }

    pub fn is_answered(&self) -> bool {
        self.context.is_answered()
    }

    pub fn set_send_trace(&self, send: bool) {
        self.context.set_send_trace(send);
    }

    /// Raise a monitor event and record it in the call trace
    pub fn log_event(&self, kind: MonitorEventKind, message: impl Into<String>) {
        let event = MonitorEvent::new(kind, message, self.context.dial_plan().owner.clone());
        self.monitor.log_event(&event);
        self.context.trace().append_line(event.trace_line());
    }

    /// Send a provisional response. Dropped once the call is terminated.
    pub async fn progress(&self, response: CallResponse) -> Result<Transition> {
        if self.context.is_answered() {
            debug!(
                execution = %self.context.execution_id(),
                status = response.status,
                "Progress after terminal outcome dropped"
            );
            return Ok(Transition::Ignored);
        }

        self.peer.progress(&response).await?;
        Ok(Transition::Applied)
    }

    /// Reject the call. Terminal.
    pub async fn fail(&self, response: CallResponse) -> Result<Transition> {
        if !self.context.guard().try_terminate() {
            self.log_event(
                MonitorEventKind::Warning,
                format!(
                    "Failure response {} {} ignored, call already terminated.",
                    response.status, response.reason
                ),
            );
            return Ok(Transition::Ignored);
        }

        self.log_event(
            MonitorEventKind::DialPlan,
            format!("Rejecting call with {} {}.", response.status, response.reason),
        );
        if let Err(e) = self.peer.reject(&response).await {
            self.log_event(MonitorEventKind::Error, format!("Reject failed: {}", e));
            return Err(e);
        }
        Ok(Transition::Applied)
    }

    /// Answer the call. Terminal.
    ///
    /// For a non-B2B peer with an established leg the answered dialogue is
    /// bridged with that leg through the call manager.
    pub async fn answer(&self, request: AnswerRequest) -> Result<Transition> {
        let status = request.response.status;
        if !self.context.guard().try_terminate() {
            self.log_event(
                MonitorEventKind::Warning,
                format!("Answer with {} ignored, call already terminated.", status),
            );
            return Ok(Transition::Ignored);
        }

        self.log_event(MonitorEventKind::DialPlan, format!("Answering call with {}.", status));

        let local_dialogue = match self.peer.answer(&request).await {
            Ok(dialogue) => dialogue,
            Err(e) => {
                self.log_event(MonitorEventKind::Error, format!("Answer failed: {}", e));
                return Err(e);
            }
        };

        if self.peer.is_b2b() {
            return Ok(Transition::Applied);
        }

        if let Some(leg) = &request.established_leg {
            match local_dialogue {
                Some(uas_dialogue) => match &self.bridge {
                    Some(bridge) => {
                        if !bridge.notify_bridge(&uas_dialogue, leg, self.peer.owner()).await {
                            self.log_event(
                                MonitorEventKind::Warning,
                                "Bridge notification failed, answered call will not be managed.",
                            );
                        }
                    }
                    None => self.log_event(
                        MonitorEventKind::Warning,
                        "No call manager configured, answered call will not be bridged.",
                    ),
                },
                None => self.log_event(
                    MonitorEventKind::Warning,
                    "Answer did not produce a local dialogue, the call will not be bridged.",
                ),
            }
        }

        Ok(Transition::Applied)
    }

    /// Cancel the call on behalf of an administrator. Terminal.
    pub async fn cancel_administratively(&self, reason: &str) -> Result<Transition> {
        if !self.context.guard().try_terminate() {
            self.log_event(
                MonitorEventKind::Warning,
                "Administrative cancel ignored, call already terminated.",
            );
            return Ok(Transition::Ignored);
        }

        self.log_event(
            MonitorEventKind::DialPlan,
            format!("Call cancelled administratively: {}.", reason),
        );
        self.observers.notify(CancelCause::Administrative);

        let response = CallResponse::new(REQUEST_TERMINATED, "Request Terminated").with_header("Reason", reason);
        if let Err(e) = self.peer.reject(&response).await {
            self.log_event(MonitorEventKind::Error, format!("Reject failed: {}", e));
            return Err(e);
        }
        Ok(Transition::Applied)
    }

    /// Release the account's execution slot.
    ///
    /// Called by the execution owner once the dial plan has finished running.
    pub fn release_execution(&self) -> bool {
        match &self.execution_release {
            Some(release) => release.release(),
            None => false,
        }
    }

    fn cancel_with(&self, cause: CancelCause, description: &str) {
        if self.context.guard().try_terminate() {
            self.log_event(MonitorEventKind::DialPlan, format!("Call {}.", description));
            self.observers.notify(cause);
        } else {
            self.log_event(
                MonitorEventKind::Warning,
                format!("Call {} after terminal outcome, ignored.", description),
            );
        }
    }

    fn complete_trace(&self) {
        if !self.context.send_trace() {
            return;
        }

        let plan = self.context.dial_plan();
        let snapshot = match self.context.trace().complete(&plan.owner, plan.trace_email.as_deref()) {
            Some(snapshot) => snapshot,
            None => return,
        };

        match &self.trace_submitter {
            Some(submitter) => {
                if let Err(e) = submitter.submit(snapshot) {
                    error!(
                        execution = %self.context.execution_id(),
                        owner = %plan.owner,
                        "Dial plan trace dropped: {}",
                        e
                    );
                }
            }
            None => debug!(execution = %self.context.execution_id(), "No trace worker configured"),
        }
    }

    fn guarded(&self, signal: &str, f: impl FnOnce()) {
        if catch_unwind(AssertUnwindSafe(f)).is_err() {
            error!(
                execution = %self.context.execution_id(),
                signal,
                "Signal handler panicked"
            );
        }
    }
}

impl PeerSignalHandler for CallOutcomeController {
    fn on_cancelled(&self) {
        self.guarded("cancelled", || self.cancel_with(CancelCause::ClientCancelled, "cancelled by caller"));
    }

    fn on_no_ring_timeout(&self) {
        self.guarded("no_ring_timeout", || {
            self.cancel_with(CancelCause::TimedOut, "timed out waiting for ring")
        });
    }

    fn on_transaction_complete(&self) {
        self.guarded("transaction_complete", || self.complete_trace());
    }

    fn on_trace_message(&self, message: &str) {
        self.guarded("trace_message", || {
            self.context.trace().append(MonitorEventKind::SipTransaction, message)
        });
    }
}

impl std::fmt::Debug for CallOutcomeController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallOutcomeController")
            .field("context", &self.context)
            .field("observers", &self.observers)
            .finish_non_exhaustive()
    }
}

/// Builder for [`CallOutcomeController`]
pub struct CallOutcomeControllerBuilder {
    dial_plan: Arc<DialPlan>,
    peer: Arc<dyn SignalingPeer>,
    providers: Vec<SipProvider>,
    caller_network_id: Option<String>,
    customer_id: String,
    kind: ContextKind,
    monitor: Arc<dyn MonitorSink>,
    call_manager: Option<Arc<dyn CallManager>>,
    trace_submitter: Option<TraceSubmitter>,
    observers: Vec<CancelObserver>,
    execution_counter: Option<Arc<dyn ExecutionCounter>>,
}

impl CallOutcomeControllerBuilder {
    pub fn new(dial_plan: Arc<DialPlan>, peer: Arc<dyn SignalingPeer>, monitor: Arc<dyn MonitorSink>) -> Self {
        Self {
            dial_plan,
            peer,
            monitor,
            providers: Vec::new(),
            caller_network_id: None,
            customer_id: String::new(),
            kind: ContextKind::Script,
            call_manager: None,
            trace_submitter: None,
            observers: Vec::new(),
            execution_counter: None,
        }
    }

    pub fn with_providers(mut self, providers: Vec<SipProvider>) -> Self {
        self.providers = providers;
        self
    }

    pub fn with_caller_network_id(mut self, network_id: impl Into<String>) -> Self {
        self.caller_network_id = Some(network_id.into());
        self
    }

    pub fn with_customer_id(mut self, customer_id: impl Into<String>) -> Self {
        self.customer_id = customer_id.into();
        self
    }

    pub fn with_kind(mut self, kind: ContextKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_call_manager(mut self, call_manager: Arc<dyn CallManager>) -> Self {
        self.call_manager = Some(call_manager);
        self
    }

    pub fn with_trace_submitter(mut self, submitter: TraceSubmitter) -> Self {
        self.trace_submitter = Some(submitter);
        self
    }

    pub fn with_cancel_observer<F>(mut self, observer: F) -> Self
    where
        F: Fn(CancelCause) + Send + Sync + 'static,
    {
        self.observers.push(Box::new(observer));
        self
    }

    pub fn with_execution_counter(mut self, counter: Arc<dyn ExecutionCounter>) -> Self {
        self.execution_counter = Some(counter);
        self
    }

    /// Build the controller and subscribe it to the peer's signals
    pub fn build(self) -> Arc<CallOutcomeController> {
        let execution_release = self
            .execution_counter
            .map(|counter| ExecutionCountRelease::new(counter, self.dial_plan.clone(), self.customer_id.clone()));

        let context = CallExecutionContext::new(
            self.dial_plan,
            Arc::from(self.providers),
            self.caller_network_id,
            self.customer_id,
            self.kind,
        );

        let controller = Arc::new(CallOutcomeController {
            context,
            peer: self.peer,
            monitor: self.monitor,
            bridge: self.call_manager.map(BridgeNotifier::new),
            trace_submitter: self.trace_submitter,
            observers: CancelObservers::new(self.observers),
            execution_release,
        });

        let handler: Weak<dyn PeerSignalHandler> = Arc::downgrade(&controller) as Weak<dyn PeerSignalHandler>;
        controller.peer.register_signal_handler(handler);

        debug!(
            execution = %controller.context.execution_id(),
            owner = %controller.context.dial_plan().owner,
            kind = %controller.context.kind(),
            "Dial plan execution started"
        );
        controller
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::TracingMonitor;
    use crate::types::SipDialogue;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct NullPeer {
        handler: Mutex<Option<Weak<dyn PeerSignalHandler>>>,
    }

    #[async_trait]
    impl SignalingPeer for NullPeer {
        fn owner(&self) -> &str {
            "alice"
        }
        fn is_b2b(&self) -> bool {
            false
        }
        async fn progress(&self, _response: &CallResponse) -> Result<()> {
            Ok(())
        }
        async fn reject(&self, _response: &CallResponse) -> Result<()> {
            Ok(())
        }
        async fn answer(&self, _request: &AnswerRequest) -> Result<Option<SipDialogue>> {
            Ok(None)
        }
        fn register_signal_handler(&self, handler: Weak<dyn PeerSignalHandler>) {
            *self.handler.lock().unwrap() = Some(handler);
        }
    }

    #[test]
    fn test_build_registers_signal_handler() {
        let peer = Arc::new(NullPeer::default());
        let plan = Arc::new(DialPlan::new("dp-1", "alice", "sys.Dial()"));
        let controller = CallOutcomeController::builder(plan, peer.clone(), Arc::new(TracingMonitor))
            .with_customer_id("cust-1")
            .with_kind(ContextKind::Line)
            .build();

        let handler = peer.handler.lock().unwrap().clone().unwrap();
        assert!(handler.upgrade().is_some());
        assert_eq!(controller.context().kind(), ContextKind::Line);
        assert_eq!(controller.context().customer_id(), "cust-1");

        drop(controller);
        assert!(handler.upgrade().is_none());
    }

    #[test]
    fn test_trace_message_recorded() {
        let peer = Arc::new(NullPeer::default());
        let plan = Arc::new(DialPlan::new("dp-1", "alice", "sys.Dial()"));
        let controller = CallOutcomeController::builder(plan, peer, Arc::new(TracingMonitor)).build();

        controller.on_trace_message("INVITE received from 10.0.0.1");
        assert_eq!(
            controller.context().trace().text(),
            "SIPTransaction => INVITE received from 10.0.0.1\n"
        );
    }

    #[test]
    fn test_release_without_counter() {
        let peer = Arc::new(NullPeer::default());
        let plan = Arc::new(DialPlan::new("dp-1", "alice", "sys.Dial()"));
        let controller = CallOutcomeController::builder(plan, peer, Arc::new(TracingMonitor)).build();
        assert!(!controller.release_execution());
    }
}
