//! # Dial Plan Core
//!
//! Call-outcome lifecycle for inbound calls handled by a dial-plan execution.
//!
//! A call enters execution with an established signaling peer and leaves it
//! with exactly one terminal outcome: answered, failed, cancelled by the
//! caller, cancelled administratively or timed out. Termination signals can
//! race from the dial-plan task and from the peer's callback thread; a single
//! atomic guard decides which one wins.
//!
//! ## Architecture
//!
//! ```text
//!   dial-plan logic            signaling peer
//!   progress/answer/fail       cancel / no-ring timeout / teardown / trace
//!          │                          │
//!          └──────────┬───────────────┘
//!                     ▼
//!          ┌──────────────────────┐
//!          │ CallOutcomeController│── TerminalGuard (CAS)
//!          └──────────────────────┘
//!            │        │         │
//!            ▼        ▼         ▼
//!    BridgeNotifier  TraceLog  CancelObservers
//!                     │
//!              TraceWorker (file / email, off the signaling path)
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use rvoip_dialplan_core::prelude::*;
//!
//! let config = DialPlanConfig::from_env()?;
//! let worker = TraceWorker::start(&config.trace, Arc::new(FileTraceWriter), None);
//!
//! let controller = CallOutcomeController::builder(dial_plan, peer, Arc::new(TracingMonitor))
//!     .with_customer_id("customer-42")
//!     .with_trace_submitter(worker.submitter())
//!     .with_cancel_observer(|cause| tracing::info!(%cause, "call cancelled"))
//!     .build();
//!
//! controller.progress(CallResponse::new(180, "Ringing")).await?;
//! controller.answer(AnswerRequest::new(CallResponse::new(200, "OK"))).await?;
//! ```

pub mod bridge;
pub mod config;
pub mod context;
pub mod controller;
pub mod error;
pub mod execution;
pub mod guard;
pub mod monitor;
pub mod observers;
pub mod peer;
pub mod trace;
pub mod types;

pub use bridge::{BridgeNotifier, CallManager};
pub use config::{DialPlanConfig, TraceConfig};
pub use context::CallExecutionContext;
pub use controller::{CallOutcomeController, CallOutcomeControllerBuilder};
pub use error::{DialPlanError, Result};
pub use execution::{ExecutionCountRelease, ExecutionCounter};
pub use guard::TerminalGuard;
pub use monitor::{init_tracing, MonitorEvent, MonitorEventKind, MonitorSink, ServerType, TracingMonitor};
pub use observers::{CancelObserver, CancelObservers};
pub use peer::{PeerSignalHandler, PeerSignalSlot, SignalingPeer};
pub use trace::{FileTraceWriter, TraceLog, TraceMailer, TraceSnapshot, TraceSubmitter, TraceWorker, TraceWriter};
pub use types::{
    AnswerRequest, CallResponse, CancelCause, ContextKind, DialPlan, ResponseBody, SipDialogue, SipHeader,
    SipProvider, TransferMode, Transition,
};

/// Common imports for embedding a dial-plan execution
pub mod prelude {
    pub use crate::{
        AnswerRequest, CallManager, CallOutcomeController, CallResponse, CancelCause, ContextKind, DialPlan,
        DialPlanConfig, DialPlanError, ExecutionCounter, FileTraceWriter, MonitorSink, PeerSignalHandler, Result,
        SignalingPeer, SipDialogue, SipProvider, TraceMailer, TraceWorker, TraceWriter, TracingMonitor, TransferMode,
        Transition,
    };
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
