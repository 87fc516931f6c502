//! Monitoring sink for dial-plan executions
//!
//! Every execution is handed an explicit [`MonitorSink`]. Events raised through
//! it serve operational logging and also feed the per-call trace buffer.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

/// Server role raising the event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerType {
    AppServer,
}

impl fmt::Display for ServerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerType::AppServer => f.write_str("AppServer"),
        }
    }
}

/// Kind of monitor event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MonitorEventKind {
    /// Dial-plan progress
    DialPlan,
    /// Message relayed from the signaling transaction
    SipTransaction,
    /// Benign anomaly, e.g. a late terminal attempt
    Warning,
    /// Failure that degraded the call or its trace
    Error,
}

impl fmt::Display for MonitorEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitorEventKind::DialPlan => f.write_str("DialPlan"),
            MonitorEventKind::SipTransaction => f.write_str("SIPTransaction"),
            MonitorEventKind::Warning => f.write_str("Warn"),
            MonitorEventKind::Error => f.write_str("Error"),
        }
    }
}

/// Structured monitor event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorEvent {
    pub server_type: ServerType,
    pub kind: MonitorEventKind,
    pub message: String,
    pub owner: String,
    pub timestamp: DateTime<Utc>,
}

impl MonitorEvent {
    pub fn new(kind: MonitorEventKind, message: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            server_type: ServerType::AppServer,
            kind,
            message: message.into(),
            owner: owner.into(),
            timestamp: Utc::now(),
        }
    }

    /// Line recorded in the call trace for this event
    pub fn trace_line(&self) -> String {
        format!("{} => {}", self.kind, self.message)
    }
}

/// Consumer of monitor events
pub trait MonitorSink: Send + Sync {
    fn log_event(&self, event: &MonitorEvent);
}

/// Sink forwarding monitor events to `tracing`
#[derive(Debug, Default, Clone)]
pub struct TracingMonitor;

impl MonitorSink for TracingMonitor {
    fn log_event(&self, event: &MonitorEvent) {
        let server = event.server_type.to_string();
        match event.kind {
            MonitorEventKind::DialPlan => {
                info!(server = %server, owner = %event.owner, "{}", event.message)
            }
            MonitorEventKind::SipTransaction => {
                debug!(server = %server, owner = %event.owner, "{}", event.message)
            }
            MonitorEventKind::Warning => {
                warn!(server = %server, owner = %event.owner, "{}", event.message)
            }
            MonitorEventKind::Error => {
                error!(server = %server, owner = %event.owner, "{}", event.message)
            }
        }
    }
}

/// Install a fmt subscriber honouring `RUST_LOG`, defaulting to `level`.
///
/// Returns `false` when a global subscriber was already installed.
pub fn init_tracing(level: &str) -> bool {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},rvoip_dialplan_core=debug", level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .is_ok()
}
