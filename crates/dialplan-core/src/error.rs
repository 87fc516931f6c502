//! Error types for dialplan-core

use thiserror::Error;

/// Result type alias for dial-plan call operations
pub type Result<T> = std::result::Result<T, DialPlanError>;

/// Main error type for dial-plan call operations
#[derive(Error, Debug)]
pub enum DialPlanError {
    /// The signaling peer refused or failed an action
    #[error("Signaling peer error: {0}")]
    Peer(String),

    /// The call manager could not link two dialogues
    #[error("Bridge error: {0}")]
    Bridge(String),

    /// Writing a trace file failed
    #[error("Trace persistence error: {0}")]
    TracePersistence(String),

    /// Sending a trace email failed, reported by [`TraceMailer`](crate::trace::TraceMailer) implementations
    #[error("Trace mail error to {to}: {reason}")]
    TraceMail { to: String, reason: String },

    /// The trace worker queue is at capacity
    #[error("Trace queue full (capacity {capacity})")]
    TraceQueueFull { capacity: usize },

    /// The trace worker has been shut down
    #[error("Trace worker closed")]
    TraceWorkerClosed,

    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DialPlanError {
    /// Create a peer error
    pub fn peer(msg: impl Into<String>) -> Self {
        Self::Peer(msg.into())
    }

    /// Create a bridge error
    pub fn bridge(msg: impl Into<String>) -> Self {
        Self::Bridge(msg.into())
    }

    /// Create a trace mail error
    pub fn trace_mail(to: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::TraceMail {
            to: to.into(),
            reason: reason.into(),
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}
