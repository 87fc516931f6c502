//! Dial-plan execution configuration
//!
//! Only the trace pipeline is configurable; everything else about a call is
//! decided by the dial plan itself.
//!
//! ```
//! use rvoip_dialplan_core::DialPlanConfig;
//!
//! let mut config = DialPlanConfig::default();
//! config.trace.directory = Some("/var/log/rvoip/traces".into());
//! assert!(config.validate().is_ok());
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{DialPlanError, Result};

/// Default sender for trace emails
pub const DEFAULT_TRACE_FROM_ADDRESS: &str = "dialplan-trace@localhost";

/// Default subject for trace emails
pub const DEFAULT_TRACE_SUBJECT: &str = "Dial Plan Trace";

/// Default bound of the trace worker queue
pub const DEFAULT_TRACE_QUEUE_CAPACITY: usize = 256;

/// Top level configuration for dial-plan executions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialPlanConfig {
    /// Trace pipeline settings
    #[serde(default)]
    pub trace: TraceConfig,
}

/// Trace pipeline configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceConfig {
    /// Directory trace files are written to. Must already exist.
    pub directory: Option<PathBuf>,

    /// Sender address for trace emails
    pub from_address: String,

    /// Subject line for trace emails
    pub subject: String,

    /// Maximum number of traces waiting for the worker
    ///
    /// Traces submitted while the queue is full are dropped and logged.
    pub queue_capacity: usize,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            directory: None,
            from_address: DEFAULT_TRACE_FROM_ADDRESS.to_string(),
            subject: DEFAULT_TRACE_SUBJECT.to_string(),
            queue_capacity: DEFAULT_TRACE_QUEUE_CAPACITY,
        }
    }
}

impl DialPlanConfig {
    /// Load configuration from `RVOIP_DIALPLAN_*` environment variables,
    /// falling back to defaults for anything unset.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(dir) = lookup("RVOIP_DIALPLAN_TRACE_DIR") {
            if !dir.is_empty() {
                config.trace.directory = Some(PathBuf::from(dir));
            }
        }
        if let Some(from) = lookup("RVOIP_DIALPLAN_TRACE_FROM") {
            config.trace.from_address = from;
        }
        if let Some(subject) = lookup("RVOIP_DIALPLAN_TRACE_SUBJECT") {
            config.trace.subject = subject;
        }
        if let Some(capacity) = lookup("RVOIP_DIALPLAN_TRACE_QUEUE") {
            config.trace.queue_capacity = capacity.parse().map_err(|_| {
                DialPlanError::config(format!("Invalid RVOIP_DIALPLAN_TRACE_QUEUE: {}", capacity))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.trace.from_address.trim().is_empty() {
            return Err(DialPlanError::config("trace.from_address cannot be empty"));
        }
        if self.trace.subject.trim().is_empty() {
            return Err(DialPlanError::config("trace.subject cannot be empty"));
        }
        if self.trace.queue_capacity == 0 {
            return Err(DialPlanError::config("trace.queue_capacity must be greater than 0"));
        }
        Ok(())
    }
}
