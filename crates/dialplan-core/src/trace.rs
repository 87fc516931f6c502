//! Trace pipeline
//!
//! Each dial-plan execution accumulates a human readable transcript of its
//! significant events. When the signaling transaction is torn down the
//! transcript is finalised, detached from the execution as a [`TraceSnapshot`]
//! and handed to the [`TraceWorker`], which persists and/or emails it off the
//! signaling path.
//!
//! ```text
//!  controller ──append──▶ TraceLog
//!       │
//!  transaction complete
//!       │ complete() → TraceSnapshot
//!       ▼
//!  TraceSubmitter ──try_send──▶ [bounded queue] ──▶ worker task
//!                                                    ├─ TraceWriter (file)
//!                                                    └─ TraceMailer (email)
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::config::TraceConfig;
use crate::error::{DialPlanError, Result};

/// Append-only, chronologically ordered event transcript for one call
#[derive(Debug, Default)]
pub struct TraceLog {
    lines: Mutex<Vec<String>>,
    completed: AtomicBool,
}

impl TraceLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn lines(&self) -> MutexGuard<'_, Vec<String>> {
        self.lines.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Append one `kind => message` line
    pub fn append(&self, kind: impl std::fmt::Display, message: &str) {
        self.append_line(format!("{} => {}", kind, message));
    }

    pub fn append_line(&self, line: String) {
        self.lines().push(line);
    }

    pub fn is_empty(&self) -> bool {
        self.lines().is_empty()
    }

    pub fn len(&self) -> usize {
        self.lines().len()
    }

    pub fn is_completed(&self) -> bool {
        self.completed.load(Ordering::Acquire)
    }

    /// Current transcript, one event per line
    pub fn text(&self) -> String {
        render(&self.lines())
    }

    /// Finalise the transcript and detach a copy for the trace worker.
    ///
    /// Returns `None` for an empty transcript; nothing is appended then.
    /// Only the first completion of a non-empty transcript yields a snapshot.
    pub fn complete(&self, owner: &str, email: Option<&str>) -> Option<TraceSnapshot> {
        let completed_at = Utc::now();
        let mut lines = self.lines();
        if lines.is_empty() || self.completed.swap(true, Ordering::AcqRel) {
            return None;
        }
        lines.push(completion_line(completed_at));
        Some(TraceSnapshot {
            owner: owner.to_string(),
            email: email.map(str::to_string),
            text: render(&lines),
            completed_at,
        })
    }
}

fn render(lines: &[String]) -> String {
    let mut text = String::with_capacity(lines.iter().map(|l| l.len() + 1).sum());
    for line in lines {
        text.push_str(line);
        text.push('\n');
    }
    text
}

/// Final line appended when a trace is completed
pub fn completion_line(at: DateTime<Utc>) -> String {
    format!("Dial plan trace completed at {}.", at.format("%d %b %Y %H:%M:%S:%3f"))
}

/// Detached copy of a completed trace and where it should go
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceSnapshot {
    pub owner: String,
    pub email: Option<String>,
    pub text: String,
    pub completed_at: DateTime<Utc>,
}

impl TraceSnapshot {
    /// File name for this trace, `<owner>-<yyyyMMddHHmmss>.txt`
    pub fn file_name(&self) -> String {
        let owner: String = self
            .owner
            .chars()
            .map(|c| if matches!(c, '/' | '\\' | ':') { '_' } else { c })
            .collect();
        format!("{}-{}.txt", owner, self.completed_at.format("%Y%m%d%H%M%S"))
    }
}

/// Persists trace text
#[async_trait]
pub trait TraceWriter: Send + Sync {
    async fn write_trace(&self, directory: &Path, file_name: &str, text: &str) -> Result<()>;
}

/// Sends trace text by email.
///
/// Delivery failures are reported as [`DialPlanError::TraceMail`]. The worker
/// logs them and moves on to the next trace without retrying.
#[async_trait]
pub trait TraceMailer: Send + Sync {
    async fn send_trace(&self, to: &str, from: &str, subject: &str, body: &str) -> Result<()>;
}

/// Writes traces to the local filesystem
#[derive(Debug, Default, Clone)]
pub struct FileTraceWriter;

#[async_trait]
impl TraceWriter for FileTraceWriter {
    async fn write_trace(&self, directory: &Path, file_name: &str, text: &str) -> Result<()> {
        let path = directory.join(file_name);
        tokio::fs::write(&path, text)
            .await
            .map_err(|e| DialPlanError::TracePersistence(format!("{}: {}", path.display(), e)))
    }
}

/// Cloneable handle submitting traces to a running [`TraceWorker`]
#[derive(Debug, Clone)]
pub struct TraceSubmitter {
    sender: mpsc::Sender<TraceSnapshot>,
    capacity: usize,
}

impl TraceSubmitter {
    /// Queue a trace without waiting. Fails when the queue is full or closed.
    pub fn submit(&self, snapshot: TraceSnapshot) -> Result<()> {
        self.sender.try_send(snapshot).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DialPlanError::TraceQueueFull {
                capacity: self.capacity,
            },
            mpsc::error::TrySendError::Closed(_) => DialPlanError::TraceWorkerClosed,
        })
    }
}

/// Background worker persisting and mailing completed traces
pub struct TraceWorker {
    submitter: TraceSubmitter,
    task: JoinHandle<()>,
}

struct TraceDestinations {
    directory: Option<PathBuf>,
    from_address: String,
    subject: String,
    writer: Arc<dyn TraceWriter>,
    mailer: Option<Arc<dyn TraceMailer>>,
}

impl TraceWorker {
    /// Spawn the worker task on the current tokio runtime
    pub fn start(
        config: &TraceConfig,
        writer: Arc<dyn TraceWriter>,
        mailer: Option<Arc<dyn TraceMailer>>,
    ) -> Self {
        let capacity = config.queue_capacity.max(1);
        let (sender, mut receiver) = mpsc::channel::<TraceSnapshot>(capacity);
        let destinations = TraceDestinations {
            directory: config.directory.clone(),
            from_address: config.from_address.clone(),
            subject: config.subject.clone(),
            writer,
            mailer,
        };

        let task = tokio::spawn(async move {
            debug!("Trace worker started");
            while let Some(snapshot) = receiver.recv().await {
                destinations.deliver(&snapshot).await;
            }
            debug!("Trace worker stopped");
        });

        Self {
            submitter: TraceSubmitter { sender, capacity },
            task,
        }
    }

    pub fn submitter(&self) -> TraceSubmitter {
        self.submitter.clone()
    }

    /// Stop accepting traces from this handle and wait for the queue to drain.
    ///
    /// The worker exits once every [`TraceSubmitter`] clone has been dropped.
    pub async fn shutdown(self) {
        drop(self.submitter);
        if let Err(e) = self.task.await {
            error!("Trace worker task failed: {}", e);
        }
    }
}

impl TraceDestinations {
    async fn deliver(&self, snapshot: &TraceSnapshot) {
        if let Some(directory) = &self.directory {
            let exists = tokio::fs::metadata(directory)
                .await
                .map(|m| m.is_dir())
                .unwrap_or(false);
            if exists {
                let file_name = snapshot.file_name();
                match self.writer.write_trace(directory, &file_name, &snapshot.text).await {
                    Ok(()) => info!(owner = %snapshot.owner, file = %file_name, "Dial plan trace written"),
                    Err(e) => error!(owner = %snapshot.owner, "Failed to write dial plan trace: {}", e),
                }
            } else {
                debug!(directory = %directory.display(), "Trace directory missing, skipping file");
            }
        }

        if let Some(to) = snapshot.email.as_deref().filter(|to| !to.trim().is_empty()) {
            match &self.mailer {
                Some(mailer) => {
                    match mailer
                        .send_trace(to, &self.from_address, &self.subject, &snapshot.text)
                        .await
                    {
                        Ok(()) => info!(owner = %snapshot.owner, to, "Dial plan trace emailed"),
                        Err(e) => error!(owner = %snapshot.owner, to, "Failed to email dial plan trace: {}", e),
                    }
                }
                None => debug!(owner = %snapshot.owner, to, "No trace mailer configured, skipping email"),
            }
        }
    }
}
