//! Test doubles for the dial-plan collaborators

#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Weak};

use async_trait::async_trait;
use tokio::sync::mpsc;

use rvoip_dialplan_core::peer::PeerSignalSlot;
use rvoip_dialplan_core::{
    AnswerRequest, CallManager, CallResponse, DialPlan, DialPlanError, MonitorEvent, MonitorEventKind, MonitorSink,
    PeerSignalHandler, Result, SignalingPeer, SipDialogue, TraceMailer, TraceWriter,
};

/// What the peer was asked to do, in order
#[derive(Debug, Clone, PartialEq)]
pub enum PeerAction {
    Progress(u16),
    Reject(u16, String),
    Answer(u16),
}

pub struct MockPeer {
    owner: String,
    b2b: bool,
    answer_dialogue: Option<SipDialogue>,
    actions: Mutex<Vec<PeerAction>>,
    signals: PeerSignalSlot,
}

impl MockPeer {
    pub fn new(owner: &str) -> Self {
        Self {
            owner: owner.to_string(),
            b2b: false,
            answer_dialogue: Some(uas_dialogue()),
            actions: Mutex::new(Vec::new()),
            signals: PeerSignalSlot::new(),
        }
    }

    pub fn b2b(mut self) -> Self {
        self.b2b = true;
        self
    }

    pub fn without_dialogue(mut self) -> Self {
        self.answer_dialogue = None;
        self
    }

    pub fn actions(&self) -> Vec<PeerAction> {
        self.actions.lock().unwrap().clone()
    }

    pub fn signals(&self) -> &PeerSignalSlot {
        &self.signals
    }
}

#[async_trait]
impl SignalingPeer for MockPeer {
    fn owner(&self) -> &str {
        &self.owner
    }

    fn is_b2b(&self) -> bool {
        self.b2b
    }

    async fn progress(&self, response: &CallResponse) -> Result<()> {
        self.actions.lock().unwrap().push(PeerAction::Progress(response.status));
        Ok(())
    }

    async fn reject(&self, response: &CallResponse) -> Result<()> {
        self.actions
            .lock()
            .unwrap()
            .push(PeerAction::Reject(response.status, response.reason.clone()));
        Ok(())
    }

    async fn answer(&self, request: &AnswerRequest) -> Result<Option<SipDialogue>> {
        self.actions
            .lock()
            .unwrap()
            .push(PeerAction::Answer(request.response.status));
        Ok(self.answer_dialogue.clone())
    }

    fn register_signal_handler(&self, handler: Weak<dyn PeerSignalHandler>) {
        self.signals.register(handler);
    }
}

#[derive(Default)]
pub struct RecordingMonitor {
    events: Mutex<Vec<MonitorEvent>>,
}

impl RecordingMonitor {
    pub fn count(&self, kind: MonitorEventKind) -> usize {
        self.events.lock().unwrap().iter().filter(|e| e.kind == kind).count()
    }

    pub fn messages(&self, kind: MonitorEventKind) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.kind == kind)
            .map(|e| e.message.clone())
            .collect()
    }
}

impl MonitorSink for RecordingMonitor {
    fn log_event(&self, event: &MonitorEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

#[derive(Default)]
pub struct RecordingCallManager {
    pub bridges: Mutex<Vec<(SipDialogue, SipDialogue, String)>>,
}

#[async_trait]
impl CallManager for RecordingCallManager {
    async fn bridge_dialogues(
        &self,
        uas_dialogue: &SipDialogue,
        established_leg: &SipDialogue,
        owner: &str,
    ) -> Result<()> {
        self.bridges
            .lock()
            .unwrap()
            .push((uas_dialogue.clone(), established_leg.clone(), owner.to_string()));
        Ok(())
    }
}

/// Call manager that refuses every bridge
#[derive(Default)]
pub struct FailingCallManager {
    attempts: AtomicUsize,
}

impl FailingCallManager {
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CallManager for FailingCallManager {
    async fn bridge_dialogues(&self, _uas: &SipDialogue, _leg: &SipDialogue, _owner: &str) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(DialPlanError::bridge("call manager unavailable"))
    }
}

/// Trace writer forwarding `(file_name, text)` to a channel
pub struct ChannelWriter(pub mpsc::UnboundedSender<(String, String)>);

#[async_trait]
impl TraceWriter for ChannelWriter {
    async fn write_trace(&self, _directory: &Path, file_name: &str, text: &str) -> Result<()> {
        let _ = self.0.send((file_name.to_string(), text.to_string()));
        Ok(())
    }
}

/// Trace mailer forwarding `(to, from, subject, body)` to a channel
pub struct ChannelMailer(pub mpsc::UnboundedSender<(String, String, String, String)>);

#[async_trait]
impl TraceMailer for ChannelMailer {
    async fn send_trace(&self, to: &str, from: &str, subject: &str, body: &str) -> Result<()> {
        let _ = self
            .0
            .send((to.to_string(), from.to_string(), subject.to_string(), body.to_string()));
        Ok(())
    }
}

/// Trace writer that fails its first write and forwards the rest to a channel
pub struct FlakyWriter {
    calls: AtomicUsize,
    sink: mpsc::UnboundedSender<(String, String)>,
}

impl FlakyWriter {
    pub fn new(sink: mpsc::UnboundedSender<(String, String)>) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            sink,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TraceWriter for FlakyWriter {
    async fn write_trace(&self, directory: &Path, file_name: &str, text: &str) -> Result<()> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            return Err(DialPlanError::TracePersistence(format!(
                "{}: disk full",
                directory.join(file_name).display()
            )));
        }
        let _ = self.sink.send((file_name.to_string(), text.to_string()));
        Ok(())
    }
}

/// Trace mailer that fails its first send and forwards the rest to a channel
pub struct FlakyMailer {
    calls: AtomicUsize,
    sink: mpsc::UnboundedSender<(String, String)>,
}

impl FlakyMailer {
    pub fn new(sink: mpsc::UnboundedSender<(String, String)>) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            sink,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TraceMailer for FlakyMailer {
    async fn send_trace(&self, to: &str, _from: &str, _subject: &str, body: &str) -> Result<()> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            return Err(DialPlanError::trace_mail(to, "relay refused"));
        }
        let _ = self.sink.send((to.to_string(), body.to_string()));
        Ok(())
    }
}

pub fn dial_plan() -> Arc<DialPlan> {
    Arc::new(DialPlan::new("dp-100", "alice", "sys.Dial(\"bob@provider\")").with_trace_email("alice@example.com"))
}

pub fn uas_dialogue() -> SipDialogue {
    SipDialogue::new("uas-call-1", "uas-local", "uas-remote", "alice")
}

pub fn established_leg() -> SipDialogue {
    SipDialogue::new("uac-call-1", "uac-local", "uac-remote", "alice")
}
