//! Shared types for dial-plan call handling

use std::fmt;

use serde::{Deserialize, Serialize};

/// Immutable dial-plan definition as loaded from the account directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialPlan {
    /// Dial plan identifier
    pub id: String,
    /// Human readable name
    pub name: String,
    /// Owning account identity
    pub owner: String,
    /// Administrative member id, if the owner is managed by an admin account
    pub admin_member_id: Option<String>,
    /// Script text or routing line
    pub script: String,
    /// Destination address for execution traces
    pub trace_email: Option<String>,
}

impl DialPlan {
    pub fn new(id: impl Into<String>, owner: impl Into<String>, script: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            owner: owner.into(),
            admin_member_id: None,
            script: script.into(),
            trace_email: None,
        }
    }

    pub fn with_trace_email(mut self, email: impl Into<String>) -> Self {
        self.trace_email = Some(email.into());
        self
    }

    pub fn with_admin_member_id(mut self, admin_id: impl Into<String>) -> Self {
        self.admin_member_id = Some(admin_id.into());
        self
    }
}

/// Outbound provider available to dial-plan logic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SipProvider {
    pub name: String,
    pub owner: String,
    /// Provider server URI, e.g. `sip:sip.example.com`
    pub server: String,
    pub username: Option<String>,
    pub realm: Option<String>,
    /// Headers added to every request towards this provider
    #[serde(default)]
    pub custom_headers: Vec<SipHeader>,
}

/// How the execution context was created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContextKind {
    /// Driven by a single static routing line
    Line,
    /// Driven by a full dial-plan script
    Script,
}

impl fmt::Display for ContextKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextKind::Line => write!(f, "line"),
            ContextKind::Script => write!(f, "script"),
        }
    }
}

/// Reason a call ended before being answered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CancelCause {
    Unknown,
    TimedOut,
    Administrative,
    ClientCancelled,
    NormalClearing,
    Error,
}

impl fmt::Display for CancelCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CancelCause::Unknown => "unknown",
            CancelCause::TimedOut => "timed out",
            CancelCause::Administrative => "administrative",
            CancelCause::ClientCancelled => "client cancelled",
            CancelCause::NormalClearing => "normal clearing",
            CancelCause::Error => "error",
        };
        f.write_str(s)
    }
}

/// An established, addressable call leg
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SipDialogue {
    pub call_id: String,
    pub local_tag: String,
    pub remote_tag: String,
    pub owner: String,
}

impl SipDialogue {
    pub fn new(
        call_id: impl Into<String>,
        local_tag: impl Into<String>,
        remote_tag: impl Into<String>,
        owner: impl Into<String>,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            local_tag: local_tag.into(),
            remote_tag: remote_tag.into(),
            owner: owner.into(),
        }
    }
}

impl fmt::Display for SipDialogue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{};local-tag={};remote-tag={}", self.call_id, self.local_tag, self.remote_tag)
    }
}

/// Transfer handling requested for an answered dialogue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TransferMode {
    #[default]
    Default,
    NotAllowed,
    BlindPlaceCall,
    PassThru,
}

/// A single custom SIP header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SipHeader {
    pub name: String,
    pub value: String,
}

impl SipHeader {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Message body with its content type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseBody {
    pub content_type: String,
    pub body: String,
}

/// Status, reason, headers and optional body of a response sent to the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallResponse {
    pub status: u16,
    pub reason: String,
    pub headers: Vec<SipHeader>,
    pub body: Option<ResponseBody>,
}

impl CallResponse {
    pub fn new(status: u16, reason: impl Into<String>) -> Self {
        Self {
            status,
            reason: reason.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push(SipHeader::new(name, value));
        self
    }

    pub fn with_headers(mut self, headers: Vec<SipHeader>) -> Self {
        self.headers.extend(headers);
        self
    }

    pub fn with_body(mut self, content_type: impl Into<String>, body: impl Into<String>) -> Self {
        self.body = Some(ResponseBody {
            content_type: content_type.into(),
            body: body.into(),
        });
        self
    }
}

/// Everything needed to answer a call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerRequest {
    pub response: CallResponse,
    /// To tag to use on the answer, generated by the peer when absent
    pub to_tag: Option<String>,
    /// Already established leg to link with the answered dialogue
    pub established_leg: Option<SipDialogue>,
    pub transfer_mode: TransferMode,
}

impl AnswerRequest {
    pub fn new(response: CallResponse) -> Self {
        Self {
            response,
            to_tag: None,
            established_leg: None,
            transfer_mode: TransferMode::Default,
        }
    }

    pub fn with_to_tag(mut self, tag: impl Into<String>) -> Self {
        self.to_tag = Some(tag.into());
        self
    }

    pub fn with_established_leg(mut self, leg: SipDialogue) -> Self {
        self.established_leg = Some(leg);
        self
    }

    pub fn with_transfer_mode(mut self, mode: TransferMode) -> Self {
        self.transfer_mode = mode;
        self
    }
}

/// Result of a terminal or progress operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The action was forwarded to the signaling peer
    Applied,
    /// The call was already terminated, nothing was sent
    Ignored,
}

impl Transition {
    pub fn is_applied(&self) -> bool {
        matches!(self, Transition::Applied)
    }
}
