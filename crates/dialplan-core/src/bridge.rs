//! Bridge notifier
//!
//! After a non-B2B call is answered against an already established leg, the
//! call manager is told the two dialogues belong together so it can handle
//! later hold, transfer and hangup requests for the pair.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::Result;
use crate::types::SipDialogue;

/// External call manager tracking linked dialogues
#[async_trait]
pub trait CallManager: Send + Sync {
    async fn bridge_dialogues(
        &self,
        uas_dialogue: &SipDialogue,
        established_leg: &SipDialogue,
        owner: &str,
    ) -> Result<()>;
}

/// Forwards bridge notifications and contains their failures
#[derive(Clone)]
pub struct BridgeNotifier {
    call_manager: Arc<dyn CallManager>,
}

impl BridgeNotifier {
    pub fn new(call_manager: Arc<dyn CallManager>) -> Self {
        Self { call_manager }
    }

    /// Link the answered dialogue with the established leg.
    ///
    /// Errors are logged and swallowed; the call is already answered. Returns
    /// whether the call manager accepted the bridge.
    pub async fn notify_bridge(
        &self,
        uas_dialogue: &SipDialogue,
        established_leg: &SipDialogue,
        owner: &str,
    ) -> bool {
        match self
            .call_manager
            .bridge_dialogues(uas_dialogue, established_leg, owner)
            .await
        {
            Ok(()) => {
                debug!(owner, uas = %uas_dialogue, leg = %established_leg, "Dialogues bridged");
                true
            }
            Err(e) => {
                warn!(owner, uas = %uas_dialogue, leg = %established_leg, "Bridge notification failed: {}", e);
                false
            }
        }
    }
}

impl std::fmt::Debug for BridgeNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeNotifier").finish_non_exhaustive()
    }
}
