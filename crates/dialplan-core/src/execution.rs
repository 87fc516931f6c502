//! Execution-count release
//!
//! Capacity accounting for concurrently running dial plans is owned by the
//! account directory. The owner of an execution calls [`ExecutionCountRelease::release`]
//! once the script has finished running, which can be after the call itself
//! reached its terminal outcome.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::types::DialPlan;

/// External counter of running dial-plan executions per account
pub trait ExecutionCounter: Send + Sync {
    fn decrement(&self, dial_plan: &DialPlan, customer_id: &str);
}

/// One-shot release of an execution slot
pub struct ExecutionCountRelease {
    counter: Arc<dyn ExecutionCounter>,
    dial_plan: Arc<DialPlan>,
    customer_id: String,
    released: AtomicBool,
}

impl ExecutionCountRelease {
    pub fn new(counter: Arc<dyn ExecutionCounter>, dial_plan: Arc<DialPlan>, customer_id: impl Into<String>) -> Self {
        Self {
            counter,
            dial_plan,
            customer_id: customer_id.into(),
            released: AtomicBool::new(false),
        }
    }

    /// Forward the release to the counter. Only the first call has an effect.
    pub fn release(&self) -> bool {
        if self.released.swap(true, Ordering::AcqRel) {
            warn!(
                dial_plan = %self.dial_plan.id,
                customer = %self.customer_id,
                "Execution count already released"
            );
            return false;
        }
        debug!(dial_plan = %self.dial_plan.id, customer = %self.customer_id, "Releasing execution count");
        self.counter.decrement(&self.dial_plan, &self.customer_id);
        true
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for ExecutionCountRelease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionCountRelease")
            .field("dial_plan", &self.dial_plan.id)
            .field("customer_id", &self.customer_id)
            .field("released", &self.is_released())
            .finish()
    }
}
