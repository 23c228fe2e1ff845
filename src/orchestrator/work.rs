//! The boundary to the external work collaborator
//!
//! The orchestrator never knows what a cycle actually crawls. It hands the
//! selected identity, the target subject and an item budget to a
//! `WorkCallback` and branches on the returned `WorkOutcome`.

use crate::pool::Identity;
use async_trait::async_trait;
use std::time::Duration;

/// Result of one work invocation
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WorkOutcome {
    /// Items the callback processed this cycle
    pub item_count: u64,

    pub success: bool,

    pub error: Option<String>,

    /// Items delivered downstream (notifications, logs) this cycle
    pub pushed_count: u64,

    /// How long the downstream delivery took, if any happened
    pub push_latency: Option<Duration>,
}

impl WorkOutcome {
    pub fn succeeded(item_count: u64) -> Self {
        Self {
            item_count,
            success: true,
            ..Self::default()
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }

    /// Attaches downstream delivery figures
    pub fn with_push(mut self, pushed_count: u64, push_latency: Duration) -> Self {
        self.pushed_count = pushed_count;
        self.push_latency = Some(push_latency);
        self
    }
}

/// Performs the site-specific work of one cycle
///
/// `identity` is `None` in direct (no proxy) mode. Implementations report
/// failure through `WorkOutcome` rather than panicking; the orchestrator
/// bounds every call with its own timeout.
#[async_trait]
pub trait WorkCallback: Send + Sync {
    async fn execute(&self, identity: Option<&Identity>, subject: &str, max_items: u32)
        -> WorkOutcome;
}
