use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::domain::{
    models::DispatchSettings,
    repositories::{ChannelRepository, MessageQueueRepository},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Proceed,
    Skip(&'static str),
}

/// Preconditions checked before a cycle does any work. A negative result
/// aborts the cycle before anything is claimed or locked.
pub struct GateEvaluator {
    queue_repo: Arc<dyn MessageQueueRepository>,
    channel_repo: Arc<dyn ChannelRepository>,
}

impl GateEvaluator {
    pub fn new(
        queue_repo: Arc<dyn MessageQueueRepository>,
        channel_repo: Arc<dyn ChannelRepository>,
    ) -> Self {
        Self {
            queue_repo,
            channel_repo,
        }
    }

    pub async fn evaluate(
        &self,
        settings: &DispatchSettings,
        now: DateTime<Utc>,
    ) -> anyhow::Result<GateDecision> {
        if self.queue_repo.count_pending(now).await? == 0 {
            return Ok(GateDecision::Skip("no pending messages"));
        }

        if settings.paused {
            return Ok(GateDecision::Skip("dispatching is paused"));
        }

        if let Some(window) = &settings.window {
            if !window.contains(now) {
                return Ok(GateDecision::Skip("outside the delivery window"));
            }
        }

        if self.channel_repo.list_active().await?.is_empty() {
            return Ok(GateDecision::Skip("no active delivery channels"));
        }

        Ok(GateDecision::Proceed)
    }
}
