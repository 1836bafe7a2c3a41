use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::warn;

use crate::domain::repositories::MessageQueueRepository;

pub struct RequeueStaleConfig {
    pub stale_after_secs: u64,
}

/// Operational safeguard: a cycle aborted by its host (timeout, crash) can
/// leave claimed messages in `processing` forever. This sweep returns them
/// to the eligible pool once they are older than the staleness threshold.
pub struct RequeueStaleUseCase {
    queue_repo: Arc<dyn MessageQueueRepository>,
    config: RequeueStaleConfig,
}

pub struct RequeueStaleResponse {
    pub requeued: u64,
}

impl RequeueStaleUseCase {
    pub fn new(queue_repo: Arc<dyn MessageQueueRepository>, config: RequeueStaleConfig) -> Self {
        Self { queue_repo, config }
    }

    pub async fn execute(&self) -> anyhow::Result<RequeueStaleResponse> {
        let stale_before = Utc::now() - Duration::seconds(self.config.stale_after_secs as i64);
        let requeued = self.queue_repo.release_stale(stale_before).await?;
        if requeued > 0 {
            warn!(requeued, "returned stale processing messages to the queue");
        }
        Ok(RequeueStaleResponse { requeued })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::domain::models::{MessageStatus, NewQueuedMessage};
    use crate::infrastructure::repositories::in_memory::InMemoryMessageQueueRepository;

    #[tokio::test]
    async fn stuck_processing_messages_are_returned_to_pending() {
        let queue = Arc::new(InMemoryMessageQueueRepository::new());
        let message = queue
            .enqueue(NewQueuedMessage {
                recipient: "5546999990001".to_string(),
                body: "hello".to_string(),
                media: None,
                order_id: None,
                scheduled_at: None,
                max_attempts: 3,
            })
            .await
            .unwrap();
        queue.claim_batch(1, Utc::now()).await.unwrap();

        // zero threshold makes the fresh claim immediately stale
        let sweep = RequeueStaleUseCase::new(
            queue.clone(),
            RequeueStaleConfig {
                stale_after_secs: 0,
            },
        );
        let response = sweep.execute().await.unwrap();
        assert_eq!(response.requeued, 1);

        let stored = queue.get(message.id).await.unwrap().unwrap();
        assert_eq!(stored.status, MessageStatus::Pending);
    }

    #[tokio::test]
    async fn fresh_claims_are_left_alone() {
        let queue = Arc::new(InMemoryMessageQueueRepository::new());
        queue
            .enqueue(NewQueuedMessage {
                recipient: "5546999990001".to_string(),
                body: "hello".to_string(),
                media: None,
                order_id: None,
                scheduled_at: None,
                max_attempts: 3,
            })
            .await
            .unwrap();
        queue.claim_batch(1, Utc::now()).await.unwrap();

        let sweep = RequeueStaleUseCase::new(
            queue.clone(),
            RequeueStaleConfig {
                stale_after_secs: 900,
            },
        );
        let response = sweep.execute().await.unwrap();
        assert_eq!(response.requeued, 0);
    }
}
