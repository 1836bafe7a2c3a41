use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::domain::{
    errors::DomainError,
    models::{MessageStatus, MessageUpdate},
    repositories::MessageQueueRepository,
};

/// Manual retry of a terminally failed message, triggered by an operator.
/// The attempt budget starts over; the next dispatch cycle picks it up.
pub struct RetryMessageUseCase {
    queue_repo: Arc<dyn MessageQueueRepository>,
}

impl RetryMessageUseCase {
    pub fn new(queue_repo: Arc<dyn MessageQueueRepository>) -> Self {
        Self { queue_repo }
    }

    pub async fn execute(&self, message_id: Uuid) -> anyhow::Result<()> {
        let message = self
            .queue_repo
            .get(message_id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("message {message_id}")))?;

        if message.status != MessageStatus::Failed {
            return Err(DomainError::Validation(
                "only failed messages can be retried".to_string(),
            )
            .into());
        }

        self.queue_repo
            .update(
                message_id,
                MessageUpdate {
                    status: Some(MessageStatus::Pending),
                    attempts: Some(0),
                    scheduled_at: Some(Utc::now()),
                    ..MessageUpdate::default()
                },
            )
            .await?;

        Ok(())
    }
}
