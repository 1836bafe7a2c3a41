use std::sync::Arc;

use uuid::Uuid;

use crate::domain::{
    errors::DomainError, models::QueuedMessage, repositories::MessageQueueRepository,
};

pub struct GetMessageUseCase {
    queue_repo: Arc<dyn MessageQueueRepository>,
}

impl GetMessageUseCase {
    pub fn new(queue_repo: Arc<dyn MessageQueueRepository>) -> Self {
        Self { queue_repo }
    }

    pub async fn execute(&self, message_id: Uuid) -> anyhow::Result<QueuedMessage> {
        self.queue_repo
            .get(message_id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("message {message_id}")).into())
    }
}
