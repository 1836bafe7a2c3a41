use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    errors::DomainError,
    models::{MediaAttachment, NewQueuedMessage},
    repositories::MessageQueueRepository,
    value_objects::PhoneNumber,
};

pub struct EnqueueMessageConfig {
    pub default_max_attempts: u32,
}

pub struct EnqueueMessageUseCase {
    queue_repo: Arc<dyn MessageQueueRepository>,
    config: EnqueueMessageConfig,
}

pub struct EnqueueMessageRequest {
    pub recipient: String,
    pub body: String,
    pub media: Option<MediaAttachment>,
    pub order_id: Option<Uuid>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub max_attempts: Option<u32>,
}

#[derive(Debug)]
pub struct EnqueueMessageResponse {
    pub message_id: Uuid,
}

impl EnqueueMessageUseCase {
    pub fn new(queue_repo: Arc<dyn MessageQueueRepository>, config: EnqueueMessageConfig) -> Self {
        Self { queue_repo, config }
    }

    pub async fn execute(
        &self,
        request: EnqueueMessageRequest,
    ) -> anyhow::Result<EnqueueMessageResponse> {
        let recipient = PhoneNumber::normalize(&request.recipient)?;

        if request.body.trim().is_empty() && request.media.is_none() {
            return Err(
                DomainError::Validation("message needs a body or a media attachment".to_string())
                    .into(),
            );
        }

        let message = self
            .queue_repo
            .enqueue(NewQueuedMessage {
                recipient: recipient.into_inner(),
                body: request.body,
                media: request.media,
                order_id: request.order_id,
                scheduled_at: request.scheduled_at,
                max_attempts: request
                    .max_attempts
                    .unwrap_or(self.config.default_max_attempts),
            })
            .await?;

        Ok(EnqueueMessageResponse {
            message_id: message.id,
        })
    }
}
