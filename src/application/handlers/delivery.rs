use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{info, warn};

use crate::{
    application::services::{
        rotation::{ChannelChoice, RotationEngine},
        sender::{SendReceipt, SenderGateway},
    },
    domain::{
        models::{DeliveryOutcome, MessageStatus, MessageUpdate, QueuedMessage},
        repositories::{MessageQueueRepository, OrderRepository},
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOutcome {
    Sent,
    Retried,
    Failed,
    Skipped,
}

/// Drives one claimed message through its state machine: re-validate the
/// claim, resolve a channel, send, and record the outcome on the message,
/// the linked order, and the rotation cursor.
pub struct DeliveryExecutor {
    queue_repo: Arc<dyn MessageQueueRepository>,
    order_repo: Arc<dyn OrderRepository>,
    gateway: SenderGateway,
    retry_backoff: Duration,
}

impl DeliveryExecutor {
    pub fn new(
        queue_repo: Arc<dyn MessageQueueRepository>,
        order_repo: Arc<dyn OrderRepository>,
        gateway: SenderGateway,
        retry_backoff_secs: u64,
    ) -> Self {
        Self {
            queue_repo,
            order_repo,
            gateway,
            retry_backoff: Duration::seconds(retry_backoff_secs as i64),
        }
    }

    pub async fn process(
        &self,
        claimed: &QueuedMessage,
        rotation: &mut RotationEngine,
    ) -> anyhow::Result<MessageOutcome> {
        // Re-read before acting; an overlapping cycle may have finished this
        // message already.
        let Some(message) = self.queue_repo.get(claimed.id).await? else {
            return Ok(MessageOutcome::Skipped);
        };
        if message.status != MessageStatus::Processing {
            return Ok(MessageOutcome::Skipped);
        }

        let choice = rotation.select(&message.recipient);
        let attempts = message.attempts + 1;

        match self.try_send(&message, &choice).await {
            Ok(receipt) => {
                self.queue_repo
                    .update(
                        message.id,
                        MessageUpdate {
                            status: Some(MessageStatus::Sent),
                            attempts: Some(attempts),
                            sent_at: Some(Utc::now()),
                            provider_message_id: receipt.provider_message_id,
                            channel_id: Some(choice.channel.id),
                            ..MessageUpdate::default()
                        },
                    )
                    .await?;
                self.mirror_order(&message, DeliveryOutcome::Delivered).await;
                rotation.record_success(&choice).await?;
                info!(
                    message_id = %message.id,
                    channel = %choice.channel.name,
                    "message sent"
                );
                Ok(MessageOutcome::Sent)
            }
            Err(err) => {
                let reason = err.to_string();
                warn!(
                    message_id = %message.id,
                    channel = %choice.channel.name,
                    attempts,
                    error = %reason,
                    "send failed"
                );

                let outcome = if attempts >= message.max_attempts {
                    self.queue_repo
                        .update(
                            message.id,
                            MessageUpdate {
                                status: Some(MessageStatus::Failed),
                                attempts: Some(attempts),
                                error_message: Some(reason),
                                channel_id: Some(choice.channel.id),
                                ..MessageUpdate::default()
                            },
                        )
                        .await?;
                    self.mirror_order(&message, DeliveryOutcome::DeliveryFailed)
                        .await;
                    MessageOutcome::Failed
                } else {
                    self.queue_repo
                        .update(
                            message.id,
                            MessageUpdate {
                                status: Some(MessageStatus::Pending),
                                attempts: Some(attempts),
                                scheduled_at: Some(Utc::now() + self.retry_backoff),
                                error_message: Some(reason),
                                ..MessageUpdate::default()
                            },
                        )
                        .await?;
                    MessageOutcome::Retried
                };

                rotation.record_failure().await?;
                Ok(outcome)
            }
        }
    }

    async fn try_send(
        &self,
        message: &QueuedMessage,
        choice: &ChannelChoice,
    ) -> anyhow::Result<SendReceipt> {
        let sender = self.gateway.get(choice.channel.api_type).ok_or_else(|| {
            anyhow::anyhow!(
                "no sender registered for api type {}",
                choice.channel.api_type.as_str()
            )
        })?;
        sender
            .send(
                &choice.channel,
                &message.recipient,
                &message.body,
                message.media.as_ref(),
            )
            .await
    }

    /// Best-effort mirror; a failure here must not change the message
    /// outcome.
    async fn mirror_order(&self, message: &QueuedMessage, outcome: DeliveryOutcome) {
        let Some(order_id) = message.order_id else {
            return;
        };
        if let Err(err) = self
            .order_repo
            .update_delivery_outcome(order_id, outcome)
            .await
        {
            warn!(order_id = %order_id, error = %err, "order status update failed");
        }
    }
}
