use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::{
    models::{
        DeliveryChannel, DeliveryOutcome, DispatchSettings, MessageStatus, MessageUpdate,
        NewQueuedMessage, QueuedMessage, RotationCursor,
    },
    repositories::{
        ChannelRepository, MessageQueueRepository, OrderRepository, SettingsRepository,
    },
};

pub struct InMemorySettingsRepository {
    settings: RwLock<DispatchSettings>,
}

impl InMemorySettingsRepository {
    pub fn new(settings: DispatchSettings) -> Self {
        Self {
            settings: RwLock::new(settings),
        }
    }
}

#[async_trait]
impl SettingsRepository for InMemorySettingsRepository {
    async fn get(&self) -> anyhow::Result<DispatchSettings> {
        Ok(self.settings.read().await.clone())
    }

    async fn update_rotation_cursor(
        &self,
        channel_id: Option<Uuid>,
        message_count: u32,
    ) -> anyhow::Result<()> {
        let mut settings = self.settings.write().await;
        settings.cursor = RotationCursor {
            channel_id,
            message_count,
        };
        Ok(())
    }

    async fn set_paused(&self, paused: bool) -> anyhow::Result<()> {
        let mut settings = self.settings.write().await;
        settings.paused = paused;
        Ok(())
    }
}

pub struct InMemoryChannelRepository {
    channels: RwLock<Vec<DeliveryChannel>>,
}

impl InMemoryChannelRepository {
    pub fn new(channels: Vec<DeliveryChannel>) -> Self {
        Self {
            channels: RwLock::new(channels),
        }
    }
}

#[async_trait]
impl ChannelRepository for InMemoryChannelRepository {
    async fn list_active(&self) -> anyhow::Result<Vec<DeliveryChannel>> {
        let channels = self.channels.read().await;
        let mut active: Vec<DeliveryChannel> =
            channels.iter().filter(|c| c.active).cloned().collect();
        active.sort_by(|a, b| a.priority.cmp(&b.priority).then(a.id.cmp(&b.id)));
        Ok(active)
    }
}

#[derive(Default)]
pub struct InMemoryMessageQueueRepository {
    messages: RwLock<HashMap<Uuid, QueuedMessage>>,
}

impl InMemoryMessageQueueRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageQueueRepository for InMemoryMessageQueueRepository {
    async fn enqueue(&self, message: NewQueuedMessage) -> anyhow::Result<QueuedMessage> {
        let now = Utc::now();
        let entry = QueuedMessage {
            id: Uuid::new_v4(),
            recipient: message.recipient,
            body: message.body,
            media: message.media,
            status: MessageStatus::Pending,
            attempts: 0,
            max_attempts: message.max_attempts,
            scheduled_at: message.scheduled_at.unwrap_or(now),
            sent_at: None,
            error_message: None,
            provider_message_id: None,
            order_id: message.order_id,
            channel_id: None,
            created_at: now,
            updated_at: now,
        };
        let mut messages = self.messages.write().await;
        messages.insert(entry.id, entry.clone());
        Ok(entry)
    }

    async fn claim_batch(
        &self,
        size: u32,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Vec<QueuedMessage>> {
        // single write-lock critical section keeps overlapping claims disjoint
        let mut messages = self.messages.write().await;

        let mut eligible: Vec<(DateTime<Utc>, DateTime<Utc>, Uuid)> = messages
            .values()
            .filter(|m| m.status == MessageStatus::Pending && m.scheduled_at <= now)
            .map(|m| (m.scheduled_at, m.created_at, m.id))
            .collect();
        eligible.sort();

        let mut claimed = Vec::new();
        for (_, _, id) in eligible.into_iter().take(size as usize) {
            if let Some(entry) = messages.get_mut(&id) {
                entry.status = MessageStatus::Processing;
                entry.updated_at = Utc::now();
                claimed.push(entry.clone());
            }
        }
        Ok(claimed)
    }

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<QueuedMessage>> {
        let messages = self.messages.read().await;
        Ok(messages.get(&id).cloned())
    }

    async fn update(&self, id: Uuid, update: MessageUpdate) -> anyhow::Result<()> {
        let mut messages = self.messages.write().await;
        if let Some(entry) = messages.get_mut(&id) {
            if let Some(status) = update.status {
                entry.status = status;
            }
            if let Some(attempts) = update.attempts {
                entry.attempts = attempts;
            }
            if let Some(scheduled_at) = update.scheduled_at {
                entry.scheduled_at = scheduled_at;
            }
            if let Some(sent_at) = update.sent_at {
                entry.sent_at = Some(sent_at);
            }
            if let Some(error_message) = update.error_message {
                entry.error_message = Some(error_message);
            }
            if let Some(provider_message_id) = update.provider_message_id {
                entry.provider_message_id = Some(provider_message_id);
            }
            if let Some(channel_id) = update.channel_id {
                entry.channel_id = Some(channel_id);
            }
            entry.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn count_pending(&self, now: DateTime<Utc>) -> anyhow::Result<u64> {
        let messages = self.messages.read().await;
        Ok(messages
            .values()
            .filter(|m| m.status == MessageStatus::Pending && m.scheduled_at <= now)
            .count() as u64)
    }

    async fn release_stale(&self, stale_before: DateTime<Utc>) -> anyhow::Result<u64> {
        let mut messages = self.messages.write().await;
        let mut released = 0;
        for entry in messages.values_mut() {
            if entry.status == MessageStatus::Processing && entry.updated_at < stale_before {
                entry.status = MessageStatus::Pending;
                entry.updated_at = Utc::now();
                released += 1;
            }
        }
        Ok(released)
    }
}

#[derive(Default)]
pub struct InMemoryOrderRepository {
    outcomes: RwLock<HashMap<Uuid, DeliveryOutcome>>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn outcome(&self, order_id: Uuid) -> Option<DeliveryOutcome> {
        self.outcomes.read().await.get(&order_id).copied()
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn update_delivery_outcome(
        &self,
        order_id: Uuid,
        outcome: DeliveryOutcome,
    ) -> anyhow::Result<()> {
        let mut outcomes = self.outcomes.write().await;
        outcomes.insert(order_id, outcome);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn pending(recipient: &str) -> NewQueuedMessage {
        NewQueuedMessage {
            recipient: recipient.to_string(),
            body: "hello".to_string(),
            media: None,
            order_id: None,
            scheduled_at: None,
            max_attempts: 3,
        }
    }

    #[tokio::test]
    async fn overlapping_claims_never_share_a_message() {
        let queue = Arc::new(InMemoryMessageQueueRepository::new());
        for i in 0..20 {
            queue
                .enqueue(pending(&format!("55469999900{i:02}")))
                .await
                .unwrap();
        }

        let now = Utc::now();
        let (first, second) = tokio::join!(queue.claim_batch(15, now), queue.claim_batch(15, now));
        let first = first.unwrap();
        let second = second.unwrap();

        let first_ids: HashSet<Uuid> = first.iter().map(|m| m.id).collect();
        let second_ids: HashSet<Uuid> = second.iter().map(|m| m.id).collect();
        assert!(first_ids.is_disjoint(&second_ids));
        assert_eq!(first.len() + second.len(), 20);
    }

    #[tokio::test]
    async fn claim_respects_the_schedule_and_batch_size() {
        let queue = InMemoryMessageQueueRepository::new();
        queue.enqueue(pending("5546999990001")).await.unwrap();
        queue.enqueue(pending("5546999990002")).await.unwrap();

        let mut future = pending("5546999990003");
        future.scheduled_at = Some(Utc::now() + chrono::Duration::hours(1));
        queue.enqueue(future).await.unwrap();

        let claimed = queue.claim_batch(10, Utc::now()).await.unwrap();
        assert_eq!(claimed.len(), 2, "future message is not eligible");

        let again = queue.claim_batch(10, Utc::now()).await.unwrap();
        assert!(again.is_empty(), "claimed messages are no longer pending");
    }

    #[tokio::test]
    async fn list_active_orders_by_priority() {
        let low = DeliveryChannel {
            id: Uuid::new_v4(),
            name: "backup".to_string(),
            active: true,
            priority: 5,
            api_type: crate::domain::models::ChannelApiType::Evolution,
            credentials: crate::domain::models::ChannelCredentials {
                base_url: "http://localhost".to_string(),
                instance: "backup".to_string(),
                token: "secret".to_string(),
            },
        };
        let mut high = low.clone();
        high.id = Uuid::new_v4();
        high.name = "primary".to_string();
        high.priority = 1;
        let mut disabled = low.clone();
        disabled.id = Uuid::new_v4();
        disabled.active = false;

        let repo = InMemoryChannelRepository::new(vec![low, high, disabled]);
        let active = repo.list_active().await.unwrap();
        assert_eq!(active.len(), 2);
        assert_eq!(active[0].name, "primary");
        assert_eq!(active[1].name, "backup");
    }
}
