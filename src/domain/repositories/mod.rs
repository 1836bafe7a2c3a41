use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::models::{
    DeliveryChannel, DeliveryOutcome, DispatchSettings, MessageUpdate, NewQueuedMessage,
    QueuedMessage,
};

#[async_trait]
pub trait SettingsRepository: Send + Sync {
    async fn get(&self) -> anyhow::Result<DispatchSettings>;

    async fn update_rotation_cursor(
        &self,
        channel_id: Option<Uuid>,
        message_count: u32,
    ) -> anyhow::Result<()>;

    async fn set_paused(&self, paused: bool) -> anyhow::Result<()>;
}

#[async_trait]
pub trait ChannelRepository: Send + Sync {
    /// Active channels ordered by priority rank, ties broken by id.
    async fn list_active(&self) -> anyhow::Result<Vec<DeliveryChannel>>;
}

#[async_trait]
pub trait MessageQueueRepository: Send + Sync {
    async fn enqueue(&self, message: NewQueuedMessage) -> anyhow::Result<QueuedMessage>;

    /// Atomically selects up to `size` pending messages due at `now` and
    /// flips them to `processing`. Two overlapping calls must never return
    /// the same message.
    async fn claim_batch(&self, size: u32, now: DateTime<Utc>) -> anyhow::Result<Vec<QueuedMessage>>;

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<QueuedMessage>>;

    async fn update(&self, id: Uuid, update: MessageUpdate) -> anyhow::Result<()>;

    async fn count_pending(&self, now: DateTime<Utc>) -> anyhow::Result<u64>;

    /// Returns messages stuck in `processing` since before `stale_before`
    /// back to `pending`, and reports how many were released.
    async fn release_stale(&self, stale_before: DateTime<Utc>) -> anyhow::Result<u64>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn update_delivery_outcome(
        &self,
        order_id: Uuid,
        outcome: DeliveryOutcome,
    ) -> anyhow::Result<()>;
}
