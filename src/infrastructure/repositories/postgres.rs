use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveTime, Utc, Weekday};
use sqlx::{FromRow, Pool, Postgres};
use uuid::Uuid;

use crate::domain::{
    models::{
        ChannelApiType, ChannelCredentials, DeliveryChannel, DeliveryOutcome, DispatchSettings,
        MediaAttachment, MediaKind, MessageStatus, MessageUpdate, NewQueuedMessage, QueuedMessage,
        RotationCursor, RotationMode, ScheduleWindow,
    },
    repositories::{
        ChannelRepository, MessageQueueRepository, OrderRepository, SettingsRepository,
    },
};

pub type PgPool = Pool<Postgres>;

#[derive(Clone)]
pub struct PostgresSettingsRepository {
    pool: PgPool,
}

impl PostgresSettingsRepository {
    pub fn new(pool: PgPool) -> Arc<Self> {
        Arc::new(Self { pool })
    }
}

#[derive(FromRow)]
struct SettingsRecord {
    delay_min_secs: i32,
    delay_max_secs: i32,
    paused: bool,
    rotation_enabled: bool,
    messages_per_channel: i32,
    current_channel_id: Option<Uuid>,
    message_count: i32,
    schedule_enabled: bool,
    schedule_days: Vec<i16>,
    schedule_start: NaiveTime,
    schedule_end: NaiveTime,
    schedule_utc_offset_minutes: i32,
}

fn weekday_from_iso(value: i16) -> Option<Weekday> {
    match value {
        1 => Some(Weekday::Mon),
        2 => Some(Weekday::Tue),
        3 => Some(Weekday::Wed),
        4 => Some(Weekday::Thu),
        5 => Some(Weekday::Fri),
        6 => Some(Weekday::Sat),
        7 => Some(Weekday::Sun),
        _ => None,
    }
}

impl From<SettingsRecord> for DispatchSettings {
    fn from(record: SettingsRecord) -> Self {
        let rotation = if record.rotation_enabled {
            RotationMode::Enabled {
                messages_per_channel: record.messages_per_channel.max(1) as u32,
            }
        } else {
            RotationMode::Disabled
        };

        let window = record.schedule_enabled.then(|| ScheduleWindow {
            days: record
                .schedule_days
                .iter()
                .copied()
                .filter_map(weekday_from_iso)
                .collect(),
            start: record.schedule_start,
            end: record.schedule_end,
            utc_offset_minutes: record.schedule_utc_offset_minutes,
        });

        DispatchSettings {
            delay_min_secs: record.delay_min_secs.max(0) as u32,
            delay_max_secs: record.delay_max_secs.max(0) as u32,
            paused: record.paused,
            rotation,
            cursor: RotationCursor {
                channel_id: record.current_channel_id,
                message_count: record.message_count.max(0) as u32,
            },
            window,
        }
    }
}

#[async_trait]
impl SettingsRepository for PostgresSettingsRepository {
    async fn get(&self) -> anyhow::Result<DispatchSettings> {
        let record = sqlx::query_as::<_, SettingsRecord>(
            r#"
            SELECT
                delay_min_secs,
                delay_max_secs,
                paused,
                rotation_enabled,
                messages_per_channel,
                current_channel_id,
                message_count,
                schedule_enabled,
                schedule_days,
                schedule_start,
                schedule_end,
                schedule_utc_offset_minutes
            FROM dispatch_settings
            WHERE id = 1
            "#,
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(record.into())
    }

    async fn update_rotation_cursor(
        &self,
        channel_id: Option<Uuid>,
        message_count: u32,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE dispatch_settings
            SET current_channel_id = $1,
                message_count = $2,
                updated_at = NOW()
            WHERE id = 1
            "#,
        )
        .bind(channel_id)
        .bind(message_count as i32)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn set_paused(&self, paused: bool) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE dispatch_settings
            SET paused = $1,
                updated_at = NOW()
            WHERE id = 1
            "#,
        )
        .bind(paused)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct PostgresChannelRepository {
    pool: PgPool,
}

impl PostgresChannelRepository {
    pub fn new(pool: PgPool) -> Arc<Self> {
        Arc::new(Self { pool })
    }
}

#[derive(FromRow)]
struct ChannelRecord {
    id: Uuid,
    name: String,
    active: bool,
    priority: i32,
    api_type: String,
    base_url: String,
    instance: String,
    token: String,
}

impl TryFrom<ChannelRecord> for DeliveryChannel {
    type Error = anyhow::Error;

    fn try_from(record: ChannelRecord) -> Result<Self, Self::Error> {
        let api_type = ChannelApiType::from_str(&record.api_type)
            .ok_or_else(|| anyhow::anyhow!("unknown channel api type: {}", record.api_type))?;
        Ok(DeliveryChannel {
            id: record.id,
            name: record.name,
            active: record.active,
            priority: record.priority,
            api_type,
            credentials: ChannelCredentials {
                base_url: record.base_url,
                instance: record.instance,
                token: record.token,
            },
        })
    }
}

#[async_trait]
impl ChannelRepository for PostgresChannelRepository {
    async fn list_active(&self) -> anyhow::Result<Vec<DeliveryChannel>> {
        let records = sqlx::query_as::<_, ChannelRecord>(
            r#"
            SELECT id, name, active, priority, api_type, base_url, instance, token
            FROM delivery_channels
            WHERE active
            ORDER BY priority, id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        records.into_iter().map(DeliveryChannel::try_from).collect()
    }
}

#[derive(Clone)]
pub struct PostgresMessageQueueRepository {
    pool: PgPool,
}

impl PostgresMessageQueueRepository {
    pub fn new(pool: PgPool) -> Arc<Self> {
        Arc::new(Self { pool })
    }
}

const MESSAGE_COLUMNS: &str = r#"
    id, recipient, body, media_url, media_type, media_caption,
    status, attempts, max_attempts, scheduled_at, sent_at,
    error_message, provider_message_id, order_id, channel_id,
    created_at, updated_at
"#;

#[derive(FromRow)]
struct MessageRecord {
    id: Uuid,
    recipient: String,
    body: String,
    media_url: Option<String>,
    media_type: Option<String>,
    media_caption: Option<String>,
    status: String,
    attempts: i32,
    max_attempts: i32,
    scheduled_at: DateTime<Utc>,
    sent_at: Option<DateTime<Utc>>,
    error_message: Option<String>,
    provider_message_id: Option<String>,
    order_id: Option<Uuid>,
    channel_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<MessageRecord> for QueuedMessage {
    type Error = anyhow::Error;

    fn try_from(record: MessageRecord) -> Result<Self, Self::Error> {
        let status = MessageStatus::from_str(&record.status)
            .ok_or_else(|| anyhow::anyhow!("unknown message status: {}", record.status))?;

        let media = match (record.media_url, record.media_type) {
            (Some(url), Some(kind)) => Some(MediaAttachment {
                url,
                kind: MediaKind::from_str(&kind)
                    .ok_or_else(|| anyhow::anyhow!("unknown media kind: {kind}"))?,
                caption: record.media_caption,
            }),
            _ => None,
        };

        Ok(QueuedMessage {
            id: record.id,
            recipient: record.recipient,
            body: record.body,
            media,
            status,
            attempts: record.attempts.max(0) as u32,
            max_attempts: record.max_attempts.max(0) as u32,
            scheduled_at: record.scheduled_at,
            sent_at: record.sent_at,
            error_message: record.error_message,
            provider_message_id: record.provider_message_id,
            order_id: record.order_id,
            channel_id: record.channel_id,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }
}

#[async_trait]
impl MessageQueueRepository for PostgresMessageQueueRepository {
    async fn enqueue(&self, message: NewQueuedMessage) -> anyhow::Result<QueuedMessage> {
        let query = format!(
            r#"
            INSERT INTO message_queue (
                recipient, body, media_url, media_type, media_caption,
                scheduled_at, max_attempts, order_id
            ) VALUES ($1, $2, $3, $4, $5, COALESCE($6, NOW()), $7, $8)
            RETURNING {MESSAGE_COLUMNS}
            "#
        );
        let record = sqlx::query_as::<_, MessageRecord>(&query)
            .bind(&message.recipient)
            .bind(&message.body)
            .bind(message.media.as_ref().map(|m| m.url.clone()))
            .bind(message.media.as_ref().map(|m| m.kind.as_str()))
            .bind(message.media.as_ref().and_then(|m| m.caption.clone()))
            .bind(message.scheduled_at)
            .bind(message.max_attempts as i32)
            .bind(message.order_id)
            .fetch_one(&self.pool)
            .await?;
        record.try_into()
    }

    async fn claim_batch(
        &self,
        size: u32,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Vec<QueuedMessage>> {
        // one statement so overlapping cycles cannot claim the same row;
        // SKIP LOCKED lets a concurrent claimer take the rows we left behind
        let query = format!(
            r#"
            UPDATE message_queue
            SET status = 'processing', updated_at = NOW()
            WHERE id IN (
                SELECT id FROM message_queue
                WHERE status = 'pending' AND scheduled_at <= $1
                ORDER BY scheduled_at, created_at
                LIMIT $2
                FOR UPDATE SKIP LOCKED
            )
            RETURNING {MESSAGE_COLUMNS}
            "#
        );
        let records = sqlx::query_as::<_, MessageRecord>(&query)
            .bind(now)
            .bind(size as i64)
            .fetch_all(&self.pool)
            .await?;

        records.into_iter().map(QueuedMessage::try_from).collect()
    }

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<QueuedMessage>> {
        let query = format!("SELECT {MESSAGE_COLUMNS} FROM message_queue WHERE id = $1");
        let record = sqlx::query_as::<_, MessageRecord>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        record.map(QueuedMessage::try_from).transpose()
    }

    async fn update(&self, id: Uuid, update: MessageUpdate) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE message_queue
            SET status = COALESCE($2, status),
                attempts = COALESCE($3, attempts),
                scheduled_at = COALESCE($4, scheduled_at),
                sent_at = COALESCE($5, sent_at),
                error_message = COALESCE($6, error_message),
                provider_message_id = COALESCE($7, provider_message_id),
                channel_id = COALESCE($8, channel_id),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(update.status.map(|s| s.as_str()))
        .bind(update.attempts.map(|a| a as i32))
        .bind(update.scheduled_at)
        .bind(update.sent_at)
        .bind(update.error_message)
        .bind(update.provider_message_id)
        .bind(update.channel_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn count_pending(&self, now: DateTime<Utc>) -> anyhow::Result<u64> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM message_queue
            WHERE status = 'pending' AND scheduled_at <= $1
            "#,
        )
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(count.max(0) as u64)
    }

    async fn release_stale(&self, stale_before: DateTime<Utc>) -> anyhow::Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE message_queue
            SET status = 'pending', updated_at = NOW()
            WHERE status = 'processing' AND updated_at < $1
            "#,
        )
        .bind(stale_before)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

#[derive(Clone)]
pub struct PostgresOrderRepository {
    pool: PgPool,
}

impl PostgresOrderRepository {
    pub fn new(pool: PgPool) -> Arc<Self> {
        Arc::new(Self { pool })
    }
}

#[async_trait]
impl OrderRepository for PostgresOrderRepository {
    async fn update_delivery_outcome(
        &self,
        order_id: Uuid,
        outcome: DeliveryOutcome,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE orders
            SET delivery_status = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(order_id)
        .bind(outcome.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
