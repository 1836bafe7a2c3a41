use poem_openapi::Object;
use uuid::Uuid;

use crate::presentation::models::{MediaKindDto, MessageStatusDto};

#[derive(Object)]
pub struct DispatchCycleResponseDto {
    pub success: bool,
    pub processed: u32,
    pub sent: u32,
    pub failed: u32,
    pub message: Option<String>,
}

#[derive(Object)]
pub struct SetPausedResponseDto {
    pub success: bool,
    pub paused: bool,
}

#[derive(Object)]
pub struct SweepResponseDto {
    pub success: bool,
    pub requeued: u64,
}

#[derive(Object)]
pub struct EnqueueMessageResponseDto {
    pub message_id: Uuid,
}

#[derive(Object)]
pub struct RetryMessageResponseDto {
    pub success: bool,
}

#[derive(Object)]
pub struct QueuedMessageDto {
    pub id: Uuid,
    pub recipient: String,
    pub body: String,
    pub media_url: Option<String>,
    pub media_type: Option<MediaKindDto>,
    pub media_caption: Option<String>,
    pub status: MessageStatusDto,
    pub attempts: u32,
    pub max_attempts: u32,
    pub scheduled_at: String,
    pub sent_at: Option<String>,
    pub error_message: Option<String>,
    pub provider_message_id: Option<String>,
    pub order_id: Option<Uuid>,
    pub channel_id: Option<Uuid>,
    pub created_at: String,
    pub updated_at: String,
}
