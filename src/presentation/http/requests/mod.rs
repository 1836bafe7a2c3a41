use chrono::{DateTime, Utc};
use poem_openapi::Object;
use uuid::Uuid;

use crate::presentation::models::MediaKindDto;

#[derive(Object)]
pub struct EnqueueMessageRequestDto {
    pub recipient: String,
    pub body: String,
    pub media_url: Option<String>,
    pub media_type: Option<MediaKindDto>,
    pub media_caption: Option<String>,
    pub order_id: Option<Uuid>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub max_attempts: Option<u32>,
}

#[derive(Object)]
pub struct SetPausedRequestDto {
    pub paused: bool,
}
