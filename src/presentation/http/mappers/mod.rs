use crate::{
    domain::models::QueuedMessage,
    presentation::http::responses::QueuedMessageDto,
};

pub fn map_message(message: &QueuedMessage) -> QueuedMessageDto {
    QueuedMessageDto {
        id: message.id,
        recipient: message.recipient.clone(),
        body: message.body.clone(),
        media_url: message.media.as_ref().map(|m| m.url.clone()),
        media_type: message.media.as_ref().map(|m| m.kind.into()),
        media_caption: message.media.as_ref().and_then(|m| m.caption.clone()),
        status: message.status.into(),
        attempts: message.attempts,
        max_attempts: message.max_attempts,
        scheduled_at: message.scheduled_at.to_rfc3339(),
        sent_at: message.sent_at.map(|t| t.to_rfc3339()),
        error_message: message.error_message.clone(),
        provider_message_id: message.provider_message_id.clone(),
        order_id: message.order_id,
        channel_id: message.channel_id,
        created_at: message.created_at.to_rfc3339(),
        updated_at: message.updated_at.to_rfc3339(),
    }
}
