use poem_openapi::Enum;

use crate::application::usecases::run_dispatch_cycle::DispatchSource;
use crate::domain::models::{MediaKind, MessageStatus};

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq)]
#[oai(rename_all = "snake_case")]
pub enum MessageStatusDto {
    Pending,
    Processing,
    Sent,
    Failed,
}

impl From<MessageStatus> for MessageStatusDto {
    fn from(status: MessageStatus) -> Self {
        match status {
            MessageStatus::Pending => MessageStatusDto::Pending,
            MessageStatus::Processing => MessageStatusDto::Processing,
            MessageStatus::Sent => MessageStatusDto::Sent,
            MessageStatus::Failed => MessageStatusDto::Failed,
        }
    }
}

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq)]
#[oai(rename_all = "snake_case")]
pub enum MediaKindDto {
    Image,
    Video,
    Audio,
    Document,
}

impl From<MediaKindDto> for MediaKind {
    fn from(kind: MediaKindDto) -> Self {
        match kind {
            MediaKindDto::Image => MediaKind::Image,
            MediaKindDto::Video => MediaKind::Video,
            MediaKindDto::Audio => MediaKind::Audio,
            MediaKindDto::Document => MediaKind::Document,
        }
    }
}

impl From<MediaKind> for MediaKindDto {
    fn from(kind: MediaKind) -> Self {
        match kind {
            MediaKind::Image => MediaKindDto::Image,
            MediaKind::Video => MediaKindDto::Video,
            MediaKind::Audio => MediaKindDto::Audio,
            MediaKind::Document => MediaKindDto::Document,
        }
    }
}

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq)]
#[oai(rename_all = "snake_case")]
pub enum DispatchSourceDto {
    Cron,
    Trigger,
    Manual,
}

impl From<DispatchSourceDto> for DispatchSource {
    fn from(source: DispatchSourceDto) -> Self {
        match source {
            DispatchSourceDto::Cron => DispatchSource::Cron,
            DispatchSourceDto::Trigger => DispatchSource::Trigger,
            DispatchSourceDto::Manual => DispatchSource::Manual,
        }
    }
}
