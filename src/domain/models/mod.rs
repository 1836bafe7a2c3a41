pub mod channel;
pub mod message;
pub mod order;
pub mod settings;

pub use channel::{ChannelApiType, ChannelCredentials, DeliveryChannel};
pub use message::{
    MediaAttachment, MediaKind, MessageStatus, MessageUpdate, NewQueuedMessage, QueuedMessage,
};
pub use order::DeliveryOutcome;
pub use settings::{DispatchSettings, RotationCursor, RotationMode, ScheduleWindow};
