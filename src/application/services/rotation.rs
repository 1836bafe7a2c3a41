use std::sync::Arc;

use tracing::debug;

use crate::domain::{
    models::{DeliveryChannel, DispatchSettings, RotationMode},
    repositories::SettingsRepository,
};

#[derive(Debug, Clone)]
pub struct ChannelChoice {
    pub channel: DeliveryChannel,
    pub new_recipient: bool,
}

/// Decides which channel serves each message of a batch and keeps the
/// persisted round-robin cursor current while doing so.
///
/// Selection rules, in order: a message to the same recipient as the
/// previous one reuses that exact channel; a message to a new recipient is
/// served by the cursor channel, advancing it first when the counter has
/// reached the configured threshold; with rotation disabled (or a single
/// channel) the highest-priority channel serves everyone. A failed send
/// forces the cursor to the next channel immediately so a broken channel is
/// abandoned within one message.
///
/// The cursor is written back after every successful send to a new recipient
/// and after every forced rotation. Same-recipient reuses deliberately skip
/// the write.
pub struct RotationEngine {
    settings_repo: Arc<dyn SettingsRepository>,
    channels: Vec<DeliveryChannel>,
    mode: RotationMode,
    cursor: usize,
    message_count: u32,
    last_recipient: Option<String>,
    last_channel: Option<usize>,
}

impl RotationEngine {
    /// `channels` must be non-empty, active, and in priority order.
    pub fn new(
        settings_repo: Arc<dyn SettingsRepository>,
        channels: Vec<DeliveryChannel>,
        settings: &DispatchSettings,
    ) -> Self {
        // Seed from the persisted cursor; a channel that was deactivated
        // since the cursor was written falls back to the head of the list.
        let cursor = settings
            .cursor
            .channel_id
            .and_then(|id| channels.iter().position(|c| c.id == id))
            .unwrap_or(0);

        Self {
            settings_repo,
            channels,
            mode: settings.rotation,
            cursor,
            message_count: settings.cursor.message_count,
            last_recipient: None,
            last_channel: None,
        }
    }

    pub fn select(&mut self, recipient: &str) -> ChannelChoice {
        if let (Some(last), Some(index)) = (self.last_recipient.as_deref(), self.last_channel) {
            if last == recipient {
                return ChannelChoice {
                    channel: self.channels[index].clone(),
                    new_recipient: false,
                };
            }
        }

        let index = match self.mode {
            RotationMode::Enabled {
                messages_per_channel,
            } if self.channels.len() > 1 => {
                if self.message_count >= messages_per_channel {
                    self.cursor = (self.cursor + 1) % self.channels.len();
                    self.message_count = 0;
                    debug!(channel = %self.channels[self.cursor].name, "rotation threshold reached");
                }
                self.cursor
            }
            _ => 0,
        };

        self.last_recipient = Some(recipient.to_string());
        self.last_channel = Some(index);

        ChannelChoice {
            channel: self.channels[index].clone(),
            new_recipient: true,
        }
    }

    /// Counts a successful send to a new recipient against the cursor and
    /// persists it. Same-recipient reuses never move the counter.
    pub async fn record_success(&mut self, choice: &ChannelChoice) -> anyhow::Result<()> {
        if !choice.new_recipient || matches!(self.mode, RotationMode::Disabled) {
            return Ok(());
        }
        self.message_count += 1;
        self.persist().await
    }

    /// Forced rotation: leave the failing channel before the next message is
    /// attempted, regardless of the counter. Sticky affinity is dropped so a
    /// mid-run retry also lands on the new channel.
    pub async fn record_failure(&mut self) -> anyhow::Result<()> {
        self.last_recipient = None;
        self.last_channel = None;

        if matches!(self.mode, RotationMode::Disabled) || self.channels.len() < 2 {
            return Ok(());
        }

        self.cursor = (self.cursor + 1) % self.channels.len();
        self.message_count = 0;
        debug!(channel = %self.channels[self.cursor].name, "rotated away from failing channel");
        self.persist().await
    }

    async fn persist(&self) -> anyhow::Result<()> {
        let channel_id = self.channels.get(self.cursor).map(|c| c.id);
        self.settings_repo
            .update_rotation_cursor(channel_id, self.message_count)
            .await
    }
}
