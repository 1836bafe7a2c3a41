use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::models::{ChannelApiType, DeliveryChannel, MediaAttachment};

#[derive(Debug, Clone, Default)]
pub struct SendReceipt {
    pub provider_message_id: Option<String>,
}

/// Capability to deliver one message through one provider API family. The
/// only component that talks to the outside world per channel type.
#[async_trait]
pub trait ChannelSender: Send + Sync {
    fn api_type(&self) -> ChannelApiType;

    async fn send(
        &self,
        channel: &DeliveryChannel,
        recipient: &str,
        body: &str,
        media: Option<&MediaAttachment>,
    ) -> anyhow::Result<SendReceipt>;
}

#[derive(Clone)]
pub struct SenderGateway {
    senders: HashMap<ChannelApiType, Arc<dyn ChannelSender>>,
}

impl SenderGateway {
    pub fn new(senders: Vec<Arc<dyn ChannelSender>>) -> Self {
        let mut map = HashMap::new();
        for sender in senders {
            map.insert(sender.api_type(), sender);
        }
        Self { senders: map }
    }

    pub fn get(&self, api_type: ChannelApiType) -> Option<Arc<dyn ChannelSender>> {
        self.senders.get(&api_type).cloned()
    }
}
