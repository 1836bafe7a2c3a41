use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::{
    application::services::sender::{ChannelSender, SendReceipt},
    domain::models::{ChannelApiType, DeliveryChannel, MediaAttachment},
};

/// Sender for channels backed by an Evolution API instance.
pub struct EvolutionClient {
    http: Client,
}

impl EvolutionClient {
    pub fn new() -> Arc<dyn ChannelSender> {
        Arc::new(Self {
            http: Client::builder()
                .user_agent("courier/evolution")
                .build()
                .expect("failed to build evolution client"),
        }) as Arc<dyn ChannelSender>
    }
}

#[derive(Debug, Deserialize)]
struct EvolutionKey {
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EvolutionSendResponse {
    key: Option<EvolutionKey>,
}

#[async_trait]
impl ChannelSender for EvolutionClient {
    fn api_type(&self) -> ChannelApiType {
        ChannelApiType::Evolution
    }

    async fn send(
        &self,
        channel: &DeliveryChannel,
        recipient: &str,
        body: &str,
        media: Option<&MediaAttachment>,
    ) -> anyhow::Result<SendReceipt> {
        let credentials = &channel.credentials;

        let (url, payload) = match media {
            Some(attachment) => (
                format!(
                    "{}/message/sendMedia/{}",
                    credentials.base_url, credentials.instance
                ),
                json!({
                    "number": recipient,
                    "mediatype": attachment.kind.as_str(),
                    "media": attachment.url,
                    "caption": attachment.caption.clone().unwrap_or_else(|| body.to_string()),
                }),
            ),
            None => (
                format!(
                    "{}/message/sendText/{}",
                    credentials.base_url, credentials.instance
                ),
                json!({ "number": recipient, "text": body }),
            ),
        };

        let response = self
            .http
            .post(url)
            .header("apikey", &credentials.token)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            anyhow::bail!("evolution api returned {status}: {detail}");
        }

        let parsed: EvolutionSendResponse = response.json().await?;
        Ok(SendReceipt {
            provider_message_id: parsed.key.and_then(|key| key.id),
        })
    }
}
