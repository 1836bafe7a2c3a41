use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::{
    application::services::sender::{ChannelSender, SendReceipt},
    domain::models::{ChannelApiType, DeliveryChannel, MediaAttachment, MediaKind},
};

/// Sender for channels backed by a Z-API instance.
pub struct ZApiClient {
    http: Client,
}

impl ZApiClient {
    pub fn new() -> Arc<dyn ChannelSender> {
        Arc::new(Self {
            http: Client::builder()
                .user_agent("courier/zapi")
                .build()
                .expect("failed to build zapi client"),
        }) as Arc<dyn ChannelSender>
    }

    fn media_request(base: &str, recipient: &str, attachment: &MediaAttachment) -> (String, serde_json::Value) {
        match attachment.kind {
            MediaKind::Image => (
                format!("{base}/send-image"),
                json!({
                    "phone": recipient,
                    "image": attachment.url,
                    "caption": attachment.caption,
                }),
            ),
            MediaKind::Video => (
                format!("{base}/send-video"),
                json!({
                    "phone": recipient,
                    "video": attachment.url,
                    "caption": attachment.caption,
                }),
            ),
            MediaKind::Audio => (
                format!("{base}/send-audio"),
                json!({ "phone": recipient, "audio": attachment.url }),
            ),
            MediaKind::Document => (
                format!("{base}/send-document"),
                json!({
                    "phone": recipient,
                    "document": attachment.url,
                    "fileName": attachment.caption,
                }),
            ),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ZApiSendResponse {
    #[serde(rename = "messageId")]
    message_id: Option<String>,
    #[serde(rename = "zaapId")]
    zaap_id: Option<String>,
}

#[async_trait]
impl ChannelSender for ZApiClient {
    fn api_type(&self) -> ChannelApiType {
        ChannelApiType::ZApi
    }

    async fn send(
        &self,
        channel: &DeliveryChannel,
        recipient: &str,
        body: &str,
        media: Option<&MediaAttachment>,
    ) -> anyhow::Result<SendReceipt> {
        let credentials = &channel.credentials;
        let base = format!(
            "{}/instances/{}/token/{}",
            credentials.base_url, credentials.instance, credentials.token
        );

        let (url, payload) = match media {
            Some(attachment) => Self::media_request(&base, recipient, attachment),
            None => (
                format!("{base}/send-text"),
                json!({ "phone": recipient, "message": body }),
            ),
        };

        let response = self.http.post(url).json(&payload).send().await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            anyhow::bail!("zapi returned {status}: {detail}");
        }

        let parsed: ZApiSendResponse = response.json().await?;
        Ok(SendReceipt {
            provider_message_id: parsed.message_id.or(parsed.zaap_id),
        })
    }
}
