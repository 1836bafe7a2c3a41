use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ChannelApiType {
    Evolution,
    ZApi,
}

impl ChannelApiType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelApiType::Evolution => "evolution",
            ChannelApiType::ZApi => "zapi",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "evolution" => Some(ChannelApiType::Evolution),
            "zapi" => Some(ChannelApiType::ZApi),
            _ => None,
        }
    }
}

/// Provider credentials; the dispatcher passes these through to the sender
/// without interpreting them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelCredentials {
    pub base_url: String,
    pub instance: String,
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryChannel {
    pub id: Uuid,
    pub name: String,
    pub active: bool,
    pub priority: i32,
    pub api_type: ChannelApiType,
    pub credentials: ChannelCredentials,
}
