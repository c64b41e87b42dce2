use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::models::resource::Method;

/// Bytes carried by an observed event, kept as text whenever they decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    Text(String),
    Binary(Vec<u8>),
}

impl From<&[u8]> for Payload {
    fn from(bytes: &[u8]) -> Self {
        match std::str::from_utf8(bytes) {
            Ok(text) => Payload::Text(text.to_string()),
            Err(_) => Payload::Binary(bytes.to_vec()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoapRecord {
    #[serde(with = "time::serde::rfc3339")]
    pub observed_at: OffsetDateTime,
    pub method: Method,
    pub path: String,
    /// Dotted response code, e.g. `2.05`.
    pub code: String,
    pub message_id: u16,
    /// Lowercase hex.
    pub token: String,
    pub payload: Payload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MqttRecord {
    #[serde(with = "time::serde::rfc3339")]
    pub observed_at: OffsetDateTime,
    pub topic: String,
    pub payload: Payload,
    pub qos: u8,
    pub retain: bool,
}

/// One observed network event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "kebab-case")]
pub enum Record {
    CoapResponse(CoapRecord),
    MqttMessage(MqttRecord),
}

/// On-disk shape of a capture run: `{"messages": [...]}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogDocument {
    pub messages: Vec<Record>,
}
