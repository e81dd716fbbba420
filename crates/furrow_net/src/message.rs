//! Wire messages
//!
//! One JSON object per line: `{"protocol":1,"message":{"type":...}}`.

use serde::{Deserialize, Serialize};

use crate::{NetError, PROTOCOL_VERSION};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Message {
    /// Client asks the authority to end its turn.
    EndTurn,
    /// Client asks for the full world, e.g. after dropping a stale update.
    RequestSave,
    /// Full world state from the authority.
    #[serde(rename_all = "camelCase")]
    LoadSaveResponse {
        world_version: u64,
        world: serde_json::Value,
    },
}

impl Message {
    /// Wire tag, for logging without dumping payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            Message::EndTurn => "endTurn",
            Message::RequestSave => "requestSave",
            Message::LoadSaveResponse { .. } => "loadSaveResponse",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub protocol: u32,
    pub message: Message,
}

pub fn encode(message: &Message) -> Result<String, NetError> {
    let envelope = Envelope {
        protocol: PROTOCOL_VERSION,
        message: message.clone(),
    };
    Ok(serde_json::to_string(&envelope)?)
}

pub fn decode(line: &str) -> Result<Message, NetError> {
    let envelope: Envelope = serde_json::from_str(line)?;
    if envelope.protocol != PROTOCOL_VERSION {
        return Err(NetError::Protocol {
            expected: PROTOCOL_VERSION,
            found: envelope.protocol,
        });
    }
    Ok(envelope.message)
}
