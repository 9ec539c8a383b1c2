use crate::{RoomId, SessionId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Envelope of every frame a client sends: `{"event": ..., "data": ...}`.
///
/// Stroke and state payloads are kept as raw JSON so the relay forwards
/// exactly what it received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "lowercase")]
pub enum ClientMessage {
    Join(JoinRequest),
    Stroke(Value),
    State(Value),
    Clear,
}

impl ClientMessage {
    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn decode_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JoinRequest {
    #[serde(default)]
    pub room: Option<RoomId>,
    #[serde(default)]
    pub username: Option<String>,
}

impl JoinRequest {
    pub fn new(room: impl Into<RoomId>, username: impl Into<String>) -> Self {
        Self {
            room: Some(room.into()),
            username: Some(username.into()),
        }
    }

    /// Returns room and username only when both are present and non-empty.
    pub fn validated(&self) -> Option<(&RoomId, &str)> {
        match (&self.room, &self.username) {
            (Some(room), Some(username)) if !room.is_empty() && !username.is_empty() => {
                Some((room, username.as_str()))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerMessage {
    #[serde(rename = "user:joined")]
    UserJoined { username: String, id: SessionId },
    #[serde(rename = "room:info")]
    RoomInfo {
        room: RoomId,
        #[serde(rename = "userCount")]
        user_count: usize,
    },
    #[serde(rename = "room:count")]
    RoomCount { count: usize },
    #[serde(rename = "stroke")]
    Stroke(Value),
    #[serde(rename = "state")]
    State(Value),
    #[serde(rename = "clear")]
    Clear,
}

impl ServerMessage {
    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
