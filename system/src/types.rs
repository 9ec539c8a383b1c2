use serde::{Deserialize, Serialize};
use std::fmt;

pub type SessionId = uuid::Uuid;

const ROOM_CODE_LEN: usize = 6;
const ROOM_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Name of a collaboration channel. Chosen by clients, or generated with
/// [`RoomId::generate`].
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Random room code made of uppercase letters, e.g. `QKZTAB`.
    pub fn generate() -> Self {
        let bytes = uuid::Uuid::new_v4();
        let code = bytes
            .as_bytes()
            .iter()
            .take(ROOM_CODE_LEN)
            .map(|b| ROOM_CODE_ALPHABET[*b as usize % ROOM_CODE_ALPHABET.len()] as char)
            .collect::<String>();
        Self(code)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub room: RoomId,
    pub user_count: usize,
    pub usernames: Vec<String>,
}

impl RoomSummary {
    pub fn empty(room: RoomId) -> Self {
        Self {
            room,
            user_count: 0,
            usernames: Vec::new(),
        }
    }
}
