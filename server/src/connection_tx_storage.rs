use std::collections::HashMap;
use system::{ServerMessage, SessionId};
use tokio::sync::mpsc::error::TrySendError;

pub type ConnectionTx = tokio::sync::mpsc::Sender<ServerMessage>;

/// Outbound channels of live connections, keyed by session.
pub struct ConnectionTxStorage {
    connection_txs: HashMap<SessionId, ConnectionTx>,
}

impl ConnectionTxStorage {
    pub fn new() -> Self {
        Self {
            connection_txs: HashMap::new(),
        }
    }

    pub fn insert(&mut self, session_id: SessionId, tx: ConnectionTx) {
        self.connection_txs.insert(session_id, tx);
    }

    /// Never waits: a recipient whose buffer is full misses the message.
    pub fn send(&mut self, to: &SessionId, message: ServerMessage) {
        if let Some(tx) = self.connection_txs.get_mut(to) {
            match tx.try_send(message) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    log::warn!("Dropped message for {}: buffer full", to);
                }
                Err(TrySendError::Closed(_)) => {
                    log::warn!("Dropped message for {}: connection closed", to);
                }
            }
        } else {
            log::warn!("No connection for session {}", to);
        }
    }

    pub fn remove(&mut self, session_id: &SessionId) -> Option<ConnectionTx> {
        self.connection_txs.remove(session_id)
    }
}
