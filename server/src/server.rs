use std::collections::HashMap;
use tokio::sync::mpsc::{channel, Sender};

use system::{ClientMessage, JoinRequest, RoomId, RoomSummary, ServerMessage, SessionId};

use crate::admin::AdminCommand;
use crate::connection::ConnectionCommand;
use crate::connection_tx_storage::{ConnectionTx, ConnectionTxStorage};
use crate::room_registry::RoomRegistry;
use crate::session::Session;

pub type ServerTx = Sender<ServerCommand>;

const SERVER_BUFFER: usize = 1024;

#[derive(Debug)]
pub enum ServerCommand {
    Connection(ConnectionCommand),
    Admin(AdminCommand),
}

/// Owns all relay state. Commands are handled one at a time and each handler
/// runs to completion without awaiting, so the registry needs no lock.
struct Server {
    registry: RoomRegistry,
    sessions: HashMap<SessionId, Session>,
    connections: ConnectionTxStorage,
}

impl Server {
    fn new() -> Self {
        Self {
            registry: RoomRegistry::new(),
            sessions: HashMap::new(),
            connections: ConnectionTxStorage::new(),
        }
    }

    fn handle_command(&mut self, command: ServerCommand) {
        match command {
            ServerCommand::Connection(command) => self.handle_connection_command(command),
            ServerCommand::Admin(command) => self.handle_admin_command(command),
        }
    }

    fn handle_connection_command(&mut self, command: ConnectionCommand) {
        match command {
            ConnectionCommand::Connect { session_id, tx } => self.connect(session_id, tx),
            ConnectionCommand::Disconnect { from } => self.disconnect(&from),
            ConnectionCommand::Message { from, message } => {
                if self.sessions.contains_key(&from) {
                    self.handle_client_message(&from, message);
                } else {
                    log::warn!("Message from unknown session {}", from);
                }
            }
        }
    }

    fn handle_client_message(&mut self, from: &SessionId, message: ClientMessage) {
        match message {
            ClientMessage::Join(request) => self.join(from, &request),
            ClientMessage::Stroke(payload) => {
                self.relay_to_rooms(from, ServerMessage::Stroke(payload))
            }
            ClientMessage::State(payload) => {
                self.relay_to_rooms(from, ServerMessage::State(payload))
            }
            ClientMessage::Clear => self.relay_to_rooms(from, ServerMessage::Clear),
        }
    }

    fn connect(&mut self, session_id: SessionId, tx: ConnectionTx) {
        log::info!("Session {} connected", session_id);
        self.sessions.insert(session_id, Session::new(session_id));
        self.connections.insert(session_id, tx);
    }

    fn disconnect(&mut self, session_id: &SessionId) {
        let session = match self.sessions.remove(session_id) {
            Some(session) => session,
            None => {
                log::debug!("Session {} already disconnected", session_id);
                return;
            }
        };
        self.connections.remove(&session.id);

        for (room_id, count) in self.registry.leave_all(&session.id) {
            self.broadcast(&room_id, &ServerMessage::RoomCount { count }, None);
        }
        log::info!(
            "Session {} ({}) disconnected",
            session.id,
            session.username.as_deref().unwrap_or("anonymous")
        );
    }

    fn join(&mut self, from: &SessionId, request: &JoinRequest) {
        let (room_id, username) = match request.validated() {
            Some(v) => v,
            None => {
                log::debug!("Ignoring incomplete join from {}", from);
                return;
            }
        };

        if let Some(session) = self.sessions.get_mut(from) {
            session.username = Some(username.to_owned());
        }
        let count = self.registry.join(*from, room_id);

        self.broadcast(
            room_id,
            &ServerMessage::UserJoined {
                username: username.to_owned(),
                id: *from,
            },
            Some(from),
        );
        self.connections.send(
            from,
            ServerMessage::RoomInfo {
                room: room_id.clone(),
                user_count: count,
            },
        );
        self.broadcast(room_id, &ServerMessage::RoomCount { count }, None);
    }

    fn relay_to_rooms(&mut self, from: &SessionId, message: ServerMessage) {
        let rooms = self.registry.rooms_of(from);
        if rooms.is_empty() {
            log::debug!("Session {} is not in any room; dropping message", from);
        }
        for room_id in &rooms {
            self.broadcast(room_id, &message, Some(from));
        }
    }

    fn broadcast(
        &mut self,
        room_id: &RoomId,
        message: &ServerMessage,
        without: Option<&SessionId>,
    ) {
        let recipients = self
            .registry
            .members(room_id)
            .filter(|session_id| Some(*session_id) != without)
            .cloned()
            .collect::<Vec<_>>();
        for session_id in recipients {
            self.connections.send(&session_id, message.clone());
        }
    }

    fn handle_admin_command(&mut self, command: AdminCommand) {
        match command {
            AdminCommand::ListRooms { tx } => {
                let mut room_ids = self.registry.rooms().cloned().collect::<Vec<_>>();
                room_ids.sort();
                let summaries = room_ids.into_iter().map(|r| self.summarize(r)).collect();
                if tx.send(summaries).is_err() {
                    log::warn!("Admin requester went away");
                }
            }
            AdminCommand::DescribeRoom { room, tx } => {
                if tx.send(self.summarize(room)).is_err() {
                    log::warn!("Admin requester went away");
                }
            }
        }
    }

    fn summarize(&self, room_id: RoomId) -> RoomSummary {
        let user_count = self.registry.member_count(&room_id);
        if user_count == 0 {
            return RoomSummary::empty(room_id);
        }
        let usernames = self
            .registry
            .members(&room_id)
            .filter_map(|session_id| self.sessions.get(session_id))
            .filter_map(|session| session.username.clone())
            .collect();
        RoomSummary {
            room: room_id,
            user_count,
            usernames,
        }
    }
}

/// Starts the relay task and returns the sender that feeds it. The task and
/// its state live until every `ServerTx` clone is dropped.
pub fn spawn_server() -> ServerTx {
    let (srv_tx, mut srv_rx) = channel::<ServerCommand>(SERVER_BUFFER);

    tokio::spawn(async move {
        let mut server = Server::new();

        while let Some(command) = srv_rx.recv().await {
            server.handle_command(command);
        }
        log::info!("Relay server stopped");
    });

    srv_tx
}

#[cfg(test)]
mod tests {
    use super::*;
    use system::serde_json::json;
    use system::uuid::Uuid;
    use system::StrokeMessage;
    use tokio::sync::mpsc::Receiver;
    use tokio::sync::oneshot;

    fn connect(server: &mut Server) -> (SessionId, Receiver<ServerMessage>) {
        let (tx, rx) = channel(64);
        let session_id = Uuid::new_v4();
        server.handle_command(ServerCommand::Connection(ConnectionCommand::Connect {
            session_id,
            tx,
        }));
        (session_id, rx)
    }

    fn send(server: &mut Server, from: SessionId, message: ClientMessage) {
        server.handle_command(ServerCommand::Connection(ConnectionCommand::Message {
            from,
            message,
        }));
    }

    fn join(server: &mut Server, from: SessionId, room: &str, username: &str) {
        send(
            server,
            from,
            ClientMessage::Join(JoinRequest::new(room, username)),
        );
    }

    fn disconnect(server: &mut Server, from: SessionId) {
        server.handle_command(ServerCommand::Connection(ConnectionCommand::Disconnect {
            from,
        }));
    }

    /// Only terminates once the server holding the sender is dropped.
    async fn drain(mut rx: Receiver<ServerMessage>) -> Vec<ServerMessage> {
        let mut received = Vec::new();
        while let Some(message) = rx.recv().await {
            received.push(message);
        }
        received
    }

    fn marker_stroke() -> system::serde_json::Value {
        json!({
            "x": 10, "y": 20, "px": 5, "py": 15, "size": 30,
            "hue": 200, "sat": 80, "light": 60, "brushMode": "marker"
        })
    }

    #[tokio::test]
    async fn it_announces_later_joiner_only_to_earlier_members() {
        let mut server = Server::new();
        let (a, a_rx) = connect(&mut server);
        let (b, b_rx) = connect(&mut server);

        join(&mut server, a, "ABCDEF", "Alice");
        join(&mut server, b, "ABCDEF", "Bob");
        drop(server);

        assert_eq!(
            drain(a_rx).await,
            vec![
                ServerMessage::RoomInfo {
                    room: "ABCDEF".into(),
                    user_count: 1
                },
                ServerMessage::RoomCount { count: 1 },
                ServerMessage::UserJoined {
                    username: "Bob".into(),
                    id: b
                },
                ServerMessage::RoomCount { count: 2 },
            ]
        );
        assert_eq!(
            drain(b_rx).await,
            vec![
                ServerMessage::RoomInfo {
                    room: "ABCDEF".into(),
                    user_count: 2
                },
                ServerMessage::RoomCount { count: 2 },
            ]
        );
    }

    #[tokio::test]
    async fn it_relays_stroke_to_other_room_members_only() {
        let mut server = Server::new();
        let (a, a_rx) = connect(&mut server);
        let (b, b_rx) = connect(&mut server);
        let (c, c_rx) = connect(&mut server);

        join(&mut server, a, "ABCDEF", "Alice");
        join(&mut server, b, "ABCDEF", "Bob");
        join(&mut server, c, "ZZZZZZ", "Carol");
        send(&mut server, a, ClientMessage::Stroke(marker_stroke()));
        drop(server);

        let a_received = drain(a_rx).await;
        assert!(!a_received
            .iter()
            .any(|m| matches!(m, ServerMessage::Stroke(_))));

        let b_received = drain(b_rx).await;
        assert_eq!(
            b_received.last(),
            Some(&ServerMessage::Stroke(marker_stroke()))
        );
        if let Some(ServerMessage::Stroke(payload)) = b_received.last() {
            let stroke = StrokeMessage::from_payload(payload).unwrap();
            assert_eq!(stroke.brush_mode, "marker");
        }

        let c_received = drain(c_rx).await;
        assert!(!c_received
            .iter()
            .any(|m| matches!(m, ServerMessage::Stroke(_))));
    }

    #[tokio::test]
    async fn it_relays_state_and_clear_without_echo() {
        let mut server = Server::new();
        let (a, a_rx) = connect(&mut server);
        let (b, b_rx) = connect(&mut server);

        join(&mut server, a, "ABCDEF", "Alice");
        join(&mut server, b, "ABCDEF", "Bob");
        send(&mut server, b, ClientMessage::State(json!({"gate": 0.2, "gain": 3})));
        send(&mut server, b, ClientMessage::Clear);
        drop(server);

        let a_received = drain(a_rx).await;
        assert_eq!(
            &a_received[a_received.len() - 2..],
            &[
                ServerMessage::State(json!({"gate": 0.2, "gain": 3})),
                ServerMessage::Clear,
            ]
        );
        let b_received = drain(b_rx).await;
        assert!(!b_received
            .iter()
            .any(|m| matches!(m, ServerMessage::State(_) | ServerMessage::Clear)));
    }

    #[tokio::test]
    async fn it_ignores_incomplete_join() {
        let mut server = Server::new();
        let (a, a_rx) = connect(&mut server);

        join(&mut server, a, "ABCDEF", "");
        join(&mut server, a, "", "Alice");
        send(
            &mut server,
            a,
            ClientMessage::Join(JoinRequest {
                room: Some("ABCDEF".into()),
                username: None,
            }),
        );
        assert_eq!(server.registry.rooms().count(), 0);
        assert!(server.registry.rooms_of(&a).is_empty());
        assert_eq!(server.sessions[&a].username, None);
        drop(server);

        assert!(drain(a_rx).await.is_empty());
    }

    #[tokio::test]
    async fn it_sends_nothing_for_roomless_stroke() {
        let mut server = Server::new();
        let (a, a_rx) = connect(&mut server);
        let (_b, b_rx) = connect(&mut server);

        send(&mut server, a, ClientMessage::Stroke(marker_stroke()));
        drop(server);

        assert!(drain(a_rx).await.is_empty());
        assert!(drain(b_rx).await.is_empty());
    }

    #[tokio::test]
    async fn it_updates_count_for_remaining_members_on_disconnect() {
        let mut server = Server::new();
        let (a, a_rx) = connect(&mut server);
        let (b, b_rx) = connect(&mut server);

        join(&mut server, a, "ABCDEF", "Alice");
        join(&mut server, b, "ABCDEF", "Bob");
        disconnect(&mut server, a);
        disconnect(&mut server, a);
        assert_eq!(server.registry.member_count(&"ABCDEF".into()), 1);
        drop(server);

        let a_received = drain(a_rx).await;
        assert_eq!(a_received.last(), Some(&ServerMessage::RoomCount { count: 2 }));
        let b_received = drain(b_rx).await;
        assert_eq!(b_received.last(), Some(&ServerMessage::RoomCount { count: 1 }));
        assert_eq!(
            b_received
                .iter()
                .filter(|m| **m == ServerMessage::RoomCount { count: 1 })
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn it_forgets_room_when_last_member_disconnects() {
        let mut server = Server::new();
        let (a, _a_rx) = connect(&mut server);

        join(&mut server, a, "ABCDEF", "Alice");
        disconnect(&mut server, a);

        assert_eq!(server.registry.member_count(&"ABCDEF".into()), 0);
        assert_eq!(server.registry.rooms().count(), 0);
        assert!(!server.sessions.contains_key(&a));
    }

    #[tokio::test]
    async fn it_drops_messages_from_unknown_sessions() {
        let mut server = Server::new();
        let (_a, a_rx) = connect(&mut server);
        let stranger = Uuid::new_v4();

        join(&mut server, stranger, "ABCDEF", "Mallory");
        assert_eq!(server.registry.rooms().count(), 0);
        drop(server);

        assert!(drain(a_rx).await.is_empty());
    }

    #[tokio::test]
    async fn it_describes_rooms_for_admin() {
        let mut server = Server::new();
        let (a, _a_rx) = connect(&mut server);
        let (b, _b_rx) = connect(&mut server);
        join(&mut server, a, "BBBBBB", "Alice");
        join(&mut server, b, "AAAAAA", "Bob");

        let (tx, rx) = oneshot::channel();
        server.handle_command(ServerCommand::Admin(AdminCommand::ListRooms { tx }));
        let rooms = rx.await.unwrap();
        assert_eq!(
            rooms
                .iter()
                .map(|r| (r.room.as_str(), r.user_count))
                .collect::<Vec<_>>(),
            vec![("AAAAAA", 1), ("BBBBBB", 1)]
        );

        let (tx, rx) = oneshot::channel();
        server.handle_command(ServerCommand::Admin(AdminCommand::DescribeRoom {
            room: "NOWHERE".into(),
            tx,
        }));
        assert_eq!(rx.await.unwrap(), RoomSummary::empty("NOWHERE".into()));
    }

    #[tokio::test]
    async fn it_serves_commands_through_spawned_task() {
        let mut srv_tx = spawn_server();
        let (tx, _rx) = channel(64);
        let session_id = Uuid::new_v4();

        srv_tx
            .send(ServerCommand::Connection(ConnectionCommand::Connect {
                session_id,
                tx,
            }))
            .await
            .unwrap();
        srv_tx
            .send(ServerCommand::Connection(ConnectionCommand::Message {
                from: session_id,
                message: ClientMessage::Join(JoinRequest::new("ABCDEF", "Alice")),
            }))
            .await
            .unwrap();

        let (tx, rx) = oneshot::channel();
        srv_tx
            .send(ServerCommand::Admin(AdminCommand::DescribeRoom {
                room: "ABCDEF".into(),
                tx,
            }))
            .await
            .unwrap();
        let summary = rx.await.unwrap();
        assert_eq!(summary.user_count, 1);
        assert_eq!(summary.usernames, vec!["Alice".to_string()]);
    }
}
