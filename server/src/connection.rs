use actix::fut::WrapFuture;
use actix::{Actor, ActorContext, AsyncContext, Handler, Message, Running, StreamHandler};
use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;

use system::uuid::Uuid;
use system::{ClientMessage, ServerMessage, SessionId};

use crate::connection_tx_storage::ConnectionTx;
use crate::server::{ServerCommand, ServerTx};

const CONNECTION_BUFFER: usize = 256;

#[derive(Debug)]
pub enum ConnectionCommand {
    Connect {
        session_id: SessionId,
        tx: ConnectionTx,
    },
    Disconnect {
        from: SessionId,
    },
    Message {
        from: SessionId,
        message: ClientMessage,
    },
}

#[derive(Message)]
#[rtype(result = "()")]
struct ConnectionActorMessage(ServerMessage);

struct ConnectionActor {
    session_id: SessionId,
    srv_tx: ServerTx,
}

impl ConnectionActor {
    fn new(srv_tx: ServerTx) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            srv_tx,
        }
    }

    /// Blocks this actor until the relay accepts the command, so frames of
    /// one connection reach the relay in order and are never dropped.
    fn send_to_server(
        &mut self,
        command: ConnectionCommand,
        ctx: &mut ws::WebsocketContext<Self>,
    ) {
        let mut srv_tx = self.srv_tx.clone();
        let session_id = self.session_id;
        ctx.wait(
            async move {
                if srv_tx.send(ServerCommand::Connection(command)).await.is_err() {
                    log::warn!("Relay server unavailable for {}", session_id);
                }
            }
            .into_actor(self),
        );
    }

    fn ingress(
        &mut self,
        decoded: Result<ClientMessage, system::serde_json::Error>,
        ctx: &mut ws::WebsocketContext<Self>,
    ) {
        match decoded {
            Ok(message) => {
                log::debug!("Ingress {} {:?}", self.session_id, message);
                let from = self.session_id;
                self.send_to_server(ConnectionCommand::Message { from, message }, ctx);
            }
            Err(e) => log::debug!("Dropping malformed frame from {}: {}", self.session_id, e),
        }
    }
}

impl Actor for ConnectionActor {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        let (tx, mut rx) = tokio::sync::mpsc::channel::<ServerMessage>(CONNECTION_BUFFER);

        let session_id = self.session_id;
        self.send_to_server(ConnectionCommand::Connect { session_id, tx }, ctx);

        let addr = ctx.address().recipient();

        tokio::spawn(async move {
            log::debug!("egress task for {} - started", session_id);
            while let Some(msg) = rx.recv().await {
                if addr.send(ConnectionActorMessage(msg)).await.is_err() {
                    log::debug!("Connection {} stopped; ending egress", session_id);
                    break;
                }
            }
            log::debug!("egress task for {} - terminated", session_id);
        });
    }

    fn stopping(&mut self, _: &mut Self::Context) -> Running {
        // Sent with backpressure so the relay always hears about it.
        let mut srv_tx = self.srv_tx.clone();
        let from = self.session_id;
        tokio::spawn(async move {
            let command = ServerCommand::Connection(ConnectionCommand::Disconnect { from });
            if srv_tx.send(command).await.is_err() {
                log::warn!("Relay server gone before disconnect of {}", from);
            }
        });

        Running::Stop
    }
}

/// Ingress
impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for ConnectionActor {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => ctx.pong(&msg),
            Ok(ws::Message::Text(text)) => self.ingress(ClientMessage::decode(&text), ctx),
            Ok(ws::Message::Binary(bin)) => self.ingress(ClientMessage::decode_slice(&bin), ctx),
            Ok(ws::Message::Close(reason)) => {
                ctx.close(reason);
                ctx.stop();
            }
            Ok(_) => (),
            Err(e) => {
                log::info!("Protocol error on {}: {}", self.session_id, e);
                ctx.stop();
            }
        }
    }
}

/// Egress
impl Handler<ConnectionActorMessage> for ConnectionActor {
    type Result = ();

    fn handle(
        &mut self,
        msg: ConnectionActorMessage,
        ctx: &mut ws::WebsocketContext<Self>,
    ) -> Self::Result {
        let server_message = &msg.0;
        log::debug!("Egress {} {:?}", self.session_id, server_message);
        match server_message.encode() {
            Ok(text) => ctx.text(text),
            Err(e) => log::warn!("Failed to encode {:?}: {}", server_message, e),
        }
    }
}

pub async fn ws_index(
    req: HttpRequest,
    stream: web::Payload,
    srv_tx: web::Data<ServerTx>,
) -> Result<HttpResponse, Error> {
    ws::start(ConnectionActor::new(srv_tx.get_ref().clone()), &req, stream)
}
