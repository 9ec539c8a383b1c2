use crate::admin::AdminCommand;
use crate::server::{ServerCommand, ServerTx};
use actix_web::error;
use actix_web::web::{self, HttpResponse};
use actix_web::Responder;
use system::serde_json::json;
use system::{RoomId, RoomSummary};

pub fn configure_room_handlers(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/rooms")
            .route(web::post().to(create_room))
            .route(web::get().to(list_rooms)),
    )
    .service(web::resource("/rooms/{room}").route(web::get().to(show_room)));
}

async fn create_room() -> Result<impl Responder, actix_web::error::Error> {
    let room_id = RoomId::generate();
    Ok(HttpResponse::Ok().json(json!({ "room": room_id })))
}

async fn list_rooms(
    srv_tx: web::Data<ServerTx>,
) -> Result<impl Responder, actix_web::error::Error> {
    let rooms = fetch_rooms(&srv_tx).await?;
    Ok(HttpResponse::Ok().json(rooms))
}

async fn show_room(
    path: web::Path<String>,
    srv_tx: web::Data<ServerTx>,
) -> Result<impl Responder, actix_web::error::Error> {
    let room = RoomId::new(path.into_inner());
    let (tx, rx) = tokio::sync::oneshot::channel::<RoomSummary>();

    srv_tx
        .get_ref()
        .clone()
        .send(ServerCommand::Admin(AdminCommand::DescribeRoom { room, tx }))
        .await
        .map_err(|_| error::ErrorInternalServerError("Internal Server Error"))?;

    let summary = rx
        .await
        .map_err(|_| error::ErrorInternalServerError("Receiver await error"))?;
    Ok(HttpResponse::Ok().json(summary))
}

pub(super) async fn fetch_rooms(
    srv_tx: &web::Data<ServerTx>,
) -> Result<Vec<RoomSummary>, actix_web::error::Error> {
    let (tx, rx) = tokio::sync::oneshot::channel::<Vec<RoomSummary>>();

    srv_tx
        .get_ref()
        .clone()
        .send(ServerCommand::Admin(AdminCommand::ListRooms { tx }))
        .await
        .map_err(|_| error::ErrorInternalServerError("Internal Server Error"))?;

    rx.await
        .map_err(|_| error::ErrorInternalServerError("Receiver await error"))
}
