use crate::handlers::rooms::fetch_rooms;
use crate::server::ServerTx;
use actix_web::web;
use actix_web::Responder;
use actix_web::Result;
use askama_actix::Template;

pub fn configure_admin_handlers(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin").service(web::resource("/").route(web::get().to(admin_index))),
    );
}

struct RoomRow {
    room: String,
    user_count: usize,
    usernames: String,
}

#[derive(Template)]
#[template(path = "admin-rooms.html")]
pub struct AdminRoomsTemplate {
    rooms: Vec<RoomRow>,
}

pub async fn admin_index(srv_tx: web::Data<ServerTx>) -> Result<impl Responder> {
    let rooms = fetch_rooms(&srv_tx)
        .await?
        .into_iter()
        .map(|summary| RoomRow {
            room: summary.room.to_string(),
            user_count: summary.user_count,
            usernames: summary.usernames.join(", "),
        })
        .collect();
    Ok(AdminRoomsTemplate { rooms })
}
