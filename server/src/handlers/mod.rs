use crate::connection::ws_index;
use crate::handlers::admin::configure_admin_handlers;
use crate::handlers::rooms::configure_room_handlers;
use actix_files::Files;
use actix_web::web;
use std::path::Path;

mod admin;
mod rooms;

pub fn root(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/ws/").route(web::get().to(ws_index)));

    configure_room_handlers(cfg);
    configure_admin_handlers(cfg);
}

/// Serves the browser bundle from `dir` at `/`. Must be registered after
/// every other route.
pub fn configure_static_files(cfg: &mut web::ServiceConfig, dir: &Path) {
    if dir.is_dir() {
        cfg.service(Files::new("/", dir).index_file("index.html"));
    } else {
        log::warn!("Static directory {} not found; not serving a client", dir.display());
    }
}
