use actix_cors::Cors;
use actix_web::{middleware, App, HttpServer};

use server::config::ServerConfig;
use server::handlers::{configure_static_files, root};
use server::server::spawn_server;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ServerConfig::load().map_err(|e| {
        log::error!("{}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e)
    })?;

    let srv_tx = spawn_server();
    let static_dir = config.static_dir.clone();
    let bind_address = config.bind_address();
    log::info!("Listening on {}", bind_address);

    HttpServer::new(move || {
        let static_dir = static_dir.clone();
        App::new()
            .data(srv_tx.clone())
            .wrap(Cors::permissive())
            .wrap(middleware::Logger::default())
            .configure(root)
            .configure(move |cfg| configure_static_files(cfg, &static_dir))
    })
    .bind(&bind_address)
    .map_err(|e| {
        log::error!("Cannot bind {}: {}", bind_address, e);
        e
    })?
    .run()
    .await
}
