//! Loopback HTTP server exposing the vault operations to a browser.

use std::net::{SocketAddr, TcpListener};

use actix_web::{
    dev::Server,
    http::header,
    middleware::DefaultHeaders,
    web, App, HttpServer,
};
use tracing::info;

use crate::{
    config::ServerConfig,
    error::Result,
    picker::FolderPicker,
    vault::{gocryptfs::FsEncryptionDriver, VaultManager},
};

mod handlers;

pub use handlers::ApiResponse;

/// Headers attached to every response.
pub fn default_headers() -> DefaultHeaders {
    DefaultHeaders::new()
        .add((header::CACHE_CONTROL, "no-store"))
        .add((header::X_CONTENT_TYPE_OPTIONS, "nosniff"))
        .add((header::X_FRAME_OPTIONS, "DENY"))
}

/// Registers the page and API routes.
///
/// The vault manager must be installed as `web::Data<VaultManager<D, P>>`.
pub fn configure_app<D, P>(request_limit_bytes: usize) -> impl FnOnce(&mut web::ServiceConfig)
where
    D: FsEncryptionDriver + 'static,
    P: FolderPicker + 'static,
{
    move |cfg: &mut web::ServiceConfig| {
        cfg.app_data(
            web::JsonConfig::default()
                .limit(request_limit_bytes)
                .error_handler(handlers::json_error_handler),
        )
        .route("/", web::get().to(handlers::index))
        .route("/favicon.ico", web::get().to(handlers::favicon))
        .service(
            web::scope("/api")
                .route("/init", web::post().to(handlers::init_handler::<D, P>))
                .route("/mount", web::post().to(handlers::mount_handler::<D, P>))
                .route("/info", web::post().to(handlers::info_handler::<D, P>))
                .route("/unmount", web::post().to(handlers::unmount_handler::<D, P>))
                .route("/pick", web::post().to(handlers::pick_handler::<D, P>)),
        );
    }
}

/// Builds the server. The returned future runs until shutdown.
pub fn create_server<D, P>(config: &ServerConfig, manager: VaultManager<D, P>) -> Result<Server>
where
    D: FsEncryptionDriver + 'static,
    P: FolderPicker + 'static,
{
    let manager = web::Data::new(manager);
    let request_limit_bytes = config.request_limit_bytes;

    info!(
        "starting gocryptfs web UI on http://{} ({} workers)",
        config.bind, config.workers
    );

    let server = HttpServer::new(move || {
        App::new()
            .wrap(default_headers())
            .app_data(manager.clone())
            .configure(configure_app::<D, P>(request_limit_bytes))
    })
    .workers(config.workers)
    .bind(config.bind)?
    .shutdown_timeout(config.shutdown_timeout_seconds)
    .run();
    Ok(server)
}

/// Binds and immediately releases `bind`, proving the address is usable.
pub fn check_bind(bind: SocketAddr) -> Result<()> {
    let listener = TcpListener::bind(bind)?;
    drop(listener);
    Ok(())
}
