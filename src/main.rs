use std::io;

use actix_web::{web, App, HttpServer};
use dotenv::dotenv;
use log::{error, info};

mod auth;
mod config;
mod db;
mod error;
mod models;
mod routes;
mod services;

use config::AppConfig;
use error::AppError;
use services::notifications::NotificationHub;

const NOTIFICATION_BUFFER: usize = 256;

fn startup_error(context: &str, e: impl std::fmt::Display) -> io::Error {
    error!("{}: {}", context, e);
    io::Error::new(io::ErrorKind::Other, format!("{context}: {e}"))
}

/// Malformed bodies, query strings and paths answer with the usual 400 envelope.
pub fn extractor_config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| AppError::validation(format!("Invalid request body: {err}")).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| AppError::validation(format!("Invalid query string: {err}")).into()),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|err, _req| AppError::validation(format!("Invalid path: {err}")).into()),
    );
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::from_env().map_err(|e| startup_error("Invalid configuration", e))?;
    let pool = db::create_pool(&config)
        .await
        .map_err(|e| startup_error("Failed to create pool", e))?;
    db::run_migrations(&pool)
        .await
        .map_err(|e| startup_error("Failed to run migrations", e))?;
    if let Some(seed) = &config.admin_seed {
        db::seed_admin(&pool, seed)
            .await
            .map_err(|e| startup_error("Failed to seed admin account", e))?;
    }

    let server_address = config.bind_address.clone();
    info!("Server running at http://{}", server_address);

    let pool = web::Data::new(pool);
    let config = web::Data::new(config);
    let hub = web::Data::new(NotificationHub::new(NOTIFICATION_BUFFER));

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .app_data(pool.clone())
            .app_data(config.clone())
            .app_data(hub.clone())
            .configure(extractor_config)
            .configure(routes::routes::configure)
    })
    .bind(server_address)?
    .run()
    .await
}
