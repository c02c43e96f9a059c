use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tryon::auth::ServiceAccountTokens;
use tryon::config::Settings;
use tryon::predict::PredictionClient;
use tryon::server::{routes, AppState};

fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[actix_web::main]
async fn main() -> Result<()> {
    let settings = Settings::load()?;
    init_logging(settings.debug);

    info!("starting virtual try-on server");
    info!("project id: {}", settings.project_id);
    info!("location: {}", settings.location);
    info!("model: {}", settings.model_name);

    let state = web::Data::new(AppState::new(
        Arc::new(ServiceAccountTokens::new(&settings.credentials_path)),
        PredictionClient::new(&settings),
    ));

    let addr = settings.bind_addr();
    info!("listening on {addr}");

    // Start the HTTP server
    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(Cors::permissive())
            .wrap(middleware::Logger::default())
            .configure(routes::configure)
    })
    .bind(&addr)
    .with_context(|| format!("failed to bind {addr}"))?
    .run()
    .await
    .context("server error")
}
