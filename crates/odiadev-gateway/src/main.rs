use actix_web::middleware::{from_fn, Logger};
use actix_web::{web, App, HttpServer};

use odiadev_gateway::config::GatewayConfig;
use odiadev_gateway::cors::cors_middleware;
use odiadev_gateway::metrics::{register_metrics, track_requests};
use odiadev_gateway::state::AppState;
use odiadev_gateway::{error, logging, routes};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    let config = GatewayConfig::from_env();
    logging::init(&config.log_level);

    if let Err(e) = config.enforce_startup_policy() {
        tracing::error!("Refusing to start: {e}");
        std::process::exit(1);
    }

    register_metrics();
    error::expose_internal_details(!config.is_production());

    let port = config.port;
    tracing::info!(
        environment = config.environment.as_str(),
        auth_mode = config.auth_mode().as_str(),
        payment_configured = config.is_payment_configured(),
        tts_configured = config.is_tts_configured(),
        "ODIADEV gateway listening on port {port}"
    );
    tracing::info!("  GET  http://localhost:{port}/healthcheck");
    tracing::info!("  POST http://localhost:{port}/payments/initiate");
    tracing::info!("  POST http://localhost:{port}/tts/speak");
    tracing::info!("  POST http://localhost:{port}/webhook/flutterwave");

    let state = AppState::new(config).map_err(|e| {
        std::io::Error::other(format!("failed to build upstream HTTP clients: {e}"))
    })?;
    let state = web::Data::new(state);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(from_fn(track_requests))
            .wrap(from_fn(cors_middleware))
            .wrap(Logger::default())
            .configure(routes::configure)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
