use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use salon_booking::config::AppConfig;
use salon_booking::handlers;
use salon_booking::models::Catalog;
use salon_booking::services::crm::{BitrixWebhook, CrmSink};
use salon_booking::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let catalog = match &config.catalog_path {
        Some(path) => {
            tracing::info!(path = %path, "loading catalog");
            Catalog::from_json_file(path)?
        }
        None => Catalog::salon_natali(),
    };

    let crm: Option<Box<dyn CrmSink>> = if config.demo_mode() {
        tracing::info!("no CRM webhook configured, running in demo mode");
        None
    } else {
        tracing::info!("submitting bookings to the configured CRM webhook");
        Some(Box::new(BitrixWebhook::new(config.crm_webhook_url.clone())))
    };

    let state = Arc::new(AppState {
        config: config.clone(),
        catalog,
        crm,
        sessions: Mutex::new(HashMap::new()),
    });

    let app = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/api/catalog", get(handlers::catalog::get_catalog))
        .route(
            "/api/catalog/services/:service_id/staff",
            get(handlers::catalog::get_eligible_staff),
        )
        .route(
            "/api/availability",
            get(handlers::availability::get_blocked_slots),
        )
        .route("/api/wizard", post(handlers::wizard::create_session))
        .route("/api/wizard/:id", get(handlers::wizard::get_session))
        .route("/api/wizard/:id/service", post(handlers::wizard::select_service))
        .route("/api/wizard/:id/staff", post(handlers::wizard::select_staff))
        .route("/api/wizard/:id/schedule", post(handlers::wizard::set_schedule))
        .route("/api/wizard/:id/contact", post(handlers::wizard::set_contact))
        .route("/api/wizard/:id/advance", post(handlers::wizard::advance))
        .route("/api/wizard/:id/retreat", post(handlers::wizard::retreat))
        .route("/api/wizard/:id/submit", post(handlers::wizard::submit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
