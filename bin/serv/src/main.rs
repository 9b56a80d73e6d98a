use axum::{Router, middleware, routing::get};
use sb_api::{config::ApiConfig, state::ApiState};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration from .env and STUDY_BUDDY_* variables
    dotenvy::dotenv().ok();
    let config = ApiConfig::from_env()?;

    sb_api::tracing::init_tracing(config.env)?;

    let metrics_handle = sb_api::metrics::init_metrics()?;
    tracing::info!("Prometheus metrics exporter initialized");

    let state = ApiState::new(&config)?;

    let cors = sb_api::middleware::cors::create_cors_layer(
        &config.parsed_allowed_origins(),
        config.env,
    );

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    // Served next to the API, outside /v1
    let metrics_app = Router::new()
        .route("/metrics", get(sb_api::metrics::metrics_handler))
        .with_state(metrics_handle);

    let app = sb_api::router::router()
        .with_state(state)
        .merge(metrics_app)
        .layer(cors)
        .layer(trace_layer)
        .layer(middleware::from_fn(sb_api::metrics::track_metrics))
        .layer(middleware::from_fn(
            sb_api::middleware::request_id::request_id_middleware,
        ));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(
        addr = %config.bind_addr,
        environment = ?config.env,
        data_dir = %config.data_dir.display(),
        file_persistence = config.use_file_persistence,
        "Server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
