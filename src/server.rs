/// Server setup and initialization
///
/// Wires together all components: record store, content fetcher, generation
/// backends, execution pipeline and HTTP routes.

use crate::{
    api::workflows::{create_workflow_routes, AppState},
    config::Config,
    runtime::{executor::WorkflowExecutor, fetcher::ContentFetcher, generation::GenerationClient},
    workflow::storage::SqliteWorkflowStore,
};
use anyhow::Result;
use axum::{
    http::{header, HeaderValue, Method},
    routing::get,
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;

/// Create the main Axum application with all routes and middleware
///
/// Opens (and if needed creates) the workflow database, builds the backend
/// clients from the loaded credentials and mounts every route.
pub async fn create_app(config: Config) -> Result<Router> {
    tracing::info!("📋 Initializing workflow store at {}", config.database.path);
    let store = SqliteWorkflowStore::open(&config.database.path)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to open workflow database: {}", e))?;

    tracing::info!("🌍 Initializing content fetcher");
    let fetcher = ContentFetcher::new(config.fetch.timeout())?;

    tracing::info!("🤖 Initializing generation backends");
    let generator = GenerationClient::from_config(&config.generation)?;
    if config.generation.anthropic_api_key.is_none() {
        tracing::info!("ANTHROPIC_API_KEY not set; claude-* models are unavailable");
    }

    let store = Arc::new(store);
    let state = AppState {
        store: store.clone(),
        executor: WorkflowExecutor::new(store, fetcher, Arc::new(generator)),
        default_model: config.generation.default_model.clone(),
    };

    let app = build_router(state, &config.server.cors_origin)?;
    tracing::info!("✅ Application initialized successfully");

    Ok(app)
}

/// Mount the routes on `state`, allowing browser requests from `cors_origin`
pub fn build_router(state: AppState, cors_origin: &str) -> Result<Router> {
    let origin: HeaderValue = cors_origin
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid CORS origin '{}': {}", cors_origin, e))?;

    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE]);

    Ok(Router::new()
        .route("/", get(welcome))
        .route("/healthz", get(health_check))
        .merge(create_workflow_routes().with_state(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http()))
}

/// Start the HTTP server with the given configuration
pub async fn start_server(config: Config) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_level(true)
        .init();

    tracing::info!("Starting workflow-pilot server...");

    let app = create_app(config.clone()).await?;

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&bind_addr).await?;

    tracing::info!("Server listening on http://{}", bind_addr);

    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

async fn welcome() -> &'static str {
    "Welcome to the Workflow Management API. Use /workflows to interact with workflows."
}

async fn health_check() -> &'static str {
    "ok"
}
