//! payflow-daemon entry point.
//!
//! Thin by design: load config, build the shared state, wire middleware,
//! start the HTTP server. Route handlers live in `routes.rs`; shared state
//! types live in `state.rs`.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use payflow_daemon::{rails, routes, state};
use payflow_db::{FsObjectStore, InMemoryObjectStore, InMemoryStore, ObjectStore, PostgresStore, RelationalStore};
use tower_http::cors::CorsLayer;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();

    let env_overlay = std::env::var("PAYFLOW_ENV").ok().map(|e| format!("config/{e}.yaml"));
    let config = payflow_config::AppConfig::load("config/base.yaml", env_overlay.as_deref())
        .context("failed to load payflow-daemon config")?;

    let db: Arc<dyn RelationalStore> = if config.database_url.starts_with("memory://") {
        Arc::new(InMemoryStore::new())
    } else {
        let store = PostgresStore::connect(&config.database_url).await?;
        store.migrate().await?;
        Arc::new(store)
    };

    let objects: Arc<dyn ObjectStore> = if config.object_store_root.is_empty() {
        Arc::new(InMemoryObjectStore::new())
    } else {
        Arc::new(FsObjectStore::new(config.object_store_root.clone()))
    };

    let rails = payflow_pdr::registry::RailRegistry::new(rails::default_rails(&config.rail_success_rates));
    let shared = Arc::new(state::AppState::new(&config, "v1", rails, db, objects));

    state::spawn_heartbeat(shared.bus.clone(), Duration::from_secs(5));

    let app = routes::build_router(Arc::clone(&shared)).layer(cors_localhost_only());

    let addr = bind_addr_from_env().unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 8899)));
    info!("payflow-daemon listening on http://{}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await.context("server crashed")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();
}

fn bind_addr_from_env() -> Option<SocketAddr> {
    std::env::var("PAYFLOW_DAEMON_ADDR").ok()?.parse().ok()
}

fn cors_localhost_only() -> CorsLayer {
    let allowed_origins =
        ["http://localhost", "http://127.0.0.1", "http://localhost:3000", "http://127.0.0.1:3000"];

    let origins: Vec<HeaderValue> = allowed_origins.iter().filter_map(|o| HeaderValue::from_str(o).ok()).collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(tower_http::cors::Any)
}
