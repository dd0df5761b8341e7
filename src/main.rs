use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use smartops_api::api::{create_router, AppState};
use smartops_api::config::{load_settings, DEFAULT_CONFIG_FILE};
use smartops_api::dashboard::spawn_refresher;
use smartops_api::store::EventStore;

/// Event-driven HTTP API
/// Never edits the call log, only appends
/// All state derived from the log
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (settings, config_error) = load_settings(Path::new(DEFAULT_CONFIG_FILE));

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&settings.log_filter).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Some(e) = config_error {
        warn!(path = DEFAULT_CONFIG_FILE, error = %e, "ignoring unparseable config file");
    }

    let mut store = EventStore::open(&settings.database_path).with_context(|| {
        format!(
            "failed to open call log '{}'",
            settings.database_path.display()
        )
    })?;
    if let Some(mirror) = &settings.csv_mirror {
        info!(path = %mirror.display(), "mirroring call log to csv");
        store = store.with_csv_mirror(mirror);
    }
    match store.check_mirror() {
        Ok(Some(check)) if !check.in_sync => warn!(
            stored = check.stored,
            mirrored = check.mirrored,
            "csv mirror does not match the call log"
        ),
        Ok(Some(check)) => info!(mirrored = check.mirrored, "csv mirror consistent"),
        Ok(None) => {}
        Err(e) => warn!(error = %e, "failed to check csv mirror"),
    }
    let store = Arc::new(store);

    let (dashboard, _refresher) = spawn_refresher(store.clone(), settings.refresh_interval());
    let app = create_router(AppState::new(store, dashboard));

    let addr: SocketAddr = settings
        .bind_addr
        .parse()
        .with_context(|| format!("invalid bind address '{}'", settings.bind_addr))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, db = %settings.database_path.display(), "server running");

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
