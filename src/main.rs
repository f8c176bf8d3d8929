use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use hoard::web::{create_router, AppState};
use hoard::{Config, Database, StorageRoot, StorageService};

#[tokio::main]
async fn main() {
    // Load configuration
    let config = match Config::load("config.toml") {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config.toml: {e}");
            eprintln!("Using default configuration.");
            Config::default()
        }
    };

    // Initialize logging
    if let Err(e) = hoard::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        hoard::logging::init_console_only(&config.logging.level);
    }

    info!("hoard - chunked file storage backend");

    let db = match Database::open(&config.database.path).await {
        Ok(db) => Arc::new(db),
        Err(e) => {
            error!("Failed to open database: {e}");
            std::process::exit(1);
        }
    };

    let root = match StorageRoot::new(&config.storage.root) {
        Ok(root) => root,
        Err(e) => {
            error!("Failed to prepare storage root: {e}");
            std::process::exit(1);
        }
    };

    let service = StorageService::new(db, root)
        .with_upload_timeout(Duration::from_secs(config.storage.upload_timeout_secs));

    if config.storage.scan_on_startup {
        match service.reconcile().await {
            Ok(report) => info!(
                folders_created = report.folders_created,
                files_created = report.files_created,
                "startup reconcile complete"
            ),
            Err(e) => error!("Startup reconcile failed: {e}"),
        }
    }

    let state = Arc::new(AppState::new(service));

    // Background eviction of abandoned upload sessions.
    let sweep_state = state.clone();
    let sweep_interval = Duration::from_secs(config.storage.sweep_interval_secs.max(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sweep_interval);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match sweep_state.service.sweep_stale().await {
                Ok(evicted) if !evicted.is_empty() => {
                    info!(count = evicted.len(), "evicted stale upload sessions")
                }
                Ok(_) => {}
                Err(e) => error!("Eviction sweep failed: {e}"),
            }
        }
    });

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {addr}: {e}");
            std::process::exit(1);
        }
    };

    info!("Listening on {addr}");
    if let Err(e) = axum::serve(listener, create_router(state)).await {
        error!("Server error: {e}");
        std::process::exit(1);
    }
}
