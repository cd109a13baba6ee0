//! QueueFlow Back binary entrypoint wiring REST, SSE, and storage layers.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use queueflow_back::{
    config::AppConfig,
    dao::{
        queue_store::{QueueStore, memory::MemoryQueueStore},
        storage::{StorageError, StorageResult},
    },
    routes,
    services::storage_supervisor,
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let app_state = AppState::new(config);

    tokio::spawn(storage_supervisor::run(app_state.clone(), connect_store));
    let app = build_router(app_state.clone());

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    app_state.shutdown_contexts();

    Ok(())
}

/// Build the storage backend selected by `QUEUEFLOW_STORE` (`mongo` by
/// default, `memory` for storage-less local runs).
async fn connect_store() -> StorageResult<Arc<dyn QueueStore>> {
    let backend = env::var("QUEUEFLOW_STORE").unwrap_or_else(|_| default_backend().into());

    match backend.as_str() {
        "memory" => {
            info!("using the in-memory queue store; data will not survive a restart");
            Ok(Arc::new(MemoryQueueStore::new()))
        }
        #[cfg(feature = "mongo-store")]
        "mongo" => {
            use queueflow_back::dao::queue_store::mongodb::{config::MongoConfig, store::MongoQueueStore};

            let config = MongoConfig::from_env().await?;
            let store = MongoQueueStore::connect(config).await?;
            Ok(Arc::new(store))
        }
        other => Err(StorageError::unavailable(
            format!("unknown storage backend '{other}'"),
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "bad QUEUEFLOW_STORE value"),
        )),
    }
}

fn default_backend() -> &'static str {
    if cfg!(feature = "mongo-store") {
        "mongo"
    } else {
        "memory"
    }
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
