use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use portfoliopulse::{
    config::{self, StoreBackend},
    routes,
    services::{
        quotes::QuoteSources,
        refresh_pipeline::wait_for_shutdown,
        store::{MemoryStore, MongoStore, SharedStore},
    },
    AppState,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = run().await {
        tracing::error!("fatal: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), String> {
    let settings = config::load();

    let store: SharedStore = match settings.store_backend {
        StoreBackend::Mongo => {
            let mongo = MongoStore::connect(&settings.mongodb_uri, &settings.mongodb_db)
                .await
                .map_err(|e| format!("database init failed: {e}"))?;
            Arc::new(mongo)
        }
        StoreBackend::Memory => {
            tracing::warn!("using in-memory store; holdings and alerts are lost on exit");
            Arc::new(MemoryStore::new())
        }
    };

    let sources = QuoteSources::from_settings(&settings).map_err(|e| e.to_string())?;
    let state = AppState::new(settings.clone(), store, sources);

    let ip = settings
        .host
        .parse::<IpAddr>()
        .map_err(|e| format!("invalid HOST {}: {e}", settings.host))?;
    let addr = SocketAddr::new(ip, settings.port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| format!("bind {addr}: {e}"))?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        tracing::info!("shutdown signal received, stopping");
        let _ = shutdown_tx.send(true);
    });

    let scheduler = state
        .pipeline
        .spawn_scheduler(settings.refresh_interval, shutdown_rx.clone());

    let mut server_rx = shutdown_rx.clone();
    let app = routes::app(state.clone());
    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { wait_for_shutdown(&mut server_rx).await })
            .await
    });

    tracing::info!("PortfolioPulse listening on http://{}", addr);

    let mut main_rx = shutdown_rx;
    tokio::select! {
        res = &mut server => {
            // server ended without a shutdown signal
            return match res {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(format!("server failed: {e}")),
                Err(e) => Err(format!("server task failed: {e}")),
            };
        }
        _ = wait_for_shutdown(&mut main_rx) => {}
    }

    // live sockets would otherwise hold the server open
    state.hub.close_all().await;

    let drain = async {
        let _ = scheduler.await;
        server.await
    };

    match tokio::time::timeout(settings.shutdown_grace, drain).await {
        Ok(Ok(Ok(()))) => {
            tracing::info!("stopped cleanly");
            Ok(())
        }
        Ok(Ok(Err(e))) => Err(format!("server failed: {e}")),
        Ok(Err(e)) => Err(format!("server task failed: {e}")),
        Err(_) => {
            tracing::warn!("grace period of {:?} elapsed, forcing exit", settings.shutdown_grace);
            Ok(())
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
