//! algotest-rs server binary, grounded on
//! `orchestrator-server.rs`'s main-function pattern: init tracing,
//! load config, connect + migrate + health-check the database, build
//! the router, serve with graceful shutdown.

use std::net::SocketAddr;
use std::sync::Arc;

use api::config::Settings;
use api::state::{AppState, SandboxFactory};
use llm_gateway::{Gateway, GatewayConfig};
use persistence::{Database, DataRoot, Store};
use tooling::config::ConfigBuilder;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt().with_env_filter(rust_log).init();

    tracing::info!("loading configuration");
    let settings = Settings::from_env_with_defaults("ALGOTEST_")?;

    tracing::info!("connecting to database: {}", settings.persistence.database_url);
    let db = Database::connect(&settings.persistence.database_url).await?;
    db.run_migrations().await?;
    db.health_check().await?;

    let store = Arc::new(Store::new(db));
    let gateway = Arc::new(Gateway::new(GatewayConfig::from(&settings.llm)));
    let sandbox_factory = Arc::new(SandboxFactory::new(settings.executor.websocket_url()));
    let data_root = Arc::new(DataRoot::new(settings.persistence.data_root.clone()));

    let app_state = AppState { store, gateway, sandbox_factory, data_root };
    let app = api::create_router(app_state);

    let addr: SocketAddr = format!("{}:{}", settings.service.host, settings.service.port).parse()?;
    tracing::info!("starting algotest-rs server on {addr}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("algotest-rs server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install CTRL-C signal handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received CTRL-C, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
