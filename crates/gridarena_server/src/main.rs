//! Real-time tic-tac-toe match server.

use anyhow::Result;
use clap::Parser;
use gridarena_server::{
    AppState, Cli, MatchCoordinator, MatchRepository, SessionRegistry, StoreHandle, router,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    info!(db_path = %cli.db_path, "Starting gridarena server");

    let repo = MatchRepository::new(cli.db_path.clone());
    repo.run_migrations()?;

    let store = StoreHandle::spawn(repo.clone());
    let registry = SessionRegistry::new();
    let coordinator = Arc::new(MatchCoordinator::new(
        registry.clone(),
        store,
        Duration::from_millis(cli.pairing_delay_ms),
    ));

    let app = router(AppState {
        coordinator,
        registry,
        repo,
    });

    let listener = tokio::net::TcpListener::bind((cli.host.as_str(), cli.port)).await?;
    info!(host = %cli.host, port = cli.port, "Server ready");
    axum::serve(listener, app).await?;

    Ok(())
}
