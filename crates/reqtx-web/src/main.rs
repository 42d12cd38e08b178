//! reqtx demo server.
//!
//! - Loads the endpoint catalog from YAML (first argument, default `reqtx.yaml`)
//! - Serves `/items/:key` behind the transaction middleware
//! - Ops: `/healthz`, `/metrics`

use std::net::SocketAddr;

use tracing_subscriber::{fmt, EnvFilter};

use reqtx_web::{app_state, config, router};

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "reqtx server failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args().nth(1).unwrap_or_else(|| "reqtx.yaml".to_string());
    let cfg = config::load_from_file(&path)?;
    let listen: SocketAddr = cfg.server.listen.parse()?;

    let state = app_state::AppState::new(cfg)?;
    let app = router::build_router(state);

    tracing::info!(%listen, config = %path, "reqtx server starting");
    let listener = tokio::net::TcpListener::bind(listen).await?;

    axum::serve(listener, app).await?;
    Ok(())
}
