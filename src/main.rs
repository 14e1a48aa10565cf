use std::env;

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;

use ragdocs_backend::core::logging;
use ragdocs_backend::server::router::router;
use ragdocs_backend::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let state = AppState::initialize()?;
    logging::init(&state.paths);

    let port = env::var("PORT")
        .ok()
        .and_then(|val| val.parse::<u16>().ok())
        .unwrap_or(0);
    let bind_addr = format!("127.0.0.1:{}", port);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    let addr = listener.local_addr()?;

    // The supervising process reads the bound port from stdout.
    println!("RAGDOCS_PORT={}", addr.port());
    tracing::info!("Listening on {}", addr);

    match state.pipeline.engine().health_check().await {
        Ok(true) => tracing::info!("Answer engine reachable"),
        Ok(false) | Err(_) => {
            tracing::warn!("Answer engine not reachable yet; chat will fail until it is")
        }
    }

    let app: Router = router(state);
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
