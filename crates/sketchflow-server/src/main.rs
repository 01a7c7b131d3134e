//! SketchFlow WebSocket relay server binary.

use sketchflow_server::{Config, RoomRelay, router};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sketchflow_server=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env()?;
    let app = router(Arc::new(RoomRelay::new()), &config);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("SketchFlow relay server listening on {}", listener.local_addr()?);
    info!("WebSocket endpoint: ws://{}/ws", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
