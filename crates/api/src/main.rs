use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use api::{build_router, ApiState};
use collector::PetitionService;
use common::{config::AppConfig, logging};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_logging("info");
    let config = AppConfig::load()?;
    let service = Arc::new(PetitionService::from_config(&config)?);
    let state = Arc::new(ApiState {
        service,
        metrics_path: config.observability.metrics_path.clone(),
    });
    let app = build_router(state);

    let addr: SocketAddr = config.api.bind.parse()?;
    info!(%addr, base_url = %config.petitions.base_url, "api listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
