use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use volumatic::{CityDataset, Session, VERSION, VolumaticConfig, ai, logging, web};

#[tokio::main]
async fn main() -> Result<()> {
    // Optional explicit config path as the only argument
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    // Warnings raised while loading go to a temporary stderr subscriber
    let config = logging::with_bootstrap(|| VolumaticConfig::load_from_path(config_path))
        .context("Failed to load configuration")?;

    logging::init(&config.logging)?;
    info!("Starting Volumatic {}", VERSION);

    let dataset = Arc::new(CityDataset::bundled().context("Failed to load city data")?);
    info!("Loaded {} monitored cities", dataset.len());

    let intelligence = ai::from_config(&config.ai);
    let session = Arc::new(Session::new(
        dataset,
        intelligence,
        config.geolocation.exact_match_radius_km,
    ));

    web::run(&config.server, session).await
}
