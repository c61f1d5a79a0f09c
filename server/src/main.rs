// zone_engine_core/server/src/main.rs
use anyhow::Context;
use std::sync::Arc;
use tracing::{error, info};
use zone_engine_core::core::config::{WorldConfig, ZoneQueryConfig};
use zone_engine_core::operational::monitoring::{init_logging, MetricsSystem};
use zone_engine_core::server::simulation::SimulationLoop;
use zone_engine_core::world::map_generator::MapGenerator;
use zone_engine_core::world::map_loader::MapData;

const DEMO_SEED: u64 = 0x5EED;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = init_logging() {
        eprintln!("Failed to initialize logging: {:?}", e);
        return Err(e);
    }

    info!("Zone engine starting up...");

    let config = match std::env::args().nth(1) {
        Some(path) => WorldConfig::from_yaml_file(&path).with_context(|| format!("Failed to load config {}", path))?,
        None => WorldConfig::default(),
    };
    info!("World configuration loaded. Tick rate: {}", config.tick_rate);

    let metrics = MetricsSystem::new(config.metrics_addr)?;

    let map = match &config.map_file {
        Some(path) => MapData::from_json_file(path).with_context(|| format!("Failed to load map {}", path))?,
        None => {
            info!("No map file configured; generating demo world");
            MapGenerator::new(DEMO_SEED).generate(100, 60, 4, 4)
        }
    };
    let world = Arc::new(map.build(ZoneQueryConfig::from(&config)).context("Failed to build world")?);
    metrics.update_zone_count(world.zone_count());

    let simulation = SimulationLoop::new(world, &config).context("Failed to start simulation")?;

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    };
    simulation.run(config.tick_duration(), shutdown).await;
    metrics.record_uptime();

    info!("Zone engine shut down.");
    Ok(())
}
