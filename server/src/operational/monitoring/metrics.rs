// zone_engine_core/server/src/operational/monitoring/metrics.rs
use anyhow::{Context, Result};
use metrics::{describe_counter, describe_gauge, describe_histogram, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;
use tracing::info;

pub struct MetricsSystem {
    start_time: Instant,
}

impl MetricsSystem {
    /// Describes every metric the engine emits and, when an address is given,
    /// installs the Prometheus exporter on it.
    pub fn new(exporter_addr: Option<SocketAddr>) -> Result<Self> {
        if let Some(addr) = exporter_addr {
            PrometheusBuilder::new()
                .with_http_listener(addr)
                .install()
                .context("Failed to install Prometheus exporter")?;
            info!("Prometheus exporter listening on {}", addr);
        }

        describe_counter!("zone_entities_inserted_total", "Entities inserted into zone registries");
        describe_counter!("zone_entities_removed_total", "Entities removed from zone registries");
        describe_counter!("zone_motion_clipped_total", "Motions stopped short of their destination");
        describe_counter!("zone_transfers_total", "Players moved between zones");
        describe_counter!("simulation_requests_total", "Requests taken off the simulation queue");
        describe_counter!("simulation_requests_dropped_total", "Requests dropped for unknown entities or zones");
        describe_gauge!("world_players", "Players currently in the world");
        describe_gauge!("world_zones", "Zones currently registered");
        describe_gauge!("server_uptime_seconds", "Seconds since the metrics system started");
        describe_histogram!("simulation_tick_seconds", "Tick processing time in seconds");

        Ok(MetricsSystem { start_time: Instant::now() })
    }

    pub fn update_zone_count(&self, count: usize) {
        gauge!("world_zones").set(count as f64);
    }

    pub fn record_uptime(&self) {
        gauge!("server_uptime_seconds").set(self.start_time.elapsed().as_secs_f64());
    }
}

// Logging setup
pub fn init_logging() -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "zone_engine_core=info,warn".into()))
        .with(fmt::layer())
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    Ok(())
}
