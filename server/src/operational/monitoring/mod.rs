// zone_engine_core/server/src/operational/monitoring/mod.rs
pub mod metrics;

pub use metrics::{init_logging, MetricsSystem};
