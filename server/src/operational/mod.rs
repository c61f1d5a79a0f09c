// zone_engine_core/server/src/operational/mod.rs
pub mod monitoring;
