// zone_engine_core/server/src/server/mod.rs
pub mod simulation;
