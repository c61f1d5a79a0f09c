// zone_engine_core/server/src/network/mod.rs
pub mod session;
