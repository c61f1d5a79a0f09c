// zone_engine_core/server/src/concurrent/mod.rs
pub mod channel;
pub mod thread_pools;
