// zone_engine_core/server/src/world/mod.rs
pub mod grid;
pub mod map_generator;
pub mod map_loader;
pub mod models;
pub mod navmesh;
pub mod world_map;
pub mod zone;
pub mod zone_area;

pub use world_map::WorldMap;
pub use zone::{NearObjects, Zone};
