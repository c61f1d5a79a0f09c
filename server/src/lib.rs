// zone_engine_core/server/src/lib.rs
pub mod concurrent;
pub mod core;
pub mod entities;
pub mod network;
pub mod operational;
pub mod server;
pub mod world;

pub use crate::core::error::{ServerError, ServerResult};
pub use crate::core::types::{Coord, EntityId, ZoneId};
pub use crate::world::{NearObjects, WorldMap, Zone};
