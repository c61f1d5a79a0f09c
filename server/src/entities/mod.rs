// zone_engine_core/server/src/entities/mod.rs
pub mod building;
pub mod item;
pub mod npc;
pub mod player;

pub use building::TeleportBuilding;
pub use item::DropableItem;
pub use npc::Npc;
pub use player::Player;

use crate::core::types::{Coord, EntityId, EntityKind};

/// Anything a zone registry can own.
pub trait WorldEntity: Clone + Send + Sync + 'static {
    const KIND: EntityKind;

    fn id(&self) -> EntityId;

    fn position(&self) -> Coord;

    fn set_position(&mut self, position: Coord);
}
