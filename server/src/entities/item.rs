// zone_engine_core/server/src/entities/item.rs
use super::WorldEntity;
use crate::core::types::{Coord, EntityId, EntityKind};

/// Item lying on the ground.
#[derive(Clone, Debug, PartialEq)]
pub struct DropableItem {
    pub id: EntityId,
    pub ref_id: u32,
    pub quantity: u16,
    /// Player allowed to pick it up first, if any.
    pub owner: Option<EntityId>,
    pub position: Coord,
}

impl DropableItem {
    pub fn new(id: EntityId, ref_id: u32, quantity: u16, position: Coord) -> Self {
        DropableItem { id, ref_id, quantity, owner: None, position }
    }

    pub fn with_owner(mut self, owner: EntityId) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn can_pick_up(&self, player: EntityId) -> bool {
        self.owner.map_or(true, |owner| owner == player)
    }
}

impl WorldEntity for DropableItem {
    const KIND: EntityKind = EntityKind::Item;

    fn id(&self) -> EntityId {
        self.id
    }

    fn position(&self) -> Coord {
        self.position
    }

    fn set_position(&mut self, position: Coord) {
        self.position = position;
    }
}
