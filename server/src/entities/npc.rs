// zone_engine_core/server/src/entities/npc.rs
use super::WorldEntity;
use crate::core::types::{Coord, EntityId, EntityKind};

/// Monster or merchant spawned from a spawn point.
#[derive(Clone, Debug, PartialEq)]
pub struct Npc {
    pub id: EntityId,
    /// Reference id into the character data table.
    pub ref_id: u32,
    pub position: Coord,
    pub hp: u32,
    pub max_hp: u32,
}

impl Npc {
    pub fn new(id: EntityId, ref_id: u32, position: Coord, max_hp: u32) -> Self {
        Npc { id, ref_id, position, hp: max_hp, max_hp }
    }

    pub fn is_dead(&self) -> bool {
        self.hp == 0
    }

    /// Returns true if this hit killed the npc.
    pub fn apply_damage(&mut self, damage: u32) -> bool {
        if self.hp == 0 {
            return false;
        }
        self.hp = self.hp.saturating_sub(damage);
        self.hp == 0
    }
}

impl WorldEntity for Npc {
    const KIND: EntityKind = EntityKind::Npc;

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
