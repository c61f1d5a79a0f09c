// zone_engine_core/server/src/entities/player.rs
use super::WorldEntity;
use crate::core::types::{Coord, EntityId, EntityKind};

#[derive(Clone, Debug, PartialEq)]
pub struct Player {
    pub id: EntityId,
    pub name: String,
    pub level: u8,
    pub position: Coord,
    pub alive: bool,
}

impl Player {
    pub fn new(id: EntityId, name: impl Into<String>, position: Coord) -> Self {
        Player {
            id,
            name: name.into(),
            level: 1,
            position,
            alive: true,
        }
    }
}

impl WorldEntity for Player {
    const KIND: EntityKind = EntityKind::Player;

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
