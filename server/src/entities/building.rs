// zone_engine_core/server/src/entities/building.rs
use super::WorldEntity;
use crate::core::types::{Coord, EntityId, EntityKind, ZoneId};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TeleportDestination {
    pub name: String,
    pub position: Coord,
    pub fee: u32,
}

/// Static structure that moves players to another zone.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TeleportBuilding {
    pub id: EntityId,
    pub ref_id: u32,
    pub position: Coord,
    #[serde(default)]
    pub destinations: Vec<TeleportDestination>,
}

impl TeleportBuilding {
    pub fn new(id: EntityId, ref_id: u32, position: Coord) -> Self {
        TeleportBuilding { id, ref_id, position, destinations: Vec::new() }
    }

    pub fn with_destination(mut self, name: impl Into<String>, position: Coord, fee: u32) -> Self {
        self.destinations.push(TeleportDestination { name: name.into(), position, fee });
        self
    }

    pub fn destination_zones(&self) -> impl Iterator<Item = ZoneId> + '_ {
        self.destinations.iter().map(|d| d.position.zone)
    }
}

impl WorldEntity for TeleportBuilding {
    const KIND: EntityKind = EntityKind::Building;

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
