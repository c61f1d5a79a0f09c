// zone_engine_core/server/src/core/types.rs
use crate::core::constants::ZONE_SIZE;
use crate::world::grid;
use serde::{Deserialize, Serialize};

pub type ZoneId = i16;
pub type EntityId = u32;

// --- Basic Geometric Types ---

/// A position inside a zone. `x` and `z` are horizontal and relative to the
/// zone origin, `y` is vertical.
#[derive(Clone, Debug, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coord {
    pub zone: ZoneId,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Coord {
    pub fn new(zone: ZoneId, x: f32, y: f32, z: f32) -> Self {
        Coord { zone, x, y, z }
    }

    /// World-space (x, z). Instance zones live outside the world grid and have none.
    pub fn world_xz(&self) -> Option<(f32, f32)> {
        if grid::is_instance(self.zone) {
            return None;
        }
        let (gx, gy) = grid::zone_coords(self.zone);
        Some((gx as f32 * ZONE_SIZE + self.x, gy as f32 * ZONE_SIZE + self.z))
    }

    /// Horizontal distance in world space. Positions in different instances,
    /// or an instance and the open world, are infinitely far apart.
    pub fn distance_xz(&self, other: &Coord) -> f32 {
        if self.zone == other.zone {
            let dx = self.x - other.x;
            let dz = self.z - other.z;
            return (dx * dx + dz * dz).sqrt();
        }
        match (self.world_xz(), other.world_xz()) {
            (Some((ax, az)), Some((bx, bz))) => {
                let dx = ax - bx;
                let dz = az - bz;
                (dx * dx + dz * dz).sqrt()
            }
            _ => f32::INFINITY,
        }
    }

    /// Re-express this position in the local frame of `zone`.
    pub fn relative_to(&self, zone: ZoneId) -> Option<Coord> {
        if self.zone == zone {
            return Some(*self);
        }
        if grid::is_instance(zone) {
            return None;
        }
        let (wx, wz) = self.world_xz()?;
        let (gx, gy) = grid::zone_coords(zone);
        Some(Coord {
            zone,
            x: wx - gx as f32 * ZONE_SIZE,
            y: self.y,
            z: wz - gy as f32 * ZONE_SIZE,
        })
    }

    pub fn lerp(&self, to: &Coord, t: f32) -> Coord {
        Coord {
            zone: self.zone,
            x: self.x + (to.x - self.x) * t,
            y: self.y + (to.y - self.y) * t,
            z: self.z + (to.z - self.z) * t,
        }
    }
}

/// Horizontal extent of a zone in its local frame.
#[derive(Clone, Debug, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoneBounds {
    pub min_x: f32,
    pub max_x: f32,
    pub min_z: f32,
    pub max_z: f32,
}

impl ZoneBounds {
    pub fn standard() -> Self {
        ZoneBounds { min_x: 0.0, max_x: ZONE_SIZE, min_z: 0.0, max_z: ZONE_SIZE }
    }

    pub fn is_valid(&self) -> bool {
        self.min_x.is_finite()
            && self.max_x.is_finite()
            && self.min_z.is_finite()
            && self.max_z.is_finite()
            && self.min_x <= self.max_x
            && self.min_z <= self.max_z
    }

    #[inline]
    pub fn contains(&self, x: f32, z: f32) -> bool {
        x >= self.min_x && x <= self.max_x && z >= self.min_z && z <= self.max_z
    }

    #[inline]
    pub fn clamp(&self, x: f32, z: f32) -> (f32, f32) {
        (x.clamp(self.min_x, self.max_x), z.clamp(self.min_z, self.max_z))
    }
}

impl Default for ZoneBounds {
    fn default() -> Self {
        Self::standard()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Player,
    Npc,
    Item,
    Building,
}

/// Stable reference to an entity owned by some zone.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EntityHandle {
    pub zone: ZoneId,
    pub kind: EntityKind,
    pub id: EntityId,
}

impl EntityHandle {
    pub fn new(zone: ZoneId, kind: EntityKind, id: EntityId) -> Self {
        EntityHandle { zone, kind, id }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ZoneEvent {
    EntityEntered { zone: ZoneId, kind: EntityKind, id: EntityId, position: Coord },
    EntityLeft { zone: ZoneId, kind: EntityKind, id: EntityId },
    EntityMoved { zone: ZoneId, kind: EntityKind, id: EntityId, position: Coord },
}

impl ZoneEvent {
    pub fn entity_id(&self) -> EntityId {
        match self {
            ZoneEvent::EntityEntered { id, .. }
            | ZoneEvent::EntityLeft { id, .. }
            | ZoneEvent::EntityMoved { id, .. } => *id,
        }
    }
}
