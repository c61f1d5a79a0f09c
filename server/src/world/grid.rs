// zone_engine_core/server/src/world/grid.rs
//! Zone id arithmetic. The world is a grid of 1920x1920 cells:
//!
//! ```text
//!  ( Z / grid Y)
//!  ^
//!  |  ----------------
//!  |  | Z1 | Z2 | Z3 |
//!  |  ----------------
//!  |  | Z4 | Z5 | Z6 |
//!  |  ----------------
//!  |  | Z7 | Z8 | Z9 |
//!  -------------------------> (X / grid X)
//! ```
//!
//! A zone id packs grid X in the low byte and grid Y in bits 8..=14. Bit 15
//! marks an instance zone, which has no neighbours.
use crate::core::constants::{INSTANCE_ZONE_FLAG, WORLD_GRID_HEIGHT, WORLD_GRID_WIDTH};
use crate::core::types::ZoneId;

const MAX_GRID_X: u8 = (WORLD_GRID_WIDTH - 1) as u8;
const MAX_GRID_Y: u8 = (WORLD_GRID_HEIGHT - 1) as u8;

#[inline]
pub fn zone_id(grid_x: u8, grid_y: u8) -> ZoneId {
    ((((grid_y & MAX_GRID_Y) as u16) << 8) | grid_x as u16) as ZoneId
}

#[inline]
pub fn instance_zone_id(grid_x: u8, grid_y: u8) -> ZoneId {
    (zone_id(grid_x, grid_y) as u16 | INSTANCE_ZONE_FLAG) as ZoneId
}

#[inline]
pub fn zone_coords(id: ZoneId) -> (u8, u8) {
    let raw = id as u16;
    ((raw & 0xFF) as u8, ((raw >> 8) as u8) & MAX_GRID_Y)
}

#[inline]
pub fn is_instance(id: ZoneId) -> bool {
    (id as u16) & INSTANCE_ZONE_FLAG != 0
}

/// Inclusive grid range of a zone and its neighbours.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AdjacentZone {
    pub min_x: u8,
    pub max_x: u8,
    pub min_y: u8,
    pub max_y: u8,
    instance: bool,
}

impl AdjacentZone {
    pub fn contains(&self, id: ZoneId) -> bool {
        if is_instance(id) != self.instance {
            return false;
        }
        let (x, y) = zone_coords(id);
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    pub fn len(&self) -> usize {
        (self.max_x - self.min_x + 1) as usize * (self.max_y - self.min_y + 1) as usize
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Every zone id in the range, row by row.
    pub fn zone_ids(&self) -> impl Iterator<Item = ZoneId> + '_ {
        (self.min_y..=self.max_y).flat_map(move |y| {
            (self.min_x..=self.max_x).map(move |x| {
                if self.instance {
                    instance_zone_id(x, y)
                } else {
                    zone_id(x, y)
                }
            })
        })
    }
}

/// Neighbouring zone range for `id`, clipped at the grid edges. Pure.
pub fn get_adjacent_zones(id: ZoneId) -> AdjacentZone {
    let (x, y) = zone_coords(id);
    if is_instance(id) {
        return AdjacentZone { min_x: x, max_x: x, min_y: y, max_y: y, instance: true };
    }
    AdjacentZone {
        min_x: x.saturating_sub(1),
        max_x: if x < MAX_GRID_X { x + 1 } else { MAX_GRID_X },
        min_y: y.saturating_sub(1),
        max_y: if y < MAX_GRID_Y { y + 1 } else { MAX_GRID_Y },
        instance: false,
    }
}
