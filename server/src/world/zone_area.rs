// zone_engine_core/server/src/world/zone_area.rs
use crate::core::types::{Coord, ZoneId};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZoneType {
    Town,
    Field,
}

/// Rectangular sub-region of a zone. Edges are inclusive.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ZoneArea {
    #[serde(rename = "type")]
    pub kind: ZoneType,
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl ZoneArea {
    pub fn new(kind: ZoneType, left: i32, top: i32, right: i32, bottom: i32) -> Self {
        ZoneArea { kind, left, top, right, bottom }
    }

    pub fn belongs(&self, pos: &Coord) -> bool {
        let (min_x, max_x) = (self.left.min(self.right) as f32, self.left.max(self.right) as f32);
        let (min_z, max_z) = (self.top.min(self.bottom) as f32, self.top.max(self.bottom) as f32);
        pos.x >= min_x && pos.x <= max_x && pos.z >= min_z && pos.z <= max_z
    }

    pub fn is_town(&self) -> bool {
        self.kind == ZoneType::Town
    }
}

/// Identity and primary area of a zone, for lookup tables.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ZoneInfo {
    pub id: ZoneId,
    pub area: ZoneArea,
}
