// zone_engine_core/server/src/world/map_loader.rs
use crate::core::config::ZoneQueryConfig;
use crate::core::constants::{TERRAIN_TILE_SIZE, TERRAIN_VERTICES_PER_SIDE};
use crate::core::error::{ServerError, ServerResult};
use crate::core::types::Coord;
use crate::entities::{Npc, TeleportBuilding};
use crate::world::grid;
use crate::world::models::{ModelManager, PlacedObject};
use crate::world::navmesh::{Heightfield, TerrainNavMesh};
use crate::world::world_map::WorldMap;
use crate::world::zone_area::ZoneArea;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Terrain samples for one zone. `blocked` lists local rectangles
/// `[min_x, min_z, max_x, max_z]` that cannot be walked.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TerrainData {
    #[serde(default = "default_vertices")]
    pub columns: usize,
    #[serde(default = "default_vertices")]
    pub rows: usize,
    #[serde(default = "default_tile_size")]
    pub tile_size: f32,
    pub heights: Vec<f32>,
    #[serde(default)]
    pub blocked: Vec<[f32; 4]>,
}

fn default_vertices() -> usize {
    TERRAIN_VERTICES_PER_SIDE
}

fn default_tile_size() -> f32 {
    TERRAIN_TILE_SIZE
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NpcSpawn {
    pub id: u32,
    pub ref_id: u32,
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    pub z: f32,
    pub max_hp: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ZoneData {
    pub grid_x: u8,
    pub grid_y: u8,
    #[serde(default)]
    pub terrain: Option<TerrainData>,
    #[serde(default)]
    pub areas: Vec<ZoneArea>,
    #[serde(default)]
    pub buildings: Vec<TeleportBuilding>,
    #[serde(default)]
    pub npcs: Vec<NpcSpawn>,
}

/// On-disk world description.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MapData {
    #[serde(default)]
    pub default_height: f32,
    #[serde(default)]
    pub zones: Vec<ZoneData>,
    #[serde(default)]
    pub objects: Vec<PlacedObject>,
}

impl MapData {
    pub fn from_json_str(text: &str) -> ServerResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> ServerResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    pub fn to_json_string(&self) -> ServerResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    fn build_navmesh(&self) -> ServerResult<TerrainNavMesh> {
        let mut navmesh = TerrainNavMesh::new(self.default_height);
        for zone in &self.zones {
            let Some(terrain) = &zone.terrain else { continue };
            let id = grid::zone_id(zone.grid_x, zone.grid_y);
            let mut field = Heightfield::new(terrain.columns, terrain.rows, terrain.tile_size, terrain.heights.clone())
                .map_err(|e| ServerError::MapData(format!("zone ({}, {}): {}", zone.grid_x, zone.grid_y, e)))?;
            for rect in &terrain.blocked {
                field.block_rect(rect[0], rect[1], rect[2], rect[3]);
            }
            navmesh.insert(id, field);
        }
        Ok(navmesh)
    }

    /// Builds the world: terrain, static objects, then every zone and its
    /// initial population.
    pub fn build(&self, query: ZoneQueryConfig) -> ServerResult<WorldMap> {
        let navmesh = Arc::new(self.build_navmesh()?);
        let models = Arc::new(ModelManager::new(self.objects.clone()));
        let world = WorldMap::new(navmesh, models, query);

        for data in &self.zones {
            let zone = world.create_zone(data.grid_x, data.grid_y);
            for area in &data.areas {
                zone.insert_delimited_area(*area);
            }
            for building in &data.buildings {
                let mut building = building.clone();
                building.position.zone = zone.id();
                if zone.insert_building(building).is_some() {
                    warn!("Zone {} lists a building id twice", zone.id());
                }
            }
            for spawn in &data.npcs {
                let position = Coord::new(zone.id(), spawn.x, spawn.y, spawn.z);
                if !zone.contains(position.x, position.z) {
                    return Err(ServerError::OutOfBounds { zone: zone.id(), x: spawn.x, z: spawn.z });
                }
                zone.insert_npc(Npc::new(spawn.id, spawn.ref_id, position, spawn.max_hp));
            }
        }

        info!(
            "World built: {} zones, {} static objects",
            world.zone_count(),
            self.objects.len()
        );
        Ok(world)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::zone_area::ZoneType;

    const SAMPLE: &str = r#"{
        "default_height": 5.0,
        "zones": [
            {
                "grid_x": 10, "grid_y": 4,
                "terrain": { "columns": 2, "rows": 2, "tile_size": 1920.0, "heights": [0.0, 0.0, 10.0, 10.0] },
                "areas": [ { "type": "Town", "left": 0, "top": 0, "right": 400, "bottom": 400 } ],
                "buildings": [ { "id": 1, "ref_id": 77, "position": { "zone": 0, "x": 100.0, "y": 0.0, "z": 100.0 } } ],
                "npcs": [ { "id": 500, "ref_id": 3, "x": 800.0, "z": 800.0, "max_hp": 40 } ]
            },
            { "grid_x": 11, "grid_y": 4 }
        ],
        "objects": [
            { "id": 1, "zone": 1034, "kind": "Platform", "min_x": 0.0, "min_z": 0.0, "max_x": 50.0, "max_z": 50.0, "surface_height": 30.0 }
        ]
    }"#;

    #[test]
    fn sample_world_builds() {
        let world = MapData::from_json_str(SAMPLE).unwrap().build(ZoneQueryConfig::default()).unwrap();
        assert_eq!(world.zone_count(), 2);
        let zone = world.zone(grid::zone_id(10, 4)).unwrap();
        assert!(zone.is_inside_town(&Coord::new(zone.id(), 200.0, 0.0, 200.0)));
        assert_eq!(zone.find_default_building().map(|b| b.ref_id), Some(77));
        assert_eq!(zone.find_npc(500).map(|n| n.max_hp), Some(40));
        assert!((zone.terrain_height(0.0, 1920.0) - 10.0).abs() < 1e-3);
        assert_eq!(zone.object_height(10.0, 10.0), 30.0);

        let plain = world.zone(grid::zone_id(11, 4)).unwrap();
        assert_eq!(plain.terrain_height(500.0, 500.0), 5.0);
        assert_eq!(plain.info().area.kind, ZoneType::Field);
    }

    #[test]
    fn bad_terrain_is_reported() {
        let text = r#"{ "zones": [ { "grid_x": 0, "grid_y": 0, "terrain": { "heights": [1.0, 2.0] } } ] }"#;
        let err = MapData::from_json_str(text).unwrap().build(ZoneQueryConfig::default()).unwrap_err();
        assert!(matches!(err, ServerError::MapData(_)));
    }

    #[test]
    fn npc_outside_zone_is_rejected() {
        let text = r#"{ "zones": [ { "grid_x": 0, "grid_y": 0,
            "npcs": [ { "id": 1, "ref_id": 1, "x": 2500.0, "z": 10.0, "max_hp": 1 } ] } ] }"#;
        let err = MapData::from_json_str(text).unwrap().build(ZoneQueryConfig::default()).unwrap_err();
        assert!(matches!(err, ServerError::OutOfBounds { .. }));
    }

    #[test]
    fn malformed_json_is_a_json_error() {
        assert!(matches!(MapData::from_json_str("{ zones: "), Err(ServerError::JsonError(_))));
    }
}
