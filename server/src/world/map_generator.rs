// zone_engine_core/server/src/world/map_generator.rs
use crate::core::constants::*;
use crate::core::types::Coord;
use crate::entities::TeleportBuilding;
use crate::world::grid;
use crate::world::map_loader::{MapData, NpcSpawn, TerrainData, ZoneData};
use crate::world::models::{ObjectKind, PlacedObject};
use crate::world::zone_area::{ZoneArea, ZoneType};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Builds a small deterministic demo world: a block of zones with rolling
/// terrain, a town in the first zone, rocks, bridges, and a teleporter per zone.
pub struct MapGenerator {
    rng: StdRng,
    next_entity_id: u32,
    next_object_id: u32,
}

impl MapGenerator {
    pub fn new(seed: u64) -> Self {
        MapGenerator { rng: StdRng::seed_from_u64(seed), next_entity_id: 1, next_object_id: 1 }
    }

    /// `width` x `height` zones starting at grid cell (`origin_x`, `origin_y`).
    pub fn generate(&mut self, origin_x: u8, origin_y: u8, width: u8, height: u8) -> MapData {
        let mut map = MapData { default_height: 0.0, zones: Vec::new(), objects: Vec::new() };
        let max_x = origin_x.saturating_add(width.max(1) - 1);
        let max_y = origin_y.saturating_add(height.max(1) - 1);

        for gy in origin_y..=max_y {
            for gx in origin_x..=max_x {
                let zone_id = grid::zone_id(gx, gy);
                let mut zone = ZoneData {
                    grid_x: gx,
                    grid_y: gy,
                    terrain: Some(self.create_terrain()),
                    areas: Vec::new(),
                    buildings: Vec::new(),
                    npcs: Vec::new(),
                };

                if gx == origin_x && gy == origin_y {
                    zone.areas.push(Self::create_town_area());
                }
                zone.buildings.push(self.create_teleporter(zone_id, gx, gy, max_x, max_y));
                zone.npcs.extend(self.create_npcs(8));
                map.objects.extend(self.create_rocks(zone_id, 6));
                map.objects.push(self.create_bridge(zone_id));
                zone.terrain = zone.terrain.map(|t| Self::block_rocks(t, &map.objects, zone_id));

                map.zones.push(zone);
            }
        }
        map
    }

    fn entity_id(&mut self) -> u32 {
        let id = self.next_entity_id;
        self.next_entity_id += 1;
        id
    }

    fn object_id(&mut self) -> u32 {
        let id = self.next_object_id;
        self.next_object_id += 1;
        id
    }

    fn create_terrain(&mut self) -> TerrainData {
        let n = TERRAIN_VERTICES_PER_SIDE;
        let phase_x = self.rng.gen_range(0.0..std::f32::consts::TAU);
        let phase_z = self.rng.gen_range(0.0..std::f32::consts::TAU);
        let amplitude = self.rng.gen_range(5.0..25.0);
        let mut heights = Vec::with_capacity(n * n);
        for row in 0..n {
            for col in 0..n {
                let u = col as f32 / (n - 1) as f32 * std::f32::consts::TAU;
                let v = row as f32 / (n - 1) as f32 * std::f32::consts::TAU;
                heights.push(amplitude * ((u + phase_x).sin() + (v + phase_z).cos()) * 0.5);
            }
        }
        TerrainData { columns: n, rows: n, tile_size: TERRAIN_TILE_SIZE, heights, blocked: Vec::new() }
    }

    fn create_town_area() -> ZoneArea {
        let margin = (ZONE_SIZE * 0.25) as i32;
        ZoneArea::new(ZoneType::Town, margin, margin, ZONE_SIZE as i32 - margin, ZONE_SIZE as i32 - margin)
    }

    fn create_teleporter(&mut self, zone_id: i16, gx: u8, gy: u8, max_x: u8, max_y: u8) -> TeleportBuilding {
        let center = ZONE_SIZE / 2.0;
        let mut building = TeleportBuilding::new(self.entity_id(), 1000, Coord::new(zone_id, center, 0.0, center));
        if gx < max_x {
            let east = grid::zone_id(gx + 1, gy);
            building = building.with_destination("east gate", Coord::new(east, center, 0.0, center), 100);
        }
        if gy < max_y {
            let north = grid::zone_id(gx, gy + 1);
            building = building.with_destination("north gate", Coord::new(north, center, 0.0, center), 100);
        }
        building
    }

    fn create_npcs(&mut self, count: usize) -> Vec<NpcSpawn> {
        (0..count)
            .map(|_| NpcSpawn {
                id: self.entity_id(),
                ref_id: self.rng.gen_range(1..50),
                x: self.rng.gen_range(100.0..ZONE_SIZE - 100.0),
                y: 0.0,
                z: self.rng.gen_range(100.0..ZONE_SIZE - 100.0),
                max_hp: self.rng.gen_range(50..500),
            })
            .collect()
    }

    fn create_rocks(&mut self, zone_id: i16, count: usize) -> Vec<PlacedObject> {
        let center = ZONE_SIZE / 2.0;
        let mut rocks = Vec::with_capacity(count);
        while rocks.len() < count {
            let x = self.rng.gen_range(80.0..ZONE_SIZE - 160.0);
            let z = self.rng.gen_range(80.0..ZONE_SIZE - 160.0);
            // Keep the teleporter reachable.
            if (x - center).abs() < 150.0 && (z - center).abs() < 150.0 {
                continue;
            }
            let size = self.rng.gen_range(20.0..60.0);
            rocks.push(PlacedObject {
                id: self.object_id(),
                zone: zone_id,
                kind: ObjectKind::Obstacle,
                min_x: x,
                min_z: z,
                max_x: x + size,
                max_z: z + size,
                surface_height: self.rng.gen_range(10.0..40.0),
            });
        }
        rocks
    }

    fn create_bridge(&mut self, zone_id: i16) -> PlacedObject {
        let z = self.rng.gen_range(200.0..ZONE_SIZE - 200.0);
        PlacedObject {
            id: self.object_id(),
            zone: zone_id,
            kind: ObjectKind::Platform,
            min_x: 300.0,
            min_z: z,
            max_x: 700.0,
            max_z: z + 40.0,
            surface_height: 30.0,
        }
    }

    /// Rocks sit on unwalkable ground, so the navmesh agrees with the models.
    fn block_rocks(mut terrain: TerrainData, objects: &[PlacedObject], zone_id: i16) -> TerrainData {
        terrain.blocked.extend(
            objects
                .iter()
                .filter(|o| o.zone == zone_id && o.kind == ObjectKind::Obstacle)
                .map(|o| [o.min_x, o.min_z, o.max_x, o.max_z]),
        );
        terrain
    }
}
