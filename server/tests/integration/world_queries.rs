// zone_engine_core/server/tests/integration/world_queries.rs

use proptest::prelude::*;
use std::collections::BTreeSet;
use std::sync::Arc;
use zone_engine_core::core::config::ZoneQueryConfig;
use zone_engine_core::core::types::Coord;
use zone_engine_core::entities::{Npc, Player};
use zone_engine_core::world::grid::{get_adjacent_zones, zone_coords, zone_id};
use zone_engine_core::world::map_generator::MapGenerator;
use zone_engine_core::world::models::{ModelManager, ObjectKind, PlacedObject};
use zone_engine_core::world::navmesh::{Heightfield, TerrainNavMesh};
use zone_engine_core::world::{NearObjects, WorldMap, Zone};

const ZONE: i16 = 0x0A05;

fn hilly_zone() -> Zone {
    let n = 97;
    let mut heights = Vec::with_capacity(n * n);
    for row in 0..n {
        for col in 0..n {
            heights.push(((col as f32) * 0.3).sin() * 20.0 + (row as f32) * 0.5);
        }
    }
    let mut field = Heightfield::new(n, n, 20.0, heights).unwrap();
    field.block_rect(1000.0, 0.0, 1040.0, 1920.0);
    let mut mesh = TerrainNavMesh::new(0.0);
    mesh.insert(ZONE, field);

    let zone = Zone::new(ZONE, Arc::new(mesh));
    zone.set_model_manager(Arc::new(ModelManager::new(vec![
        PlacedObject {
            id: 1,
            zone: ZONE,
            kind: ObjectKind::Platform,
            min_x: 200.0,
            min_z: 200.0,
            max_x: 400.0,
            max_z: 260.0,
            surface_height: 45.0,
        },
        PlacedObject {
            id: 2,
            zone: ZONE,
            kind: ObjectKind::Obstacle,
            min_x: 600.0,
            min_z: 600.0,
            max_x: 650.0,
            max_z: 650.0,
            surface_height: 25.0,
        },
    ])));
    zone
}

fn at(x: f32, z: f32) -> Coord {
    Coord::new(ZONE, x, 0.0, z)
}

#[test]
fn test_navmesh_wall_clips_motion() {
    let zone = hilly_zone();
    let src = at(900.0, 300.0);
    let dest = at(1200.0, 300.0);
    let mut end = src;
    assert!(!zone.resolve_motion(&src, &dest, &mut end));
    // The wall starts at tile 50, x = 1000.
    assert!(end.x > src.x && end.x < 1000.0);
    assert!(1000.0 - end.x < 0.1);
}

#[test]
fn test_obstacle_model_clips_diagonal_motion() {
    let zone = hilly_zone();
    let src = at(500.0, 500.0);
    let dest = at(700.0, 700.0);
    let mut end = src;
    assert!(!zone.resolve_motion(&src, &dest, &mut end));
    assert!(end.x < 600.0 && end.z < 600.0);
    assert!(end.x > 599.9 || end.z > 599.9);
    assert!((end.x - end.z).abs() < 1e-3);
}

#[test]
fn test_platform_height_depends_on_previous_height() {
    let zone = hilly_zone();
    let ground = zone.terrain_height(300.0, 230.0);
    assert_eq!(zone.object_height(300.0, 230.0), 45.0);
    assert_eq!(zone.height_at(300.0, 230.0, 44.0), 45.0);
    assert_eq!(zone.height_at(300.0, 230.0, ground), ground);
}

#[test]
fn test_world_fan_out_from_generated_map() {
    let world = MapGenerator::new(11).generate(20, 20, 3, 3).build(ZoneQueryConfig::default()).unwrap();
    let center = zone_id(21, 21);
    assert_eq!(world.adjacent_zones(center).len(), 9);
    assert_eq!(world.adjacent_zones(zone_id(20, 20)).len(), 4);

    world.spawn_player(Player::new(90_000, "viewer", Coord::new(center, 5.0, 0.0, 5.0))).unwrap();
    let mut objs = NearObjects::new();
    assert!(world.get_near_objects(center, 90_000, &mut objs));
    assert!(objs.player_ids().is_empty());
    for npc in &objs.npcs {
        let origin = Coord::new(center, 5.0, 0.0, 5.0);
        assert!(origin.distance_xz(&npc.position) <= 1000.0);
    }

    let mut ids = BTreeSet::new();
    world.get_near_object_ids(center, &mut ids);
    // 9 zones: 8 npcs and one teleporter each, plus the viewer.
    assert_eq!(ids.len(), 9 * 9 + 1);
}

#[test]
fn test_npc_in_neighbour_zone_is_visible() {
    let world = WorldMap::new(
        Arc::new(TerrainNavMesh::new(0.0)),
        Arc::new(ModelManager::default()),
        ZoneQueryConfig::default(),
    );
    let north = world.create_zone(8, 9);
    let south = world.create_zone(8, 8);
    world.spawn_player(Player::new(1, "s", Coord::new(south.id(), 960.0, 0.0, 1500.0))).unwrap();
    north.insert_npc(Npc::new(7, 1, Coord::new(north.id(), 960.0, 0.0, 300.0), 10));
    north.insert_npc(Npc::new(8, 1, Coord::new(north.id(), 960.0, 0.0, 1000.0), 10));

    let mut objs = NearObjects::new();
    assert!(world.get_near_objects(south.id(), 1, &mut objs));
    assert_eq!(objs.npcs.iter().map(|n| n.id).collect::<Vec<_>>(), vec![7]);
}

proptest! {
    #[test]
    fn prop_heights_are_finite_and_repeatable(x in -500.0f32..2500.0, z in -500.0f32..2500.0, y in -100.0f32..100.0) {
        let zone = hilly_zone();
        prop_assert!(zone.terrain_height(x, z).is_finite());
        let object = zone.object_height(x, z);
        prop_assert!(object.is_finite() || object == f32::NEG_INFINITY);
        let first = zone.height_at(x, z, y);
        prop_assert_eq!(first, zone.height_at(x, z, y));
        prop_assert!(first.is_finite());
    }

    #[test]
    fn prop_motion_stays_inside_bounds(
        sx in 0.0f32..1920.0, sz in 0.0f32..1920.0,
        dx in -1000.0f32..3000.0, dz in -1000.0f32..3000.0,
    ) {
        let zone = hilly_zone();
        let src = at(sx, sz);
        let dest = at(dx, dz);
        let mut end = src;
        let reached = zone.resolve_motion(&src, &dest, &mut end);
        prop_assert!(zone.contains(end.x, end.z));
        if reached {
            prop_assert_eq!(end, dest);
        }
        // Never further than the destination.
        prop_assert!(src.distance_xz(&end) <= src.distance_xz(&dest) + 1e-2);
    }

    #[test]
    fn prop_adjacency_never_leaves_the_grid(x in 0u8..=255, y in 0u8..=127) {
        let id = zone_id(x, y);
        let adj = get_adjacent_zones(id);
        prop_assert!(adj.contains(id));
        prop_assert!(adj.len() >= 4 && adj.len() <= 9);
        for neighbour in adj.zone_ids() {
            let (nx, ny) = zone_coords(neighbour);
            prop_assert!((nx as i32 - x as i32).abs() <= 1);
            prop_assert!((ny as i32 - y as i32).abs() <= 1);
            prop_assert!(ny <= 127);
        }
    }
}
