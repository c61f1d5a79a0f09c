// zone_engine_core/server/tests/integration/zone_registry.rs

use std::sync::Arc;
use zone_engine_core::core::types::{Coord, ZoneBounds, ZoneEvent};
use zone_engine_core::entities::{DropableItem, Npc, Player, TeleportBuilding};
use zone_engine_core::world::grid::zone_id;
use zone_engine_core::world::navmesh::{NavigationMesh, TerrainNavMesh};
use zone_engine_core::world::zone_area::{ZoneArea, ZoneType};
use zone_engine_core::world::Zone;

fn create_zone() -> Zone {
    Zone::new(zone_id(20, 30), Arc::new(TerrainNavMesh::new(0.0)))
}

fn at(zone: &Zone, x: f32, z: f32) -> Coord {
    Coord::new(zone.id(), x, 0.0, z)
}

#[test]
fn test_player_insert_find_remove() {
    let zone = create_zone();
    for id in 0..10 {
        zone.insert_player(Player::new(id, format!("p{}", id), at(&zone, 10.0 * id as f32, 5.0)));
    }
    assert_eq!(zone.count(), 10);

    let found = zone.find_player(4).expect("player 4 should be registered");
    assert_eq!(found.name, "p4");
    assert_eq!(found.position, at(&zone, 40.0, 5.0));

    assert!(zone.remove_player(4));
    assert!(zone.find_player(4).is_none());
    assert_eq!(zone.count(), 9);
}

#[test]
fn test_registries_are_independent() {
    let zone = create_zone();
    zone.insert_player(Player::new(1, "p", at(&zone, 1.0, 1.0)));
    zone.insert_npc(Npc::new(1, 10, at(&zone, 2.0, 2.0), 100));
    zone.insert_item(DropableItem::new(1, 20, 3, at(&zone, 3.0, 3.0)).with_owner(1));
    zone.insert_building(TeleportBuilding::new(1, 30, at(&zone, 4.0, 4.0)));

    assert!(zone.remove_npc(1));
    assert!(zone.find_player(1).is_some());
    assert!(zone.find_item(1).map_or(false, |i| i.can_pick_up(1) && !i.can_pick_up(2)));
    assert!(zone.find_building(1).is_some());
    assert!(zone.find_npc(1).is_none());
    assert_eq!(zone.count(), 1);
}

#[test]
fn test_mutation_under_lock() {
    let zone = create_zone();
    zone.insert_npc(Npc::new(5, 1, at(&zone, 1.0, 1.0), 30));
    let killed = zone.with_npc_mut(5, |npc| npc.apply_damage(50));
    assert_eq!(killed, Some(true));
    assert!(zone.find_npc(5).map_or(false, |n| n.is_dead()));

    assert_eq!(zone.with_player_mut(99, |p| p.level += 1), None);
    zone.insert_player(Player::new(2, "lvl", at(&zone, 1.0, 1.0)));
    zone.with_player_mut(2, |p| p.level = 40);
    assert_eq!(zone.find_player(2).map(|p| p.level), Some(40));
}

#[test]
fn test_default_building_policy() {
    let zone = create_zone();
    assert!(zone.find_default_building().is_none());
    for id in [9, 3, 6] {
        zone.insert_building(TeleportBuilding::new(id, id * 10, at(&zone, 1.0, 1.0)));
    }
    assert_eq!(zone.find_default_building().map(|b| b.id), Some(3));
    // Replacing keeps a single entry per id.
    zone.insert_building(TeleportBuilding::new(3, 999, at(&zone, 1.0, 1.0)));
    assert_eq!(zone.find_default_building().map(|b| b.ref_id), Some(999));
}

#[test]
fn test_town_scenario() {
    let zone = create_zone();
    assert_eq!((zone.min_x(), zone.min_z(), zone.max_x(), zone.max_z()), (0.0, 0.0, 1920.0, 1920.0));
    assert!(!zone.is_inside_town(&at(&zone, 250.0, 250.0)));

    zone.insert_delimited_area(ZoneArea::new(ZoneType::Town, 0, 0, 500, 500));
    assert!(zone.is_inside_town(&at(&zone, 250.0, 250.0)));
    assert!(!zone.is_inside_town(&at(&zone, 1000.0, 1000.0)));
    assert_eq!(zone.info().area.kind, ZoneType::Town);
}

#[test]
fn test_insert_from_neighbour_frame_is_localized() {
    let zone = create_zone();
    let west = Coord::new(zone_id(19, 30), 1930.0, 0.0, 100.0);
    zone.insert_player(Player::new(1, "edge", west));
    let stored = zone.find_player(1).unwrap();
    assert_eq!(stored.position.zone, zone.id());
    assert!((stored.position.x - 10.0).abs() < 1e-3);
}

#[test]
fn test_channel_events_follow_registry() {
    let zone = create_zone();
    let channel = zone.channel();
    zone.insert_player(Player::new(1, "a", at(&zone, 1.0, 1.0)));
    zone.update_player_position(1, at(&zone, 2.0, 2.0));
    zone.take_player(1);

    let events: Vec<ZoneEvent> = std::iter::from_fn(|| channel.pop()).collect();
    assert_eq!(events.len(), 3);
    assert!(matches!(events[0], ZoneEvent::EntityEntered { id: 1, .. }));
    assert!(matches!(events[1], ZoneEvent::EntityMoved { id: 1, .. }));
    assert!(matches!(events[2], ZoneEvent::EntityLeft { id: 1, .. }));
    assert_eq!(channel.published_count(), 3);
}

#[test]
fn test_instance_zone_bounds() {
    let mesh: Arc<dyn NavigationMesh> = Arc::new(TerrainNavMesh::new(3.0));
    let bounds = ZoneBounds { min_x: 0.0, max_x: 640.0, min_z: 0.0, max_z: 320.0 };
    let zone = Zone::with_bounds(-100, bounds, mesh).unwrap();
    assert_eq!(zone.length(), 640.0);
    assert_eq!(zone.width(), 320.0);
    assert_eq!(zone.terrain_height(10_000.0, 10_000.0), 3.0);
}
