// zone_engine_core/server/tests/performance/concurrent_access.rs

use rand::Rng;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use zone_engine_core::core::config::ZoneQueryConfig;
use zone_engine_core::core::types::Coord;
use zone_engine_core::entities::Player;
use zone_engine_core::world::grid::zone_id;
use zone_engine_core::world::models::ModelManager;
use zone_engine_core::world::navmesh::TerrainNavMesh;
use zone_engine_core::world::{NearObjects, WorldMap, Zone};

const WRITER_THREADS: u32 = 8;
const PLAYERS_PER_WRITER: u32 = 250;
const READER_THREADS: usize = 4;

#[test]
fn test_concurrent_inserts_and_id_scans() {
    let zone = Zone::new(zone_id(50, 50), Arc::new(TerrainNavMesh::new(0.0)));
    let done = AtomicBool::new(false);
    let start = Instant::now();

    std::thread::scope(|s| {
        let writers: Vec<_> = (0..WRITER_THREADS)
            .map(|w| {
                let zone = &zone;
                s.spawn(move || {
                    let mut rng = rand::thread_rng();
                    for i in 0..PLAYERS_PER_WRITER {
                        let id = w * PLAYERS_PER_WRITER + i;
                        let position = Coord::new(zone.id(), rng.gen_range(0.0..1920.0), 0.0, rng.gen_range(0.0..1920.0));
                        assert!(zone.insert_player(Player::new(id, format!("p{}", id), position)).is_none());
                    }
                })
            })
            .collect();

        for _ in 0..READER_THREADS {
            let (zone, done) = (&zone, &done);
            s.spawn(move || {
                let mut last_len = 0;
                while !done.load(Ordering::Acquire) {
                    let mut ids = BTreeSet::new();
                    zone.get_near_object_ids(&mut ids);
                    // Inserts only: each snapshot is a superset of the previous one.
                    assert!(ids.len() >= last_len);
                    last_len = ids.len();
                    for id in ids {
                        if let Some(player) = zone.find_player(id) {
                            assert_eq!(player.id, id);
                            assert_eq!(player.name, format!("p{}", id));
                        }
                    }
                }
            });
        }

        for writer in writers {
            writer.join().unwrap();
        }
        done.store(true, Ordering::Release);
    });

    assert_eq!(zone.count(), (WRITER_THREADS * PLAYERS_PER_WRITER) as usize);
    println!("Concurrent insert/scan finished in {:?}", start.elapsed());
}

#[test]
fn test_concurrent_transfers_never_duplicate() {
    let world = WorldMap::new(
        Arc::new(TerrainNavMesh::new(0.0)),
        Arc::new(ModelManager::default()),
        ZoneQueryConfig::default(),
    );
    let west = world.create_zone(10, 10);
    let east = world.create_zone(11, 10);
    let total: u32 = 400;
    for id in 0..total {
        world.spawn_player(Player::new(id, "t", Coord::new(west.id(), 1900.0, 0.0, 960.0))).unwrap();
    }

    std::thread::scope(|s| {
        for chunk in 0..4u32 {
            let world = &world;
            let (from, to) = (west.id(), east.id());
            s.spawn(move || {
                for id in (chunk..total).step_by(4) {
                    world.transfer_player(id, from, to, Coord::new(to, 20.0, 0.0, 960.0)).unwrap();
                }
            });
        }
        s.spawn(|| {
            for _ in 0..200 {
                assert!(west.count() <= total as usize);
                assert!(east.count() <= total as usize);
                let mut objs = NearObjects::new();
                world.get_near_objects(west.id(), 0, &mut objs);
            }
        });
    });

    assert_eq!(west.count(), 0);
    assert_eq!(east.count(), total as usize);
    assert_eq!(world.player_count(), total as usize);
}
