// zone_engine_core/server/src/world/world_map.rs
use crate::core::config::ZoneQueryConfig;
use crate::core::constants::{WORLD_GRID_HEIGHT, WORLD_GRID_WIDTH, ZONE_SIZE};
use crate::core::error::{ServerError, ServerResult};
use crate::core::types::{Coord, EntityId, ZoneBounds, ZoneId};
use crate::entities::Player;
use crate::world::grid::{self, get_adjacent_zones};
use crate::world::models::ModelManager;
use crate::world::navmesh::NavigationMesh;
use crate::world::zone::{NearObjects, Zone};
use crate::world::zone_area::ZoneInfo;
use arc_swap::ArcSwap;
use dashmap::DashMap;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Every live zone, keyed by id, plus a player -> zone index.
///
/// Fan-out queries visit zones one at a time; no zone lock is held while
/// another is taken. The player index is a hint maintained alongside the zone
/// registries and is corrected whenever it is found stale.
pub struct WorldMap {
    zones: DashMap<ZoneId, Arc<Zone>>,
    player_zones: DashMap<EntityId, ZoneId>,
    navmesh: Arc<dyn NavigationMesh>,
    models: ArcSwap<ModelManager>,
    query: ZoneQueryConfig,
    next_instance: AtomicU16,
}

impl WorldMap {
    pub fn new(navmesh: Arc<dyn NavigationMesh>, models: Arc<ModelManager>, query: ZoneQueryConfig) -> Self {
        WorldMap {
            zones: DashMap::new(),
            player_zones: DashMap::new(),
            navmesh,
            models: ArcSwap::new(models),
            query,
            next_instance: AtomicU16::new(0),
        }
    }

    pub fn navmesh(&self) -> Arc<dyn NavigationMesh> {
        self.navmesh.clone()
    }

    pub fn query_config(&self) -> ZoneQueryConfig {
        self.query
    }

    /// Registers a zone built elsewhere. A zone already registered under the
    /// same id is replaced and returned.
    pub fn insert_zone(&self, zone: Zone) -> Option<Arc<Zone>> {
        let id = zone.id();
        if zone.model_manager().is_none() {
            zone.set_model_manager(self.models.load_full());
        }
        let previous = self.zones.insert(id, Arc::new(zone));
        if previous.is_some() {
            warn!("Zone {} was already registered; replaced", id);
        }
        previous
    }

    /// Creates the standard zone for a grid cell, or returns the existing one.
    pub fn create_zone(&self, grid_x: u8, grid_y: u8) -> Arc<Zone> {
        let id = grid::zone_id(grid_x, grid_y);
        self.zones
            .entry(id)
            .or_insert_with(|| {
                let zone = Zone::new(id, self.navmesh.clone()).with_query_config(self.query);
                zone.set_model_manager(self.models.load_full());
                debug!("Zone {} ({}, {}) created", id, grid_x, grid_y);
                Arc::new(zone)
            })
            .clone()
    }

    /// Allocates a fresh instance zone with explicit bounds.
    pub fn create_instance(&self, bounds: ZoneBounds) -> ServerResult<Arc<Zone>> {
        let cells = WORLD_GRID_WIDTH * WORLD_GRID_HEIGHT;
        for _ in 0..cells {
            let n = self.next_instance.fetch_add(1, Ordering::Relaxed) % cells;
            let id = grid::instance_zone_id((n % WORLD_GRID_WIDTH) as u8, (n / WORLD_GRID_WIDTH) as u8);
            if self.zones.contains_key(&id) {
                continue;
            }
            let zone = Zone::with_bounds(id, bounds, self.navmesh.clone())?.with_query_config(self.query);
            zone.set_model_manager(self.models.load_full());
            let zone = Arc::new(zone);
            self.zones.insert(id, zone.clone());
            info!("Instance zone {} created ({} x {})", id, zone.length(), zone.width());
            return Ok(zone);
        }
        Err(ServerError::Internal("no free instance zone id".into()))
    }

    pub fn remove_zone(&self, id: ZoneId) -> Option<Arc<Zone>> {
        let removed = self.zones.remove(&id).map(|(_, zone)| zone);
        if removed.is_some() {
            self.player_zones.retain(|_, zone| *zone != id);
        }
        removed
    }

    pub fn zone(&self, id: ZoneId) -> Option<Arc<Zone>> {
        self.zones.get(&id).map(|z| z.value().clone())
    }

    pub fn zone_count(&self) -> usize {
        self.zones.len()
    }

    pub fn zone_ids(&self) -> Vec<ZoneId> {
        let mut ids: Vec<ZoneId> = self.zones.iter().map(|z| *z.key()).collect();
        ids.sort_unstable();
        ids
    }

    /// Snapshot of every zone, ordered by id.
    pub fn zones(&self) -> Vec<Arc<Zone>> {
        let mut zones: Vec<Arc<Zone>> = self.zones.iter().map(|z| z.value().clone()).collect();
        zones.sort_unstable_by_key(|z| z.id());
        zones
    }

    pub fn zone_infos(&self) -> Vec<ZoneInfo> {
        self.zones().iter().map(|z| z.info()).collect()
    }

    /// Replaces the model manager of the world and of every registered zone.
    pub fn set_model_manager(&self, models: Arc<ModelManager>) {
        for zone in self.zones.iter() {
            zone.set_model_manager(models.clone());
        }
        self.models.store(models);
    }

    /// Registered zones in the neighbourhood of `id`, including `id` itself.
    pub fn adjacent_zones(&self, id: ZoneId) -> Vec<Arc<Zone>> {
        get_adjacent_zones(id)
            .zone_ids()
            .filter_map(|neighbour| self.zone(neighbour))
            .collect()
    }

    /// World-space point to its owning grid zone and local coordinates.
    pub fn locate(&self, world_x: f32, world_z: f32) -> Option<Coord> {
        locate_cell(world_x, world_z).map(|(id, x, z)| Coord::new(id, x, 0.0, z))
    }

    // --- Players ---

    pub fn player_zone(&self, player_id: EntityId) -> Option<Arc<Zone>> {
        let id = *self.player_zones.get(&player_id)?;
        self.zone(id)
    }

    pub fn player_count(&self) -> usize {
        self.player_zones.len()
    }

    /// Inserts the player into the zone named by its position.
    pub fn spawn_player(&self, player: Player) -> ServerResult<()> {
        let zone_id = player.position.zone;
        let zone = self
            .zone(zone_id)
            .ok_or_else(|| ServerError::NotFound(format!("zone {}", zone_id)))?;
        let player_id = player.id;
        if let Some(old_zone) = self.player_zones.insert(player_id, zone_id) {
            if old_zone != zone_id {
                if let Some(old) = self.zone(old_zone) {
                    old.remove_player(player_id);
                }
            }
        }
        zone.insert_player(player);
        debug!("Player {} spawned in zone {}", player_id, zone_id);
        Ok(())
    }

    pub fn despawn_player(&self, player_id: EntityId) -> bool {
        match self.player_zones.remove(&player_id) {
            Some((_, zone_id)) => self.zone(zone_id).map_or(false, |zone| zone.remove_player(player_id)),
            None => false,
        }
    }

    /// Moves a player between zones: remove from `from`, then insert into `to`
    /// at `position`. Between the two critical sections the player is in
    /// neither registry; a concurrent lookup in that window misses it.
    pub fn transfer_player(&self, player_id: EntityId, from: ZoneId, to: ZoneId, position: Coord) -> ServerResult<()> {
        let destination = self
            .zone(to)
            .ok_or_else(|| ServerError::NotFound(format!("destination zone {}", to)))?;
        let source = self
            .zone(from)
            .ok_or_else(|| ServerError::NotFound(format!("source zone {}", from)))?;
        let position = position.relative_to(to).ok_or(ServerError::OutOfBounds {
            zone: to,
            x: position.x,
            z: position.z,
        })?;
        if !destination.contains(position.x, position.z) {
            return Err(ServerError::OutOfBounds { zone: to, x: position.x, z: position.z });
        }

        let mut player = source
            .take_player(player_id)
            .ok_or_else(|| ServerError::NotFound(format!("player {} in zone {}", player_id, from)))?;
        player.position = position;
        destination.insert_player(player);
        self.player_zones.insert(player_id, to);
        debug!("Player {} transferred {} -> {}", player_id, from, to);
        Ok(())
    }

    // --- Visibility fan-out ---

    /// Entities visible to the player across its zone and the neighbours.
    pub fn get_near_objects(&self, zone_id: ZoneId, player_id: EntityId, objs: &mut NearObjects) -> bool {
        let Some(origin) = self.zone(zone_id).and_then(|z| z.find_player(player_id)).map(|p| p.position) else {
            return false;
        };
        for zone in self.adjacent_zones(zone_id) {
            zone.collect_near_objects(&origin, Some(player_id), objs);
        }
        true
    }

    /// Ids of every entity in the zone and its neighbours.
    pub fn get_near_object_ids(&self, zone_id: ZoneId, ids: &mut BTreeSet<EntityId>) {
        for zone in self.adjacent_zones(zone_id) {
            zone.get_near_object_ids(ids);
        }
    }
}

/// Grid cell and local offset of a world-space point, if it lies on the grid.
pub(crate) fn locate_cell(world_x: f32, world_z: f32) -> Option<(ZoneId, f32, f32)> {
    if !world_x.is_finite() || !world_z.is_finite() || world_x < 0.0 || world_z < 0.0 {
        return None;
    }
    let gx = (world_x / ZONE_SIZE).floor() as u32;
    let gy = (world_z / ZONE_SIZE).floor() as u32;
    if gx >= WORLD_GRID_WIDTH as u32 || gy >= WORLD_GRID_HEIGHT as u32 {
        return None;
    }
    let id = grid::zone_id(gx as u8, gy as u8);
    Some((id, world_x - gx as f32 * ZONE_SIZE, world_z - gy as f32 * ZONE_SIZE))
}

impl std::fmt::Debug for WorldMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorldMap")
            .field("zones", &self.zones.len())
            .field("players", &self.player_zones.len())
            .finish()
    }
}
