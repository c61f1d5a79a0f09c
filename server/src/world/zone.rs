// zone_engine_core/server/src/world/zone.rs
use crate::concurrent::channel::Channel;
use crate::core::config::ZoneQueryConfig;
use crate::core::error::{ServerError, ServerResult};
use crate::core::types::{Coord, EntityId, EntityKind, ZoneBounds, ZoneEvent, ZoneId};
use crate::entities::{DropableItem, Npc, Player, TeleportBuilding, WorldEntity};
use crate::world::models::ModelManager;
use crate::world::navmesh::NavigationMesh;
use crate::world::zone_area::{ZoneArea, ZoneInfo, ZoneType};
use ahash::AHashMap;
use arc_swap::ArcSwapOption;
use metrics::counter;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, trace, warn};

const EDGE_EPSILON: f32 = 1e-3;

/// Entities within visibility range of a query point.
#[derive(Clone, Debug, Default)]
pub struct NearObjects {
    pub players: Vec<Player>,
    pub npcs: Vec<Npc>,
    pub items: Vec<DropableItem>,
    pub buildings: Vec<TeleportBuilding>,
}

impl NearObjects {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.players.len() + self.npcs.len() + self.items.len() + self.buildings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.players.clear();
        self.npcs.clear();
        self.items.clear();
        self.buildings.clear();
    }

    pub fn player_ids(&self) -> Vec<EntityId> {
        self.players.iter().map(|p| p.id).collect()
    }
}

#[derive(Default)]
struct ZoneState {
    areas: Vec<ZoneArea>,
    buildings: Vec<TeleportBuilding>,
    npcs: AHashMap<EntityId, Npc>,
    players: AHashMap<EntityId, Player>,
    items: AHashMap<EntityId, DropableItem>,
}

/// Registry selection for the three id-keyed entity maps.
trait Registered: WorldEntity {
    fn registry(state: &ZoneState) -> &AHashMap<EntityId, Self>;
    fn registry_mut(state: &mut ZoneState) -> &mut AHashMap<EntityId, Self>;
}

impl Registered for Player {
    fn registry(state: &ZoneState) -> &AHashMap<EntityId, Self> {
        &state.players
    }
    fn registry_mut(state: &mut ZoneState) -> &mut AHashMap<EntityId, Self> {
        &mut state.players
    }
}

impl Registered for Npc {
    fn registry(state: &ZoneState) -> &AHashMap<EntityId, Self> {
        &state.npcs
    }
    fn registry_mut(state: &mut ZoneState) -> &mut AHashMap<EntityId, Self> {
        &mut state.npcs
    }
}

impl Registered for DropableItem {
    fn registry(state: &ZoneState) -> &AHashMap<EntityId, Self> {
        &state.items
    }
    fn registry_mut(state: &mut ZoneState) -> &mut AHashMap<EntityId, Self> {
        &mut state.items
    }
}

fn kind_label(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Player => "player",
        EntityKind::Npc => "npc",
        EntityKind::Item => "item",
        EntityKind::Building => "building",
    }
}

fn record_inserted(kind: EntityKind) {
    counter!("zone_entities_inserted_total", "kind" => kind_label(kind)).increment(1);
}

fn record_removed(kind: EntityKind) {
    counter!("zone_entities_removed_total", "kind" => kind_label(kind)).increment(1);
}

/// One grid cell of the world.
///
/// All four registries and the delimited areas sit behind a single mutex, so a
/// near-object scan always sees one consistent snapshot of the zone. No method
/// holds this lock while acquiring another zone's lock.
pub struct Zone {
    id: ZoneId,
    bounds: ZoneBounds,
    query: ZoneQueryConfig,
    navmesh: Arc<dyn NavigationMesh>,
    models: ArcSwapOption<ModelManager>,
    channel: OnceCell<Arc<Channel>>,
    state: Mutex<ZoneState>,
}

impl Zone {
    /// Standard 1920x1920 zone.
    pub fn new(id: ZoneId, navmesh: Arc<dyn NavigationMesh>) -> Self {
        Zone {
            id,
            bounds: ZoneBounds::standard(),
            query: ZoneQueryConfig::default(),
            navmesh,
            models: ArcSwapOption::empty(),
            channel: OnceCell::new(),
            state: Mutex::new(ZoneState::default()),
        }
    }

    /// Zone with explicit bounds, used by instances.
    pub fn with_bounds(id: ZoneId, bounds: ZoneBounds, navmesh: Arc<dyn NavigationMesh>) -> ServerResult<Self> {
        if !bounds.is_valid() {
            return Err(ServerError::InvalidBounds {
                zone: id,
                reason: format!(
                    "expected min <= max, got x [{}, {}] z [{}, {}]",
                    bounds.min_x, bounds.max_x, bounds.min_z, bounds.max_z
                ),
            });
        }
        let mut zone = Zone::new(id, navmesh);
        zone.bounds = bounds;
        Ok(zone)
    }

    pub fn with_query_config(mut self, query: ZoneQueryConfig) -> Self {
        self.query = query;
        self
    }

    pub fn id(&self) -> ZoneId {
        self.id
    }

    pub fn bounds(&self) -> ZoneBounds {
        self.bounds
    }

    pub fn min_x(&self) -> f32 {
        self.bounds.min_x
    }

    pub fn max_x(&self) -> f32 {
        self.bounds.max_x
    }

    pub fn min_z(&self) -> f32 {
        self.bounds.min_z
    }

    pub fn max_z(&self) -> f32 {
        self.bounds.max_z
    }

    /// Extent along Z.
    pub fn width(&self) -> f32 {
        self.bounds.max_z - self.bounds.min_z
    }

    /// Extent along X.
    pub fn length(&self) -> f32 {
        self.bounds.max_x - self.bounds.min_x
    }

    pub fn contains(&self, x: f32, z: f32) -> bool {
        self.bounds.contains(x, z)
    }

    /// Descriptor for lookup tables: the first delimited area, or the whole zone as field.
    pub fn info(&self) -> ZoneInfo {
        let area = self.state.lock().areas.first().copied().unwrap_or_else(|| {
            ZoneArea::new(
                ZoneType::Field,
                self.bounds.min_x as i32,
                self.bounds.min_z as i32,
                self.bounds.max_x as i32,
                self.bounds.max_z as i32,
            )
        });
        ZoneInfo { id: self.id, area }
    }

    /// Broadcast endpoint, created on first use.
    pub fn channel(&self) -> Arc<Channel> {
        self.channel
            .get_or_init(|| {
                debug!("[Zone {}] Channel created", self.id);
                Arc::new(Channel::new(self.id))
            })
            .clone()
    }

    pub fn set_model_manager(&self, models: Arc<ModelManager>) {
        self.models.store(Some(models));
    }

    pub fn model_manager(&self) -> Option<Arc<ModelManager>> {
        self.models.load_full()
    }

    fn notify(&self, event: ZoneEvent) {
        if let Some(channel) = self.channel.get() {
            channel.publish(event);
        }
    }

    fn localize(&self, position: Coord) -> Coord {
        match position.relative_to(self.id) {
            Some(local) => local,
            None => {
                warn!("[Zone {}] Position in zone {} cannot be expressed locally", self.id, position.zone);
                position
            }
        }
    }

    // --- Registries ---

    fn insert_entity<E: Registered>(&self, mut entity: E) -> Option<E> {
        entity.set_position(self.localize(entity.position()));
        let id = entity.id();
        let position = entity.position();
        let mut state = self.state.lock();
        let previous = E::registry_mut(&mut state).insert(id, entity);
        if previous.is_some() {
            warn!("[Zone {}] Duplicate {:?} id {} replaced", self.id, E::KIND, id);
        }
        self.notify(ZoneEvent::EntityEntered { zone: self.id, kind: E::KIND, id, position });
        drop(state);
        record_inserted(E::KIND);
        trace!("[Zone {}] {:?} {} inserted at ({}, {})", self.id, E::KIND, id, position.x, position.z);
        previous
    }

    fn find_entity<E: Registered>(&self, id: EntityId) -> Option<E> {
        E::registry(&self.state.lock()).get(&id).cloned()
    }

    fn remove_entity<E: Registered>(&self, id: EntityId) -> bool {
        let mut state = self.state.lock();
        let removed = E::registry_mut(&mut state).remove(&id).is_some();
        if removed {
            self.notify(ZoneEvent::EntityLeft { zone: self.id, kind: E::KIND, id });
            drop(state);
            record_removed(E::KIND);
            trace!("[Zone {}] {:?} {} removed", self.id, E::KIND, id);
        }
        removed
    }

    fn take_entity<E: Registered>(&self, id: EntityId) -> Option<E> {
        let mut state = self.state.lock();
        let taken = E::registry_mut(&mut state).remove(&id);
        if taken.is_some() {
            self.notify(ZoneEvent::EntityLeft { zone: self.id, kind: E::KIND, id });
            drop(state);
            record_removed(E::KIND);
        }
        taken
    }

    fn with_entity_mut<E: Registered, R>(&self, id: EntityId, f: impl FnOnce(&mut E) -> R) -> Option<R> {
        let mut state = self.state.lock();
        E::registry_mut(&mut state).get_mut(&id).map(f)
    }

    fn move_entity<E: Registered>(&self, id: EntityId, position: Coord) -> bool {
        let position = self.localize(position);
        let mut state = self.state.lock();
        match E::registry_mut(&mut state).get_mut(&id) {
            Some(entity) => {
                entity.set_position(position);
                self.notify(ZoneEvent::EntityMoved { zone: self.id, kind: E::KIND, id, position });
                true
            }
            None => false,
        }
    }

    /// Inserts or replaces by id; a displaced player is returned.
    pub fn insert_player(&self, player: Player) -> Option<Player> {
        self.insert_entity(player)
    }

    pub fn find_player(&self, player_id: EntityId) -> Option<Player> {
        self.find_entity(player_id)
    }

    pub fn remove_player(&self, player_id: EntityId) -> bool {
        self.remove_entity::<Player>(player_id)
    }

    /// Removes and returns the player, for handing it to another zone.
    pub fn take_player(&self, player_id: EntityId) -> Option<Player> {
        self.take_entity(player_id)
    }

    pub fn with_player_mut<R>(&self, player_id: EntityId, f: impl FnOnce(&mut Player) -> R) -> Option<R> {
        self.with_entity_mut(player_id, f)
    }

    pub fn update_player_position(&self, player_id: EntityId, position: Coord) -> bool {
        self.move_entity::<Player>(player_id, position)
    }

    pub fn insert_npc(&self, npc: Npc) -> Option<Npc> {
        self.insert_entity(npc)
    }

    pub fn find_npc(&self, npc_id: EntityId) -> Option<Npc> {
        self.find_entity(npc_id)
    }

    pub fn remove_npc(&self, npc_id: EntityId) -> bool {
        self.remove_entity::<Npc>(npc_id)
    }

    pub fn take_npc(&self, npc_id: EntityId) -> Option<Npc> {
        self.take_entity(npc_id)
    }

    pub fn with_npc_mut<R>(&self, npc_id: EntityId, f: impl FnOnce(&mut Npc) -> R) -> Option<R> {
        self.with_entity_mut(npc_id, f)
    }

    pub fn update_npc_position(&self, npc_id: EntityId, position: Coord) -> bool {
        self.move_entity::<Npc>(npc_id, position)
    }

    pub fn insert_item(&self, item: DropableItem) -> Option<DropableItem> {
        self.insert_entity(item)
    }

    pub fn find_item(&self, item_id: EntityId) -> Option<DropableItem> {
        self.find_entity(item_id)
    }

    pub fn remove_item(&self, item_id: EntityId) -> bool {
        self.remove_entity::<DropableItem>(item_id)
    }

    pub fn insert_building(&self, mut building: TeleportBuilding) -> Option<TeleportBuilding> {
        building.position = self.localize(building.position);
        let id = building.id;
        let position = building.position;
        let mut state = self.state.lock();
        let previous = match state.buildings.iter_mut().find(|b| b.id == id) {
            Some(slot) => {
                warn!("[Zone {}] Duplicate building id {} replaced", self.id, id);
                Some(std::mem::replace(slot, building))
            }
            None => {
                state.buildings.push(building);
                None
            }
        };
        self.notify(ZoneEvent::EntityEntered { zone: self.id, kind: EntityKind::Building, id, position });
        drop(state);
        record_inserted(EntityKind::Building);
        previous
    }

    pub fn find_building(&self, building_id: EntityId) -> Option<TeleportBuilding> {
        self.state.lock().buildings.iter().find(|b| b.id == building_id).cloned()
    }

    /// The zone's canonical building: the one with the lowest id, if any.
    pub fn find_default_building(&self) -> Option<TeleportBuilding> {
        self.state.lock().buildings.iter().min_by_key(|b| b.id).cloned()
    }

    pub fn remove_building(&self, building_id: EntityId) -> bool {
        let mut state = self.state.lock();
        let before = state.buildings.len();
        state.buildings.retain(|b| b.id != building_id);
        let removed = state.buildings.len() != before;
        if removed {
            self.notify(ZoneEvent::EntityLeft { zone: self.id, kind: EntityKind::Building, id: building_id });
            drop(state);
            record_removed(EntityKind::Building);
        }
        removed
    }

    /// Players currently in the zone.
    pub fn count(&self) -> usize {
        self.state.lock().players.len()
    }

    pub fn npc_count(&self) -> usize {
        self.state.lock().npcs.len()
    }

    pub fn player_ids(&self) -> Vec<EntityId> {
        self.state.lock().players.keys().copied().collect()
    }

    pub fn npc_ids(&self) -> Vec<EntityId> {
        self.state.lock().npcs.keys().copied().collect()
    }

    // --- Areas ---

    pub fn insert_delimited_area(&self, area: ZoneArea) {
        self.state.lock().areas.push(area);
    }

    /// First delimited area containing the position decides; only a town area counts.
    pub fn is_inside_town(&self, position: &Coord) -> bool {
        let Some(local) = position.relative_to(self.id) else {
            return false;
        };
        self.state
            .lock()
            .areas
            .iter()
            .find(|area| area.belongs(&local))
            .map_or(false, |area| area.is_town())
    }

    // --- Height ---

    fn clamp_point(&self, x: f32, z: f32) -> (f32, f32) {
        let x = if x.is_nan() { self.bounds.min_x } else { x };
        let z = if z.is_nan() { self.bounds.min_z } else { z };
        self.bounds.clamp(x, z)
    }

    /// Terrain height. Points outside the zone are clamped to its edge first.
    pub fn terrain_height(&self, x: f32, z: f32) -> f32 {
        let (x, z) = self.clamp_point(x, z);
        self.navmesh.terrain_height(self.id, x, z)
    }

    /// Highest object surface at the clamped point, `f32::NEG_INFINITY` if none.
    pub fn object_height(&self, x: f32, z: f32) -> f32 {
        let (x, z) = self.clamp_point(x, z);
        match self.models.load_full() {
            Some(models) => models.object_height(self.id, x, z),
            None => f32::NEG_INFINITY,
        }
    }

    /// Height an entity coming from `previous_y` ends up at. An object surface
    /// within the snap tolerance of `previous_y` wins (the closest one when
    /// several stack), otherwise the entity is on the terrain.
    pub fn height_at(&self, x: f32, z: f32, previous_y: f32) -> f32 {
        let (x, z) = self.clamp_point(x, z);
        let terrain = self.navmesh.terrain_height(self.id, x, z);
        let Some(models) = self.models.load_full() else {
            return terrain;
        };
        let tolerance = self.query.object_snap_tolerance;
        models
            .surfaces_at(self.id, x, z)
            .into_iter()
            .filter(|h| (h - previous_y).abs() <= tolerance)
            .min_by(|a, b| (a - previous_y).abs().total_cmp(&(b - previous_y).abs()))
            .unwrap_or(terrain)
    }

    // --- Motion ---

    fn is_passable(&self, models: Option<&ModelManager>, x: f32, z: f32) -> bool {
        self.bounds.contains(x, z)
            && self.navmesh.is_walkable(self.id, x, z)
            && !models.map_or(false, |m| m.blocks_motion(self.id, x, z))
    }

    /// Parameter in [0, 1] where the segment leaves the zone bounds. `src` must be inside.
    fn bounds_exit(&self, src: &Coord, dest: &Coord) -> f32 {
        let mut t_exit = 1.0f32;
        let axes = [
            (src.x, dest.x - src.x, self.bounds.min_x, self.bounds.max_x),
            (src.z, dest.z - src.z, self.bounds.min_z, self.bounds.max_z),
        ];
        for (start, delta, min, max) in axes {
            if delta > 0.0 {
                t_exit = t_exit.min((max - start) / delta);
            } else if delta < 0.0 {
                t_exit = t_exit.min((min - start) / delta);
            }
        }
        t_exit.clamp(0.0, 1.0)
    }

    fn snap_to_edge(&self, mut p: Coord) -> Coord {
        for (value, min, max) in [
            (&mut p.x, self.bounds.min_x, self.bounds.max_x),
            (&mut p.z, self.bounds.min_z, self.bounds.max_z),
        ] {
            if (*value - min).abs() < EDGE_EPSILON {
                *value = min;
            } else if (*value - max).abs() < EDGE_EPSILON {
                *value = max;
            }
        }
        p
    }

    /// Walks the straight line from `src` to `dest` and writes the furthest
    /// reachable point to `end`. Returns true only when `dest` itself was
    /// reached. Blocked starts resolve to `src`.
    ///
    /// The whole segment is tested: every navmesh tile it crosses and every
    /// obstacle footprint it touches, however thin.
    pub fn resolve_motion(&self, src: &Coord, dest: &Coord, end: &mut Coord) -> bool {
        let Some(src) = src.relative_to(self.id) else {
            *end = *src;
            return false;
        };
        let Some(dest) = dest.relative_to(self.id) else {
            *end = src;
            return false;
        };

        let models = self.models.load_full();
        let models = models.as_deref();

        if !self.is_passable(models, src.x, src.z) {
            debug!("[Zone {}] Motion start ({}, {}) is blocked", self.id, src.x, src.z);
            *end = src;
            return false;
        }

        let length = ((dest.x - src.x).powi(2) + (dest.z - src.z).powi(2)).sqrt();
        if !length.is_finite() || !dest.y.is_finite() {
            *end = src;
            return false;
        }
        if length == 0.0 {
            *end = dest;
            return true;
        }

        let t_exit = self.bounds_exit(&src, &dest);

        // Every t <= t_exit is inside the bounds; clamping only absorbs rounding.
        let sample = |t: f32| {
            let p = src.lerp(&dest, t);
            let (x, z) = self.bounds.clamp(p.x, p.z);
            Coord { x, z, ..p }
        };

        // The terrain grid ends where the zone does, so a terrain hit at the
        // bounds exit is the border itself.
        let terrain_hit = self
            .navmesh
            .first_blocked(self.id, src.x, src.z, dest.x, dest.z)
            .filter(|&t| (t_exit - t) * length > EDGE_EPSILON);
        let object_hit = models
            .and_then(|m| m.first_obstacle_hit(self.id, src.x, src.z, dest.x, dest.z))
            .filter(|&t| t <= t_exit);

        if let Some(t_hit) = [terrain_hit, object_hit].into_iter().flatten().min_by(|a, b| a.total_cmp(b)) {
            let t_stop = (t_hit - self.query.motion_contact_gap / length).max(0.0);
            let stop = sample(t_stop);
            *end = if self.is_passable(models, stop.x, stop.z) { stop } else { src };
            counter!("zone_motion_clipped_total").increment(1);
            trace!("[Zone {}] Motion clipped at t={} of {}", self.id, t_stop, length);
            return false;
        }

        if t_exit < 1.0 || !self.bounds.contains(dest.x, dest.z) {
            *end = self.snap_to_edge(sample(t_exit));
            counter!("zone_motion_clipped_total").increment(1);
            return false;
        }

        *end = dest;
        true
    }

    // --- Visibility ---

    /// Entities within visibility range of the player, the player excluded.
    /// Returns false if the player is not in this zone.
    pub fn get_near_objects(&self, player_id: EntityId, objs: &mut NearObjects) -> bool {
        let state = self.state.lock();
        let Some(origin) = state.players.get(&player_id).map(|p| p.position) else {
            return false;
        };
        self.collect_locked(&state, &origin, Some(player_id), objs);
        true
    }

    /// Entities of this zone within visibility range of an arbitrary origin,
    /// which may lie in a neighbouring zone.
    pub fn collect_near_objects(&self, origin: &Coord, exclude_player: Option<EntityId>, objs: &mut NearObjects) {
        let state = self.state.lock();
        self.collect_locked(&state, origin, exclude_player, objs);
    }

    fn collect_locked(&self, state: &ZoneState, origin: &Coord, exclude_player: Option<EntityId>, objs: &mut NearObjects) {
        let range = self.query.max_visible_distance;
        let visible = |pos: &Coord| origin.distance_xz(pos) <= range;

        objs.players.extend(
            state
                .players
                .values()
                .filter(|p| Some(p.id) != exclude_player && visible(&p.position))
                .cloned(),
        );
        objs.npcs.extend(state.npcs.values().filter(|n| visible(&n.position)).cloned());
        objs.items.extend(state.items.values().filter(|i| visible(&i.position)).cloned());
        objs.buildings.extend(state.buildings.iter().filter(|b| visible(&b.position)).cloned());
    }

    /// Ids of every entity in the zone.
    pub fn get_near_object_ids(&self, ids: &mut BTreeSet<EntityId>) {
        let state = self.state.lock();
        ids.extend(state.players.keys().copied());
        ids.extend(state.npcs.keys().copied());
        ids.extend(state.items.keys().copied());
        ids.extend(state.buildings.iter().map(|b| b.id));
    }
}

impl std::fmt::Debug for Zone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Zone")
            .field("id", &self.id)
            .field("bounds", &self.bounds)
            .finish()
    }
}
