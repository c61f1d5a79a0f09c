// zone_engine_core/server/src/server/simulation.rs
use crate::concurrent::thread_pools::ThreadPoolSystem;
use crate::core::config::WorldConfig;
use crate::core::constants::SLOW_TICK_LOG_MS;
use crate::core::error::ServerResult;
use crate::core::types::{Coord, EntityHandle, EntityId, EntityKind, ZoneBounds, ZoneEvent};
use crate::entities::{Npc, Player};
use crate::world::world_map::locate_cell;
use crate::world::{WorldMap, Zone};
use crossbeam_queue::SegQueue;
use metrics::{counter, gauge, histogram};
use rayon::prelude::*;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

const TICK_LOG_INTERVAL: u64 = 600;

/// Work submitted to the simulation from sessions or scripts.
#[derive(Clone, Debug)]
pub enum Request {
    SpawnPlayer(Player),
    SpawnNpc(Npc),
    Despawn(EntityHandle),
    Move { handle: EntityHandle, dest: Coord },
}

/// What one tick did.
#[derive(Clone, Debug, Default)]
pub struct TickReport {
    pub tick: u64,
    pub applied: usize,
    pub dropped: usize,
    pub transfers: usize,
    /// Zone events published during the tick, grouped by zone in id order.
    pub events: Vec<ZoneEvent>,
}

enum Outcome {
    Applied,
    Transferred,
    Dropped,
}

pub struct SimulationLoop {
    world: Arc<WorldMap>,
    requests: SegQueue<Request>,
    thread_pools: ThreadPoolSystem,
    tick_counter: AtomicU64,
    max_requests_per_tick: usize,
}

impl SimulationLoop {
    pub fn new(world: Arc<WorldMap>, config: &WorldConfig) -> ServerResult<Self> {
        let thread_pools = ThreadPoolSystem::new(&config.thread_pools)?;
        // Channels must exist before the first request so no event is missed.
        for zone in world.zones() {
            zone.channel();
        }
        Ok(SimulationLoop {
            world,
            requests: SegQueue::new(),
            thread_pools,
            tick_counter: AtomicU64::new(0),
            max_requests_per_tick: config.max_requests_per_tick.max(1),
        })
    }

    pub fn world(&self) -> &Arc<WorldMap> {
        &self.world
    }

    pub fn submit(&self, request: Request) {
        self.requests.push(request);
    }

    pub fn pending(&self) -> usize {
        self.requests.len()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_counter.load(AtomicOrdering::Relaxed)
    }

    /// Applies queued requests in submission order, up to the per-tick cap,
    /// then drains every zone channel in parallel.
    pub fn tick(&self) -> TickReport {
        let tick_start = Instant::now();
        let tick = self.tick_counter.fetch_add(1, AtomicOrdering::Relaxed) + 1;
        let mut report = TickReport { tick, ..TickReport::default() };

        for _ in 0..self.max_requests_per_tick {
            let Some(request) = self.requests.pop() else { break };
            match self.apply(request) {
                Outcome::Applied => report.applied += 1,
                Outcome::Transferred => {
                    report.applied += 1;
                    report.transfers += 1;
                }
                Outcome::Dropped => report.dropped += 1,
            }
        }

        report.events = self.drain_zone_events();

        let tick_time = tick_start.elapsed();
        histogram!("simulation_tick_seconds").record(tick_time.as_secs_f64());
        counter!("simulation_requests_total").increment((report.applied + report.dropped) as u64);
        counter!("simulation_requests_dropped_total").increment(report.dropped as u64);
        gauge!("world_players").set(self.world.player_count() as f64);

        if tick_time > Duration::from_millis(SLOW_TICK_LOG_MS) {
            warn!("Tick {} took too long: {:?} ({} requests)", tick, tick_time, report.applied + report.dropped);
        }
        trace!(
            "[Tick {}] applied={} dropped={} transfers={} events={}",
            tick,
            report.applied,
            report.dropped,
            report.transfers,
            report.events.len()
        );
        report
    }

    fn drain_zone_events(&self) -> Vec<ZoneEvent> {
        let zones = self.world.zones();
        let per_zone: Vec<Vec<ZoneEvent>> = self.thread_pools.simulation_pool.install(|| {
            zones
                .par_iter()
                .map(|zone| zone.channel().drain_batch(usize::MAX))
                .collect()
        });
        per_zone.into_iter().flatten().collect()
    }

    /// Drives `tick` on a fixed period until `shutdown` resolves.
    pub async fn run<F>(&self, period: Duration, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let period = period.max(Duration::from_millis(1));
        let mut tick_timer = interval(period);
        tick_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!("Simulation loop started. Tick rate: {}ms", period.as_millis());
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Simulation loop stopping after {} ticks", self.tick_count());
                    break;
                }
                _ = tick_timer.tick() => {
                    let report = self.tick();
                    if report.tick % TICK_LOG_INTERVAL == 0 {
                        info!(
                            "Simulation running - Tick: {}, players: {}, zones: {}",
                            report.tick,
                            self.world.player_count(),
                            self.world.zone_count()
                        );
                    }
                }
            }
        }
    }

    fn apply(&self, request: Request) -> Outcome {
        match request {
            Request::SpawnPlayer(player) => {
                let player_id = player.id;
                match self.world.spawn_player(player) {
                    Ok(()) => Outcome::Applied,
                    Err(e) => {
                        debug!("Spawn of player {} dropped: {}", player_id, e);
                        Outcome::Dropped
                    }
                }
            }
            Request::SpawnNpc(npc) => match self.world.zone(npc.position.zone) {
                Some(zone) => {
                    zone.insert_npc(npc);
                    Outcome::Applied
                }
                None => {
                    debug!("Spawn of npc {} dropped: no zone {}", npc.id, npc.position.zone);
                    Outcome::Dropped
                }
            },
            Request::Despawn(handle) => {
                let removed = match handle.kind {
                    EntityKind::Player => self.world.despawn_player(handle.id),
                    kind => self.world.zone(handle.zone).map_or(false, |zone| match kind {
                        EntityKind::Npc => zone.remove_npc(handle.id),
                        EntityKind::Item => zone.remove_item(handle.id),
                        _ => zone.remove_building(handle.id),
                    }),
                };
                if removed {
                    Outcome::Applied
                } else {
                    debug!("Despawn of unknown {:?} {} dropped", handle.kind, handle.id);
                    Outcome::Dropped
                }
            }
            Request::Move { handle, dest } => match handle.kind {
                EntityKind::Player => self.move_player(handle.id, dest),
                EntityKind::Npc => self.move_npc(handle, dest),
                kind => {
                    debug!("Move of static {:?} {} dropped", kind, handle.id);
                    Outcome::Dropped
                }
            },
        }
    }

    fn move_player(&self, player_id: EntityId, dest: Coord) -> Outcome {
        let Some(zone) = self.world.player_zone(player_id) else {
            debug!("Move of unknown player {} dropped", player_id);
            return Outcome::Dropped;
        };
        let Some(src) = zone.find_player(player_id).map(|p| p.position) else {
            debug!("Player {} indexed in zone {} but not registered there", player_id, zone.id());
            return Outcome::Dropped;
        };

        let mut end = src;
        let reached = zone.resolve_motion(&src, &dest, &mut end);
        if !reached {
            if let Some((target, entry)) = self.crossing(&zone, &end, &dest) {
                let mut target_end = entry;
                target.resolve_motion(&entry, &dest, &mut target_end);
                let target_end = settle(&target, target_end, src.y);
                match self.world.transfer_player(player_id, zone.id(), target.id(), target_end) {
                    Ok(()) => {
                        counter!("zone_transfers_total").increment(1);
                        return Outcome::Transferred;
                    }
                    Err(e) => warn!("Transfer of player {} to zone {} failed: {}", player_id, target.id(), e),
                }
            }
        }

        zone.update_player_position(player_id, settle(&zone, end, src.y));
        Outcome::Applied
    }

    fn move_npc(&self, handle: EntityHandle, dest: Coord) -> Outcome {
        let Some(zone) = self.world.zone(handle.zone) else {
            return Outcome::Dropped;
        };
        let Some(src) = zone.find_npc(handle.id).map(|n| n.position) else {
            debug!("Move of unknown npc {} dropped", handle.id);
            return Outcome::Dropped;
        };
        let mut end = src;
        zone.resolve_motion(&src, &dest, &mut end);
        zone.update_npc_position(handle.id, settle(&zone, end, src.y));
        Outcome::Applied
    }

    /// Neighbour zone a clipped move continues into: the move stopped on the
    /// zone edge and the destination lies in a registered zone that shares it.
    fn crossing(&self, zone: &Zone, end: &Coord, dest: &Coord) -> Option<(Arc<Zone>, Coord)> {
        if !on_edge(&zone.bounds(), end) {
            return None;
        }
        let (world_x, world_z) = dest.world_xz()?;
        let (target_id, _, _) = locate_cell(world_x, world_z)?;
        if target_id == zone.id() {
            return None;
        }
        let target = self.world.zone(target_id)?;
        let entry = end.relative_to(target_id)?;
        if !target.contains(entry.x, entry.z) {
            return None;
        }
        Some((target, entry))
    }
}

fn on_edge(bounds: &ZoneBounds, c: &Coord) -> bool {
    c.x <= bounds.min_x || c.x >= bounds.max_x || c.z <= bounds.min_z || c.z >= bounds.max_z
}

fn settle(zone: &Zone, mut position: Coord, previous_y: f32) -> Coord {
    position.y = zone.height_at(position.x, position.z, previous_y);
    position
}
