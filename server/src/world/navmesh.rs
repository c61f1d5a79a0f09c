// zone_engine_core/server/src/world/navmesh.rs
use crate::core::constants::{TERRAIN_TILE_SIZE, TERRAIN_VERTICES_PER_SIDE};
use crate::core::error::{ServerError, ServerResult};
use crate::core::types::ZoneId;
use ahash::AHashMap;

/// Terrain height and walkability provider shared by every zone.
///
/// Coordinates are local to `zone`. Implementations are read concurrently
/// from many zones without external locking.
pub trait NavigationMesh: Send + Sync {
    fn terrain_height(&self, zone: ZoneId, x: f32, z: f32) -> f32;

    fn is_walkable(&self, zone: ZoneId, x: f32, z: f32) -> bool;

    /// Fraction of the segment (x0, z0) -> (x1, z1) at which it first enters
    /// unwalkable ground, or `None` when every point on it is walkable.
    fn first_blocked(&self, zone: ZoneId, x0: f32, z0: f32, x1: f32, z1: f32) -> Option<f32>;
}

/// Regular height grid for one zone with a walkability flag per tile.
#[derive(Clone, Debug)]
pub struct Heightfield {
    columns: usize,
    rows: usize,
    tile_size: f32,
    heights: Vec<f32>,
    blocked: Vec<bool>,
}

impl Heightfield {
    /// `columns` x `rows` vertices, row-major heights.
    pub fn new(columns: usize, rows: usize, tile_size: f32, heights: Vec<f32>) -> ServerResult<Self> {
        if columns < 2 || rows < 2 {
            return Err(ServerError::MapData(format!(
                "heightfield needs at least 2x2 vertices, got {}x{}",
                columns, rows
            )));
        }
        if !(tile_size > 0.0) {
            return Err(ServerError::MapData(format!("invalid tile size {}", tile_size)));
        }
        if heights.len() != columns * rows {
            return Err(ServerError::MapData(format!(
                "heightfield expects {} samples, got {}",
                columns * rows,
                heights.len()
            )));
        }
        if let Some(bad) = heights.iter().position(|h| !h.is_finite()) {
            return Err(ServerError::MapData(format!("non-finite height at sample {}", bad)));
        }
        let blocked = vec![false; (columns - 1) * (rows - 1)];
        Ok(Heightfield { columns, rows, tile_size, heights, blocked })
    }

    /// Standard zone sized grid at a constant height.
    pub fn flat(height: f32) -> Self {
        let n = TERRAIN_VERTICES_PER_SIDE;
        Heightfield {
            columns: n,
            rows: n,
            tile_size: TERRAIN_TILE_SIZE,
            heights: vec![height; n * n],
            blocked: vec![false; (n - 1) * (n - 1)],
        }
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn tile_size(&self) -> f32 {
        self.tile_size
    }

    pub fn tiles_x(&self) -> usize {
        self.columns - 1
    }

    pub fn tiles_z(&self) -> usize {
        self.rows - 1
    }

    pub fn set_height(&mut self, column: usize, row: usize, height: f32) {
        if column < self.columns && row < self.rows {
            self.heights[row * self.columns + column] = height;
        }
    }

    pub fn set_blocked(&mut self, tile_x: usize, tile_z: usize, blocked: bool) {
        if tile_x < self.tiles_x() && tile_z < self.tiles_z() {
            let tiles_x = self.tiles_x();
            self.blocked[tile_z * tiles_x + tile_x] = blocked;
        }
    }

    /// Blocks every tile overlapping the local rectangle.
    pub fn block_rect(&mut self, min_x: f32, min_z: f32, max_x: f32, max_z: f32) {
        let (tx0, tz0) = self.tile_of(min_x.min(max_x), min_z.min(max_z));
        let (tx1, tz1) = self.tile_of(min_x.max(max_x), min_z.max(max_z));
        for tz in tz0..=tz1 {
            for tx in tx0..=tx1 {
                self.set_blocked(tx, tz, true);
            }
        }
    }

    fn tile_of(&self, x: f32, z: f32) -> (usize, usize) {
        let tx = (x / self.tile_size).floor().max(0.0) as usize;
        let tz = (z / self.tile_size).floor().max(0.0) as usize;
        (tx.min(self.tiles_x() - 1), tz.min(self.tiles_z() - 1))
    }

    #[inline]
    fn vertex(&self, column: usize, row: usize) -> f32 {
        self.heights[row * self.columns + column]
    }

    /// Bilinear interpolation of the four corner heights of the tile under (x, z).
    /// Points past the grid edge sample the nearest edge.
    pub fn height_at(&self, x: f32, z: f32) -> f32 {
        let max_x = self.tiles_x() as f32 * self.tile_size;
        let max_z = self.tiles_z() as f32 * self.tile_size;
        let x = if x.is_finite() { x.clamp(0.0, max_x) } else { 0.0 };
        let z = if z.is_finite() { z.clamp(0.0, max_z) } else { 0.0 };

        let (tx, tz) = self.tile_of(x, z);
        let fx = (x / self.tile_size - tx as f32).clamp(0.0, 1.0);
        let fz = (z / self.tile_size - tz as f32).clamp(0.0, 1.0);

        let h00 = self.vertex(tx, tz);
        let h10 = self.vertex(tx + 1, tz);
        let h01 = self.vertex(tx, tz + 1);
        let h11 = self.vertex(tx + 1, tz + 1);

        let near = h00 + (h10 - h00) * fx;
        let far = h01 + (h11 - h01) * fx;
        near + (far - near) * fz
    }

    pub fn walkable(&self, x: f32, z: f32) -> bool {
        if !x.is_finite() || !z.is_finite() || x < 0.0 || z < 0.0 {
            return false;
        }
        if x > self.tiles_x() as f32 * self.tile_size || z > self.tiles_z() as f32 * self.tile_size {
            return false;
        }
        let (tx, tz) = self.tile_of(x, z);
        !self.is_blocked(tx, tz)
    }

    fn is_blocked(&self, tile_x: usize, tile_z: usize) -> bool {
        self.blocked[tile_z * self.tiles_x() + tile_x]
    }

    /// Visits every tile the segment crosses, in order, and returns the
    /// fraction at which it enters the first blocked tile or leaves the grid.
    pub fn first_blocked(&self, x0: f32, z0: f32, x1: f32, z1: f32) -> Option<f32> {
        if !self.walkable(x0, z0) {
            return Some(0.0);
        }
        if !x1.is_finite() || !z1.is_finite() {
            return Some(0.0);
        }
        let (dx, dz) = (x1 - x0, z1 - z0);
        let extent_x = self.tiles_x() as f32 * self.tile_size;
        let extent_z = self.tiles_z() as f32 * self.tile_size;

        let mut t_out = 1.0f32;
        for (start, delta, max) in [(x0, dx, extent_x), (z0, dz, extent_z)] {
            if delta > 0.0 {
                t_out = t_out.min((max - start) / delta);
            } else if delta < 0.0 {
                t_out = t_out.min(-start / delta);
            }
        }
        let t_out = t_out.max(0.0);

        let (mut tx, mut tz) = self.tile_of(x0, z0);
        let axis = |start: f32, delta: f32, tile: usize| -> (f32, f32) {
            if delta > 0.0 {
                (((tile + 1) as f32 * self.tile_size - start) / delta, self.tile_size / delta)
            } else if delta < 0.0 {
                ((tile as f32 * self.tile_size - start) / delta, -self.tile_size / delta)
            } else {
                (f32::INFINITY, f32::INFINITY)
            }
        };
        let (mut t_max_x, t_delta_x) = axis(x0, dx, tx);
        let (mut t_max_z, t_delta_z) = axis(z0, dz, tz);

        let step = |tile: usize, delta: f32, limit: usize| -> Option<usize> {
            if delta > 0.0 {
                Some(tile + 1).filter(|&t| t < limit)
            } else {
                tile.checked_sub(1)
            }
        };

        for _ in 0..(self.tiles_x() + self.tiles_z() + 2) {
            let t = t_max_x.min(t_max_z);
            if t > t_out.min(1.0) {
                break;
            }
            let next_x = if t_max_x <= t { step(tx, dx, self.tiles_x()) } else { Some(tx) };
            let next_z = if t_max_z <= t { step(tz, dz, self.tiles_z()) } else { Some(tz) };
            let (Some(nx), Some(nz)) = (next_x, next_z) else {
                break;
            };
            // Passing exactly through a corner touches both side tiles as well.
            if t_max_x <= t && t_max_z <= t && (self.is_blocked(nx, tz) || self.is_blocked(tx, nz)) {
                return Some(t);
            }
            if self.is_blocked(nx, nz) {
                return Some(t);
            }
            if t_max_x <= t {
                t_max_x += t_delta_x;
            }
            if t_max_z <= t {
                t_max_z += t_delta_z;
            }
            tx = nx;
            tz = nz;
        }

        (t_out < 1.0).then_some(t_out)
    }
}

/// Per-zone heightfields. Zones without terrain data are flat at
/// `default_height` and fully walkable.
#[derive(Debug, Default)]
pub struct TerrainNavMesh {
    fields: AHashMap<ZoneId, Heightfield>,
    default_height: f32,
}

impl TerrainNavMesh {
    pub fn new(default_height: f32) -> Self {
        TerrainNavMesh { fields: AHashMap::new(), default_height }
    }

    pub fn insert(&mut self, zone: ZoneId, field: Heightfield) -> Option<Heightfield> {
        self.fields.insert(zone, field)
    }

    pub fn field(&self, zone: ZoneId) -> Option<&Heightfield> {
        self.fields.get(&zone)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl NavigationMesh for TerrainNavMesh {
    fn terrain_height(&self, zone: ZoneId, x: f32, z: f32) -> f32 {
        match self.fields.get(&zone) {
            Some(field) => field.height_at(x, z),
            None => self.default_height,
        }
    }

    fn is_walkable(&self, zone: ZoneId, x: f32, z: f32) -> bool {
        match self.fields.get(&zone) {
            Some(field) => field.walkable(x, z),
            None => x.is_finite() && z.is_finite(),
        }
    }

    fn first_blocked(&self, zone: ZoneId, x0: f32, z0: f32, x1: f32, z1: f32) -> Option<f32> {
        match self.fields.get(&zone) {
            Some(field) => field.first_blocked(x0, z0, x1, z1),
            None if [x0, z0, x1, z1].iter().all(|v| v.is_finite()) => None,
            None => Some(0.0),
        }
    }
}
