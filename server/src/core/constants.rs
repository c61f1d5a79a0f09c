// zone_engine_core/server/src/core/constants.rs
pub const SERVER_TICK_RATE: u64 = 10;

// World grid
pub const ZONE_SIZE: f32 = 1920.0; // Width and length of every non-instance zone
pub const WORLD_GRID_WIDTH: u16 = 256; // Grid X is the low byte of a zone id
pub const WORLD_GRID_HEIGHT: u16 = 128; // Grid Y uses bits 8..=14, bit 15 flags instances
pub const INSTANCE_ZONE_FLAG: u16 = 0x8000;

// Visibility
pub const MAX_VISIBLE_DISTANCE: f32 = 1000.0;

// Terrain
pub const TERRAIN_TILE_SIZE: f32 = 20.0;
pub const TERRAIN_TILES_PER_ZONE: usize = 96; // ZONE_SIZE / TERRAIN_TILE_SIZE
pub const TERRAIN_VERTICES_PER_SIDE: usize = TERRAIN_TILES_PER_ZONE + 1;

// Height resolution
pub const OBJECT_SNAP_TOLERANCE: f32 = 15.0; // previous Y within this of a surface keeps you on it

// Motion resolution
pub const MOTION_CONTACT_GAP: f32 = 0.01; // clipped motions stop this far before the obstruction

// Simulation
pub const MAX_REQUESTS_PER_TICK: usize = 4096;
pub const SLOW_TICK_LOG_MS: u64 = 50;
