// zone_engine_core/server/src/world/models.rs
use crate::core::types::ZoneId;
use ahash::AHashMap;
use rstar::{RTree, RTreeObject, AABB};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::{debug, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectKind {
    /// Walkable surface (bridge deck, roof, stairs landing). Does not block motion.
    Platform,
    /// Solid geometry. Blocks motion through its footprint; its top is still a surface.
    Obstacle,
}

/// Static object footprint placed in a zone's local frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlacedObject {
    pub id: u32,
    pub zone: ZoneId,
    pub kind: ObjectKind,
    pub min_x: f32,
    pub min_z: f32,
    pub max_x: f32,
    pub max_z: f32,
    /// World Y of the object's top surface.
    pub surface_height: f32,
}

impl PlacedObject {
    fn normalized(mut self) -> Self {
        if self.min_x > self.max_x {
            std::mem::swap(&mut self.min_x, &mut self.max_x);
        }
        if self.min_z > self.max_z {
            std::mem::swap(&mut self.min_z, &mut self.max_z);
        }
        self
    }

    fn is_finite(&self) -> bool {
        [self.min_x, self.min_z, self.max_x, self.max_z, self.surface_height]
            .iter()
            .all(|v| v.is_finite())
    }

    pub fn contains(&self, x: f32, z: f32) -> bool {
        x >= self.min_x && x <= self.max_x && z >= self.min_z && z <= self.max_z
    }

    /// Slab test against the closed footprint. Returns the fraction of the
    /// segment at which it first touches the footprint; 0 when it starts inside.
    pub fn segment_entry(&self, x0: f32, z0: f32, x1: f32, z1: f32) -> Option<f32> {
        let (mut t_enter, mut t_leave) = (0.0f32, 1.0f32);
        for (start, delta, min, max) in [
            (x0, x1 - x0, self.min_x, self.max_x),
            (z0, z1 - z0, self.min_z, self.max_z),
        ] {
            if delta == 0.0 {
                if start < min || start > max {
                    return None;
                }
                continue;
            }
            let (a, b) = ((min - start) / delta, (max - start) / delta);
            t_enter = t_enter.max(a.min(b));
            t_leave = t_leave.min(a.max(b));
            if t_enter > t_leave {
                return None;
            }
        }
        Some(t_enter)
    }
}

#[derive(Clone, Debug)]
struct SpatialObject {
    object: PlacedObject,
}

impl RTreeObject for SpatialObject {
    type Envelope = AABB<[f32; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners([self.object.min_x, self.object.min_z], [self.object.max_x, self.object.max_z])
    }
}

/// Static 3D-model metadata for the loaded world, one R-tree per zone.
/// Immutable once built; shared between zones behind an `Arc`.
#[derive(Default)]
pub struct ModelManager {
    trees: AHashMap<ZoneId, RTree<SpatialObject>>,
}

impl ModelManager {
    pub fn new(objects: Vec<PlacedObject>) -> Self {
        let mut per_zone: AHashMap<ZoneId, Vec<SpatialObject>> = AHashMap::new();
        for object in objects {
            if !object.is_finite() {
                warn!("Skipping object {} in zone {}: non-finite footprint or height", object.id, object.zone);
                continue;
            }
            per_zone.entry(object.zone).or_default().push(SpatialObject { object: object.normalized() });
        }
        let trees: AHashMap<ZoneId, RTree<SpatialObject>> = per_zone
            .into_iter()
            .map(|(zone, objects)| (zone, RTree::bulk_load(objects)))
            .collect();

        debug!(
            "Model manager built for {} zones with {} objects",
            trees.len(),
            trees.values().map(|t| t.size()).sum::<usize>()
        );
        ModelManager { trees }
    }

    fn objects_at(&self, zone: ZoneId, x: f32, z: f32) -> SmallVec<[&PlacedObject; 4]> {
        let point = AABB::from_point([x, z]);
        match self.trees.get(&zone) {
            Some(tree) => tree
                .locate_in_envelope_intersecting(&point)
                .map(|s| &s.object)
                .filter(|o| o.contains(x, z))
                .collect(),
            None => SmallVec::new(),
        }
    }

    /// Surface heights of every object covering (x, z), lowest first.
    pub fn surfaces_at(&self, zone: ZoneId, x: f32, z: f32) -> SmallVec<[f32; 4]> {
        let mut heights: SmallVec<[f32; 4]> =
            self.objects_at(zone, x, z).into_iter().map(|o| o.surface_height).collect();
        heights.sort_by(|a, b| a.total_cmp(b));
        heights
    }

    /// Highest object surface at (x, z), or negative infinity when nothing covers it.
    pub fn object_height(&self, zone: ZoneId, x: f32, z: f32) -> f32 {
        self.objects_at(zone, x, z)
            .into_iter()
            .map(|o| o.surface_height)
            .fold(f32::NEG_INFINITY, f32::max)
    }

    pub fn blocks_motion(&self, zone: ZoneId, x: f32, z: f32) -> bool {
        self.objects_at(zone, x, z).into_iter().any(|o| o.kind == ObjectKind::Obstacle)
    }

    /// Fraction of the segment at which it first touches an obstacle, if any.
    pub fn first_obstacle_hit(&self, zone: ZoneId, x0: f32, z0: f32, x1: f32, z1: f32) -> Option<f32> {
        let tree = self.trees.get(&zone)?;
        let span = AABB::from_corners([x0, z0], [x1, z1]);
        tree.locate_in_envelope_intersecting(&span)
            .map(|s| &s.object)
            .filter(|o| o.kind == ObjectKind::Obstacle)
            .filter_map(|o| o.segment_entry(x0, z0, x1, z1))
            .min_by(|a, b| a.total_cmp(b))
    }

    /// Objects intersecting a local rectangle.
    pub fn query_rect(&self, zone: ZoneId, min_x: f32, min_z: f32, max_x: f32, max_z: f32) -> Vec<PlacedObject> {
        let query = AABB::from_corners([min_x, min_z], [max_x, max_z]);
        match self.trees.get(&zone) {
            Some(tree) => tree
                .locate_in_envelope_intersecting(&query)
                .map(|s| s.object.clone())
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn object_count(&self, zone: ZoneId) -> usize {
        self.trees.get(&zone).map_or(0, |t| t.size())
    }
}

impl std::fmt::Debug for ModelManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelManager").field("zones", &self.trees.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object(id: u32, kind: ObjectKind, rect: (f32, f32, f32, f32), height: f32) -> PlacedObject {
        PlacedObject {
            id,
            zone: 7,
            kind,
            min_x: rect.0,
            min_z: rect.1,
            max_x: rect.2,
            max_z: rect.3,
            surface_height: height,
        }
    }

    #[test]
    fn stacked_surfaces_are_sorted() {
        let models = ModelManager::new(vec![
            object(1, ObjectKind::Platform, (0.0, 0.0, 10.0, 10.0), 40.0),
            object(2, ObjectKind::Platform, (0.0, 0.0, 10.0, 10.0), 20.0),
            object(3, ObjectKind::Platform, (50.0, 50.0, 60.0, 60.0), 5.0),
        ]);
        assert_eq!(models.surfaces_at(7, 5.0, 5.0).as_slice(), &[20.0, 40.0]);
        assert_eq!(models.object_height(7, 5.0, 5.0), 40.0);
        assert_eq!(models.object_count(7), 3);
    }

    #[test]
    fn uncovered_point_has_no_object_height() {
        let models = ModelManager::new(vec![object(1, ObjectKind::Platform, (0.0, 0.0, 10.0, 10.0), 3.0)]);
        assert_eq!(models.object_height(7, 11.0, 5.0), f32::NEG_INFINITY);
        assert_eq!(models.object_height(8, 5.0, 5.0), f32::NEG_INFINITY);
        assert!(models.surfaces_at(7, 20.0, 20.0).is_empty());
    }

    #[test]
    fn inverted_rects_are_normalized() {
        let models = ModelManager::new(vec![object(1, ObjectKind::Obstacle, (10.0, 10.0, 0.0, 0.0), 8.0)]);
        assert!(models.blocks_motion(7, 5.0, 5.0));
        assert_eq!(models.query_rect(7, 0.0, 0.0, 1.0, 1.0)[0].min_x, 0.0);
    }

    #[test]
    fn non_finite_objects_are_skipped() {
        let models = ModelManager::new(vec![
            object(1, ObjectKind::Obstacle, (f32::NAN, 0.0, 10.0, 10.0), 8.0),
            object(2, ObjectKind::Obstacle, (0.0, 0.0, f32::INFINITY, 10.0), 8.0),
            object(3, ObjectKind::Platform, (0.0, 0.0, 10.0, 10.0), f32::NAN),
            object(4, ObjectKind::Obstacle, (20.0, 0.0, 30.0, 10.0), 8.0),
        ]);
        assert_eq!(models.object_count(7), 1);
        assert!(!models.blocks_motion(7, 5.0, 5.0));
        assert!(models.blocks_motion(7, 25.0, 5.0));
    }

    #[test]
    fn segment_hits_the_nearest_obstacle() {
        let models = ModelManager::new(vec![
            object(1, ObjectKind::Obstacle, (60.0, 0.0, 61.0, 100.0), 5.0),
            object(2, ObjectKind::Obstacle, (30.0, 0.0, 30.5, 100.0), 5.0),
            object(3, ObjectKind::Platform, (10.0, 0.0, 20.0, 100.0), 5.0),
        ]);
        let t = models.first_obstacle_hit(7, 0.0, 50.0, 100.0, 50.0).unwrap();
        assert!((t - 0.3).abs() < 1e-5);
        assert_eq!(models.first_obstacle_hit(7, 0.0, 50.0, 25.0, 50.0), None);
        assert_eq!(models.first_obstacle_hit(8, 0.0, 50.0, 100.0, 50.0), None);
    }

    #[test]
    fn segment_clipping_a_corner_hits() {
        let obstacle = object(1, ObjectKind::Obstacle, (10.0, 10.0, 20.0, 20.0), 5.0);
        // x + z = 39.5 cuts the (20, 20) corner over less than one unit.
        assert!(obstacle.segment_entry(39.5, 0.0, 0.0, 39.5).is_some());
        assert!(obstacle.segment_entry(40.5, 0.0, 0.0, 40.5).is_none());
        assert_eq!(obstacle.segment_entry(15.0, 15.0, 40.0, 40.0), Some(0.0));
    }

    #[test]
    fn only_obstacles_block_motion() {
        let models = ModelManager::new(vec![
            object(1, ObjectKind::Platform, (0.0, 0.0, 10.0, 10.0), 3.0),
            object(2, ObjectKind::Obstacle, (20.0, 0.0, 30.0, 10.0), 50.0),
        ]);
        assert!(!models.blocks_motion(7, 5.0, 5.0));
        assert!(models.blocks_motion(7, 20.0, 5.0));
        assert_eq!(models.query_rect(7, -5.0, -5.0, 25.0, 5.0).len(), 2);
    }
}
