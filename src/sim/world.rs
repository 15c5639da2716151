//! Static reference world
//!
//! A list of primitive colliders and hookable anchor points. Answers the
//! [`Environment`] and [`AnchorScanner`] queries with signed distance fields.

use glam::Vec3;

use super::collision::{CastHit, ColliderId, Overlap};
use super::sdf::{sd_box, sd_capsule, sd_sphere, sdf_gradient, sphere_trace};
use crate::horizontal;
use crate::platform::{AnchorHit, AnchorScanner, Environment};

/// Maximum sphere-tracing steps per collider
const MAX_TRACE_STEPS: usize = 64;

/// Collider geometry
#[derive(Debug, Clone, Copy)]
pub enum Shape {
    Sphere { center: Vec3, radius: f32 },
    /// Axis-aligned box
    Cuboid { center: Vec3, half_extents: Vec3 },
    Capsule { a: Vec3, b: Vec3, radius: f32 },
}

impl Shape {
    /// Signed distance from `p` to the surface
    pub fn distance(&self, p: Vec3) -> f32 {
        match *self {
            Shape::Sphere { center, radius } => sd_sphere(p, center, radius),
            Shape::Cuboid {
                center,
                half_extents,
            } => sd_box(p, center, half_extents),
            Shape::Capsule { a, b, radius } => sd_capsule(p, a, b, radius),
        }
    }
}

/// A collider in the world
#[derive(Debug, Clone, Copy)]
pub struct Collider {
    pub id: ColliderId,
    pub shape: Shape,
    /// Stands in for a non-convex triangle mesh (ropes pass through these)
    pub concave_mesh: bool,
}

/// A point the rope can hook onto
#[derive(Debug, Clone, Copy)]
pub struct Anchor {
    pub position: Vec3,
}

/// Static world of primitive colliders and anchors
#[derive(Debug, Clone, Default)]
pub struct StaticWorld {
    colliders: Vec<Collider>,
    anchors: Vec<Anchor>,
    next_id: u32,
}

impl StaticWorld {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, shape: Shape, concave_mesh: bool) -> ColliderId {
        let id = ColliderId(self.next_id);
        self.next_id += 1;
        self.colliders.push(Collider {
            id,
            shape,
            concave_mesh,
        });
        id
    }

    /// Add a convex collider
    pub fn add_collider(&mut self, shape: Shape) -> ColliderId {
        self.push(shape, false)
    }

    /// Add a collider that behaves like a concave mesh
    pub fn add_concave_mesh(&mut self, shape: Shape) -> ColliderId {
        self.push(shape, true)
    }

    pub fn add_anchor(&mut self, position: Vec3) {
        self.anchors.push(Anchor { position });
    }

    pub fn colliders(&self) -> &[Collider] {
        &self.colliders
    }

    pub fn anchors(&self) -> &[Anchor] {
        &self.anchors
    }

    /// Whether the straight segment from `from` to `to` is free of colliders
    ///
    /// Colliders within `clearance` of `to` are ignored so an anchor sitting on
    /// a beam can still be seen.
    fn line_of_sight(&self, from: Vec3, to: Vec3, clearance: f32) -> bool {
        let delta = to - from;
        let dist = delta.length();
        let Some(dir) = delta.try_normalize() else {
            return true;
        };
        self.colliders
            .iter()
            .filter(|c| c.shape.distance(to) > clearance && c.shape.distance(from) > 0.0)
            .all(|c| {
                sphere_trace(from, dir, 0.0, dist, MAX_TRACE_STEPS, |p| c.shape.distance(p))
                    .is_none_or(|(t, _)| t >= dist)
            })
    }
}

impl Environment for StaticWorld {
    fn overlap_sphere(&self, center: Vec3, radius: f32, exclude: Option<ColliderId>) -> Vec<Overlap> {
        self.colliders
            .iter()
            .filter(|c| Some(c.id) != exclude)
            .filter_map(|c| {
                let d = c.shape.distance(center);
                if d >= radius {
                    return None;
                }
                let normal = sdf_gradient(center, |p| c.shape.distance(p));
                Some(Overlap {
                    collider: c.id,
                    point: center - normal * d,
                    normal,
                    concave_mesh: c.concave_mesh,
                })
            })
            .collect()
    }

    fn sphere_cast(
        &self,
        origin: Vec3,
        radius: f32,
        direction: Vec3,
        max_distance: f32,
        exclude: Option<ColliderId>,
    ) -> Option<CastHit> {
        let dir = direction.try_normalize()?;
        self.colliders
            .iter()
            .filter(|c| Some(c.id) != exclude)
            // Initial overlaps are not hits
            .filter(|c| c.shape.distance(origin) > radius)
            .filter_map(|c| {
                let (t, normal) =
                    sphere_trace(origin, dir, radius, max_distance, MAX_TRACE_STEPS, |p| {
                        c.shape.distance(p)
                    })?;
                Some(CastHit {
                    collider: c.id,
                    point: origin + dir * t - normal * radius,
                    normal,
                    distance: t,
                })
            })
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }
}

impl AnchorScanner for StaticWorld {
    fn scan_for_anchor(
        &self,
        max_distance: f32,
        min_distance: f32,
        origin: Vec3,
        aim: Vec3,
    ) -> Option<AnchorHit> {
        let aim = aim.normalize_or_zero();
        self.anchors
            .iter()
            .filter_map(|a| {
                let to_anchor = a.position - origin;
                let distance = to_anchor.length();
                if distance < min_distance || distance > max_distance {
                    return None;
                }
                // Must be in front of the aim direction
                let alignment = to_anchor.dot(aim) / distance;
                if alignment <= 0.0 || !self.line_of_sight(origin, a.position, 0.1) {
                    return None;
                }
                let approach_direction = horizontal(to_anchor).try_normalize().unwrap_or(aim);
                Some((
                    alignment,
                    AnchorHit {
                        position: a.position,
                        approach_direction,
                        distance,
                    },
                ))
            })
            .max_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, hit)| hit)
    }
}
