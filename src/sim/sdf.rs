//! SDF-based collision detection
//!
//! Signed distance functions for the primitive shapes of the reference world,
//! plus gradient normals and sphere tracing for swept queries.

use glam::Vec3;

/// Signed distance to a sphere
#[inline]
pub fn sd_sphere(p: Vec3, center: Vec3, radius: f32) -> f32 {
    (p - center).length() - radius
}

/// Signed distance to an axis-aligned box
pub fn sd_box(p: Vec3, center: Vec3, half_extents: Vec3) -> f32 {
    let q = (p - center).abs() - half_extents;
    q.max(Vec3::ZERO).length() + q.max_element().min(0.0)
}

/// Closest point to `p` on segment `a`-`b`
pub fn closest_point_on_segment(p: Vec3, a: Vec3, b: Vec3) -> Vec3 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq < 1e-8 {
        return a; // Degenerate segment
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    a + ab * t
}

/// Signed distance to a capsule
#[inline]
pub fn sd_capsule(p: Vec3, a: Vec3, b: Vec3, radius: f32) -> f32 {
    (p - closest_point_on_segment(p, a, b)).length() - radius
}

/// Compute SDF gradient (surface normal) using central differences
pub fn sdf_gradient<F>(p: Vec3, sdf: F) -> Vec3
where
    F: Fn(Vec3) -> f32,
{
    let eps = 1e-3;
    let dx = sdf(p + Vec3::new(eps, 0.0, 0.0)) - sdf(p - Vec3::new(eps, 0.0, 0.0));
    let dy = sdf(p + Vec3::new(0.0, eps, 0.0)) - sdf(p - Vec3::new(0.0, eps, 0.0));
    let dz = sdf(p + Vec3::new(0.0, 0.0, eps)) - sdf(p - Vec3::new(0.0, 0.0, eps));
    Vec3::new(dx, dy, dz).normalize_or_zero()
}

/// Sphere-trace a sphere of `radius` along `direction` until it touches the surface
///
/// Returns the travelled distance and the surface normal at the touch point.
/// `direction` must be normalized.
pub fn sphere_trace<F>(
    origin: Vec3,
    direction: Vec3,
    radius: f32,
    max_distance: f32,
    max_steps: usize,
    sdf: F,
) -> Option<(f32, Vec3)>
where
    F: Fn(Vec3) -> f32,
{
    let mut t = 0.0;

    for _ in 0..max_steps {
        let p = origin + direction * t;
        let d = sdf(p);

        if d <= radius + 1e-4 {
            let normal = sdf_gradient(p, &sdf);
            return Some((t, normal));
        }

        // Step by distance to surface (sphere tracing)
        t += (d - radius).max(1e-3);

        if t > max_distance {
            break;
        }
    }

    None
}
