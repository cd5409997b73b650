// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rays, the slab test, and the ray/triangle test.

use glam::{Mat4, Vec3};

bitflags::bitflags! {
    /// Options for [`Registry::cast_ray`](crate::Registry::cast_ray).
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
    pub struct RayFlags: u8 {
        /// Stop at the first triangle hit instead of searching for the closest one.
        const TERMINATE_ON_FIRST_HIT = 1 << 0;
        /// Ignore triangles whose counter-clockwise front face points away from the ray.
        const CULL_BACK_FACES = 1 << 1;
    }
}

/// Reciprocal of `x`, clamped to `±1 / epsilon` when `|x| <= epsilon`.
///
/// Keeps the slab test finite for axis-parallel rays. Zero maps to `+1 / epsilon`.
pub fn safe_inverse(x: f32, epsilon: f32) -> f32 {
    if x.abs() <= epsilon {
        if x >= 0.0 { 1.0 / epsilon } else { -1.0 / epsilon }
    } else {
        1.0 / x
    }
}

/// A ray with a precomputed component-wise inverse direction.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Ray {
    /// Start point.
    pub origin: Vec3,
    /// Direction; not necessarily unit length.
    pub direction: Vec3,
    /// Safe inverse of `direction`, per component.
    pub inverse_direction: Vec3,
    /// Largest accepted parameter `t`.
    pub max_distance: f32,
}

impl Ray {
    /// Create a ray; `epsilon` is the [`safe_inverse`] threshold.
    pub fn new(origin: Vec3, direction: Vec3, max_distance: f32, epsilon: f32) -> Self {
        let inverse_direction = Vec3::new(
            safe_inverse(direction.x, epsilon),
            safe_inverse(direction.y, epsilon),
            safe_inverse(direction.z, epsilon),
        );
        Self {
            origin,
            direction,
            inverse_direction,
            max_distance,
        }
    }

    /// This ray mapped through `transform` (typically world-to-object).
    ///
    /// The direction is not renormalized, so `t` keeps measuring distance in the source
    /// space and `max_distance` carries over unchanged.
    pub fn transformed(&self, transform: &Mat4, epsilon: f32) -> Self {
        Self::new(
            transform.transform_point3(self.origin),
            transform.transform_vector3(self.direction),
            self.max_distance,
            epsilon,
        )
    }

    /// Point at parameter `t`.
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Slab test against the box `[min, max]`.
    ///
    /// Hits when the entry/exit interval is non-empty, starts before `max_distance`, and
    /// does not end before the origin. An origin lying on the box surface counts as a
    /// hit, including a ray that runs along a face it starts on.
    pub fn hits_aabb(&self, min: Vec3, max: Vec3) -> bool {
        let t1 = (min - self.origin) * self.inverse_direction;
        let t2 = (max - self.origin) * self.inverse_direction;
        let t_min = t1.min(t2).max_element();
        let t_max = t1.max(t2).min_element();
        t_max >= t_min && t_min < self.max_distance && t_max >= 0.0
    }
}

/// Ray/triangle test; returns the hit parameter `t` with `t_min < t < t_max`.
///
/// Misses when the ray is parallel to the triangle's plane, when the barycentrics fall
/// outside the triangle, and, with `cull_back_faces`, when the ray approaches the back of
/// a counter-clockwise triangle. Edges and vertices count as inside.
pub fn intersect_triangle(
    origin: Vec3,
    direction: Vec3,
    t_min: f32,
    t_max: f32,
    v0: Vec3,
    v1: Vec3,
    v2: Vec3,
    cull_back_faces: bool,
) -> Option<f32> {
    let a = v0 - v1;
    let b = v2 - v0;
    let p = v0 - origin;
    let n = b.cross(a);
    let r = direction.dot(n);
    if r == 0.0 || (cull_back_faces && r > 0.0) {
        return None;
    }
    let q = p.cross(direction);
    let u = q.dot(b) / r;
    let v = q.dot(a) / r;
    if u < 0.0 || v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = n.dot(p) / r;
    (t > t_min && t < t_max).then_some(t)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 0.001;

    #[test]
    fn safe_inverse_clamps_small_components() {
        assert_eq!(safe_inverse(0.0, EPS), 1000.0);
        assert_eq!(safe_inverse(-0.0, EPS), 1000.0);
        assert_eq!(safe_inverse(0.0005, EPS), 1000.0);
        assert_eq!(safe_inverse(-0.0005, EPS), -1000.0);
        assert_eq!(safe_inverse(0.5, EPS), 2.0);
        assert_eq!(safe_inverse(-4.0, EPS), -0.25);
    }

    #[test]
    fn slab_test_basic_cases() {
        let min = Vec3::splat(-1.0);
        let max = Vec3::splat(1.0);
        let toward = Ray::new(Vec3::new(5.0, 0.0, 0.0), Vec3::NEG_X, 100.0, EPS);
        assert!(toward.hits_aabb(min, max));

        let away = Ray::new(Vec3::new(5.0, 0.0, 0.0), Vec3::X, 100.0, EPS);
        assert!(!away.hits_aabb(min, max), "box behind the origin");

        let short = Ray::new(Vec3::new(5.0, 0.0, 0.0), Vec3::NEG_X, 3.0, EPS);
        assert!(!short.hits_aabb(min, max), "box beyond max distance");

        let beside = Ray::new(Vec3::new(5.0, 0.0, 0.0), Vec3::Y, 100.0, EPS);
        assert!(!beside.hits_aabb(min, max), "parallel ray outside the slab");

        let inside = Ray::new(Vec3::ZERO, Vec3::Z, 0.1, EPS);
        assert!(inside.hits_aabb(min, max), "origin inside the box");
    }

    #[test]
    fn slab_test_flat_box() {
        // A zero-thickness box, as produced by a single axis-aligned triangle.
        let min = Vec3::new(-1.0, -1.0, 0.0);
        let max = Vec3::new(1.0, 1.0, 0.0);
        let ray = Ray::new(Vec3::new(0.2, 0.3, -5.0), Vec3::Z, 10.0, EPS);
        assert!(ray.hits_aabb(min, max));
    }

    #[test]
    fn slab_test_origin_on_face() {
        let min = Vec3::splat(-1.0);
        let max = Vec3::splat(1.0);
        // Starts on the top face and runs along it; the y slab closes at t = 0.
        let grazing = Ray::new(Vec3::new(0.0, 1.0, 0.0), Vec3::NEG_X, 10.0, EPS);
        assert!(grazing.hits_aabb(min, max), "ray along the face it starts on");

        let leaving = Ray::new(Vec3::new(1.0, 0.0, 0.0), Vec3::X, 10.0, EPS);
        assert!(leaving.hits_aabb(min, max), "origin on the exit face");

        let behind = Ray::new(Vec3::new(1.5, 0.0, 0.0), Vec3::X, 10.0, EPS);
        assert!(!behind.hits_aabb(min, max), "box entirely behind the origin");
    }

    #[test]
    fn transformed_keeps_world_distances() {
        let to_local = Mat4::from_scale(Vec3::splat(0.5));
        let ray = Ray::new(Vec3::new(4.0, 0.0, 0.0), Vec3::NEG_X, 10.0, EPS);
        let local = ray.transformed(&to_local, EPS);
        assert_eq!(local.origin, Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(local.direction, Vec3::new(-0.5, 0.0, 0.0));
        assert_eq!(local.inverse_direction.x, -2.0);
        assert_eq!(local.max_distance, 10.0);
        // World point at t = 2 is (2, 0, 0); locally that is (1, 0, 0).
        assert_eq!(local.at(2.0), Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(ray.at(2.0), Vec3::new(2.0, 0.0, 0.0));
    }

    #[test]
    fn triangle_hit_and_miss() {
        let v0 = Vec3::new(0.0, 0.0, 0.0);
        let v1 = Vec3::new(1.0, 0.0, 0.0);
        let v2 = Vec3::new(0.0, 1.0, 0.0);
        let origin = Vec3::new(0.25, 0.25, 2.0);

        let t = intersect_triangle(origin, Vec3::NEG_Z, 0.0, 10.0, v0, v1, v2, false);
        assert_eq!(t, Some(2.0));
        assert_eq!(
            intersect_triangle(origin, Vec3::NEG_Z, 0.0, 1.5, v0, v1, v2, false),
            None,
            "beyond t_max"
        );
        assert_eq!(
            intersect_triangle(origin, Vec3::Z, 0.0, 10.0, v0, v1, v2, false),
            None,
            "triangle behind the origin"
        );

        let outside = Vec3::new(0.9, 0.9, 2.0);
        assert_eq!(
            intersect_triangle(outside, Vec3::NEG_Z, 0.0, 10.0, v0, v1, v2, false),
            None
        );

        let parallel = Vec3::new(-1.0, 0.25, 0.0);
        assert_eq!(
            intersect_triangle(parallel, Vec3::X, 0.0, 10.0, v0, v1, v2, false),
            None,
            "ray in the triangle's plane"
        );
    }

    #[test]
    fn triangle_edge_counts_as_hit() {
        let v0 = Vec3::new(0.0, 0.0, 0.0);
        let v1 = Vec3::new(2.0, 0.0, 0.0);
        let v2 = Vec3::new(0.0, 2.0, 0.0);
        let on_edge = Vec3::new(1.0, 1.0, 3.0);
        let t = intersect_triangle(on_edge, Vec3::NEG_Z, 0.0, 10.0, v0, v1, v2, false);
        assert_eq!(t, Some(3.0));
    }

    #[test]
    fn back_face_culling() {
        // Counter-clockwise seen from +z: front face points to +z.
        let v0 = Vec3::new(0.0, 0.0, 0.0);
        let v1 = Vec3::new(1.0, 0.0, 0.0);
        let v2 = Vec3::new(0.0, 1.0, 0.0);
        let above = Vec3::new(0.25, 0.25, 1.0);
        let below = Vec3::new(0.25, 0.25, -1.0);

        assert!(intersect_triangle(above, Vec3::NEG_Z, 0.0, 5.0, v0, v1, v2, true).is_some());
        assert!(intersect_triangle(below, Vec3::Z, 0.0, 5.0, v0, v1, v2, true).is_none());
        assert!(intersect_triangle(below, Vec3::Z, 0.0, 5.0, v0, v1, v2, false).is_some());
    }
}
