// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Ray queries: two-level traversal from the TLAS into each candidate instance's BLAS.

use alloc::vec::Vec;
use glam::Vec3;

use crate::geometry::GeometrySource;
use crate::node::NodeKind;
use crate::ray::{Ray, RayFlags, intersect_triangle};
use crate::registry::{BlasHandle, BlasInstance, Registry, TlasHandle};
use crate::tlas::Tlas;

/// Result of [`Registry::cast_ray`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RayHit {
    /// World-space distance from the ray origin.
    pub distance: f32,
    /// World-space hit point.
    pub position: Vec3,
    /// Creation-order index of the instance within its TLAS.
    pub instance: u32,
    /// BLAS of the hit instance.
    pub blas: BlasHandle,
    /// Mesh-local triangle number.
    pub triangle: u32,
}

impl Registry {
    /// Whether any triangle of the scene TLAS lies on the ray strictly between distance 0
    /// and `max_length`.
    ///
    /// `geometry` resolves the vertex and index buffers the BLASes were built from.
    /// Returns `false` without a scene TLAS, for an unbuilt or empty one, for a zero
    /// direction, and for a non-positive `max_length`.
    pub fn line_of_sight<G: GeometrySource + ?Sized>(
        &self,
        geometry: &G,
        origin: Vec3,
        direction: Vec3,
        max_length: f32,
    ) -> bool {
        self.scene_tlas().is_some_and(|tlas| {
            self.line_of_sight_in(tlas, geometry, origin, direction, max_length)
        })
    }

    /// [`line_of_sight`](Self::line_of_sight) against a specific TLAS.
    pub fn line_of_sight_in<G: GeometrySource + ?Sized>(
        &self,
        tlas: TlasHandle,
        geometry: &G,
        origin: Vec3,
        direction: Vec3,
        max_length: f32,
    ) -> bool {
        self.cast_ray_in(
            tlas,
            geometry,
            origin,
            direction,
            max_length,
            RayFlags::TERMINATE_ON_FIRST_HIT,
        )
        .is_some()
    }

    /// Cast a ray into the scene TLAS.
    ///
    /// Without [`RayFlags::TERMINATE_ON_FIRST_HIT`] the nearest hit is returned.
    pub fn cast_ray<G: GeometrySource + ?Sized>(
        &self,
        geometry: &G,
        origin: Vec3,
        direction: Vec3,
        max_length: f32,
        flags: RayFlags,
    ) -> Option<RayHit> {
        let tlas = self.scene_tlas()?;
        self.cast_ray_in(tlas, geometry, origin, direction, max_length, flags)
    }

    /// [`cast_ray`](Self::cast_ray) against a specific TLAS.
    pub fn cast_ray_in<G: GeometrySource + ?Sized>(
        &self,
        tlas: TlasHandle,
        geometry: &G,
        origin: Vec3,
        direction: Vec3,
        max_length: f32,
        flags: RayFlags,
    ) -> Option<RayHit> {
        let Some(t) = self.tlas(tlas) else {
            log::debug!("ray query against unknown TLAS {tlas:?}");
            return None;
        };
        let direction = direction.normalize_or_zero();
        if direction == Vec3::ZERO || max_length.is_nan() || max_length <= 0.0 {
            return None;
        }
        let ray = Ray::new(origin, direction, max_length, self.config().inverse_epsilon);
        self.trace(t, geometry, ray, flags)
    }

    fn trace<G: GeometrySource + ?Sized>(
        &self,
        tlas: &Tlas,
        geometry: &G,
        mut ray: Ray,
        flags: RayFlags,
    ) -> Option<RayHit> {
        let nodes = tlas.nodes();
        if nodes.is_empty() {
            return None;
        }
        let epsilon = self.config().inverse_epsilon;
        let first_hit = flags.contains(RayFlags::TERMINATE_ON_FIRST_HIT);
        let mut best = None;
        let mut stack: Vec<u32> = Vec::with_capacity(tlas.max_depth() as usize + 2);
        let mut blas_stack: Vec<u32> = Vec::new();
        stack.push(0);
        while let Some(idx) = stack.pop() {
            let Some(node) = nodes.get(idx as usize) else {
                continue;
            };
            if !ray.hits_aabb(node.aabb_min, node.aabb_max) {
                continue;
            }
            match node.kind() {
                NodeKind::Interior { left, right } => {
                    stack.push(right);
                    stack.push(left);
                }
                NodeKind::Leaf { first, count } => {
                    for slot in first..first + count {
                        let Some(instance) = self.blas_instance(tlas, slot) else {
                            continue;
                        };
                        let local = ray.transformed(&instance.inverse_world_transform, epsilon);
                        let Some((distance, triangle)) =
                            self.walk_blas(&instance, geometry, local, flags, &mut blas_stack)
                        else {
                            continue;
                        };
                        log::trace!(
                            "ray hit instance {} triangle {triangle} at {distance}",
                            instance.instance
                        );
                        ray.max_distance = distance;
                        best = Some(RayHit {
                            distance,
                            position: ray.at(distance),
                            instance: instance.instance,
                            blas: instance.blas,
                            triangle,
                        });
                        if first_hit {
                            return best;
                        }
                    }
                }
            }
        }
        best
    }

    /// Walk one instance's slice of the global BLAS buffers with an object-space ray.
    ///
    /// Returns the hit distance and mesh-local triangle number.
    fn walk_blas<G: GeometrySource + ?Sized>(
        &self,
        instance: &BlasInstance,
        geometry: &G,
        mut ray: Ray,
        flags: RayFlags,
        stack: &mut Vec<u32>,
    ) -> Option<(f32, u32)> {
        let root = instance.root_index as usize;
        let nodes = self
            .blas_nodes()
            .get(root..root + instance.node_count as usize)?;
        let tri_indices = self
            .triangle_indices()
            .get(instance.base_triangle_index as usize..)?;
        if nodes.is_empty() {
            return None;
        }
        let first_hit = flags.contains(RayFlags::TERMINATE_ON_FIRST_HIT);
        let cull = flags.contains(RayFlags::CULL_BACK_FACES);
        let mut best = None;
        stack.clear();
        stack.reserve(instance.max_depth as usize + 2);
        stack.push(0);
        while let Some(idx) = stack.pop() {
            let Some(node) = nodes.get(idx as usize) else {
                continue;
            };
            if !ray.hits_aabb(node.aabb_min, node.aabb_max) {
                continue;
            }
            match node.kind() {
                NodeKind::Interior { left, right } => {
                    stack.push(right);
                    stack.push(left);
                }
                NodeKind::Leaf { first, count } => {
                    for k in first..first + count {
                        let Some(&triangle) = tri_indices.get(k as usize) else {
                            continue;
                        };
                        let Some([v0, v1, v2]) = geometry.triangle(
                            instance.mesh_base_vertex,
                            instance.mesh_base_index,
                            triangle,
                        ) else {
                            log::trace!("triangle {triangle} outside the geometry buffers");
                            continue;
                        };
                        let hit = intersect_triangle(
                            ray.origin,
                            ray.direction,
                            0.0,
                            ray.max_distance,
                            v0,
                            v1,
                            v2,
                            cull,
                        );
                        if let Some(t) = hit {
                            ray.max_distance = t;
                            best = Some((t, triangle));
                            if first_hit {
                                return best;
                            }
                        }
                    }
                }
            }
        }
        best
    }
}
