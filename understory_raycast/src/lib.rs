// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_raycast --heading-base-level=0

//! Understory Raycast: a two-level BVH for ray queries against instanced 3D meshes.
//!
//! - Build one bottom-level structure ([`Blas`]) per distinct mesh with a binned
//!   surface-area heuristic.
//! - Place meshes in the world as instances of a top-level structure ([`Tlas`]), a
//!   median-split tree over instance boxes that is cheap to rebuild every frame.
//! - Ask whether a segment is blocked with [`Registry::line_of_sight`], or find the
//!   nearest hit with [`Registry::cast_ray`].
//!
//! The [`Registry`] owns every structure and concatenates all BLAS nodes and triangle
//! permutations into two shared buffers, addressed through stable [`BlasHandle`]s.
//! Vertex data stays outside the crate: queries read it through a [`GeometrySource`],
//! the same global vertex and index buffers a renderer would draw from.
//! [`MeshBuffers`] is a minimal implementation.
//!
//! # Example
//!
//! ```rust
//! use glam::{Mat4, Vec3};
//! use understory_raycast::{MeshBuffers, RayFlags, Registry};
//!
//! // A unit quad in the z = 0 plane.
//! let vertices = [
//!     Vec3::new(-1.0, -1.0, 0.0),
//!     Vec3::new(1.0, -1.0, 0.0),
//!     Vec3::new(1.0, 1.0, 0.0),
//!     Vec3::new(-1.0, 1.0, 0.0),
//! ];
//! let indices = [0, 1, 2, 0, 2, 3];
//!
//! let mut geometry = MeshBuffers::new();
//! let mesh = geometry.push_mesh(&vertices, &indices);
//!
//! let mut registry = Registry::new();
//! let quad = registry.create_blas(&vertices, &indices, mesh.base_vertex, mesh.base_index);
//!
//! // Two copies: one at the origin, one pushed back to z = -5.
//! let scene = registry.create_tlas();
//! for z in [0.0, -5.0] {
//!     let transform = Mat4::from_translation(Vec3::new(0.0, 0.0, z));
//!     registry.add_instance(scene, quad, transform).unwrap();
//! }
//! registry.build_tlas(scene).unwrap();
//!
//! let eye = Vec3::new(0.25, -0.5, 10.0);
//! assert!(registry.line_of_sight(&geometry, eye, Vec3::NEG_Z, 20.0));
//! assert!(!registry.line_of_sight(&geometry, eye, Vec3::NEG_Z, 5.0));
//!
//! let hit = registry
//!     .cast_ray(&geometry, eye, Vec3::NEG_Z, 20.0, RayFlags::empty())
//!     .unwrap();
//! assert_eq!(hit.instance, 0);
//! assert!((hit.distance - 10.0).abs() < 1e-4);
//! ```
//!
//! ## Rebuilding
//!
//! - Mesh edits: [`Registry::recreate_blas`] rebuilds in place. The handle is kept;
//!   later BLASes shift within the shared buffers and their offsets are re-derived.
//! - Moving instances: [`Tlas::clear`], re-add with [`Registry::add_instance`], and
//!   [`Registry::build_tlas`]. The top level is always rebuilt from scratch.
//! - Level unload: [`Registry::clean_up`].
//!
//! ## Conventions
//!
//! Triangles are counter-clockwise when seen from their front. Ray distances are world
//! units even inside scaled instances. A direction component with magnitude at most
//! [`Config::inverse_epsilon`] is treated as `±1 / inverse_epsilon` by the box test.
//! Coordinates are assumed finite.
//!
//! This crate is `no_std` and uses `alloc`. Enable the `libm` feature instead of `std`
//! for targets without a standard library.

#![no_std]

extern crate alloc;

pub mod blas;
pub mod config;
pub mod error;
pub mod geometry;
pub mod node;
pub mod query;
pub mod ray;
pub mod registry;
pub mod tlas;
pub mod types;

#[cfg(test)]
mod testing;

pub use blas::Blas;
pub use config::Config;
pub use error::{BuildError, RegistryError};
pub use geometry::{GeometrySource, MeshBuffers, MeshRange, Vertex};
pub use node::{BvhNode, BvhStats, NodeKind};
pub use query::RayHit;
pub use ray::{Ray, RayFlags, intersect_triangle, safe_inverse};
pub use registry::{BlasHandle, BlasInstance, Registry, TlasHandle};
pub use tlas::Tlas;
pub use types::{Aabb3, Triangle};
