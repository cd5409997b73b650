// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Line of sight.
//!
//! Build a cube BLAS, place it in a scene, and ask which of a few rays are blocked.
//!
//! Run:
//! - `RUST_LOG=debug cargo run -p understory_raycast_demos --example line_of_sight`

use glam::{Mat4, Vec3};
use understory_raycast::{MeshBuffers, RayFlags, Registry};

fn cube(h: f32) -> (Vec<Vec3>, Vec<u32>) {
    let vertices = (0..8)
        .map(|i| {
            Vec3::new(
                if i & 1 == 0 { -h } else { h },
                if i & 2 == 0 { -h } else { h },
                if i & 4 == 0 { -h } else { h },
            )
        })
        .collect();
    let indices = vec![
        0, 4, 6, 0, 6, 2, // -x
        1, 3, 7, 1, 7, 5, // +x
        0, 1, 5, 0, 5, 4, // -y
        2, 6, 7, 2, 7, 3, // +y
        0, 2, 3, 0, 3, 1, // -z
        4, 5, 7, 4, 7, 6, // +z
    ];
    (vertices, indices)
}

fn main() {
    env_logger::init();

    let (vertices, indices) = cube(1.0);
    let mut geometry = MeshBuffers::new();
    let mesh = geometry.push_mesh(&vertices, &indices);

    let mut registry = Registry::new();
    let blas = registry.create_blas(&vertices, &indices, mesh.base_vertex, mesh.base_index);
    let scene = registry.create_tlas();
    let bounds = registry
        .instance_bounds(blas, &Mat4::IDENTITY)
        .expect("cube BLAS has bounds");
    let tlas = registry.tlas_mut(scene).expect("scene TLAS is live");
    tlas.add_instance(Mat4::IDENTITY, blas, bounds);
    tlas.build();

    let origin = Vec3::new(5.0, 0.0, 0.0);
    let queries = [
        ("toward the cube", Vec3::NEG_X, 10.0),
        ("sideways", Vec3::Y, 10.0),
        ("toward the cube, too short", Vec3::NEG_X, 2.0),
    ];
    for (label, direction, length) in queries {
        let blocked = registry.line_of_sight(&geometry, origin, direction, length);
        println!("{label}: blocked = {blocked}");
    }

    let hit = registry
        .cast_ray(&geometry, origin, Vec3::NEG_X, 10.0, RayFlags::empty())
        .expect("ray toward the cube hits it");
    println!(
        "nearest hit: triangle {} at distance {} ({})",
        hit.triangle, hit.distance, hit.position
    );
    assert!((hit.distance - 4.0).abs() < 1e-4, "front face is 4 units away");
}
