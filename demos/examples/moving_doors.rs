// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Moving doors.
//!
//! A corridor of door panels that swing open over time. Each frame the TLAS is cleared,
//! refilled with the current door transforms, and rebuilt, while the door BLAS itself is
//! built once. Halfway through, the door mesh is edited and rebuilt in place.
//!
//! Run:
//! - `RUST_LOG=debug cargo run -p understory_raycast_demos --example moving_doors`

use glam::{Mat4, Quat, Vec3};
use understory_raycast::{BlasHandle, MeshBuffers, MeshRange, Registry, TlasHandle};

const DOORS: usize = 6;
const SPACING: f32 = 4.0;
const FRAMES: usize = 8;

/// A thin door panel hinged at the origin, extending along +x.
fn door(width: f32, height: f32) -> (Vec<Vec3>, Vec<u32>) {
    let t = 0.05;
    let vertices = (0..8)
        .map(|i| {
            Vec3::new(
                if i & 1 == 0 { 0.0 } else { width },
                if i & 2 == 0 { 0.0 } else { height },
                if i & 4 == 0 { -t } else { t },
            )
        })
        .collect();
    let indices = vec![
        0, 4, 6, 0, 6, 2, //
        1, 3, 7, 1, 7, 5, //
        0, 1, 5, 0, 5, 4, //
        2, 6, 7, 2, 7, 3, //
        0, 2, 3, 0, 3, 1, //
        4, 5, 7, 4, 7, 6,
    ];
    (vertices, indices)
}

fn place_doors(registry: &mut Registry, scene: TlasHandle, blas: BlasHandle, angle: f32) {
    if let Some(tlas) = registry.tlas_mut(scene) {
        tlas.clear();
    }
    for k in 0..DOORS {
        let hinge = Vec3::new(-1.0, 0.0, k as f32 * SPACING);
        let transform = Mat4::from_rotation_translation(Quat::from_rotation_y(angle), hinge);
        if let Err(err) = registry.add_instance(scene, blas, transform) {
            log::warn!("door {k} not placed: {err}");
        }
    }
    if let Err(err) = registry.build_tlas(scene) {
        log::warn!("scene rebuild failed: {err}");
    }
}

fn main() {
    env_logger::init();

    let (vertices, indices) = door(2.0, 2.5);
    let mut geometry = MeshBuffers::new();
    let mut mesh: MeshRange = geometry.push_mesh(&vertices, &indices);

    let mut registry = Registry::new();
    let blas = registry.create_blas(&vertices, &indices, mesh.base_vertex, mesh.base_index);
    let scene = registry.create_tlas();

    // Looking down the corridor through the doorways.
    let eye = Vec3::new(0.0, 1.2, -5.0);
    let length = DOORS as f32 * SPACING + 5.0;

    for frame in 0..FRAMES {
        if frame == FRAMES / 2 {
            // Narrower doors from here on.
            let (vertices, indices) = door(1.2, 2.5);
            mesh = geometry.push_mesh(&vertices, &indices);
            if let Err(err) =
                registry.recreate_blas(blas, &vertices, &indices, mesh.base_vertex, mesh.base_index)
            {
                log::error!("door rebuild failed: {err}");
                return;
            }
        }

        let angle = frame as f32 / (FRAMES - 1) as f32 * std::f32::consts::FRAC_PI_2;
        place_doors(&mut registry, scene, blas, angle);

        let blocked = registry.line_of_sight(&geometry, eye, Vec3::Z, length);
        let stats = registry.tlas(scene).map(|t| t.stats()).unwrap_or_default();
        println!(
            "frame {frame}: door angle {:5.1} deg, {} TLAS nodes (depth {}), corridor blocked = {blocked}",
            angle.to_degrees(),
            stats.nodes,
            stats.max_depth,
        );
    }
    println!("mesh range in use: {mesh:?}");
}
