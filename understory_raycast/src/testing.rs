// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shared fixtures for unit tests.

use alloc::vec::Vec;
use glam::Vec3;

use crate::types::to_u32;

/// Xorshift generator for reproducible random meshes.
#[derive(Clone, Debug)]
pub(crate) struct Rng(u64);

impl Rng {
    pub(crate) fn new(seed: u64) -> Self {
        Self(seed)
    }

    pub(crate) fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }

    /// Uniform in `[0, 1)`.
    pub(crate) fn next_f32(&mut self) -> f32 {
        let v = self.next_u64() >> 40;
        v as f32 / (1_u64 << 24) as f32
    }

    /// Uniform in `[lo, hi)`.
    pub(crate) fn range(&mut self, lo: f32, hi: f32) -> f32 {
        lo + (hi - lo) * self.next_f32()
    }

    pub(crate) fn vec3(&mut self, lo: f32, hi: f32) -> Vec3 {
        Vec3::new(self.range(lo, hi), self.range(lo, hi), self.range(lo, hi))
    }
}

/// Axis-aligned cube of half-size `h` centered at the origin: 8 vertices, 12 triangles,
/// counter-clockwise outward winding.
pub(crate) fn cube(h: f32) -> (Vec<Vec3>, Vec<u32>) {
    let vertices = (0..8)
        .map(|i| {
            Vec3::new(
                if i & 1 == 0 { -h } else { h },
                if i & 2 == 0 { -h } else { h },
                if i & 4 == 0 { -h } else { h },
            )
        })
        .collect();
    let indices = [
        // -x
        0, 4, 6, 0, 6, 2, //
        // +x
        1, 3, 7, 1, 7, 5, //
        // -y
        0, 1, 5, 0, 5, 4, //
        // +y
        2, 6, 7, 2, 7, 3, //
        // -z
        0, 2, 3, 0, 3, 1, //
        // +z
        4, 5, 7, 4, 7, 6,
    ]
    .to_vec();
    (vertices, indices)
}

/// `count` small random triangles scattered in `[-extent, extent]^3`.
pub(crate) fn triangle_soup(rng: &mut Rng, count: usize, extent: f32) -> (Vec<Vec3>, Vec<u32>) {
    let mut vertices = Vec::with_capacity(count * 3);
    let mut indices = Vec::with_capacity(count * 3);
    for t in 0..count {
        let c = rng.vec3(-extent, extent);
        for _ in 0..3 {
            vertices.push(c + rng.vec3(-0.5, 0.5));
        }
        let base = to_u32(t * 3);
        indices.extend_from_slice(&[base, base + 1, base + 2]);
    }
    (vertices, indices)
}
