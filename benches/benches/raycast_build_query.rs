// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use glam::{Mat4, Vec3};
use understory_raycast::{BlasHandle, MeshBuffers, RayFlags, Registry, Tlas};

#[derive(Clone)]
struct Rng(u64);

impl Rng {
    fn new(seed: u64) -> Self {
        Self(seed)
    }
    fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }
    fn next_f32(&mut self) -> f32 {
        let v = self.next_u64() >> 40;
        (v as f32) / ((1u64 << 24) as f32)
    }
    fn vec3(&mut self, extent: f32) -> Vec3 {
        Vec3::new(
            (self.next_f32() * 2.0 - 1.0) * extent,
            (self.next_f32() * 2.0 - 1.0) * extent,
            (self.next_f32() * 2.0 - 1.0) * extent,
        )
    }
}

fn gen_triangle_soup(count: usize, extent: f32) -> (Vec<Vec3>, Vec<u32>) {
    let mut rng = Rng::new(0xCAFE_F00D_DEAD_BEEF);
    let mut vertices = Vec::with_capacity(count * 3);
    for _ in 0..count {
        let c = rng.vec3(extent);
        for _ in 0..3 {
            vertices.push(c + rng.vec3(0.5));
        }
    }
    let indices = (0..(count * 3) as u32).collect();
    (vertices, indices)
}

/// Height-field grid of `n * n` quads, the shape of typical level geometry.
fn gen_terrain(n: usize, cell: f32) -> (Vec<Vec3>, Vec<u32>) {
    let mut rng = Rng::new(0xBADC_F00D_1234_5678);
    let side = n + 1;
    let mut vertices = Vec::with_capacity(side * side);
    for z in 0..side {
        for x in 0..side {
            let h = rng.next_f32() * 0.5;
            vertices.push(Vec3::new(x as f32 * cell, h, z as f32 * cell));
        }
    }
    let mut indices = Vec::with_capacity(n * n * 6);
    for z in 0..n {
        for x in 0..n {
            let i = (z * side + x) as u32;
            let s = side as u32;
            indices.extend_from_slice(&[i, i + s, i + 1, i + 1, i + s, i + s + 1]);
        }
    }
    (vertices, indices)
}

fn gen_instances(registry: &Registry, blas: BlasHandle, count: usize, extent: f32) -> Tlas {
    let mut rng = Rng::new(0xC1A5_7E55_9999_ABCD);
    let mut tlas = Tlas::new();
    for _ in 0..count {
        let m = Mat4::from_translation(rng.vec3(extent));
        if let Some(bounds) = registry.instance_bounds(blas, &m) {
            tlas.add_instance(m, blas, bounds);
        }
    }
    tlas
}

fn bench_blas_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("blas_build");
    for &n in &[1_000usize, 10_000, 50_000] {
        let (vertices, indices) = gen_triangle_soup(n, 100.0);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_function(format!("soup_n{}", n), |b| {
            b.iter_batched(
                Registry::new,
                |mut reg| {
                    let h = reg.create_blas(&vertices, &indices, 0, 0);
                    black_box(h);
                },
                BatchSize::SmallInput,
            )
        });
    }
    let (vertices, indices) = gen_terrain(128, 1.0);
    group.bench_function("terrain_128", |b| {
        b.iter_batched(
            Registry::new,
            |mut reg| {
                let h = reg.create_blas(&vertices, &indices, 0, 0);
                black_box(h);
            },
            BatchSize::SmallInput,
        )
    });
    group.finish();
}

fn bench_blas_recreate(c: &mut Criterion) {
    let mut group = c.benchmark_group("blas_recreate");
    let (small_v, small_i) = gen_triangle_soup(500, 20.0);
    let (big_v, big_i) = gen_triangle_soup(20_000, 100.0);
    group.bench_function("first_of_32", |b| {
        b.iter_batched(
            || {
                let mut reg = Registry::new();
                for _ in 0..32 {
                    let _ = reg.create_blas(&big_v, &big_i, 0, 0);
                }
                reg
            },
            |mut reg| {
                let first = BlasHandle::from_raw(0);
                let _ = reg.recreate_blas(first, &small_v, &small_i, 0, 0);
                black_box(reg.next_root_index());
            },
            BatchSize::LargeInput,
        )
    });
    group.finish();
}

fn bench_tlas_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("tlas_build");
    let (vertices, indices) = gen_triangle_soup(64, 2.0);
    let mut reg = Registry::new();
    let blas = reg.create_blas(&vertices, &indices, 0, 0);
    for &n in &[64usize, 1_024, 8_192] {
        let tlas = gen_instances(&reg, blas, n, 500.0);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_function(format!("instances_n{}", n), |b| {
            b.iter_batched(
                || tlas.clone(),
                |mut t| {
                    t.build();
                    black_box(t.node_count());
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

fn bench_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("queries");
    let (vertices, indices) = gen_terrain(64, 1.0);
    let mut geometry = MeshBuffers::new();
    let mesh = geometry.push_mesh(&vertices, &indices);
    let mut reg = Registry::new();
    let blas = reg.create_blas(&vertices, &indices, mesh.base_vertex, mesh.base_index);
    let scene = reg.create_tlas();
    let mut rng = Rng::new(0xFACE_FEED_CAFE_BABE);
    let transforms: Vec<Mat4> = (0..256)
        .map(|_| Mat4::from_translation(rng.vec3(400.0)))
        .collect();
    for m in &transforms {
        if let Some(bounds) = reg.instance_bounds(blas, m) {
            if let Some(t) = reg.tlas_mut(scene) {
                t.add_instance(*m, blas, bounds);
            }
        }
    }
    if let Some(t) = reg.tlas_mut(scene) {
        t.build();
    }

    let rays: Vec<(Vec3, Vec3)> = (0..1_024)
        .map(|_| {
            let origin = rng.vec3(450.0);
            let target = transforms[(rng.next_u64() % 256) as usize].transform_point3(Vec3::new(
                32.0, 0.0, 32.0,
            ));
            (origin, target - origin)
        })
        .collect();

    group.throughput(Throughput::Elements(rays.len() as u64));
    group.bench_function("line_of_sight_1024", |b| {
        b.iter(|| {
            let blocked = rays
                .iter()
                .filter(|(o, d)| reg.line_of_sight(&geometry, *o, *d, d.length()))
                .count();
            black_box(blocked);
        })
    });
    group.bench_function("cast_ray_closest_1024", |b| {
        b.iter(|| {
            let hits = rays
                .iter()
                .filter_map(|(o, d)| {
                    reg.cast_ray(&geometry, *o, *d, d.length() + 10.0, RayFlags::empty())
                })
                .count();
            black_box(hits);
        })
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_blas_build,
    bench_blas_recreate,
    bench_tlas_build,
    bench_queries
);
criterion_main!(benches);
