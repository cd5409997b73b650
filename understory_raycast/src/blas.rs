// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Bottom-level structure: a binned-SAH BVH over one mesh's triangles.

use alloc::vec;
use alloc::vec::Vec;

use crate::config::Config;
use crate::error::BuildError;
use crate::geometry::Vertex;
use crate::node::{BvhNode, BvhStats};
use crate::types::{Aabb3, Triangle, to_u32};

/// BVH over the triangles of a single mesh.
///
/// Leaves reference contiguous runs of `triangle_indices`, a permutation of
/// `0..triangle_count` that maps back into the triangle array, so partitioning never
/// moves triangles. Interior child links and leaf ranges are local to this structure;
/// [`root_index`](Self::root_index) and [`base_triangle_index`](Self::base_triangle_index)
/// place it inside the registry's global buffers.
#[derive(Clone, Debug, Default)]
pub struct Blas {
    triangles: Vec<Triangle>,
    nodes: Vec<BvhNode>,
    tri_indices: Vec<u32>,
    mesh_base_vertex: u32,
    mesh_base_index: u32,
    pub(crate) root_index: u32,
    pub(crate) base_triangle_index: u32,
    max_depth: u32,
}

impl Blas {
    /// Build a BLAS over the triangle list `indices` into `vertices`.
    ///
    /// `base_vertex` and `base_index` record where this mesh lives in the global
    /// vertex/index buffers used at query time.
    pub fn build<V: Vertex>(
        vertices: &[V],
        indices: &[u32],
        base_vertex: u32,
        base_index: u32,
        config: &Config,
    ) -> Result<Self, BuildError> {
        let triangles = triangles_from_mesh(vertices, indices)?;
        let mut blas = Self {
            triangles,
            mesh_base_vertex: base_vertex,
            mesh_base_index: base_index,
            ..Self::default()
        };
        blas.subdivide_all(config.bins());
        log::debug!(
            "built BLAS: {} triangles, {} nodes, depth {}",
            blas.triangles.len(),
            blas.nodes.len(),
            blas.max_depth
        );
        Ok(blas)
    }

    /// A BLAS with no triangles and no nodes.
    pub(crate) fn empty(base_vertex: u32, base_index: u32) -> Self {
        Self {
            mesh_base_vertex: base_vertex,
            mesh_base_index: base_index,
            ..Self::default()
        }
    }

    /// Rebuild in place from new geometry.
    ///
    /// On error the previous structure is kept untouched. Global-buffer offsets are
    /// preserved; the registry re-derives them after splicing.
    pub fn rebuild<V: Vertex>(
        &mut self,
        vertices: &[V],
        indices: &[u32],
        base_vertex: u32,
        base_index: u32,
        config: &Config,
    ) -> Result<(), BuildError> {
        let mut next = Self::build(vertices, indices, base_vertex, base_index, config)?;
        next.root_index = self.root_index;
        next.base_triangle_index = self.base_triangle_index;
        *self = next;
        Ok(())
    }

    /// Triangles in mesh order.
    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    /// Node array; node 0 is the root.
    pub fn nodes(&self) -> &[BvhNode] {
        &self.nodes
    }

    /// Permutation mapping leaf ranges to triangle numbers.
    pub fn triangle_indices(&self) -> &[u32] {
        &self.tri_indices
    }

    /// Number of triangles.
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// True when the build was rejected or never happened.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Offset of node 0 within the registry's global node buffer.
    pub fn root_index(&self) -> u32 {
        self.root_index
    }

    /// Offset of `triangle_indices()[0]` within the registry's global triangle-index buffer.
    pub fn base_triangle_index(&self) -> u32 {
        self.base_triangle_index
    }

    /// Offset of the source mesh in the global vertex buffer.
    pub fn mesh_base_vertex(&self) -> u32 {
        self.mesh_base_vertex
    }

    /// Offset of the source mesh in the global index buffer.
    pub fn mesh_base_index(&self) -> u32 {
        self.mesh_base_index
    }

    /// Object-space bounds of the whole mesh; empty when there are no nodes.
    pub fn bounds(&self) -> Aabb3 {
        self.nodes.first().map_or(Aabb3::EMPTY, BvhNode::bounds)
    }

    /// Nodes on the longest root-to-leaf path.
    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    /// Shape summary.
    pub fn stats(&self) -> BvhStats {
        BvhStats::of(&self.nodes)
    }

    fn subdivide_all(&mut self, bins: usize) {
        let count = self.triangles.len();
        self.tri_indices = (0..to_u32(count)).collect();
        self.nodes = Vec::with_capacity(2 * count);

        let mut root = BvhNode::leaf(0, to_u32(count));
        root.set_bounds(self.range_bounds(0, count));
        self.nodes.push(root);

        let mut sah = BinnedSah::new(bins);
        let mut work = vec![(0_usize, 1_u32)];
        let mut max_depth = 1;
        while let Some((node_idx, depth)) = work.pop() {
            max_depth = max_depth.max(depth);
            if let Some(left) = self.subdivide(node_idx, &mut sah) {
                // Right first so the left subtree is allocated before it, depth-first.
                work.push((left + 1, depth + 1));
                work.push((left, depth + 1));
            }
        }
        self.nodes.shrink_to_fit();
        self.max_depth = max_depth;
    }

    /// Bounds of the triangles in `tri_indices[first..first + count]`.
    fn range_bounds(&self, first: usize, count: usize) -> Aabb3 {
        let mut out = Aabb3::EMPTY;
        for &t in &self.tri_indices[first..first + count] {
            out.grow_aabb(&self.triangles[t as usize].bounds());
        }
        out
    }

    /// Split a leaf in two. Returns the left child's index, or `None` if the node stays a leaf.
    fn subdivide(&mut self, node_idx: usize, sah: &mut BinnedSah) -> Option<usize> {
        let node = self.nodes[node_idx];
        if node.instance_count <= 1 {
            return None;
        }
        let first = node.left_first as usize;
        let count = node.instance_count as usize;
        let split = sah.find_best_split(&self.triangles, &self.tri_indices[first..first + count])?;

        // In-place two-pointer partition: centroids left of the plane to the front.
        let mut i = first;
        let mut j = first + count;
        while i < j {
            let t = self.tri_indices[i] as usize;
            if self.triangles[t].centroid()[split.axis] < split.position {
                i += 1;
            } else {
                j -= 1;
                self.tri_indices.swap(i, j);
            }
        }

        // One empty side would recurse forever on the same range.
        let left_count = i - first;
        if left_count == 0 || left_count == count {
            return None;
        }

        let left = self.nodes.len();
        let mut left_node = BvhNode::leaf(to_u32(first), to_u32(left_count));
        left_node.set_bounds(self.range_bounds(first, left_count));
        let mut right_node = BvhNode::leaf(to_u32(i), to_u32(count - left_count));
        right_node.set_bounds(self.range_bounds(i, count - left_count));
        self.nodes.push(left_node);
        self.nodes.push(right_node);
        self.nodes[node_idx].make_interior(to_u32(left));
        Some(left)
    }
}

fn triangles_from_mesh<V: Vertex>(
    vertices: &[V],
    indices: &[u32],
) -> Result<Vec<Triangle>, BuildError> {
    if indices.is_empty() {
        return Err(BuildError::EmptyIndices);
    }
    if !indices.len().is_multiple_of(3) {
        return Err(BuildError::IndexCountNotTriangles { len: indices.len() });
    }
    let position = |index: u32| {
        vertices
            .get(index as usize)
            .map(Vertex::position)
            .ok_or(BuildError::VertexOutOfRange {
                index,
                vertex_count: vertices.len(),
            })
    };
    indices
        .chunks_exact(3)
        .map(|tri| {
            Ok(Triangle::new(
                position(tri[0])?,
                position(tri[1])?,
                position(tri[2])?,
            ))
        })
        .collect()
}

#[derive(Copy, Clone, Debug, Default)]
struct Bin {
    bounds: Aabb3,
    count: u32,
}

#[derive(Copy, Clone, Debug)]
struct Split {
    axis: usize,
    position: f32,
}

/// Scratch space for the binned split search, reused across nodes of one build.
#[derive(Debug)]
struct BinnedSah {
    bins: Vec<Bin>,
    left_area: Vec<f32>,
    left_count: Vec<u32>,
    right_area: Vec<f32>,
    right_count: Vec<u32>,
}

impl BinnedSah {
    fn new(bins: usize) -> Self {
        let planes = bins - 1;
        Self {
            bins: vec![Bin::default(); bins],
            left_area: vec![0.0; planes],
            left_count: vec![0; planes],
            right_area: vec![0.0; planes],
            right_count: vec![0; planes],
        }
    }

    /// Cheapest plane over all three axes, minimizing
    /// `left_count * left_area + right_count * right_area` at each internal bin boundary.
    ///
    /// Axes whose centroid bounds are degenerate are skipped; `None` if all are.
    fn find_best_split(&mut self, triangles: &[Triangle], range: &[u32]) -> Option<Split> {
        let n_bins = self.bins.len();
        let planes = n_bins - 1;
        let mut best: Option<(f32, Split)> = None;

        for axis in 0..3 {
            let mut lo = f32::INFINITY;
            let mut hi = f32::NEG_INFINITY;
            for &t in range {
                let c = triangles[t as usize].centroid()[axis];
                lo = lo.min(c);
                hi = hi.max(c);
            }
            if lo >= hi {
                continue;
            }

            self.bins.fill(Bin::default());
            let scale = n_bins as f32 / (hi - lo);
            for &t in range {
                let tri = &triangles[t as usize];
                let bin = &mut self.bins[bin_index(tri.centroid()[axis] - lo, scale, n_bins - 1)];
                bin.count += 1;
                bin.bounds.grow_aabb(&tri.bounds());
            }

            let mut left_box = Aabb3::EMPTY;
            let mut right_box = Aabb3::EMPTY;
            let mut left_sum = 0;
            let mut right_sum = 0;
            for i in 0..planes {
                left_sum += self.bins[i].count;
                left_box.grow_aabb(&self.bins[i].bounds);
                self.left_count[i] = left_sum;
                self.left_area[i] = left_box.area();

                let r = n_bins - 1 - i;
                right_sum += self.bins[r].count;
                right_box.grow_aabb(&self.bins[r].bounds);
                self.right_count[planes - 1 - i] = right_sum;
                self.right_area[planes - 1 - i] = right_box.area();
            }

            let step = (hi - lo) / n_bins as f32;
            for i in 0..planes {
                let cost = self.left_count[i] as f32 * self.left_area[i]
                    + self.right_count[i] as f32 * self.right_area[i];
                if best.as_ref().is_none_or(|(c, _)| cost < *c) {
                    let position = lo + step * (i + 1) as f32;
                    best = Some((cost, Split { axis, position }));
                }
            }
        }
        best.map(|(_, split)| split)
    }
}

#[allow(
    clippy::cast_possible_truncation,
    reason = "Offset is non-negative and scaled into [0, bins]; the result is clamped to the last bin."
)]
#[inline]
fn bin_index(offset: f32, scale: f32, last: usize) -> usize {
    ((offset * scale) as usize).min(last)
}
