// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Top-level structure: a median-split BVH over per-instance world boxes.

use alloc::vec;
use alloc::vec::Vec;
use glam::Mat4;

use crate::node::{BvhNode, BvhStats};
use crate::registry::BlasHandle;
use crate::types::{Aabb3, to_u32};

/// BVH over instances, each a world transform plus a reference to one [`Blas`](crate::Blas).
///
/// Per-instance data lives in parallel arrays indexed by creation order. Leaves reference
/// runs of [`sorted_instances`](Self::sorted_instances), the instance permutation produced
/// by the build. Built from scratch by [`build`](Self::build), typically once per frame.
#[derive(Clone, Debug, Default)]
pub struct Tlas {
    nodes: Vec<BvhNode>,
    world_transforms: Vec<Mat4>,
    inverse_transforms: Vec<Mat4>,
    blas_handles: Vec<BlasHandle>,
    instance_aabbs: Vec<Aabb3>,
    sorted_instances: Vec<u32>,
    max_depth: u32,
}

impl Tlas {
    /// Create an empty TLAS.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an instance and return its creation-order index.
    ///
    /// `world_aabb` must bound the referenced BLAS under `world_transform`; see
    /// [`Registry::instance_bounds`](crate::Registry::instance_bounds). The tree is not
    /// updated until the next [`build`](Self::build).
    pub fn add_instance(&mut self, world_transform: Mat4, blas: BlasHandle, world_aabb: Aabb3) -> u32 {
        let index = to_u32(self.world_transforms.len());
        if world_transform.determinant() == 0.0 {
            log::warn!("TLAS instance {index} has a singular transform; rays will not hit it");
        }
        self.world_transforms.push(world_transform);
        self.inverse_transforms.push(world_transform.inverse());
        self.blas_handles.push(blas);
        self.instance_aabbs.push(world_aabb);
        self.sorted_instances.push(index);
        index
    }

    /// Drop all instances and the tree.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.world_transforms.clear();
        self.inverse_transforms.clear();
        self.blas_handles.clear();
        self.instance_aabbs.clear();
        self.sorted_instances.clear();
        self.max_depth = 0;
    }

    /// Build the tree over all instances added so far, replacing any previous tree.
    ///
    /// Each node is split at the median of its instances' box centers along the node's
    /// longest axis, until every leaf holds one instance. No-op without instances.
    pub fn build(&mut self) {
        let count = self.instance_aabbs.len();
        if count == 0 {
            return;
        }
        // Start from creation order so rebuilding unchanged input gives the same tree.
        for (i, slot) in self.sorted_instances.iter_mut().enumerate() {
            *slot = to_u32(i);
        }
        self.nodes.clear();
        self.nodes.reserve(2 * count);

        let mut root = BvhNode::leaf(0, to_u32(count));
        root.set_bounds(self.range_bounds(0, count));
        self.nodes.push(root);

        let mut work = vec![(0_usize, 1_u32)];
        let mut max_depth = 1;
        while let Some((node_idx, depth)) = work.pop() {
            max_depth = max_depth.max(depth);
            if let Some(left) = self.subdivide(node_idx) {
                work.push((left + 1, depth + 1));
                work.push((left, depth + 1));
            }
        }
        self.nodes.shrink_to_fit();
        self.max_depth = max_depth;
        log::debug!(
            "built TLAS: {} instances, {} nodes, depth {}",
            count,
            self.nodes.len(),
            max_depth
        );
    }

    fn range_bounds(&self, first: usize, count: usize) -> Aabb3 {
        let mut out = Aabb3::EMPTY;
        for &i in &self.sorted_instances[first..first + count] {
            out.grow_aabb(&self.instance_aabbs[i as usize]);
        }
        out
    }

    /// Median split along the longest axis. Returns the left child's index, or `None`
    /// when the node stays a leaf (a single instance).
    fn subdivide(&mut self, node_idx: usize) -> Option<usize> {
        let node = self.nodes[node_idx];
        let first = node.left_first as usize;
        let count = node.instance_count as usize;
        let axis = node.bounds().longest_axis();

        let aabbs = &self.instance_aabbs;
        self.sorted_instances[first..first + count].sort_by(|&a, &b| {
            let ca = aabbs[a as usize].center()[axis];
            let cb = aabbs[b as usize].center()[axis];
            ca.total_cmp(&cb)
        });

        let left_count = count / 2;
        let right_count = count - left_count;
        if left_count == 0 || right_count == 0 {
            return None;
        }

        let left = self.nodes.len();
        let mut left_node = BvhNode::leaf(to_u32(first), to_u32(left_count));
        left_node.set_bounds(self.range_bounds(first, left_count));
        let mut right_node = BvhNode::leaf(to_u32(first + left_count), to_u32(right_count));
        right_node.set_bounds(self.range_bounds(first + left_count, right_count));
        self.nodes.push(left_node);
        self.nodes.push(right_node);
        self.nodes[node_idx].make_interior(to_u32(left));
        Some(left)
    }

    /// Node array from the last build; node 0 is the root.
    pub fn nodes(&self) -> &[BvhNode] {
        &self.nodes
    }

    /// Number of nodes from the last build.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of instances added.
    pub fn instance_count(&self) -> usize {
        self.instance_aabbs.len()
    }

    /// Instance permutation referenced by leaf ranges.
    pub fn sorted_instances(&self) -> &[u32] {
        &self.sorted_instances
    }

    /// World transform of instance `index` (creation order).
    pub fn world_transform(&self, index: u32) -> Option<Mat4> {
        self.world_transforms.get(index as usize).copied()
    }

    /// Inverse world transform of instance `index`, cached at insertion.
    pub fn inverse_world_transform(&self, index: u32) -> Option<Mat4> {
        self.inverse_transforms.get(index as usize).copied()
    }

    /// BLAS referenced by instance `index`.
    pub fn blas_handle(&self, index: u32) -> Option<BlasHandle> {
        self.blas_handles.get(index as usize).copied()
    }

    /// World box of instance `index`.
    pub fn instance_aabb(&self, index: u32) -> Option<Aabb3> {
        self.instance_aabbs.get(index as usize).copied()
    }

    /// World box of the whole tree; empty before the first build.
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
}
