// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Packed BVH node shared by both hierarchy levels.

use alloc::vec;
use glam::Vec3;

use crate::types::{Aabb3, to_u32};

/// A flat-array BVH node.
///
/// The layout is the same for bottom- and top-level trees. `left_first` is dual-purpose:
/// for a leaf (`instance_count > 0`) it is the first entry of the owning level's index
/// array and `instance_count` is the run length; for an interior node
/// (`instance_count == 0`) it is the index of the left child, and the right child is
/// always `left_first + 1`. Use [`BvhNode::kind`] for a tagged view.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct BvhNode {
    /// Minimum corner of the node bounds.
    pub aabb_min: Vec3,
    /// Maximum corner of the node bounds.
    pub aabb_max: Vec3,
    /// First index-array entry (leaf) or left child index (interior).
    pub left_first: u32,
    /// Number of primitives; zero marks an interior node.
    pub instance_count: u32,
}

/// Tagged view of a [`BvhNode`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Node holding `count` primitives starting at `first`.
    Leaf {
        /// First entry in the level's index array.
        first: u32,
        /// Number of entries.
        count: u32,
    },
    /// Node with two children.
    Interior {
        /// Left child.
        left: u32,
        /// Right child, always `left + 1`.
        right: u32,
    },
}

impl BvhNode {
    /// Leaf over `count` index-array entries starting at `first`.
    pub(crate) fn leaf(first: u32, count: u32) -> Self {
        Self {
            aabb_min: Vec3::ZERO,
            aabb_max: Vec3::ZERO,
            left_first: first,
            instance_count: count,
        }
    }

    /// Whether the node holds primitives directly.
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.instance_count > 0
    }

    /// Leaf or interior view derived from `instance_count`.
    #[inline]
    pub fn kind(&self) -> NodeKind {
        if self.is_leaf() {
            NodeKind::Leaf {
                first: self.left_first,
                count: self.instance_count,
            }
        } else {
            NodeKind::Interior {
                left: self.left_first,
                right: self.left_first + 1,
            }
        }
    }

    /// Node bounds.
    #[inline]
    pub fn bounds(&self) -> Aabb3 {
        Aabb3::new(self.aabb_min, self.aabb_max)
    }

    #[inline]
    pub(crate) fn set_bounds(&mut self, bounds: Aabb3) {
        self.aabb_min = bounds.min;
        self.aabb_max = bounds.max;
    }

    /// Turn a leaf into an interior node whose children start at `left`.
    #[inline]
    pub(crate) fn make_interior(&mut self, left: u32) {
        self.left_first = left;
        self.instance_count = 0;
    }
}

/// Shape summary of a built tree.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct BvhStats {
    /// Nodes in the array.
    pub nodes: u32,
    /// Leaf nodes reachable from the root.
    pub leaves: u32,
    /// Nodes on the longest root-to-leaf path (root alone is 1; empty tree is 0).
    pub max_depth: u32,
    /// Largest leaf run length.
    pub max_leaf_size: u32,
}

impl BvhStats {
    /// Walk a tree rooted at node 0 of `nodes`.
    ///
    /// Builders always place children after their parent. Child links that point
    /// backwards or outside `nodes`, and nodes reached a second time, are ignored, so
    /// malformed input still terminates.
    pub fn of(nodes: &[BvhNode]) -> Self {
        let mut stats = Self {
            nodes: to_u32(nodes.len()),
            ..Self::default()
        };
        if nodes.is_empty() {
            return stats;
        }
        let mut visited = vec![false; nodes.len()];
        let mut stack = vec![(0_usize, 1_u32)];
        while let Some((i, depth)) = stack.pop() {
            let (Some(node), Some(seen)) = (nodes.get(i), visited.get_mut(i)) else {
                continue;
            };
            if *seen {
                continue;
            }
            *seen = true;
            stats.max_depth = stats.max_depth.max(depth);
            match node.kind() {
                NodeKind::Leaf { count, .. } => {
                    stats.leaves += 1;
                    stats.max_leaf_size = stats.max_leaf_size.max(count);
                }
                NodeKind::Interior { left, right } => {
                    if left as usize > i {
                        stack.push((left as usize, depth + 1));
                        stack.push((right as usize, depth + 1));
                    }
                }
            }
        }
        stats
    }
}
