// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Primitive geometry types and helpers.

use glam::{Mat4, Vec3};

/// Axis-aligned bounding box in 3D.
///
/// A box that has never been grown is [`Aabb3::EMPTY`] (`min = +∞`, `max = −∞`).
/// `EMPTY` is the identity for [`grow`](Self::grow) and [`grow_aabb`](Self::grow_aabb):
/// growing it by a point yields a degenerate box at that point, and growing it by a
/// box yields exactly that box.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb3 {
    /// Minimum corner.
    pub min: Vec3,
    /// Maximum corner.
    pub max: Vec3,
}

impl Default for Aabb3 {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl Aabb3 {
    /// The empty box.
    pub const EMPTY: Self = Self {
        min: Vec3::INFINITY,
        max: Vec3::NEG_INFINITY,
    };

    /// Create a new AABB from min/max corners.
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Smallest box containing every point of `points`. Empty input yields [`Aabb3::EMPTY`].
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Self {
        let mut out = Self::EMPTY;
        for p in points {
            out.grow(p);
        }
        out
    }

    /// Grow the box to include a point.
    #[inline]
    pub fn grow(&mut self, p: Vec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    /// Grow the box to include another box. Growing by an empty box is a no-op.
    #[inline]
    pub fn grow_aabb(&mut self, other: &Self) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    /// The union of two boxes.
    #[inline]
    pub fn union(mut self, other: &Self) -> Self {
        self.grow_aabb(other);
        self
    }

    /// Return true if the box has never been grown or is inverted on some axis. Assumes no NaN.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.max.cmplt(self.min).any()
    }

    /// Size along each axis; zero for an empty box.
    #[inline]
    pub fn extent(&self) -> Vec3 {
        if self.is_empty() {
            Vec3::ZERO
        } else {
            self.max - self.min
        }
    }

    /// Center point.
    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Half the surface area (`ex*ey + ey*ez + ez*ex`), the SAH cost weight.
    ///
    /// Empty boxes have zero area.
    #[inline]
    pub fn area(&self) -> f32 {
        let e = self.extent();
        e.x * e.y + e.y * e.z + e.z * e.x
    }

    /// Axis with the largest extent. Ties prefer the lower axis.
    pub fn longest_axis(&self) -> usize {
        let e = self.extent();
        let mut axis = 0;
        if e.y > e.x {
            axis = 1;
        }
        if e.z > e[axis] {
            axis = 2;
        }
        axis
    }

    /// Whether this box contains the point (boundary inclusive).
    pub fn contains_point(&self, p: Vec3) -> bool {
        self.min.cmple(p).all() && p.cmple(self.max).all()
    }

    /// Whether this box fully contains `other`. Every box contains the empty box.
    pub fn contains_aabb(&self, other: &Self) -> bool {
        other.is_empty() || (self.contains_point(other.min) && self.contains_point(other.max))
    }

    /// Conservative world box of this box under `transform`: the bounds of its eight
    /// transformed corners.
    pub fn transformed(&self, transform: &Mat4) -> Self {
        if self.is_empty() {
            return Self::EMPTY;
        }
        let mut out = Self::EMPTY;
        for i in 0..8 {
            let corner = Vec3::new(
                if i & 1 == 0 { self.min.x } else { self.max.x },
                if i & 2 == 0 { self.min.y } else { self.max.y },
                if i & 4 == 0 { self.min.z } else { self.max.z },
            );
            out.grow(transform.transform_point3(corner));
        }
        out
    }
}

/// A triangle with its cached centroid and bounds.
///
/// Derived data is computed once in [`Triangle::new`]; the record is immutable afterwards.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Triangle {
    v0: Vec3,
    v1: Vec3,
    v2: Vec3,
    centroid: Vec3,
    bounds: Aabb3,
}

impl Triangle {
    /// Create a triangle from its three vertex positions.
    pub fn new(v0: Vec3, v1: Vec3, v2: Vec3) -> Self {
        Self {
            v0,
            v1,
            v2,
            centroid: (v0 + v1 + v2) / 3.0,
            bounds: Aabb3::new(v0.min(v1).min(v2), v0.max(v1).max(v2)),
        }
    }

    /// The three vertex positions.
    pub fn vertices(&self) -> [Vec3; 3] {
        [self.v0, self.v1, self.v2]
    }

    /// Arithmetic mean of the vertices.
    pub fn centroid(&self) -> Vec3 {
        self.centroid
    }

    /// Componentwise min/max of the vertices.
    pub fn bounds(&self) -> Aabb3 {
        self.bounds
    }

    /// Geometric (unnormalized) normal, counter-clockwise winding.
    pub fn normal(&self) -> Vec3 {
        (self.v1 - self.v0).cross(self.v2 - self.v0)
    }
}

/// Convert a buffer length or offset to the 32-bit form stored in nodes and handles.
#[allow(
    clippy::cast_possible_truncation,
    reason = "Node and triangle offsets are 32-bit like the packed node layout; buffers beyond u32::MAX are unsupported."
)]
pub(crate) const fn to_u32(n: usize) -> u32 {
    n as u32
}
