// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Boundary to the externally-owned vertex and index storage.
//!
//! Bottom-level structures are built from one mesh's local vertex and index arrays, but
//! traversal resolves triangles through the shared global buffers that the rest of an
//! engine (for example a renderer) also draws from. [`GeometrySource`] is that lookup;
//! [`MeshBuffers`] is a minimal implementation that packs meshes back to back.

use alloc::vec::Vec;
use glam::Vec3;

use crate::types::to_u32;

/// A vertex record that exposes at least a 3D position.
pub trait Vertex {
    /// Object-space position.
    fn position(&self) -> Vec3;
}

impl Vertex for Vec3 {
    #[inline]
    fn position(&self) -> Vec3 {
        *self
    }
}

impl Vertex for [f32; 3] {
    #[inline]
    fn position(&self) -> Vec3 {
        Vec3::from_array(*self)
    }
}

/// Read access to global vertex positions and triangle-list indices.
pub trait GeometrySource {
    /// Position of the vertex at absolute index `vertex`, if it exists.
    fn vertex_position(&self, vertex: u32) -> Option<Vec3>;

    /// Entry `index` of the global index buffer, if it exists.
    fn index(&self, index: u32) -> Option<u32>;

    /// Positions of triangle `triangle` of the mesh placed at `base_vertex`/`base_index`.
    ///
    /// Index entries are local to the mesh, so each one is offset by `base_vertex`.
    /// Returns `None` when any lookup falls outside the buffers.
    fn triangle(&self, base_vertex: u32, base_index: u32, triangle: u32) -> Option<[Vec3; 3]> {
        let first = base_index.checked_add(triangle.checked_mul(3)?)?;
        let mut out = [Vec3::ZERO; 3];
        for (k, slot) in out.iter_mut().enumerate() {
            let local = self.index(first.checked_add(to_u32(k))?)?;
            *slot = self.vertex_position(base_vertex.checked_add(local)?)?;
        }
        Some(out)
    }
}

impl<G: GeometrySource + ?Sized> GeometrySource for &G {
    fn vertex_position(&self, vertex: u32) -> Option<Vec3> {
        (**self).vertex_position(vertex)
    }

    fn index(&self, index: u32) -> Option<u32> {
        (**self).index(index)
    }
}

/// Placement of one mesh inside a [`MeshBuffers`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct MeshRange {
    /// Offset of the mesh's first vertex in the global vertex buffer.
    pub base_vertex: u32,
    /// Offset of the mesh's first index in the global index buffer.
    pub base_index: u32,
    /// Number of vertices the mesh contributed.
    pub vertex_count: u32,
    /// Number of indices the mesh contributed.
    pub index_count: u32,
}

/// Global vertex and index buffers with meshes appended back to back.
///
/// Indices are stored mesh-local, exactly as pushed.
#[derive(Clone, Debug)]
pub struct MeshBuffers<V = Vec3> {
    vertices: Vec<V>,
    indices: Vec<u32>,
}

impl<V> Default for MeshBuffers<V> {
    fn default() -> Self {
        Self {
            vertices: Vec::new(),
            indices: Vec::new(),
        }
    }
}

impl<V: Vertex + Clone> MeshBuffers<V> {
    /// Create empty buffers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a mesh and return where it landed.
    pub fn push_mesh(&mut self, vertices: &[V], indices: &[u32]) -> MeshRange {
        let range = MeshRange {
            base_vertex: to_u32(self.vertices.len()),
            base_index: to_u32(self.indices.len()),
            vertex_count: to_u32(vertices.len()),
            index_count: to_u32(indices.len()),
        };
        self.vertices.extend_from_slice(vertices);
        self.indices.extend_from_slice(indices);
        range
    }

    /// Replace the contents of a previously pushed mesh in place.
    ///
    /// The new data must have the same vertex and index counts; returns `false`
    /// (and changes nothing) otherwise.
    pub fn overwrite_mesh(&mut self, range: MeshRange, vertices: &[V], indices: &[u32]) -> bool {
        let vb = range.base_vertex as usize;
        let ib = range.base_index as usize;
        let (Some(vdst), Some(idst)) = (
            self.vertices.get_mut(vb..vb + range.vertex_count as usize),
            self.indices.get_mut(ib..ib + range.index_count as usize),
        ) else {
            return false;
        };
        if vdst.len() != vertices.len() || idst.len() != indices.len() {
            return false;
        }
        vdst.clone_from_slice(vertices);
        idst.copy_from_slice(indices);
        true
    }

    /// All vertices.
    pub fn vertices(&self) -> &[V] {
        &self.vertices
    }

    /// All indices (mesh-local values).
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Remove every mesh.
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.indices.clear();
    }
}

impl<V: Vertex> GeometrySource for MeshBuffers<V> {
    #[inline]
    fn vertex_position(&self, vertex: u32) -> Option<Vec3> {
        self.vertices.get(vertex as usize).map(Vertex::position)
    }

    #[inline]
    fn index(&self, index: u32) -> Option<u32> {
        self.indices.get(index as usize).copied()
    }
}
