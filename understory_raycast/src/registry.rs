// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Registry owning every BLAS and TLAS, and the two global BLAS buffers.
//!
//! All bottom-level node arrays are concatenated into one global node buffer and all
//! triangle-index permutations into one global triangle-index buffer, in handle order.
//! Each [`Blas`] records its slice of both as an offset (`root_index`,
//! `base_triangle_index`) plus its own length, so traversal needs no per-tree lookup
//! beyond the handle.

use alloc::vec::Vec;
use glam::Mat4;

use crate::blas::Blas;
use crate::config::Config;
use crate::error::RegistryError;
use crate::geometry::Vertex;
use crate::node::BvhNode;
use crate::tlas::Tlas;
use crate::types::{Aabb3, to_u32};

/// Handle to a BLAS: its position in the registry's BLAS list.
///
/// Stable across [`Registry::recreate_blas`]; invalidated by [`Registry::clean_up`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlasHandle(u32);

impl BlasHandle {
    /// Wrap a raw BLAS list position.
    pub const fn from_raw(index: u32) -> Self {
        Self(index)
    }

    /// Raw BLAS list position.
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Generational handle to a TLAS slot.
///
/// Destroyed slots are reused with a bumped generation, so a stale handle never refers
/// to a newer TLAS.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct TlasHandle(u32, u32);

impl TlasHandle {
    const fn new(idx: usize, generation: u32) -> Self {
        Self(to_u32(idx), generation)
    }

    const fn idx(self) -> usize {
        self.0 as usize
    }
}

/// Query-time view of one TLAS instance and the BLAS it references.
///
/// Derived on demand; not stored.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BlasInstance {
    /// Creation-order index of the instance within its TLAS.
    pub instance: u32,
    /// The referenced BLAS.
    pub blas: BlasHandle,
    /// World-to-object transform.
    pub inverse_world_transform: Mat4,
    /// Offset of the BLAS root in the global node buffer.
    pub root_index: u32,
    /// Number of BLAS nodes in the global node buffer.
    pub node_count: u32,
    /// Nodes on the BLAS's longest root-to-leaf path.
    pub max_depth: u32,
    /// Offset of the BLAS permutation in the global triangle-index buffer.
    pub base_triangle_index: u32,
    /// Offset of the source mesh in the global vertex buffer.
    pub mesh_base_vertex: u32,
    /// Offset of the source mesh in the global index buffer.
    pub mesh_base_index: u32,
}

/// Owner of all acceleration structures.
///
/// Single-threaded by construction: builds take `&mut self` and queries `&self`, so a
/// query can never observe a half-spliced buffer.
#[derive(Debug, Default)]
pub struct Registry {
    config: Config,
    blases: Vec<Blas>,
    tlases: Vec<Option<Tlas>>,
    tlas_generations: Vec<u32>,
    free_tlases: Vec<usize>,
    blas_nodes: Vec<BvhNode>,
    triangle_indices: Vec<u32>,
}

impl Registry {
    /// Create an empty registry with default tunables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty registry with the given tunables.
    pub fn with_config(config: Config) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Active tunables.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Build a BLAS, append it to the global buffers, and return its handle.
    ///
    /// Degenerate input is logged and produces an empty BLAS (no nodes, no bounds) that
    /// still occupies a handle; do not instance it.
    pub fn create_blas<V: Vertex>(
        &mut self,
        vertices: &[V],
        indices: &[u32],
        base_vertex: u32,
        base_index: u32,
    ) -> BlasHandle {
        let handle = BlasHandle(to_u32(self.blases.len()));
        let mut blas = match Blas::build(vertices, indices, base_vertex, base_index, &self.config) {
            Ok(blas) => blas,
            Err(err) => {
                log::warn!("create_blas {handle:?}: {err}");
                Blas::empty(base_vertex, base_index)
            }
        };
        blas.root_index = self.next_root_index();
        blas.base_triangle_index = self.next_base_triangle_index();
        self.blas_nodes.extend_from_slice(blas.nodes());
        self.triangle_indices.extend_from_slice(blas.triangle_indices());
        self.blases.push(blas);
        handle
    }

    /// Rebuild an existing BLAS from new geometry, keeping its handle.
    ///
    /// The old contribution is spliced out of both global buffers and the new one spliced
    /// in at the same position; every BLAS after it has its offsets re-derived. On error
    /// nothing changes.
    pub fn recreate_blas<V: Vertex>(
        &mut self,
        handle: BlasHandle,
        vertices: &[V],
        indices: &[u32],
        base_vertex: u32,
        base_index: u32,
    ) -> Result<(), RegistryError> {
        let Some(old) = self.blases.get(handle.index()) else {
            log::warn!("recreate_blas: unknown handle {handle:?}");
            return Err(RegistryError::UnknownBlas(handle));
        };
        let next = Blas::build(vertices, indices, base_vertex, base_index, &self.config)
            .inspect_err(|err| log::warn!("recreate_blas {handle:?}: {err}"))?;

        let root = old.root_index as usize;
        let base = old.base_triangle_index as usize;
        let old_nodes = old.node_count();
        let old_tris = old.triangle_indices().len();
        self.blas_nodes
            .splice(root..root + old_nodes, next.nodes().iter().copied());
        self.triangle_indices
            .splice(base..base + old_tris, next.triangle_indices().iter().copied());

        self.blases[handle.index()] = next;
        self.rebase_from(handle.index());
        Ok(())
    }

    /// Re-derive `root_index`/`base_triangle_index` for `blases[start..]` from running totals.
    fn rebase_from(&mut self, start: usize) {
        let (mut root, mut base) = match start.checked_sub(1).and_then(|i| self.blases.get(i)) {
            Some(prev) => (
                prev.root_index + to_u32(prev.node_count()),
                prev.base_triangle_index + to_u32(prev.triangle_indices().len()),
            ),
            None => (0, 0),
        };
        for blas in &mut self.blases[start..] {
            blas.root_index = root;
            blas.base_triangle_index = base;
            root += to_u32(blas.node_count());
            base += to_u32(blas.triangle_indices().len());
        }
        debug_assert_eq!(root as usize, self.blas_nodes.len(), "node buffer out of sync");
        debug_assert_eq!(
            base as usize,
            self.triangle_indices.len(),
            "triangle-index buffer out of sync"
        );
    }

    /// Look up a BLAS.
    pub fn blas(&self, handle: BlasHandle) -> Option<&Blas> {
        self.blases.get(handle.index())
    }

    /// Number of BLASes created since the last clean-up.
    pub fn blas_count(&self) -> usize {
        self.blases.len()
    }

    /// Offset the next created BLAS will get in the global node buffer.
    pub fn next_root_index(&self) -> u32 {
        to_u32(self.blas_nodes.len())
    }

    /// Offset the next created BLAS will get in the global triangle-index buffer.
    pub fn next_base_triangle_index(&self) -> u32 {
        to_u32(self.triangle_indices.len())
    }

    /// Concatenated BLAS nodes, in handle order.
    pub fn blas_nodes(&self) -> &[BvhNode] {
        &self.blas_nodes
    }

    /// Concatenated BLAS triangle-index permutations, in handle order.
    pub fn triangle_indices(&self) -> &[u32] {
        &self.triangle_indices
    }

    /// World box of `blas` placed with `transform`; `None` if unknown or empty.
    pub fn instance_bounds(&self, blas: BlasHandle, transform: &Mat4) -> Option<Aabb3> {
        let blas = self.blas(blas)?;
        if blas.is_empty() {
            return None;
        }
        Some(blas.bounds().transformed(transform))
    }

    /// Create an empty TLAS and return its handle.
    pub fn create_tlas(&mut self) -> TlasHandle {
        let tlas = Some(Tlas::new());
        if let Some(idx) = self.free_tlases.pop() {
            self.tlas_generations[idx] += 1;
            self.tlases[idx] = tlas;
            TlasHandle::new(idx, self.tlas_generations[idx])
        } else {
            self.tlases.push(tlas);
            self.tlas_generations.push(1);
            TlasHandle::new(self.tlases.len() - 1, 1)
        }
    }

    /// Destroy a TLAS. Returns `false` if the handle was stale or unknown.
    pub fn destroy_tlas(&mut self, handle: TlasHandle) -> bool {
        if self.tlas(handle).is_none() {
            return false;
        }
        self.tlases[handle.idx()] = None;
        self.free_tlases.push(handle.idx());
        true
    }

    /// Look up a live TLAS.
    pub fn tlas(&self, handle: TlasHandle) -> Option<&Tlas> {
        if self.tlas_generations.get(handle.idx()) != Some(&handle.1) {
            return None;
        }
        self.tlases.get(handle.idx())?.as_ref()
    }

    /// Look up a live TLAS mutably (to add instances and rebuild).
    pub fn tlas_mut(&mut self, handle: TlasHandle) -> Option<&mut Tlas> {
        if self.tlas_generations.get(handle.idx()) != Some(&handle.1) {
            return None;
        }
        self.tlases.get_mut(handle.idx())?.as_mut()
    }

    /// Place `blas` into `tlas` with `transform`, deriving its world box.
    ///
    /// Returns the instance's creation-order index. The tree is not updated until
    /// [`build_tlas`](Self::build_tlas).
    pub fn add_instance(
        &mut self,
        tlas: TlasHandle,
        blas: BlasHandle,
        transform: Mat4,
    ) -> Result<u32, RegistryError> {
        let Some(source) = self.blas(blas) else {
            log::warn!("add_instance: unknown BLAS {blas:?}");
            return Err(RegistryError::UnknownBlas(blas));
        };
        if source.is_empty() {
            log::warn!("add_instance: BLAS {blas:?} is empty");
            return Err(RegistryError::EmptyBlas(blas));
        }
        let bounds = source.bounds().transformed(&transform);
        let Some(target) = self.tlas_mut(tlas) else {
            log::warn!("add_instance: unknown TLAS {tlas:?}");
            return Err(RegistryError::UnknownTlas(tlas));
        };
        Ok(target.add_instance(transform, blas, bounds))
    }

    /// Rebuild `tlas` over its current instances.
    pub fn build_tlas(&mut self, tlas: TlasHandle) -> Result<(), RegistryError> {
        let Some(target) = self.tlas_mut(tlas) else {
            log::warn!("build_tlas: unknown TLAS {tlas:?}");
            return Err(RegistryError::UnknownTlas(tlas));
        };
        target.build();
        Ok(())
    }

    /// Handle of the scene TLAS (slot 0) if it is live.
    pub fn scene_tlas(&self) -> Option<TlasHandle> {
        self.tlases.first()?.as_ref()?;
        Some(TlasHandle::new(0, *self.tlas_generations.first()?))
    }

    /// Query view of `tlas`'s instance at `sorted_instances()[slot]`.
    pub(crate) fn blas_instance(&self, tlas: &Tlas, slot: u32) -> Option<BlasInstance> {
        let instance = *tlas.sorted_instances().get(slot as usize)?;
        let handle = tlas.blas_handle(instance)?;
        let blas = self.blas(handle)?;
        Some(BlasInstance {
            instance,
            blas: handle,
            inverse_world_transform: tlas.inverse_world_transform(instance)?,
            root_index: blas.root_index(),
            node_count: to_u32(blas.node_count()),
            max_depth: blas.max_depth(),
            base_triangle_index: blas.base_triangle_index(),
            mesh_base_vertex: blas.mesh_base_vertex(),
            mesh_base_index: blas.mesh_base_index(),
        })
    }

    /// Query views of every instance of a TLAS, in sorted (leaf) order.
    ///
    /// Instances whose BLAS handle is unknown are skipped. Empty for an unknown TLAS.
    pub fn blas_instances(&self, tlas: TlasHandle) -> Vec<BlasInstance> {
        let Some(t) = self.tlas(tlas) else {
            return Vec::new();
        };
        (0..to_u32(t.sorted_instances().len()))
            .filter_map(|slot| self.blas_instance(t, slot))
            .collect()
    }

    /// Release every BLAS and TLAS and reset the global buffers (level unload).
    ///
    /// TLAS slot generations survive, so handles from before the unload stay stale.
    /// Slot 0 is handed out first again and becomes the next scene TLAS.
    pub fn clean_up(&mut self) {
        self.blases.clear();
        self.tlases.fill(None);
        self.free_tlases.clear();
        self.free_tlases.extend((0..self.tlases.len()).rev());
        self.blas_nodes.clear();
        self.triangle_indices.clear();
    }
}
