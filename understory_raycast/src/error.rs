// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types for structure construction.
//!
//! Nothing here is fatal: the registry logs these and degrades to a no-op, and
//! queries never fail (absent structures simply report no hit).

use crate::registry::{BlasHandle, TlasHandle};

/// Why a bottom-level build was rejected.
#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq)]
pub enum BuildError {
    /// The mesh has no indices.
    #[error("attempted to build a BLAS from a mesh with no indices")]
    EmptyIndices,
    /// The index list is not a triangle list.
    #[error("index count {len} is not a multiple of 3")]
    IndexCountNotTriangles {
        /// Number of indices supplied.
        len: usize,
    },
    /// An index refers past the end of the vertex array.
    #[error("index {index} is out of range for {vertex_count} vertices")]
    VertexOutOfRange {
        /// Offending index value.
        index: u32,
        /// Number of vertices supplied.
        vertex_count: usize,
    },
}

/// Errors reported by [`Registry`](crate::Registry) operations that take a handle.
#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq)]
pub enum RegistryError {
    /// The BLAS handle was never issued by this registry (or it was cleaned up).
    #[error("unknown BLAS handle {0:?}")]
    UnknownBlas(BlasHandle),
    /// The BLAS has no nodes (its build was rejected), so it cannot be instanced.
    #[error("BLAS {0:?} is empty and cannot be instanced")]
    EmptyBlas(BlasHandle),
    /// The TLAS handle is stale or was never issued.
    #[error("unknown TLAS handle {0:?}")]
    UnknownTlas(TlasHandle),
    /// The rebuild input was rejected; the previous structure is kept.
    #[error(transparent)]
    Build(#[from] BuildError),
}
