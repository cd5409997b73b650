// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Build and query tunables.

/// Tunables shared by the builders and the traversal.
///
/// Held by [`Registry`](crate::Registry); see [`Registry::with_config`](crate::Registry::with_config).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Config {
    /// Bins per axis for the bottom-level SAH split search. Values below 2 are treated as 2.
    pub sah_bins: usize,
    /// Floor applied to `|direction component|` before taking its reciprocal for slab tests.
    pub inverse_epsilon: f32,
}

impl Config {
    /// Default SAH bin count.
    pub const DEFAULT_SAH_BINS: usize = 8;

    /// Default reciprocal floor; near-zero direction components map to `±1000`.
    pub const DEFAULT_INVERSE_EPSILON: f32 = 0.001;

    pub(crate) fn bins(&self) -> usize {
        self.sah_bins.max(2)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sah_bins: Self::DEFAULT_SAH_BINS,
            inverse_epsilon: Self::DEFAULT_INVERSE_EPSILON,
        }
    }
}
