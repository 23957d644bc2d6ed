/*
 * SPDX-FileCopyrightText: 2026 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use super::{Kind, UpdateStrategy, VertexId, math};
use nalgebra::DVector;
use std::collections::BTreeMap;

/// The value of a vertex.
///
/// Latent factors (`latent`, `bias`, `implicit`, `implicit_sum`) are written
/// only by the [update strategies](UpdateStrategy); the cache and the
/// counters are written only by the vertex program.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexState {
    pub(crate) kind: Kind,
    pub(crate) initialized: bool,
    pub(crate) latent: DVector<f64>,
    pub(crate) initial: DVector<f64>,
    pub(crate) bias: f64,
    /// The implicit term *y*ᵢ of an item (SVD++ only).
    pub(crate) implicit: DVector<f64>,
    /// The sum of the implicit terms of the items rated by a user (SVD++
    /// only).
    pub(crate) implicit_sum: DVector<f64>,
    /// The last latent vector received from each neighbor.
    pub(crate) neighbors: BTreeMap<VertexId, DVector<f64>>,
    pub(crate) update_count: usize,
    pub(crate) halt_factor: f64,
}

impl Default for VertexState {
    fn default() -> Self {
        Self {
            kind: Kind::default(),
            initialized: false,
            latent: DVector::zeros(0),
            initial: DVector::zeros(0),
            bias: 0.0,
            implicit: DVector::zeros(0),
            implicit_sum: DVector::zeros(0),
            neighbors: BTreeMap::new(),
            update_count: 0,
            halt_factor: 0.0,
        }
    }
}

impl VertexState {
    /// Initializes the state deterministically from the identifier of the
    /// vertex.
    pub(crate) fn initialize(&mut self, id: VertexId, vector_size: usize, strategy: UpdateStrategy) {
        self.kind = id.kind();
        self.latent = math::initial_vector(id.index(), vector_size);
        self.initial = self.latent.clone();
        self.implicit_sum = DVector::zeros(vector_size);
        if strategy == UpdateStrategy::Svdpp {
            self.bias = math::initial_bias(id.index());
            if self.kind == Kind::Item {
                self.implicit = math::initial_vector(id.index(), vector_size);
            }
        }
        self.initialized = true;
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Returns the latent vector.
    pub fn latent(&self) -> &DVector<f64> {
        &self.latent
    }

    /// Returns the latent vector assigned at initialization.
    pub fn initial(&self) -> &DVector<f64> {
        &self.initial
    }

    /// Returns the bias estimate (always zero for ALS and SGD).
    pub fn bias(&self) -> f64 {
        self.bias
    }

    /// Returns the implicit term of an item (empty except for SVD++ items).
    pub fn implicit(&self) -> &DVector<f64> {
        &self.implicit
    }

    /// Returns the sum of the implicit terms received by a user.
    pub fn implicit_sum(&self) -> &DVector<f64> {
        &self.implicit_sum
    }

    /// Returns the number of cached neighbor vectors.
    pub fn cached_neighbors(&self) -> usize {
        self.neighbors.len()
    }

    /// Returns the number of updates applied to the latent vector.
    pub fn update_count(&self) -> usize {
        self.update_count
    }

    /// Returns the last halting factor computed by the vertex.
    ///
    /// With the [basic](super::HaltFactor::Basic) halting factor, this is the
    /// last prediction error computed by the vertex.
    pub fn halt_factor(&self) -> f64 {
        self.halt_factor
    }

    /// Returns the Euclidean distance between the current and the initial
    /// latent vector.
    pub fn l2_distance(&self) -> f64 {
        (&self.latent - &self.initial).norm()
    }
}
