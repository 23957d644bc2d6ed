/*
 * SPDX-FileCopyrightText: 2026 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use super::VertexId;
use nalgebra::DVector;

/// The payload exchanged between users and items.
///
/// Every message carries the identifier and the latent vector of its sender.
/// The remaining fields are optional:
///
/// - `rating` is present only in the messages sent by users at superstep 0:
///   the receiving item uses it to create the edge back to the user;
/// - `bias` and `implicit` are present only in SVD++ runs; for users,
///   `implicit` is the sum of the implicit terms of the items they rated,
///   whereas for items it is their own implicit term;
/// - `degree` is the number of ratings of a user in SVD++ runs.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub source: VertexId,
    pub latent: DVector<f64>,
    pub rating: Option<f64>,
    pub bias: Option<f64>,
    pub implicit: Option<DVector<f64>>,
    pub degree: Option<usize>,
}

impl Message {
    pub fn new(source: VertexId, latent: DVector<f64>) -> Self {
        Self {
            source,
            latent,
            rating: None,
            bias: None,
            implicit: None,
            degree: None,
        }
    }

    pub fn with_rating(mut self, rating: f64) -> Self {
        self.rating = Some(rating);
        self
    }

    pub fn with_bias(mut self, bias: f64) -> Self {
        self.bias = Some(bias);
        self
    }

    pub fn with_implicit(mut self, implicit: DVector<f64>) -> Self {
        self.implicit = Some(implicit);
        self
    }

    pub fn with_degree(mut self, degree: usize) -> Self {
        self.degree = Some(degree);
        self
    }

    /// Removes and returns the rating.
    pub fn take_rating(&mut self) -> Option<f64> {
        self.rating.take()
    }
}
