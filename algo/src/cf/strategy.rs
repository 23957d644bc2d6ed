/*
 * SPDX-FileCopyrightText: 2026 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use super::{Config, Kind, Message, VertexId, VertexState, als, math, sgd, svdpp};
use kahan::KahanSum;
use nalgebra::DVector;
use std::fmt::Display;

/// The algorithm used to update latent factors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum UpdateStrategy {
    /// [Alternating least squares](super::als).
    #[default]
    Als,
    /// [Stochastic gradient descent](super::sgd).
    Sgd,
    /// [Biased factorization with implicit feedback](super::svdpp).
    Svdpp,
}

impl Display for UpdateStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UpdateStrategy::Als => f.write_str("ALS"),
            UpdateStrategy::Sgd => f.write_str("SGD"),
            UpdateStrategy::Svdpp => f.write_str("SVD++"),
        }
    }
}

/// A rating seen by a vertex during a superstep, together with the current
/// factors of the neighbor on the other side of the rating.
#[derive(Debug, Clone, Copy)]
pub struct Observation<'a> {
    pub neighbor: VertexId,
    pub latent: &'a DVector<f64>,
    pub rating: f64,
    /// The bias of the neighbor (SVD++ only, zero otherwise).
    pub bias: f64,
    /// For an item observing a user, the sum of the implicit terms of the
    /// items rated by the user; for a user observing an item, the implicit
    /// term of the item (SVD++ only).
    pub implicit: Option<&'a DVector<f64>>,
    /// The number of ratings of the neighbor, if it is a user (SVD++ only).
    pub degree: usize,
}

impl<'a> Observation<'a> {
    /// Creates an observation carrying only a latent vector.
    pub fn new(neighbor: VertexId, latent: &'a DVector<f64>, rating: f64) -> Self {
        Self {
            neighbor,
            latent,
            rating,
            bias: 0.0,
            implicit: None,
            degree: 0,
        }
    }

    /// Creates an observation from a message and the rating of the edge
    /// towards its sender.
    pub fn from_message(message: &'a Message, rating: f64) -> Self {
        Self {
            neighbor: message.source,
            latent: &message.latent,
            rating,
            bias: message.bias.unwrap_or(0.0),
            implicit: message.implicit.as_ref(),
            degree: message.degree.unwrap_or(0),
        }
    }
}

/// What a vertex knows about the current superstep besides its
/// observations.
#[derive(Debug, Clone, Copy)]
pub struct Step {
    /// Whether some neighbor vector changed since the last superstep. This
    /// is always true unless delta caching is enabled.
    pub changed: bool,
    /// The global average rating (SVD++ only).
    pub global_average: f64,
    /// The number of ratings of the vertex.
    pub degree: usize,
}

/// The result of an update.
#[derive(Debug, Clone, Copy, Default)]
pub struct Outcome {
    /// The number of updates applied to the latent vector.
    pub updates: usize,
    /// The sum of squared prediction errors over the observations.
    pub squared_errors: f64,
    /// The number of observations whose error has been evaluated.
    pub evaluated: usize,
    /// The last prediction error.
    pub last_error: f64,
}

impl UpdateStrategy {
    /// Updates the factors of a vertex using the given observations, which
    /// must be sorted by neighbor.
    ///
    /// Errors are evaluated after the update; the outcome reports their
    /// squares so that the caller can compute halting factors and
    /// contribute to the global RMSE.
    pub fn update(
        &self,
        config: &Config,
        state: &mut VertexState,
        observations: &[Observation],
        step: Step,
    ) -> Outcome {
        match self {
            UpdateStrategy::Als => update_als(config, state, observations),
            UpdateStrategy::Sgd => update_sgd(config, state, observations, step),
            UpdateStrategy::Svdpp => match state.kind {
                Kind::User => update_svdpp_user(config, state, observations, step),
                Kind::Item => update_svdpp_item(config, state, observations, step),
            },
        }
    }
}

/// Accumulates squared errors.
struct Errors {
    sum: KahanSum<f64>,
    evaluated: usize,
    last: f64,
}

impl Errors {
    fn new() -> Self {
        Self {
            sum: KahanSum::new(),
            evaluated: 0,
            last: 0.0,
        }
    }

    fn push(&mut self, err: f64) {
        self.sum += err * err;
        self.evaluated += 1;
        self.last = err;
    }

    fn into_outcome(self, updates: usize) -> Outcome {
        Outcome {
            updates,
            squared_errors: self.sum.sum(),
            evaluated: self.evaluated,
            last_error: self.last,
        }
    }
}

fn update_als(config: &Config, state: &mut VertexState, observations: &[Observation]) -> Outcome {
    let neighbors = observations
        .iter()
        .map(|o| (o.latent, o.rating))
        .collect::<Vec<_>>();
    let mut updates = 0;
    if let Some(latent) = als::solve(&neighbors, config.lambda, config.vector_size) {
        state.latent = latent;
        updates = 1;
    }
    let mut errors = Errors::new();
    for o in observations {
        errors.push(math::error(math::predict(&state.latent, o.latent), o.rating));
    }
    errors.into_outcome(updates)
}

fn update_sgd(config: &Config, state: &mut VertexState, observations: &[Observation], step: Step) -> Outcome {
    let mut errors = Errors::new();
    let mut updates = 0;
    for o in observations {
        let mut err = math::error(math::predict(&state.latent, o.latent), o.rating);
        if step.changed {
            state.latent = sgd::update(&state.latent, o.latent, err, config.lambda, config.gamma);
            updates += 1;
            err = math::error(math::predict(&state.latent, o.latent), o.rating);
        }
        errors.push(err);
    }
    errors.into_outcome(updates)
}

fn update_svdpp_user(config: &Config, state: &mut VertexState, observations: &[Observation], step: Step) -> Outcome {
    // The implicit sum is refreshed only once items start sending it
    if observations.iter().any(|o| o.implicit.is_some()) {
        let mut sum = DVector::zeros(config.vector_size);
        for implicit in observations.iter().filter_map(|o| o.implicit) {
            sum += implicit;
        }
        state.implicit_sum = sum;
    }

    let estimate = |state: &VertexState, o: &Observation| {
        svdpp::predict(
            step.global_average + state.bias + o.bias,
            &state.latent,
            o.latent,
            step.degree,
            &state.implicit_sum,
        )
    };

    let mut errors = Errors::new();
    for o in observations {
        // The SVD++ steps move along the residual, observed minus predicted
        let residual = o.rating - estimate(state, o);
        state.bias = svdpp::update_baseline(state.bias, residual, config.gamma, config.lambda);
        state.latent = svdpp::update_user(&state.latent, o.latent, residual, config.gamma, config.lambda);
        errors.push(math::error(estimate(state, o), o.rating));
    }
    errors.into_outcome(observations.len())
}

fn update_svdpp_item(config: &Config, state: &mut VertexState, observations: &[Observation], step: Step) -> Outcome {
    let zeros = DVector::zeros(config.vector_size);
    let estimate = |state: &VertexState, o: &Observation| {
        svdpp::predict(
            step.global_average + o.bias + state.bias,
            o.latent,
            &state.latent,
            o.degree,
            o.implicit.unwrap_or(&zeros),
        )
    };

    let mut errors = Errors::new();
    for o in observations {
        let implicit_sum = o.implicit.unwrap_or(&zeros);
        let residual = o.rating - estimate(state, o);
        state.bias = svdpp::update_baseline(state.bias, residual, config.gamma, config.lambda);
        let latent = svdpp::update_item(
            &state.latent,
            o.latent,
            implicit_sum,
            residual,
            o.degree,
            config.gamma,
            config.lambda,
        );
        // The implicit term moves along the item vector before the update
        state.implicit = svdpp::update_implicit(
            &state.implicit,
            &state.latent,
            residual,
            o.degree,
            config.gamma,
            config.lambda,
        );
        state.latent = latent;
        errors.push(math::error(estimate(state, o), o.rating));
    }
    errors.into_outcome(observations.len())
}
