/*
 * SPDX-FileCopyrightText: 2026 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use anyhow::ensure;
use std::fmt::Display;
use std::str::FromStr;
use thiserror::Error;

/// How a vertex computes its local halting factor.
///
/// A vertex keeps sending messages to its neighbors only while its halting
/// factor is greater than the [tolerance](Config::tolerance) and the
/// iteration budget is not exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum HaltFactor {
    /// The factor is the tolerance plus one: only the iteration budget stops
    /// the computation. This is the default.
    #[default]
    Basic,
    /// The factor is the root mean squared error of the ratings evaluated by
    /// the vertex in the current superstep. The global RMSE is also checked
    /// against the tolerance after every superstep.
    Rmse,
    /// The factor is the Euclidean distance between the current latent vector
    /// and the one the vertex was initialized with.
    L2Norm,
}

impl Display for HaltFactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HaltFactor::Basic => f.write_str("basic"),
            HaltFactor::Rmse => f.write_str("rmse"),
            HaltFactor::L2Norm => f.write_str("l2norm"),
        }
    }
}

/// The error returned when parsing an unknown halting factor.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown halting factor {0:?} (must be one of basic, rmse, l2norm)")]
pub struct UnknownHaltFactor(pub String);

impl FromStr for HaltFactor {
    type Err = UnknownHaltFactor;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic" => Ok(HaltFactor::Basic),
            "rmse" => Ok(HaltFactor::Rmse),
            "l2norm" => Ok(HaltFactor::L2Norm),
            _ => Err(UnknownHaltFactor(s.to_owned())),
        }
    }
}

/// The parameters of a factorization.
///
/// The configuration is built once, [validated](Config::validate), and then
/// shared read-only by all vertices and all update strategies.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    /// The length of latent vectors.
    pub vector_size: usize,
    /// The regularization parameter λ.
    pub lambda: f64,
    /// The learning rate γ (SGD and SVD++ only).
    pub gamma: f64,
    /// The maximum superstep at which vertices send messages.
    pub iterations: usize,
    /// The threshold for halting factors and for the global RMSE.
    pub tolerance: f64,
    /// How vertices compute their halting factor.
    pub halt_factor: HaltFactor,
    /// Whether vertices contribute their squared errors to the global RMSE
    /// aggregator even if the halting factor is not [`Rmse`](HaltFactor::Rmse).
    pub rmse_aggregator: bool,
    /// Whether SGD vertices cache the latent vectors of their neighbors and
    /// skip updates when no neighbor has changed.
    pub delta_caching: bool,
}

impl Config {
    pub const DEFAULT_VECTOR_SIZE: usize = 2;
    pub const DEFAULT_LAMBDA: f64 = 0.01;
    pub const DEFAULT_GAMMA: f64 = 0.005;
    pub const DEFAULT_ITERATIONS: usize = 10;
    pub const DEFAULT_TOLERANCE: f64 = 1.0;

    /// Checks that the parameters make sense.
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(self.vector_size > 0, "The vector size must be positive");
        ensure!(
            self.lambda.is_finite() && self.lambda >= 0.0,
            "The regularization parameter must be nonnegative, got {}",
            self.lambda
        );
        ensure!(
            self.gamma.is_finite() && self.gamma >= 0.0,
            "The learning rate must be nonnegative, got {}",
            self.gamma
        );
        ensure!(!self.tolerance.is_nan(), "The tolerance cannot be NaN");
        ensure!(
            self.tolerance >= 0.0,
            "The tolerance must be nonnegative, got {}",
            self.tolerance
        );
        Ok(())
    }

    /// Returns whether vertices contribute their squared errors to the
    /// global RMSE aggregator, which is then checked by the controller.
    pub fn global_rmse(&self) -> bool {
        self.halt_factor == HaltFactor::Rmse || self.rmse_aggregator
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            vector_size: Self::DEFAULT_VECTOR_SIZE,
            lambda: Self::DEFAULT_LAMBDA,
            gamma: Self::DEFAULT_GAMMA,
            iterations: Self::DEFAULT_ITERATIONS,
            tolerance: Self::DEFAULT_TOLERANCE,
            halt_factor: HaltFactor::default(),
            rmse_aggregator: false,
            delta_caching: false,
        }
    }
}
