/*
 * SPDX-FileCopyrightText: 2026 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use super::preds::{PredParams, Rmse};
use super::{
    CfProgram, CfVertex, Config, Kind, RmseController, UpdateStrategy, VertexId, VertexState, math,
    svdpp,
};
use cfgraph::prelude::*;
use dsi_progress_logger::{ConcurrentProgressLog, ProgressLog, no_logging};
use kahan::KahanSum;
use predicates::prelude::*;
use rayon::prelude::*;

/// Factorizes a rating matrix with a BSP vertex program.
///
/// Ratings are added with [`add_rating`](Factorization::add_rating) (or
/// passed to [`from_ratings`](Factorization::from_ratings)); then
/// [`run`](Factorization::run) executes supersteps until no vertex is active
/// or the stopping predicate is satisfied. If the global RMSE is
/// [enabled](Config::global_rmse), the predicate is combined with
/// [`Rmse`](super::preds::Rmse) using the [tolerance](Config::tolerance) as
/// threshold.
///
/// # Examples
///
/// ```
/// use cfgraph_algo::prelude::*;
///
/// let config = Config {
///     iterations: 6,
///     ..Config::default()
/// };
/// let mut factorization = Factorization::from_ratings(
///     UpdateStrategy::Als,
///     config,
///     [(0, 0, 5.0), (0, 1, 1.0), (1, 0, 4.0), (1, 1, 2.0), (2, 1, 1.0)],
/// )?;
/// factorization.run(preds::MaxSupersteps::default())?;
///
/// assert_eq!(factorization.num_users(), 3);
/// assert_eq!(factorization.num_items(), 2);
/// let p = factorization.predict(0, 0).unwrap();
/// assert!((0.0..=5.0).contains(&p));
/// # Ok::<(), anyhow::Error>(())
/// ```
pub struct Factorization {
    strategy: UpdateStrategy,
    config: Config,
    engine: Engine<CfProgram>,
    rmse_history: Vec<f64>,
}

impl std::fmt::Debug for Factorization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Factorization")
            .field("strategy", &self.strategy)
            .field("config", &self.config)
            .field("engine", &self.engine)
            .finish_non_exhaustive()
    }
}

impl Factorization {
    /// Creates a factorization without ratings, validating the
    /// configuration.
    pub fn new(strategy: UpdateStrategy, config: Config) -> anyhow::Result<Self> {
        config.validate()?;
        Ok(Self {
            strategy,
            config,
            engine: Engine::new(),
            rmse_history: Vec::new(),
        })
    }

    /// Creates a factorization from triples (user, item, rating).
    pub fn from_ratings(
        strategy: UpdateStrategy,
        config: Config,
        ratings: impl IntoIterator<Item = (u64, u64, f64)>,
    ) -> anyhow::Result<Self> {
        let mut factorization = Self::new(strategy, config)?;
        for (user, item, rating) in ratings {
            factorization.add_rating(user, item, rating);
        }
        Ok(factorization)
    }

    /// Adds a rating, replacing a previous rating of the same user for the
    /// same item.
    ///
    /// Ratings must be added before running the factorization.
    pub fn add_rating(&mut self, user: u64, item: u64, rating: f64) -> &mut Self {
        self.engine
            .add_edge(VertexId::user(user), VertexId::item(item), rating);
        self
    }

    /// Sets the parallel task granularity.
    pub fn granularity(&mut self, granularity: Granularity) -> &mut Self {
        self.engine.granularity(granularity);
        self
    }

    pub fn strategy(&self) -> UpdateStrategy {
        self.strategy
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runs the factorization until no vertex is active or the given
    /// predicate is satisfied.
    pub fn run(&mut self, predicate: impl Predicate<PredParams>) -> anyhow::Result<RunSummary> {
        self.run_with_logging(predicate, no_logging![], no_logging![])
    }

    /// Runs the factorization until no vertex is active or the given
    /// predicate is satisfied, logging progress.
    ///
    /// `pl` is a sequential [`ProgressLog`] counting supersteps, whereas
    /// `cpl` is a [`ConcurrentProgressLog`] counting vertices inside each
    /// superstep.
    pub fn run_with_logging(
        &mut self,
        predicate: impl Predicate<PredParams>,
        pl: &mut impl ProgressLog,
        cpl: &mut impl ConcurrentProgressLog,
    ) -> anyhow::Result<RunSummary> {
        log::info!("Strategy: {}", self.strategy);
        log::info!(
            "Vector size: {}, lambda: {}, gamma: {}, iterations: {}",
            self.config.vector_size,
            self.config.lambda,
            self.config.gamma,
            self.config.iterations
        );
        log::info!(
            "Halting factor: {}, tolerance: {}, RMSE aggregator: {}, delta caching: {}",
            self.config.halt_factor,
            self.config.tolerance,
            self.config.rmse_aggregator,
            self.config.delta_caching
        );

        if self.config.global_rmse() {
            let predicate = predicate.or(Rmse::try_from(self.config.tolerance)?);
            self.drive(predicate, pl, cpl)
        } else {
            self.drive(predicate, pl, cpl)
        }
    }

    fn drive(
        &mut self,
        predicate: impl Predicate<PredParams>,
        pl: &mut impl ProgressLog,
        cpl: &mut impl ConcurrentProgressLog,
    ) -> anyhow::Result<RunSummary> {
        let program = CfProgram::new(self.strategy, self.config.clone());
        let mut controller = RmseController::new(predicate, self.config.global_rmse());
        let summary = self
            .engine
            .run_with_logging(&program, &mut controller, pl, cpl)?;
        self.rmse_history.extend(controller.into_history());

        log::info!(
            "Completed after {} superstep(s) ({:?})",
            summary.supersteps,
            summary.termination
        );
        if let Some(rmse) = self.rmse_history.last() {
            log::info!("Final global RMSE: {rmse}");
        }
        Ok(summary)
    }

    /// Returns the vertices in creation order (users first, in order of
    /// first appearance; then items, in order of first rating).
    pub fn vertices(&self) -> &[CfVertex] {
        self.engine.vertices()
    }

    /// Returns the state of a vertex.
    pub fn vertex(&self, id: VertexId) -> Option<&VertexState> {
        self.engine.vertex(&id).map(|vertex| vertex.value())
    }

    pub fn num_users(&self) -> usize {
        self.count(Kind::User)
    }

    pub fn num_items(&self) -> usize {
        self.count(Kind::Item)
    }

    fn count(&self, kind: Kind) -> usize {
        self.vertices()
            .par_iter()
            .filter(|vertex| vertex.id().kind() == kind)
            .count()
    }

    /// Returns the number of ratings.
    pub fn num_ratings(&self) -> usize {
        self.vertices()
            .par_iter()
            .filter(|vertex| vertex.id().kind() == Kind::User)
            .map(|vertex| vertex.num_edges())
            .sum()
    }

    /// Returns the global RMSE computed after each superstep, starting from
    /// superstep 1, if the global RMSE is enabled.
    pub fn rmse_history(&self) -> &[f64] {
        &self.rmse_history
    }

    /// Returns the global average rating.
    pub fn global_average(&self) -> f64 {
        let ratings = self.num_ratings();
        if ratings == 0 {
            0.0
        } else {
            self.vertices()
                .par_iter()
                .filter(|vertex| vertex.id().kind() == Kind::User)
                .fold(KahanSum::<f64>::new, |sum, vertex| {
                    vertex.edges().iter().fold(sum, |sum, edge| sum + edge.value)
                })
                .reduce(KahanSum::<f64>::new, |a, b| a + b)
                .sum()
                / ratings as f64
        }
    }

    /// Predicts the rating of a user for an item.
    ///
    /// Returns `None` if the user or the item do not exist or have not been
    /// initialized yet.
    pub fn predict(&self, user: u64, item: u64) -> Option<f64> {
        let u = self.engine.vertex(&VertexId::user(user))?;
        let i = self.engine.vertex(&VertexId::item(item))?;
        self.predict_pair(u, i, self.global_average())
    }

    fn predict_pair(&self, user: &CfVertex, item: &CfVertex, average: f64) -> Option<f64> {
        let (p, q) = (user.value(), item.value());
        if !p.is_initialized() || !q.is_initialized() {
            return None;
        }
        Some(match self.strategy {
            UpdateStrategy::Als | UpdateStrategy::Sgd => math::predict(p.latent(), q.latent()),
            UpdateStrategy::Svdpp => svdpp::predict(
                average + p.bias() + q.bias(),
                p.latent(),
                q.latent(),
                user.num_edges(),
                p.implicit_sum(),
            ),
        })
    }

    /// Computes the RMSE over all ratings with a direct pass on the current
    /// factors.
    ///
    /// Ratings involving vertices that have not been initialized are
    /// skipped; if no rating can be evaluated, the result is zero.
    pub fn rmse(&self) -> f64 {
        let average = self.global_average();
        let (sum, count) = self
            .vertices()
            .par_iter()
            .filter(|vertex| vertex.id().kind() == Kind::User)
            .fold(
                || (KahanSum::<f64>::new(), 0_usize),
                |(mut sum, mut count), user| {
                    for edge in user.edges() {
                        let predicted = self
                            .engine
                            .vertex(&edge.target)
                            .and_then(|item| self.predict_pair(user, item, average));
                        if let Some(predicted) = predicted {
                            let err = math::error(predicted, edge.value);
                            sum += err * err;
                            count += 1;
                        }
                    }
                    (sum, count)
                },
            )
            .reduce(
                || (KahanSum::<f64>::new(), 0),
                |(sum0, count0), (sum1, count1)| (sum0 + sum1, count0 + count1),
            );
        if count == 0 {
            0.0
        } else {
            (sum.sum() / count as f64).sqrt()
        }
    }
}
