/*
 * SPDX-FileCopyrightText: 2026 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

pub mod preds {
    //! Predicates implementing global stopping conditions.
    //!
    //! The [controller](super::RmseController) of a factorization evaluates
    //! a [predicate](Predicate) at the end of every superstep: if the
    //! predicate evaluates to true, the controller issues a global halt,
    //! which takes precedence over the local decisions of the vertices.
    //!
    //! You can combine the predicates using the `and` and `or` methods
    //! provided by the [`Predicate`] trait.
    //!
    //! # Examples
    //! ```
    //! # fn main() -> Result<(), Box<dyn std::error::Error>> {
    //! use predicates::prelude::*;
    //! use cfgraph_algo::cf::preds::{MaxSupersteps, Rmse};
    //!
    //! let mut predicate = Rmse::try_from(0.5)?.boxed();
    //! predicate = predicate.or(MaxSupersteps::from(20)).boxed();
    //! #     Ok(())
    //! # }
    //! ```

    use anyhow::ensure;
    use predicates::{Predicate, reflection::PredicateReflection};
    use std::fmt::Display;

    #[doc(hidden)]
    /// This structure is passed to stopping predicates to provide the
    /// information that is needed to evaluate them.
    #[derive(Debug)]
    pub struct PredParams {
        /// The number of supersteps completed so far.
        pub supersteps: usize,
        /// The global RMSE after the last superstep, or infinity if it is
        /// not available.
        pub rmse: f64,
    }

    /// Stops after at most the provided number of supersteps.
    #[derive(Debug, Clone)]
    pub struct MaxSupersteps {
        max_supersteps: usize,
    }

    impl MaxSupersteps {
        pub const DEFAULT_MAX_SUPERSTEPS: usize = usize::MAX;
    }

    impl From<usize> for MaxSupersteps {
        fn from(max_supersteps: usize) -> Self {
            MaxSupersteps { max_supersteps }
        }
    }

    impl Default for MaxSupersteps {
        fn default() -> Self {
            Self::from(Self::DEFAULT_MAX_SUPERSTEPS)
        }
    }

    impl Display for MaxSupersteps {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_fmt(format_args!("(max supersteps: {})", self.max_supersteps))
        }
    }

    impl PredicateReflection for MaxSupersteps {}

    impl Predicate<PredParams> for MaxSupersteps {
        fn eval(&self, pred_params: &PredParams) -> bool {
            pred_params.supersteps >= self.max_supersteps
        }
    }

    /// Stops when the global RMSE drops below a given threshold.
    #[derive(Debug, Clone)]
    pub struct Rmse {
        threshold: f64,
    }

    impl TryFrom<f64> for Rmse {
        type Error = anyhow::Error;
        fn try_from(threshold: f64) -> anyhow::Result<Self> {
            ensure!(!threshold.is_nan());
            ensure!(threshold >= 0.0, "The threshold must be nonnegative");
            Ok(Rmse { threshold })
        }
    }

    impl Display for Rmse {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_fmt(format_args!("(rmse: {})", self.threshold))
        }
    }

    impl PredicateReflection for Rmse {}
    impl Predicate<PredParams> for Rmse {
        fn eval(&self, pred_params: &PredParams) -> bool {
            pred_params.rmse < self.threshold
        }
    }
}

use super::{SUM_OF_RATINGS, SUM_OF_SQUARED_ERRORS};
use cfgraph::prelude::*;
use predicates::Predicate;
use preds::PredParams;

/// The master of a factorization.
///
/// The controller registers the persistent aggregators and, if the global
/// RMSE is enabled, computes after every superstep *S* ≥ 1
///
/// > √(Σ *err*² / *R*),
///
/// where the sum is the value of the squared-error aggregator and *R* is the
/// number of ratings, that is, half the number of edges after the barrier
/// (at the end of superstep 1 both directions of every rating exist). Then,
/// it evaluates its predicate and issues a global halt if it is true.
#[derive(Debug)]
pub struct RmseController<P> {
    predicate: P,
    global_rmse: bool,
    history: Vec<f64>,
}

impl<P: Predicate<PredParams>> RmseController<P> {
    pub fn new(predicate: P, global_rmse: bool) -> Self {
        Self {
            predicate,
            global_rmse,
            history: Vec::new(),
        }
    }

    /// Returns the global RMSE computed after each superstep starting from
    /// superstep 1.
    pub fn history(&self) -> &[f64] {
        &self.history
    }

    pub fn into_history(self) -> Vec<f64> {
        self.history
    }
}

impl<P: Predicate<PredParams>> Controller for RmseController<P> {
    fn initialize(&mut self, aggregators: &mut Aggregators) {
        aggregators.register_persistent(SUM_OF_RATINGS);
    }

    fn on_superstep_end(&mut self, stats: &SuperstepStats, aggregators: &Aggregators) -> Decision {
        let mut rmse = f64::INFINITY;
        if self.global_rmse && stats.superstep >= 1 {
            let ratings = stats.totals.num_edges / 2;
            rmse = if ratings == 0 {
                0.0
            } else {
                (aggregators.get(SUM_OF_SQUARED_ERRORS) / ratings as f64).sqrt()
            };
            self.history.push(rmse);
            log::info!("Global RMSE after superstep {}: {rmse}", stats.superstep);
        }

        let params = PredParams {
            supersteps: stats.superstep + 1,
            rmse,
        };
        if self.predicate.eval(&params) {
            Decision::HaltAll
        } else {
            Decision::Continue
        }
    }
}

#[cfg(test)]
mod tests {
    use super::preds::*;
    use super::*;
    use predicates::prelude::*;

    fn stats(superstep: usize, num_edges: usize) -> SuperstepStats {
        SuperstepStats {
            superstep,
            active_vertices: 0,
            messages_sent: 0,
            created_vertices: 0,
            totals: Totals {
                num_vertices: 0,
                num_edges,
            },
        }
    }

    fn aggregators(sse: f64) -> Aggregators {
        let mut aggregators = Aggregators::new();
        let mut controller = RmseController::new(MaxSupersteps::default(), false);
        controller.initialize(&mut aggregators);
        assert!(aggregators.is_persistent(SUM_OF_RATINGS));
        let mut contributions = Contributions::default();
        contributions.add(SUM_OF_SQUARED_ERRORS, sse);
        aggregators.apply(contributions);
        aggregators
    }

    #[test]
    fn test_preds() -> anyhow::Result<()> {
        let params = PredParams {
            supersteps: 10,
            rmse: 0.5,
        };
        assert!(MaxSupersteps::from(10).eval(&params));
        assert!(!MaxSupersteps::from(11).eval(&params));
        assert!(!MaxSupersteps::default().eval(&params));
        assert!(Rmse::try_from(0.6)?.eval(&params));
        assert!(!Rmse::try_from(0.5)?.eval(&params));
        assert!(Rmse::try_from(f64::NAN).is_err());
        assert!(Rmse::try_from(-1.0).is_err());
        let either = Rmse::try_from(0.1)?.or(MaxSupersteps::from(5));
        assert!(either.eval(&params));
        Ok(())
    }

    #[test]
    fn test_rmse() {
        let mut controller = RmseController::new(Rmse::try_from(0.4).unwrap(), true);
        // Superstep 0 has no ratings to evaluate
        assert_eq!(
            controller.on_superstep_end(&stats(0, 4), &aggregators(0.0)),
            Decision::Continue
        );
        assert!(controller.history().is_empty());
        // Four ratings, eight edges: √(1 / 4)
        assert_eq!(
            controller.on_superstep_end(&stats(1, 8), &aggregators(1.0)),
            Decision::Continue
        );
        assert_eq!(
            controller.on_superstep_end(&stats(2, 8), &aggregators(0.25)),
            Decision::HaltAll
        );
        assert_eq!(controller.history(), &[0.5, 0.25]);
    }

    #[test]
    fn test_disabled_rmse() {
        let mut controller = RmseController::new(Rmse::try_from(0.4).unwrap().or(MaxSupersteps::from(3)), false);
        assert_eq!(
            controller.on_superstep_end(&stats(1, 8), &aggregators(0.0)),
            Decision::Continue
        );
        assert_eq!(
            controller.on_superstep_end(&stats(2, 8), &aggregators(0.0)),
            Decision::HaltAll
        );
        assert!(controller.into_history().is_empty());
    }
}
