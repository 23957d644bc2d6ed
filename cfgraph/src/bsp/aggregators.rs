/*
 * SPDX-FileCopyrightText: 2026 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use kahan::KahanSum;
use std::collections::{HashMap, HashSet};

/// Named sum aggregators, as seen after the last barrier.
///
/// Vertices contribute to an aggregator during a superstep through
/// [`Context::aggregate`](super::Context::aggregate); the contributions of
/// all vertices are reduced at the barrier and become visible, to vertices
/// and to the [controller](crate::traits::Controller), starting from the next
/// superstep.
///
/// Aggregators are _regular_ by default, that is, their value is the sum of
/// the contributions of the last superstep only. Aggregators registered as
/// _persistent_ accumulate contributions across supersteps.
///
/// Reading an aggregator that has never been written returns zero.
#[derive(Debug, Clone, Default)]
pub struct Aggregators {
    values: HashMap<&'static str, f64>,
    persistent: HashSet<&'static str>,
}

impl Aggregators {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an aggregator as persistent.
    pub fn register_persistent(&mut self, name: &'static str) -> &mut Self {
        self.persistent.insert(name);
        self
    }

    pub fn is_persistent(&self, name: &str) -> bool {
        self.persistent.contains(name)
    }

    /// Returns the value of an aggregator, or zero if it has never been
    /// written.
    pub fn get(&self, name: &str) -> f64 {
        self.values.get(name).copied().unwrap_or(0.0)
    }

    /// Returns an iterator over the aggregators that have been written at
    /// least once.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        self.values.iter().map(|(&name, &value)| (name, value))
    }

    /// Reduces into the aggregators the contributions of a superstep.
    ///
    /// This method is called by the [engine](super::Engine) at every
    /// barrier; other harnesses (e.g., tests of a
    /// [controller](crate::traits::Controller)) can use it to simulate one.
    pub fn apply(&mut self, contributions: Contributions) {
        self.values.retain(|name, _| self.persistent.contains(name));
        for (name, sum) in contributions.sums {
            *self.values.entry(name).or_insert(0.0) += sum.sum();
        }
    }
}

/// Contributions to aggregators made during a superstep.
///
/// Contributions are accumulated using [Kahan
/// summation](https://en.wikipedia.org/wiki/Kahan_summation_algorithm), and
/// partial contributions of different tasks are combined with
/// [`merge`](Contributions::merge).
pub struct Contributions {
    sums: HashMap<&'static str, KahanSum<f64>>,
}

impl Default for Contributions {
    fn default() -> Self {
        Self {
            sums: HashMap::new(),
        }
    }
}

impl core::fmt::Debug for Contributions {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_map()
            .entries(self.sums.iter().map(|(name, sum)| (name, sum.sum())))
            .finish()
    }
}

impl Contributions {
    pub fn add(&mut self, name: &'static str, value: f64) {
        *self.sums.entry(name).or_insert_with(KahanSum::new) += value;
    }

    /// Returns the current partial sum of an aggregator.
    pub fn get(&self, name: &str) -> f64 {
        self.sums.get(name).map_or(0.0, |sum| sum.sum())
    }

    pub fn is_empty(&self) -> bool {
        self.sums.is_empty()
    }

    /// Combines two sets of partial contributions.
    pub fn merge(mut self, other: Self) -> Self {
        for (name, sum) in other.sums {
            match self.sums.remove(name) {
                Some(prev) => self.sums.insert(name, prev + sum),
                None => self.sums.insert(name, sum),
            };
        }
        self
    }
}
