/*
 * SPDX-FileCopyrightText: 2026 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use super::{Aggregators, Contributions, Vertex};
use std::hash::Hash;

/// Global quantities of the graph as of the last barrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Totals {
    pub num_vertices: usize,
    pub num_edges: usize,
}

/// Everything a task produces during a superstep.
pub(crate) struct Outbox<I, M> {
    pub(crate) messages: Vec<(I, M)>,
    pub(crate) contributions: Contributions,
    pub(crate) active: usize,
}

impl<I, M> Default for Outbox<I, M> {
    fn default() -> Self {
        Self {
            messages: Vec::new(),
            contributions: Contributions::default(),
            active: 0,
        }
    }
}

impl<I, M> Outbox<I, M> {
    pub(crate) fn merge(mut self, mut other: Self) -> Self {
        self.messages.append(&mut other.messages);
        self.contributions = self.contributions.merge(other.contributions);
        self.active += other.active;
        self
    }
}

/// The view of the computation available to a vertex during a superstep.
///
/// Messages sent through the context are delivered at the next superstep,
/// and contributions to aggregators are visible from the next superstep. The
/// values returned by [`aggregated`](Context::aggregated),
/// [`num_vertices`](Context::num_vertices), and
/// [`num_edges`](Context::num_edges) refer to the state of the graph at the
/// last barrier, so they do not change during a superstep.
pub struct Context<'a, I, M> {
    superstep: usize,
    totals: Totals,
    aggregators: &'a Aggregators,
    outbox: &'a mut Outbox<I, M>,
}

impl<'a, I, M> Context<'a, I, M> {
    pub(crate) fn new(
        superstep: usize,
        totals: Totals,
        aggregators: &'a Aggregators,
        outbox: &'a mut Outbox<I, M>,
    ) -> Self {
        Self {
            superstep,
            totals,
            aggregators,
            outbox,
        }
    }

    /// Returns the current superstep, starting from zero.
    pub fn superstep(&self) -> usize {
        self.superstep
    }

    /// Returns the number of vertices at the last barrier.
    pub fn num_vertices(&self) -> usize {
        self.totals.num_vertices
    }

    /// Returns the number of edges at the last barrier.
    ///
    /// Edges added during the current superstep are not counted.
    pub fn num_edges(&self) -> usize {
        self.totals.num_edges
    }

    /// Returns the value of an aggregator at the last barrier (zero if the
    /// aggregator has never been written).
    pub fn aggregated(&self, name: &str) -> f64 {
        self.aggregators.get(name)
    }

    /// Contributes a value to an aggregator.
    pub fn aggregate(&mut self, name: &'static str, value: f64) {
        self.outbox.contributions.add(name, value);
    }

    /// Sends a message to a vertex.
    pub fn send(&mut self, target: I, message: M) {
        self.outbox.messages.push((target, message));
    }

    /// Sends a copy of a message along each outgoing edge of a vertex.
    pub fn send_to_all_edges<V, E>(&mut self, vertex: &Vertex<I, V, E>, message: M)
    where
        I: Clone + Eq + Hash,
        M: Clone,
    {
        for edge in vertex.edges() {
            self.outbox
                .messages
                .push((edge.target.clone(), message.clone()));
        }
    }
}
