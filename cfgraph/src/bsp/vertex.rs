/*
 * SPDX-FileCopyrightText: 2026 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use std::collections::HashMap;
use std::hash::Hash;

/// An outgoing edge.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Edge<I, E> {
    pub target: I,
    pub value: E,
}

/// A vertex of a BSP computation: an identifier, a value, a list of
/// outgoing edges, and a halting flag.
///
/// Edges are unique by target: adding an edge towards a target that is
/// already present replaces its value. Edge values can be retrieved by target
/// in constant time.
///
/// The halting flag is set by [`vote_to_halt`](Vertex::vote_to_halt) and
/// reset by the [engine](super::Engine) when the vertex receives a message.
#[derive(Debug, Clone)]
pub struct Vertex<I, V, E> {
    id: I,
    value: V,
    edges: Vec<Edge<I, E>>,
    positions: HashMap<I, usize>,
    halted: bool,
}

impl<I: Clone + Eq + Hash, V, E> Vertex<I, V, E> {
    /// Creates a new active vertex without edges.
    pub fn new(id: I, value: V) -> Self {
        Self {
            id,
            value,
            edges: Vec::new(),
            positions: HashMap::new(),
            halted: false,
        }
    }

    pub fn id(&self) -> &I {
        &self.id
    }

    pub fn value(&self) -> &V {
        &self.value
    }

    pub fn value_mut(&mut self) -> &mut V {
        &mut self.value
    }

    /// Returns the outgoing edges in insertion order.
    pub fn edges(&self) -> &[Edge<I, E>] {
        &self.edges
    }

    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    /// Returns the value of the edge towards `target`, if any.
    pub fn edge_value(&self, target: &I) -> Option<&E> {
        self.positions.get(target).map(|&pos| &self.edges[pos].value)
    }

    /// Adds an edge, replacing the value of an existing edge with the same
    /// target.
    ///
    /// Returns the previous value, if any.
    pub fn add_edge(&mut self, target: I, value: E) -> Option<E> {
        match self.positions.get(&target) {
            Some(&pos) => Some(std::mem::replace(&mut self.edges[pos].value, value)),
            None => {
                self.positions.insert(target.clone(), self.edges.len());
                self.edges.push(Edge { target, value });
                None
            }
        }
    }

    /// Votes to halt: the vertex will not be computed in the following
    /// supersteps unless it receives a message.
    pub fn vote_to_halt(&mut self) {
        self.halted = true;
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub(crate) fn wake_up(&mut self) {
        self.halted = false;
    }

    /// Consumes the vertex, returning its identifier, value, and edges.
    pub fn into_parts(self) -> (I, V, Vec<Edge<I, E>>) {
        (self.id, self.value, self.edges)
    }
}
