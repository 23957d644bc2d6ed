/*
 * SPDX-FileCopyrightText: 2026 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use super::{
    CfError, Config, HaltFactor, Kind, Message, Observation, Step, UpdateStrategy, VertexId,
    VertexState,
};
use cfgraph::prelude::*;
use kahan::KahanSum;
use std::collections::btree_map::Entry;

/// The name of the regular aggregator collecting squared prediction errors.
pub const SUM_OF_SQUARED_ERRORS: &str = "sum_of_squared_errors";
/// The name of the persistent aggregator collecting the sum of all ratings
/// (SVD++ only).
pub const SUM_OF_RATINGS: &str = "sum_of_ratings";

/// The type of vertices of a factorization.
pub type CfVertex = Vertex<VertexId, VertexState, f64>;

/// The vertex program of a factorization.
///
/// At superstep 0, users (the only vertices with edges) initialize their
/// state and send their latent vector to each rated item, together with the
/// rating; items are created by these messages, and at superstep 1 they
/// initialize their state and create the edges back to their users.
///
/// From superstep 1 on, every vertex that receives messages
///
/// 1. checks that all messages come from neighbors on the other side of the
///    graph and carry vectors of the right size;
/// 2. updates its factors using the configured [strategy](UpdateStrategy);
/// 3. computes its [halting factor](HaltFactor) and, if enabled,
///    contributes its squared errors to [`SUM_OF_SQUARED_ERRORS`];
/// 4. sends its new factors to all its neighbors if the halting factor is
///    above the tolerance and the superstep is smaller than the number of
///    iterations.
///
/// All vertices vote to halt at the end of every superstep: a vertex is
/// computed again only if it receives messages.
#[derive(Debug, Clone)]
pub struct CfProgram {
    strategy: UpdateStrategy,
    config: Config,
}

impl CfProgram {
    pub fn new(strategy: UpdateStrategy, config: Config) -> Self {
        Self { strategy, config }
    }

    pub fn strategy(&self) -> UpdateStrategy {
        self.strategy
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns whether vertices keep a cache of their neighbors' vectors.
    ///
    /// ALS always needs all neighbors at once; SGD needs the cache only
    /// with delta caching.
    pub fn uses_cache(&self) -> bool {
        match self.strategy {
            UpdateStrategy::Als => true,
            UpdateStrategy::Sgd => self.config.delta_caching,
            UpdateStrategy::Svdpp => false,
        }
    }

    /// Returns the message carrying the current factors of a vertex.
    fn message(&self, vertex: &CfVertex) -> Message {
        let state = vertex.value();
        let message = Message::new(*vertex.id(), state.latent.clone());
        if self.strategy != UpdateStrategy::Svdpp {
            return message;
        }
        let message = message.with_bias(state.bias);
        match state.kind {
            Kind::User => message
                .with_implicit(state.implicit_sum.clone())
                .with_degree(vertex.num_edges()),
            Kind::Item => message.with_implicit(state.implicit.clone()),
        }
    }

    /// Returns the global average rating.
    ///
    /// At superstep 1 only the user side of the graph has edges, so the
    /// number of edges at the last barrier is the number of ratings; later,
    /// every rating is counted twice.
    fn global_average(&self, ctx: &Context<'_, VertexId, Message>) -> f64 {
        let ratings = if ctx.superstep() < 2 {
            ctx.num_edges()
        } else {
            ctx.num_edges() / 2
        };
        if ratings == 0 {
            0.0
        } else {
            ctx.aggregated(SUM_OF_RATINGS) / ratings as f64
        }
    }

    fn check(&self, vertex: VertexId, message: &Message) -> Result<(), CfError> {
        let neighbor = message.source;
        if neighbor.kind() == vertex.kind() {
            return Err(CfError::NotBipartite { vertex, neighbor });
        }
        let expected = self.config.vector_size;
        let lengths = std::iter::once(message.latent.len()).chain(message.implicit.as_ref().map(|v| v.len()));
        for found in lengths {
            if found != expected {
                return Err(CfError::VectorLength {
                    vertex,
                    neighbor,
                    expected,
                    found,
                });
            }
        }
        Ok(())
    }

    /// Sends the factors of a user, together with the ratings, along all its
    /// edges.
    fn first_round(&self, ctx: &mut Context<'_, VertexId, Message>, vertex: &CfVertex) {
        if self.strategy == UpdateStrategy::Svdpp {
            let mut sum = KahanSum::new();
            for edge in vertex.edges() {
                sum += edge.value;
            }
            ctx.aggregate(SUM_OF_RATINGS, sum.sum());
        }
        let message = self.message(vertex);
        for edge in vertex.edges() {
            ctx.send(edge.target, message.clone().with_rating(edge.value));
        }
    }

    /// Stores in the cache the vectors in the messages, returning whether
    /// some vector is new or different from the cached one.
    fn update_cache(state: &mut VertexState, messages: &[Message]) -> bool {
        let mut changed = false;
        for message in messages {
            match state.neighbors.entry(message.source) {
                Entry::Occupied(mut entry) => {
                    if entry.get() != &message.latent {
                        entry.insert(message.latent.clone());
                        changed = true;
                    }
                }
                Entry::Vacant(entry) => {
                    entry.insert(message.latent.clone());
                    changed = true;
                }
            }
        }
        changed
    }
}

fn rating(vertex: &CfVertex, neighbor: VertexId) -> Result<f64, CfError> {
    vertex
        .edge_value(&neighbor)
        .copied()
        .ok_or(CfError::UnknownNeighbor {
            vertex: *vertex.id(),
            neighbor,
        })
}

impl VertexProgram for CfProgram {
    type Id = VertexId;
    type Value = VertexState;
    type EdgeValue = f64;
    type Message = Message;
    type Error = CfError;

    fn compute(
        &self,
        ctx: &mut Context<'_, VertexId, Message>,
        vertex: &mut CfVertex,
        mut messages: Vec<Message>,
    ) -> Result<(), CfError> {
        let id = *vertex.id();
        let superstep = ctx.superstep();

        if !vertex.value().is_initialized() {
            vertex
                .value_mut()
                .initialize(id, self.config.vector_size, self.strategy);
        }

        if superstep == 0 {
            self.first_round(ctx, vertex);
            vertex.vote_to_halt();
            return Ok(());
        }

        // Validate, and materialize the edges of the first round
        for message in &mut messages {
            self.check(id, message)?;
            if let Some(rating) = message.take_rating() {
                vertex.add_edge(message.source, rating);
            }
        }
        messages.sort_unstable_by_key(|message| message.source);

        let step = Step {
            changed: true,
            global_average: if self.strategy == UpdateStrategy::Svdpp {
                self.global_average(ctx)
            } else {
                0.0
            },
            degree: vertex.num_edges(),
        };

        let outcome = if self.uses_cache() {
            let changed = Self::update_cache(vertex.value_mut(), &messages);
            let ratings = vertex
                .value()
                .neighbors
                .keys()
                .map(|&neighbor| rating(vertex, neighbor))
                .collect::<Result<Vec<_>, _>>()?;
            let cache = std::mem::take(&mut vertex.value_mut().neighbors);
            let observations = cache
                .iter()
                .zip(ratings)
                .map(|((&neighbor, latent), rating)| Observation::new(neighbor, latent, rating))
                .collect::<Vec<_>>();
            let outcome = self.strategy.update(
                &self.config,
                vertex.value_mut(),
                &observations,
                Step { changed, ..step },
            );
            drop(observations);
            vertex.value_mut().neighbors = cache;
            outcome
        } else {
            let ratings = messages
                .iter()
                .map(|message| rating(vertex, message.source))
                .collect::<Result<Vec<_>, _>>()?;
            let observations = messages
                .iter()
                .zip(ratings)
                .map(|(message, rating)| Observation::from_message(message, rating))
                .collect::<Vec<_>>();
            self.strategy
                .update(&self.config, vertex.value_mut(), &observations, step)
        };

        let config = &self.config;
        let state = vertex.value_mut();
        state.update_count += outcome.updates;

        let factor = match config.halt_factor {
            HaltFactor::Basic => config.tolerance + 1.0,
            HaltFactor::Rmse => {
                if outcome.evaluated == 0 {
                    0.0
                } else {
                    (outcome.squared_errors / outcome.evaluated as f64).sqrt()
                }
            }
            HaltFactor::L2Norm => state.l2_distance(),
        };
        state.halt_factor = match config.halt_factor {
            HaltFactor::Basic => outcome.last_error,
            _ => factor,
        };

        if config.global_rmse() {
            ctx.aggregate(SUM_OF_SQUARED_ERRORS, outcome.squared_errors);
        }

        if factor > config.tolerance && superstep < config.iterations {
            let message = self.message(vertex);
            ctx.send_to_all_edges(vertex, message);
        }

        vertex.vote_to_halt();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dsi_progress_logger::no_logging;

    fn program() -> CfProgram {
        CfProgram::new(
            UpdateStrategy::Sgd,
            Config {
                vector_size: 2,
                iterations: 4,
                ..Config::default()
            },
        )
    }

    #[test]
    fn test_vector_length() {
        let program = program();
        let mut state = VertexState::default();
        state.initialize(VertexId::user(0), 3, UpdateStrategy::Sgd);
        let mut engine = Engine::<CfProgram>::new();
        engine
            .add_vertex(VertexId::user(0), state)
            .add_edge(VertexId::user(0), VertexId::item(0), 4.0);

        assert!(engine.step(&program, no_logging![]).is_ok());
        assert_eq!(
            engine.step(&program, no_logging![]).err(),
            Some(CfError::VectorLength {
                vertex: VertexId::item(0),
                neighbor: VertexId::user(0),
                expected: 2,
                found: 3,
            })
        );
    }

    #[test]
    fn test_not_bipartite() {
        let program = program();
        let mut engine = Engine::<CfProgram>::new();
        engine.add_edge(VertexId::user(0), VertexId::user(1), 3.0);

        assert!(engine.step(&program, no_logging![]).is_ok());
        assert_eq!(
            engine.step(&program, no_logging![]).err(),
            Some(CfError::NotBipartite {
                vertex: VertexId::user(1),
                neighbor: VertexId::user(0),
            })
        );
    }

    #[test]
    fn test_unknown_neighbor() {
        let program = program();
        let mut engine = Engine::<CfProgram>::new();
        engine.add_edge(VertexId::user(0), VertexId::item(0), 3.0);
        assert!(engine.step(&program, no_logging![]).is_ok());

        // Item 0 sends its factors to user 1, which never rated it
        engine.add_edge(VertexId::item(0), VertexId::user(1), 2.0);
        let stats = engine.step(&program, no_logging![]);
        assert_eq!(stats.map(|stats| stats.created_vertices), Ok(1));
        assert_eq!(
            engine.step(&program, no_logging![]).err(),
            Some(CfError::UnknownNeighbor {
                vertex: VertexId::user(1),
                neighbor: VertexId::item(0),
            })
        );
    }

    #[test]
    fn test_first_round() {
        let program = program();
        let mut engine = Engine::<CfProgram>::new();
        engine
            .add_edge(VertexId::user(0), VertexId::item(0), 3.0)
            .add_edge(VertexId::user(0), VertexId::item(1), 5.0);

        let stats = engine.step(&program, no_logging![]);
        assert_eq!(stats.map(|stats| stats.messages_sent), Ok(2));
        // Items are created by the messages, and create their edges at
        // superstep 1
        assert_eq!(engine.num_vertices(), 3);
        assert!(engine.step(&program, no_logging![]).is_ok());
        let item = engine.vertex(&VertexId::item(1)).unwrap();
        assert_eq!(item.edge_value(&VertexId::user(0)), Some(&5.0));
        assert!(item.value().is_initialized());
    }
}
