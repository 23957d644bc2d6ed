/*
 * SPDX-FileCopyrightText: 2026 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use crate::bsp::{Aggregators, Context, SuperstepStats, Vertex};
use std::fmt::Debug;
use std::hash::Hash;

/// A vertex-centric program.
///
/// The [engine](crate::bsp::Engine) calls [`compute`](VertexProgram::compute)
/// on every vertex that has not voted to halt or that has received
/// messages. Vertices are computed in parallel, and a vertex can only modify
/// its own state: the effects of a superstep on other vertices (messages and
/// aggregator contributions) are visible starting from the next superstep.
pub trait VertexProgram: Sync {
    /// The type of vertex identifiers.
    type Id: Clone + Eq + Hash + Debug + Send + Sync;
    /// The type of the value associated with a vertex.
    ///
    /// Vertices created by a message addressed to an unknown identifier
    /// start with the default value.
    type Value: Default + Send + Sync;
    /// The type of the value associated with an edge.
    type EdgeValue: Send + Sync;
    /// The type of messages.
    type Message: Send + Sync;
    /// The type of errors that abort the computation.
    type Error: Send;

    /// Computes a vertex.
    ///
    /// `messages` contains the messages sent to the vertex during the
    /// previous superstep, in no specified order.
    fn compute(
        &self,
        ctx: &mut Context<'_, Self::Id, Self::Message>,
        vertex: &mut Vertex<Self::Id, Self::Value, Self::EdgeValue>,
        messages: Vec<Self::Message>,
    ) -> Result<(), Self::Error>;
}

/// What the computation should do after a barrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Proceed with the next superstep (if some vertex is active).
    Continue,
    /// Stop the computation, independently of the state of the vertices.
    HaltAll,
}

/// The global coordinator of a computation.
pub trait Controller {
    /// Called once before the first superstep, usually to register
    /// persistent aggregators.
    fn initialize(&mut self, aggregators: &mut Aggregators) {
        let _ = aggregators;
    }

    /// Called at the end of each superstep, after messages have been routed
    /// and contributions have been reduced into `aggregators`.
    fn on_superstep_end(&mut self, stats: &SuperstepStats, aggregators: &Aggregators)
    -> Decision;
}

/// A controller that never stops the computation, which thus ends when no
/// vertex is active and no message is pending.
#[derive(Debug, Clone, Copy, Default)]
pub struct Quiescence;

impl Controller for Quiescence {
    fn on_superstep_end(&mut self, _stats: &SuperstepStats, _aggregators: &Aggregators) -> Decision {
        Decision::Continue
    }
}

impl<C: Controller + ?Sized> Controller for &mut C {
    fn initialize(&mut self, aggregators: &mut Aggregators) {
        (**self).initialize(aggregators)
    }

    fn on_superstep_end(&mut self, stats: &SuperstepStats, aggregators: &Aggregators) -> Decision {
        (**self).on_superstep_end(stats, aggregators)
    }
}
