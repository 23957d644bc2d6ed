/*
 * SPDX-FileCopyrightText: 2026 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use super::{Aggregators, Context, Outbox, Totals, Vertex};
use crate::traits::{Controller, Decision, VertexProgram};
use crate::utils::Granularity;
use dsi_progress_logger::{ConcurrentProgressLog, ProgressLog, no_logging};
use rayon::prelude::*;
use std::collections::HashMap;

/// Statistics about a superstep, passed to the
/// [controller](crate::traits::Controller) after the barrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SuperstepStats {
    /// The superstep that just ended.
    pub superstep: usize,
    /// The number of vertices that have been computed.
    pub active_vertices: usize,
    /// The number of messages sent (and delivered at the next superstep).
    pub messages_sent: usize,
    /// The number of vertices created because of messages sent to unknown
    /// identifiers.
    pub created_vertices: usize,
    /// The size of the graph after the barrier.
    pub totals: Totals,
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Termination {
    /// All vertices voted to halt and no message was pending.
    Quiescent,
    /// The controller issued a global halt.
    Halted,
}

/// The outcome of [`Engine::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RunSummary {
    /// The number of supersteps executed so far by the engine.
    pub supersteps: usize,
    pub termination: Termination,
}

/// A parallel, in-memory BSP engine.
///
/// The engine owns the vertices of the graph and executes a
/// [`VertexProgram`] superstep by superstep. Within a superstep, active
/// vertices are computed in parallel on the current Rayon thread pool; each
/// vertex is owned by exactly one task, so no locking is involved. At the
/// barrier:
///
/// 1. messages are routed to the inboxes of their targets, creating with a
///    default value the targets that do not exist yet;
/// 2. contributions to aggregators are reduced into the
///    [aggregators](Aggregators);
/// 3. the number of vertices and edges is updated;
/// 4. the [`Controller`] decides whether to continue.
///
/// A vertex is active if it has not voted to halt or if it has received
/// messages; the computation ends when there are no active vertices, or when
/// the controller issues a [global halt](Decision::HaltAll).
///
/// # Examples
///
/// Propagating the maximum identifier along a path:
///
/// ```
/// use cfgraph::prelude::*;
///
/// struct MaxId;
///
/// impl VertexProgram for MaxId {
///     type Id = usize;
///     type Value = usize;
///     type EdgeValue = ();
///     type Message = usize;
///     type Error = std::convert::Infallible;
///
///     fn compute(
///         &self,
///         ctx: &mut Context<'_, usize, usize>,
///         vertex: &mut Vertex<usize, usize, ()>,
///         messages: Vec<usize>,
///     ) -> Result<(), Self::Error> {
///         let id = *vertex.id();
///         let max = messages.into_iter().fold(id, usize::max);
///         if ctx.superstep() == 0 || max > *vertex.value() {
///             *vertex.value_mut() = max;
///             ctx.send_to_all_edges(vertex, max);
///         }
///         vertex.vote_to_halt();
///         Ok(())
///     }
/// }
///
/// let mut engine = Engine::<MaxId>::new();
/// for i in 0..4 {
///     engine.add_edge(i + 1, i, ());
/// }
/// let summary = engine.run(&MaxId, Quiescence).unwrap();
/// assert_eq!(summary.termination, Termination::Quiescent);
/// assert!(engine.vertices().iter().all(|v| *v.value() == 4));
/// ```
pub struct Engine<P: VertexProgram> {
    vertices: Vec<Vertex<P::Id, P::Value, P::EdgeValue>>,
    index: HashMap<P::Id, usize>,
    inboxes: Vec<Vec<P::Message>>,
    aggregators: Aggregators,
    totals: Totals,
    superstep: usize,
    granularity: Granularity,
}

impl<P: VertexProgram> std::fmt::Debug for Engine<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("totals", &self.totals)
            .field("superstep", &self.superstep)
            .field("granularity", &self.granularity)
            .field("aggregators", &self.aggregators)
            .finish_non_exhaustive()
    }
}

impl<P: VertexProgram> Default for Engine<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: VertexProgram> Engine<P> {
    /// Creates an engine with an empty graph.
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            index: HashMap::new(),
            inboxes: Vec::new(),
            aggregators: Aggregators::new(),
            totals: Totals::default(),
            superstep: 0,
            granularity: Granularity::default(),
        }
    }

    /// Creates an engine whose graph contains the given edges.
    ///
    /// Only the sources of the edges are created: targets will be created
    /// when they receive their first message.
    pub fn from_edges(edges: impl IntoIterator<Item = (P::Id, P::Id, P::EdgeValue)>) -> Self {
        let mut engine = Self::new();
        for (source, target, value) in edges {
            engine.add_edge(source, target, value);
        }
        engine
    }

    /// Sets the parallel task granularity.
    pub fn granularity(&mut self, granularity: Granularity) -> &mut Self {
        self.granularity = granularity;
        self
    }

    /// Adds a vertex with the given value, or replaces the value of an
    /// existing vertex.
    pub fn add_vertex(&mut self, id: P::Id, value: P::Value) -> &mut Self {
        let pos = self.position_or_insert(id);
        *self.vertices[pos].value_mut() = value;
        self.totals.num_vertices = self.vertices.len();
        self
    }

    /// Adds an edge, creating its source with a default value if necessary.
    ///
    /// Adding an edge that already exists replaces its value.
    pub fn add_edge(&mut self, source: P::Id, target: P::Id, value: P::EdgeValue) -> &mut Self {
        let pos = self.position_or_insert(source);
        if self.vertices[pos].add_edge(target, value).is_none() {
            self.totals.num_edges += 1;
        }
        self.totals.num_vertices = self.vertices.len();
        self
    }

    fn position_or_insert(&mut self, id: P::Id) -> usize {
        if let Some(&pos) = self.index.get(&id) {
            return pos;
        }
        let pos = self.vertices.len();
        self.index.insert(id.clone(), pos);
        self.vertices.push(Vertex::new(id, P::Value::default()));
        self.inboxes.push(Vec::new());
        pos
    }

    /// Returns the vertex with the given identifier, if any.
    pub fn vertex(&self, id: &P::Id) -> Option<&Vertex<P::Id, P::Value, P::EdgeValue>> {
        self.index.get(id).map(|&pos| &self.vertices[pos])
    }

    /// Returns the vertices in creation order.
    pub fn vertices(&self) -> &[Vertex<P::Id, P::Value, P::EdgeValue>] {
        &self.vertices
    }

    /// Consumes the engine, returning its vertices in creation order.
    pub fn into_vertices(self) -> Vec<Vertex<P::Id, P::Value, P::EdgeValue>> {
        self.vertices
    }

    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Returns the number of edges at the last barrier (or after the last
    /// insertion, if no superstep has been executed).
    pub fn num_edges(&self) -> usize {
        self.totals.num_edges
    }

    pub fn aggregators(&self) -> &Aggregators {
        &self.aggregators
    }

    /// Returns the number of the next superstep to be executed.
    pub fn superstep(&self) -> usize {
        self.superstep
    }

    /// Returns whether some vertex is active or some message is pending.
    pub fn has_work(&self) -> bool {
        self.inboxes.par_iter().any(|inbox| !inbox.is_empty())
            || self.vertices.par_iter().any(|vertex| !vertex.is_halted())
    }

    /// Runs the program until no vertex is active or the controller issues a
    /// global halt.
    pub fn run(
        &mut self,
        program: &P,
        controller: impl Controller,
    ) -> Result<RunSummary, P::Error> {
        self.run_with_logging(program, controller, no_logging![], no_logging![])
    }

    /// Runs the program until no vertex is active or the controller issues a
    /// global halt, logging progress.
    ///
    /// `pl` counts supersteps, whereas `cpl` counts vertices within each
    /// superstep.
    ///
    /// # Errors
    ///
    /// The first error returned by [`VertexProgram::compute`] aborts the run;
    /// the state of the engine is then the one described in
    /// [`step`](Engine::step).
    pub fn run_with_logging(
        &mut self,
        program: &P,
        mut controller: impl Controller,
        pl: &mut impl ProgressLog,
        cpl: &mut impl ConcurrentProgressLog,
    ) -> Result<RunSummary, P::Error> {
        controller.initialize(&mut self.aggregators);

        log::info!(
            "Starting from superstep {} with {} vertices and {} edges",
            self.superstep,
            self.totals.num_vertices,
            self.totals.num_edges
        );

        pl.item_name("superstep");
        pl.expected_updates(None);
        pl.start("Running supersteps...");

        let termination = loop {
            if !self.has_work() {
                break Termination::Quiescent;
            }

            let stats = self.step(program, cpl)?;
            log::info!(
                "Superstep {}: {} active vertices, {} messages, {} vertices, {} edges",
                stats.superstep,
                stats.active_vertices,
                stats.messages_sent,
                stats.totals.num_vertices,
                stats.totals.num_edges
            );
            pl.update_and_display();

            if controller.on_superstep_end(&stats, &self.aggregators) == Decision::HaltAll {
                log::info!("Global halt after superstep {}", stats.superstep);
                break Termination::Halted;
            }
        };

        pl.done();

        Ok(RunSummary {
            supersteps: self.superstep,
            termination,
        })
    }

    /// Executes a single superstep, including the barrier, without consulting
    /// a controller.
    ///
    /// # Errors
    ///
    /// If [`VertexProgram::compute`] fails for some vertex, the error is
    /// returned and the barrier is not executed: the superstep counter and
    /// the aggregators are unchanged, the messages delivered to this
    /// superstep and those sent during it are discarded, and the values of
    /// the vertices computed before the failure keep their changes. The
    /// engine remains usable, but the computation cannot be resumed from
    /// where it failed.
    pub fn step(
        &mut self,
        program: &P,
        cpl: &mut impl ConcurrentProgressLog,
    ) -> Result<SuperstepStats, P::Error> {
        let superstep = self.superstep;
        let totals = self.totals;
        let num_vertices = self.vertices.len();
        let vertex_granularity = self
            .granularity
            .vertex_granularity(num_vertices, totals.num_edges);

        let mut inboxes = std::mem::take(&mut self.inboxes);
        inboxes.resize_with(num_vertices, Vec::new);
        let aggregators = &self.aggregators;

        cpl.item_name("vertex");
        cpl.expected_updates(Some(num_vertices));
        cpl.start(format!("Superstep {superstep}..."));

        let outbox = self
            .vertices
            .par_iter_mut()
            .zip(inboxes.into_par_iter())
            .with_min_len(vertex_granularity)
            .map_init(
                || cpl.clone(),
                |cpl, (vertex, messages)| {
                    let mut outbox = Outbox::default();
                    if !messages.is_empty() {
                        vertex.wake_up();
                    }
                    if !vertex.is_halted() {
                        outbox.active = 1;
                        let mut ctx = Context::new(superstep, totals, aggregators, &mut outbox);
                        program.compute(&mut ctx, vertex, messages)?;
                    }
                    cpl.light_update();
                    Ok::<_, P::Error>(outbox)
                },
            )
            .try_reduce(Outbox::default, |a, b| Ok(a.merge(b)));

        cpl.done();
        // The inboxes have been consumed, even on failure
        self.inboxes.resize_with(num_vertices, Vec::new);
        let Outbox {
            messages,
            contributions,
            active,
        } = outbox?;

        // Barrier: route messages for the next superstep
        let messages_sent = messages.len();
        for (target, message) in messages {
            let pos = self.position_or_insert(target);
            self.inboxes[pos].push(message);
        }
        let created_vertices = self.vertices.len() - num_vertices;

        self.aggregators.apply(contributions);
        self.totals = Totals {
            num_vertices: self.vertices.len(),
            num_edges: self.vertices.par_iter().map(|v| v.num_edges()).sum(),
        };
        self.superstep += 1;

        Ok(SuperstepStats {
            superstep,
            active_vertices: active,
            messages_sent,
            created_vertices,
            totals: self.totals,
        })
    }
}
