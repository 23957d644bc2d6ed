/*
 * SPDX-FileCopyrightText: 2025 Inria
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 * SPDX-FileCopyrightText: 2026 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

/// Granularity of parallel tasks, specified by vertices or by edges.
///
/// The [engine](crate::bsp::Engine) hands vertices to Rayon in tasks of
/// at least a given number of vertices. Since the cost of computing a vertex
/// is usually proportional to its degree, it is sometimes more natural to
/// express the size of a task as a number of edges: the conversion between
/// the two specifications is performed by
/// [`vertex_granularity`](Self::vertex_granularity) using the current
/// average degree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    /// Each task is formed by the specified number of vertices.
    Vertices(usize),
    /// Each task is formed by a number of vertices whose sum of degrees is,
    /// tentatively, the specified number of edges.
    Edges(u64),
}

impl core::default::Default for Granularity {
    /// Returns a default granularity of 1000 vertices.
    fn default() -> Self {
        Self::Vertices(1000)
    }
}

impl Granularity {
    /// Returns the number of vertices per task for a graph with the given
    /// number of vertices and edges.
    ///
    /// The result is always at least one.
    pub fn vertex_granularity(&self, num_vertices: usize, num_edges: usize) -> usize {
        match self {
            Self::Vertices(n) => (*n).max(1),
            Self::Edges(n) => {
                let average_degree = num_edges as f64 / num_vertices.max(1) as f64;
                if average_degree == 0.0 {
                    return num_vertices.max(1);
                }
                (*n as f64 / average_degree)
                    .min(usize::MAX as f64)
                    .ceil()
                    .max(1.0) as usize
            }
        }
    }
}
