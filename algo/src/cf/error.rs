/*
 * SPDX-FileCopyrightText: 2026 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use super::VertexId;
use thiserror::Error;

/// Violations of the message protocol.
///
/// All of them are fatal: they signal a setup bug (e.g., a non-bipartite
/// input or an inconsistent vector size) and abort the run at the end of
/// the superstep in which they are detected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CfError {
    #[error(
        "Vertex {vertex} received from {neighbor} a vector of length {found}, but the vector size is {expected}"
    )]
    VectorLength {
        vertex: VertexId,
        neighbor: VertexId,
        expected: usize,
        found: usize,
    },
    #[error("Vertex {vertex} received a message from {neighbor}, which is not one of its neighbors")]
    UnknownNeighbor { vertex: VertexId, neighbor: VertexId },
    #[error("Vertex {vertex} received a message from {neighbor}, which is on the same side of the graph")]
    NotBipartite { vertex: VertexId, neighbor: VertexId },
}
