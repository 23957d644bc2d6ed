/*
 * SPDX-FileCopyrightText: 2026 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use std::fmt::Display;
use std::str::FromStr;
use thiserror::Error;

/// The two sides of a rating graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Kind {
    #[default]
    User,
    Item,
}

impl Kind {
    /// Returns the prefix used in the textual form of identifiers.
    pub fn prefix(&self) -> &'static str {
        match self {
            Kind::User => "u_",
            Kind::Item => "i_",
        }
    }

    /// Returns the other side of the graph.
    pub fn opposite(&self) -> Self {
        match self {
            Kind::User => Kind::Item,
            Kind::Item => Kind::User,
        }
    }
}

impl Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Kind::User => f.write_str("user"),
            Kind::Item => f.write_str("item"),
        }
    }
}

/// The identifier of a vertex: a [kind](Kind) and a numeric index.
///
/// The textual form is `u_`*index* for users and `i_`*index* for items. The
/// index also seeds the deterministic initialization of the latent factors
/// of the vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VertexId {
    kind: Kind,
    index: u64,
}

impl VertexId {
    pub fn new(kind: Kind, index: u64) -> Self {
        Self { kind, index }
    }

    pub fn user(index: u64) -> Self {
        Self::new(Kind::User, index)
    }

    pub fn item(index: u64) -> Self {
        Self::new(Kind::Item, index)
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn index(&self) -> u64 {
        self.index
    }
}

impl Display for VertexId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.kind.prefix(), self.index)
    }
}

/// The error returned when parsing a malformed [`VertexId`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid vertex identifier {0:?}: expected u_<index> or i_<index>")]
pub struct ParseVertexIdError(String);

impl FromStr for VertexId {
    type Err = ParseVertexIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseVertexIdError(s.to_owned());
        let (kind, index) = if let Some(index) = s.strip_prefix(Kind::User.prefix()) {
            (Kind::User, index)
        } else if let Some(index) = s.strip_prefix(Kind::Item.prefix()) {
            (Kind::Item, index)
        } else {
            return Err(err());
        };
        let index = index.parse::<u64>().map_err(|_| err())?;
        Ok(Self { kind, index })
    }
}
