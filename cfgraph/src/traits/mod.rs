/*
 * SPDX-FileCopyrightText: 2026 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! The two interfaces of a BSP computation.
//!
//! A [`VertexProgram`] is invoked once per active vertex per superstep; a
//! [`Controller`] (the _master_ of Pregel-like systems) is invoked once
//! per superstep, after the barrier, and can stop the whole computation.

mod program;
pub use program::*;
