/*
 * SPDX-FileCopyrightText: 2026 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! The bulk-synchronous parallel engine and the data it manipulates.

mod aggregators;
pub use aggregators::*;

mod context;
pub use context::{Context, Totals};
pub(crate) use context::Outbox;

mod engine;
pub use engine::*;

mod vertex;
pub use vertex::*;
