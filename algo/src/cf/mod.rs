/*
 * SPDX-FileCopyrightText: 2026 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Collaborative filtering by matrix factorization.
//!
//! Ratings are represented as a bipartite graph whose vertices are users and
//! items. Each vertex holds a latent vector of fixed size *K*, and the rating
//! of user *u* for item *i* is predicted from the latent vectors **p**ᵤ and
//! **q**ᵢ (for [ALS](als) and [SGD](sgd), as the dot product **p**ᵤ ·
//! **q**ᵢ clamped to [[`MIN_RATING`](math::MIN_RATING) . .
//! [`MAX_RATING`](math::MAX_RATING)]; [SVD++](svdpp) adds biases and
//! implicit feedback).
//!
//! The factorization is a [vertex program](CfProgram) for the
//! [BSP engine](cfgraph::bsp::Engine): at each superstep, vertices that
//! received the factors of their neighbors update their own factors using
//! an [`UpdateStrategy`] and send the result back, so users and items update
//! alternately. Vertices stop sending when their [halting
//! factor](HaltFactor) drops below the [tolerance](Config::tolerance) or
//! when the number of [iterations](Config::iterations) is exhausted; the
//! [controller](RmseController) can moreover stop the whole computation
//! when the global RMSE drops below the tolerance.
//!
//! The simplest way to use this module is through [`Factorization`], which
//! builds the graph from rating triples and runs the program.

pub mod als;
pub mod math;
pub mod sgd;
pub mod svdpp;

mod config;
pub use config::*;

mod controller;
pub use controller::*;

mod error;
pub use error::*;

mod factorization;
pub use factorization::*;

mod id;
pub use id::*;

mod message;
pub use message::*;

mod program;
pub use program::*;

mod state;
pub use state::*;

mod strategy;
pub use strategy::*;
