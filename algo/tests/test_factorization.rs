/*
 * SPDX-FileCopyrightText: 2026 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use anyhow::Result;
use cfgraph::prelude::*;
use cfgraph_algo::prelude::*;
use nalgebra::DVector;

fn ratings(num_users: usize, num_items: usize, density: f64, seed: u64) -> Vec<(u64, u64, f64)> {
    RandomRatings::new(num_users, num_items, density, seed)
        .iter()
        .map(|(u, i, r)| (u as u64, i as u64, r))
        .collect()
}

#[test]
fn test_aggregate_rmse_matches_reference() -> Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();
    let config = Config {
        vector_size: 3,
        iterations: 3,
        tolerance: 0.0,
        rmse_aggregator: true,
        ..Config::default()
    };
    let mut factorization =
        Factorization::from_ratings(UpdateStrategy::Als, config, ratings(30, 20, 0.3, 0))?;
    let summary = factorization.run(preds::MaxSupersteps::default())?;
    assert_eq!(summary.termination, Termination::Quiescent);
    assert_eq!(summary.supersteps, 4);

    // One value per superstep starting from superstep 1
    let history = factorization.rmse_history();
    assert_eq!(history.len(), 3);
    let reference = factorization.rmse();
    assert!(
        (history[2] - reference).abs() < 1E-9,
        "{} != {reference}",
        history[2]
    );
    Ok(())
}

#[test]
fn test_basic_iterations() -> Result<()> {
    let config = Config {
        iterations: 5,
        ..Config::default()
    };
    let data = ratings(10, 8, 0.5, 1);
    let mut factorization = Factorization::from_ratings(UpdateStrategy::Sgd, config, data.clone())?;
    let summary = factorization.run(preds::MaxSupersteps::default())?;
    assert_eq!(summary.termination, Termination::Quiescent);
    // Vertices stop sending at superstep 5
    assert_eq!(summary.supersteps, 6);
    assert!(factorization.rmse_history().is_empty());
    assert_eq!(factorization.num_ratings(), data.len());

    for vertex in factorization.vertices() {
        let state = vertex.value();
        // Users update at supersteps 2 and 4, items at 1, 3, and 5, once
        // per rating
        let rounds = match vertex.id().kind() {
            Kind::User => 2,
            Kind::Item => 3,
        };
        assert_eq!(state.update_count(), rounds * vertex.num_edges(), "{}", vertex.id());
        assert_eq!(state.latent().len(), 2);
    }
    Ok(())
}

#[test]
fn test_max_supersteps() -> Result<()> {
    let mut factorization = Factorization::from_ratings(
        UpdateStrategy::Als,
        Config::default(),
        ratings(10, 10, 0.5, 2),
    )?;
    let summary = factorization.run(preds::MaxSupersteps::from(3))?;
    assert_eq!(summary.termination, Termination::Halted);
    assert_eq!(summary.supersteps, 3);
    Ok(())
}

#[test]
fn test_global_halt() -> Result<()> {
    let config = Config {
        halt_factor: HaltFactor::Rmse,
        tolerance: 10.0,
        ..Config::default()
    };
    let mut factorization =
        Factorization::from_ratings(UpdateStrategy::Als, config, ratings(10, 10, 0.5, 3))?;
    let summary = factorization.run(preds::MaxSupersteps::default())?;
    // Ratings are at most 5, so the RMSE is below 10 after the first update
    assert_eq!(summary.termination, Termination::Halted);
    assert_eq!(summary.supersteps, 2);
    assert_eq!(factorization.rmse_history().len(), 1);
    Ok(())
}

#[test]
fn test_l2norm() -> Result<()> {
    let config = Config {
        halt_factor: HaltFactor::L2Norm,
        tolerance: 1.0,
        ..Config::default()
    };
    let mut factorization =
        Factorization::from_ratings(UpdateStrategy::Sgd, config, ratings(10, 10, 0.5, 4))?;
    let summary = factorization.run(preds::MaxSupersteps::default())?;
    // A single gradient round moves items much less than the tolerance
    assert_eq!(summary.termination, Termination::Quiescent);
    assert_eq!(summary.supersteps, 2);
    for vertex in factorization.vertices() {
        let state = vertex.value();
        match vertex.id().kind() {
            Kind::User => assert_eq!(state.update_count(), 0),
            Kind::Item => {
                assert_eq!(state.halt_factor(), state.l2_distance());
                assert!(state.halt_factor() > 0.0 && state.halt_factor() < 1.0);
            }
        }
    }
    Ok(())
}

#[test]
fn test_delta_caching_equivalence() -> Result<()> {
    let data = ratings(15, 12, 0.4, 5);
    let run = |delta_caching| -> Result<Factorization> {
        let config = Config {
            iterations: 6,
            delta_caching,
            ..Config::default()
        };
        let mut factorization = Factorization::from_ratings(UpdateStrategy::Sgd, config, data.clone())?;
        factorization.run(preds::MaxSupersteps::default())?;
        Ok(factorization)
    };
    let plain = run(false)?;
    let cached = run(true)?;
    for vertex in plain.vertices() {
        let other = cached.vertex(*vertex.id()).unwrap();
        assert_eq!(vertex.value().latent(), other.latent(), "{}", vertex.id());
        assert_eq!(vertex.value().update_count(), other.update_count());
        assert_eq!(vertex.value().cached_neighbors(), 0);
        assert_eq!(other.cached_neighbors(), vertex.num_edges());
    }
    Ok(())
}

#[test]
fn test_svdpp_global_average() -> Result<()> {
    let config = Config {
        iterations: 1,
        ..Config::default()
    };
    let mut factorization = Factorization::from_ratings(UpdateStrategy::Svdpp, config.clone(), [(0, 0, 4.0)])?;
    factorization.run(preds::MaxSupersteps::default())?;
    assert_eq!(factorization.global_average(), 4.0);

    // The item has been updated once, at superstep 1, with the user factors
    // of superstep 0
    let p = DVector::from_vec(vec![0.0, 0.01]);
    let q = DVector::from_vec(vec![0.0, 0.01]);
    let zeros = DVector::zeros(2);
    let err = 4.0 - svdpp::predict(4.0, &p, &q, 1, &zeros);
    let item = factorization.vertex(VertexId::item(0)).unwrap();
    assert_eq!(item.update_count(), 1);
    assert_eq!(
        item.bias(),
        svdpp::update_baseline(0.0, err, config.gamma, config.lambda)
    );
    assert_eq!(
        item.latent(),
        &svdpp::update_item(&q, &p, &zeros, err, 1, config.gamma, config.lambda)
    );
    assert_eq!(
        item.implicit(),
        &svdpp::update_implicit(&q, &q, err, 1, config.gamma, config.lambda)
    );
    Ok(())
}

#[test]
fn test_svdpp() -> Result<()> {
    let config = Config {
        vector_size: 4,
        iterations: 6,
        rmse_aggregator: true,
        tolerance: 0.0,
        ..Config::default()
    };
    let mut factorization =
        Factorization::from_ratings(UpdateStrategy::Svdpp, config, ratings(20, 15, 0.3, 6))?;
    factorization.run(preds::MaxSupersteps::default())?;
    let history = factorization.rmse_history();
    assert_eq!(history.len(), 6);
    // Items update at odd supersteps and users at even ones, so only
    // values of the same parity are comparable; moreover, users receive the
    // first implicit terms at superstep 2, which shifts all predictions
    for i in 3..history.len() {
        assert!(history[i] < history[i - 2], "{history:?}");
    }

    for vertex in factorization.vertices() {
        let state = vertex.value();
        assert!(state.is_initialized());
        assert!(state.latent().norm() < 10.0, "{}", vertex.id());
        assert!(state.bias().abs() < 5.0, "{}", vertex.id());
        match vertex.id().kind() {
            Kind::User => {
                assert_eq!(state.implicit().len(), 0);
                // Users have received the implicit terms of their items
                assert!(state.implicit_sum().iter().any(|&x| x != 0.0));
            }
            Kind::Item => assert_eq!(state.implicit().len(), 4),
        }
    }
    for (user, item, _) in ratings(20, 15, 0.3, 6) {
        let p = factorization.predict(user, item).unwrap();
        assert!((0.0..=5.0).contains(&p));
    }
    Ok(())
}

#[test]
fn test_observed_out_of_range() -> Result<()> {
    let config = Config {
        iterations: 1,
        ..Config::default()
    };
    let mut factorization = Factorization::from_ratings(UpdateStrategy::Sgd, config, [(1, 1, 7.5)])?;
    factorization.run(preds::MaxSupersteps::default())?;
    // The prediction is clamped, the observed rating is not
    let item = factorization.vertex(VertexId::item(1)).unwrap();
    assert!(item.halt_factor() < -2.5);
    Ok(())
}

#[test]
fn test_invalid_config() {
    let config = Config {
        vector_size: 0,
        ..Config::default()
    };
    assert!(Factorization::new(UpdateStrategy::Als, config).is_err());
}
