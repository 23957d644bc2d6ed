/*
 * SPDX-FileCopyrightText: 2026 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Biased factorization with implicit feedback (SVD++).
//!
//! The rating of user *u* for item *i* is predicted as
//!
//! > μ + *b*ᵤ + *b*ᵢ + **q**ᵢ · (**p**ᵤ + |*N*(*u*)|^−½ Σⱼ **y**ⱼ),
//!
//! where μ is the global average rating, *b*ᵤ and *b*ᵢ are the biases of
//! the user and of the item, **p**ᵤ and **q**ᵢ their latent vectors,
//! *N*(*u*) is the set of items rated by *u*, and **y**ⱼ is the implicit
//! term of item *j*. The functions of this module take the sum μ + *b*ᵤ +
//! *b*ᵢ as a single `baseline` argument.
//!
//! The update functions take as *err* the residual, that is, the observed
//! rating minus the predicted one: with this sign each step reduces the
//! squared prediction error.

use super::math;
use nalgebra::DVector;

/// Returns |*N*(*u*)|^−½, or zero if the user has no ratings.
#[inline(always)]
fn normalization(num_ratings: usize) -> f64 {
    if num_ratings == 0 {
        0.0
    } else {
        1.0 / (num_ratings as f64).sqrt()
    }
}

/// Returns the user vector augmented with the normalized implicit sum,
/// **p**ᵤ + |*N*(*u*)|^−½ Σⱼ **y**ⱼ.
pub fn augmented_user(user: &DVector<f64>, implicit_sum: &DVector<f64>, num_ratings: usize) -> DVector<f64> {
    user + implicit_sum * normalization(num_ratings)
}

/// Predicts a rating, clamping it to the valid range.
pub fn predict(
    baseline: f64,
    user: &DVector<f64>,
    item: &DVector<f64>,
    num_ratings: usize,
    implicit_sum: &DVector<f64>,
) -> f64 {
    math::clamp_rating(baseline + item.dot(&augmented_user(user, implicit_sum, num_ratings)))
}

/// Returns the updated bias *b* + γ (*err* − λ *b*).
pub fn update_baseline(bias: f64, err: f64, gamma: f64, lambda: f64) -> f64 {
    bias + gamma * (err - lambda * bias)
}

/// Returns the updated user vector **p**ᵤ + γ (*err* **q**ᵢ − λ **p**ᵤ).
pub fn update_user(user: &DVector<f64>, item: &DVector<f64>, err: f64, gamma: f64, lambda: f64) -> DVector<f64> {
    user + (item * err - user * lambda) * gamma
}

/// Returns the updated item vector
/// **q**ᵢ + γ (*err* (**p**ᵤ + |*N*(*u*)|^−½ Σⱼ **y**ⱼ) − λ **q**ᵢ).
pub fn update_item(
    item: &DVector<f64>,
    user: &DVector<f64>,
    implicit_sum: &DVector<f64>,
    err: f64,
    num_ratings: usize,
    gamma: f64,
    lambda: f64,
) -> DVector<f64> {
    item + (augmented_user(user, implicit_sum, num_ratings) * err - item * lambda) * gamma
}

/// Returns the updated implicit term
/// **y**ᵢ + γ (*err* |*N*(*u*)|^−½ **q**ᵢ − λ **y**ᵢ).
pub fn update_implicit(
    implicit: &DVector<f64>,
    item: &DVector<f64>,
    err: f64,
    num_ratings: usize,
    gamma: f64,
    lambda: f64,
) -> DVector<f64> {
    implicit + (item * (err * normalization(num_ratings)) - implicit * lambda) * gamma
}

#[cfg(test)]
mod tests {
    use super::*;

    const LAMBDA: f64 = 0.01;
    const GAMMA: f64 = 0.005;

    fn assert_close(actual: &DVector<f64>, expected: &[f64], eps: f64) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < eps, "{actual} != {expected:?}");
        }
    }

    fn user() -> DVector<f64> {
        DVector::from_vec(vec![0.1, 0.2, 0.3])
    }

    fn item() -> DVector<f64> {
        DVector::from_vec(vec![0.2, 0.1, 0.4])
    }

    #[test]
    fn test_user_update() {
        assert_close(
            &update_user(&user(), &item(), 1.0, GAMMA, LAMBDA),
            &[0.100995, 0.20049, 0.301985],
            1E-6,
        );
    }

    #[test]
    fn test_item_update() {
        let weights = DVector::from_vec(vec![0.4, 0.6, 0.8]);
        assert_close(
            &update_item(&item(), &user(), &weights, 1.0, 10, GAMMA, LAMBDA),
            &[0.201122455532034, 0.101943683298051, 0.402744911064067],
            1E-6,
        );
    }

    #[test]
    fn test_implicit_update() {
        let weight = DVector::from_vec(vec![0.1, 0.2, 0.3]);
        assert_close(
            &update_implicit(&weight, &item(), 1.0, 10, GAMMA, LAMBDA),
            &[0.100311227766017, 0.200148113883008, 0.300617455532034],
            1E-6,
        );
    }

    #[test]
    fn test_baseline_update() {
        let predicted = 4.0;
        let observed = 3.0;
        let bias = update_baseline(0.5, math::error(predicted, observed), GAMMA, LAMBDA);
        assert!((bias - 0.50475).abs() < 1E-3, "{bias}");
    }

    #[test]
    fn test_predict() {
        let weights = DVector::from_vec(vec![0.4, 0.6, 0.8]);
        let prediction = predict(0.5, &user(), &item(), 10, &weights);
        assert!((prediction - 0.805464772367745).abs() < 1E-6, "{prediction}");

        // Huge biases are clamped
        assert_eq!(predict(100.0, &user(), &item(), 10, &weights), math::MAX_RATING);
        assert_eq!(predict(-100.0, &user(), &item(), 10, &weights), math::MIN_RATING);
        // No ratings, no implicit contribution
        let p = predict(0.0, &user(), &item(), 0, &weights);
        assert!((p - user().dot(&item())).abs() < 1E-12);
    }

    #[test]
    fn test_zero_error() {
        // With zero error, only the regularization terms are left
        let shrunk: Vec<f64> = user().iter().map(|x| x - GAMMA * LAMBDA * x).collect();
        assert_close(&update_user(&user(), &item(), 0.0, GAMMA, LAMBDA), &shrunk, 1E-15);
        assert_eq!(update_user(&user(), &item(), 0.0, GAMMA, 0.0), user());
        assert_eq!(update_baseline(0.5, 0.0, GAMMA, 0.0), 0.5);
        assert!((update_baseline(0.5, 0.0, GAMMA, LAMBDA) - (0.5 - GAMMA * LAMBDA * 0.5)).abs() < 1E-15);
        let weights = DVector::from_vec(vec![0.4, 0.6, 0.8]);
        assert_eq!(update_implicit(&weights, &item(), 0.0, 10, GAMMA, 0.0), weights);
    }
}
