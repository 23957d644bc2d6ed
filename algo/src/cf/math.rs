/*
 * SPDX-FileCopyrightText: 2026 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Numerical helpers shared by all update strategies.

use nalgebra::DVector;

/// The smallest predicted rating.
pub const MIN_RATING: f64 = 0.0;
/// The largest predicted rating.
pub const MAX_RATING: f64 = 5.0;

/// Clamps a predicted rating to [[`MIN_RATING`] . . [`MAX_RATING`]].
///
/// NaN predictions are mapped to [`MIN_RATING`].
#[inline(always)]
pub fn clamp_rating(predicted: f64) -> f64 {
    if predicted.is_nan() {
        MIN_RATING
    } else {
        predicted.clamp(MIN_RATING, MAX_RATING)
    }
}

/// Returns the rating predicted by the dot product of two latent vectors.
#[inline(always)]
pub fn predict(a: &DVector<f64>, b: &DVector<f64>) -> f64 {
    clamp_rating(a.dot(b))
}

/// Returns the prediction error.
///
/// Observed ratings are not clamped.
#[inline(always)]
pub fn error(predicted: f64, observed: f64) -> f64 {
    predicted - observed
}

/// Rounds to the given number of decimal places.
pub fn round(x: f64, decimals: i32) -> f64 {
    let scale = 10_f64.powi(decimals);
    (x * scale).round() / scale
}

/// Returns the deterministic initial latent vector of the vertex with the
/// given index: the *i*-th coordinate is ((*index* + *i*) mod 100) / 100.
pub fn initial_vector(index: u64, len: usize) -> DVector<f64> {
    DVector::from_fn(len, |i, _| ((index % 100 + i as u64 % 100) % 100) as f64 / 100.0)
}

/// Returns the deterministic initial bias of the vertex with the given index.
pub fn initial_bias(index: u64) -> f64 {
    (index % 100) as f64 / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_clamp() {
        let mut rng = SmallRng::seed_from_u64(0);
        for _ in 0..1000 {
            let scale = 10_f64.powi(rng.random_range(-3..6));
            let a = DVector::from_fn(4, |_, _| rng.random_range(-1.0..1.0) * scale);
            let b = DVector::from_fn(4, |_, _| rng.random_range(-1.0..1.0) * scale);
            let p = predict(&a, &b);
            assert!((MIN_RATING..=MAX_RATING).contains(&p), "{p}");
        }
        assert_eq!(clamp_rating(f64::INFINITY), MAX_RATING);
        assert_eq!(clamp_rating(f64::NEG_INFINITY), MIN_RATING);
        assert_eq!(clamp_rating(f64::NAN), MIN_RATING);
    }

    #[test]
    fn test_error_does_not_clamp_observed() {
        assert_eq!(error(5.0, 7.5), -2.5);
        assert_eq!(error(0.0, -1.0), 1.0);
    }

    #[test]
    fn test_round() {
        assert_eq!(round(0.123456, 4), 0.1235);
        assert_eq!(round(-0.00004, 4), 0.0);
        assert_eq!(round(2.0, 4), 2.0);
    }

    #[test]
    fn test_initial_values() {
        assert_eq!(initial_vector(3, 2).as_slice(), &[0.03, 0.04]);
        assert_eq!(initial_vector(99, 3).as_slice(), &[0.99, 0.0, 0.01]);
        assert_eq!(initial_vector(u64::MAX, 1).as_slice(), &[0.15]);
        assert_eq!(initial_bias(142), 0.42);
    }
}
