/*
 * SPDX-FileCopyrightText: 2026 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Stochastic gradient descent.

use nalgebra::DVector;

/// Returns the latent vector `v` after a gradient step against the neighbor
/// vector `n`:
///
/// > **v** − γ (λ **v** + *err* **n**),
///
/// where *err* is the prediction error computed before the update.
pub fn update(v: &DVector<f64>, n: &DVector<f64>, err: f64, lambda: f64, gamma: f64) -> DVector<f64> {
    v - (v * lambda + n * err) * gamma
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: &DVector<f64>, expected: &[f64]) {
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1E-9, "{actual} != {expected:?}");
        }
    }

    #[test]
    fn test_update() {
        let user = DVector::from_vec(vec![0.1, 0.2, 0.3]);
        let item = DVector::from_vec(vec![0.2, 0.1, 0.4]);
        // The prediction is too low, so the vector moves towards the item
        assert_close(
            &update(&user, &item, -1.0, 0.01, 0.005),
            &[0.100995, 0.20049, 0.301985],
        );
        assert_close(
            &update(&user, &item, 1.0, 0.01, 0.005),
            &[0.098995, 0.19949, 0.297985],
        );
    }

    #[test]
    fn test_zero_error() {
        let v = DVector::from_vec(vec![0.5, -1.0]);
        let n = DVector::from_vec(vec![3.0, 4.0]);
        // Only the regularization term is left
        assert_close(&update(&v, &n, 0.0, 0.1, 0.5), &[0.475, -0.95]);
        // Without regularization, nothing changes
        assert_eq!(update(&v, &n, 0.0, 0.0, 0.5), v);
    }
}
