/*
 * SPDX-FileCopyrightText: 2026 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Alternating least squares.
//!
//! Each vertex, given the latent vectors *M* = [**m**₁ … **m**ₙ] of its *n*
//! neighbors and the corresponding ratings **r**, replaces its latent vector
//! with the solution **u** of the regularized normal equations
//!
//! > (*M* *M*ᵀ + λ *n* *I*) **u** = *M* **r**,
//!
//! rounded to four decimal places. The system is solved through a QR
//! decomposition; for λ > 0 the ridge term makes the matrix positive
//! definite, with smallest eigenvalue at least λ *n*.

use super::math;
use nalgebra::{DMatrix, DVector};

/// The number of decimal places kept by ALS updates.
pub const DECIMALS: i32 = 4;

/// Returns the matrix and the right-hand side of the regularized normal
/// equations for the given neighbors, as pairs (latent vector, rating).
pub fn normal_equations(
    neighbors: &[(&DVector<f64>, f64)],
    lambda: f64,
    vector_size: usize,
) -> (DMatrix<f64>, DVector<f64>) {
    let n = neighbors.len();
    let m = DMatrix::from_fn(vector_size, n, |row, col| neighbors[col].0[row]);
    let r = DVector::from_iterator(n, neighbors.iter().map(|&(_, rating)| rating));
    let a = &m * m.transpose() + DMatrix::identity(vector_size, vector_size) * (lambda * n as f64);
    (a, m * r)
}

/// Solves the regularized normal equations, returning the new latent vector.
///
/// Returns `None` if there are no neighbors or if the system is singular
/// (which can happen only for λ = 0).
pub fn solve(
    neighbors: &[(&DVector<f64>, f64)],
    lambda: f64,
    vector_size: usize,
) -> Option<DVector<f64>> {
    if neighbors.is_empty() {
        return None;
    }
    let (a, b) = normal_equations(neighbors, lambda, vector_size);
    let u = a.qr().solve(&b)?;
    Some(u.map(|x| math::round(x, DECIMALS)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_no_neighbors() {
        assert_eq!(solve(&[], 0.01, 3), None);
    }

    #[test]
    fn test_single_neighbor() {
        // (m mᵀ + λ I) u = m r with m = (1, 0): u = (r / (1 + λ), 0)
        let m = DVector::from_vec(vec![1.0, 0.0]);
        let u = solve(&[(&m, 4.0)], 1.0, 2).unwrap();
        assert_eq!(u.as_slice(), &[2.0, 0.0]);
    }

    #[test]
    fn test_exact_fit() {
        // Without regularization, two independent neighbors determine u
        let m1 = DVector::from_vec(vec![1.0, 0.0]);
        let m2 = DVector::from_vec(vec![1.0, 1.0]);
        let u = solve(&[(&m1, 1.0), (&m2, 3.0)], 0.0, 2).unwrap();
        assert_eq!(u.as_slice(), &[1.0, 2.0]);
    }

    #[test]
    fn test_rounding() {
        let m = DVector::from_vec(vec![0.3, 0.7, 0.11]);
        let u = solve(&[(&m, 3.0)], 0.05, 3).unwrap();
        for &x in u.iter() {
            assert_eq!(x, math::round(x, DECIMALS));
        }
    }

    #[test]
    fn test_ridge_solvability() {
        let mut rng = SmallRng::seed_from_u64(0);
        for n in 1..20 {
            let lambda = rng.random_range(0.001..1.0);
            let vectors = (0..n)
                .map(|_| {
                    // Rank-deficient on purpose: the last coordinate is zero
                    DVector::from_fn(4, |i, _| if i == 3 { 0.0 } else { rng.random_range(-2.0..2.0) })
                })
                .collect::<Vec<_>>();
            let neighbors = vectors
                .iter()
                .map(|v| (v, rng.random_range(1.0..=5.0)))
                .collect::<Vec<_>>();
            let (a, _) = normal_equations(&neighbors, lambda, 4);
            let min_eigenvalue = a.symmetric_eigenvalues().min();
            assert!(
                min_eigenvalue >= lambda * n as f64 * (1.0 - 1E-9),
                "{min_eigenvalue} < {}",
                lambda * n as f64
            );
            assert!(solve(&neighbors, lambda, 4).is_some());
        }
    }
}
