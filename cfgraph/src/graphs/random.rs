/*
 * SPDX-FileCopyrightText: 2026 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use rand::{Rng, SeedableRng, rngs::SmallRng};

/// Random bipartite rating graphs.
///
/// Each of the `num_users` × `num_items` possible ratings is present
/// independently with probability `density`, and its value is an integer
/// in [1 . . 5] chosen uniformly at random. Users and items are numbered
/// from zero.
///
/// The sequence of ratings depends only on the parameters, so iterating twice
/// yields the same ratings.
#[derive(Debug, Clone)]
pub struct RandomRatings {
    num_users: usize,
    num_items: usize,
    density: f64,
    seed: u64,
}

impl RandomRatings {
    /// Creates a new random rating graph, given the number of users and
    /// items, the probability of a rating, and a seed for the [pseudorandom
    /// number generator](SmallRng).
    ///
    /// # Panics
    ///
    /// Panics if `density` is not in [0 . . 1].
    pub fn new(num_users: usize, num_items: usize, density: f64, seed: u64) -> Self {
        assert!(
            (0.0..=1.0).contains(&density),
            "The density must be in [0 . . 1], got {density}"
        );
        Self {
            num_users,
            num_items,
            density,
            seed,
        }
    }

    pub fn num_users(&self) -> usize {
        self.num_users
    }

    pub fn num_items(&self) -> usize {
        self.num_items
    }

    /// Returns an iterator over the ratings, as triples (user, item, rating)
    /// in lexicographical order.
    pub fn iter(&self) -> Iter {
        Iter {
            rng: SmallRng::seed_from_u64(self.seed),
            num_users: self.num_users,
            num_items: self.num_items,
            density: self.density,
            user: 0,
            item: 0,
        }
    }
}

impl<'a> IntoIterator for &'a RandomRatings {
    type Item = (usize, usize, f64);
    type IntoIter = Iter;

    fn into_iter(self) -> Iter {
        self.iter()
    }
}

#[derive(Debug, Clone)]
pub struct Iter {
    rng: SmallRng,
    num_users: usize,
    num_items: usize,
    density: f64,
    user: usize,
    item: usize,
}

impl Iterator for Iter {
    type Item = (usize, usize, f64);

    fn next(&mut self) -> Option<Self::Item> {
        if self.num_items == 0 {
            return None;
        }
        while self.user < self.num_users {
            let (user, item) = (self.user, self.item);
            self.item += 1;
            if self.item == self.num_items {
                self.item = 0;
                self.user += 1;
            }
            if self.rng.random_bool(self.density) {
                let rating = self.rng.random_range(1..=5_u8);
                return Some((user, item, rating as f64));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic() {
        let g = RandomRatings::new(20, 30, 0.2, 0);
        let a: Vec<_> = g.iter().collect();
        let b: Vec<_> = g.iter().collect();
        assert_eq!(a, b);
        assert!(!a.is_empty());
        for &(u, i, r) in &a {
            assert!(u < 20);
            assert!(i < 30);
            assert!((1.0..=5.0).contains(&r));
            assert_eq!(r.fract(), 0.0);
        }
    }

    #[test]
    fn test_extremes() {
        assert_eq!(RandomRatings::new(10, 10, 0.0, 0).iter().count(), 0);
        assert_eq!(RandomRatings::new(10, 10, 1.0, 0).iter().count(), 100);
        assert_eq!(RandomRatings::new(10, 0, 1.0, 0).iter().count(), 0);
        assert_eq!(RandomRatings::new(0, 10, 1.0, 0).iter().count(), 0);
    }

    #[test]
    #[should_panic]
    fn test_bad_density() {
        RandomRatings::new(1, 1, 1.5, 0);
    }
}
