//! Mixed-radix enumeration of the parameter space.
//!
//! [`Combinations`] walks every index vector of a set of axes exactly
//! once, like an odometer whose wheel `i` has `cardinalities[i]` digits.
//! Axis 0 is the fastest-turning wheel:
//!
//! ```text
//! (2, 3) -> (0,0) (1,0) (0,1) (1,1) (0,2) (1,2)
//! ```
//!
//! The iterator is lazy and owns its state, so two enumerations never
//! interfere. Restarting means building a fresh one.

use std::iter::FusedIterator;

use crate::types::Combination;

/// Lazy odometer over per-axis value indices.
#[derive(Debug, Clone)]
pub struct Combinations {
    cardinalities: Vec<usize>,
    /// Next index vector to yield, or `None` once the carry has run off
    /// the last axis.
    current: Option<Vec<usize>>,
    /// Combinations not yet yielded, or `None` if the count overflows.
    remaining: Option<usize>,
}

impl Combinations {
    /// Start an enumeration over axes with the given cardinalities.
    ///
    /// Any zero cardinality makes the product empty: the iterator is
    /// exhausted immediately. An empty slice has exactly one
    /// combination (the empty index vector).
    ///
    /// If the product of cardinalities does not fit in `usize` the
    /// iterator still enumerates correctly but its
    /// [`size_hint`](Iterator::size_hint) has no upper bound;
    /// descriptors reject such spaces before enumerating.
    #[must_use]
    pub fn new(cardinalities: &[usize]) -> Self {
        let remaining = total_combinations(cardinalities);
        let current = (remaining != Some(0)).then(|| vec![0; cardinalities.len()]);
        Self {
            cardinalities: cardinalities.to_vec(),
            current,
            remaining,
        }
    }

    /// Returns `true` if another combination is available.
    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.current.is_some()
    }

    /// Step the odometer by one. Returns `false` once exhausted.
    fn advance(&mut self) -> bool {
        let Some(indices) = self.current.as_mut() else {
            return false;
        };

        for (index, &cardinality) in indices.iter_mut().zip(&self.cardinalities) {
            *index += 1;
            if *index < cardinality {
                return true;
            }
            // Overflow on this wheel: reset and carry into the next.
            *index = 0;
        }

        // Carry propagated past the last axis.
        self.current = None;
        false
    }
}

impl Iterator for Combinations {
    type Item = Combination;

    fn next(&mut self) -> Option<Self::Item> {
        let combination = Combination::new(self.current.clone()?);
        self.advance();
        self.remaining = self.remaining.map(|n| n.saturating_sub(1));
        Some(combination)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match (&self.current, self.remaining) {
            (None, _) => (0, Some(0)),
            (Some(_), Some(n)) => (n, Some(n)),
            (Some(_), None) => (usize::MAX, None),
        }
    }
}

impl FusedIterator for Combinations {}

/// Product of all cardinalities, or `None` on overflow.
///
/// Returns `Some(0)` if any axis is empty and `Some(1)` for no axes.
#[must_use]
pub fn total_combinations(cardinalities: &[usize]) -> Option<usize> {
    cardinalities
        .iter()
        .try_fold(1_usize, |acc, &c| acc.checked_mul(c))
}
