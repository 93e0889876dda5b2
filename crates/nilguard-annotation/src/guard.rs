//! Guard nonces and guard sets.
//!
//! A guard nonce identifies one conditional check site, such as the `ok`
//! of `v, ok := m[k]` or an `err != nil` test. Consume triggers collect
//! nonces as they are backpropagated across checks; a guard survives a
//! CFG join only if both branches carried it.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Opaque identifier of a single guarding check site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GuardNonce(u64);

/// Allocator for guard nonces.
///
/// Owned by the driver; the core only compares nonces, never mints them.
#[derive(Debug, Default)]
pub struct GuardNonceGenerator {
    next: AtomicU64,
}

impl GuardNonceGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a nonce never returned before by this generator.
    pub fn fresh(&self) -> GuardNonce {
        GuardNonce(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

/// A set of guard nonces with value semantics.
///
/// Every operation that grows a set returns a new one; shared triggers
/// never observe each other's guards changing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardSet {
    nonces: HashSet<GuardNonce>,
}

impl GuardSet {
    /// The empty guard set carried by freshly built consume triggers.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.nonces.is_empty()
    }

    pub fn len(&self) -> usize {
        self.nonces.len()
    }

    pub fn contains(&self, nonce: GuardNonce) -> bool {
        self.nonces.contains(&nonce)
    }

    /// Returns this set extended with `nonce`.
    #[must_use]
    pub fn add(mut self, nonce: GuardNonce) -> Self {
        self.nonces.insert(nonce);
        self
    }

    /// Nonces present in both sets. Walks the smaller side.
    #[must_use]
    pub fn intersection(&self, other: &GuardSet) -> GuardSet {
        let (small, large) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        GuardSet {
            nonces: small
                .nonces
                .iter()
                .filter(|nonce| large.nonces.contains(nonce))
                .copied()
                .collect(),
        }
    }

    /// True if every nonce of `other` is in this set.
    pub fn is_superset(&self, other: &GuardSet) -> bool {
        other.nonces.iter().all(|nonce| self.nonces.contains(nonce))
    }
}

impl FromIterator<GuardNonce> for GuardSet {
    fn from_iter<I: IntoIterator<Item = GuardNonce>>(iter: I) -> Self {
        Self {
            nonces: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_nonces_are_distinct() {
        let generator = GuardNonceGenerator::new();
        let a = generator.fresh();
        let b = generator.fresh();
        assert_ne!(a, b);
    }

    #[test]
    fn test_add_and_contains() {
        let generator = GuardNonceGenerator::new();
        let nonce = generator.fresh();
        let guards = GuardSet::none().add(nonce);
        assert!(guards.contains(nonce));
        assert_eq!(guards.len(), 1);
        // Re-adding is idempotent.
        assert_eq!(guards.clone().add(nonce), guards);
    }

    #[test]
    fn test_intersection_keeps_common_nonces() {
        let generator = GuardNonceGenerator::new();
        let a = generator.fresh();
        let b = generator.fresh();
        let c = generator.fresh();

        let left: GuardSet = [a, b].into_iter().collect();
        let right: GuardSet = [b, c].into_iter().collect();
        let both = left.intersection(&right);

        assert!(both.contains(b));
        assert!(!both.contains(a));
        assert!(!both.contains(c));
        assert_eq!(both.len(), 1);
    }

    #[test]
    fn test_intersection_with_empty_is_empty() {
        let generator = GuardNonceGenerator::new();
        let guards: GuardSet = [generator.fresh()].into_iter().collect();
        assert!(guards.intersection(&GuardSet::none()).is_empty());
        assert!(GuardSet::none().intersection(&guards).is_empty());
    }

    #[test]
    fn test_superset() {
        let generator = GuardNonceGenerator::new();
        let a = generator.fresh();
        let b = generator.fresh();
        let big: GuardSet = [a, b].into_iter().collect();
        let small: GuardSet = [a].into_iter().collect();
        assert!(big.is_superset(&small));
        assert!(!small.is_superset(&big));
        assert!(small.is_superset(&GuardSet::none()));
    }
}
