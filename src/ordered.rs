//! Deterministic Ordered Collections
//!
//! Every derived table iterates in first-seen order so that two runs over the
//! same registry produce byte-identical output. `OrderedSet` is a thin wrapper
//! over `IndexSet` that only exposes order-preserving operations (removal
//! shifts, never swaps).

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;

/// Insertion-ordered map used for every keyed output table
pub type OrderedMap<K, V> = IndexMap<K, V>;

/// Insertion-ordered set with stable removal
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound(
    serialize = "T: Serialize + Hash + Eq",
    deserialize = "T: Deserialize<'de> + Hash + Eq"
))]
#[serde(transparent)]
pub struct OrderedSet<T: Hash + Eq>(IndexSet<T>);

impl<T: Hash + Eq> OrderedSet<T> {
    pub fn new() -> Self {
        Self(IndexSet::new())
    }

    /// Add a value; returns `false` if it was already present (order unchanged)
    pub fn add(&mut self, value: T) -> bool {
        self.0.insert(value)
    }

    /// Remove a value, keeping the relative order of the rest
    pub fn discard<Q>(&mut self, value: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.0.shift_remove(value)
    }

    pub fn contains<Q>(&self, value: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.0.contains(value)
    }

    /// Position-based access in insertion order
    pub fn get(&self, index: usize) -> Option<&T> {
        self.0.get_index(index)
    }

    pub fn position<Q>(&self, value: &Q) -> Option<usize>
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.0.get_index_of(value)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> indexmap::set::Iter<'_, T> {
        self.0.iter()
    }
}

impl<T: Hash + Eq> Default for OrderedSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Hash + Eq> FromIterator<T> for OrderedSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<T: Hash + Eq> Extend<T> for OrderedSet<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl<'a, T: Hash + Eq> IntoIterator for &'a OrderedSet<T> {
    type Item = &'a T;
    type IntoIter = indexmap::set::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl<T: Hash + Eq> IntoIterator for OrderedSet<T> {
    type Item = T;
    type IntoIter = indexmap::set::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<T: Hash + Eq + fmt::Debug> fmt::Debug for OrderedSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.0.iter()).finish()
    }
}
