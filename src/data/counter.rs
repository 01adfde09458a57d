//! Insertion-ordered frequency counter.

use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use std::hash::Hash;

/// Counts occurrences of values, remembering the order in which values were
/// first seen. Ties in [`Counter::most_common`] keep that order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Counter<T: Hash + Eq> {
    counts: IndexMap<T, usize>,
}

impl<T: Hash + Eq> Counter<T> {
    pub fn new() -> Self {
        Self {
            counts: IndexMap::new(),
        }
    }

    pub fn add(&mut self, value: T) {
        self.add_n(value, 1);
    }

    pub fn add_n(&mut self, value: T, n: usize) {
        *self.counts.entry(value).or_insert(0) += n;
    }

    /// Count for a value; zero when the value was never added.
    pub fn get(&self, value: &T) -> usize {
        self.counts.get(value).copied().unwrap_or(0)
    }

    pub fn contains(&self, value: &T) -> bool {
        self.counts.contains_key(value)
    }

    /// Number of distinct values.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Sum of all counts.
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn keys(&self) -> impl Iterator<Item = &T> {
        self.counts.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&T, usize)> {
        self.counts.iter().map(|(k, &v)| (k, v))
    }

    /// Values ranked by count (descending), at most `n` of them.
    pub fn most_common(&self, n: usize) -> Vec<(&T, usize)> {
        let mut ranked: Vec<(&T, usize)> = self.iter().collect();
        // Stable sort: ties stay in first-seen order.
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.truncate(n);
        ranked
    }
}

impl<T: Hash + Eq> Default for Counter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Hash + Eq> FromIterator<T> for Counter<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut counter = Self::new();
        for value in iter {
            counter.add(value);
        }
        counter
    }
}

impl<T: Hash + Eq> Extend<T> for Counter<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.add(value);
        }
    }
}

/// Serialized as a list of `[value, count]` pairs so non-string keys survive.
impl<T: Hash + Eq + Serialize> Serialize for Counter<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.counts.iter())
    }
}
