//! Summary of values that conflict within groups.

use crate::data::{Counter, Value};
use indexmap::IndexMap;
use serde::{Serialize, Serializer};

/// How often a value took part in a conflict, and with which other values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConflictEntry {
    /// Number of groups in which the value conflicted.
    pub count: usize,
    /// Co-occurring values, counted once per group.
    pub partners: Counter<Value>,
}

/// Conflicting values in first-encounter order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConflictSummary {
    entries: IndexMap<Value, ConflictEntry>,
}

impl ConflictSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the distinct values of one group. Fewer than two values is not
    /// a conflict and leaves the summary unchanged.
    pub fn add_group(&mut self, distinct: &[Value]) {
        if distinct.len() < 2 {
            return;
        }
        for value in distinct {
            let entry = self.entries.entry(value.clone()).or_default();
            entry.count += 1;
            for other in distinct.iter().filter(|o| *o != value) {
                entry.partners.add(other.clone());
            }
        }
    }

    pub fn get(&self, value: &Value) -> Option<&ConflictEntry> {
        self.entries.get(value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Value, &ConflictEntry)> {
        self.entries.iter()
    }

    /// Values ranked by conflict count, ties in first-encounter order.
    pub fn most_common(&self, n: usize) -> Vec<(&Value, &ConflictEntry)> {
        let mut ranked: Vec<_> = self.entries.iter().collect();
        ranked.sort_by(|a, b| b.1.count.cmp(&a.1.count));
        ranked.truncate(n);
        ranked
    }
}

impl Serialize for ConflictSummary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.entries.iter())
    }
}
