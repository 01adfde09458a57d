//! Grouping annotated with per-group metadata about a violated constraint.

use super::frame::DataFrameGrouping;
use crate::data::{ColumnRef, Counter, Table, Value};
use crate::error::{OpencleanError, Result};
use indexmap::IndexMap;
use std::sync::Arc;

/// Groups of rows that violate a constraint between determinant (`lhs`) and
/// dependant (`rhs`) columns, each with an optional counter of the values
/// involved.
#[derive(Debug, Clone)]
pub struct DataFrameViolation {
    grouping: DataFrameGrouping,
    meta: IndexMap<Value, Counter<Value>>,
    lhs: Vec<ColumnRef>,
    rhs: Vec<ColumnRef>,
}

impl DataFrameViolation {
    pub fn new(table: impl Into<Arc<Table>>, lhs: Vec<ColumnRef>, rhs: Vec<ColumnRef>) -> Self {
        Self {
            grouping: DataFrameGrouping::new(table),
            meta: IndexMap::new(),
            lhs,
            rhs,
        }
    }

    /// Add a group together with its metadata. On error neither the rows nor
    /// the metadata are stored.
    pub fn add(
        &mut self,
        key: Value,
        rows: Vec<usize>,
        meta: Option<Counter<Value>>,
    ) -> Result<&mut Self> {
        if self.grouping.contains_key(&key) {
            return Err(OpencleanError::DuplicateKey(key.to_string()));
        }
        self.grouping.add(key.clone(), rows)?;
        if let Some(meta) = meta {
            self.meta.insert(key, meta);
        }
        Ok(self)
    }

    pub fn get_meta(&self, key: &Value) -> Option<&Counter<Value>> {
        self.meta.get(key)
    }

    pub fn grouping(&self) -> &DataFrameGrouping {
        &self.grouping
    }

    pub fn into_grouping(self) -> DataFrameGrouping {
        self.grouping
    }

    pub fn lhs(&self) -> &[ColumnRef] {
        &self.lhs
    }

    pub fn rhs(&self) -> &[ColumnRef] {
        &self.rhs
    }

    /// Rows of one violation group; `None` for an unknown key.
    pub fn get(&self, key: &Value) -> Result<Option<Table>> {
        self.grouping.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &Value> {
        self.grouping.keys()
    }

    pub fn len(&self) -> usize {
        self.grouping.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grouping.is_empty()
    }
}
