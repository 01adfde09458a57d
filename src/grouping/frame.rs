//! Mapping from group keys to row positions in a shared table.

use super::conflict::ConflictSummary;
use crate::data::{ColumnRef, Counter, Table, Value, cell};
use crate::error::{OpencleanError, Result};
use indexmap::{IndexMap, IndexSet};
use polars::prelude::DataFrame;
use std::sync::Arc;

/// Groups of rows of one table, keyed by value.
///
/// Row positions index into [`DataFrameGrouping::table`]. A row may belong to
/// any number of groups.
#[derive(Debug, Clone)]
pub struct DataFrameGrouping {
    table: Arc<Table>,
    groups: IndexMap<Value, Vec<usize>>,
}

impl DataFrameGrouping {
    pub fn new(table: impl Into<Arc<Table>>) -> Self {
        Self {
            table: table.into(),
            groups: IndexMap::new(),
        }
    }

    /// Empty grouping over the rows of a polars data frame.
    pub fn from_dataframe(df: &DataFrame) -> Result<Self> {
        Ok(Self::new(Table::from_dataframe(df)?))
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Shared handle to the backing table.
    pub fn shared_table(&self) -> Arc<Table> {
        Arc::clone(&self.table)
    }

    /// Add a group. Fails without changing the grouping when the key already
    /// exists or a position is out of range.
    pub fn add(&mut self, key: Value, rows: Vec<usize>) -> Result<&mut Self> {
        if self.groups.contains_key(&key) {
            return Err(OpencleanError::DuplicateKey(key.to_string()));
        }
        if let Some(pos) = rows.iter().find(|&&pos| pos >= self.table.len()) {
            return Err(OpencleanError::construction(format!(
                "row position {pos} out of range for {} rows",
                self.table.len()
            )));
        }
        self.groups.insert(key, rows);
        Ok(self)
    }

    pub fn contains_key(&self, key: &Value) -> bool {
        self.groups.contains_key(key)
    }

    /// Row positions of one group.
    pub fn rows(&self, key: &Value) -> Option<&[usize]> {
        self.groups.get(key).map(Vec::as_slice)
    }

    /// Materialize one group as a table; `None` for an unknown key.
    pub fn get(&self, key: &Value) -> Result<Option<Table>> {
        self.groups
            .get(key)
            .map(|rows| self.table.take(rows))
            .transpose()
    }

    /// One group as a polars data frame; `None` for an unknown key.
    pub fn get_dataframe(&self, key: &Value) -> Result<Option<DataFrame>> {
        self.get(key)?.map(|table| table.to_dataframe()).transpose()
    }

    /// `(key, group table)` pairs in key order.
    pub fn items(&self) -> impl Iterator<Item = Result<(&Value, Table)>> {
        self.groups
            .iter()
            .map(|(key, rows)| Ok((key, self.table.take(rows)?)))
    }

    pub fn keys(&self) -> impl Iterator<Item = &Value> {
        self.groups.keys()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Frequency of the projected values in one group. Several columns
    /// project to list values. `None` for an unknown key.
    pub fn values(&self, key: &Value, columns: &[ColumnRef]) -> Result<Option<Counter<Value>>> {
        let positions = self.table.schema().resolve_all(columns)?;
        self.groups
            .get(key)
            .map(|rows| {
                rows.iter()
                    .map(|&pos| project(self.table.row_at(pos)?, &positions))
                    .collect::<Result<Counter<Value>>>()
            })
            .transpose()
    }

    /// Values that occur together with a different value in at least one
    /// group, for the given columns.
    pub fn summarize_conflicts(&self, columns: &[ColumnRef]) -> Result<ConflictSummary> {
        let positions = self.table.schema().resolve_all(columns)?;
        let mut summary = ConflictSummary::new();
        for rows in self.groups.values() {
            let distinct: IndexSet<Value> = rows
                .iter()
                .map(|&pos| project(self.table.row_at(pos)?, &positions))
                .collect::<Result<_>>()?;
            let distinct: Vec<Value> = distinct.into_iter().collect();
            summary.add_group(&distinct);
        }
        Ok(summary)
    }

}

/// Single value for one column, list value for several.
pub(crate) fn project(row: &[Value], positions: &[usize]) -> Result<Value> {
    match positions {
        [pos] => cell(row, *pos).cloned(),
        _ => positions
            .iter()
            .map(|&pos| cell(row, pos).cloned())
            .collect::<Result<Vec<_>>>()
            .map(Value::List),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grouping() -> DataFrameGrouping {
        let table = Table::from_rows(
            ["City", "Zip"],
            vec![
                vec!["NYC".into(), 10001.into()],
                vec!["NYC".into(), 10002.into()],
                vec!["Boston".into(), 2108.into()],
                vec!["NYC".into(), 10001.into()],
            ],
        )
        .unwrap();
        let mut grouping = DataFrameGrouping::new(table);
        grouping.add("NYC".into(), vec![0, 1, 3]).unwrap();
        grouping.add("Boston".into(), vec![2]).unwrap();
        grouping
    }

    #[test]
    fn test_get_and_unknown_key() {
        let grouping = grouping();
        let nyc = grouping.get(&"NYC".into()).unwrap().unwrap();
        assert_eq!(nyc.len(), 3);
        assert_eq!(nyc.index(), [0, 1, 3]);
        assert!(grouping.get(&"LA".into()).unwrap().is_none());
        let keys: Vec<_> = grouping.keys().cloned().collect();
        assert_eq!(keys, [Value::from("NYC"), Value::from("Boston")]);
    }

    #[test]
    fn test_items_materialize_every_group() {
        let grouping = grouping();
        let sizes: Vec<(Value, usize)> = grouping
            .items()
            .map(|item| item.map(|(key, table)| (key.clone(), table.len())))
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(sizes, [(Value::from("NYC"), 3), (Value::from("Boston"), 1)]);
        assert!(grouping.get_dataframe(&"LA".into()).unwrap().is_none());
    }

    #[test]
    fn test_from_dataframe() {
        let df = grouping().table().to_dataframe().unwrap();
        let mut grouping = DataFrameGrouping::from_dataframe(&df).unwrap();
        grouping.add("Boston".into(), vec![2]).unwrap();
        assert!(grouping.add("LA".into(), vec![4]).is_err());
        assert_eq!(grouping.get(&"Boston".into()).unwrap().unwrap().index(), [2]);
    }

    #[test]
    fn test_duplicate_key_leaves_group_unchanged() {
        let mut grouping = grouping();
        let err = grouping.add("Boston".into(), vec![0, 1]).unwrap_err();
        assert!(matches!(err, OpencleanError::DuplicateKey(_)));
        assert_eq!(grouping.rows(&"Boston".into()), Some(&[2][..]));
        assert_eq!(grouping.len(), 2);
    }

    #[test]
    fn test_values_counter() {
        let grouping = grouping();
        let zips = grouping
            .values(&"NYC".into(), &["Zip".into()])
            .unwrap()
            .unwrap();
        assert_eq!(zips.get(&Value::Int(10001)), 2);
        assert_eq!(zips.get(&Value::Int(10002)), 1);
        assert!(grouping.values(&"LA".into(), &["Zip".into()]).unwrap().is_none());
        assert!(grouping.values(&"NYC".into(), &["State".into()]).is_err());
    }

    #[test]
    fn test_summarize_conflicts() {
        let summary = grouping().summarize_conflicts(&["Zip".into()]).unwrap();
        assert_eq!(summary.len(), 2);
        let entry = summary.get(&Value::Int(10001)).unwrap();
        assert_eq!(entry.count, 1);
        assert_eq!(entry.partners.get(&Value::Int(10002)), 1);
        assert!(summary.get(&Value::Int(2108)).is_none());
    }
}
