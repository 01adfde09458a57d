//! Ordered column names and column references.

use crate::error::{OpencleanError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Reference to a column, either by name or by position.
///
/// References are resolved once against a concrete [`Schema`] when a
/// function is prepared or an operator is opened.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnRef {
    Position(usize),
    Name(String),
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Position(pos) => write!(f, "#{pos}"),
            Self::Name(name) => f.write_str(name),
        }
    }
}

impl From<&str> for ColumnRef {
    fn from(name: &str) -> Self {
        Self::Name(name.to_owned())
    }
}

impl From<String> for ColumnRef {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<&String> for ColumnRef {
    fn from(name: &String) -> Self {
        Self::Name(name.clone())
    }
}

impl From<usize> for ColumnRef {
    fn from(pos: usize) -> Self {
        Self::Position(pos)
    }
}

/// Collect anything that converts into column references.
pub fn column_refs<I, C>(columns: I) -> Vec<ColumnRef>
where
    I: IntoIterator<Item = C>,
    C: Into<ColumnRef>,
{
    columns.into_iter().map(Into::into).collect()
}

/// Ordered sequence of unique column names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    names: Vec<String>,
}

impl Schema {
    /// Create a schema, failing on duplicate names.
    pub fn new<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        let mut seen = HashSet::with_capacity(names.len());
        for name in &names {
            if !seen.insert(name.as_str()) {
                return Err(OpencleanError::DuplicateColumn(name.clone()));
            }
        }
        Ok(Self { names })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn name(&self, pos: usize) -> Option<&str> {
        self.names.get(pos).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Resolve a column reference to its position.
    pub fn resolve(&self, column: &ColumnRef) -> Result<usize> {
        match column {
            ColumnRef::Position(pos) if *pos < self.names.len() => Ok(*pos),
            ColumnRef::Name(name) => self
                .position(name)
                .ok_or_else(|| OpencleanError::UnknownColumn(name.clone())),
            ColumnRef::Position(_) => Err(OpencleanError::UnknownColumn(column.to_string())),
        }
    }

    pub fn resolve_all(&self, columns: &[ColumnRef]) -> Result<Vec<usize>> {
        columns.iter().map(|c| self.resolve(c)).collect()
    }

    /// Schema containing the columns at the given positions, in order.
    pub fn project(&self, positions: &[usize]) -> Result<Self> {
        let names = positions
            .iter()
            .map(|&pos| self.name(pos).map(str::to_owned).ok_or_else(|| out_of_range(pos, self.len())))
            .collect::<Result<Vec<_>>>()?;
        Self::new(names)
    }

    /// Schema with new names inserted at `pos` (appended when `None`).
    pub fn insert(&self, pos: Option<usize>, names: &[String]) -> Result<Self> {
        let pos = pos.unwrap_or(self.names.len());
        if pos > self.names.len() {
            return Err(OpencleanError::construction(format!(
                "insert position {pos} out of range for {} columns",
                self.names.len()
            )));
        }
        let mut result = self.names.clone();
        result.splice(pos..pos, names.iter().cloned());
        Self::new(result)
    }

    /// Schema with the columns at `positions` renamed.
    pub fn rename(&self, positions: &[usize], names: &[String]) -> Result<Self> {
        let mut result = self.names.clone();
        for (&pos, name) in positions.iter().zip(names) {
            let slot = result
                .get_mut(pos)
                .ok_or_else(|| out_of_range(pos, self.names.len()))?;
            slot.clone_from(name);
        }
        Self::new(result)
    }
}

fn out_of_range(pos: usize, len: usize) -> OpencleanError {
    OpencleanError::UnknownColumn(format!("position {pos} out of range for {len} columns"))
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.names.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn people() -> Schema {
        Schema::new(["Name", "Age", "Height"]).unwrap()
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let err = Schema::new(["A", "B", "A"]).unwrap_err();
        assert!(matches!(err, OpencleanError::DuplicateColumn(name) if name == "A"));
    }

    #[test]
    fn test_resolve() {
        let schema = people();
        assert_eq!(schema.resolve(&"Age".into()).unwrap(), 1);
        assert_eq!(schema.resolve(&2.into()).unwrap(), 2);
        assert!(matches!(
            schema.resolve(&"Weight".into()),
            Err(OpencleanError::UnknownColumn(_))
        ));
        assert!(schema.resolve(&3.into()).is_err());
    }

    #[test]
    fn test_schema_transforms() {
        let schema = people();
        let projected = schema.project(&[2, 0]).unwrap();
        assert_eq!(projected.names(), ["Height", "Name"]);

        let inserted = schema.insert(Some(1), &["City".to_owned()]).unwrap();
        assert_eq!(inserted.names(), ["Name", "City", "Age", "Height"]);
        assert!(schema.insert(Some(9), &["X".to_owned()]).is_err());

        let renamed = schema.rename(&[1], &["Years".to_owned()]).unwrap();
        assert_eq!(renamed.names(), ["Name", "Years", "Height"]);
        assert!(schema.rename(&[1], &["Name".to_owned()]).is_err());
    }

    #[test]
    fn test_column_ref_json() {
        let refs: Vec<ColumnRef> = serde_json::from_str(r#"["Name", 2]"#).unwrap();
        assert_eq!(refs, vec![ColumnRef::from("Name"), ColumnRef::Position(2)]);
    }
}
