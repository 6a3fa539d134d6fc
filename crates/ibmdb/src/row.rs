//! Result rows with positional and name-keyed access.

use std::collections::HashMap;
use std::ops::Index;
use std::sync::Arc;

use crate::case::CasePolicy;
use crate::types::{ColumnDescription, Value};

/// Column names of a result set folded under one case policy.
///
/// Shared by every row fetched while that policy is active.
#[derive(Debug, PartialEq, Eq)]
pub struct RowLayout {
    policy: CasePolicy,
    names: Vec<String>,
    positions: HashMap<String, usize>,
}

impl RowLayout {
    #[must_use]
    pub fn new(columns: &[ColumnDescription], policy: CasePolicy) -> Self {
        let names: Vec<String> = columns.iter().map(|c| policy.apply(&c.name)).collect();
        // Duplicate names resolve to the last column carrying them.
        let positions = names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();
        Self {
            policy,
            names,
            positions,
        }
    }

    #[must_use]
    pub const fn policy(&self) -> CasePolicy {
        self.policy
    }

    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }
}

/// One fetched row.
///
/// Name lookup is exact: under [`CasePolicy::Upper`] a column reported as
/// `empno` answers to `EMPNO` only.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    layout: Arc<RowLayout>,
    values: Vec<Value>,
}

impl ResultRow {
    #[must_use]
    pub const fn new(layout: Arc<RowLayout>, values: Vec<Value>) -> Self {
        Self { layout, values }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    #[must_use]
    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        self.layout.position(name).and_then(|i| self.values.get(i))
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.layout.position(name).is_some()
    }

    #[must_use]
    pub fn names(&self) -> &[String] {
        self.layout.names()
    }

    /// Case policy the names were folded with.
    #[must_use]
    pub fn policy(&self) -> CasePolicy {
        self.layout.policy()
    }

    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    #[must_use]
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    /// `(name, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.layout
            .names()
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    /// JSON object keyed by the folded column names.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        let map = self
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_json()))
            .collect();
        serde_json::Value::Object(map)
    }
}

impl Index<usize> for ResultRow {
    type Output = Value;

    fn index(&self, index: usize) -> &Value {
        &self.values[index]
    }
}
