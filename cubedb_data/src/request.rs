//! Request types shared between the protocol layer and the store.
//!
//! These carry plain strings; resolution to interned ids happens inside the
//! store so that query paths can use a non-creating lookup.

use snafu::Snafu;
use std::collections::{btree_map, BTreeMap, BTreeSet};

/// A row to be inserted: one value per column.
///
/// Built from kv pairs; when the same column is given more than once the
/// last value wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowSpec(BTreeMap<String, String>);

impl RowSpec {
    /// Collapse kv pairs into a row, last value winning per column.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        Self(pairs.into_iter().collect())
    }

    /// Iterate `(column, value)` in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.0.iter().map(|(c, v)| (c.as_str(), v.as_str()))
    }

    /// Number of columns the row carries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when the row carries no columns.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> IntoIterator for &'a RowSpec {
    type Item = (&'a String, &'a String);
    type IntoIter = btree_map::Iter<'a, String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// A filter: per column, the set of admitted values.
///
/// Values within a column are OR-ed; columns are AND-ed to the extent the
/// column-granular index can approximate (see the query engine). Repeating
/// a `col=val` pair is idempotent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSpec(BTreeMap<String, BTreeSet<String>>);

impl FilterSpec {
    /// The filter that admits everything.
    pub fn none() -> Self {
        Self::default()
    }

    /// Build a filter from kv pairs, collecting values per column.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut columns: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for (column, value) in pairs {
            columns.entry(column).or_default().insert(value);
        }
        Self(columns)
    }

    /// True when no column is constrained.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate `(column, admitted values)` in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeSet<String>)> + '_ {
        self.0.iter().map(|(c, vs)| (c.as_str(), vs))
    }
}

/// A partition-name range, unbounded on either side when `None`.
///
/// `COUNT`/`PCOUNT` treat `to` as exclusive; `PART` treats it as inclusive.
/// The distinction lives in the store's iteration helpers, not here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionRange {
    /// Lower bound, inclusive.
    pub from: Option<String>,
    /// Upper bound; exclusivity is decided by the consuming operation.
    pub to: Option<String>,
}

impl PartitionRange {
    /// The range covering every partition.
    pub fn all() -> Self {
        Self::default()
    }

    /// A range with explicit optional bounds.
    pub fn new(from: Option<String>, to: Option<String>) -> Self {
        Self { from, to }
    }
}

/// Everything a `COUNT`/`PCOUNT` carries besides the cube name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuerySpec {
    /// Partition range, half-open.
    pub range: PartitionRange,
    /// Value filter; empty admits everything.
    pub filter: FilterSpec,
    /// Column to group by, when given.
    pub group: Option<String>,
}

/// Number of observations a row contributes. Always at least one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowCount(u64);

/// Error constructing a [`RowCount`].
#[derive(Debug, Snafu)]
#[snafu(display("count must be positive, got {value}"))]
pub struct ZeroCount {
    /// The rejected value.
    pub value: u64,
}

impl RowCount {
    /// Validate that `value` is a legal row count.
    pub fn try_new(value: u64) -> Result<Self, ZeroCount> {
        if value == 0 {
            return ZeroCountSnafu { value }.fail();
        }
        Ok(Self(value))
    }

    /// The count itself.
    pub fn get(&self) -> u64 {
        self.0
    }
}
