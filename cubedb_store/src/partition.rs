//! A single partition's inverted index.

use crate::query::ResolvedFilter;
use cubedb_data::{ColumnId, ValueId};
use hashbrown::{HashMap, HashSet};

/// Per-partition aggregation state.
///
/// Rows are not stored individually; a row's presence is only observable
/// through the bucket counts it contributed. `total_count` is tracked
/// separately because rows may omit columns, so no single column's bucket
/// sum is guaranteed to reach it.
#[derive(Debug, Default)]
pub struct Partition {
    total_count: u64,
    columns: HashMap<ColumnId, HashMap<ValueId, u64>>,
}

impl Partition {
    /// Fold one row, pre-resolved to ids, into the index `count` times.
    pub(crate) fn insert(&mut self, row: &[(ColumnId, ValueId)], count: u64) {
        for (column, value) in row {
            *self
                .columns
                .entry(*column)
                .or_default()
                .entry(*value)
                .or_insert(0) += count;
        }
        self.total_count += count;
    }

    /// The summed count of every row in the partition.
    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    /// The count of rows admitted by `filter`.
    ///
    /// Computed at column granularity: per constrained column the partial
    /// sum of its admitted buckets, then the minimum across columns. With a
    /// single constrained column this is exact; with several it
    /// over-approximates the intersection, which is the behaviour clients
    /// depend on.
    pub(crate) fn filtered_count(&self, filter: &ResolvedFilter) -> u64 {
        if filter.is_empty() {
            return self.total_count;
        }
        filter
            .partials(self)
            .min()
            .expect("non-empty filter yields at least one partial")
    }

    /// Sum the buckets of `column` restricted to `values`.
    pub(crate) fn column_partial(&self, column: ColumnId, values: &HashSet<ValueId>) -> u64 {
        match self.columns.get(&column) {
            Some(buckets) => values
                .iter()
                .map(|value| buckets.get(value).copied().unwrap_or(0))
                .sum(),
            None => 0,
        }
    }

    /// Iterate the buckets of `group`, keeping only values in `admitted`
    /// when a restriction is given.
    ///
    /// Rows that omit `group` contributed to no bucket and are therefore
    /// absent from the result.
    pub(crate) fn grouped_counts<'a>(
        &'a self,
        group: ColumnId,
        admitted: Option<&'a HashSet<ValueId>>,
    ) -> impl Iterator<Item = (ValueId, u64)> + 'a {
        self.columns
            .get(&group)
            .into_iter()
            .flat_map(|buckets| buckets.iter())
            .filter(move |(value, _)| admitted.map_or(true, |set| set.contains(value)))
            .map(|(value, count)| (*value, *count))
    }

    /// Iterate every `(column, value, count)` bucket.
    pub fn buckets(&self) -> impl Iterator<Item = (ColumnId, ValueId, u64)> + '_ {
        self.columns.iter().flat_map(|(column, buckets)| {
            buckets
                .iter()
                .map(move |(value, count)| (*column, *value, *count))
        })
    }

    /// Install a bucket directly, bypassing row accounting. Restore only.
    pub(crate) fn load_bucket(&mut self, column: ColumnId, value: ValueId, count: u64) {
        *self
            .columns
            .entry(column)
            .or_default()
            .entry(value)
            .or_insert(0) += count;
    }

    /// Set the recorded total. Restore only.
    pub(crate) fn set_total_count(&mut self, total_count: u64) {
        self.total_count = total_count;
    }
}
