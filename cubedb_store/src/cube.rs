//! A cube: an ordered collection of partitions.

use crate::partition::Partition;
use cubedb_data::{ColumnId, PartitionRange, ValueId};
use std::collections::BTreeMap;
use std::ops::Bound;

/// A named collection of partitions, ordered byte-wise by partition name.
///
/// Partition names are normally date-like keys (`20240117`), which makes
/// the lexical order the time order.
#[derive(Debug, Default)]
pub struct Cube {
    partitions: BTreeMap<String, Partition>,
}

impl Cube {
    /// Partition names in ascending lexical order.
    pub fn partition_names(&self) -> impl Iterator<Item = &str> {
        self.partitions.keys().map(String::as_str)
    }

    /// Number of partitions.
    pub fn len(&self) -> usize {
        self.partitions.len()
    }

    /// True when the cube holds no partitions.
    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }

    /// The partition called `name`, if present.
    pub fn partition(&self, name: &str) -> Option<&Partition> {
        self.partitions.get(name)
    }

    /// Iterate `(name, partition)` in ascending name order.
    pub fn partitions(&self) -> impl Iterator<Item = (&str, &Partition)> {
        self.partitions
            .iter()
            .map(|(name, partition)| (name.as_str(), partition))
    }

    /// Fold a row into the partition `name`, creating it on first use.
    pub(crate) fn insert(&mut self, name: &str, row: &[(ColumnId, ValueId)], count: u64) {
        self.partitions
            .entry(name.to_string())
            .or_default()
            .insert(row, count);
    }

    /// Install a fully-built partition. Restore only.
    pub(crate) fn install_partition(&mut self, name: &str, partition: Partition) {
        self.partitions.insert(name.to_string(), partition);
    }

    /// Remove the single partition `name`. Returns false when absent.
    pub(crate) fn delete_partition(&mut self, name: &str) -> bool {
        self.partitions.remove(name).is_some()
    }

    /// Remove every partition `p` with `from <= p < to`. Matching nothing
    /// is not an error; returns the number removed.
    pub(crate) fn delete_partition_range(&mut self, from: &str, to: &str) -> usize {
        let before = self.partitions.len();
        self.partitions
            .retain(|name, _| !(name.as_str() >= from && name.as_str() < to));
        before - self.partitions.len()
    }

    /// Iterate the partitions within `range` in ascending name order.
    ///
    /// `to` is exclusive for `COUNT`/`PCOUNT` and inclusive for `PART`;
    /// callers pick via `to_inclusive`.
    pub(crate) fn partitions_in_range<'a>(
        &'a self,
        range: &'a PartitionRange,
        to_inclusive: bool,
    ) -> impl Iterator<Item = (&'a str, &'a Partition)> + 'a {
        let lower = match &range.from {
            Some(from) => Bound::Included(from.as_str()),
            None => Bound::Unbounded,
        };
        let upper = match &range.to {
            Some(to) if to_inclusive => Bound::Included(to.as_str()),
            Some(to) => Bound::Excluded(to.as_str()),
            None => Bound::Unbounded,
        };

        // An inverted range would panic in BTreeMap::range; it simply
        // matches nothing.
        let inverted = matches!((&range.from, &range.to), (Some(f), Some(t)) if f > t);
        let (lower, upper) = if inverted {
            (Bound::Included(""), Bound::Excluded(""))
        } else {
            (lower, upper)
        };

        self.partitions
            .range::<str, _>((lower, upper))
            .map(|(name, partition)| (name.as_str(), partition))
    }
}
