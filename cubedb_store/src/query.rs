//! Query evaluation over a cube's partition range.
//!
//! A filter arrives as strings and is resolved to ids once per query with
//! the non-creating lookup, so queries never grow the interner. Results
//! come back keyed by resolved strings in `BTreeMap`s, which fixes the
//! reply ordering.

use crate::cube::Cube;
use crate::interner::Interner;
use crate::partition::Partition;
use crate::store::{PartitionRangeCount, RangeCount};
use cubedb_data::{ColumnId, FilterSpec, PartitionRange, QuerySpec, ValueId};
use hashbrown::HashSet;
use std::collections::{BTreeMap, BTreeSet};

/// A filter with columns and values resolved against the interner.
#[derive(Debug)]
pub(crate) struct ResolvedFilter {
    entries: Vec<FilterEntry>,
}

/// One constrained column.
///
/// `column` is `None` when the name was never interned: such a constraint
/// can match nothing. Unknown value strings are simply dropped from the
/// set; their buckets cannot exist.
#[derive(Debug)]
struct FilterEntry {
    column: Option<ColumnId>,
    values: HashSet<ValueId>,
}

impl ResolvedFilter {
    pub(crate) fn resolve(spec: &FilterSpec, interner: &Interner) -> Self {
        let entries = spec
            .iter()
            .map(|(column, values)| FilterEntry {
                column: interner.lookup_column(column),
                values: values
                    .iter()
                    .filter_map(|value| interner.lookup_value(value))
                    .collect(),
            })
            .collect();
        Self { entries }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The per-column partial sums of `partition` under this filter.
    pub(crate) fn partials<'a>(
        &'a self,
        partition: &'a Partition,
    ) -> impl Iterator<Item = u64> + 'a {
        self.entries.iter().map(move |entry| match entry.column {
            Some(column) => partition.column_partial(column, &entry.values),
            None => 0,
        })
    }

    /// The admitted value set for `group`, when this filter constrains it.
    ///
    /// Constraints on other columns are ignored by grouped queries; only a
    /// constraint on the group column itself narrows the histogram.
    pub(crate) fn admitted_for(&self, group: ColumnId) -> Option<&HashSet<ValueId>> {
        self.entries
            .iter()
            .find(|entry| entry.column == Some(group))
            .map(|entry| &entry.values)
    }
}

/// `COUNT`: a single result over the whole range.
pub(crate) fn count(interner: &Interner, cube: &Cube, query: &QuerySpec) -> RangeCount {
    let filter = ResolvedFilter::resolve(&query.filter, interner);

    match &query.group {
        None => {
            let total = cube
                .partitions_in_range(&query.range, false)
                .map(|(_, partition)| partition.filtered_count(&filter))
                .sum();
            RangeCount::Total(total)
        }
        Some(group) => {
            let mut histogram = BTreeMap::new();
            if let Some(group_id) = interner.lookup_column(group) {
                let admitted = filter.admitted_for(group_id);
                for (_, partition) in cube.partitions_in_range(&query.range, false) {
                    for (value, count) in partition.grouped_counts(group_id, admitted) {
                        *histogram
                            .entry(interner.resolve_value(value).to_string())
                            .or_insert(0) += count;
                    }
                }
            }
            RangeCount::Grouped(histogram)
        }
    }
}

/// `PCOUNT`: one result per partition in the range.
pub(crate) fn pcount(interner: &Interner, cube: &Cube, query: &QuerySpec) -> PartitionRangeCount {
    let filter = ResolvedFilter::resolve(&query.filter, interner);

    match &query.group {
        None => {
            let totals = cube
                .partitions_in_range(&query.range, false)
                .map(|(name, partition)| (name.to_string(), partition.filtered_count(&filter)))
                .collect();
            PartitionRangeCount::Totals(totals)
        }
        Some(group) => {
            let mut per_partition = BTreeMap::new();
            if let Some(group_id) = interner.lookup_column(group) {
                let admitted = filter.admitted_for(group_id);
                for (name, partition) in cube.partitions_in_range(&query.range, false) {
                    let mut histogram = BTreeMap::new();
                    for (value, count) in partition.grouped_counts(group_id, admitted) {
                        histogram.insert(interner.resolve_value(value).to_string(), count);
                    }
                    // Partitions with nothing under the group column are
                    // left out of the reply.
                    if !histogram.is_empty() {
                        per_partition.insert(name.to_string(), histogram);
                    }
                }
            }
            PartitionRangeCount::Grouped(per_partition)
        }
    }
}

/// `PART`: every value observed per column over the range.
///
/// Unlike the counting range, `PART` bounds are inclusive on both ends,
/// and a lone `from` selects that single partition.
pub(crate) fn column_values(
    interner: &Interner,
    cube: &Cube,
    range: &PartitionRange,
) -> BTreeMap<String, BTreeSet<String>> {
    let mut dst: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

    let mut collect = |partition: &Partition| {
        for (column, value, _) in partition.buckets() {
            dst.entry(interner.resolve_column(column).to_string())
                .or_default()
                .insert(interner.resolve_value(value).to_string());
        }
    };

    match (&range.from, &range.to) {
        (Some(single), None) => {
            if let Some(partition) = cube.partition(single) {
                collect(partition);
            }
        }
        _ => {
            for (_, partition) in cube.partitions_in_range(range, true) {
                collect(partition);
            }
        }
    }

    dst
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;
    use cubedb_data::{RowCount, RowSpec};

    fn insert(store: &mut Store, partition: &str, kv: &[(&str, &str)], count: u64) {
        let row = RowSpec::from_pairs(
            kv.iter()
                .map(|(c, v)| (c.to_string(), v.to_string())),
        );
        store.insert("cube", partition, &row, RowCount::try_new(count).unwrap());
    }

    fn query(from: Option<&str>, to: Option<&str>, filter: &[(&str, &str)], group: Option<&str>) -> QuerySpec {
        QuerySpec {
            range: PartitionRange::new(from.map(String::from), to.map(String::from)),
            filter: FilterSpec::from_pairs(
                filter
                    .iter()
                    .map(|(c, v)| (c.to_string(), v.to_string())),
            ),
            group: group.map(String::from),
        }
    }

    fn seeded() -> Store {
        let mut store = Store::default();
        insert(&mut store, "p1", &[("a", "val1")], 1);
        insert(&mut store, "p2", &[("a", "val1")], 2);
        insert(&mut store, "p2", &[("a", "val2")], 4);
        store
    }

    #[test]
    fn count_total_over_range() {
        let store = seeded();
        assert_eq!(
            store.count("cube", &query(Some("p1"), Some("p9"), &[], None)).unwrap(),
            RangeCount::Total(7)
        );
        assert_eq!(
            store.count("cube", &query(Some("p2"), Some("p9"), &[], None)).unwrap(),
            RangeCount::Total(6)
        );
        assert_eq!(
            store.count("cube", &query(Some("p3"), Some("p9"), &[], None)).unwrap(),
            RangeCount::Total(0)
        );
    }

    #[test]
    fn count_grouped_merges_partitions() {
        let store = seeded();
        let expected: BTreeMap<String, u64> = [("val1".to_string(), 3), ("val2".to_string(), 4)]
            .into_iter()
            .collect();
        assert_eq!(
            store.count("cube", &query(Some("p1"), Some("p9"), &[], Some("a"))).unwrap(),
            RangeCount::Grouped(expected)
        );
    }

    #[test]
    fn count_grouped_by_unknown_column_is_empty() {
        let store = seeded();
        assert_eq!(
            store
                .count("cube", &query(None, None, &[], Some("ghost")))
                .unwrap(),
            RangeCount::Grouped(BTreeMap::new())
        );
    }

    #[test]
    fn count_filter_or_within_column() {
        let mut store = seeded();
        insert(&mut store, "p2", &[("a", "val3"), ("b", "x")], 3);

        assert_eq!(
            store
                .count("cube", &query(Some("p1"), Some("p9"), &[("a", "val1")], None))
                .unwrap(),
            RangeCount::Total(3)
        );
        assert_eq!(
            store
                .count(
                    "cube",
                    &query(
                        Some("p1"),
                        Some("p9"),
                        &[("a", "val1"), ("a", "val2")],
                        None
                    )
                )
                .unwrap(),
            RangeCount::Total(7)
        );
    }

    #[test]
    fn grouped_filter_restricts_group_column_only() {
        let mut store = seeded();
        insert(&mut store, "p2", &[("b", "x")], 10);

        // The b=nothing constraint is ignored for grouped queries; the
        // a-constraint narrows the histogram.
        let expected: BTreeMap<String, u64> = [("val1".to_string(), 3)].into_iter().collect();
        assert_eq!(
            store
                .count(
                    "cube",
                    &query(
                        None,
                        None,
                        &[("a", "val1"), ("b", "never-seen")],
                        Some("a")
                    )
                )
                .unwrap(),
            RangeCount::Grouped(expected)
        );
    }

    #[test]
    fn pcount_totals_per_partition() {
        let store = seeded();
        let expected: BTreeMap<String, u64> = [("p1".to_string(), 1), ("p2".to_string(), 6)]
            .into_iter()
            .collect();
        assert_eq!(
            store.pcount("cube", &query(Some("p1"), Some("p9"), &[], None)).unwrap(),
            PartitionRangeCount::Totals(expected)
        );
    }

    #[test]
    fn pcount_grouped_omits_empty_partitions() {
        let mut store = seeded();
        // p3 has rows but nothing under column "a".
        insert(&mut store, "p3", &[("b", "x")], 5);

        let result = store
            .pcount("cube", &query(None, None, &[], Some("a")))
            .unwrap();
        let expected: BTreeMap<String, BTreeMap<String, u64>> = [
            (
                "p1".to_string(),
                [("val1".to_string(), 1)].into_iter().collect(),
            ),
            (
                "p2".to_string(),
                [("val1".to_string(), 2), ("val2".to_string(), 4)]
                    .into_iter()
                    .collect(),
            ),
        ]
        .into_iter()
        .collect();
        assert_eq!(result, PartitionRangeCount::Grouped(expected));
    }

    #[test]
    fn range_law_count_decomposes_over_partitions() {
        let store = seeded();
        let whole = match store
            .count("cube", &query(Some("p1"), Some("p9"), &[], None))
            .unwrap()
        {
            RangeCount::Total(n) => n,
            other => panic!("expected total, got {:?}", other),
        };

        let mut summed = 0;
        for (name, next) in [("p1", "p2"), ("p2", "p3")] {
            summed += match store
                .count("cube", &query(Some(name), Some(next), &[], None))
                .unwrap()
            {
                RangeCount::Total(n) => n,
                other => panic!("expected total, got {:?}", other),
            };
        }
        assert_eq!(whole, summed);
    }

    #[test]
    fn part_values_single_and_inclusive_range() {
        let mut store = Store::default();
        insert(&mut store, "p1", &[("c1", "val1")], 1);
        insert(&mut store, "p2", &[("c1", "val2")], 2);
        insert(&mut store, "p3", &[("c2", "val3")], 4);

        let everything = store.column_values("cube", &PartitionRange::all()).unwrap();
        assert_eq!(everything.len(), 2);
        assert_eq!(everything["c1"], vec!["val1", "val2"]);
        assert_eq!(everything["c2"], vec!["val3"]);

        let single = store
            .column_values(
                "cube",
                &PartitionRange::new(Some("p1".to_string()), None),
            )
            .unwrap();
        assert_eq!(single.len(), 1);
        assert_eq!(single["c1"], vec!["val1"]);

        let two = store
            .column_values(
                "cube",
                &PartitionRange::new(Some("p1".to_string()), Some("p2".to_string())),
            )
            .unwrap();
        assert_eq!(two.len(), 1);
        assert_eq!(two["c1"], vec!["val1", "val2"]);
    }
}
