//! The store: every cube plus the shared interner.

use crate::cube::Cube;
use crate::interner::Interner;
use crate::partition::Partition;
use crate::query;
use cubedb_data::{ColumnId, PartitionRange, QuerySpec, RowCount, RowSpec, ValueId};
use observability_deps::tracing::debug;
use snafu::{ensure, OptionExt, Snafu};
use std::collections::BTreeMap;

/// Store-level failures, mapped to wire codes by the server.
#[derive(Debug, Snafu, PartialEq, Eq)]
pub enum Error {
    #[snafu(display("cube \"{}\" does not exist", name))]
    CubeNotFound {
        /// The missing cube.
        name: String,
    },

    #[snafu(display("cube \"{}\" already exists", name))]
    CubeExists {
        /// The duplicated cube.
        name: String,
    },

    #[snafu(display("partition \"{}\" does not exist in cube \"{}\"", partition, cube))]
    PartitionNotFound {
        /// The cube that was searched.
        cube: String,
        /// The missing partition.
        partition: String,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Result of a `COUNT` over a partition range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RangeCount {
    /// Ungrouped: one summed count.
    Total(u64),
    /// Grouped: value of the group column to summed count.
    Grouped(BTreeMap<String, u64>),
}

/// Result of a `PCOUNT` over a partition range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartitionRangeCount {
    /// Ungrouped: partition name to its (possibly filtered) count.
    Totals(BTreeMap<String, u64>),
    /// Grouped: partition name to its value histogram; partitions with an
    /// empty histogram are omitted.
    Grouped(BTreeMap<String, BTreeMap<String, u64>>),
}

/// The process-wide collection of cubes and the interner they share.
///
/// The store is the single unit of locking: the server wraps it in one
/// `RwLock`, writers exclusive, readers shared.
#[derive(Debug, Default)]
pub struct Store {
    interner: Interner,
    cubes: BTreeMap<String, Cube>,
}

impl Store {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cube names in ascending lexical order.
    pub fn cube_names(&self) -> Vec<String> {
        self.cubes.keys().cloned().collect()
    }

    /// Number of cubes.
    pub fn len(&self) -> usize {
        self.cubes.len()
    }

    /// True when the store holds no cubes.
    pub fn is_empty(&self) -> bool {
        self.cubes.is_empty()
    }

    /// The cube called `name`.
    pub fn cube(&self, name: &str) -> Result<&Cube> {
        self.cubes.get(name).context(CubeNotFoundSnafu { name })
    }

    /// Iterate `(name, cube)` in ascending name order.
    pub fn cubes(&self) -> impl Iterator<Item = (&str, &Cube)> {
        self.cubes.iter().map(|(name, cube)| (name.as_str(), cube))
    }

    /// The name behind a column id. Serialisation support.
    pub fn resolve_column(&self, id: ColumnId) -> &str {
        self.interner.resolve_column(id)
    }

    /// The string behind a value id. Serialisation support.
    pub fn resolve_value(&self, id: ValueId) -> &str {
        self.interner.resolve_value(id)
    }

    /// Create an empty cube.
    pub fn add_cube(&mut self, name: &str) -> Result<()> {
        ensure!(!self.cubes.contains_key(name), CubeExistsSnafu { name });
        self.cubes.insert(name.to_string(), Cube::default());
        debug!(cube = name, "created cube");
        Ok(())
    }

    /// Create `name` when absent, silently otherwise. This is the same
    /// on-demand path `INSERT` takes; restore uses it for cubes that were
    /// dumped empty.
    pub fn ensure_cube(&mut self, name: &str) {
        self.cubes.entry(name.to_string()).or_default();
    }

    /// Remove a cube and all its partitions.
    pub fn delete_cube(&mut self, name: &str) -> Result<()> {
        self.cubes
            .remove(name)
            .map(|_| ())
            .context(CubeNotFoundSnafu { name })?;
        debug!(cube = name, "deleted cube");
        Ok(())
    }

    /// Partition names of `cube` in ascending lexical order.
    pub fn partition_names(&self, cube: &str) -> Result<Vec<String>> {
        Ok(self
            .cube(cube)?
            .partition_names()
            .map(String::from)
            .collect())
    }

    /// Fold one row into `cube`/`partition`, creating both on demand.
    ///
    /// Creating the cube implicitly matches the later protocol revision of
    /// the original server; the row's interned ids are assigned here.
    pub fn insert(&mut self, cube: &str, partition: &str, row: &RowSpec, count: RowCount) {
        let interner = &mut self.interner;
        let ids: Vec<(ColumnId, ValueId)> = row
            .iter()
            .map(|(column, value)| (interner.intern_column(column), interner.intern_value(value)))
            .collect();

        self.cubes
            .entry(cube.to_string())
            .or_default()
            .insert(partition, &ids, count.get());
    }

    /// Remove the single partition `partition` from `cube`.
    pub fn delete_partition(&mut self, cube: &str, partition: &str) -> Result<()> {
        let found = self
            .cubes
            .get_mut(cube)
            .context(CubeNotFoundSnafu { name: cube })?
            .delete_partition(partition);
        ensure!(found, PartitionNotFoundSnafu { cube, partition });
        Ok(())
    }

    /// Remove every partition of `cube` in `[from, to)`; matching nothing
    /// succeeds. Returns the number removed.
    pub fn delete_partition_range(&mut self, cube: &str, from: &str, to: &str) -> Result<usize> {
        let removed = self
            .cubes
            .get_mut(cube)
            .context(CubeNotFoundSnafu { name: cube })?
            .delete_partition_range(from, to);
        debug!(cube, from, to, removed, "deleted partition range");
        Ok(removed)
    }

    /// `COUNT` against `cube`.
    pub fn count(&self, cube: &str, query: &QuerySpec) -> Result<RangeCount> {
        Ok(query::count(&self.interner, self.cube(cube)?, query))
    }

    /// `PCOUNT` against `cube`.
    pub fn pcount(&self, cube: &str, query: &QuerySpec) -> Result<PartitionRangeCount> {
        Ok(query::pcount(&self.interner, self.cube(cube)?, query))
    }

    /// `PART` against `cube`: per column, the sorted distinct values seen
    /// in the range.
    pub fn column_values(
        &self,
        cube: &str,
        range: &PartitionRange,
    ) -> Result<BTreeMap<String, Vec<String>>> {
        let values = query::column_values(&self.interner, self.cube(cube)?, range);
        Ok(values
            .into_iter()
            .map(|(column, values)| (column, values.into_iter().collect()))
            .collect())
    }

    /// Install a partition from persisted state, creating the cube on
    /// demand. Bucket counts and the partition total are taken verbatim;
    /// ids are re-assigned by the current interner.
    pub fn load_partition(
        &mut self,
        cube: &str,
        partition: &str,
        total_count: u64,
        buckets: impl IntoIterator<Item = (String, String, u64)>,
    ) {
        let interner = &mut self.interner;
        let mut loaded = Partition::default();
        for (column, value, count) in buckets {
            let column = interner.intern_column(&column);
            let value = interner.intern_value(&value);
            loaded.load_bucket(column, value, count);
        }
        loaded.set_total_count(total_count);

        self.cubes
            .entry(cube.to_string())
            .or_default()
            .install_partition(partition, loaded);
    }
}
