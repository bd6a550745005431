//! Snapshot persistence for the CubeDB store.
//!
//! `DUMP` serialises the whole store into one self-describing JSON
//! document inside the configured dump directory. The write goes to a
//! uniquely named temp file first and is renamed into place, so a crash
//! mid-dump leaves the previous snapshot intact. Restore runs once at
//! startup and rebuilds semantically equivalent state; interner ids are
//! re-assigned, which the data model explicitly permits.
#![deny(rustdoc::broken_intra_doc_links, rustdoc::bare_urls, rust_2018_idioms)]
#![warn(
    missing_debug_implementations,
    clippy::explicit_iter_loop,
    clippy::use_self,
    clippy::clone_on_ref_ptr
)]

use observability_deps::tracing::{debug, info};
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use cubedb_store::Store;

/// File name of the snapshot inside the dump directory.
pub const SNAPSHOT_FILE: &str = "cubedb.snapshot";

/// Bumped whenever the snapshot layout changes shape.
const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("error creating dump directory {:?}: {}", path, source))]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("error writing snapshot {:?}: {}", path, source))]
    WriteSnapshot {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("error serialising snapshot {:?}: {}", path, source))]
    SerialiseSnapshot {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[snafu(display("error renaming snapshot into place at {:?}: {}", path, source))]
    CommitSnapshot {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("error reading snapshot {:?}: {}", path, source))]
    ReadSnapshot {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("error parsing snapshot {:?}: {}", path, source))]
    ParseSnapshot {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[snafu(display(
        "snapshot {:?} has format version {}, this server reads {}",
        path,
        found,
        FORMAT_VERSION
    ))]
    UnsupportedVersion { path: PathBuf, found: u32 },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The serialised store.
///
/// Bucket counts are keyed by the resolved strings, never by interner
/// ids: ids are process-local. `total_count` is stored per partition
/// because rows may omit columns, so no bucket sum can recover it.
#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    cubes: BTreeMap<String, CubeSnapshot>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CubeSnapshot {
    partitions: BTreeMap<String, PartitionSnapshot>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PartitionSnapshot {
    total_count: u64,
    columns: BTreeMap<String, BTreeMap<String, u64>>,
}

/// Serialise `store` into `dir`, atomically.
pub fn dump(store: &Store, dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).context(CreateDirSnafu { path: dir })?;

    let snapshot = snapshot_of(store);

    let tmp_path = dir.join(format!("{}.tmp-{}", SNAPSHOT_FILE, uuid::Uuid::new_v4()));
    let file = File::create(&tmp_path).context(WriteSnapshotSnafu { path: &tmp_path })?;
    serde_json::to_writer(BufWriter::new(file), &snapshot)
        .context(SerialiseSnapshotSnafu { path: &tmp_path })?;

    let final_path = dir.join(SNAPSHOT_FILE);
    fs::rename(&tmp_path, &final_path).context(CommitSnapshotSnafu { path: &final_path })?;

    info!(
        path = %final_path.display(),
        cubes = snapshot.cubes.len(),
        "dumped store"
    );
    Ok(())
}

/// Load the snapshot in `dir`, if one exists.
///
/// A missing snapshot is a fresh start, not an error.
pub fn restore(dir: &Path) -> Result<Option<Store>> {
    let path = dir.join(SNAPSHOT_FILE);
    let file = match File::open(&path) {
        Ok(file) => file,
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no snapshot to restore");
            return Ok(None);
        }
        Err(source) => return Err(Error::ReadSnapshot { path, source }),
    };

    let snapshot: Snapshot =
        serde_json::from_reader(BufReader::new(file)).context(ParseSnapshotSnafu { path: &path })?;
    snafu::ensure!(
        snapshot.version == FORMAT_VERSION,
        UnsupportedVersionSnafu {
            path: &path,
            found: snapshot.version,
        }
    );

    let mut store = Store::new();
    for (cube_name, cube) in snapshot.cubes {
        // A cube can legitimately have zero partitions; it must survive
        // the round trip.
        store.ensure_cube(&cube_name);
        for (partition_name, partition) in cube.partitions {
            let buckets = partition.columns.into_iter().flat_map(|(column, values)| {
                values
                    .into_iter()
                    .map(move |(value, count)| (column.clone(), value, count))
            });
            store.load_partition(&cube_name, &partition_name, partition.total_count, buckets);
        }
    }

    info!(path = %path.display(), cubes = store.len(), "restored store");
    Ok(Some(store))
}

fn snapshot_of(store: &Store) -> Snapshot {
    let cubes = store
        .cubes()
        .map(|(cube_name, cube)| {
            let partitions = cube
                .partitions()
                .map(|(partition_name, partition)| {
                    let mut columns: BTreeMap<String, BTreeMap<String, u64>> = BTreeMap::new();
                    for (column, value, count) in partition.buckets() {
                        columns
                            .entry(store.resolve_column(column).to_string())
                            .or_default()
                            .insert(store.resolve_value(value).to_string(), count);
                    }
                    (
                        partition_name.to_string(),
                        PartitionSnapshot {
                            total_count: partition.total_count(),
                            columns,
                        },
                    )
                })
                .collect();
            (cube_name.to_string(), CubeSnapshot { partitions })
        })
        .collect();

    Snapshot {
        version: FORMAT_VERSION,
        cubes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cubedb_data::{QuerySpec, RowCount, RowSpec};

    fn insert(store: &mut Store, cube: &str, partition: &str, kv: &[(&str, &str)], count: u64) {
        let row = RowSpec::from_pairs(kv.iter().map(|(c, v)| (c.to_string(), v.to_string())));
        store.insert(cube, partition, &row, RowCount::try_new(count).unwrap());
    }

    fn grouped_by(column: &str) -> QuerySpec {
        QuerySpec {
            group: Some(column.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn round_trip_preserves_query_answers() {
        test_helpers::maybe_start_logging();
        let dir = test_helpers::tmp_dir().unwrap();

        let mut store = Store::new();
        insert(&mut store, "cube1", "p1", &[("a", "1"), ("b", "1")], 1);
        insert(&mut store, "cube1", "p1", &[("a", "2"), ("b", "1")], 2);
        insert(&mut store, "cube1", "p1", &[("a", "3"), ("b", "1")], 3);
        insert(&mut store, "cube2", "p1", &[("a", "1")], 1);

        dump(&store, dir.path()).unwrap();
        let restored = restore(dir.path()).unwrap().expect("snapshot exists");

        assert_eq!(restored.cube_names(), store.cube_names());
        assert_eq!(
            restored.pcount("cube1", &QuerySpec::default()).unwrap(),
            store.pcount("cube1", &QuerySpec::default()).unwrap()
        );
        assert_eq!(
            restored.pcount("cube1", &grouped_by("a")).unwrap(),
            store.pcount("cube1", &grouped_by("a")).unwrap()
        );
        assert_eq!(
            restored.count("cube2", &QuerySpec::default()).unwrap(),
            store.count("cube2", &QuerySpec::default()).unwrap()
        );
    }

    #[test]
    fn empty_cubes_survive() {
        let dir = test_helpers::tmp_dir().unwrap();

        let mut store = Store::new();
        store.add_cube("empty").unwrap();

        dump(&store, dir.path()).unwrap();
        let restored = restore(dir.path()).unwrap().expect("snapshot exists");
        assert_eq!(restored.cube_names(), vec!["empty"]);
        assert!(restored.partition_names("empty").unwrap().is_empty());
    }

    #[test]
    fn missing_snapshot_is_a_fresh_start() {
        let dir = test_helpers::tmp_dir().unwrap();
        assert!(restore(dir.path()).unwrap().is_none());
    }

    #[test]
    fn total_count_does_not_depend_on_bucket_sums() {
        let dir = test_helpers::tmp_dir().unwrap();

        // Rows omit columns, so no single column reaches the total.
        let mut store = Store::new();
        insert(&mut store, "cube", "p1", &[("a", "1")], 2);
        insert(&mut store, "cube", "p1", &[("b", "1")], 3);

        dump(&store, dir.path()).unwrap();
        let restored = restore(dir.path()).unwrap().expect("snapshot exists");

        assert_eq!(
            restored.count("cube", &QuerySpec::default()).unwrap(),
            store.count("cube", &QuerySpec::default()).unwrap()
        );
    }

    #[test]
    fn second_dump_replaces_the_first() {
        let dir = test_helpers::tmp_dir().unwrap();

        let mut store = Store::new();
        insert(&mut store, "cube", "p1", &[("a", "1")], 1);
        dump(&store, dir.path()).unwrap();

        insert(&mut store, "cube", "p2", &[("a", "1")], 1);
        dump(&store, dir.path()).unwrap();

        let restored = restore(dir.path()).unwrap().expect("snapshot exists");
        assert_eq!(
            restored.partition_names("cube").unwrap(),
            vec!["p1", "p2"]
        );
    }
}
