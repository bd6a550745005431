//! Command execution against the shared store.

use cubedb_protocol::{help_lines, Command, Reply, WireError, PONG};
use cubedb_store::{Error as StoreError, PartitionRangeCount, RangeCount, Store};
use observability_deps::tracing::{error, trace, warn};
use parking_lot::RwLock;
use std::path::PathBuf;

/// The server's shared state: the store behind a single reader-writer
/// lock, plus the dump directory when persistence is enabled.
///
/// Writers (`INSERT`, `ADDCUBE`, `DELCUBE`, `DELPART`) take the lock
/// exclusively; everything else shares it. `DUMP` reads under the shared
/// lock, so it snapshots a consistent state while other readers proceed.
#[derive(Debug)]
pub struct CubeDb {
    store: RwLock<Store>,
    dump_path: Option<PathBuf>,
}

impl CubeDb {
    /// Wrap `store`, with `DUMP` enabled when `dump_path` is given.
    pub fn new(store: Store, dump_path: Option<PathBuf>) -> Self {
        Self {
            store: RwLock::new(store),
            dump_path,
        }
    }

    /// Handle one request line.
    ///
    /// Returns the encoded reply and whether the connection must close
    /// afterwards (only after acknowledging `QUIT`).
    pub fn handle_line(&self, line: &str) -> (Vec<u8>, bool) {
        trace!(line, "handling request");
        let command = match Command::parse(line) {
            Ok(command) => command,
            Err(code) => return (Reply::Error(code).encode(), false),
        };

        let close = matches!(command, Command::Quit);
        (self.execute(command).encode(), close)
    }

    fn execute(&self, command: Command) -> Reply {
        match command {
            Command::Ping => Reply::Raw(PONG.to_string()),
            Command::Help => Reply::Lines(help_lines()),
            Command::Quit => Reply::Ok,
            Command::Cubes => Reply::Lines(self.store.read().cube_names()),
            Command::AddCube { cube } => ok_or_error(self.store.write().add_cube(&cube)),
            Command::DelCube { cube } => ok_or_error(self.store.write().delete_cube(&cube)),
            Command::Cube { cube } => match self.store.read().partition_names(&cube) {
                Ok(partitions) => Reply::Lines(partitions),
                Err(error) => store_error(error),
            },
            Command::Part { cube, range } => {
                match self.store.read().column_values(&cube, &range) {
                    Ok(values) => Reply::MapOfLists(values),
                    Err(error) => store_error(error),
                }
            }
            Command::DelPart { cube, from, to } => {
                let mut store = self.store.write();
                let result = match &to {
                    Some(to) => store.delete_partition_range(&cube, &from, to).map(|_| ()),
                    None => store.delete_partition(&cube, &from),
                };
                ok_or_error(result)
            }
            Command::Insert {
                cube,
                partition,
                row,
                count,
            } => {
                self.store.write().insert(&cube, &partition, &row, count);
                Reply::Ok
            }
            Command::Count { cube, query } => match self.store.read().count(&cube, &query) {
                Ok(RangeCount::Total(count)) => Reply::Count(count),
                Ok(RangeCount::Grouped(histogram)) => Reply::Map(histogram),
                Err(error) => store_error(error),
            },
            Command::PCount { cube, query } => match self.store.read().pcount(&cube, &query) {
                Ok(PartitionRangeCount::Totals(totals)) => Reply::Map(totals),
                Ok(PartitionRangeCount::Grouped(histograms)) => Reply::NestedMap(histograms),
                Err(error) => store_error(error),
            },
            Command::Dump => self.dump(),
        }
    }

    fn dump(&self) -> Reply {
        let dir = match &self.dump_path {
            Some(dir) => dir,
            None => {
                warn!("DUMP requested but no dump path is configured");
                return Reply::Error(WireError::Generic);
            }
        };

        let store = self.store.read();
        match cubedb_dump::dump(&store, dir) {
            Ok(()) => Reply::Ok,
            Err(source) => {
                error!(%source, "dump failed");
                Reply::Error(WireError::Generic)
            }
        }
    }
}

fn ok_or_error(result: Result<(), StoreError>) -> Reply {
    match result {
        Ok(()) => Reply::Ok,
        Err(error) => store_error(error),
    }
}

fn store_error(error: StoreError) -> Reply {
    let code = match error {
        StoreError::CubeNotFound { .. } | StoreError::PartitionNotFound { .. } => {
            WireError::ObjectNotFound
        }
        StoreError::CubeExists { .. } => WireError::ObjectExists,
    };
    Reply::Error(code)
}
