//! Entrypoint for the CubeDB server.
#![deny(rustdoc::broken_intra_doc_links, rustdoc::bare_urls, rust_2018_idioms)]
#![warn(
    missing_debug_implementations,
    clippy::explicit_iter_loop,
    clippy::use_self,
    clippy::clone_on_ref_ptr
)]

use clap::Parser;
use cubedb_server::CubeDb;
use cubedb_store::Store;
use observability_deps::tracing::info;
use snafu::{ResultExt, Snafu};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

mod logging;

#[derive(Debug, Snafu)]
enum Error {
    #[snafu(display("error initialising logging: {}", source))]
    InitLogging { source: logging::Error },

    #[snafu(display("error restoring dump from {:?}: {}", path, source))]
    Restore {
        path: PathBuf,
        source: cubedb_dump::Error,
    },

    #[snafu(display("error binding 0.0.0.0:{}: {}", port, source))]
    Bind { port: u16, source: std::io::Error },

    #[snafu(display("server failed: {}", source))]
    Serve { source: cubedb_server::Error },
}

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Parser)]
#[clap(
    name = "cubedb",
    about = "In-memory aggregation store for small categorical columns",
    long_about = "CubeDB server.\n\nHolds named cubes of date-like partitions and answers \
    grouped, filtered counting queries over partition ranges through a \
    line-oriented TCP protocol.\n\nConfiguration options below can be set either with the \
    command line flags or with the specified environment variable. If there is a file named \
    '.env' in the current working directory, it is sourced before loading the configuration."
)]
struct Config {
    /// TCP port to listen on.
    #[clap(
        long = "--port",
        env = "CUBEDB_PORT",
        default_value = "1985",
        action
    )]
    port: u16,

    /// Log filter: an EnvFilter directive such as "info" or
    /// "cubedb_server=debug", or a bare digit 0-4 for the legacy levels.
    #[clap(
        long = "--log-level",
        env = "CUBEDB_LOG_LEVEL",
        default_value = "info",
        action
    )]
    log_level: String,

    /// Directory for DUMP snapshots. Enables the DUMP command and restores
    /// the latest snapshot on startup.
    #[clap(long = "--dump-path", env = "CUBEDB_DUMP_PATH", action)]
    dump_path: Option<PathBuf>,
}

fn main() {
    load_dotenv();
    let config = Config::parse();

    if let Err(error) = run(config) {
        eprintln!("cubedb: {}", error);
        std::process::exit(1);
    }
}

#[tokio::main]
async fn run(config: Config) -> Result<()> {
    logging::init(&config.log_level).context(InitLoggingSnafu)?;

    let store = match &config.dump_path {
        Some(path) => cubedb_dump::restore(path)
            .context(RestoreSnafu { path })?
            .unwrap_or_default(),
        None => Store::new(),
    };

    let db = Arc::new(CubeDb::new(store, config.dump_path.clone()));

    let listener = TcpListener::bind(("0.0.0.0", config.port))
        .await
        .context(BindSnafu { port: config.port })?;
    info!(port = config.port, dump_path = ?config.dump_path, "starting cubedb");

    cubedb_server::serve(listener, db).await.context(ServeSnafu)
}

/// Source `.env` before clap reads the environment. A missing file is
/// fine; an unreadable one is not.
fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(_) => {}
        Err(dotenvy::Error::Io(source))
            if source.kind() == std::io::ErrorKind::NotFound => {}
        Err(source) => {
            eprintln!("FATAL error loading config from .env: {}", source);
            std::process::exit(1);
        }
    }
}
