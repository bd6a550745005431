//! Logging bootstrap for the server binary.
//!
//! `--log-level` accepts any `EnvFilter` directive; the original server
//! took bare digits, so those are mapped onto sensible levels rather than
//! rejected.

use snafu::{ResultExt, Snafu};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("invalid log level {:?}: {}", spec, source))]
    InvalidFilter {
        spec: String,
        source: tracing_subscriber::filter::ParseError,
    },

    #[snafu(display("error installing the log adapter: {}", source))]
    InstallLogAdapter {
        source: tracing_log::log::SetLoggerError,
    },

    #[snafu(display("error installing the global subscriber: {}", source))]
    InstallSubscriber {
        source: observability_deps::tracing::subscriber::SetGlobalDefaultError,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The legacy numeric levels of the original server, lowest first.
fn legacy_level(spec: &str) -> Option<&'static str> {
    match spec {
        "0" => Some("error"),
        "1" => Some("warn"),
        "2" => Some("info"),
        "3" => Some("debug"),
        "4" => Some("trace"),
        _ => None,
    }
}

/// Install the process-wide subscriber for `spec`.
pub fn init(spec: &str) -> Result<()> {
    let directive = legacy_level(spec).unwrap_or(spec);
    let filter = EnvFilter::try_new(directive).context(InvalidFilterSnafu { spec })?;

    tracing_log::LogTracer::init().context(InstallLogAdapterSnafu)?;
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).finish();
    observability_deps::tracing::subscriber::set_global_default(subscriber)
        .context(InstallSubscriberSnafu)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_levels_map_onto_directives() {
        assert_eq!(legacy_level("0"), Some("error"));
        assert_eq!(legacy_level("4"), Some("trace"));
        assert_eq!(legacy_level("info"), None);
        assert_eq!(legacy_level("5"), None);
    }
}
