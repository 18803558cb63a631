//! `tracing` setup for the CLI and for services embedding the SDK.
//!
//! Console output always goes to stderr so stdout stays clean for command
//! results. With a log directory, a JSON layer with daily rotation is added.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Rolling file name prefix inside the logs directory.
pub const LOG_FILE_PREFIX: &str = "wacloud.log";

/// HTTP stack crates are capped at `warn` unless `RUST_LOG` says otherwise.
const QUIET_DEPENDENCIES: &str = "hyper=warn,hyper_util=warn,reqwest=warn";

/// Keeps the non-blocking file writer alive. Dropping it flushes the file.
pub struct LoggingGuard {
    _guard: WorkerGuard,
}

/// `RUST_LOG` when set, else `default_level` plus the dependency caps.
/// An unparsable `default_level` falls back to `info`.
fn filter(default_level: &str) -> EnvFilter {
    if let Ok(from_env) = EnvFilter::try_from_default_env() {
        return from_env;
    }
    EnvFilter::try_new(format!("{default_level},{QUIET_DEPENDENCIES}"))
        .unwrap_or_else(|_| EnvFilter::new(format!("info,{QUIET_DEPENDENCIES}")))
}

/// Install the subscriber the CLI uses: file logging when `logs_dir` is
/// given, stderr only otherwise.
///
/// # Errors
///
/// Same as [`init_production`].
pub fn init(default_level: &str, logs_dir: Option<&Path>) -> anyhow::Result<Option<LoggingGuard>> {
    match logs_dir {
        Some(dir) => init_production(dir, default_level).map(Some),
        None => {
            init_cli(default_level);
            Ok(None)
        }
    }
}

/// JSON file logging to `{logs_dir}/wacloud.log.YYYY-MM-DD` plus stderr.
///
/// The directory is created before the subscriber is installed.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or a global
/// subscriber is already installed.
pub fn init_production(logs_dir: &Path, default_level: &str) -> anyhow::Result<LoggingGuard> {
    std::fs::create_dir_all(logs_dir).map_err(|e| {
        anyhow::anyhow!(
            "failed to create logs directory {}: {e}",
            logs_dir.display()
        )
    })?;

    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(logs_dir, LOG_FILE_PREFIX));

    tracing_subscriber::registry()
        .with(filter(default_level))
        .with(tracing_subscriber::fmt::layer().json().with_writer(writer))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))?;

    Ok(LoggingGuard { _guard: guard })
}

/// Stderr-only logging. Leaves an already-installed subscriber in place.
pub fn init_cli(default_level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter(default_level))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
