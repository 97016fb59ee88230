//! Run logs
//!
//! Every run appends to a daily log file in the XDG state directory:
//!
//! ```text
//! ~/.local/state/sesh/
//! ├── sesh.2024-03-15.log
//! └── sesh.2024-03-17.log      newest; older files pruned past `max_files`
//! ```
//!
//! Lines emitted inside [`run_span`] carry the run id and input directory,
//! and the span's close line records how long the run took:
//!
//! ```text
//! INFO run{run_id=6f1c… input=/exports}: sesh_core::ingest: Load finished ...
//! INFO run{run_id=6f1c… input=/exports}: sesh_core::logging: close time.busy=412ms time.idle=9µs
//! ```

use crate::config::{Config, LoggingConfig};
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::Subscriber;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::{self, format::FmtSpan};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};
use uuid::Uuid;

const LOG_FILE_PREFIX: &str = "sesh";
const LOG_FILE_SUFFIX: &str = "log";

/// Level used when the configured directive does not parse.
const FALLBACK_LEVEL: &str = "info";

/// Log to the XDG state directory. `RUST_LOG` overrides `config.level`.
///
/// Keep the returned guard alive for the whole run; dropping it flushes.
pub fn init(config: &LoggingConfig) -> Result<LoggingGuard> {
    init_in(&Config::state_dir(), config)
}

/// Log to daily files under `dir`.
pub fn init_in(dir: &Path, config: &LoggingConfig) -> Result<LoggingGuard> {
    std::fs::create_dir_all(dir)?;
    let appender = open_appender(dir, config.max_files)?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let (filter, rejected) = match EnvFilter::try_from_default_env() {
        Ok(filter) => (filter, None),
        Err(_) => level_filter(&config.level),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer(writer))
        .try_init()
        .map_err(|e| Error::Config(format!("logging already initialized: {}", e)))?;

    if let Some(reason) = rejected {
        tracing::warn!(level = %config.level, %reason, "Invalid log level, using {}", FALLBACK_LEVEL);
    }
    tracing::debug!(log_dir = %dir.display(), max_files = config.max_files, "Logging initialized");

    Ok(LoggingGuard {
        dir: dir.to_path_buf(),
        _guard: guard,
    })
}

/// Span wrapping one report run.
pub fn run_span(run_id: Uuid, input: &Path) -> tracing::Span {
    tracing::info_span!("run", run_id = %run_id, input = %input.display())
}

/// Logging for unit tests: stdout capture, `RUST_LOG` filter.
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .with_span_events(FmtSpan::CLOSE)
        .try_init();
}

/// Keeps the background log writer alive.
pub struct LoggingGuard {
    dir: PathBuf,
    _guard: WorkerGuard,
}

impl LoggingGuard {
    /// Directory the log files are written to.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

fn open_appender(dir: &Path, max_files: usize) -> Result<RollingFileAppender> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix(LOG_FILE_SUFFIX)
        .max_log_files(max_files.max(1))
        .build(dir)
        .map_err(|e| Error::Config(format!("failed to open log file in {}: {}", dir.display(), e)))
}

fn file_layer<S>(writer: NonBlocking) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
}

/// Filter for a configured level directive, or the fallback level plus the
/// parse error when the directive is unusable.
fn level_filter(level: &str) -> (EnvFilter, Option<String>) {
    match EnvFilter::try_new(level) {
        Ok(filter) => (filter, None),
        Err(e) => (EnvFilter::new(FALLBACK_LEVEL), Some(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_logs(dir: &Path) -> String {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|entry| std::fs::read_to_string(entry.unwrap().path()).unwrap())
            .collect()
    }

    #[test]
    fn test_level_filter_accepts_directives() {
        assert!(level_filter("debug").1.is_none());
        assert!(level_filter("warn,sesh_core::ingest=trace").1.is_none());
    }

    #[test]
    fn test_level_filter_falls_back_on_garbage() {
        let (_, rejected) = level_filter("sesh_core=loud");
        assert!(rejected.is_some());
    }

    #[test]
    fn test_run_span_fields_reach_the_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let appender = open_appender(dir.path(), 3).unwrap();
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let subscriber = tracing_subscriber::registry().with(file_layer(writer));
        let run_id = Uuid::new_v4();

        tracing::subscriber::with_default(subscriber, || {
            let span = run_span(run_id, Path::new("/exports"));
            let _enter = span.enter();
            tracing::info!(files = 2, "Load finished");
        });
        drop(guard);

        let logs = read_logs(dir.path());
        let files: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(files.len(), 1);
        assert!(logs.contains(&format!("run_id={}", run_id)), "got:\n{logs}");
        assert!(logs.contains("input=/exports"));
        assert!(logs.contains("Load finished"));
        assert!(logs.contains("close"));
    }

    #[test]
    fn test_open_appender_names_files_after_the_app() {
        let dir = tempfile::tempdir().unwrap();
        let appender = open_appender(dir.path(), 0).unwrap();
        drop(appender);

        for entry in std::fs::read_dir(dir.path()).unwrap() {
            let name = entry.unwrap().file_name().to_string_lossy().into_owned();
            assert!(name.starts_with("sesh."), "unexpected log file {name}");
            assert!(name.ends_with(".log"));
        }
    }
}
