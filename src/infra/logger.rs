// ============================================================
// Layer 6: Run Logger
// ============================================================
// Every run logs to two places at once:
//
//   - a file under the log directory (default ./libcity/log)
//     named {exp_id}-{model}-{dataset}-{task}-{local time}.log
//   - standard output
//
// Both sinks use the same line format:
//
//   2024-01-05 14:30:00,123 - INFO - message
//
// The level comes from the `log_level` config key
// (info | debug | error | warning | critical, any case).
// Anything else falls back to info. tracing has no critical
// level, so critical maps to ERROR.
//
// get_logger() does not touch the global subscriber. The
// returned Logger owns a tracing Dispatch which the caller
// installs either for the current thread (scoped / in_scope)
// or for the whole process (install). The log file stays open
// for as long as the dispatch is alive, and every line is
// written straight through to it.

use std::{
    fmt,
    fs::{self, OpenOptions},
    path::{Path, PathBuf},
    sync::Mutex,
};

use chrono::Local;
use tracing::{dispatcher::DefaultGuard, Dispatch, Event, Level, Subscriber};
use tracing_subscriber::{
    filter::LevelFilter,
    fmt::{format, FmtContext, FormatEvent, FormatFields},
    layer::SubscriberExt,
    registry::LookupSpan,
};

use crate::domain::error::{PipelineError, Result};
use crate::infra::config::PipelineConfig;

pub const DEFAULT_LOG_DIR: &str = "./libcity/log";

/// Local time formatted as `Jan-05-2024_14-30-00`, used in file names.
pub fn get_local_time() -> String {
    Local::now().format("%b-%d-%Y_%H-%M-%S").to_string()
}

/// Create `dir` (and its parents) if it does not exist yet.
pub fn ensure_dir(dir: impl AsRef<Path>) -> Result<()> {
    let dir = dir.as_ref();
    if !dir.exists() {
        fs::create_dir_all(dir).map_err(|e| PipelineError::io(dir, e))?;
    }
    Ok(())
}

/// Map a `log_level` config value to a tracing level.
pub fn parse_log_level(value: &str) -> Level {
    match value.to_lowercase().as_str() {
        "debug"              => Level::DEBUG,
        "warning"            => Level::WARN,
        "error" | "critical" => Level::ERROR,
        _                    => Level::INFO,
    }
}

// ─── Line Format ──────────────────────────────────────────────────────────────
/// `<timestamp> - <LEVEL> - <message>`
#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineFormat;

impl<S, N> FormatEvent<S, N> for PipelineFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let level = match event.metadata().level().as_str() {
            "WARN" => "WARNING",
            other  => other,
        };
        write!(writer, "{} - {} - ", Local::now().format("%Y-%m-%d %H:%M:%S,%3f"), level)?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

// ─── Logger ───────────────────────────────────────────────────────────────────
/// A configured file + stdout logger, not yet installed.
pub struct Logger {
    dispatch: Dispatch,
    log_dir:  PathBuf,
    log_path: PathBuf,
    level:    Level,
}

impl Logger {
    pub fn log_dir(&self) -> &Path { &self.log_dir }

    pub fn log_path(&self) -> &Path { &self.log_path }

    pub fn level(&self) -> Level { self.level }

    pub fn dispatch(&self) -> &Dispatch { &self.dispatch }

    /// Route this thread's events to the logger until the guard drops.
    pub fn scoped(&self) -> DefaultGuard {
        tracing::dispatcher::set_default(&self.dispatch)
    }

    /// Run `f` with this logger as the thread's default.
    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        tracing::dispatcher::with_default(&self.dispatch, f)
    }

    /// Make this the process-wide logger. Fails if one is already set.
    pub fn install(&self) -> Result<()> {
        tracing::dispatcher::set_global_default(self.dispatch.clone())
            .map_err(|e| PipelineError::Logger(e.to_string()))
    }
}

/// Build the run logger described by `config`.
///
/// Reads `exp_id`, `model`, `dataset` and `task` for the file name
/// and `log_level` for the level. `save_dir` overrides the default
/// log directory.
pub fn get_logger(config: &PipelineConfig, save_dir: Option<&Path>) -> Result<Logger> {
    let log_dir = save_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR));
    ensure_dir(&log_dir)?;

    let log_filename = format!(
        "{}-{}-{}-{}-{}.log",
        config.display_value("exp_id")?,
        config.display_value("model")?,
        config.display_value("dataset")?,
        config.display_value("task")?,
        get_local_time(),
    );
    let log_path = log_dir.join(log_filename);

    let level = parse_log_level(config.get_str("log_level")?.unwrap_or("info"));

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .map_err(|e| PipelineError::io(&log_path, e))?;

    let file_layer = tracing_subscriber::fmt::layer()
        .event_format(PipelineFormat)
        .with_ansi(false)
        .with_writer(Mutex::new(file));

    let console_layer = tracing_subscriber::fmt::layer()
        .event_format(PipelineFormat)
        .with_ansi(false)
        .with_writer(std::io::stdout);

    let subscriber = tracing_subscriber::registry()
        .with(LevelFilter::from_level(level))
        .with(file_layer)
        .with(console_layer);

    let logger = Logger {
        dispatch: Dispatch::new(subscriber),
        log_dir,
        log_path,
        level,
    };

    logger.in_scope(|| tracing::info!("Log directory: {}", logger.log_dir.display()));
    Ok(logger)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PipelineConfig {
        PipelineConfig::new()
            .with("exp_id", 7)
            .with("model", "CAW")
            .with("dataset", "wikipedia")
            .with("task", "link_prediction")
    }

    #[test]
    fn test_local_time_format() {
        let t = get_local_time();
        // e.g. Jan-05-2024_14-30-00
        assert_eq!(t.len(), 20);
        assert_eq!(&t[3..4], "-");
        assert_eq!(&t[6..7], "-");
        assert_eq!(&t[11..12], "_");
        assert_eq!(t[12..].matches('-').count(), 2);
    }

    #[test]
    fn test_parse_log_level() {
        assert_eq!(parse_log_level("DEBUG"), Level::DEBUG);
        assert_eq!(parse_log_level("Warning"), Level::WARN);
        assert_eq!(parse_log_level("critical"), Level::ERROR);
        assert_eq!(parse_log_level("error"), Level::ERROR);
        assert_eq!(parse_log_level("verbose"), Level::INFO);
    }

    #[test]
    fn test_ensure_dir_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        ensure_dir(&nested).unwrap();
        ensure_dir(&nested).unwrap();
        assert!(nested.is_dir());
    }

    #[test]
    fn test_file_name_and_record_format() {
        let dir = tempfile::tempdir().unwrap();
        let log_dir = dir.path().join("log");
        let logger = get_logger(&config(), Some(&log_dir)).unwrap();

        let name = logger.log_path().file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("7-CAW-wikipedia-link_prediction-"), "{name}");
        assert!(name.ends_with(".log"));

        logger.in_scope(|| {
            tracing::info!("split done");
            tracing::warn!("few samples");
            tracing::debug!("hidden at info level");
        });

        let text = fs::read_to_string(logger.log_path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3, "{text}");
        assert!(lines[0].contains(" - INFO - Log directory: "));
        assert!(lines[1].ends_with(" - INFO - split done"));
        assert!(lines[2].ends_with(" - WARNING - few samples"));
        // "YYYY-MM-DD HH:MM:SS,mmm" prefix
        assert_eq!(&lines[1][4..5], "-");
        assert_eq!(&lines[1][19..20], ",");
    }

    #[test]
    fn test_debug_level_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config().with("log_level", "DEBUG");
        let logger = get_logger(&cfg, Some(dir.path())).unwrap();
        assert_eq!(logger.level(), Level::DEBUG);

        logger.in_scope(|| tracing::debug!("visible"));
        let text = fs::read_to_string(logger.log_path()).unwrap();
        assert!(text.contains(" - DEBUG - visible"));
    }

    #[test]
    fn test_missing_name_key_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = PipelineConfig::new().with("exp_id", 1);
        let err = get_logger(&cfg, Some(dir.path())).err().unwrap();
        assert!(matches!(err, PipelineError::NotFound { .. }));
    }
}
