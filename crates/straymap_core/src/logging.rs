//! Process-wide file logging.
//!
//! # Responsibility
//! - Start one rolling `straymap` file sink for every `log` event of the core.
//! - Record startup with the schema version this binary migrates to.
//! - Capture panics as single-line `panic_captured` events.
//!
//! # Invariants
//! - Initialization is idempotent for the same `LoggingConfig`; a different
//!   config is rejected with `LoggingError::Conflict`.
//! - Events are `key=value` lines starting with `event=` and `module=`;
//!   issue titles, descriptions and tag names are never logged.

use crate::db::migrations::latest_version;
use flexi_logger::{
    Cleanup, Criterion, FileSpec, FlexiLoggerError, LogSpecification, Logger, LoggerHandle,
    Naming, WriteMode,
};
use log::{error, info, LevelFilter};
use once_cell::sync::OnceCell;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::str::FromStr;

const LOG_FILE_BASENAME: &str = "straymap";
const MAX_LOG_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
const MAX_LOG_FILES: usize = 5;
const MAX_PANIC_PAYLOAD_CHARS: usize = 160;

static ACTIVE: OnceCell<ActiveLogger> = OnceCell::new();

#[derive(Debug)]
pub enum LoggingError {
    InvalidLevel(String),
    InvalidLogDir(String),
    Conflict {
        active: LoggingConfig,
        requested: LoggingConfig,
    },
    CreateDir {
        log_dir: PathBuf,
        source: std::io::Error,
    },
    Backend(FlexiLoggerError),
}

impl Display for LoggingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidLevel(level) => write!(
                f,
                "unsupported log level `{level}`; expected off|error|warn|info|debug|trace"
            ),
            Self::InvalidLogDir(reason) => write!(f, "invalid log directory: {reason}"),
            Self::Conflict { active, requested } => write!(
                f,
                "logging already runs at {} in `{}`; refusing {} in `{}`",
                active.level,
                active.log_dir.display(),
                requested.level,
                requested.log_dir.display()
            ),
            Self::CreateDir { log_dir, source } => write!(
                f,
                "failed to create log directory `{}`: {source}",
                log_dir.display()
            ),
            Self::Backend(err) => write!(f, "failed to start logger: {err}"),
        }
    }
}

impl Error for LoggingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::CreateDir { source, .. } => Some(source),
            Self::Backend(err) => Some(err),
            _ => None,
        }
    }
}

impl From<FlexiLoggerError> for LoggingError {
    fn from(value: FlexiLoggerError) -> Self {
        Self::Backend(value)
    }
}

/// Validated level and absolute log directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: LevelFilter,
    pub log_dir: PathBuf,
}

impl LoggingConfig {
    pub fn new(level: &str, log_dir: &str) -> Result<Self, LoggingError> {
        let level = LevelFilter::from_str(level.trim())
            .map_err(|_| LoggingError::InvalidLevel(level.trim().to_string()))?;

        let log_dir = log_dir.trim();
        if log_dir.is_empty() {
            return Err(LoggingError::InvalidLogDir("path is empty".to_string()));
        }
        let log_dir = Path::new(log_dir);
        if !log_dir.is_absolute() {
            return Err(LoggingError::InvalidLogDir(format!(
                "`{}` is not absolute",
                log_dir.display()
            )));
        }

        Ok(Self {
            level,
            log_dir: log_dir.to_path_buf(),
        })
    }
}

struct ActiveLogger {
    config: LoggingConfig,
    _handle: LoggerHandle,
}

/// Starts file logging at `level` under the absolute directory `log_dir`.
pub fn init_logging(level: &str, log_dir: &str) -> Result<(), LoggingError> {
    let requested = LoggingConfig::new(level, log_dir)?;
    let active = ACTIVE.get_or_try_init(|| start(&requested))?;
    if active.config != requested {
        return Err(LoggingError::Conflict {
            active: active.config.clone(),
            requested,
        });
    }
    Ok(())
}

/// `debug` for debug builds, `info` for release builds.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

fn start(config: &LoggingConfig) -> Result<ActiveLogger, LoggingError> {
    std::fs::create_dir_all(&config.log_dir).map_err(|source| LoggingError::CreateDir {
        log_dir: config.log_dir.clone(),
        source,
    })?;

    let handle = Logger::with(LogSpecification::builder().default(config.level).build())
        .log_to_file(
            FileSpec::default()
                .directory(&config.log_dir)
                .basename(LOG_FILE_BASENAME),
        )
        .rotate(
            Criterion::Size(MAX_LOG_FILE_SIZE_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(MAX_LOG_FILES),
        )
        .write_mode(WriteMode::BufferAndFlush)
        .append()
        .format_for_files(flexi_logger::detailed_format)
        .start()?;

    install_panic_hook();
    info!(
        "event=app_start module=logging status=ok version={} schema_version={} platform={} level={} log_dir={}",
        env!("CARGO_PKG_VERSION"),
        latest_version(),
        std::env::consts::OS,
        config.level,
        config.log_dir.display()
    );

    Ok(ActiveLogger {
        config: config.clone(),
        _handle: handle,
    })
}

/// Runs once, from the first successful `start`.
fn install_panic_hook() {
    let previous_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let location = panic_info
            .location()
            .map_or_else(|| "unknown".to_string(), |loc| format!("{}:{}", loc.file(), loc.line()));
        let payload = panic_info
            .payload()
            .downcast_ref::<&str>()
            .map(|message| (*message).to_string())
            .or_else(|| panic_info.payload().downcast_ref::<String>().cloned())
            .map_or_else(|| "non-string panic payload".to_string(), |message| single_line(&message));
        error!(
            "event=panic_captured module=logging status=error location={location} payload={payload}"
        );
        previous_hook(panic_info);
    }));
}

fn single_line(message: &str) -> String {
    let flat: String = message
        .split(['\n', '\r'])
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if flat.chars().count() <= MAX_PANIC_PAYLOAD_CHARS {
        return flat;
    }
    let mut capped: String = flat.chars().take(MAX_PANIC_PAYLOAD_CHARS).collect();
    capped.push_str("...");
    capped
}

#[cfg(test)]
mod tests {
    use super::{init_logging, single_line, LoggingConfig, LoggingError, MAX_PANIC_PAYLOAD_CHARS};
    use log::LevelFilter;

    #[test]
    fn config_parses_level_case_insensitively() {
        let dir = tempfile::tempdir().unwrap();
        let dir = dir.path().to_str().unwrap();
        assert_eq!(LoggingConfig::new(" WARN ", dir).unwrap().level, LevelFilter::Warn);
        assert!(matches!(
            LoggingConfig::new("verbose", dir),
            Err(LoggingError::InvalidLevel(level)) if level == "verbose"
        ));
    }

    #[test]
    fn config_rejects_relative_and_blank_dirs() {
        assert!(matches!(
            LoggingConfig::new("info", "logs/dev"),
            Err(LoggingError::InvalidLogDir(_))
        ));
        assert!(matches!(
            LoggingConfig::new("info", "  "),
            Err(LoggingError::InvalidLogDir(_))
        ));
    }

    #[test]
    fn panic_payload_is_flattened_and_capped() {
        assert_eq!(single_line("first\r\nsecond"), "first second");
        let long = single_line(&"x".repeat(MAX_PANIC_PAYLOAD_CHARS + 10));
        assert!(long.ends_with("..."));
        assert_eq!(long.chars().count(), MAX_PANIC_PAYLOAD_CHARS + 3);
    }

    #[test]
    fn init_logging_is_idempotent_and_rejects_conflicts() {
        let log_dir = tempfile::tempdir().unwrap();
        let other_dir = tempfile::tempdir().unwrap();
        let log_dir_str = log_dir.path().to_str().unwrap();
        let other_dir_str = other_dir.path().to_str().unwrap();

        init_logging("info", log_dir_str).unwrap();
        init_logging("INFO", log_dir_str).unwrap();

        match init_logging("debug", log_dir_str) {
            Err(LoggingError::Conflict { active, requested }) => {
                assert_eq!(active.level, LevelFilter::Info);
                assert_eq!(requested.level, LevelFilter::Debug);
            }
            other => panic!("expected level conflict, got {other:?}"),
        }
        assert!(matches!(
            init_logging("info", other_dir_str),
            Err(LoggingError::Conflict { .. })
        ));

        log::info!("event=log_write_check module=logging status=ok");
        log::logger().flush();
        let written = std::fs::read_dir(log_dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .any(|entry| entry.file_name().to_string_lossy().starts_with("straymap"));
        assert!(written);
    }
}
