//! Logging bootstrap for meterlink binaries
//!
//! Console output always uses the bracketed format
//! `2025-12-02T00:50:44.809Z [INFO] message`. A daily rolling log file can be
//! added; its non-blocking writer guard lives for the rest of the process.
//! `RUST_LOG`, when set, replaces the configured level entirely.

use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock, PoisonError};

use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{
        self,
        format::Writer,
        FmtContext, FormatEvent, FormatFields,
    },
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// Bracketed level tag: `[INFO]`, `[WARN]`, ...
fn level_tag(level: Level) -> &'static str {
    match level {
        Level::TRACE => "[TRACE]",
        Level::DEBUG => "[DEBUG]",
        Level::INFO => "[INFO]",
        Level::WARN => "[WARN]",
        Level::ERROR => "[ERROR]",
    }
}

fn level_color(level: Level) -> &'static str {
    match level {
        Level::TRACE => "\x1b[35m",
        Level::DEBUG => "\x1b[34m",
        Level::INFO => "\x1b[32m",
        Level::WARN => "\x1b[33m",
        Level::ERROR => "\x1b[31m",
    }
}

/// `2025-12-02T00:50:44.809Z [INFO] message`
struct BracketedLevelFormat;

impl<S, N> FormatEvent<S, N> for BracketedLevelFormat
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let level = *event.metadata().level();
        let stamp = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ");
        if writer.has_ansi_escapes() {
            write!(writer, "{stamp} {}{}\x1b[0m ", level_color(level), level_tag(level))?;
        } else {
            write!(writer, "{stamp} {} ", level_tag(level))?;
        }
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

// File writer guards; dropping one stops its background writer
static GUARDS: OnceLock<Mutex<Vec<WorkerGuard>>> = OnceLock::new();

/// Set once from `METERLINK_LOG_DIR`, the configured dir, or "logs"
static LOG_ROOT: OnceLock<PathBuf> = OnceLock::new();

const LOG_DIR_ENV: &str = "METERLINK_LOG_DIR";

fn env_log_dir() -> Option<PathBuf> {
    std::env::var_os(LOG_DIR_ENV).map(PathBuf::from)
}

/// Fix the log root for the rest of the process
///
/// `METERLINK_LOG_DIR` wins over `config_dir`, which wins over "logs".
pub fn init_log_root(config_dir: Option<&str>) {
    LOG_ROOT.get_or_init(|| {
        env_log_dir()
            .or_else(|| config_dir.map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("logs"))
    });
}

/// Log root directory
///
/// Before [`init_log_root`] this is the environment value or "logs"; test
/// binaries use the system temp directory instead.
pub fn get_log_root() -> PathBuf {
    if let Some(root) = LOG_ROOT.get() {
        return root.clone();
    }
    env_log_dir().unwrap_or_else(|| {
        if is_test_environment() {
            std::env::temp_dir().join("meterlink-test-logs")
        } else {
            PathBuf::from("logs")
        }
    })
}

/// Running under `cargo test`
fn is_test_environment() -> bool {
    std::env::var_os("CARGO_TARGET_TMPDIR").is_some()
        || std::env::current_exe().is_ok_and(|exe| {
            let path = exe.to_string_lossy();
            path.contains("target/debug/deps") || path.contains("target/release/deps")
        })
}

/// Logger configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Binary name, used as the log file prefix
    pub service_name: String,
    /// Directory for the rolling log file
    pub log_dir: PathBuf,
    pub level: Level,
    /// JSON lines instead of the bracketed format
    pub enable_json: bool,
    /// Also write a daily rolling file under `log_dir`
    pub enable_file: bool,
    /// Colored console level tags
    pub enable_ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "meterlink".to_string(),
            log_dir: get_log_root(),
            level: Level::INFO,
            enable_json: false,
            enable_file: false,
            enable_ansi: true,
        }
    }
}

/// Filter directives for `config`, unless `rust_log` overrides them
fn filter_directives(config: &LogConfig, rust_log: Option<String>) -> String {
    match rust_log {
        Some(env) if !env.trim().is_empty() => env,
        // sqlx logs every statement at debug
        _ => format!("{},sqlx=warn", config.level.as_str().to_lowercase()),
    }
}

/// File name prefix of the rolling log; the appender adds `.YYYY-MM-DD`
pub fn log_file_prefix(service_name: &str) -> String {
    format!("{service_name}.log")
}

/// Initialize logging system with configuration
///
/// Fails if a global subscriber is already installed.
pub fn init_with_config(config: LogConfig) -> Result<(), Box<dyn std::error::Error>> {
    let directives = filter_directives(&config, std::env::var("RUST_LOG").ok());
    let env_filter = EnvFilter::try_new(&directives)?;

    let console_layer = if config.enable_json {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(config.enable_ansi)
            .event_format(BracketedLevelFormat)
            .boxed()
    };

    let file_layer = if config.enable_file {
        fs::create_dir_all(&config.log_dir)?;
        let appender =
            tracing_appender::rolling::daily(&config.log_dir, log_file_prefix(&config.service_name));
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);

        GUARDS
            .get_or_init(Default::default)
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(guard);

        let layer = if config.enable_json {
            fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_target(true)
                .boxed()
        } else {
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .event_format(BracketedLevelFormat)
                .boxed()
        };
        Some(layer)
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()?;

    if config.enable_file {
        tracing::info!("Logging: {} @ {:?}", config.service_name, config.log_dir);
    }
    tracing::debug!("Log filter: {}", directives);
    Ok(())
}

/// Console-only logging at `level` ("info", "debug", ...)
pub fn init(level: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = LogConfig {
        level: level.parse().unwrap_or(Level::INFO),
        ..Default::default()
    };
    init_with_config(config)
}
