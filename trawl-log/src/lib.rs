//! Logging for the trawl search client.
//!
//! Every trawl crate logs through the macros exported here. Output goes to
//! stderr in one of three formats and is configured from the environment:
//!
//! - `TRAWL_DEBUG=1` - enable debug logging
//! - `TRAWL_LOG_LEVEL=trace|debug|info|warn|error|off` - minimum level
//! - `TRAWL_LOG_FORMAT=pretty|compact|json` - output format (default `json`)
//! - `TRAWL_LOG_TIMESTAMPS=0` - drop timestamps from pretty/compact output
//!
//! # Usage
//!
//! ```rust
//! use trawl_log::{debug, info, warn};
//!
//! info!("Scroll started on {} indices", 2);
//! debug!(target: "trawl::scroll", "Fetched page with {} hits", 1000);
//! warn!("Failed to release scroll cursor");
//! ```
//!
//! Crates that log through the `log` facade can be routed here with
//! [`install`].
//!
//! # Capturing
//!
//! [`capture`] records every entry emitted on the current thread while a
//! closure runs, regardless of the configured level. Tests use it to assert
//! that a diagnostic was produced:
//!
//! ```rust
//! let (_, entries) = trawl_log::capture(|| trawl_log::warn!("path missing"));
//! assert_eq!(entries.len(), 1);
//! assert_eq!(entries[0].level, trawl_log::Level::Warn);
//! ```

use once_cell::sync::Lazy;
use std::cell::RefCell;
use std::env;
use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

// ============================================================================
// Levels and formats
// ============================================================================

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Level {
    /// Trace level (most verbose)
    Trace = 0,
    /// Debug level
    Debug = 1,
    /// Info level
    Info = 2,
    /// Warning level
    Warn = 3,
    /// Error level (least verbose)
    Error = 4,
    /// No logging
    Off = 5,
}

impl Level {
    /// Parse a level name, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "trace" => Some(Level::Trace),
            "debug" => Some(Level::Debug),
            "info" => Some(Level::Info),
            "warn" | "warning" => Some(Level::Warn),
            "error" => Some(Level::Error),
            "off" | "none" => Some(Level::Off),
            _ => None,
        }
    }

    /// Upper-case level name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Off => "OFF",
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => Level::Trace,
            1 => Level::Debug,
            2 => Level::Info,
            3 => Level::Warn,
            4 => Level::Error,
            _ => Level::Off,
        }
    }
}

impl From<log::Level> for Level {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Trace => Level::Trace,
            log::Level::Debug => Level::Debug,
            log::Level::Info => Level::Info,
            log::Level::Warn => Level::Warn,
            log::Level::Error => Level::Error,
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Multi-column human readable lines
    Pretty,
    /// Terse single-letter level lines
    Compact,
    /// One JSON object per line
    Json,
}

impl Format {
    /// Parse a format name, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pretty" => Some(Format::Pretty),
            "compact" => Some(Format::Compact),
            "json" => Some(Format::Json),
            _ => None,
        }
    }
}

// ============================================================================
// Configuration
// ============================================================================

static DEBUG_ENABLED: AtomicBool = AtomicBool::new(false);

static LOG_LEVEL: AtomicU8 = AtomicU8::new(Level::Info as u8);

static CONFIG: Lazy<LogConfig> = Lazy::new(LogConfig::from_env);

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Debug mode
    pub debug: bool,
    /// Minimum level
    pub level: Level,
    /// Output format
    pub format: Format,
    /// Prefix pretty/compact lines with a timestamp
    pub timestamps: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            debug: false,
            level: Level::Info,
            format: Format::Json,
            timestamps: true,
        }
    }
}

impl LogConfig {
    /// Read the configuration from `TRAWL_*` environment variables and
    /// publish its level to the global filter.
    pub fn from_env() -> Self {
        let debug = env_flag("TRAWL_DEBUG").unwrap_or(false);

        let level = env::var("TRAWL_LOG_LEVEL")
            .ok()
            .and_then(|s| Level::parse(&s))
            .unwrap_or(if debug { Level::Debug } else { Level::Info });

        let format = env::var("TRAWL_LOG_FORMAT")
            .ok()
            .and_then(|s| Format::parse(&s))
            .unwrap_or(Format::Json);

        let timestamps = env_flag("TRAWL_LOG_TIMESTAMPS").unwrap_or(true);

        DEBUG_ENABLED.store(debug, Ordering::SeqCst);
        LOG_LEVEL.store(level as u8, Ordering::SeqCst);

        Self {
            debug,
            level,
            format,
            timestamps,
        }
    }
}

fn env_flag(key: &str) -> Option<bool> {
    env::var(key)
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

/// Force configuration loading. Happens lazily on first use otherwise.
pub fn init() {
    Lazy::force(&CONFIG);
}

/// Global configuration.
pub fn config() -> &'static LogConfig {
    &CONFIG
}

/// Whether debug mode is on.
#[inline]
pub fn is_debug_enabled() -> bool {
    DEBUG_ENABLED.load(Ordering::Relaxed)
}

/// Whether `level` passes the global filter.
#[inline]
pub fn is_level_enabled(level: Level) -> bool {
    level != Level::Off && level as u8 >= LOG_LEVEL.load(Ordering::Relaxed)
}

/// Whether an entry at `level` would be recorded, either because it passes
/// the global filter or because a [`capture`] is active on this thread.
#[doc(hidden)]
#[inline]
pub fn enabled(level: Level) -> bool {
    init();
    is_level_enabled(level)
        || (level == Level::Debug && is_debug_enabled())
        || is_capturing()
}

/// Current minimum level.
pub fn current_level() -> Level {
    Level::from_u8(LOG_LEVEL.load(Ordering::Relaxed))
}

/// Change the minimum level at runtime.
pub fn set_level(level: Level) {
    init();
    LOG_LEVEL.store(level as u8, Ordering::SeqCst);
}

/// Toggle debug mode at runtime; turning it on also lowers the level to debug.
pub fn set_debug(enabled: bool) {
    init();
    DEBUG_ENABLED.store(enabled, Ordering::SeqCst);
    if enabled && current_level() > Level::Debug {
        set_level(Level::Debug);
    }
}

// ============================================================================
// Capture
// ============================================================================

/// One recorded log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Entry level
    pub level: Level,
    /// Module path or explicit target
    pub target: String,
    /// Formatted message
    pub message: String,
}

thread_local! {
    static CAPTURED: RefCell<Option<Vec<Entry>>> = const { RefCell::new(None) };
}

fn is_capturing() -> bool {
    CAPTURED.with(|c| c.borrow().is_some())
}

/// Run `f` and return its result together with every entry logged on this
/// thread while it ran. Captured entries are not written to stderr.
///
/// Nested captures are flattened into the innermost one.
pub fn capture<R>(f: impl FnOnce() -> R) -> (R, Vec<Entry>) {
    let outer = CAPTURED.with(|c| c.borrow_mut().replace(Vec::new()));
    let result = f();
    let entries = CAPTURED.with(|c| {
        let mut slot = c.borrow_mut();
        let entries = slot.take().unwrap_or_default();
        *slot = outer;
        entries
    });
    (result, entries)
}

// ============================================================================
// Output
// ============================================================================

/// Emit one entry. Called by the macros after the level check.
#[doc(hidden)]
pub fn log(level: Level, target: &str, message: &str) {
    let captured = CAPTURED.with(|c| match c.borrow_mut().as_mut() {
        Some(entries) => {
            entries.push(Entry {
                level,
                target: target.to_string(),
                message: message.to_string(),
            });
            true
        }
        None => false,
    });
    if captured {
        return;
    }

    let config = config();
    match config.format {
        Format::Pretty => write_pretty(level, target, message, config),
        Format::Compact => write_compact(level, target, message, config),
        Format::Json => write_json(level, target, message),
    }
}

fn write_pretty(level: Level, target: &str, message: &str, config: &LogConfig) {
    let mut stderr = std::io::stderr().lock();
    if config.timestamps {
        let now = chrono::Local::now();
        let _ = write!(stderr, "{} ", now.format("%Y-%m-%d %H:%M:%S%.3f"));
    }
    let _ = write!(stderr, "{:5} ", level.as_str());
    if !target.is_empty() {
        let _ = write!(stderr, "[{}] ", target);
    }
    let _ = writeln!(stderr, "{}", message);
}

fn write_compact(level: Level, target: &str, message: &str, config: &LogConfig) {
    let mut stderr = std::io::stderr().lock();
    if config.timestamps {
        let now = chrono::Local::now();
        let _ = write!(stderr, "{} ", now.format("%H:%M:%S"));
    }
    let _ = write!(stderr, "{} ", &level.as_str()[..1]);
    if !target.is_empty() {
        let _ = write!(stderr, "{}: ", target);
    }
    let _ = writeln!(stderr, "{}", message);
}

#[cfg(feature = "json")]
fn write_json(level: Level, target: &str, message: &str) {
    use serde::Serialize;

    #[derive(Serialize)]
    struct Line<'a> {
        timestamp: String,
        level: &'a str,
        target: &'a str,
        message: &'a str,
    }

    let line = Line {
        timestamp: chrono::Utc::now().to_rfc3339(),
        level: level.as_str(),
        target,
        message,
    };
    if let Ok(json) = serde_json::to_string(&line) {
        eprintln!("{}", json);
    }
}

#[cfg(not(feature = "json"))]
fn write_json(level: Level, target: &str, message: &str) {
    eprintln!(
        r#"{{"timestamp":"{}","level":"{}","target":{:?},"message":{:?}}}"#,
        chrono::Utc::now().to_rfc3339(),
        level.as_str(),
        target,
        message
    );
}

// ============================================================================
// `log` facade bridge
// ============================================================================

struct Bridge;

impl log::Log for Bridge {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        enabled(metadata.level().into())
    }

    fn log(&self, record: &log::Record<'_>) {
        let level = record.level().into();
        if enabled(level) {
            log(level, record.target(), &record.args().to_string());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static BRIDGE: Bridge = Bridge;

/// Route records from the `log` facade through this crate.
///
/// Fails if another global logger is already installed.
pub fn install() -> Result<(), log::SetLoggerError> {
    init();
    log::set_logger(&BRIDGE)?;
    log::set_max_level(log::LevelFilter::Trace);
    Ok(())
}

// ============================================================================
// Macros
// ============================================================================

/// Log at trace level.
#[macro_export]
macro_rules! trace {
    (target: $target:expr, $($arg:tt)+) => {
        if $crate::enabled($crate::Level::Trace) {
            $crate::log($crate::Level::Trace, $target, &format!($($arg)+));
        }
    };
    ($($arg:tt)+) => {
        if $crate::enabled($crate::Level::Trace) {
            $crate::log($crate::Level::Trace, module_path!(), &format!($($arg)+));
        }
    };
}

/// Log at debug level. Enabled by `TRAWL_DEBUG=1` or `TRAWL_LOG_LEVEL=debug`.
///
/// ```rust
/// use trawl_log::debug;
///
/// let scroll_id = "c2Nyb2xs";
/// debug!(target: "trawl::scroll", "Fetching next page with cursor {}", scroll_id);
/// ```
#[macro_export]
macro_rules! debug {
    (target: $target:expr, $($arg:tt)+) => {
        if $crate::enabled($crate::Level::Debug) {
            $crate::log($crate::Level::Debug, $target, &format!($($arg)+));
        }
    };
    ($($arg:tt)+) => {
        if $crate::enabled($crate::Level::Debug) {
            $crate::log($crate::Level::Debug, module_path!(), &format!($($arg)+));
        }
    };
}

/// Log at info level.
#[macro_export]
macro_rules! info {
    (target: $target:expr, $($arg:tt)+) => {
        if $crate::enabled($crate::Level::Info) {
            $crate::log($crate::Level::Info, $target, &format!($($arg)+));
        }
    };
    ($($arg:tt)+) => {
        if $crate::enabled($crate::Level::Info) {
            $crate::log($crate::Level::Info, module_path!(), &format!($($arg)+));
        }
    };
}

/// Log at warn level.
#[macro_export]
macro_rules! warn {
    (target: $target:expr, $($arg:tt)+) => {
        if $crate::enabled($crate::Level::Warn) {
            $crate::log($crate::Level::Warn, $target, &format!($($arg)+));
        }
    };
    ($($arg:tt)+) => {
        if $crate::enabled($crate::Level::Warn) {
            $crate::log($crate::Level::Warn, module_path!(), &format!($($arg)+));
        }
    };
}

/// Log at error level.
#[macro_export]
macro_rules! error {
    (target: $target:expr, $($arg:tt)+) => {
        if $crate::enabled($crate::Level::Error) {
            $crate::log($crate::Level::Error, $target, &format!($($arg)+));
        }
    };
    ($($arg:tt)+) => {
        if $crate::enabled($crate::Level::Error) {
            $crate::log($crate::Level::Error, module_path!(), &format!($($arg)+));
        }
    };
}

// ============================================================================
// Tracing bridge
// ============================================================================

#[cfg(feature = "tracing")]
pub mod tracing_compat {
    //! Builds a `tracing` subscriber whose filter follows `TRAWL_LOG_LEVEL`
    //! unless `RUST_LOG` is set.

    use super::*;

    /// Subscriber honouring the trawl level.
    pub fn subscriber() -> impl tracing::Subscriber {
        use tracing_subscriber::prelude::*;
        use tracing_subscriber::{EnvFilter, fmt};

        let level = match config().level {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Off => "off",
        };

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_ordering() {
        assert!(Level::Trace < Level::Debug);
        assert!(Level::Info < Level::Warn);
        assert!(Level::Error < Level::Off);
    }

    #[test]
    fn test_level_parse() {
        assert_eq!(Level::parse("DEBUG"), Some(Level::Debug));
        assert_eq!(Level::parse("warning"), Some(Level::Warn));
        assert_eq!(Level::parse("none"), Some(Level::Off));
        assert_eq!(Level::parse("loud"), None);
    }

    #[test]
    fn test_format_parse() {
        assert_eq!(Format::parse("Compact"), Some(Format::Compact));
        assert_eq!(Format::parse("json"), Some(Format::Json));
        assert_eq!(Format::parse("xml"), None);
    }

    #[test]
    fn test_from_log_level() {
        assert_eq!(Level::from(log::Level::Warn), Level::Warn);
        assert_eq!(Level::from(log::Level::Trace), Level::Trace);
    }

    #[test]
    fn test_capture_records_entries_in_order() {
        let (value, entries) = capture(|| {
            warn!("first {}", 1);
            error!(target: "trawl::test", "second");
            7
        });

        assert_eq!(value, 7);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].level, Level::Warn);
        assert_eq!(entries[0].message, "first 1");
        assert_eq!(entries[1].target, "trawl::test");
    }

    #[test]
    fn test_capture_ignores_global_level() {
        let (_, entries) = capture(|| trace!("very quiet"));
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].level, Level::Trace);
    }

    #[test]
    fn test_nested_capture_restores_outer() {
        let (inner, outer) = capture(|| {
            info!("outer before");
            let (_, inner) = capture(|| info!("inner"));
            info!("outer after");
            inner
        });

        assert_eq!(inner.len(), 1);
        assert_eq!(inner[0].message, "inner");
        assert_eq!(outer.len(), 2);
        assert_eq!(outer[1].message, "outer after");
    }

    #[test]
    fn test_capture_is_thread_local() {
        let (_, entries) = capture(|| {
            std::thread::spawn(|| warn!("elsewhere")).join().ok();
        });
        assert!(entries.is_empty());
    }
}
