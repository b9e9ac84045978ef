//! Polyglot Logging
//!
//! Structured logging for the Polyglot store and formatter, controlled by
//! the `POLYGLOT_DEBUG` family of environment variables.
//!
//! # Usage
//!
//! ```rust
//! use polyglot_log::{debug, error, info};
//!
//! info!("store created with {} languages", 2);
//! let key = "title";
//! error!(target: "polyglot::store", "SerialNumber-1 set_value error: \"{}\" value cannot be undefined", key);
//! debug!("flush delivered");
//! ```
//!
//! # Environment Variables
//!
//! - `POLYGLOT_DEBUG=1` - Enable debug logging
//! - `POLYGLOT_LOG_LEVEL=trace|debug|info|warn|error|off` - Minimum level
//! - `POLYGLOT_LOG_FORMAT=pretty|compact|json` - Output format
//! - `POLYGLOT_LOG_TIMESTAMPS=1|0` - Prefix records with a timestamp
//!
//! # Capturing records in tests
//!
//! ```rust
//! let capture = polyglot_log::capture();
//! polyglot_log::warn!("field \"{}\" missing", "title");
//! assert!(capture.contains(polyglot_log::Level::Warn, "missing"));
//! ```

use once_cell::sync::Lazy;
use std::cell::RefCell;
use std::env;
use std::io::Write;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

// ============================================================================
// Log Levels
// ============================================================================

/// Severity of a log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Level {
    /// Most verbose
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
    /// Nothing is emitted
    Off = 5,
}

impl Level {
    /// Parse a level name, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Some(Level::Trace),
            "debug" => Some(Level::Debug),
            "info" => Some(Level::Info),
            "warn" | "warning" => Some(Level::Warn),
            "error" => Some(Level::Error),
            "off" | "none" => Some(Level::Off),
            _ => None,
        }
    }

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

    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Level::Trace,
            1 => Level::Debug,
            2 => Level::Info,
            3 => Level::Warn,
            4 => Level::Error,
            _ => Level::Off,
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Log Format
// ============================================================================

/// Output format for records written to stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Human-readable, one field per column
    Pretty,
    /// Single-letter level, short timestamp
    Compact,
    /// One JSON object per line
    Json,
}

impl Format {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pretty" => Some(Format::Pretty),
            "compact" => Some(Format::Compact),
            "json" => Some(Format::Json),
            _ => None,
        }
    }
}

// ============================================================================
// Global Configuration
// ============================================================================

static DEBUG_ENABLED: AtomicBool = AtomicBool::new(false);

static LOG_LEVEL: AtomicU8 = AtomicU8::new(Level::Info as u8);

static CONFIG: Lazy<LogConfig> = Lazy::new(LogConfig::from_env);

/// Logging configuration, read once from the environment.
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub debug: bool,
    pub level: Level,
    pub format: Format,
    pub timestamps: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            debug: false,
            level: Level::Info,
            format: Format::Pretty,
            timestamps: true,
        }
    }
}

fn env_flag(name: &str) -> Option<bool> {
    env::var(name)
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

impl LogConfig {
    /// Build the config from `POLYGLOT_*` variables and publish the level
    /// and debug flag to the global atomics.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let debug = env_flag("POLYGLOT_DEBUG").unwrap_or(defaults.debug);

        let level = env::var("POLYGLOT_LOG_LEVEL")
            .ok()
            .and_then(|s| Level::parse(&s))
            .unwrap_or(if debug { Level::Debug } else { defaults.level });

        let format = env::var("POLYGLOT_LOG_FORMAT")
            .ok()
            .and_then(|s| Format::parse(&s))
            .unwrap_or(defaults.format);

        let timestamps = env_flag("POLYGLOT_LOG_TIMESTAMPS").unwrap_or(defaults.timestamps);

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

// ============================================================================
// Public API
// ============================================================================

/// Force eager initialisation from the environment.
pub fn init() {
    Lazy::force(&CONFIG);
}

#[inline]
pub fn is_debug_enabled() -> bool {
    DEBUG_ENABLED.load(Ordering::Relaxed)
}

#[inline]
pub fn is_level_enabled(level: Level) -> bool {
    level != Level::Off && level as u8 >= LOG_LEVEL.load(Ordering::Relaxed)
}

pub fn current_level() -> Level {
    Level::from_u8(LOG_LEVEL.load(Ordering::Relaxed))
}

/// Change the minimum level at runtime.
pub fn set_level(level: Level) {
    Lazy::force(&CONFIG);
    LOG_LEVEL.store(level as u8, Ordering::SeqCst);
}

/// Toggle debug mode; enabling it lowers the level to at least `Debug`.
pub fn set_debug(enabled: bool) {
    Lazy::force(&CONFIG);
    DEBUG_ENABLED.store(enabled, Ordering::SeqCst);
    if enabled && current_level() > Level::Debug {
        LOG_LEVEL.store(Level::Debug as u8, Ordering::SeqCst);
    }
}

pub fn config() -> &'static LogConfig {
    &CONFIG
}

// ============================================================================
// Capture
// ============================================================================

/// A record seen by an active [`Capture`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub level: Level,
    pub target: String,
    pub message: String,
}

type Sink = Rc<RefCell<Vec<Record>>>;

thread_local! {
    static CAPTURE_SINKS: RefCell<Vec<Sink>> = const { RefCell::new(Vec::new()) };
}

/// Guard returned by [`capture`]. Records every log call made on the
/// current thread while alive, regardless of the configured level.
#[must_use = "records are only captured while the guard is alive"]
pub struct Capture {
    sink: Sink,
}

/// Start capturing log records emitted on the current thread.
pub fn capture() -> Capture {
    let sink: Sink = Rc::new(RefCell::new(Vec::new()));
    CAPTURE_SINKS.with(|sinks| sinks.borrow_mut().push(Rc::clone(&sink)));
    Capture { sink }
}

impl Capture {
    /// Snapshot of the captured records.
    pub fn records(&self) -> Vec<Record> {
        self.sink.borrow().clone()
    }

    /// Captured records at exactly `level`.
    pub fn at(&self, level: Level) -> Vec<Record> {
        self.sink
            .borrow()
            .iter()
            .filter(|r| r.level == level)
            .cloned()
            .collect()
    }

    /// True when a record at `level` contains `needle` in its message.
    pub fn contains(&self, level: Level, needle: &str) -> bool {
        self.sink
            .borrow()
            .iter()
            .any(|r| r.level == level && r.message.contains(needle))
    }

    pub fn count(&self, level: Level) -> usize {
        self.sink.borrow().iter().filter(|r| r.level == level).count()
    }

    pub fn clear(&self) {
        self.sink.borrow_mut().clear();
    }
}

impl Drop for Capture {
    fn drop(&mut self) {
        let _ = CAPTURE_SINKS.try_with(|sinks| {
            sinks
                .borrow_mut()
                .retain(|sink| !Rc::ptr_eq(sink, &self.sink));
        });
    }
}

fn record_captured(level: Level, target: &str, message: &str) {
    let _ = CAPTURE_SINKS.try_with(|sinks| {
        for sink in sinks.borrow().iter() {
            sink.borrow_mut().push(Record {
                level,
                target: target.to_string(),
                message: message.to_string(),
            });
        }
    });
}

// ============================================================================
// Log Output
// ============================================================================

/// Emit a record. Called by the macros.
#[doc(hidden)]
pub fn log(level: Level, target: &str, message: &str) {
    record_captured(level, target, message);

    let config = config();
    if !is_level_enabled(level) {
        return;
    }

    #[cfg(feature = "tracing")]
    forward_to_tracing(level, target, message);

    let stamp = config.timestamps.then(chrono::Utc::now);
    let line = render(config.format, stamp, level, target, message);
    let _ = writeln!(std::io::stderr().lock(), "{}", line);
}

/// One output line, without the trailing newline.
fn render(
    format: Format,
    stamp: Option<chrono::DateTime<chrono::Utc>>,
    level: Level,
    target: &str,
    message: &str,
) -> String {
    let mut line = String::new();
    match format {
        Format::Json => return render_json(stamp, level, target, message),
        Format::Pretty => {
            if let Some(stamp) = stamp {
                line.push_str(&stamp.format("%Y-%m-%dT%H:%M:%S%.3fZ ").to_string());
            }
            line.push_str(&format!("{:<5} ", level.as_str()));
            if !target.is_empty() {
                line.push_str(&format!("[{}] ", target));
            }
        }
        Format::Compact => {
            if let Some(stamp) = stamp {
                line.push_str(&stamp.format("%H:%M:%S ").to_string());
            }
            line.push(level.as_str().as_bytes()[0] as char);
            line.push(' ');
        }
    }
    line.push_str(message);
    line
}

#[cfg(feature = "json")]
fn render_json(
    stamp: Option<chrono::DateTime<chrono::Utc>>,
    level: Level,
    target: &str,
    message: &str,
) -> String {
    #[derive(serde::Serialize)]
    struct Line<'a> {
        #[serde(skip_serializing_if = "Option::is_none")]
        timestamp: Option<String>,
        level: &'a str,
        target: &'a str,
        message: &'a str,
    }

    let line = Line {
        timestamp: stamp.map(|t| t.to_rfc3339()),
        level: level.as_str(),
        target,
        message,
    };
    serde_json::to_string(&line).unwrap_or_else(|_| message.to_string())
}

#[cfg(not(feature = "json"))]
fn render_json(
    stamp: Option<chrono::DateTime<chrono::Utc>>,
    level: Level,
    target: &str,
    message: &str,
) -> String {
    render(Format::Pretty, stamp, level, target, message)
}

#[cfg(feature = "tracing")]
fn forward_to_tracing(level: Level, target: &str, message: &str) {
    match level {
        Level::Trace => tracing::trace!(polyglot_target = target, "{}", message),
        Level::Debug => tracing::debug!(polyglot_target = target, "{}", message),
        Level::Info => tracing::info!(polyglot_target = target, "{}", message),
        Level::Warn => tracing::warn!(polyglot_target = target, "{}", message),
        Level::Error => tracing::error!(polyglot_target = target, "{}", message),
        Level::Off => {}
    }
}

// ============================================================================
// Macros
// ============================================================================

#[doc(hidden)]
#[macro_export]
macro_rules! __emit {
    ($level:ident, target: $target:expr, $($arg:tt)+) => {
        $crate::log($crate::Level::$level, $target, &::std::format!($($arg)+))
    };
    ($level:ident, $($arg:tt)+) => {
        $crate::log($crate::Level::$level, ::std::module_path!(), &::std::format!($($arg)+))
    };
}

/// Log at trace level. Accepts an optional leading `target: "..."`.
#[macro_export]
macro_rules! trace {
    ($($arg:tt)+) => { $crate::__emit!(Trace, $($arg)+) };
}

/// Log at debug level.
///
/// Emitted when `POLYGLOT_DEBUG=1` or `POLYGLOT_LOG_LEVEL=debug`.
#[macro_export]
macro_rules! debug {
    ($($arg:tt)+) => { $crate::__emit!(Debug, $($arg)+) };
}

#[macro_export]
macro_rules! info {
    ($($arg:tt)+) => { $crate::__emit!(Info, $($arg)+) };
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)+) => { $crate::__emit!(Warn, $($arg)+) };
}

/// Log at error level. Rejected store operations and isolated callback
/// faults are reported here.
#[macro_export]
macro_rules! error {
    ($($arg:tt)+) => { $crate::__emit!(Error, $($arg)+) };
}

// ============================================================================
// Tracing Integration
// ============================================================================

#[cfg(feature = "tracing")]
pub mod tracing_compat {
    //! Subscriber honouring `POLYGLOT_LOG_LEVEL` unless `RUST_LOG` is set.

    use super::*;

    pub fn subscriber() -> impl tracing::Subscriber {
        use tracing_subscriber::prelude::*;
        use tracing_subscriber::{EnvFilter, fmt};

        let level = config().level.as_str().to_lowercase();
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_ansi(false))
    }
}

// ============================================================================
// Tests
// ============================================================================

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
        assert_eq!(Level::parse("debug"), Some(Level::Debug));
        assert_eq!(Level::parse(" WARNING "), Some(Level::Warn));
        assert_eq!(Level::parse("none"), Some(Level::Off));
        assert_eq!(Level::parse("loud"), None);
    }

    #[test]
    fn test_format_parse() {
        assert_eq!(Format::parse("json"), Some(Format::Json));
        assert_eq!(Format::parse("Compact"), Some(Format::Compact));
        assert_eq!(Format::parse("xml"), None);
    }

    #[test]
    fn test_off_is_never_enabled() {
        assert!(!is_level_enabled(Level::Off));
    }

    #[test]
    fn test_capture_records_regardless_of_level() {
        let capture = capture();
        trace!("very quiet {}", 1);
        error!(target: "polyglot::store", "loud {}", 2);

        let records = capture.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].target, "polyglot::store");
        assert!(capture.contains(Level::Error, "loud 2"));
        assert_eq!(capture.count(Level::Trace), 1);
    }

    #[test]
    fn test_nested_captures_and_drop() {
        let outer = capture();
        {
            let inner = capture();
            warn!("inside");
            assert_eq!(inner.count(Level::Warn), 1);
        }
        warn!("after");
        assert_eq!(outer.count(Level::Warn), 2);

        outer.clear();
        assert!(outer.records().is_empty());
    }

    #[test]
    fn test_render_layouts() {
        let stamp = chrono::DateTime::parse_from_rfc3339("2024-05-01T08:30:00Z")
            .unwrap()
            .with_timezone(&chrono::Utc);

        assert_eq!(
            render(Format::Pretty, None, Level::Warn, "polyglot::store", "odd"),
            "WARN  [polyglot::store] odd"
        );
        assert_eq!(
            render(Format::Pretty, Some(stamp), Level::Info, "", "hi"),
            "2024-05-01T08:30:00.000Z INFO  hi"
        );
        assert_eq!(
            render(Format::Compact, Some(stamp), Level::Error, "t", "bad"),
            "08:30:00 E bad"
        );
    }

    #[cfg(feature = "json")]
    #[test]
    fn test_render_json() {
        let line = render(Format::Json, None, Level::Error, "polyglot::store", "m \"q\"");
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["level"], "ERROR");
        assert_eq!(value["target"], "polyglot::store");
        assert_eq!(value["message"], "m \"q\"");
        assert!(value.get("timestamp").is_none());
    }

    #[test]
    fn test_capture_is_thread_local() {
        let capture = capture();
        std::thread::spawn(|| {
            info!("from another thread");
        })
        .join()
        .unwrap();
        assert!(capture.records().is_empty());
    }
}
