//! Logging infrastructure - structured tracing throughout the runtime
//!
//! Design: Uses `tracing` for structured, contextual logging with:
//! - Configurable level, overridable per target through `RUST_LOG`
//! - Zero cost for disabled levels on the refcount and frame hot paths
//! - Console or rolling-file output, human-readable or JSON

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

use crate::error::RuntimeError;

/// Global logging state. Holds the appender guard so buffered lines are
/// flushed for as long as the process lives.
static LOGGER: OnceCell<Option<WorkerGuard>> = OnceCell::new();

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    #[default]
    Compact,
    Json,
}

/// Log output destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogOutput {
    Stdout,
    Stderr,
    /// Daily-rotated file under `directory`
    File { directory: String, prefix: String },
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Default log level
    pub level: Level,
    pub format: LogFormat,
    pub output: LogOutput,
    /// Show span events (enter/exit)
    pub show_spans: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: LogFormat::Compact,
            output: LogOutput::Stderr,
            show_spans: false,
        }
    }
}

impl LogConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        // BEAGLE_LOG_LEVEL: trace, debug, info, warn, error
        if let Ok(level) = std::env::var("BEAGLE_LOG_LEVEL") {
            config.level = parse_level(&level).unwrap_or(Level::INFO);
        }

        // BEAGLE_LOG_FORMAT: pretty, compact, json
        if let Ok(format) = std::env::var("BEAGLE_LOG_FORMAT") {
            config.format = match format.to_lowercase().as_str() {
                "pretty" => LogFormat::Pretty,
                "json" => LogFormat::Json,
                _ => LogFormat::Compact,
            };
        }

        // BEAGLE_LOG_FILE: directory for rotated log files
        if let Ok(directory) = std::env::var("BEAGLE_LOG_FILE") {
            config.output = LogOutput::File {
                directory,
                prefix: "beagle.log".to_string(),
            };
        }

        config.show_spans = std::env::var("BEAGLE_LOG_SPANS").is_ok();

        config
    }

    /// Minimal logging for release runs
    pub fn performance() -> Self {
        Self {
            level: Level::ERROR,
            ..Self::default()
        }
    }

    /// Verbose logging, including per-object trace events
    pub fn debug() -> Self {
        Self {
            level: Level::TRACE,
            format: LogFormat::Pretty,
            output: LogOutput::Stderr,
            show_spans: true,
        }
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_output(mut self, output: LogOutput) -> Self {
        self.output = output;
        self
    }
}

/// Parse a level name as used in config files and `BEAGLE_LOG_LEVEL`
pub fn parse_level(name: &str) -> Result<Level, RuntimeError> {
    match name.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" | "warning" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        other => Err(RuntimeError::Config(format!("unknown log level '{}'", other))),
    }
}

/// Initialize logging with configuration from the environment
pub fn init() {
    init_with_config(LogConfig::from_env());
}

/// Initialize logging with a custom configuration (idempotent)
pub fn init_with_config(config: LogConfig) {
    LOGGER.get_or_init(|| install_subscriber(&config));
}

/// Check if logging is initialized
pub fn is_initialized() -> bool {
    LOGGER.get().is_some()
}

fn install_subscriber(config: &LogConfig) -> Option<WorkerGuard> {
    let (writer, guard) = match &config.output {
        LogOutput::Stdout => tracing_appender::non_blocking(std::io::stdout()),
        LogOutput::Stderr => tracing_appender::non_blocking(std::io::stderr()),
        LogOutput::File { directory, prefix } => {
            tracing_appender::non_blocking(tracing_appender::rolling::daily(directory, prefix))
        }
    };

    let span_events = if config.show_spans {
        FmtSpan::ENTER | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let layer = match config.format {
        LogFormat::Pretty => fmt::layer()
            .with_writer(writer)
            .pretty()
            .with_span_events(span_events)
            .with_filter(build_filter(config))
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .with_writer(writer)
            .compact()
            .with_span_events(span_events)
            .with_filter(build_filter(config))
            .boxed(),
        LogFormat::Json => fmt::layer()
            .with_writer(writer)
            .json()
            .with_span_events(span_events)
            .with_filter(build_filter(config))
            .boxed(),
    };

    // Another subscriber may already own the process (tests, embedding hosts)
    match tracing_subscriber::registry().with(layer).try_init() {
        Ok(()) => Some(guard),
        Err(_) => None,
    }
}

fn build_filter(config: &LogConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("beagle={}", config.level.as_str().to_lowercase()))
    })
}

// ============================================================================
// Runtime-specific logging functions
// ============================================================================

/// Log memory allocation
#[inline]
pub fn log_allocation(size: usize, ptr: *const u8) {
    tracing::trace!(
        target: "beagle::allocator",
        event = "allocation",
        size_bytes = size,
        address = ?ptr,
        "memory allocated"
    );
}

/// Log memory deallocation
#[inline]
pub fn log_deallocation(ptr: *const u8) {
    tracing::trace!(
        target: "beagle::allocator",
        event = "deallocation",
        address = ?ptr,
        "memory released"
    );
}

/// Log an object whose count reached zero
#[inline]
pub fn log_destroy(ptr: *const u8) {
    tracing::trace!(
        target: "beagle::gc",
        event = "destroy",
        address = ?ptr,
        "object destroyed"
    );
}

pub fn log_type_registered(name: &str, depth: usize) {
    tracing::debug!(
        target: "beagle::types",
        event = "type_registered",
        name,
        depth,
        "type registered"
    );
}

#[inline]
pub fn log_frame_push(function: &str, depth: u32) {
    tracing::trace!(
        target: "beagle::frames",
        event = "frame_push",
        function,
        depth,
        "frame pushed"
    );
}

#[inline]
pub fn log_frame_pop(function: &str, depth: u32) {
    tracing::trace!(
        target: "beagle::frames",
        event = "frame_pop",
        function,
        depth,
        "frame popped"
    );
}

/// Log an unrecoverable condition right before the abort
pub fn log_fatal(error: &RuntimeError) {
    tracing::error!(
        target: "beagle::runtime",
        event = "fatal",
        error = %error,
        "fatal runtime error"
    );
}

pub fn log_runtime_init() {
    tracing::info!(target: "beagle::runtime", event = "runtime_init", "Beagle runtime initializing");
}

pub fn log_runtime_shutdown() {
    tracing::info!(target: "beagle::runtime", event = "runtime_shutdown", "Beagle runtime shutting down");
}
