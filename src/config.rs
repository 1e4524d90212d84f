//! Runtime configuration
//!
//! Read once at startup from the TOML file named by `BEAGLE_CONFIG`, then
//! overridden by `BEAGLE_*` environment variables. Everything defaults, so a
//! missing file or an empty one is a valid configuration.

use std::fs;
use std::path::Path;

use once_cell::sync::{Lazy, OnceCell};
use serde::{Deserialize, Serialize};

use crate::error::{Result, RuntimeError};
use crate::logging::{self, LogConfig, LogFormat, LogOutput};

static CONFIG: OnceCell<RuntimeConfig> = OnceCell::new();
static DEFAULTS: Lazy<RuntimeConfig> = Lazy::new(RuntimeConfig::default);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub limits: LimitsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,

    /// Directory for rotated log files; console (stderr) when absent
    #[serde(default)]
    pub directory: Option<String>,

    #[serde(default = "default_prefix")]
    pub prefix: String,

    #[serde(default)]
    pub spans: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Bound on every walk up a `base` chain
    #[serde(default = "default_max_type_depth")]
    pub max_type_depth: usize,

    /// Pushing a frame deeper than this is fatal
    #[serde(default = "default_max_frame_depth")]
    pub max_frame_depth: u32,

    /// Frames rendered in a fatal report
    #[serde(default = "default_max_trace_frames")]
    pub max_trace_frames: usize,
}

pub const DEFAULT_MAX_TYPE_DEPTH: usize = 256;

fn default_level() -> String {
    "info".to_string()
}

fn default_prefix() -> String {
    "beagle.log".to_string()
}

fn default_max_type_depth() -> usize {
    DEFAULT_MAX_TYPE_DEPTH
}

fn default_max_frame_depth() -> u32 {
    1_000_000
}

fn default_max_trace_frames() -> usize {
    64
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
            directory: None,
            prefix: default_prefix(),
            spans: false,
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_type_depth: default_max_type_depth(),
            max_frame_depth: default_max_frame_depth(),
            max_trace_frames: default_max_trace_frames(),
        }
    }
}

impl RuntimeConfig {
    pub fn from_toml(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let source = fs::read_to_string(path)?;
        Self::from_toml(&source)
    }

    /// `BEAGLE_CONFIG` file (if set) plus environment overrides
    pub fn from_env() -> Result<Self> {
        let mut config = match std::env::var("BEAGLE_CONFIG") {
            Ok(path) => Self::from_file(path)?,
            Err(_) => Self::default(),
        };

        if let Ok(level) = std::env::var("BEAGLE_LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Ok(depth) = std::env::var("BEAGLE_MAX_TYPE_DEPTH") {
            config.limits.max_type_depth = depth
                .parse()
                .map_err(|_| RuntimeError::Config(format!("BEAGLE_MAX_TYPE_DEPTH='{}'", depth)))?;
        }
        if let Ok(depth) = std::env::var("BEAGLE_MAX_FRAME_DEPTH") {
            config.limits.max_frame_depth = depth
                .parse()
                .map_err(|_| RuntimeError::Config(format!("BEAGLE_MAX_FRAME_DEPTH='{}'", depth)))?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        logging::parse_level(&self.logging.level)?;
        if self.limits.max_type_depth == 0 {
            return Err(RuntimeError::Config("limits.max_type_depth must be at least 1".into()));
        }
        if self.limits.max_frame_depth == 0 {
            return Err(RuntimeError::Config("limits.max_frame_depth must be at least 1".into()));
        }
        Ok(())
    }

    pub fn log_config(&self) -> LogConfig {
        let output = match &self.logging.directory {
            Some(directory) => LogOutput::File {
                directory: directory.clone(),
                prefix: self.logging.prefix.clone(),
            },
            None => LogOutput::Stderr,
        };

        LogConfig {
            level: logging::parse_level(&self.logging.level).unwrap_or(tracing::Level::INFO),
            format: self.logging.format,
            output,
            show_spans: self.logging.spans,
        }
    }
}

/// Install the process-wide configuration. Returns false if one was already
/// installed.
pub fn install(config: RuntimeConfig) -> bool {
    CONFIG.set(config).is_ok()
}

/// Install `config`, or accept an identical one already installed.
pub fn install_or_match(config: RuntimeConfig) -> Result<()> {
    match CONFIG.try_insert(config) {
        Ok(_) => Ok(()),
        Err((installed, rejected)) if *installed == rejected => Ok(()),
        Err(_) => Err(RuntimeError::Config(
            "a different runtime configuration is already installed".into(),
        )),
    }
}

/// The installed configuration, defaults if none was installed yet.
///
/// Reading never installs anything: a later `install` still takes effect.
pub fn get() -> &'static RuntimeConfig {
    CONFIG.get().unwrap_or(&DEFAULTS)
}
