use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use anyhow::Context;

use crate::config::{BaseConfig, ConfigLoader, describe_keys};
use crate::logger::{LogFormat, LoggerConfig};

/// Level of the logger active while the configuration is resolved
const BOOTSTRAP_LOG_LEVEL: &str = "warn";

/// Resolve a layered service configuration and print the result
///
/// Sources are applied in order: the configuration file, `PREFIX`-named
/// environment variables, `${VAR}` interpolation, then built-in defaults.
#[derive(Parser, Debug)]
#[command(name = "strata", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Configuration file path (.yaml, .yml or .json)
    ///
    /// A missing file is not an error; the configuration is then built from
    /// the environment and defaults alone.
    #[arg(short, long, value_name = "FILE", env = "STRATA_CONFIG")]
    pub config: Option<PathBuf>,

    /// Prefix of every environment variable read by the overlay
    #[arg(short = 'p', long, value_name = "PREFIX", default_value = "APP_")]
    pub env_prefix: String,

    /// Log level override
    ///
    /// Takes precedence over `observability.logging.level`.
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Print the resolved configuration (default)
    Show {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Yaml)]
        output: OutputFormat,
    },
    /// List the environment variable every field is read from
    Keys,
}

/// Output format options
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Yaml,
}

/// Log level options
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum LogLevel {
    #[value(name = "error")]
    Error,
    #[value(name = "warn", alias = "warning")]
    Warn,
    #[value(name = "info")]
    Info,
    #[value(name = "debug")]
    Debug,
    #[value(name = "trace")]
    Trace,
}

impl From<LogLevel> for String {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => "error".to_string(),
            LogLevel::Warn => "warn".to_string(),
            LogLevel::Info => "info".to_string(),
            LogLevel::Debug => "debug".to_string(),
            LogLevel::Trace => "trace".to_string(),
        }
    }
}

impl Cli {
    /// The subcommand to run, `show` when none was given
    pub fn selected_command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Show {
            output: OutputFormat::Yaml,
        })
    }

    /// Logger active while the configuration itself is being resolved
    ///
    /// Uses `--log-level` when given, so loader events such as applied
    /// environment overrides can be inspected with `--log-level debug`.
    pub fn bootstrap_logger(&self) -> LoggerConfig {
        let level = self
            .log_level
            .map(String::from)
            .unwrap_or_else(|| BOOTSTRAP_LOG_LEVEL.to_string());

        LoggerConfig {
            level,
            format: LogFormat::Text,
            ..Default::default()
        }
    }

    /// Build the loader described by the arguments
    pub fn loader(&self) -> ConfigLoader {
        ConfigLoader::new(self.config.clone().unwrap_or_default(), self.env_prefix.as_str())
    }
}

/// Resolve a `BaseConfig` through `loader`
pub fn resolve(loader: &ConfigLoader) -> anyhow::Result<BaseConfig> {
    let mut config = BaseConfig::default();
    loader
        .load(&mut config)
        .context("Failed to resolve configuration")?;
    Ok(config)
}

/// Serialize the resolved configuration
pub fn render(config: &BaseConfig, format: OutputFormat) -> anyhow::Result<String> {
    let rendered = match format {
        OutputFormat::Json => serde_json::to_string_pretty(config)?,
        OutputFormat::Yaml => serde_yaml::to_string(config)?,
    };
    Ok(rendered)
}

/// One `path  VARIABLE` line per field of `BaseConfig`
pub fn render_keys(env_prefix: &str) -> String {
    let mut config = BaseConfig::default();
    let keys = describe_keys(&mut config, env_prefix);
    let width = keys.iter().map(|(path, _)| path.len()).max().unwrap_or(0);

    keys.iter()
        .map(|(path, key)| format!("{:<width$}  {}\n", path, key, width = width))
        .collect()
}
