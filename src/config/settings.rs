//! Common service configuration
//!
//! `BaseConfig` holds the server and observability sections every service
//! shares. Embed it in a service's own configuration struct, or resolve it on
//! its own with [`ConfigLoader`](crate::config::ConfigLoader).
//!
//! With prefix `APP_`, `server.read_timeout` is read from
//! `APP_SERVER_READ_TIMEOUT` and `observability.metrics.port` from
//! `APP_OBSERVABILITY_METRICS_PORT`.

use std::time::Duration;

use macros::Configurable;
use serde::{Deserialize, Serialize};

use crate::config::schema::Defaults;

// ============================================================================
// Default values
// ============================================================================

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(120);
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_LOG_FORMAT: &str = "json";
const DEFAULT_METRICS_PORT: u16 = 9090;
const DEFAULT_METRICS_PATH: &str = "/metrics";
const DEFAULT_SAMPLER: f64 = 1.0;

/// Serde adapter for `Duration` fields
///
/// Serializes integer nanoseconds. Deserializes either integer nanoseconds or
/// a duration string such as `"30s"`, `"1m30s"` or `"250ms"`. Negative
/// durations are rejected.
pub mod nanos {
    use std::fmt;
    use std::time::Duration;

    use jiff::SignedDuration;
    use serde::de::{self, Unexpected, Visitor};
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let nanos = u64::try_from(value.as_nanos()).map_err(serde::ser::Error::custom)?;
        serializer.serialize_u64(nanos)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        deserializer.deserialize_any(DurationVisitor)
    }

    /// Parse a duration string like `"1h30m"` or `"1.5s"`
    pub fn parse(text: &str) -> Result<Duration, jiff::Error> {
        let signed: SignedDuration = text.trim().parse()?;
        Duration::try_from(signed)
    }

    struct DurationVisitor;

    impl Visitor<'_> for DurationVisitor {
        type Value = Duration;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("integer nanoseconds or a duration string such as \"30s\"")
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<Duration, E> {
            Ok(Duration::from_nanos(value))
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<Duration, E> {
            u64::try_from(value)
                .map(Duration::from_nanos)
                .map_err(|_| E::invalid_value(Unexpected::Signed(value), &self))
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<Duration, E> {
            parse(value).map_err(|err| E::custom(format!("invalid duration {:?}: {}", value, err)))
        }
    }
}

// ============================================================================
// Server Configuration
// ============================================================================

/// HTTP server configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Configurable)]
#[serde(default)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host address
    pub host: String,

    /// Maximum duration for reading a request
    #[serde(with = "nanos")]
    pub read_timeout: Duration,

    /// Maximum duration for writing a response
    #[serde(with = "nanos")]
    pub write_timeout: Duration,

    /// Keep-alive idle timeout
    #[serde(with = "nanos")]
    pub idle_timeout: Duration,
}

impl ServerConfig {
    /// Get the full server address as "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// ============================================================================
// Observability Configuration
// ============================================================================

/// Log output configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Configurable)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level or `EnvFilter` directive: "trace", "debug", "info", "warn", "error"
    pub level: String,

    /// Log format: "json" or "text"
    pub format: String,
}

/// Metrics endpoint configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Configurable)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
    pub path: String,
}

/// Distributed tracing configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Configurable)]
#[serde(default)]
pub struct TracingConfig {
    pub enabled: bool,
    pub endpoint: String,

    /// Sampling rate between 0.0 and 1.0
    pub sampler: f64,
}

/// Observability configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Configurable)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
    pub tracing: TracingConfig,
}

// ============================================================================
// Base Configuration
// ============================================================================

/// Configuration fields shared by every service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Configurable)]
#[serde(default)]
#[config(defaults)]
pub struct BaseConfig {
    pub server: ServerConfig,
    pub observability: ObservabilityConfig,
}

impl BaseConfig {
    /// Fill unset server fields
    pub fn set_server_defaults(&mut self) {
        let server = &mut self.server;
        if server.port == 0 {
            server.port = DEFAULT_PORT;
        }
        if server.host.is_empty() {
            server.host = DEFAULT_HOST.to_string();
        }
        if server.read_timeout.is_zero() {
            server.read_timeout = DEFAULT_READ_TIMEOUT;
        }
        if server.write_timeout.is_zero() {
            server.write_timeout = DEFAULT_WRITE_TIMEOUT;
        }
        if server.idle_timeout.is_zero() {
            server.idle_timeout = DEFAULT_IDLE_TIMEOUT;
        }
    }

    /// Fill unset observability fields
    pub fn set_observability_defaults(&mut self) {
        let observability = &mut self.observability;
        if observability.logging.level.is_empty() {
            observability.logging.level = DEFAULT_LOG_LEVEL.to_string();
        }
        if observability.logging.format.is_empty() {
            observability.logging.format = DEFAULT_LOG_FORMAT.to_string();
        }
        if observability.metrics.port == 0 {
            observability.metrics.port = DEFAULT_METRICS_PORT;
        }
        if observability.metrics.path.is_empty() {
            observability.metrics.path = DEFAULT_METRICS_PATH.to_string();
        }
        if observability.tracing.sampler == 0.0 {
            observability.tracing.sampler = DEFAULT_SAMPLER;
        }
    }
}

impl Defaults for BaseConfig {
    fn set_defaults(&mut self) {
        self.set_server_defaults();
        self.set_observability_defaults();
    }
}
