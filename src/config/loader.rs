//! Configuration loader for strata
//!
//! This module provides the `ConfigLoader` struct that resolves a target in
//! four sequential phases, each overriding the one before:
//! 1. Decode the configuration file (YAML or JSON), if present
//! 2. Overlay environment variables derived from field names
//! 3. Interpolate `${VAR}` references in every string
//! 4. Run the target's defaults hook, if it has one
//!
//! Only phases 1 and 2 can fail. After a failure the target is partially
//! mutated and must be discarded.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::env::{self, EnvSource, ProcessEnv};
use crate::config::error::{ConfigError, DecodeError};
use crate::config::format::FileFormat;
use crate::config::interpolate;
use crate::config::schema::Record;

/// Layered configuration resolver
pub struct ConfigLoader {
    /// Configuration file path (`None` skips the file phase)
    config_path: Option<PathBuf>,
    /// Prefix prepended to every derived environment key
    env_prefix: String,
    /// Environment used by the overlay and interpolation phases
    env: Box<dyn EnvSource>,
}

impl ConfigLoader {
    /// Create a new configuration loader reading the process environment
    ///
    /// An empty `config_path` disables the file phase.
    pub fn new(config_path: impl Into<PathBuf>, env_prefix: impl Into<String>) -> Self {
        let config_path = config_path.into();
        let config_path = (!config_path.as_os_str().is_empty()).then_some(config_path);

        Self {
            config_path,
            env_prefix: env_prefix.into(),
            env: Box::new(ProcessEnv),
        }
    }

    /// Replace the environment source
    pub fn with_env(mut self, env: impl EnvSource + 'static) -> Self {
        self.env = Box::new(env);
        self
    }

    /// Get the configuration file path
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Get the environment key prefix
    pub fn env_prefix(&self) -> &str {
        &self.env_prefix
    }

    /// Resolve `target` from all sources
    ///
    /// Values already on `target` survive unless a later source sets them.
    /// Fields hidden from serde (`#[serde(skip)]`) are reset to their default
    /// when a file is loaded.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the file exists but cannot be read or parsed
    /// - the file extension is not `.yaml`, `.yml` or `.json`
    /// - an environment value cannot be coerced into its field
    pub fn load<T>(&self, target: &mut T) -> Result<(), ConfigError>
    where
        T: Record + Serialize + DeserializeOwned,
    {
        self.load_file(target)?;
        self.resolve(target)
    }

    /// Resolve an open-typed JSON value from all sources
    ///
    /// The value's object keys act as fields whose environment keys are the
    /// upper-cased object keys.
    ///
    /// # Errors
    ///
    /// In addition to the errors of [`ConfigLoader::load`], returns
    /// [`ConfigError::InvalidTarget`] if the value is not an object once the
    /// file phase has run.
    pub fn load_value(&self, target: &mut Value) -> Result<(), ConfigError> {
        self.load_file(target)?;

        match target {
            Value::Object(root) => self.resolve(root),
            other => Err(ConfigError::invalid_target(format!(
                "expected an object at the root, found {}",
                describe_value(other)
            ))),
        }
    }

    /// Phase 1: decode the file onto `target`
    ///
    /// The document is merged over the target's current serialized form, so
    /// keys the file does not mention keep their current value.
    fn load_file<T>(&self, target: &mut T) -> Result<(), ConfigError>
    where
        T: Serialize + DeserializeOwned,
    {
        let Some(path) = self.config_path.as_deref() else {
            return Ok(());
        };

        let data = match fs::read(path) {
            Ok(data) => data,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Configuration file not found, skipping");
                return Ok(());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let format = FileFormat::from_path(path)?;

        if format == FileFormat::Yaml && data.iter().all(u8::is_ascii_whitespace) {
            tracing::debug!(path = %path.display(), "Configuration file is empty, skipping");
            return Ok(());
        }

        let parse_error = |source: DecodeError| ConfigError::Parse {
            path: path.to_path_buf(),
            format,
            source,
        };

        let document: Value = format.decode(&data).map_err(parse_error)?;

        let mut merged = serde_json::to_value(&*target).map_err(|err| {
            ConfigError::invalid_target(format!("current value cannot be serialized: {}", err))
        })?;
        merge(&mut merged, document);

        *target = serde_json::from_value(merged).map_err(|err| parse_error(Box::new(err)))?;

        tracing::debug!(path = %path.display(), %format, "Loaded configuration file");
        Ok(())
    }

    /// Phases 2 to 4 on an already decoded record
    fn resolve(&self, record: &mut dyn Record) -> Result<(), ConfigError> {
        env::overlay(record, &self.env_prefix, self.env.as_ref())?;
        interpolate::interpolate_record(record, self.env.as_ref());

        if let Some(defaults) = record.defaults() {
            defaults.set_defaults();
            tracing::trace!("Applied defaults hook");
        }

        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new(PathBuf::new(), String::new())
    }
}

impl std::fmt::Debug for ConfigLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigLoader")
            .field("config_path", &self.config_path)
            .field("env_prefix", &self.env_prefix)
            .finish_non_exhaustive()
    }
}

/// Merge a decoded document into `base`
///
/// Objects merge key by key. A null leaves `base` untouched; any other value
/// replaces it.
fn merge(base: &mut Value, document: Value) {
    match (base, document) {
        (Value::Object(base), Value::Object(document)) => {
            for (key, value) in document {
                match base.get_mut(&key) {
                    Some(slot) => merge(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (_, Value::Null) => {}
        (base, document) => *base = document,
    }
}

fn describe_value(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Load configuration from a file, with no environment prefix
pub fn load_from_file<T>(path: impl Into<PathBuf>, target: &mut T) -> Result<(), ConfigError>
where
    T: Record + Serialize + DeserializeOwned,
{
    ConfigLoader::new(path, "").load(target)
}

/// Load configuration from environment variables only
pub fn load_from_env<T>(env_prefix: &str, target: &mut T) -> Result<(), ConfigError>
where
    T: Record + Serialize + DeserializeOwned,
{
    ConfigLoader::new(PathBuf::new(), env_prefix).load(target)
}

/// Load configuration from a file and environment variables with a given prefix
pub fn load_with_defaults<T>(
    path: impl Into<PathBuf>,
    env_prefix: &str,
    target: &mut T,
) -> Result<(), ConfigError>
where
    T: Record + Serialize + DeserializeOwned,
{
    ConfigLoader::new(path, env_prefix).load(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Configurable;
    use crate::config::schema::Defaults;
    use serde::{Deserialize, Serialize};
    use serde_json::json;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize, Configurable)]
    #[serde(default)]
    struct Server {
        host: String,
        port: u16,
        debug: bool,
    }

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize, Configurable)]
    #[serde(default)]
    #[config(defaults)]
    struct Service {
        name: String,
        server: Server,
        features: Vec<String>,
        #[config(env = "-")]
        #[serde(skip)]
        defaults_applied: u32,
    }

    impl Defaults for Service {
        fn set_defaults(&mut self) {
            self.defaults_applied += 1;
            if self.server.port == 0 {
                self.server.port = 8080;
            }
        }
    }

    /// Helper to create a temporary config directory with files
    fn setup_config_dir(files: &[(&str, &str)]) -> TempDir {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        for (name, content) in files {
            let path = temp_dir.path().join(name);
            fs::write(&path, content).expect("Failed to write config file");
        }
        temp_dir
    }

    fn env(vars: &[(&str, &str)]) -> HashMap<String, String> {
        vars.iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    fn loader(path: PathBuf, vars: &[(&str, &str)]) -> ConfigLoader {
        ConfigLoader::new(path, "APP_").with_env(env(vars))
    }

    const SERVICE_YAML: &str = r#"
name: billing
server:
  host: 127.0.0.1
  port: 3000
features: [invoices, "${REGION:-global}-reports"]
unknown_section:
  ignored: true
"#;

    #[test]
    fn test_empty_path_skips_file_phase() {
        let loader = ConfigLoader::new("", "APP_");
        assert!(loader.config_path().is_none());
        assert_eq!(loader.env_prefix(), "APP_");
    }

    #[test]
    fn test_load_yaml_file_only() {
        let dir = setup_config_dir(&[("service.yaml", SERVICE_YAML)]);
        let mut service = Service::default();

        loader(dir.path().join("service.yaml"), &[])
            .load(&mut service)
            .expect("Should load settings");

        assert_eq!(service.name, "billing");
        assert_eq!(service.server.host, "127.0.0.1");
        assert_eq!(service.server.port, 3000);
        assert!(!service.server.debug);
        assert_eq!(service.features, vec!["invoices", "global-reports"]);
    }

    #[test]
    fn test_load_json_file() {
        let dir = setup_config_dir(&[(
            "service.json",
            r#"{"name": "billing", "server": {"port": 3000}}"#,
        )]);
        let mut service = Service::default();

        loader(dir.path().join("service.json"), &[])
            .load(&mut service)
            .unwrap();

        assert_eq!(service.name, "billing");
        assert_eq!(service.server.port, 3000);
        assert_eq!(service.server.host, "");
    }

    #[test]
    fn test_environment_wins_over_file() {
        let dir = setup_config_dir(&[("service.yml", SERVICE_YAML)]);
        let mut service = Service::default();

        loader(
            dir.path().join("service.yml"),
            &[("APP_SERVER_PORT", "4000"), ("APP_SERVER_DEBUG", "true"), ("REGION", "eu")],
        )
        .load(&mut service)
        .unwrap();

        assert_eq!(service.server.port, 4000);
        assert!(service.server.debug);
        assert_eq!(service.features[1], "eu-reports");
    }

    #[test]
    fn test_interpolation_sees_env_overlay_values() {
        let mut service = Service::default();

        loader(PathBuf::new(), &[("APP_NAME", "svc-${ZONE}"), ("ZONE", "b")])
            .load(&mut service)
            .unwrap();

        assert_eq!(service.name, "svc-b");
    }

    #[test]
    fn test_missing_file_applies_defaults_once() {
        let dir = setup_config_dir(&[]);
        let mut service = Service::default();

        loader(dir.path().join("absent.yaml"), &[])
            .load(&mut service)
            .unwrap();

        assert_eq!(service.name, "");
        assert_eq!(service.server.port, 8080);
        assert_eq!(service.defaults_applied, 1);
    }

    #[test]
    fn test_missing_file_with_unsupported_extension_is_not_an_error() {
        let dir = setup_config_dir(&[]);
        let mut service = Service::default();

        let result = loader(dir.path().join("absent.toml"), &[]).load(&mut service);
        assert!(result.is_ok());
    }

    #[test]
    fn test_empty_file_is_skipped() {
        let dir = setup_config_dir(&[("service.yaml", "  \n\n")]);
        let mut service = Service::default();

        loader(dir.path().join("service.yaml"), &[])
            .load(&mut service)
            .unwrap();

        assert_eq!(service.server.port, 8080);
    }

    #[test]
    fn test_whitespace_json_file_is_parse_error() {
        let dir = setup_config_dir(&[("service.json", " \n")]);
        let mut service = Service::default();

        let result = loader(dir.path().join("service.json"), &[]).load(&mut service);

        assert!(matches!(result, Err(ConfigError::Parse { format: FileFormat::Json, .. })));
        assert_eq!(service.defaults_applied, 0);
    }

    #[test]
    fn test_file_keeps_values_it_does_not_mention() {
        let dir = setup_config_dir(&[("service.yaml", "server:\n  port: 3000\n")]);
        let mut service = Service {
            name: "preset".to_string(),
            server: Server {
                host: "10.0.0.1".to_string(),
                port: 1,
                debug: true,
            },
            features: vec!["audit".to_string()],
            ..Default::default()
        };

        loader(dir.path().join("service.yaml"), &[])
            .load(&mut service)
            .unwrap();

        assert_eq!(service.name, "preset");
        assert_eq!(service.server.host, "10.0.0.1");
        assert_eq!(service.server.port, 3000);
        assert!(service.server.debug);
        assert_eq!(service.features, vec!["audit"]);
    }

    #[test]
    fn test_file_sequences_replace_current_sequences() {
        let dir = setup_config_dir(&[("service.json", r#"{"features": ["billing"]}"#)]);
        let mut service = Service {
            features: vec!["audit".to_string(), "export".to_string()],
            ..Default::default()
        };

        loader(dir.path().join("service.json"), &[])
            .load(&mut service)
            .unwrap();

        assert_eq!(service.features, vec!["billing"]);
    }

    #[test]
    fn test_struct_without_serde_defaults_loads_partial_file() {
        #[derive(Debug, Default, Serialize, Deserialize, Configurable)]
        struct Strict {
            name: String,
            port: u16,
        }

        let dir = setup_config_dir(&[("strict.yaml", "port: 3000\n")]);
        let mut strict = Strict {
            name: "preset".to_string(),
            port: 1,
        };

        loader(dir.path().join("strict.yaml"), &[])
            .load(&mut strict)
            .unwrap();

        assert_eq!(strict.name, "preset");
        assert_eq!(strict.port, 3000);
    }

    #[test]
    fn test_null_in_file_keeps_current_value() {
        let dir = setup_config_dir(&[("service.yaml", "name: ~\nserver:\n  port: 3000\n")]);
        let mut service = Service {
            name: "preset".to_string(),
            ..Default::default()
        };

        loader(dir.path().join("service.yaml"), &[])
            .load(&mut service)
            .unwrap();

        assert_eq!(service.name, "preset");
        assert_eq!(service.server.port, 3000);
    }

    #[test]
    fn test_malformed_yaml_is_parse_error() {
        let dir = setup_config_dir(&[("service.yaml", "name: [billing\nserver: {port: 1")]);
        let mut service = Service::default();

        let result = loader(dir.path().join("service.yaml"), &[]).load(&mut service);

        match result {
            Err(ConfigError::Parse { path, format, .. }) => {
                assert_eq!(format, FileFormat::Yaml);
                assert!(path.ends_with("service.yaml"));
            }
            other => panic!("Expected Parse error, got {:?}", other),
        }
        assert_eq!(service.defaults_applied, 0);
    }

    #[test]
    fn test_type_mismatch_in_file_is_parse_error() {
        let dir = setup_config_dir(&[("service.json", r#"{"server": {"port": "high"}}"#)]);
        let mut service = Service::default();

        let result = loader(dir.path().join("service.json"), &[]).load(&mut service);
        assert!(matches!(result, Err(ConfigError::Parse { format: FileFormat::Json, .. })));
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = setup_config_dir(&[("service.toml", "name = \"billing\"")]);
        let mut service = Service::default();

        let result = loader(dir.path().join("service.toml"), &[]).load(&mut service);

        match result {
            Err(ConfigError::UnsupportedFormat(ext)) => assert_eq!(ext, ".toml"),
            other => panic!("Expected UnsupportedFormat error, got {:?}", other),
        }
    }

    #[test]
    fn test_unreadable_path_is_read_error() {
        let dir = setup_config_dir(&[]);
        let nested = dir.path().join("service.yaml");
        fs::create_dir(&nested).unwrap();
        let mut service = Service::default();

        let result = loader(nested, &[]).load(&mut service);
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_bind_failure_skips_defaults_hook() {
        let mut service = Service::default();

        let result = loader(PathBuf::new(), &[("APP_SERVER_PORT", "not-a-port")]).load(&mut service);

        assert!(matches!(result, Err(ConfigError::FieldBind { .. })));
        assert_eq!(service.defaults_applied, 0);
    }

    #[test]
    fn test_load_value_requires_object_root() {
        let mut value = Value::Null;
        let result = loader(PathBuf::new(), &[]).load_value(&mut value);

        match result {
            Err(ConfigError::InvalidTarget(message)) => assert!(message.contains("null")),
            other => panic!("Expected InvalidTarget error, got {:?}", other),
        }
    }

    #[test]
    fn test_load_value_from_file() {
        let dir = setup_config_dir(&[("service.yaml", SERVICE_YAML)]);
        let mut value = Value::Null;

        loader(
            dir.path().join("service.yaml"),
            &[("APP_SERVER_PORT", "4000"), ("REGION", "us")],
        )
        .load_value(&mut value)
        .unwrap();

        assert_eq!(value["server"]["port"], json!(4000));
        assert_eq!(value["features"], json!(["invoices", "us-reports"]));
        assert_eq!(value["unknown_section"]["ignored"], json!(true));
    }

    #[test]
    fn test_load_value_rejects_scalar_file() {
        let dir = setup_config_dir(&[("service.json", "42")]);
        let mut value = json!({});

        let result = loader(dir.path().join("service.json"), &[]).load_value(&mut value);
        assert!(matches!(result, Err(ConfigError::InvalidTarget(_))));
    }
}
