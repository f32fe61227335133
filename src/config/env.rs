//! Environment sources and the environment overlay phase
//!
//! The overlay derives one variable name per leaf field: the accumulated
//! prefix followed by the field's override key. Nested records extend the
//! prefix with `KEY_`, so `server.port` under prefix `APP_` is read from
//! `APP_SERVER_PORT`.

use std::collections::HashMap;
use std::hash::BuildHasher;

use crate::config::error::ConfigError;
use crate::config::schema::{EnvKey, NodeMut, Record};

/// A read-only view of environment variables
pub trait EnvSource {
    /// Look up a variable. Unset and non-unicode variables are `None`.
    fn var(&self, key: &str) -> Option<String>;
}

/// The process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl<S: BuildHasher> EnvSource for HashMap<String, String, S> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

impl<T: EnvSource + ?Sized> EnvSource for &T {
    fn var(&self, key: &str) -> Option<String> {
        (**self).var(key)
    }
}

/// Overlay environment values onto every field of `record`
///
/// Walks fields depth-first in declaration order. Empty variables count as
/// unset. The first value that cannot be coerced aborts the whole overlay.
pub fn overlay(record: &mut dyn Record, prefix: &str, env: &dyn EnvSource) -> Result<(), ConfigError> {
    overlay_record(record, prefix, "", env)
}

/// List the environment variable every leaf field of `record` is read from
///
/// Returns `(field path, variable name)` pairs in overlay order. Fields with
/// the `"-"` override key are omitted.
pub fn describe_keys(record: &mut dyn Record, prefix: &str) -> Vec<(String, String)> {
    let mut keys = Vec::new();
    collect_keys(record, prefix, "", &mut keys);
    keys
}

fn collect_keys(record: &mut dyn Record, prefix: &str, path: &str, keys: &mut Vec<(String, String)>) {
    for field in record.fields() {
        let EnvKey::Name(key) = &field.env else {
            continue;
        };

        let full_key = format!("{}{}", prefix, key);
        let field_path = child_path(path, &field.name);

        match field.value.node_mut() {
            NodeMut::Record(nested) => {
                collect_keys(nested, &format!("{}_", full_key), &field_path, keys)
            }
            _ => keys.push((field_path, full_key)),
        }
    }
}

fn child_path(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", path, name)
    }
}

fn overlay_record(
    record: &mut dyn Record,
    prefix: &str,
    path: &str,
    env: &dyn EnvSource,
) -> Result<(), ConfigError> {
    for field in record.fields() {
        let EnvKey::Name(key) = &field.env else {
            continue;
        };

        let full_key = format!("{}{}", prefix, key);
        let field_path = child_path(path, &field.name);

        if let NodeMut::Record(nested) = field.value.node_mut() {
            overlay_record(nested, &format!("{}_", full_key), &field_path, env)?;
            continue;
        }

        let Some(raw) = env.var(&full_key).filter(|value| !value.is_empty()) else {
            continue;
        };

        field
            .value
            .bind_env(&raw)
            .map_err(|source| ConfigError::field_bind(field_path.clone(), full_key.clone(), raw, source))?;

        tracing::debug!(key = %full_key, field = %field_path, "Applied environment override");
    }

    Ok(())
}
