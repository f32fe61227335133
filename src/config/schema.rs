//! Schema-describing visitor over configuration trees
//!
//! Instead of inspecting types at runtime, every configuration type describes
//! its own shape. Records list their fields through [`Record::fields`] (usually
//! generated by `#[derive(Configurable)]`), and every other value reports
//! itself as one of the closed set of [`NodeMut`] variants. The environment
//! overlay and the interpolation pass only ever walk these descriptors.
//!
//! The walkers assume an acyclic tree, which owned Rust values guarantee.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;
use std::time::Duration;

use serde_json::{Map, Number, Value};

use crate::config::error::CoercionError;

/// Environment key of a record field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvKey {
    /// Read from `prefix + key`
    Name(Cow<'static, str>),
    /// Never read from the environment (the `"-"` override key)
    Skip,
}

impl EnvKey {
    /// Override key that maps to [`EnvKey::Skip`]
    pub const SENTINEL: &'static str = "-";

    /// Key with a static name
    pub const fn named(key: &'static str) -> Self {
        EnvKey::Name(Cow::Borrowed(key))
    }

    /// Interpret an override key, honouring the `"-"` sentinel
    pub fn from_override(key: impl Into<Cow<'static, str>>) -> Self {
        let key = key.into();
        if key == Self::SENTINEL {
            EnvKey::Skip
        } else {
            EnvKey::Name(key)
        }
    }
}

/// One entry of a record's descriptor table
pub struct Field<'a> {
    /// Field name as used in the configuration file
    pub name: Cow<'static, str>,
    /// Environment key, relative to the current prefix
    pub env: EnvKey,
    /// Mutable view of the field's value
    pub value: &'a mut dyn Node,
}

impl<'a> Field<'a> {
    pub fn new(name: impl Into<Cow<'static, str>>, env: EnvKey, value: &'a mut dyn Node) -> Self {
        Self {
            name: name.into(),
            env,
            value,
        }
    }
}

impl std::fmt::Debug for Field<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("env", &self.env)
            .finish_non_exhaustive()
    }
}

/// A fixed-shape aggregate of named fields
pub trait Record {
    /// The record's descriptor table, in declaration order
    fn fields(&mut self) -> Vec<Field<'_>>;

    /// Capability query for the defaults hook
    fn defaults(&mut self) -> Option<&mut dyn Defaults> {
        None
    }
}

/// Fallbacks applied once after every other phase has run
pub trait Defaults {
    fn set_defaults(&mut self);
}

/// Closed set of shapes a configuration value can take
pub enum NodeMut<'a> {
    Scalar(&'a mut dyn Scalar),
    Record(&'a mut dyn Record),
    Sequence(Vec<&'a mut dyn Node>),
    /// Mapping values; keys are never visited
    Mapping(Vec<&'a mut dyn Node>),
    Optional(Option<&'a mut dyn Node>),
}

impl NodeMut<'_> {
    /// Human-readable shape name, used in error messages
    pub fn describe(&self) -> &'static str {
        match self {
            NodeMut::Scalar(scalar) => scalar.kind().as_str(),
            NodeMut::Record(_) => "record",
            NodeMut::Sequence(_) => "sequence",
            NodeMut::Mapping(_) => "mapping",
            NodeMut::Optional(_) => "optional",
        }
    }
}

/// Any value that can appear in a configuration tree
pub trait Node {
    fn node_mut(&mut self) -> NodeMut<'_>;

    /// Coerce a raw environment value into this node
    ///
    /// Only scalars accept a value by default; every other shape reports
    /// [`CoercionError::Unsupported`].
    fn bind_env(&mut self, raw: &str) -> Result<(), CoercionError> {
        match self.node_mut() {
            NodeMut::Scalar(scalar) => scalar.coerce(raw),
            other => Err(CoercionError::Unsupported(other.describe())),
        }
    }
}

/// Kind of a scalar leaf
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    String,
    Int,
    Uint,
    Float,
    Bool,
    Duration,
    Number,
}

impl ScalarKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScalarKind::String => "string",
            ScalarKind::Int => "integer",
            ScalarKind::Uint => "unsigned integer",
            ScalarKind::Float => "float",
            ScalarKind::Bool => "boolean",
            ScalarKind::Duration => "duration",
            ScalarKind::Number => "number",
        }
    }
}

/// A leaf value that can be coerced from environment text
pub trait Scalar {
    fn kind(&self) -> ScalarKind;

    /// Replace the value with `raw` parsed as this scalar's kind
    fn coerce(&mut self, raw: &str) -> Result<(), CoercionError>;

    /// The string slot, for leaves the interpolation pass rewrites
    fn as_text_mut(&mut self) -> Option<&mut String> {
        None
    }
}

/// Parse the boolean spellings accepted by the environment overlay
pub fn parse_bool(raw: &str) -> Result<bool, CoercionError> {
    match raw {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
        _ => Err(CoercionError::Bool(raw.to_string())),
    }
}

macro_rules! scalar_node {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Node for $ty {
                fn node_mut(&mut self) -> NodeMut<'_> {
                    NodeMut::Scalar(self)
                }
            }
        )*
    };
}

macro_rules! parsed_scalar {
    ($kind:expr => $($ty:ty),* $(,)?) => {
        $(
            impl Scalar for $ty {
                fn kind(&self) -> ScalarKind {
                    $kind
                }

                fn coerce(&mut self, raw: &str) -> Result<(), CoercionError> {
                    *self = raw.parse()?;
                    Ok(())
                }
            }
        )*
    };
}

parsed_scalar!(ScalarKind::Int => i8, i16, i32, i64, i128, isize);
parsed_scalar!(ScalarKind::Uint => u8, u16, u32, u64, u128, usize);
parsed_scalar!(ScalarKind::Float => f32, f64);

scalar_node!(
    String, bool, Duration, Number, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128,
    usize, f32, f64,
);

impl Scalar for String {
    fn kind(&self) -> ScalarKind {
        ScalarKind::String
    }

    fn coerce(&mut self, raw: &str) -> Result<(), CoercionError> {
        raw.clone_into(self);
        Ok(())
    }

    fn as_text_mut(&mut self) -> Option<&mut String> {
        Some(self)
    }
}

impl Scalar for bool {
    fn kind(&self) -> ScalarKind {
        ScalarKind::Bool
    }

    fn coerce(&mut self, raw: &str) -> Result<(), CoercionError> {
        *self = parse_bool(raw)?;
        Ok(())
    }
}

/// Durations are coerced from decimal nanoseconds; unit suffixes such as
/// `5s` are not understood.
impl Scalar for Duration {
    fn kind(&self) -> ScalarKind {
        ScalarKind::Duration
    }

    fn coerce(&mut self, raw: &str) -> Result<(), CoercionError> {
        *self = Duration::from_nanos(raw.parse()?);
        Ok(())
    }
}

impl Scalar for Number {
    fn kind(&self) -> ScalarKind {
        ScalarKind::Number
    }

    fn coerce(&mut self, raw: &str) -> Result<(), CoercionError> {
        *self = raw
            .parse()
            .map_err(|_| CoercionError::Number(raw.to_string()))?;
        Ok(())
    }
}

/// A set variable makes the option `Some`, built from `T::default()`.
impl<T: Node + Default> Node for Option<T> {
    fn node_mut(&mut self) -> NodeMut<'_> {
        NodeMut::Optional(self.as_mut().map(|value| value as &mut dyn Node))
    }

    fn bind_env(&mut self, raw: &str) -> Result<(), CoercionError> {
        let mut value = T::default();
        value.bind_env(raw)?;
        *self = Some(value);
        Ok(())
    }
}

impl<T: Node + ?Sized> Node for Box<T> {
    fn node_mut(&mut self) -> NodeMut<'_> {
        (**self).node_mut()
    }

    fn bind_env(&mut self, raw: &str) -> Result<(), CoercionError> {
        (**self).bind_env(raw)
    }
}

impl<T: Node> Node for Vec<T> {
    fn node_mut(&mut self) -> NodeMut<'_> {
        NodeMut::Sequence(self.iter_mut().map(|item| item as &mut dyn Node).collect())
    }
}

impl<T: Node, const N: usize> Node for [T; N] {
    fn node_mut(&mut self) -> NodeMut<'_> {
        NodeMut::Sequence(self.iter_mut().map(|item| item as &mut dyn Node).collect())
    }
}

impl<K, V: Node, S: BuildHasher> Node for HashMap<K, V, S> {
    fn node_mut(&mut self) -> NodeMut<'_> {
        NodeMut::Mapping(self.values_mut().map(|value| value as &mut dyn Node).collect())
    }
}

impl<K, V: Node> Node for BTreeMap<K, V> {
    fn node_mut(&mut self) -> NodeMut<'_> {
        NodeMut::Mapping(self.values_mut().map(|value| value as &mut dyn Node).collect())
    }
}

/// JSON objects behave as records whose environment keys are the upper-cased
/// object keys.
impl Record for Map<String, Value> {
    fn fields(&mut self) -> Vec<Field<'_>> {
        self.iter_mut()
            .map(|(key, value)| {
                Field::new(key.clone(), EnvKey::Name(key.to_uppercase().into()), value)
            })
            .collect()
    }
}

/// Open-typed slot. Its concrete shape is only known once inspected.
impl Node for Value {
    fn node_mut(&mut self) -> NodeMut<'_> {
        match self {
            Value::Null => NodeMut::Optional(None),
            Value::Bool(flag) => NodeMut::Scalar(flag),
            Value::Number(number) => NodeMut::Scalar(number),
            Value::String(text) => NodeMut::Scalar(text),
            Value::Array(items) => {
                NodeMut::Sequence(items.iter_mut().map(|item| item as &mut dyn Node).collect())
            }
            Value::Object(map) => NodeMut::Record(map),
        }
    }

    /// Null slots take the raw text; typed slots keep their type.
    fn bind_env(&mut self, raw: &str) -> Result<(), CoercionError> {
        match self {
            Value::Null => {
                *self = Value::String(raw.to_string());
                Ok(())
            }
            Value::Bool(flag) => flag.coerce(raw),
            Value::Number(number) => number.coerce(raw),
            Value::String(text) => text.coerce(raw),
            Value::Array(_) => Err(CoercionError::Unsupported("sequence")),
            Value::Object(_) => Err(CoercionError::Unsupported("record")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_env_key_sentinel() {
        assert_eq!(EnvKey::from_override("-"), EnvKey::Skip);
        assert_eq!(EnvKey::from_override("PORT"), EnvKey::named("PORT"));
    }

    #[test]
    fn test_parse_bool_spellings() {
        for raw in ["1", "t", "T", "TRUE", "true", "True"] {
            assert!(parse_bool(raw).unwrap(), "{raw} should be true");
        }
        for raw in ["0", "f", "F", "FALSE", "false", "False"] {
            assert!(!parse_bool(raw).unwrap(), "{raw} should be false");
        }
        assert!(matches!(parse_bool("yes"), Err(CoercionError::Bool(_))));
        assert!(parse_bool("tRuE").is_err());
    }

    #[test]
    fn test_integer_coercion() {
        let mut port: u16 = 0;
        port.bind_env("4000").unwrap();
        assert_eq!(port, 4000);

        let mut offset: i32 = 0;
        offset.bind_env("-15").unwrap();
        assert_eq!(offset, -15);

        assert!(matches!(port.bind_env("70000"), Err(CoercionError::Int(_))));
        assert!(matches!(port.bind_env("-1"), Err(CoercionError::Int(_))));
        assert!(matches!(offset.bind_env("4k"), Err(CoercionError::Int(_))));
        assert_eq!(port, 4000);
    }

    #[test]
    fn test_float_and_string_coercion() {
        let mut sampler = 0.0f64;
        sampler.bind_env("0.25").unwrap();
        assert_eq!(sampler, 0.25);
        assert!(matches!(sampler.bind_env("a quarter"), Err(CoercionError::Float(_))));

        let mut host = String::from("localhost");
        host.bind_env(" 0.0.0.0 ").unwrap();
        assert_eq!(host, " 0.0.0.0 ");
    }

    #[test]
    fn test_duration_coerced_from_nanoseconds() {
        let mut timeout = Duration::ZERO;
        timeout.bind_env("5000000000").unwrap();
        assert_eq!(timeout, Duration::from_secs(5));

        assert!(timeout.bind_env("5s").is_err());
    }

    #[test]
    fn test_option_binds_inner_value() {
        let mut workers: Option<u32> = None;
        workers.bind_env("8").unwrap();
        assert_eq!(workers, Some(8));

        let mut missing: Option<u32> = None;
        assert!(missing.bind_env("eight").is_err());
        assert_eq!(missing, None);
    }

    #[test]
    fn test_collections_reject_env_values() {
        let mut hosts = vec![String::from("a")];
        assert!(matches!(
            hosts.bind_env("b"),
            Err(CoercionError::Unsupported("sequence"))
        ));

        let mut labels: HashMap<String, String> = HashMap::new();
        assert!(matches!(
            labels.bind_env("x"),
            Err(CoercionError::Unsupported("mapping"))
        ));
    }

    #[test]
    fn test_open_slot_binding_keeps_type() {
        let mut slot = json!(3);
        slot.bind_env("4.5").unwrap();
        assert_eq!(slot, json!(4.5));

        let mut flag = json!(false);
        flag.bind_env("true").unwrap();
        assert_eq!(flag, json!(true));

        let mut empty = Value::Null;
        empty.bind_env("anything").unwrap();
        assert_eq!(empty, json!("anything"));

        let mut list = json!([1, 2]);
        assert!(list.bind_env("3").is_err());
    }

    #[test]
    fn test_json_object_fields_use_uppercased_keys() {
        let mut value = json!({ "log_level": "info" });
        let Value::Object(map) = &mut value else {
            unreachable!()
        };

        let fields = map.fields();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].name, "log_level");
        assert_eq!(fields[0].env, EnvKey::named("LOG_LEVEL"));
    }

    #[test]
    fn test_node_shapes() {
        let mut list = vec![1u8, 2, 3];
        assert!(matches!(list.node_mut(), NodeMut::Sequence(items) if items.len() == 3));

        let mut nothing: Option<String> = None;
        assert!(matches!(nothing.node_mut(), NodeMut::Optional(None)));

        let mut boxed: Box<String> = Box::new(String::from("x"));
        assert_eq!(boxed.node_mut().describe(), "string");
    }
}
