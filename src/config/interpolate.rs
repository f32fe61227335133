//! `${VAR}` interpolation over every string in a configuration tree
//!
//! Supported references, matched left to right without overlap:
//! - `${NAME}`
//! - `${NAME:-default}`: the default is used verbatim when `NAME` is unset or empty
//! - `$NAME` where `NAME` matches `[A-Z_][A-Z0-9_]*`
//!
//! A reference that resolves to nothing is left in place as written.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::config::env::EnvSource;
use crate::config::schema::{NodeMut, Record};

static REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([^}]+)\}|\$([A-Z_][A-Z0-9_]*)").expect("reference pattern is valid")
});

/// Separator between a braced name and its default
const DEFAULT_SEPARATOR: &str = ":-";

/// Expand every variable reference in `input`
///
/// An explicit default always applies when the variable is unset or empty,
/// even an empty one: `${MISSING:-}` expands to `""`. Only references without
/// a default stay in place.
///
/// Returns the input borrowed when it contains no reference at all.
pub fn interpolate_str<'t>(input: &'t str, env: &dyn EnvSource) -> Cow<'t, str> {
    if !input.contains('$') {
        return Cow::Borrowed(input);
    }

    REFERENCE.replace_all(input, |caps: &Captures<'_>| resolve(caps, env))
}

fn resolve(caps: &Captures<'_>, env: &dyn EnvSource) -> String {
    let matched = &caps[0];

    let (name, default) = match (caps.get(1), caps.get(2)) {
        (Some(braced), _) => match braced.as_str().split_once(DEFAULT_SEPARATOR) {
            Some((name, default)) => (name, Some(default)),
            None => (braced.as_str(), None),
        },
        (None, Some(bare)) => (bare.as_str(), None),
        (None, None) => return matched.to_string(),
    };

    if let Some(value) = env.var(name).filter(|value| !value.is_empty()) {
        return value;
    }

    match default {
        Some(default) => default.to_string(),
        None => {
            tracing::trace!(reference = matched, "Leaving unresolved reference in place");
            matched.to_string()
        }
    }
}

/// Rewrite every string reachable from `record` in place
pub fn interpolate_record(record: &mut dyn Record, env: &dyn EnvSource) {
    interpolate_node(NodeMut::Record(record), env);
}

/// Rewrite every string reachable from `node` in place
///
/// Mapping keys are never touched. This pass cannot fail.
pub fn interpolate_node(node: NodeMut<'_>, env: &dyn EnvSource) {
    match node {
        NodeMut::Scalar(scalar) => {
            if let Some(text) = scalar.as_text_mut() {
                expand_in_place(text, env);
            }
        }
        NodeMut::Record(record) => {
            for field in record.fields() {
                interpolate_node(field.value.node_mut(), env);
            }
        }
        NodeMut::Sequence(items) | NodeMut::Mapping(items) => {
            for item in items {
                interpolate_node(item.node_mut(), env);
            }
        }
        NodeMut::Optional(Some(inner)) => interpolate_node(inner.node_mut(), env),
        NodeMut::Optional(None) => {}
    }
}

fn expand_in_place(text: &mut String, env: &dyn EnvSource) {
    let expanded = match interpolate_str(text, env) {
        Cow::Borrowed(_) => return,
        Cow::Owned(expanded) => expanded,
    };
    *text = expanded;
}
