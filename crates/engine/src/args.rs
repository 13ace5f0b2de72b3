// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Playbook argument declarations and resolution.

use crate::template::BindingValue;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while resolving caller-supplied arguments.
#[derive(Debug, Error)]
pub enum ArgError {
    #[error("missing required argument: {0}")]
    Missing(String),
    #[error("argument {name} declared more than once")]
    DuplicateDeclaration { name: String },
    #[error("argument {name} not declared by this playbook")]
    Undeclared { name: String },
    #[error("invalid value {value:?} for argument {name}: not in choices [{choices}]")]
    NotInChoices {
        name: String,
        value: String,
        choices: String,
    },
    #[error("invalid value {value:?} for int argument {name}")]
    InvalidInt { name: String, value: String },
    #[error("invalid value {value:?} for bool argument {name}")]
    InvalidBool { name: String, value: String },
    #[error("could not resolve path argument {name}: {source}")]
    PathResolve {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

/// Semantic type of a declared argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArgType {
    #[default]
    String,
    Int,
    Bool,
    Path,
}

/// A single argument declaration from the playbook preamble.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArgDecl {
    pub name: String,
    #[serde(rename = "type", default)]
    pub arg_type: ArgType,
    #[serde(default)]
    pub default: Option<serde_yaml::Value>,
    #[serde(default)]
    pub choices: Vec<String>,
}

/// A resolved, typed argument value.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    String(String),
    Int(i64),
    Bool(bool),
    Path(PathBuf),
}

impl ArgValue {
    pub fn to_binding(&self) -> BindingValue {
        match self {
            ArgValue::String(s) => BindingValue::String(s.clone()),
            ArgValue::Int(n) => BindingValue::Int(*n),
            ArgValue::Bool(b) => BindingValue::Bool(*b),
            ArgValue::Path(p) => BindingValue::String(p.display().to_string()),
        }
    }
}

/// The full set of resolved arguments for a run.
#[derive(Debug, Clone, Default)]
pub struct ResolvedArgs {
    values: BTreeMap<String, ArgValue>,
}

impl ResolvedArgs {
    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.values.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Binding object for the template context's `Args` name.
    pub fn to_binding(&self) -> BindingValue {
        BindingValue::Object(
            self.values
                .iter()
                .map(|(k, v)| (k.clone(), v.to_binding()))
                .collect(),
        )
    }
}

/// Resolve caller-supplied values against the declared arguments.
///
/// Declared order: choices membership is checked on the raw string form,
/// then the value is coerced to its declared type. Defaults fill absent
/// values; a declared argument with neither is an error, as is any supplied
/// name that was never declared.
pub fn resolve_args(
    decls: &[ArgDecl],
    supplied: &HashMap<String, String>,
) -> Result<ResolvedArgs, ArgError> {
    let mut values = BTreeMap::new();

    for decl in decls {
        if values.contains_key(&decl.name) {
            return Err(ArgError::DuplicateDeclaration {
                name: decl.name.clone(),
            });
        }
        let raw = match supplied.get(&decl.name) {
            Some(v) => v.clone(),
            None => match &decl.default {
                Some(d) => yaml_scalar_to_string(d),
                None => return Err(ArgError::Missing(decl.name.clone())),
            },
        };
        if !decl.choices.is_empty() && !decl.choices.contains(&raw) {
            return Err(ArgError::NotInChoices {
                name: decl.name.clone(),
                value: raw,
                choices: decl.choices.join(", "),
            });
        }
        values.insert(decl.name.clone(), coerce(decl, &raw)?);
    }

    for name in supplied.keys() {
        if !values.contains_key(name) {
            return Err(ArgError::Undeclared { name: name.clone() });
        }
    }

    Ok(ResolvedArgs { values })
}

fn coerce(decl: &ArgDecl, raw: &str) -> Result<ArgValue, ArgError> {
    match decl.arg_type {
        ArgType::String => Ok(ArgValue::String(raw.to_string())),
        ArgType::Int => raw
            .trim()
            .parse::<i64>()
            .map(ArgValue::Int)
            .map_err(|_| ArgError::InvalidInt {
                name: decl.name.clone(),
                value: raw.to_string(),
            }),
        ArgType::Bool => parse_bool(raw).map(ArgValue::Bool).ok_or_else(|| {
            ArgError::InvalidBool {
                name: decl.name.clone(),
                value: raw.to_string(),
            }
        }),
        ArgType::Path => resolve_path(raw)
            .map(ArgValue::Path)
            .map_err(|source| ArgError::PathResolve {
                name: decl.name.clone(),
                source,
            }),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

/// Expand a leading `~` to the user's home directory and absolutize.
fn resolve_path(raw: &str) -> std::io::Result<PathBuf> {
    let expanded = if raw == "~" {
        dirs::home_dir().unwrap_or_else(|| PathBuf::from(raw))
    } else if let Some(rest) = raw.strip_prefix("~/") {
        match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => PathBuf::from(raw),
        }
    } else {
        PathBuf::from(raw)
    };
    std::path::absolute(Path::new(&expanded))
}

fn yaml_scalar_to_string(value: &serde_yaml::Value) -> String {
    match value {
        serde_yaml::Value::String(s) => s.clone(),
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Null => String::new(),
        other => serde_yaml::to_string(other).unwrap_or_default().trim_end().to_string(),
    }
}

#[cfg(test)]
#[path = "args_tests.rs"]
mod tests;
