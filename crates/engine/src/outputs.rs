// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Output filters: extract named values from a step's stdout into the
//! result's `outputs` map, where later steps can reference them as
//! `Steps.NAME.outputs.FIELD`.

use crate::document::RawOutputSpec;
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors from applying output filters.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("output {name}: stdout is not valid JSON: {source}")]
    NotJson {
        name: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("output {name}: invalid JSON path {path:?}")]
    InvalidPath { name: String, path: String },
    #[error("output {name}: JSON path {path:?} not found")]
    PathNotFound { name: String, path: String },
    #[error("output spec {name} has no filter")]
    NoFilter { name: String },
}

/// A single filter in an output chain.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputFilter {
    /// Extract the value at a dotted path from JSON input.
    Json { path: String },
}

/// A named filter chain.
#[derive(Debug, Clone)]
pub struct OutputSpec {
    pub name: String,
    pub filters: Vec<OutputFilter>,
}

impl OutputSpec {
    /// Convert a raw document spec, rejecting empty filter rows.
    pub fn resolve(raw: RawOutputSpec) -> Result<Self, OutputError> {
        let mut filters = Vec::with_capacity(raw.filters.len());
        for f in raw.filters {
            match f.json {
                Some(path) => filters.push(OutputFilter::Json { path }),
                None => return Err(OutputError::NoFilter { name: raw.name }),
            }
        }
        if filters.is_empty() {
            return Err(OutputError::NoFilter { name: raw.name });
        }
        Ok(Self {
            name: raw.name,
            filters,
        })
    }

    /// Run the chain over the input, each filter feeding the next.
    pub fn apply(&self, input: &str) -> Result<String, OutputError> {
        let mut current = input.to_string();
        for filter in &self.filters {
            current = match filter {
                OutputFilter::Json { path } => self.apply_json(path, &current)?,
            };
        }
        Ok(current)
    }

    fn apply_json(&self, path: &str, input: &str) -> Result<String, OutputError> {
        let root: Value = serde_json::from_str(input).map_err(|source| OutputError::NotJson {
            name: self.name.clone(),
            source,
        })?;
        let mut current = &root;
        for segment in path.split('.') {
            if segment.is_empty() {
                return Err(OutputError::InvalidPath {
                    name: self.name.clone(),
                    path: path.to_string(),
                });
            }
            current = current
                .get(segment)
                .ok_or_else(|| OutputError::PathNotFound {
                    name: self.name.clone(),
                    path: path.to_string(),
                })?;
        }
        Ok(match current {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }
}

/// Apply every spec to the given stdout, producing the `outputs` map.
pub fn collect(specs: &[OutputSpec], stdout: &str) -> Result<BTreeMap<String, String>, OutputError> {
    let mut outputs = BTreeMap::new();
    for spec in specs {
        outputs.insert(spec.name.clone(), spec.apply(stdout)?);
    }
    Ok(outputs)
}

#[cfg(test)]
#[path = "outputs_tests.rs"]
mod tests;
