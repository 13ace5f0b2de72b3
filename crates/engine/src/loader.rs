// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Playbook loading: preamble decode, argument resolution, whole-document
//! template expansion, structural decode, and step resolution.

use crate::args::{resolve_args, ArgError, ResolvedArgs};
use crate::document::{RawPreamble, RawTtp};
use crate::step::{Step, ValidationError};
use crate::template::{Bindings, Renderer, TemplateError};
use crate::ttp::Ttp;
use std::collections::HashMap;
use thiserror::Error;

/// Errors raised while loading a playbook document.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("document preamble does not decode: {0}")]
    Preamble(#[source] serde_yaml::Error),
    #[error("document does not decode: {0}")]
    Yaml(#[source] serde_yaml::Error),
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error(transparent)]
    Args(#[from] ArgError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// A loaded playbook together with its resolved arguments.
#[derive(Debug)]
pub struct LoadedTtp {
    pub ttp: Ttp,
    pub args: ResolvedArgs,
}

/// Everything above the `steps:` key.
///
/// The preamble is decoded from the raw text, before template expansion,
/// so argument declarations are available to the expansion pass. Template
/// expressions inside preamble values are plain YAML strings at this point.
fn split_preamble(text: &str) -> &str {
    match text.find("\nsteps:") {
        Some(pos) => &text[..pos + 1],
        None => {
            if text.starts_with("steps:") {
                ""
            } else {
                text
            }
        }
    }
}

/// Decode the document preamble from raw (pre-expansion) text.
pub fn parse_preamble(text: &str) -> Result<RawPreamble, LoadError> {
    serde_yaml::from_str(split_preamble(text)).map_err(LoadError::Preamble)
}

/// Load a playbook from raw document text.
///
/// Resolves the caller-supplied arguments against the declared ones, runs
/// the phase (a) template expansion, decodes the expanded text, and
/// resolves each step to its action variant. Semantic validation
/// ([`Ttp::validate`]) is a separate pass since it needs a filesystem.
pub fn load_ttp(text: &str, supplied: &HashMap<String, String>) -> Result<LoadedTtp, LoadError> {
    let preamble = parse_preamble(text)?;
    let args = resolve_args(&preamble.args, supplied)?;

    let renderer = Renderer::new();
    let bindings = Bindings::new().with("Args", args.to_binding());
    let expanded = renderer.expand_document(text, &bindings)?;

    let raw: RawTtp = serde_yaml::from_str(&expanded).map_err(LoadError::Yaml)?;
    let steps = raw
        .steps
        .into_iter()
        .map(Step::resolve)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(LoadedTtp {
        ttp: Ttp {
            name: raw.name,
            description: raw.description,
            args: raw.args,
            requirements: raw.requirements,
            mitre: raw.mitre,
            env: raw.env,
            steps,
            work_dir: None,
        },
        args,
    })
}

#[cfg(test)]
#[path = "loader_tests.rs"]
mod tests;
