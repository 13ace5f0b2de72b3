// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The top-level playbook object and run orchestration.

use crate::actions::ActionError;
use crate::args::ArgDecl;
use crate::checks::{CheckError, RequirementError, Requirements};
use crate::cleanup;
use crate::context::ExecutionContext;
use crate::logging;
use crate::outputs::OutputError;
use crate::runner;
use crate::step::{Step, ValidationError};
use crate::template::TemplateError;
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by a playbook run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("playbook requirements not met: {0}")]
    Requirements(#[from] RequirementError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("could not acquire working directory: {0}")]
    WorkDir(#[source] std::io::Error),
    #[error("step {step}: template expansion failed: {source}")]
    Template {
        step: String,
        #[source]
        source: TemplateError,
    },
    #[error("step {step} failed: {source}")]
    Step {
        step: String,
        #[source]
        source: ActionError,
    },
    #[error("success check {number} of step {step} failed: {source}")]
    Check {
        step: String,
        number: usize,
        #[source]
        source: CheckError,
    },
    #[error("output filter of step {step} failed: {source}")]
    Output {
        step: String,
        #[source]
        source: OutputError,
    },
    #[error("run cancelled")]
    Cancelled,
}

/// Mappings to the MITRE ATT&CK framework. Purely descriptive.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MitreAttack {
    #[serde(default)]
    pub tactics: Vec<String>,
    #[serde(default)]
    pub techniques: Vec<String>,
    #[serde(default)]
    pub subtechniques: Vec<String>,
}

/// A loaded playbook: preamble, environment exports, and ordered steps.
///
/// `work_dir` is set by the orchestrator (normally the directory holding
/// the document), never by the document itself.
#[derive(Debug)]
pub struct Ttp {
    pub name: String,
    pub description: String,
    pub args: Vec<ArgDecl>,
    pub requirements: Option<Requirements>,
    pub mitre: Option<MitreAttack>,
    pub env: BTreeMap<String, String>,
    pub steps: Vec<Step>,
    pub work_dir: Option<PathBuf>,
}

impl Ttp {
    /// Validate the playbook: step names are non-empty and unique, and
    /// every step's action (and inline cleanup) passes its static checks.
    /// Never executes side effects.
    pub fn validate(&self, ctx: &ExecutionContext) -> Result<(), ValidationError> {
        tracing::debug!(playbook = %self.name, "validating playbook");
        // Relative references (sub-playbook paths) resolve against the
        // playbook working directory, same as at execution time.
        let _guard = runner::acquire_workdir(self).map_err(ValidationError::WorkDir)?;
        let mut seen = HashSet::new();
        for (index, step) in self.steps.iter().enumerate() {
            if step.name.trim().is_empty() {
                return Err(ValidationError::EmptyStepName { index });
            }
            if !seen.insert(step.name.as_str()) {
                return Err(ValidationError::DuplicateStepName(step.name.clone()));
            }
            step.validate(ctx)?;
        }
        tracing::debug!("finished validating playbook");
        Ok(())
    }

    /// Run the playbook: requirements gate, steps in order, then cleanup.
    ///
    /// Cleanup runs unless `no_cleanup` is set, even when a step failed;
    /// the original run error is preserved and returned afterwards. With
    /// `dry_run` the call stops after the requirements gate.
    pub fn execute(&mut self, ctx: &mut ExecutionContext) -> Result<(), RunError> {
        tracing::info!("running playbook: {}", self.name);

        if let Some(requirements) = &self.requirements {
            requirements.verify(ctx)?;
        }
        if ctx.config.dry_run {
            tracing::info!("dry run requested; no steps executed");
            return Ok(());
        }
        ctx.env = self.env.clone();

        let (cleanup_from, outcome) = runner::run_steps(self, ctx);
        logging::divider_thin();
        match &outcome {
            Ok(()) => tracing::info!("playbook completed successfully"),
            Err(err) => tracing::error!("error executing playbook: {err}"),
        }

        if !ctx.config.no_cleanup {
            if ctx.config.cleanup_delay_seconds > 0 {
                tracing::info!(
                    "sleeping for requested cleanup delay of {} seconds",
                    ctx.config.cleanup_delay_seconds
                );
                std::thread::sleep(std::time::Duration::from_secs(
                    ctx.config.cleanup_delay_seconds,
                ));
            }
            let cleanup_results =
                cleanup::run_cleanup(self, ctx, cleanup_from).map_err(RunError::WorkDir)?;
            // Both indices observe the assignment: they share the results.
            for (idx, result) in cleanup_results.into_iter().enumerate() {
                if let Some(result) = result {
                    ctx.results.set_cleanup(idx, result);
                }
            }
        }

        outcome
    }

    /// Best-effort cleanup of every step, used with `force_cleanup` when
    /// validation failed but an earlier run may have left state behind.
    /// Steps are rendered with whatever bindings are available; render
    /// failures are logged and the step's cleanup skipped.
    pub fn force_cleanup_all(&mut self, ctx: &mut ExecutionContext) -> Result<(), RunError> {
        ctx.env = self.env.clone();
        let renderer = crate::template::Renderer::new();
        let bindings = ctx.bindings();
        for step in &mut self.steps {
            if let Err(err) = step.render(&renderer, &bindings) {
                tracing::debug!(step = %step.name, error = %err, "could not render step");
            }
        }
        let cleanup_from = self.steps.len() as isize - 1;
        let cleanup_results =
            cleanup::run_cleanup(self, ctx, cleanup_from).map_err(RunError::WorkDir)?;
        for (idx, result) in cleanup_results.into_iter().enumerate() {
            if let Some(result) = result {
                ctx.results.set_cleanup(idx, result);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "ttp_tests.rs"]
mod tests;
