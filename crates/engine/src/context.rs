// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run-time state threaded through the step runner and cleanup controller.

use crate::args::ResolvedArgs;
use crate::fs::FileSystem;
use crate::template::{BindingValue, Bindings};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// What a single action produced: captured stdio, exit status where a
/// subprocess was involved, and the values extracted by output filters.
/// Immutable once recorded.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ActionResult {
    pub stdout: String,
    pub stderr: String,
    pub status: Option<i32>,
    pub outputs: BTreeMap<String, String>,
}

/// The recorded outcome of one executed (or skipped) step.
///
/// `cleanup` starts empty and is filled in by the cleanup controller.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StepResult {
    pub name: String,
    pub action: ActionResult,
    pub cleanup: Option<ActionResult>,
    /// The step's guard was falsy; nothing ran and cleanup is a no-op.
    pub skipped: bool,
}

/// Step results indexed two ways over the same objects.
///
/// One ordered vector owns the results; the by-name index stores positions
/// into it, so a mutation through an index is observed through the name.
#[derive(Debug, Default)]
pub struct StepResultsRecord {
    results: Vec<StepResult>,
    by_name: HashMap<String, usize>,
}

impl StepResultsRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a result under both indices; returns its position.
    pub fn push(&mut self, result: StepResult) -> usize {
        let idx = self.results.len();
        self.by_name.insert(result.name.clone(), idx);
        self.results.push(result);
        idx
    }

    pub fn by_index(&self, idx: usize) -> Option<&StepResult> {
        self.results.get(idx)
    }

    pub fn by_name(&self, name: &str) -> Option<&StepResult> {
        self.by_name.get(name).and_then(|&idx| self.results.get(idx))
    }

    /// Set the cleanup result of an already-recorded step.
    pub fn set_cleanup(&mut self, idx: usize, cleanup: ActionResult) {
        if let Some(result) = self.results.get_mut(idx) {
            result.cleanup = Some(cleanup);
        }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StepResult> {
        self.results.iter()
    }

    /// Binding object for the template context's `Steps` name:
    /// `Steps.NAME.{stdout,stderr,outputs.FIELD}`.
    pub fn to_binding(&self) -> BindingValue {
        let mut steps = BTreeMap::new();
        for result in &self.results {
            let mut fields = BTreeMap::new();
            fields.insert(
                "stdout".to_string(),
                BindingValue::String(result.action.stdout.clone()),
            );
            fields.insert(
                "stderr".to_string(),
                BindingValue::String(result.action.stderr.clone()),
            );
            fields.insert(
                "outputs".to_string(),
                BindingValue::Object(
                    result
                        .action
                        .outputs
                        .iter()
                        .map(|(k, v)| (k.clone(), BindingValue::String(v.clone())))
                        .collect(),
                ),
            );
            steps.insert(result.name.clone(), BindingValue::Object(fields));
        }
        BindingValue::Object(steps)
    }
}

/// Options controlling a run.
#[derive(Debug, Clone, Default)]
pub struct ExecutionConfig {
    /// Skip the cleanup phase entirely.
    pub no_cleanup: bool,
    /// Sleep this long before cleanup starts.
    pub cleanup_delay_seconds: u64,
    /// Validate without executing any side effect.
    pub dry_run: bool,
    /// Attempt cleanup of every step even when validation failed.
    pub force_cleanup: bool,
}

/// Cooperative cancellation signal, checked between steps.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Per-step scope installed by the runner before each action call:
/// the merged subprocess environment, the step's directory override, and
/// its timeout.
#[derive(Debug, Clone, Default)]
pub struct StepScope {
    pub env: BTreeMap<String, String>,
    pub cwd: Option<PathBuf>,
    pub timeout: Option<Duration>,
}

/// The mutable run-time environment for one playbook execution.
///
/// Mutation discipline: only the step runner appends to the results record,
/// and only the cleanup controller sets `cleanup` fields on existing
/// results.
pub struct ExecutionContext {
    pub args: ResolvedArgs,
    pub results: StepResultsRecord,
    pub fs: Arc<dyn FileSystem>,
    pub config: ExecutionConfig,
    /// Playbook-level environment exports.
    pub env: BTreeMap<String, String>,
    pub cancel: CancelToken,
    pub scope: StepScope,
}

impl ExecutionContext {
    pub fn new(args: ResolvedArgs, config: ExecutionConfig, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            args,
            results: StepResultsRecord::new(),
            fs,
            config,
            env: BTreeMap::new(),
            cancel: CancelToken::new(),
            scope: StepScope::default(),
        }
    }

    /// Template bindings for phase (b): arguments plus accumulated results.
    pub fn bindings(&self) -> Bindings {
        Bindings::new()
            .with("Args", self.args.to_binding())
            .with("Steps", self.results.to_binding())
    }
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("args", &self.args)
            .field("results", &self.results)
            .field("config", &self.config)
            .field("env", &self.env)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
