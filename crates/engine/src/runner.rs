// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The step runner: executes steps in declared order, applies success
//! checks and output filters, and tracks the cleanup frontier.

use crate::actions::Act;
use crate::context::{ExecutionContext, StepResult, StepScope};
use crate::logging;
use crate::outputs;
use crate::step::Step;
use crate::template::{self, Renderer};
use crate::ttp::{RunError, Ttp};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Scoped change of the process working directory.
///
/// Restores the previous directory when dropped, on every exit path.
#[derive(Debug)]
pub struct WorkDirGuard {
    original: PathBuf,
}

impl WorkDirGuard {
    pub fn enter(dir: &Path) -> io::Result<Self> {
        let original = std::env::current_dir()?;
        std::env::set_current_dir(dir)?;
        Ok(Self { original })
    }
}

impl Drop for WorkDirGuard {
    fn drop(&mut self) {
        if let Err(err) = std::env::set_current_dir(&self.original) {
            tracing::error!(
                original = %self.original.display(),
                error = %err,
                "could not restore original directory"
            );
        }
    }
}

/// Enter the playbook working directory, if one was set.
pub(crate) fn acquire_workdir(ttp: &Ttp) -> io::Result<Option<WorkDirGuard>> {
    match &ttp.work_dir {
        Some(dir) => WorkDirGuard::enter(dir).map(Some),
        None => Ok(None),
    }
}

/// Build the per-step scope: host-inherited subprocess env overlaid with
/// playbook then step exports, the step's directory override, and its
/// timeout.
pub(crate) fn scope_for(ctx: &ExecutionContext, step: &Step) -> StepScope {
    let mut env = ctx.env.clone();
    for (key, value) in &step.env {
        env.insert(key.clone(), value.clone());
    }
    StepScope {
        env,
        cwd: step.chdir.as_ref().map(PathBuf::from),
        timeout: step.timeout_seconds.map(Duration::from_secs),
    }
}

/// Execute all steps in order.
///
/// Returns the index of the last step whose cleanup must be attempted
/// (`-1` means none) together with the run outcome. The frontier only
/// advances after a step's success checks pass: a step that failed at
/// `execute` or at a check is not part of the main cleanup walk, though a
/// failed step whose action reports `should_cleanup_on_failure` has its
/// own cleanup attempted immediately.
pub fn run_steps(ttp: &mut Ttp, ctx: &mut ExecutionContext) -> (isize, Result<(), RunError>) {
    let _guard = match acquire_workdir(ttp) {
        Ok(guard) => guard,
        Err(err) => return (-1, Err(RunError::WorkDir(err))),
    };

    let renderer = Renderer::new();
    let mut cleanup_from: isize = -1;

    for (idx, step) in ttp.steps.iter_mut().enumerate() {
        if ctx.cancel.is_cancelled() {
            return (cleanup_from, Err(RunError::Cancelled));
        }
        logging::divider_thin();
        tracing::info!("executing step #{}: {:?}", idx + 1, step.name);

        let bindings = ctx.bindings();

        // The guard is rendered before the rest of the step so a skipped
        // step never trips over references its guard was protecting.
        if let Some(guard) = &step.guard {
            let rendered = match renderer.render(guard, &bindings) {
                Ok(rendered) => rendered,
                Err(err) => {
                    return (
                        cleanup_from,
                        Err(RunError::Template {
                            step: step.name.clone(),
                            source: err,
                        }),
                    )
                }
            };
            if !template::is_truthy(&rendered) {
                tracing::info!("skipping step {:?} (guard is false)", step.name);
                cleanup_from += 1;
                ctx.results.push(StepResult {
                    name: step.name.clone(),
                    skipped: true,
                    ..StepResult::default()
                });
                continue;
            }
        }

        if let Err(err) = step.render(&renderer, &bindings) {
            return (
                cleanup_from,
                Err(RunError::Template {
                    step: step.name.clone(),
                    source: err,
                }),
            );
        }
        ctx.scope = scope_for(ctx, step);

        let mut result = match step.action.execute(&*ctx) {
            Ok(result) => result,
            Err(err) => {
                // Nested playbooks may have committed side effects before
                // failing; unwind them now. The full cleanup phase still
                // runs afterwards for the steps before this one.
                if step.action.should_cleanup_on_failure() {
                    tracing::info!("cleaning up failed step {:?}", step.name);
                    if let Err(cleanup_err) = step.run_cleanup(&*ctx) {
                        tracing::error!(
                            step = %step.name,
                            error = %cleanup_err,
                            "error cleaning up failed step"
                        );
                    }
                }
                return (
                    cleanup_from,
                    Err(RunError::Step {
                        step: step.name.clone(),
                        source: err,
                    }),
                );
            }
        };

        for (check_idx, check) in step.checks.iter().enumerate() {
            if let Err(err) = check.verify(&*ctx) {
                return (
                    cleanup_from,
                    Err(RunError::Check {
                        step: step.name.clone(),
                        number: check_idx + 1,
                        source: err,
                    }),
                );
            }
            tracing::debug!(
                step = %step.name,
                check = check_idx + 1,
                msg = check.msg().unwrap_or(""),
                "success check passed"
            );
        }

        if !step.outputs.is_empty() {
            match outputs::collect(&step.outputs, &result.stdout) {
                Ok(extracted) => result.outputs = extracted,
                Err(err) => {
                    return (
                        cleanup_from,
                        Err(RunError::Output {
                            step: step.name.clone(),
                            source: err,
                        }),
                    )
                }
            }
        }

        cleanup_from += 1;
        ctx.results.push(StepResult {
            name: step.name.clone(),
            action: result,
            cleanup: None,
            skipped: false,
        });
    }

    (cleanup_from, Ok(()))
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
