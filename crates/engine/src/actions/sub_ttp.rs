// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Nested playbook execution.
//!
//! A sub-playbook step loads another document, binds the supplied
//! arguments, and runs its steps inside the parent run. Cleanup on failure
//! is special: sub-steps that already succeeded must be unwound even though
//! the step as a whole failed, so `should_cleanup_on_failure` is true and
//! the runner invokes this action's cleanup immediately when it errors.

use crate::actions::{Act, ActionError};
use crate::cleanup;
use crate::context::{ActionResult, ExecutionContext};
use crate::loader;
use crate::runner;
use crate::step::ValidationError;
use crate::ttp::Ttp;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Run a nested playbook with the given argument bindings.
#[derive(Debug, Default)]
pub struct SubTtpAction {
    pub path: String,
    pub args: BTreeMap<String, String>,
    /// Present after `execute`: everything cleanup needs to unwind.
    state: Option<SubRun>,
}

#[derive(Debug)]
struct SubRun {
    ttp: Ttp,
    ctx: ExecutionContext,
    cleanup_from: isize,
}

impl SubTtpAction {
    pub fn new(path: impl Into<String>, args: BTreeMap<String, String>) -> Self {
        Self {
            path: path.into(),
            args,
            state: None,
        }
    }

    fn load(&self, ctx: &ExecutionContext) -> Result<(Ttp, ExecutionContext), ActionError> {
        let path = Path::new(&self.path);
        let text = ctx.fs.read_to_string(path)?;
        let supplied = self.args.clone().into_iter().collect();
        let loaded = loader::load_ttp(&text, &supplied)
            .map_err(|err| ActionError::SubLoad(Box::new(err)))?;

        let mut ttp = loaded.ttp;
        ttp.work_dir = std::path::absolute(path)
            .ok()
            .as_deref()
            .and_then(Path::parent)
            .map(PathBuf::from);

        let mut sub_ctx =
            ExecutionContext::new(loaded.args, ctx.config.clone(), ctx.fs.clone());
        sub_ctx.env = ttp.env.clone();
        sub_ctx.cancel = ctx.cancel.clone();
        Ok((ttp, sub_ctx))
    }
}

impl Act for SubTtpAction {
    /// Resolve the target reference: the file must exist, its preamble must
    /// parse, and every supplied argument must be declared by it.
    fn validate(&self, ctx: &ExecutionContext) -> Result<(), ValidationError> {
        let path = Path::new(&self.path);
        if !ctx.fs.exists(path) {
            return Err(ValidationError::SubTtpMissing(self.path.clone()));
        }
        let text = ctx
            .fs
            .read_to_string(path)
            .map_err(|err| ValidationError::SubTtpInvalid {
                path: self.path.clone(),
                message: err.to_string(),
            })?;
        let preamble =
            loader::parse_preamble(&text).map_err(|err| ValidationError::SubTtpInvalid {
                path: self.path.clone(),
                message: err.to_string(),
            })?;
        for name in self.args.keys() {
            if !preamble.args.iter().any(|decl| &decl.name == name) {
                return Err(ValidationError::SubTtpUndeclaredArg {
                    path: self.path.clone(),
                    name: name.clone(),
                });
            }
        }
        Ok(())
    }

    fn execute(&mut self, ctx: &ExecutionContext) -> Result<ActionResult, ActionError> {
        let (mut ttp, mut sub_ctx) = self.load(ctx)?;
        tracing::info!(playbook = %ttp.name, "running nested playbook");

        if let Some(requirements) = &ttp.requirements {
            requirements
                .verify(&sub_ctx)
                .map_err(|err| ActionError::Sub(Box::new(err.into())))?;
        }
        ttp.validate(&sub_ctx)
            .map_err(|err| ActionError::Sub(Box::new(err.into())))?;

        let (cleanup_from, outcome) = runner::run_steps(&mut ttp, &mut sub_ctx);
        self.state = Some(SubRun {
            ttp,
            ctx: sub_ctx,
            cleanup_from,
        });
        match outcome {
            Ok(()) => Ok(ActionResult::default()),
            Err(err) => Err(ActionError::Sub(Box::new(err))),
        }
    }

    /// Unwind the nested run exactly once. A second call is a no-op so a
    /// sub-playbook cleaned up at failure time is not cleaned up again by
    /// the parent's main cleanup phase.
    fn cleanup(&mut self, _ctx: &ExecutionContext) -> Result<ActionResult, ActionError> {
        let Some(mut run) = self.state.take() else {
            return Ok(ActionResult::default());
        };
        let results = cleanup::run_cleanup(&mut run.ttp, &mut run.ctx, run.cleanup_from)?;
        for (idx, result) in results.into_iter().enumerate() {
            if let Some(result) = result {
                run.ctx.results.set_cleanup(idx, result);
            }
        }
        Ok(ActionResult::default())
    }

    fn should_cleanup_on_failure(&self) -> bool {
        true
    }
}

#[cfg(test)]
#[path = "sub_ttp_tests.rs"]
mod tests;
