// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The step model: one named action plus the shared step keys.

use crate::actions::{
    Act, Action, ActionError, CopyPathAction, CreateFileAction, EditFileAction, EditOp,
    FetchUriAction, PrintStrAction, RemovePathAction, ShellAction, SubTtpAction,
};
use crate::checks::{CheckError, SuccessCheck};
use crate::context::{ActionResult, ExecutionContext};
use crate::document::{RawCleanup, RawCleanupAction, RawStep};
use crate::outputs::{OutputError, OutputSpec};
use crate::template::{Bindings, Renderer, TemplateError};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors raised while resolving or validating a playbook.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("step {index} has an empty name")]
    EmptyStepName { index: usize },
    #[error("duplicate step name: {0}")]
    DuplicateStepName(String),
    #[error("step has no action")]
    NoAction,
    #[error("step sets more than one action")]
    MultipleActions,
    #[error("field {field} requires the {requires} action")]
    MisplacedField {
        field: &'static str,
        requires: &'static str,
    },
    #[error("cleanup \"default\" is not available for {action} actions")]
    NoDefaultCleanup { action: &'static str },
    #[error("unknown cleanup token {token:?} (expected \"default\")")]
    BadCleanupToken { token: String },
    #[error("shell command is empty")]
    EmptyCommand,
    #[error("action path is empty")]
    EmptyPath,
    #[error("copy_path requires `to`")]
    MissingCopyDest,
    #[error("fetch_uri requires `location`")]
    MissingFetchLocation,
    #[error("not a valid URI: {0}")]
    InvalidUri(String),
    #[error("edit_file declares no edits")]
    NoEdits,
    #[error("edit must set exactly one of delete, append, replace")]
    BadEditSelector,
    #[error("replace edit requires `with`")]
    MissingReplaceWith,
    #[error("invalid regular expression {pattern:?}: {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("sub-playbook not found: {0}")]
    SubTtpMissing(String),
    #[error("sub-playbook {path}: {message}")]
    SubTtpInvalid { path: String, message: String },
    #[error("argument {name} is not declared by sub-playbook {path}")]
    SubTtpUndeclaredArg { path: String, name: String },
    #[error("could not acquire working directory: {0}")]
    WorkDir(#[source] std::io::Error),
    #[error(transparent)]
    Check(#[from] CheckError),
    #[error(transparent)]
    Output(#[from] OutputError),
    #[error("step {step}: {source}")]
    InStep {
        step: String,
        #[source]
        source: Box<ValidationError>,
    },
}

impl ValidationError {
    fn in_step(self, step: &str) -> Self {
        ValidationError::InStep {
            step: step.to_string(),
            source: Box::new(self),
        }
    }
}

/// What to do when a step is unwound: nothing, the action's own inverse,
/// or a user-supplied inline action.
#[derive(Debug)]
pub enum CleanupSpec {
    None,
    Default,
    Action(Box<Action>),
}

/// A named unit of work: exactly one action plus shared keys.
#[derive(Debug)]
pub struct Step {
    pub name: String,
    pub action: Action,
    pub cleanup: CleanupSpec,
    pub env: BTreeMap<String, String>,
    pub checks: Vec<SuccessCheck>,
    pub chdir: Option<String>,
    pub outputs: Vec<OutputSpec>,
    /// Rendered per step; a falsy value skips the step.
    pub guard: Option<String>,
    pub timeout_seconds: Option<u64>,
}

/// Count the action-selector keys present on a raw step or cleanup action.
macro_rules! count_selectors {
    ($raw:expr) => {
        [
            $raw.shell.is_some(),
            $raw.inline.is_some(),
            $raw.create_file.is_some(),
            $raw.edit_file.is_some(),
            $raw.copy_path.is_some(),
            $raw.remove_path.is_some(),
            $raw.fetch_uri.is_some(),
            $raw.print_str.is_some(),
        ]
        .iter()
        .filter(|&&s| s)
        .count()
    };
}

impl Step {
    /// Resolve a raw document step into the typed model, applying the
    /// closed discriminator rule and the supporting-field placement rules.
    pub fn resolve(raw: RawStep) -> Result<Self, ValidationError> {
        let name = raw.name.clone();
        Self::resolve_inner(raw).map_err(|err| err.in_step(&name))
    }

    fn resolve_inner(raw: RawStep) -> Result<Self, ValidationError> {
        let selector_count = count_selectors!(raw) + raw.ttp.is_some() as usize;
        if selector_count == 0 {
            return Err(ValidationError::NoAction);
        }
        if selector_count > 1 {
            return Err(ValidationError::MultipleActions);
        }

        check_placement(
            &[
                ("contents", raw.contents.is_some(), raw.create_file.is_some(), "create_file"),
                ("edits", !raw.edits.is_empty(), raw.edit_file.is_some(), "edit_file"),
                ("to", raw.to.is_some(), raw.copy_path.is_some(), "copy_path"),
                ("recursive", raw.recursive, raw.remove_path.is_some(), "remove_path"),
                ("location", raw.location.is_some(), raw.fetch_uri.is_some(), "fetch_uri"),
                ("args", !raw.args.is_empty(), raw.ttp.is_some(), "ttp"),
                (
                    "executor",
                    raw.executor.is_some(),
                    raw.shell.is_some() || raw.inline.is_some(),
                    "shell",
                ),
            ],
        )?;

        let action = resolve_action(ActionFields {
            shell: raw.shell,
            inline: raw.inline,
            create_file: raw.create_file,
            edit_file: raw.edit_file,
            copy_path: raw.copy_path,
            remove_path: raw.remove_path,
            fetch_uri: raw.fetch_uri,
            print_str: raw.print_str,
            ttp: raw.ttp,
            contents: raw.contents,
            overwrite: raw.overwrite,
            edits: raw.edits,
            to: raw.to,
            recursive: raw.recursive,
            location: raw.location,
            args: raw.args,
            executor: raw.executor,
        })?;

        let cleanup = match raw.cleanup {
            None => {
                // Nested playbooks always unwind through their own cleanup.
                if matches!(action, Action::SubTtp(_)) {
                    CleanupSpec::Default
                } else {
                    CleanupSpec::None
                }
            }
            Some(RawCleanup::Token(token)) => {
                if token != "default" {
                    return Err(ValidationError::BadCleanupToken { token });
                }
                if !action.has_natural_inverse() {
                    return Err(ValidationError::NoDefaultCleanup {
                        action: action.name(),
                    });
                }
                CleanupSpec::Default
            }
            Some(RawCleanup::Action(cleanup_action)) => {
                CleanupSpec::Action(Box::new(resolve_cleanup_action(*cleanup_action)?))
            }
        };

        let checks = raw
            .success_checks
            .into_iter()
            .map(SuccessCheck::resolve)
            .collect::<Result<Vec<_>, _>>()?;
        let outputs = raw
            .outputs
            .into_iter()
            .map(OutputSpec::resolve)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Step {
            name: raw.name,
            action,
            cleanup,
            env: raw.env,
            checks,
            chdir: raw.chdir,
            outputs,
            guard: raw.guard,
            timeout_seconds: raw.timeout_seconds,
        })
    }

    /// Run the action's static checks, and the inline cleanup action's if
    /// one was declared. Never executes side effects.
    pub fn validate(&self, ctx: &ExecutionContext) -> Result<(), ValidationError> {
        self.action
            .validate(ctx)
            .map_err(|err| err.in_step(&self.name))?;
        if let CleanupSpec::Action(action) = &self.cleanup {
            action
                .validate(ctx)
                .map_err(|err| err.in_step(&self.name))?;
        }
        Ok(())
    }

    /// Phase (b): re-render every templated field against the current
    /// bindings, just before the step runs. The guard is rendered by the
    /// runner before this is called.
    pub fn render(
        &mut self,
        renderer: &Renderer,
        bindings: &Bindings,
    ) -> Result<(), TemplateError> {
        for field in self.action.templated_fields() {
            *field = renderer.render(field, bindings)?;
        }
        if let CleanupSpec::Action(action) = &mut self.cleanup {
            for field in action.templated_fields() {
                *field = renderer.render(field, bindings)?;
            }
        }
        for value in self.env.values_mut() {
            *value = renderer.render(value, bindings)?;
        }
        for check in &mut self.checks {
            for field in check.templated_fields() {
                *field = renderer.render(field, bindings)?;
            }
        }
        if let Some(chdir) = &mut self.chdir {
            *chdir = renderer.render(chdir, bindings)?;
        }
        Ok(())
    }

    /// Run the step's cleanup: the action's natural inverse, the inline
    /// cleanup action, or nothing.
    pub fn run_cleanup(
        &mut self,
        ctx: &ExecutionContext,
    ) -> Result<Option<ActionResult>, ActionError> {
        match &mut self.cleanup {
            CleanupSpec::None => Ok(None),
            CleanupSpec::Default => self.action.cleanup(ctx).map(Some),
            CleanupSpec::Action(action) => action.execute(ctx).map(Some),
        }
    }
}

fn check_placement(
    rules: &[(&'static str, bool, bool, &'static str)],
) -> Result<(), ValidationError> {
    for &(field, present, allowed, requires) in rules {
        if present && !allowed {
            return Err(ValidationError::MisplacedField { field, requires });
        }
    }
    Ok(())
}

/// The action-selector and supporting fields shared by steps and inline
/// cleanup actions.
struct ActionFields {
    shell: Option<String>,
    inline: Option<String>,
    create_file: Option<String>,
    edit_file: Option<String>,
    copy_path: Option<String>,
    remove_path: Option<String>,
    fetch_uri: Option<String>,
    print_str: Option<String>,
    ttp: Option<String>,
    contents: Option<String>,
    overwrite: bool,
    edits: Vec<crate::document::RawEdit>,
    to: Option<String>,
    recursive: bool,
    location: Option<String>,
    args: BTreeMap<String, String>,
    executor: Option<String>,
}

fn resolve_action(fields: ActionFields) -> Result<Action, ValidationError> {
    if let Some(command) = fields.shell.or(fields.inline) {
        let mut action = ShellAction::new(command);
        if let Some(executor) = fields.executor {
            action = action.with_executor(executor);
        }
        return Ok(Action::Shell(action));
    }
    if let Some(path) = fields.create_file {
        return Ok(Action::CreateFile(CreateFileAction {
            path,
            contents: fields.contents.unwrap_or_default(),
            overwrite: fields.overwrite,
        }));
    }
    if let Some(path) = fields.edit_file {
        let edits = fields
            .edits
            .into_iter()
            .map(EditOp::resolve)
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(Action::EditFile(EditFileAction::new(path, edits)));
    }
    if let Some(src) = fields.copy_path {
        let dest = fields.to.ok_or(ValidationError::MissingCopyDest)?;
        return Ok(Action::CopyPath(CopyPathAction {
            src,
            dest,
            overwrite: fields.overwrite,
        }));
    }
    if let Some(path) = fields.remove_path {
        return Ok(Action::RemovePath(RemovePathAction {
            path,
            recursive: fields.recursive,
        }));
    }
    if let Some(uri) = fields.fetch_uri {
        let location = fields
            .location
            .ok_or(ValidationError::MissingFetchLocation)?;
        return Ok(Action::FetchUri(FetchUriAction {
            uri,
            location,
            overwrite: fields.overwrite,
        }));
    }
    if let Some(message) = fields.print_str {
        return Ok(Action::PrintStr(PrintStrAction { message }));
    }
    if let Some(path) = fields.ttp {
        return Ok(Action::SubTtp(SubTtpAction::new(path, fields.args)));
    }
    Err(ValidationError::NoAction)
}

fn resolve_cleanup_action(raw: RawCleanupAction) -> Result<Action, ValidationError> {
    let selector_count = count_selectors!(raw);
    if selector_count == 0 {
        return Err(ValidationError::NoAction);
    }
    if selector_count > 1 {
        return Err(ValidationError::MultipleActions);
    }
    resolve_action(ActionFields {
        shell: raw.shell,
        inline: raw.inline,
        create_file: raw.create_file,
        edit_file: raw.edit_file,
        copy_path: raw.copy_path,
        remove_path: raw.remove_path,
        fetch_uri: raw.fetch_uri,
        print_str: raw.print_str,
        ttp: None,
        contents: raw.contents,
        overwrite: raw.overwrite,
        edits: raw.edits,
        to: raw.to,
        recursive: raw.recursive,
        location: raw.location,
        args: BTreeMap::new(),
        executor: raw.executor,
    })
}

#[cfg(test)]
#[path = "step_tests.rs"]
mod tests;
