// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The closed set of step actions and the uniform contract they honor.

pub mod edit;
pub mod fetch;
pub mod file;
pub mod shell;
pub mod sub_ttp;

use crate::context::{ActionResult, ExecutionContext};
use crate::step::ValidationError;
use std::path::PathBuf;
use thiserror::Error;

pub use edit::{EditFileAction, EditOp};
pub use fetch::FetchUriAction;
pub use file::{CopyPathAction, CreateFileAction, RemovePathAction};
pub use shell::ShellAction;
pub use sub_ttp::SubTtpAction;

/// Errors raised while executing or cleaning up an action.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("command exited with status {status}")]
    CommandFailed { status: i32 },
    #[error("command timed out after {seconds}s")]
    Timeout { seconds: u64 },
    #[error("cancelled")]
    Cancelled,
    #[error("destination already exists: {0}")]
    DestinationExists(PathBuf),
    #[error("path does not exist: {0}")]
    SourceMissing(PathBuf),
    #[error("download failed: {0}")]
    Http(String),
    #[error("{0} action has no natural inverse")]
    NoInverse(&'static str),
    #[error("no backup recorded for {0}")]
    NoBackup(String),
    #[error("nested playbook load failed: {0}")]
    SubLoad(#[source] Box<crate::loader::LoadError>),
    #[error("nested playbook failed: {0}")]
    Sub(#[source] Box<crate::ttp::RunError>),
}

/// The uniform contract every action variant implements.
///
/// `validate` performs static checks only and never touches the host.
/// `execute` performs the side effect. `cleanup` reverses it where the
/// action defines a natural inverse. `should_cleanup_on_failure` is true
/// when a failed `execute` may still have left partial side effects behind
/// (nested playbooks).
pub trait Act {
    fn validate(&self, ctx: &ExecutionContext) -> Result<(), ValidationError>;
    fn execute(&mut self, ctx: &ExecutionContext) -> Result<ActionResult, ActionError>;
    fn cleanup(&mut self, ctx: &ExecutionContext) -> Result<ActionResult, ActionError>;
    fn should_cleanup_on_failure(&self) -> bool {
        false
    }
}

/// Emit a message to the log sink. No side effect, no inverse.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrintStrAction {
    pub message: String,
}

impl Act for PrintStrAction {
    fn validate(&self, _ctx: &ExecutionContext) -> Result<(), ValidationError> {
        Ok(())
    }

    fn execute(&mut self, _ctx: &ExecutionContext) -> Result<ActionResult, ActionError> {
        tracing::info!("{}", self.message);
        Ok(ActionResult {
            stdout: self.message.clone(),
            ..ActionResult::default()
        })
    }

    fn cleanup(&mut self, _ctx: &ExecutionContext) -> Result<ActionResult, ActionError> {
        Err(ActionError::NoInverse("print_str"))
    }
}

/// The closed action variant set. The discriminator is the action-selector
/// key in the playbook document.
#[derive(Debug)]
pub enum Action {
    Shell(ShellAction),
    CreateFile(CreateFileAction),
    EditFile(EditFileAction),
    CopyPath(CopyPathAction),
    RemovePath(RemovePathAction),
    FetchUri(FetchUriAction),
    PrintStr(PrintStrAction),
    SubTtp(SubTtpAction),
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Shell(_) => "shell",
            Action::CreateFile(_) => "create_file",
            Action::EditFile(_) => "edit_file",
            Action::CopyPath(_) => "copy_path",
            Action::RemovePath(_) => "remove_path",
            Action::FetchUri(_) => "fetch_uri",
            Action::PrintStr(_) => "print_str",
            Action::SubTtp(_) => "sub_ttp",
        }
    }

    /// Whether `cleanup: default` is meaningful for this variant.
    pub fn has_natural_inverse(&self) -> bool {
        !matches!(
            self,
            Action::Shell(_) | Action::RemovePath(_) | Action::PrintStr(_)
        )
    }

    fn dispatch(&mut self) -> &mut dyn Act {
        match self {
            Action::Shell(a) => a,
            Action::CreateFile(a) => a,
            Action::EditFile(a) => a,
            Action::CopyPath(a) => a,
            Action::RemovePath(a) => a,
            Action::FetchUri(a) => a,
            Action::PrintStr(a) => a,
            Action::SubTtp(a) => a,
        }
    }

    fn dispatch_ref(&self) -> &dyn Act {
        match self {
            Action::Shell(a) => a,
            Action::CreateFile(a) => a,
            Action::EditFile(a) => a,
            Action::CopyPath(a) => a,
            Action::RemovePath(a) => a,
            Action::FetchUri(a) => a,
            Action::PrintStr(a) => a,
            Action::SubTtp(a) => a,
        }
    }

    /// Mutable references to every templated string field, for the
    /// per-step re-render pass.
    pub fn templated_fields(&mut self) -> Vec<&mut String> {
        match self {
            Action::Shell(a) => vec![&mut a.command],
            Action::CreateFile(a) => vec![&mut a.path, &mut a.contents],
            Action::EditFile(a) => {
                let mut fields = vec![&mut a.path];
                for edit in &mut a.edits {
                    fields.extend(edit.templated_fields());
                }
                fields
            }
            Action::CopyPath(a) => vec![&mut a.src, &mut a.dest],
            Action::RemovePath(a) => vec![&mut a.path],
            Action::FetchUri(a) => vec![&mut a.uri, &mut a.location],
            Action::PrintStr(a) => vec![&mut a.message],
            Action::SubTtp(a) => {
                let mut fields = vec![&mut a.path];
                fields.extend(a.args.values_mut());
                fields
            }
        }
    }
}

impl Act for Action {
    fn validate(&self, ctx: &ExecutionContext) -> Result<(), ValidationError> {
        self.dispatch_ref().validate(ctx)
    }

    fn execute(&mut self, ctx: &ExecutionContext) -> Result<ActionResult, ActionError> {
        self.dispatch().execute(ctx)
    }

    fn cleanup(&mut self, ctx: &ExecutionContext) -> Result<ActionResult, ActionError> {
        self.dispatch().cleanup(ctx)
    }

    fn should_cleanup_on_failure(&self) -> bool {
        self.dispatch_ref().should_cleanup_on_failure()
    }
}
