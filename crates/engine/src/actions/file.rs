// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File creation, copying, and removal.

use crate::actions::{Act, ActionError};
use crate::context::{ActionResult, ExecutionContext};
use crate::step::ValidationError;
use std::path::{Path, PathBuf};

/// Write a file with the given contents. Inverse: remove the file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateFileAction {
    pub path: String,
    pub contents: String,
    pub overwrite: bool,
}

impl Act for CreateFileAction {
    fn validate(&self, _ctx: &ExecutionContext) -> Result<(), ValidationError> {
        if self.path.trim().is_empty() {
            return Err(ValidationError::EmptyPath);
        }
        Ok(())
    }

    fn execute(&mut self, ctx: &ExecutionContext) -> Result<ActionResult, ActionError> {
        let path = Path::new(&self.path);
        if ctx.fs.exists(path) && !self.overwrite {
            return Err(ActionError::DestinationExists(path.to_path_buf()));
        }
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !ctx.fs.exists(parent) {
                ctx.fs.mkdir_all(parent)?;
            }
        }
        ctx.fs.write(path, self.contents.as_bytes())?;
        Ok(ActionResult::default())
    }

    fn cleanup(&mut self, ctx: &ExecutionContext) -> Result<ActionResult, ActionError> {
        ctx.fs.remove(Path::new(&self.path))?;
        Ok(ActionResult::default())
    }
}

/// Copy a file or directory tree. Inverse: remove the destination.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CopyPathAction {
    pub src: String,
    pub dest: String,
    pub overwrite: bool,
}

impl Act for CopyPathAction {
    fn validate(&self, _ctx: &ExecutionContext) -> Result<(), ValidationError> {
        if self.src.trim().is_empty() || self.dest.trim().is_empty() {
            return Err(ValidationError::EmptyPath);
        }
        Ok(())
    }

    fn execute(&mut self, ctx: &ExecutionContext) -> Result<ActionResult, ActionError> {
        let src = Path::new(&self.src);
        let dest = Path::new(&self.dest);
        if !ctx.fs.exists(src) {
            return Err(ActionError::SourceMissing(src.to_path_buf()));
        }
        if ctx.fs.exists(dest) && !self.overwrite {
            return Err(ActionError::DestinationExists(dest.to_path_buf()));
        }
        if let Some(parent) = dest.parent() {
            if !parent.as_os_str().is_empty() && !ctx.fs.exists(parent) {
                ctx.fs.mkdir_all(parent)?;
            }
        }
        ctx.fs.copy_all(src, dest)?;
        Ok(ActionResult::default())
    }

    fn cleanup(&mut self, ctx: &ExecutionContext) -> Result<ActionResult, ActionError> {
        ctx.fs.remove_all(Path::new(&self.dest))?;
        Ok(ActionResult::default())
    }
}

/// Delete a path. Irreversible: only a user-supplied cleanup can follow it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemovePathAction {
    pub path: String,
    pub recursive: bool,
}

impl Act for RemovePathAction {
    fn validate(&self, _ctx: &ExecutionContext) -> Result<(), ValidationError> {
        if self.path.trim().is_empty() {
            return Err(ValidationError::EmptyPath);
        }
        Ok(())
    }

    fn execute(&mut self, ctx: &ExecutionContext) -> Result<ActionResult, ActionError> {
        let path = PathBuf::from(&self.path);
        if !ctx.fs.exists(&path) {
            return Err(ActionError::SourceMissing(path));
        }
        if self.recursive {
            ctx.fs.remove_all(&path)?;
        } else {
            ctx.fs.remove(&path)?;
        }
        Ok(ActionResult::default())
    }

    fn cleanup(&mut self, _ctx: &ExecutionContext) -> Result<ActionResult, ActionError> {
        Err(ActionError::NoInverse("remove_path"))
    }
}

#[cfg(test)]
#[path = "file_tests.rs"]
mod tests;
