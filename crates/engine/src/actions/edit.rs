// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-place file editing with backup-based reversal.
//!
//! Edits apply in declared order, each over the file's then-current
//! contents. A `delete` removes every match (literal or regexp) and drops
//! any line a removal left empty. An `append` adds a single line with a
//! trailing newline. A `replace` substitutes every match with literal text.
//!
//! The edited text is computed in memory first; only when every edit has
//! applied is the original written to a `.bak` sibling, the target
//! replaced, and the sibling removed. The original text is retained by the
//! action so cleanup can restore it byte for byte, and a failed edit leaves
//! neither a partial target nor a stray backup behind.

use crate::actions::{Act, ActionError};
use crate::context::{ActionResult, ExecutionContext};
use crate::document::RawEdit;
use crate::step::ValidationError;
use regex::Regex;
use std::path::{Path, PathBuf};

// Marks removed spans so emptied lines can be identified and dropped.
const TOMBSTONE: char = '\u{0}';

/// One edit operation.
#[derive(Debug, Clone, PartialEq)]
pub enum EditOp {
    Delete { pattern: String, regexp: bool },
    Append { line: String },
    Replace {
        pattern: String,
        with_text: String,
        regexp: bool,
    },
}

impl EditOp {
    /// Convert a raw document edit, enforcing the one-selector rule.
    pub fn resolve(raw: RawEdit) -> Result<Self, ValidationError> {
        let selectors = [
            raw.delete.is_some(),
            raw.append.is_some(),
            raw.replace.is_some(),
        ]
        .iter()
        .filter(|&&s| s)
        .count();
        if selectors != 1 {
            return Err(ValidationError::BadEditSelector);
        }
        if let Some(pattern) = raw.delete {
            return Ok(EditOp::Delete {
                pattern,
                regexp: raw.regexp,
            });
        }
        if let Some(line) = raw.append {
            return Ok(EditOp::Append { line });
        }
        // One selector is set and it is the replace.
        let pattern = raw.replace.unwrap_or_default();
        let with_text = raw.with_text.ok_or(ValidationError::MissingReplaceWith)?;
        Ok(EditOp::Replace {
            pattern,
            with_text,
            regexp: raw.regexp,
        })
    }

    pub fn templated_fields(&mut self) -> Vec<&mut String> {
        match self {
            EditOp::Delete { pattern, .. } => vec![pattern],
            EditOp::Append { line } => vec![line],
            EditOp::Replace {
                pattern, with_text, ..
            } => vec![pattern, with_text],
        }
    }

    fn compile(pattern: &str, regexp: bool) -> Result<Regex, ValidationError> {
        let source = if regexp {
            pattern.to_string()
        } else {
            regex::escape(pattern)
        };
        Regex::new(&source).map_err(|err| ValidationError::InvalidRegex {
            pattern: pattern.to_string(),
            source: err,
        })
    }

    fn apply(&self, contents: &str) -> Result<String, ValidationError> {
        match self {
            EditOp::Delete { pattern, regexp } => {
                let re = Self::compile(pattern, *regexp)?;
                Ok(drop_emptied_lines(
                    &re.replace_all(contents, TOMBSTONE.to_string().as_str()),
                ))
            }
            EditOp::Append { line } => {
                let mut result = contents.to_string();
                if !result.is_empty() && !result.ends_with('\n') {
                    result.push('\n');
                }
                result.push_str(line);
                result.push('\n');
                Ok(result)
            }
            EditOp::Replace {
                pattern,
                with_text,
                regexp,
            } => {
                let re = Self::compile(pattern, *regexp)?;
                Ok(re
                    .replace_all(contents, regex::NoExpand(with_text))
                    .into_owned())
            }
        }
    }
}

/// Remove tombstones; a line reduced to nothing by its tombstones is
/// dropped entirely, newline included.
fn drop_emptied_lines(contents: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    for line in contents.split('\n') {
        if line.contains(TOMBSTONE) {
            let cleaned: String = line.chars().filter(|&c| c != TOMBSTONE).collect();
            if !cleaned.is_empty() {
                lines.push(cleaned);
            }
        } else {
            lines.push(line.to_string());
        }
    }
    lines.join("\n")
}

/// Apply an ordered list of edits to a file. Inverse: restore the backup.
#[derive(Debug, Default)]
pub struct EditFileAction {
    pub path: String,
    pub edits: Vec<EditOp>,
    /// Original contents, captured by `execute` for the restore.
    original: Option<String>,
}

impl EditFileAction {
    pub fn new(path: impl Into<String>, edits: Vec<EditOp>) -> Self {
        Self {
            path: path.into(),
            edits,
            original: None,
        }
    }

    fn backup_path(&self) -> PathBuf {
        PathBuf::from(format!("{}.bak", self.path))
    }
}

impl Act for EditFileAction {
    fn validate(&self, _ctx: &ExecutionContext) -> Result<(), ValidationError> {
        if self.path.trim().is_empty() {
            return Err(ValidationError::EmptyPath);
        }
        if self.edits.is_empty() {
            return Err(ValidationError::NoEdits);
        }
        for edit in &self.edits {
            match edit {
                EditOp::Delete { pattern, regexp: true }
                | EditOp::Replace {
                    pattern,
                    regexp: true,
                    ..
                } => {
                    EditOp::compile(pattern, true)?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn execute(&mut self, ctx: &ExecutionContext) -> Result<ActionResult, ActionError> {
        let path = Path::new(&self.path);
        if !ctx.fs.exists(path) {
            return Err(ActionError::SourceMissing(path.to_path_buf()));
        }
        let original = ctx.fs.read_to_string(path)?;

        // Apply every edit in memory before touching the disk. Validation
        // compiled the pre-render pattern text; the per-step template pass
        // may have rewritten a pattern since, and that failure must surface
        // before the backup is written.
        let mut contents = original.clone();
        for edit in &self.edits {
            contents = edit
                .apply(&contents)
                .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidInput, err))?;
        }

        let backup = self.backup_path();
        ctx.fs.write(&backup, original.as_bytes())?;
        if let Err(err) = ctx.fs.write(path, contents.as_bytes()) {
            if let Err(remove_err) = ctx.fs.remove(&backup) {
                tracing::debug!(
                    backup = %backup.display(),
                    error = %remove_err,
                    "could not remove backup after failed write"
                );
            }
            return Err(err.into());
        }
        ctx.fs.remove(&backup)?;

        self.original = Some(original);
        Ok(ActionResult::default())
    }

    fn cleanup(&mut self, ctx: &ExecutionContext) -> Result<ActionResult, ActionError> {
        let original = self
            .original
            .as_ref()
            .ok_or_else(|| ActionError::NoBackup(self.path.clone()))?;
        ctx.fs.write(Path::new(&self.path), original.as_bytes())?;
        Ok(ActionResult::default())
    }
}

#[cfg(test)]
#[path = "edit_tests.rs"]
mod tests;
