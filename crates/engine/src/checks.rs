// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pre-run requirement verification and per-step success checks.

use crate::actions::shell::run_shell;
use crate::context::ExecutionContext;
use crate::document::RawCheck;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from the pre-run requirements gate.
#[derive(Debug, Error)]
pub enum RequirementError {
    #[error("platform {os}/{arch} does not match any required platform")]
    PlatformMismatch { os: String, arch: String },
    #[error("required path does not exist: {0}")]
    PathMissing(PathBuf),
}

/// Errors from a failed success check.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("file does not exist: {0}")]
    FileMissing(PathBuf),
    #[error("file {path} does not contain {value:?}")]
    ContentsMissing { path: PathBuf, value: String },
    #[error("could not read {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("check command failed with status {status}: {command}")]
    CommandFailed { command: String, status: i32 },
    #[error("could not run check command {command}: {source}")]
    CommandError {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("success check must set exactly one of file_exists, file_contains, command")]
    BadSelector,
    #[error("file_contains check requires a value")]
    MissingValue,
}

/// A platform the playbook may run on. An absent field matches anything.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlatformSpec {
    pub os: Option<String>,
    pub arch: Option<String>,
}

impl PlatformSpec {
    fn matches(&self, os: &str, arch: &str) -> bool {
        self.os.as_deref().map(|v| v == os).unwrap_or(true)
            && self.arch.as_deref().map(|v| v == arch).unwrap_or(true)
    }
}

/// Preconditions gating a run: platform match and path prechecks.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Requirements {
    pub platforms: Vec<PlatformSpec>,
    pub paths: Vec<PathBuf>,
}

impl Requirements {
    /// Verify against the running host. An empty platform list matches any.
    pub fn verify(&self, ctx: &ExecutionContext) -> Result<(), RequirementError> {
        let (os, arch) = (std::env::consts::OS, std::env::consts::ARCH);
        if !self.platforms.is_empty() && !self.platforms.iter().any(|p| p.matches(os, arch)) {
            return Err(RequirementError::PlatformMismatch {
                os: os.to_string(),
                arch: arch.to_string(),
            });
        }
        for path in &self.paths {
            if !ctx.fs.exists(path) {
                return Err(RequirementError::PathMissing(path.clone()));
            }
        }
        Ok(())
    }
}

/// A post-execution assertion declared on a step.
#[derive(Debug, Clone, PartialEq)]
pub enum SuccessCheck {
    FileExists {
        msg: Option<String>,
        path: String,
    },
    FileContains {
        msg: Option<String>,
        path: String,
        value: String,
    },
    CommandSucceeds {
        msg: Option<String>,
        command: String,
    },
}

impl SuccessCheck {
    /// Convert a raw document check, enforcing the one-selector rule.
    pub fn resolve(raw: RawCheck) -> Result<Self, CheckError> {
        let selectors = [
            raw.file_exists.is_some(),
            raw.file_contains.is_some(),
            raw.command.is_some(),
        ]
        .iter()
        .filter(|&&s| s)
        .count();
        if selectors != 1 {
            return Err(CheckError::BadSelector);
        }
        if let Some(path) = raw.file_exists {
            return Ok(SuccessCheck::FileExists { msg: raw.msg, path });
        }
        if let Some(path) = raw.file_contains {
            let value = raw.value.ok_or(CheckError::MissingValue)?;
            return Ok(SuccessCheck::FileContains {
                msg: raw.msg,
                path,
                value,
            });
        }
        // One selector is set and it is not a file check.
        match raw.command {
            Some(command) => Ok(SuccessCheck::CommandSucceeds {
                msg: raw.msg,
                command,
            }),
            None => Err(CheckError::BadSelector),
        }
    }

    pub fn msg(&self) -> Option<&str> {
        match self {
            SuccessCheck::FileExists { msg, .. }
            | SuccessCheck::FileContains { msg, .. }
            | SuccessCheck::CommandSucceeds { msg, .. } => msg.as_deref(),
        }
    }

    /// Mutable references to the check's templated fields, for phase (b)
    /// re-rendering.
    pub fn templated_fields(&mut self) -> Vec<&mut String> {
        match self {
            SuccessCheck::FileExists { path, .. } => vec![path],
            SuccessCheck::FileContains { path, value, .. } => vec![path, value],
            SuccessCheck::CommandSucceeds { command, .. } => vec![command],
        }
    }

    /// Run the assertion. Verification never mutates anything.
    pub fn verify(&self, ctx: &ExecutionContext) -> Result<(), CheckError> {
        match self {
            SuccessCheck::FileExists { path, .. } => {
                let path = Path::new(path);
                if ctx.fs.exists(path) {
                    Ok(())
                } else {
                    Err(CheckError::FileMissing(path.to_path_buf()))
                }
            }
            SuccessCheck::FileContains { path, value, .. } => {
                let path = Path::new(path);
                let contents =
                    ctx.fs
                        .read_to_string(path)
                        .map_err(|source| CheckError::Unreadable {
                            path: path.to_path_buf(),
                            source,
                        })?;
                if contents.contains(value.as_str()) {
                    Ok(())
                } else {
                    Err(CheckError::ContentsMissing {
                        path: path.to_path_buf(),
                        value: value.clone(),
                    })
                }
            }
            SuccessCheck::CommandSucceeds { command, .. } => {
                let output = run_shell("sh", command, ctx)
                    .map_err(|source| CheckError::CommandError {
                        command: command.clone(),
                        source,
                    })?;
                match output.status {
                    Some(0) => Ok(()),
                    status => Err(CheckError::CommandFailed {
                        command: command.clone(),
                        status: status.unwrap_or(-1),
                    }),
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "checks_tests.rs"]
mod tests;
