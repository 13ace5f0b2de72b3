// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! URI download action.

use crate::actions::{Act, ActionError};
use crate::context::{ActionResult, ExecutionContext};
use crate::step::ValidationError;
use std::path::Path;

/// Download a URI to a local path. Inverse: remove the download.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchUriAction {
    pub uri: String,
    pub location: String,
    pub overwrite: bool,
}

impl Act for FetchUriAction {
    fn validate(&self, _ctx: &ExecutionContext) -> Result<(), ValidationError> {
        if self.location.trim().is_empty() {
            return Err(ValidationError::MissingFetchLocation);
        }
        if !self.uri.contains("://") {
            return Err(ValidationError::InvalidUri(self.uri.clone()));
        }
        Ok(())
    }

    fn execute(&mut self, ctx: &ExecutionContext) -> Result<ActionResult, ActionError> {
        let location = Path::new(&self.location);
        if ctx.fs.exists(location) && !self.overwrite {
            return Err(ActionError::DestinationExists(location.to_path_buf()));
        }

        let response = reqwest::blocking::get(&self.uri)
            .and_then(|r| r.error_for_status())
            .map_err(|err| ActionError::Http(err.to_string()))?;
        let body = response
            .bytes()
            .map_err(|err| ActionError::Http(err.to_string()))?;

        if let Some(parent) = location.parent() {
            if !parent.as_os_str().is_empty() && !ctx.fs.exists(parent) {
                ctx.fs.mkdir_all(parent)?;
            }
        }
        ctx.fs.write(location, &body)?;
        Ok(ActionResult::default())
    }

    fn cleanup(&mut self, ctx: &ExecutionContext) -> Result<ActionResult, ActionError> {
        ctx.fs.remove(Path::new(&self.location))?;
        Ok(ActionResult::default())
    }
}

#[cfg(test)]
#[path = "fetch_tests.rs"]
mod tests;
