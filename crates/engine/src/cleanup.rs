// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The cleanup controller: unwinds executed steps in reverse order.

use crate::context::{ActionResult, ExecutionContext};
use crate::logging;
use crate::runner;
use crate::ttp::Ttp;
use std::io;

/// Walk cleanup from `cleanup_from` down to step 0 inclusive.
///
/// The returned list is in step order, not walk order, and holds one entry
/// per visited step (`None` when the step had nothing to clean, was
/// skipped, or its cleanup failed). A failing cleanup is logged and never
/// aborts the walk. The only hard error is failing to re-enter the
/// playbook working directory.
pub fn run_cleanup(
    ttp: &mut Ttp,
    ctx: &mut ExecutionContext,
    cleanup_from: isize,
) -> io::Result<Vec<Option<ActionResult>>> {
    let _guard = runner::acquire_workdir(ttp)?;

    logging::divider_thick();
    tracing::info!("cleaning up playbook: {:?}", ttp.name);

    let mut results: Vec<Option<ActionResult>> = Vec::new();
    let mut idx = cleanup_from;
    while idx >= 0 {
        let step_idx = idx as usize;
        idx -= 1;
        let Some(step) = ttp.steps.get_mut(step_idx) else {
            results.insert(0, None);
            continue;
        };
        logging::divider_thin();
        tracing::info!("cleaning up step #{}: {:?}", step_idx + 1, step.name);

        let skipped = ctx
            .results
            .by_index(step_idx)
            .map(|r| r.skipped)
            .unwrap_or(false);
        if skipped {
            results.insert(0, None);
            continue;
        }

        ctx.scope = runner::scope_for(ctx, step);
        // Stored in step order, not in execution (reverse) order.
        match step.run_cleanup(&*ctx) {
            Ok(result) => results.insert(0, result),
            Err(err) => {
                tracing::error!(step = %step.name, error = %err, "error cleaning up step");
                tracing::error!("will continue to try to clean up other steps");
                results.insert(0, None);
            }
        }
    }

    logging::divider_thin();
    tracing::info!("finished cleanup");
    Ok(results)
}

#[cfg(test)]
#[path = "cleanup_tests.rs"]
mod tests;
