//! Run command - execute a playbook and clean it up

use crate::commands::parse_arg_bindings;
use opfor_engine::{load_ttp, ExecutionConfig, ExecutionContext, OsFs, RunError};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

// Exit codes: 0 full success, 1 execution error after best-effort cleanup,
// 2 validation or argument error, 3 requirements unmet.
const EXIT_RUN_FAILED: u8 = 1;
const EXIT_INVALID: u8 = 2;
const EXIT_REQUIREMENTS: u8 = 3;

#[derive(clap::Args)]
pub struct RunArgs {
    /// Playbook document to run
    pub playbook: PathBuf,

    /// Argument binding, repeatable: --arg name=value
    #[arg(long = "arg", value_name = "NAME=VALUE")]
    pub args: Vec<String>,

    /// Skip the cleanup phase
    #[arg(long)]
    pub no_cleanup: bool,

    /// Sleep this many seconds before cleanup starts
    #[arg(long, value_name = "SECONDS", default_value_t = 0)]
    pub cleanup_delay: u64,

    /// Validate without executing any side effect
    #[arg(long)]
    pub dry_run: bool,

    /// Attempt cleanup of every step even when validation fails
    #[arg(long)]
    pub force_cleanup: bool,
}

pub fn handle(args: RunArgs) -> ExitCode {
    let supplied = match parse_arg_bindings(&args.args) {
        Ok(supplied) => supplied,
        Err(message) => {
            tracing::error!("{message}");
            return ExitCode::from(EXIT_INVALID);
        }
    };

    let text = match std::fs::read_to_string(&args.playbook) {
        Ok(text) => text,
        Err(err) => {
            tracing::error!("could not read {}: {err}", args.playbook.display());
            return ExitCode::from(EXIT_INVALID);
        }
    };

    let loaded = match load_ttp(&text, &supplied) {
        Ok(loaded) => loaded,
        Err(err) => {
            tracing::error!("could not load playbook: {err}");
            return ExitCode::from(EXIT_INVALID);
        }
    };

    let mut ttp = loaded.ttp;
    ttp.work_dir = std::path::absolute(&args.playbook)
        .ok()
        .as_deref()
        .and_then(Path::parent)
        .map(PathBuf::from);

    let config = ExecutionConfig {
        no_cleanup: args.no_cleanup,
        cleanup_delay_seconds: args.cleanup_delay,
        dry_run: args.dry_run,
        force_cleanup: args.force_cleanup,
    };
    let mut ctx = ExecutionContext::new(loaded.args, config, Arc::new(OsFs));

    if let Err(err) = ttp.validate(&ctx) {
        tracing::error!("playbook failed validation: {err}");
        if ctx.config.force_cleanup {
            tracing::info!("force cleanup requested; attempting cleanup of all steps");
            if let Err(cleanup_err) = ttp.force_cleanup_all(&mut ctx) {
                tracing::error!("forced cleanup failed: {cleanup_err}");
            }
        }
        return ExitCode::from(EXIT_INVALID);
    }

    match ttp.execute(&mut ctx) {
        Ok(()) => ExitCode::SUCCESS,
        Err(RunError::Requirements(err)) => {
            tracing::error!("{err}");
            ExitCode::from(EXIT_REQUIREMENTS)
        }
        Err(err) => {
            tracing::error!("{err}");
            ExitCode::from(EXIT_RUN_FAILED)
        }
    }
}
