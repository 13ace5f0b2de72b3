//! Validate command - load and check a playbook without executing it

use crate::commands::parse_arg_bindings;
use opfor_engine::{load_ttp, ExecutionConfig, ExecutionContext, OsFs};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

const EXIT_INVALID: u8 = 2;

#[derive(clap::Args)]
pub struct ValidateArgs {
    /// Playbook document to validate
    pub playbook: PathBuf,

    /// Argument binding, repeatable: --arg name=value
    #[arg(long = "arg", value_name = "NAME=VALUE")]
    pub args: Vec<String>,
}

pub fn handle(args: ValidateArgs) -> ExitCode {
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

    let ctx = ExecutionContext::new(loaded.args, ExecutionConfig::default(), Arc::new(OsFs));
    match loaded.ttp.validate(&ctx) {
        Ok(()) => {
            tracing::info!("playbook {:?} is valid", loaded.ttp.name);
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!("playbook failed validation: {err}");
            ExitCode::from(EXIT_INVALID)
        }
    }
}
