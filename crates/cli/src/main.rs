//! opfor - adversary-emulation playbook runner
//!
//! Thin front-end over the opfor engine: loads a playbook document, runs
//! it, and maps the engine's error taxonomy onto process exit codes.

use clap::{Parser, Subcommand};
use std::process::ExitCode;

mod commands;

#[derive(Parser)]
#[command(name = "opfor")]
#[command(about = "Run adversary-emulation playbooks")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a playbook, then clean it up
    Run(commands::run::RunArgs),
    /// Load and validate a playbook without executing it
    Validate(commands::validate::ValidateArgs),
}

fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => commands::run::handle(args),
        Commands::Validate(args) => commands::validate::handle(args),
    }
}
