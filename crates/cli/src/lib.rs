pub mod commands;
pub mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use crate::commands::ask::AskArgs;

#[derive(Debug, Parser)]
#[command(
    name = "promptgate",
    about = "Screen prompts with a guard model before answering them",
    long_about = "Screen a prompt against business rules with a small guard model, then either \
                  answer it with the main model or return a kind reminder.",
    after_help = "Examples:\n  promptgate ask --prompt \"Summarize protocol ABC for cardiology.\"\n  promptgate config"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to a promptgate.toml config file")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Run a prompt through the guard and print the final assistant message")]
    Ask(AskArgs),
    #[command(about = "Inspect effective configuration values with source attribution and redaction")]
    Config,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Ask(args) => commands::ask::run(cli.config, &args),
        Command::Config => commands::CommandResult::success(commands::config::run(cli.config)),
    };

    if result.is_success() {
        println!("{}", result.output);
    } else {
        eprintln!("{}", result.output);
    }
    ExitCode::from(result.exit_code)
}
