pub mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use paydesk_core::domain::chat::ChatMode;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "paydesk",
    about = "Paydesk operator CLI",
    long_about = "Operate Paydesk migrations, readiness checks, config inspection, the tool catalog, and one-shot assistant runs.",
    after_help = "Examples:\n  paydesk doctor --json\n  paydesk catalog\n  paydesk ask --mode simulation \"List my customers\""
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ModeArg {
    Simulation,
    Actual,
}

impl From<ModeArg> for ChatMode {
    fn from(value: ModeArg) -> Self {
        match value {
            ModeArg::Simulation => ChatMode::Simulation,
            ModeArg::Actual => ChatMode::Actual,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, catalog parity, payments key, and DB connectivity")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Print the tool declarations handed to the model")]
    Catalog,
    #[command(about = "Run one assistant turn against the configured providers")]
    Ask {
        #[arg(long, value_enum, default_value = "simulation")]
        mode: ModeArg,
        #[arg(help = "The request, in natural language")]
        message: String,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::Catalog => commands::catalog::run(),
        Command::Ask { mode, message } => commands::ask::run(&message, mode.into()),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
