pub mod commands;
pub mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use payplan_core::config::AppConfig;
use tracing::info;

use commands::extract::ExtractArgs;
use commands::finalize::FinalizeArgs;
use commands::intercept::InterceptArgs;
use commands::minimum::MinimumArgs;
use commands::negotiate::NegotiateArgs;
use commands::suggest::SuggestArgs;
use commands::tool::ToolArgs;

#[derive(Debug, Parser)]
#[command(
    name = "payplan",
    about = "Payment-plan negotiation CLI",
    long_about = "Evaluate, counter and finalize debt repayment plans with the deterministic negotiation engine.",
    after_help = "Examples:\n  payplan minimum --debt 2400 --frequency weekly\n  payplan negotiate --frequency monthly --amount 50 --term 12\n  payplan tool evaluate_and_negotiate --args '{\"proposal\":{\"frequency\":\"monthly\",\"amount\":300,\"termLength\":8}}'"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to a payplan.toml configuration file")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Compute the minimum installment for a balance and frequency")]
    Minimum(MinimumArgs),
    #[command(about = "Evaluate a debtor's proposed plan and counter when needed")]
    Negotiate(NegotiateArgs),
    #[command(about = "Validate a plan the assistant wants to suggest")]
    Suggest(SuggestArgs),
    #[command(about = "Finalize an agreed plan and produce the payment link")]
    Finalize(FinalizeArgs),
    #[command(about = "Scan free text for an implicit payment offer")]
    Extract(ExtractArgs),
    #[command(about = "Screen an assistant reply through the offer interceptor")]
    Intercept(InterceptArgs),
    #[command(about = "Run one negotiation tool call with JSON arguments")]
    Tool(ToolArgs),
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Self::Config => "config",
            Self::Minimum(_) => "minimum",
            Self::Negotiate(_) => "negotiate",
            Self::Suggest(_) => "suggest",
            Self::Finalize(_) => "finalize",
            Self::Extract(_) => "extract",
            Self::Intercept(_) => "intercept",
            Self::Tool(_) => "tool",
        }
    }
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let command_name = cli.command.name();

    let config = match commands::load_config(command_name, cli.config.as_deref()) {
        Ok(config) => config,
        Err(failure) => {
            logging::init(&AppConfig::default().logging);
            println!("{}", failure.output);
            return ExitCode::from(failure.exit_code);
        }
    };
    logging::init(&config.logging);

    let result = match &cli.command {
        Command::Config => commands::config::run(&config, cli.config.as_deref()),
        Command::Minimum(args) => commands::minimum::run(&config, args),
        Command::Negotiate(args) => commands::negotiate::run(&config, args),
        Command::Suggest(args) => commands::suggest::run(&config, args),
        Command::Finalize(args) => commands::finalize::run(&config, args),
        Command::Extract(args) => commands::extract::run(&config, args),
        Command::Intercept(args) => commands::intercept::run(&config, args),
        Command::Tool(args) => commands::tool::run(&config, args),
    };

    info!(
        event_name = "cli.command_completed",
        command = command_name,
        exit_code = result.exit_code,
        "command finished"
    );
    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
