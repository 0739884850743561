mod commands;
mod input;
mod logging;
mod output;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::lbo::{AbilityToPayArgs, RunArgs, SensitivityArgs};

/// Leveraged buyout returns and ability-to-pay analysis
#[derive(Parser)]
#[command(
    name = "lbo",
    version,
    about = "Leveraged buyout returns and ability-to-pay analysis",
    long_about = "Projects a simplified LBO with decimal precision: debt schedule with \
                  cash sweep and revolver, exit equity, MOIC and IRR, the maximum entry \
                  multiple for a hurdle IRR, and two-way sensitivity grids."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log to stderr (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the LBO model: debt schedule, exit equity, MOIC and IRR
    Run(RunArgs),
    /// Solve for the highest entry multiple that meets a target IRR
    AbilityToPay(AbilityToPayArgs),
    /// Two-way sensitivity grid over LBO drivers
    Sensitivity(SensitivityArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Run(args) => commands::lbo::run_lbo(args),
        Commands::AbilityToPay(args) => commands::lbo::run_ability_to_pay(args),
        Commands::Sensitivity(args) => commands::lbo::run_sensitivity(args),
        Commands::Version => {
            println!("lbo {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
