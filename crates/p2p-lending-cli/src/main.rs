mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use commands::agreements::AgreementsCommand;
use commands::lifecycle::{ApproveArgs, DisburseArgs, InvestArgs, SignArgs, SubmitArgs};
use commands::loans::LoansCommand;
use commands::state::{Context, InitArgs};
use commands::users::UsersCommand;

/// Peer-to-peer loan lifecycle
#[derive(Parser)]
#[command(
    name = "p2pl",
    version,
    about = "Peer-to-peer loan lifecycle",
    long_about = "A CLI that drives loans through proposal, approval, investment, \
                  agreement signing and disbursement with decimal-precise accounting. \
                  Platform state lives in a JSON file between invocations."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Platform state file
    #[arg(long, default_value = "lending-state.json", global = true)]
    state: String,

    /// Platform config file (JSON)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Log lifecycle events to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a state file holding the demo users
    Init(InitArgs),
    /// Query the user directory
    #[command(subcommand)]
    Users(UsersCommand),
    /// Query the loan ledger
    #[command(subcommand)]
    Loans(LoansCommand),
    /// Query or view stored agreements
    #[command(subcommand)]
    Agreements(AgreementsCommand),
    /// Submit a loan proposal for a borrower
    Submit(SubmitArgs),
    /// Approve a proposed loan after a field visit
    Approve(ApproveArgs),
    /// Invest in an approved loan
    Invest(InvestArgs),
    /// Sign an agreement on behalf of its owner
    Sign(SignArgs),
    /// Disburse a signed loan
    Disburse(DisburseArgs),
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

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "p2p_lending_core=debug,p2pl=debug"
    } else {
        "warn"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn dispatch(command: Commands, ctx: &Context) -> Result<serde_json::Value, Box<dyn std::error::Error>> {
    match command {
        Commands::Init(args) => commands::state::run_init(args, ctx),
        Commands::Users(cmd) => commands::users::run(cmd, ctx),
        Commands::Loans(cmd) => commands::loans::run(cmd, ctx),
        Commands::Agreements(cmd) => commands::agreements::run(cmd, ctx),
        Commands::Submit(args) => commands::lifecycle::run_submit(args, ctx),
        Commands::Approve(args) => commands::lifecycle::run_approve(args, ctx),
        Commands::Invest(args) => commands::lifecycle::run_invest(args, ctx),
        Commands::Sign(args) => commands::lifecycle::run_sign(args, ctx),
        Commands::Disburse(args) => commands::lifecycle::run_disburse(args, ctx),
        Commands::Version => Ok(serde_json::Value::String(version_string())),
    }
}

fn version_string() -> String {
    format!("p2pl {}", env!("CARGO_PKG_VERSION"))
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Version => {
            println!("{}", version_string());
            return;
        }
        command => Context::load(&cli.state, cli.config.as_deref())
            .and_then(|ctx| dispatch(command, &ctx)),
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
