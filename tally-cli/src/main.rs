//! Tally CLI - bank statement import and reconciliation

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod output;

use commands::{accounts, banks, detect, import, profiles, reconcile};

/// Tally - import bank statements and reconcile your ledger
#[derive(Parser)]
#[command(name = "tally", version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import transactions from a CSV, OFX/QFX or QIF statement
    Import(import::ImportArgs),

    /// Show the detected format and columns of a statement file
    Detect {
        /// Path to the statement file
        file: PathBuf,
        /// Source format, detected from the file when omitted
        #[arg(long)]
        format: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage saved import profiles
    Profiles {
        #[command(subcommand)]
        command: profiles::ProfileCommands,
    },

    /// List banks in the catalog
    Banks {
        /// Filter by region, e.g. US or UK
        #[arg(long)]
        region: Option<String>,
        /// Filter by institution kind (traditional, digital, investment, crypto, payment, business)
        #[arg(long)]
        kind: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Reconcile an account against a statement balance
    Reconcile(reconcile::ReconcileArgs),

    /// Manage ledger accounts
    Accounts {
        #[command(subcommand)]
        command: accounts::AccountCommands,
    },
}

impl Commands {
    fn wants_json(&self) -> bool {
        match self {
            Self::Import(args) => args.json,
            Self::Detect { json, .. } | Self::Banks { json, .. } => *json,
            Self::Profiles { command } => command.wants_json(),
            Self::Reconcile(args) => args.json,
            Self::Accounts { command } => command.wants_json(),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    tally_core::logging::init_tracing(cli.verbose);

    let json = cli.command.wants_json();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if json {
                commands::print_json_error(&e);
            } else {
                eprintln!("{:#}", e);
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Import(args) => import::run(args),
        Commands::Detect { file, format, json } => detect::run(&file, format.as_deref(), json),
        Commands::Profiles { command } => profiles::run(command),
        Commands::Banks { region, kind, json } => banks::run(region.as_deref(), kind.as_deref(), json),
        Commands::Reconcile(args) => reconcile::run(args),
        Commands::Accounts { command } => accounts::run(command),
    }
}
