//! Reconcile command - compare the ledger with a statement balance

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Args;
use colored::Colorize;
use dialoguer::{Confirm, Input};
use serde::Serialize;

use super::get_context;
use crate::output;
use tally_core::ports::LedgerWriter;
use tally_core::services::{ReconciliationSession, SessionState};
use tally_core::{ReconciliationSnapshot, Transaction};

#[derive(Debug, Args)]
pub struct ReconcileArgs {
    /// Account ID to reconcile
    #[arg(long)]
    pub account_id: String,
    /// Statement closing date (YYYY-MM-DD)
    #[arg(long)]
    pub cutoff: String,
    /// Closing balance printed on the statement, asked for when omitted
    #[arg(long, allow_hyphen_values = true)]
    pub statement_balance: Option<String>,
    /// Create the adjustment without asking
    #[arg(long, visible_alias = "yes", short = 'y')]
    pub accept: bool,
    /// Category for the adjustment transaction
    #[arg(long)]
    pub category: Option<String>,
    /// Notes for the adjustment transaction
    #[arg(long)]
    pub notes: Option<String>,
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReconcileOutput<'a> {
    snapshot: &'a ReconciliationSnapshot,
    balanced: bool,
    state: SessionState,
    adjustment: Option<Transaction>,
}

fn parse_cutoff(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid cutoff date '{}'. Use YYYY-MM-DD", raw))
}

pub fn run(args: ReconcileArgs) -> Result<()> {
    let ctx = get_context()?;
    let cutoff = parse_cutoff(&args.cutoff)?;

    let statement_balance = match &args.statement_balance {
        Some(balance) => balance.clone(),
        None if args.json => anyhow::bail!("--statement-balance is required with --json"),
        None => Input::new()
            .with_prompt("Statement balance")
            .interact_text()?,
    };

    let mut ledger = ctx.open_ledger()?;
    let mut session = ReconciliationSession::new(&args.account_id);
    let snapshot = session.compute(&ledger, cutoff, &statement_balance)?.clone();

    if !args.json {
        print_snapshot(&snapshot);
    }

    let mut adjustment = None;
    if session.state() == SessionState::BalanceComputed {
        // JSON mode never prompts
        let accepted = args.accept
            || (!args.json
                && Confirm::new()
                    .with_prompt(format!(
                        "Create an adjustment of {}?",
                        output::format_amount(snapshot.difference)
                    ))
                    .default(false)
                    .interact()?);

        if accepted {
            let tx = session.accept(args.category.as_deref(), args.notes.as_deref())?;
            ledger.add_transaction(&tx)?;
            ledger.save().context("Failed to save ledger")?;
            adjustment = Some(tx);
        } else {
            session.cancel()?;
        }
    }

    if args.json {
        let out = ReconcileOutput {
            snapshot: &snapshot,
            balanced: snapshot.is_balanced(),
            state: session.state(),
            adjustment,
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    match (&adjustment, snapshot.is_balanced()) {
        (_, true) => output::success("Balanced. No adjustment needed"),
        (Some(tx), false) => output::success(&format!(
            "Adjustment created: {} {} ({})",
            tx.transaction_type,
            output::format_amount(tx.amount),
            tx.id
        )),
        (None, false) => println!("{}", "No adjustment created".dimmed()),
    }
    Ok(())
}

fn print_snapshot(snapshot: &ReconciliationSnapshot) {
    println!("\n{}", format!("Reconciliation for {}", snapshot.account_id).bold());
    println!("  As of: {}", snapshot.as_of_date);
    println!("  Transactions: {}", snapshot.transaction_count);
    println!("  System balance: {}", output::format_amount(snapshot.system_balance));
    println!("  Statement balance: {}", output::format_amount(snapshot.statement_balance));
    let difference = output::format_amount(snapshot.difference);
    if snapshot.is_balanced() {
        println!("  Difference: {}", difference.green());
    } else {
        println!("  Difference: {}", difference.red());
    }
}
