//! Import command - import transactions from a statement file

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use colored::Colorize;

use super::{get_context, SourceFile};
use crate::output;
use tally_core::domain::{AmountSignConvention, CanonicalField, FieldSelector};
use tally_core::ports::LedgerWriter;
use tally_core::services::{ImportResult, ProfileQuery, ProfileSource, ResolvedProfile};
use tally_core::{ImportProfile, TallyContext};

const PREVIEW_ROWS: usize = 20;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SignConvention {
    /// Amounts are used as-is
    Signed,
    /// Amounts are negated (credit card statements)
    Inverted,
    /// Separate debit and credit columns
    DebitCredit,
    /// Unsigned amount plus a direction column
    DirectionColumn,
}

impl From<SignConvention> for AmountSignConvention {
    fn from(value: SignConvention) -> Self {
        match value {
            SignConvention::Signed => Self::Signed,
            SignConvention::Inverted => Self::Inverted,
            SignConvention::DebitCredit => Self::DebitCredit,
            SignConvention::DirectionColumn => Self::DirectionColumn,
        }
    }
}

#[derive(Debug, Args)]
pub struct ImportArgs {
    /// Path to the statement file (CSV, OFX/QFX or QIF)
    pub file: PathBuf,
    /// Account ID to import into
    #[arg(long)]
    pub account_id: String,
    /// Source format, detected from the file when omitted
    #[arg(long)]
    pub format: Option<String>,
    /// Use saved import profile
    #[arg(long, conflicts_with = "bank")]
    pub profile: Option<String>,
    /// Use a bank from the catalog (see `tally banks`)
    #[arg(long)]
    pub bank: Option<String>,
    /// Column name for transaction date
    #[arg(long)]
    pub date_column: Option<String>,
    /// Column name for amount (single amount column)
    #[arg(long)]
    pub amount_column: Option<String>,
    /// Column name for transaction description
    #[arg(long)]
    pub description_column: Option<String>,
    /// Column name for debit amounts
    #[arg(long)]
    pub debit_column: Option<String>,
    /// Column name for credit amounts
    #[arg(long)]
    pub credit_column: Option<String>,
    /// Column name for category
    #[arg(long)]
    pub category_column: Option<String>,
    /// Date format hint, e.g. DD/MM/YYYY
    #[arg(long)]
    pub date_format: Option<String>,
    /// How amounts carry their sign
    #[arg(long, value_enum)]
    pub sign_convention: Option<SignConvention>,
    /// Save the profile used under this name
    #[arg(long)]
    pub save_profile: Option<String>,
    /// Write the imported transactions to the ledger
    #[arg(long)]
    pub commit: bool,
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl ImportArgs {
    fn has_column_args(&self) -> bool {
        self.date_column.is_some()
            || self.amount_column.is_some()
            || self.description_column.is_some()
            || self.debit_column.is_some()
            || self.credit_column.is_some()
            || self.category_column.is_some()
    }

    /// Apply column and convention flags over a profile
    fn apply_overrides(&self, profile: &mut ImportProfile) {
        let columns = [
            (CanonicalField::Date, &self.date_column),
            (CanonicalField::Amount, &self.amount_column),
            (CanonicalField::Description, &self.description_column),
            (CanonicalField::Debit, &self.debit_column),
            (CanonicalField::Credit, &self.credit_column),
            (CanonicalField::Category, &self.category_column),
        ];
        for (field, column) in columns {
            if let Some(column) = column {
                profile.field_mapping.insert(field, FieldSelector::name(column.clone()));
            }
        }

        let split = self.debit_column.is_some() || self.credit_column.is_some();
        if split && self.amount_column.is_none() {
            profile.field_mapping.remove(&CanonicalField::Amount);
            profile.amount_sign_convention = AmountSignConvention::DebitCredit;
        }

        if let Some(hint) = &self.date_format {
            profile.date_format_hint = Some(hint.clone());
        }
        if let Some(convention) = self.sign_convention {
            profile.amount_sign_convention = convention.into();
        }
    }
}

pub fn run(args: ImportArgs) -> Result<()> {
    let mut ctx = get_context()?;
    let source = SourceFile::read(&args.file, args.format.as_deref())?;

    let resolved = resolve_profile(&ctx, &args, &source)?;
    let mut profile = resolved.profile;
    args.apply_overrides(&mut profile);

    if !args.json {
        output::info(&format!("Using {} ({})", resolved.source, source.format));
    }

    if let Some(name) = &args.save_profile {
        profile.name = name.clone();
        profile = ctx.profile_service.save_profile(profile)?;
        if !args.json {
            println!("Profile '{}' saved", profile.name);
        }
    }

    let mut ledger = ctx.open_ledger()?;
    let result = ctx
        .import_service
        .import_file(&source.bytes, &profile, &args.account_id, &ledger)
        .with_context(|| format!("Failed to import {:?}", args.file))?;

    let committed = if args.commit {
        let transactions = result.to_ledger_transactions();
        for tx in &transactions {
            ledger.add_transaction(tx)?;
        }
        ledger.save().context("Failed to save ledger")?;
        transactions.len()
    } else {
        0
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    print_result(&result);

    println!();
    if args.commit {
        output::success(&format!("Import complete: {} transactions written", committed));
    } else {
        println!("{}", "PREVIEW MODE - run again with --commit to write to the ledger".yellow());
    }
    Ok(())
}

fn resolve_profile(ctx: &TallyContext, args: &ImportArgs, source: &SourceFile) -> Result<ResolvedProfile> {
    // Explicit columns without a profile or bank start from a blank custom profile
    if args.has_column_args() && args.profile.is_none() && args.bank.is_none() {
        return Ok(ResolvedProfile {
            profile: ImportProfile::new("custom", source.format),
            source: ProfileSource::Custom,
        });
    }

    let query = ProfileQuery {
        name: args.profile.as_deref(),
        bank_key: args.bank.as_deref(),
        format: source.format,
        headers: &source.headers,
    };
    Ok(ctx.profile_service.resolve_profile(&query, &ctx.catalog)?)
}

fn print_result(result: &ImportResult) {
    let stats = &result.statistics;

    if !result.imported.is_empty() {
        let mut table = output::create_table();
        table.set_header(vec!["Row", "Date", "Amount", "Type", "Description", "Category"]);
        for c in result.imported.iter().take(PREVIEW_ROWS) {
            table.add_row(vec![
                comfy_table::Cell::new(c.source_row_ref.row),
                comfy_table::Cell::new(c.date),
                output::amount_cell(c.amount),
                comfy_table::Cell::new(c.transaction_type),
                comfy_table::Cell::new(&c.description),
                comfy_table::Cell::new(c.raw_category.as_deref().unwrap_or("-")),
            ]);
        }
        println!("{}", table);
        if result.imported.len() > PREVIEW_ROWS {
            println!("... and {} more", result.imported.len() - PREVIEW_ROWS);
        }
    }

    if !result.skipped_duplicates.is_empty() {
        println!();
        output::warning("Skipped as likely duplicates:");
        let mut table = output::create_table();
        table.set_header(vec!["Row", "Date", "Amount", "Description", "Similarity", "Matches"]);
        for skipped in &result.skipped_duplicates {
            let c = &skipped.candidate;
            let matches = match (skipped.matched.existing_transaction_id, skipped.matched.within_batch_ref) {
                (Some(id), _) => format!("ledger {}", id),
                (None, Some(row)) => format!("{} in this file", row),
                (None, None) => "-".to_string(),
            };
            table.add_row(vec![
                comfy_table::Cell::new(c.source_row_ref.row),
                comfy_table::Cell::new(c.date),
                output::amount_cell(c.amount),
                comfy_table::Cell::new(&c.description),
                comfy_table::Cell::new(output::format_similarity(skipped.matched.similarity)),
                comfy_table::Cell::new(matches),
            ]);
        }
        println!("{}", table);
    }

    if !result.failed.is_empty() {
        println!();
        println!("{}", "Failed rows:".red());
        for failed in &result.failed {
            println!("  {}: {}", failed.row_ref, failed.reason);
        }
    }

    if !result.warnings.is_empty() {
        println!();
        output::warning("Warnings:");
        for warning in &result.warnings {
            println!("  {}", warning);
        }
    }

    println!();
    println!("  Records: {}", stats.total_records);
    println!("  Imported: {}", stats.imported);
    println!("  Skipped: {}", stats.skipped_duplicates);
    println!("  Failed: {}", stats.failed);
    if let (Some(first), Some(last)) = (stats.earliest_date, stats.latest_date) {
        println!("  Dates: {} to {}", first, last);
    }
    println!(
        "  Inflow: {}  Outflow: {}  Net: {}",
        output::format_amount(stats.total_inflow),
        output::format_amount(stats.total_outflow),
        output::format_amount(stats.net)
    );
    if let Some(account) = &result.metadata.account_id {
        println!("  Statement account: {}", account);
    }
    if let Some(balance) = result.metadata.ledger_balance {
        println!("  Statement balance: {}", output::format_amount(balance));
    }
}
