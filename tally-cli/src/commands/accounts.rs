//! Accounts command - set up accounts in the ledger

use anyhow::{Context, Result};
use clap::Subcommand;

use super::get_context;
use crate::output;
use tally_core::normalize::parse_amount;
use tally_core::Account;

#[derive(Subcommand)]
pub enum AccountCommands {
    /// Add or update an account
    Add {
        /// Account ID
        id: String,
        /// Display name
        #[arg(long)]
        name: String,
        /// Balance before the first ledger transaction
        #[arg(long, allow_hyphen_values = true, default_value = "0")]
        opening_balance: String,
        /// ISO 4217 currency code
        #[arg(long, default_value = "USD")]
        currency: String,
    },
    /// List accounts
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

impl AccountCommands {
    pub fn wants_json(&self) -> bool {
        matches!(self, Self::List { json: true })
    }
}

pub fn run(command: AccountCommands) -> Result<()> {
    let ctx = get_context()?;
    let mut ledger = ctx.open_ledger()?;

    match command {
        AccountCommands::Add { id, name, opening_balance, currency } => {
            let opening_balance = parse_amount(&opening_balance)
                .with_context(|| format!("Invalid opening balance '{}'", opening_balance))?;

            let mut account = Account::new(id.trim(), name.trim(), opening_balance);
            account.currency = Account::normalize_currency(&currency);

            ledger.upsert_account(account)?;
            ledger.save().context("Failed to save ledger")?;
            output::success(&format!("Account '{}' saved", id.trim()));
        }
        AccountCommands::List { json } => {
            let accounts = ledger.accounts();
            if json {
                println!("{}", serde_json::to_string_pretty(accounts)?);
                return Ok(());
            }
            if accounts.is_empty() {
                println!("No accounts. Add one with `tally accounts add <ID> --name <NAME>`");
                return Ok(());
            }

            let mut table = output::create_table();
            table.set_header(vec!["ID", "Name", "Currency", "Opening balance"]);
            for account in accounts {
                table.add_row(vec![
                    comfy_table::Cell::new(&account.id),
                    comfy_table::Cell::new(&account.name),
                    comfy_table::Cell::new(&account.currency),
                    output::amount_cell(account.opening_balance),
                ]);
            }
            println!("{}", table);
        }
    }

    Ok(())
}
