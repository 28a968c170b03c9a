//! Profiles command - manage saved import profiles

use anyhow::{bail, Result};
use clap::Subcommand;
use colored::Colorize;
use dialoguer::Confirm;

use super::get_context;
use crate::output;

#[derive(Subcommand)]
pub enum ProfileCommands {
    /// List saved profiles
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one profile's mapping
    Show {
        /// Profile name
        name: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a saved profile
    Delete {
        /// Profile name
        name: String,
        /// Skip confirmation prompt
        #[arg(long, short = 'f')]
        force: bool,
    },
}

impl ProfileCommands {
    pub fn wants_json(&self) -> bool {
        match self {
            Self::List { json } | Self::Show { json, .. } => *json,
            Self::Delete { .. } => false,
        }
    }
}

pub fn run(command: ProfileCommands) -> Result<()> {
    let mut ctx = get_context()?;

    match command {
        ProfileCommands::List { json } => {
            let profiles = ctx.profile_service.list_profiles()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&profiles)?);
                return Ok(());
            }
            if profiles.is_empty() {
                println!("No saved profiles. Save one with `tally import ... --save-profile <NAME>`");
                return Ok(());
            }

            let mut table = output::create_table();
            table.set_header(vec!["Name", "Format", "Sign convention", "Bank", "Updated"]);
            for profile in &profiles {
                table.add_row(vec![
                    profile.name.clone(),
                    profile.source_format.to_string(),
                    format!("{:?}", profile.amount_sign_convention),
                    profile.bank_key.clone().unwrap_or_else(|| "-".to_string()),
                    profile.updated_at.format("%Y-%m-%d").to_string(),
                ]);
            }
            println!("{}", table);
        }
        ProfileCommands::Show { name, json } => {
            let Some(profile) = ctx.profile_service.get_profile(&name)? else {
                bail!("Import profile not found: {}", name);
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&profile)?);
                return Ok(());
            }

            println!("\n{}", profile.name.bold());
            println!("  Format: {}", profile.source_format);
            println!("  Sign convention: {:?}", profile.amount_sign_convention);
            if let Some(hint) = &profile.date_format_hint {
                println!("  Date format: {}", hint);
            }
            if let Some(order) = profile.date_order {
                println!("  Date order: {:?}", order);
            }
            if !profile.default_tags.is_empty() {
                println!("  Tags: {}", profile.default_tags.join(", "));
            }

            let mut table = output::create_table();
            table.set_header(vec!["Field", "Source"]);
            for (field, selector) in &profile.field_mapping {
                table.add_row(vec![field.to_string(), selector.to_string()]);
            }
            println!("{}", table);
        }
        ProfileCommands::Delete { name, force } => {
            if ctx.profile_service.get_profile(&name)?.is_none() {
                bail!("Import profile not found: {}", name);
            }

            if !force
                && !Confirm::new()
                    .with_prompt(format!("Delete profile '{}'?", name))
                    .default(false)
                    .interact()?
            {
                println!("{}", "Cancelled".dimmed());
                return Ok(());
            }

            ctx.profile_service.delete_profile(&name)?;
            output::success(&format!("Profile '{}' deleted", name));
        }
    }

    Ok(())
}
