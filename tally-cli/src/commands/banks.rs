//! Banks command - browse the bank catalog

use anyhow::Result;

use super::get_context;
use crate::output;
use tally_core::mapping::InstitutionKind;

pub fn run(region: Option<&str>, kind: Option<&str>, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let kind = kind.map(|k| k.parse::<InstitutionKind>()).transpose()?;
    let entries = ctx.catalog.filter(region, kind);

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No banks match");
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["Key", "Name", "Region", "Kind", "Format"]);
    for entry in &entries {
        table.add_row(vec![
            entry.key.clone(),
            entry.name.clone(),
            entry.region.clone(),
            entry.kind.to_string(),
            entry.profile.source_format.to_string(),
        ]);
    }
    println!("{}", table);
    println!("{} banks. Use one with `tally import --bank <KEY>`", entries.len());
    Ok(())
}
