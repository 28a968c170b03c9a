//! Detect command - show what tally makes of a statement file

use std::path::Path;

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;

use super::{get_context, SourceFile};
use crate::output;
use tally_core::mapping::{detect_columns, DetectedColumns};
use tally_core::SourceFormat;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Detection {
    format: SourceFormat,
    headers: Vec<String>,
    bank: Option<String>,
    columns: DetectedColumns,
    usable: bool,
}

pub fn run(file: &Path, format: Option<&str>, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let source = SourceFile::read(file, format)?;

    let columns = detect_columns(&source.headers);
    let detection = Detection {
        format: source.format,
        bank: ctx.catalog.infer_from_headers(&source.headers).map(|e| e.key.clone()),
        usable: columns.is_usable(),
        headers: source.headers,
        columns,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&detection)?);
        return Ok(());
    }

    println!("\n{}", "Statement file".bold());
    println!("  Format: {}", detection.format);
    if detection.format != SourceFormat::Csv {
        println!("  Fields are read from the {} records directly", detection.format);
        return Ok(());
    }
    println!("  Headers: {}", detection.headers.join(", "));
    match &detection.bank {
        Some(key) => output::success(&format!("  Matches bank '{}'", key)),
        None => println!("  {}", "No catalog bank matches these headers".dimmed()),
    }

    let mut table = output::create_table();
    table.set_header(vec!["Field", "Column"]);
    let rows = [
        ("date", &detection.columns.date),
        ("amount", &detection.columns.amount),
        ("description", &detection.columns.description),
        ("debit", &detection.columns.debit),
        ("credit", &detection.columns.credit),
        ("direction", &detection.columns.direction),
        ("category", &detection.columns.category),
        ("balance", &detection.columns.balance),
    ];
    for (field, column) in rows {
        table.add_row(vec![field, column.as_deref().unwrap_or("-")]);
    }
    println!("{}", table);

    if !detection.usable {
        output::warning("No date or amount column found; pass --date-column/--amount-column to import");
    }
    Ok(())
}
