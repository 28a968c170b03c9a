//! QIF backend
//!
//! Records are runs of code-prefixed lines terminated by `^`.

use super::{ParsedStatement, RawRecord, StatementMetadata};
use crate::domain::result::{ParseError, Result};
use crate::domain::SourceFormat;

/// Field names every QIF record is emitted with
pub(super) const FIELD_NAMES: [&str; 8] = [
    "date", "amount", "payee", "memo", "category", "number", "cleared", "address",
];

/// One record's lines, accumulated until the `^` terminator
#[derive(Debug, Default)]
struct QifEntry {
    line: usize,
    date: Option<String>,
    total: Option<String>,
    amount_u: Option<String>,
    payee: Option<String>,
    memo: Option<String>,
    category: Option<String>,
    number: Option<String>,
    cleared: Option<String>,
    address: Vec<String>,
}

impl QifEntry {
    fn is_empty(&self) -> bool {
        self.date.is_none()
            && self.total.is_none()
            && self.amount_u.is_none()
            && self.payee.is_none()
            && self.memo.is_none()
    }

    fn apply(&mut self, code: char, value: &str) {
        let value = value.trim().to_string();
        match code {
            'D' => self.date = Some(qif_date(&value)),
            'T' => self.total = Some(value),
            'U' => self.amount_u = Some(value),
            'P' => self.payee = Some(value),
            'M' => self.memo = Some(value),
            'L' => self.category = Some(value),
            'N' => self.number = Some(value),
            'C' => self.cleared = Some(value),
            'A' => self.address.push(value),
            // Split lines (S, E, $) describe parts of the record; the total is kept
            _ => {}
        }
    }

    fn into_raw_record(self, row: usize) -> RawRecord {
        let mut record = RawRecord::new(row, Some(self.line));
        let address = (!self.address.is_empty()).then(|| self.address.join(", "));
        let values = [
            self.date,
            self.total.or(self.amount_u),
            self.payee,
            self.memo,
            self.category,
            self.number,
            self.cleared,
            address,
        ];
        for (name, value) in FIELD_NAMES.into_iter().zip(values) {
            record.push(Some(name), value.unwrap_or_default());
        }
        record
    }
}

pub(super) fn parse(text: &str) -> Result<ParsedStatement> {
    if text.trim().is_empty() {
        return Err(ParseError::new(SourceFormat::Qif, "file is empty").into());
    }

    let mut metadata = StatementMetadata::default();
    let mut records = Vec::new();
    let mut entry = QifEntry::default();
    let mut in_account_block = false;

    for (index, raw_line) in text.lines().enumerate() {
        let line_no = index + 1;
        let line = raw_line.trim_end_matches('\r').trim_start_matches('\u{feff}');
        if line.trim().is_empty() {
            continue;
        }

        if let Some(header) = line.strip_prefix('!') {
            let header = header.trim();
            if header.eq_ignore_ascii_case("Account") {
                in_account_block = true;
            } else if let Some((key, kind)) = header.split_once(':') {
                if key.eq_ignore_ascii_case("Type") {
                    metadata.account_type = Some(kind.trim().to_string());
                    in_account_block = false;
                }
            }
            continue;
        }

        if in_account_block {
            // Account blocks describe the account and end with their own '^'
            if line.starts_with('^') {
                in_account_block = false;
            }
            continue;
        }

        let mut chars = line.chars();
        let Some(code) = chars.next() else { continue };
        if code == '^' {
            let finished = std::mem::take(&mut entry);
            if !finished.is_empty() {
                records.push(finished.into_raw_record(records.len() + 1));
            }
            continue;
        }

        if entry.line == 0 {
            entry.line = line_no;
        }
        entry.apply(code, chars.as_str());
    }

    // A final record without its terminator is still a record
    if !entry.is_empty() {
        records.push(entry.into_raw_record(records.len() + 1));
    }

    if records.is_empty() {
        return Err(ParseError::new(SourceFormat::Qif, "no transaction records found").into());
    }

    Ok(ParsedStatement {
        format: SourceFormat::Qif,
        headers: FIELD_NAMES.iter().map(|s| s.to_string()).collect(),
        records,
        metadata,
    })
}

/// Rewrite QIF date quirks: `1/15'24` and `1/15/24` become `1/15/2024`
fn qif_date(value: &str) -> String {
    let cleaned: String = value
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == '\'' { '/' } else { c })
        .collect();

    let parts: Vec<&str> = cleaned.split(|c| c == '/' || c == '-' || c == '.').collect();
    if parts.len() == 3 && parts[2].len() == 2 && parts[2].chars().all(|c| c.is_ascii_digit()) {
        let separator = if cleaned.contains('/') {
            "/"
        } else if cleaned.contains('.') {
            "."
        } else {
            "-"
        };
        format!("{}{}{}{}20{}", parts[0], separator, parts[1], separator, parts[2])
    } else {
        cleaned
    }
}
