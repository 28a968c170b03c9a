//! OFX/QFX backend
//!
//! Scans tags with a regex instead of building a tree, so SGML (unclosed
//! leaf tags) and XML flavours both parse and surrounding noise is ignored.

use std::str::FromStr;

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;

use super::{ParsedStatement, RawRecord, StatementMetadata};
use crate::domain::result::{ParseError, Result};
use crate::domain::SourceFormat;

static TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<(/?)([A-Za-z0-9.]+)>([^<]*)").unwrap());

/// Field names every OFX record is emitted with
pub(super) const FIELD_NAMES: [&str; 8] = [
    "type", "date", "amount", "name", "memo", "payee", "fitid", "checknum",
];

/// One `STMTTRN` block while it is being read
#[derive(Debug, Default)]
struct OfxTransaction {
    line: usize,
    trn_type: Option<String>,
    posted: Option<String>,
    amount: Option<String>,
    name: Option<String>,
    memo: Option<String>,
    payee: Option<String>,
    fit_id: Option<String>,
    check_number: Option<String>,
}

impl OfxTransaction {
    fn into_raw_record(self, row: usize) -> RawRecord {
        let mut record = RawRecord::new(row, Some(self.line));
        let values = [
            self.trn_type,
            self.posted.map(|d| ofx_date_to_iso(&d)),
            self.amount,
            self.name,
            self.memo,
            self.payee,
            self.fit_id,
            self.check_number,
        ];
        for (name, value) in FIELD_NAMES.into_iter().zip(values) {
            record.push(Some(name), value.unwrap_or_default());
        }
        record
    }
}

pub(super) fn parse(text: &str) -> Result<ParsedStatement> {
    if text.trim().is_empty() {
        return Err(ParseError::new(SourceFormat::Ofx, "file is empty").into());
    }

    let mut metadata = StatementMetadata::default();
    let mut records = Vec::new();
    let mut current: Option<OfxTransaction> = None;
    let mut saw_ofx = false;
    let mut in_ledger_balance = false;

    let mut line = 1;
    let mut scanned = 0;

    for caps in TAG_RE.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        line += text[scanned..whole.start()].matches('\n').count();
        scanned = whole.start();

        let closing = &caps[1] == "/";
        let tag = caps[2].to_ascii_uppercase();
        let value = decode_entities(caps[3].trim());

        match (closing, tag.as_str()) {
            (false, "OFX") => saw_ofx = true,
            (false, "STMTTRN") => {
                if let Some(open) = current.take() {
                    return Err(ParseError::at_line(
                        SourceFormat::Ofx,
                        open.line,
                        "STMTTRN block opened inside another",
                    )
                    .into());
                }
                current = Some(OfxTransaction {
                    line,
                    ..OfxTransaction::default()
                });
            }
            (true, "STMTTRN") => match current.take() {
                Some(tx) => records.push(tx.into_raw_record(records.len() + 1)),
                None => {
                    return Err(ParseError::at_line(
                        SourceFormat::Ofx,
                        line,
                        "closing STMTTRN without an opening tag",
                    )
                    .into())
                }
            },
            (false, "LEDGERBAL") => in_ledger_balance = true,
            (true, "LEDGERBAL") => in_ledger_balance = false,
            (false, leaf) if !value.is_empty() => {
                if let Some(tx) = current.as_mut() {
                    let slot = match leaf {
                        "TRNTYPE" => &mut tx.trn_type,
                        "DTPOSTED" => &mut tx.posted,
                        "TRNAMT" => &mut tx.amount,
                        "NAME" => &mut tx.name,
                        "MEMO" => &mut tx.memo,
                        "PAYEE" => &mut tx.payee,
                        "FITID" => &mut tx.fit_id,
                        "CHECKNUM" => &mut tx.check_number,
                        _ => continue,
                    };
                    *slot = Some(value);
                } else {
                    match leaf {
                        "ACCTID" => metadata.account_id = Some(value),
                        "CURDEF" => metadata.currency = Some(value.to_ascii_uppercase()),
                        "BALAMT" if in_ledger_balance => {
                            metadata.ledger_balance = Decimal::from_str(&value).ok();
                        }
                        "DTASOF" if in_ledger_balance => {
                            metadata.balance_date =
                                NaiveDate::parse_from_str(&ofx_date_to_iso(&value), "%Y-%m-%d").ok();
                        }
                        "ACCTTYPE" => metadata.account_type = Some(value),
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }

    if let Some(open) = current {
        return Err(ParseError::at_line(
            SourceFormat::Ofx,
            open.line,
            "STMTTRN block is never closed",
        )
        .into());
    }
    if !saw_ofx && records.is_empty() {
        return Err(ParseError::new(SourceFormat::Ofx, "no OFX content found").into());
    }
    if records.is_empty() {
        return Err(ParseError::new(SourceFormat::Ofx, "no STMTTRN transaction blocks found").into());
    }

    Ok(ParsedStatement {
        format: SourceFormat::Ofx,
        headers: FIELD_NAMES.iter().map(|s| s.to_string()).collect(),
        records,
        metadata,
    })
}

/// `20240115120000.000[-5:EST]` -> `2024-01-15`; anything shorter passes through
fn ofx_date_to_iso(value: &str) -> String {
    let digits: String = value.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.len() >= 8 {
        format!("{}-{}-{}", &digits[0..4], &digits[4..6], &digits[6..8])
    } else {
        value.to_string()
    }
}

fn decode_entities(value: &str) -> String {
    if !value.contains('&') {
        return value.to_string();
    }
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::result::Error;

    const SAMPLE: &str = r#"OFXHEADER:100
DATA:OFXSGML
VERSION:102

<OFX>
<BANKMSGSRSV1>
<STMTTRNRS>
<STMTRS>
<CURDEF>usd
<BANKACCTFROM>
<BANKID>123456789
<ACCTID>987654321
<ACCTTYPE>CHECKING
</BANKACCTFROM>
<BANKTRANLIST>
<DTSTART>20240101
<DTEND>20240131
<STMTTRN>
<TRNTYPE>CREDIT
<DTPOSTED>20240115120000.000[-5:EST]
<TRNAMT>2500.00
<FITID>2024011501
<NAME>ACME PAYROLL
<MEMO>Salary January
</STMTTRN>
<STMTTRN>
<TRNTYPE>DEBIT
<DTPOSTED>20240116
<TRNAMT>-150.00
<FITID>2024011601
<NAME>AT&amp;T WIRELESS
</STMTTRN>
</BANKTRANLIST>
<LEDGERBAL>
<BALAMT>2350.00
<DTASOF>20240131
</LEDGERBAL>
</STMTRS>
</STMTTRNRS>
</BANKMSGSRSV1>
</OFX>
"#;

    #[test]
    fn test_parse_sgml_statement() {
        let parsed = parse(SAMPLE).unwrap();
        assert_eq!(parsed.records.len(), 2);

        let first = &parsed.records[0];
        assert_eq!(first.get("type"), Some("CREDIT"));
        assert_eq!(first.get("date"), Some("2024-01-15"));
        assert_eq!(first.get("amount"), Some("2500.00"));
        assert_eq!(first.get("name"), Some("ACME PAYROLL"));
        assert_eq!(first.get("memo"), Some("Salary January"));
        assert_eq!(first.line, Some(18));

        let second = &parsed.records[1];
        assert_eq!(second.get("amount"), Some("-150.00"));
        assert_eq!(second.get("name"), Some("AT&T WIRELESS"));
        assert_eq!(second.get("memo"), Some(""));
    }

    #[test]
    fn test_statement_metadata() {
        let parsed = parse(SAMPLE).unwrap();
        let meta = parsed.metadata;
        assert_eq!(meta.account_id.as_deref(), Some("987654321"));
        assert_eq!(meta.currency.as_deref(), Some("USD"));
        assert_eq!(meta.ledger_balance, Some(Decimal::new(235000, 2)));
        assert_eq!(meta.balance_date, NaiveDate::from_ymd_opt(2024, 1, 31));
        assert_eq!(meta.account_type.as_deref(), Some("CHECKING"));
    }

    #[test]
    fn test_parse_xml_single_line() {
        let text = "<OFX><STMTTRN><TRNTYPE>XFER</TRNTYPE><DTPOSTED>20240201</DTPOSTED><TRNAMT>-20.00</TRNAMT><NAME>To savings</NAME></STMTTRN></OFX>";
        let parsed = parse(text).unwrap();
        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.records[0].get("type"), Some("XFER"));
        assert_eq!(parsed.records[0].get("date"), Some("2024-02-01"));
    }

    #[test]
    fn test_unclosed_block_is_parse_error() {
        let text = "<OFX>\n<STMTTRN>\n<TRNAMT>1.00\n";
        match parse(text) {
            Err(Error::Parse(e)) => {
                assert_eq!(e.format, SourceFormat::Ofx);
                assert_eq!(e.line, Some(2));
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_or_foreign_content_is_parse_error() {
        assert!(matches!(parse(""), Err(Error::Parse(_))));
        assert!(matches!(parse("Date,Amount\n"), Err(Error::Parse(_))));
        assert!(matches!(parse("<OFX></OFX>"), Err(Error::Parse(_))));
    }
}
