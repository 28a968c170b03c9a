//! CSV backend
//!
//! Tokenizing is left to the `csv` crate; this module adds delimiter
//! sniffing, preamble skipping and the structural checks the crate is
//! lenient about (unterminated quotes, files with no columns).

use ::csv::ReaderBuilder;

use super::{ParsedStatement, RawRecord, StatementMetadata};
use crate::domain::result::{ParseError, Result};
use crate::domain::{ImportProfile, SourceFormat};

const CANDIDATE_DELIMITERS: [char; 4] = [',', ';', '\t', '|'];

/// Layout options a profile supplies for CSV files
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvOptions {
    /// `None` sniffs the delimiter from the header line
    pub delimiter: Option<char>,
    pub has_header: bool,
    /// Preamble lines before the header
    pub skip_rows: usize,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: None,
            has_header: true,
            skip_rows: 0,
        }
    }
}

impl CsvOptions {
    pub fn from_profile(profile: &ImportProfile) -> Self {
        Self {
            delimiter: profile.delimiter,
            has_header: profile.has_header,
            skip_rows: profile.skip_rows,
        }
    }
}

pub(super) fn parse(text: &str, options: &CsvOptions) -> Result<ParsedStatement> {
    let body = skip_lines(text, options.skip_rows);
    if body.trim().is_empty() {
        return Err(ParseError::new(SourceFormat::Csv, "file is empty").into());
    }

    let delimiter = options.delimiter.unwrap_or_else(|| sniff_delimiter(body));
    let delimiter_byte = u8::try_from(delimiter)
        .ok()
        .filter(u8::is_ascii)
        .ok_or_else(|| {
            ParseError::new(
                SourceFormat::Csv,
                format!("delimiter '{}' is not an ASCII character", delimiter),
            )
        })?;

    if let Some(line) = find_unterminated_quote(body, delimiter) {
        return Err(ParseError::at_line(
            SourceFormat::Csv,
            line + options.skip_rows,
            "unterminated quoted field",
        )
        .into());
    }

    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter_byte)
        .has_headers(false)
        .flexible(true)
        .from_reader(body.as_bytes());

    let mut headers: Option<Vec<String>> = None;
    let mut records = Vec::new();

    for result in reader.records() {
        let record = result.map_err(|e| {
            let message = e.to_string();
            match e.position() {
                Some(pos) => ParseError::at_line(
                    SourceFormat::Csv,
                    physical_line(body, pos.byte()) + options.skip_rows,
                    message,
                ),
                None => ParseError::new(SourceFormat::Csv, message),
            }
        })?;

        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        let line = record
            .position()
            .map(|pos| physical_line(body, pos.byte()) + options.skip_rows);

        if options.has_header && headers.is_none() {
            headers = Some(
                record
                    .iter()
                    .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
                    .collect(),
            );
            continue;
        }

        let mut raw = RawRecord::new(records.len() + 1, line);
        for (index, value) in record.iter().enumerate() {
            let name = headers
                .as_ref()
                .and_then(|h| h.get(index))
                .map(String::as_str)
                .filter(|n| !n.is_empty());
            raw.push(name, value.trim());
        }
        records.push(raw);
    }

    if headers.is_none() && records.is_empty() {
        return Err(ParseError::new(SourceFormat::Csv, "file has no columns").into());
    }

    Ok(ParsedStatement {
        format: SourceFormat::Csv,
        headers: headers.unwrap_or_default(),
        records,
        metadata: StatementMetadata::default(),
    })
}

pub(super) fn read_headers(text: &str, options: &CsvOptions) -> Result<Vec<String>> {
    if !options.has_header {
        return Ok(Vec::new());
    }
    // Only the header line matters; cut the text after the first non-blank line
    let body = skip_lines(text, options.skip_rows);
    let first = body
        .lines()
        .find(|line| !line.trim().is_empty())
        .unwrap_or_default();
    let options = CsvOptions {
        skip_rows: 0,
        ..*options
    };
    parse(first, &options).map(|parsed| parsed.headers)
}

/// Most frequent candidate delimiter outside quotes on the first non-blank line
pub fn sniff_delimiter(text: &str) -> char {
    let header = text
        .lines()
        .find(|line| !line.trim().is_empty())
        .unwrap_or_default();

    let mut counts = [0usize; CANDIDATE_DELIMITERS.len()];
    let mut in_quotes = false;
    for c in header.chars() {
        if c == '"' {
            in_quotes = !in_quotes;
        } else if !in_quotes {
            if let Some(i) = CANDIDATE_DELIMITERS.iter().position(|d| *d == c) {
                counts[i] += 1;
            }
        }
    }

    let mut best = 0;
    for i in 1..counts.len() {
        if counts[i] > counts[best] {
            best = i;
        }
    }
    CANDIDATE_DELIMITERS[best]
}

fn skip_lines(text: &str, count: usize) -> &str {
    if count == 0 {
        return text;
    }
    match text.match_indices('\n').nth(count - 1) {
        Some((pos, _)) => &text[pos + 1..],
        None => "",
    }
}

/// 1-based line of the record starting at `byte`
///
/// The reader reports a record's start where the previous one ended, so
/// blank lines in between are stepped over first.
fn physical_line(body: &str, byte: u64) -> usize {
    let bytes = body.as_bytes();
    let mut start = usize::try_from(byte).unwrap_or(usize::MAX).min(bytes.len());
    while start < bytes.len() && matches!(bytes[start], b'\n' | b'\r') {
        start += 1;
    }
    bytes[..start].iter().filter(|&&b| b == b'\n').count() + 1
}

/// Line on which a quoted field opens without ever closing
fn find_unterminated_quote(body: &str, delimiter: char) -> Option<usize> {
    let mut line = 1;
    let mut open_line = 0;
    let mut in_quotes = false;
    let mut at_field_start = true;
    let mut chars = body.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                }
                '"' => in_quotes = false,
                '\n' => line += 1,
                _ => {}
            }
            continue;
        }
        match c {
            '"' if at_field_start => {
                in_quotes = true;
                open_line = line;
                at_field_start = false;
            }
            '\n' => {
                line += 1;
                at_field_start = true;
            }
            '\r' => {}
            c if c == delimiter => at_field_start = true,
            _ => at_field_start = false,
        }
    }

    in_quotes.then_some(open_line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::result::Error;

    fn parse_default(text: &str) -> Result<ParsedStatement> {
        parse(text, &CsvOptions::default())
    }

    #[test]
    fn test_header_and_rows() {
        let parsed = parse_default("Date,Description,Amount\n2024-01-15,Coffee,-4.50\n2024-01-16,Salary,2500.00\n").unwrap();
        assert_eq!(parsed.headers, vec!["Date", "Description", "Amount"]);
        assert_eq!(parsed.records.len(), 2);

        let first = &parsed.records[0];
        assert_eq!(first.row, 1);
        assert_eq!(first.line, Some(2));
        assert_eq!(first.get("description"), Some("Coffee"));
        assert_eq!(first.get("Amount"), Some("-4.50"));
    }

    #[test]
    fn test_quoted_fields() {
        let text = "Date,Description,Amount\n2024-01-15,\"Smith, \"\"Jr\"\" Store\",\"1,234.56\"\n";
        let parsed = parse_default(text).unwrap();
        let record = &parsed.records[0];
        assert_eq!(record.get("Description"), Some("Smith, \"Jr\" Store"));
        assert_eq!(record.get("Amount"), Some("1,234.56"));
    }

    #[test]
    fn test_semicolon_sniffed() {
        let text = "Data;Descrição;Valor\n15/01/2024;Padaria;-12,50\n";
        assert_eq!(sniff_delimiter(text), ';');
        let parsed = parse_default(text).unwrap();
        assert_eq!(parsed.records[0].get("Valor"), Some("-12,50"));
    }

    #[test]
    fn test_sniff_ignores_quoted_delimiters() {
        assert_eq!(sniff_delimiter("\"a;b;c\",d,e\n"), ',');
        assert_eq!(sniff_delimiter("date\tamount\tmemo"), '\t');
        assert_eq!(sniff_delimiter("single"), ',');
    }

    #[test]
    fn test_empty_file_is_parse_error() {
        for text in ["", "   \n\n"] {
            match parse_default(text) {
                Err(Error::Parse(e)) => assert_eq!(e.format, SourceFormat::Csv),
                other => panic!("expected parse error, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_no_columns_is_parse_error() {
        assert!(matches!(parse_default(",,,\n,,\n"), Err(Error::Parse(_))));
    }

    #[test]
    fn test_unterminated_quote_reports_line() {
        let text = "Date,Description,Amount\n2024-01-15,Coffee,-4.50\n2024-01-16,\"Broken,-1.00\n";
        match parse_default(text) {
            Err(Error::Parse(e)) => assert_eq!(e.line, Some(3)),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_mid_field_quote_is_literal() {
        let parsed = parse_default("Description,Amount\n12\" pipe,5.00\n").unwrap();
        assert_eq!(parsed.records[0].get("Description"), Some("12\" pipe"));
    }

    #[test]
    fn test_skip_rows_and_blank_lines() {
        let text = "Account: 1234\nExported 2024-02-01\nDate,Amount,Memo\n\n2024-01-15,10.00,A\n\n2024-01-16,20.00,B\n";
        let options = CsvOptions {
            skip_rows: 2,
            ..CsvOptions::default()
        };
        let parsed = parse(text, &options).unwrap();
        assert_eq!(parsed.headers, vec!["Date", "Amount", "Memo"]);
        assert_eq!(parsed.records.len(), 2);
        assert_eq!(parsed.records[0].line, Some(5));
        assert_eq!(parsed.records[1].row, 2);
        assert_eq!(parsed.records[1].line, Some(7));
    }

    #[test]
    fn test_line_numbers_count_blank_lines() {
        let text = "Date,Amount\r\n\r\n\r\n2024-01-15,10.00\r\n2024-01-16,20.00\r\n\r\n2024-01-17,30.00\r\n";
        let parsed = parse_default(text).unwrap();
        let lines: Vec<_> = parsed.records.iter().map(|r| r.line).collect();
        assert_eq!(lines, vec![Some(4), Some(5), Some(7)]);
    }

    #[test]
    fn test_headerless_is_positional() {
        let options = CsvOptions {
            has_header: false,
            ..CsvOptions::default()
        };
        let parsed = parse("\"01/15/2024\",\"-25.00\",\"*\",\"\",\"GROCERY\"\n", &options).unwrap();
        assert!(parsed.headers.is_empty());
        let record = &parsed.records[0];
        assert_eq!(record.get_index(0), Some("01/15/2024"));
        assert_eq!(record.get_index(4), Some("GROCERY"));
        assert_eq!(record.fields[0].name, None);
    }

    #[test]
    fn test_read_headers_only() {
        let headers = read_headers("Date;Amount\n2024-01-15;1\n", &CsvOptions::default()).unwrap();
        assert_eq!(headers, vec!["Date", "Amount"]);
    }
}
