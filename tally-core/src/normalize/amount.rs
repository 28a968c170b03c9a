//! Amount normalizer
//!
//! Parses monetary strings into a signed `Decimal`. Floating point is never
//! involved, so sums of imported amounts reconcile to the cent.

use std::str::FromStr;

use rust_decimal::Decimal;

use crate::domain::result::{Error, Result};
use crate::domain::AmountSignConvention;

const OUTFLOW_WORDS: &[&str] = &[
    "debit", "dr", "d", "withdrawal", "withdraw", "expense", "payment", "out", "outflow",
    "purchase", "charge", "fee", "srvchg", "atm", "pos", "check", "directdebit", "repeatpmt",
    "buy", "send", "saida",
];
const INFLOW_WORDS: &[&str] = &[
    "credit", "cr", "c", "deposit", "dep", "income", "in", "inflow", "refund", "directdep",
    "int", "interest", "div", "dividend", "sell", "receive", "entrada",
];

const CURRENCY_SYMBOLS: &[char] = &['$', '€', '£', '¥', '₹', '₩', '₽', '₺', '₪', '₫', '₱', '฿', '¢'];
/// Currency codes and lettered symbols, lowercase; `r` is the R of `R$`
const CURRENCY_WORDS: &[&str] = &[
    "usd", "eur", "gbp", "jpy", "chf", "cad", "aud", "nzd", "brl", "mxn", "sek", "nok", "dkk",
    "pln", "czk", "huf", "inr", "cny", "hkd", "sgd", "zar", "try", "ils", "krw", "rub", "kr",
    "zł", "zl", "fr", "rs", "r",
];

/// The amount-related fields of one mapped record, still raw
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawAmount {
    pub amount: Option<String>,
    pub debit: Option<String>,
    pub credit: Option<String>,
    pub direction: Option<String>,
}

impl RawAmount {
    pub fn single(amount: impl Into<String>) -> Self {
        Self {
            amount: Some(amount.into()),
            ..Self::default()
        }
    }
}

/// Parse one value and apply a sign convention that needs no other field
pub fn parse(value: &str, convention: AmountSignConvention) -> Result<Decimal> {
    let amount = parse_amount(value)?;
    Ok(match convention {
        AmountSignConvention::Inverted => -amount,
        _ => amount,
    })
}

/// Resolve the signed amount of a record under the profile's convention
pub fn resolve(raw: &RawAmount, convention: AmountSignConvention) -> Result<Decimal> {
    match convention {
        AmountSignConvention::DebitCredit => resolve_split(raw)
            .or_else(|| raw.amount.as_deref().filter(|a| !is_blank(a)).map(parse_amount))
            .unwrap_or_else(|| Err(Error::normalization("no debit or credit value"))),
        AmountSignConvention::DirectionColumn => {
            let value = present(&raw.amount)
                .ok_or_else(|| Error::normalization("missing amount"))?;
            let magnitude = parse_amount(value)?.abs();
            let direction = present(&raw.direction)
                .ok_or_else(|| Error::normalization("missing credit/debit indicator"))?;
            match classify_direction(direction) {
                Some(Direction::Outflow) => Ok(-magnitude),
                Some(Direction::Inflow) => Ok(magnitude),
                None => Err(Error::normalization(format!(
                    "unknown credit/debit indicator '{}'",
                    direction
                ))),
            }
        }
        AmountSignConvention::Signed | AmountSignConvention::Inverted => {
            let amount = match present(&raw.amount) {
                Some(value) => parse_amount(value)?,
                None => resolve_split(raw)
                    .unwrap_or_else(|| Err(Error::normalization("missing amount")))?,
            };
            Ok(if convention == AmountSignConvention::Inverted {
                -amount
            } else {
                amount
            })
        }
    }
}

/// Debit subtracts, credit adds; `None` when both columns are blank
fn resolve_split(raw: &RawAmount) -> Option<Result<Decimal>> {
    let debit = present(&raw.debit);
    let credit = present(&raw.credit);
    if debit.is_none() && credit.is_none() {
        return None;
    }

    let parsed = (|| -> Result<Decimal> {
        let debit = debit.map(parse_amount).transpose()?.unwrap_or(Decimal::ZERO);
        let credit = credit.map(parse_amount).transpose()?.unwrap_or(Decimal::ZERO);
        Ok(credit.abs() - debit.abs())
    })();
    Some(parsed)
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !is_blank(v))
}

fn is_blank(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty() || trimmed == "-"
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Inflow,
    Outflow,
}

fn classify_direction(value: &str) -> Option<Direction> {
    let key: String = value
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect();
    if OUTFLOW_WORDS.contains(&key.as_str()) {
        Some(Direction::Outflow)
    } else if INFLOW_WORDS.contains(&key.as_str()) {
        Some(Direction::Inflow)
    } else {
        None
    }
}

/// Parse a monetary string into a signed decimal
///
/// Handles currency symbols and codes, grouping separators (`,` `.` space
/// apostrophe), decimal commas, parenthesized negatives, leading or
/// trailing signs and `CR`/`DR` suffixes.
pub fn parse_amount(raw: &str) -> Result<Decimal> {
    let invalid = || Error::normalization(format!("cannot parse amount '{}'", raw.trim()));

    let mut s = raw.trim().trim_matches('"').trim().to_string();
    if s.is_empty() {
        return Err(Error::normalization("empty amount"));
    }

    let mut negative = false;

    if s.starts_with('(') && s.ends_with(')') {
        negative = true;
        s = s[1..s.len() - 1].trim().to_string();
    }

    let suffix_at = s.len().saturating_sub(2);
    if s.is_char_boundary(suffix_at) {
        let suffix = &s[suffix_at..];
        if suffix.eq_ignore_ascii_case("DR") {
            negative = true;
            s.truncate(suffix_at);
        } else if suffix.eq_ignore_ascii_case("CR") {
            s.truncate(suffix_at);
        }
    }
    let s = s.trim();

    let (s, trailing_minus) = match s.strip_suffix('-') {
        Some(rest) => (rest.trim_end(), true),
        None => (s.strip_suffix('+').unwrap_or(s).trim_end(), false),
    };
    negative |= trailing_minus;

    let s = strip_currency(s);

    // Grouping whitespace and apostrophes drop out; anything else that is not
    // a digit, separator or sign means this is not an amount
    let mut kept = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '0'..='9' | '.' | ',' | '-' | '+' => kept.push(c),
            '\'' | '’' => {}
            c if c.is_whitespace() => {}
            _ => return Err(invalid()),
        }
    }

    let unsigned = match kept.strip_prefix('-') {
        Some(rest) => {
            negative = true;
            rest
        }
        None => kept.strip_prefix('+').unwrap_or(&kept),
    };
    if unsigned.contains(['-', '+']) || !unsigned.chars().any(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }

    let normalized = normalize_separators(unsigned).ok_or_else(invalid)?;
    let amount = Decimal::from_str(&normalized).map_err(|_| invalid())?;

    Ok(if negative { -amount } else { amount })
}

/// Drop currency symbols and codes from both ends, keeping a leading sign
fn strip_currency(value: &str) -> String {
    let mut s = value.trim();
    let sign = match s.chars().next() {
        Some(c @ ('-' | '+')) => {
            s = s[1..].trim_start();
            Some(c)
        }
        _ => None,
    };

    loop {
        let before = s.len();
        s = s.trim_start_matches(CURRENCY_SYMBOLS).trim_start();
        let word_len: usize = s.chars().take_while(|c| c.is_alphabetic()).map(char::len_utf8).sum();
        if word_len > 0 && is_currency_word(&s[..word_len]) {
            s = s[word_len..].trim_start();
        }
        if s.len() == before {
            break;
        }
    }

    loop {
        let before = s.len();
        s = s.trim_end_matches(CURRENCY_SYMBOLS).trim_end();
        let word_len: usize = s.chars().rev().take_while(|c| c.is_alphabetic()).map(char::len_utf8).sum();
        if word_len > 0 && is_currency_word(&s[s.len() - word_len..]) {
            s = s[..s.len() - word_len].trim_end();
        }
        if s.len() == before {
            break;
        }
    }

    match sign {
        Some(sign) => format!("{}{}", sign, s),
        None => s.to_string(),
    }
}

fn is_currency_word(word: &str) -> bool {
    CURRENCY_WORDS.contains(&word.to_lowercase().as_str())
}

/// Rewrite grouping/decimal separators into a plain `1234.56` form
fn normalize_separators(s: &str) -> Option<String> {
    let last_dot = s.rfind('.');
    let last_comma = s.rfind(',');

    let decimal_sep = match (last_dot, last_comma) {
        (Some(d), Some(c)) => Some(if d > c { '.' } else { ',' }),
        (None, Some(c)) => {
            let decimals = s.len() - c - 1;
            if s.matches(',').count() == 1 && (1..=2).contains(&decimals) {
                Some(',')
            } else {
                None
            }
        }
        (Some(_), None) if s.matches('.').count() > 1 => None,
        (Some(_), None) => Some('.'),
        (None, None) => None,
    };

    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '0'..='9' => out.push(c),
            sep if Some(sep) == decimal_sep => out.push('.'),
            _ => {}
        }
    }

    // A second decimal separator survives as a second '.'
    if out.matches('.').count() > 1 || out.starts_with('.') && out.len() == 1 {
        return None;
    }
    Some(out)
}
