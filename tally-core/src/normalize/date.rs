//! Date normalizer
//!
//! Parses bank date strings into a calendar date. Never fails: a value
//! nothing recognizes falls back to the configured "today" and the caller
//! is told so through `NormalizedDate::fell_back`.

use chrono::{Local, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::{DayMonthOrder, ImportProfile};

static ISO_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})-(\d{1,2})-(\d{1,2})(?:[T ].*)?$").unwrap());
static SLASH_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{4})$").unwrap());
static DASH_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{1,2})-(\d{1,2})-(\d{4})$").unwrap());
static DOT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{1,2})\.(\d{1,2})\.(\d{4})$").unwrap());
static YMD_SLASH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})/(\d{1,2})/(\d{1,2})$").unwrap());
static DAY_MONTH_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})[ -]([A-Za-z]{3,9})\.?[ -](\d{4})$").unwrap());
static MONTH_NAME_DAY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z]{3,9})\.? (\d{1,2}),? (\d{4})$").unwrap());
static COMPACT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{4})(\d{2})(\d{2})$").unwrap());

/// Outcome of normalizing one date value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizedDate {
    pub date: NaiveDate,
    /// True when nothing matched and the fallback date was substituted
    pub fell_back: bool,
}

/// Parses dates according to one profile's conventions
#[derive(Debug, Clone)]
pub struct DateNormalizer {
    order: DayMonthOrder,
    hint: Option<String>,
    today: NaiveDate,
}

impl DateNormalizer {
    pub fn new(order: DayMonthOrder) -> Self {
        Self {
            order,
            hint: None,
            today: Local::now().date_naive(),
        }
    }

    /// Normalizer configured from a profile's hint and ordering
    pub fn for_profile(profile: &ImportProfile, default_order: DayMonthOrder) -> Self {
        Self::new(profile.effective_date_order(default_order))
            .with_hint(profile.date_format_hint.as_deref())
    }

    pub fn with_hint(mut self, hint: Option<&str>) -> Self {
        self.hint = hint.map(str::trim).filter(|h| !h.is_empty()).map(str::to_string);
        self
    }

    /// Override the fallback date
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn order(&self) -> DayMonthOrder {
        self.order
    }

    /// Parse a date, falling back to today when nothing matches
    pub fn parse(&self, value: &str) -> NormalizedDate {
        match self.try_parse(value) {
            Some(date) => NormalizedDate { date, fell_back: false },
            None => {
                tracing::warn!(value, fallback = %self.today, "unparseable date, using fallback");
                NormalizedDate {
                    date: self.today,
                    fell_back: true,
                }
            }
        }
    }

    /// Parse a date without the fallback
    ///
    /// Order: ISO, then the known regional formats, then the format hint.
    pub fn try_parse(&self, value: &str) -> Option<NaiveDate> {
        let value = value.trim().trim_matches('"').trim();
        if value.is_empty() {
            return None;
        }

        if let Some(caps) = ISO_RE.captures(value) {
            if let Some(date) = ymd(&caps[1], &caps[2], &caps[3]) {
                return Some(date);
            }
        }

        self.try_known_formats(value)
            .or_else(|| self.hint.as_deref().and_then(|hint| parse_with_hint(value, hint)))
    }

    fn try_known_formats(&self, value: &str) -> Option<NaiveDate> {
        // DD/MM/YYYY and MM/DD/YYYY share one shape; the profile decides
        for re in [&*SLASH_RE, &*DASH_RE] {
            if let Some(caps) = re.captures(value) {
                let parsed = match self.order {
                    DayMonthOrder::DayFirst => ymd(&caps[3], &caps[2], &caps[1]),
                    DayMonthOrder::MonthFirst => ymd(&caps[3], &caps[1], &caps[2]),
                };
                if parsed.is_some() {
                    return parsed;
                }
            }
        }

        if let Some(caps) = DOT_RE.captures(value) {
            if let Some(date) = ymd(&caps[3], &caps[2], &caps[1]) {
                return Some(date);
            }
        }

        if let Some(caps) = YMD_SLASH_RE.captures(value) {
            if let Some(date) = ymd(&caps[1], &caps[2], &caps[3]) {
                return Some(date);
            }
        }

        if let Some(caps) = DAY_MONTH_NAME_RE.captures(value) {
            if let Some(month) = month_from_name(&caps[2]) {
                if let Some(date) = ymd_parts(&caps[3], month, &caps[1]) {
                    return Some(date);
                }
            }
        }

        if let Some(caps) = MONTH_NAME_DAY_RE.captures(value) {
            if let Some(month) = month_from_name(&caps[1]) {
                if let Some(date) = ymd_parts(&caps[3], month, &caps[2]) {
                    return Some(date);
                }
            }
        }

        if let Some(caps) = COMPACT_RE.captures(value) {
            return ymd(&caps[1], &caps[2], &caps[3]);
        }

        None
    }
}

impl Default for DateNormalizer {
    fn default() -> Self {
        Self::new(DayMonthOrder::default())
    }
}

fn ymd(year: &str, month: &str, day: &str) -> Option<NaiveDate> {
    let month: u32 = month.parse().ok()?;
    ymd_parts(year, month, day)
}

fn ymd_parts(year: &str, month: u32, day: &str) -> Option<NaiveDate> {
    let year: i32 = year.parse().ok()?;
    let day: u32 = day.parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// English month name or three-letter abbreviation
fn month_from_name(name: &str) -> Option<u32> {
    const MONTHS: [&str; 12] = [
        "january", "february", "march", "april", "may", "june",
        "july", "august", "september", "october", "november", "december",
    ];
    let lower = name.to_lowercase();
    if let Some(i) = MONTHS.iter().position(|m| *m == lower) {
        return Some(i as u32 + 1);
    }
    let abbrev = match lower.as_str() {
        "sept" => "sep",
        s if s.len() == 3 => s,
        _ => return None,
    };
    MONTHS
        .iter()
        .position(|m| m.starts_with(abbrev))
        .map(|i| i as u32 + 1)
}

/// Interpret a value positionally against a user format such as `DD/MM/YY`
///
/// Two-digit years are expanded by prefixing `20`.
fn parse_with_hint(value: &str, hint: &str) -> Option<NaiveDate> {
    let hint_tokens = tokenize(hint);
    let (hint_tokens, value_tokens) = if hint_tokens.len() == 1 {
        // No separators: split the value by the widths of the letter runs
        let runs = letter_runs(&hint_tokens[0]);
        let mut offset = 0;
        let mut parts = Vec::with_capacity(runs.len());
        for run in &runs {
            let part = value.get(offset..offset + run.len())?;
            parts.push(part.to_string());
            offset += run.len();
        }
        if offset != value.len() {
            return None;
        }
        (runs, parts)
    } else {
        (hint_tokens, tokenize(value))
    };

    if hint_tokens.len() != value_tokens.len() {
        return None;
    }

    let (mut year, mut month, mut day) = (None, None, None);
    for (token, part) in hint_tokens.iter().zip(&value_tokens) {
        match token.chars().next()?.to_ascii_uppercase() {
            'D' => day = part.parse::<u32>().ok(),
            'M' => {
                month = if part.chars().all(|c| c.is_ascii_digit()) {
                    part.parse::<u32>().ok()
                } else {
                    month_from_name(part)
                }
            }
            'Y' => {
                year = match part.len() {
                    2 => format!("20{}", part).parse::<i32>().ok(),
                    _ => part.parse::<i32>().ok(),
                }
            }
            _ => return None,
        }
    }

    NaiveDate::from_ymd_opt(year?, month?, day?)
}

fn tokenize(s: &str) -> Vec<String> {
    s.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn letter_runs(token: &str) -> Vec<String> {
    let mut runs: Vec<String> = Vec::new();
    for c in token.chars() {
        let extends = runs
            .last()
            .and_then(|run| run.chars().next())
            .map_or(false, |first| first.eq_ignore_ascii_case(&c));
        if extends {
            if let Some(run) = runs.last_mut() {
                run.push(c);
            }
        } else {
            runs.push(c.to_string());
        }
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn day_first() -> DateNormalizer {
        DateNormalizer::new(DayMonthOrder::DayFirst).with_today(date(2030, 6, 1))
    }

    #[test]
    fn test_all_formats_agree_on_same_day() {
        let n = day_first();
        let expected = date(2024, 1, 15);
        for value in [
            "2024-01-15",
            "15/01/2024",
            "15-01-2024",
            "15.01.2024",
            "2024/01/15",
            "15 Jan 2024",
            "15-JAN-2024",
            "Jan 15, 2024",
            "January 15 2024",
            "20240115",
            "2024-01-15T08:30:00",
        ] {
            let parsed = n.parse(value);
            assert_eq!(parsed.date, expected, "value {}", value);
            assert!(!parsed.fell_back, "value {}", value);
        }

        let us = DateNormalizer::new(DayMonthOrder::MonthFirst);
        assert_eq!(us.try_parse("01/15/2024"), Some(expected));
    }

    #[test]
    fn test_ambiguous_order_follows_profile() {
        let dmy = DateNormalizer::new(DayMonthOrder::DayFirst);
        let mdy = DateNormalizer::new(DayMonthOrder::MonthFirst);
        assert_eq!(dmy.try_parse("03/04/2024"), Some(date(2024, 4, 3)));
        assert_eq!(mdy.try_parse("03/04/2024"), Some(date(2024, 3, 4)));
    }

    #[test]
    fn test_impossible_date_is_not_swapped() {
        // 01/15/2024 is not a valid day-first date; it must not be guessed
        let n = day_first();
        assert_eq!(n.try_parse("01/15/2024"), None);
        let parsed = n.parse("01/15/2024");
        assert!(parsed.fell_back);
        assert_eq!(parsed.date, date(2030, 6, 1));
    }

    #[test]
    fn test_hint_with_two_digit_year() {
        let n = day_first().with_hint(Some("DD/MM/YY"));
        assert_eq!(n.try_parse("15/01/24"), Some(date(2024, 1, 15)));

        let n = day_first().with_hint(Some("YY.MM.DD"));
        assert_eq!(n.try_parse("24.01.15"), Some(date(2024, 1, 15)));

        let n = day_first().with_hint(Some("DDMMYYYY"));
        assert_eq!(n.try_parse("15012024"), Some(date(2024, 1, 15)));
    }

    #[test]
    fn test_fallback_on_garbage() {
        let n = day_first();
        for value in ["", "not a date", "2024-13-45", "32/01/2024"] {
            let parsed = n.parse(value);
            assert!(parsed.fell_back, "value {:?}", value);
            assert_eq!(parsed.date, date(2030, 6, 1));
        }
    }

    #[test]
    fn test_month_names() {
        assert_eq!(month_from_name("Sep"), Some(9));
        assert_eq!(month_from_name("sept"), Some(9));
        assert_eq!(month_from_name("DECEMBER"), Some(12));
        assert_eq!(month_from_name("Foo"), None);
        assert_eq!(month_from_name("Ma"), None);
    }
}
