//! Transaction date extraction for receipts.

use chrono::{Local, NaiveDate, NaiveDateTime};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::patterns::{DATE_NUMERIC_LONG_YEAR, DATE_NUMERIC_SHORT_YEAR, DATE_SPANISH_MONTH, DATE_YMD};
use super::{ExtractionMatch, FieldExtractor, Selection};
use crate::error::ExtractionError;
use crate::models::receipt::ISO_DATETIME;

/// Date patterns, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatePattern {
    /// `D/M/YYYY` or `M/D/YYYY`.
    NumericLongYear,
    /// `YYYY-M-D` or `YYYY/M/D`.
    YearMonthDay,
    /// `D/M/YY` or `M/D/YY`.
    NumericShortYear,
    /// `D-MMM-YY` with a Spanish month abbreviation.
    SpanishMonth,
}

/// How the three captures of a numeric date map to calendar fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldOrder {
    DayMonthYear,
    MonthDayYear,
    YearMonthDay,
}

/// One row of the date precedence table.
pub struct DateRule {
    pub pattern: DatePattern,
    pub regex: &'static Regex,
    pub selection: Selection,
    /// Interpretations tried in order; empty for the Spanish month form.
    pub orders: &'static [FieldOrder],
    pub confidence: f32,
}

lazy_static::lazy_static! {
    /// Date precedence table. Only the selected match of the first pattern
    /// that matches at all is considered per pattern; a rejected candidate
    /// falls through to the next pattern.
    pub static ref DATE_RULES: Vec<DateRule> = vec![
        DateRule {
            pattern: DatePattern::NumericLongYear,
            regex: &DATE_NUMERIC_LONG_YEAR,
            selection: Selection::First,
            orders: &[FieldOrder::DayMonthYear, FieldOrder::MonthDayYear],
            confidence: 0.9,
        },
        DateRule {
            pattern: DatePattern::YearMonthDay,
            regex: &DATE_YMD,
            selection: Selection::First,
            orders: &[FieldOrder::YearMonthDay],
            confidence: 0.9,
        },
        DateRule {
            pattern: DatePattern::NumericShortYear,
            regex: &DATE_NUMERIC_SHORT_YEAR,
            selection: Selection::First,
            orders: &[FieldOrder::DayMonthYear, FieldOrder::MonthDayYear],
            confidence: 0.8,
        },
        DateRule {
            pattern: DatePattern::SpanishMonth,
            regex: &DATE_SPANISH_MONTH,
            selection: Selection::First,
            orders: &[],
            confidence: 0.85,
        },
    ];
}

const SPANISH_MONTHS: [(&str, u32); 12] = [
    ("ENE", 1),
    ("FEB", 2),
    ("MAR", 3),
    ("ABR", 4),
    ("MAY", 5),
    ("JUN", 6),
    ("JUL", 7),
    ("AGO", 8),
    ("SEP", 9),
    ("OCT", 10),
    ("NOV", 11),
    ("DIC", 12),
];

/// A transaction date, or the processing time when none was recoverable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptDate {
    pub value: NaiveDateTime,
    /// False when `value` is the processing-time fallback.
    pub detected: bool,
}

impl ReceiptDate {
    pub fn iso(&self) -> String {
        self.value.format(ISO_DATETIME).to_string()
    }
}

/// Date field extractor.
pub struct DateExtractor {
    earliest: NaiveDate,
    /// Fixed reference time; `None` means the local clock at extraction.
    reference: Option<NaiveDateTime>,
}

impl DateExtractor {
    pub fn new() -> Self {
        Self {
            earliest: NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or(NaiveDate::MIN),
            reference: None,
        }
    }

    /// Pin "now" instead of reading the clock.
    pub fn at(mut self, now: NaiveDateTime) -> Self {
        self.reference = Some(now);
        self
    }

    /// Set the earliest accepted date.
    pub fn with_earliest(mut self, earliest: NaiveDate) -> Self {
        self.earliest = earliest;
        self
    }

    /// Current reference time.
    pub fn now(&self) -> NaiveDateTime {
        self.reference.unwrap_or_else(|| Local::now().naive_local())
    }

    /// Extract the transaction date, falling back to "now".
    pub fn resolve(&self, text: &str) -> ReceiptDate {
        let now = self.now();
        match self.extract_at(text, now) {
            Some(found) => ReceiptDate {
                value: found.value,
                detected: true,
            },
            None => {
                debug!("No date detected, using processing time");
                ReceiptDate {
                    value: now,
                    detected: false,
                }
            }
        }
    }

    fn extract_at(&self, text: &str, now: NaiveDateTime) -> Option<ExtractionMatch<NaiveDateTime>> {
        for rule in DATE_RULES.iter() {
            let Some(caps) = rule.selection.pick(rule.regex.captures_iter(text)) else {
                trace!("Date pattern {:?} did not match", rule.pattern);
                continue;
            };

            match self.candidate(rule, &caps, now) {
                Ok(found) => {
                    debug!("Date detected: {} (pattern: {:?})", found.value, rule.pattern);
                    return Some(found);
                }
                Err(e) => debug!("Date pattern {:?} rejected: {}", rule.pattern, e),
            }
        }

        None
    }

    fn candidate(
        &self,
        rule: &DateRule,
        caps: &Captures<'_>,
        now: NaiveDateTime,
    ) -> Result<ExtractionMatch<NaiveDateTime>, ExtractionError> {
        let value = match rule.pattern {
            DatePattern::SpanishMonth => self.spanish_candidate(caps, now)?,
            _ => self.numeric_candidate(rule, caps, now)?,
        };

        // The whole match may include one guard character on each side.
        let whole = caps.get_match();
        let (start, end) = match (caps.get(1), caps.get(3)) {
            (Some(first), Some(last)) => (first.start(), last.end()),
            _ => (whole.start(), whole.end()),
        };
        let source = &whole.as_str()[start - whole.start()..end - whole.start()];

        Ok(ExtractionMatch::new(value, rule.confidence, source).with_position(start, end))
    }

    fn numeric_candidate(
        &self,
        rule: &DateRule,
        caps: &Captures<'_>,
        now: NaiveDateTime,
    ) -> Result<NaiveDateTime, ExtractionError> {
        let mut last_error = ExtractionError::parse("date", &caps[0]);

        for order in rule.orders {
            let (year, month, day) = match order {
                FieldOrder::DayMonthYear => (&caps[3], &caps[2], &caps[1]),
                FieldOrder::MonthDayYear => (&caps[3], &caps[1], &caps[2]),
                FieldOrder::YearMonthDay => (&caps[1], &caps[2], &caps[3]),
            };

            match self.checked_date(year, month, day, now) {
                Ok(date) => return Ok(date),
                Err(e) => last_error = e,
            }
        }

        Err(last_error)
    }

    fn spanish_candidate(
        &self,
        caps: &Captures<'_>,
        now: NaiveDateTime,
    ) -> Result<NaiveDateTime, ExtractionError> {
        let month = spanish_month(&caps[2])?;
        self.checked_date(&caps[3], &month.to_string(), &caps[1], now)
    }

    fn checked_date(
        &self,
        year: &str,
        month: &str,
        day: &str,
        now: NaiveDateTime,
    ) -> Result<NaiveDateTime, ExtractionError> {
        let raw = || format!("{}-{}-{}", year, month, day);

        let year = expand_year(year).ok_or_else(|| ExtractionError::parse("date", raw()))?;
        let month: u32 = month.parse().map_err(|_| ExtractionError::parse("date", raw()))?;
        let day: u32 = day.parse().map_err(|_| ExtractionError::parse("date", raw()))?;

        let date = NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .ok_or_else(|| ExtractionError::parse("date", raw()))?;

        if date.date() < self.earliest || date > now {
            return Err(ExtractionError::out_of_range("date", date));
        }

        Ok(date)
    }
}

impl Default for DateExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for DateExtractor {
    type Output = ExtractionMatch<NaiveDateTime>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        self.extract_at(text, self.now())
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        let now = self.now();

        DATE_RULES
            .iter()
            .flat_map(|rule| {
                rule.regex
                    .captures_iter(text)
                    .filter_map(|caps| self.candidate(rule, &caps, now).ok())
                    .collect::<Vec<_>>()
            })
            .collect()
    }
}

/// Two-digit years are in the 2000s.
fn expand_year(s: &str) -> Option<i32> {
    let year: i32 = s.parse().ok()?;
    if s.len() == 2 { Some(2000 + year) } else { Some(year) }
}

/// Resolve a three-letter Spanish month abbreviation.
///
/// Unknown tokens get a narrow OCR repair: a token holding both `D` and `C`
/// reads as `DIC`, one holding both `E` and `N` as `ENE`.
pub fn spanish_month(token: &str) -> Result<u32, ExtractionError> {
    let token = token.to_uppercase();
    let lookup = |t: &str| SPANISH_MONTHS.iter().find(|(name, _)| *name == t).map(|(_, n)| *n);

    if let Some(month) = lookup(&token) {
        return Ok(month);
    }

    let repaired = if token.contains('D') && token.contains('C') {
        "DIC"
    } else if token.contains('E') && token.contains('N') {
        "ENE"
    } else {
        return Err(ExtractionError::parse("month", token));
    };

    trace!("Repaired month token {} -> {}", token, repaired);
    lookup(repaired).ok_or_else(|| ExtractionError::parse("month", token))
}

/// Extract the transaction date, falling back to the current time.
pub fn extract_date(text: &str) -> ReceiptDate {
    DateExtractor::new().resolve(text)
}
