//! Total amount extraction for receipts.

use std::borrow::Cow;

use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::numbers::normalize_amount;
use super::patterns::*;
use super::{FieldExtractor, Selection};
use crate::error::ExtractionError;

/// Labeled amount patterns, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmountPattern {
    TotalContadoFuzzy,
    PagoTarjeta,
    TotalContado,
    Total,
    Neto,
    Importe,
    Subtotal,
    TotalNewline,
    LargeAmountEnd,
}

impl AmountPattern {
    /// Stable snake_case name.
    pub fn name(&self) -> &'static str {
        match self {
            AmountPattern::TotalContadoFuzzy => "total_contado_fuzzy",
            AmountPattern::PagoTarjeta => "pago_tarjeta",
            AmountPattern::TotalContado => "total_contado",
            AmountPattern::Total => "total",
            AmountPattern::Neto => "neto",
            AmountPattern::Importe => "importe",
            AmountPattern::Subtotal => "subtotal",
            AmountPattern::TotalNewline => "total_newline",
            AmountPattern::LargeAmountEnd => "large_amount_end",
        }
    }
}

impl std::fmt::Display for AmountPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Which rendition of the text a pattern is matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextView {
    /// Whitespace runs collapsed to a single space.
    Collapsed,
    /// Text as received, line breaks intact.
    Raw,
}

/// One row of the amount precedence table.
pub struct AmountRule {
    pub pattern: AmountPattern,
    pub regex: &'static Regex,
    pub selection: Selection,
    pub view: TextView,
}

lazy_static::lazy_static! {
    /// Amount precedence table. The first rule whose selected match yields
    /// an accepted value wins; rules are never combined.
    pub static ref AMOUNT_RULES: Vec<AmountRule> = vec![
        rule(AmountPattern::TotalContadoFuzzy, &TOTAL_CONTADO_FUZZY, TextView::Collapsed),
        rule(AmountPattern::PagoTarjeta, &PAGO_TARJETA, TextView::Collapsed),
        rule(AmountPattern::TotalContado, &TOTAL_CONTADO, TextView::Collapsed),
        rule(AmountPattern::Total, &TOTAL, TextView::Collapsed),
        rule(AmountPattern::Neto, &NETO, TextView::Collapsed),
        rule(AmountPattern::Importe, &IMPORTE, TextView::Collapsed),
        rule(AmountPattern::Subtotal, &SUBTOTAL, TextView::Collapsed),
        rule(AmountPattern::TotalNewline, &TOTAL_NEWLINE, TextView::Raw),
        rule(AmountPattern::LargeAmountEnd, &LARGE_AMOUNT_END, TextView::Collapsed),
    ];
}

// Totals sit at the bottom of a receipt, so every rule keeps its last match.
fn rule(pattern: AmountPattern, regex: &'static Regex, view: TextView) -> AmountRule {
    AmountRule {
        pattern,
        regex,
        selection: Selection::Last,
        view,
    }
}

/// An accepted amount and the rule that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedAmount {
    pub value: Decimal,
    pub pattern: AmountPattern,
    /// Matched text, label included.
    pub source: String,
}

/// Amount field extractor.
pub struct AmountExtractor {
    min: Decimal,
    max: Decimal,
}

impl AmountExtractor {
    /// Create an extractor accepting amounts in [0.01, 999999.99].
    pub fn new() -> Self {
        Self {
            min: Decimal::new(1, 2),
            max: Decimal::new(99_999_999, 2),
        }
    }

    /// Set the accepted amount range (inclusive).
    pub fn with_range(mut self, min: Decimal, max: Decimal) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    fn accept(&self, raw: &str) -> Result<Decimal, ExtractionError> {
        let value = normalize_amount(raw)?;
        if value < self.min || value > self.max {
            return Err(ExtractionError::out_of_range("amount", value));
        }
        Ok(value)
    }

    fn candidate(&self, rule: &AmountRule, caps: &regex::Captures<'_>) -> Result<ExtractedAmount, ExtractionError> {
        let value = self.accept(&caps[1])?;
        let source = caps[0].to_string();
        Ok(ExtractedAmount {
            value,
            pattern: classify(rule.pattern, &source),
            source,
        })
    }
}

impl Default for AmountExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for AmountExtractor {
    type Output = ExtractedAmount;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        let collapsed = collapse_whitespace(text);

        for rule in AMOUNT_RULES.iter() {
            let haystack = view_of(rule.view, text, &collapsed);
            let Some(caps) = rule.selection.pick(rule.regex.captures_iter(haystack)) else {
                trace!("Amount pattern '{}' did not match", rule.pattern);
                continue;
            };

            match self.candidate(rule, &caps) {
                Ok(found) => {
                    debug!("Amount detected: {} (pattern: {})", found.value, found.pattern);
                    return Some(found);
                }
                Err(e) => debug!("Amount pattern '{}' rejected: {}", rule.pattern, e),
            }
        }

        debug!("{}", ExtractionError::NotFound("amount"));
        None
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        let collapsed = collapse_whitespace(text);

        AMOUNT_RULES
            .iter()
            .flat_map(|rule| {
                let haystack = view_of(rule.view, text, &collapsed);
                rule.regex
                    .captures_iter(haystack)
                    .filter_map(|caps| self.candidate(rule, &caps).ok())
                    .collect::<Vec<_>>()
            })
            .collect()
    }
}

fn view_of<'a>(view: TextView, raw: &'a str, collapsed: &'a str) -> &'a str {
    match view {
        TextView::Collapsed => collapsed,
        TextView::Raw => raw,
    }
}

/// Collapse whitespace runs (including line breaks) to a single space.
pub fn collapse_whitespace(text: &str) -> Cow<'_, str> {
    WHITESPACE_RUN.replace_all(text, " ")
}

/// A fuzzy "Total Contado" hit whose label is actually clean is reported as
/// the strict pattern.
fn classify(pattern: AmountPattern, source: &str) -> AmountPattern {
    if pattern == AmountPattern::TotalContadoFuzzy && TOTAL_CONTADO.is_match(source) {
        AmountPattern::TotalContado
    } else {
        pattern
    }
}

/// Extract the most probable receipt total.
pub fn extract_amount(text: &str) -> Option<ExtractedAmount> {
    AmountExtractor::new().extract(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_total_contado_strict_label() {
        let found = extract_amount("SUPER\nTOTAL CONTADO: $1,234.56\nGRACIAS").unwrap();
        assert_eq!(found.value, dec("1234.56"));
        assert_eq!(found.pattern, AmountPattern::TotalContado);
    }

    #[test]
    fn test_total_contado_garbled_label() {
        let found = extract_amount("Total Cc ., e ontado $ 88.10").unwrap();
        assert_eq!(found.value, dec("88.10"));
        assert_eq!(found.pattern, AmountPattern::TotalContadoFuzzy);
    }

    #[test]
    fn test_last_total_wins() {
        let text = "Total $10.00\nDescuento\nTotal $8.50\nTotal $25.75\nGracias";
        let found = extract_amount(text).unwrap();
        assert_eq!(found.value, dec("25.75"));
        assert_eq!(found.pattern, AmountPattern::Total);
    }

    #[test]
    fn test_pago_tarjeta_beats_total() {
        let text = "Total: 99.00\nPago con tarjeta: $ 120.00";
        let found = extract_amount(text).unwrap();
        assert_eq!(found.value, dec("120.00"));
        assert_eq!(found.pattern, AmountPattern::PagoTarjeta);
    }

    #[test]
    fn test_line_break_between_label_and_amount() {
        let found = extract_amount("TOTAL\n\n$ 45.90").unwrap();
        assert_eq!(found.value, dec("45.90"));
        assert_eq!(found.pattern, AmountPattern::Total);
    }

    #[test]
    fn test_total_newline_after_punctuation() {
        let found = extract_amount("Articulos 3\nTotal.\n  12.00\n").unwrap();
        assert_eq!(found.value, dec("12.00"));
        assert_eq!(found.pattern, AmountPattern::TotalNewline);
    }

    #[test]
    fn test_lower_priority_labels() {
        assert_eq!(extract_amount("Neto $ 77.60").unwrap().pattern, AmountPattern::Neto);
        assert_eq!(extract_amount("IMPORTE: 15,30").unwrap().value, dec("15.30"));
        let found = extract_amount("Subtotal: 40.00\nIVA: 6.40").unwrap();
        assert_eq!(found.pattern, AmountPattern::Subtotal);
        assert_eq!(found.value, dec("40.00"));
    }

    #[test]
    fn test_large_amount_at_end() {
        let found = extract_amount("ARTICULOS VARIOS\n1,250.00\n").unwrap();
        assert_eq!(found.value, dec("1250.00"));
        assert_eq!(found.pattern, AmountPattern::LargeAmountEnd);
    }

    #[test]
    fn test_out_of_range_rejected() {
        assert_eq!(extract_amount("Total: 0.00"), None);
        assert_eq!(extract_amount("Total: 1000000.00"), None);
    }

    #[test]
    fn test_rejection_moves_to_next_pattern() {
        // The last "Total" is zero, so the rule is abandoned as a whole even
        // though an earlier "Total" match is valid.
        let text = "Total 15.00\nTotal 0.00\nImporte 9.99";
        let found = extract_amount(text).unwrap();
        assert_eq!(found.value, dec("9.99"));
        assert_eq!(found.pattern, AmountPattern::Importe);
    }

    #[test]
    fn test_european_format() {
        let found = extract_amount("TOTAL 2.901,00 EUR").unwrap();
        assert_eq!(found.value, dec("2901.00"));
    }

    #[test]
    fn test_no_amount() {
        assert_eq!(extract_amount(""), None);
        assert_eq!(extract_amount("gracias por su compra"), None);
    }

    #[test]
    fn test_custom_range() {
        let extractor = AmountExtractor::new().with_range(dec("1.00"), dec("50.00"));
        assert_eq!(extractor.extract("Total 75.00"), None);
        assert_eq!(extractor.extract("Total 49.99").unwrap().value, dec("49.99"));
    }

    #[test]
    fn test_extract_all_lists_candidates_by_priority() {
        let extractor = AmountExtractor::new();
        let all = extractor.extract_all("Subtotal: 40.00\nTotal: 46.40");

        let patterns: Vec<_> = all.iter().map(|a| a.pattern).collect();
        assert_eq!(patterns, vec![AmountPattern::Total, AmountPattern::Subtotal]);
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("a \n\t b\r\nc"), "a b c");
    }
}
