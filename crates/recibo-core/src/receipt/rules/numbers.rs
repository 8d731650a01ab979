//! Locale-ambiguous number normalization.

use rust_decimal::Decimal;
use std::str::FromStr;

use crate::error::ExtractionError;

/// Parse an amount whose decimal separator may be `,` or `.`.
///
/// The separator that occurs last is the decimal separator; every earlier
/// `,` or `.` is a thousands separator and is dropped. Whitespace is
/// ignored. `"2,901.00"` and `"2.901,00"` both yield `2901.00`.
///
/// When a decimal separator is present the result carries two fractional
/// digits.
pub fn normalize_amount(raw: &str) -> Result<Decimal, ExtractionError> {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();

    let (integer, fraction) = match compact.rfind([',', '.']) {
        Some(split) => {
            let integer: String = compact[..split]
                .chars()
                .filter(|c| *c != ',' && *c != '.')
                .collect();
            (integer, Some(&compact[split + 1..]))
        }
        None => (compact.clone(), None),
    };

    let is_digits = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
    if !is_digits(&integer) || !fraction.map_or(true, is_digits) {
        return Err(ExtractionError::parse("amount", raw));
    }

    let literal = match fraction {
        Some(fraction) => format!("{}.{}", integer, fraction),
        None => integer,
    };

    let mut value =
        Decimal::from_str(&literal).map_err(|_| ExtractionError::parse("amount", raw))?;

    if fraction.is_some() {
        value = value.round_dp(2);
        value.rescale(2);
    }

    Ok(value)
}
