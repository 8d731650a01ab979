//! Common regex patterns for receipt extraction.

use lazy_static::lazy_static;
use regex::Regex;

/// Amount capture shared by the labeled amount patterns: `2,901.00`,
/// `2.901,00`, `2901.00`, `12,50`.
macro_rules! amount {
    () => {
        r"(\d{1,3}(?:[.,]?\d{3})*[.,]\d{2})"
    };
}

lazy_static! {
    pub static ref WHITESPACE_RUN: Regex = Regex::new(r"\s+").unwrap();

    // Labeled totals, most specific first.

    // Tolerates junk between the letters: "Total Cc ., e ontado".
    pub static ref TOTAL_CONTADO_FUZZY: Regex = Regex::new(concat!(
        r"(?i)total[\s.,;:]*c+[\s.,;:]*[oe0]*[\s.,;:]*[no]*[\s.,;:]*t+[\s.,;:]*a+[\s.,;:]*d+[\s.,;:]*o+[:\s]*\$?\s*",
        amount!()
    )).unwrap();

    pub static ref PAGO_TARJETA: Regex = Regex::new(concat!(
        r"(?i)pago[\s.,;:]*con[\s.,;:]*tarjeta[:\s]*\$?\s*",
        amount!()
    )).unwrap();

    pub static ref TOTAL_CONTADO: Regex = Regex::new(concat!(
        r"(?i)total\s+contado[:\s]*\$?\s*",
        amount!()
    )).unwrap();

    // "Tota1", "Tota!", "Tota|" are common OCR readings of "Total".
    pub static ref TOTAL: Regex = Regex::new(concat!(
        r"(?i)\b(?:total|tota[l1!|])[:\s]+\$?\s*",
        amount!()
    )).unwrap();

    pub static ref NETO: Regex = Regex::new(concat!(
        r"(?i)\b(?:neto|net)[:\s]+\$?\s*",
        amount!()
    )).unwrap();

    pub static ref IMPORTE: Regex = Regex::new(concat!(
        r"(?i)\bimporte[:\s]+\$?\s*",
        amount!()
    )).unwrap();

    pub static ref SUBTOTAL: Regex = Regex::new(concat!(
        r"(?i)\bsubtotal[:\s]+\$?\s*",
        amount!()
    )).unwrap();

    // Runs on the raw text, so the line break is still there.
    pub static ref TOTAL_NEWLINE: Regex = Regex::new(concat!(
        r"(?i)\btotal[\s.,;:]*\n[\s.,;:]*\$?\s*",
        amount!()
    )).unwrap();

    pub static ref LARGE_AMOUNT_END: Regex = Regex::new(
        r"(\d{1,3}[.,]\d{3}[.,]\d{2})\s*$"
    ).unwrap();

    // Date patterns. OCR glues labels to dates ("FECHA01/12/2024") and ISO
    // timestamps continue with "T", so the guards only reject neighbouring
    // digits. Captures 1..=3 hold the date itself.

    // DD/MM/YYYY or MM/DD/YYYY
    pub static ref DATE_NUMERIC_LONG_YEAR: Regex = Regex::new(
        r"(?:^|\D)(\d{1,2})[/-](\d{1,2})[/-](\d{4})(?:\D|$)"
    ).unwrap();

    // YYYY-MM-DD or YYYY/MM/DD
    pub static ref DATE_YMD: Regex = Regex::new(
        r"(?:^|\D)(\d{4})[/-](\d{1,2})[/-](\d{1,2})(?:\D|$)"
    ).unwrap();

    // DD/MM/YY or MM/DD/YY
    pub static ref DATE_NUMERIC_SHORT_YEAR: Regex = Regex::new(
        r"\b(\d{1,2})[/-](\d{1,2})[/-](\d{2})\b"
    ).unwrap();

    // D-MMM-YY with a Spanish month abbreviation, e.g. "5-DIC-25". The
    // month token must hold at least one letter; digits are allowed so that
    // OCR readings like "D1C" reach the month repair.
    pub static ref DATE_SPANISH_MONTH: Regex = Regex::new(
        r"(?i)(?:^|\D)(\d{1,2})[-.\s]+([A-Z][A-Z0-9]{2}|[0-9][A-Z][A-Z0-9]|[0-9]{2}[A-Z])[-.\s]+(\d{2,4})(?:\D|$)"
    ).unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_capture_formats() {
        for (text, expected) in [
            ("Total: 2,901.00", "2,901.00"),
            ("Total: 2.901,00", "2.901,00"),
            ("Total: 2901.00", "2901.00"),
            ("Total 12,50", "12,50"),
        ] {
            let caps = TOTAL.captures(text).unwrap();
            assert_eq!(&caps[1], expected, "{}", text);
        }
    }

    #[test]
    fn test_total_ocr_variants() {
        assert!(TOTAL.is_match("TOTA1 $ 15.00"));
        assert!(TOTAL.is_match("Tota! 15.00"));
        assert!(TOTAL.is_match("tota| 15.00"));
        assert!(!TOTAL.is_match("SUBTOTAL 15.00"));
    }

    #[test]
    fn test_fuzzy_total_contado() {
        assert!(TOTAL_CONTADO_FUZZY.is_match("Total Cc ., e ontado $ 88.10"));
        assert!(TOTAL_CONTADO_FUZZY.is_match("TOTAL CONTADO: $1,234.56"));
        assert!(!TOTAL_CONTADO.is_match("Total Cc ., e ontado $ 88.10"));
    }

    #[test]
    fn test_spanish_month_token() {
        let caps = DATE_SPANISH_MONTH.captures("05-D1C-2024").unwrap();
        assert_eq!(&caps[2], "D1C");

        let caps = DATE_SPANISH_MONTH.captures("fecha 5 dic 25").unwrap();
        assert_eq!(&caps[1], "5");
        assert_eq!(&caps[3], "25");

        assert!(!DATE_SPANISH_MONTH.is_match("05-123-2024"));
    }

    #[test]
    fn test_dates_glued_to_letters() {
        let caps = DATE_NUMERIC_LONG_YEAR.captures("FECHA:01/12/2024HORA 10:00").unwrap();
        assert_eq!((&caps[1], &caps[2], &caps[3]), ("01", "12", "2024"));

        let caps = DATE_YMD.captures("2024-03-07T10:22:00").unwrap();
        assert_eq!((&caps[1], &caps[2], &caps[3]), ("2024", "03", "07"));

        let caps = DATE_SPANISH_MONTH.captures("FECHA05-DIC-2024HORA").unwrap();
        assert_eq!(&caps[2], "DIC");
    }

    #[test]
    fn test_dates_not_cut_from_longer_numbers() {
        assert!(!DATE_NUMERIC_LONG_YEAR.is_match("101/12/2024"));
        assert!(!DATE_NUMERIC_LONG_YEAR.is_match("01/12/20245"));
        assert!(!DATE_YMD.is_match("12024-03-07"));
    }

    #[test]
    fn test_short_year_needs_boundary() {
        assert!(!DATE_NUMERIC_SHORT_YEAR.is_match("01/12/2024"));
        assert!(DATE_NUMERIC_SHORT_YEAR.is_match("01/12/24"));
    }
}
