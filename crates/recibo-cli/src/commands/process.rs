//! Process command - extract data from a single receipt.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{NaiveDate, NaiveDateTime};
use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{debug, info};

use recibo_core::models::config::{PolicyConfig, ReciboConfig};
use recibo_core::models::receipt::ISO_DATETIME;
use recibo_core::ocr::OcrStage;
use recibo_core::{
    DraftTransaction, OcrLadder, ReceiptData, ReceiptParser, ReceiptSource, RuleReceiptParser,
    TesseractEngine,
};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input file (text or image), or `-` to read text from stdin
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Show extraction confidence scores
    #[arg(long)]
    show_confidence: bool,

    /// Include the draft transaction when the confidence policy allows it
    #[arg(long)]
    draft: bool,

    /// Reference time for date checks and the fallback date
    /// (YYYY-MM-DDTHH:MM:SS or YYYY-MM-DD)
    #[arg(long, value_parser = parse_now)]
    now: Option<NaiveDateTime>,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output
    Csv,
    /// Plain text summary
    Text,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Text => "txt",
        }
    }
}

/// Extraction output for one receipt.
#[derive(Debug, Serialize)]
pub struct ReceiptReport {
    #[serde(flatten)]
    pub receipt: ReceiptData,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ocr_stage: Option<OcrStage>,

    pub warnings: Vec<String>,

    pub processing_time_ms: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub draft: Option<DraftTransaction>,
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = super::config::load(config_path)?;

    if args.input.as_os_str() != "-" && !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    info!("Processing receipt: {}", args.input.display());

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message("Extracting receipt data...");

    let report = extract_report(&args.input, &config, args.now, args.draft);
    pb.finish_and_clear();
    let report = report?;

    let output = format_report(&report, args.format, &config.policy)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    if args.show_confidence {
        println!();
        println!(
            "{} Extraction confidence: {:.1}%",
            style("ℹ").blue(),
            report.receipt.confidence * 100.0
        );

        let threshold = config.policy.min_confidence;
        if report.receipt.meets_confidence(threshold) {
            println!(
                "{} Meets the draft threshold of {:.0}%",
                style("✓").green(),
                threshold * 100.0
            );
        } else {
            println!(
                "{} Below the draft threshold of {:.0}%",
                style("!").yellow(),
                threshold * 100.0
            );
        }

        for warning in &report.warnings {
            println!("{} {}", style("!").yellow(), warning);
        }

        println!(
            "{} Processing time: {}ms",
            style("ℹ").blue(),
            report.processing_time_ms
        );
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

/// Load, recognize, and extract one receipt.
pub fn extract_report(
    path: &Path,
    config: &ReciboConfig,
    now: Option<NaiveDateTime>,
    with_draft: bool,
) -> anyhow::Result<ReceiptReport> {
    let source = ReceiptSource::open(path)?;

    let mut parser = RuleReceiptParser::from_config(&config.extraction);
    if let Some(now) = now {
        parser = parser.at(now);
    }

    let ladder = OcrLadder::new(TesseractEngine::from_config(&config.ocr), config.ocr.clone())
        .with_preprocessing(config.preprocessing.clone());

    let result = source.extract(&parser, &ladder)?;

    let draft = if with_draft {
        DraftTransaction::from_receipt(&result.receipt, &config.policy)
    } else {
        None
    };

    Ok(ReceiptReport {
        receipt: result.receipt,
        ocr_stage: result.ocr_stage,
        warnings: result.warnings,
        processing_time_ms: result.processing_time_ms,
        draft,
    })
}

pub fn parse_now(value: &str) -> Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(value, ISO_DATETIME)
        .or_else(|_| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .map(|d| d.and_time(chrono::NaiveTime::MIN))
        })
        .map_err(|e| format!("invalid reference time '{}': {}", value, e))
}

pub fn format_report(
    report: &ReceiptReport,
    format: OutputFormat,
    policy: &PolicyConfig,
) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string(report)?),
        OutputFormat::Csv => format_csv(report),
        OutputFormat::Text => Ok(format_text(report, policy)),
    }
}

fn format_csv(report: &ReceiptReport) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "amount",
        "amount_pattern",
        "date",
        "date_detected",
        "merchant",
        "confidence",
    ])?;

    let receipt = &report.receipt;
    wtr.write_record([
        receipt.amount.map(|a| a.to_string()).unwrap_or_default(),
        receipt.amount_pattern.map(|p| p.to_string()).unwrap_or_default(),
        receipt.date_iso(),
        receipt.date_detected.to_string(),
        receipt.merchant.clone().unwrap_or_default(),
        format!("{:.2}", receipt.confidence),
    ])?;

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_text(report: &ReceiptReport, policy: &PolicyConfig) -> String {
    let receipt = &report.receipt;
    let mut output = String::new();

    output.push_str(&format!(
        "Merchant: {}\n",
        receipt.merchant.as_deref().unwrap_or("(not found)")
    ));

    if receipt.date_detected {
        output.push_str(&format!("Date:     {}\n", receipt.date_iso()));
    } else {
        output.push_str(&format!("Date:     {} (processing time)\n", receipt.date_iso()));
    }

    match (&receipt.amount, &receipt.amount_pattern) {
        (Some(amount), Some(pattern)) => output.push_str(&format!(
            "Amount:   {}{} ({})\n",
            policy.currency_symbol, amount, pattern
        )),
        (Some(amount), None) => {
            output.push_str(&format!("Amount:   {}{}\n", policy.currency_symbol, amount))
        }
        _ => output.push_str("Amount:   (not found)\n"),
    }

    output.push_str(&format!("Confidence: {:.2}\n", receipt.confidence));

    if let Some(stage) = report.ocr_stage {
        output.push_str(&format!("OCR stage: {}\n", stage));
    }

    if let Some(draft) = &report.draft {
        output.push_str(&format!("\nDraft transaction: {}\n", draft.description));
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(text: &str) -> ReceiptReport {
        let receipt = RuleReceiptParser::new()
            .at(parse_now("2025-01-10").unwrap())
            .parse(text);
        let draft = DraftTransaction::from_receipt(&receipt.receipt, &PolicyConfig::default());

        ReceiptReport {
            receipt: receipt.receipt,
            ocr_stage: None,
            warnings: receipt.warnings,
            processing_time_ms: 0,
            draft,
        }
    }

    #[test]
    fn test_parse_now() {
        assert_eq!(
            parse_now("2024-12-01T10:15:00").unwrap().to_string(),
            "2024-12-01 10:15:00"
        );
        assert_eq!(parse_now("2024-12-01").unwrap().to_string(), "2024-12-01 00:00:00");
        assert!(parse_now("yesterday").is_err());
    }

    #[test]
    fn test_format_csv() {
        let report = report("SUPER MERCADO\n01/12/2024\nTOTAL CONTADO: $2,901.00");
        let csv = format_csv(&report).unwrap();
        let lines: Vec<_> = csv.lines().collect();

        assert_eq!(lines[0], "amount,amount_pattern,date,date_detected,merchant,confidence");
        assert_eq!(
            lines[1],
            "2901.00,total_contado,2024-12-01T00:00:00,true,SUPER MERCADO,0.95"
        );
    }

    #[test]
    fn test_format_text() {
        let report = report("SUPER MERCADO\n01/12/2024\nTOTAL CONTADO: $2,901.00");
        let text = format_text(&report, &PolicyConfig::default());

        assert!(text.contains("Merchant: SUPER MERCADO"));
        assert!(text.contains("Amount:   $2901.00 (total_contado)"));
        assert!(text.contains("Draft transaction: SUPER MERCADO - $2901.00"));
    }

    #[test]
    fn test_format_text_missing_fields() {
        let text = format_text(&report(""), &PolicyConfig::default());

        assert!(text.contains("Merchant: (not found)"));
        assert!(text.contains("(processing time)"));
        assert!(text.contains("Amount:   (not found)"));
    }

    #[test]
    fn test_json_flattens_receipt() {
        let report = report("SUPER MERCADO\n01/12/2024\nTOTAL CONTADO: $2,901.00");
        let json: serde_json::Value =
            serde_json::from_str(&format_report(&report, OutputFormat::Json, &PolicyConfig::default()).unwrap())
                .unwrap();

        assert_eq!(json["amount"], "2901.00");
        assert_eq!(json["merchant"], "SUPER MERCADO");
        assert_eq!(json["draft"]["type"], "expense");
    }
}
