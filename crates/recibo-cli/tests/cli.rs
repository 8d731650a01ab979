use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const RECEIPT: &str = "SUPER MERCADO\n01/12/2024\nTOTAL CONTADO: $2,901.00\n";

/// Command with the user configuration directory pointed into `home`.
fn recibo(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("recibo").unwrap();
    cmd.env("XDG_CONFIG_HOME", home).env("HOME", home);
    cmd
}

fn write(dir: &TempDir, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn process_text_file_as_json() {
    let dir = TempDir::new().unwrap();
    let input = write(&dir, "ticket.txt", RECEIPT);

    recibo(dir.path())
        .args(["process", "--now", "2025-01-10"])
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""amount":"2901.00""#))
        .stdout(predicate::str::contains(r#""amount_pattern":"total_contado""#))
        .stdout(predicate::str::contains(r#""merchant":"SUPER MERCADO""#))
        .stdout(predicate::str::contains(r#""date":"2024-12-01T00:00:00""#))
        .stdout(predicate::str::contains(r#""draft""#).not());
}

#[test]
fn process_stdin_as_text_with_draft() {
    let dir = TempDir::new().unwrap();

    recibo(dir.path())
        .args(["process", "-", "--format", "text", "--draft", "--now", "2025-01-10"])
        .write_stdin(RECEIPT)
        .assert()
        .success()
        .stdout(predicate::str::contains("Merchant: SUPER MERCADO"))
        .stdout(predicate::str::contains("Amount:   $2901.00 (total_contado)"))
        .stdout(predicate::str::contains("Draft transaction: SUPER MERCADO - $2901.00"));
}

#[test]
fn process_shows_confidence() {
    let dir = TempDir::new().unwrap();

    recibo(dir.path())
        .args(["process", "-", "--show-confidence"])
        .write_stdin("TIENDA SIN DATOS")
        .assert()
        .success()
        .stdout(predicate::str::contains("Extraction confidence: 10.0%"))
        .stdout(predicate::str::contains("Below the draft threshold of 30%"))
        .stdout(predicate::str::contains("Could not extract amount"));
}

#[test]
fn process_writes_csv_output() {
    let dir = TempDir::new().unwrap();
    let input = write(&dir, "ticket.txt", RECEIPT);
    let output = dir.path().join("out.csv");

    recibo(dir.path())
        .args(["process", "--format", "csv", "--now", "2025-01-10", "--output"])
        .arg(&output)
        .arg(&input)
        .assert()
        .success();

    let csv = fs::read_to_string(&output).unwrap();
    assert!(csv.starts_with("amount,amount_pattern,date,date_detected,merchant,confidence"));
    assert!(csv.contains("2901.00,total_contado,2024-12-01T00:00:00,true,SUPER MERCADO"));
}

#[test]
fn process_missing_file_fails() {
    let dir = TempDir::new().unwrap();

    recibo(dir.path())
        .args(["process", "no-such-ticket.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Input file not found"));
}

#[test]
fn process_unsupported_format_fails() {
    let dir = TempDir::new().unwrap();
    let input = write(&dir, "factura.pdf", "%PDF-1.4");

    recibo(dir.path())
        .arg("process")
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported file format"));
}

#[test]
fn process_rejects_bad_reference_time() {
    let dir = TempDir::new().unwrap();

    recibo(dir.path())
        .args(["process", "-", "--now", "tomorrow"])
        .write_stdin(RECEIPT)
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid reference time"));
}

#[test]
fn batch_writes_outputs_and_summary() {
    let dir = TempDir::new().unwrap();
    write(&dir, "a.txt", RECEIPT);
    write(&dir, "b.txt", "FARMACIA\nTotal 15.50\n");
    write(&dir, "notes.md", "ignored");
    let out = dir.path().join("out");

    recibo(dir.path())
        .args(["batch", "-j", "2", "--summary", "--now", "2025-01-10", "--output-dir"])
        .arg(&out)
        .arg(format!("{}/*", dir.path().display()))
        .assert()
        .success()
        .stdout(predicate::str::contains("Found 2 files to process"))
        .stdout(predicate::str::contains("2 successful, 0 failed"));

    let a = fs::read_to_string(out.join("a.json")).unwrap();
    assert!(a.contains(r#""amount":"2901.00""#));
    let b = fs::read_to_string(out.join("b.json")).unwrap();
    assert!(b.contains(r#""amount":"15.50""#));

    let summary = fs::read_to_string(out.join("summary.csv")).unwrap();
    assert_eq!(summary.lines().count(), 3);
    assert!(summary.contains("a.txt,success,2901.00,total_contado"));
    assert!(summary.contains("b.txt,success,15.50,total"));
}

#[test]
fn batch_without_matches_fails() {
    let dir = TempDir::new().unwrap();

    recibo(dir.path())
        .arg("batch")
        .arg(format!("{}/*.txt", dir.path().display()))
        .assert()
        .failure()
        .stderr(predicate::str::contains("No matching files found"));
}

#[test]
fn config_init_set_get() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("recibo.json");

    recibo(dir.path())
        .args(["config", "init", "--output"])
        .arg(&config)
        .assert()
        .success();
    assert!(config.exists());

    recibo(dir.path())
        .arg("--config")
        .arg(&config)
        .args(["config", "set", "policy.min_confidence", "0.5"])
        .assert()
        .success();

    recibo(dir.path())
        .arg("--config")
        .arg(&config)
        .args(["config", "get", "policy.min_confidence"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0.5"));

    recibo(dir.path())
        .arg("--config")
        .arg(&config)
        .args(["config", "set", "policy.nonexistent", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration key not found"));
}

#[test]
fn config_init_refuses_overwrite() {
    let dir = TempDir::new().unwrap();
    let config = write(&dir, "recibo.json", "{}");

    recibo(dir.path())
        .args(["config", "init", "--output"])
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));
}

#[test]
fn configured_threshold_controls_draft() {
    let dir = TempDir::new().unwrap();
    let config = write(&dir, "recibo.json", r#"{"policy": {"min_confidence": 0.99}}"#);

    recibo(dir.path())
        .arg("--config")
        .arg(&config)
        .args(["process", "-", "--format", "text", "--draft", "--now", "2025-01-10"])
        .write_stdin(RECEIPT)
        .assert()
        .success()
        .stdout(predicate::str::contains("Draft transaction").not());
}
