//! End-to-end CLI tests that run without network access.

use assert_cmd::Command;
use predicates::prelude::*;

fn defter() -> Command {
    Command::cargo_bin("defter").unwrap()
}

#[test]
fn test_config_init_and_show() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("defter.json");

    defter()
        .args(["config", "init"])
        .arg(&config_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Default configuration written"));

    // Refuses to clobber an existing file
    defter()
        .args(["config", "init"])
        .arg(&config_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Refusing to overwrite"));

    defter()
        .args(["--config", config_path.to_str().unwrap(), "config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"jobs\": 4"))
        .stdout(predicate::str::contains("gemini-1.5-flash"));
}

#[test]
fn test_ledger_from_records_file() {
    let dir = tempfile::tempdir().unwrap();
    let records_path = dir.path().join("records.json");

    std::fs::write(
        &records_path,
        r#"[
            {
                "merchant_name": "MIGROS",
                "date": "15.01.2024",
                "category": "food",
                "total_amount": "118.00",
                "tax_amount": "18.00"
            }
        ]"#,
    )
    .unwrap();

    defter()
        .args(["ledger", "--records", records_path.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("date,account,description,debit,credit"))
        .stdout(predicate::str::contains("770.01"))
        .stdout(predicate::str::contains("191"))
        .stdout(predicate::str::contains("100,MIGROS"));
}

#[test]
fn test_ledger_with_no_records_fails() {
    let dir = tempfile::tempdir().unwrap();

    defter()
        .args(["ledger", "--ledger-dir", dir.path().to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No records found"));
}

#[test]
fn test_batch_rejects_empty_glob() {
    let dir = tempfile::tempdir().unwrap();
    let pattern = format!("{}/*.jpg", dir.path().display());

    defter()
        .env("GEMINI_API_KEY", "test-key")
        .args(["batch", &pattern])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No matching files"));
}

#[test]
fn test_process_requires_api_key() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("fis.jpg");
    std::fs::write(&input, b"not really a jpeg").unwrap();

    defter()
        .env_remove("GEMINI_API_KEY")
        .args(["process"])
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("GEMINI_API_KEY"));
}
