//! Integration tests for the `prepare-data` binary.
//!
//! These run the real executable, so process isolation goes through the
//! hidden `worker` subcommand: one child per document, exit status as the
//! success flag.

use assert_cmd::Command;
use image::{Rgb, RgbImage};
use predicates::prelude::*;
use std::collections::BTreeSet;
use std::path::Path;
use tempfile::TempDir;

// ── Helpers ──────────────────────────────────────────────────────────────────

fn cli() -> Command {
    Command::new(env!("CARGO_BIN_EXE_prepare-data"))
}

const TOKENS: &str = r#"[
    {"text": "Invoice",  "left": 20,  "top": 20,  "width": 80,  "height": 20},
    {"text": "Total",    "left": 20,  "top": 150, "width": 60,  "height": 20},
    {"text": "$99.90",   "left": 100, "top": 150, "width": 120, "height": 20}
]"#;

fn write_invoice(dir: &Path, stem: &str) {
    RgbImage::from_pixel(300, 200, Rgb([255, 255, 255]))
        .save(dir.join(format!("{stem}.png")))
        .unwrap();
    std::fs::write(dir.join(format!("{stem}.ocr.json")), TOKENS).unwrap();
    std::fs::write(
        dir.join(format!("{stem}.json")),
        r#"{"vendor_name": "Umbrella", "total": "99.9"}"#,
    )
    .unwrap();
}

/// Two good invoices and one PNG that stops after its signature.
fn corpus() -> TempDir {
    let data = tempfile::tempdir().unwrap();
    write_invoice(data.path(), "first");
    write_invoice(data.path(), "second");

    let mut truncated = b"\x89PNG\r\n\x1a\n".to_vec();
    truncated.extend_from_slice(&[0u8; 16]);
    std::fs::write(data.path().join("broken.png"), truncated).unwrap();
    std::fs::write(data.path().join("broken.ocr.json"), TOKENS).unwrap();
    std::fs::write(data.path().join("broken.json"), r#"{"total": "1.00"}"#).unwrap();
    data
}

fn files_in(dir: &Path) -> BTreeSet<String> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect()
}

fn expected_train() -> BTreeSet<String> {
    ["first.jpg", "first.json", "second.jpg", "second.json"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[test]
fn test_process_isolation_runs_workers() {
    let data = corpus();
    let out = tempfile::tempdir().unwrap();

    cli()
        .arg("--data_dir")
        .arg(data.path())
        .arg("--out_dir")
        .arg(out.path())
        .args(["--ocr_engine", "sidecar", "--isolation", "process"])
        .args(["--val_size", "0", "--cores", "2", "--no_progress"])
        .assert()
        .success();

    assert_eq!(files_in(&out.path().join("train")), expected_train());
    assert!(files_in(&out.path().join("val")).is_empty());
    assert!(files_in(&out.path().join("test")).is_empty());

    let raw = std::fs::read_to_string(out.path().join("train/first.json")).unwrap();
    let example: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(example["fields"]["vendor_name"], "Umbrella");
    assert_eq!(example["fields"]["total"], "99.90");
    assert_eq!(example["width"], 128);
}

#[test]
fn test_worker_exit_status_reflects_document() {
    let data = corpus();
    let out = tempfile::tempdir().unwrap();
    for phase in ["train", "val", "test"] {
        std::fs::create_dir_all(out.path().join(phase)).unwrap();
    }

    let worker = |file: &str| {
        let mut cmd = cli();
        cmd.arg("worker")
            .arg("--file")
            .arg(data.path().join(file))
            .args(["--phase", "val"])
            .arg("--out_dir")
            .arg(out.path())
            .args(["--ocr_engine", "sidecar", "--log_level", "error"]);
        cmd
    };

    worker("first.png").assert().success();
    worker("broken.png").assert().failure();
    assert_eq!(
        files_in(&out.path().join("val")),
        ["first.jpg", "first.json"].iter().map(|s| s.to_string()).collect()
    );
}

#[test]
fn test_thread_isolation_matches_process() {
    let data = corpus();
    let out = tempfile::tempdir().unwrap();

    cli()
        .arg("--data_dir")
        .arg(data.path())
        .arg("--out_dir")
        .arg(out.path())
        .args(["--ocr_engine", "sidecar", "--isolation", "thread"])
        .args(["--val_size", "0", "--no_progress", "--quiet"])
        .assert()
        .success();

    assert_eq!(files_in(&out.path().join("train")), expected_train());
}

#[cfg(not(feature = "tesseract"))]
#[test]
fn test_default_engine_without_tesseract_is_sidecar() {
    let data = corpus();
    let out = tempfile::tempdir().unwrap();

    cli()
        .arg("--data_dir")
        .arg(data.path())
        .arg("--out_dir")
        .arg(out.path())
        .args(["--val_size", "0", "--no_progress", "--quiet"])
        .assert()
        .success();

    assert_eq!(files_in(&out.path().join("train")), expected_train());
}

#[test]
fn test_missing_data_dir_fails() {
    let out = tempfile::tempdir().unwrap();
    cli()
        .args(["--data_dir", "/definitely/not/here"])
        .arg("--out_dir")
        .arg(out.path())
        .args(["--ocr_engine", "sidecar", "--no_progress"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("/definitely/not/here"));
}
