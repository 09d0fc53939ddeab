//! # invoice-prep
//!
//! Turn scanned invoices and their field labels into a training corpus for
//! field-extraction models.
//!
//! ## Why this crate?
//!
//! An extraction model does not learn from raw PDFs. It learns from a fixed
//! size page image, a list of candidate phrases with their positions on that
//! image, and the ground-truth value of every field. This crate builds exactly
//! that for every document in a directory tree, splits the result into
//! train / val / test, and keeps going when individual documents are broken.
//!
//! ## Pipeline Overview
//!
//! ```text
//! data_dir/**/*.{pdf,png,jpeg,jpg} + sibling *.json labels
//!  │
//!  ├─ 1. Split      positional test (5%) / val / train
//!  ├─ 2. Classify   magic bytes → Pdf | Image | Unsupported
//!  ├─ 3. Rasterize  first PDF page via pdfium, or the image itself
//!  ├─ 4. OCR        word tokens with pixel boxes (tesseract or sidecar JSON)
//!  ├─ 5. N-grams    1..=4 token windows, boxes in output space, amount/date parses
//!  ├─ 6. Labels     label file joined onto the field vocabulary, normalised
//!  └─ 7. Write      out_dir/<phase>/<stem>.jpg (128×128) + <stem>.json
//! ```
//!
//! Steps 2–7 run once per document on a bounded worker pool. The library runs
//! them on blocking threads; the `prepare-data` binary runs each document in
//! a child process of itself (see [`Isolation`]).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use invoice_prep::{prepare_dataset, NoopProgress, OcrBackend, PrepareConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PrepareConfig::builder("invoices/")
//!         .out_dir("processed_data/")
//!         .ocr_backend(OcrBackend::Sidecar)
//!         .build()?;
//!     let report = prepare_dataset(&config, Arc::new(NoopProgress)).await?;
//!     eprintln!("{} written, {} skipped", report.succeeded(), report.failed());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature     | Default | Description |
//! |-------------|---------|-------------|
//! | `cli`       | on      | Enables the `prepare-data` binary (clap + anyhow + indicatif + tracing-subscriber) |
//! | `tesseract` | off     | Compiles the Tesseract OCR backend (links libtesseract via `leptess`) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! invoice-prep = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod fields;
pub mod orchestrate;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod split;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{Isolation, OcrBackend, PrepareConfig, PrepareConfigBuilder};
pub use error::{DocumentError, NormalizeError, PrepareError};
pub use fields::{FieldType, FieldVocabulary};
pub use orchestrate::{prepare_dataset, prepare_dataset_sync, Orchestrator};
pub use output::{
    BoundingBox, FieldRecord, NGram, OcrToken, Phase, PhaseReport, RunReport, TrainingExample,
};
pub use progress::{NoopProgress, PhaseProgress, ProgressCallback};
