//! Error types for the invoice-prep library.
//!
//! Three error types reflect three distinct failure modes:
//!
//! * [`PrepareError`] — **Fatal**: the run cannot proceed at all (missing
//!   data directory, output tree cannot be created, bad configuration).
//!   Returned as `Err(PrepareError)` from [`crate::prepare_dataset`].
//!
//! * [`DocumentError`] — **Per-document**: a single invoice failed (content
//!   is neither PDF nor image, decoder choked, label file missing) but every
//!   other document in the phase is unaffected. The orchestrator counts it as
//!   a failed unit and moves on; the document is absent from the corpus.
//!
//! * [`NormalizeError`] — **Degrading**: an amount or date string could not
//!   be canonicalised. Callers keep the raw value (labels) or drop the
//!   candidate parse (n-grams); it never fails a document.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the invoice-prep library.
///
/// Document-level failures use [`DocumentError`] and are reported through
/// [`crate::output::PhaseReport`] rather than propagated here.
#[derive(Debug, Error)]
pub enum PrepareError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The source tree root does not exist or is not a directory.
    #[error("Data directory not found: '{path}'\nCheck the path exists and is a directory.")]
    DataDirNotFound { path: PathBuf },

    /// The glob walk over the data directory failed.
    #[error("Failed to discover documents: {0}")]
    Discovery(String),

    /// A custom field vocabulary file could not be loaded.
    #[error("Invalid field vocabulary '{path}': {detail}")]
    FieldVocabulary { path: PathBuf, detail: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create one of the `out_dir/{train,val,test}` directories.
    #[error("Failed to create output directory '{path}': {source}")]
    OutputDirCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The selected OCR backend cannot be used in this build or environment.
    #[error("OCR backend '{backend}' is unavailable: {detail}")]
    OcrUnavailable { backend: String, detail: String },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single document.
///
/// Produced at the single-document pipeline boundary
/// ([`crate::pipeline::Pipeline::process_document`]); the batch always continues.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// Content sniffing found neither a PDF nor a supported raster image.
    #[error("Unsupported file type for '{path}' (detected: {})", detected.as_deref().unwrap_or("unknown"))]
    UnsupportedFileType {
        path: PathBuf,
        detected: Option<String>,
    },

    /// The source document could not be read from disk.
    #[error("Failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// PDF or image decoding failed.
    #[error("Failed to decode '{path}': {detail}")]
    Decode { path: PathBuf, detail: String },

    /// The OCR engine failed on the rasterised page.
    #[error("OCR failed for '{path}': {detail}")]
    Ocr { path: PathBuf, detail: String },

    /// The sibling `.json` label file is missing or malformed.
    #[error("Failed to read labels '{path}': {detail}")]
    LabelRead { path: PathBuf, detail: String },

    /// Writing the resized image or the example JSON failed.
    #[error("Failed to write '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DocumentError {
    /// Short machine-friendly name of the error kind, used in logs and reports.
    pub fn kind(&self) -> &'static str {
        match self {
            DocumentError::UnsupportedFileType { .. } => "unsupported_file_type",
            DocumentError::Io { .. } => "io",
            DocumentError::Decode { .. } => "decode",
            DocumentError::Ocr { .. } => "ocr",
            DocumentError::LabelRead { .. } => "label_read",
            DocumentError::Write { .. } => "write",
        }
    }
}

/// A value could not be canonicalised for its declared field type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    #[error("'{value}' is not a monetary amount")]
    Amount { value: String },

    #[error("'{value}' does not match any supported date format")]
    Date { value: String },
}
