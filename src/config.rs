//! Configuration types for a dataset-preparation run.
//!
//! All run behaviour is controlled through [`PrepareConfig`], built via its
//! [`PrepareConfigBuilder`]. The same struct is handed to every worker, so it
//! is `Clone + Send + Sync` and carries no open handles.

use crate::error::PrepareError;
use crate::fields::FieldVocabulary;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Fraction of the discovered documents reserved for the test phase.
pub const TEST_FRACTION: f64 = 0.05;

/// Default pool size: half of the cores left after reserving two.
pub fn default_cores() -> usize {
    (num_cpus::get().saturating_sub(2) / 2).max(1)
}

/// Configuration for a dataset-preparation run.
///
/// # Example
/// ```rust
/// use invoice_prep::PrepareConfig;
///
/// let config = PrepareConfig::builder("invoices/")
///     .out_dir("processed_data/")
///     .val_size(0.2)
///     .cores(4)
///     .build()
///     .unwrap();
/// assert_eq!(config.image_size, 128);
/// ```
#[derive(Clone)]
pub struct PrepareConfig {
    /// Root of the source tree holding documents and their `.json` labels.
    pub data_dir: PathBuf,

    /// Root of the output corpus. Default: `processed_data/`.
    pub out_dir: PathBuf,

    /// Fraction of the non-test documents used for validation. Default: 0.2.
    pub val_size: f64,

    /// Upper bound on concurrently processed documents.
    /// Default: [`default_cores`].
    pub cores: usize,

    /// OCR backend used on every rasterised page. Default: Tesseract.
    pub ocr_backend: OcrBackend,

    /// Tesseract language code(s), e.g. `eng` or `eng+deu`. Default: `eng`.
    pub tesseract_language: String,

    /// Whether each document runs in its own OS process. Default: Thread.
    pub isolation: Isolation,

    /// Executable started once per document under [`Isolation::Process`].
    /// It must accept the `worker` arguments of the `prepare-data` binary.
    pub worker_program: Option<PathBuf>,

    /// Side length of the square output image in pixels. Default: 128.
    pub image_size: u32,

    /// Longest n-gram window, in tokens. Default: 4.
    pub max_ngram_length: usize,

    /// Resolution used to rasterise the first page of a PDF. Range: 72–400.
    /// Default: 200.
    pub pdf_dpi: u32,

    /// Field names and types every output record covers.
    pub fields: FieldVocabulary,
}

impl fmt::Debug for PrepareConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrepareConfig")
            .field("data_dir", &self.data_dir)
            .field("out_dir", &self.out_dir)
            .field("val_size", &self.val_size)
            .field("cores", &self.cores)
            .field("ocr_backend", &self.ocr_backend)
            .field("isolation", &self.isolation)
            .field("worker_program", &self.worker_program)
            .field("image_size", &self.image_size)
            .field("max_ngram_length", &self.max_ngram_length)
            .field("pdf_dpi", &self.pdf_dpi)
            .field("fields", &self.fields.len())
            .finish()
    }
}

impl PrepareConfig {
    /// Create a new builder rooted at `data_dir`.
    pub fn builder(data_dir: impl Into<PathBuf>) -> PrepareConfigBuilder {
        PrepareConfigBuilder {
            config: PrepareConfig {
                data_dir: data_dir.into(),
                out_dir: PathBuf::from("processed_data/"),
                val_size: 0.2,
                cores: default_cores(),
                ocr_backend: OcrBackend::default(),
                tesseract_language: "eng".to_string(),
                isolation: Isolation::default(),
                worker_program: None,
                image_size: 128,
                max_ngram_length: 4,
                pdf_dpi: 200,
                fields: FieldVocabulary::default(),
            },
        }
    }
}

/// Builder for [`PrepareConfig`].
#[derive(Debug)]
pub struct PrepareConfigBuilder {
    config: PrepareConfig,
}

impl PrepareConfigBuilder {
    pub fn out_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.out_dir = dir.into();
        self
    }

    pub fn val_size(mut self, v: f64) -> Self {
        self.config.val_size = v;
        self
    }

    pub fn cores(mut self, n: usize) -> Self {
        self.config.cores = n;
        self
    }

    pub fn ocr_backend(mut self, backend: OcrBackend) -> Self {
        self.config.ocr_backend = backend;
        self
    }

    pub fn tesseract_language(mut self, lang: impl Into<String>) -> Self {
        self.config.tesseract_language = lang.into();
        self
    }

    pub fn isolation(mut self, isolation: Isolation) -> Self {
        self.config.isolation = isolation;
        self
    }

    /// Worker executable for [`Isolation::Process`], usually the
    /// `prepare-data` binary itself.
    pub fn worker_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.config.worker_program = Some(program.into());
        self
    }

    pub fn image_size(mut self, px: u32) -> Self {
        self.config.image_size = px;
        self
    }

    pub fn max_ngram_length(mut self, n: usize) -> Self {
        self.config.max_ngram_length = n;
        self
    }

    pub fn pdf_dpi(mut self, dpi: u32) -> Self {
        self.config.pdf_dpi = dpi.clamp(72, 400);
        self
    }

    pub fn fields(mut self, fields: FieldVocabulary) -> Self {
        self.config.fields = fields;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PrepareConfig, PrepareError> {
        let c = &self.config;
        if !(0.0..=1.0).contains(&c.val_size) {
            return Err(PrepareError::InvalidConfig(format!(
                "val_size must be within 0.0–1.0, got {}",
                c.val_size
            )));
        }
        if c.cores == 0 {
            return Err(PrepareError::InvalidConfig("cores must be ≥ 1".into()));
        }
        if c.image_size == 0 {
            return Err(PrepareError::InvalidConfig("image_size must be ≥ 1".into()));
        }
        if c.max_ngram_length == 0 {
            return Err(PrepareError::InvalidConfig(
                "max_ngram_length must be ≥ 1".into(),
            ));
        }
        if c.fields.is_empty() {
            return Err(PrepareError::InvalidConfig(
                "field vocabulary is empty".into(),
            ));
        }
        if c.isolation == Isolation::Process && c.worker_program.is_none() {
            return Err(PrepareError::InvalidConfig(
                "process isolation needs a worker program; set one with \
                 `worker_program` or use `Isolation::Thread`"
                    .into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Supported OCR engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OcrBackend {
    /// Tesseract via `leptess` (requires the `tesseract` feature).
    #[default]
    Tesseract,
    /// Pre-computed tokens read from `X.ocr.json` next to each document.
    Sidecar,
}

impl OcrBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            OcrBackend::Tesseract => "tesseract",
            OcrBackend::Sidecar => "sidecar",
        }
    }
}

impl fmt::Display for OcrBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OcrBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tesseract" => Ok(OcrBackend::Tesseract),
            "sidecar" => Ok(OcrBackend::Sidecar),
            other => Err(format!("unknown OCR engine '{other}'")),
        }
    }
}

/// How a document's pipeline is isolated from the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Isolation {
    /// Blocking threads inside the orchestrating process.
    #[default]
    Thread,
    /// One child process of [`PrepareConfig::worker_program`] per document;
    /// a crash only loses that document.
    Process,
}
