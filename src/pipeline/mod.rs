//! Per-document pipeline stages for invoice-to-example conversion.
//!
//! Each submodule implements exactly one transformation step; [`Pipeline`]
//! chains them for a single document.
//!
//! ## Data Flow
//!
//! ```text
//! classify ──▶ rasterize ──▶ ocr ──▶ ngram ──▶ labels ──▶ writer
//! (magic)      (pdfium/img)  (ext.)  (+normalize)  (+normalize)  (jpg+json)
//! ```
//!
//! 1. [`classify`]  — content sniffing into `{Pdf, Image, Unsupported}`
//! 2. [`rasterize`] — first PDF page or the image itself, native resolution
//! 3. [`ocr`]       — external engine seam, word tokens in source pixels
//! 4. [`ngram`]     — overlapping candidate phrases with output-space boxes
//! 5. [`labels`]    — label file joined onto the field vocabulary
//! 6. [`writer`]    — square JPEG + example JSON in the phase directory
//!
//! [`normalize`] is shared by stages 4 and 5.

pub mod classify;
pub mod labels;
pub mod ngram;
pub mod normalize;
pub mod ocr;
pub mod rasterize;
pub mod writer;

use crate::config::PrepareConfig;
use crate::error::{DocumentError, PrepareError};
use crate::fields::FieldVocabulary;
use crate::output::{Phase, TrainingExample};
use ngram::{NgramBuilder, ScaleFactors};
use ocr::OcrEngine;
use std::path::PathBuf;
use tracing::{debug, info_span};
use writer::{DatasetWriter, OutputLayout};

/// One unit of work: a document and the phase it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentJob {
    pub path: PathBuf,
    pub phase: Phase,
}

/// Everything needed to turn one document into one training example.
pub struct Pipeline {
    engine: Box<dyn OcrEngine>,
    writer: DatasetWriter,
    fields: FieldVocabulary,
    image_size: u32,
    max_ngram_length: usize,
    pdf_dpi: u32,
}

impl Pipeline {
    /// Assemble the pipeline for an already-created output tree.
    pub fn new(config: &PrepareConfig, layout: OutputLayout) -> Result<Self, PrepareError> {
        Ok(Self::with_engine(config, layout, ocr::build_engine(config)?))
    }

    /// Assemble the pipeline around a caller-supplied OCR engine.
    pub fn with_engine(
        config: &PrepareConfig,
        layout: OutputLayout,
        engine: Box<dyn OcrEngine>,
    ) -> Self {
        Self {
            engine,
            writer: DatasetWriter::new(layout, config.image_size),
            fields: config.fields.clone(),
            image_size: config.image_size,
            max_ngram_length: config.max_ngram_length,
            pdf_dpi: config.pdf_dpi,
        }
    }

    /// Run every stage for `job`.
    ///
    /// Artifacts are written only after all earlier stages succeeded, so a
    /// failed document leaves nothing behind in the output tree.
    pub fn process_document(&self, job: &DocumentJob) -> Result<TrainingExample, DocumentError> {
        let span = info_span!("document", path = %job.path.display(), phase = %job.phase);
        let _guard = span.enter();
        let path = job.path.as_path();

        let kind = classify::require_supported(path)?;
        let page = rasterize::rasterize(path, &kind, self.pdf_dpi)?;

        let tokens = self
            .engine
            .recognize(path, &page)
            .map_err(|detail| DocumentError::Ocr {
                path: path.to_path_buf(),
                detail,
            })?;
        debug!("{} recognised {} tokens", self.engine.name(), tokens.len());

        let scale = ScaleFactors::new(page.width(), page.height(), self.image_size);
        let ngrams = NgramBuilder::new(scale, self.image_size, self.max_ngram_length).build(&tokens);

        let labels = labels::read_labels(path)?;
        let fields = labels::join_labels(&labels, &self.fields);

        self.writer.write(path, job.phase, &page, fields, ngrams)
    }

    pub fn engine_name(&self) -> &'static str {
        self.engine.name()
    }
}
