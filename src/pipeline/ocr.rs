//! OCR engines: rasterised page in, positioned word tokens out.
//!
//! The recognition itself is an external collaborator. This module only
//! defines the seam ([`OcrEngine`]) and adapts the supported backends to it:
//!
//! | Backend     | Source of tokens                                        |
//! |-------------|---------------------------------------------------------|
//! | `tesseract` | Tesseract via `leptess` (feature `tesseract`)           |
//! | `sidecar`   | `X.ocr.json` next to document `X.ext`, pre-computed OCR |

use crate::config::{OcrBackend, PrepareConfig};
use crate::error::PrepareError;
use crate::output::{OcrToken, PixelBox};
use crate::pipeline::rasterize::PageImage;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Turns a page image into word tokens in source-pixel coordinates.
///
/// Errors are plain strings; the pipeline wraps them into
/// [`crate::error::DocumentError::Ocr`] with the document path.
pub trait OcrEngine: Send + Sync {
    fn name(&self) -> &'static str;

    fn recognize(&self, document: &Path, page: &PageImage) -> Result<Vec<OcrToken>, String>;
}

/// Instantiate the backend selected in `config`.
pub fn build_engine(config: &PrepareConfig) -> Result<Box<dyn OcrEngine>, PrepareError> {
    match config.ocr_backend {
        OcrBackend::Sidecar => Ok(Box::new(SidecarEngine)),
        OcrBackend::Tesseract => tesseract_engine(&config.tesseract_language),
    }
}

#[cfg(feature = "tesseract")]
fn tesseract_engine(language: &str) -> Result<Box<dyn OcrEngine>, PrepareError> {
    Ok(Box::new(tesseract::TesseractEngine::new(language)?))
}

#[cfg(not(feature = "tesseract"))]
fn tesseract_engine(_language: &str) -> Result<Box<dyn OcrEngine>, PrepareError> {
    Err(PrepareError::OcrUnavailable {
        backend: OcrBackend::Tesseract.to_string(),
        detail: "this build was compiled without the `tesseract` feature; \
                 rebuild with `--features tesseract` or use `--ocr_engine sidecar`"
            .into(),
    })
}

// ── Sidecar ──────────────────────────────────────────────────────────────

/// Reads tokens produced ahead of time by any OCR tool.
#[derive(Debug, Default)]
pub struct SidecarEngine;

/// `invoices/a.pdf` → `invoices/a.ocr.json`.
pub fn sidecar_path(document: &Path) -> PathBuf {
    document.with_extension("ocr.json")
}

impl OcrEngine for SidecarEngine {
    fn name(&self) -> &'static str {
        "sidecar"
    }

    fn recognize(&self, document: &Path, _page: &PageImage) -> Result<Vec<OcrToken>, String> {
        let path = sidecar_path(document);
        let raw = std::fs::read_to_string(&path)
            .map_err(|e| format!("cannot read '{}': {e}", path.display()))?;
        let raw: Vec<SidecarToken> = serde_json::from_str(&raw)
            .map_err(|e| format!("malformed '{}': {e}", path.display()))?;

        let has_lines = raw.iter().any(|t| t.line.is_some());
        let mut tokens: Vec<OcrToken> = raw
            .into_iter()
            .map(|t| OcrToken {
                text: t.text,
                bbox: t.bbox,
                line: t.line.unwrap_or(0),
            })
            .collect();
        if !has_lines {
            assign_lines(&mut tokens);
        }
        debug!("Loaded {} sidecar tokens from {}", tokens.len(), path.display());
        Ok(tokens)
    }
}

/// Sidecar entry; `line` is inferred from geometry when no entry has one.
#[derive(Deserialize)]
struct SidecarToken {
    text: String,
    #[serde(flatten)]
    bbox: PixelBox,
    #[serde(default)]
    line: Option<u32>,
}

// ── Line assignment ──────────────────────────────────────────────────────

/// Number reading-order tokens into lines.
///
/// A new line starts when a word begins left of its predecessor or its top
/// edge is below the predecessor's bottom edge.
pub fn assign_lines(tokens: &mut [OcrToken]) {
    let mut line = 0u32;
    for i in 0..tokens.len() {
        if i > 0 {
            let prev = tokens[i - 1].bbox;
            let cur = tokens[i].bbox;
            if cur.left < prev.left || cur.top >= prev.bottom() {
                line += 1;
            }
        }
        tokens[i].line = line;
    }
}

// ── Tesseract ────────────────────────────────────────────────────────────

#[cfg(feature = "tesseract")]
mod tesseract {
    use super::{assign_lines, OcrEngine};
    use crate::error::PrepareError;
    use crate::output::{OcrToken, PixelBox};
    use crate::pipeline::rasterize::PageImage;
    use leptess::LepTess;
    use std::path::Path;
    use tracing::debug;

    /// Tesseract word-level recognition.
    ///
    /// `LepTess` is not `Send`, so a fresh instance is created per page.
    pub struct TesseractEngine {
        language: String,
    }

    impl TesseractEngine {
        pub fn new(language: &str) -> Result<Self, PrepareError> {
            LepTess::new(None, language).map_err(|e| PrepareError::OcrUnavailable {
                backend: "tesseract".into(),
                detail: format!(
                    "failed to initialise with language '{language}': {e}. \
                     Make sure the language data is installed."
                ),
            })?;
            Ok(Self {
                language: language.to_string(),
            })
        }
    }

    impl OcrEngine for TesseractEngine {
        fn name(&self) -> &'static str {
            "tesseract"
        }

        fn recognize(&self, _document: &Path, page: &PageImage) -> Result<Vec<OcrToken>, String> {
            let mut lt = LepTess::new(None, &self.language).map_err(|e| e.to_string())?;

            let mut png = std::io::Cursor::new(Vec::new());
            page.image
                .to_rgb8()
                .write_to(&mut png, image::ImageFormat::Png)
                .map_err(|e| format!("failed to encode page for tesseract: {e}"))?;
            lt.set_image_from_mem(png.get_ref())
                .map_err(|e| format!("failed to hand page to tesseract: {e}"))?;

            // None means no text at all, not a failure.
            let boxes =
                match lt.get_component_boxes(leptess::capi::TessPageIteratorLevel_RIL_WORD, true) {
                    Some(boxes) => boxes,
                    None => return Ok(Vec::new()),
                };

            let mut tokens = Vec::new();
            for b in &boxes {
                let geom = b.get_geometry();
                lt.set_rectangle(geom.x, geom.y, geom.w, geom.h);
                let text = lt.get_utf8_text().unwrap_or_default().trim().to_string();
                if text.is_empty() {
                    continue;
                }
                tokens.push(OcrToken {
                    text,
                    bbox: PixelBox {
                        left: geom.x.max(0) as u32,
                        top: geom.y.max(0) as u32,
                        width: geom.w.max(0) as u32,
                        height: geom.h.max(0) as u32,
                    },
                    line: 0,
                });
            }
            assign_lines(&mut tokens);
            debug!("Tesseract recognised {} words", tokens.len());
            Ok(tokens)
        }
    }
}
