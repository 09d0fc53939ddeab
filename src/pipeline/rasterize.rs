//! Rasterisation: turn a classified document into a single [`PageImage`].
//!
//! PDFs contribute only their first page; later pages are ignored so every
//! document yields exactly one example. Images are decoded as-is.
//!
//! pdfium keeps thread-local state and is not async-safe. Callers run this
//! module on a blocking thread (or in a worker process), never on a Tokio
//! worker thread.

use crate::error::DocumentError;
use crate::pipeline::classify::FileKind;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::{debug, info};

/// Upper bound on either rendered dimension, whatever the page size.
const MAX_RENDERED_PIXELS: i32 = 6000;

/// A decoded page at its native resolution.
#[derive(Debug, Clone)]
pub struct PageImage {
    pub image: DynamicImage,
}

impl PageImage {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Rasterise `path` according to its detected kind.
pub fn rasterize(path: &Path, kind: &FileKind, dpi: u32) -> Result<PageImage, DocumentError> {
    let image = match kind {
        FileKind::Pdf => render_first_page(path, dpi)?,
        FileKind::Image => load_image(path)?,
        FileKind::Unsupported(detected) => {
            return Err(DocumentError::UnsupportedFileType {
                path: path.to_path_buf(),
                detected: detected.clone(),
            })
        }
    };
    debug!(
        "Rasterised {} → {}x{} px",
        path.display(),
        image.width(),
        image.height()
    );
    Ok(PageImage { image })
}

/// Decode a PNG/JPEG file, letting the content pick the decoder.
fn load_image(path: &Path) -> Result<DynamicImage, DocumentError> {
    let bytes = std::fs::read(path).map_err(|e| DocumentError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    image::load_from_memory(&bytes).map_err(|e| DocumentError::Decode {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })
}

/// Bind to a pdfium shared library: the system one first, then one sitting
/// in the working directory.
pub fn bind_pdfium() -> Result<Pdfium, String> {
    let bindings = Pdfium::bind_to_system_library()
        .or_else(|_| Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./")))
        .map_err(|e| format!("{:?}", e))?;
    Ok(Pdfium::new(bindings))
}

/// Render page 1 of a PDF at `dpi`.
fn render_first_page(pdf_path: &Path, dpi: u32) -> Result<DynamicImage, DocumentError> {
    let decode_err = |detail: String| DocumentError::Decode {
        path: pdf_path.to_path_buf(),
        detail,
    };

    let pdfium = bind_pdfium().map_err(|e| decode_err(format!("pdfium unavailable: {e}")))?;

    let document = pdfium
        .load_pdf_from_file(pdf_path, None)
        .map_err(|e| decode_err(format!("{:?}", e)))?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    if total_pages == 0 {
        return Err(decode_err("PDF has no pages".into()));
    }
    if total_pages > 1 {
        info!(
            "{}: {} pages, only the first is used",
            pdf_path.display(),
            total_pages
        );
    }

    let page = pages.get(0).map_err(|e| decode_err(format!("{:?}", e)))?;

    let render_config = PdfRenderConfig::new()
        .scale_page_by_factor(dpi as f32 / 72.0)
        .set_maximum_width(MAX_RENDERED_PIXELS)
        .set_maximum_height(MAX_RENDERED_PIXELS);

    let bitmap = page
        .render_with_config(&render_config)
        .map_err(|e| decode_err(format!("{:?}", e)))?;

    Ok(bitmap.as_image())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn loads_png_with_native_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.png");
        RgbImage::from_pixel(300, 200, Rgb([255, 255, 255]))
            .save(&path)
            .unwrap();

        let page = rasterize(&path, &FileKind::Image, 200).unwrap();
        assert_eq!((page.width(), page.height()), (300, 200));
    }

    #[test]
    fn truncated_image_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]).unwrap();

        let err = rasterize(&path, &FileKind::Image, 200).unwrap_err();
        assert_eq!(err.kind(), "decode");
    }

    #[test]
    fn unsupported_kind_is_rejected() {
        let err = rasterize(
            Path::new("whatever.bin"),
            &FileKind::Unsupported(None),
            200,
        )
        .unwrap_err();
        assert_eq!(err.kind(), "unsupported_file_type");
    }

    /// Skip the current test when no pdfium library can be bound.
    macro_rules! pdfium_or_skip {
        () => {
            match bind_pdfium() {
                Ok(pdfium) => pdfium,
                Err(e) => {
                    println!("SKIP — pdfium library not found: {e}");
                    return;
                }
            }
        };
    }

    /// Blank pages of the given sizes, in points.
    fn write_pdf(pdfium: &Pdfium, path: &Path, pages: &[(f32, f32)]) {
        let mut document = pdfium.create_new_pdf().unwrap();
        for &(width, height) in pages {
            document
                .pages_mut()
                .create_page_at_end(PdfPagePaperSize::Custom(
                    PdfPoints::new(width),
                    PdfPoints::new(height),
                ))
                .unwrap();
        }
        document.save_to_file(path).unwrap();
    }

    #[test]
    fn pdf_renders_first_page_at_dpi() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("two_pages.pdf");
        {
            let pdfium = pdfium_or_skip!();
            write_pdf(&pdfium, &path, &[(200.0, 100.0), (300.0, 300.0)]);
        }

        // 144 dpi is twice the 72 points per inch of the page box.
        let page = rasterize(&path, &FileKind::Pdf, 144).unwrap();
        assert_eq!((page.width(), page.height()), (400, 200));

        let page = rasterize(&path, &FileKind::Pdf, 72).unwrap();
        assert_eq!((page.width(), page.height()), (200, 100));
    }

    #[test]
    fn corrupt_pdf_is_decode_error() {
        // Either pdfium is missing or it refuses the bytes: both are decode errors.
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.pdf");
        std::fs::write(&path, b"%PDF-1.4\nnot really a pdf").unwrap();

        let err = rasterize(&path, &FileKind::Pdf, 72).unwrap_err();
        assert_eq!(err.kind(), "decode");
    }
}
