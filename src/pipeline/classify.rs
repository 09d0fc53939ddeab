//! File-type detection from content, never from the file name.
//!
//! Only the first [`SNIFF_LEN`] bytes are read. A file named `scan.pdf` that
//! actually holds a ZIP archive is [`FileKind::Unsupported`].

use crate::error::DocumentError;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Bytes read from the head of a file for magic-number detection.
const SNIFF_LEN: usize = 8192;

/// What a document's content turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    /// A raster format the decoder is built for (PNG or JPEG).
    Image,
    /// Anything else; carries the detected MIME type when known.
    Unsupported(Option<String>),
}

/// Classify a byte prefix.
pub fn classify_bytes(bytes: &[u8]) -> FileKind {
    match infer::get(bytes).map(|t| t.mime_type()) {
        Some("application/pdf") => FileKind::Pdf,
        Some("image/jpeg") | Some("image/png") => FileKind::Image,
        Some(other) => FileKind::Unsupported(Some(other.to_string())),
        None => FileKind::Unsupported(None),
    }
}

/// Classify the file at `path` by its leading bytes.
pub fn classify_file(path: &Path) -> Result<FileKind, DocumentError> {
    let io_err = |source| DocumentError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = std::fs::File::open(path).map_err(io_err)?;
    let mut head = Vec::with_capacity(SNIFF_LEN);
    file.take(SNIFF_LEN as u64)
        .read_to_end(&mut head)
        .map_err(io_err)?;

    let kind = classify_bytes(&head);
    debug!("Classified {} as {:?}", path.display(), kind);
    Ok(kind)
}

/// Classify and reject anything the rasteriser cannot handle.
pub fn require_supported(path: &Path) -> Result<FileKind, DocumentError> {
    match classify_file(path)? {
        FileKind::Unsupported(detected) => Err(DocumentError::UnsupportedFileType {
            path: path.to_path_buf(),
            detected,
        }),
        kind => Ok(kind),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

    #[test]
    fn detects_pdf_by_magic() {
        assert_eq!(classify_bytes(b"%PDF-1.7\n%\xe2\xe3\xcf\xd3\n"), FileKind::Pdf);
    }

    #[test]
    fn detects_png_and_jpeg() {
        assert_eq!(classify_bytes(PNG_MAGIC), FileKind::Image);
        assert_eq!(
            classify_bytes(&[0xFF, 0xD8, 0xFF, 0xE0, 0, 0x10, b'J', b'F', b'I', b'F']),
            FileKind::Image
        );
    }

    #[test]
    fn other_formats_are_unsupported() {
        // ZIP local file header
        let kind = classify_bytes(&[b'P', b'K', 0x03, 0x04, 0, 0, 0, 0]);
        assert_eq!(kind, FileKind::Unsupported(Some("application/zip".into())));
        assert_eq!(classify_bytes(b"just some text"), FileKind::Unsupported(None));
        assert_eq!(classify_bytes(b""), FileKind::Unsupported(None));
    }

    #[test]
    fn extension_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("invoice.pdf");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(PNG_MAGIC)
            .unwrap();
        assert_eq!(classify_file(&path).unwrap(), FileKind::Image);

        let txt = dir.path().join("notes.png");
        std::fs::write(&txt, "hello").unwrap();
        let err = require_supported(&txt).unwrap_err();
        assert_eq!(err.kind(), "unsupported_file_type");
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = classify_file(Path::new("/definitely/not/here.pdf")).unwrap_err();
        assert_eq!(err.kind(), "io");
    }
}
