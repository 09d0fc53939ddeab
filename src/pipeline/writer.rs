//! Output corpus layout and per-document artifact writing.
//!
//! ```text
//! out_dir/
//!   train/<stem>.jpg   train/<stem>.json
//!   val/…              test/…
//! ```
//!
//! Each document writes only files derived from its own stem, so workers in
//! one phase never touch the same path and need no locking.

use crate::error::{DocumentError, PrepareError};
use crate::output::{FieldRecord, NGram, Phase, TrainingExample};
use crate::pipeline::rasterize::PageImage;
use image::imageops::FilterType;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// The output tree; `root` is absolute once [`OutputLayout::create`] returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    /// Create `out_dir/{train,val,test}` and resolve `out_dir` to an absolute path.
    pub fn create(out_dir: &Path) -> Result<Self, PrepareError> {
        for phase in Phase::ALL {
            let dir = out_dir.join(phase.as_str());
            std::fs::create_dir_all(&dir)
                .map_err(|e| PrepareError::OutputDirCreation { path: dir, source: e })?;
        }
        let root = std::fs::canonicalize(out_dir).map_err(|e| PrepareError::OutputDirCreation {
            path: out_dir.to_path_buf(),
            source: e,
        })?;
        Ok(Self { root })
    }

    /// Use an existing tree without touching the file system.
    pub fn existing(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn phase_dir(&self, phase: Phase) -> PathBuf {
        self.root.join(phase.as_str())
    }

    /// `(image, json)` paths for `document` in `phase`.
    pub fn artifact_paths(&self, phase: Phase, document: &Path) -> (PathBuf, PathBuf) {
        let stem = document
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        let dir = self.phase_dir(phase);
        (dir.join(format!("{stem}.jpg")), dir.join(format!("{stem}.json")))
    }
}

/// Writes finished examples at a fixed square resolution.
#[derive(Debug, Clone)]
pub struct DatasetWriter {
    layout: OutputLayout,
    image_size: u32,
}

impl DatasetWriter {
    pub fn new(layout: OutputLayout, image_size: u32) -> Self {
        Self { layout, image_size }
    }

    /// Resize and save the page, then write the example JSON.
    ///
    /// The JSON goes through a temp file in the same directory and is renamed
    /// into place, so a reader never sees a half-written example.
    pub fn write(
        &self,
        document: &Path,
        phase: Phase,
        page: &PageImage,
        fields: FieldRecord,
        ngrams: Vec<NGram>,
    ) -> Result<TrainingExample, DocumentError> {
        let (image_path, json_path) = self.layout.artifact_paths(phase, document);

        let resized = page
            .image
            .resize_exact(self.image_size, self.image_size, FilterType::Triangle)
            .to_rgb8();
        resized
            .save_with_format(&image_path, image::ImageFormat::Jpeg)
            .map_err(|e| DocumentError::Write {
                path: image_path.clone(),
                source: image_error_to_io(e),
            })?;

        let example = TrainingExample {
            fields,
            ngrams,
            height: self.image_size,
            width: self.image_size,
            filename: image_path,
        };
        write_json_atomic(&json_path, &example)?;

        debug!(
            "Wrote {} ({} n-grams)",
            json_path.display(),
            example.ngrams.len()
        );
        Ok(example)
    }
}

fn write_json_atomic(path: &Path, example: &TrainingExample) -> Result<(), DocumentError> {
    let write_err = |source: std::io::Error| DocumentError::Write {
        path: path.to_path_buf(),
        source,
    };
    let json = serde_json::to_string_pretty(example).map_err(|e| write_err(e.into()))?;

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(json.as_bytes()).map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}

fn image_error_to_io(e: image::ImageError) -> std::io::Error {
    match e {
        image::ImageError::IoError(io) => io,
        other => std::io::Error::other(other.to_string()),
    }
}
