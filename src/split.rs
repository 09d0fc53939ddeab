//! Document discovery and the positional train/val/test partition.
//!
//! The partition is not randomised: `test` is the first 5% of discovery
//! order, `val` the first `val_size` of what remains, `train` the rest. Runs
//! are reproducible only as long as the file system lists files in the same
//! order.

use crate::config::TEST_FRACTION;
use crate::error::PrepareError;
use crate::output::Phase;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Document extensions searched for, in discovery order.
pub const DOCUMENT_EXTENSIONS: &[&str] = &["pdf", "png", "jpeg", "jpg"];

/// Three disjoint subsets that together cover every discovered document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Corpus {
    pub train: Vec<PathBuf>,
    pub val: Vec<PathBuf>,
    pub test: Vec<PathBuf>,
}

impl Corpus {
    pub fn phase(&self, phase: Phase) -> &[PathBuf] {
        match phase {
            Phase::Train => &self.train,
            Phase::Val => &self.val,
            Phase::Test => &self.test,
        }
    }

    pub fn len(&self) -> usize {
        self.train.len() + self.val.len() + self.test.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Recursively list documents under `data_dir`, one extension at a time in
/// [`DOCUMENT_EXTENSIONS`] order. Returned paths are absolute.
pub fn discover_documents(data_dir: &Path) -> Result<Vec<PathBuf>, PrepareError> {
    if !data_dir.is_dir() {
        return Err(PrepareError::DataDirNotFound {
            path: data_dir.to_path_buf(),
        });
    }
    let root = std::fs::canonicalize(data_dir)
        .map_err(|e| PrepareError::Discovery(format!("{}: {e}", data_dir.display())))?;
    let escaped = glob::Pattern::escape(&root.to_string_lossy());

    let mut documents = Vec::new();
    for ext in DOCUMENT_EXTENSIONS {
        let pattern = format!("{escaped}/**/*.{ext}");
        let paths = glob::glob(&pattern).map_err(|e| PrepareError::Discovery(e.to_string()))?;
        for entry in paths {
            match entry {
                Ok(path) if path.is_file() => documents.push(path),
                Ok(_) => {}
                Err(e) => debug!("Skipping unreadable path during discovery: {}", e),
            }
        }
    }
    info!("Discovered {} documents under {}", documents.len(), root.display());
    Ok(documents)
}

/// Partition `documents` positionally.
///
/// `val_size` must already be validated to lie within `[0, 1]`.
pub fn split_documents(documents: Vec<PathBuf>, val_size: f64) -> Corpus {
    let test_len = (documents.len() as f64 * TEST_FRACTION) as usize;
    let mut rest = documents;
    let remainder = rest.split_off(test_len);
    let test = rest;

    let val_len = (remainder.len() as f64 * val_size) as usize;
    let mut val = remainder;
    let train = val.split_off(val_len);

    Corpus { train, val, test }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn docs(n: usize) -> Vec<PathBuf> {
        (0..n).map(|i| PathBuf::from(format!("/d/{i:04}.pdf"))).collect()
    }

    #[test]
    fn hundred_documents_split_5_19_76() {
        let corpus = split_documents(docs(100), 0.2);
        assert_eq!(corpus.test.len(), 5);
        assert_eq!(corpus.val.len(), 19);
        assert_eq!(corpus.train.len(), 76);
    }

    #[test]
    fn split_is_positional() {
        let all = docs(40);
        let corpus = split_documents(all.clone(), 0.25);
        // floor(40 * 0.05) = 2; floor(38 * 0.25) = 9
        assert_eq!(corpus.test, all[..2].to_vec());
        assert_eq!(corpus.val, all[2..11].to_vec());
        assert_eq!(corpus.train, all[11..].to_vec());
    }

    #[test]
    fn split_is_exhaustive_and_disjoint() {
        for n in [0, 1, 19, 20, 21, 57, 333] {
            for v in [0.0, 0.1, 0.2, 0.5, 1.0] {
                let all = docs(n);
                let corpus = split_documents(all.clone(), v);
                assert_eq!(corpus.len(), n);

                let mut seen = HashSet::new();
                for p in corpus.test.iter().chain(&corpus.val).chain(&corpus.train) {
                    assert!(seen.insert(p.clone()), "duplicate {p:?}");
                }
                assert_eq!(seen.len(), n);
                assert_eq!(corpus.test, all[..corpus.test.len()].to_vec());
            }
        }
    }

    #[test]
    fn small_lists_have_no_test_documents() {
        let corpus = split_documents(docs(19), 0.2);
        assert!(corpus.test.is_empty());
        assert_eq!(corpus.val.len(), 3);
    }

    #[test]
    fn discovery_orders_by_extension_and_ignores_others() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("nested/deeper");
        std::fs::create_dir_all(&sub).unwrap();
        for name in ["b.jpg", "a.png", "c.pdf", "labels.json", "notes.txt"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::write(sub.join("d.jpeg"), b"x").unwrap();

        let found = discover_documents(dir.path()).unwrap();
        let names: Vec<String> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["c.pdf", "a.png", "d.jpeg", "b.jpg"]);
        assert!(found.iter().all(|p| p.is_absolute()));
    }

    #[test]
    fn missing_data_dir_is_fatal() {
        let err = discover_documents(Path::new("/no/such/dir")).unwrap_err();
        assert!(matches!(err, PrepareError::DataDirNotFound { .. }));
    }
}
