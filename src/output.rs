//! Data produced and consumed by the preparation pipeline.
//!
//! [`TrainingExample`] is the on-disk JSON contract with the downstream
//! training code; its serde attributes fix the field names (`nGrams`,
//! `filename`, …) and must not drift.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

// ── Phases ───────────────────────────────────────────────────────────────

/// Corpus partition a document is written into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Train,
    Val,
    Test,
}

impl Phase {
    /// Processing order of the batch run.
    pub const ALL: [Phase; 3] = [Phase::Train, Phase::Val, Phase::Test];

    /// Directory name under `out_dir`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Train => "train",
            Phase::Val => "val",
            Phase::Test => "test",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "train" => Ok(Phase::Train),
            "val" => Ok(Phase::Val),
            "test" => Ok(Phase::Test),
            other => Err(format!("unknown phase '{other}' (expected train, val or test)")),
        }
    }
}

// ── OCR input ────────────────────────────────────────────────────────────

/// Axis-aligned box in source-image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelBox {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelBox {
    pub fn right(&self) -> u32 {
        self.left.saturating_add(self.width)
    }

    pub fn bottom(&self) -> u32 {
        self.top.saturating_add(self.height)
    }
}

/// One word recognised by the OCR engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OcrToken {
    pub text: String,
    #[serde(flatten)]
    pub bbox: PixelBox,
    /// Reading-order line id; n-grams never span two lines.
    #[serde(default)]
    pub line: u32,
}

// ── Output ───────────────────────────────────────────────────────────────

/// Box in output-image pixel units, always within `[0, image_size]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

/// A candidate phrase: one or more consecutive OCR tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NGram {
    pub text: String,
    pub bbox: BoundingBox,
    /// Field-type name → normalised candidate value. Empty when no
    /// recogniser accepted the text.
    pub parses: BTreeMap<String, String>,
}

/// Every vocabulary field mapped to its (normalised) label value.
pub type FieldRecord = BTreeMap<String, String>;

/// One finished training example, serialised next to its image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingExample {
    pub fields: FieldRecord,
    #[serde(rename = "nGrams")]
    pub ngrams: Vec<NGram>,
    pub height: u32,
    pub width: u32,
    /// Absolute path of the resized image this example describes.
    pub filename: PathBuf,
}

// ── Reports ──────────────────────────────────────────────────────────────

/// Outcome of one phase of the batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseReport {
    pub phase: Phase,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Failed documents in completion order.
    pub failed_documents: Vec<PathBuf>,
    pub duration_ms: u64,
}

/// Outcome of a whole run, one report per phase in processing order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunReport {
    pub discovered: usize,
    pub phases: Vec<PhaseReport>,
}

impl RunReport {
    pub fn succeeded(&self) -> usize {
        self.phases.iter().map(|p| p.succeeded).sum()
    }

    pub fn failed(&self) -> usize {
        self.phases.iter().map(|p| p.failed).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_parse_and_display() {
        for p in Phase::ALL {
            assert_eq!(p.as_str().parse::<Phase>().unwrap(), p);
        }
        assert_eq!("VAL".parse::<Phase>().unwrap(), Phase::Val);
        assert!("dev".parse::<Phase>().is_err());
    }

    #[test]
    fn token_reads_flat_json_with_default_line() {
        let t: OcrToken =
            serde_json::from_str(r#"{"text":"Total","left":10,"top":20,"width":30,"height":8}"#)
                .unwrap();
        assert_eq!(t.bbox.right(), 40);
        assert_eq!(t.bbox.bottom(), 28);
        assert_eq!(t.line, 0);
    }

    #[test]
    fn example_json_uses_ngrams_key() {
        let ex = TrainingExample {
            fields: FieldRecord::from([("total".to_string(), String::new())]),
            ngrams: vec![NGram {
                text: "12.00".into(),
                bbox: BoundingBox {
                    left: 1.0,
                    top: 2.0,
                    right: 3.0,
                    bottom: 4.0,
                },
                parses: BTreeMap::from([("amount".to_string(), "12.00".to_string())]),
            }],
            height: 128,
            width: 128,
            filename: PathBuf::from("/out/train/a.jpg"),
        };
        let v = serde_json::to_value(&ex).unwrap();
        assert!(v.get("nGrams").is_some());
        assert_eq!(v["nGrams"][0]["parses"]["amount"], "12.00");
        assert_eq!(v["fields"]["total"], "");
        assert_eq!(v["filename"], "/out/train/a.jpg");
    }
}
