//! Candidate phrase ("n-gram") construction from OCR tokens.
//!
//! Every window of 1..=`max_len` consecutive tokens on the same line becomes
//! one [`NGram`]. Windows overlap and are never deduplicated; the model is
//! trained on the redundant candidate set.
//!
//! Geometry is mapped from source pixels into the square output image by
//! dividing by [`ScaleFactors`]. Both factors are taken against the output
//! *height*; with a square output this is the same as using the width.

use crate::fields::FieldType;
use crate::output::{BoundingBox, NGram, OcrToken};
use crate::pipeline::normalize::{normalize_amount, normalize_date};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

static RE_AMOUNT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:[$€£¥]|USD|EUR|GBP)?\s*\(?-?(?:\d{1,3}(?:,\d{3})+|\d+)(?:\.\d{1,2})?\)?\s*(?:[$€£¥]|USD|EUR|GBP)?$",
    )
    .unwrap()
});

/// Source-to-output divisors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleFactors {
    pub height_ratio: f32,
    pub width_ratio: f32,
}

impl ScaleFactors {
    /// `native / desired_height` for both axes.
    pub fn new(native_width: u32, native_height: u32, desired_height: u32) -> Self {
        let desired = desired_height.max(1) as f32;
        Self {
            height_ratio: native_height.max(1) as f32 / desired,
            width_ratio: native_width.max(1) as f32 / desired,
        }
    }
}

/// Builds n-grams for one page.
#[derive(Debug, Clone)]
pub struct NgramBuilder {
    scale: ScaleFactors,
    image_size: u32,
    max_len: usize,
}

impl NgramBuilder {
    pub fn new(scale: ScaleFactors, image_size: u32, max_len: usize) -> Self {
        Self {
            scale,
            image_size,
            max_len: max_len.max(1),
        }
    }

    /// Emit all windows, ordered by window length and then start position.
    pub fn build(&self, tokens: &[OcrToken]) -> Vec<NGram> {
        let tokens: Vec<&OcrToken> = tokens.iter().filter(|t| !t.text.trim().is_empty()).collect();
        let mut ngrams = Vec::new();

        for len in 1..=self.max_len.min(tokens.len()) {
            for window in tokens.windows(len) {
                let line = window[0].line;
                if window.iter().any(|t| t.line != line) {
                    continue;
                }
                ngrams.push(self.make_ngram(window));
            }
        }
        ngrams
    }

    fn make_ngram(&self, window: &[&OcrToken]) -> NGram {
        let text = window
            .iter()
            .map(|t| t.text.trim())
            .collect::<Vec<_>>()
            .join(" ");

        let left = window.iter().map(|t| t.bbox.left).min().unwrap_or(0);
        let top = window.iter().map(|t| t.bbox.top).min().unwrap_or(0);
        let right = window.iter().map(|t| t.bbox.right()).max().unwrap_or(0);
        let bottom = window.iter().map(|t| t.bbox.bottom()).max().unwrap_or(0);

        let bbox = BoundingBox {
            left: self.clamp(left as f32 / self.scale.width_ratio),
            top: self.clamp(top as f32 / self.scale.height_ratio),
            right: self.clamp(right as f32 / self.scale.width_ratio),
            bottom: self.clamp(bottom as f32 / self.scale.height_ratio),
        };

        let parses = candidate_parses(&text);
        NGram { text, bbox, parses }
    }

    fn clamp(&self, v: f32) -> f32 {
        v.clamp(0.0, self.image_size as f32)
    }
}

/// Run every recogniser over `text`; each one that accepts contributes its
/// normalised value.
pub fn candidate_parses(text: &str) -> BTreeMap<String, String> {
    let mut parses = BTreeMap::new();
    if RE_AMOUNT.is_match(text.trim()) {
        if let Ok(v) = normalize_amount(text) {
            parses.insert(FieldType::Amount.as_str().to_string(), v);
        }
    }
    if let Ok(v) = normalize_date(text) {
        parses.insert(FieldType::Date.as_str().to_string(), v);
    }
    parses
}
