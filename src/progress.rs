//! Progress-callback trait for per-document batch events.
//!
//! Inject an [`Arc<dyn PhaseProgress>`] into
//! [`crate::orchestrate::Orchestrator::with_progress`] to receive events as
//! each phase is processed.
//!
//! All events are emitted by the orchestrator's single aggregator task, which
//! consumes the worker completion channel. Implementations therefore see
//! events one at a time and in completion order, never concurrently.
//!
//! # Example
//!
//! ```rust
//! use invoice_prep::{Phase, PhaseProgress};
//! use std::path::Path;
//! use std::sync::Mutex;
//!
//! struct Log(Mutex<Vec<String>>);
//!
//! impl PhaseProgress for Log {
//!     fn on_document_complete(&self, phase: Phase, document: &Path, success: bool, done: usize, total: usize) {
//!         self.0.lock().unwrap().push(format!("{phase} {done}/{total} {} {success}", document.display()));
//!     }
//! }
//! ```

use crate::output::{Phase, PhaseReport};
use std::path::Path;
use std::sync::Arc;

/// Called by the orchestrator as it works through each phase.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait PhaseProgress: Send + Sync {
    /// Called once before any document of `phase` is dispatched.
    fn on_phase_start(&self, phase: Phase, total: usize) {
        let _ = (phase, total);
    }

    /// Called once per finished document, success or failure.
    ///
    /// # Arguments
    /// * `done`  — documents finished so far in this phase, including this one
    /// * `total` — documents in this phase
    fn on_document_complete(
        &self,
        phase: Phase,
        document: &Path,
        success: bool,
        done: usize,
        total: usize,
    ) {
        let _ = (phase, document, success, done, total);
    }

    /// Called once after every document of the phase has finished.
    fn on_phase_complete(&self, report: &PhaseReport) {
        let _ = report;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgress;

impl PhaseProgress for NoopProgress {}

/// Convenience alias for the shared callback handle.
pub type ProgressCallback = Arc<dyn PhaseProgress>;
