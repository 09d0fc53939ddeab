//! Batch entry points and the bounded worker pool that drives each phase.
//!
//! ## Data Flow
//!
//! ```text
//! prepare_dataset
//!  ├─ 1. Layout    create out_dir/{train,val,test}     (fatal on failure)
//!  ├─ 2. Discover  glob data_dir per extension
//!  ├─ 3. Split     positional test / val / train
//!  └─ 4. Phases    train → val → test, one Orchestrator::run_phase each
//!
//! run_phase
//!   dispatcher ──permit──▶ spawn_blocking(executor.execute) ──┐
//!       │                                                     │ WorkerMessage::Completed
//!       └──────────── WorkerMessage::DispatchFinished ────────┤
//!                                                             ▼
//!                                         aggregator (PhaseState, progress, report)
//! ```
//!
//! At most `cores` documents run at once: the dispatcher holds a semaphore
//! permit for every unit in flight and waits for one to free up before
//! submitting the next. Workers never share mutable state; each one sends a
//! single completion message and the aggregator is the only place counters
//! change.

use crate::config::{Isolation, PrepareConfig};
use crate::error::{DocumentError, PrepareError};
use crate::fields::FieldVocabulary;
use crate::output::{Phase, PhaseReport, RunReport};
use crate::pipeline::writer::OutputLayout;
use crate::pipeline::{ocr, DocumentJob, Pipeline};
use crate::progress::{NoopProgress, ProgressCallback};
use crate::split;
use std::collections::HashSet;
use std::ffi::OsString;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, Semaphore};
use tracing::level_filters::LevelFilter;
use tracing::{debug, error, info, info_span, warn, Instrument, Span};

// ── Executors ────────────────────────────────────────────────────────────

/// Runs the full single-document pipeline for one job.
///
/// Implementations report only success or failure; diagnostics go to the
/// log. `execute` is always called from a blocking thread.
pub trait DocumentExecutor: Send + Sync {
    fn execute(&self, job: &DocumentJob) -> bool;
}

/// Runs the pipeline on a blocking thread of the orchestrating process.
pub struct InProcessExecutor {
    pipeline: Pipeline,
}

impl InProcessExecutor {
    pub fn new(pipeline: Pipeline) -> Self {
        Self { pipeline }
    }
}

impl DocumentExecutor for InProcessExecutor {
    fn execute(&self, job: &DocumentJob) -> bool {
        run_job(&self.pipeline, job)
    }
}

/// Process one job and turn its outcome into a success flag.
///
/// This is the pipeline boundary: a [`DocumentError`] is logged with its
/// whole source chain and never escapes.
pub fn run_job(pipeline: &Pipeline, job: &DocumentJob) -> bool {
    match pipeline.process_document(job) {
        Ok(example) => {
            debug!(
                "Processed {} → {}",
                job.path.display(),
                example.filename.display()
            );
            true
        }
        Err(e) => {
            error!(
                kind = e.kind(),
                "Skipping {}: {}",
                job.path.display(),
                error_chain(&e)
            );
            false
        }
    }
}

fn error_chain(e: &DocumentError) -> String {
    use std::error::Error as _;
    let mut out = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}

/// Runs each job in a fresh child process.
///
/// The child is invoked as `<program> <base_args…> --file <path> --phase <phase>`
/// and its exit status is the success flag. stderr is inherited so the
/// child's own log lines reach the terminal.
pub struct ProcessExecutor {
    program: PathBuf,
    base_args: Vec<OsString>,
    // Custom vocabularies are handed to workers through this file.
    _fields_file: Option<tempfile::NamedTempFile>,
}

impl ProcessExecutor {
    pub fn new(program: impl Into<PathBuf>, base_args: Vec<OsString>) -> Self {
        Self {
            program: program.into(),
            base_args,
            _fields_file: None,
        }
    }

    /// Start `program` in its hidden `worker` mode for every job of this run.
    pub fn for_worker(
        program: impl Into<PathBuf>,
        config: &PrepareConfig,
        layout: &OutputLayout,
    ) -> Result<Self, PrepareError> {
        let program = program.into();
        let fields_file = if config.fields == FieldVocabulary::default() {
            None
        } else {
            Some(write_vocabulary(&config.fields)?)
        };
        let args = worker_args(
            config,
            layout,
            fields_file.as_ref().map(|f| f.path()),
            LevelFilter::current(),
        );
        debug!("Worker command: {} {:?}", program.display(), args);

        Ok(Self {
            program,
            base_args: args,
            _fields_file: fields_file,
        })
    }
}

impl DocumentExecutor for ProcessExecutor {
    fn execute(&self, job: &DocumentJob) -> bool {
        let status = Command::new(&self.program)
            .args(&self.base_args)
            .arg("--file")
            .arg(&job.path)
            .arg("--phase")
            .arg(job.phase.as_str())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .status();

        match status {
            Ok(s) if s.success() => true,
            Ok(s) => {
                warn!("Worker for {} exited with {}", job.path.display(), s);
                false
            }
            Err(e) => {
                error!("Failed to spawn worker for {}: {}", job.path.display(), e);
                false
            }
        }
    }
}

/// Arguments shared by every worker invocation of one run.
pub fn worker_args(
    config: &PrepareConfig,
    layout: &OutputLayout,
    fields_file: Option<&Path>,
    log_level: LevelFilter,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "worker".into(),
        "--out_dir".into(),
        layout.root().as_os_str().to_owned(),
        "--ocr_engine".into(),
        config.ocr_backend.as_str().into(),
        "--tesseract_language".into(),
        config.tesseract_language.clone().into(),
        "--image_size".into(),
        config.image_size.to_string().into(),
        "--max_ngram_length".into(),
        config.max_ngram_length.to_string().into(),
        "--pdf_dpi".into(),
        config.pdf_dpi.to_string().into(),
        "--log_level".into(),
        log_level.to_string().to_lowercase().into(),
    ];
    if let Some(path) = fields_file {
        args.push("--fields".into());
        args.push(path.as_os_str().to_owned());
    }
    args
}

fn write_vocabulary(fields: &FieldVocabulary) -> Result<tempfile::NamedTempFile, PrepareError> {
    let map: serde_json::Map<String, serde_json::Value> = fields
        .iter()
        .map(|(name, ty)| (name.to_string(), ty.as_str().into()))
        .collect();
    let internal = |e: String| PrepareError::Internal(format!("Cannot hand vocabulary to workers: {e}"));

    let mut file = tempfile::Builder::new()
        .prefix("invoice-prep-fields-")
        .suffix(".json")
        .tempfile()
        .map_err(|e| internal(e.to_string()))?;
    let json = serde_json::to_vec(&map).map_err(|e| internal(e.to_string()))?;
    file.write_all(&json).map_err(|e| internal(e.to_string()))?;
    file.flush().map_err(|e| internal(e.to_string()))?;
    Ok(file)
}

// ── Phase state machine ──────────────────────────────────────────────────

/// Lifecycle of one phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseState {
    /// Nothing submitted yet.
    Idle,
    /// The dispatcher is still submitting documents.
    Dispatching,
    /// Every document is submitted; waiting for the rest to finish.
    Draining,
    /// Every submitted document has reported back.
    Done,
}

impl fmt::Display for PhaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PhaseState::Idle => "idle",
            PhaseState::Dispatching => "dispatching",
            PhaseState::Draining => "draining",
            PhaseState::Done => "done",
        };
        f.write_str(s)
    }
}

/// One finished unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub document: PathBuf,
    pub success: bool,
}

/// Messages consumed by the phase aggregator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerMessage {
    Completed(Completion),
    /// Sent once by the dispatcher after the last submission.
    DispatchFinished { submitted: usize },
}

// ── Orchestrator ─────────────────────────────────────────────────────────

/// Drives one executor over each phase with at most `cores` units in flight.
pub struct Orchestrator {
    executor: Arc<dyn DocumentExecutor>,
    cores: usize,
    progress: ProgressCallback,
}

impl Orchestrator {
    pub fn new(executor: Arc<dyn DocumentExecutor>, cores: usize) -> Self {
        Self {
            executor,
            cores: cores.max(1),
            progress: Arc::new(NoopProgress),
        }
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = progress;
        self
    }

    /// Process every document of `phase` and wait for all of them.
    ///
    /// Never fails: a document that errors, panics or crashes its worker is
    /// counted in [`PhaseReport::failed`] and the phase carries on.
    pub async fn run_phase(&self, phase: Phase, documents: &[PathBuf]) -> PhaseReport {
        let span = info_span!("phase", phase = %phase, documents = documents.len());
        self.run_phase_inner(phase, documents).instrument(span).await
    }

    async fn run_phase_inner(&self, phase: Phase, documents: &[PathBuf]) -> PhaseReport {
        let started = Instant::now();
        let total = documents.len();
        let mut state = PhaseState::Idle;
        info!("Processing {} documents for {}", total, phase);
        self.progress.on_phase_start(phase, total);

        let (tx, mut rx) = mpsc::unbounded_channel::<WorkerMessage>();
        let jobs: Vec<DocumentJob> = documents
            .iter()
            .map(|path| DocumentJob {
                path: path.clone(),
                phase,
            })
            .collect();
        let dispatcher = tokio::spawn(
            dispatch(jobs, Arc::clone(&self.executor), self.cores, tx).instrument(Span::current()),
        );
        transition(&mut state, PhaseState::Dispatching);

        let mut done = 0usize;
        let mut succeeded = 0usize;
        let mut failed_documents = Vec::new();
        let mut reported = HashSet::with_capacity(total);
        let mut submitted: Option<usize> = None;

        while let Some(message) = rx.recv().await {
            match message {
                WorkerMessage::Completed(Completion { document, success }) => {
                    done += 1;
                    reported.insert(document.clone());
                    if success {
                        succeeded += 1;
                    } else {
                        failed_documents.push(document.clone());
                    }
                    self.progress
                        .on_document_complete(phase, &document, success, done, total);
                }
                WorkerMessage::DispatchFinished { submitted: n } => {
                    submitted = Some(n);
                    transition(&mut state, PhaseState::Draining);
                }
            }
            if submitted == Some(done) {
                break;
            }
        }

        match dispatcher.await {
            Ok(unsubmitted) => failed_documents.extend(unsubmitted),
            Err(e) => {
                error!("Dispatcher for {} aborted: {}", phase, e);
                failed_documents.extend(unfinished(documents, &reported));
            }
        }
        let failed = total - succeeded;
        transition(&mut state, PhaseState::Done);

        let report = PhaseReport {
            phase,
            total,
            succeeded,
            failed,
            failed_documents,
            duration_ms: started.elapsed().as_millis() as u64,
        };
        info!(
            "{} done: {}/{} succeeded in {}ms",
            phase, report.succeeded, report.total, report.duration_ms
        );
        self.progress.on_phase_complete(&report);
        report
    }
}

fn transition(state: &mut PhaseState, next: PhaseState) {
    debug!("Phase state {} → {}", state, next);
    *state = next;
}

/// Documents that never reported a completion, in phase order.
fn unfinished(documents: &[PathBuf], reported: &HashSet<PathBuf>) -> Vec<PathBuf> {
    documents
        .iter()
        .filter(|d| !reported.contains(*d))
        .cloned()
        .collect()
}

/// Submit every job, then report how many went out. Returns the documents
/// it could not submit.
async fn dispatch(
    jobs: Vec<DocumentJob>,
    executor: Arc<dyn DocumentExecutor>,
    cores: usize,
    tx: mpsc::UnboundedSender<WorkerMessage>,
) -> Vec<PathBuf> {
    let permits = Arc::new(Semaphore::new(cores));
    let mut submitted = 0usize;
    let mut jobs = jobs.into_iter();

    while let Some(job) = jobs.next() {
        let permit = match Arc::clone(&permits).acquire_owned().await {
            Ok(p) => p,
            Err(e) => {
                error!("Worker pool closed: {}", e);
                let mut unsubmitted = vec![job.path];
                unsubmitted.extend(jobs.map(|j| j.path));
                let _ = tx.send(WorkerMessage::DispatchFinished { submitted });
                return unsubmitted;
            }
        };
        let executor = Arc::clone(&executor);
        let tx = tx.clone();
        let span = Span::current();

        tokio::spawn(async move {
            let document = job.path.clone();
            let blocking_span = span.clone();
            let outcome = tokio::task::spawn_blocking(move || {
                let _guard = blocking_span.enter();
                executor.execute(&job)
            })
            .await;
            drop(permit);

            let success = match outcome {
                Ok(success) => success,
                Err(e) => {
                    let _guard = span.enter();
                    error!("Worker for {} panicked: {}", document.display(), e);
                    false
                }
            };
            let _ = tx.send(WorkerMessage::Completed(Completion { document, success }));
        });
        submitted += 1;
    }

    let _ = tx.send(WorkerMessage::DispatchFinished { submitted });
    Vec::new()
}

// ── Entry points ─────────────────────────────────────────────────────────

/// Prepare the whole corpus described by `config`.
///
/// # Errors
/// Returns `Err(PrepareError)` only for fatal errors:
/// - the data directory is missing
/// - the output tree cannot be created
/// - the selected OCR backend cannot be started
/// - process isolation is selected without a worker program
///
/// Per-document failures are reported in the returned [`RunReport`].
pub async fn prepare_dataset(
    config: &PrepareConfig,
    progress: ProgressCallback,
) -> Result<RunReport, PrepareError> {
    let span = info_span!(
        "prepare",
        data_dir = %config.data_dir.display(),
        out_dir = %config.out_dir.display()
    );
    prepare_inner(config, progress).instrument(span).await
}

async fn prepare_inner(
    config: &PrepareConfig,
    progress: ProgressCallback,
) -> Result<RunReport, PrepareError> {
    let layout = OutputLayout::create(&config.out_dir)?;
    let documents = split::discover_documents(&config.data_dir)?;
    let discovered = documents.len();
    let corpus = split::split_documents(documents, config.val_size);
    info!(
        "Split {} documents: train={} val={} test={}",
        discovered,
        corpus.train.len(),
        corpus.val.len(),
        corpus.test.len()
    );

    let executor = build_executor(config, layout)?;
    let orchestrator = Orchestrator::new(executor, config.cores).with_progress(progress);

    let mut report = RunReport {
        discovered,
        phases: Vec::with_capacity(Phase::ALL.len()),
    };
    for phase in Phase::ALL {
        report
            .phases
            .push(orchestrator.run_phase(phase, corpus.phase(phase)).await);
    }
    Ok(report)
}

fn build_executor(
    config: &PrepareConfig,
    layout: OutputLayout,
) -> Result<Arc<dyn DocumentExecutor>, PrepareError> {
    match config.isolation {
        Isolation::Thread => {
            let pipeline = Pipeline::new(config, layout)?;
            info!("Running documents in-process with {}", pipeline.engine_name());
            Ok(Arc::new(InProcessExecutor::new(pipeline)))
        }
        Isolation::Process => {
            let program = config.worker_program.as_ref().ok_or_else(|| {
                PrepareError::InvalidConfig("process isolation needs a worker program".into())
            })?;
            // Fail the run here rather than once per worker.
            let engine = ocr::build_engine(config)?;
            info!(
                "Running documents in {} worker processes with {}",
                program.display(),
                engine.name()
            );
            Ok(Arc::new(ProcessExecutor::for_worker(program, config, &layout)?))
        }
    }
}

/// Synchronous wrapper around [`prepare_dataset`].
///
/// Creates a temporary tokio runtime internally.
pub fn prepare_dataset_sync(
    config: &PrepareConfig,
    progress: ProgressCallback,
) -> Result<RunReport, PrepareError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| PrepareError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(prepare_dataset(config, progress))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OcrBackend;
    use crate::fields::FieldType;
    use crate::progress::PhaseProgress;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Fails any document whose file name starts with `bad`, panics on `boom`.
    #[derive(Default)]
    struct FakeExecutor {
        running: AtomicUsize,
        peak: AtomicUsize,
        calls: AtomicUsize,
    }

    impl DocumentExecutor for FakeExecutor {
        fn execute(&self, job: &DocumentJob) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(15));
            self.running.fetch_sub(1, Ordering::SeqCst);

            let name = job.path.file_name().unwrap().to_string_lossy().into_owned();
            if name.starts_with("boom") {
                panic!("decoder blew up");
            }
            !name.starts_with("bad")
        }
    }

    #[derive(Default)]
    struct Recorder {
        starts: Mutex<Vec<(Phase, usize)>>,
        done_counts: Mutex<Vec<usize>>,
        reports: Mutex<Vec<PhaseReport>>,
    }

    impl PhaseProgress for Recorder {
        fn on_phase_start(&self, phase: Phase, total: usize) {
            self.starts.lock().unwrap().push((phase, total));
        }
        fn on_document_complete(&self, _: Phase, _: &Path, _: bool, done: usize, _: usize) {
            self.done_counts.lock().unwrap().push(done);
        }
        fn on_phase_complete(&self, report: &PhaseReport) {
            self.reports.lock().unwrap().push(report.clone());
        }
    }

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(|n| PathBuf::from(format!("/d/{n}.png"))).collect()
    }

    #[tokio::test]
    async fn failures_are_counted_not_fatal() {
        let executor = Arc::new(FakeExecutor::default());
        let orchestrator = Orchestrator::new(executor.clone(), 2);
        let docs = paths(&["a", "bad1", "b", "bad2", "c"]);

        let report = orchestrator.run_phase(Phase::Train, &docs).await;
        assert_eq!(report.total, 5);
        assert_eq!(report.succeeded, 3);
        assert_eq!(report.failed, 2);
        let mut failed = report.failed_documents.clone();
        failed.sort();
        assert_eq!(failed, paths(&["bad1", "bad2"]));
        assert_eq!(report.failed, report.failed_documents.len());
        assert_eq!(executor.calls.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn unreported_documents_are_listed_as_failed() {
        let docs = paths(&["a", "b", "c", "d"]);
        let reported: HashSet<PathBuf> = paths(&["b", "d"]).into_iter().collect();
        assert_eq!(unfinished(&docs, &reported), paths(&["a", "c"]));
        assert!(unfinished(&docs, &docs.iter().cloned().collect()).is_empty());
    }

    #[tokio::test]
    async fn process_isolation_without_worker_is_fatal() {
        let data = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let mut config = PrepareConfig::builder(data.path())
            .out_dir(out.path())
            .ocr_backend(OcrBackend::Sidecar)
            .build()
            .unwrap();
        config.isolation = Isolation::Process;

        let err = prepare_dataset(&config, Arc::new(NoopProgress))
            .await
            .unwrap_err();
        assert!(matches!(err, PrepareError::InvalidConfig(_)), "got: {err}");
    }

    #[cfg(unix)]
    #[test]
    fn worker_executor_runs_the_given_program() {
        let config = PrepareConfig::builder("/data")
            .ocr_backend(OcrBackend::Sidecar)
            .build()
            .unwrap();
        let layout = OutputLayout::existing("/out");
        let executor = ProcessExecutor::for_worker("true", &config, &layout).unwrap();
        assert_eq!(executor.program, PathBuf::from("true"));
        assert_eq!(executor.base_args[0], OsString::from("worker"));
        assert!(executor._fields_file.is_none());

        let job = DocumentJob {
            path: PathBuf::from("/d/a.png"),
            phase: Phase::Val,
        };
        assert!(executor.execute(&job));
    }

    #[tokio::test]
    async fn concurrency_never_exceeds_cores() {
        let executor = Arc::new(FakeExecutor::default());
        let orchestrator = Orchestrator::new(executor.clone(), 3);
        let names: Vec<String> = (0..12).map(|i| format!("doc{i}")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();

        let report = orchestrator.run_phase(Phase::Val, &paths(&refs)).await;
        assert_eq!(report.succeeded, 12);
        assert!(executor.peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn panicking_worker_is_a_failure() {
        let orchestrator = Orchestrator::new(Arc::new(FakeExecutor::default()), 2);
        let report = orchestrator
            .run_phase(Phase::Test, &paths(&["ok", "boom"]))
            .await;
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.failed_documents, paths(&["boom"]));
    }

    #[tokio::test]
    async fn progress_sees_every_completion_once() {
        let recorder = Arc::new(Recorder::default());
        let orchestrator = Orchestrator::new(Arc::new(FakeExecutor::default()), 4)
            .with_progress(recorder.clone());

        orchestrator
            .run_phase(Phase::Train, &paths(&["a", "b", "bad", "c"]))
            .await;

        assert_eq!(*recorder.starts.lock().unwrap(), vec![(Phase::Train, 4)]);
        assert_eq!(*recorder.done_counts.lock().unwrap(), vec![1, 2, 3, 4]);
        let reports = recorder.reports.lock().unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].failed, 1);
    }

    #[tokio::test]
    async fn empty_phase_completes() {
        let recorder = Arc::new(Recorder::default());
        let orchestrator =
            Orchestrator::new(Arc::new(FakeExecutor::default()), 2).with_progress(recorder.clone());
        let report = orchestrator.run_phase(Phase::Test, &[]).await;
        assert_eq!((report.total, report.succeeded, report.failed), (0, 0, 0));
        assert_eq!(recorder.reports.lock().unwrap().len(), 1);
    }

    #[test]
    fn run_phase_from_sync_code() {
        let orchestrator = Orchestrator::new(Arc::new(FakeExecutor::default()), 1);
        let docs = paths(&["x", "y"]);
        let report = tokio_test::block_on(orchestrator.run_phase(Phase::Train, &docs));
        assert_eq!(report.succeeded, 2);
    }

    #[test]
    fn worker_args_carry_pipeline_settings() {
        let config = PrepareConfig::builder("/data")
            .ocr_backend(OcrBackend::Sidecar)
            .image_size(64)
            .max_ngram_length(3)
            .pdf_dpi(150)
            .build()
            .unwrap();
        let layout = OutputLayout::existing("/out");
        let args = worker_args(&config, &layout, Some(Path::new("/tmp/f.json")), LevelFilter::DEBUG);
        let args: Vec<String> = args.iter().map(|a| a.to_string_lossy().into_owned()).collect();

        assert_eq!(args[0], "worker");
        let value = |flag: &str| {
            let i = args.iter().position(|a| a == flag).unwrap();
            args[i + 1].clone()
        };
        assert_eq!(value("--out_dir"), "/out");
        assert_eq!(value("--ocr_engine"), "sidecar");
        assert_eq!(value("--image_size"), "64");
        assert_eq!(value("--max_ngram_length"), "3");
        assert_eq!(value("--pdf_dpi"), "150");
        assert_eq!(value("--log_level"), "debug");
        assert_eq!(value("--fields"), "/tmp/f.json");
    }

    #[test]
    fn vocabulary_file_round_trips() {
        let vocab = FieldVocabulary::new([("total", FieldType::Amount), ("po", FieldType::Text)]);
        let file = write_vocabulary(&vocab).unwrap();
        let back = FieldVocabulary::from_json_file(file.path()).unwrap();
        assert_eq!(back.get("total"), Some(FieldType::Amount));
        assert_eq!(back.get("po"), Some(FieldType::Text));
        assert_eq!(back.len(), 2);
    }

    #[cfg(unix)]
    #[test]
    fn process_executor_uses_exit_status() {
        let job = DocumentJob {
            path: PathBuf::from("/d/a.png"),
            phase: Phase::Train,
        };
        assert!(ProcessExecutor::new("true", vec![]).execute(&job));
        assert!(!ProcessExecutor::new("false", vec![]).execute(&job));
        assert!(!ProcessExecutor::new("/no/such/binary", vec![]).execute(&job));
    }

    #[test]
    fn phase_state_display() {
        assert_eq!(PhaseState::Draining.to_string(), "draining");
        assert_eq!(PhaseState::Done.to_string(), "done");
    }
}
