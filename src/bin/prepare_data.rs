//! CLI binary for invoice-prep.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `PrepareConfig`, draws progress, and prints the run summary. The hidden
//! `worker` subcommand processes a single document and is what the
//! orchestrator spawns under process isolation.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use invoice_prep::orchestrate::run_job;
use invoice_prep::pipeline::writer::OutputLayout;
use invoice_prep::pipeline::{DocumentJob, Pipeline};
use invoice_prep::{
    prepare_dataset, FieldVocabulary, Isolation, NoopProgress, OcrBackend, Phase, PhaseProgress,
    PhaseReport, PrepareConfig, ProgressCallback, RunReport,
};
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar, reset at the start of each phase.
/// Documents complete out of order, so the bar only counts; skipped files
/// get their own log line above it.
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>5}/{len} documents  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl PhaseProgress for CliProgress {
    fn on_phase_start(&self, phase: Phase, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.set_position(0);
        self.bar.set_prefix(format!("{phase:<5}"));
        self.bar.reset_eta();
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Processing {total} documents for {phase}…"))
        ));
    }

    fn on_document_complete(
        &self,
        _phase: Phase,
        document: &Path,
        success: bool,
        done: usize,
        total: usize,
    ) {
        if !success {
            self.bar.println(format!(
                "  {} {:>5}/{:<5}  {}",
                red("✗"),
                done,
                total,
                red(&document.display().to_string()),
            ));
        }
        self.bar.inc(1);
    }

    fn on_phase_complete(&self, report: &PhaseReport) {
        self.bar.println(format!(
            "  {} {:<5} {}/{} written  {}",
            if report.failed == 0 { green("✔") } else { cyan("⚠") },
            report.phase,
            bold(&report.succeeded.to_string()),
            report.total,
            dim(&format!("{:.1}s", report.duration_ms as f64 / 1000.0)),
        ));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Prepare a corpus with Tesseract (build with --features tesseract)
  prepare-data --data_dir invoices/ --out_dir processed_data/ --ocr_engine tesseract

  # Use pre-computed OCR (<stem>.ocr.json next to each document);
  # the default when built without the tesseract feature
  prepare-data --data_dir invoices/ --ocr_engine sidecar

  # 10% validation split, 8 concurrent documents
  prepare-data --data_dir invoices/ --val_size 0.1 --cores 8

  # Custom field vocabulary
  prepare-data --data_dir invoices/ --fields fields.json

INPUT LAYOUT:
  data_dir/**/X.{pdf,png,jpg,jpeg}   the document (content is sniffed, not the extension)
  data_dir/**/X.json                 flat {"field": "value"} labels
  data_dir/**/X.ocr.json             OCR tokens, only for --ocr_engine sidecar

OUTPUT LAYOUT:
  out_dir/{train,val,test}/X.jpg     128×128 page image
  out_dir/{train,val,test}/X.json    {"fields", "nGrams", "height", "width", "filename"}

SPLIT:
  test = first 5% of discovery order, val = first val_size of the rest,
  train = everything else. The split is positional, not shuffled.
"#;

#[cfg(feature = "tesseract")]
const DEFAULT_OCR_ENGINE: &str = "tesseract";
#[cfg(not(feature = "tesseract"))]
const DEFAULT_OCR_ENGINE: &str = "sidecar";

/// Turn scanned invoices and their labels into a training corpus.
#[derive(Parser, Debug)]
#[command(
    name = "prepare-data",
    version,
    about = "Turn scanned invoices and their field labels into a training corpus",
    arg_required_else_help = true,
    args_conflicts_with_subcommands = true,
    subcommand_negates_reqs = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Root of the source tree (documents + .json labels).
    #[arg(long = "data_dir", visible_alias = "data-dir", required = true)]
    data_dir: Option<PathBuf>,

    /// Root of the output corpus.
    #[arg(long = "out_dir", visible_alias = "out-dir", default_value = "processed_data/")]
    out_dir: PathBuf,

    /// Fraction of the non-test documents used for validation (0–1).
    #[arg(long = "val_size", visible_alias = "val-size", default_value_t = 0.2)]
    val_size: f64,

    /// Documents processed concurrently. Default: max(1, (cpus - 2) / 2).
    #[arg(long)]
    cores: Option<usize>,

    /// OCR backend. Defaults to tesseract when this binary was built with
    /// the `tesseract` feature, otherwise to sidecar.
    #[arg(
        long = "ocr_engine",
        visible_alias = "ocr-engine",
        value_enum,
        default_value = DEFAULT_OCR_ENGINE
    )]
    ocr_engine: OcrEngineArg,

    /// Tesseract language code(s), e.g. eng or eng+deu.
    #[arg(long = "tesseract_language", visible_alias = "tesseract-language", default_value = "eng")]
    tesseract_language: String,

    /// JSON file mapping field names to text, amount or date.
    #[arg(long)]
    fields: Option<PathBuf>,

    /// Run each document in its own process (this binary's `worker` mode)
    /// or on a thread.
    #[arg(long, value_enum, default_value = "process")]
    isolation: IsolationArg,

    /// Rendering DPI for PDF pages (72–400).
    #[arg(long = "pdf_dpi", visible_alias = "pdf-dpi", default_value_t = 200,
          value_parser = clap::value_parser!(u32).range(72..=400))]
    pdf_dpi: u32,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long)]
    quiet: bool,

    /// Disable progress bar.
    #[arg(long = "no_progress", visible_alias = "no-progress")]
    no_progress: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Process one document (spawned by the orchestrator).
    #[command(hide = true)]
    Worker(WorkerArgs),
}

#[derive(clap::Args, Debug)]
struct WorkerArgs {
    #[arg(long)]
    file: PathBuf,
    #[arg(long)]
    phase: Phase,
    #[arg(long = "out_dir")]
    out_dir: PathBuf,
    #[arg(long = "ocr_engine", value_enum)]
    ocr_engine: OcrEngineArg,
    #[arg(long = "tesseract_language", default_value = "eng")]
    tesseract_language: String,
    #[arg(long = "image_size", default_value_t = 128)]
    image_size: u32,
    #[arg(long = "max_ngram_length", default_value_t = 4)]
    max_ngram_length: usize,
    #[arg(long = "pdf_dpi", default_value_t = 200)]
    pdf_dpi: u32,
    #[arg(long = "log_level", default_value = "warn")]
    log_level: String,
    #[arg(long)]
    fields: Option<PathBuf>,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum OcrEngineArg {
    Tesseract,
    Sidecar,
}

impl From<OcrEngineArg> for OcrBackend {
    fn from(v: OcrEngineArg) -> Self {
        match v {
            OcrEngineArg::Tesseract => OcrBackend::Tesseract,
            OcrEngineArg::Sidecar => OcrBackend::Sidecar,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum IsolationArg {
    Process,
    Thread,
}

impl From<IsolationArg> for Isolation {
    fn from(v: IsolationArg) -> Self {
        match v {
            IsolationArg::Process => Isolation::Process,
            IsolationArg::Thread => Isolation::Thread,
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let mut cli = Cli::parse();

    if let Some(Command::Worker(args)) = cli.command.take() {
        init_tracing(&args.log_level);
        let ok = tokio::task::spawn_blocking(move || run_worker(args))
            .await
            .context("Worker thread panicked")??;
        return Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE });
    }

    // ── Logging setup ────────────────────────────────────────────────────
    // While the bar is up only warnings and errors are printed, so skipped
    // documents still show above it.
    let show_progress = !cli.quiet && !cli.no_progress;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else if show_progress {
        "warn"
    } else {
        "info"
    };
    init_tracing(filter);

    // ── Build config ─────────────────────────────────────────────────────
    let config = build_config(&cli)?;

    let bar = show_progress.then(CliProgress::new);
    let progress: ProgressCallback = match &bar {
        Some(cb) => cb.clone() as ProgressCallback,
        None => Arc::new(NoopProgress),
    };

    // ── Run ──────────────────────────────────────────────────────────────
    let started = Instant::now();
    let result = prepare_dataset(&config, progress).await;
    if let Some(cb) = &bar {
        cb.finish();
    }
    let report = result.context("Dataset preparation failed")?;

    if !cli.quiet {
        print_summary(&report, &config.out_dir, started.elapsed());
    }
    Ok(ExitCode::SUCCESS)
}

fn init_tracing(filter: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();
}

/// Map CLI args to `PrepareConfig`.
fn build_config(cli: &Cli) -> Result<PrepareConfig> {
    let data_dir = cli
        .data_dir
        .clone()
        .context("--data_dir is required")?;

    let mut builder = PrepareConfig::builder(data_dir)
        .out_dir(&cli.out_dir)
        .val_size(cli.val_size)
        .ocr_backend(cli.ocr_engine.into())
        .tesseract_language(&cli.tesseract_language)
        .isolation(cli.isolation.into())
        .pdf_dpi(cli.pdf_dpi);

    if let Some(cores) = cli.cores {
        builder = builder.cores(cores);
    }
    if let Some(ref path) = cli.fields {
        builder = builder.fields(FieldVocabulary::from_json_file(path)?);
    }
    if matches!(cli.isolation, IsolationArg::Process) {
        let exe = std::env::current_exe().context("Cannot locate the prepare-data executable")?;
        builder = builder.worker_program(exe);
    }

    builder.build().context("Invalid configuration")
}

/// Process exactly one document. `Ok(false)` means the document was skipped.
fn run_worker(args: WorkerArgs) -> Result<bool> {
    let data_dir = args
        .file
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    let mut builder = PrepareConfig::builder(data_dir)
        .out_dir(&args.out_dir)
        .ocr_backend(args.ocr_engine.into())
        .tesseract_language(&args.tesseract_language)
        .image_size(args.image_size)
        .max_ngram_length(args.max_ngram_length)
        .pdf_dpi(args.pdf_dpi);
    if let Some(ref path) = args.fields {
        builder = builder.fields(FieldVocabulary::from_json_file(path)?);
    }
    let config = builder.build().context("Invalid worker configuration")?;

    let pipeline = Pipeline::new(&config, OutputLayout::existing(&args.out_dir))
        .context("Failed to start worker pipeline")?;
    let job = DocumentJob {
        path: args.file,
        phase: args.phase,
    };
    Ok(run_job(&pipeline, &job))
}

fn print_summary(report: &RunReport, out_dir: &Path, elapsed: Duration) {
    let succeeded = report.succeeded();
    let failed = report.failed();
    eprintln!(
        "{}  {}/{} documents  {:.1}s  →  {}",
        if failed == 0 {
            green("✔")
        } else if succeeded == 0 && report.discovered > 0 {
            red("✘")
        } else {
            cyan("⚠")
        },
        bold(&succeeded.to_string()),
        report.discovered,
        elapsed.as_secs_f64(),
        bold(&out_dir.display().to_string()),
    );
    for phase in &report.phases {
        eprintln!(
            "   {:<5}  {:>6} written  {:>6} skipped",
            phase.phase,
            phase.succeeded,
            if phase.failed == 0 {
                dim("0")
            } else {
                red(&phase.failed.to_string())
            },
        );
    }
}
