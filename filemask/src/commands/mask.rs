//! Batch masking command.
//!
//! Resolves the inputs and the rule file, compiles the rules once, then masks
//! every file on a bounded rayon pool. A file that cannot be read, decoded, or
//! written is recorded as failed; the rest of the batch carries on.

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use is_terminal::IsTerminal;
use log::{debug, info, warn};
use rayon::prelude::*;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use filemask_core::lines::{join_lines, split_lines};
use filemask_core::{MaskConfig, MaskReport, MaskingEngine, MaskingMode, StrategyKind, TextLayout};

use crate::cli::{Cli, StrategyChoice};
use crate::ui::mask_summary;
use crate::ui::output_format;
use crate::ui::progress_bar::ProgressDisplay;
use crate::ui::theme::ThemeMap;
use crate::utils::discovery::{
    collect_inputs, exclude_json, filter_by_extension, normalize_extensions, plan_outputs,
    resolve_config_path, DiscoveryError, FilePlan, MASKED_SUFFIX,
};
use crate::utils::progress::BatchProgress;

/// Helper for printing info messages to stderr.
pub fn info_msg(msg: impl AsRef<str>, theme: &ThemeMap) {
    let stderr_supports_color = io::stderr().is_terminal();
    let _ = output_format::print_info_message(&mut io::stderr(), msg.as_ref(), theme, stderr_supports_color);
}

/// Helper for printing warning messages to stderr.
pub fn warn_msg(msg: impl AsRef<str>, theme: &ThemeMap) {
    let stderr_supports_color = io::stderr().is_terminal();
    let _ = output_format::print_warn_message(&mut io::stderr(), msg.as_ref(), theme, stderr_supports_color);
}

/// Helper for printing error messages to stderr.
pub fn error_msg(msg: impl AsRef<str>, theme: &ThemeMap) {
    let stderr_supports_color = io::stderr().is_terminal();
    let _ = output_format::print_error_message(&mut io::stderr(), msg.as_ref(), theme, stderr_supports_color);
}

/// Helper for printing success messages to stderr.
pub fn success_msg(msg: impl AsRef<str>, theme: &ThemeMap) {
    let stderr_supports_color = io::stderr().is_terminal();
    let _ = output_format::print_success_message(&mut io::stderr(), msg.as_ref(), theme, stderr_supports_color);
}

/// Options for one batch run, resolved from the command line.
#[derive(Debug, Clone)]
pub struct MaskOptions {
    pub input: String,
    pub output: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub outdir: Option<PathBuf>,
    pub extensions: Vec<String>,
    pub mode: MaskingMode,
    pub strategy: StrategyChoice,
    pub stream_threshold: u64,
    pub jobs: Option<usize>,
    pub report: Option<PathBuf>,
    pub quiet: bool,
    pub no_summary: bool,
    pub progress: bool,
}

impl From<&Cli> for MaskOptions {
    fn from(cli: &Cli) -> Self {
        Self {
            input: cli.input.clone(),
            output: cli.output.clone(),
            config: cli.config.clone(),
            outdir: cli.outdir.clone(),
            extensions: normalize_extensions(&cli.ext),
            mode: cli.mode.into(),
            strategy: cli.strategy,
            stream_threshold: cli.stream_threshold,
            jobs: cli.jobs,
            report: cli.report.clone(),
            quiet: cli.quiet,
            no_summary: cli.no_summary,
            progress: cli.progress,
        }
    }
}

/// What happened to one input file.
#[derive(Debug, Clone, Serialize)]
pub struct FileOutcome {
    pub input: PathBuf,
    pub output: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<StrategyKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<MaskReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// The JSON document written by `--report`.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub generated_at: DateTime<Utc>,
    pub config_path: PathBuf,
    pub config_fingerprint: String,
    pub mode: MaskingMode,
    pub files_succeeded: usize,
    pub files_failed: usize,
    pub totals: MaskReport,
    pub files: Vec<FileOutcome>,
}

/// Runs a whole batch. Returns `Ok(true)` when every file was masked.
///
/// Errors returned from here are fatal for the run (no usable rule file, no
/// inputs, a broken thread pool); per-file problems are reported and counted.
pub fn run_mask_command(opts: &MaskOptions, theme: &ThemeMap) -> Result<bool> {
    info!("Starting filemask batch for input '{}'.", opts.input);

    let inputs = discover_inputs(opts)?;
    let config_path = resolve_config_path(opts.config.as_deref(), &inputs)?;
    let inputs: Vec<PathBuf> = if opts.config.is_some() {
        inputs.into_iter().filter(|f| !same_file(f, &config_path)).collect()
    } else {
        exclude_json(inputs)
    };
    if inputs.is_empty() {
        return Err(DiscoveryError::NoInputs(opts.input.clone()).into());
    }

    let config = MaskConfig::load_from_file(&config_path)?;
    let engine = MaskingEngine::new(&config)?;
    if !opts.quiet {
        info_msg(
            format!(
                "Loaded {} rule(s) from {}; masking {} file(s).",
                config.rules().len(),
                config_path.display(),
                inputs.len()
            ),
            theme,
        );
    }

    if let Some(dir) = &opts.outdir {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
    }
    let plans = plan_outputs(inputs, opts.output.as_deref(), opts.outdir.as_deref());
    if opts.output.is_some() && plans.len() > 1 && !opts.quiet {
        warn_msg("OUTPUT is ignored when more than one file is masked.", theme);
    }

    let outcomes = run_batch(&engine, &plans, opts, theme)?;

    let mut totals = MaskReport::default();
    for outcome in &outcomes {
        match (&outcome.report, &outcome.error) {
            (Some(report), _) => totals.merge(report),
            (None, Some(error)) => error_msg(format!("{}: {}", outcome.input.display(), error), theme),
            (None, None) => {}
        }
    }
    let failed = outcomes.iter().filter(|o| !o.succeeded()).count();
    let succeeded = outcomes.len() - failed;

    if !opts.no_summary && !opts.quiet {
        let stderr_supports_color = io::stderr().is_terminal();
        mask_summary::print_summary(
            &totals,
            succeeded,
            failed,
            &mut io::stderr(),
            theme,
            stderr_supports_color,
        )?;
    }

    if let Some(path) = &opts.report {
        let report = BatchReport {
            generated_at: Utc::now(),
            config_path,
            config_fingerprint: engine.compiled_rules().fingerprint().to_string(),
            mode: opts.mode,
            files_succeeded: succeeded,
            files_failed: failed,
            totals,
            files: outcomes,
        };
        write_batch_report(&report, path)?;
        if !opts.quiet {
            success_msg(format!("Report written to {}", path.display()), theme);
        }
    }

    info!("filemask batch finished: {} succeeded, {} failed.", succeeded, failed);
    Ok(failed == 0)
}

fn discover_inputs(opts: &MaskOptions) -> Result<Vec<PathBuf>> {
    let found = collect_inputs(&opts.input)?;
    let filtered = filter_by_extension(found, &opts.extensions);
    let inputs: Vec<PathBuf> = filtered
        .into_iter()
        .filter(|f| {
            let previous_output = f
                .file_stem()
                .map(|s| s.to_string_lossy().ends_with(MASKED_SUFFIX))
                .unwrap_or(false);
            if previous_output {
                debug!("Skipping earlier output {}", f.display());
            }
            !previous_output
        })
        .collect();
    if inputs.is_empty() {
        return Err(DiscoveryError::NoInputs(opts.input.clone()).into());
    }
    Ok(inputs)
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

fn run_batch(
    engine: &MaskingEngine,
    plans: &[FilePlan],
    opts: &MaskOptions,
    theme: &ThemeMap,
) -> Result<Vec<FileOutcome>> {
    let jobs = opts
        .jobs
        .unwrap_or_else(|| std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1))
        .max(1);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .build()
        .context("Failed to build the worker pool")?;
    debug!("Masking {} file(s) on {} worker(s).", plans.len(), jobs);

    let progress = BatchProgress::new(plans.len());
    let display = (opts.progress && !opts.quiet).then(|| {
        let stderr_is_terminal = io::stderr().is_terminal();
        ProgressDisplay::new(io::stderr(), stderr_is_terminal, theme, stderr_is_terminal)
    });
    let outcomes = pool.install(|| {
        plans
            .par_iter()
            .map(|plan| {
                let result = mask_file(engine, plan, opts.strategy, opts.stream_threshold, opts.mode);
                let outcome = match result {
                    Ok((strategy, report)) => {
                        let done = progress.record_success(report.total_masked);
                        info!(
                            "[{}/{}] {} -> {} ({} chars masked)",
                            done,
                            progress.total(),
                            plan.input.display(),
                            plan.output.display(),
                            report.total_masked
                        );
                        FileOutcome {
                            input: plan.input.clone(),
                            output: plan.output.clone(),
                            strategy: Some(strategy),
                            report: Some(report),
                            error: None,
                        }
                    }
                    Err(e) => {
                        let done = progress.record_failure();
                        warn!("[{}/{}] {} failed: {:#}", done, progress.total(), plan.input.display(), e);
                        FileOutcome {
                            input: plan.input.clone(),
                            output: plan.output.clone(),
                            strategy: None,
                            report: None,
                            error: Some(format!("{:#}", e)),
                        }
                    }
                };
                if let Some(display) = &display {
                    display.update(&progress.snapshot());
                }
                outcome
            })
            .collect::<Vec<_>>()
    });

    let snapshot = progress.snapshot();
    if let Some(display) = &display {
        display.finish(&snapshot);
    }
    debug!(
        "Batch progress: {}/{} done, {} failed, {} chars masked.",
        snapshot.done, snapshot.total, snapshot.failed, snapshot.masked_chars
    );
    Ok(outcomes)
}

/// Masks one file according to `plan`, picking the strategy from the file
/// size when `choice` is `Auto`.
pub fn mask_file(
    engine: &MaskingEngine,
    plan: &FilePlan,
    choice: StrategyChoice,
    stream_threshold: u64,
    mode: MaskingMode,
) -> Result<(StrategyKind, MaskReport)> {
    if same_file(&plan.input, &plan.output) {
        bail!("Refusing to overwrite the input file {}", plan.input.display());
    }
    let size = fs::metadata(&plan.input)
        .with_context(|| format!("Failed to read metadata for {}", plan.input.display()))?
        .len();
    let strategy = choice.resolve(size, stream_threshold);
    debug!("{} ({} bytes) uses the {:?} strategy.", plan.input.display(), size, strategy);

    let report = match strategy {
        StrategyKind::Buffered => mask_file_buffered(engine, plan, mode)?,
        StrategyKind::Streaming => mask_file_streaming(engine, plan, mode)?,
    };
    Ok((strategy, report))
}

fn mask_file_buffered(engine: &MaskingEngine, plan: &FilePlan, mode: MaskingMode) -> Result<MaskReport> {
    let bytes = fs::read(&plan.input)
        .with_context(|| format!("Failed to read {}", plan.input.display()))?;
    let text = String::from_utf8(bytes)
        .map_err(|e| anyhow!("{} is not valid UTF-8: {}", plan.input.display(), e.utf8_error()))?;

    let layout = TextLayout::of_str(&text);
    let outcome = engine.mask_lines(split_lines(&text), mode);
    fs::write(&plan.output, join_lines(&outcome.lines, layout))
        .with_context(|| format!("Failed to write {}", plan.output.display()))?;
    Ok(outcome.report)
}

fn mask_file_streaming(engine: &MaskingEngine, plan: &FilePlan, mode: MaskingMode) -> Result<MaskReport> {
    let layout = detect_file_layout(&plan.input)
        .with_context(|| format!("Failed to read {}", plan.input.display()))?;
    let reader = BufReader::new(
        File::open(&plan.input).with_context(|| format!("Failed to open {}", plan.input.display()))?,
    );
    let writer = BufWriter::new(
        File::create(&plan.output)
            .with_context(|| format!("Failed to create {}", plan.output.display()))?,
    );

    let result = engine
        .mask_reader(reader, writer, layout, StrategyKind::Streaming, mode)
        .map_err(anyhow::Error::from)
        .and_then(|(mut writer, report)| {
            writer.flush()?;
            Ok(report)
        });

    if result.is_err() {
        // Do not leave a half-masked file behind.
        let _ = fs::remove_file(&plan.output);
    }
    result.with_context(|| format!("Failed to mask {}", plan.input.display()))
}

/// Finds the terminator of the first line and the trailing newline from the
/// last byte, without holding more than one read buffer of the file.
fn detect_file_layout(path: &Path) -> io::Result<TextLayout> {
    let mut file = File::open(path)?;
    let head: &[u8] = {
        let mut reader = BufReader::new(&mut file);
        let mut previous = None;
        loop {
            let buf = reader.fill_buf()?;
            if buf.is_empty() {
                break &b""[..];
            }
            if let Some(i) = buf.iter().position(|&b| b == b'\n') {
                let before = if i > 0 { Some(buf[i - 1]) } else { previous };
                break if before == Some(b'\r') { &b"\r\n"[..] } else { &b"\n"[..] };
            }
            previous = buf.last().copied();
            let consumed = buf.len();
            reader.consume(consumed);
        }
    };

    let len = file.metadata()?.len();
    let last_byte = if len == 0 {
        None
    } else {
        file.seek(SeekFrom::End(-1))?;
        let mut byte = [0u8; 1];
        file.read_exact(&mut byte)?;
        Some(byte[0])
    };
    Ok(TextLayout::detect(head, last_byte))
}

fn write_batch_report(report: &BatchReport, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("Failed to serialize the batch report")?;
    fs::write(path, json).with_context(|| format!("Failed to write report to {}", path.display()))
}
