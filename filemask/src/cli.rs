// filemask/src/cli.rs
//! This file defines the command-line interface (CLI) for the filemask application.
//! License: MIT OR Apache-2.0

use clap::{Parser, ValueEnum};
use filemask_core::{MaskingMode, StrategyKind};
use std::path::PathBuf;

/// Files larger than this are streamed when `--strategy auto` is in effect.
pub const DEFAULT_STREAM_THRESHOLD: u64 = 64 * 1024 * 1024;

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(
    name = "filemask",
    author = "Obscura Team (Relay)",
    version = env!("CARGO_PKG_VERSION"),
    about = "Mask character positions in text files using anchor-based rules",
    long_about = "filemask redacts sensitive fields in line-oriented text files. A JSON (or YAML) rule file names the lines to touch, through anchors, and the character positions to obscure on those lines, either with '*' or by scrambling the original characters. Multi-line records are handled by block rules with start and end anchors.",
    arg_required_else_help = true
)]
pub struct Cli {
    /// A file, a directory, or a glob pattern.
    #[arg(value_name = "INPUT", help = "Input file, directory (non-recursive), or glob pattern.")]
    pub input: String,

    /// Output file for a single input.
    #[arg(value_name = "OUTPUT", help = "Output file. Only used when INPUT resolves to a single file.")]
    pub output: Option<PathBuf>,

    #[arg(long = "config", short = 'c', value_name = "FILE", help = "Rule file (JSON, or YAML by extension). Defaults to the only .json file next to the first input.")]
    pub config: Option<PathBuf>,

    #[arg(long = "outdir", short = 'o', value_name = "DIR", help = "Write masked files into this directory instead of beside their inputs.")]
    pub outdir: Option<PathBuf>,

    /// Extension filter applied to discovered inputs.
    #[arg(long = "ext", short = 'e', value_name = "EXT", num_args = 1.., value_delimiter = ',', help = "Only process files with these extensions (e.g. 'txt csv' or 'txt,csv'). Case-insensitive.")]
    pub ext: Vec<String>,

    #[arg(long = "mode", short = 'm', value_enum, default_value_t = ModeChoice::Star, help = "Masking mode.")]
    pub mode: ModeChoice,

    #[arg(long = "strategy", value_enum, default_value_t = StrategyChoice::Auto, help = "Execution strategy. 'auto' streams files above --stream-threshold.")]
    pub strategy: StrategyChoice,

    #[arg(long = "stream-threshold", value_name = "BYTES", default_value_t = DEFAULT_STREAM_THRESHOLD, help = "File size in bytes above which 'auto' switches to streaming.")]
    pub stream_threshold: u64,

    #[arg(long = "jobs", short = 'j', value_name = "N", help = "Number of files processed in parallel. Defaults to the available parallelism.")]
    pub jobs: Option<usize>,

    #[arg(long = "report", value_name = "FILE", help = "Write a JSON report of the run to this file.")]
    pub report: Option<PathBuf>,

    /// Disable informational messages
    #[arg(long, short = 'q', help = "Suppress all informational and debug messages.")]
    pub quiet: bool,

    /// Enable debug logging (overrides RUST_LOG for filemask crates to DEBUG)
    #[arg(long, short = 'd', help = "Enable debug logging.")]
    pub debug: bool,

    #[arg(long = "no-summary", help = "Suppress the masking summary.")]
    pub no_summary: bool,

    #[arg(long = "progress", help = "Show batch progress on stderr: redrawn in place on a terminal, a single final line otherwise.")]
    pub progress: bool,
}

/// How selected characters are replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeChoice {
    /// Replace every selected character with '*'.
    Star,
    /// Shuffle the selected characters deterministically.
    Scramble,
}

impl From<ModeChoice> for MaskingMode {
    fn from(choice: ModeChoice) -> Self {
        match choice {
            ModeChoice::Star => MaskingMode::Star,
            ModeChoice::Scramble => MaskingMode::Scramble,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StrategyChoice {
    /// Buffer small files, stream large ones.
    Auto,
    Buffered,
    Streaming,
}

impl StrategyChoice {
    /// Picks the concrete strategy for a file of `file_size` bytes.
    pub fn resolve(self, file_size: u64, threshold: u64) -> StrategyKind {
        match self {
            StrategyChoice::Buffered => StrategyKind::Buffered,
            StrategyChoice::Streaming => StrategyKind::Streaming,
            StrategyChoice::Auto if file_size > threshold => StrategyKind::Streaming,
            StrategyChoice::Auto => StrategyKind::Buffered,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_strategy_follows_threshold() {
        assert_eq!(StrategyChoice::Auto.resolve(10, 100), StrategyKind::Buffered);
        assert_eq!(StrategyChoice::Auto.resolve(100, 100), StrategyKind::Buffered);
        assert_eq!(StrategyChoice::Auto.resolve(101, 100), StrategyKind::Streaming);
        assert_eq!(StrategyChoice::Buffered.resolve(u64::MAX, 0), StrategyKind::Buffered);
        assert_eq!(StrategyChoice::Streaming.resolve(0, 100), StrategyKind::Streaming);
    }

    #[test]
    fn parses_comma_separated_extensions() {
        let cli = Cli::try_parse_from(["filemask", "data", "--ext", "txt,.CSV", "-e", "log"]).unwrap();
        assert_eq!(cli.ext, vec!["txt", ".CSV", "log"]);
        assert_eq!(cli.mode, ModeChoice::Star);
        assert_eq!(cli.stream_threshold, DEFAULT_STREAM_THRESHOLD);
        assert!(!cli.progress);
    }

    #[test]
    fn parses_space_separated_extensions() {
        let cli = Cli::try_parse_from(["filemask", "data", "--ext", "txt", ".sql", "log,csv"]).unwrap();
        assert_eq!(cli.ext, vec!["txt", ".sql", "log", "csv"]);
        assert_eq!(cli.output, None);

        let cli = Cli::try_parse_from(["filemask", "data", "out.txt", "--ext", "txt", "sql", "--progress"]).unwrap();
        assert_eq!(cli.ext, vec!["txt", "sql"]);
        assert_eq!(cli.output, Some(PathBuf::from("out.txt")));
        assert!(cli.progress);
    }
}
