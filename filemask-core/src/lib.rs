// filemask-core/src/lib.rs
//! # filemask Core Library
//!
//! `filemask-core` masks character positions in line-oriented text. Rules pick
//! the lines (through anchors) and the character ranges on those lines to
//! obscure; the engine applies them to a sequence of already-decoded lines and
//! reports how many characters each rule masked.
//!
//! The library does no file discovery or decoding. It consumes lines and
//! produces lines.
//!
//! ## Modules
//!
//! * `ranges`: Parses 1-based position strings into 0-based [`CharRange`]s.
//! * `anchor`: Compiles wildcard/OR or raw anchors into [`AnchorMatcher`]s.
//! * `masker`: The single-line masking primitive, star or scramble.
//! * `config`: Rule records, loading from JSON/YAML, validation.
//! * `aggregate`: Folds single-line rules into pattern sets and merges block rules.
//! * `block`: The block scanner state machine.
//! * `compiler`: Compiles and caches rule sets.
//! * `strategy`: Buffered and streaming execution.
//! * `engine`: The [`MaskingEngine`] entry point.
//! * `lines`: Line sources and sinks that keep the input's layout.
//! * `summary`: Per-rule and total counts.
//! * `headless`: One-shot string masking.
//!
//! ## Usage Example
//!
//! ```rust
//! use filemask_core::{headless_mask_string, MaskConfig, MaskingMode, StrategyKind};
//! use anyhow::Result;
//!
//! fn main() -> Result<()> {
//!     let config = MaskConfig::from_json_str(
//!         r#"{"rules":[{"type":"type1","anchor":"ACC%","positionsString":"5-8"}]}"#,
//!         "inline",
//!     )?;
//!
//!     let (masked, report) = headless_mask_string(
//!         &config,
//!         "ACC 1234 savings\n",
//!         MaskingMode::Star,
//!         StrategyKind::Buffered,
//!     )?;
//!
//!     assert_eq!(masked, "ACC **** savings\n");
//!     assert_eq!(report.total_masked, 4);
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Bad rules degrade instead of failing: invalid positions are dropped and
//! invalid anchors never match. Only an unreadable or empty rule document,
//! or an I/O error while streaming, is an error ([`FilemaskError`]).
//!
//! ---
//! License: MIT OR Apache-2.0

pub mod aggregate;
pub mod anchor;
pub mod block;
pub mod compiler;
pub mod config;
pub mod engine;
pub mod errors;
pub mod headless;
pub mod lines;
pub mod masker;
pub mod ranges;
pub mod strategy;
pub mod summary;

/// Re-exports the configuration types for building and loading rule sets.
pub use config::{BlockRule, MaskConfig, MaskRule, RuleDocument, RuleKind, SingleLineRule};

/// Re-exports the custom error type.
pub use errors::FilemaskError;

pub use anchor::AnchorMatcher;
pub use block::{BlockScanState, BlockScanner};
pub use compiler::{compile_rules, get_or_compile_rules, CompiledRuleSet};
pub use engine::MaskingEngine;
pub use headless::headless_mask_string;
pub use lines::{LineReader, LineSink, TextLayout, WriterSink};
pub use masker::{mask_line, MaskingMode};
pub use ranges::{parse_char_ranges, CharRange};
pub use strategy::{
    strategy_for, BufferedStrategy, MaskOutcome, MaskingStrategy, StrategyKind, StreamingStrategy,
};
pub use summary::{MaskReport, MaskSummaryItem};
