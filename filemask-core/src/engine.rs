// filemask-core/src/engine.rs
//! The masking engine: compiled rules plus the entry points that run them.
//!
//! A [`MaskingEngine`] is built once per run and is cheap to share (`Clone`
//! copies an `Arc`). It holds no per-file state, so one engine can serve any
//! number of concurrent file tasks. The masking mode and the execution
//! strategy are chosen per call.
//!
//! License: MIT OR APACHE 2.0

use anyhow::{Context, Result};
use log::debug;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

use crate::compiler::{get_or_compile_rules, CompiledRuleSet};
use crate::config::MaskConfig;
use crate::errors::FilemaskError;
use crate::lines::{LineReader, LineSink, TextLayout, WriterSink};
use crate::masker::MaskingMode;
use crate::strategy::{strategy_for, BufferedStrategy, MaskOutcome, StrategyKind};
use crate::summary::MaskReport;

#[derive(Debug, Clone)]
pub struct MaskingEngine {
    rules: Arc<CompiledRuleSet>,
}

impl MaskingEngine {
    pub fn new(config: &MaskConfig) -> Result<Self> {
        let rules = get_or_compile_rules(config)
            .context("Failed to compile masking rules for MaskingEngine")?;
        debug!(
            "MaskingEngine ready: {} rule(s), {} block pass(es).",
            rules.rule_count(),
            rules.block_groups().len()
        );
        Ok(Self { rules })
    }

    pub fn compiled_rules(&self) -> &CompiledRuleSet {
        &self.rules
    }

    pub fn config(&self) -> &MaskConfig {
        self.rules.config()
    }

    /// Masks an in-memory line sequence with the buffered strategy.
    pub fn mask_lines(&self, lines: Vec<String>, mode: MaskingMode) -> MaskOutcome {
        BufferedStrategy.mask_buffer(&self.rules, lines, mode)
    }

    /// Runs `strategy` over `source`, emitting masked lines to `sink`.
    pub fn run(
        &self,
        strategy: StrategyKind,
        source: &mut dyn Iterator<Item = io::Result<String>>,
        sink: &mut dyn LineSink,
        mode: MaskingMode,
    ) -> Result<MaskReport, FilemaskError> {
        strategy_for(strategy).execute(&self.rules, source, sink, mode)
    }

    /// Streams `source` into `sink` without holding the whole sequence.
    pub fn mask_stream(
        &self,
        source: &mut dyn Iterator<Item = io::Result<String>>,
        sink: &mut dyn LineSink,
        mode: MaskingMode,
    ) -> Result<MaskReport, FilemaskError> {
        self.run(StrategyKind::Streaming, source, sink, mode)
    }

    /// Masks everything readable from `reader` into `writer`, preserving
    /// `layout`. Returns the writer so callers can finalize it.
    pub fn mask_reader<R: BufRead, W: Write>(
        &self,
        reader: R,
        writer: W,
        layout: TextLayout,
        strategy: StrategyKind,
        mode: MaskingMode,
    ) -> Result<(W, MaskReport), FilemaskError> {
        let mut source = LineReader::new(reader);
        let mut sink = WriterSink::new(writer, layout);
        let report = self.run(strategy, &mut source, &mut sink, mode)?;
        let writer = sink.finish()?;
        Ok((writer, report))
    }
}
