//! Execution strategies.
//!
//! Every run applies the passes in a fixed order: the aggregated single-line
//! pass, then each block group in turn, each pass seeing the output of the
//! previous one. Two strategies implement that contract:
//!
//! * [`BufferedStrategy`] holds the whole line sequence and runs pass after pass
//!   over it.
//! * [`StreamingStrategy`] pipes each line through every pass as it is read and
//!   writes it out as soon as the last pass releases it. Only the block
//!   scanners' trailing windows are held in memory.
//!
//! Each pass is a left-to-right transducer, so both strategies produce the
//! same lines and the same counts.
//!
//! License: MIT OR APACHE 2.0

use log::debug;
use serde::{Deserialize, Serialize};
use std::io;

use crate::block::BlockScanner;
use crate::compiler::CompiledRuleSet;
use crate::errors::FilemaskError;
use crate::lines::LineSink;
use crate::masker::MaskingMode;
use crate::summary::{MaskReport, RuleCounts};

/// A source of decoded lines without terminators.
pub type LineSource<'a> = &'a mut dyn Iterator<Item = io::Result<String>>;

/// Selects a [`MaskingStrategy`] implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    #[default]
    Buffered,
    Streaming,
}

/// A way of driving the masking passes over a line sequence.
pub trait MaskingStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Reads every line from `source`, masks it with `rules`, and emits the
    /// result to `sink` in order.
    fn execute(
        &self,
        rules: &CompiledRuleSet,
        source: LineSource<'_>,
        sink: &mut dyn LineSink,
        mode: MaskingMode,
    ) -> Result<MaskReport, FilemaskError>;
}

/// Returns the strategy implementation for `kind`.
pub fn strategy_for(kind: StrategyKind) -> Box<dyn MaskingStrategy> {
    match kind {
        StrategyKind::Buffered => Box::new(BufferedStrategy),
        StrategyKind::Streaming => Box::new(StreamingStrategy),
    }
}

/// Masked lines together with their report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskOutcome {
    pub lines: Vec<String>,
    pub report: MaskReport,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BufferedStrategy;

impl BufferedStrategy {
    /// Masks an in-memory line sequence.
    pub fn mask_buffer(
        &self,
        rules: &CompiledRuleSet,
        lines: Vec<String>,
        mode: MaskingMode,
    ) -> MaskOutcome {
        let line_count = lines.len();
        let mut counts = RuleCounts::new(rules.rule_count());

        let single_line = rules.single_line();
        let mut lines: Vec<String> = if single_line.is_empty() {
            lines
        } else {
            lines
                .into_iter()
                .enumerate()
                .map(|(i, line)| single_line.apply(line, i, mode, &mut counts))
                .collect()
        };

        for (pass, group) in rules.block_groups().iter().enumerate() {
            let mut scanner = BlockScanner::new(group, mode);
            let mut out = Vec::with_capacity(lines.len());
            for line in lines {
                scanner.push(line, &mut out, &mut counts);
            }
            scanner.finish(&mut out, &mut counts);
            debug!("Block pass {} closed {} record(s).", pass + 1, scanner.records_closed());
            lines = out;
        }

        MaskOutcome {
            lines,
            report: counts.into_report(rules.config(), line_count),
        }
    }
}

impl MaskingStrategy for BufferedStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Buffered
    }

    fn execute(
        &self,
        rules: &CompiledRuleSet,
        source: LineSource<'_>,
        sink: &mut dyn LineSink,
        mode: MaskingMode,
    ) -> Result<MaskReport, FilemaskError> {
        let lines = source.collect::<io::Result<Vec<String>>>()?;
        let outcome = self.mask_buffer(rules, lines, mode);
        for line in outcome.lines {
            sink.emit(line)?;
        }
        Ok(outcome.report)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StreamingStrategy;

impl MaskingStrategy for StreamingStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Streaming
    }

    fn execute(
        &self,
        rules: &CompiledRuleSet,
        source: LineSource<'_>,
        sink: &mut dyn LineSink,
        mode: MaskingMode,
    ) -> Result<MaskReport, FilemaskError> {
        let single_line = rules.single_line();
        let mut scanners: Vec<BlockScanner<'_>> = rules
            .block_groups()
            .iter()
            .map(|group| BlockScanner::new(group, mode))
            .collect();
        let mut counts = RuleCounts::new(rules.rule_count());
        let mut line_count = 0usize;

        for (i, line) in source.enumerate() {
            let line = single_line.apply(line?, i, mode, &mut counts);
            line_count += 1;
            forward(&mut scanners, 0, vec![line], &mut counts, sink)?;
        }

        for stage in 0..scanners.len() {
            let mut released = Vec::new();
            scanners[stage].finish(&mut released, &mut counts);
            forward(&mut scanners, stage + 1, released, &mut counts, sink)?;
        }

        Ok(counts.into_report(rules.config(), line_count))
    }
}

/// Sends `pending` through the scanners from `from` onward, then to the sink.
fn forward(
    scanners: &mut [BlockScanner<'_>],
    from: usize,
    mut pending: Vec<String>,
    counts: &mut RuleCounts,
    sink: &mut dyn LineSink,
) -> Result<(), FilemaskError> {
    for scanner in scanners.iter_mut().skip(from) {
        if pending.is_empty() {
            return Ok(());
        }
        let mut next = Vec::with_capacity(pending.len());
        for line in pending {
            scanner.push(line, &mut next, counts);
        }
        pending = next;
    }
    for line in pending {
        sink.emit(line)?;
    }
    Ok(())
}
