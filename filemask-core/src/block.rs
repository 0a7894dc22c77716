//! The block scanner: a push-based state machine that masks the bodies of
//! multi-line records.
//!
//! A record opens on a line matching the group's start anchor and closes on a
//! line matching its end anchor. The first `skip_start` lines after the opener
//! and the last `skip_end` lines before the closer are left as they were;
//! everything in between is masked with the ranges of its relative record line.
//!
//! Because the closer is unknown until it arrives, masked lines wait in a
//! trailing window of at most `skip_end` lines. When the window overflows the
//! oldest line leaves it in masked form; when the closer arrives the window is
//! released in original form. Memory use is therefore bounded by `skip_end`,
//! not by file size.
//!
//! If input ends inside a record, the window is released masked: an
//! unterminated block is treated as fully redacted.
//!
//! License: MIT OR APACHE 2.0

use std::collections::VecDeque;

use crate::aggregate::{Attribution, BlockGroup};
use crate::masker::MaskingMode;
use crate::summary::{log_masked_line_debug, RuleCounts};

/// Where the scanner is relative to the current record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockScanState {
    /// Looking for a start anchor.
    Outside,
    /// Passing through the lines right after a start anchor.
    SkippingStart,
    /// Inside the maskable body.
    Masking,
}

#[derive(Debug)]
struct PendingLine {
    original: String,
    masked: String,
    attribution: Attribution,
}

/// Per-file scanning state for one [`BlockGroup`].
#[derive(Debug)]
pub struct BlockScanner<'g> {
    group: &'g BlockGroup,
    mode: MaskingMode,
    state: BlockScanState,
    skipped: usize,
    relative_index: usize,
    trailing: VecDeque<PendingLine>,
    records_closed: usize,
}

impl<'g> BlockScanner<'g> {
    pub fn new(group: &'g BlockGroup, mode: MaskingMode) -> Self {
        Self {
            group,
            mode,
            state: BlockScanState::Outside,
            skipped: 0,
            relative_index: 0,
            trailing: VecDeque::with_capacity(group.skip_end() + 1),
            records_closed: 0,
        }
    }

    pub fn state(&self) -> BlockScanState {
        self.state
    }

    pub fn records_closed(&self) -> usize {
        self.records_closed
    }

    /// Lines currently held back in the trailing window.
    pub fn pending_len(&self) -> usize {
        self.trailing.len()
    }

    /// Feeds one line. Lines that are ready are appended to `out`.
    pub fn push(&mut self, line: String, out: &mut Vec<String>, counts: &mut RuleCounts) {
        match self.state {
            BlockScanState::Outside => {
                if self.group.start.is_match(&line) {
                    self.enter_record();
                }
                out.push(line);
            }
            BlockScanState::SkippingStart => {
                out.push(line);
                self.skipped += 1;
                if self.skipped >= self.group.skip_start() {
                    self.begin_body();
                }
            }
            BlockScanState::Masking => {
                if self.group.end.is_match(&line) {
                    for pending in self.trailing.drain(..) {
                        out.push(pending.original);
                    }
                    out.push(line);
                    self.state = BlockScanState::Outside;
                    self.records_closed += 1;
                    return;
                }
                self.buffer_body_line(line);
                if self.trailing.len() > self.group.skip_end() {
                    if let Some(oldest) = self.trailing.pop_front() {
                        counts.credit(&oldest.attribution);
                        out.push(oldest.masked);
                    }
                }
            }
        }
    }

    /// Signals end of input. Anything still held back is released masked.
    pub fn finish(&mut self, out: &mut Vec<String>, counts: &mut RuleCounts) {
        for pending in self.trailing.drain(..) {
            counts.credit(&pending.attribution);
            out.push(pending.masked);
        }
        self.state = BlockScanState::Outside;
    }

    fn enter_record(&mut self) {
        self.skipped = 0;
        if self.group.skip_start() == 0 {
            self.begin_body();
        } else {
            self.state = BlockScanState::SkippingStart;
        }
    }

    fn begin_body(&mut self) {
        self.state = BlockScanState::Masking;
        self.relative_index = 0;
    }

    fn buffer_body_line(&mut self, line: String) {
        let pending = match self.group.mask_body_line(&line, self.relative_index, self.mode) {
            Some((masked, attribution)) => {
                log_masked_line_debug("block", self.relative_index, &line, &masked);
                PendingLine {
                    original: line,
                    masked,
                    attribution,
                }
            }
            None => PendingLine {
                masked: line.clone(),
                original: line,
                attribution: Vec::new(),
            },
        };
        self.trailing.push_back(pending);
        self.relative_index += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::build_block_groups;
    use crate::config::{BlockRule, MaskConfig, RuleKind};

    fn groups_for(rule: BlockRule) -> (MaskConfig, Vec<BlockGroup>) {
        let config = MaskConfig::new(vec![RuleKind::Block(rule)], 0);
        let groups = build_block_groups(&config);
        (config, groups)
    }

    fn scan(group: &BlockGroup, lines: &[&str]) -> (Vec<String>, usize) {
        let mut scanner = BlockScanner::new(group, MaskingMode::Star);
        let mut counts = RuleCounts::new(1);
        let mut out = Vec::new();
        for line in lines {
            scanner.push(line.to_string(), &mut out, &mut counts);
        }
        scanner.finish(&mut out, &mut counts);
        (out, counts.total())
    }

    #[test]
    fn test_record_with_skip_start() {
        let (_, groups) = groups_for(BlockRule::new("REC-START", "REC-END", "3-7").with_skips(1, 0));
        let input = ["HEADER", "REC-START", "skip1", "A:12345", "B:67890", "REC-END", "TRAILER"];
        let (out, total) = scan(&groups[0], &input);
        assert_eq!(
            out,
            vec!["HEADER", "REC-START", "skip1", "A:*****", "B:*****", "REC-END", "TRAILER"]
        );
        assert_eq!(total, 10);
    }

    #[test]
    fn test_skip_end_window_is_released_unmasked() {
        let (_, groups) = groups_for(BlockRule::new("BEGIN", "END", "1-3").with_skips(0, 2));
        let input = ["BEGIN", "aaa1", "bbb2", "ccc3", "ddd4", "END"];
        let (out, total) = scan(&groups[0], &input);
        assert_eq!(out, vec!["BEGIN", "***1", "***2", "ccc3", "ddd4", "END"]);
        assert_eq!(total, 6);
    }

    #[test]
    fn test_unterminated_block_is_fully_masked() {
        let (_, groups) = groups_for(BlockRule::new("BEGIN", "END", "1-3").with_skips(0, 2));
        let input = ["BEGIN", "aaa1", "bbb2", "ccc3"];
        let (out, total) = scan(&groups[0], &input);
        assert_eq!(out, vec!["BEGIN", "***1", "***2", "***3"]);
        assert_eq!(total, 9);
    }

    #[test]
    fn test_lines_per_record_cycles_ranges() {
        let rule = BlockRule::new("S", "E", "1-2 && 3-4").with_lines_per_record(2);
        let (_, groups) = groups_for(rule);
        let input = ["S", "abcd", "abcd", "abcd", "E"];
        let (out, _) = scan(&groups[0], &input);
        assert_eq!(out, vec!["S", "**cd", "ab**", "**cd", "E"]);
    }

    #[test]
    fn test_multiple_records_and_outside_lines() {
        let (_, groups) = groups_for(BlockRule::new("S", "E", "1"));
        let input = ["x", "S", "aa", "E", "bb", "S", "cc", "E", "dd"];
        let (out, total) = scan(&groups[0], &input);
        assert_eq!(out, vec!["x", "S", "*a", "E", "bb", "S", "*c", "E", "dd"]);
        assert_eq!(total, 2);
    }

    #[test]
    fn test_end_anchor_ignored_while_skipping_start() {
        let (_, groups) = groups_for(BlockRule::new("S", "E", "1").with_skips(1, 0));
        let input = ["S", "E", "zz", "E"];
        let (out, _) = scan(&groups[0], &input);
        assert_eq!(out, vec!["S", "E", "*z", "E"]);
    }

    #[test]
    fn test_trailing_window_stays_bounded() {
        let (_, groups) = groups_for(BlockRule::new("S", "E", "1").with_skips(0, 3));
        let mut scanner = BlockScanner::new(&groups[0], MaskingMode::Star);
        let mut counts = RuleCounts::new(1);
        let mut out = Vec::new();
        scanner.push("S".to_string(), &mut out, &mut counts);
        for i in 0..1000 {
            scanner.push(format!("line{}", i), &mut out, &mut counts);
            assert!(scanner.pending_len() <= 3);
        }
        assert_eq!(scanner.state(), BlockScanState::Masking);
        assert_eq!(out.len(), 1 + 1000 - 3);
    }

    #[test]
    fn test_whitespace_inside_body_survives() {
        let (_, groups) = groups_for(BlockRule::new("S", "E", "1-5"));
        let (out, total) = scan(&groups[0], &["S", "a b c", "E"]);
        assert_eq!(out[1], "* * *");
        assert_eq!(total, 3);
    }
}
