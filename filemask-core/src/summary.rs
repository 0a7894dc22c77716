//! Data structures for reporting how many characters each rule masked, plus
//! the PII-aware debug logging helpers used while masking.

use lazy_static::lazy_static;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::MaskConfig;

lazy_static! {
    /// Whether raw line content may appear in debug logs.
    static ref PII_DEBUG_ALLOWED: bool = {
        std::env::var("FILEMASK_ALLOW_DEBUG_PII")
            .map(|s| s.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    };
}

/// The masked-character total for one rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskSummaryItem {
    pub rule_index: usize,
    pub rule_label: String,
    pub masked_chars: usize,
}

/// Totals produced by one masking run over one line sequence (or, once
/// merged, over a batch).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskReport {
    pub total_masked: usize,
    pub lines_processed: usize,
    pub per_rule: Vec<MaskSummaryItem>,
}

impl MaskReport {
    /// Adds another report's totals into this one, matching rules by index.
    pub fn merge(&mut self, other: &MaskReport) {
        self.total_masked += other.total_masked;
        self.lines_processed += other.lines_processed;
        for item in &other.per_rule {
            match self.per_rule.iter_mut().find(|i| i.rule_index == item.rule_index) {
                Some(existing) => existing.masked_chars += item.masked_chars,
                None => self.per_rule.push(item.clone()),
            }
        }
        self.per_rule.sort_by_key(|i| i.rule_index);
    }

    pub fn masked_by(&self, rule_index: usize) -> usize {
        self.per_rule
            .iter()
            .find(|i| i.rule_index == rule_index)
            .map(|i| i.masked_chars)
            .unwrap_or(0)
    }
}

/// Per-rule counters indexed by `MaskRule::index`.
#[derive(Debug, Clone, Default)]
pub struct RuleCounts {
    counts: Vec<usize>,
}

impl RuleCounts {
    pub fn new(rule_count: usize) -> Self {
        Self { counts: vec![0; rule_count] }
    }

    pub fn add(&mut self, rule_index: usize, masked: usize) {
        if rule_index >= self.counts.len() {
            self.counts.resize(rule_index + 1, 0);
        }
        self.counts[rule_index] += masked;
    }

    pub fn credit(&mut self, attribution: &[(usize, usize)]) {
        for &(rule_index, masked) in attribution {
            self.add(rule_index, masked);
        }
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// Converts the counters into a report labelled from `config`.
    pub fn into_report(self, config: &MaskConfig, lines_processed: usize) -> MaskReport {
        let total_masked = self.total();
        let per_rule = config
            .rules
            .iter()
            .map(|rule| MaskSummaryItem {
                rule_index: rule.index,
                rule_label: rule.label.clone(),
                masked_chars: self.counts.get(rule.index).copied().unwrap_or(0),
            })
            .collect();
        MaskReport {
            total_masked,
            lines_processed,
            per_rule,
        }
    }
}

/// Replaces sensitive text with a length-only placeholder.
pub fn redact_sensitive(s: &str) -> String {
    const MAX_LEN: usize = 8;
    if s.chars().count() <= MAX_LEN {
        "[REDACTED]".to_string()
    } else {
        format!("[REDACTED: {} chars]", s.chars().count())
    }
}

fn get_loggable_content(sensitive_content: &str) -> String {
    if *PII_DEBUG_ALLOWED {
        sensitive_content.to_string()
    } else {
        redact_sensitive(sensitive_content)
    }
}

pub fn log_masked_line_debug(stage: &str, line_index: usize, original: &str, masked: &str) {
    debug!(
        "{} masked line {}: Original='{}', Masked='{}'",
        stage,
        line_index,
        get_loggable_content(original),
        masked
    );
}
