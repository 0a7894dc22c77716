//! Rule aggregation.
//!
//! Many rules usually share a file. Rather than scanning every line once per
//! rule, single-line rules are folded into at most two [`RegexSet`]s (one per
//! case-sensitivity bucket) and block rules with the same structure are merged
//! into one [`BlockGroup`], so the block state machine runs once per group.
//!
//! Each pattern index in a set maps back to the rule that contributed it, which
//! keeps per-rule counts exact: a masked character is credited to the
//! lowest-indexed rule whose ranges cover it.
//!
//! License: MIT OR APACHE 2.0

use log::{debug, warn};
use regex::{RegexSet, RegexSetBuilder};
use std::collections::HashMap;

use crate::anchor::{validated_anchor_source, AnchorMatcher, ANCHOR_SIZE_LIMIT};
use crate::config::{BlockRule, MaskConfig};
use crate::errors::FilemaskError;
use crate::masker::{apply_mask, select_indices, MaskingMode};
use crate::ranges::{coalesce_ranges, covers, CharRange};
use crate::summary::RuleCounts;

/// `(rule_index, masked_chars)` pairs for one masked line.
pub type Attribution = Vec<(usize, usize)>;

/// Ranges contributed by one rule.
#[derive(Debug, Clone)]
pub struct TaggedRanges {
    pub rule_index: usize,
    pub ranges: Vec<CharRange>,
}

#[derive(Debug)]
struct AnchorBucket {
    case_sensitive: bool,
    set: RegexSet,
    /// `members[i]` belongs to pattern `i` of `set`.
    members: Vec<TaggedRanges>,
}

/// All single-line rules of a config, compiled for a one-scan-per-line pass.
#[derive(Debug)]
pub struct SingleLineRuleSet {
    buckets: Vec<AnchorBucket>,
    always: Vec<TaggedRanges>,
    skip_lines: usize,
}

impl SingleLineRuleSet {
    pub fn build(config: &MaskConfig) -> Result<Self, FilemaskError> {
        let mut always = Vec::new();
        let mut pending: [(Vec<String>, Vec<TaggedRanges>); 2] = Default::default();

        for (rule, single) in config.single_line_rules() {
            if single.ranges.is_empty() {
                debug!("Dropping '{}': no valid positions.", rule.label);
                continue;
            }
            let tagged = TaggedRanges {
                rule_index: rule.index,
                ranges: single.ranges.clone(),
            };
            if single.anchor.is_empty() {
                debug!("'{}' has an empty anchor and applies to every line.", rule.label);
                always.push(tagged);
                continue;
            }
            let Some(source) =
                validated_anchor_source(&single.anchor, single.use_raw_regex, single.case_sensitive)
            else {
                warn!("Rule '{}' can never match and is ignored.", rule.label);
                continue;
            };
            let slot = &mut pending[usize::from(single.case_sensitive)];
            slot.0.push(source);
            slot.1.push(tagged);
        }

        let mut buckets = Vec::new();
        for (case_sensitive, (patterns, members)) in [false, true].into_iter().zip(pending) {
            if patterns.is_empty() {
                continue;
            }
            let set_limit = ANCHOR_SIZE_LIMIT.saturating_mul(patterns.len());
            buckets.extend(compile_buckets(case_sensitive, patterns, members, set_limit)?);
        }

        Ok(Self {
            buckets,
            always,
            skip_lines: config.skip_lines,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty() && self.always.is_empty()
    }

    /// Ranges of every rule that applies to `line`, ordered by rule index.
    pub fn matching_ranges(&self, line: &str) -> Vec<&TaggedRanges> {
        let mut matched: Vec<&TaggedRanges> = self.always.iter().collect();
        for bucket in &self.buckets {
            matched.extend(bucket.set.matches(line).iter().map(|i| &bucket.members[i]));
        }
        matched.sort_by_key(|t| t.rule_index);
        matched
    }

    /// Masks one line. Lines before `skip_lines` are returned untouched.
    pub fn apply(
        &self,
        line: String,
        line_index: usize,
        mode: MaskingMode,
        counts: &mut RuleCounts,
    ) -> String {
        if line_index < self.skip_lines || self.is_empty() {
            return line;
        }
        let matched = self.matching_ranges(&line);
        if matched.is_empty() {
            return line;
        }
        let union: Vec<CharRange> = matched.iter().flat_map(|t| t.ranges.iter().copied()).collect();
        let contributors = matched.iter().map(|t| (t.rule_index, t.ranges.as_slice()));
        match mask_with_attribution(&line, &union, contributors, mode) {
            Some((masked, attribution)) => {
                counts.credit(&attribution);
                masked
            }
            None => line,
        }
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn case_sensitive_buckets(&self) -> impl Iterator<Item = bool> + '_ {
        self.buckets.iter().map(|b| b.case_sensitive)
    }
}

/// Compiles one case bucket into a single set limited to `set_limit`. When the
/// combined program does not fit, each anchor gets its own set at the
/// single-anchor limit it was validated against.
fn compile_buckets(
    case_sensitive: bool,
    patterns: Vec<String>,
    members: Vec<TaggedRanges>,
    set_limit: usize,
) -> Result<Vec<AnchorBucket>, FilemaskError> {
    let build = |sources: &[String], limit: usize| {
        RegexSetBuilder::new(sources)
            .case_insensitive(!case_sensitive)
            .size_limit(limit)
            .build()
    };

    match build(&patterns, set_limit) {
        Ok(set) => {
            debug!(
                "Aggregated {} single-line anchor(s) into one set (case_sensitive={}).",
                patterns.len(),
                case_sensitive
            );
            Ok(vec![AnchorBucket {
                case_sensitive,
                set,
                members,
            }])
        }
        Err(e) => {
            warn!(
                "Combined anchor set (case_sensitive={}) does not compile ({}); matching {} anchor(s) one by one.",
                case_sensitive,
                e,
                patterns.len()
            );
            patterns
                .iter()
                .zip(members)
                .map(|(source, member)| -> Result<AnchorBucket, FilemaskError> {
                    let set = build(std::slice::from_ref(source), ANCHOR_SIZE_LIMIT)?;
                    Ok(AnchorBucket {
                        case_sensitive,
                        set,
                        members: vec![member],
                    })
                })
                .collect()
        }
    }
}

/// Masks `line` with the union of ranges and attributes every masked character
/// to the first contributor (in iteration order) covering it.
///
/// Returns `None` when no character was selected.
pub(crate) fn mask_with_attribution<'a>(
    line: &str,
    union: &[CharRange],
    contributors: impl Iterator<Item = (usize, &'a [CharRange])>,
    mode: MaskingMode,
) -> Option<(String, Attribution)> {
    let mut chars: Vec<char> = line.chars().collect();
    let selected = select_indices(&chars, union);
    if selected.is_empty() {
        return None;
    }

    let contributors: Vec<(usize, &[CharRange])> = contributors.collect();
    let mut attribution: Attribution = Vec::new();
    for &index in &selected {
        let Some(&(rule_index, _)) = contributors.iter().find(|(_, ranges)| covers(ranges, index))
        else {
            continue;
        };
        match attribution.iter_mut().find(|(r, _)| *r == rule_index) {
            Some(entry) => entry.1 += 1,
            None => attribution.push((rule_index, 1)),
        }
    }

    apply_mask(&mut chars, &selected, mode);
    Some((chars.into_iter().collect(), attribution))
}

/// Everything that must be equal for two block rules to share one scan.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlockSignature {
    pub anchor_start: String,
    pub anchor_end: String,
    pub skip_start: usize,
    pub skip_end: usize,
    pub lines_per_record: usize,
    pub case_sensitive: bool,
    pub use_raw_regex_start: bool,
    pub use_raw_regex_end: bool,
}

impl From<&BlockRule> for BlockSignature {
    fn from(rule: &BlockRule) -> Self {
        Self {
            anchor_start: rule.anchor_start.clone(),
            anchor_end: rule.anchor_end.clone(),
            skip_start: rule.skip_start,
            skip_end: rule.skip_end,
            lines_per_record: rule.lines_per_record.max(1),
            case_sensitive: rule.case_sensitive,
            use_raw_regex_start: rule.use_raw_regex_start,
            use_raw_regex_end: rule.use_raw_regex_end,
        }
    }
}

/// One member rule of a [`BlockGroup`].
#[derive(Debug, Clone)]
pub struct BlockMember {
    pub rule_index: usize,
    /// The member's own ranges per relative record line.
    pub line_ranges: Vec<Vec<CharRange>>,
}

/// Block rules with an identical [`BlockSignature`], merged.
#[derive(Debug)]
pub struct BlockGroup {
    pub signature: BlockSignature,
    pub start: AnchorMatcher,
    pub end: AnchorMatcher,
    /// Union of all members' ranges, one entry per relative record line.
    pub line_ranges: Vec<Vec<CharRange>>,
    pub members: Vec<BlockMember>,
}

impl BlockGroup {
    fn new(signature: BlockSignature) -> Self {
        let start = AnchorMatcher::compile(
            &signature.anchor_start,
            signature.use_raw_regex_start,
            signature.case_sensitive,
        );
        let end = AnchorMatcher::compile(
            &signature.anchor_end,
            signature.use_raw_regex_end,
            signature.case_sensitive,
        );
        let line_ranges = vec![Vec::new(); signature.lines_per_record];
        Self {
            signature,
            start,
            end,
            line_ranges,
            members: Vec::new(),
        }
    }

    fn absorb(&mut self, rule_index: usize, rule: &BlockRule) {
        let record_len = self.signature.lines_per_record;
        let member_ranges: Vec<Vec<CharRange>> =
            (0..record_len).map(|i| rule.ranges_for(i).to_vec()).collect();
        for (merged, own) in self.line_ranges.iter_mut().zip(&member_ranges) {
            let mut combined = std::mem::take(merged);
            combined.extend(own.iter().copied());
            *merged = coalesce_ranges(combined);
        }
        self.members.push(BlockMember {
            rule_index,
            line_ranges: member_ranges,
        });
    }

    pub fn skip_start(&self) -> usize {
        self.signature.skip_start
    }

    pub fn skip_end(&self) -> usize {
        self.signature.skip_end
    }

    pub fn lines_per_record(&self) -> usize {
        self.signature.lines_per_record
    }

    /// True if no member has any range, so scanning would change nothing.
    pub fn is_inert(&self) -> bool {
        self.line_ranges.iter().all(Vec::is_empty)
    }

    /// Masks a body line at `relative_index`. Returns `None` when nothing on
    /// the line is selected.
    pub fn mask_body_line(
        &self,
        line: &str,
        relative_index: usize,
        mode: MaskingMode,
    ) -> Option<(String, Attribution)> {
        let slot = relative_index % self.lines_per_record();
        let union = &self.line_ranges[slot];
        if union.is_empty() {
            return None;
        }
        let contributors = self
            .members
            .iter()
            .map(|m| (m.rule_index, m.line_ranges[slot].as_slice()));
        mask_with_attribution(line, union, contributors, mode)
    }
}

/// Merges the config's block rules into groups, in order of first appearance.
pub fn build_block_groups(config: &MaskConfig) -> Vec<BlockGroup> {
    let mut groups: Vec<BlockGroup> = Vec::new();
    let mut by_signature: HashMap<BlockSignature, usize> = HashMap::new();

    for (rule, block) in config.block_rules() {
        let signature = BlockSignature::from(block);
        let slot = *by_signature.entry(signature.clone()).or_insert_with(|| {
            groups.push(BlockGroup::new(signature));
            groups.len() - 1
        });
        groups[slot].absorb(rule.index, block);
    }

    let before = groups.len();
    groups.retain(|g| {
        if g.is_inert() {
            debug!(
                "Dropping block group '{}'..'{}': no valid positions.",
                g.signature.anchor_start, g.signature.anchor_end
            );
        }
        !g.is_inert()
    });
    debug!(
        "Aggregated block rules into {} group(s) ({} dropped as inert).",
        groups.len(),
        before - groups.len()
    );
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RuleKind, SingleLineRule};
    use crate::masker::mask_line;
    use crate::ranges::parse_char_ranges;

    fn single(anchor: &str, positions: &str) -> RuleKind {
        RuleKind::SingleLine(SingleLineRule::new(anchor, positions))
    }

    #[test]
    fn test_matching_ranges_traces_rules() {
        let config = MaskConfig::new(
            vec![single("ACC%", "1-3"), single("%TOTAL%", "5-6"), single("NOPE", "1")],
            0,
        );
        let set = SingleLineRuleSet::build(&config).unwrap();
        let matched: Vec<usize> = set
            .matching_ranges("ACC TOTAL 99")
            .iter()
            .map(|t| t.rule_index)
            .collect();
        assert_eq!(matched, vec![0, 1]);
        assert_eq!(set.bucket_count(), 1);
    }

    #[test]
    fn test_oversized_set_falls_back_to_one_set_per_anchor() {
        let patterns = vec!["^acc.*$".to_string(), "^.*total.*$".to_string()];
        let members = vec![
            TaggedRanges { rule_index: 0, ranges: parse_char_ranges("1-3") },
            TaggedRanges { rule_index: 1, ranges: parse_char_ranges("5-6") },
        ];
        let buckets = compile_buckets(false, patterns, members, 1).unwrap();
        assert_eq!(buckets.len(), 2);
        assert!(buckets[0].set.is_match("ACC 1"));
        assert!(!buckets[0].set.is_match("x TOTAL"));
        assert!(buckets[1].set.is_match("x TOTAL"));
        assert_eq!(buckets[1].members[0].rule_index, 1);
    }

    #[test]
    fn test_case_buckets_are_separate() {
        let mut sensitive = SingleLineRule::new("Key%", "1-3");
        sensitive.case_sensitive = true;
        let config = MaskConfig::new(vec![single("id%", "1"), RuleKind::SingleLine(sensitive)], 0);
        let set = SingleLineRuleSet::build(&config).unwrap();
        assert_eq!(set.case_sensitive_buckets().collect::<Vec<_>>(), vec![false, true]);
        assert_eq!(set.matching_ranges("ID 1").len(), 1);
        assert_eq!(set.matching_ranges("KEY=1").len(), 0);
        assert_eq!(set.matching_ranges("Key=1").len(), 1);
    }

    #[test]
    fn test_empty_anchor_applies_everywhere_and_empty_ranges_drop() {
        let config = MaskConfig::new(vec![single("", "1"), single("X%", "0-1")], 0);
        let set = SingleLineRuleSet::build(&config).unwrap();
        let mut counts = RuleCounts::new(2);
        let out = set.apply("abc".to_string(), 0, MaskingMode::Star, &mut counts);
        assert_eq!(out, "*bc");
        let out = set.apply("Xyz".to_string(), 1, MaskingMode::Star, &mut counts);
        assert_eq!(out, "*yz");
        assert_eq!(counts.total(), 2);
    }

    #[test]
    fn test_invalid_raw_anchor_is_ignored_not_fatal() {
        let mut bad = SingleLineRule::new("([", "1-2");
        bad.use_raw_regex = true;
        let config = MaskConfig::new(vec![RuleKind::SingleLine(bad), single("ok%", "1-2")], 0);
        let set = SingleLineRuleSet::build(&config).unwrap();
        let mut counts = RuleCounts::new(2);
        assert_eq!(set.apply("([ x".to_string(), 0, MaskingMode::Star, &mut counts), "([ x");
        assert_eq!(set.apply("ok go".to_string(), 1, MaskingMode::Star, &mut counts), "** go");
    }

    #[test]
    fn test_skip_lines_exempts_header() {
        let config = MaskConfig::new(vec![single("%", "1-3")], 2);
        let set = SingleLineRuleSet::build(&config).unwrap();
        let mut counts = RuleCounts::new(1);
        assert_eq!(set.apply("HDR".to_string(), 0, MaskingMode::Star, &mut counts), "HDR");
        assert_eq!(set.apply("HDR".to_string(), 1, MaskingMode::Star, &mut counts), "HDR");
        assert_eq!(set.apply("abc".to_string(), 2, MaskingMode::Star, &mut counts), "***");
    }

    #[test]
    fn test_overlap_is_credited_to_first_rule() {
        let config = MaskConfig::new(vec![single("%", "1-4"), single("%", "3-6")], 0);
        let set = SingleLineRuleSet::build(&config).unwrap();
        let mut counts = RuleCounts::new(2);
        let out = set.apply("abcdefgh".to_string(), 0, MaskingMode::Star, &mut counts);
        assert_eq!(out, "******gh");
        let report = counts.into_report(&config, 1);
        assert_eq!(report.masked_by(0), 4);
        assert_eq!(report.masked_by(1), 2);
        assert_eq!(report.total_masked, 6);
    }

    #[test]
    fn test_aggregation_matches_rule_by_rule_application() {
        let rules = vec![("ACC%", "1-3"), ("%NAME%", "6-12")];
        let config = MaskConfig::new(rules.iter().map(|(a, p)| single(a, p)).collect(), 0);
        let set = SingleLineRuleSet::build(&config).unwrap();
        let lines = ["ACC 12345", "xx NAME john doe", "nothing here"];

        let mut counts = RuleCounts::new(2);
        let aggregated: Vec<String> = lines
            .iter()
            .enumerate()
            .map(|(i, l)| set.apply(l.to_string(), i, MaskingMode::Star, &mut counts))
            .collect();

        let mut one_by_one: Vec<String> = lines.iter().map(|l| l.to_string()).collect();
        let mut total = 0;
        for (anchor, positions) in &rules {
            let matcher = AnchorMatcher::compile(anchor, false, false);
            let ranges = crate::ranges::parse_char_ranges(positions);
            for line in one_by_one.iter_mut() {
                if matcher.is_match(line) {
                    let (masked, n) = mask_line(line, &ranges, MaskingMode::Star);
                    *line = masked;
                    total += n;
                }
            }
        }

        assert_eq!(aggregated, one_by_one);
        assert_eq!(counts.total(), total);
    }

    #[test]
    fn test_block_rules_with_same_signature_merge() {
        let a = BlockRule::new("S", "E", "1-2 && 5").with_lines_per_record(2);
        let b = BlockRule::new("S", "E", "3-4").with_lines_per_record(2);
        let c = BlockRule::new("S", "E", "1").with_lines_per_record(2).with_skips(1, 0);
        let config = MaskConfig::new(
            vec![RuleKind::Block(a), RuleKind::Block(b), RuleKind::Block(c)],
            0,
        );
        let groups = build_block_groups(&config);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].members.len(), 2);
        assert_eq!(groups[0].line_ranges[0], vec![CharRange { start: 0, end: 3 }]);
        assert_eq!(groups[0].line_ranges[1], vec![CharRange { start: 4, end: 4 }]);
        assert_eq!(groups[1].skip_start(), 1);
    }

    #[test]
    fn test_inert_block_group_is_dropped() {
        let config = MaskConfig::new(vec![RuleKind::Block(BlockRule::new("S", "E", "0-1"))], 0);
        assert!(build_block_groups(&config).is_empty());
    }
}
