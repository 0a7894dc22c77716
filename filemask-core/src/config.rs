//! Configuration management for `filemask-core`.
//!
//! A rule document is a list of rule records plus an optional document-level
//! `skipLines`. Records come in two shapes, selected by their `type` field:
//!
//! * `type1`: a single-line rule (`anchor`, `positionsString`).
//! * `type2`: a block rule (`anchorStart`, `anchorEnd`, `skipStart`, `skipEnd`,
//!   `linesPerRecord`, and a `positionsString` with one `&&`-separated segment
//!   per line of a record).
//!
//! Documents are read from JSON or YAML. Records with an unknown type are
//! skipped with a warning; a document that yields no usable rule is an error.
//!
//! License: MIT OR Apache-2.0

use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;

use crate::errors::FilemaskError;
use crate::ranges::{parse_char_ranges, CharRange};

pub const SINGLE_LINE_TYPE: &str = "type1";
pub const BLOCK_TYPE: &str = "type2";

/// Separator between per-line segments of a block rule's `positionsString`.
pub const RECORD_SEGMENT_SEPARATOR: &str = "&&";

/// A rule record exactly as it appears in a configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawRule {
    #[serde(rename = "type")]
    pub kind: String,
    /// Optional label used in reports.
    pub name: Option<String>,
    pub anchor: String,
    pub anchor_start: String,
    pub anchor_end: String,
    pub skip_start: i64,
    pub skip_end: i64,
    pub lines_per_record: i64,
    pub positions_string: String,
    pub case_sensitive: bool,
    pub use_raw_regex: bool,
    pub use_raw_regex_start: Option<bool>,
    pub use_raw_regex_end: Option<bool>,
}

impl Default for RawRule {
    fn default() -> Self {
        Self {
            kind: String::new(),
            name: None,
            anchor: String::new(),
            anchor_start: String::new(),
            anchor_end: String::new(),
            skip_start: 0,
            skip_end: 0,
            lines_per_record: 1,
            positions_string: String::new(),
            case_sensitive: false,
            use_raw_regex: false,
            use_raw_regex_start: None,
            use_raw_regex_end: None,
        }
    }
}

/// The top-level document shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RuleDocument {
    pub skip_lines: usize,
    pub rules: Vec<RawRule>,
}

/// Masks characters on every line matching `anchor`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SingleLineRule {
    /// Wildcard/OR expression or raw pattern. Empty means "every line".
    pub anchor: String,
    pub use_raw_regex: bool,
    pub case_sensitive: bool,
    pub ranges: Vec<CharRange>,
}

impl SingleLineRule {
    /// A case-insensitive wildcard rule.
    pub fn new(anchor: &str, positions: &str) -> Self {
        Self {
            anchor: anchor.to_string(),
            use_raw_regex: false,
            case_sensitive: false,
            ranges: parse_char_ranges(positions),
        }
    }
}

/// Masks the body lines of records delimited by a start and an end anchor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct BlockRule {
    pub anchor_start: String,
    pub anchor_end: String,
    /// Lines after the start anchor that are left untouched.
    pub skip_start: usize,
    /// Lines before the end anchor that are left untouched.
    pub skip_end: usize,
    /// Number of lines in one repeating record. Always at least 1.
    pub lines_per_record: usize,
    /// Ranges for each relative line of a record.
    pub record_ranges: Vec<Vec<CharRange>>,
    pub case_sensitive: bool,
    pub use_raw_regex_start: bool,
    pub use_raw_regex_end: bool,
}

impl BlockRule {
    /// A case-insensitive wildcard block rule with one range set per record
    /// line, given as an `&&`-separated positions string.
    pub fn new(anchor_start: &str, anchor_end: &str, positions: &str) -> Self {
        Self {
            anchor_start: anchor_start.to_string(),
            anchor_end: anchor_end.to_string(),
            skip_start: 0,
            skip_end: 0,
            lines_per_record: 1,
            record_ranges: parse_record_ranges(positions),
            case_sensitive: false,
            use_raw_regex_start: false,
            use_raw_regex_end: false,
        }
    }

    pub fn with_skips(mut self, skip_start: usize, skip_end: usize) -> Self {
        self.skip_start = skip_start;
        self.skip_end = skip_end;
        self
    }

    pub fn with_lines_per_record(mut self, lines_per_record: usize) -> Self {
        self.lines_per_record = lines_per_record.max(1);
        self
    }

    /// Ranges that apply to the line at `relative_index` within the body.
    pub fn ranges_for(&self, relative_index: usize) -> &[CharRange] {
        self.record_ranges
            .get(relative_index % self.lines_per_record.max(1))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Splits a block rule's positions string into one range set per record line.
pub fn parse_record_ranges(positions: &str) -> Vec<Vec<CharRange>> {
    positions
        .split(RECORD_SEGMENT_SEPARATOR)
        .map(|segment| parse_char_ranges(segment.trim()))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum RuleKind {
    SingleLine(SingleLineRule),
    Block(BlockRule),
}

/// A validated rule together with its position in the document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct MaskRule {
    /// 0-based position among the accepted rules.
    pub index: usize,
    /// Human readable label for reports.
    pub label: String,
    pub kind: RuleKind,
}

/// A parsed, validated rule set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MaskConfig {
    pub rules: Vec<MaskRule>,
    /// Leading lines of every file exempt from the single-line pass.
    pub skip_lines: usize,
}

impl MaskConfig {
    /// Builds a config from already-typed rules. Labels default to
    /// `rule <n> (<type>)`.
    pub fn new(kinds: Vec<RuleKind>, skip_lines: usize) -> Self {
        let rules = kinds
            .into_iter()
            .enumerate()
            .map(|(index, kind)| MaskRule {
                index,
                label: default_label(index, &kind),
                kind,
            })
            .collect();
        Self { rules, skip_lines }
    }

    /// Loads a rule document from a file. `.yaml`/`.yml` files are read as
    /// YAML, everything else as JSON.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading masking rules from: {}", path.display());
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let origin = path.display().to_string();
        let config = if is_yaml_path(path) {
            Self::from_yaml_str(&text, &origin)
        } else {
            Self::from_json_str(&text, &origin)
        }
        .with_context(|| format!("Failed to load config file {}", path.display()))?;

        info!("Loaded {} masking rules from '{}'.", config.rules.len(), origin);
        Ok(config)
    }

    pub fn from_json_str(text: &str, origin: &str) -> Result<Self, FilemaskError> {
        let document: RuleDocument =
            serde_json::from_str(text).map_err(|e| FilemaskError::Config(e.to_string()))?;
        Self::from_document(document, origin)
    }

    pub fn from_yaml_str(text: &str, origin: &str) -> Result<Self, FilemaskError> {
        let document: RuleDocument =
            serde_yml::from_str(text).map_err(|e| FilemaskError::Config(e.to_string()))?;
        Self::from_document(document, origin)
    }

    /// Validates a raw document. Unknown rule types are skipped; if nothing is
    /// left the document is rejected.
    pub fn from_document(document: RuleDocument, origin: &str) -> Result<Self, FilemaskError> {
        let mut rules = Vec::with_capacity(document.rules.len());
        for (position, raw) in document.rules.into_iter().enumerate() {
            let Some(kind) = raw_to_kind(&raw, position) else {
                continue;
            };
            let index = rules.len();
            let label = raw
                .name
                .clone()
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| default_label(position, &kind));
            rules.push(MaskRule { index, label, kind });
        }

        if rules.is_empty() {
            return Err(FilemaskError::EmptyRuleSet(origin.to_string()));
        }
        debug!(
            "Accepted {} rule(s) from '{}', skipLines={}.",
            rules.len(),
            origin,
            document.skip_lines
        );
        Ok(Self {
            rules,
            skip_lines: document.skip_lines,
        })
    }

    /// A stable SHA-256 fingerprint of the validated rule set.
    pub fn fingerprint(&self) -> Result<String, FilemaskError> {
        let bytes = serde_json::to_vec(self)
            .map_err(|e| FilemaskError::SerializationError(e.to_string()))?;
        Ok(hex::encode(Sha256::digest(&bytes)))
    }

    pub fn rules(&self) -> &[MaskRule] {
        &self.rules
    }

    pub fn single_line_rules(&self) -> impl Iterator<Item = (&MaskRule, &SingleLineRule)> {
        self.rules.iter().filter_map(|rule| match &rule.kind {
            RuleKind::SingleLine(single) => Some((rule, single)),
            RuleKind::Block(_) => None,
        })
    }

    pub fn block_rules(&self) -> impl Iterator<Item = (&MaskRule, &BlockRule)> {
        self.rules.iter().filter_map(|rule| match &rule.kind {
            RuleKind::Block(block) => Some((rule, block)),
            RuleKind::SingleLine(_) => None,
        })
    }
}

fn is_yaml_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"))
        .unwrap_or(false)
}

fn default_label(position: usize, kind: &RuleKind) -> String {
    let kind_name = match kind {
        RuleKind::SingleLine(_) => SINGLE_LINE_TYPE,
        RuleKind::Block(_) => BLOCK_TYPE,
    };
    format!("rule {} ({})", position + 1, kind_name)
}

fn non_negative(value: i64, field: &str, position: usize) -> usize {
    if value < 0 {
        warn!("Rule {}: {} is negative ({}). Using 0.", position + 1, field, value);
        0
    } else {
        value as usize
    }
}

fn raw_to_kind(raw: &RawRule, position: usize) -> Option<RuleKind> {
    match raw.kind.as_str() {
        SINGLE_LINE_TYPE => Some(RuleKind::SingleLine(SingleLineRule {
            anchor: raw.anchor.clone(),
            use_raw_regex: raw.use_raw_regex,
            case_sensitive: raw.case_sensitive,
            ranges: parse_char_ranges(&raw.positions_string),
        })),
        BLOCK_TYPE => {
            let lines_per_record = if raw.lines_per_record < 1 {
                warn!(
                    "Rule {}: linesPerRecord < 1 ({}). Using 1.",
                    position + 1,
                    raw.lines_per_record
                );
                1
            } else {
                raw.lines_per_record as usize
            };
            Some(RuleKind::Block(BlockRule {
                anchor_start: raw.anchor_start.clone(),
                anchor_end: raw.anchor_end.clone(),
                skip_start: non_negative(raw.skip_start, "skipStart", position),
                skip_end: non_negative(raw.skip_end, "skipEnd", position),
                lines_per_record,
                record_ranges: parse_record_ranges(&raw.positions_string),
                case_sensitive: raw.case_sensitive,
                use_raw_regex_start: raw.use_raw_regex_start.unwrap_or(raw.use_raw_regex),
                use_raw_regex_end: raw.use_raw_regex_end.unwrap_or(raw.use_raw_regex),
            }))
        }
        other => {
            warn!("Skipping rule {} with unknown type '{}'.", position + 1, other);
            None
        }
    }
}
