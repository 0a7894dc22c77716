//! Anchor compilation.
//!
//! An anchor decides which lines a rule applies to. Two dialects are supported:
//!
//! * **Wildcard/OR** (default): alternatives separated by `|`, where `%` stands
//!   for any run of characters. An alternative is anchored to the start of the
//!   line unless it begins with `%`, and to the end unless it ends with `%`.
//!   `ACC%|%TOTAL%` matches lines starting with `ACC` or containing `TOTAL`.
//! * **Raw**: the anchor is handed to the `regex` crate untouched.
//!
//! A broken anchor never aborts a batch. Empty anchors, anchors with no
//! alternatives, and raw patterns that fail to compile all produce
//! [`AnchorMatcher::Never`].
//!
//! License: MIT OR APACHE 2.0

use log::{debug, warn};
use regex::{Regex, RegexBuilder};

/// Upper bound for a single compiled anchor program.
pub const ANCHOR_SIZE_LIMIT: usize = 10 * (1 << 20);

/// A compiled line predicate.
#[derive(Debug, Clone)]
pub enum AnchorMatcher {
    /// Matches nothing. Produced for empty or invalid anchors.
    Never,
    /// A compiled pattern, searched (not fully matched) against each line.
    Pattern(Regex),
}

impl AnchorMatcher {
    /// Compiles `anchor` into a matcher. Matching is case-insensitive unless
    /// `case_sensitive` is set.
    pub fn compile(anchor: &str, use_raw: bool, case_sensitive: bool) -> Self {
        let Some(source) = anchor_source(anchor, use_raw) else {
            return AnchorMatcher::Never;
        };

        match build_anchor_regex(&source, case_sensitive) {
            Ok(regex) => {
                debug!("Compiled anchor '{}' as pattern '{}'.", anchor, source);
                AnchorMatcher::Pattern(regex)
            }
            Err(e) => {
                warn!("Anchor '{}' is not a valid pattern and will never match: {}", anchor, e);
                AnchorMatcher::Never
            }
        }
    }

    /// Returns true when the line contains a match for this anchor.
    pub fn is_match(&self, line: &str) -> bool {
        match self {
            AnchorMatcher::Never => false,
            AnchorMatcher::Pattern(regex) => regex.is_match(line),
        }
    }

    pub fn is_never(&self) -> bool {
        matches!(self, AnchorMatcher::Never)
    }
}

fn build_anchor_regex(source: &str, case_sensitive: bool) -> Result<Regex, regex::Error> {
    RegexBuilder::new(source)
        .case_insensitive(!case_sensitive)
        .size_limit(ANCHOR_SIZE_LIMIT)
        .build()
}

/// Produces the pattern source for an anchor without compiling it.
///
/// Returns `None` when the anchor can never match: an empty anchor, or a
/// wildcard anchor whose alternatives are all empty. Raw anchors are returned
/// verbatim and may still fail to compile.
pub fn anchor_source(anchor: &str, use_raw: bool) -> Option<String> {
    if anchor.is_empty() {
        return None;
    }
    if use_raw {
        return Some(anchor.to_string());
    }

    let parts: Vec<String> = anchor
        .split('|')
        .filter(|alternative| !alternative.is_empty())
        .map(wildcard_alternative)
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("|"))
    }
}

fn wildcard_alternative(alternative: &str) -> String {
    let escaped = regex::escape(alternative).replace('%', ".*");
    let mut part = String::with_capacity(escaped.len() + 2);
    if !alternative.starts_with('%') {
        part.push('^');
    }
    part.push_str(&escaped);
    if !alternative.ends_with('%') {
        part.push('$');
    }
    part
}

/// Produces the source for an anchor that is known to compile on its own, or
/// `None` if it never matches. Used by the aggregator so that one bad raw
/// anchor cannot poison a combined pattern set.
pub fn validated_anchor_source(anchor: &str, use_raw: bool, case_sensitive: bool) -> Option<String> {
    let source = anchor_source(anchor, use_raw)?;
    match build_anchor_regex(&source, case_sensitive) {
        Ok(_) => Some(source),
        Err(e) => {
            warn!("Anchor '{}' is not a valid pattern and will never match: {}", anchor, e);
            None
        }
    }
}
