//! Character-position range parsing.
//!
//! Rules describe the characters to mask with 1-based, human friendly position
//! strings such as `"1-9, 31-40"`. This module turns those strings into
//! normalized 0-based inclusive [`CharRange`]s. Parsing never fails: malformed
//! tokens are filtered out and the remaining valid tokens still apply.
//!
//! License: MIT OR APACHE 2.0

use serde::{Deserialize, Serialize};

/// A 0-based inclusive span of character offsets. `start <= end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CharRange {
    pub start: usize,
    pub end: usize,
}

impl CharRange {
    /// Returns true when the character offset `index` lies inside this range.
    pub fn contains(&self, index: usize) -> bool {
        index >= self.start && index <= self.end
    }
}

/// Parses a comma-separated list of 1-based positions (`"N"` or `"N-M"`).
///
/// Tokens that are not numeric, start below 1, or end before they start are
/// dropped. The returned ranges keep the order of the accepted tokens.
pub fn parse_char_ranges(range_string: &str) -> Vec<CharRange> {
    range_string
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .filter_map(parse_token)
        .collect()
}

fn parse_token(token: &str) -> Option<CharRange> {
    let (start, end) = match token.split_once('-') {
        Some((start, end)) => (
            start.trim().parse::<i64>().ok()?,
            end.trim().parse::<i64>().ok()?,
        ),
        None => {
            let single = token.parse::<i64>().ok()?;
            (single, single)
        }
    };

    if start >= 1 && end >= start {
        Some(CharRange {
            start: (start - 1) as usize,
            end: (end - 1) as usize,
        })
    } else {
        None
    }
}

/// Sorts ranges and merges any that overlap or touch (`[1,3]` and `[4,6]`
/// become `[1,6]`).
pub fn coalesce_ranges(mut ranges: Vec<CharRange>) -> Vec<CharRange> {
    ranges.sort();
    let mut merged: Vec<CharRange> = Vec::with_capacity(ranges.len());
    for range in ranges {
        match merged.last_mut() {
            Some(last) if range.start <= last.end.saturating_add(1) => {
                last.end = last.end.max(range.end);
            }
            _ => merged.push(range),
        }
    }
    merged
}

/// True if any range in `ranges` covers `index`.
pub fn covers(ranges: &[CharRange], index: usize) -> bool {
    ranges.iter().any(|r| r.contains(index))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(start: usize, end: usize) -> CharRange {
        CharRange { start, end }
    }

    #[test]
    fn test_parse_single_and_span_tokens() {
        assert_eq!(parse_char_ranges("2-4,7"), vec![r(1, 3), r(6, 6)]);
    }

    #[test]
    fn test_parse_drops_invalid_tokens() {
        assert!(parse_char_ranges("0-2").is_empty());
        assert!(parse_char_ranges("5-3").is_empty());
        assert!(parse_char_ranges("abc, 1-x, -4").is_empty());
        assert_eq!(parse_char_ranges("0, foo, 3 , 5-3, 8-9"), vec![r(2, 2), r(7, 8)]);
    }

    #[test]
    fn test_parse_tolerates_whitespace_and_empty_tokens() {
        assert_eq!(parse_char_ranges(" 1 - 9 ,, 31-40 "), vec![r(0, 8), r(30, 39)]);
        assert!(parse_char_ranges("").is_empty());
        assert!(parse_char_ranges(" , ,").is_empty());
    }

    #[test]
    fn test_coalesce_merges_overlapping_and_adjacent() {
        let merged = coalesce_ranges(vec![r(10, 12), r(0, 3), r(4, 6), r(2, 5), r(20, 20)]);
        assert_eq!(merged, vec![r(0, 6), r(10, 12), r(20, 20)]);
    }

    #[test]
    fn test_covers() {
        let ranges = vec![r(1, 3), r(6, 6)];
        assert!(covers(&ranges, 1));
        assert!(covers(&ranges, 6));
        assert!(!covers(&ranges, 4));
        assert!(!covers(&[], 0));
    }
}
