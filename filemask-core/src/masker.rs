//! The single-line masking primitive.
//!
//! Given a line and a set of [`CharRange`]s, every character that falls inside
//! a range and is not whitespace gets obscured. Two modes exist:
//!
//! * [`MaskingMode::Star`] overwrites each selected character with `*`.
//! * [`MaskingMode::Scramble`] permutes the selected characters among their own
//!   slots. Every shuffle step draws from SHA-256 of the selected characters
//!   and the step index, so identical input always scrambles identically, in
//!   any process, build or call order.
//!
//! The mode is always an explicit argument; nothing in this module keeps state
//! between calls.
//!
//! License: MIT OR APACHE 2.0

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::ranges::{covers, CharRange};

/// How selected characters are obscured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaskingMode {
    /// Replace every selected character with `*`.
    #[default]
    Star,
    /// Deterministically permute the selected characters.
    Scramble,
}

/// The mask character used by [`MaskingMode::Star`].
pub const STAR: char = '*';

/// Returns the character indices of `chars` that the ranges select.
pub fn select_indices(chars: &[char], ranges: &[CharRange]) -> Vec<usize> {
    if ranges.is_empty() {
        return Vec::new();
    }
    chars
        .iter()
        .enumerate()
        .filter(|(i, c)| !c.is_whitespace() && covers(ranges, *i))
        .map(|(i, _)| i)
        .collect()
}

/// Masks one line. Returns the new line and the number of characters masked.
///
/// When nothing is selected the original line is returned untouched.
pub fn mask_line(line: &str, ranges: &[CharRange], mode: MaskingMode) -> (String, usize) {
    let mut chars: Vec<char> = line.chars().collect();
    let selected = select_indices(&chars, ranges);
    if selected.is_empty() {
        return (line.to_string(), 0);
    }
    apply_mask(&mut chars, &selected, mode);
    (chars.into_iter().collect(), selected.len())
}

/// Obscures `chars` at the given indices in place.
pub(crate) fn apply_mask(chars: &mut [char], selected: &[usize], mode: MaskingMode) {
    match mode {
        MaskingMode::Star => {
            for &i in selected {
                chars[i] = STAR;
            }
        }
        MaskingMode::Scramble => {
            let mut picked: Vec<char> = selected.iter().map(|&i| chars[i]).collect();
            scramble_in_place(&mut picked);
            for (&slot, c) in selected.iter().zip(picked) {
                chars[slot] = c;
            }
        }
    }
}

/// Fisher-Yates shuffle whose draws come from SHA-256 alone: the seed is the
/// digest of the characters being scrambled, and step `i` uses the first eight
/// bytes of `SHA-256(seed || i)`.
fn scramble_in_place(picked: &mut [char]) {
    let text: String = picked.iter().collect();
    let seed = Sha256::digest(text.as_bytes());
    for i in (1..picked.len()).rev() {
        let mut hasher = Sha256::new();
        hasher.update(&seed[..]);
        hasher.update((i as u64).to_be_bytes());
        let draw = hasher.finalize();
        let mut word = [0u8; 8];
        word.copy_from_slice(&draw[..8]);
        let j = (u64::from_be_bytes(word) % (i as u64 + 1)) as usize;
        picked.swap(i, j);
    }
}
