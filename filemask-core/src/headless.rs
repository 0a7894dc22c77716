// filemask-core/src/headless.rs

//! Convenience wrappers for one-shot, non-interactive masking of a string.

use anyhow::Result;

use crate::config::MaskConfig;
use crate::engine::MaskingEngine;
use crate::lines::{join_lines, split_lines, TextLayout};
use crate::masker::MaskingMode;
use crate::strategy::StrategyKind;
use crate::summary::MaskReport;

/// Masks `content` with `config` in a single call.
///
/// The content's line terminator style and trailing newline are preserved.
///
/// # Arguments
///
/// * `config` - The validated rule set.
/// * `content` - The text to mask.
/// * `mode` - Star or scramble.
/// * `strategy` - Buffered or streaming; both give the same result.
pub fn headless_mask_string(
    config: &MaskConfig,
    content: &str,
    mode: MaskingMode,
    strategy: StrategyKind,
) -> Result<(String, MaskReport)> {
    let engine = MaskingEngine::new(config)?;
    let layout = TextLayout::of_str(content);

    let mut source = split_lines(content)
        .into_iter()
        .map(Ok::<String, std::io::Error>);
    let mut masked: Vec<String> = Vec::new();
    let report = engine.run(strategy, &mut source, &mut masked, mode)?;

    Ok((join_lines(&masked, layout), report))
}
