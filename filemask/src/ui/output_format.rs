//! Formatting of status messages written to stderr.
//!
//! Every message is written to a caller-provided writer so tests can capture
//! it. Colour is applied only when the caller says the writer supports it.

use owo_colors::OwoColorize;
use std::io::{self, Write};

use super::theme::{color_for, ThemeEntry, ThemeMap};

/// Applies the theme colour for `entry` to `text` when `enable_colors` is set.
pub fn styled(text: &str, entry: ThemeEntry, theme: &ThemeMap, enable_colors: bool) -> String {
    match color_for(theme, entry) {
        Some(color) if enable_colors => text.color(color).to_string(),
        _ => text.to_string(),
    }
}

fn print_prefixed<W: Write>(
    writer: &mut W,
    prefix: &str,
    message: &str,
    entry: ThemeEntry,
    theme: &ThemeMap,
    enable_colors: bool,
) -> io::Result<()> {
    let line = format!("{} {}", prefix, message);
    writeln!(writer, "{}", styled(&line, entry, theme, enable_colors))
}

pub fn print_info_message<W: Write>(
    writer: &mut W,
    message: &str,
    theme: &ThemeMap,
    enable_colors: bool,
) -> io::Result<()> {
    print_prefixed(writer, "[INFO]", message, ThemeEntry::Info, theme, enable_colors)
}

pub fn print_warn_message<W: Write>(
    writer: &mut W,
    message: &str,
    theme: &ThemeMap,
    enable_colors: bool,
) -> io::Result<()> {
    print_prefixed(writer, "[WARN]", message, ThemeEntry::Warn, theme, enable_colors)
}

pub fn print_error_message<W: Write>(
    writer: &mut W,
    message: &str,
    theme: &ThemeMap,
    enable_colors: bool,
) -> io::Result<()> {
    print_prefixed(writer, "[ERROR]", message, ThemeEntry::Error, theme, enable_colors)
}

pub fn print_success_message<W: Write>(
    writer: &mut W,
    message: &str,
    theme: &ThemeMap,
    enable_colors: bool,
) -> io::Result<()> {
    print_prefixed(writer, "[OK]", message, ThemeEntry::Success, theme, enable_colors)
}
