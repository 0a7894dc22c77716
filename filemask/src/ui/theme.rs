//! Colours for the different kinds of terminal output.
//!
//! Each logical output element maps to an optional foreground colour. The map
//! is built once at startup and passed to everything that prints.

use owo_colors::AnsiColors;
use std::collections::HashMap;

/// Type alias for the theme map, providing a consistent type definition.
pub type ThemeMap = HashMap<ThemeEntry, ThemeStyle>;

/// The different logical parts of the output that can be styled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThemeEntry {
    Header,
    Success,
    Info,
    Warn,
    Error,
    SummaryRuleName,
    SummaryOccurrences,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ThemeStyle {
    pub fg: Option<AnsiColors>,
}

/// Returns the default theme.
pub fn default_theme_map() -> ThemeMap {
    HashMap::from([
        (ThemeEntry::Header, ThemeStyle { fg: Some(AnsiColors::BrightCyan) }),
        (ThemeEntry::Success, ThemeStyle { fg: Some(AnsiColors::Green) }),
        (ThemeEntry::Info, ThemeStyle { fg: Some(AnsiColors::White) }),
        (ThemeEntry::Warn, ThemeStyle { fg: Some(AnsiColors::Yellow) }),
        (ThemeEntry::Error, ThemeStyle { fg: Some(AnsiColors::Red) }),
        (ThemeEntry::SummaryRuleName, ThemeStyle { fg: Some(AnsiColors::Magenta) }),
        (ThemeEntry::SummaryOccurrences, ThemeStyle { fg: Some(AnsiColors::BrightYellow) }),
    ])
}

/// The colour for `entry`, if the theme defines one.
pub fn color_for(theme: &ThemeMap, entry: ThemeEntry) -> Option<AnsiColors> {
    theme.get(&entry).and_then(|style| style.fg)
}
