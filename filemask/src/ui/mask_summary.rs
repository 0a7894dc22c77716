//! Renders the per-rule masking summary as a table.

use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, CellAlignment, Color, ContentArrangement, Table};
use filemask_core::MaskReport;
use owo_colors::AnsiColors;
use std::io::{self, Write};

use super::output_format::styled;
use super::theme::{color_for, ThemeEntry, ThemeMap};

/// comfy-table's name for a theme colour.
fn table_color(color: AnsiColors) -> Color {
    match color {
        AnsiColors::Black => Color::Black,
        AnsiColors::Red => Color::DarkRed,
        AnsiColors::Green => Color::DarkGreen,
        AnsiColors::Yellow => Color::DarkYellow,
        AnsiColors::Blue => Color::DarkBlue,
        AnsiColors::Magenta => Color::DarkMagenta,
        AnsiColors::Cyan => Color::DarkCyan,
        AnsiColors::White => Color::Grey,
        AnsiColors::BrightBlack => Color::DarkGrey,
        AnsiColors::BrightRed => Color::Red,
        AnsiColors::BrightGreen => Color::Green,
        AnsiColors::BrightYellow => Color::Yellow,
        AnsiColors::BrightBlue => Color::Blue,
        AnsiColors::BrightMagenta => Color::Magenta,
        AnsiColors::BrightCyan => Color::Cyan,
        AnsiColors::BrightWhite => Color::White,
        _ => Color::Reset,
    }
}

fn themed_cell(text: String, entry: ThemeEntry, theme: &ThemeMap, enable_colors: bool) -> Cell {
    let cell = Cell::new(text);
    match color_for(theme, entry) {
        Some(color) if enable_colors => cell.fg(table_color(color)),
        _ => cell,
    }
}

/// Builds the table for `report`. Rules that masked nothing are listed too.
pub fn build_summary_table(report: &MaskReport, theme: &ThemeMap, enable_colors: bool) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["#", "Rule", "Masked characters"]);
    if enable_colors {
        // stderr, not stdout, decides whether colours are wanted.
        table.enforce_styling();
    }

    for item in &report.per_rule {
        table.add_row(vec![
            Cell::new(item.rule_index + 1),
            themed_cell(item.rule_label.clone(), ThemeEntry::SummaryRuleName, theme, enable_colors),
            themed_cell(item.masked_chars.to_string(), ThemeEntry::SummaryOccurrences, theme, enable_colors),
        ]);
    }
    table.add_row(vec![
        String::new(),
        "Total".to_string(),
        report.total_masked.to_string(),
    ]);

    if let Some(column) = table.column_mut(2) {
        column.set_cell_alignment(CellAlignment::Right);
    }
    table
}

/// Prints the batch summary: a header line, the table, and a totals line.
pub fn print_summary<W: Write>(
    report: &MaskReport,
    files_ok: usize,
    files_failed: usize,
    writer: &mut W,
    theme: &ThemeMap,
    enable_colors: bool,
) -> io::Result<()> {
    writeln!(
        writer,
        "{}",
        styled("Masking Summary", ThemeEntry::Header, theme, enable_colors)
    )?;
    writeln!(writer, "{}", build_summary_table(report, theme, enable_colors))?;

    let files_line = format!(
        "{} file(s) masked, {} failed, {} line(s) processed.",
        files_ok, files_failed, report.lines_processed
    );
    let entry = if files_failed == 0 {
        ThemeEntry::Success
    } else {
        ThemeEntry::Error
    };
    writeln!(writer, "{}", styled(&files_line, entry, theme, enable_colors))
}
