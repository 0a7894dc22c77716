//! `--progress` rendering of [`BatchProgress`](crate::utils::progress::BatchProgress)
//! counts on stderr.
//!
//! On a terminal the line is redrawn in place after every finished file.
//! Anywhere else nothing is printed until the batch ends, then one line.

use std::io::Write;
use std::sync::Mutex;

use super::output_format::styled;
use super::theme::{ThemeEntry, ThemeMap};
use crate::utils::progress::ProgressSnapshot;

const BAR_WIDTH: usize = 24;

/// Renders one progress line, e.g.
/// `Masking [############------------] 3/6 file(s), 1 failed, 120 char(s) masked`.
pub fn render_progress_line(snapshot: &ProgressSnapshot, theme: &ThemeMap, enable_colors: bool) -> String {
    let filled = if snapshot.total == 0 {
        BAR_WIDTH
    } else {
        (snapshot.done * BAR_WIDTH / snapshot.total).min(BAR_WIDTH)
    };
    let bar = format!("{}{}", "#".repeat(filled), "-".repeat(BAR_WIDTH - filled));
    let failed = format!("{} failed", snapshot.failed);
    let failed = if snapshot.failed > 0 {
        styled(&failed, ThemeEntry::Error, theme, enable_colors)
    } else {
        failed
    };
    format!(
        "Masking [{}] {}/{} file(s), {}, {} char(s) masked",
        styled(&bar, ThemeEntry::Success, theme, enable_colors),
        snapshot.done,
        snapshot.total,
        failed,
        snapshot.masked_chars
    )
}

/// Writes progress lines for a batch. Shared by the rayon workers.
pub struct ProgressDisplay<'a, W: Write + Send> {
    writer: Mutex<W>,
    live: bool,
    theme: &'a ThemeMap,
    enable_colors: bool,
}

impl<'a, W: Write + Send> ProgressDisplay<'a, W> {
    /// `live` redraws the line after every file; otherwise only
    /// [`finish`](Self::finish) writes.
    pub fn new(writer: W, live: bool, theme: &'a ThemeMap, enable_colors: bool) -> Self {
        Self {
            writer: Mutex::new(writer),
            live,
            theme,
            enable_colors,
        }
    }

    pub fn update(&self, snapshot: &ProgressSnapshot) {
        if !self.live {
            return;
        }
        let line = render_progress_line(snapshot, self.theme, self.enable_colors);
        if let Ok(mut writer) = self.writer.lock() {
            let _ = write!(writer, "\r{}", line);
            let _ = writer.flush();
        }
    }

    pub fn finish(&self, snapshot: &ProgressSnapshot) {
        let line = render_progress_line(snapshot, self.theme, self.enable_colors);
        if let Ok(mut writer) = self.writer.lock() {
            let prefix = if self.live { "\r" } else { "" };
            let _ = writeln!(writer, "{}{}", prefix, line);
            let _ = writer.flush();
        }
    }

    pub fn into_inner(self) -> W {
        match self.writer.into_inner() {
            Ok(writer) => writer,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
