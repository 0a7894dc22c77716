//! Line sources and sinks.
//!
//! The engine works on lines without terminators. These helpers split text or
//! a reader into such lines and join masked lines back together, keeping the
//! input's line terminator style and whether it ended with a newline.

use std::io::{self, BufRead, Write};

use crate::errors::FilemaskError;

/// Where masked lines go.
pub trait LineSink {
    fn emit(&mut self, line: String) -> Result<(), FilemaskError>;
}

impl LineSink for Vec<String> {
    fn emit(&mut self, line: String) -> Result<(), FilemaskError> {
        self.push(line);
        Ok(())
    }
}

/// How lines were terminated in the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextLayout {
    pub terminator: &'static str,
    pub trailing_newline: bool,
}

impl Default for TextLayout {
    fn default() -> Self {
        Self {
            terminator: "\n",
            trailing_newline: true,
        }
    }
}

impl TextLayout {
    /// Detects the layout from a prefix of the input (for the terminator) and
    /// its last byte (for the trailing newline).
    pub fn detect(head: &[u8], last_byte: Option<u8>) -> Self {
        let terminator = match head.iter().position(|&b| b == b'\n') {
            Some(i) if i > 0 && head[i - 1] == b'\r' => "\r\n",
            _ => "\n",
        };
        Self {
            terminator,
            trailing_newline: last_byte == Some(b'\n'),
        }
    }

    pub fn of_str(content: &str) -> Self {
        Self::detect(content.as_bytes(), content.as_bytes().last().copied())
    }
}

/// Splits text into lines without terminators. A final newline does not
/// produce an extra empty line.
pub fn split_lines(content: &str) -> Vec<String> {
    content.lines().map(str::to_string).collect()
}

/// Joins lines using `layout`.
pub fn join_lines(lines: &[String], layout: TextLayout) -> String {
    let mut out = lines.join(layout.terminator);
    if layout.trailing_newline && !lines.is_empty() {
        out.push_str(layout.terminator);
    }
    out
}

/// Iterates over the lines of a reader, stripping `\n` or `\r\n`.
pub struct LineReader<R> {
    reader: R,
    buf: String,
}

impl<R: BufRead> LineReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: String::new(),
        }
    }
}

impl<R: BufRead> Iterator for LineReader<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.buf.clear();
        match self.reader.read_line(&mut self.buf) {
            Ok(0) => None,
            Ok(_) => {
                if self.buf.ends_with('\n') {
                    self.buf.pop();
                    if self.buf.ends_with('\r') {
                        self.buf.pop();
                    }
                }
                Some(Ok(self.buf.clone()))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

/// Writes lines to `W` as they arrive, separated according to a [`TextLayout`].
pub struct WriterSink<W: Write> {
    writer: W,
    layout: TextLayout,
    written: usize,
}

impl<W: Write> WriterSink<W> {
    pub fn new(writer: W, layout: TextLayout) -> Self {
        Self {
            writer,
            layout,
            written: 0,
        }
    }

    pub fn lines_written(&self) -> usize {
        self.written
    }

    /// Writes the final terminator if needed, flushes, and returns the writer.
    pub fn finish(mut self) -> io::Result<W> {
        if self.layout.trailing_newline && self.written > 0 {
            self.writer.write_all(self.layout.terminator.as_bytes())?;
        }
        self.writer.flush()?;
        Ok(self.writer)
    }
}

impl<W: Write> LineSink for WriterSink<W> {
    fn emit(&mut self, line: String) -> Result<(), FilemaskError> {
        if self.written > 0 {
            self.writer.write_all(self.layout.terminator.as_bytes())?;
        }
        self.writer.write_all(line.as_bytes())?;
        self.written += 1;
        Ok(())
    }
}
