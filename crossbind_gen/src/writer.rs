// Copyright 2025 the Crossbind Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::fmt::{self, Write};

/// Accumulates generated text, indenting every line to the current depth.
pub(crate) struct Writer {
    buf: String,
    indent: &'static str,
    depth: usize,
    line_start: bool,
}

impl Writer {
    pub(crate) fn new(indent: &'static str) -> Self {
        Self {
            buf: String::new(),
            indent,
            depth: 0,
            line_start: true,
        }
    }

    pub(crate) fn indent(&mut self) {
        self.depth += 1;
    }

    pub(crate) fn dedent(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Writes a line and indents the lines that follow it.
    pub(crate) fn open(&mut self, args: fmt::Arguments<'_>) -> fmt::Result {
        self.write_fmt(args)?;
        self.write_char('\n')?;
        self.indent();
        Ok(())
    }

    /// Dedents, then writes a line.
    pub(crate) fn close(&mut self, args: fmt::Arguments<'_>) -> fmt::Result {
        self.dedent();
        self.write_fmt(args)?;
        self.write_char('\n')
    }

    pub(crate) fn finish(self) -> String {
        self.buf
    }
}

impl Write for Writer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for part in s.split_inclusive('\n') {
            if self.line_start && part != "\n" {
                for _ in 0..self.depth {
                    self.buf.push_str(self.indent);
                }
            }
            self.buf.push_str(part);
            self.line_start = part.ends_with('\n');
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_blocks() {
        let mut w = Writer::new("  ");
        w.open(format_args!("a:")).unwrap();
        writeln!(w, "b: {}", 1).unwrap();
        w.open(format_args!("c:")).unwrap();
        write!(w, "d: ").unwrap();
        writeln!(w, "2\n\ne: 3").unwrap();
        w.dedent();
        w.close(format_args!("end")).unwrap();
        assert_eq!(w.finish(), "a:\n  b: 1\n  c:\n    d: 2\n\n    e: 3\nend\n");
    }

    #[test]
    fn dedent_saturates() {
        let mut w = Writer::new("    ");
        w.dedent();
        writeln!(w, "x").unwrap();
        assert_eq!(w.finish(), "x\n");
    }
}
