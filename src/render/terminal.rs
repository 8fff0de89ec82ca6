//! Terminal painter: Paint a live message's views with crossterm.
//!
//! The painter owns the rows below the point where the message started.
//! It tracks how many rows it has emitted (hard newlines plus soft wraps at
//! the terminal width) so a repaint can rewind to the start of the message,
//! clear, and draw again.
//!
//! When the renderer patched in place and only the trailing text view grew,
//! the painter appends the new suffix directly instead of repainting.
//!
//! Output assumes cooked mode: `\n` returns the cursor to column 0.

use super::diff::RenderPath;
use super::view::SegmentView;
use crate::parser::SegmentKind;
use crossterm::{
    cursor::{MoveToColumn, MoveUp},
    queue,
    style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor},
    terminal::{Clear, ClearType},
};
use std::io::{self, Write};
use unicode_width::UnicodeWidthChar;

/// Foreground color for code views.
const CODE_FG: Color = Color::Cyan;
/// Foreground color for the code language label.
const LABEL_FG: Color = Color::DarkGrey;

/// Paints one streaming message at the bottom of the terminal.
#[derive(Debug, Clone)]
pub struct TerminalPainter {
    /// Terminal width in columns.
    width: usize,
    /// Rows emitted below the message start.
    rows: usize,
    /// Current cursor column.
    col: usize,
    /// Content of each view as it is currently on screen.
    painted: Vec<String>,
}

impl TerminalPainter {
    /// Create a painter for a terminal of the given width.
    pub fn new(width: u16) -> Self {
        Self {
            width: usize::from(width.max(1)),
            rows: 0,
            col: 0,
            painted: Vec::new(),
        }
    }

    /// Update the terminal width (takes effect on the next repaint).
    pub fn set_width(&mut self, width: u16) {
        self.width = usize::from(width.max(1));
    }

    /// Rows emitted since the message started.
    pub const fn rows(&self) -> usize {
        self.rows
    }

    /// Paint `views` after a render that took `path`.
    pub fn paint<W: Write, V: SegmentView>(
        &mut self,
        out: &mut W,
        views: &[V],
        path: RenderPath,
    ) -> io::Result<()> {
        if path.is_fast() && self.can_append(views) {
            if let (Some(view), Some(painted)) = (views.last(), self.painted.last_mut()) {
                let suffix = &view.content()[painted.len()..];
                painted.push_str(suffix);
                let suffix = suffix.to_string();
                self.write_text(out, &suffix)?;
            }
        } else {
            self.repaint(out, views)?;
        }
        out.flush()
    }

    /// End the message: move to a fresh line and forget the painted rows.
    pub fn finish<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        self.break_line(out)?;
        self.rows = 0;
        self.col = 0;
        self.painted.clear();
        out.flush()
    }

    /// Whether the only change is text appended to a trailing text view.
    fn can_append<V: SegmentView>(&self, views: &[V]) -> bool {
        let Some((last, head)) = views.split_last() else {
            return false;
        };
        let Some((painted_last, painted_head)) = self.painted.split_last() else {
            return false;
        };

        // Head languages are not compared: a fence is closed before any
        // trailing text exists, so its tag can no longer change.
        last.kind() == SegmentKind::Text
            && head.len() == painted_head.len()
            && head
                .iter()
                .zip(painted_head)
                .all(|(view, painted)| view.content() == painted)
            && last.content().starts_with(painted_last.as_str())
    }

    fn repaint<W: Write, V: SegmentView>(&mut self, out: &mut W, views: &[V]) -> io::Result<()> {
        queue!(out, MoveToColumn(0))?;
        if self.rows > 0 {
            queue!(out, MoveUp(u16::try_from(self.rows).unwrap_or(u16::MAX)))?;
        }
        queue!(out, Clear(ClearType::FromCursorDown))?;
        self.rows = 0;
        self.col = 0;

        for view in views {
            self.write_view(out, view)?;
        }
        self.painted = views.iter().map(|v| v.content().to_string()).collect();
        Ok(())
    }

    fn write_view<W: Write, V: SegmentView>(&mut self, out: &mut W, view: &V) -> io::Result<()> {
        match view.kind() {
            SegmentKind::Text => self.write_text(out, view.content()),
            SegmentKind::Code => {
                self.break_line(out)?;
                if let Some(language) = view.language() {
                    queue!(out, SetForegroundColor(LABEL_FG))?;
                    self.write_text(out, &format!("[{language}]\n"))?;
                }
                queue!(out, SetForegroundColor(CODE_FG))?;
                self.write_text(out, view.content())?;
                queue!(out, ResetColor)?;
                self.break_line(out)
            }
            SegmentKind::Reasoning => {
                self.break_line(out)?;
                queue!(out, SetAttribute(Attribute::Dim), SetAttribute(Attribute::Italic))?;
                self.write_text(out, view.content().trim())?;
                queue!(out, SetAttribute(Attribute::Reset))?;
                self.break_line(out)
            }
        }
    }

    fn break_line<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        if self.col == 0 {
            return Ok(());
        }
        self.write_text(out, "\n")
    }

    /// Print text and advance the row/column tracking.
    fn write_text<W: Write>(&mut self, out: &mut W, text: &str) -> io::Result<()> {
        for ch in text.chars() {
            if ch == '\n' {
                self.rows += 1;
                self.col = 0;
                continue;
            }
            let width = ch.width().unwrap_or(0);
            if self.col + width > self.width {
                self.rows += 1;
                self.col = 0;
            }
            self.col += width;
        }
        queue!(out, Print(text))
    }
}
