//! Stream-to-terminal rendering.
//!
//! Both output streams of the child render into one [`Terminal`], which
//! owns the writer and the shared cursor state. Callers hold the terminal
//! behind a single mutex and render a whole chunk per lock acquisition, so
//! the column and the last timestamp can never be observed half-updated.
//!
//! Right-aligned timestamps rely on backspace moving the cursor left
//! without erasing. Terminals without that behavior will show misplaced
//! text after a timestamp.

mod layout;
mod stream;
mod summary;

use std::io::{self, IsTerminal, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Local};

pub use self::layout::{TAB_WIDTH, Token, display_width, expand_tabs, split_at_width, tokens};
pub use self::stream::{StreamRenderer, Utf8Carry};
use self::layout::split_at_width_nonempty;
use crate::config::Palette;
use crate::style::{Bold, Foreground, Style};

/// Width of a rendered timestamp, `HH:MM:SS.mmm`.
pub const TIMESTAMP_LEN: usize = 12;

/// Shown at the end of a line that continues on the next one.
pub const WRAP_MARKER: &str = "↵";

/// Shown where a truncated line was cut.
pub const ELLIPSIS: &str = "…";

const FALLBACK_COLUMNS: u16 = 80;

/// Formats `at` as `HH:MM:SS.mmm`, truncating to the millisecond.
pub fn format_timestamp(at: &DateTime<Local>) -> String {
    at.format("%H:%M:%S%.3f").to_string()
}

/// Number of terminal columns to lay out against.
///
/// Queries the terminal when stdout is one. Otherwise `$COLUMNS` is used,
/// falling back to 80.
pub fn detect_columns() -> u16 {
    if io::stdout().is_terminal() {
        match crossterm::terminal::size() {
            Ok((columns, _rows)) if columns > 0 => return columns,
            Ok(_) => {}
            Err(e) => tracing::debug!("terminal size query failed: {e}"),
        }
    }
    std::env::var("COLUMNS")
        .ok()
        .and_then(|c| c.trim().parse::<u16>().ok())
        .filter(|&c| c > 0)
        .unwrap_or(FALLBACK_COLUMNS)
}

/// Which child stream a chunk came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

impl StreamKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stdout => "stdout",
            Self::Stderr => "stderr",
        }
    }
}

/// Text read from one stream in one read, stamped once.
#[derive(Debug, Clone)]
pub struct OutputChunk {
    pub text: String,
    pub at: DateTime<Local>,
    pub stream: StreamKind,
}

/// Cursor bookkeeping shared by both stream renderers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderState {
    column: usize,
    last_timestamp: Option<String>,
    truncate: bool,
    width: usize,
    line_truncated: bool,
}

impl RenderState {
    /// `columns` is the full terminal width; one column is kept free so
    /// writing up to the right edge never triggers an automatic wrap.
    pub fn new(columns: u16, truncate: bool) -> Self {
        Self {
            column: 0,
            last_timestamp: None,
            truncate,
            width: usize::from(columns).saturating_sub(1),
            line_truncated: false,
        }
    }

    pub fn column(&self) -> usize {
        self.column
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn truncate(&self) -> bool {
        self.truncate
    }

    pub fn last_timestamp(&self) -> Option<&str> {
        self.last_timestamp.as_deref()
    }

    /// Last column text may occupy, leaving room for a gap and a timestamp.
    pub fn max_col(&self) -> usize {
        self.width.saturating_sub(TIMESTAMP_LEN + 1).max(1)
    }
}

/// The single writer of terminal output.
pub struct Terminal<W: Write> {
    out: W,
    state: RenderState,
    palette: Palette,
}

/// A terminal shared between the renderer tasks and the runner.
pub type SharedTerminal<W> = Arc<Mutex<Terminal<W>>>;

/// Locks a shared terminal.
///
/// A renderer that panicked mid-chunk leaves at worst a misplaced cursor,
/// so a poisoned lock is still used.
pub fn lock<W: Write>(terminal: &Mutex<Terminal<W>>) -> MutexGuard<'_, Terminal<W>> {
    terminal.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<W: Write> Terminal<W> {
    pub fn new(out: W, state: RenderState, palette: Palette) -> Self {
        Self {
            out,
            state,
            palette,
        }
    }

    pub fn shared(self) -> SharedTerminal<W> {
        Arc::new(Mutex::new(self))
    }

    pub fn state(&self) -> &RenderState {
        &self.state
    }

    pub fn writer(&self) -> &W {
        &self.out
    }

    fn stream_style(&self, stream: StreamKind) -> Style {
        let foreground = match stream {
            StreamKind::Stdout => Foreground::Default,
            StreamKind::Stderr => Foreground::Color(self.palette.stderr_color),
        };
        Style::new(foreground, Bold::Off)
    }

    fn write_text(&mut self, text: &str) -> io::Result<()> {
        self.out.write_all(text.as_bytes())?;
        self.state.column += display_width(text);
        Ok(())
    }

    fn write_newline(&mut self) -> io::Result<()> {
        self.out.write_all(b"\n")?;
        self.state.column = 0;
        self.state.line_truncated = false;
        Ok(())
    }

    /// Renders one chunk and flushes.
    ///
    /// Leaves the terminal in the stdin echo style (default foreground,
    /// bold) no matter how the chunk was laid out.
    pub fn render_chunk(&mut self, chunk: &OutputChunk) -> io::Result<()> {
        let style = self.stream_style(chunk.stream);
        for token in tokens(&chunk.text) {
            match token {
                Token::Newline => self.write_newline()?,
                Token::Text(text) => self.render_text(text, style, &chunk.at)?,
            }
        }
        Style::echo().queue(&mut self.out)?;
        self.out.flush()
    }

    fn render_text(&mut self, text: &str, style: Style, at: &DateTime<Local>) -> io::Result<()> {
        if self.state.line_truncated {
            return Ok(());
        }
        style.queue(&mut self.out)?;
        let text = expand_tabs(text, self.state.column);
        let text = text.as_ref();

        let max_col = self.state.max_col();
        let avail = max_col.saturating_sub(self.state.column);
        let (head, rest) = split_at_width(text, avail);

        if !rest.is_empty() && self.state.truncate {
            return self.truncate_line(text, avail);
        }

        self.write_text(head)?;
        self.show_timestamp(at)?;

        let mut rest = rest;
        while !rest.is_empty() {
            Style::fg(self.palette.decoration_color).queue(&mut self.out)?;
            self.out.write_all(WRAP_MARKER.as_bytes())?;
            self.out.write_all(b"\n")?;
            self.state.column = 0;

            let (segment, tail) = split_at_width_nonempty(rest, max_col);
            style.queue(&mut self.out)?;
            self.write_text(segment)?;
            self.show_timestamp(at)?;
            rest = tail;
        }
        Ok(())
    }

    /// Writes what fits of `text`, then an ellipsis in the gap cell after
    /// `max_col`.
    ///
    /// `column` stays at `max_col`; nothing else is drawn on the line until
    /// the next newline.
    fn truncate_line(&mut self, text: &str, avail: usize) -> io::Result<()> {
        let (head, _) = split_at_width(text, avail);
        self.write_text(head)?;
        Style::fg(self.palette.decoration_color).queue(&mut self.out)?;
        self.out.write_all(ELLIPSIS.as_bytes())?;
        self.state.line_truncated = true;
        Ok(())
    }

    /// Draws `at` against the right margin and moves back to the column.
    fn show_timestamp(&mut self, at: &DateTime<Local>) -> io::Result<()> {
        let stamp = format_timestamp(at);
        if self.state.last_timestamp.as_deref() == Some(stamp.as_str()) {
            return Ok(());
        }

        let pad = self
            .state
            .width
            .saturating_sub(TIMESTAMP_LEN)
            .saturating_sub(self.state.column);
        write!(self.out, "{:pad$}", "")?;
        Style::fg(self.palette.timestamp_color).queue(&mut self.out)?;
        self.out.write_all(stamp.as_bytes())?;
        self.out.write_all(&b"\x08".repeat(pad + TIMESTAMP_LEN))?;

        self.state.last_timestamp = Some(stamp);
        Ok(())
    }

    /// Ends the current line after an interrupt so the summary starts clean.
    pub fn interrupt_newline(&mut self) -> io::Result<()> {
        self.write_newline()?;
        self.out.flush()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    const COLUMNS: u16 = 81; // width 80, max_col 67

    fn noon() -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2024, 3, 1, 12, 0, 0)
            .single()
            .unwrap()
    }

    fn terminal(truncate: bool) -> Terminal<Vec<u8>> {
        Terminal::new(
            Vec::new(),
            RenderState::new(COLUMNS, truncate),
            Palette::default(),
        )
    }

    fn chunk(text: &str, stream: StreamKind, at: DateTime<Local>) -> OutputChunk {
        OutputChunk {
            text: text.to_string(),
            at,
            stream,
        }
    }

    fn output(term: &Terminal<Vec<u8>>) -> String {
        String::from_utf8(term.writer().clone()).unwrap()
    }

    /// Output with escape sequences removed.
    fn visible(term: &Terminal<Vec<u8>>) -> String {
        let raw = output(term);
        let mut out = String::new();
        let mut chars = raw.chars();
        while let Some(c) = chars.next() {
            if c == '\x1b' {
                for c in chars.by_ref() {
                    if c.is_ascii_alphabetic() {
                        break;
                    }
                }
            } else {
                out.push(c);
            }
        }
        out
    }

    #[test]
    fn test_format_timestamp_truncates_millis() {
        let at = noon() + Duration::microseconds(123_999);
        assert_eq!(format_timestamp(&at), "12:00:00.123");
        assert_eq!(format_timestamp(&at).len(), TIMESTAMP_LEN);
    }

    #[test]
    fn test_max_col_leaves_room_for_timestamp() {
        let state = RenderState::new(COLUMNS, false);
        assert_eq!(state.width(), 80);
        assert_eq!(state.max_col(), 67);
        assert_eq!(RenderState::new(5, false).max_col(), 1);
    }

    #[test]
    fn test_short_text_has_no_wrap_marker() {
        let mut term = terminal(false);
        term.render_chunk(&chunk("hello", StreamKind::Stdout, noon()))
            .unwrap();

        let shown = visible(&term);
        assert!(shown.starts_with("hello"));
        assert!(!shown.contains(WRAP_MARKER));
        assert_eq!(term.state().column(), 5);
    }

    #[test]
    fn test_timestamp_is_right_aligned_and_cursor_restored() {
        let mut term = terminal(false);
        term.render_chunk(&chunk("hello", StreamKind::Stdout, noon()))
            .unwrap();

        let shown = visible(&term);
        let expected_pad = 80 - TIMESTAMP_LEN - 5;
        let expected = format!(
            "hello{}12:00:00.000{}",
            " ".repeat(expected_pad),
            "\x08".repeat(expected_pad + TIMESTAMP_LEN)
        );
        assert_eq!(shown, expected);
        assert_eq!(term.state().last_timestamp(), Some("12:00:00.000"));
    }

    #[test]
    fn test_wrap_marker_count() {
        for len in [67, 68, 134, 135, 200, 500] {
            let mut term = terminal(false);
            let text = "a".repeat(len);
            term.render_chunk(&chunk(&text, StreamKind::Stdout, noon()))
                .unwrap();

            let markers = output(&term).matches(WRAP_MARKER).count();
            assert_eq!(markers, len.div_ceil(67) - 1, "len {len}");
            assert_eq!(visible(&term).matches('a').count(), len);
        }
    }

    #[test]
    fn test_wrap_continues_from_current_column() {
        let mut term = terminal(false);
        term.render_chunk(&chunk(&"a".repeat(60), StreamKind::Stdout, noon()))
            .unwrap();
        term.render_chunk(&chunk(&"b".repeat(20), StreamKind::Stdout, noon()))
            .unwrap();

        assert_eq!(output(&term).matches(WRAP_MARKER).count(), 1);
        assert_eq!(term.state().column(), 13);
    }

    #[test]
    fn test_truncate_emits_one_ellipsis() {
        let mut term = terminal(true);
        term.render_chunk(&chunk(&"a".repeat(200), StreamKind::Stdout, noon()))
            .unwrap();

        let out = output(&term);
        assert_eq!(out.matches(ELLIPSIS).count(), 1);
        assert!(!out.contains(WRAP_MARKER));
        assert_eq!(term.state().column(), term.state().max_col());
        assert_eq!(visible(&term).matches('a').count(), 67);
        assert!(visible(&term).starts_with(&format!("{}{ELLIPSIS}", "a".repeat(67))));
    }

    #[test]
    fn test_truncated_line_discards_until_newline() {
        let mut term = terminal(true);
        let at = noon();
        term.render_chunk(&chunk(&"a".repeat(100), StreamKind::Stdout, at))
            .unwrap();
        term.render_chunk(&chunk("more text", StreamKind::Stderr, at))
            .unwrap();
        assert_eq!(output(&term).matches(ELLIPSIS).count(), 1);
        assert!(!visible(&term).contains("more"));

        term.render_chunk(&chunk("\nnext", StreamKind::Stdout, at))
            .unwrap();
        assert!(visible(&term).contains("next"));
        assert_eq!(term.state().column(), 4);
    }

    #[test]
    fn test_truncate_when_line_exactly_full() {
        let mut term = terminal(true);
        let at = noon();
        term.render_chunk(&chunk(&"a".repeat(67), StreamKind::Stdout, at))
            .unwrap();
        assert_eq!(term.state().column(), 67);
        assert!(!output(&term).contains(ELLIPSIS));

        term.render_chunk(&chunk("b", StreamKind::Stdout, at)).unwrap();
        let out = output(&term);
        assert_eq!(out.matches(ELLIPSIS).count(), 1);
        assert!(!out.contains('b'));
        assert_eq!(out.matches('a').count(), 67);
        assert_eq!(term.state().column(), 67);

        // Only the timestamp moved the cursor back.
        assert_eq!(out.matches('\x08').count(), 1 + TIMESTAMP_LEN);
    }

    #[test]
    fn test_truncate_mode_shows_timestamp_when_text_fits() {
        let mut term = terminal(true);
        term.render_chunk(&chunk("short", StreamKind::Stdout, noon()))
            .unwrap();
        assert!(visible(&term).contains("12:00:00.000"));
    }

    #[test]
    fn test_timestamp_suppressed_within_same_millisecond() {
        let mut term = terminal(false);
        let at = noon() + Duration::microseconds(500);
        term.render_chunk(&chunk("a", StreamKind::Stdout, at))
            .unwrap();
        term.render_chunk(&chunk("b", StreamKind::Stderr, at + Duration::microseconds(300)))
            .unwrap();

        assert_eq!(visible(&term).matches("12:00:00.000").count(), 1);
    }

    #[test]
    fn test_timestamp_redrawn_for_new_millisecond() {
        let mut term = terminal(false);
        term.render_chunk(&chunk("a\n", StreamKind::Stdout, noon()))
            .unwrap();
        term.render_chunk(&chunk(
            "b\n",
            StreamKind::Stdout,
            noon() + Duration::milliseconds(1),
        ))
        .unwrap();

        let shown = visible(&term);
        assert!(shown.contains("12:00:00.000"));
        assert!(shown.contains("12:00:00.001"));
    }

    #[test]
    fn test_chunk_ends_in_echo_style() {
        let echo = {
            let mut buf = Vec::new();
            Style::echo().queue(&mut buf).unwrap();
            String::from_utf8(buf).unwrap()
        };
        let long = "y".repeat(300);
        for text in ["x", "x\n", long.as_str(), "a\nb\nc"] {
            for truncate in [false, true] {
                let mut term = terminal(truncate);
                term.render_chunk(&chunk(text, StreamKind::Stderr, noon()))
                    .unwrap();
                assert!(output(&term).ends_with(&echo), "text {text:?}");
            }
        }
    }

    #[test]
    fn test_stderr_uses_error_color() {
        let mut term = terminal(false);
        term.render_chunk(&chunk("oops", StreamKind::Stderr, noon()))
            .unwrap();
        let mut red = Vec::new();
        Style::new(Foreground::Color(Palette::default().stderr_color), Bold::Off)
            .queue(&mut red)
            .unwrap();
        assert!(output(&term).starts_with(&String::from_utf8(red).unwrap()));
    }

    #[test]
    fn test_newline_resets_column() {
        let mut term = terminal(false);
        term.render_chunk(&chunk("hello\nwor", StreamKind::Stdout, noon()))
            .unwrap();
        assert_eq!(term.state().column(), 3);
    }

    #[test]
    fn test_interleaved_streams_share_column() {
        let mut term = terminal(false);
        let mut at = noon();
        for (i, c) in "abcdefgh".chars().enumerate() {
            let stream = if i % 2 == 0 {
                StreamKind::Stdout
            } else {
                StreamKind::Stderr
            };
            term.render_chunk(&chunk(&c.to_string(), stream, at)).unwrap();
            at += Duration::milliseconds(1);
        }
        assert_eq!(term.state().column(), 8);
        assert!(visible(&term).contains("12:00:00.007"));
    }

    #[test]
    fn test_wide_chars_advance_by_cells() {
        let mut term = terminal(false);
        term.render_chunk(&chunk("日本", StreamKind::Stdout, noon()))
            .unwrap();
        assert_eq!(term.state().column(), 4);
    }

    #[test]
    fn test_tabs_advance_to_next_stop() {
        let mut term = terminal(false);
        term.render_chunk(&chunk("a\tb", StreamKind::Stdout, noon()))
            .unwrap();
        assert_eq!(term.state().column(), TAB_WIDTH + 1);
        assert!(visible(&term).starts_with("a       b "));
        assert!(!output(&term).contains('\t'));

        term.render_chunk(&chunk("\tc", StreamKind::Stdout, noon()))
            .unwrap();
        assert_eq!(term.state().column(), 2 * TAB_WIDTH + 1);
    }

    #[test]
    fn test_interrupt_newline_resets_column() {
        let mut term = terminal(false);
        term.render_chunk(&chunk("partial", StreamKind::Stdout, noon()))
            .unwrap();
        term.interrupt_newline().unwrap();
        assert_eq!(term.state().column(), 0);
        assert!(output(&term).ends_with('\n'));
    }
}
