//! Width arithmetic for terminal cells.

use std::borrow::Cow;

use unicode_width::UnicodeWidthChar;

/// Columns between terminal tab stops.
pub const TAB_WIDTH: usize = 8;

/// Display width of one character. Control characters take no cell.
fn char_width(c: char) -> usize {
    c.width().unwrap_or(0)
}

/// Display width of `s` in terminal cells.
pub fn display_width(s: &str) -> usize {
    s.chars().map(char_width).sum()
}

/// Splits `s` into the longest prefix that fits in `max` cells and the rest.
pub fn split_at_width(s: &str, max: usize) -> (&str, &str) {
    let mut used = 0;
    for (idx, c) in s.char_indices() {
        let w = char_width(c);
        if used + w > max {
            return s.split_at(idx);
        }
        used += w;
    }
    (s, "")
}

/// Like [`split_at_width`], but always takes at least one character.
///
/// Keeps the wrap loop moving when a single character is wider than the
/// line.
pub fn split_at_width_nonempty(s: &str, max: usize) -> (&str, &str) {
    let (head, tail) = split_at_width(s, max);
    if !head.is_empty() || s.is_empty() {
        return (head, tail);
    }
    let first = s.chars().next().map_or(0, char::len_utf8);
    s.split_at(first)
}

/// Replaces each tab with spaces up to the next tab stop, counting cells
/// from `column`.
pub fn expand_tabs(s: &str, column: usize) -> Cow<'_, str> {
    if !s.contains('\t') {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len() + TAB_WIDTH);
    let mut col = column;
    for c in s.chars() {
        if c == '\t' {
            let spaces = TAB_WIDTH - col % TAB_WIDTH;
            out.push_str(&" ".repeat(spaces));
            col += spaces;
        } else {
            out.push(c);
            col += char_width(c);
        }
    }
    Cow::Owned(out)
}

/// One piece of a chunk: a run of text without newlines, or a newline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    Text(&'a str),
    Newline,
}

/// Splits `text` on `\n`, keeping each newline as its own token.
/// Empty text runs are dropped.
pub fn tokens(text: &str) -> impl Iterator<Item = Token<'_>> {
    text.split_inclusive('\n').flat_map(|piece| {
        let (body, newline) = match piece.strip_suffix('\n') {
            Some(body) => (body, Some(Token::Newline)),
            None => (piece, None),
        };
        let body = (!body.is_empty()).then_some(Token::Text(body));
        body.into_iter().chain(newline)
    })
}
