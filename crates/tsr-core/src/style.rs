//! Styling primitive.
//!
//! A `Style` is an explicit request for "foreground color or default" plus
//! "bold on, off, or left alone". It is turned into escape sequences with
//! crossterm; nothing else in the crate builds escape sequences by hand.

use std::io::{self, Write};

use crossterm::queue;
use crossterm::style::{Attribute, Color, ResetColor, SetAttribute, SetForegroundColor};

/// Foreground color of a style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Foreground {
    /// The terminal's own default foreground.
    Default,
    Color(Color),
}

/// Bold state of a style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bold {
    On,
    Off,
    /// Leave the current intensity as it is.
    Unchanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Style {
    pub foreground: Foreground,
    pub bold: Bold,
}

impl Style {
    pub const fn new(foreground: Foreground, bold: Bold) -> Self {
        Self { foreground, bold }
    }

    /// Colored foreground, intensity untouched.
    pub const fn fg(color: Color) -> Self {
        Self::new(Foreground::Color(color), Bold::Unchanged)
    }

    /// Default foreground with bold enabled: the framing used for stdin echo.
    pub const fn echo() -> Self {
        Self::new(Foreground::Default, Bold::On)
    }

    /// Queues the escape sequences for this style on `w`.
    pub fn queue<W: Write>(self, w: &mut W) -> io::Result<()> {
        match self.foreground {
            Foreground::Default => queue!(w, SetForegroundColor(Color::Reset))?,
            Foreground::Color(color) => queue!(w, SetForegroundColor(color))?,
        }
        match self.bold {
            Bold::On => queue!(w, SetAttribute(Attribute::Bold)),
            // NormalIntensity clears bold without touching other attributes.
            Bold::Off => queue!(w, SetAttribute(Attribute::NormalIntensity)),
            Bold::Unchanged => Ok(()),
        }
    }

    /// Queues the "back to terminal defaults" token on `w`.
    pub fn reset<W: Write>(w: &mut W) -> io::Result<()> {
        queue!(w, SetAttribute(Attribute::Reset), ResetColor)
    }
}

/// Scoped terminal styling.
///
/// Acquiring the guard resets the terminal and enables bold so that stdin
/// echo is framed in boldface. Dropping it writes the reset token again, on
/// every exit path of the owner.
pub struct StyleGuard<W: Write> {
    writer: W,
}

impl<W: Write> StyleGuard<W> {
    pub fn acquire(mut writer: W) -> io::Result<Self> {
        Style::reset(&mut writer)?;
        Style::echo().queue(&mut writer)?;
        writer.flush()?;
        Ok(Self { writer })
    }
}

impl<W: Write> Drop for StyleGuard<W> {
    fn drop(&mut self) {
        let _ = Style::reset(&mut self.writer);
        let _ = self.writer.flush();
    }
}

/// Writes the reset token straight to stdout.
///
/// Used from the interrupt restore hook, where no guard is reachable.
pub fn restore_stdout() {
    let mut out = io::stdout();
    let _ = Style::reset(&mut out);
    let _ = out.flush();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(style: Style) -> String {
        let mut buf = Vec::new();
        style.queue(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_default_foreground_resets_color() {
        let out = render(Style::new(Foreground::Default, Bold::Unchanged));
        assert_eq!(out, "\x1b[39m");
    }

    #[test]
    fn test_bold_off_uses_normal_intensity() {
        let out = render(Style::new(Foreground::Color(Color::Red), Bold::Off));
        assert!(out.contains("\x1b[22m"));
        assert!(!out.contains("\x1b[1m"));
    }

    #[test]
    fn test_echo_style_is_bold_default() {
        let out = render(Style::echo());
        assert_eq!(out, "\x1b[39m\x1b[1m");
    }

    #[test]
    fn test_guard_resets_on_drop() {
        let mut buf = Vec::new();
        {
            let _guard = StyleGuard::acquire(&mut buf).unwrap();
        }
        let out = String::from_utf8(buf).unwrap();
        assert!(out.starts_with("\x1b[0m"));
        assert!(out.contains("\x1b[1m"));
        assert!(out.ends_with("\x1b[1m\x1b[0m\x1b[0m"));
    }
}
