//! The closing summary line.

use std::io::{self, Write};

use super::Terminal;
use crate::core::launcher::ExitOutcome;
use crate::style::{Bold, Foreground, Style};
use crate::usage::UsageSample;

impl<W: Write> Terminal<W> {
    /// Prints `exit: .. real: .. user: .. sys: .. RSS: ..` on its own line.
    pub fn write_summary(&mut self, outcome: ExitOutcome, usage: &UsageSample) -> io::Result<()> {
        let label = Style::new(Foreground::Default, Bold::Off);
        let value = Style::fg(self.palette.value_color);

        label.queue(&mut self.out)?;
        if self.state.column != 0 {
            self.write_newline()?;
        }

        let fields = [
            ("exit", outcome.to_string()),
            ("real", format!("{:.3}s", usage.real.as_secs_f64())),
            ("user", format!("{:.3}s", usage.user.as_secs_f64())),
            ("sys", format!("{:.3}s", usage.sys.as_secs_f64())),
            ("RSS", format!("{:.1}MB", usage.max_rss_mb())),
        ];
        for (idx, (name, text)) in fields.iter().enumerate() {
            label.queue(&mut self.out)?;
            if idx > 0 {
                self.out.write_all(b" ")?;
            }
            write!(self.out, "{name}: ")?;
            value.queue(&mut self.out)?;
            self.out.write_all(text.as_bytes())?;
        }

        Style::reset(&mut self.out)?;
        self.write_newline()?;
        self.out.flush()
    }
}
