//! Per-stream reader task.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::Local;
use tokio::io::{AsyncRead, AsyncReadExt};

use super::{OutputChunk, SharedTerminal, StreamKind, lock};

/// Upper bound on bytes taken from the pipe in one read.
const READ_BUF_SIZE: usize = 64 * 1024;

/// Decodes UTF-8 across read boundaries.
///
/// A multi-byte character split between two reads is held back until its
/// remaining bytes arrive. Invalid bytes are replaced with U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8Carry {
    pending: Vec<u8>,
}

impl Utf8Carry {
    pub fn decode(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let split = self.pending.len() - incomplete_suffix_len(&self.pending);
        let text = String::from_utf8_lossy(&self.pending[..split]).into_owned();
        self.pending.drain(..split);
        text
    }

    /// Returns whatever is still held back, lossily decoded.
    pub fn finish(&mut self) -> String {
        let text = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        text
    }
}

/// Length of a trailing UTF-8 sequence that has not been completed yet.
fn incomplete_suffix_len(bytes: &[u8]) -> usize {
    // UTF-8 continuation bytes start with 10xxxxxx (0x80-0xBF); a sequence
    // is at most 4 bytes, so its lead byte is within the last 3.
    let start = bytes.len().saturating_sub(3);
    for idx in (start..bytes.len()).rev() {
        let byte = bytes[idx];
        if byte & 0xC0 == 0x80 {
            continue;
        }
        let char_len = if byte >= 0xF0 {
            4
        } else if byte >= 0xE0 {
            3
        } else if byte >= 0xC0 {
            2
        } else {
            1
        };
        return if idx + char_len > bytes.len() {
            bytes.len() - idx
        } else {
            0
        };
    }
    0
}

/// Drains one child stream into the shared terminal.
pub struct StreamRenderer<R, W: Write> {
    reader: R,
    stream: StreamKind,
    terminal: SharedTerminal<W>,
}

impl<R, W> StreamRenderer<R, W>
where
    R: AsyncRead + Unpin,
    W: Write,
{
    pub fn new(reader: R, stream: StreamKind, terminal: SharedTerminal<W>) -> Self {
        Self {
            reader,
            stream,
            terminal,
        }
    }

    /// Reads until end of stream, rendering each read as one chunk.
    ///
    /// Everything a read returns is stamped with the same instant.
    pub async fn run(mut self) -> Result<()> {
        let name = self.stream.as_str();
        let mut buf = vec![0u8; READ_BUF_SIZE];
        let mut carry = Utf8Carry::default();

        loop {
            let n = self
                .reader
                .read(&mut buf)
                .await
                .with_context(|| format!("Failed to read child {name}"))?;
            if n == 0 {
                let rest = carry.finish();
                if !rest.is_empty() {
                    self.render(rest)?;
                }
                tracing::debug!(stream = name, "stream closed");
                return Ok(());
            }

            let text = carry.decode(&buf[..n]);
            if !text.is_empty() {
                self.render(text)?;
            }
        }
    }

    fn render(&self, text: String) -> Result<()> {
        let chunk = OutputChunk {
            text,
            at: Local::now(),
            stream: self.stream,
        };
        tracing::trace!(stream = self.stream.as_str(), bytes = chunk.text.len(), "chunk");
        lock(&self.terminal)
            .render_chunk(&chunk)
            .context("Failed to write to terminal")
    }
}
