use std::{io, ops::Range};

use crate::Record;

/// Output of a single render: the formatted bytes and the half-open range
/// of those bytes that should be highlighted with the level color.
#[derive(Debug, Default)]
pub struct Rendered {
    buf: Vec<u8>,
    highlight: Range<usize>,
}

impl Rendered {
    /// An empty buffer with an empty highlight range.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn buf_mut(&mut self) -> &mut Vec<u8> {
        &mut self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn push_str(&mut self, s: &str) {
        self.buf.extend_from_slice(s.as_bytes());
    }

    pub fn highlight(&self) -> Range<usize> {
        self.highlight.clone()
    }

    pub fn set_highlight(&mut self, range: Range<usize>) {
        self.highlight = range;
    }

    /// Marks the current end of the buffer as the start of the highlight.
    pub fn mark_highlight_start(&mut self) {
        self.highlight.start = self.buf.len();
    }

    /// Marks the current end of the buffer as the end of the highlight.
    pub fn mark_highlight_end(&mut self) {
        self.highlight.end = self.buf.len();
    }

    /// Splits the buffer around the highlight range.
    ///
    /// Returns `None` when the range is empty or does not fit the buffer.
    pub fn split_highlight(&self) -> Option<(&[u8], &[u8], &[u8])> {
        let Range { start, end } = self.highlight;
        if end <= start || end > self.buf.len() {
            return None;
        }
        Some((&self.buf[..start], &self.buf[start..end], &self.buf[end..]))
    }
}

/// Renders records into bytes for a sink.
///
/// Implementations must leave `start <= end <= dest.len()`. The sink hands
/// every call a fresh `Rendered`, so a formatter that sets no range produces
/// uncolored output.
pub trait Formatter: Send + Sync {
    fn format(&self, record: &Record, dest: &mut Rendered) -> io::Result<()>;
}
