//! Line-bound ring: keeps the last N complete lines.
//!
//! Lines are stored back to back in one byte ring, with a parallel ring of
//! line lengths (terminator included). Bytes after the last terminator form
//! the pending fragment: they sit at the tail of `data` but are neither
//! counted nor visible until a terminator arrives or [`LineWindow::finish`]
//! promotes them to a final line.
//!
//! A single line is never split, so one pathologically long line costs its
//! full length in memory.

use std::collections::VecDeque;

use super::copy_prefix;

#[derive(Debug, Clone)]
pub struct LineWindow {
    data: VecDeque<u8>,
    lines: VecDeque<usize>,
    pending: usize,
    max_lines: usize,
    terminator: u8,
}

impl LineWindow {
    pub fn new(max_lines: usize, terminator: u8) -> Self {
        Self {
            data: VecDeque::new(),
            lines: VecDeque::new(),
            pending: 0,
            max_lines,
            terminator,
        }
    }

    /// Split a chunk on the terminator and append it.
    ///
    /// Returns `true` when at least one line was completed, i.e. the
    /// snapshot changed.
    pub fn ingest(&mut self, chunk: &[u8]) -> bool {
        let terminator = self.terminator;
        let mut changed = false;
        for piece in chunk.split_inclusive(|&b| b == terminator) {
            self.data.extend(piece);
            if piece.last() == Some(&terminator) {
                self.lines.push_back(self.pending + piece.len());
                self.pending = 0;
                self.evict();
                changed = true;
            } else {
                self.pending += piece.len();
            }
        }
        changed
    }

    /// End of input: an unterminated fragment becomes the final line.
    ///
    /// No further chunks may be ingested afterwards.
    pub fn finish(&mut self) -> bool {
        if self.pending == 0 {
            return false;
        }
        self.lines.push_back(self.pending);
        self.pending = 0;
        self.evict();
        true
    }

    fn evict(&mut self) {
        while self.lines.len() > self.max_lines {
            if let Some(len) = self.lines.pop_front() {
                self.data.drain(..len);
            }
        }
    }

    /// Retained complete lines, joined as they arrived.
    pub fn snapshot(&self) -> Vec<u8> {
        copy_prefix(&self.data, self.visible_len())
    }

    fn visible_len(&self) -> usize {
        self.data.len() - self.pending
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn retained_bytes(&self) -> usize {
        self.visible_len()
    }

    /// Length of the unterminated fragment still waiting for its terminator.
    pub fn pending_len(&self) -> usize {
        self.pending
    }

    pub fn footprint(&self) -> usize {
        self.data.capacity() + self.lines.capacity() * std::mem::size_of::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_last_n_lines() {
        let mut w = LineWindow::new(2, b'\n');
        w.ingest(b"a\n");
        w.ingest(b"b\n");
        w.ingest(b"c\n");
        assert_eq!(w.snapshot(), b"b\nc\n");
        assert_eq!(w.line_count(), 2);
    }

    #[test]
    fn fragment_is_hidden_until_terminated() {
        let mut w = LineWindow::new(3, b'\n');
        assert!(w.ingest(b"one\ntw"));
        assert_eq!(w.snapshot(), b"one\n");
        assert_eq!(w.pending_len(), 2);

        assert!(!w.ingest(b"o"));
        assert_eq!(w.snapshot(), b"one\n");

        assert!(w.ingest(b"\n"));
        assert_eq!(w.snapshot(), b"one\ntwo\n");
        assert_eq!(w.pending_len(), 0);
    }

    #[test]
    fn finish_promotes_fragment_and_evicts() {
        let mut w = LineWindow::new(2, b'\n');
        w.ingest(b"a\nb\nc");
        assert_eq!(w.snapshot(), b"a\nb\n");
        assert!(w.finish());
        assert_eq!(w.snapshot(), b"b\nc");
        assert_eq!(w.line_count(), 2);
    }

    #[test]
    fn finish_without_fragment_is_a_no_op() {
        let mut w = LineWindow::new(2, b'\n');
        w.ingest(b"a\n");
        assert!(!w.finish());
        assert_eq!(w.snapshot(), b"a\n");
    }

    #[test]
    fn custom_terminator() {
        let mut w = LineWindow::new(1, b'\0');
        w.ingest(b"x\0y\nz\0");
        assert_eq!(w.snapshot(), b"y\nz\0");
    }

    #[test]
    fn empty_lines_count() {
        let mut w = LineWindow::new(2, b'\n');
        w.ingest(b"a\n\n\n");
        assert_eq!(w.snapshot(), b"\n\n");
    }
}
