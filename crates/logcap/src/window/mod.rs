//! Trailing window accumulator.
//!
//! A [`TrailingWindow`] ingests chunks in arrival order and can produce the
//! bounded trailing content at any time without re-scanning past input.
//! Chunk boundaries never affect the result: feeding the same bytes split
//! differently yields the same snapshot.
//!
//! Memory is bounded by the limit (plus at most one chunk while it is being
//! split), independent of how much input has been seen. In line mode the
//! bound is N × the longest observed line.

mod bytes;
mod lines;

pub use bytes::ByteWindow;
pub use lines::LineWindow;

use std::collections::VecDeque;

use crate::limit::Limit;

/// Default line terminator.
pub const NEWLINE: u8 = b'\n';

/// The retained trailing content for one run.
#[derive(Debug, Clone)]
pub enum TrailingWindow {
    Bytes(ByteWindow),
    Lines(LineWindow),
}

impl TrailingWindow {
    /// Build an empty window for `limit`. `terminator` only matters for
    /// line limits.
    pub fn new(limit: Limit, terminator: u8) -> Self {
        // A limit beyond the address space is unreachable in practice.
        let n = usize::try_from(limit.value()).unwrap_or(usize::MAX);
        match limit {
            Limit::Bytes(_) => TrailingWindow::Bytes(ByteWindow::new(n)),
            Limit::Lines(_) => TrailingWindow::Lines(LineWindow::new(n, terminator)),
        }
    }

    /// Ingest one chunk. Returns `true` when the snapshot changed.
    pub fn ingest(&mut self, chunk: &[u8]) -> bool {
        match self {
            TrailingWindow::Bytes(w) => w.ingest(chunk),
            TrailingWindow::Lines(w) => w.ingest(chunk),
        }
    }

    /// Mark end of input. Returns `true` when the snapshot changed.
    pub fn finish(&mut self) -> bool {
        match self {
            TrailingWindow::Bytes(_) => false,
            TrailingWindow::Lines(w) => w.finish(),
        }
    }

    /// Copy out the current bounded content. Does not mutate the window.
    pub fn snapshot(&self) -> Vec<u8> {
        match self {
            TrailingWindow::Bytes(w) => w.snapshot(),
            TrailingWindow::Lines(w) => w.snapshot(),
        }
    }

    /// Size of the current snapshot in bytes.
    pub fn retained_bytes(&self) -> usize {
        match self {
            TrailingWindow::Bytes(w) => w.len(),
            TrailingWindow::Lines(w) => w.retained_bytes(),
        }
    }

    /// Complete lines retained, for line-bound windows.
    pub fn retained_lines(&self) -> Option<usize> {
        match self {
            TrailingWindow::Bytes(_) => None,
            TrailingWindow::Lines(w) => Some(w.line_count()),
        }
    }

    /// Approximate heap bytes held by the window.
    pub fn footprint(&self) -> usize {
        match self {
            TrailingWindow::Bytes(w) => w.footprint(),
            TrailingWindow::Lines(w) => w.footprint(),
        }
    }
}

/// Copy the first `n` bytes of a ring into a contiguous buffer.
fn copy_prefix(ring: &VecDeque<u8>, n: usize) -> Vec<u8> {
    let (front, back) = ring.as_slices();
    let from_front = n.min(front.len());
    let mut out = Vec::with_capacity(n);
    out.extend_from_slice(&front[..from_front]);
    out.extend_from_slice(&back[..n - from_front]);
    out
}
