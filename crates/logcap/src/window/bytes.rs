//! Byte-bound ring: keeps the last `capacity` bytes ever ingested.

use std::collections::VecDeque;

use super::copy_prefix;

/// Fixed-capacity ring of the most recent bytes.
///
/// The front is evicted *before* a chunk is appended, so the ring never holds
/// more than `capacity` bytes even transiently.
#[derive(Debug, Clone)]
pub struct ByteWindow {
    buf: VecDeque<u8>,
    capacity: usize,
}

impl ByteWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: VecDeque::new(),
            capacity,
        }
    }

    /// Append a chunk, evicting the oldest bytes beyond `capacity`.
    ///
    /// Returns `true` when the retained content changed.
    pub fn ingest(&mut self, chunk: &[u8]) -> bool {
        if chunk.is_empty() {
            return false;
        }
        if chunk.len() >= self.capacity {
            self.buf.clear();
            self.buf.extend(&chunk[chunk.len() - self.capacity..]);
        } else {
            let overflow = (self.buf.len() + chunk.len()).saturating_sub(self.capacity);
            self.buf.drain(..overflow);
            self.buf.extend(chunk);
        }
        true
    }

    pub fn snapshot(&self) -> Vec<u8> {
        copy_prefix(&self.buf, self.buf.len())
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Bytes currently allocated by the ring.
    pub fn footprint(&self) -> usize {
        self.buf.capacity()
    }
}
