//! Per-run counters, printed by `--stats`.

use serde::Serialize;

use crate::limit::{Limit, LimitKind};
use crate::window::TrailingWindow;

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// The source reached end of input.
    EndOfInput,
    /// A termination request arrived before end of input.
    Cancelled,
}

/// Summary of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub limit_kind: LimitKind,
    pub limit: u64,
    pub bytes_read: u64,
    pub chunks: u64,
    pub commits: u64,
    pub failed_commits: u64,
    pub retained_bytes: u64,
    /// Complete lines in the final output; `null` for byte limits.
    pub retained_lines: Option<u64>,
    pub termination: Termination,
}

impl RunStats {
    pub fn new(limit: Limit) -> Self {
        Self {
            limit_kind: limit.kind(),
            limit: limit.value(),
            bytes_read: 0,
            chunks: 0,
            commits: 0,
            failed_commits: 0,
            retained_bytes: 0,
            retained_lines: None,
            termination: Termination::EndOfInput,
        }
    }

    pub fn record_chunk(&mut self, len: usize) {
        self.chunks += 1;
        self.bytes_read += len as u64;
    }

    /// Capture the window's final shape.
    pub fn close(&mut self, window: &TrailingWindow, termination: Termination) {
        self.retained_bytes = window.retained_bytes() as u64;
        self.retained_lines = window.retained_lines().map(|n| n as u64);
        self.termination = termination;
    }
}
