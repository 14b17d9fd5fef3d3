//! Run configuration with defaults and builder methods.
//!
//! [`SinkConfig`] is shared by both drivers; [`FollowConfig`] only affects
//! the incremental follow loop.
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//! use logcap::{FollowConfig, Limit, SinkConfig};
//!
//! let sink = SinkConfig::new(Limit::lines(100).unwrap()).with_terminator(b'\0');
//! let follow = FollowConfig::default()
//!     .with_commit_interval(Duration::from_millis(250))
//!     .with_max_commit_failures(5);
//! # let _ = (sink, follow);
//! ```

use std::time::Duration;

use crate::limit::Limit;
use crate::window::{NEWLINE, TrailingWindow};

/// Read buffer size used for one chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Consecutive follow-mode commit failures tolerated before aborting.
pub const DEFAULT_MAX_COMMIT_FAILURES: u32 = 3;

// ── SinkConfig ─────────────────────────────────────────────────────

/// What to keep and how to read it.
#[derive(Debug, Clone)]
pub struct SinkConfig {
    /// The active bound.
    pub limit: Limit,
    /// Line terminator for line limits. Default: `\n`.
    pub terminator: u8,
    /// Maximum bytes per read. Default: 64 KiB.
    pub chunk_size: usize,
}

impl SinkConfig {
    pub fn new(limit: Limit) -> Self {
        Self {
            limit,
            terminator: NEWLINE,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn with_terminator(mut self, terminator: u8) -> Self {
        self.terminator = terminator;
        self
    }

    /// Set the read buffer size. Clamped to at least one byte.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// A fresh, empty window for this configuration.
    pub fn window(&self) -> TrailingWindow {
        TrailingWindow::new(self.limit, self.terminator)
    }
}

// ── FollowConfig ───────────────────────────────────────────────────

/// When the follow driver publishes a new snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommitSchedule {
    /// Commit after every chunk that changes the snapshot.
    #[default]
    EveryChunk,
    /// Commit at most once per interval; a timer flushes pending changes
    /// even when no further input arrives.
    Coalesce(Duration),
}

/// Follow-mode policies.
#[derive(Debug, Clone)]
pub struct FollowConfig {
    /// Commit schedule. Default: [`CommitSchedule::EveryChunk`].
    pub schedule: CommitSchedule,
    /// Consecutive failed commits that are skipped (and retried on the next
    /// chunk) before the run aborts. `0` aborts on the first failure. The
    /// final commit on termination is never skipped. Default: `3`.
    pub max_commit_failures: u32,
}

impl Default for FollowConfig {
    fn default() -> Self {
        Self {
            schedule: CommitSchedule::EveryChunk,
            max_commit_failures: DEFAULT_MAX_COMMIT_FAILURES,
        }
    }
}

impl FollowConfig {
    /// Coalesce commits to at most one per `interval`. A zero interval
    /// means every chunk.
    pub fn with_commit_interval(mut self, interval: Duration) -> Self {
        self.schedule = if interval.is_zero() {
            CommitSchedule::EveryChunk
        } else {
            CommitSchedule::Coalesce(interval)
        };
        self
    }

    pub fn with_max_commit_failures(mut self, n: u32) -> Self {
        self.max_commit_failures = n;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sink_defaults() {
        let config = SinkConfig::new(Limit::bytes(10).unwrap());
        assert_eq!(config.terminator, b'\n');
        assert_eq!(config.chunk_size, 64 * 1024);
    }

    #[test]
    fn chunk_size_is_clamped() {
        let config = SinkConfig::new(Limit::bytes(10).unwrap()).with_chunk_size(0);
        assert_eq!(config.chunk_size, 1);
    }

    #[test]
    fn zero_interval_means_every_chunk() {
        let follow = FollowConfig::default().with_commit_interval(Duration::ZERO);
        assert_eq!(follow.schedule, CommitSchedule::EveryChunk);

        let follow = FollowConfig::default().with_commit_interval(Duration::from_millis(5));
        assert_eq!(
            follow.schedule,
            CommitSchedule::Coalesce(Duration::from_millis(5))
        );
    }

    #[test]
    fn follow_defaults() {
        let follow = FollowConfig::default();
        assert_eq!(follow.schedule, CommitSchedule::EveryChunk);
        assert_eq!(follow.max_commit_failures, 3);
    }
}
