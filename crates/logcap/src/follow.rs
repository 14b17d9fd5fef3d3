//! Incremental follow driver.
//!
//! A two-state machine, `Running` → `Terminated`. While running, the driver
//! waits on the next read, ingests the chunk into the window, and commits
//! the snapshot according to the [`CommitSchedule`]. It terminates on end of
//! input or when the [`CancellationToken`] fires; either way it performs one
//! final commit and returns.
//!
//! The read is the only suspension point. Commits are synchronous and run to
//! completion between reads, so cancellation never interrupts a commit.
//!
//! Failure handling:
//! - A read error aborts immediately and discards the window *without* a
//!   final commit: the content is incomplete, and the output keeps the last
//!   good snapshot.
//! - A failed commit is skipped and retried on the next change, up to
//!   [`FollowConfig::max_commit_failures`] consecutive failures. Each attempt
//!   cleans up its own temporary file.
//! - A failed final commit is always fatal.

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{CommitSchedule, FollowConfig, SinkConfig};
use crate::error::{Error, Result};
use crate::stats::{RunStats, Termination};
use crate::window::TrailingWindow;
use crate::writer::Sink;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Running,
    Terminated(Termination),
}

/// Keeps a sink bounded while a live source is being read.
pub struct FollowDriver<'a, S: Sink> {
    sink: &'a mut S,
    config: SinkConfig,
    follow: FollowConfig,
    window: TrailingWindow,
    stats: RunStats,
    /// Snapshot changed since the last successful commit.
    dirty: bool,
    committed: bool,
    consecutive_failures: u32,
    last_attempt: Option<Instant>,
}

impl<'a, S: Sink> FollowDriver<'a, S> {
    pub fn new(sink: &'a mut S, config: SinkConfig, follow: FollowConfig) -> Self {
        let window = config.window();
        let stats = RunStats::new(config.limit);
        Self {
            sink,
            config,
            follow,
            window,
            stats,
            dirty: false,
            committed: false,
            consecutive_failures: 0,
            last_attempt: None,
        }
    }

    /// Run until end of input or cancellation.
    pub async fn run<R: AsyncRead + Unpin>(
        mut self,
        mut source: R,
        source_name: &str,
        cancel: CancellationToken,
    ) -> Result<RunStats> {
        info!(source = source_name, limit = %self.config.limit, "following input");
        let mut buf = vec![0u8; self.config.chunk_size];

        let termination = loop {
            match self.step(&mut source, &mut buf, source_name, &cancel).await? {
                State::Running => continue,
                State::Terminated(how) => break how,
            }
        };

        if self.window.finish() {
            self.dirty = true;
        }
        if self.dirty || !self.committed {
            self.sink.commit(&self.window.snapshot())?;
            self.stats.commits += 1;
        }
        self.stats.close(&self.window, termination);

        info!(
            source = source_name,
            termination = ?termination,
            commits = self.stats.commits,
            failed_commits = self.stats.failed_commits,
            "follow finished"
        );
        Ok(self.stats)
    }

    async fn step<R: AsyncRead + Unpin>(
        &mut self,
        source: &mut R,
        buf: &mut [u8],
        source_name: &str,
        cancel: &CancellationToken,
    ) -> Result<State> {
        let deadline = self.flush_deadline();
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                info!("Termination requested, committing final snapshot");
                Ok(State::Terminated(Termination::Cancelled))
            }

            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                self.try_commit()?;
                Ok(State::Running)
            }

            read = source.read(buf) => match read {
                Ok(0) => Ok(State::Terminated(Termination::EndOfInput)),
                Ok(n) => {
                    self.stats.record_chunk(n);
                    if self.window.ingest(&buf[..n]) {
                        self.dirty = true;
                    }
                    if self.commit_due() {
                        self.try_commit()?;
                    }
                    Ok(State::Running)
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => Ok(State::Running),
                Err(error) => {
                    warn!("Read from {source_name} failed; discarding window without final commit");
                    Err(Error::SourceReadFailed {
                        source_name: source_name.to_string(),
                        error,
                    })
                }
            },
        }
    }

    fn commit_due(&self) -> bool {
        if !self.dirty {
            return false;
        }
        match self.follow.schedule {
            CommitSchedule::EveryChunk => true,
            CommitSchedule::Coalesce(interval) => self
                .last_attempt
                .is_none_or(|at| at.elapsed() >= interval),
        }
    }

    /// When a coalesced change must be flushed even without new input.
    fn flush_deadline(&self) -> Option<Instant> {
        match self.follow.schedule {
            CommitSchedule::Coalesce(interval) if self.dirty => Some(
                self.last_attempt
                    .map_or_else(Instant::now, |at| at + interval),
            ),
            _ => None,
        }
    }

    fn try_commit(&mut self) -> Result<()> {
        self.last_attempt = Some(Instant::now());
        match self.sink.commit(&self.window.snapshot()) {
            Ok(()) => {
                self.dirty = false;
                self.committed = true;
                self.consecutive_failures = 0;
                self.stats.commits += 1;
                debug!(
                    retained_bytes = self.window.retained_bytes(),
                    "follow commit"
                );
                Ok(())
            }
            Err(e) if e.is_commit_error()
                && self.consecutive_failures < self.follow.max_commit_failures =>
            {
                self.consecutive_failures += 1;
                self.stats.failed_commits += 1;
                warn!(
                    "Commit failed ({}/{} consecutive), retrying on next change: {e}",
                    self.consecutive_failures, self.follow.max_commit_failures
                );
                Ok(())
            }
            Err(e) => {
                self.stats.failed_commits += 1;
                Err(e)
            }
        }
    }
}

/// Cancel `token` on SIGINT or (on Unix) SIGTERM.
pub async fn cancel_on_shutdown(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for ctrl-c: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    token.cancel();
}
