//! Bounded sink: keep a file capped at the last N bytes or N lines of a
//! stream.
//!
//! `logcap` reads an input stream through a fixed-size trailing window and
//! publishes the window's contents to an output file by atomic replacement.
//! The output never exceeds the configured limit, and a reader of the output
//! path always sees a complete snapshot.
//!
//! Two drivers share the same window and writer:
//!
//! - [`copy_bounded`] / [`run_once`]: read to end of input, commit once. Safe
//!   to run with the input and output being the same file.
//! - [`FollowDriver`]: commit after every change (or on a coalescing
//!   schedule) while a live stream is being read, until end of input or
//!   cancellation.
//!
//! # Example
//!
//! ```no_run
//! use logcap::{AtomicFile, Limit, SinkConfig, copy_bounded};
//!
//! let config = SinkConfig::new(Limit::lines(1000)?);
//! let mut output = AtomicFile::new("/var/log/app.tail.log");
//! let input = std::fs::File::open("/var/log/app.log").map_err(|error| {
//!     logcap::Error::SourceReadFailed {
//!         source_name: "/var/log/app.log".into(),
//!         error,
//!     }
//! })?;
//! let stats = copy_bounded(input, "/var/log/app.log", &config, &mut output)?;
//! println!("kept {} bytes", stats.retained_bytes);
//! # Ok::<(), logcap::Error>(())
//! ```

pub mod config;
pub mod copy;
pub mod error;
pub mod follow;
pub mod limit;
pub mod logging;
pub mod size;
pub mod source;
pub mod stats;
pub mod window;
pub mod writer;

pub use config::{CommitSchedule, FollowConfig, SinkConfig};
pub use copy::{copy_bounded, run_once};
pub use error::{CommitStage, Error, Result};
pub use follow::{FollowDriver, cancel_on_shutdown};
pub use limit::{Limit, LimitKind};
pub use size::{SizeParseError, parse_size};
pub use source::{ChunkReader, Source};
pub use stats::{RunStats, Termination};
pub use window::TrailingWindow;
pub use writer::{AtomicFile, GuardedSink, Sink};
