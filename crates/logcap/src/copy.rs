//! One-shot bounded copy.
//!
//! Reads the whole source through the window, then commits once. The source
//! is fully consumed before the first byte is written, which is what makes
//! `input == output` safe: the file being truncated has already been read
//! into bounded memory.

use std::io::Read;

use tracing::info;

use crate::config::SinkConfig;
use crate::error::{Error, Result};
use crate::source::{ChunkReader, Source};
use crate::stats::{RunStats, Termination};
use crate::writer::Sink;

/// Drain `source` into a bounded window and commit the result to `sink`.
pub fn copy_bounded<R: Read, S: Sink>(
    source: R,
    source_name: &str,
    config: &SinkConfig,
    sink: &mut S,
) -> Result<RunStats> {
    let mut window = config.window();
    let mut stats = RunStats::new(config.limit);
    let mut reader = ChunkReader::new(source, config.chunk_size);

    let read_failed = |error: std::io::Error| Error::SourceReadFailed {
        source_name: source_name.to_string(),
        error,
    };
    while let Some(chunk) = reader.next_chunk().map_err(read_failed)? {
        stats.record_chunk(chunk.len());
        window.ingest(chunk);
    }
    window.finish();

    sink.commit(&window.snapshot())?;
    stats.commits += 1;
    stats.close(&window, Termination::EndOfInput);

    info!(
        source = source_name,
        limit = %config.limit,
        bytes_read = stats.bytes_read,
        retained_bytes = stats.retained_bytes,
        "bounded copy complete"
    );
    Ok(stats)
}

/// Open `source` and run [`copy_bounded`] over it.
pub fn run_once<S: Sink>(source: &Source, config: &SinkConfig, sink: &mut S) -> Result<RunStats> {
    let reader = source.open()?;
    copy_bounded(reader, &source.name(), config, sink)
}
