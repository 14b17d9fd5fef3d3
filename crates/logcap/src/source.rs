//! Input sources and chunked reading.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Where input comes from. The drivers only ever read from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Stdin,
    Path(PathBuf),
}

impl Source {
    /// Map the CLI positional: absent or `-` means stdin.
    pub fn from_arg(arg: Option<&Path>) -> Self {
        match arg {
            None => Source::Stdin,
            Some(p) if p.as_os_str() == "-" => Source::Stdin,
            Some(p) => Source::Path(p.to_path_buf()),
        }
    }

    pub fn is_stdin(&self) -> bool {
        matches!(self, Source::Stdin)
    }

    /// Name used in logs and error messages.
    pub fn name(&self) -> String {
        match self {
            Source::Stdin => "<stdin>".to_string(),
            Source::Path(p) => p.display().to_string(),
        }
    }

    /// Open for a blocking one-shot read.
    pub fn open(&self) -> Result<Box<dyn Read>> {
        match self {
            Source::Stdin => Ok(Box::new(io::stdin().lock())),
            Source::Path(p) => File::open(p)
                .map(|f| Box::new(f) as Box<dyn Read>)
                .map_err(|error| Error::SourceReadFailed {
                    source_name: self.name(),
                    error,
                }),
        }
    }
}

/// Lazy, non-restartable sequence of chunks over a blocking reader.
///
/// One buffer is reused for every read, so a chunk borrowed from
/// [`next_chunk`](Self::next_chunk) is gone once the next one is requested.
pub struct ChunkReader<R> {
    inner: R,
    buf: Vec<u8>,
}

impl<R: Read> ChunkReader<R> {
    pub fn new(inner: R, chunk_size: usize) -> Self {
        Self {
            inner,
            buf: vec![0; chunk_size.max(1)],
        }
    }

    /// Next chunk, or `None` at end of input. Interrupted reads are retried.
    pub fn next_chunk(&mut self) -> io::Result<Option<&[u8]>> {
        let n = loop {
            match self.inner.read(&mut self.buf) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        };
        Ok((n > 0).then(|| &self.buf[..n]))
    }
}
