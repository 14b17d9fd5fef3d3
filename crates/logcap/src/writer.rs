//! Atomic replacement of the output file.
//!
//! Every commit writes the full snapshot to a hidden temporary file in the
//! output's own directory, syncs it, and renames it over the output. Readers
//! of the output path therefore see either the previous complete file or the
//! new complete file. The temporary file is a [`tempfile::NamedTempFile`],
//! so every early return removes it.
//!
//! Directory layout during a commit:
//! ```text
//! logs/
//!   app.log                 <- previous content, untouched until rename
//!   .app.log.Xa81Qz.tmp     <- new content, renamed over app.log
//! ```

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, warn};

use crate::error::{CommitStage, Error, Result};

/// Destination for committed snapshots.
///
/// The drivers publish through this trait so tests can observe or fail
/// commits without touching the filesystem.
pub trait Sink {
    /// Replace the destination with exactly `content`.
    fn commit(&mut self, content: &[u8]) -> Result<()>;
}

impl<S: Sink + ?Sized> Sink for &mut S {
    fn commit(&mut self, content: &[u8]) -> Result<()> {
        (**self).commit(content)
    }
}

type RenameHook = Box<dyn FnMut(&Path) -> io::Result<()> + Send>;

/// The only writer of the output path. It never appends to or truncates the
/// output in place.
pub struct AtomicFile {
    path: PathBuf,
    dir: PathBuf,
    create_dirs: bool,
    sync_dir: bool,
    before_rename: Option<RenameHook>,
}

impl AtomicFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Self {
            path,
            dir,
            create_dirs: false,
            sync_dir: true,
            before_rename: None,
        }
    }

    /// Create missing parent directories on commit.
    pub fn create_dirs(mut self, enabled: bool) -> Self {
        self.create_dirs = enabled;
        self
    }

    /// Sync the containing directory after each rename. Default: `true`.
    pub fn sync_dir(mut self, enabled: bool) -> Self {
        self.sync_dir = enabled;
        self
    }

    /// Run `hook` with the fully written temporary file right before it is
    /// renamed into place. An error aborts the commit as a rename failure.
    pub fn with_before_rename(
        mut self,
        hook: impl FnMut(&Path) -> io::Result<()> + Send + 'static,
    ) -> Self {
        self.before_rename = Some(Box::new(hook));
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Atomically replace the output with `content`.
    pub fn commit(&mut self, content: &[u8]) -> Result<()> {
        if self.create_dirs {
            fs::create_dir_all(&self.dir).map_err(|error| Error::PathError {
                dir: self.dir.clone(),
                error,
            })?;
        }

        let Some(file_name) = self.path.file_name() else {
            return Err(Error::PathError {
                dir: self.dir.clone(),
                error: io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "output path has no file name",
                ),
            });
        };
        let prefix = format!(".{}.", file_name.to_string_lossy());

        let mut tmp = tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(".tmp")
            .tempfile_in(&self.dir)
            .map_err(|error| self.create_error(error))?;

        self.apply_permissions(tmp.path())
            .map_err(|error| self.stage_error(CommitStage::CreateTemp, error))?;
        tmp.write_all(content)
            .and_then(|()| tmp.flush())
            .map_err(|error| self.stage_error(CommitStage::Write, error))?;
        tmp.as_file()
            .sync_all()
            .map_err(|error| self.stage_error(CommitStage::Sync, error))?;

        if let Some(hook) = self.before_rename.as_mut()
            && let Err(error) = hook(tmp.path())
        {
            return Err(self.stage_error(CommitStage::Rename, error));
        }

        // On failure the returned error owns the temp file and removes it on drop.
        tmp.persist(&self.path)
            .map_err(|e| self.stage_error(CommitStage::Rename, e.error))?;

        if self.sync_dir
            && let Err(e) = sync_directory(&self.dir)
        {
            warn!("Failed to sync directory {}: {e}", self.dir.display());
        }

        debug!(
            path = %self.path.display(),
            bytes = content.len(),
            "committed snapshot"
        );
        Ok(())
    }

    fn stage_error(&self, stage: CommitStage, error: io::Error) -> Error {
        Error::CommitFailed {
            path: self.path.clone(),
            stage,
            error,
        }
    }

    /// A temp file that cannot be created usually means the directory itself
    /// is missing or read-only.
    fn create_error(&self, error: io::Error) -> Error {
        match error.kind() {
            io::ErrorKind::NotFound
            | io::ErrorKind::PermissionDenied
            | io::ErrorKind::NotADirectory
            | io::ErrorKind::ReadOnlyFilesystem => Error::PathError {
                dir: self.dir.clone(),
                error,
            },
            _ => self.stage_error(CommitStage::CreateTemp, error),
        }
    }

    /// Keep the replaced file's permissions; new files get 0644 on Unix.
    fn apply_permissions(&self, tmp: &Path) -> io::Result<()> {
        match fs::metadata(&self.path) {
            Ok(meta) => fs::set_permissions(tmp, meta.permissions()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => default_permissions(tmp),
            Err(e) => Err(e),
        }
    }
}

impl Sink for AtomicFile {
    fn commit(&mut self, content: &[u8]) -> Result<()> {
        AtomicFile::commit(self, content)
    }
}

/// A sink whose in-flight commit can be waited out from another thread.
///
/// Every commit runs while holding [`commit_lock`](Self::commit_lock). A
/// thread that takes the lock before exiting the process therefore never
/// interrupts a commit halfway, and never orphans its temporary file.
pub struct GuardedSink<S> {
    inner: S,
    lock: Arc<Mutex<()>>,
}

impl<S: Sink> GuardedSink<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn commit_lock(&self) -> Arc<Mutex<()>> {
        Arc::clone(&self.lock)
    }
}

impl<S: Sink> Sink for GuardedSink<S> {
    fn commit(&mut self, content: &[u8]) -> Result<()> {
        let _held = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.inner.commit(content)
    }
}

/// One-off atomic write of `content` to `path`.
pub fn commit(path: impl Into<PathBuf>, content: &[u8]) -> Result<()> {
    AtomicFile::new(path).commit(content)
}

#[cfg(unix)]
fn default_permissions(tmp: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(tmp, fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn default_permissions(_tmp: &Path) -> io::Result<()> {
    Ok(())
}

#[cfg(unix)]
fn sync_directory(dir: &Path) -> io::Result<()> {
    File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_directory(_dir: &Path) -> io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    fn temp_files(dir: &Path) -> Vec<String> {
        fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .filter(|name| name.ends_with(".tmp"))
            .collect()
    }

    #[test]
    fn creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.log");
        commit(&path, b"hello").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"hello");
        assert!(temp_files(dir.path()).is_empty());
    }

    #[test]
    fn replaces_existing_content_entirely() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.log");
        fs::write(&path, b"a much longer previous content").unwrap();
        commit(&path, b"short").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"short");
    }

    #[test]
    fn empty_content_creates_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.log");
        commit(&path, b"").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"");
    }

    #[test]
    fn reader_sees_old_content_until_rename() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.log");
        fs::write(&path, b"old").unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_hook = seen.clone();
        let watched = path.clone();
        let mut file = AtomicFile::new(&path).with_before_rename(move |tmp| {
            let mut seen = seen_hook.lock().unwrap();
            seen.push(fs::read(&watched)?);
            seen.push(fs::read(tmp)?);
            Ok(())
        });

        file.commit(b"new content").unwrap();
        let seen = seen.lock().unwrap();
        assert_eq!(seen[0], b"old");
        assert_eq!(seen[1], b"new content");
        assert_eq!(fs::read(&path).unwrap(), b"new content");
    }

    #[test]
    fn failed_rename_leaves_output_and_no_temp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.log");
        fs::write(&path, b"previous").unwrap();

        let mut file = AtomicFile::new(&path)
            .with_before_rename(|_| Err(io::Error::other("injected rename fault")));
        let err = file.commit(b"next").unwrap_err();

        assert!(matches!(
            err,
            Error::CommitFailed {
                stage: CommitStage::Rename,
                ..
            }
        ));
        assert_eq!(fs::read(&path).unwrap(), b"previous");
        assert!(temp_files(dir.path()).is_empty());
    }

    #[test]
    fn failed_first_commit_leaves_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.log");
        let mut file = AtomicFile::new(&path).with_before_rename(|_| Err(io::Error::other("no")));
        assert!(file.commit(b"data").is_err());
        assert!(!path.exists());
        assert!(temp_files(dir.path()).is_empty());
    }

    #[test]
    fn missing_directory_is_a_path_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope").join("out.log");
        let err = commit(&path, b"x").unwrap_err();
        match err {
            Error::PathError { dir: d, .. } => assert!(d.ends_with("nope")),
            other => panic!("expected PathError, got {other}"),
        }
    }

    #[test]
    fn create_dirs_makes_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a").join("b").join("out.log");
        AtomicFile::new(&path)
            .create_dirs(true)
            .commit(b"nested")
            .unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"nested");
    }

    #[test]
    fn directory_target_fails_without_touching_it() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("taken");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("keep"), b"k").unwrap();

        assert!(commit(&target, b"x").is_err());
        assert_eq!(fs::read(target.join("keep")).unwrap(), b"k");
        assert!(temp_files(dir.path()).is_empty());
    }

    #[test]
    fn relative_path_uses_current_directory() {
        let file = AtomicFile::new("out.log");
        assert_eq!(file.dir, PathBuf::from("."));
    }

    #[test]
    fn commit_lock_waits_out_an_inflight_commit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.log");
        let (started, in_flight) = mpsc::channel();
        let file = AtomicFile::new(&path).with_before_rename(move |_| {
            started.send(()).ok();
            thread::sleep(Duration::from_millis(100));
            Ok(())
        });
        let mut sink = GuardedSink::new(file);
        let lock = sink.commit_lock();

        let writer = thread::spawn(move || sink.commit(b"complete"));
        in_flight.recv().unwrap();
        let _held = lock.lock().unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"complete");
        assert!(temp_files(dir.path()).is_empty());
        writer.join().unwrap().unwrap();
    }

    #[test]
    fn guarded_commit_blocks_while_lock_is_held() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.log");
        let mut sink = GuardedSink::new(AtomicFile::new(&path));
        let lock = sink.commit_lock();

        let held = lock.lock().unwrap();
        let writer = thread::spawn(move || sink.commit(b"late"));
        thread::sleep(Duration::from_millis(50));
        assert!(!path.exists());

        drop(held);
        writer.join().unwrap().unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"late");
    }

    #[cfg(unix)]
    #[test]
    fn permissions_are_preserved_on_replace() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.log");
        fs::write(&path, b"old").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o600)).unwrap();

        commit(&path, b"new").unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn new_files_are_world_readable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fresh.log");
        commit(&path, b"x").unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o644);
    }
}
