//! Local side of a publish run: directory traversal and per-directory file listing.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::debug;
use walkdir::{DirEntry, FilterEntry, WalkDir};

use crate::contract::LocalFile;
use crate::error::{PublishError, Result};

/// Visits a directory tree in pre-order: the root first, then each
/// subdirectory followed by everything below it. Siblings are visited in
/// name order. Symbolic links to directories are not descended.
#[derive(Debug, Clone)]
pub struct DirectoryWalker {
    root: PathBuf,
}

impl DirectoryWalker {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Start a fresh traversal. Every call re-reads the filesystem.
    ///
    /// Only the root is checked here; everything below it is read lazily.
    pub fn walk(&self) -> Result<Walk> {
        match fs::metadata(&self.root) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                return Err(PublishError::local_io(
                    &self.root,
                    io::Error::new(io::ErrorKind::Other, "not a directory"),
                ))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(PublishError::NotFound(self.root.clone()))
            }
            Err(e) => return Err(PublishError::local_io(&self.root, e)),
        }

        let inner = WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(is_directory as fn(&DirEntry) -> bool);
        Ok(Walk {
            root: self.root.clone(),
            inner,
            finished: false,
        })
    }
}

fn is_directory(entry: &DirEntry) -> bool {
    entry.file_type().is_dir()
}

/// Lazy pre-order traversal produced by [`DirectoryWalker::walk`].
///
/// Files and symlinks are pruned without being yielded. After an error the
/// traversal ends.
pub struct Walk {
    root: PathBuf,
    inner: FilterEntry<walkdir::IntoIter, fn(&DirEntry) -> bool>,
    finished: bool,
}

impl fmt::Debug for Walk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Walk")
            .field("root", &self.root)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

impl Iterator for Walk {
    type Item = Result<PathBuf>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.inner.next()? {
            Ok(entry) => Some(Ok(entry.into_path())),
            Err(e) => {
                self.finished = true;
                Some(Err(walk_error(&self.root, e)))
            }
        }
    }
}

fn walk_error(root: &Path, e: walkdir::Error) -> PublishError {
    let path = e.path().unwrap_or(root).to_path_buf();
    let not_found = e
        .io_error()
        .is_some_and(|io| io.kind() == io::ErrorKind::NotFound);
    if not_found && path == root {
        return PublishError::NotFound(path);
    }
    let source = e
        .into_io_error()
        .unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, "filesystem loop"));
    PublishError::local_io(&path, source)
}

/// Regular files directly inside `dir`, sorted by name.
///
/// Symlinks to files are followed. Entries that vanish between listing and
/// stat are skipped.
pub fn list_files(dir: &Path) -> Result<Vec<LocalFile>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| PublishError::local_io(dir, e))? {
        let entry = entry.map_err(|e| PublishError::local_io(dir, e))?;
        let path = entry.path();
        let meta = match fs::metadata(&path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "Skipping entry that disappeared or dangles");
                continue;
            }
            Err(e) => return Err(PublishError::local_io(&path, e)),
        };
        if !meta.is_file() {
            continue;
        }
        let modified = meta
            .modified()
            .map_err(|e| PublishError::local_io(&path, e))?;
        files.push(LocalFile {
            name: entry.file_name().to_string_lossy().into_owned(),
            path,
            modified: whole_seconds(modified),
        });
    }
    files.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(files)
}

/// Drop the sub-second part of a timestamp.
pub fn whole_seconds(time: SystemTime) -> SystemTime {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => UNIX_EPOCH + Duration::from_secs(d.as_secs()),
        Err(_) => time,
    }
}
