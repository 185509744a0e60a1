//! Remote side of a publish run: mapping local directories to remote paths and
//! resolving (or creating) the remote directories.

use std::collections::HashSet;
use std::path::{Component, Path};

use tracing::{debug, info};

use crate::contract::{RemoteEntry, TransferSession};
use crate::error::{PublishError, Result};

/// Remote path of `dir`: its path below `output_root`, components joined with
/// `/`. The output root itself maps to `""`.
pub fn remote_path_for(output_root: &Path, dir: &Path) -> Result<String> {
    let relative = dir
        .strip_prefix(output_root)
        .map_err(|_| PublishError::OutsideRoot {
            path: dir.to_path_buf(),
            root: output_root.to_path_buf(),
        })?;
    let parts: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    Ok(parts.join("/"))
}

/// Remote path of a file named `name` inside remote directory `dir`.
pub fn join_remote(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir, name)
    }
}

/// Remembers which remote directories are known to exist during one run, so
/// none is checked or created twice.
#[derive(Debug, Default)]
pub struct RemoteDirectories {
    known: HashSet<String>,
}

impl RemoteDirectories {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_known(&self, path: &str) -> bool {
        path.is_empty() || self.known.contains(path)
    }

    /// Entries of remote directory `path`. A missing directory (and any missing
    /// parent) is created and reported as empty.
    pub async fn resolve<S>(&mut self, session: &mut S, path: &str) -> Result<Vec<RemoteEntry>>
    where
        S: TransferSession + ?Sized,
    {
        if self.is_known(path) || session.directory_exists(path).await? {
            self.known.insert(path.to_string());
            let entries = session.list_directory(path).await?;
            debug!(path, entries = entries.len(), "[REMOTE] listed directory");
            return Ok(entries);
        }

        self.create_all(session, path).await?;
        Ok(Vec::new())
    }

    /// Create `path` and every missing ancestor, outermost first.
    async fn create_all<S>(&mut self, session: &mut S, path: &str) -> Result<()>
    where
        S: TransferSession + ?Sized,
    {
        let segments: Vec<&str> = path.split('/').collect();
        for depth in 1..=segments.len() {
            let prefix = segments[..depth].join("/");
            if self.is_known(&prefix) {
                continue;
            }
            // the target itself was already checked by resolve()
            if prefix != path && session.directory_exists(&prefix).await? {
                self.known.insert(prefix);
                continue;
            }
            info!(path = %prefix, "[REMOTE] creating directory");
            session.create_directory(&prefix).await?;
            self.known.insert(prefix);
        }
        Ok(())
    }
}
