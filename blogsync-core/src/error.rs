//! Error type shared by every stage of a publish run.
//!
//! All variants are fatal for the run that produced them: there is no retry
//! and no skip-and-continue. An operator who submits an empty password is not
//! an error; see [`crate::publish::PublishOutcome::Skipped`].

use std::io;
use std::path::{Path, PathBuf};

use crate::state::RunState;

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// Connecting, authenticating or entering the remote root failed.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Listing, directory creation or upload failed mid-run.
    #[error("transfer failed: {0}")]
    Transfer(String),

    #[error("local I/O error on {}: {source}", path.display())]
    LocalIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("output root not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("{} is not inside the output root {}", path.display(), root.display())]
    OutsideRoot { path: PathBuf, root: PathBuf },

    #[error("credential prompt failed: {0}")]
    Prompt(#[source] io::Error),

    #[error("invalid run state transition: {from:?} -> {to:?}")]
    InvalidTransition { from: RunState, to: RunState },
}

impl PublishError {
    pub fn local_io(path: &Path, source: io::Error) -> Self {
        PublishError::LocalIo {
            path: path.to_path_buf(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, PublishError>;
