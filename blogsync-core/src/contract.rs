//! # contract: the seams between the publish engine and the outside world
//!
//! The engine in [`crate::publish`] never talks to a socket or a terminal
//! directly. It goes through three traits:
//!
//! - [`CredentialPrompt`]: asks the operator for the remote password.
//! - [`Connector`]: turns that password into an authenticated [`TransferSession`].
//! - [`TransferSession`]: the primitive remote operations (exists, list, mkdir, upload).
//!
//! The `blogsync` binary implements them over a terminal and FTP. Tests use the
//! `mockall` mocks generated here (behind the `test-export-mocks` feature) or a
//! hand-written in-memory store.
//!
//! Remote paths are `/`-separated and relative to the session's working root;
//! the root itself is the empty string.

use std::fmt;
use std::io::Read;
use std::path::PathBuf;
use std::time::SystemTime;

use async_trait::async_trait;
use mockall::automock;
use zeroize::Zeroizing;

use crate::error::Result;

/// Password typed by the operator. Zeroed on drop and never printed.
pub struct Secret(Zeroizing<String>);

impl Secret {
    pub fn new(value: String) -> Self {
        Secret(Zeroizing::new(value))
    }

    pub fn expose(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.chars().count()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Where a run publishes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTarget {
    pub host: String,
    pub port: u16,
    pub user: String,
    /// Remote working root; empty means the login directory.
    pub dir: String,
}

impl RemoteTarget {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// A regular file inside the local output tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    pub name: String,
    pub path: PathBuf,
    /// Truncated to whole seconds, the resolution remote listings report.
    pub modified: SystemTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    /// Symlinks and anything else the server reports.
    Other,
}

/// One entry of a remote directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    pub name: String,
    pub kind: EntryKind,
    pub modified: SystemTime,
}

impl RemoteEntry {
    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }
}

/// One authenticated connection to the remote store.
///
/// The session is stateful (one working directory, one control channel), so
/// every method takes `&mut self` and the engine calls them strictly in sequence.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait TransferSession: Send {
    /// Whether `path` exists as a directory on the remote store.
    async fn directory_exists(&mut self, path: &str) -> Result<bool>;

    /// All entries directly inside `path`.
    async fn list_directory(&mut self, path: &str) -> Result<Vec<RemoteEntry>>;

    /// Create a single directory. Parents must already exist.
    async fn create_directory(&mut self, path: &str) -> Result<()>;

    /// Stream `source` into a newly opened remote file at `path`, replacing any
    /// existing file. Returns the number of bytes written.
    async fn put(&mut self, path: &str, source: Box<dyn Read + Send>) -> Result<u64>;

    /// Say goodbye to the server.
    async fn close(&mut self) -> Result<()>;
}

/// Establishes a [`TransferSession`] for a given secret.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, secret: &Secret) -> Result<Box<dyn TransferSession>>;
}

/// Acquires the remote password from an operator.
///
/// Returning an empty secret means "skip publishing".
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait CredentialPrompt {
    fn read_secret(&mut self, target: &RemoteTarget) -> Result<Secret>;
}
