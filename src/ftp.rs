//! FTP implementation of the transfer contracts.
//!
//! `suppaftp`'s `FtpStream` is synchronous, so every primitive runs on the
//! blocking pool. The session owns the stream and moves it into each blocking
//! task and back out again; the engine never issues two calls at once.
//!
//! All paths are relative to the remote root entered at connect time. The
//! session always returns to that root after probing a directory.

use std::borrow::Cow;
use std::io::Read;
use std::str::FromStr;

use async_trait::async_trait;
use blogsync_core::contract::{
    Connector, EntryKind, RemoteEntry, RemoteTarget, Secret, TransferSession,
};
use blogsync_core::error::{PublishError, Result};
use suppaftp::list::File;
use suppaftp::types::FileType;
use suppaftp::{FtpError, FtpStream};
use tokio::task;
use tracing::{debug, error, info, warn};
use zeroize::Zeroizing;

/// Replies to `MLSD` meaning the command itself is unsupported:
/// syntax error, bad arguments, not implemented.
const MLSD_UNSUPPORTED: [u32; 3] = [500, 501, 502];

/// Whether an `MLSD` reply code means the server cannot do `MLSD` at all,
/// as opposed to a transient or per-directory failure.
pub fn mlsd_unsupported(code: u32) -> bool {
    MLSD_UNSUPPORTED.contains(&code)
}

/// Opens FTP sessions for one [`RemoteTarget`].
pub struct FtpConnector {
    target: RemoteTarget,
}

impl FtpConnector {
    pub fn new(target: RemoteTarget) -> Self {
        Self { target }
    }
}

#[async_trait]
impl Connector for FtpConnector {
    async fn connect(&self, secret: &Secret) -> Result<Box<dyn TransferSession>> {
        let target = self.target.clone();
        let password = Zeroizing::new(secret.expose().to_string());
        info!(addr = %target.addr(), user = %target.user, "[FTP] connecting");

        let stream = task::spawn_blocking(move || -> Result<FtpStream> {
            let mut stream = FtpStream::connect(target.addr()).map_err(connection_error)?;
            stream
                .login(target.user.as_str(), password.as_str())
                .map_err(connection_error)?;
            stream
                .transfer_type(FileType::Binary)
                .map_err(connection_error)?;
            if !target.dir.is_empty() {
                stream.cwd(target.dir.as_str()).map_err(connection_error)?;
            }
            Ok(stream)
        })
        .await
        .map_err(|e| PublishError::Connection(format!("connect task failed: {e}")))??;

        info!(addr = %self.target.addr(), dir = %self.target.dir, "[FTP] connected");
        Ok(Box::new(FtpSession::new(stream)))
    }
}

pub struct FtpSession {
    stream: Option<FtpStream>,
    mlsd_supported: bool,
}

impl FtpSession {
    pub fn new(stream: FtpStream) -> Self {
        Self {
            stream: Some(stream),
            mlsd_supported: true,
        }
    }

    /// Runs `op` against the stream on the blocking pool.
    async fn blocking<T, F>(&mut self, op: &'static str, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut FtpStream) -> Result<T> + Send + 'static,
    {
        let mut stream = self
            .stream
            .take()
            .ok_or_else(|| PublishError::Transfer("ftp session is closed".to_string()))?;
        let (stream, result) = task::spawn_blocking(move || {
            let result = f(&mut stream);
            (stream, result)
        })
        .await
        .map_err(|e| {
            error!(op, error = ?e, "[FTP][ERROR] blocking task failed");
            PublishError::Transfer(format!("{op}: task failed: {e}"))
        })?;
        self.stream = Some(stream);
        result
    }
}

#[async_trait]
impl TransferSession for FtpSession {
    async fn directory_exists(&mut self, path: &str) -> Result<bool> {
        if path.is_empty() {
            return Ok(true);
        }
        let path = path.to_string();
        self.blocking("exists", move |stream| {
            let home = stream.pwd().map_err(|e| transfer_error("PWD", e))?;
            match stream.cwd(path.as_str()) {
                Ok(()) => {
                    stream
                        .cwd(home.as_str())
                        .map_err(|e| transfer_error("CWD", e))?;
                    Ok(true)
                }
                Err(FtpError::UnexpectedResponse(resp)) => {
                    debug!(path = %path, status = ?resp.status, "[FTP] directory not found");
                    Ok(false)
                }
                Err(e) => Err(transfer_error("CWD", e)),
            }
        })
        .await
    }

    async fn list_directory(&mut self, path: &str) -> Result<Vec<RemoteEntry>> {
        let target = (!path.is_empty()).then(|| path.to_string());

        if self.mlsd_supported {
            let mlsd_target = target.clone();
            let lines = self
                .blocking("MLSD", move |stream| {
                    Ok(stream.mlsd(mlsd_target.as_deref()))
                })
                .await?;
            match lines {
                Ok(lines) => {
                    return Ok(lines.iter().filter_map(|l| entry_from_mlsd_line(l)).collect())
                }
                Err(FtpError::UnexpectedResponse(resp))
                    if mlsd_unsupported(resp.status.code()) =>
                {
                    warn!(status = ?resp.status, "[FTP] MLSD not supported, falling back to LIST");
                    self.mlsd_supported = false;
                }
                Err(e) => return Err(transfer_error("MLSD", e)),
            }
        }

        let lines = self
            .blocking("LIST", move |stream| {
                stream
                    .list(target.as_deref())
                    .map_err(|e| transfer_error("LIST", e))
            })
            .await?;
        Ok(lines.iter().filter_map(|l| entry_from_list_line(l)).collect())
    }

    async fn create_directory(&mut self, path: &str) -> Result<()> {
        let path = path.to_string();
        debug!(path = %path, "[FTP] MKD");
        self.blocking("MKD", move |stream| {
            stream
                .mkdir(path.as_str())
                .map_err(|e| transfer_error("MKD", e))
        })
        .await
    }

    async fn put(&mut self, path: &str, mut source: Box<dyn Read + Send>) -> Result<u64> {
        let path = path.to_string();
        self.blocking("STOR", move |stream| {
            let bytes = stream
                .put_file(path.as_str(), &mut source)
                .map_err(|e| transfer_error("STOR", e))?;
            debug!(path = %path, bytes, "[FTP] stored");
            Ok(bytes)
        })
        .await
    }

    async fn close(&mut self) -> Result<()> {
        let result = self
            .blocking("QUIT", |stream| {
                stream.quit().map_err(|e| transfer_error("QUIT", e))
            })
            .await;
        self.stream = None;
        result
    }
}

/// Parses one `MLSD` line; `cdir`/`pdir` and malformed lines yield `None`.
pub fn entry_from_mlsd_line(line: &str) -> Option<RemoteEntry> {
    let line = strip_fractional_times(line);
    match File::from_mlsx_line(&line) {
        Ok(file) => remote_entry(&file),
        Err(e) if mentions_file(&line) => {
            warn!(line = %line, error = ?e, "[FTP] unparseable MLSD file entry, treating it as absent");
            None
        }
        Err(e) => {
            debug!(line = %line, error = ?e, "[FTP] skipping MLSD line");
            None
        }
    }
}

/// Drops the optional `.sss` part of `modify`/`create` facts
/// (`YYYYMMDDHHMMSS[.sss]`); the parser only takes whole seconds.
pub fn strip_fractional_times(line: &str) -> Cow<'_, str> {
    let Some((facts, name)) = line.split_once(' ') else {
        return Cow::Borrowed(line);
    };
    let mut changed = false;
    let facts: Vec<&str> = facts
        .split(';')
        .map(|fact| match fact.split_once('=') {
            Some((key, value))
                if (key.eq_ignore_ascii_case("modify") || key.eq_ignore_ascii_case("create"))
                    && value.contains('.') =>
            {
                changed = true;
                let whole = value.split('.').next().unwrap_or(value);
                &fact[..key.len() + 1 + whole.len()]
            }
            _ => fact,
        })
        .collect();
    if !changed {
        return Cow::Borrowed(line);
    }
    Cow::Owned(format!("{} {}", facts.join(";"), name))
}

fn mentions_file(line: &str) -> bool {
    line.split(';')
        .any(|fact| fact.trim().eq_ignore_ascii_case("type=file"))
}

/// Parses one `LIST` line in UNIX or DOS format.
pub fn entry_from_list_line(line: &str) -> Option<RemoteEntry> {
    match File::from_str(line) {
        Ok(file) => remote_entry(&file),
        Err(e) => {
            debug!(line, error = ?e, "[FTP] skipping LIST line");
            None
        }
    }
}

fn remote_entry(file: &File) -> Option<RemoteEntry> {
    let name = file.name();
    if name.is_empty() || name == "." || name == ".." {
        return None;
    }
    let kind = if file.is_directory() {
        EntryKind::Directory
    } else if file.is_file() {
        EntryKind::File
    } else {
        EntryKind::Other
    };
    Some(RemoteEntry {
        name: name.to_string(),
        kind,
        modified: file.modified(),
    })
}

fn connection_error(e: FtpError) -> PublishError {
    error!(error = %e, "[FTP][ERROR] connection failed");
    PublishError::Connection(e.to_string())
}

fn transfer_error(op: &str, e: FtpError) -> PublishError {
    error!(op, error = %e, "[FTP][ERROR] command failed");
    PublishError::Transfer(format!("{op}: {e}"))
}
