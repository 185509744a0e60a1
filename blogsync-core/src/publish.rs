//! High-level pipeline: orchestrates prompt → connect → walk → resolve → diff → upload.
//!
//! This module provides the top-level orchestration of one publish run over a
//! rendered output tree:
//!   - Asks the operator for the remote password ([`CredentialPrompt`]); an
//!     empty password ends the run early as [`PublishOutcome::Skipped`]
//!   - Connects once ([`Connector`]) and reuses the session for every directory
//!   - Walks the output tree in pre-order ([`DirectoryWalker`])
//!   - For every directory that holds files: resolves or creates the remote
//!     directory, joins local and remote listings, and uploads what the
//!     [`policy`](crate::policy) says is new or stale
//!
//! # Responsibilities
//! - Fail-fast: the first error ends the run. Files uploaded before it stay uploaded.
//! - Strictly sequential: one directory, one file, one remote call at a time.
//! - Never deletes anything remotely.
//!
//! # Navigation
//! - Main entrypoint: [`publish`]
//! - With an already established session: [`publish_tree`]
//! - Supporting types: [`PublishConfig`], [`PublishOutcome`], [`PublishReport`]

use std::fs::File;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use crate::contract::{Connector, CredentialPrompt, LocalFile, RemoteTarget, TransferSession};
use crate::differ::full_outer_join;
use crate::error::{PublishError, Result};
use crate::policy::{decide, SkipReason, UploadDecision, UploadReason};
use crate::remote::{join_remote, remote_path_for, RemoteDirectories};
use crate::state::{PublishObserver, RunState, RunTracker};
use crate::walker::{list_files, DirectoryWalker, Walk};

/// Everything a run needs to know up front.
#[derive(Debug, Clone)]
pub struct PublishConfig {
    /// Local output tree; its contents map onto the remote working root.
    pub output_root: PathBuf,
    pub target: RemoteTarget,
}

#[derive(Debug)]
pub enum PublishOutcome {
    /// The operator submitted an empty password.
    Skipped,
    Published(PublishReport),
}

#[derive(Debug, Default)]
pub struct PublishReport {
    /// Directories that held files and were synchronized.
    pub directories_synced: usize,
    /// Directories without files; nothing was sent to the server for them.
    pub directories_skipped: usize,
    pub uploads: Vec<UploadedFile>,
    /// Files present on both sides where the remote copy is not older.
    pub unchanged: usize,
    /// Files that exist only remotely. Left alone.
    pub remote_only: usize,
}

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub local_path: PathBuf,
    pub remote_path: String,
    pub bytes: u64,
    pub reason: UploadReason,
}

/// Run one full publish.
pub async fn publish<P, C>(
    config: &PublishConfig,
    prompt: &mut P,
    connector: &C,
    observer: &dyn PublishObserver,
) -> Result<PublishOutcome>
where
    P: CredentialPrompt + ?Sized,
    C: Connector + ?Sized,
{
    let mut run = RunTracker::new(observer);
    info!(
        output_root = %config.output_root.display(),
        host = %config.target.host,
        user = %config.target.user,
        "[PUBLISH] Starting publish run"
    );

    run.transition(RunState::AwaitingCredential)?;
    let secret = match prompt.read_secret(&config.target) {
        Ok(secret) => secret,
        Err(e) => {
            error!(error = %e, "[PUBLISH][ERROR] Could not read password");
            run.fail(&e);
            return Err(e);
        }
    };

    if secret.is_empty() {
        info!("[PUBLISH] Empty password, skipping publishing");
        run.transition(RunState::Aborted)?;
        observer.on_skipped();
        return Ok(PublishOutcome::Skipped);
    }

    // Checked before connecting; children are read lazily once connected.
    let walk = match DirectoryWalker::new(&config.output_root).walk() {
        Ok(walk) => walk,
        Err(e) => {
            error!(error = %e, "[PUBLISH][ERROR] Output tree is not walkable");
            run.fail(&e);
            return Err(e);
        }
    };

    let connected = connector.connect(&secret).await;
    drop(secret);
    let mut session = match connected {
        Ok(session) => session,
        Err(e) => {
            error!(error = %e, addr = %config.target.addr(), "[PUBLISH][ERROR] Connection failed");
            run.fail(&e);
            return Err(e);
        }
    };
    run.transition(RunState::Connected)?;

    match sync_directories(&config.output_root, walk, session.as_mut(), &mut run).await {
        Ok(report) => {
            run.transition(RunState::Done)?;
            if let Err(e) = session.close().await {
                warn!(error = %e, "[PUBLISH] Failed to close session cleanly");
            }
            info!(
                uploads = report.uploads.len(),
                unchanged = report.unchanged,
                "[PUBLISH] Publish run complete"
            );
            Ok(PublishOutcome::Published(report))
        }
        Err(e) => {
            error!(error = %e, state = ?run.state(), "[PUBLISH][ERROR] Publish run failed");
            run.fail(&e);
            Err(e)
        }
    }
}

/// Synchronize `output_root` through a session that is already connected.
pub async fn publish_tree<S>(
    output_root: &Path,
    session: &mut S,
    observer: &dyn PublishObserver,
) -> Result<PublishReport>
where
    S: TransferSession + ?Sized,
{
    let mut run = RunTracker::connected(observer);
    let result = match DirectoryWalker::new(output_root).walk() {
        Ok(walk) => sync_directories(output_root, walk, session, &mut run).await,
        Err(e) => Err(e),
    };
    match result {
        Ok(report) => {
            run.transition(RunState::Done)?;
            Ok(report)
        }
        Err(e) => {
            run.fail(&e);
            Err(e)
        }
    }
}

async fn sync_directories<S>(
    output_root: &Path,
    walk: Walk,
    session: &mut S,
    run: &mut RunTracker<'_>,
) -> Result<PublishReport>
where
    S: TransferSession + ?Sized,
{
    let mut report = PublishReport::default();
    let mut directories = RemoteDirectories::new();

    for dir in walk {
        let dir = dir?;
        let files = list_files(&dir)?;
        if files.is_empty() {
            debug!(dir = %dir.display(), "[PUBLISH] No files, skipping directory");
            report.directories_skipped += 1;
            continue;
        }

        let remote_dir = remote_path_for(output_root, &dir)?;
        run.transition(RunState::Resolving {
            dir: remote_dir.clone(),
        })?;
        let remote = directories.resolve(session, &remote_dir).await?;

        run.transition(RunState::Diffing {
            dir: remote_dir.clone(),
        })?;
        let pairs = full_outer_join(files, remote);

        run.transition(RunState::Uploading {
            dir: remote_dir.clone(),
        })?;
        for pair in &pairs {
            match (decide(pair), pair.local()) {
                (UploadDecision::Upload(reason), Some(local)) => {
                    let remote_path = join_remote(&remote_dir, &local.name);
                    let bytes =
                        upload_file(session, local, &remote_path, run.observer()).await?;
                    report.uploads.push(UploadedFile {
                        local_path: local.path.clone(),
                        remote_path,
                        bytes,
                        reason,
                    });
                }
                (UploadDecision::Skip(SkipReason::RemoteOnly), _) => report.remote_only += 1,
                _ => report.unchanged += 1,
            }
        }
        report.directories_synced += 1;
    }

    Ok(report)
}

async fn upload_file<S>(
    session: &mut S,
    local: &LocalFile,
    remote_path: &str,
    observer: &dyn PublishObserver,
) -> Result<u64>
where
    S: TransferSession + ?Sized,
{
    observer.on_upload(local, remote_path);
    info!(local = %local.path.display(), remote = remote_path, "[PUBLISH][UPLOAD] Uploading file");

    let file = File::open(&local.path).map_err(|e| PublishError::local_io(&local.path, e))?;
    let bytes = session.put(remote_path, Box::new(file)).await?;

    debug!(remote = remote_path, bytes, "[PUBLISH][UPLOAD] Upload finished");
    Ok(bytes)
}
