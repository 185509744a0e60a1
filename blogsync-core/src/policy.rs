//! Upload decision for one joined pair. Pure; no I/O.

use crate::differ::JoinedPair;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadReason {
    /// No remote file of that name.
    New,
    /// Local copy modified strictly after the remote one.
    Stale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Exists only remotely. Never deleted.
    RemoteOnly,
    /// Remote copy is as new as or newer than the local one.
    UpToDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadDecision {
    Upload(UploadReason),
    Skip(SkipReason),
}

impl UploadDecision {
    pub fn should_upload(&self) -> bool {
        matches!(self, UploadDecision::Upload(_))
    }
}

pub fn decide(pair: &JoinedPair) -> UploadDecision {
    match pair {
        JoinedPair::LocalOnly(_) => UploadDecision::Upload(UploadReason::New),
        JoinedPair::RemoteOnly(_) => UploadDecision::Skip(SkipReason::RemoteOnly),
        JoinedPair::Both { local, remote } if local.modified > remote.modified => {
            UploadDecision::Upload(UploadReason::Stale)
        }
        JoinedPair::Both { .. } => UploadDecision::Skip(SkipReason::UpToDate),
    }
}
