//! Full outer join of a local directory listing against its remote counterpart.
//!
//! Only remote entries of kind [`EntryKind::File`](crate::contract::EntryKind)
//! take part; remote subdirectories are reached through the directory walk,
//! not through the diff.

use std::collections::{BTreeMap, BTreeSet};

use crate::contract::{LocalFile, RemoteEntry};

/// The join result for one filename. There is no variant with neither side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinedPair {
    LocalOnly(LocalFile),
    RemoteOnly(RemoteEntry),
    Both { local: LocalFile, remote: RemoteEntry },
}

impl JoinedPair {
    pub fn name(&self) -> &str {
        match self {
            JoinedPair::LocalOnly(local) => &local.name,
            JoinedPair::RemoteOnly(remote) => &remote.name,
            JoinedPair::Both { local, .. } => &local.name,
        }
    }

    pub fn local(&self) -> Option<&LocalFile> {
        match self {
            JoinedPair::LocalOnly(local) | JoinedPair::Both { local, .. } => Some(local),
            JoinedPair::RemoteOnly(_) => None,
        }
    }

    pub fn remote(&self) -> Option<&RemoteEntry> {
        match self {
            JoinedPair::RemoteOnly(remote) | JoinedPair::Both { remote, .. } => Some(remote),
            JoinedPair::LocalOnly(_) => None,
        }
    }
}

/// Join by exact (case-sensitive) filename. Pairs come out sorted by name.
pub fn full_outer_join(local: Vec<LocalFile>, remote: Vec<RemoteEntry>) -> Vec<JoinedPair> {
    let mut locals: BTreeMap<String, LocalFile> = local
        .into_iter()
        .map(|file| (file.name.clone(), file))
        .collect();
    let mut remotes: BTreeMap<String, RemoteEntry> = remote
        .into_iter()
        .filter(RemoteEntry::is_file)
        .map(|entry| (entry.name.clone(), entry))
        .collect();

    let keys: BTreeSet<String> = locals.keys().chain(remotes.keys()).cloned().collect();

    keys.into_iter()
        .filter_map(|key| match (locals.remove(&key), remotes.remove(&key)) {
            (Some(local), Some(remote)) => Some(JoinedPair::Both { local, remote }),
            (Some(local), None) => Some(JoinedPair::LocalOnly(local)),
            (None, Some(remote)) => Some(JoinedPair::RemoteOnly(remote)),
            (None, None) => None,
        })
        .collect()
}
