#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::Read;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use blogsync_core::contract::{
    Connector, CredentialPrompt, EntryKind, LocalFile, RemoteEntry, RemoteTarget, Secret,
    TransferSession,
};
use blogsync_core::error::{PublishError, Result};
use blogsync_core::state::{PublishObserver, RunState};

pub fn at(secs: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(secs)
}

pub fn target() -> RemoteTarget {
    RemoteTarget {
        host: "ftp.example.com".to_string(),
        port: 21,
        user: "writer".to_string(),
        dir: "www".to_string(),
    }
}

/// Write `content` to `root/rel` and set its modification time.
pub fn write_file(root: &Path, rel: &str, content: &str, modified: SystemTime) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    filetime::set_file_mtime(&path, filetime::FileTime::from_system_time(modified)).unwrap();
}

#[derive(Debug)]
pub struct StoreState {
    pub dirs: BTreeSet<String>,
    pub files: BTreeMap<String, (Vec<u8>, SystemTime)>,
    pub calls: Vec<String>,
    /// Timestamp given to every uploaded file.
    pub clock: SystemTime,
    /// Fail any put to this path.
    pub fail_put: Option<String>,
}

/// An in-memory remote store. Clones share state.
#[derive(Clone)]
pub struct MemoryStore {
    pub state: Arc<Mutex<StoreState>>,
}

impl MemoryStore {
    pub fn new(clock: SystemTime) -> Self {
        let mut state = StoreState {
            dirs: BTreeSet::new(),
            files: BTreeMap::new(),
            calls: Vec::new(),
            clock,
            fail_put: None,
        };
        state.dirs.insert(String::new());
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn add_dir(&self, path: &str) {
        self.state.lock().unwrap().dirs.insert(path.to_string());
    }

    pub fn add_file(&self, path: &str, content: &str, modified: SystemTime) {
        self.state
            .lock()
            .unwrap()
            .files
            .insert(path.to_string(), (content.as_bytes().to_vec(), modified));
    }

    pub fn content(&self, path: &str) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .files
            .get(path)
            .map(|(bytes, _)| String::from_utf8_lossy(bytes).into_owned())
    }

    pub fn has_dir(&self, path: &str) -> bool {
        self.state.lock().unwrap().dirs.contains(path)
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn puts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| c.strip_prefix("put ").map(str::to_string))
            .collect()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    pub fn set_clock(&self, clock: SystemTime) {
        self.state.lock().unwrap().clock = clock;
    }

    pub fn session(&self) -> MemorySession {
        MemorySession {
            store: self.clone(),
        }
    }
}

fn parent_and_name(path: &str) -> (&str, &str) {
    match path.rsplit_once('/') {
        Some((parent, name)) => (parent, name),
        None => ("", path),
    }
}

pub struct MemorySession {
    store: MemoryStore,
}

#[async_trait]
impl TransferSession for MemorySession {
    async fn directory_exists(&mut self, path: &str) -> Result<bool> {
        let mut state = self.store.state.lock().unwrap();
        state.calls.push(format!("exists {}", path));
        Ok(state.dirs.contains(path))
    }

    async fn list_directory(&mut self, path: &str) -> Result<Vec<RemoteEntry>> {
        let mut state = self.store.state.lock().unwrap();
        state.calls.push(format!("list {}", path));
        if !state.dirs.contains(path) {
            return Err(PublishError::Transfer(format!("550 {}: no such directory", path)));
        }
        let mut entries = Vec::new();
        for dir in state.dirs.iter().filter(|d| !d.is_empty()) {
            let (parent, name) = parent_and_name(dir);
            if parent == path {
                entries.push(RemoteEntry {
                    name: name.to_string(),
                    kind: EntryKind::Directory,
                    modified: state.clock,
                });
            }
        }
        for (file, (_, modified)) in state.files.iter() {
            let (parent, name) = parent_and_name(file);
            if parent == path {
                entries.push(RemoteEntry {
                    name: name.to_string(),
                    kind: EntryKind::File,
                    modified: *modified,
                });
            }
        }
        Ok(entries)
    }

    async fn create_directory(&mut self, path: &str) -> Result<()> {
        let mut state = self.store.state.lock().unwrap();
        state.calls.push(format!("mkdir {}", path));
        let (parent, _) = parent_and_name(path);
        if !state.dirs.contains(parent) {
            return Err(PublishError::Transfer(format!("550 {}: parent missing", path)));
        }
        if !state.dirs.insert(path.to_string()) {
            return Err(PublishError::Transfer(format!("550 {}: already exists", path)));
        }
        Ok(())
    }

    async fn put(&mut self, path: &str, mut source: Box<dyn Read + Send>) -> Result<u64> {
        let mut bytes = Vec::new();
        source
            .read_to_end(&mut bytes)
            .map_err(|e| PublishError::Transfer(e.to_string()))?;
        let mut state = self.store.state.lock().unwrap();
        state.calls.push(format!("put {}", path));
        if state.fail_put.as_deref() == Some(path) {
            return Err(PublishError::Transfer(format!("451 {}: write failed", path)));
        }
        let (parent, _) = parent_and_name(path);
        if !state.dirs.contains(parent) {
            return Err(PublishError::Transfer(format!("553 {}: no such directory", path)));
        }
        let len = bytes.len() as u64;
        let clock = state.clock;
        state.files.insert(path.to_string(), (bytes, clock));
        Ok(len)
    }

    async fn close(&mut self) -> Result<()> {
        self.store.state.lock().unwrap().calls.push("close".to_string());
        Ok(())
    }
}

pub struct MemoryConnector {
    pub store: MemoryStore,
    pub password: String,
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self, secret: &Secret) -> Result<Box<dyn TransferSession>> {
        if secret.expose() != self.password {
            return Err(PublishError::Connection("530 Login incorrect".to_string()));
        }
        Ok(Box::new(self.store.session()))
    }
}

pub struct FixedPrompt(pub &'static str);

impl CredentialPrompt for FixedPrompt {
    fn read_secret(&mut self, _target: &RemoteTarget) -> Result<Secret> {
        Ok(Secret::new(self.0.to_string()))
    }
}

#[derive(Default)]
pub struct RecordingObserver {
    pub states: Mutex<Vec<RunState>>,
    pub uploads: Mutex<Vec<String>>,
    pub skipped: Mutex<bool>,
}

impl RecordingObserver {
    pub fn states(&self) -> Vec<RunState> {
        self.states.lock().unwrap().clone()
    }

    pub fn uploads(&self) -> Vec<String> {
        self.uploads.lock().unwrap().clone()
    }
}

impl PublishObserver for RecordingObserver {
    fn on_state_changed(&self, _prev: &RunState, next: &RunState) {
        self.states.lock().unwrap().push(next.clone());
    }

    fn on_upload(&self, _file: &LocalFile, remote_path: &str) {
        self.uploads.lock().unwrap().push(remote_path.to_string());
    }

    fn on_skipped(&self) {
        *self.skipped.lock().unwrap() = true;
    }
}
