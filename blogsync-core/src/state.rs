//! Publish run state machine + observer.
//!
//! Flow:
//!   Idle → AwaitingCredential → Aborted (empty password)
//!                             → Connected → (Resolving → Diffing → Uploading)* → Done
//!
//! Any state may move to Failed. There is no retry transition.

use crate::contract::LocalFile;
use crate::error::{PublishError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    Idle,
    AwaitingCredential,
    Aborted,
    Connected,
    Resolving { dir: String },
    Diffing { dir: String },
    Uploading { dir: String },
    Done,
    Failed {
        state: Box<RunState>, // state at the time of failure
        message: String,
    },
}

impl RunState {
    pub fn can_transition_to(&self, next: &RunState) -> bool {
        use RunState::*;
        matches!(
            (self, next),
            (Idle, AwaitingCredential)
                | (AwaitingCredential, Aborted)
                | (AwaitingCredential, Connected)
                | (Connected, Resolving { .. })
                | (Connected, Done)
                | (Resolving { .. }, Diffing { .. })
                | (Diffing { .. }, Uploading { .. })
                | (Uploading { .. }, Resolving { .. })
                | (Uploading { .. }, Done)
                | (_, Failed { .. })
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Aborted | RunState::Done | RunState::Failed { .. })
    }
}

/// Receives progress of a publish run.
///
/// The CLI prints to the console; tests record calls.
pub trait PublishObserver: Send + Sync {
    fn on_state_changed(&self, _prev: &RunState, _next: &RunState) {}

    /// Called right before a file is streamed to the remote store.
    fn on_upload(&self, _file: &LocalFile, _remote_path: &str) {}

    /// The operator submitted an empty password.
    fn on_skipped(&self) {}
}

/// Observer that ignores everything.
pub struct SilentObserver;

impl PublishObserver for SilentObserver {}

/// Current state of one run, reporting every change to the observer.
pub(crate) struct RunTracker<'a> {
    state: RunState,
    observer: &'a dyn PublishObserver,
}

impl<'a> RunTracker<'a> {
    pub(crate) fn new(observer: &'a dyn PublishObserver) -> Self {
        Self {
            state: RunState::Idle,
            observer,
        }
    }

    /// Tracker for a run whose session was established elsewhere.
    pub(crate) fn connected(observer: &'a dyn PublishObserver) -> Self {
        Self {
            state: RunState::Connected,
            observer,
        }
    }

    pub(crate) fn state(&self) -> &RunState {
        &self.state
    }

    pub(crate) fn observer(&self) -> &'a dyn PublishObserver {
        self.observer
    }

    pub(crate) fn transition(&mut self, next: RunState) -> Result<()> {
        if !self.state.can_transition_to(&next) {
            return Err(PublishError::InvalidTransition {
                from: self.state.clone(),
                to: next,
            });
        }
        let prev = std::mem::replace(&mut self.state, next);
        tracing::debug!(prev = ?prev, next = ?self.state, "[PUBLISH] state changed");
        self.observer.on_state_changed(&prev, &self.state);
        Ok(())
    }

    pub(crate) fn fail(&mut self, error: &PublishError) {
        let current = self.state.clone();
        let prev = std::mem::replace(
            &mut self.state,
            RunState::Failed {
                state: Box::new(current),
                message: error.to_string(),
            },
        );
        self.observer.on_state_changed(&prev, &self.state);
    }
}
