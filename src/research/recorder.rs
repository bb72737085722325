//! Persistence hand-off
//!
//! The pipeline does no file or database I/O. It hands session and run
//! records to a [`RunRecorder`] supplied by the host, which decides where
//! (and whether) they are stored.

use crate::types::{CompletedRun, SessionRecord};
use parking_lot::Mutex;

/// Receives records produced by a run.
pub trait RunRecorder: Send + Sync {
    /// Called when a session opens and again after every finding is added.
    /// The record is the complete current session, not a delta.
    fn session_updated(&self, session: &SessionRecord);

    /// Called once per run after its terminal status update.
    fn run_completed(&self, run: &CompletedRun);
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRecorder;

impl RunRecorder for NoopRecorder {
    fn session_updated(&self, _session: &SessionRecord) {}

    fn run_completed(&self, _run: &CompletedRun) {}
}

/// Keeps the latest version of every session and all completed runs in memory.
#[derive(Debug, Default)]
pub struct InMemoryRecorder {
    sessions: Mutex<Vec<SessionRecord>>,
    runs: Mutex<Vec<CompletedRun>>,
}

impl InMemoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sessions(&self) -> Vec<SessionRecord> {
        self.sessions.lock().clone()
    }

    pub fn runs(&self) -> Vec<CompletedRun> {
        self.runs.lock().clone()
    }

    /// Most recently completed run, if any.
    pub fn last_run(&self) -> Option<CompletedRun> {
        self.runs.lock().last().cloned()
    }
}

impl RunRecorder for InMemoryRecorder {
    fn session_updated(&self, session: &SessionRecord) {
        let mut sessions = self.sessions.lock();
        match sessions.iter_mut().find(|s| s.id == session.id) {
            Some(existing) => *existing = session.clone(),
            None => sessions.push(session.clone()),
        }
    }

    fn run_completed(&self, run: &CompletedRun) {
        self.runs.lock().push(run.clone());
    }
}
