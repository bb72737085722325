//! Run status via message passing
//!
//! The run driver never mutates shared status. It sends [`RunEvent`]s into
//! an unbounded channel; a single board task folds them into a [`RunStatus`]
//! and publishes each new snapshot on a `watch` channel, which is what
//! status readers observe through [`StatusHandle`].

use crate::types::{Phase, PhaseResult, RunStatus, Vote};
use tokio::sync::{mpsc, watch};
use uuid::Uuid;

/// One status change emitted by a run.
#[derive(Debug, Clone)]
pub enum RunEvent {
    /// Resets status for a new run; later events for other run ids are dropped.
    Started { run_id: Uuid },
    /// Enter a phase with a display label and progress value.
    Phase {
        run_id: Uuid,
        phase: Phase,
        label: String,
        progress: u8,
    },
    Progress { run_id: Uuid, progress: u8 },
    Sources { run_id: Uuid, sources: Vec<String> },
    Result { run_id: Uuid, result: PhaseResult },
    Votes { run_id: Uuid, votes: Vec<Vote> },
    /// Terminal state: not running, progress 100. Idempotent.
    Finished { run_id: Uuid },
}

impl RunEvent {
    fn run_id(&self) -> Uuid {
        match self {
            RunEvent::Started { run_id }
            | RunEvent::Phase { run_id, .. }
            | RunEvent::Progress { run_id, .. }
            | RunEvent::Sources { run_id, .. }
            | RunEvent::Result { run_id, .. }
            | RunEvent::Votes { run_id, .. }
            | RunEvent::Finished { run_id } => *run_id,
        }
    }
}

impl RunStatus {
    /// Fold one event into the snapshot.
    pub fn apply(&mut self, event: RunEvent) {
        if let RunEvent::Started { run_id } = event {
            *self = RunStatus {
                run_id: Some(run_id),
                is_running: true,
                progress: 0,
                phase: Phase::Idle,
                current_phase: "Starting...".to_string(),
                ..RunStatus::default()
            };
            return;
        }

        if self.run_id != Some(event.run_id()) {
            tracing::debug!(run_id = %event.run_id(), "Ignoring event for superseded run");
            return;
        }

        match event {
            RunEvent::Started { .. } => {}
            RunEvent::Phase {
                phase,
                label,
                progress,
                ..
            } => {
                self.phase = self.phase.max(phase);
                self.current_phase = label;
                self.raise_progress(progress);
            }
            RunEvent::Progress { progress, .. } => self.raise_progress(progress),
            RunEvent::Sources { sources, .. } => self.sources = sources,
            RunEvent::Result { result, .. } => self.results.push(result),
            RunEvent::Votes { votes, .. } => self.votes = votes,
            RunEvent::Finished { .. } => {
                self.is_running = false;
                self.progress = 100;
                self.phase = Phase::Done;
                self.current_phase = "Complete".to_string();
            }
        }
    }

    fn raise_progress(&mut self, progress: u8) {
        self.progress = self.progress.max(progress.min(100));
    }
}

/// Sending half handed to a run driver.
#[derive(Debug, Clone)]
pub struct ProgressSink {
    tx: mpsc::UnboundedSender<RunEvent>,
}

impl ProgressSink {
    /// Send an event. A closed board (host shutting down) is not an error
    /// for the run.
    pub fn send(&self, event: RunEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!("Status board closed, dropping event");
        }
    }

    /// A guard that marks `run_id` finished when dropped, including when the
    /// run task unwinds.
    pub fn finish_guard(&self, run_id: Uuid) -> FinishGuard {
        FinishGuard {
            sink: self.clone(),
            run_id,
        }
    }
}

/// Sends [`RunEvent::Finished`] on drop.
pub struct FinishGuard {
    sink: ProgressSink,
    run_id: Uuid,
}

impl Drop for FinishGuard {
    fn drop(&mut self) {
        self.sink.send(RunEvent::Finished {
            run_id: self.run_id,
        });
    }
}

/// Read-only access to the latest status snapshot.
#[derive(Debug, Clone)]
pub struct StatusHandle {
    rx: watch::Receiver<RunStatus>,
}

impl StatusHandle {
    /// Current snapshot.
    pub fn snapshot(&self) -> RunStatus {
        self.rx.borrow().clone()
    }

    /// A receiver for hosts that want change notifications.
    pub fn subscribe(&self) -> watch::Receiver<RunStatus> {
        self.rx.clone()
    }

    /// Wait until `run_id` has reached its terminal state.
    pub async fn wait_finished(&self, run_id: Uuid) -> RunStatus {
        let mut rx = self.rx.clone();
        let status = match rx
            .wait_for(|status| status.run_id == Some(run_id) && !status.is_running)
            .await
        {
            Ok(status) => status.clone(),
            Err(_) => self.snapshot(),
        };
        status
    }
}

/// Spawn the board task. Must be called inside a tokio runtime.
pub fn spawn_status_board() -> (ProgressSink, StatusHandle) {
    let (tx, mut rx) = mpsc::unbounded_channel::<RunEvent>();
    let (status_tx, status_rx) = watch::channel(RunStatus::default());

    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            status_tx.send_modify(|status| status.apply(event));
        }
    });

    (ProgressSink { tx }, StatusHandle { rx: status_rx })
}
