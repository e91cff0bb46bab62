use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use crate::export::options::ExportArtifact;
use crate::foundation::config::ConcurrentExport;
use crate::foundation::error::{CardError, CardResult};

/// Lifecycle of one export job.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportStatus {
    #[default]
    Idle,
    Capturing,
    Encoding,
    Done,
    Error,
    Cancelled,
}

impl ExportStatus {
    /// `Done`, `Error` and `Cancelled` are final.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Error | Self::Cancelled)
    }

    /// `Capturing` or `Encoding`.
    pub fn is_running(self) -> bool {
        matches!(self, Self::Capturing | Self::Encoding)
    }
}

/// Progress snapshot delivered to callers.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportProgress {
    pub status: ExportStatus,
    /// In `[0, 1]`.
    pub progress: f64,
    pub frames_captured: usize,
}

/// Observable state of the newest export job.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportJob {
    /// Generation of the job; increases with every accepted request.
    pub generation: u64,
    pub status: ExportStatus,
    pub progress: f64,
    pub frames_captured: usize,
    pub result: Option<ExportArtifact>,
    pub error: Option<String>,
}

/// Cancellation token of a single job.
#[derive(Clone, Debug, Default)]
pub struct JobToken {
    cancelled: Arc<AtomicBool>,
    generation: u64,
}

impl JobToken {
    /// Standalone token, not tied to a slot.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// `Err(CardError::Cancelled)` once cancelled.
    pub fn check(&self) -> CardResult<()> {
        if self.is_cancelled() {
            Err(CardError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[derive(Debug, Default)]
struct SlotState {
    policy: ConcurrentExport,
    generation: u64,
    active: Option<JobToken>,
    job: ExportJob,
    last_artifact: Option<ExportArtifact>,
}

/// The single result slot export jobs publish into.
///
/// Only the job holding the newest generation can write; a superseded job's updates and
/// result are dropped. Cloning shares the slot.
#[derive(Clone, Debug, Default)]
pub struct ExportSlot {
    inner: Arc<Mutex<SlotState>>,
}

impl ExportSlot {
    pub fn new(policy: ConcurrentExport) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SlotState {
                policy,
                ..SlotState::default()
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SlotState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a job. Under `Reject` a running job makes this fail; under `Supersede` the
    /// running job is cancelled.
    pub fn begin(&self) -> CardResult<JobToken> {
        let mut s = self.lock();
        if let Some(active) = s.active.take() {
            match s.policy {
                ConcurrentExport::Reject => {
                    s.active = Some(active);
                    return Err(CardError::export("an export is already in flight"));
                }
                ConcurrentExport::Supersede => {
                    tracing::info!(generation = active.generation, "superseding running export");
                    active.cancel();
                }
            }
        }
        s.generation += 1;
        let token = JobToken {
            cancelled: Arc::new(AtomicBool::new(false)),
            generation: s.generation,
        };
        s.active = Some(token.clone());
        s.job = ExportJob {
            generation: s.generation,
            status: ExportStatus::Capturing,
            ..ExportJob::default()
        };
        Ok(token)
    }

    /// Like [`begin`](Self::begin), but the returned guard releases the slot as cancelled if
    /// it is dropped before [`ActiveJob::finish`], e.g. when the export future is dropped.
    pub fn start(&self) -> CardResult<ActiveJob<'_>> {
        let token = self.begin()?;
        Ok(ActiveJob {
            slot: self,
            token,
            finished: false,
        })
    }

    /// Record progress; ignored for stale tokens.
    pub fn report(&self, token: &JobToken, p: ExportProgress) {
        let mut s = self.lock();
        if s.active.is_none() || s.generation != token.generation || s.job.status.is_terminal() {
            return;
        }
        s.job.status = p.status;
        s.job.progress = p.progress.clamp(0.0, 1.0);
        s.job.frames_captured = p.frames_captured;
    }

    /// Publish the outcome of the job owning `token`.
    ///
    /// A stale job gets `Err(Cancelled)` and leaves the slot untouched. Failures keep the
    /// previous successful artifact.
    pub fn finish(
        &self,
        token: &JobToken,
        outcome: CardResult<ExportArtifact>,
    ) -> CardResult<ExportArtifact> {
        let mut s = self.lock();
        if s.generation != token.generation {
            tracing::debug!(
                generation = token.generation,
                current = s.generation,
                "dropping result of superseded export"
            );
            return Err(CardError::Cancelled);
        }
        s.active = None;
        match outcome {
            Ok(artifact) => {
                s.job.status = ExportStatus::Done;
                s.job.progress = 1.0;
                s.job.result = Some(artifact.clone());
                s.job.error = None;
                s.last_artifact = Some(artifact.clone());
                Ok(artifact)
            }
            Err(e) => {
                s.job.status = if e.is_cancelled() {
                    ExportStatus::Cancelled
                } else {
                    ExportStatus::Error
                };
                s.job.result = None;
                s.job.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Current job state.
    pub fn job(&self) -> ExportJob {
        self.lock().job.clone()
    }

    /// Most recent successful artifact across jobs.
    pub fn last_artifact(&self) -> Option<ExportArtifact> {
        self.lock().last_artifact.clone()
    }

    /// Cancel the running job, if any.
    pub fn cancel_active(&self) {
        if let Some(active) = &self.lock().active {
            active.cancel();
        }
    }

    /// `true` while a job holds the slot.
    pub fn is_busy(&self) -> bool {
        self.lock().active.is_some()
    }
}

/// A running job that owns its place in an [`ExportSlot`] until finished or dropped.
#[derive(Debug)]
pub struct ActiveJob<'a> {
    slot: &'a ExportSlot,
    token: JobToken,
    finished: bool,
}

impl ActiveJob<'_> {
    pub fn token(&self) -> &JobToken {
        &self.token
    }

    /// Publish the outcome; see [`ExportSlot::finish`].
    pub fn finish(mut self, outcome: CardResult<ExportArtifact>) -> CardResult<ExportArtifact> {
        self.finished = true;
        self.slot.finish(&self.token, outcome)
    }
}

impl Drop for ActiveJob<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        tracing::info!(generation = self.token.generation, "export dropped before finishing");
        self.token.cancel();
        let _ = self.slot.finish(&self.token, Err(CardError::Cancelled));
    }
}

#[cfg(test)]
#[path = "../../tests/unit/export/job.rs"]
mod tests;
