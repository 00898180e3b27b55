//! Studio session
//!
//! The boundary the presentation layer talks to. `submit` returns a stream of
//! status updates ending in exactly one success or classified error. Only the
//! latest submission may touch the visible state; older ones go quiet once
//! superseded.

use crate::error::{ApiError, GenerationError};
use crate::guard::{RequestToken, StaleResponseGuard};
use crate::history::{export_file_name, HistoryEntry};
use crate::orchestrator::{Orchestrator, StatusObserver};
use crate::style::random_subject;
use crate::types::{ArtStyle, AspectRatio, GenerationRequest, GenerationResult, GenerationStatus};
use futures::Stream;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// One message on a submission's status stream
#[derive(Debug, Clone, PartialEq)]
pub enum StatusUpdate {
    Progress(GenerationStatus),
    Completed {
        result: GenerationResult,
        cache_hit: bool,
    },
    Failed {
        error: GenerationError,
        message: String,
    },
}

impl StatusUpdate {
    pub fn status(&self) -> GenerationStatus {
        match self {
            StatusUpdate::Progress(status) => *status,
            StatusUpdate::Completed { .. } => GenerationStatus::Success,
            StatusUpdate::Failed { .. } => GenerationStatus::Error,
        }
    }
}

/// What the presentation layer should currently show
#[derive(Debug, Clone, PartialEq)]
pub struct VisibleState {
    pub status: GenerationStatus,
    pub current: Option<GenerationResult>,
    pub cache_hit: bool,
    pub error: Option<String>,
}

impl Default for VisibleState {
    fn default() -> Self {
        Self {
            status: GenerationStatus::Idle,
            current: None,
            cache_hit: false,
            error: None,
        }
    }
}

/// Status updates for one submission
pub struct StatusStream {
    token: RequestToken,
    receiver: mpsc::UnboundedReceiver<StatusUpdate>,
}

impl StatusStream {
    pub fn token(&self) -> RequestToken {
        self.token
    }

    pub async fn next_update(&mut self) -> Option<StatusUpdate> {
        self.receiver.recv().await
    }

    /// Drain the stream and return its terminal update, if any. A superseded
    /// submission ends without one.
    pub async fn finish(mut self) -> Option<StatusUpdate> {
        let mut last = None;
        while let Some(update) = self.receiver.recv().await {
            if update.status().is_terminal() {
                last = Some(update);
            }
        }
        last
    }
}

impl Stream for StatusStream {
    type Item = StatusUpdate;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

/// Forwards pipeline stages to the visible state and the stream while the
/// submission is still the latest.
struct SubmissionObserver {
    token: RequestToken,
    guard: Arc<StaleResponseGuard>,
    visible: Arc<Mutex<VisibleState>>,
    sender: mpsc::UnboundedSender<StatusUpdate>,
}

impl SubmissionObserver {
    /// Apply `update` under the visible-state lock if still current.
    fn publish(&self, update: StatusUpdate) -> bool {
        let mut visible = self.visible.lock();
        if !self.guard.is_current(self.token) {
            return false;
        }
        match &update {
            StatusUpdate::Progress(status) => {
                visible.status = *status;
            }
            StatusUpdate::Completed { result, cache_hit } => {
                visible.status = GenerationStatus::Success;
                visible.current = Some(result.clone());
                visible.cache_hit = *cache_hit;
                visible.error = None;
            }
            StatusUpdate::Failed { message, .. } => {
                visible.status = GenerationStatus::Error;
                visible.error = Some(message.clone());
            }
        }
        let _ = self.sender.send(update);
        true
    }
}

impl StatusObserver for SubmissionObserver {
    fn on_status(&self, status: GenerationStatus) {
        self.publish(StatusUpdate::Progress(status));
    }
}

/// A user's studio session
pub struct Studio {
    orchestrator: Arc<Orchestrator>,
    visible: Arc<Mutex<VisibleState>>,
}

impl Studio {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            orchestrator,
            visible: Arc::new(Mutex::new(VisibleState::default())),
        }
    }

    pub fn orchestrator(&self) -> &Arc<Orchestrator> {
        &self.orchestrator
    }

    /// Submit a request. Must be called within a tokio runtime.
    pub fn submit(&self, request: GenerationRequest) -> StatusStream {
        let (observer, stream) = self.begin();
        self.spawn(request, observer);
        stream
    }

    /// "Surprise me": invent a subject, then submit it.
    pub fn surprise(&self, style: ArtStyle, aspect_ratio: AspectRatio) -> StatusStream {
        let (observer, stream) = self.begin();
        observer.on_status(GenerationStatus::GeneratingIdea);
        let subject = random_subject();
        debug!(subject = %subject, "Picked surprise subject");
        self.spawn(GenerationRequest::new(subject, style, aspect_ratio), observer);
        stream
    }

    fn begin(&self) -> (Arc<SubmissionObserver>, StatusStream) {
        let guard = Arc::clone(self.orchestrator.guard());
        let (sender, receiver) = mpsc::unbounded_channel();
        let token = {
            // Token issue and reset happen together so no older submission
            // can publish in between.
            let mut visible = self.visible.lock();
            let token = guard.begin_request();
            visible.status = GenerationStatus::Idle;
            visible.error = None;
            token
        };
        let observer = Arc::new(SubmissionObserver {
            token,
            guard,
            visible: Arc::clone(&self.visible),
            sender,
        });
        (observer, StatusStream { token, receiver })
    }

    fn spawn(&self, request: GenerationRequest, observer: Arc<SubmissionObserver>) {
        let orchestrator = Arc::clone(&self.orchestrator);
        tokio::spawn(async move {
            let token = observer.token;
            let status_observer: Arc<dyn StatusObserver> = observer.clone();
            let outcome = orchestrator
                .generate_guarded(request, token, Some(status_observer))
                .await;

            let update = match outcome {
                Ok(generated) => StatusUpdate::Completed {
                    result: generated.result,
                    cache_hit: generated.cache_hit,
                },
                Err(GenerationError::Superseded) => {
                    debug!(token = %token, "Submission superseded");
                    return;
                }
                Err(error) => {
                    warn!(token = %token, error = %error, "Submission failed");
                    StatusUpdate::Failed {
                        message: error.user_message(),
                        error,
                    }
                }
            };

            if !observer.publish(update) {
                debug!(token = %token, "Submission superseded before publishing");
            }
        });
    }

    /// Snapshot of what should be on screen.
    pub fn state(&self) -> VisibleState {
        self.visible.lock().clone()
    }

    pub fn history(&self) -> Vec<HistoryEntry> {
        self.orchestrator.history().entries()
    }

    /// Show a history entry without any remote call. Supersedes whatever is
    /// in progress.
    pub fn select(&self, index: usize) -> Result<GenerationResult, ApiError> {
        let entry = self
            .orchestrator
            .history()
            .get(index)
            .ok_or(ApiError::HistoryEntryNotFound(index))?;

        let mut visible = self.visible.lock();
        self.orchestrator.guard().begin_request();
        visible.status = GenerationStatus::Success;
        visible.current = Some(entry.result.clone());
        visible.cache_hit = false;
        visible.error = None;
        Ok(entry.result)
    }

    /// Submit a fresh request with a history entry's parameters. Edits come
    /// back as text requests since the reference image is not kept.
    pub fn replay(&self, index: usize) -> Result<StatusStream, ApiError> {
        let entry = self
            .orchestrator
            .history()
            .get(index)
            .ok_or(ApiError::HistoryEntryNotFound(index))?;
        debug!(index, artifact_id = %entry.artifact_id(), "Replaying history entry");
        Ok(self.submit(entry.to_request()))
    }

    pub fn clear_history(&self) {
        self.orchestrator.history().clear();
        info!("History cleared");
    }

    /// Write a history entry's image into `dir`; returns the written path.
    pub fn export(&self, index: usize, dir: &Path) -> Result<PathBuf, ApiError> {
        let entry = self
            .orchestrator
            .history()
            .get(index)
            .ok_or(ApiError::HistoryEntryNotFound(index))?;
        write_study(&entry.result, dir)
    }
}

/// Write a result's image into `dir` under its export file name.
pub fn write_study(result: &GenerationResult, dir: &Path) -> Result<PathBuf, ApiError> {
    let artifact = &result.artifact;
    std::fs::create_dir_all(dir)?;
    let path = dir.join(export_file_name(&result.subject, &artifact.mime_type));
    std::fs::write(&path, &artifact.bytes)?;
    info!(path = %path.display(), artifact_id = %artifact.id, "Exported study");
    Ok(path)
}
