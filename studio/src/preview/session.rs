//! Preview session lifecycle.
//!
//! One session owns one execution context, one deadline, and one message
//! subscription, and ends in exactly one terminal status. The engine keeps
//! at most one session in flight: opening a new source version or retrying
//! tears the previous driver down first. Superseded sessions are destroyed,
//! not transitioned, so their handles resolve to `None` instead of a
//! report.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::files::GeneratedFile;
use crate::preview::backend::SandboxBackend;
use crate::preview::document;
use crate::preview::protocol::{BoundaryMessage, PreviewFailure, PreviewFailureKind};
use crate::telemetry::{EventLevel, SharedTimeline};

/// Session budget configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewConfig {
    /// How long a context may stay silent before the session errors out,
    /// in milliseconds.
    pub timeout_ms: u64,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self { timeout_ms: 15_000 }
    }
}

/// Where a session currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Loading,
    Success,
    Error,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionStatus::Loading => write!(f, "loading"),
            SessionStatus::Success => write!(f, "success"),
            SessionStatus::Error => write!(f, "error"),
        }
    }
}

/// One preview attempt over a specific source version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewSession {
    pub session_id: String,
    pub version: u64,
    pub status: SessionStatus,
    pub source_files: Vec<GeneratedFile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<PreviewFailure>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_time_ms: Option<u64>,
    pub retry_count: u32,
    pub started_at: DateTime<Utc>,
}

impl PreviewSession {
    fn new(version: u64, source_files: Vec<GeneratedFile>, retry_count: u32) -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            version,
            status: SessionStatus::Loading,
            source_files,
            error: None,
            load_time_ms: None,
            retry_count,
            started_at: Utc::now(),
        }
    }

    /// First 8 characters of the session id, for logs.
    pub fn short_id(&self) -> &str {
        &self.session_id[..8.min(self.session_id.len())]
    }

    pub fn is_terminal(&self) -> bool {
        self.status != SessionStatus::Loading
    }

    // Terminal transitions are set-once: the first wins and later calls
    // are ignored.
    fn succeed(&mut self, load_time_ms: u64) {
        if self.is_terminal() {
            return;
        }
        self.status = SessionStatus::Success;
        self.load_time_ms = Some(load_time_ms);
    }

    fn fail(&mut self, failure: PreviewFailure) {
        if self.is_terminal() {
            return;
        }
        self.status = SessionStatus::Error;
        self.error = Some(failure);
    }
}

/// Host-side handle to a session in flight.
pub struct PreviewHandle {
    pub session_id: String,
    pub version: u64,
    outcome: mpsc::UnboundedReceiver<PreviewSession>,
}

impl PreviewHandle {
    /// Wait for the terminal session state. `None` means the session was
    /// superseded before it could report.
    pub async fn completed(mut self) -> Option<PreviewSession> {
        self.outcome.recv().await
    }
}

struct ActiveSession {
    session_id: String,
    driver: JoinHandle<()>,
    files: Vec<GeneratedFile>,
    retry_count: u32,
}

#[derive(Default)]
struct EngineState {
    version: u64,
    current: Option<ActiveSession>,
}

/// Opens and supersedes preview sessions over a sandbox backend.
pub struct PreviewEngine {
    backend: Arc<dyn SandboxBackend>,
    config: PreviewConfig,
    timeline: SharedTimeline,
    state: tokio::sync::Mutex<EngineState>,
}

impl PreviewEngine {
    pub fn new(
        backend: Arc<dyn SandboxBackend>,
        config: PreviewConfig,
        timeline: SharedTimeline,
    ) -> Self {
        Self {
            backend,
            config,
            timeline,
            state: tokio::sync::Mutex::new(EngineState::default()),
        }
    }

    /// Open a session for a new source version, superseding any session
    /// still in flight.
    pub async fn open(&self, files: Vec<GeneratedFile>) -> PreviewHandle {
        self.open_with(files, 0).await
    }

    /// Re-run the current source with the retry counter bumped. `None`
    /// when nothing has been opened yet.
    pub async fn retry(&self) -> Option<PreviewHandle> {
        let (files, retry_count) = {
            let state = self.state.lock().await;
            let current = state.current.as_ref()?;
            (current.files.clone(), current.retry_count + 1)
        };
        Some(self.open_with(files, retry_count).await)
    }

    /// Tear down the in-flight session without starting a new one.
    pub async fn shutdown(&self) {
        let mut state = self.state.lock().await;
        if let Some(previous) = state.current.take() {
            previous.driver.abort();
            debug!(session = %previous.session_id, "Preview session torn down");
        }
    }

    /// Version assigned to the most recently opened session.
    pub async fn current_version(&self) -> u64 {
        self.state.lock().await.version
    }

    async fn open_with(&self, files: Vec<GeneratedFile>, retry_count: u32) -> PreviewHandle {
        let mut state = self.state.lock().await;
        state.version += 1;
        let version = state.version;

        if let Some(previous) = state.current.take() {
            previous.driver.abort();
            debug!(
                session = %previous.session_id,
                superseded_by = version,
                "Preview session superseded"
            );
        }

        let session = PreviewSession::new(version, files.clone(), retry_count);
        let session_id = session.session_id.clone();
        let (tx, rx) = mpsc::unbounded_channel();

        let driver = tokio::spawn(drive(
            Arc::clone(&self.backend),
            self.config.clone(),
            Arc::clone(&self.timeline),
            session,
            tx,
        ));

        state.current = Some(ActiveSession {
            session_id: session_id.clone(),
            driver,
            files,
            retry_count,
        });

        PreviewHandle {
            session_id,
            version,
            outcome: rx,
        }
    }
}

/// Run one session start to finish: launch a fresh context, consume its
/// envelopes until a terminal message, context exit, or the deadline, and
/// report the terminal state.
async fn drive(
    backend: Arc<dyn SandboxBackend>,
    config: PreviewConfig,
    timeline: SharedTimeline,
    mut session: PreviewSession,
    outcome: mpsc::UnboundedSender<PreviewSession>,
) {
    let context_id = Uuid::new_v4().to_string();
    debug!(
        session = %session.session_id,
        context = %context_id,
        version = session.version,
        retry_count = session.retry_count,
        backend = backend.name(),
        "Opening preview session"
    );
    timeline.lock().await.info(format!(
        "Preview session {} loading ({} file(s))",
        session.short_id(),
        session.source_files.len()
    ));

    let document = document::build_document(&session.source_files, &context_id);
    let mut context = match backend.launch(&document.html, &context_id).await {
        Ok(context) => context,
        Err(e) => {
            warn!(session = %session.session_id, error = %e, "Sandbox launch failed");
            session.fail(PreviewFailure::new(
                PreviewFailureKind::ResourceLoad,
                e.to_string(),
            ));
            finish(session, &timeline, &outcome).await;
            return;
        }
    };

    let deadline = Instant::now() + Duration::from_millis(config.timeout_ms);

    loop {
        match tokio::time::timeout_at(deadline, context.recv()).await {
            Ok(Some(envelope)) => {
                if envelope.context_id != context_id {
                    debug!(
                        session = %session.session_id,
                        stale = %envelope.context_id,
                        kind = envelope.message.message_type(),
                        "Discarding envelope from superseded context"
                    );
                    continue;
                }
                match envelope.message {
                    BoundaryMessage::LoadStart => {
                        debug!(session = %session.session_id, "Sandbox began executing");
                    }
                    BoundaryMessage::Ready { load_time_ms } => {
                        session.succeed(load_time_ms);
                        break;
                    }
                    BoundaryMessage::Error { error, details } => {
                        session.fail(PreviewFailure::from_error_message(error, details));
                        break;
                    }
                    BoundaryMessage::Debug {
                        debug_type,
                        message,
                        data,
                    } => {
                        timeline.lock().await.record(
                            EventLevel::Info,
                            format!("[{debug_type}] {message}"),
                            data,
                        );
                    }
                }
            }
            Ok(None) => {
                // A crashed runtime is not a silent one; this is reported
                // immediately rather than waiting out the deadline.
                session.fail(PreviewFailure::new(
                    PreviewFailureKind::ResourceLoad,
                    "Sandbox exited before reporting a result",
                ));
                break;
            }
            Err(_) => {
                session.fail(PreviewFailure::timeout(config.timeout_ms));
                break;
            }
        }
    }

    finish(session, &timeline, &outcome).await;
    // Dropping the context tears the runtime down; late messages from it
    // are never read.
    drop(context);
}

async fn finish(
    session: PreviewSession,
    timeline: &SharedTimeline,
    outcome: &mpsc::UnboundedSender<PreviewSession>,
) {
    match session.status {
        SessionStatus::Success => {
            info!(
                session = %session.session_id,
                load_time_ms = session.load_time_ms.unwrap_or(0),
                "Preview ready"
            );
            timeline.lock().await.info(format!(
                "Preview session {} ready in {}ms",
                session.short_id(),
                session.load_time_ms.unwrap_or(0)
            ));
        }
        SessionStatus::Error => {
            let failure = session
                .error
                .as_ref()
                .map(|f| f.to_string())
                .unwrap_or_else(|| "unknown failure".to_string());
            let kind = session
                .error
                .as_ref()
                .map(|f| f.kind.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            warn!(
                session = %session.session_id,
                kind = %kind,
                retry_count = session.retry_count,
                "Preview failed: {failure}"
            );
            timeline.lock().await.error_with(
                format!("Preview session {} failed: {failure}", session.short_id()),
                serde_json::json!({ "kind": kind, "retryCount": session.retry_count }),
            );
        }
        SessionStatus::Loading => {}
    }
    // A dropped handle is not an error; the session still ran to
    // termination.
    let _ = outcome.send(session);
}
