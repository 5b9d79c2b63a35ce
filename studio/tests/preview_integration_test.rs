//! Integration tests for the preview engine
//!
//! Exercises session lifecycle through the public engine surface: document
//! delivery to the backend, configured timeout budgets, supersede chains,
//! and serialization of the session wire shape.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use studio::preview::{
    BoundaryEnvelope, BoundaryMessage, PreviewConfig, PreviewEngine, PreviewFailureKind,
    SandboxBackend, SandboxContext, SandboxError, ScriptedBackend, SessionStatus,
};
use studio::telemetry::{shared_timeline, DebugTimeline};
use studio::GeneratedFile;

fn files() -> Vec<GeneratedFile> {
    vec![GeneratedFile::new(
        "src/App.jsx",
        "export default function App() { return <div>Hi</div>; }",
    )]
}

fn engine(backend: impl SandboxBackend + 'static, timeout_ms: u64) -> PreviewEngine {
    PreviewEngine::new(
        Arc::new(backend),
        PreviewConfig { timeout_ms },
        shared_timeline(DebugTimeline::new()),
    )
}

/// Backend that records every document it is handed, then reports ready.
struct RecordingBackend {
    documents: Arc<Mutex<Vec<String>>>,
    inner: ScriptedBackend,
}

#[async_trait]
impl SandboxBackend for RecordingBackend {
    fn name(&self) -> &str {
        "recording"
    }

    async fn launch(&self, document: &str, context_id: &str) -> Result<SandboxContext, SandboxError> {
        self.documents.lock().unwrap().push(document.to_string());
        self.inner.launch(document, context_id).await
    }
}

/// Test: the engine hands the backend a complete self-contained document
#[tokio::test(start_paused = true)]
async fn backend_receives_the_assembled_document() {
    let documents = Arc::new(Mutex::new(Vec::new()));
    let engine = engine(
        RecordingBackend {
            documents: Arc::clone(&documents),
            inner: ScriptedBackend::ready(3),
        },
        15_000,
    );

    let session = engine.open(files()).await.completed().await.unwrap();
    assert_eq!(session.status, SessionStatus::Success);

    let docs = documents.lock().unwrap();
    assert_eq!(docs.len(), 1);
    let html = &docs[0];
    // Bridge, shim, normalized source, guarded entry call.
    assert!(html.contains("LOAD_START"));
    assert!(html.contains("window.Button"));
    assert!(html.contains("function App()"));
    assert!(!html.contains("export default"));
    assert!(html.contains("__preview.ready"));
}

/// Test: a configured budget shorter than the default is honored
#[tokio::test(start_paused = true)]
async fn configured_timeout_budget_is_honored() {
    let backend = ScriptedBackend::holding_open(vec![
        (Duration::ZERO, BoundaryMessage::LoadStart),
        // Arrives after the 2s budget; the session must already be closed.
        (
            Duration::from_secs(5),
            BoundaryMessage::Ready { load_time_ms: 1 },
        ),
    ]);
    let engine = engine(backend, 2_000);

    let session = engine.open(files()).await.completed().await.unwrap();
    assert_eq!(session.status, SessionStatus::Error);
    let failure = session.error.unwrap();
    assert_eq!(failure.kind, PreviewFailureKind::Timeout);
    assert!(failure.message.contains("2000ms"));
    assert!(session.load_time_ms.is_none());
}

/// Test: a chain of supersessions leaves exactly one reporting session
#[tokio::test(start_paused = true)]
async fn supersede_chain_reports_only_the_last_session() {
    let engine = engine(ScriptedBackend::ready(4), 15_000);

    let first = engine.open(files()).await;
    let second = engine.open(files()).await;
    let third = engine.open(files()).await;

    assert_eq!(first.completed().await, None);
    assert_eq!(second.completed().await, None);

    let session = third.completed().await.expect("last session reports");
    assert_eq!(session.status, SessionStatus::Success);
    assert_eq!(session.version, 3);
    assert_eq!(engine.current_version().await, 3);
}

/// Test: error details travel through the envelope into the session failure
#[tokio::test(start_paused = true)]
async fn error_details_surface_with_position_and_stack() {
    let backend = ScriptedBackend::new(vec![
        (Duration::ZERO, BoundaryMessage::LoadStart),
        (
            Duration::from_millis(1),
            BoundaryMessage::Error {
                error: "Compile error: Unexpected token".into(),
                details: Some(studio::preview::ErrorDetails {
                    line: Some(3),
                    column: Some(17),
                    stack: Some("at preview.tsx:3:17".into()),
                }),
            },
        ),
    ]);
    let engine = engine(backend, 15_000);

    let session = engine.open(files()).await.completed().await.unwrap();
    let failure = session.error.unwrap();
    assert_eq!(failure.kind, PreviewFailureKind::Compile);
    let details = failure.details.unwrap();
    assert_eq!(details.line, Some(3));
    assert_eq!(details.column, Some(17));
    assert!(details.stack.unwrap().contains("preview.tsx"));
}

/// Test: the protocol wire shape matches the documented JSON exactly
#[test]
fn boundary_messages_use_the_documented_wire_shape() {
    let ready: BoundaryMessage =
        serde_json::from_str(r#"{"type":"READY","loadTimeMs":120}"#).unwrap();
    assert_eq!(ready, BoundaryMessage::Ready { load_time_ms: 120 });

    let error: BoundaryMessage = serde_json::from_str(
        r#"{"type":"ERROR","error":"boom","details":{"line":1,"column":2,"stack":"s"}}"#,
    )
    .unwrap();
    match error {
        BoundaryMessage::Error { error, details } => {
            assert_eq!(error, "boom");
            assert_eq!(details.unwrap().line, Some(1));
        }
        other => panic!("unexpected message {other:?}"),
    }

    let envelope = BoundaryEnvelope::new(
        "ctx-1",
        BoundaryMessage::Debug {
            debug_type: "console".into(),
            message: "hi".into(),
            data: None,
        },
    );
    let json = serde_json::to_value(&envelope).unwrap();
    assert_eq!(json["contextId"], "ctx-1");
    assert_eq!(json["message"]["type"], "DEBUG");
    assert_eq!(json["message"]["debugType"], "console");
}
