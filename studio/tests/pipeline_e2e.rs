//! End-to-end tests for the prompt-to-preview pipeline
//!
//! Drives the public surface only: a workbench assembled from scripted
//! collaborators, validating the full generate → extract → validate →
//! preview flow, the fallback guarantee, and the failure feedback loop.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use studio::config::StudioConfig;
use studio::error::{StudioError, StudioResult};
use studio::generate::{GenerationProvider, Generator, ProviderReply, SamplingParams};
use studio::preview::{
    PreviewFailureKind, SandboxBackend, SandboxContext, SandboxError, ScriptedBackend,
    SessionStatus,
};
use studio::validate::Validator;
use studio::workbench::Workbench;
use studio::{ExtractionMethod, Rung};

const CARD_RESPONSE: &str = "Here's your card:\n```jsx\nexport default function App() {\n  return <div className=\"card\">Ready</div>;\n}\n```\nEnjoy!";

/// Pipe pipeline tracing into the test harness when RUST_LOG asks for it.
fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Provider that plays back a fixed reply script, then errors.
struct ScriptedProvider {
    replies: Mutex<VecDeque<StudioResult<String>>>,
}

impl ScriptedProvider {
    fn new(replies: Vec<StudioResult<String>>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
        }
    }

    fn failing() -> Self {
        Self::new(vec![
            Err(StudioError::provider("scripted", "connection reset")),
            Err(StudioError::provider("scripted", "connection reset")),
        ])
    }
}

#[async_trait]
impl GenerationProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, _prompt: &str, params: &SamplingParams) -> StudioResult<ProviderReply> {
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(content)) => Ok(ProviderReply {
                content,
                model: params.model.clone(),
                response_time_ms: 3,
            }),
            Some(Err(err)) => Err(err),
            None => Err(StudioError::provider("scripted", "script exhausted")),
        }
    }
}

/// Test: a good first reply flows straight through to a rendered preview
#[tokio::test(start_paused = true)]
async fn prompt_becomes_a_rendered_preview() -> Result<()> {
    init_logging();
    let bench = Workbench::new(
        Arc::new(ScriptedProvider::new(vec![Ok(CARD_RESPONSE.to_string())])),
        Arc::new(ScriptedBackend::ready(42)),
        &StudioConfig::default(),
    );

    let report = bench.realize("a status card").await?;

    assert!(report.rendered());
    assert_eq!(report.outcome.rung, Rung::Primary);
    assert_eq!(report.outcome.method, ExtractionMethod::FencedBlocks);
    assert_eq!(report.outcome.validation.score, 100);
    assert_eq!(report.preview.status, SessionStatus::Success);
    assert!(report.preview.load_time_ms.unwrap() > 0);
    assert_eq!(report.feedback_rounds, 0);
    Ok(())
}

/// Test: total provider failure still ends in a renderable fallback —
/// "no result" is never the terminal state
#[tokio::test(start_paused = true)]
async fn total_upstream_failure_still_yields_a_result() -> Result<()> {
    init_logging();
    let bench = Workbench::new(
        Arc::new(ScriptedProvider::failing()),
        Arc::new(ScriptedBackend::ready(9)),
        &StudioConfig::default(),
    );

    let report = bench.realize("an analytics dashboard").await?;

    assert!(report.rendered());
    assert_eq!(report.outcome.rung, Rung::Fallback);
    assert_eq!(report.outcome.method, ExtractionMethod::Synthesized);
    assert_eq!(report.outcome.attempts_made, 3);
    assert_eq!(report.outcome.validation.score, studio::generate::FALLBACK_SCORE);
    assert!(report.outcome.validation.is_valid);
    assert!(!report.outcome.files.is_empty());
    Ok(())
}

/// Test: the ladder alone (no preview) always terminates with accepted files
#[tokio::test]
async fn ladder_always_terminates_with_files() {
    let generator = Generator::new(
        Arc::new(ScriptedProvider::new(vec![
            Ok("I'm sorry, I can't generate that.".to_string()),
            Ok("Still no code here, just words.".to_string()),
        ])),
        Validator::default(),
        StudioConfig::default().ladder_config(),
    );

    let outcome = generator.run("a login form").await;
    assert_eq!(outcome.rung, Rung::Fallback);
    assert!(outcome.validation.is_valid);
    assert!(!outcome.files.is_empty());
}

/// Test: a crashing render is surfaced as an error session with the runtime
/// message, then a feedback round regenerates and renders
#[tokio::test(start_paused = true)]
async fn render_failure_feeds_back_into_regeneration() -> Result<()> {
    init_logging();
    struct FlakyBackend {
        launches: Mutex<u32>,
    }

    #[async_trait]
    impl SandboxBackend for FlakyBackend {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn launch(
            &self,
            document: &str,
            context_id: &str,
        ) -> Result<SandboxContext, SandboxError> {
            let script = {
                let mut launches = self.launches.lock().unwrap();
                *launches += 1;
                if *launches == 1 {
                    ScriptedBackend::erroring("TypeError: Cannot read properties of undefined")
                } else {
                    ScriptedBackend::ready(6)
                }
            };
            script.launch(document, context_id).await
        }
    }

    let bench = Workbench::new(
        Arc::new(ScriptedProvider::new(vec![
            Ok(CARD_RESPONSE.to_string()),
            Ok(CARD_RESPONSE.to_string()),
        ])),
        Arc::new(FlakyBackend {
            launches: Mutex::new(0),
        }),
        &StudioConfig::default(),
    );

    let report = bench.realize("a profile widget").await?;
    assert!(report.rendered());
    assert_eq!(report.feedback_rounds, 1);

    let rendered = bench.render_timeline().await;
    assert!(rendered.contains("Cannot read properties of undefined"));
    assert!(rendered.contains("Feedback round 1"));
    Ok(())
}

/// Test: a silent sandbox times out into an error session exactly once
#[tokio::test(start_paused = true)]
async fn silent_sandbox_surfaces_a_timeout_error() -> Result<()> {
    init_logging();
    let mut config = StudioConfig::default();
    config.workbench.max_feedback_rounds = 0;
    let bench = Workbench::new(
        Arc::new(ScriptedProvider::new(vec![Ok(CARD_RESPONSE.to_string())])),
        Arc::new(ScriptedBackend::silent()),
        &config,
    );

    let report = bench.realize("a clock").await?;
    assert!(!report.rendered());
    let failure = report.preview.error.expect("timeout failure recorded");
    assert_eq!(failure.kind, PreviewFailureKind::Timeout);
    assert!(failure.message.contains("15000ms"));
    // Files are still delivered alongside the failed preview.
    assert!(!report.outcome.files.is_empty());
    Ok(())
}

/// Test: streaming runs emit cumulative progress ending at 100
#[tokio::test(start_paused = true)]
async fn streaming_progress_sums_to_one_hundred() -> Result<()> {
    init_logging();
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let bench = Workbench::new(
        Arc::new(ScriptedProvider::new(vec![Ok(CARD_RESPONSE.to_string())])),
        Arc::new(ScriptedBackend::ready(5)),
        &StudioConfig::default(),
    );

    bench.realize_streaming("a gallery", tx).await?;

    let mut last = 0u8;
    let mut count = 0usize;
    while let Ok(update) = rx.try_recv() {
        assert!(update.completed >= last, "progress must be monotonic");
        last = update.completed;
        count += 1;
    }
    assert_eq!(count, 5);
    assert_eq!(last, 100);
    Ok(())
}
