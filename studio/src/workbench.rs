//! Host facade: one call from prompt to previewed result.
//!
//! The workbench wires the escalation ladder to the preview engine. A run
//! generates files, opens a preview session over them, and waits for the
//! terminal report. A failed preview is fed back into a fresh ladder run as
//! correction context, up to a configured number of rounds; after the last
//! round the result is returned as-is, so the caller always gets files plus
//! a terminal session.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::StudioConfig;
use crate::error::{StudioError, StudioResult};
use crate::generate::{
    GenerationOutcome, GenerationProvider, Generator, HttpProvider, NullProvider, ProgressSender,
    ProgressTracker,
};
use crate::preview::{
    PreviewEngine, PreviewSession, ProcessBackend, SandboxBackend, SessionStatus,
};
use crate::telemetry::{shared_timeline, DebugTimeline, SharedTimeline};
use crate::validate::Validator;

/// Product of one workbench run: the accepted files and the terminal
/// preview session that confirmed (or failed to confirm) them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealizeReport {
    pub outcome: GenerationOutcome,
    pub preview: PreviewSession,
    /// How many failed previews drove a fresh ladder run.
    pub feedback_rounds: u32,
}

impl RealizeReport {
    pub fn rendered(&self) -> bool {
        self.preview.status == SessionStatus::Success
    }
}

/// Wires generator, validator, preview engine, and telemetry together.
pub struct Workbench {
    generator: Generator,
    engine: PreviewEngine,
    timeline: SharedTimeline,
    max_feedback_rounds: u32,
}

impl std::fmt::Debug for Workbench {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workbench")
            .field("max_feedback_rounds", &self.max_feedback_rounds)
            .finish_non_exhaustive()
    }
}

impl Workbench {
    /// Assemble a workbench from injected collaborators.
    pub fn new(
        provider: Arc<dyn GenerationProvider>,
        backend: Arc<dyn SandboxBackend>,
        config: &StudioConfig,
    ) -> Self {
        let timeline = shared_timeline(DebugTimeline::with_capacity(config.telemetry.capacity));
        let generator = Generator::new(
            provider,
            Validator::new(config.validator.clone()),
            config.ladder_config(),
        );
        let engine = PreviewEngine::new(backend, config.preview.clone(), Arc::clone(&timeline));
        Self {
            generator,
            engine,
            timeline,
            max_feedback_rounds: config.workbench.max_feedback_rounds,
        }
    }

    /// Assemble from config alone: HTTP provider (or the null provider when
    /// disabled) and the process sandbox backend. Fails when no sandbox
    /// runtime command is configured; embedders without one inject a
    /// backend through [`Workbench::new`].
    pub fn from_config(config: &StudioConfig) -> StudioResult<Self> {
        let provider: Arc<dyn GenerationProvider> = if config.provider.enabled {
            Arc::new(HttpProvider::new(
                config.provider.name.clone(),
                config.provider.base_url.clone(),
                std::env::var("STUDIO_PROVIDER_KEY").ok(),
            ))
        } else {
            Arc::new(NullProvider)
        };

        let command = config.sandbox.command.clone().ok_or_else(|| {
            StudioError::config(
                "sandbox.command is not set; configure a runtime or inject a SandboxBackend",
            )
        })?;
        let backend = Arc::new(ProcessBackend::new(command, config.sandbox.args.clone()));

        Ok(Self::new(provider, backend, config))
    }

    /// Generate files for `prompt` and confirm them in a preview session.
    pub async fn realize(&self, prompt: &str) -> StudioResult<RealizeReport> {
        self.realize_inner(prompt, None).await
    }

    /// Like [`realize`](Self::realize), streaming ladder checkpoints for
    /// the first round to `progress`.
    pub async fn realize_streaming(
        &self,
        prompt: &str,
        progress: ProgressSender,
    ) -> StudioResult<RealizeReport> {
        self.realize_inner(prompt, Some(progress)).await
    }

    async fn realize_inner(
        &self,
        prompt: &str,
        progress: Option<ProgressSender>,
    ) -> StudioResult<RealizeReport> {
        let mut feedback: Option<String> = None;
        let mut rounds = 0u32;

        loop {
            let tracker = match (&progress, rounds) {
                (Some(tx), 0) => ProgressTracker::streaming(tx.clone()),
                _ => ProgressTracker::disabled(),
            };
            let outcome = self
                .generator
                .run_with(prompt, feedback.as_deref(), tracker)
                .await;

            let handle = self.engine.open(outcome.files.clone()).await;
            let Some(preview) = handle.completed().await else {
                // Another caller superseded this run's session; its result
                // no longer reflects anything observable.
                return Err(StudioError::SessionSuperseded {
                    session_id: "superseded before reporting".to_string(),
                });
            };

            if preview.status == SessionStatus::Success || rounds >= self.max_feedback_rounds {
                if preview.status != SessionStatus::Success {
                    warn!(
                        rounds,
                        rung = %outcome.rung,
                        "Feedback rounds exhausted, returning last result"
                    );
                } else {
                    info!(
                        rounds,
                        rung = %outcome.rung,
                        load_time_ms = preview.load_time_ms.unwrap_or(0),
                        "Workbench run complete"
                    );
                }
                return Ok(RealizeReport {
                    outcome,
                    preview,
                    feedback_rounds: rounds,
                });
            }

            let failure = preview
                .error
                .as_ref()
                .map(|f| f.to_string())
                .unwrap_or_else(|| "preview failed without detail".to_string());
            info!(
                round = rounds + 1,
                failure = %failure,
                "Preview failed, feeding error back into a fresh ladder run"
            );
            self.timeline.lock().await.warn(format!(
                "Feedback round {}: regenerating after preview failure",
                rounds + 1
            ));
            feedback = Some(failure);
            rounds += 1;
        }
    }

    /// Re-run the current preview source with the retry counter bumped.
    pub async fn retry_preview(&self) -> Option<PreviewSession> {
        match self.engine.retry().await {
            Some(handle) => handle.completed().await,
            None => None,
        }
    }

    /// The shared debug timeline backing user-facing diagnostics.
    pub fn timeline(&self) -> SharedTimeline {
        Arc::clone(&self.timeline)
    }

    /// Render the debug timeline as display lines, oldest first.
    pub async fn render_timeline(&self) -> String {
        self.timeline.lock().await.render()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preview::{
        BoundaryMessage, PreviewFailureKind, SandboxContext, ScriptedBackend,
    };
    use crate::preview::backend::SandboxResult;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    const GOOD_RESPONSE: &str =
        "```jsx\nexport default function App() {\n  return <div>Hello</div>;\n}\n```";

    struct ScriptedProvider {
        replies: Mutex<VecDeque<String>>,
    }

    impl ScriptedProvider {
        fn new(replies: Vec<&str>) -> Self {
            Self {
                replies: Mutex::new(replies.into_iter().map(String::from).collect()),
            }
        }
    }

    #[async_trait]
    impl GenerationProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn generate(
            &self,
            _prompt: &str,
            params: &crate::generate::SamplingParams,
        ) -> StudioResult<crate::generate::ProviderReply> {
            match self.replies.lock().unwrap().pop_front() {
                Some(content) => Ok(crate::generate::ProviderReply {
                    content,
                    model: params.model.clone(),
                    response_time_ms: 1,
                }),
                None => Err(StudioError::provider("scripted", "script exhausted")),
            }
        }
    }

    /// Plays a different scripted context per launch, in order; repeats the
    /// last one once the sequence is exhausted.
    struct SequenceBackend {
        scripts: Mutex<VecDeque<ScriptedBackend>>,
        last: ScriptedBackend,
    }

    impl SequenceBackend {
        fn new(scripts: Vec<ScriptedBackend>) -> Self {
            let last = scripts.last().cloned().expect("at least one script");
            Self {
                scripts: Mutex::new(scripts.into_iter().collect()),
                last,
            }
        }
    }

    #[async_trait]
    impl SandboxBackend for SequenceBackend {
        fn name(&self) -> &str {
            "sequence"
        }

        async fn launch(&self, document: &str, context_id: &str) -> SandboxResult<SandboxContext> {
            let script = self
                .scripts
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| self.last.clone());
            script.launch(document, context_id).await
        }
    }

    fn workbench(provider: impl GenerationProvider + 'static, backend: impl SandboxBackend + 'static) -> Workbench {
        Workbench::new(
            Arc::new(provider),
            Arc::new(backend),
            &StudioConfig::default(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn prompt_to_rendered_preview_in_one_round() {
        let bench = workbench(
            ScriptedProvider::new(vec![GOOD_RESPONSE]),
            ScriptedBackend::ready(12),
        );

        let report = bench.realize("a greeting card").await.unwrap();
        assert!(report.rendered());
        assert_eq!(report.feedback_rounds, 0);
        assert_eq!(report.preview.load_time_ms, Some(12));
        assert!(!report.outcome.files.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_preview_drives_a_feedback_round() {
        let bench = workbench(
            ScriptedProvider::new(vec![GOOD_RESPONSE, GOOD_RESPONSE]),
            SequenceBackend::new(vec![
                ScriptedBackend::erroring("ReferenceError: data is not defined"),
                ScriptedBackend::ready(8),
            ]),
        );

        let report = bench.realize("a data table").await.unwrap();
        assert!(report.rendered());
        assert_eq!(report.feedback_rounds, 1);

        let timeline = bench.timeline();
        let log = timeline.lock().await;
        assert!(log.iter().any(|e| e.message.contains("Feedback round 1")));
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_rounds_return_the_last_failing_result() {
        let bench = workbench(
            ScriptedProvider::new(vec![GOOD_RESPONSE, GOOD_RESPONSE, GOOD_RESPONSE]),
            SequenceBackend::new(vec![ScriptedBackend::erroring("boom")]),
        );

        let report = bench.realize("a chart").await.unwrap();
        assert!(!report.rendered());
        assert_eq!(report.feedback_rounds, 2);
        let failure = report.preview.error.expect("failure recorded");
        assert_eq!(failure.kind, PreviewFailureKind::Runtime);
        assert!(!report.outcome.files.is_empty(), "files are still delivered");
    }

    #[tokio::test(start_paused = true)]
    async fn offline_profile_still_renders_via_fallback() {
        let bench = Workbench::new(
            Arc::new(NullProvider),
            Arc::new(ScriptedBackend::ready(4)),
            &StudioConfig::offline(),
        );

        let report = bench.realize("a signup form").await.unwrap();
        assert!(report.rendered());
        assert!(report.outcome.is_fallback());
    }

    #[tokio::test(start_paused = true)]
    async fn retry_preview_reruns_the_current_source() {
        let bench = workbench(
            ScriptedProvider::new(vec![GOOD_RESPONSE]),
            ScriptedBackend::ready(6),
        );
        assert!(bench.retry_preview().await.is_none(), "nothing to retry yet");

        let report = bench.realize("a badge").await.unwrap();
        let retried = bench.retry_preview().await.expect("session to retry");
        assert_eq!(retried.retry_count, 1);
        assert_eq!(retried.source_files, report.preview.source_files);
    }

    #[tokio::test(start_paused = true)]
    async fn debug_envelopes_surface_in_the_rendered_timeline() {
        let backend = ScriptedBackend::new(vec![
            (std::time::Duration::ZERO, BoundaryMessage::LoadStart),
            (
                std::time::Duration::from_millis(1),
                BoundaryMessage::Debug {
                    debug_type: "console".into(),
                    message: "mounted".into(),
                    data: None,
                },
            ),
            (
                std::time::Duration::from_millis(1),
                BoundaryMessage::Ready { load_time_ms: 2 },
            ),
        ]);
        let bench = workbench(ScriptedProvider::new(vec![GOOD_RESPONSE]), backend);

        bench.realize("a widget").await.unwrap();
        let rendered = bench.render_timeline().await;
        assert!(rendered.contains("[console] mounted"));
        assert!(rendered.contains("ready in 2ms"));
    }

    #[test]
    fn from_config_requires_a_sandbox_command() {
        let mut config = StudioConfig::offline();
        config.sandbox.command = None;
        let err = Workbench::from_config(&config).unwrap_err();
        assert!(err.to_string().contains("sandbox.command"));

        config.sandbox.command = Some("deno".to_string());
        assert!(Workbench::from_config(&config).is_ok());
    }
}
