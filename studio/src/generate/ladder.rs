//! The escalation ladder.
//!
//! Rungs are walked in a fixed order: a full prompt against the provider, a
//! stripped retry with hotter sampling, then the offline fallback. A rung is
//! accepted when its extraction yields valid code and validation clears the
//! configured score threshold; the fallback accepts unconditionally, so a
//! ladder run always ends with usable files.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::extract::{ExtractionMethod, ExtractionResult, Extractor, RawResponse};
use crate::files::GeneratedFile;
use crate::validate::{AppliedFix, ValidateOptions, ValidationResult, Validator};

use super::fallback;
use super::progress::{GenerationStage, ProgressSender, ProgressTracker};
use super::prompts::{self, PromptContext};
use super::provider::{GenerationProvider, ProviderHealth, SamplingParams};

/// Score reported for fallback scaffolds, which skip the validator.
pub const FALLBACK_SCORE: u8 = 75;

/// Ladder rungs, in escalation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rung {
    Primary,
    Retry,
    Fallback,
}

impl Rung {
    pub const LADDER: [Rung; 3] = [Rung::Primary, Rung::Retry, Rung::Fallback];
}

impl std::fmt::Display for Rung {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rung::Primary => write!(f, "primary"),
            Rung::Retry => write!(f, "retry"),
            Rung::Fallback => write!(f, "fallback"),
        }
    }
}

/// Ladder tuning knobs.
#[derive(Debug, Clone)]
pub struct LadderConfig {
    /// Minimum validation score a provider rung must reach to be accepted.
    pub acceptance_score: u8,
    /// Per-call budget for provider rungs.
    pub provider_timeout_ms: u64,
    /// Sampling for the primary rung; the retry derives from it.
    pub sampling: SamplingParams,
}

impl Default for LadderConfig {
    fn default() -> Self {
        Self {
            acceptance_score: 60,
            provider_timeout_ms: 30_000,
            sampling: SamplingParams::default(),
        }
    }
}

/// Bookkeeping for one rung attempt. Owned by the run that created it and
/// dropped once a final outcome is chosen.
#[derive(Debug, Clone)]
pub(crate) struct GenerationAttempt {
    pub rung: Rung,
    pub prompt: String,
    pub extraction: ExtractionResult,
    pub validation: Option<ValidationResult>,
    pub timestamp: DateTime<Utc>,
}

/// Final product of a ladder run. There is no failure variant: the fallback
/// rung guarantees files.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationOutcome {
    pub files: Vec<GeneratedFile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    pub method: ExtractionMethod,
    pub validation: ValidationResult,
    pub rung: Rung,
    pub attempts_made: u32,
    pub fixes: Vec<AppliedFix>,
    pub elapsed_ms: u64,
}

impl GenerationOutcome {
    pub fn is_fallback(&self) -> bool {
        self.rung == Rung::Fallback
    }
}

/// Walks the ladder for one request at a time.
pub struct Generator {
    provider: Arc<dyn GenerationProvider>,
    extractor: Extractor,
    validator: Validator,
    config: LadderConfig,
    health: Mutex<ProviderHealth>,
}

impl Generator {
    pub fn new(
        provider: Arc<dyn GenerationProvider>,
        validator: Validator,
        config: LadderConfig,
    ) -> Self {
        let health = Mutex::new(ProviderHealth::new(provider.name()));
        Self {
            provider,
            extractor: Extractor::new(),
            validator,
            config,
            health,
        }
    }

    pub async fn run(&self, request: &str) -> GenerationOutcome {
        self.run_with(request, None, ProgressTracker::disabled())
            .await
    }

    /// Like [`run`](Self::run), emitting weighted checkpoints to `progress`.
    pub async fn run_streaming(
        &self,
        request: &str,
        progress: ProgressSender,
    ) -> GenerationOutcome {
        self.run_with(request, None, ProgressTracker::streaming(progress))
            .await
    }

    /// Full-control entry point. `feedback` carries the error text of a
    /// failed preview round so the primary prompt can ask for a correction.
    pub async fn run_with(
        &self,
        request: &str,
        feedback: Option<&str>,
        mut progress: ProgressTracker,
    ) -> GenerationOutcome {
        let started = Instant::now();

        let context = PromptContext {
            request,
            allowed_imports: self.validator.allowed_imports(),
            feedback,
        };
        progress.checkpoint(GenerationStage::Analyze, "request context assembled");
        progress.checkpoint(GenerationStage::Plan, "escalation plan prepared");

        let mut attempts_made = 0u32;
        let mut rejections = 0usize;

        if self.provider.is_available().await {
            // The retry prompt names the primary's rejection, so the rungs
            // are walked sequentially rather than planned upfront.
            attempts_made += 1;
            let mut prior_failure = String::from("the provider call itself failed");
            match self
                .provider_attempt(
                    Rung::Primary,
                    prompts::primary_prompt(&context),
                    &self.config.sampling,
                )
                .await
            {
                Some(attempt) if self.accepts(&attempt) => {
                    return self.finish(attempt, attempts_made, started, &mut progress);
                }
                Some(attempt) => {
                    prior_failure = rejection_reason(&attempt);
                    debug!(
                        rung = %attempt.rung,
                        reason = %prior_failure,
                        "Attempt rejected, escalating"
                    );
                    rejections += 1;
                }
                None => rejections += 1,
            }

            attempts_made += 1;
            match self
                .provider_attempt(
                    Rung::Retry,
                    prompts::retry_prompt(&context, Some(prior_failure.as_str())),
                    &retry_params(&self.config.sampling),
                )
                .await
            {
                Some(attempt) if self.accepts(&attempt) => {
                    return self.finish(attempt, attempts_made, started, &mut progress);
                }
                Some(attempt) => {
                    debug!(
                        rung = %attempt.rung,
                        reason = %rejection_reason(&attempt),
                        "Attempt rejected, escalating"
                    );
                    rejections += 1;
                }
                None => rejections += 1,
            }
        } else {
            info!(
                provider = self.provider.name(),
                "Provider unavailable, going straight to the offline fallback"
            );
        }

        // Deterministic tail: synthesized locally, accepted unconditionally.
        attempts_made += 1;
        if rejections > 0 {
            debug!(rejections, "Provider rungs exhausted, synthesizing scaffold");
        }
        let extraction = fallback::synthesize(request);
        let validation = ValidationResult {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
            score: FALLBACK_SCORE,
            suggestions: Vec::new(),
        };
        let attempt = GenerationAttempt {
            rung: Rung::Fallback,
            prompt: request.to_string(),
            extraction,
            validation: Some(validation),
            timestamp: Utc::now(),
        };
        self.finish(attempt, attempts_made, started, &mut progress)
    }

    /// Snapshot of the provider's rolling health.
    pub async fn provider_health(&self) -> ProviderHealth {
        self.health.lock().await.clone()
    }

    async fn provider_attempt(
        &self,
        rung: Rung,
        prompt: String,
        params: &SamplingParams,
    ) -> Option<GenerationAttempt> {
        let budget = Duration::from_millis(self.config.provider_timeout_ms);
        let reply = match tokio::time::timeout(budget, self.provider.generate(&prompt, params)).await
        {
            Ok(Ok(reply)) => {
                self.health.lock().await.record_success();
                reply
            }
            Ok(Err(err)) => {
                let mut health = self.health.lock().await;
                health.record_failure(&err.to_string());
                warn!(
                    rung = %rung,
                    error = %err,
                    retryable = err.is_retryable(),
                    degraded = health.is_degraded(),
                    "Provider call failed"
                );
                return None;
            }
            Err(_) => {
                let mut health = self.health.lock().await;
                health.record_failure("call exceeded budget");
                warn!(
                    rung = %rung,
                    timeout_ms = self.config.provider_timeout_ms,
                    "Provider call exceeded budget"
                );
                return None;
            }
        };

        let raw = RawResponse::from(reply.content);
        let extraction = self.extractor.extract(&raw);
        let validation = extraction
            .has_valid_code
            .then(|| self.validator.validate(&extraction.files, &ValidateOptions::default()));

        Some(GenerationAttempt {
            rung,
            prompt,
            extraction,
            validation,
            timestamp: Utc::now(),
        })
    }

    fn accepts(&self, attempt: &GenerationAttempt) -> bool {
        if !attempt.extraction.has_valid_code {
            return false;
        }
        match &attempt.validation {
            Some(v) => v.is_valid && v.score >= self.config.acceptance_score,
            None => false,
        }
    }

    fn finish(
        &self,
        attempt: GenerationAttempt,
        attempts_made: u32,
        started: Instant,
        progress: &mut ProgressTracker,
    ) -> GenerationOutcome {
        progress.checkpoint(
            GenerationStage::Generate,
            format!(
                "{} file(s) via {}",
                attempt.extraction.files.len(),
                attempt.extraction.method
            ),
        );

        let validation = attempt.validation.unwrap_or_else(|| {
            self.validator
                .validate(&attempt.extraction.files, &ValidateOptions::default())
        });
        progress.checkpoint(GenerationStage::Validate, format!("score {}", validation.score));

        let (files, fixes) = self.validator.auto_fix(&attempt.extraction.files);
        progress.checkpoint(
            GenerationStage::Optimize,
            format!("{} fix(es) applied", fixes.len()),
        );

        info!(
            rung = %attempt.rung,
            method = %attempt.extraction.method,
            files = files.len(),
            score = validation.score,
            attempts = attempts_made,
            "Generation accepted"
        );

        GenerationOutcome {
            files,
            explanation: attempt.extraction.explanation,
            method: attempt.extraction.method,
            validation,
            rung: attempt.rung,
            attempts_made,
            fixes,
            elapsed_ms: started.elapsed().as_millis() as u64,
        }
    }
}

/// One-line summary of why an attempt was rejected, fed into the retry
/// prompt so the model knows what to avoid.
fn rejection_reason(attempt: &GenerationAttempt) -> String {
    if !attempt.extraction.has_valid_code {
        return "the reply contained no usable component code".to_string();
    }
    match &attempt.validation {
        Some(v) if !v.errors.is_empty() => format!(
            "validation failed with \"{}\" ({} error(s) total)",
            v.errors[0].message,
            v.errors.len()
        ),
        Some(v) => format!("validation scored {}, below the acceptance threshold", v.score),
        None => "the reply could not be validated".to_string(),
    }
}

/// Retry sampling: hotter and shorter than the primary call.
fn retry_params(primary: &SamplingParams) -> SamplingParams {
    SamplingParams {
        model: primary.model.clone(),
        temperature: (primary.temperature + 0.5).min(1.0),
        max_tokens: (primary.max_tokens / 2).max(512),
    }
}
