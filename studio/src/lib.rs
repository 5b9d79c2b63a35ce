//! Studio — Prompt-to-Preview Pipeline
//!
//! An embedded library that turns a free-text prompt into runnable UI
//! source code, vets it, and confirms it renders inside a sandboxed
//! execution context. The pipeline escalates through generation strategies
//! until an accepted result exists, so a run never ends without usable
//! files.
//!
//! # Pipeline
//!
//! ```text
//! prompt ──▶ Generator (escalation ladder)
//!              │  provider call → Extractor → Validator → accept/advance
//!              │  final rung: deterministic offline fallback
//!              ▼
//!          GenerationOutcome (files + score)
//!              │
//!              ▼
//!          PreviewEngine ──▶ sandboxed context ──▶ READY / ERROR
//!              │                    (boundary message protocol)
//!              ▼
//!          PreviewSession (success | error) ──▶ feedback into a fresh run
//! ```
//!
//! # Components
//!
//! - [`extract`]: parses arbitrary model responses into (path, content)
//!   file sets via a first-match strategy list
//! - [`validate`]: import allowlist, dangerous-API, structural, style, and
//!   accessibility checks with a 0..=100 score, plus idempotent auto-fixes
//! - [`generate`]: the escalation ladder over a provider abstraction, with
//!   weighted progress checkpoints and a guaranteed offline fallback
//! - [`preview`]: session lifecycle over an isolated execution context,
//!   connected only by asynchronous boundary messages
//! - [`telemetry`]: bounded debug timeline feeding user-facing diagnostics
//! - [`workbench`]: host facade wiring generation to preview with failure
//!   feedback rounds
//!
//! # Usage
//!
//! ```no_run
//! use studio::config::StudioConfig;
//! use studio::workbench::Workbench;
//!
//! # async fn run() -> studio::error::StudioResult<()> {
//! let config = StudioConfig::load("studio.toml")?;
//! let bench = Workbench::from_config(&config)?;
//! let report = bench.realize("a pricing card with three tiers").await?;
//! if report.rendered() {
//!     println!("previewed in {:?}ms", report.preview.load_time_ms);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod extract;
pub mod files;
pub mod generate;
pub mod preview;
pub mod telemetry;
pub mod validate;
pub mod workbench;

// Re-export the primary pipeline surface
pub use config::StudioConfig;
pub use error::{StudioError, StudioResult};
pub use extract::{ExtractionMethod, ExtractionResult, Extractor, RawResponse};
pub use files::{entry_file, FileKind, GeneratedFile};
pub use generate::{
    GenerationOutcome, GenerationProvider, Generator, HttpProvider, LadderConfig, NullProvider,
    Rung, SamplingParams,
};
pub use preview::{
    BoundaryMessage, PreviewConfig, PreviewEngine, PreviewFailure, PreviewFailureKind,
    PreviewSession, ProcessBackend, SandboxBackend, ScriptedBackend, SessionStatus,
};
pub use telemetry::{classify_issue_code, DebugTimeline, ErrorClass, SharedTimeline};
pub use validate::{
    ValidateOptions, ValidationRequest, ValidationResponse, ValidationResult, Validator,
    ValidatorConfig,
};
pub use workbench::{RealizeReport, Workbench};
