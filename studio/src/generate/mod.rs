//! Generation — Escalating Prompt-to-Files Pipeline
//!
//! Turns a free-text request into validated source files by walking a fixed
//! ladder of strategies. Provider rungs are fallible; the tail is not, so a
//! run always ends with files.
//!
//! # Ladder
//!
//! ```text
//! Primary — full prompt, default sampling
//!     │
//!     ├─ extraction fails, validation errors, or score < threshold
//!     │
//!     ▼
//! Retry — stripped prompt, hotter temperature, smaller token budget
//!     │
//!     ├─ same rejection rules
//!     │
//!     ▼
//! Fallback — offline keyword-template scaffold, accepted unconditionally
//! ```

pub mod fallback;
pub mod ladder;
pub mod progress;
pub mod prompts;
pub mod provider;

pub use fallback::{classify, synthesize, ScaffoldKind};
pub use ladder::{GenerationOutcome, Generator, LadderConfig, Rung, FALLBACK_SCORE};
pub use progress::{
    GenerationStage, ProgressReceiver, ProgressSender, ProgressTracker, ProgressUpdate,
};
pub use prompts::PromptContext;
pub use provider::{
    GenerationProvider, HttpProvider, NullProvider, ProviderHealth, ProviderReply, SamplingParams,
};
