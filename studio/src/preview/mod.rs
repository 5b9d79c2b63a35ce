//! Preview — Sandboxed Rendering of Generated Source
//!
//! Confirms that a file set actually renders. The engine assembles one
//! self-contained document (bridge, compatibility shim, normalized source,
//! guarded entry call), hands it to an isolated execution context, and waits
//! for exactly one terminal report per session.
//!
//! # Session lifecycle
//!
//! ```text
//! open(files) ── supersede previous driver ──▶ Loading
//!     │
//!     ├─ READY before deadline ──▶ Success { load_time_ms }
//!     ├─ ERROR ─────────────────▶ Error { compile | runtime | rejection | resource }
//!     ├─ context exit ──────────▶ Error { resource_load }
//!     └─ deadline ──────────────▶ Error { timeout }
//! ```
//!
//! The host never holds a reference into the context; every interaction is
//! an asynchronous [`protocol::BoundaryEnvelope`], and envelopes from a
//! superseded context are discarded by id.

pub mod backend;
pub mod document;
pub mod protocol;
pub mod session;
pub mod shim;

pub use backend::{ProcessBackend, SandboxBackend, SandboxContext, SandboxError, ScriptedBackend};
pub use document::{build_document, PreviewDocument};
pub use protocol::{
    BoundaryEnvelope, BoundaryMessage, ErrorDetails, PreviewFailure, PreviewFailureKind,
    SANDBOX_LINE_PREFIX,
};
pub use session::{PreviewConfig, PreviewEngine, PreviewHandle, PreviewSession, SessionStatus};
