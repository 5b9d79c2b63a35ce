//! Wire protocol between the host and one sandboxed execution context.
//!
//! Messages are transient and never persisted. Within one context
//! `LOAD_START` precedes `READY`/`ERROR`; across contexts there is no
//! ordering guarantee, so every message travels in an envelope naming its
//! originating context and the session driver discards envelopes from
//! contexts it no longer owns.

use serde::{Deserialize, Serialize};

/// Marker prefix distinguishing protocol lines from ordinary runtime output
/// on the sandbox stdout stream.
pub const SANDBOX_LINE_PREFIX: &str = "@sandbox:";

/// Source location and stack attached to an `ERROR` message when the
/// runtime could recover them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

/// One message from the sandboxed context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BoundaryMessage {
    /// Emitted once when the document begins executing.
    LoadStart,

    /// The entry component rendered; `loadTimeMs` is measured inside the
    /// context from document start to first paint.
    #[serde(rename_all = "camelCase")]
    Ready { load_time_ms: u64 },

    /// The context failed. The error string carries a classifying prefix
    /// (see [`PreviewFailureKind::classify`]).
    Error {
        error: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        details: Option<ErrorDetails>,
    },

    /// Diagnostic traffic (console output, lifecycle notes). Never affects
    /// session state; recorded into the debug timeline.
    #[serde(rename_all = "camelCase")]
    Debug {
        debug_type: String,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<serde_json::Value>,
    },
}

impl BoundaryMessage {
    /// Wire tag of this message, for logging.
    pub fn message_type(&self) -> &'static str {
        match self {
            BoundaryMessage::LoadStart => "LOAD_START",
            BoundaryMessage::Ready { .. } => "READY",
            BoundaryMessage::Error { .. } => "ERROR",
            BoundaryMessage::Debug { .. } => "DEBUG",
        }
    }

    /// Whether this message terminates a session.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BoundaryMessage::Ready { .. } | BoundaryMessage::Error { .. }
        )
    }
}

/// A [`BoundaryMessage`] tagged with the context that produced it.
///
/// The context id is assigned by the host when it launches the context and
/// echoed back on every line, which is what lets a session driver tell its
/// own context's messages apart from a superseded one finishing late.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundaryEnvelope {
    pub context_id: String,
    pub message: BoundaryMessage,
}

impl BoundaryEnvelope {
    pub fn new(context_id: impl Into<String>, message: BoundaryMessage) -> Self {
        Self {
            context_id: context_id.into(),
            message,
        }
    }
}

/// Failure taxonomy surfaced on a session's error transition.
///
/// Every kind is blocking for display purposes; advisory findings never
/// arrive through this channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreviewFailureKind {
    /// Source failed to transpile or parse.
    Compile,
    /// Uncaught synchronous exception while rendering or running.
    Runtime,
    /// A promise rejected with no handler attached.
    UnhandledRejection,
    /// A document resource failed to load, or the context died before
    /// reporting anything.
    ResourceLoad,
    /// Neither `READY` nor `ERROR` arrived within the session budget.
    Timeout,
}

impl PreviewFailureKind {
    /// Classify an `ERROR` message by the prefix the in-document
    /// interceptors attach. Unprefixed errors are runtime exceptions.
    pub fn classify(message: &str) -> Self {
        if message.starts_with("Compile error") {
            PreviewFailureKind::Compile
        } else if message.starts_with("Unhandled rejection") {
            PreviewFailureKind::UnhandledRejection
        } else if message.starts_with("Resource failed to load") {
            PreviewFailureKind::ResourceLoad
        } else {
            PreviewFailureKind::Runtime
        }
    }
}

impl std::fmt::Display for PreviewFailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PreviewFailureKind::Compile => "compile",
            PreviewFailureKind::Runtime => "runtime",
            PreviewFailureKind::UnhandledRejection => "unhandled_rejection",
            PreviewFailureKind::ResourceLoad => "resource_load",
            PreviewFailureKind::Timeout => "timeout",
        };
        write!(f, "{}", name)
    }
}

/// Structured failure carried by an errored session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewFailure {
    pub kind: PreviewFailureKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<ErrorDetails>,
}

impl PreviewFailure {
    pub fn new(kind: PreviewFailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
        }
    }

    /// Build a failure from an inbound `ERROR` message, classifying by
    /// prefix.
    pub fn from_error_message(message: String, details: Option<ErrorDetails>) -> Self {
        Self {
            kind: PreviewFailureKind::classify(&message),
            message,
            details,
        }
    }

    /// The timeout transition, reserved for live-but-silent contexts.
    pub fn timeout(budget_ms: u64) -> Self {
        Self::new(
            PreviewFailureKind::Timeout,
            format!("Preview did not report READY or ERROR within {budget_ms}ms"),
        )
    }
}

impl std::fmt::Display for PreviewFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(details) = &self.details {
            if let Some(line) = details.line {
                write!(f, " (line {line}")?;
                if let Some(column) = details.column {
                    write!(f, ", column {column}")?;
                }
                write!(f, ")")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ready_serializes_with_camel_case_load_time() {
        let json = serde_json::to_string(&BoundaryMessage::Ready { load_time_ms: 123 }).unwrap();
        assert_eq!(json, r#"{"type":"READY","loadTimeMs":123}"#);
    }

    #[test]
    fn load_start_round_trips_as_bare_tag() {
        let json = serde_json::to_string(&BoundaryMessage::LoadStart).unwrap();
        assert_eq!(json, r#"{"type":"LOAD_START"}"#);

        let back: BoundaryMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back, BoundaryMessage::LoadStart);
        assert!(!back.is_terminal());
    }

    #[test]
    fn error_parses_with_and_without_details() {
        let with: BoundaryMessage =
            serde_json::from_str(r#"{"type":"ERROR","error":"boom","details":{"line":3,"column":7}}"#)
                .unwrap();
        match with {
            BoundaryMessage::Error { error, details } => {
                assert_eq!(error, "boom");
                let details = details.unwrap();
                assert_eq!(details.line, Some(3));
                assert_eq!(details.column, Some(7));
                assert_eq!(details.stack, None);
            }
            other => panic!("expected ERROR, got {other:?}"),
        }

        let without: BoundaryMessage =
            serde_json::from_str(r#"{"type":"ERROR","error":"boom"}"#).unwrap();
        assert!(without.is_terminal());
    }

    #[test]
    fn debug_omits_absent_data() {
        let msg = BoundaryMessage::Debug {
            debug_type: "console".into(),
            message: "hello".into(),
            data: None,
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""debugType":"console""#));
        assert!(!json.contains("data"));

        let with_data: BoundaryMessage = serde_json::from_str(
            r#"{"type":"DEBUG","debugType":"lifecycle","message":"mounted","data":{"ms":5}}"#,
        )
        .unwrap();
        match with_data {
            BoundaryMessage::Debug { data, .. } => assert_eq!(data, Some(json!({"ms": 5}))),
            other => panic!("expected DEBUG, got {other:?}"),
        }
    }

    #[test]
    fn envelope_uses_camel_case_context_id() {
        let envelope = BoundaryEnvelope::new("ctx-1", BoundaryMessage::LoadStart);
        let json = serde_json::to_string(&envelope).unwrap();
        assert_eq!(json, r#"{"contextId":"ctx-1","message":{"type":"LOAD_START"}}"#);

        let back: BoundaryEnvelope = serde_json::from_str(&json).unwrap();
        assert_eq!(back.context_id, "ctx-1");
    }

    #[test]
    fn classifies_interceptor_prefixes() {
        assert_eq!(
            PreviewFailureKind::classify("Compile error: Unexpected token (3:7)"),
            PreviewFailureKind::Compile
        );
        assert_eq!(
            PreviewFailureKind::classify("Unhandled rejection: fetch is not defined"),
            PreviewFailureKind::UnhandledRejection
        );
        assert_eq!(
            PreviewFailureKind::classify("Resource failed to load: react.production.min.js"),
            PreviewFailureKind::ResourceLoad
        );
        assert_eq!(
            PreviewFailureKind::classify("x is not a function"),
            PreviewFailureKind::Runtime
        );
    }

    #[test]
    fn failure_display_appends_location_when_known() {
        let mut failure = PreviewFailure::from_error_message(
            "Compile error: Unexpected token".into(),
            Some(ErrorDetails {
                line: Some(3),
                column: Some(7),
                stack: None,
            }),
        );
        assert_eq!(failure.kind, PreviewFailureKind::Compile);
        assert_eq!(failure.to_string(), "Compile error: Unexpected token (line 3, column 7)");

        failure.details = None;
        assert_eq!(failure.to_string(), "Compile error: Unexpected token");

        let timeout = PreviewFailure::timeout(15_000);
        assert_eq!(timeout.kind, PreviewFailureKind::Timeout);
        assert!(timeout.message.contains("15000ms"));
    }

    #[test]
    fn message_type_names_match_wire_tags() {
        assert_eq!(BoundaryMessage::LoadStart.message_type(), "LOAD_START");
        assert_eq!(
            BoundaryMessage::Ready { load_time_ms: 1 }.message_type(),
            "READY"
        );
    }
}
