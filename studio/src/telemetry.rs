//! Bounded debug telemetry for generation and preview flows.
//!
//! A pure data sink: pipeline stages append events, interactive surfaces
//! render them. The log keeps the most recent N events and has no
//! control-flow authority; dropping it mid-run changes nothing but what can
//! be displayed afterwards.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default number of events retained per timeline.
pub const DEFAULT_TIMELINE_CAPACITY: usize = 200;

/// Timeline handle shared between the host facade and background session
/// drivers.
pub type SharedTimeline = std::sync::Arc<tokio::sync::Mutex<DebugTimeline>>;

/// Wrap a timeline for sharing across tasks.
pub fn shared_timeline(timeline: DebugTimeline) -> SharedTimeline {
    std::sync::Arc::new(tokio::sync::Mutex::new(timeline))
}

/// Severity of a recorded event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventLevel {
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for EventLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventLevel::Info => write!(f, "INFO"),
            EventLevel::Warn => write!(f, "WARN"),
            EventLevel::Error => write!(f, "ERROR"),
        }
    }
}

/// How an error should be presented: does it block the preview, or is it
/// advisory only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Compile/structural/security problems that prevent a usable result.
    Blocking,
    /// Style and accessibility findings shown for awareness only.
    Informational,
}

/// Classify a validation issue code for display purposes.
///
/// Unknown codes classify as blocking: misrendering a new structural check
/// as advisory is worse than the reverse.
pub fn classify_issue_code(code: &str) -> ErrorClass {
    match code {
        "HARDCODED_COLOR" | "INLINE_STYLE" | "IMG_MISSING_ALT" | "CONTROL_MISSING_LABEL" => {
            ErrorClass::Informational
        }
        _ => ErrorClass::Blocking,
    }
}

/// One recorded timeline event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugEvent {
    pub timestamp: DateTime<Utc>,
    pub level: EventLevel,
    pub message: String,
    /// Optional structured payload (sandbox data, issue lists, timings).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<serde_json::Value>,
}

/// Append-only bounded log of [`DebugEvent`]s, most recent N kept.
#[derive(Debug, Clone)]
pub struct DebugTimeline {
    capacity: usize,
    events: VecDeque<DebugEvent>,
    dropped: u64,
}

impl DebugTimeline {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_TIMELINE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            events: VecDeque::new(),
            dropped: 0,
        }
    }

    /// Append an event, evicting the oldest when at capacity.
    pub fn record(
        &mut self,
        level: EventLevel,
        message: impl Into<String>,
        detail: Option<serde_json::Value>,
    ) {
        if self.events.len() == self.capacity {
            self.events.pop_front();
            self.dropped += 1;
        }
        self.events.push_back(DebugEvent {
            timestamp: Utc::now(),
            level,
            message: message.into(),
            detail,
        });
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.record(EventLevel::Info, message, None);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.record(EventLevel::Warn, message, None);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.record(EventLevel::Error, message, None);
    }

    pub fn error_with(&mut self, message: impl Into<String>, detail: serde_json::Value) {
        self.record(EventLevel::Error, message, Some(detail));
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// How many events have been evicted since creation.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn last(&self) -> Option<&DebugEvent> {
        self.events.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DebugEvent> {
        self.events.iter()
    }

    pub fn error_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| e.level == EventLevel::Error)
            .count()
    }

    /// The `n` most recent events, oldest first.
    pub fn recent(&self, n: usize) -> Vec<DebugEvent> {
        let skip = self.events.len().saturating_sub(n);
        self.events.iter().skip(skip).cloned().collect()
    }

    /// Render the timeline as display lines, oldest first.
    pub fn render(&self) -> String {
        let mut lines = Vec::with_capacity(self.events.len() + 1);
        if self.dropped > 0 {
            lines.push(format!("... {} earlier events dropped", self.dropped));
        }
        for event in &self.events {
            lines.push(format!(
                "{} {:<5} {}",
                event.timestamp.format("%H:%M:%S%.3f"),
                event.level.to_string(),
                event.message
            ));
        }
        lines.join("\n")
    }

    pub fn clear(&mut self) {
        self.events.clear();
        self.dropped = 0;
    }
}

impl Default for DebugTimeline {
    fn default() -> Self {
        Self::new()
    }
}
