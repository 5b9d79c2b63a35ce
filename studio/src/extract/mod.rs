//! Response extraction: arbitrary model output into a normalized file set.
//!
//! `extract` never fails. It walks a fixed strategy list and stops at the
//! first strategy that yields at least one screened file; when all four come
//! up empty the result simply records that no valid code was found.

pub mod candidate;
pub mod json_repair;
pub mod strategies;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::files::GeneratedFile;
use strategies::STRATEGIES;

/// Raw generation output handed to the extractor.
///
/// Providers usually hand back plain text; hosts that already hold a
/// structured payload pass it through untouched.
#[derive(Debug, Clone)]
pub enum RawResponse {
    Text(String),
    Structured(serde_json::Value),
}

impl RawResponse {
    /// The textual face of the response, if it has one.
    pub fn text(&self) -> Option<&str> {
        match self {
            RawResponse::Text(s) => Some(s),
            RawResponse::Structured(v) => v.get("content").and_then(serde_json::Value::as_str),
        }
    }
}

impl From<String> for RawResponse {
    fn from(text: String) -> Self {
        RawResponse::Text(text)
    }
}

impl From<&str> for RawResponse {
    fn from(text: &str) -> Self {
        RawResponse::Text(text.to_string())
    }
}

impl From<serde_json::Value> for RawResponse {
    fn from(value: serde_json::Value) -> Self {
        RawResponse::Structured(value)
    }
}

/// Which strategy produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    DirectStructured,
    EmbeddedJson,
    FencedBlocks,
    HeuristicComponent,
    /// Files synthesized offline by the deterministic fallback, not extracted.
    Synthesized,
    /// No strategy yielded a valid file.
    None,
}

impl std::fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self {
            ExtractionMethod::DirectStructured => "direct_structured",
            ExtractionMethod::EmbeddedJson => "embedded_json",
            ExtractionMethod::FencedBlocks => "fenced_blocks",
            ExtractionMethod::HeuristicComponent => "heuristic_component",
            ExtractionMethod::Synthesized => "synthesized",
            ExtractionMethod::None => "none",
        };
        write!(f, "{tag}")
    }
}

/// Outcome of one extraction attempt.
///
/// Created fresh per attempt and never mutated afterward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub files: Vec<GeneratedFile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    pub has_valid_code: bool,
    pub method: ExtractionMethod,
}

impl ExtractionResult {
    /// The all-strategies-failed result.
    pub fn empty() -> Self {
        Self {
            files: Vec::new(),
            explanation: None,
            has_valid_code: false,
            method: ExtractionMethod::None,
        }
    }

    /// Wrap files produced offline rather than extracted from a response.
    pub fn synthesized(files: Vec<GeneratedFile>, explanation: Option<String>) -> Self {
        Self {
            has_valid_code: !files.is_empty(),
            files,
            explanation,
            method: ExtractionMethod::Synthesized,
        }
    }
}

/// Strategy-list extractor.
///
/// Stateless; construct one wherever needed and pass it by value. Hosts that
/// want a different screening or strategy mix wrap it rather than reaching
/// into globals.
#[derive(Debug, Clone, Copy, Default)]
pub struct Extractor;

impl Extractor {
    pub fn new() -> Self {
        Self
    }

    /// Try each strategy in order; the first yield wins. Never panics and
    /// never errors, whatever the input looks like.
    pub fn extract(&self, raw: &RawResponse) -> ExtractionResult {
        for (method, strategy) in STRATEGIES {
            match strategy(raw) {
                Some(yielded) => {
                    info!(
                        method = %method,
                        files = yielded.files.len(),
                        "Extraction succeeded"
                    );
                    return ExtractionResult {
                        files: yielded.files,
                        explanation: yielded.explanation,
                        has_valid_code: true,
                        method: *method,
                    };
                }
                None => debug!(method = %method, "Extraction strategy yielded nothing"),
            }
        }

        debug!("All extraction strategies exhausted");
        ExtractionResult::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fenced_response_yields_exactly_one_file() {
        let extractor = Extractor::new();
        let raw = RawResponse::from(
            "Sure! ```jsx\nexport default function App(){return <div/>}\n```",
        );

        let result = extractor.extract(&raw);
        assert!(result.has_valid_code);
        assert_eq!(result.method, ExtractionMethod::FencedBlocks);
        assert_eq!(result.files.len(), 1);
    }

    #[test]
    fn structured_response_wins_before_text_strategies() {
        let extractor = Extractor::new();
        let raw = RawResponse::from(json!({
            "files": [{"path": "src/App.tsx", "content": "export default function App(){ return <div>Hi</div>; }"}],
            "content": "```jsx\nexport default function Other(){return <p/>}\n```"
        }));

        let result = extractor.extract(&raw);
        assert_eq!(result.method, ExtractionMethod::DirectStructured);
        assert_eq!(result.files[0].path, "src/App.tsx");
    }

    #[test]
    fn embedded_json_beats_fenced_blocks_in_order() {
        let extractor = Extractor::new();
        let text = "{\"files\": [{\"path\": \"src/App.tsx\", \"content\": \"export default function App(){ return <div>Hi</div>; }\"}]}";

        let result = extractor.extract(&RawResponse::from(text));
        assert_eq!(result.method, ExtractionMethod::EmbeddedJson);
    }

    #[test]
    fn falls_through_to_heuristic() {
        let extractor = Extractor::new();
        let text = "No fences here.\n\nconst Counter = () => {\n  return <button>0</button>;\n};\n";

        let result = extractor.extract(&RawResponse::from(text));
        assert!(result.has_valid_code);
        assert_eq!(result.method, ExtractionMethod::HeuristicComponent);
        assert!(result.files[0].content.contains("export default Counter;"));
    }

    #[test]
    fn garbage_inputs_yield_invalid_not_panic() {
        let extractor = Extractor::new();
        for text in ["", "   ", "{{{{", "just some prose", "```\nplain words\n```"] {
            let result = extractor.extract(&RawResponse::from(text));
            assert!(!result.has_valid_code, "input {text:?} should not validate");
            assert!(result.files.is_empty());
            assert_eq!(result.method, ExtractionMethod::None);
        }
    }

    #[test]
    fn placeholder_content_fails_every_strategy() {
        let extractor = Extractor::new();
        let raw = RawResponse::from(
            "```jsx\nexport default function App(){ /* TODO: implement this */ return <div/> }\n```",
        );

        let result = extractor.extract(&raw);
        assert!(!result.has_valid_code);
    }

    #[test]
    fn method_serializes_snake_case() {
        let json = serde_json::to_string(&ExtractionMethod::FencedBlocks).unwrap();
        assert_eq!(json, "\"fenced_blocks\"");
        assert_eq!(ExtractionMethod::FencedBlocks.to_string(), "fenced_blocks");
    }
}
