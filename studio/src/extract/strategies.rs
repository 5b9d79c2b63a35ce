//! The four extraction strategies, in fixed application order.
//!
//! Each strategy is a pure function of the raw response: it either yields at
//! least one screened file or steps aside. No strategy sees the outcome of
//! another; the dispatcher in the parent module stops at the first yield.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use super::candidate;
use super::json_repair::lenient_parse_object;
use super::{ExtractionMethod, RawResponse};
use crate::files::GeneratedFile;

/// What a single strategy recovered.
#[derive(Debug, Clone)]
pub struct StrategyYield {
    pub files: Vec<GeneratedFile>,
    pub explanation: Option<String>,
}

pub type StrategyFn = fn(&RawResponse) -> Option<StrategyYield>;

/// First-match order. The dispatcher walks this table top to bottom.
pub const STRATEGIES: &[(ExtractionMethod, StrategyFn)] = &[
    (ExtractionMethod::DirectStructured, direct_structured),
    (ExtractionMethod::EmbeddedJson, embedded_json),
    (ExtractionMethod::FencedBlocks, fenced_blocks),
    (ExtractionMethod::HeuristicComponent, heuristic_component),
];

static FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```([A-Za-z0-9_+#.-]*)[ \t]*\r?\n(.*?)```")
        .expect("fence regex should compile")
});

static PATH_HINT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9_@][\w@.\-]*(?:/[\w@.\-]+)*\.(?:jsx|tsx|js|ts|mjs|html|css)\b")
        .expect("path hint regex should compile")
});

static DECL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^[ \t]*(?:export[ \t]+(?:default[ \t]+)?)?(?:async[ \t]+)?(?:function[ \t]+([A-Z][A-Za-z0-9_]*)[ \t]*\(|const[ \t]+([A-Z][A-Za-z0-9_]*)[ \t]*=|class[ \t]+([A-Z][A-Za-z0-9_]*)\b)",
    )
    .expect("declaration regex should compile")
});

/// Strategy 1: the response is already a structured value with a files array.
fn direct_structured(raw: &RawResponse) -> Option<StrategyYield> {
    let value = match raw {
        RawResponse::Structured(v) => v,
        RawResponse::Text(_) => return None,
    };

    let files = screened(files_from_value(value));
    if files.is_empty() {
        return None;
    }
    Some(StrategyYield {
        files,
        explanation: explanation_from_value(value),
    })
}

/// Strategy 2: a JSON object with a files array buried in response text.
fn embedded_json(raw: &RawResponse) -> Option<StrategyYield> {
    let text = raw.text()?;
    let value = lenient_parse_object(text)?;

    let files = screened(files_from_value(&value));
    if files.is_empty() {
        return None;
    }
    Some(StrategyYield {
        files,
        explanation: explanation_from_value(&value),
    })
}

/// Strategy 3: fenced code blocks with source-language tags. A path named
/// in the block's first comment line (or the prose line right before the
/// fence) wins; blocks without a hint get sequential default paths.
fn fenced_blocks(raw: &RawResponse) -> Option<StrategyYield> {
    let text = raw.text()?;

    let mut files = Vec::new();
    for caps in FENCE_RE.captures_iter(text) {
        let tag = caps.get(1).map(|m| m.as_str()).unwrap_or("");
        let Some(ext) = tag_extension(tag) else {
            continue;
        };
        let body = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        let fence_start = caps.get(0).map_or(0, |m| m.start());

        let (comment_hint, body) = split_comment_hint(body);
        let path = comment_hint
            .or_else(|| preceding_line_hint(&text[..fence_start]))
            .unwrap_or_else(|| {
                if files.is_empty() {
                    format!("src/App.{ext}")
                } else {
                    format!("src/Component{}.{}", files.len() + 1, ext)
                }
            });
        let file = GeneratedFile::new(path, body.trim_matches('\n'));
        if candidate::screen(&file).is_ok() {
            files.push(file);
        }
    }

    if files.is_empty() {
        return None;
    }

    let prose = FENCE_RE.replace_all(text, "");
    let prose = prose.trim();
    Some(StrategyYield {
        files,
        explanation: (!prose.is_empty()).then(|| prose.to_string()),
    })
}

/// Strategy 4: a bare component declaration in free text. Slices from the
/// first top-level declaration to the last closing brace and appends a
/// default export when the declaration lacks one.
fn heuristic_component(raw: &RawResponse) -> Option<StrategyYield> {
    let text = raw.text()?;
    let caps = DECL_RE.captures(text)?;
    let decl_start = caps.get(0)?.start();

    let tail = &text[decl_start..];
    let code = match tail.rfind('}') {
        Some(end) => &tail[..=end],
        None => tail,
    };

    let mut content = code.trim_matches('\n').to_string();
    if !candidate::has_export(&content) {
        let name = caps
            .get(1)
            .or_else(|| caps.get(2))
            .or_else(|| caps.get(3))?
            .as_str();
        content.push_str(&format!("\n\nexport default {name};\n"));
    }

    let file = GeneratedFile::new("src/App.jsx", content);
    candidate::screen(&file).ok()?;

    let prose = text[..decl_start].trim();
    Some(StrategyYield {
        files: vec![file],
        explanation: (!prose.is_empty()).then(|| prose.to_string()),
    })
}

/// When the block opens with a comment that is nothing but a path, that
/// path names the file and the marker line is dropped from the content.
fn split_comment_hint(body: &str) -> (Option<String>, &str) {
    let trimmed = body.trim_start_matches('\n');
    let (first, rest) = trimmed.split_once('\n').unwrap_or((trimmed, ""));
    let line = first.trim();

    let comment = line
        .strip_prefix("//")
        .or_else(|| line.strip_prefix("/*").and_then(|s| s.strip_suffix("*/")))
        .or_else(|| line.strip_prefix("<!--").and_then(|s| s.strip_suffix("-->")));
    let Some(text) = comment.map(str::trim) else {
        return (None, body);
    };
    match PATH_HINT_RE.find(text) {
        Some(m) if m.start() == 0 && m.end() == text.len() => (Some(m.as_str().to_string()), rest),
        _ => (None, body),
    }
}

/// A path mentioned in the last non-empty prose line before the fence,
/// e.g. "Save this as src/components/Header.jsx:".
fn preceding_line_hint(before_fence: &str) -> Option<String> {
    let line = before_fence.lines().rev().find(|l| !l.trim().is_empty())?;
    PATH_HINT_RE.find(line).map(|m| m.as_str().to_string())
}

fn screened(files: Vec<GeneratedFile>) -> Vec<GeneratedFile> {
    files
        .into_iter()
        .filter(|f| match candidate::screen(f) {
            Ok(()) => true,
            Err(reason) => {
                tracing::debug!(path = %f.path, %reason, "Rejected extraction candidate");
                false
            }
        })
        .collect()
}

/// Pull a files array out of a structured value. Accepts a bare array, a
/// `files` field, or a `data.files` field; entries may alias their keys.
fn files_from_value(value: &Value) -> Vec<GeneratedFile> {
    let array = if let Some(arr) = value.as_array() {
        Some(arr)
    } else {
        value
            .get("files")
            .or_else(|| value.get("data").and_then(|d| d.get("files")))
            .and_then(Value::as_array)
    };

    array
        .map(|entries| entries.iter().filter_map(file_from_entry).collect())
        .unwrap_or_default()
}

fn file_from_entry(entry: &Value) -> Option<GeneratedFile> {
    let path = ["path", "filename", "file", "name"]
        .iter()
        .find_map(|k| entry.get(*k).and_then(Value::as_str))?;
    let content = ["content", "code", "source"]
        .iter()
        .find_map(|k| entry.get(*k).and_then(Value::as_str))?;
    if path.trim().is_empty() || content.trim().is_empty() {
        return None;
    }
    Some(GeneratedFile::new(path, content))
}

fn explanation_from_value(value: &Value) -> Option<String> {
    ["explanation", "description", "summary"]
        .iter()
        .find_map(|k| value.get(*k).and_then(Value::as_str))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn tag_extension(tag: &str) -> Option<&'static str> {
    match tag.to_ascii_lowercase().as_str() {
        // Untagged fences are common; treat them as JSX and let screening
        // reject the ones that are actually prose.
        "" | "jsx" => Some("jsx"),
        "tsx" => Some("tsx"),
        "js" | "javascript" => Some("js"),
        "ts" | "typescript" => Some("ts"),
        "html" => Some("html"),
        "css" => Some("css"),
        _ => None,
    }
}
