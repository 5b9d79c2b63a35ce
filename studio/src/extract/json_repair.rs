//! Tolerant JSON recovery for model responses.
//!
//! Models wrap JSON in markdown fences, lead with prose, leave trailing
//! commas, and sometimes emit single-quoted or bare-keyed objects. The
//! helpers here peel those layers off with exactly one repair pass; anything
//! still unparseable after that is left for the next extraction strategy.

use std::sync::LazyLock;

use regex::Regex;

static TRAILING_COMMA_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r",\s*([}\]])").expect("trailing comma regex should compile")
});

static BARE_KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([{,]\s*)([A-Za-z_][A-Za-z0-9_]*)(\s*):"#).expect("bare key regex should compile")
});

/// Strip a single layer of markdown code fences from a response.
pub fn strip_markdown_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let clean = if trimmed.starts_with("```json") {
        trimmed.strip_prefix("```json").unwrap_or(trimmed)
    } else if trimmed.starts_with("```") {
        trimmed.strip_prefix("```").unwrap_or(trimmed)
    } else {
        trimmed
    };
    let clean = if clean.ends_with("```") {
        clean.strip_suffix("```").unwrap_or(clean)
    } else {
        clean
    };
    clean.trim()
}

/// The outermost `{...}` span of the text, prose on either side discarded.
pub fn outermost_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if start <= end {
        Some(&text[start..=end])
    } else {
        None
    }
}

/// One bounded repair pass over a JSON fragment.
///
/// Fixes, in order: smart quotes, fully single-quoted objects, bare keys,
/// trailing commas, stray control characters. Deliberately not iterated; a
/// fragment that survives none of this is not worth more effort.
pub fn repair_json(fragment: &str) -> String {
    let mut fixed = fragment.to_string();

    fixed = fixed.replace('\u{201C}', "\"").replace('\u{201D}', "\"");
    fixed = fixed.replace('\u{2018}', "'").replace('\u{2019}', "'");

    // Swapping quote style wholesale is only safe when the fragment uses no
    // double quotes at all; otherwise apostrophes inside values would break.
    if !fixed.contains('"') {
        fixed = fixed.replace('\'', "\"");
    }

    fixed = BARE_KEY_RE.replace_all(&fixed, "$1\"$2\"$3:").into_owned();
    fixed = TRAILING_COMMA_RE.replace_all(&fixed, "$1").into_owned();

    fixed
        .chars()
        .filter(|c| !c.is_control() || matches!(c, '\n' | '\t' | '\r'))
        .collect()
}

/// Parse a JSON object out of free text: direct parse, then fence-stripped
/// outermost span, then one repaired reparse. `None` means give up.
pub fn lenient_parse_object(text: &str) -> Option<serde_json::Value> {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(text) {
        if value.is_object() {
            return Some(value);
        }
    }

    let clean = strip_markdown_fences(text);
    let fragment = outermost_object(clean)?;

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(fragment) {
        if value.is_object() {
            return Some(value);
        }
    }

    let repaired = repair_json(fragment);
    match serde_json::from_str::<serde_json::Value>(&repaired) {
        Ok(value) if value.is_object() => Some(value),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strips_fences_with_and_without_language_tag() {
        assert_eq!(strip_markdown_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_markdown_fences("```\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_markdown_fences("{\"a\":1}"), "{\"a\":1}");
    }

    #[test]
    fn outermost_object_skips_surrounding_prose() {
        let text = "Here you go: {\"files\": []} hope that helps!";
        assert_eq!(outermost_object(text), Some("{\"files\": []}"));
        assert_eq!(outermost_object("no json here"), None);
        assert_eq!(outermost_object("} backwards {"), None);
    }

    #[test]
    fn repairs_trailing_commas_and_bare_keys() {
        let broken = r#"{files: [{path: "src/App.tsx", content: "x",},],}"#;
        let repaired = repair_json(broken);
        let value: serde_json::Value = serde_json::from_str(&repaired).unwrap();
        assert_eq!(value["files"][0]["path"], "src/App.tsx");
    }

    #[test]
    fn repairs_fully_single_quoted_objects() {
        let broken = "{'path': 'src/App.tsx'}";
        let repaired = repair_json(broken);
        let value: serde_json::Value = serde_json::from_str(&repaired).unwrap();
        assert_eq!(value["path"], "src/App.tsx");
    }

    #[test]
    fn leaves_apostrophes_alone_when_double_quotes_present() {
        let text = r#"{"message": "it's fine"}"#;
        assert_eq!(repair_json(text), text);
    }

    #[test]
    fn normalizes_smart_quotes() {
        let broken = "{\u{201C}a\u{201D}: 1}";
        let value: serde_json::Value = serde_json::from_str(&repair_json(broken)).unwrap();
        assert_eq!(value, json!({"a": 1}));
    }

    #[test]
    fn lenient_parse_handles_each_layer() {
        assert!(lenient_parse_object(r#"{"a": 1}"#).is_some());
        assert!(lenient_parse_object("```json\n{\"a\": 1}\n```").is_some());
        assert!(lenient_parse_object("Sure! {\"a\": 1,} done").is_some());
        assert!(lenient_parse_object("nothing to see").is_none());
        // Arrays are not objects; strategy callers want objects only.
        assert!(lenient_parse_object("[1, 2, 3]").is_none());
    }
}
