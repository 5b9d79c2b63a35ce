//! Per-file validation checks.
//!
//! All checks are lexical: generated code may not even parse, so every rule
//! works on lines and pattern matches rather than a syntax tree. Each check
//! returns issues with 1-based line/column positions.

use std::sync::LazyLock;

use regex::Regex;

use crate::extract::candidate;
use crate::files::{FileKind, GeneratedFile};

use super::{IssueCode, ValidationIssue};

static IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^[ \t]*import\s+(?:type\s+)?(?:[\w$*{},\s]+?\s+from\s+)?['"]([^'"]+)['"]"#)
        .expect("import regex should compile")
});

static REQUIRE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:\brequire|\bimport)\(\s*['"]([^'"]+)['"]\s*\)"#)
        .expect("require regex should compile")
});

static COLOR_UTILITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:bg|text|border|from|to|ring|fill|stroke)-(?:red|blue|green|yellow|purple|pink|orange|teal|cyan|indigo|lime|emerald|rose|amber|violet|fuchsia|sky|slate|gray|zinc|neutral|stone)-\d{2,3}\b",
    )
    .expect("color utility regex should compile")
});

static FUNCTION_STYLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"function\s+[A-Z]\w*\s*\(|const\s+[A-Z]\w*\s*=\s*(?:async\s*)?(?:\(|[\w$]+\s*=>)|export\s+default\s+(?:async\s+)?(?:function\b|\()")
        .expect("function style regex should compile")
});

static CLASS_STYLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"class\s+[A-Z]\w*").expect("class style regex should compile")
});

static RENDER_EVIDENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\breturn\b|=>\s*[(<]").expect("render evidence regex should compile")
});

static RENDER_METHOD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"render\s*\(").expect("render method regex should compile"));

// Tag scans must not stop at the `>` inside attribute expressions like
// `onChange={(e) => ...}`, so attributes are matched as plain chars or
// brace groups (one nesting level, enough for `style={{...}}`).
static IMG_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<img\b(?:[^>{]|\{(?:[^{}]|\{[^{}]*\})*\})*/?>")
        .expect("img tag regex should compile")
});

static FORM_CONTROL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<(?:input|select|textarea)\b(?:[^>{]|\{(?:[^{}]|\{[^{}]*\})*\})*/?>")
        .expect("form control regex should compile")
});

static BUTTON_OPEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<button\b((?:[^>{]|\{(?:[^{}]|\{[^{}]*\})*\})*)>")
        .expect("button regex should compile")
});

static TAG_STRIP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("tag strip regex should compile"));

// String-form timers take a code string instead of a callback; they are
// eval in disguise and the needle table cannot express the quote that
// follows the open paren.
static STRING_TIMER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\bset(?:Timeout|Interval)\s*\(\s*['"`]"#)
        .expect("string timer regex should compile")
});

/// A dangerous-API needle and how to report it.
struct ApiPattern {
    needle: &'static str,
    code: IssueCode,
    message: &'static str,
}

const API_PATTERNS: &[ApiPattern] = &[
    ApiPattern {
        needle: "eval(",
        code: IssueCode::DangerousApi,
        message: "Dynamic code execution via eval()",
    },
    ApiPattern {
        needle: "new Function",
        code: IssueCode::DangerousApi,
        message: "Dynamic code execution via the Function constructor",
    },
    ApiPattern {
        needle: "document.write(",
        code: IssueCode::DangerousApi,
        message: "Direct document mutation via document.write()",
    },
    ApiPattern {
        needle: "fetch(",
        code: IssueCode::NetworkCall,
        message: "Outbound network call via fetch()",
    },
    ApiPattern {
        needle: "XMLHttpRequest",
        code: IssueCode::NetworkCall,
        message: "Outbound network call via XMLHttpRequest",
    },
    ApiPattern {
        needle: "axios.",
        code: IssueCode::NetworkCall,
        message: "Outbound network call via axios",
    },
    ApiPattern {
        needle: "new WebSocket",
        code: IssueCode::NetworkCall,
        message: "Outbound network connection via WebSocket",
    },
    ApiPattern {
        needle: "sendBeacon",
        code: IssueCode::NetworkCall,
        message: "Outbound network call via sendBeacon",
    },
];

/// Every non-relative import must match the allowlist.
pub(crate) fn check_imports(file: &GeneratedFile, allowlist: &[String]) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    for caps in IMPORT_RE
        .captures_iter(&file.content)
        .chain(REQUIRE_RE.captures_iter(&file.content))
    {
        let Some(spec) = caps.get(1) else { continue };
        let target = spec.as_str();
        if is_relative(target) || import_allowed(target, allowlist) {
            continue;
        }
        let (line, column) = position(&file.content, spec.start());
        issues.push(ValidationIssue::new(
            &file.path,
            line,
            column,
            format!("Import '{target}' is not in the allowed package list"),
            IssueCode::DisallowedImport,
        ));
    }
    issues
}

/// Returns the disallowed import specifiers with the line each sits on.
/// Shared with auto-fix so annotation and detection never disagree.
pub(crate) fn disallowed_import_lines(
    content: &str,
    allowlist: &[String],
) -> Vec<(usize, String)> {
    IMPORT_RE
        .captures_iter(content)
        .filter_map(|caps| {
            let spec = caps.get(1)?;
            let target = spec.as_str();
            if is_relative(target) || import_allowed(target, allowlist) {
                return None;
            }
            let (line, _) = position(content, spec.start());
            Some((line, target.to_string()))
        })
        .collect()
}

fn is_relative(target: &str) -> bool {
    target.starts_with('.') || target.starts_with('/')
}

/// Allowlist entries are exact package names or `prefix/*` patterns; an
/// exact entry also covers its subpaths (`react-dom` allows `react-dom/client`).
pub(crate) fn import_allowed(target: &str, allowlist: &[String]) -> bool {
    allowlist.iter().any(|entry| {
        if let Some(prefix) = entry.strip_suffix("/*") {
            target == prefix || target.starts_with(&format!("{prefix}/"))
        } else {
            target == entry || target.starts_with(&format!("{entry}/"))
        }
    })
}

/// Dynamic code execution and outbound network calls.
pub(crate) fn check_dangerous_apis(file: &GeneratedFile) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    for (idx, line) in file.content.lines().enumerate() {
        for pattern in API_PATTERNS {
            if let Some(col) = line.find(pattern.needle) {
                issues.push(ValidationIssue::new(
                    &file.path,
                    idx + 1,
                    col + 1,
                    pattern.message,
                    pattern.code,
                ));
            }
        }
        if let Some(m) = STRING_TIMER_RE.find(line) {
            issues.push(ValidationIssue::new(
                &file.path,
                idx + 1,
                m.start() + 1,
                "Dynamic code execution via a string-form timer",
                IssueCode::DangerousApi,
            ));
        }
    }
    issues
}

/// Entry declaration, export, render evidence, balanced delimiters.
/// Component files only; stylesheets and data files have no structure to check.
pub(crate) fn check_structure(file: &GeneratedFile) -> Vec<ValidationIssue> {
    if file.kind() != FileKind::Component {
        return Vec::new();
    }

    let content = &file.content;
    let mut issues = Vec::new();

    if !candidate::has_entry_construct(content) {
        issues.push(ValidationIssue::new(
            &file.path,
            1,
            1,
            "No component declaration found",
            IssueCode::MissingEntry,
        ));
    }
    if !candidate::has_export(content) {
        issues.push(ValidationIssue::new(
            &file.path,
            1,
            1,
            "No export statement found",
            IssueCode::MissingExport,
        ));
    }

    let renders = if CLASS_STYLE_RE.is_match(content) {
        RENDER_METHOD_RE.is_match(content)
    } else if FUNCTION_STYLE_RE.is_match(content) {
        RENDER_EVIDENCE_RE.is_match(content)
    } else {
        true
    };
    if !renders {
        issues.push(ValidationIssue::new(
            &file.path,
            1,
            1,
            "Component never returns renderable output",
            IssueCode::MissingRender,
        ));
    }

    let tally = tally_delimiters(content);
    for ((opens, closes), (open, close, name)) in [
        (tally.braces, ('{', '}', "braces")),
        (tally.parens, ('(', ')', "parentheses")),
    ] {
        if opens != closes {
            issues.push(ValidationIssue::new(
                &file.path,
                1,
                1,
                format!("Unbalanced {name}: {opens} '{open}' vs {closes} '{close}'"),
                IssueCode::UnbalancedDelimiters,
            ));
        }
    }

    issues
}

#[derive(Debug, Default)]
struct DelimiterTally {
    /// (opens, closes)
    braces: (usize, usize),
    parens: (usize, usize),
}

/// Counts braces and parens in code context only: string literals and
/// comments are skipped, so `":)"` or `// :(` never unbalances a file.
/// Single- and double-quoted strings that run past a newline are treated
/// as terminated there, which bounds the damage of an unescaped quote.
fn tally_delimiters(content: &str) -> DelimiterTally {
    #[derive(Clone, Copy)]
    enum State {
        Code,
        Str(char),
        LineComment,
        BlockComment,
    }

    let mut tally = DelimiterTally::default();
    let mut state = State::Code;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        match state {
            State::Code => match c {
                '\'' | '"' | '`' => state = State::Str(c),
                '/' => match chars.peek() {
                    Some('/') => {
                        chars.next();
                        state = State::LineComment;
                    }
                    Some('*') => {
                        chars.next();
                        state = State::BlockComment;
                    }
                    _ => {}
                },
                '{' => tally.braces.0 += 1,
                '}' => tally.braces.1 += 1,
                '(' => tally.parens.0 += 1,
                ')' => tally.parens.1 += 1,
                _ => {}
            },
            State::Str(quote) => {
                if c == '\\' {
                    chars.next();
                } else if c == quote || (c == '\n' && quote != '`') {
                    state = State::Code;
                }
            }
            State::LineComment => {
                if c == '\n' {
                    state = State::Code;
                }
            }
            State::BlockComment => {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    state = State::Code;
                }
            }
        }
    }
    tally
}

/// Hardcoded color utilities and inline style objects. Warnings only.
pub(crate) fn check_style(file: &GeneratedFile) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    for (idx, line) in file.content.lines().enumerate() {
        if let Some(m) = COLOR_UTILITY_RE.find(line) {
            issues.push(ValidationIssue::new(
                &file.path,
                idx + 1,
                m.start() + 1,
                format!("Hardcoded color utility '{}'; use theme tokens", m.as_str()),
                IssueCode::HardcodedColor,
            ));
        }
        if let Some(col) = line.find("style={{") {
            issues.push(ValidationIssue::new(
                &file.path,
                idx + 1,
                col + 1,
                "Inline style object; prefer utility classes",
                IssueCode::InlineStyle,
            ));
        }
    }
    issues
}

/// Images without alt text, form controls and buttons without labels.
/// Warnings only.
pub(crate) fn check_accessibility(file: &GeneratedFile) -> Vec<ValidationIssue> {
    let content = &file.content;
    let mut issues = Vec::new();

    for m in IMG_TAG_RE.find_iter(content) {
        if !m.as_str().contains("alt=") {
            let (line, column) = position(content, m.start());
            issues.push(ValidationIssue::new(
                &file.path,
                line,
                column,
                "Image without alt text",
                IssueCode::ImgMissingAlt,
            ));
        }
    }

    for m in FORM_CONTROL_RE.find_iter(content) {
        let tag = m.as_str();
        let labeled = ["aria-label=", "aria-labelledby=", "placeholder=", "id="]
            .iter()
            .any(|attr| tag.contains(attr));
        if !labeled {
            let (line, column) = position(content, m.start());
            issues.push(ValidationIssue::new(
                &file.path,
                line,
                column,
                "Form control without an accessible label",
                IssueCode::ControlMissingLabel,
            ));
        }
    }

    for caps in BUTTON_OPEN_RE.captures_iter(content) {
        let attrs = caps.get(1).map(|m| m.as_str()).unwrap_or("");
        if attrs.contains("aria-label") {
            continue;
        }
        let Some(open) = caps.get(0) else { continue };
        let Some(close_rel) = content[open.end()..].find("</button>") else {
            continue;
        };
        let inner = &content[open.end()..open.end() + close_rel];
        let text = TAG_STRIP_RE.replace_all(inner, " ");
        if !text.chars().any(|c| c.is_alphanumeric()) {
            let (line, column) = position(content, open.start());
            issues.push(ValidationIssue::new(
                &file.path,
                line,
                column,
                "Button without an accessible label",
                IssueCode::ControlMissingLabel,
            ));
        }
    }

    issues
}

/// 1-based (line, column) for a byte offset.
pub(crate) fn position(content: &str, offset: usize) -> (usize, usize) {
    let prefix = &content[..offset];
    let line = prefix.matches('\n').count() + 1;
    let column = offset - prefix.rfind('\n').map(|i| i + 1).unwrap_or(0) + 1;
    (line, column)
}
