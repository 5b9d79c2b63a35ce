//! Safe automatic fixes.
//!
//! Everything here preserves executable semantics: disallowed imports gain a
//! comment annotation (the import itself stays), and the rest is whitespace
//! normalization. The full pass is idempotent so hosts can apply it on every
//! round without drift.

use crate::files::GeneratedFile;

use super::rules;
use super::{AppliedFix, FixKind};

/// Comment placed above an import the preview cannot resolve.
pub(crate) const IMPORT_ANNOTATION: &str =
    "// Preview note: the import below is outside the allowed palette and will not resolve";

/// Apply all safe fixes to one file.
pub(crate) fn fix_file(
    file: &GeneratedFile,
    allowlist: &[String],
) -> (GeneratedFile, Vec<AppliedFix>) {
    let mut fixes = Vec::new();

    let normalized = normalize_line_endings(&file.content);
    if normalized != file.content {
        fixes.push(AppliedFix::new(
            &file.path,
            FixKind::LineEndings,
            "Normalized line endings to LF",
        ));
    }

    let (annotated, marked) = annotate_disallowed_imports(&normalized, allowlist);
    for spec in marked {
        fixes.push(AppliedFix::new(
            &file.path,
            FixKind::ImportAnnotated,
            format!("Annotated disallowed import '{spec}'"),
        ));
    }

    let trimmed = trim_trailing_whitespace(&annotated);
    if trimmed != annotated {
        fixes.push(AppliedFix::new(
            &file.path,
            FixKind::TrailingWhitespace,
            "Removed trailing whitespace",
        ));
    }

    let collapsed = collapse_blank_lines(&trimmed);
    if collapsed != trimmed {
        fixes.push(AppliedFix::new(
            &file.path,
            FixKind::BlankLines,
            "Collapsed excess blank lines",
        ));
    }

    (
        GeneratedFile {
            path: file.path.clone(),
            content: collapsed,
        },
        fixes,
    )
}

fn normalize_line_endings(content: &str) -> String {
    content.replace("\r\n", "\n").replace('\r', "\n")
}

/// Insert [`IMPORT_ANNOTATION`] above each disallowed import, keeping the
/// import itself. Lines already annotated are left alone.
fn annotate_disallowed_imports(content: &str, allowlist: &[String]) -> (String, Vec<String>) {
    let flagged = rules::disallowed_import_lines(content, allowlist);
    if flagged.is_empty() {
        return (content.to_string(), Vec::new());
    }

    let lines: Vec<&str> = content.lines().collect();
    let mut out: Vec<String> = Vec::with_capacity(lines.len() + flagged.len());
    let mut marked = Vec::new();

    for (idx, line) in lines.iter().enumerate() {
        let line_no = idx + 1;
        if let Some((_, spec)) = flagged.iter().find(|(l, _)| *l == line_no) {
            let already = idx > 0 && lines[idx - 1].trim() == IMPORT_ANNOTATION;
            if !already {
                out.push(IMPORT_ANNOTATION.to_string());
                marked.push(spec.clone());
            }
        }
        out.push((*line).to_string());
    }

    let mut result = out.join("\n");
    if content.ends_with('\n') {
        result.push('\n');
    }
    (result, marked)
}

fn trim_trailing_whitespace(content: &str) -> String {
    let trailing_newline = content.ends_with('\n');
    let mut result = content
        .lines()
        .map(|l| l.trim_end())
        .collect::<Vec<_>>()
        .join("\n");
    if trailing_newline {
        result.push('\n');
    }
    result
}

/// Collapse runs of blank lines to a single blank line and normalize the
/// tail to exactly one newline.
fn collapse_blank_lines(content: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    let mut previous_blank = false;
    for line in content.lines() {
        let blank = line.trim().is_empty();
        if blank && previous_blank {
            continue;
        }
        out.push(if blank { "" } else { line });
        previous_blank = blank;
    }
    while out.last().is_some_and(|l| l.is_empty()) {
        out.pop();
    }
    let mut result = out.join("\n");
    result.push('\n');
    result
}
