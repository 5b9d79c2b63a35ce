//! Uniform structural screening for extracted file candidates.
//!
//! Every extraction strategy runs its candidates through [`screen`] before
//! claiming a win, so the acceptance bar is identical no matter how a file
//! was recovered from the raw response.

use std::sync::LazyLock;

use regex::Regex;

use crate::files::{FileKind, GeneratedFile};

/// A placeholder marker whose presence disqualifies a candidate.
struct Marker {
    needle: &'static str,
    case_sensitive: bool,
}

/// Content containing any of these is stubbed-out, not generated.
/// `TODO`/`FIXME` stay case-sensitive so identifiers like `TodoList` pass.
const PLACEHOLDER_MARKERS: &[Marker] = &[
    Marker {
        needle: "TODO",
        case_sensitive: true,
    },
    Marker {
        needle: "FIXME",
        case_sensitive: true,
    },
    Marker {
        needle: "implement this",
        case_sensitive: false,
    },
    Marker {
        needle: "your code here",
        case_sensitive: false,
    },
    Marker {
        needle: "code goes here",
        case_sensitive: false,
    },
    Marker {
        needle: "rest of the code",
        case_sensitive: false,
    },
    Marker {
        needle: "remaining code",
        case_sensitive: false,
    },
];

static ENTRY_CONSTRUCT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"function\s+[A-Z]\w*\s*\(|const\s+[A-Z]\w*\s*=|class\s+[A-Z]\w*|export\s+default")
        .expect("entry construct regex should compile")
});

static EXPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*export\s+(?:default\b|const\b|function\b|class\b|\{)|module\.exports")
        .expect("export regex should compile")
});

static OPEN_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[A-Za-z][A-Za-z0-9]*").expect("open tag regex should compile"));

/// Why a candidate was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    EmptyPath,
    EmptyContent,
    Placeholder { marker: &'static str },
    NoEntryConstruct,
    NoExport,
    NoMarkup,
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rejection::EmptyPath => write!(f, "empty path"),
            Rejection::EmptyContent => write!(f, "empty content"),
            Rejection::Placeholder { marker } => write!(f, "placeholder marker '{marker}'"),
            Rejection::NoEntryConstruct => write!(f, "no entry construct"),
            Rejection::NoExport => write!(f, "no export statement"),
            Rejection::NoMarkup => write!(f, "no markup-like syntax"),
        }
    }
}

/// Screen one candidate file.
///
/// All candidates need a non-empty path and content free of placeholder
/// markers. Component files additionally need an entry construct, an export,
/// and at least one paired angle-bracket tag; stylesheets and data files are
/// exempt from those three.
pub fn screen(file: &GeneratedFile) -> Result<(), Rejection> {
    if file.path.trim().is_empty() {
        return Err(Rejection::EmptyPath);
    }
    if file.content.trim().is_empty() {
        return Err(Rejection::EmptyContent);
    }
    if let Some(marker) = placeholder_marker(&file.content) {
        return Err(Rejection::Placeholder { marker });
    }

    if file.kind() == FileKind::Component {
        if !has_entry_construct(&file.content) {
            return Err(Rejection::NoEntryConstruct);
        }
        if !has_export(&file.content) {
            return Err(Rejection::NoExport);
        }
        if !has_markup(&file.content) {
            return Err(Rejection::NoMarkup);
        }
    }

    Ok(())
}

fn placeholder_marker(content: &str) -> Option<&'static str> {
    let lowered = content.to_lowercase();
    PLACEHOLDER_MARKERS.iter().find_map(|m| {
        let hit = if m.case_sensitive {
            content.contains(m.needle)
        } else {
            lowered.contains(m.needle)
        };
        hit.then_some(m.needle)
    })
}

pub(crate) fn has_entry_construct(content: &str) -> bool {
    ENTRY_CONSTRUCT_RE.is_match(content)
}

pub(crate) fn has_export(content: &str) -> bool {
    EXPORT_RE.is_match(content)
}

/// Markup evidence: an opening tag plus a closing (`</`) or self-closing
/// (`/>`) counterpart somewhere in the file.
pub(crate) fn has_markup(content: &str) -> bool {
    OPEN_TAG_RE.is_match(content) && (content.contains("</") || content.contains("/>"))
}
