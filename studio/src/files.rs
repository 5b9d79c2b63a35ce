//! In-memory source file values shared by every pipeline stage.
//!
//! Nothing in this crate touches a real filesystem: a [`GeneratedFile`] is a
//! virtual (path, content) pair that flows by value from extraction through
//! validation into preview sessions. Paths are repo-relative identifiers,
//! slash-separated, and normalized on construction so downstream comparisons
//! never have to re-handle `./` prefixes or backslashes.

use serde::{Deserialize, Serialize};

/// One virtual source file produced by extraction or fallback synthesis.
///
/// Both fields are expected to be non-empty; candidates that violate this are
/// rejected at the extraction boundary rather than carried forward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedFile {
    pub path: String,
    pub content: String,
}

impl GeneratedFile {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: normalize_path(&path.into()),
            content: content.into(),
        }
    }

    /// Final path segment, e.g. `App.tsx` for `src/App.tsx`.
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// File name without its extension. Paths may legitimately have no
    /// extension at all (`src/App`), in which case the whole name is the stem.
    pub fn stem(&self) -> &str {
        let name = self.file_name();
        match name.rfind('.') {
            Some(0) | None => name,
            Some(idx) => &name[..idx],
        }
    }

    /// Lowercased extension without the dot; empty when the path has none.
    pub fn extension(&self) -> String {
        let name = self.file_name();
        match name.rfind('.') {
            Some(0) | None => String::new(),
            Some(idx) => name[idx + 1..].to_ascii_lowercase(),
        }
    }

    pub fn kind(&self) -> FileKind {
        match self.extension().as_str() {
            "tsx" | "jsx" => FileKind::Component,
            // Extension-less paths are overwhelmingly script modules in
            // generated output (`src/App`), so treat them as components too.
            "ts" | "js" | "mjs" | "" => FileKind::Component,
            "css" => FileKind::Stylesheet,
            "html" | "htm" | "svg" => FileKind::Markup,
            "json" => FileKind::Data,
            _ => FileKind::Other,
        }
    }

}

/// Coarse classification of a generated path, by extension only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    Component,
    Stylesheet,
    Markup,
    Data,
    Other,
}

/// Normalize a raw path into the canonical repo-relative form: forward
/// slashes, no leading `./` or `/`, no empty segments.
pub fn normalize_path(raw: &str) -> String {
    let cleaned = raw.trim().replace('\\', "/");
    let mut parts: Vec<&str> = Vec::new();
    for segment in cleaned.split('/') {
        match segment {
            "" | "." => continue,
            other => parts.push(other),
        }
    }
    parts.join("/")
}

/// Pick the file a preview session should mount.
///
/// Preference order: a component named `App`, then `index`/`main`, then the
/// first component carrying a default export, then any component at all.
pub fn entry_file(files: &[GeneratedFile]) -> Option<&GeneratedFile> {
    let components: Vec<&GeneratedFile> = files
        .iter()
        .filter(|f| f.kind() == FileKind::Component)
        .collect();

    components
        .iter()
        .find(|f| f.stem().eq_ignore_ascii_case("app"))
        .or_else(|| {
            components.iter().find(|f| {
                let stem = f.stem().to_ascii_lowercase();
                stem == "index" || stem == "main"
            })
        })
        .or_else(|| {
            components
                .iter()
                .find(|f| f.content.contains("export default"))
        })
        .copied()
        .or_else(|| components.first().copied())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_path_separators_and_prefixes() {
        assert_eq!(normalize_path("./src/App.tsx"), "src/App.tsx");
        assert_eq!(normalize_path("src\\components\\Card.jsx"), "src/components/Card.jsx");
        assert_eq!(normalize_path("/src//App.tsx"), "src/App.tsx");
    }

    #[test]
    fn stem_and_extension_handle_missing_dot() {
        let file = GeneratedFile::new("src/App", "export default function App() {}");
        assert_eq!(file.stem(), "App");
        assert_eq!(file.extension(), "");
        assert_eq!(file.kind(), FileKind::Component);
    }

    #[test]
    fn dotfiles_are_not_split_into_empty_stems() {
        let file = GeneratedFile::new(".eslintrc", "{}");
        assert_eq!(file.stem(), ".eslintrc");
        assert_eq!(file.extension(), "");
    }

    #[test]
    fn classifies_kinds_by_extension() {
        assert_eq!(GeneratedFile::new("src/App.tsx", "x").kind(), FileKind::Component);
        assert_eq!(GeneratedFile::new("styles/main.css", "x").kind(), FileKind::Stylesheet);
        assert_eq!(GeneratedFile::new("index.html", "x").kind(), FileKind::Markup);
        assert_eq!(GeneratedFile::new("package.json", "x").kind(), FileKind::Data);
        assert_eq!(GeneratedFile::new("README.md", "x").kind(), FileKind::Other);
    }

    #[test]
    fn entry_prefers_app_over_other_components() {
        let files = vec![
            GeneratedFile::new("src/Header.tsx", "export default function Header() {}"),
            GeneratedFile::new("src/App.tsx", "export default function App() {}"),
        ];
        assert_eq!(entry_file(&files).map(|f| f.path.as_str()), Some("src/App.tsx"));
    }

    #[test]
    fn entry_falls_back_to_default_export_then_any_component() {
        let files = vec![
            GeneratedFile::new("styles/theme.css", ".a {}"),
            GeneratedFile::new("src/Widget.tsx", "export default function Widget() {}"),
        ];
        assert_eq!(entry_file(&files).map(|f| f.path.as_str()), Some("src/Widget.tsx"));

        let only_style = vec![GeneratedFile::new("styles/theme.css", ".a {}")];
        assert!(entry_file(&only_style).is_none());
    }
}
