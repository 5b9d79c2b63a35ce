//! Self-contained preview document assembly.
//!
//! The sandbox runtime receives one HTML document and nothing else, so
//! everything the generated source needs must travel inside it: the boundary
//! bridge and global interceptors, the compatibility shim, the source itself
//! (normalized, since the context cannot load modules), and a guarded entry
//! call. Assembly is deterministic text work; no build step is assumed.

use std::sync::LazyLock;

use regex::Regex;

use crate::files::{self, FileKind, GeneratedFile};
use crate::preview::shim;

const REACT_CDN: &str = "https://unpkg.com/react@18/umd/react.production.min.js";
const REACT_DOM_CDN: &str = "https://unpkg.com/react-dom@18/umd/react-dom.production.min.js";
const BABEL_CDN: &str = "https://unpkg.com/@babel/standalone/babel.min.js";

/// Name bound to an anonymous default export during normalization.
const ANON_ENTRY_NAME: &str = "PreviewRoot";

static IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    // Covers side-effect, default, namespace and multi-line named imports,
    // with or without a trailing semicolon.
    Regex::new(r#"(?m)^[ \t]*import\s+(?:[\w$*{},\s]+?from\s+)?['"][^'"\n]+['"][ \t]*;?[ \t]*\r?\n?"#)
        .expect("import regex should compile")
});

static EXPORT_DEFAULT_DECL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"export\s+default\s+(function|class)\s+([A-Za-z_$][\w$]*)")
        .expect("default declaration regex should compile")
});

static EXPORT_DEFAULT_IDENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*export\s+default\s+([A-Za-z_$][\w$]*)\s*;?[ \t]*\r?$")
        .expect("default identifier regex should compile")
});

static EXPORT_DEFAULT_ANON_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"export\s+default\s+").expect("default export regex should compile"));

static EXPORT_LIST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^[ \t]*export\s*\{[^}]*\}\s*(?:from\s*['"][^'"\n]*['"])?\s*;?[ \t]*\r?\n?"#)
        .expect("export list regex should compile")
});

static EXPORT_PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^([ \t]*)export\s+").expect("export prefix regex should compile")
});

static FALLBACK_ENTRY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*(?:function\s+([A-Z][\w$]*)\s*\(|(?:const|let|var)\s+([A-Z][\w$]*)\s*=)")
        .expect("entry scan regex should compile")
});

/// One assembled document, ready to hand to a sandbox backend.
#[derive(Debug, Clone)]
pub struct PreviewDocument {
    pub html: String,
    /// Entry component the guarded call renders. `None` still yields a
    /// valid document, one that reports a descriptive missing-entry error.
    pub entry: Option<String>,
}

/// Assemble the document for one file set and context.
///
/// Component files are normalized and concatenated (entry file last, so
/// non-hoisted declarations it references are already bound); stylesheet
/// files are inlined as `<style>` blocks; everything else is ignored.
pub fn build_document(files: &[GeneratedFile], context_id: &str) -> PreviewDocument {
    let preferred_path = files::entry_file(files).map(|f| f.path.clone());

    let mut entry_sections: Vec<String> = Vec::new();
    let mut helper_sections: Vec<String> = Vec::new();
    let mut styles: Vec<&str> = Vec::new();
    let mut preferred_entry: Option<String> = None;
    let mut first_entry: Option<String> = None;

    for file in files {
        match file.kind() {
            FileKind::Component => {
                let (code, name) = normalize_source(&file.content);
                let is_preferred = Some(&file.path) == preferred_path.as_ref();
                if let Some(name) = name {
                    if is_preferred && preferred_entry.is_none() {
                        preferred_entry = Some(name);
                    } else if first_entry.is_none() {
                        first_entry = Some(name);
                    }
                }
                let section = format!("// ---- {} ----\n{}", file.path, code.trim_end());
                if is_preferred {
                    entry_sections.push(section);
                } else {
                    helper_sections.push(section);
                }
            }
            FileKind::Stylesheet => styles.push(&file.content),
            _ => {}
        }
    }

    helper_sections.extend(entry_sections);
    let bundle = helper_sections.join("\n\n");

    let entry = preferred_entry
        .or(first_entry)
        .or_else(|| scan_for_entry(&bundle));

    let guard = match &entry {
        Some(name) => ENTRY_GUARD_TEMPLATE.replace("__ENTRY__", name),
        None => MISSING_ENTRY_GUARD.to_string(),
    };

    let mut html = String::with_capacity(bundle.len() + 8_192);
    html.push_str("<!doctype html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str(CSP_META);
    html.push_str("<title>Preview</title>\n<style>");
    html.push_str(shim::THEME_STYLES);
    html.push_str("</style>\n");
    for style in styles {
        html.push_str("<style>\n");
        html.push_str(style);
        html.push_str("\n</style>\n");
    }
    // The bridge must install its interceptors before any resource that
    // could fail to load, so it precedes the CDN tags.
    html.push_str("<script>");
    html.push_str(&BRIDGE_TEMPLATE.replace("__CONTEXT_ID__", context_id));
    html.push_str("</script>\n");
    for cdn in [REACT_CDN, REACT_DOM_CDN, BABEL_CDN] {
        html.push_str(&format!("<script crossorigin src=\"{cdn}\"></script>\n"));
    }
    html.push_str("</head>\n<body>\n<div id=\"root\"></div>\n<script>");
    html.push_str(&shim::shim_script());
    html.push_str("</script>\n");
    html.push_str(
        "<script type=\"text/babel\" data-presets=\"react,typescript\" data-filename=\"preview.tsx\">\n",
    );
    html.push_str(&bundle);
    html.push_str("\n\n");
    html.push_str(&guard);
    html.push_str("\n</script>\n</body>\n</html>\n");

    PreviewDocument { html, entry }
}

/// Strip module syntax the execution context cannot load and recover the
/// default-exported component name when there is one.
pub(crate) fn normalize_source(content: &str) -> (String, Option<String>) {
    let mut entry: Option<String> = None;

    let code = IMPORT_RE.replace_all(content, "");

    let code = if let Some(caps) = EXPORT_DEFAULT_DECL_RE.captures(&code) {
        entry = Some(caps[2].to_string());
        EXPORT_DEFAULT_DECL_RE.replace(&code, "$1 $2").into_owned()
    } else {
        code.into_owned()
    };

    let code = if let Some(caps) = EXPORT_DEFAULT_IDENT_RE.captures(&code) {
        if entry.is_none() {
            entry = Some(caps[1].to_string());
        }
        EXPORT_DEFAULT_IDENT_RE.replace(&code, "").into_owned()
    } else {
        code
    };

    let code = if EXPORT_DEFAULT_ANON_RE.is_match(&code) {
        if entry.is_none() {
            entry = Some(ANON_ENTRY_NAME.to_string());
        }
        EXPORT_DEFAULT_ANON_RE
            .replace(&code, format!("const {ANON_ENTRY_NAME} = "))
            .into_owned()
    } else {
        code
    };

    let code = EXPORT_LIST_RE.replace_all(&code, "");
    let code = EXPORT_PREFIX_RE.replace_all(&code, "$1");

    (code.into_owned(), entry)
}

/// Last-resort entry detection when no file carries a default export:
/// a top-level PascalCase declaration, preferring one named `App`.
fn scan_for_entry(code: &str) -> Option<String> {
    let mut first: Option<String> = None;
    for caps in FALLBACK_ENTRY_RE.captures_iter(code) {
        let name = match caps.get(1).or_else(|| caps.get(2)) {
            Some(m) => m.as_str().to_string(),
            None => continue,
        };
        if name == "App" {
            return Some(name);
        }
        if first.is_none() {
            first = Some(name);
        }
    }
    first
}

// Scripting stays enabled (eval is how the transpiler works) while network
// reach, embedding, and form submission are denied.
const CSP_META: &str = "<meta http-equiv=\"Content-Security-Policy\" content=\"default-src 'none'; script-src 'unsafe-inline' 'unsafe-eval' https://unpkg.com; style-src 'unsafe-inline'; img-src data: https:; connect-src 'none'; frame-src 'none'; object-src 'none'; base-uri 'none'; form-action 'none'\">\n";

const BRIDGE_TEMPLATE: &str = r#"
(function () {
  'use strict';
  var CONTEXT_ID = '__CONTEXT_ID__';
  var start = Date.now();
  var reported = false;

  function send(message) {
    console.log('@sandbox:' + JSON.stringify({ contextId: CONTEXT_ID, message: message }));
  }

  function classify(message) {
    if (/SyntaxError|Unexpected token|Transform failed/.test(message)) {
      return 'Compile error: ' + message;
    }
    return message;
  }

  function reportError(message, details) {
    if (reported) return;
    reported = true;
    send({ type: 'ERROR', error: classify(message), details: details });
  }

  window.__preview = {
    ready: function () {
      if (reported) return;
      reported = true;
      send({ type: 'READY', loadTimeMs: Math.max(1, Date.now() - start) });
    },
    fail: reportError,
    debug: function (debugType, message, data) {
      send({ type: 'DEBUG', debugType: debugType, message: message, data: data });
    }
  };

  window.addEventListener('error', function (event) {
    var target = event.target;
    if (target && target !== window) {
      var source = target.src || target.href || 'unknown';
      if (target.tagName === 'SCRIPT' || target.tagName === 'LINK') {
        reportError('Resource failed to load: ' + source);
      } else {
        window.__preview.debug('resource', 'Failed to load: ' + source);
      }
      return;
    }
    var err = event.error;
    reportError(String(event.message || err || 'Unknown error'), {
      line: event.lineno || undefined,
      column: event.colno || undefined,
      stack: err && err.stack ? String(err.stack) : undefined
    });
  }, true);

  window.addEventListener('unhandledrejection', function (event) {
    var reason = event.reason;
    reportError(
      'Unhandled rejection: ' + String(reason && reason.message ? reason.message : reason),
      { stack: reason && reason.stack ? String(reason.stack) : undefined }
    );
  });

  send({ type: 'LOAD_START' });
})();
"#;

const ENTRY_GUARD_TEMPLATE: &str = r#"
(function () {
  var entry = typeof __ENTRY__ !== 'undefined' ? __ENTRY__ : null;
  if (!entry) {
    window.__preview.fail('No top-level entry component found; expected a component named __ENTRY__.');
    return;
  }
  try {
    var root = ReactDOM.createRoot(document.getElementById('root'));
    root.render(React.createElement(entry));
  } catch (err) {
    window.__preview.fail(
      String(err && err.message ? err.message : err),
      { stack: err && err.stack ? String(err.stack) : undefined }
    );
    return;
  }
  (window.requestAnimationFrame || function (fn) { setTimeout(fn, 0); })(function () {
    window.__preview.ready();
  });
})();
"#;

const MISSING_ENTRY_GUARD: &str = r#"
(function () {
  window.__preview.fail('No top-level entry component found; add a default-exported component.');
})();
"#;
