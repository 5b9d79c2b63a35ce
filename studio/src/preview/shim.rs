//! Compatibility shim embedded into every preview document.
//!
//! Generated code references a small palette of UI primitives and icon
//! glyphs as if real packages were installed. Because import lines are
//! stripped during normalization, every palette name must resolve as a
//! document global; the shim defines them all on `window`, built on
//! `React.createElement` so no transpilation is needed to load it.
//!
//! The palette is fixed: [`PALETTE_COMPONENTS`] and [`ICON_GLYPHS`] are the
//! complete set of names generated code may use. Icons outside the table
//! stay undefined and surface as ordinary runtime errors.

/// UI primitives the shim defines as globals.
pub const PALETTE_COMPONENTS: [&str; 8] = [
    "Button",
    "Card",
    "CardHeader",
    "CardContent",
    "Input",
    "Badge",
    "Stack",
    "Text",
];

/// Icon names and the text glyph each renders as.
pub const ICON_GLYPHS: [(&str, &str); 24] = [
    ("Check", "\u{2713}"),
    ("X", "\u{2715}"),
    ("Plus", "+"),
    ("Minus", "\u{2212}"),
    ("ChevronDown", "\u{25be}"),
    ("ChevronUp", "\u{25b4}"),
    ("ChevronLeft", "\u{25c2}"),
    ("ChevronRight", "\u{25b8}"),
    ("ArrowRight", "\u{2192}"),
    ("ArrowLeft", "\u{2190}"),
    ("Search", "\u{2315}"),
    ("Star", "\u{2605}"),
    ("Heart", "\u{2665}"),
    ("User", "\u{25c9}"),
    ("Settings", "\u{2699}"),
    ("Trash2", "\u{2326}"),
    ("Edit", "\u{270e}"),
    ("Mail", "\u{2709}"),
    ("Info", "\u{2139}"),
    ("AlertCircle", "\u{26a0}"),
    ("Clock", "\u{25f7}"),
    ("Home", "\u{2302}"),
    ("Menu", "\u{2630}"),
    ("Calendar", "\u{25a6}"),
];

/// Theme tokens and base styles for the palette primitives.
pub const THEME_STYLES: &str = r#"
:root {
  --background: #ffffff;
  --foreground: #0f172a;
  --primary: #2563eb;
  --primary-foreground: #ffffff;
  --muted: #f1f5f9;
  --muted-foreground: #64748b;
  --border: #e2e8f0;
  --radius: 8px;
}
body {
  margin: 0;
  padding: 16px;
  font-family: system-ui, -apple-system, sans-serif;
  background: var(--background);
  color: var(--foreground);
}
.ui-button {
  display: inline-flex;
  align-items: center;
  gap: 6px;
  padding: 8px 16px;
  border: 1px solid transparent;
  border-radius: var(--radius);
  background: var(--primary);
  color: var(--primary-foreground);
  font: inherit;
  cursor: pointer;
}
.ui-button:hover { opacity: 0.9; }
.ui-card {
  border: 1px solid var(--border);
  border-radius: var(--radius);
  background: var(--background);
  overflow: hidden;
}
.ui-card-header {
  padding: 16px;
  border-bottom: 1px solid var(--border);
  font-weight: 600;
}
.ui-card-content { padding: 16px; }
.ui-input {
  width: 100%;
  box-sizing: border-box;
  padding: 8px 12px;
  border: 1px solid var(--border);
  border-radius: var(--radius);
  font: inherit;
  background: var(--background);
  color: var(--foreground);
}
.ui-badge {
  display: inline-block;
  padding: 2px 10px;
  border-radius: 999px;
  background: var(--muted);
  color: var(--muted-foreground);
  font-size: 12px;
}
.ui-stack { display: flex; flex-direction: column; gap: 12px; }
.ui-text { margin: 0; }
.ui-icon { display: inline-block; line-height: 1; }
"#;

// Plain ES5 on purpose: this script loads before the transpiler and must
// execute as-is in the sandbox runtime.
const COMPONENT_SCRIPT: &str = r#"
(function () {
  'use strict';
  var e = React.createElement;

  function cx() {
    var parts = [];
    for (var i = 0; i < arguments.length; i++) {
      if (arguments[i]) parts.push(arguments[i]);
    }
    return parts.join(' ');
  }

  function styled(tag, baseClass) {
    return function (props) {
      props = props || {};
      var rest = {};
      for (var key in props) {
        if (key !== 'children' && key !== 'className') rest[key] = props[key];
      }
      rest.className = cx(baseClass, props.className);
      return e(tag, rest, props.children);
    };
  }

  window.Button = styled('button', 'ui-button');
  window.Card = styled('div', 'ui-card');
  window.CardHeader = styled('div', 'ui-card-header');
  window.CardContent = styled('div', 'ui-card-content');
  window.Input = styled('input', 'ui-input');
  window.Badge = styled('span', 'ui-badge');
  window.Stack = styled('div', 'ui-stack');
  window.Text = styled('p', 'ui-text');

  window.__icon = function (glyph) {
    return function (props) {
      props = props || {};
      return e(
        'span',
        { className: cx('ui-icon', props.className), 'aria-hidden': 'true' },
        glyph
      );
    };
  };
})();
"#;

/// The complete shim script: palette components plus one global per icon.
pub fn shim_script() -> String {
    let mut script = String::with_capacity(COMPONENT_SCRIPT.len() + ICON_GLYPHS.len() * 48);
    script.push_str(COMPONENT_SCRIPT);
    script.push_str("(function () {\n");
    for (name, glyph) in ICON_GLYPHS {
        script.push_str(&format!("  window.{name} = window.__icon('{glyph}');\n"));
    }
    script.push_str("})();\n");
    script
}
