//! Integration tests for extraction and validation
//!
//! Exercises the extractor and validator through their public service
//! surfaces with realistic model output, including the adversarial inputs
//! the extractor must absorb without panicking.

use studio::validate::{IssueCode, Severity, ValidationRequest};
use studio::{
    ExtractionMethod, Extractor, GeneratedFile, RawResponse, ValidateOptions, Validator,
};

fn clean_app() -> GeneratedFile {
    GeneratedFile::new(
        "src/App",
        "export default function App(){ return <div>Hi</div>; }",
    )
}

/// Test: the canonical clean file validates with a full score
#[test]
fn clean_file_scores_one_hundred() {
    let result = Validator::default().validate(&[clean_app()], &ValidateOptions::default());

    assert!(result.is_valid);
    assert_eq!(result.score, 100);
    assert!(result.errors.is_empty());
}

/// Test: delimiters inside string literals never unbalance a valid file
#[test]
fn string_literal_delimiters_do_not_reject_a_valid_file() {
    let file = GeneratedFile::new(
        "src/App.jsx",
        "export default function App() { const note = \":)\"; return <div>{note}</div>; }",
    );
    let result = Validator::default().validate(&[file], &ValidateOptions::default());

    assert!(result.is_valid, "valid file rejected: {:?}", result.errors);
    assert_eq!(result.score, 100);
}

/// Test: string-form timers are flagged as dangerous
#[test]
fn string_form_timer_is_a_blocking_error() {
    let file = GeneratedFile::new(
        "src/App.jsx",
        "export default function App() {\n  setTimeout(\"doEvil()\", 0);\n  return <div/>;\n}",
    );
    let result = Validator::default().validate(&[file], &ValidateOptions::default());

    assert!(!result.is_valid);
    assert!(result
        .errors
        .iter()
        .any(|i| i.code == IssueCode::DangerousApi && i.message.contains("timer")));
}

/// Test: an import off the allowlist is a blocking error
#[test]
fn axios_import_is_disallowed() {
    let file = GeneratedFile::new(
        "src/App.tsx",
        "import axios from 'axios';\nimport { Heart } from 'lucide-react';\nexport default function App(){ return <Heart/>; }",
    );
    let result = Validator::default().validate(&[file], &ValidateOptions::default());

    assert!(!result.is_valid);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].code, IssueCode::DisallowedImport);
    assert_eq!(result.errors[0].severity, Severity::Error);
    assert!(result.errors[0].message.contains("axios"));
}

/// Test: a fenced jsx reply extracts to exactly one file
#[test]
fn fenced_reply_extracts_one_file() {
    let raw = RawResponse::from("Sure! ```jsx\nexport default function App(){return <div/>}\n```");
    let result = Extractor::new().extract(&raw);

    assert!(result.has_valid_code);
    assert_eq!(result.method, ExtractionMethod::FencedBlocks);
    assert_eq!(result.files.len(), 1);

    // The extracted file passes validation as-is.
    let validation = Validator::default().validate(&result.files, &ValidateOptions::default());
    assert!(validation.is_valid);
}

/// Test: extraction absorbs adversarial input without panicking
#[test]
fn extraction_never_panics_on_hostile_input() {
    let extractor = Extractor::new();
    let hostile: Vec<String> = vec![
        String::new(),
        "\u{0}\u{1}\u{2}".to_string(),
        "{".repeat(10_000),
        "```".repeat(999),
        "```jsx\n".to_string(),
        format!("const X = {}", "{".repeat(5_000)),
        "{\"files\": [{\"path\": null, \"content\": 42}]}".to_string(),
        "{\"files\": \"not an array\"}".to_string(),
        "🎉🎉🎉 no code, only confetti 🎉🎉🎉".to_string(),
    ];

    for input in hostile {
        let result = extractor.extract(&RawResponse::from(input.as_str()));
        if !result.has_valid_code {
            assert!(result.files.is_empty());
            assert_eq!(result.method, ExtractionMethod::None);
        }
    }
}

/// Test: auto_fix is idempotent across the whole file set
#[test]
fn auto_fix_is_idempotent() {
    let validator = Validator::default();
    let files = vec![
        GeneratedFile::new(
            "src/App.tsx",
            "import moment from 'moment';\r\n\r\n\r\nexport default function App(){   \r\n  return <div/>;\r\n}",
        ),
        clean_app(),
    ];

    let (once, first_fixes) = validator.auto_fix(&files);
    let (twice, second_fixes) = validator.auto_fix(&once);

    assert!(!first_fixes.is_empty());
    assert!(second_fixes.is_empty());
    assert_eq!(once, twice);

    // The annotated import survives, unreplaced.
    assert!(once[0].content.contains("import moment from 'moment';"));
}

/// Test: the request/response service surface fixes then validates
#[test]
fn handle_round_trips_the_wire_shapes() {
    let request: ValidationRequest = serde_json::from_str(
        r#"{
            "files": [
                {"path": "src/App.tsx", "content": "import axios from 'axios';\nexport default function App(){ return <div/>; }"}
            ],
            "skipTypeCheck": false
        }"#,
    )
    .unwrap();

    let response = Validator::default().handle(request);
    assert!(!response.success);
    assert!(response
        .errors
        .iter()
        .any(|i| i.code == IssueCode::DisallowedImport));
    assert!(response.fixed_files.is_some());

    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["success"], false);
    assert_eq!(json["errors"][0]["code"], "DISALLOWED_IMPORT");
    assert!(json["fixes"][0]["applied"].as_bool().unwrap());
}

/// Test: warnings reduce the score but never invalidate
#[test]
fn warnings_accumulate_without_blocking() {
    let file = GeneratedFile::new(
        "src/App.jsx",
        "export default function App() {\n  return (\n    <div style={{ padding: 8 }} className=\"bg-red-500\">\n      <img src=\"/pic.png\" />\n    </div>\n  );\n}",
    );
    let result = Validator::default().validate(&[file], &ValidateOptions::default());

    assert!(result.is_valid);
    assert!(result.errors.is_empty());
    assert!(result.warnings.len() >= 3);
    assert!(result.score < 100);
    assert!(result.score >= 100 - 20);
}
