//! Lexical validation of generated source files.
//!
//! The validator never executes or parses generated code with a real
//! compiler. Every check in [`rules`] is a line or regex scan, which keeps
//! validation safe to run on arbitrary model output and fast enough to sit
//! inside the generation loop. Scores are advisory; the hard gate is the
//! presence of error-severity issues.

mod autofix;
mod rules;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::files::GeneratedFile;

/// How severe an issue is. Errors block acceptance, warnings never do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// Stable machine-readable issue codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueCode {
    DisallowedImport,
    DangerousApi,
    NetworkCall,
    MissingEntry,
    MissingExport,
    MissingRender,
    UnbalancedDelimiters,
    HardcodedColor,
    InlineStyle,
    ImgMissingAlt,
    ControlMissingLabel,
}

impl IssueCode {
    pub fn severity(&self) -> Severity {
        match self {
            IssueCode::DisallowedImport
            | IssueCode::DangerousApi
            | IssueCode::MissingEntry
            | IssueCode::MissingExport
            | IssueCode::MissingRender
            | IssueCode::UnbalancedDelimiters => Severity::Error,
            IssueCode::NetworkCall
            | IssueCode::HardcodedColor
            | IssueCode::InlineStyle
            | IssueCode::ImgMissingAlt
            | IssueCode::ControlMissingLabel => Severity::Warning,
        }
    }

    /// Points deducted from the score for one occurrence.
    pub fn weight(&self) -> u32 {
        match self {
            IssueCode::DisallowedImport => 20,
            IssueCode::DangerousApi => 25,
            IssueCode::NetworkCall => 10,
            IssueCode::MissingEntry => 25,
            IssueCode::MissingExport => 20,
            IssueCode::MissingRender => 20,
            IssueCode::UnbalancedDelimiters => 25,
            IssueCode::HardcodedColor => 3,
            IssueCode::InlineStyle => 3,
            IssueCode::ImgMissingAlt => 5,
            IssueCode::ControlMissingLabel => 5,
        }
    }

    /// One actionable hint per code, surfaced in the result's suggestion list.
    pub fn suggestion(&self) -> &'static str {
        match self {
            IssueCode::DisallowedImport => {
                "Remove imports outside the preview palette or inline the dependency"
            }
            IssueCode::DangerousApi => "Remove dynamic code execution and compute values directly",
            IssueCode::NetworkCall => "Replace network calls with local state or sample data",
            IssueCode::MissingEntry => "Define a top-level component such as `function App()`",
            IssueCode::MissingExport => "Add `export default` for the main component",
            IssueCode::MissingRender => "Return markup from the component body",
            IssueCode::UnbalancedDelimiters => "Check for unclosed braces or parentheses",
            IssueCode::HardcodedColor => "Prefer theme tokens over fixed color utilities",
            IssueCode::InlineStyle => "Move inline styles into class-based styling",
            IssueCode::ImgMissingAlt => "Add alt text to images",
            IssueCode::ControlMissingLabel => {
                "Label form controls with aria-label or an associated id"
            }
        }
    }
}

/// `Display` writes the same SCREAMING_SNAKE_CASE form serde emits.
impl std::fmt::Display for IssueCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            IssueCode::DisallowedImport => "DISALLOWED_IMPORT",
            IssueCode::DangerousApi => "DANGEROUS_API",
            IssueCode::NetworkCall => "NETWORK_CALL",
            IssueCode::MissingEntry => "MISSING_ENTRY",
            IssueCode::MissingExport => "MISSING_EXPORT",
            IssueCode::MissingRender => "MISSING_RENDER",
            IssueCode::UnbalancedDelimiters => "UNBALANCED_DELIMITERS",
            IssueCode::HardcodedColor => "HARDCODED_COLOR",
            IssueCode::InlineStyle => "INLINE_STYLE",
            IssueCode::ImgMissingAlt => "IMG_MISSING_ALT",
            IssueCode::ControlMissingLabel => "CONTROL_MISSING_LABEL",
        };
        write!(f, "{name}")
    }
}

/// One finding against one file, with a 1-based position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub file: String,
    pub line: usize,
    pub column: usize,
    pub message: String,
    pub severity: Severity,
    pub code: IssueCode,
}

impl ValidationIssue {
    pub fn new(
        file: impl Into<String>,
        line: usize,
        column: usize,
        message: impl Into<String>,
        code: IssueCode,
    ) -> Self {
        Self {
            file: file.into(),
            line,
            column,
            message: message.into(),
            severity: code.severity(),
            code,
        }
    }
}

/// Outcome of validating a file set.
///
/// `is_valid` is true exactly when `errors` is empty; warnings alone never
/// fail a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
    pub score: u8,
    pub suggestions: Vec<String>,
}

impl ValidationResult {
    pub(crate) fn from_issues(issues: Vec<ValidationIssue>) -> Self {
        let deducted: u32 = issues.iter().map(|i| i.code.weight()).sum();
        let score = 100u32.saturating_sub(deducted) as u8;

        let mut suggestions: Vec<String> = Vec::new();
        for issue in &issues {
            let hint = issue.code.suggestion().to_string();
            if !suggestions.contains(&hint) {
                suggestions.push(hint);
            }
        }

        let (errors, warnings): (Vec<_>, Vec<_>) = issues
            .into_iter()
            .partition(|i| i.severity == Severity::Error);

        Self {
            is_valid: errors.is_empty(),
            errors,
            warnings,
            score,
            suggestions,
        }
    }

    /// Count of all findings, both severities.
    pub fn issue_count(&self) -> usize {
        self.errors.len() + self.warnings.len()
    }
}

/// Options for a single validation pass.
#[derive(Debug, Clone, Default)]
pub struct ValidateOptions {
    /// Skip the structural checks (entry, export, render, balance). Lexical
    /// safety checks always run.
    pub skip_type_check: bool,
}

/// Validator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatorConfig {
    /// Module specifiers importable inside the preview. `prefix/*` entries
    /// allow any subpath.
    pub allowed_imports: Vec<String>,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            allowed_imports: vec![
                "react".to_string(),
                "react-dom".to_string(),
                "lucide-react".to_string(),
                "@/components/*".to_string(),
            ],
        }
    }
}

/// Request shape accepted by [`Validator::handle`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRequest {
    pub files: Vec<GeneratedFile>,
    #[serde(default)]
    pub skip_type_check: bool,
}

/// Response shape produced by [`Validator::handle`].
///
/// `errors` carries every finding regardless of severity; each issue is
/// tagged so callers can partition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResponse {
    pub success: bool,
    pub errors: Vec<ValidationIssue>,
    pub fixes: Vec<AppliedFix>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixed_files: Option<Vec<GeneratedFile>>,
}

/// A safe fix the validator applied to a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedFix {
    pub file: String,
    #[serde(rename = "type")]
    pub kind: FixKind,
    pub description: String,
    pub applied: bool,
}

impl AppliedFix {
    fn new(file: impl Into<String>, kind: FixKind, description: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            kind,
            description: description.into(),
            applied: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixKind {
    ImportAnnotated,
    LineEndings,
    TrailingWhitespace,
    BlankLines,
}

/// Stateless validation service.
#[derive(Debug, Clone, Default)]
pub struct Validator {
    config: ValidatorConfig,
}

impl Validator {
    pub fn new(config: ValidatorConfig) -> Self {
        Self { config }
    }

    /// The import allowlist this validator enforces.
    pub fn allowed_imports(&self) -> &[String] {
        &self.config.allowed_imports
    }

    /// Run every check over the file set and fold the findings into one
    /// result. Never fails: unparseable content just accumulates issues.
    pub fn validate(&self, files: &[GeneratedFile], opts: &ValidateOptions) -> ValidationResult {
        let mut issues = Vec::new();
        for file in files {
            issues.extend(rules::check_imports(file, &self.config.allowed_imports));
            issues.extend(rules::check_dangerous_apis(file));
            if !opts.skip_type_check {
                issues.extend(rules::check_structure(file));
            }
            issues.extend(rules::check_style(file));
            issues.extend(rules::check_accessibility(file));
        }
        let result = ValidationResult::from_issues(issues);
        debug!(
            files = files.len(),
            errors = result.errors.len(),
            warnings = result.warnings.len(),
            score = result.score,
            "Validated file set"
        );
        result
    }

    /// Apply safe fixes to every file. Idempotent: re-running on the output
    /// returns identical content and an empty fix list.
    pub fn auto_fix(&self, files: &[GeneratedFile]) -> (Vec<GeneratedFile>, Vec<AppliedFix>) {
        let mut fixed = Vec::with_capacity(files.len());
        let mut all_fixes = Vec::new();
        for file in files {
            let (out, fixes) = autofix::fix_file(file, &self.config.allowed_imports);
            all_fixes.extend(fixes);
            fixed.push(out);
        }
        (fixed, all_fixes)
    }

    /// Fix-then-validate entry point for service callers.
    pub fn handle(&self, request: ValidationRequest) -> ValidationResponse {
        let (fixed, fixes) = self.auto_fix(&request.files);
        let result = self.validate(
            &fixed,
            &ValidateOptions {
                skip_type_check: request.skip_type_check,
            },
        );

        let mut all_issues = result.errors;
        all_issues.extend(result.warnings);

        ValidationResponse {
            success: result.is_valid,
            errors: all_issues,
            fixes: fixes.clone(),
            fixed_files: if fixes.is_empty() { None } else { Some(fixed) },
        }
    }
}
