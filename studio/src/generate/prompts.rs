//! Prompt builders for the generation rungs.
//!
//! The primary rung sends a fully framed prompt: output contract, palette
//! constraints, and any feedback from a failed preview round. The retry rung
//! strips all of that back to a minimal ask, which recovers surprisingly many
//! models that choke on long instruction blocks.

/// Everything a prompt builder may draw on.
#[derive(Debug, Clone)]
pub struct PromptContext<'a> {
    /// The user's request, verbatim.
    pub request: &'a str,
    /// Module specifiers the preview can resolve.
    pub allowed_imports: &'a [String],
    /// Error text from a failed preview of a previous result, if any.
    pub feedback: Option<&'a str>,
}

const OUTPUT_CONTRACT: &str = r#"Respond with a JSON object of this exact shape:

{
  "files": [
    {"path": "src/App.jsx", "content": "...full source..."}
  ],
  "explanation": "one short paragraph"
}

If you cannot produce JSON, respond with a single fenced code block instead.
The main component must be exported with `export default`."#;

const DESIGN_GUIDANCE: &str = r#"Style guidance:
- Use semantic markup and accessible labels (alt text, aria-label).
- Prefer theme tokens over hardcoded color utilities.
- Keep all state local; no network calls, no dynamic code execution."#;

/// Full prompt for the primary rung.
pub fn primary_prompt(ctx: &PromptContext<'_>) -> String {
    let palette = if ctx.allowed_imports.is_empty() {
        "none".to_string()
    } else {
        ctx.allowed_imports.join(", ")
    };

    let mut prompt = format!(
        "You are a UI component generator.\n\n{}\n\nAllowed imports: {}\n\n{}\n\n## Request\n\n{}",
        OUTPUT_CONTRACT, palette, DESIGN_GUIDANCE, ctx.request
    );

    if let Some(feedback) = ctx.feedback {
        prompt.push_str(&format!(
            "\n\n## Previous Attempt Failed\n\nThe last version failed in the preview with:\n\n{}\n\nFix the cause and return the corrected files.",
            feedback
        ));
    }

    prompt
}

/// Stripped prompt for the retry rung. Drops palette listing and guidance,
/// keeps the request, a one-line output contract, and one line naming why
/// the first attempt was rejected.
pub fn retry_prompt(ctx: &PromptContext<'_>, prior_failure: Option<&str>) -> String {
    let mut prompt = format!(
        "Write a single self-contained JSX component for the request below. \
         Respond with only one fenced code block and use `export default`.\n\n{}",
        ctx.request
    );
    if let Some(reason) = prior_failure {
        prompt.push_str(&format!(
            "\n\nThe previous attempt was rejected: {reason}."
        ));
    }
    prompt
}
