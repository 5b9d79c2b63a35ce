//! Studio configuration.
//!
//! One aggregate value wires the whole pipeline: provider endpoint, ladder
//! thresholds, validator allowlist, preview budget, sandbox runtime command.
//! Defaults read the environment so an embedding surface can run with no
//! config file at all; a TOML file overrides section by section.

use serde::{Deserialize, Serialize};

use crate::error::{StudioError, StudioResult};
use crate::generate::{LadderConfig, SamplingParams};
use crate::preview::PreviewConfig;
use crate::telemetry::DEFAULT_TIMELINE_CAPACITY;
use crate::validate::ValidatorConfig;

/// Generation provider endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Name used in logs and health reports.
    pub name: String,
    /// OpenAI-compatible API root.
    pub base_url: String,
    /// Model identifier for the primary rung.
    pub model: String,
    /// When false the ladder skips provider rungs entirely and every run
    /// resolves through the offline fallback.
    pub enabled: bool,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: "primary".to_string(),
            base_url: std::env::var("STUDIO_PROVIDER_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            model: std::env::var("STUDIO_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            enabled: true,
        }
    }
}

/// Sandbox runtime settings for the process backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    /// Runtime command executing the preview document, `None` when the
    /// embedder supplies its own backend.
    pub command: Option<String>,
    pub args: Vec<String>,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            command: std::env::var("STUDIO_SANDBOX_CMD").ok(),
            args: Vec::new(),
        }
    }
}

/// TOML-friendly ladder section, converted into [`LadderConfig`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LadderSection {
    pub acceptance_score: u8,
    pub provider_timeout_ms: u64,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for LadderSection {
    fn default() -> Self {
        let defaults = LadderConfig::default();
        Self {
            acceptance_score: defaults.acceptance_score,
            provider_timeout_ms: defaults.provider_timeout_ms,
            temperature: defaults.sampling.temperature,
            max_tokens: defaults.sampling.max_tokens,
        }
    }
}

/// Workbench feedback loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkbenchConfig {
    /// How many times a failed preview may drive a fresh ladder run before
    /// the last result is returned as-is.
    pub max_feedback_rounds: u32,
}

impl Default for WorkbenchConfig {
    fn default() -> Self {
        Self {
            max_feedback_rounds: 2,
        }
    }
}

/// Everything the studio pipeline needs, in one value.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StudioConfig {
    pub provider: ProviderConfig,
    pub ladder: LadderSection,
    pub validator: ValidatorConfig,
    pub preview: PreviewConfig,
    pub sandbox: SandboxConfig,
    pub workbench: WorkbenchConfig,
    pub telemetry: TelemetryConfig,
}

/// Telemetry retention settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub capacity: usize,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_TIMELINE_CAPACITY,
        }
    }
}

impl StudioConfig {
    /// Parse a TOML document. Absent sections and fields keep their
    /// defaults.
    pub fn from_toml_str(source: &str) -> StudioResult<Self> {
        let config: Self = toml::from_str(source)?;
        config.verify()?;
        Ok(config)
    }

    /// Load a TOML config file from disk.
    pub fn load(path: impl AsRef<std::path::Path>) -> StudioResult<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Air-gapped profile: provider rungs disabled, every run resolves
    /// through the deterministic fallback.
    pub fn offline() -> Self {
        let mut config = Self::default();
        config.provider.enabled = false;
        config
    }

    /// Ladder tuning derived from the ladder section and provider model.
    pub fn ladder_config(&self) -> LadderConfig {
        LadderConfig {
            acceptance_score: self.ladder.acceptance_score,
            provider_timeout_ms: self.ladder.provider_timeout_ms,
            sampling: SamplingParams {
                model: self.provider.model.clone(),
                temperature: self.ladder.temperature,
                max_tokens: self.ladder.max_tokens,
            },
        }
    }

    fn verify(&self) -> StudioResult<()> {
        if self.ladder.acceptance_score > 100 {
            return Err(StudioError::config(format!(
                "ladder.acceptance_score must be 0..=100, got {}",
                self.ladder.acceptance_score
            )));
        }
        if self.ladder.provider_timeout_ms == 0 {
            return Err(StudioError::config("ladder.provider_timeout_ms must be > 0"));
        }
        if self.preview.timeout_ms == 0 {
            return Err(StudioError::config("preview.timeout_ms must be > 0"));
        }
        if self.validator.allowed_imports.is_empty() {
            return Err(StudioError::config(
                "validator.allowed_imports must not be empty",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = StudioConfig::default();
        assert!(config.verify().is_ok());
        assert_eq!(config.ladder.acceptance_score, 60);
        assert_eq!(config.preview.timeout_ms, 15_000);
        assert_eq!(config.workbench.max_feedback_rounds, 2);
        assert!(config.provider.enabled);
    }

    #[test]
    fn toml_overrides_only_named_fields() {
        let config = StudioConfig::from_toml_str(
            r#"
            [ladder]
            acceptance_score = 80

            [preview]
            timeout_ms = 5000

            [sandbox]
            command = "deno"
            args = ["run", "--quiet", "-"]
            "#,
        )
        .unwrap();

        assert_eq!(config.ladder.acceptance_score, 80);
        assert_eq!(config.ladder.provider_timeout_ms, 30_000);
        assert_eq!(config.preview.timeout_ms, 5000);
        assert_eq!(config.sandbox.command.as_deref(), Some("deno"));
        assert_eq!(config.sandbox.args, vec!["run", "--quiet", "-"]);
    }

    #[test]
    fn bad_values_are_rejected() {
        let err = StudioConfig::from_toml_str("[ladder]\nacceptance_score = 150\n").unwrap_err();
        assert!(err.to_string().contains("acceptance_score"));

        let err = StudioConfig::from_toml_str("[preview]\ntimeout_ms = 0\n").unwrap_err();
        assert!(err.to_string().contains("timeout_ms"));

        let err =
            StudioConfig::from_toml_str("[validator]\nallowed_imports = []\n").unwrap_err();
        assert!(err.to_string().contains("allowed_imports"));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = StudioConfig::from_toml_str("[ladder\nbroken").unwrap_err();
        assert!(matches!(err, StudioError::ConfigParse(_)));
    }

    #[test]
    fn offline_profile_disables_the_provider() {
        let config = StudioConfig::offline();
        assert!(!config.provider.enabled);
        assert!(config.verify().is_ok());
    }

    #[test]
    fn ladder_config_carries_the_provider_model() {
        let config = StudioConfig::from_toml_str(
            r#"
            [provider]
            model = "local-coder"

            [ladder]
            temperature = 0.7
            max_tokens = 2048
            "#,
        )
        .unwrap();

        let ladder = config.ladder_config();
        assert_eq!(ladder.sampling.model, "local-coder");
        assert!((ladder.sampling.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(ladder.sampling.max_tokens, 2048);
    }

    #[test]
    fn load_reads_a_file_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[ladder]\nacceptance_score = 70").unwrap();

        let config = StudioConfig::load(file.path()).unwrap();
        assert_eq!(config.ladder.acceptance_score, 70);

        assert!(StudioConfig::load("/nonexistent/studio.toml").is_err());
    }
}
