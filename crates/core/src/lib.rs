pub mod domain;
pub mod ingest;
pub mod llm;
pub mod pipeline;
pub mod storage;

pub use llm::error::{ExtractStage, PipelineError};

pub mod config {
    use crate::llm::error::PipelineError;
    use crate::llm::Provider;
    use std::time::Duration;

    const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
    const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-pro";
    const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
    const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-5-sonnet-latest";
    const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 4096;
    const DEFAULT_TIMEOUT_SECS: u64 = 60;

    #[derive(Debug, Clone, Default)]
    pub struct Settings {
        pub llm_provider: Option<String>,
        pub gemini_api_key: Option<String>,
        pub gemini_base_url: Option<String>,
        pub gemini_model: Option<String>,
        pub anthropic_api_key: Option<String>,
        pub anthropic_base_url: Option<String>,
        pub anthropic_model: Option<String>,
        pub anthropic_max_tokens: Option<u32>,
        pub max_output_tokens: Option<u32>,
        pub oracle_timeout_secs: Option<u64>,
        pub sentry_dsn: Option<String>,
    }

    /// Everything an oracle client needs, resolved up front so clients never read the
    /// environment themselves.
    #[derive(Debug, Clone)]
    pub struct OracleConfig {
        pub api_key: String,
        pub base_url: String,
        pub model: String,
        pub max_output_tokens: u32,
        pub timeout: Duration,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                llm_provider: std::env::var("LLM_PROVIDER").ok(),
                gemini_api_key: std::env::var("GEMINI_API_KEY").ok(),
                gemini_base_url: std::env::var("GEMINI_BASE_URL").ok(),
                gemini_model: std::env::var("GEMINI_MODEL").ok(),
                anthropic_api_key: std::env::var("ANTHROPIC_API_KEY").ok(),
                anthropic_base_url: std::env::var("ANTHROPIC_BASE_URL").ok(),
                anthropic_model: std::env::var("ANTHROPIC_MODEL").ok(),
                anthropic_max_tokens: std::env::var("ANTHROPIC_MAX_TOKENS")
                    .ok()
                    .and_then(|s| s.parse::<u32>().ok()),
                max_output_tokens: std::env::var("ORACLE_MAX_OUTPUT_TOKENS")
                    .ok()
                    .and_then(|s| s.parse::<u32>().ok()),
                oracle_timeout_secs: std::env::var("ORACLE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse::<u64>().ok()),
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
            })
        }

        /// Provider named by `LLM_PROVIDER`, or Gemini when unset.
        pub fn provider(&self) -> Result<Provider, PipelineError> {
            match self.llm_provider.as_deref().map(str::trim) {
                None | Some("") => Ok(Provider::Gemini),
                Some(name) => name.parse(),
            }
        }

        pub fn require_gemini_api_key(&self) -> Result<&str, PipelineError> {
            require_key(self.gemini_api_key.as_deref(), "GEMINI_API_KEY")
        }

        pub fn require_anthropic_api_key(&self) -> Result<&str, PipelineError> {
            require_key(self.anthropic_api_key.as_deref(), "ANTHROPIC_API_KEY")
        }

        pub fn oracle_config(&self, provider: Provider) -> Result<OracleConfig, PipelineError> {
            let (api_key, base_url, model, max_tokens) = match provider {
                Provider::Gemini => (
                    self.require_gemini_api_key()?,
                    self.gemini_base_url.as_deref().unwrap_or(DEFAULT_GEMINI_BASE_URL),
                    self.gemini_model.as_deref().unwrap_or(DEFAULT_GEMINI_MODEL),
                    non_zero(self.max_output_tokens),
                ),
                Provider::Anthropic => (
                    self.require_anthropic_api_key()?,
                    self.anthropic_base_url
                        .as_deref()
                        .unwrap_or(DEFAULT_ANTHROPIC_BASE_URL),
                    self.anthropic_model.as_deref().unwrap_or(DEFAULT_ANTHROPIC_MODEL),
                    non_zero(self.anthropic_max_tokens).or(non_zero(self.max_output_tokens)),
                ),
            };

            Ok(OracleConfig {
                api_key: api_key.to_string(),
                base_url: base_url.to_string(),
                model: model.to_string(),
                max_output_tokens: max_tokens.unwrap_or(DEFAULT_MAX_OUTPUT_TOKENS),
                timeout: Duration::from_secs(
                    non_zero(self.oracle_timeout_secs).unwrap_or(DEFAULT_TIMEOUT_SECS),
                ),
            })
        }
    }

    /// Zero is never a usable limit; it falls back to the default like an unparseable value.
    fn non_zero<T: Default + PartialEq>(value: Option<T>) -> Option<T> {
        value.filter(|v| *v != T::default())
    }

    fn require_key<'a>(value: Option<&'a str>, name: &str) -> Result<&'a str, PipelineError> {
        value
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| PipelineError::Configuration(format!("{name} is required")))
    }

}
