pub mod anthropic;
pub mod error;
pub mod gemini;
pub mod json;
pub mod prompt;

use crate::config::Settings;
use crate::llm::error::PipelineError;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Gemini,
    Anthropic,
}

impl Provider {
    pub fn as_str(self) -> &'static str {
        match self {
            Provider::Gemini => "gemini",
            Provider::Anthropic => "anthropic",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" => Ok(Provider::Gemini),
            "anthropic" => Ok(Provider::Anthropic),
            other => Err(PipelineError::Configuration(format!(
                "unknown LLM provider: {other:?} (expected gemini or anthropic)"
            ))),
        }
    }
}

/// The external text generator. Whatever it returns is untrusted free text; structure is
/// recovered by [`json::extract`].
#[async_trait::async_trait]
pub trait OracleClient: Send + Sync {
    fn provider(&self) -> Provider;

    async fn invoke(&self, prompt: &str) -> Result<String, PipelineError>;
}

/// Builds the configured client. Credentials are checked here, before any request is sent.
pub fn client_from_settings(
    settings: &Settings,
    provider_override: Option<&str>,
) -> Result<Box<dyn OracleClient>, PipelineError> {
    let provider = match provider_override {
        Some(name) => name.parse()?,
        None => settings.provider()?,
    };
    let config = settings.oracle_config(provider)?;

    Ok(match provider {
        Provider::Gemini => Box::new(gemini::GeminiClient::new(config)?),
        Provider::Anthropic => Box::new(anthropic::AnthropicClient::new(config)?),
    })
}

pub(crate) fn transport_detail(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!("request timed out: {err}")
    } else if err.is_connect() {
        format!("connection failed: {err}")
    } else {
        format!("request failed: {err}")
    }
}
