//! Gemini `generateContent` client.
//!
//! One request per call. No retries, no caching; whatever text comes back is handed to the
//! extractor untouched.

use crate::config::OracleConfig;
use crate::llm::error::PipelineError;
use crate::llm::{transport_detail, OracleClient, Provider};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};

const API_KEY_HEADER: &str = "x-goog-api-key";
const TEMPERATURE: f32 = 0.4;

#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    config: OracleConfig,
}

impl GeminiClient {
    pub fn new(config: OracleConfig) -> Result<Self, PipelineError> {
        if config.api_key.trim().is_empty() {
            return Err(PipelineError::Configuration(
                "GEMINI_API_KEY is required".to_string(),
            ));
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                PipelineError::Configuration(format!("failed to build reqwest client: {e}"))
            })?;

        Ok(Self { http, config })
    }

    fn url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    fn headers(&self) -> Result<HeaderMap, PipelineError> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&self.config.api_key).map_err(|_| {
            PipelineError::Configuration("GEMINI_API_KEY is not a valid header value".to_string())
        })?;
        headers.insert(API_KEY_HEADER, key);
        Ok(headers)
    }

    fn request(&self, prompt: &str) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
                max_output_tokens: self.config.max_output_tokens,
            },
        }
    }

    fn oracle_error(stage: &'static str, detail: String, raw_output: Option<String>) -> PipelineError {
        PipelineError::Oracle {
            provider: Provider::Gemini,
            stage,
            detail,
            raw_output,
        }
    }

    fn response_text(res: &GenerateContentResponse) -> Option<String> {
        let candidate = res.candidates.first()?;
        let parts = &candidate.content.as_ref()?.parts;
        let text: String = parts.iter().filter_map(|p| p.text.as_deref()).collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

#[async_trait::async_trait]
impl OracleClient for GeminiClient {
    fn provider(&self) -> Provider {
        Provider::Gemini
    }

    async fn invoke(&self, prompt: &str) -> Result<String, PipelineError> {
        let headers = self.headers()?;
        tracing::info!(
            provider = %Provider::Gemini,
            model = %self.config.model,
            prompt_chars = prompt.len(),
            "calling oracle"
        );

        let res = self
            .http
            .post(self.url())
            .headers(headers)
            .json(&self.request(prompt))
            .send()
            .await
            .map_err(|e| Self::oracle_error("transport", transport_detail(&e), None))?;

        let status = res.status();
        let text = res.text().await.map_err(|e| {
            Self::oracle_error("transport", format!("failed to read response body: {e}"), None)
        })?;
        if !status.is_success() {
            return Err(Self::oracle_error("http", format!("status={status}"), Some(text)));
        }

        let parsed = serde_json::from_str::<GenerateContentResponse>(&text).map_err(|e| {
            Self::oracle_error(
                "decode",
                format!("failed to decode generateContent response: {e}"),
                Some(text.clone()),
            )
        })?;

        let Some(answer) = Self::response_text(&parsed) else {
            let finish_reason = parsed
                .candidates
                .first()
                .and_then(|c| c.finish_reason.clone())
                .unwrap_or_else(|| "none".to_string());
            return Err(Self::oracle_error(
                "response",
                format!("no text in response (finish_reason={finish_reason})"),
                Some(text),
            ));
        };

        tracing::info!(provider = %Provider::Gemini, response_chars = answer.len(), "oracle responded");
        Ok(answer)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}
