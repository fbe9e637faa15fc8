use crate::config::OracleConfig;
use crate::llm::error::PipelineError;
use crate::llm::{transport_detail, OracleClient, Provider};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Clone)]
pub struct AnthropicClient {
    http: reqwest::Client,
    config: OracleConfig,
}

impl AnthropicClient {
    pub fn new(config: OracleConfig) -> Result<Self, PipelineError> {
        if config.api_key.trim().is_empty() {
            return Err(PipelineError::Configuration(
                "ANTHROPIC_API_KEY is required".to_string(),
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

    fn oracle_error(stage: &'static str, detail: String, raw_output: Option<String>) -> PipelineError {
        PipelineError::Oracle {
            provider: Provider::Anthropic,
            stage,
            detail,
            raw_output,
        }
    }

    fn headers(&self) -> Result<HeaderMap, PipelineError> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&self.config.api_key).map_err(|_| {
            PipelineError::Configuration(
                "ANTHROPIC_API_KEY is not a valid header value".to_string(),
            )
        })?;
        headers.insert("x-api-key", key);
        headers.insert(
            "anthropic-version",
            HeaderValue::from_static(ANTHROPIC_VERSION),
        );
        Ok(headers)
    }

    fn request(&self, prompt: &str) -> CreateMessageRequest {
        CreateMessageRequest {
            model: self.config.model.clone(),
            max_tokens: self.config.max_output_tokens,
            messages: vec![Message {
                role: "user",
                content: prompt.to_string(),
            }],
        }
    }

    fn response_text(res: &CreateMessageResponse) -> String {
        let mut out = String::new();
        for block in &res.content {
            match block {
                ContentBlock::Text { text } => {
                    if !out.is_empty() {
                        out.push('\n');
                    }
                    out.push_str(text);
                }
                // Ignore.
                ContentBlock::Unknown => {}
            }
        }
        out
    }
}

#[async_trait::async_trait]
impl OracleClient for AnthropicClient {
    fn provider(&self) -> Provider {
        Provider::Anthropic
    }

    async fn invoke(&self, prompt: &str) -> Result<String, PipelineError> {
        let headers = self.headers()?;
        let url = format!("{}/v1/messages", self.config.base_url.trim_end_matches('/'));
        tracing::info!(
            provider = %Provider::Anthropic,
            model = %self.config.model,
            prompt_chars = prompt.len(),
            "calling oracle"
        );

        let res = self
            .http
            .post(url)
            .headers(headers)
            .json(&self.request(prompt))
            .send()
            .await
            .map_err(|e| Self::oracle_error("transport", transport_detail(&e), None))?;

        let status = res.status();
        let text = res.text().await.map_err(|e| {
            Self::oracle_error(
                "transport",
                format!("failed to read Anthropic response body: {e}"),
                None,
            )
        })?;
        if !status.is_success() {
            return Err(Self::oracle_error("http", format!("status={status}"), Some(text)));
        }

        let parsed = serde_json::from_str::<CreateMessageResponse>(&text).map_err(|e| {
            Self::oracle_error(
                "decode",
                format!("failed to decode Anthropic response into CreateMessageResponse: {e}"),
                Some(text.clone()),
            )
        })?;

        if matches!(parsed.stop_reason.as_deref(), Some("max_tokens")) {
            tracing::warn!(
                max_tokens = self.config.max_output_tokens,
                "Anthropic stop_reason=max_tokens; response may be truncated"
            );
        }

        let answer = Self::response_text(&parsed);
        if answer.trim().is_empty() {
            return Err(Self::oracle_error(
                "response",
                "no text content in response".to_string(),
                Some(text),
            ));
        }

        tracing::info!(provider = %Provider::Anthropic, response_chars = answer.len(), "oracle responded");
        Ok(answer)
    }
}

#[derive(Debug, Clone, Serialize)]
struct CreateMessageRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<Message>,
}

#[derive(Debug, Clone, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct CreateMessageResponse {
    content: Vec<ContentBlock>,

    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },

    #[serde(other)]
    Unknown,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base_url: &str) -> OracleConfig {
        OracleConfig {
            api_key: "sk-test".to_string(),
            base_url: base_url.to_string(),
            model: "claude-test".to_string(),
            max_output_tokens: 2048,
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn joins_text_blocks_and_skips_others() {
        let res: CreateMessageResponse = serde_json::from_value(json!({
            "content": [
                {"type": "thinking", "thinking": "...", "signature": "s"},
                {"type": "text", "text": "first"},
                {"type": "text", "text": "second"}
            ],
            "stop_reason": "end_turn"
        }))
        .unwrap();
        assert_eq!(AnthropicClient::response_text(&res), "first\nsecond");
    }

    #[tokio::test]
    async fn sends_versioned_request_and_returns_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "sk-test"))
            .and(header("anthropic-version", ANTHROPIC_VERSION))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [{"type": "text", "text": "{\"ok\": true}"}],
                "stop_reason": "end_turn"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = AnthropicClient::new(config(&server.uri())).unwrap();
        assert_eq!(client.invoke("prompt").await.unwrap(), "{\"ok\": true}");
    }

    #[tokio::test]
    async fn error_status_keeps_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(401).set_body_string("{\"error\":\"bad key\"}"))
            .mount(&server)
            .await;

        let client = AnthropicClient::new(config(&server.uri())).unwrap();
        let err = client.invoke("prompt").await.unwrap_err();
        assert_eq!(err.raw_output(), Some("{\"error\":\"bad key\"}"));
        assert!(matches!(err, PipelineError::Oracle { stage: "http", .. }));
    }
}
