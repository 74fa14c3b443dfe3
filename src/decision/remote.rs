//! Remote reasoning backend speaking the OpenAI Chat Completions API.
//!
//! Works against any OpenAI-compatible endpoint. The model is asked to answer
//! with a single JSON object; anything else is an invalid response.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use crate::config::RemoteBackendConfig;
use crate::decision::backend::{DecisionBackend, DecisionRequest, Proposal};
use crate::error::BackendError;
use crate::util::truncate_str;

const BACKEND_NAME: &str = "remote";

/// Bytes of a bad response body echoed into error messages.
const ERROR_SNIPPET: usize = 200;

pub struct RemoteBackend {
    client: Client,
    config: RemoteBackendConfig,
}

impl RemoteBackend {
    pub fn new(config: RemoteBackendConfig) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| BackendError::RequestFailed {
                backend: BACKEND_NAME.to_string(),
                reason: format!("Failed to build reqwest client: {}", e),
            })?;
        Ok(Self { client, config })
    }

    /// Uses the base_url as-is and appends `/v1/{path}`, without doubling a
    /// trailing `/v1`.
    fn api_url(&self, path: &str) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        let base = base.strip_suffix("/v1").unwrap_or(base);
        format!("{}/v1/{}", base, path.trim_start_matches('/'))
    }

    fn add_auth_header(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.config.api_key.as_ref() {
            Some(key) => request.header("Authorization", format!("Bearer {}", key.expose_secret())),
            None => request,
        }
    }

    /// Read the body, failing as soon as it exceeds the configured limit.
    async fn read_bounded(&self, mut response: reqwest::Response) -> Result<String, BackendError> {
        let limit = self.config.max_response_bytes;
        let mut body: Vec<u8> = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if body.len() + chunk.len() > limit {
                return Err(BackendError::ResponseTooLarge {
                    backend: BACKEND_NAME.to_string(),
                    limit,
                });
            }
            body.extend_from_slice(&chunk);
        }
        String::from_utf8(body).map_err(|e| BackendError::InvalidResponse {
            backend: BACKEND_NAME.to_string(),
            reason: format!("body is not UTF-8: {}", e),
        })
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Pull the outermost JSON object out of free text (models like fences).
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Parse a chat completion body into a proposal valid for `request`.
pub(crate) fn parse_proposal(
    body: &str,
    request: &DecisionRequest,
) -> Result<Proposal, BackendError> {
    let invalid = |reason: String| BackendError::InvalidResponse {
        backend: BACKEND_NAME.to_string(),
        reason,
    };

    let chat: ChatResponse = serde_json::from_str(body).map_err(|e| {
        invalid(format!(
            "JSON parse error: {}. Raw: {}",
            e,
            truncate_str(body, ERROR_SNIPPET)
        ))
    })?;
    let content = chat
        .choices
        .into_iter()
        .next()
        .map(|c| c.message.content)
        .ok_or_else(|| invalid("no choices in response".to_string()))?;
    let object = extract_json_object(&content).ok_or_else(|| {
        invalid(format!(
            "no JSON object in content: {}",
            truncate_str(&content, ERROR_SNIPPET)
        ))
    })?;
    let proposal: Proposal = serde_json::from_str(object)
        .map_err(|e| invalid(format!("proposal does not match schema: {}", e)))?;

    if !request.accepts(&proposal.action) {
        return Err(invalid(format!(
            "action '{}' is not one of the offered candidates",
            truncate_str(&proposal.action, ERROR_SNIPPET)
        )));
    }
    Ok(proposal)
}

#[async_trait]
impl DecisionBackend for RemoteBackend {
    fn name(&self) -> &str {
        BACKEND_NAME
    }

    async fn propose(&self, request: &DecisionRequest) -> Result<Proposal, BackendError> {
        let url = self.api_url("chat/completions");
        let body = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: request.to_prompt(),
            }],
            max_tokens: self.config.max_tokens,
            temperature: 0.7,
        };

        tracing::debug!(url = %url, persona = %request.persona.name, "Requesting remote decision");

        let http = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&body);
        let response = self.add_auth_header(http).send().await.map_err(|e| {
            if e.is_timeout() {
                BackendError::Timeout {
                    backend: BACKEND_NAME.to_string(),
                    timeout: self.config.request_timeout,
                }
            } else {
                BackendError::RequestFailed {
                    backend: BACKEND_NAME.to_string(),
                    reason: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(BackendError::AuthFailed {
                backend: BACKEND_NAME.to_string(),
            });
        }
        if status.as_u16() == 503 {
            return Err(BackendError::Unavailable {
                backend: BACKEND_NAME.to_string(),
            });
        }

        let text = self.read_bounded(response).await?;
        if !status.is_success() {
            return Err(BackendError::RequestFailed {
                backend: BACKEND_NAME.to_string(),
                reason: format!("HTTP {}: {}", status, truncate_str(&text, ERROR_SNIPPET)),
            });
        }

        parse_proposal(&text, request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::backend::test_support::request;
    use crate::decision::backend::Urgency;
    use std::time::Duration;

    fn backend_with_base_url(base_url: &str) -> RemoteBackend {
        RemoteBackend::new(RemoteBackendConfig {
            base_url: base_url.to_string(),
            model: "test-model".to_string(),
            api_key: None,
            max_tokens: 256,
            max_response_bytes: 4096,
            request_timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    fn chat_body(content: &str) -> String {
        serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": content}}]
        })
        .to_string()
    }

    #[test]
    fn api_url_handles_trailing_v1() {
        let b = backend_with_base_url("https://api.example.com/v1/");
        assert_eq!(b.api_url("chat/completions"), "https://api.example.com/v1/chat/completions");
        let b = backend_with_base_url("https://api.example.com");
        assert_eq!(b.api_url("/chat/completions"), "https://api.example.com/v1/chat/completions");
    }

    #[test]
    fn parses_fenced_json() {
        let req = request(&["create_task", "schedule_event"], 0.2, 1);
        let body = chat_body(
            "```json\n{\"action\":\"schedule_event\",\"rationale\":\"soccer moved\",\"says\":\"On it\",\"urgency\":\"high\"}\n```",
        );
        let p = parse_proposal(&body, &req).unwrap();
        assert_eq!(p.action, "schedule_event");
        assert_eq!(p.urgency, Urgency::High);
    }

    #[test]
    fn rejects_unknown_action() {
        let req = request(&["create_task"], 0.2, 1);
        let body = chat_body("{\"action\":\"buy_a_boat\",\"rationale\":\"why not\"}");
        assert!(matches!(
            parse_proposal(&body, &req),
            Err(BackendError::InvalidResponse { .. })
        ));
    }

    #[test]
    fn rejects_non_json() {
        let req = request(&["create_task"], 0.2, 1);
        assert!(parse_proposal("<html>oops</html>", &req).is_err());
        assert!(parse_proposal(&chat_body("sure, I'll do it"), &req).is_err());
        assert!(parse_proposal(r#"{"choices": []}"#, &req).is_err());
    }
}
