//! OpenAI-compatible chat completions backend.
//!
//! Works with: OpenAI, OpenRouter, Ollama, any OpenAI-compatible endpoint,
//! and Azure OpenAI deployments (which differ only in URL shape and auth
//! header).

use std::time::Duration;

use aide_core::error::SynthesisError;
use aide_core::message::ChatMessage;
use aide_core::synthesizer::{Completion, PromptRequest, Synthesizer, Usage};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// How requests are addressed and authenticated.
#[derive(Debug, Clone)]
enum Endpoint {
    /// `{base_url}/chat/completions` with a bearer token.
    OpenAi { base_url: String },

    /// `{endpoint}/openai/deployments/{deployment}/chat/completions?api-version=...`
    /// with an `api-key` header.
    Azure {
        endpoint: String,
        api_version: String,
    },
}

/// An OpenAI-compatible language model backend.
pub struct OpenAiCompatSynthesizer {
    name: String,
    endpoint: Endpoint,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    timeout: Duration,
    client: reqwest::Client,
}

impl OpenAiCompatSynthesizer {
    /// Create a backend for an OpenAI-compatible endpoint.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self::with_endpoint(
            name.into(),
            Endpoint::OpenAi {
                base_url: base_url.into().trim_end_matches('/').to_string(),
            },
            api_key.into(),
            model.into(),
        )
    }

    /// Create a backend for an Azure OpenAI deployment.
    pub fn azure(
        endpoint: impl Into<String>,
        deployment: impl Into<String>,
        api_version: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self::with_endpoint(
            "azure".into(),
            Endpoint::Azure {
                endpoint: endpoint.into().trim_end_matches('/').to_string(),
                api_version: api_version.into(),
            },
            api_key.into(),
            deployment.into(),
        )
    }

    fn with_endpoint(name: String, endpoint: Endpoint, api_key: String, model: String) -> Self {
        Self {
            name,
            endpoint,
            api_key,
            model,
            temperature: 0.7,
            max_tokens: 1024,
            timeout: Duration::from_secs(60),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Client-side bound on one HTTP round trip.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// The full chat completions URL for this endpoint.
    fn completions_url(&self) -> String {
        match &self.endpoint {
            Endpoint::OpenAi { base_url } => format!("{base_url}/chat/completions"),
            Endpoint::Azure {
                endpoint,
                api_version,
            } => format!(
                "{endpoint}/openai/deployments/{}/chat/completions?api-version={api_version}",
                self.model
            ),
        }
    }

    /// Convert our messages to the wire format.
    fn to_api_messages(messages: &[ChatMessage]) -> Vec<ApiMessage> {
        messages
            .iter()
            .map(|m| ApiMessage {
                role: m.role.as_str().into(),
                content: Some(m.content.clone()),
            })
            .collect()
    }

    fn request_body(&self, request: &PromptRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "messages": Self::to_api_messages(&request.to_messages()),
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        });

        // Azure addresses the model through the deployment in the URL
        if let Endpoint::OpenAi { .. } = self.endpoint {
            body["model"] = serde_json::json!(self.model);
        }

        body
    }

    fn map_transport_error(&self, e: reqwest::Error) -> SynthesisError {
        if e.is_timeout() {
            SynthesisError::Timeout(self.timeout.as_secs())
        } else {
            SynthesisError::Network(e.to_string())
        }
    }
}

#[async_trait]
impl Synthesizer for OpenAiCompatSynthesizer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: &PromptRequest) -> Result<Completion, SynthesisError> {
        let url = self.completions_url();
        let body = self.request_body(request);

        debug!(
            provider = %self.name,
            model = %self.model,
            has_context = request.context.is_some(),
            memory_turns = request.memory_snapshot.len(),
            "Sending completion request"
        );

        let builder = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .header("Content-Type", "application/json");
        let builder = match self.endpoint {
            Endpoint::OpenAi { .. } => {
                builder.header("Authorization", format!("Bearer {}", self.api_key))
            }
            Endpoint::Azure { .. } => builder.header("api-key", &self.api_key),
        };

        let response = builder
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status().as_u16();

        if status == 429 {
            let retry_after_secs = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(5);
            return Err(SynthesisError::RateLimited { retry_after_secs });
        }

        if status == 401 || status == 403 {
            return Err(SynthesisError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ));
        }

        if !(200..300).contains(&status) {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Model endpoint returned error");
            return Err(SynthesisError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| SynthesisError::ApiError {
                status_code: status,
                message: format!("Failed to parse response: {e}"),
            })?;

        let text = api_response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or(SynthesisError::EmptyResponse)?;

        let usage = api_response.usage.map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        Ok(Completion {
            text,
            model: api_response.model.unwrap_or_else(|| self.model.clone()),
            usage,
        })
    }
}

// --- OpenAI API types ---

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<ApiChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}
