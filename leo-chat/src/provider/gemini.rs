//! Google Gemini provider.
//!
//! Calls `generateContent` with API-key query auth. Generation and safety
//! settings come from [`GeminiConfig`] and are identical for every request.

use super::{ChatRequest, ChatResponse, Provider, ProviderError, TokenUsage};
use async_trait::async_trait;
use leo_common::config::GeminiConfig;
use leo_common::Error;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

const PROVIDER_NAME: &str = "gemini";

const HARM_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

/// Gemini `generateContent` client.
pub struct GeminiProvider {
    api_key: Option<String>,
    base_url: String,
    settings: GeminiConfig,
    client: Client,
}

// ══════════════════════════════════════════════════════════════════════════════
// API REQUEST/RESPONSE TYPES
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
    safety_settings: Vec<SafetySetting>,
}

#[derive(Debug, Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f64,
    top_k: u32,
    top_p: f64,
    max_output_tokens: i64,
}

#[derive(Debug, Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
    error: Option<ApiError>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: Option<i64>,
    candidates_token_count: Option<i64>,
    total_token_count: Option<i64>,
}

impl GeminiProvider {
    /// Create a provider from configuration.
    ///
    /// The client enforces `timeout_secs` for the whole request; a request
    /// that runs over is dropped along with its connection.
    pub fn new(settings: &GeminiConfig) -> leo_common::Result<Self> {
        let timeout = Duration::from_secs(settings.timeout_secs);
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10).min(timeout))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build Gemini HTTP client: {e}")))?;

        Ok(Self {
            api_key: settings.api_key.clone().filter(|k| !k.is_empty()),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            settings: settings.clone(),
            client,
        })
    }

    /// Whether an API key is configured.
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn endpoint(&self, model: &str) -> String {
        let model_name = model.strip_prefix("models/").unwrap_or(model);
        format!("{}/v1beta/models/{model_name}:generateContent", self.base_url)
    }

    fn build_body(&self, request: &ChatRequest) -> GenerateContentRequest {
        let contents = request
            .messages
            .iter()
            .map(|msg| Content {
                role: match msg.role.as_str() {
                    "assistant" => "model".to_string(),
                    other => other.to_string(),
                },
                parts: vec![Part {
                    text: msg.content.clone(),
                }],
            })
            .collect();

        GenerateContentRequest {
            contents,
            generation_config: GenerationConfig {
                temperature: self.settings.temperature,
                top_k: self.settings.top_k,
                top_p: self.settings.top_p,
                max_output_tokens: self.settings.max_output_tokens,
            },
            safety_settings: HARM_CATEGORIES
                .iter()
                .map(|&category| SafetySetting {
                    category,
                    threshold: self.settings.safety_threshold.clone(),
                })
                .collect(),
        }
    }
}

/// Convert a client error, keeping the URL (and its `key` parameter) out of the message.
fn upstream_error<F>(fail: &F, what: &str, e: reqwest::Error) -> ProviderError
where
    F: Fn(String) -> ProviderError,
{
    let timed_out = e.is_timeout();
    let err = fail(format!("{what}: {}", e.without_url()));
    if timed_out {
        err.timeout()
    } else {
        err
    }
}

#[async_trait]
impl Provider for GeminiProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError> {
        let start = Instant::now();
        let model = request.model.clone();
        let fail = |message: String| ProviderError::new(PROVIDER_NAME, model.clone(), message);

        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| fail("Gemini API key not configured. Set GEMINI_API_KEY.".into()))?;

        let body = self.build_body(&request);

        let response = self
            .client
            .post(self.endpoint(&request.model))
            .query(&[("key", api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| upstream_error(&fail, "Request failed", e))?;

        let status = response.status();
        if status != StatusCode::OK {
            let error_text = response.text().await.unwrap_or_default();
            return Err(fail(format!(
                "API error ({}): {}",
                status.as_u16(),
                leo_common::util::truncate_with_ellipsis(&error_text, 300)
            ))
            .with_status(status.as_u16()));
        }

        let result: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| upstream_error(&fail, "Failed to parse response", e))?;

        if let Some(err) = result.error {
            return Err(fail(format!("API error: {}", err.message)));
        }

        let candidate = result
            .candidates
            .and_then(|c| c.into_iter().next())
            .ok_or_else(|| fail("No candidates in Gemini response".into()))?;

        let content = candidate
            .content
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default()
            .trim()
            .to_string();

        if content.is_empty() {
            return Err(fail(format!(
                "Empty candidate text (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            )));
        }

        let usage = result.usage_metadata.map_or(TokenUsage::default(), |u| TokenUsage {
            input_tokens: u.prompt_token_count.unwrap_or(0),
            output_tokens: u.candidates_token_count.unwrap_or(0),
            total_tokens: u.total_token_count.unwrap_or(0),
        });

        Ok(ChatResponse {
            provider: PROVIDER_NAME.into(),
            model: request.model,
            content,
            usage,
            finish_reason: candidate.finish_reason,
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }
}
