use crate::llm::client::{LLMClient, ModelParams};
use crate::types::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default Generative Language API endpoint
pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Model used when nothing else is configured
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

/// Gemini models advertised by `/models` without querying the API
pub const KNOWN_GEMINI_MODELS: &[&str] = &[
    "gemini-2.5-flash",
    "gemini-2.5-pro",
    "gemini-2.0-flash",
    "gemini-1.5-flash",
];

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Client for Google's Gemini models over the REST API
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    api_base: String,
    model: String,
    params: ModelParams,
}

/// A model as reported by `GET /models`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiModelInfo {
    /// Resource name, e.g. `models/gemini-2.5-flash`
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub supported_generation_methods: Vec<String>,
}

impl GeminiModelInfo {
    /// Whether the model can answer `generateContent` requests
    pub fn supports_generate_content(&self) -> bool {
        self.supported_generation_methods
            .iter()
            .any(|m| m == "generateContent")
    }
}

/// Strips the `models/` resource prefix the API uses in listings
pub fn normalize_model_name(model: &str) -> &str {
    model.strip_prefix("models/").unwrap_or(model)
}

// ============= Wire types =============

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemInstruction>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListModelsResponse {
    #[serde(default)]
    models: Vec<GeminiModelInfo>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
    status: Option<String>,
}

impl GeminiClient {
    /// Create a new Gemini client
    pub fn new(api_key: String, api_base: String, model: String, params: ModelParams) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AppError::LLM(format!("Failed to build Gemini HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_key,
            api_base: api_base.trim_end_matches('/').to_string(),
            model: normalize_model_name(&model).to_string(),
            params,
        })
    }

    fn generation_config(&self) -> GenerationConfig {
        GenerationConfig {
            temperature: self.params.temperature,
            max_output_tokens: self.params.max_tokens,
            top_p: self.params.top_p,
        }
    }

    async fn generate_content(
        &self,
        system: Option<String>,
        contents: Vec<Content>,
    ) -> Result<String> {
        let request = GenerateContentRequest {
            contents,
            system_instruction: system.map(|text| SystemInstruction {
                parts: vec![Part { text: Some(text) }],
            }),
            generation_config: self.generation_config(),
        };

        let url = format!("{}/models/{}:generateContent", self.api_base, self.model);
        tracing::debug!(model = %self.model, "Sending Gemini generateContent request");

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::LLM(format!("Gemini request failed: {}", e)))?;

        let response = check_status(response).await?;
        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| AppError::LLM(format!("Invalid Gemini response: {}", e)))?;

        extract_text(body)
    }

    /// List the models available to this API key
    ///
    /// Follows `nextPageToken` until every page has been read.
    pub async fn list_models(&self) -> Result<Vec<GeminiModelInfo>> {
        let url = format!("{}/models", self.api_base);
        let mut models = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self.http.get(&url).header("x-goog-api-key", &self.api_key);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token)]);
            }

            let response = request
                .send()
                .await
                .map_err(|e| AppError::LLM(format!("Gemini request failed: {}", e)))?;
            let page: ListModelsResponse = check_status(response)
                .await?
                .json()
                .await
                .map_err(|e| AppError::LLM(format!("Invalid Gemini model list: {}", e)))?;

            models.extend(page.models);
            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(models)
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let detail = match serde_json::from_str::<ErrorEnvelope>(&body) {
        Ok(envelope) => match envelope.error.status {
            Some(code) => format!("{} ({})", envelope.error.message, code),
            None => envelope.error.message,
        },
        Err(_) => body,
    };

    Err(AppError::LLM(format!(
        "Gemini API error {}: {}",
        status.as_u16(),
        detail
    )))
}

fn extract_text(body: GenerateContentResponse) -> Result<String> {
    let Some(candidate) = body.candidates.into_iter().next() else {
        let reason = body
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .unwrap_or_else(|| "no candidates returned".to_string());
        return Err(AppError::LLM(format!("Gemini returned no answer: {}", reason)));
    };

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.is_empty() {
        let reason = candidate.finish_reason.unwrap_or_else(|| "UNKNOWN".to_string());
        return Err(AppError::LLM(format!(
            "Gemini returned an empty answer (finish reason: {})",
            reason
        )));
    }

    Ok(text)
}

fn user_content(text: &str) -> Content {
    Content {
        role: Some("user".to_string()),
        parts: vec![Part {
            text: Some(text.to_string()),
        }],
    }
}

#[async_trait]
impl LLMClient for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.generate_content(None, vec![user_content(prompt)]).await
    }

    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String> {
        self.generate_content(Some(system.to_string()), vec![user_content(prompt)])
            .await
    }

    async fn generate_with_history(&self, messages: &[(String, String)]) -> Result<String> {
        let mut system_parts = Vec::new();
        let mut contents = Vec::new();

        for (role, content) in messages {
            match role.as_str() {
                "system" => system_parts.push(content.clone()),
                "assistant" | "model" => contents.push(Content {
                    role: Some("model".to_string()),
                    parts: vec![Part {
                        text: Some(content.clone()),
                    }],
                }),
                _ => contents.push(user_content(content)),
            }
        }

        let system = if system_parts.is_empty() {
            None
        } else {
            Some(system_parts.join("\n\n"))
        };

        self.generate_content(system, contents).await
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
