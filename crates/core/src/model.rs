use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use crate::{
    endpoints::Endpoints,
    error::{NotesError, Result},
    http::{failure_message, model_transport},
};

pub const MAX_OUTPUT_TOKENS: u32 = 8192;

/// A text-in, text-out language model.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Send one prompt, return the text of the first candidate.
    async fn generate(&self, prompt: &str, max_output_tokens: Option<u32>) -> Result<String>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: [Content<'a>; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
}

/// Gemini `generateContent` over REST, keyed by API key.
pub struct GeminiClient {
    client: Client,
    url: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(client: Client, endpoints: &Endpoints, model: &str, api_key: &str) -> Self {
        Self {
            client,
            url: endpoints.generate_url(model),
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait]
impl ModelClient for GeminiClient {
    async fn generate(&self, prompt: &str, max_output_tokens: Option<u32>) -> Result<String> {
        let body = GenerateContentRequest {
            contents: [Content {
                parts: [Part { text: prompt }],
            }],
            generation_config: max_output_tokens.map(|max_output_tokens| GenerationConfig {
                max_output_tokens,
            }),
        };

        debug!(prompt_chars = prompt.chars().count(), "sending generateContent request");
        let response = self
            .client
            .post(&self.url)
            .query(&[("key", &self.api_key)])
            .json(&body)
            .send()
            .await
            .map_err(model_transport)?;

        if !response.status().is_success() {
            let (_, message) = failure_message(response).await;
            return Err(NotesError::ModelRequest(message));
        }

        let response = response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| NotesError::ModelResponse(format!("reply is not JSON: {e}")))?;

        response["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| {
                NotesError::ModelResponse(format!("Invalid API response structure: {response}"))
            })
    }
}
