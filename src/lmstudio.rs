// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Photosort contributors

//! LM Studio API client for local vision inference
//!
//! Talks to the OpenAI-compatible endpoints exposed by LM Studio
//! (`/v1/models`, `/v1/chat/completions`). Constructed once per run and
//! passed by reference to everything that needs it.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use crate::{PhotosortError, Result};

/// LM Studio API client
pub struct LmStudioClient {
    client: Client,
    base_url: String,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: Vec<ContentPart>,
}

#[derive(Serialize)]
#[serde(tag = "type")]
enum ContentPart {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: String,
}

#[derive(Deserialize)]
struct ModelsResponse {
    data: Vec<ModelInfo>,
}

#[derive(Deserialize)]
struct ModelInfo {
    id: String,
}

impl LmStudioClient {
    /// Create a new LM Studio client
    pub fn new(base_url: &str, timeout_secs: u64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        // Normalize URL
        let base_url = base_url
            .trim_end_matches('/')
            .trim_end_matches("/v1")
            .to_string();

        Self { client, base_url }
    }

    /// Check if LM Studio is reachable
    pub async fn health_check(&self) -> Result<()> {
        let url = format!("{}/v1/models", self.base_url);

        self.client
            .get(&url)
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| {
                PhotosortError::Inference(format!(
                    "Cannot connect to LM Studio at {}: {}. Is the server running?",
                    self.base_url, e
                ))
            })?;

        Ok(())
    }

    /// List available models
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let url = format!("{}/v1/models", self.base_url);

        let response = self.client.get(&url).send().await?;
        let models: ModelsResponse = response.json().await?;
        Ok(models.data.into_iter().map(|m| m.id).collect())
    }

    /// Resolve which model to use for this run.
    ///
    /// An explicitly requested model must be present on the server; with no
    /// request, the first loaded model is selected.
    pub async fn resolve_model(&self, requested: Option<&str>) -> Result<String> {
        let models = self.list_models().await?;

        if models.is_empty() {
            return Err(PhotosortError::Inference(
                "No models found in LM Studio. Please load a model first.".to_string(),
            ));
        }

        match requested {
            Some(name) => {
                if models.iter().any(|m| m == name || m.starts_with(name)) {
                    Ok(name.to_string())
                } else {
                    Err(PhotosortError::Config(format!(
                        "Model '{}' not found on server. Available: {:?}",
                        name, models
                    )))
                }
            }
            None => {
                let model = models[0].clone();
                info!("No model configured, using '{}'", model);
                Ok(model)
            }
        }
    }

    /// Send a vision chat request with an inline base64-encoded image.
    ///
    /// Returns the raw text content of the first choice. A non-success
    /// status becomes an inference error carrying the upstream status and
    /// body so the caller can log it and skip the image.
    pub async fn chat_with_image(
        &self,
        model: &str,
        prompt: &str,
        image_base64: &str,
    ) -> Result<String> {
        let url = format!("{}/v1/chat/completions", self.base_url);

        let request = ChatRequest {
            model: model.to_string(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: vec![
                    ContentPart::Text {
                        text: prompt.to_string(),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: format!("data:image/jpeg;base64,{}", image_base64),
                        },
                    },
                ],
            }],
        };

        debug!("Sending vision request to LM Studio: model={}", model);

        let response = self.client.post(&url).json(&request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PhotosortError::Inference(format!(
                "LM Studio returned status {}: {}",
                status, body
            )));
        }

        let result: ChatResponse = response
            .json()
            .await
            .map_err(|e| PhotosortError::Parse(format!("Invalid completion payload: {}", e)))?;

        result
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| PhotosortError::Parse("Completion contained no choices".to_string()))
    }

    /// Base URL this client talks to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}
