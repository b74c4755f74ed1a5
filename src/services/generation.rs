//! Text generation via the Gemini `generateContent` API

use std::time::Instant;

use crate::services::{REQUEST_TIMEOUT, round_seconds};
use crate::{Error, Result};

/// Response from the Gemini `generateContent` API
#[derive(serde::Deserialize)]
struct GenerateResponse {
    candidates: Vec<GenerateCandidate>,
}

#[derive(serde::Deserialize)]
struct GenerateCandidate {
    content: CandidateContent,
}

#[derive(serde::Deserialize)]
struct CandidateContent {
    parts: Vec<ContentPart>,
}

#[derive(serde::Deserialize)]
struct ContentPart {
    text: String,
}

/// A generated reply plus the measured request latency
#[derive(Debug, Clone)]
pub struct GenerationReply {
    pub text: String,
    /// Seconds, rounded to two decimals
    pub latency_seconds: f64,
}

/// Generates reply text through the regional Gemini publisher endpoint
pub struct TextGenerator {
    client: reqwest::Client,
    api_key: String,
    region: String,
    model: String,
    topic_model: String,
}

impl TextGenerator {
    /// Create a new generator
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new(
        api_key: String,
        region: String,
        model: String,
        topic_model: String,
    ) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config(
                "Google API key required for generation".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            region,
            model,
            topic_model,
        })
    }

    /// Generate a reply with the conversation model
    ///
    /// # Errors
    ///
    /// Returns error if the request fails, times out, or returns no text
    pub async fn generate(&self, prompt: &str) -> Result<GenerationReply> {
        self.generate_with(&self.model, prompt).await
    }

    /// Generate with the lighter topic model
    ///
    /// # Errors
    ///
    /// Returns error if the request fails, times out, or returns no text
    pub async fn generate_topic(&self, prompt: &str) -> Result<GenerationReply> {
        self.generate_with(&self.topic_model, prompt).await
    }

    async fn generate_with(&self, model: &str, prompt: &str) -> Result<GenerationReply> {
        tracing::debug!(model, prompt_chars = prompt.len(), "starting generation");
        let started = Instant::now();

        let url = format!(
            "https://{}-aiplatform.googleapis.com/v1/publishers/google/models/{}:generateContent",
            self.region, model
        );

        let body = serde_json::json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }]
        });

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "generation request failed");
                e
            })?;

        let status = response.status();
        tracing::debug!(status = %status, "received response");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "generation API error");
            return Err(Error::Generation(format!(
                "generation API error {status}: {body}"
            )));
        }

        let result: GenerateResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "failed to parse generation response");
            e
        })?;

        let text = result
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| Error::Generation("generation returned no candidates".to_string()))?;

        let latency_seconds = round_seconds(started.elapsed());
        tracing::info!(latency = latency_seconds, reply_chars = text.len(), "generation complete");

        Ok(GenerationReply {
            text,
            latency_seconds,
        })
    }
}
