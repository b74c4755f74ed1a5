//! Voice synthesis via the Google Cloud Text-to-Speech API

use std::time::Instant;

use base64::Engine;

use crate::services::{REQUEST_TIMEOUT, round_seconds};
use crate::{Error, Result};

const SYNTHESIZE_URL: &str = "https://texttospeech.googleapis.com/v1/text:synthesize";

/// Synthesized-voice parameters for one speaker
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceParams {
    pub language: &'static str,
    pub name: &'static str,
    pub gender: &'static str,
    /// Speaking rate multiplier (1.0 = normal)
    pub rate: f64,
    /// Pitch offset in semitones
    pub pitch: f64,
}

/// Response from the synthesis API
#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    audio_content: String,
}

/// Synthesized MP3 audio plus the measured request latency
#[derive(Debug, Clone)]
pub struct SynthesizedSpeech {
    pub audio: Vec<u8>,
    /// Seconds, rounded to two decimals
    pub latency_seconds: f64,
}

/// Synthesizes speech as MP3 audio
pub struct SpeechSynthesizer {
    client: reqwest::Client,
    api_key: String,
}

impl SpeechSynthesizer {
    /// Create a new synthesizer
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new(api_key: String) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config(
                "Google API key required for synthesis".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
        })
    }

    /// Synthesize text with the given voice
    ///
    /// # Errors
    ///
    /// Returns error if the request fails, times out, or returns
    /// undecodable audio
    pub async fn synthesize(&self, text: &str, voice: &VoiceParams) -> Result<SynthesizedSpeech> {
        tracing::debug!(voice = voice.name, text_chars = text.len(), "starting synthesis");
        let started = Instant::now();

        let body = serde_json::json!({
            "input": { "text": text },
            "voice": {
                "languageCode": voice.language,
                "name": voice.name,
                "ssmlGender": voice.gender,
            },
            "audioConfig": {
                "audioEncoding": "MP3",
                "speakingRate": voice.rate,
                "pitch": voice.pitch,
            },
        });

        let response = self
            .client
            .post(SYNTHESIZE_URL)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "synthesis request failed");
                e
            })?;

        let status = response.status();
        tracing::debug!(status = %status, "received response");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "synthesis API error");
            return Err(Error::Synthesis(format!(
                "synthesis API error {status}: {body}"
            )));
        }

        let result: SynthesizeResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "failed to parse synthesis response");
            e
        })?;

        let audio = base64::engine::general_purpose::STANDARD
            .decode(&result.audio_content)
            .map_err(|e| Error::Synthesis(format!("invalid audio encoding: {e}")))?;

        let latency_seconds = round_seconds(started.elapsed());
        tracing::info!(latency = latency_seconds, audio_bytes = audio.len(), "synthesis complete");

        Ok(SynthesizedSpeech {
            audio,
            latency_seconds,
        })
    }
}
