//! Conversation endpoints: opening speech, chat replies, voice synthesis

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use base64::Engine;
use serde::{Deserialize, Serialize};

use super::ApiState;
use crate::discussion::{persona, prompt};

/// Build the speech router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/initial-speech", post(initial_speech))
        .route("/chat", post(chat))
        .route("/synthesize", post(synthesize))
        .with_state(state)
}

/// Generated reply response
#[derive(Debug, Serialize)]
pub struct ReplyResponse {
    pub response: String,
    /// Seconds, rounded to two decimals
    pub latency: f64,
}

/// Opening utterance for the two-party conversation, with no prior user text
async fn initial_speech(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<ReplyResponse>, SpeechError> {
    let generator = state
        .generator
        .as_ref()
        .ok_or(SpeechError::NotConfigured("generation not configured"))?;

    let reply = generator
        .generate(prompt::OPENING_SPEECH)
        .await
        .map_err(|e| SpeechError::GenerationFailed(e.to_string()))?;

    Ok(Json(ReplyResponse {
        response: reply.text,
        latency: reply.latency_seconds,
    }))
}

/// Chat request
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub text: Option<String>,
}

/// Reply to the user's finalized utterance
async fn chat(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ReplyResponse>, SpeechError> {
    let text = request
        .text
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(SpeechError::BadRequest("No text provided"))?;

    let generator = state
        .generator
        .as_ref()
        .ok_or(SpeechError::NotConfigured("generation not configured"))?;

    let reply = generator
        .generate(&prompt::reply(text))
        .await
        .map_err(|e| SpeechError::GenerationFailed(e.to_string()))?;

    Ok(Json(ReplyResponse {
        response: reply.text,
        latency: reply.latency_seconds,
    }))
}

/// Synthesis request
#[derive(Debug, Deserialize)]
pub struct SynthesizeRequest {
    #[serde(default)]
    pub text: Option<String>,
    /// Persona selector mapping to the voice table; absent or unknown
    /// falls back to the default voice
    #[serde(default)]
    pub speaker: Option<String>,
}

/// Synthesis response
#[derive(Debug, Serialize)]
pub struct SynthesizeResponse {
    /// Base64-encoded MP3 audio
    pub audio: String,
    /// Seconds, rounded to two decimals
    pub latency: f64,
}

/// Synthesize text to speaker-specific MP3 audio
async fn synthesize(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<SynthesizeRequest>,
) -> Result<Json<SynthesizeResponse>, SpeechError> {
    let text = request
        .text
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .ok_or(SpeechError::BadRequest("No text provided"))?;

    let synthesizer = state
        .synthesizer
        .as_ref()
        .ok_or(SpeechError::NotConfigured("synthesis not configured"))?;

    let voice = persona::voice_for(request.speaker.as_deref());
    let speech = synthesizer
        .synthesize(text, &voice)
        .await
        .map_err(|e| SpeechError::SynthesisFailed(e.to_string()))?;

    Ok(Json(SynthesizeResponse {
        audio: base64::engine::general_purpose::STANDARD.encode(&speech.audio),
        latency: speech.latency_seconds,
    }))
}

/// Speech API errors
#[derive(Debug)]
pub enum SpeechError {
    NotConfigured(&'static str),
    BadRequest(&'static str),
    GenerationFailed(String),
    SynthesisFailed(String),
}

impl IntoResponse for SpeechError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: ErrorBody,
        }

        #[derive(Serialize)]
        struct ErrorBody {
            code: &'static str,
            message: String,
        }

        let (status, code, message) = match self {
            Self::NotConfigured(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "not_configured", msg.to_string())
            }
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.to_string()),
            Self::GenerationFailed(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "generation_failed", msg)
            }
            Self::SynthesisFailed(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "synthesis_failed", msg)
            }
        };

        (status, Json(ErrorResponse { error: ErrorBody { code, message } })).into_response()
    }
}
