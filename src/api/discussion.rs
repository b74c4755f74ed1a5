//! Group discussion endpoints
//!
//! The endpoints are stateless: the client holds the transcript and sends
//! the memory window with each request; the append-only session log is the
//! only server-side artifact.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use serde::{Deserialize, Serialize};

use super::ApiState;
use crate::discussion::{GdTurn, SessionAnalysis, extract_analysis, prompt, topic};

/// Build the group discussion router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/ai-response", post(ai_response))
        .route("/log-speech", post(log_speech))
        .route("/start-session", post(start_session))
        .route("/end-session", post(end_session))
        .route("/analyze-session", post(analyze_session))
        .route("/generate-topic", post(generate_topic))
        .with_state(state)
}

/// GD turn request
#[derive(Debug, Deserialize)]
pub struct AiResponseRequest {
    #[serde(default)]
    pub speaker: Option<String>,
    /// Completed turns so far; the server applies the last-3 window
    #[serde(default)]
    pub memory: Vec<GdTurn>,
    #[serde(default)]
    pub topic: Option<String>,
}

/// GD turn response
#[derive(Debug, Serialize)]
pub struct AiResponseBody {
    pub response: String,
    pub speaker: String,
    /// Seconds, rounded to two decimals
    pub latency: f64,
}

/// Generate one persona's GD contribution
async fn ai_response(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<AiResponseRequest>,
) -> Result<Json<AiResponseBody>, DiscussionError> {
    let speaker = request
        .speaker
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or(DiscussionError::BadRequest("No speaker provided"))?;

    let generator = state
        .generator
        .as_ref()
        .ok_or(DiscussionError::NotConfigured("generation not configured"))?;

    let gd_topic = request.topic.as_deref().unwrap_or(&state.default_topic);

    let prompt_text = if prompt::is_opening_turn(speaker, &request.memory) {
        prompt::gd_opening(gd_topic, speaker)
    } else {
        prompt::gd_turn(gd_topic, speaker, &request.memory)
    };

    let reply = generator
        .generate(&prompt_text)
        .await
        .map_err(|e| DiscussionError::GenerationFailed(e.to_string()))?;

    if let Err(e) =
        state
            .session_log
            .prompt_exchange(speaker, &prompt_text, &reply.text, reply.latency_seconds)
    {
        tracing::warn!(error = %e, "failed to log prompt exchange");
    }

    Ok(Json(AiResponseBody {
        response: reply.text,
        speaker: speaker.to_string(),
        latency: reply.latency_seconds,
    }))
}

/// Speech log request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogSpeechRequest {
    #[serde(default)]
    pub speaker: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub turn_number: Option<u32>,
    /// Playback duration in seconds
    #[serde(default)]
    pub duration: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct SuccessBody {
    pub success: bool,
}

/// Append one completed speech to the session log
async fn log_speech(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<LogSpeechRequest>,
) -> Result<Json<SuccessBody>, DiscussionError> {
    let speaker = request
        .speaker
        .as_deref()
        .ok_or(DiscussionError::BadRequest("No speaker provided"))?;
    let text = request
        .text
        .as_deref()
        .ok_or(DiscussionError::BadRequest("No text provided"))?;

    state
        .session_log
        .speech(speaker, text, request.turn_number, request.duration)
        .map_err(|e| DiscussionError::LogFailed(e.to_string()))?;

    Ok(Json(SuccessBody { success: true }))
}

/// Session start request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionRequest {
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub user_name: Option<String>,
}

/// Append a session header marking a new discussion
async fn start_session(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<StartSessionRequest>,
) -> Result<Json<SuccessBody>, DiscussionError> {
    state
        .session_log
        .session_header(request.topic.as_deref(), request.user_name.as_deref())
        .map_err(|e| DiscussionError::LogFailed(e.to_string()))?;

    Ok(Json(SuccessBody { success: true }))
}

/// Session end request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndSessionRequest {
    #[serde(default)]
    pub total_duration: Option<String>,
    #[serde(default)]
    pub total_turns: Option<u32>,
    #[serde(default)]
    pub user_turns: Option<u32>,
    #[serde(default)]
    pub participants: Option<String>,
}

/// Append the end-of-session summary block
async fn end_session(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<EndSessionRequest>,
) -> Result<Json<SuccessBody>, DiscussionError> {
    state
        .session_log
        .session_summary(
            request.total_duration.as_deref(),
            request.total_turns,
            request.user_turns,
            request.participants.as_deref(),
        )
        .map_err(|e| DiscussionError::LogFailed(e.to_string()))?;

    Ok(Json(SuccessBody { success: true }))
}

/// Session analysis request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeSessionRequest {
    #[serde(default)]
    pub transcript: Option<Vec<GdTurn>>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub total_duration: Option<String>,
    #[serde(default)]
    pub participant_count: Option<u32>,
}

/// Session analysis response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeSessionBody {
    pub success: bool,
    pub analysis: SessionAnalysis,
    pub session_overview: SessionOverview,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionOverview {
    pub topic: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    pub participant_count: u32,
    pub user_turn_count: usize,
}

/// Evaluate the finished discussion and return the structured report
async fn analyze_session(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<AnalyzeSessionRequest>,
) -> Result<Json<AnalyzeSessionBody>, DiscussionError> {
    let transcript = request
        .transcript
        .as_deref()
        .filter(|t| !t.is_empty())
        .ok_or(DiscussionError::BadRequest("Missing transcript or topic"))?;
    let gd_topic = request
        .topic
        .as_deref()
        .filter(|t| !t.is_empty())
        .ok_or(DiscussionError::BadRequest("Missing transcript or topic"))?;

    let generator = state
        .generator
        .as_ref()
        .ok_or(DiscussionError::NotConfigured("generation not configured"))?;

    let prompt_text = prompt::analysis(
        transcript,
        gd_topic,
        request.user_name.as_deref(),
        request.total_duration.as_deref(),
        request.participant_count,
    );

    let reply = generator
        .generate(&prompt_text)
        .await
        .map_err(|e| DiscussionError::GenerationFailed(e.to_string()))?;

    let analysis = extract_analysis(&reply.text);
    let user_turn_count = transcript.iter().filter(|t| t.speaker == "User").count();

    Ok(Json(AnalyzeSessionBody {
        success: true,
        analysis,
        session_overview: SessionOverview {
            topic: gd_topic.to_string(),
            duration: request.total_duration.clone(),
            participant_count: request.participant_count.unwrap_or(5),
            user_turn_count,
        },
    }))
}

/// Topic generation request
#[derive(Debug, Deserialize)]
pub struct GenerateTopicRequest {
    #[serde(default)]
    pub genre: Option<String>,
}

/// Topic generation response
#[derive(Debug, Serialize)]
pub struct GenerateTopicBody {
    pub topic: String,
    pub genre: String,
}

/// Generate a debatable GD topic for a genre; absent genre picks one at
/// random from the table
async fn generate_topic(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<GenerateTopicRequest>,
) -> Result<Json<GenerateTopicBody>, DiscussionError> {
    let generator = state
        .generator
        .as_ref()
        .ok_or(DiscussionError::NotConfigured("generation not configured"))?;

    let genre = request
        .genre
        .as_deref()
        .filter(|g| !g.is_empty())
        .unwrap_or_else(|| topic::random_genre());

    let reply = generator
        .generate_topic(&prompt::topic(topic::genre_name(genre)))
        .await
        .map_err(|e| DiscussionError::GenerationFailed(e.to_string()))?;

    Ok(Json(GenerateTopicBody {
        topic: reply.text.trim().to_string(),
        genre: genre.to_string(),
    }))
}

/// Discussion API errors
#[derive(Debug)]
pub enum DiscussionError {
    NotConfigured(&'static str),
    BadRequest(&'static str),
    GenerationFailed(String),
    LogFailed(String),
}

impl IntoResponse for DiscussionError {
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
            Self::LogFailed(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "log_failed", msg),
        };

        (status, Json(ErrorResponse { error: ErrorBody { code, message } })).into_response()
    }
}
