//! Health check endpoints

use std::sync::Arc;

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use serde::Serialize;

use super::ApiState;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Detailed readiness response
#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: &'static str,
    pub checks: ReadinessChecks,
}

/// Individual readiness checks
#[derive(Serialize)]
pub struct ReadinessChecks {
    pub generation: CheckResult,
    pub synthesis: CheckResult,
    pub recognition: CheckResult,
    pub session_log: CheckResult,
}

/// Result of a single health check
#[derive(Serialize)]
pub struct CheckResult {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CheckResult {
    const fn ok() -> Self {
        Self {
            status: "ok",
            message: None,
        }
    }

    fn fail(message: impl Into<String>) -> Self {
        Self {
            status: "fail",
            message: Some(message.into()),
        }
    }

    fn unavailable() -> Self {
        Self {
            status: "unavailable",
            message: Some("not configured".to_string()),
        }
    }

    fn configured(present: bool) -> Self {
        if present {
            Self::ok()
        } else {
            Self::unavailable()
        }
    }
}

/// Liveness probe - is the service running?
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Readiness probe - is the service ready to accept traffic?
///
/// Unconfigured collaborators report `unavailable` without degrading the
/// service; only an unwritable log directory does.
async fn ready(State(state): State<Arc<ApiState>>) -> (StatusCode, Json<ReadinessResponse>) {
    let log_check = check_session_log(&state);

    let all_ok = log_check.status == "ok";
    let status = if all_ok { "ok" } else { "degraded" };
    let http_status = if all_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        http_status,
        Json(ReadinessResponse {
            status,
            checks: ReadinessChecks {
                generation: CheckResult::configured(state.generator.is_some()),
                synthesis: CheckResult::configured(state.synthesizer.is_some()),
                recognition: CheckResult::configured(state.recognizer.is_some()),
                session_log: log_check,
            },
        }),
    )
}

/// Check the session log directory is creatable/writable
fn check_session_log(state: &ApiState) -> CheckResult {
    match std::fs::create_dir_all(state.session_log.dir()) {
        Ok(()) => CheckResult::ok(),
        Err(e) => CheckResult::fail(format!("log directory unavailable: {e}")),
    }
}

/// Build health check router
pub fn router() -> Router {
    Router::new().route("/health", get(health))
}

/// Build readiness router with state
pub fn ready_router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/ready", get(ready))
        .with_state(state)
}
