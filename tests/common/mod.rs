//! Shared test utilities

use std::path::Path;

use colloquy_gateway::api::ApiServerBuilder;

/// Build a test router with no upstream collaborators configured
///
/// Generation, synthesis, and recognition endpoints answer 503; the
/// session log endpoints write under `log_dir`.
#[must_use]
pub fn build_test_router(log_dir: &Path) -> axum::Router {
    ApiServerBuilder::new(0, log_dir.to_path_buf(), "Test topic".to_string())
        .build()
        .router()
}
