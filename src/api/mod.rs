//! HTTP and WebSocket API server for the Colloquy gateway

pub mod discussion;
pub mod health;
pub mod speech;
pub mod stream;

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::Result;
use crate::config::Config;
use crate::discussion::SessionLog;
use crate::recognition::{DeepgramRecognizer, Recognizer};
use crate::services::{SpeechSynthesizer, TextGenerator};

/// Shared state for API handlers
///
/// Collaborators are `None` when their API key is absent; the affected
/// endpoints answer 503 and the rest of the server keeps running.
pub struct ApiState {
    pub generator: Option<Arc<TextGenerator>>,
    pub synthesizer: Option<Arc<SpeechSynthesizer>>,
    pub recognizer: Option<Arc<dyn Recognizer>>,
    pub session_log: SessionLog,
    pub default_topic: String,
}

/// Configuration for building an API server
pub struct ApiServerBuilder {
    port: u16,
    frontend_url: Option<String>,
    static_dir: Option<PathBuf>,
    generator: Option<Arc<TextGenerator>>,
    synthesizer: Option<Arc<SpeechSynthesizer>>,
    recognizer: Option<Arc<dyn Recognizer>>,
    session_log: SessionLog,
    default_topic: String,
}

impl ApiServerBuilder {
    /// Create a new API server builder
    #[must_use]
    pub fn new(port: u16, log_dir: PathBuf, default_topic: String) -> Self {
        Self {
            port,
            frontend_url: None,
            static_dir: None,
            generator: None,
            synthesizer: None,
            recognizer: None,
            session_log: SessionLog::new(log_dir),
            default_topic,
        }
    }

    /// Assemble a builder from gateway configuration, wiring every
    /// collaborator whose API key is present
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let generator = config.api_keys.google.as_ref().and_then(|key| {
            TextGenerator::new(
                key.clone(),
                config.gcp_region.clone(),
                config.models.generation.clone(),
                config.models.topic.clone(),
            )
            .map(Arc::new)
            .ok()
        });

        let synthesizer = config
            .api_keys
            .google
            .as_ref()
            .and_then(|key| SpeechSynthesizer::new(key.clone()).map(Arc::new).ok());

        let recognizer: Option<Arc<dyn Recognizer>> =
            config.api_keys.deepgram.as_ref().and_then(|key| {
                DeepgramRecognizer::new(key.clone(), config.models.recognition.clone())
                    .map(|r| Arc::new(r) as Arc<dyn Recognizer>)
                    .ok()
            });

        if generator.is_none() {
            tracing::warn!("GOOGLE_API_KEY not set, generation and synthesis disabled");
        }
        if recognizer.is_none() {
            tracing::warn!("DEEPGRAM_API_KEY not set, streaming recognition disabled");
        }

        Self {
            port: config.port,
            frontend_url: config.frontend_url.clone(),
            static_dir: config.static_dir.clone(),
            generator,
            synthesizer,
            recognizer,
            session_log: SessionLog::new(config.log_dir.clone()),
            default_topic: config.default_topic.clone(),
        }
    }

    /// Set the allowed CORS origin; absent = any origin
    #[must_use]
    pub fn frontend_url(mut self, url: Option<String>) -> Self {
        self.frontend_url = url;
        self
    }

    /// Set the static files directory for serving the web UI
    #[must_use]
    pub fn static_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.static_dir = dir;
        self
    }

    /// Set the text generation client
    #[must_use]
    pub fn generator(mut self, generator: Arc<TextGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Set the voice synthesis client
    #[must_use]
    pub fn synthesizer(mut self, synthesizer: Arc<SpeechSynthesizer>) -> Self {
        self.synthesizer = Some(synthesizer);
        self
    }

    /// Set the streaming recognition backend
    #[must_use]
    pub fn recognizer(mut self, recognizer: Arc<dyn Recognizer>) -> Self {
        self.recognizer = Some(recognizer);
        self
    }

    /// Build the API server
    #[must_use]
    pub fn build(self) -> ApiServer {
        let state = Arc::new(ApiState {
            generator: self.generator,
            synthesizer: self.synthesizer,
            recognizer: self.recognizer,
            session_log: self.session_log,
            default_topic: self.default_topic,
        });

        ApiServer {
            state,
            port: self.port,
            frontend_url: self.frontend_url,
            static_dir: self.static_dir,
        }
    }
}

/// API server
pub struct ApiServer {
    state: Arc<ApiState>,
    port: u16,
    frontend_url: Option<String>,
    static_dir: Option<PathBuf>,
}

impl ApiServer {
    /// Build the router with all routes
    #[must_use]
    pub fn router(&self) -> Router {
        let mut router = Router::new()
            .merge(speech::router(self.state.clone()))
            .nest("/v4", discussion::router(self.state.clone()))
            .nest("/ws", stream::router(self.state.clone()))
            .merge(health::router())
            .merge(health::ready_router(self.state.clone()));

        // Serve the demo frontend if configured
        if let Some(static_dir) = &self.static_dir {
            let index_file = static_dir.join("index.html");
            let serve_dir = ServeDir::new(static_dir).not_found_service(ServeFile::new(&index_file));

            router = router.fallback_service(serve_dir);
            tracing::info!(path = %static_dir.display(), "serving static files");
        }

        let cors = match self
            .frontend_url
            .as_deref()
            .and_then(|url| url.parse::<axum::http::HeaderValue>().ok())
        {
            Some(origin) => CorsLayer::new()
                .allow_origin([origin])
                .allow_methods(Any)
                .allow_headers(Any),
            None => CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        };

        router.layer(cors).layer(TraceLayer::new_for_http())
    }

    /// Run the API server
    ///
    /// # Errors
    ///
    /// Returns error if the server fails to bind or run
    pub async fn run(self) -> Result<()> {
        let addr = format!("0.0.0.0:{}", self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| crate::Error::Config(format!("failed to bind API server: {e}")))?;

        tracing::info!(port = self.port, "API server listening");

        axum::serve(listener, self.router())
            .await
            .map_err(|e| crate::Error::Config(format!("API server error: {e}")))?;

        Ok(())
    }

    /// Run the API server in a background task
    #[must_use]
    pub fn spawn(self) -> tokio::task::JoinHandle<Result<()>> {
        tokio::spawn(async move { self.run().await })
    }
}
