//! Configuration management for the Colloquy gateway

use std::path::PathBuf;

use crate::discussion::DEFAULT_TOPIC;

/// Gateway configuration, assembled from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Port the HTTP/WebSocket server listens on
    pub port: u16,

    /// Allowed CORS origin; `None` keeps the permissive development default
    pub frontend_url: Option<String>,

    /// Path to static files directory (web UI)
    pub static_dir: Option<PathBuf>,

    /// Directory for session and prompt logs
    pub log_dir: PathBuf,

    /// Discussion topic used when a session does not supply one
    pub default_topic: String,

    /// Google Cloud region for text generation requests
    pub gcp_region: String,

    /// API keys for external services
    pub api_keys: ApiKeys,

    /// Upstream model identifiers
    pub models: Models,
}

/// API keys for external services
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    /// `Deepgram` API key (live speech recognition)
    pub deepgram: Option<String>,

    /// Google API key (text generation and speech synthesis)
    pub google: Option<String>,
}

/// Upstream model identifiers
#[derive(Debug, Clone)]
pub struct Models {
    /// Text generation model for replies and analysis
    pub generation: String,

    /// Cheaper model for topic generation
    pub topic: String,

    /// Live recognition model
    pub recognition: String,
}

impl Config {
    /// Assemble configuration from the environment, falling back to
    /// development defaults for everything but API keys
    #[must_use]
    pub fn from_env() -> Self {
        let port = std::env::var("COLLOQUY_PORT")
            .or_else(|_| std::env::var("PORT"))
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3000);

        let api_keys = ApiKeys {
            deepgram: std::env::var("DEEPGRAM_API_KEY").ok(),
            google: std::env::var("GOOGLE_API_KEY").ok(),
        };

        let models = Models {
            generation: std::env::var("COLLOQUY_GENERATION_MODEL")
                .unwrap_or_else(|_| "gemini-2.5-pro".to_string()),
            topic: std::env::var("COLLOQUY_TOPIC_MODEL")
                .unwrap_or_else(|_| "gemini-2.5-flash".to_string()),
            recognition: std::env::var("COLLOQUY_RECOGNITION_MODEL")
                .unwrap_or_else(|_| "nova-2".to_string()),
        };

        // Session logs land in the XDG data dir unless overridden
        // (~/.local/share/colloquy on Linux)
        let log_dir = std::env::var("COLLOQUY_LOG_DIR").map_or_else(
            |_| {
                directories::ProjectDirs::from("dev", "colloquy", "colloquy")
                    .map_or_else(|| PathBuf::from("logs"), |d| d.data_dir().to_path_buf())
            },
            PathBuf::from,
        );

        Self {
            port,
            frontend_url: std::env::var("FRONTEND_URL").ok(),
            static_dir: std::env::var("COLLOQUY_STATIC_DIR").ok().map(PathBuf::from),
            log_dir,
            default_topic: std::env::var("COLLOQUY_TOPIC")
                .unwrap_or_else(|_| DEFAULT_TOPIC.to_string()),
            gcp_region: std::env::var("GCP_REGION").unwrap_or_else(|_| "us-central1".to_string()),
            api_keys,
            models,
        }
    }
}
