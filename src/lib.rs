//! Colloquy Gateway - voice streaming gateway for AI conversation practice
//!
//! This library provides the core functionality for the Colloquy gateway:
//! - Real-time audio streaming (duplex WebSocket, PCM resampling/encoding)
//! - Per-connection speech recognition session lifecycle
//! - Turn coordination between "AI speaks" and "user records"
//! - Group discussion simulation with personas and rolling memory
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                     Client                           │
//! │   Capture → Resample/Encode → AudioChannel           │
//! │   TurnCoordinator → Playback                         │
//! └────────────────────┬─────────────────────────────────┘
//!                      │ ws: JSON control + binary PCM
//! ┌────────────────────▼─────────────────────────────────┐
//! │                Colloquy Gateway                      │
//! │   RecognitionSession │ Speech API │ Discussion API   │
//! └────────────────────┬─────────────────────────────────┘
//!                      │
//! ┌────────────────────▼─────────────────────────────────┐
//! │              Upstream services                       │
//! │   Deepgram live STT │ Gemini │ Cloud Text-to-Speech  │
//! └──────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod audio;
pub mod channel;
pub mod config;
pub mod discussion;
pub mod error;
pub mod protocol;
pub mod recognition;
pub mod services;
pub mod turn;

pub use channel::AudioChannel;
pub use config::Config;
pub use error::{Error, Result};
pub use protocol::{ClientMessage, InboundFrame, ServerMessage};
pub use recognition::{RecognitionSession, Recognizer, RecognizerEvent, SessionState};
pub use turn::{ConversationState, Phase, TurnCoordinator};
