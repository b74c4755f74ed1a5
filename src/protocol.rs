//! Wire protocol for the audio streaming WebSocket
//!
//! Control messages travel as JSON text frames; audio travels as raw
//! little-endian 16-bit PCM binary frames. There is no length prefix or
//! frame marker distinguishing the two, so inbound classification tries
//! JSON first and falls back to audio.

use serde::{Deserialize, Serialize};

/// Control messages sent by the client over the stream socket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Begin a recognition stream
    Start,
    /// End the stream and request the final transcript
    Stop,
}

/// Messages sent by the server over the stream socket
///
/// `Partial` carries the running transcript so far; its `isFinal` flag is
/// always `false` on the wire. Exactly one `Final` is sent per stream,
/// after the client stops.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// Interim transcript update
    Partial { transcript: String, is_final: bool },
    /// Complete transcript for the stream
    Final { transcript: String },
    /// Recognition or protocol error
    Error { message: String },
}

/// An inbound frame classified by payload shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    /// A recognized control message
    Control(ClientMessage),
    /// Valid JSON that is not a recognized control message; ignored
    Unrecognized,
    /// Raw PCM audio bytes
    Audio(Vec<u8>),
}

impl InboundFrame {
    /// Classify an inbound frame payload.
    ///
    /// A PCM chunk whose bytes happen to form valid JSON is routed as a
    /// control attempt rather than audio; callers accept this in exchange
    /// for the prefix-free framing.
    #[must_use]
    pub fn parse(data: &[u8]) -> Self {
        if let Ok(msg) = serde_json::from_slice::<ClientMessage>(data) {
            return Self::Control(msg);
        }
        if serde_json::from_slice::<serde_json::Value>(data).is_ok() {
            return Self::Unrecognized;
        }
        Self::Audio(data.to_vec())
    }
}
