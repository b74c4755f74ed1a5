//! Streaming recognition backend seam
//!
//! The session manager talks to the upstream recognizer through these
//! traits so tests can script results without a network.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::Result;

/// One incremental result from the recognizer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptEvent {
    /// Text for this segment (interim results may be revised)
    pub transcript: String,
    /// True when the segment text is stable and should be committed
    pub is_final: bool,
}

/// Events emitted by an open recognizer stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognizerEvent {
    Transcript(TranscriptEvent),
    Error(String),
}

/// Write side of a live recognition stream
#[async_trait]
pub trait RecognizerStream: Send {
    /// Forward a chunk of 16 kHz mono PCM upstream
    ///
    /// # Errors
    ///
    /// Returns error if the upstream stream rejects the write
    async fn send_audio(&mut self, pcm: Vec<u8>) -> Result<()>;

    /// Close the write side so the recognizer flushes trailing results
    ///
    /// # Errors
    ///
    /// Returns error if the close signal cannot be delivered
    async fn finish(&mut self) -> Result<()>;

    /// Tear the stream down immediately, discarding pending results
    fn abort(&mut self);
}

/// Opens live recognition streams
///
/// Events arrive on the returned receiver in upstream order; the channel
/// closing signals the end of the upstream stream.
#[async_trait]
pub trait Recognizer: Send + Sync {
    /// Open a new stream to the recognizer
    ///
    /// # Errors
    ///
    /// Returns error if the upstream connection cannot be established
    async fn open(&self)
    -> Result<(Box<dyn RecognizerStream>, mpsc::Receiver<RecognizerEvent>)>;
}
