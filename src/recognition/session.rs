//! Per-connection recognition session lifecycle

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::Result;
use crate::protocol::ServerMessage;
use crate::recognition::{Recognizer, RecognizerEvent, RecognizerStream};

/// Window after stop during which trailing upstream results still commit
pub const FINALIZE_GRACE: Duration = Duration::from_millis(500);

/// Lifecycle state of a recognition session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No upstream stream open
    Idle,
    /// Audio frames are being forwarded upstream
    Streaming,
    /// Write side closed, waiting out the finalize grace window
    Finalizing,
}

/// Outcome of a stop request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// Write side closed; the caller should arm the finalize grace timer
    Finalizing,
    /// There was no active stream to stop
    NotStreaming,
    /// A stop is already in flight; nothing to do
    AlreadyStopping,
}

/// Server-side recognition state for one duplex connection
///
/// Drives the `Idle → Streaming → Finalizing → Idle` lifecycle and owns the
/// accumulated transcript. The caller holds the event receiver returned by
/// [`start`](Self::start), feeds events back through
/// [`on_event`](Self::on_event), and owns the grace timer, so this type
/// stays timer-free and synchronous to test.
pub struct RecognitionSession {
    recognizer: Arc<dyn Recognizer>,
    state: SessionState,
    accumulator: String,
    stream: Option<Box<dyn RecognizerStream>>,
}

impl RecognitionSession {
    #[must_use]
    pub fn new(recognizer: Arc<dyn Recognizer>) -> Self {
        Self {
            recognizer,
            state: SessionState::Idle,
            accumulator: String::new(),
            stream: None,
        }
    }

    /// Current lifecycle state
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Accumulated transcript so far (committed segments only)
    #[must_use]
    pub fn transcript(&self) -> &str {
        &self.accumulator
    }

    /// Open a fresh upstream stream and reset the accumulator.
    ///
    /// A start while a stream is already active resets the session: the old
    /// stream is aborted and a fresh one opened, so the client always gets
    /// deterministic state after a reconnect race.
    ///
    /// # Errors
    ///
    /// Returns error if the upstream connection cannot be established; the
    /// session is left `Idle`.
    pub async fn start(&mut self) -> Result<mpsc::Receiver<RecognizerEvent>> {
        if self.state != SessionState::Idle {
            tracing::warn!(state = ?self.state, "start while stream active, resetting session");
            if let Some(mut stream) = self.stream.take() {
                stream.abort();
            }
            self.state = SessionState::Idle;
        }

        self.accumulator.clear();

        let (stream, events) = self.recognizer.open().await?;
        self.stream = Some(stream);
        self.state = SessionState::Streaming;

        tracing::info!("recognition stream started");
        Ok(events)
    }

    /// Forward one audio frame upstream, in arrival order.
    ///
    /// Frames outside `Streaming` are dropped: with no stream open there is
    /// nothing to feed, and after stop the write side is already closed.
    ///
    /// # Errors
    ///
    /// Returns error if the upstream stream rejects the write
    pub async fn push_audio(&mut self, pcm: Vec<u8>) -> Result<()> {
        match self.state {
            SessionState::Streaming => {
                if let Some(stream) = self.stream.as_mut() {
                    stream.send_audio(pcm).await?;
                }
                Ok(())
            }
            SessionState::Idle => {
                tracing::warn!(bytes = pcm.len(), "audio frame with no active stream, dropping");
                Ok(())
            }
            SessionState::Finalizing => {
                tracing::debug!(bytes = pcm.len(), "audio frame after stop, dropping");
                Ok(())
            }
        }
    }

    /// Close the upstream write side and enter `Finalizing`.
    ///
    /// A failed close signal is logged and the session still finalizes; the
    /// grace window bounds the wait either way.
    pub async fn stop(&mut self) -> StopOutcome {
        match self.state {
            SessionState::Streaming => {
                if let Some(stream) = self.stream.as_mut() {
                    if let Err(e) = stream.finish().await {
                        tracing::warn!(error = %e, "failed to close recognizer write side");
                    }
                }
                self.state = SessionState::Finalizing;
                StopOutcome::Finalizing
            }
            SessionState::Idle => StopOutcome::NotStreaming,
            SessionState::Finalizing => StopOutcome::AlreadyStopping,
        }
    }

    /// Apply one upstream event, returning the message to relay, if any.
    ///
    /// Final-for-segment results commit `text + " "` to the accumulator and
    /// relay the trimmed running total; interim results relay the running
    /// total plus the unconfirmed tail without committing anything. An
    /// upstream error tears the session down to `Idle`.
    pub fn on_event(&mut self, event: RecognizerEvent) -> Option<ServerMessage> {
        if self.state == SessionState::Idle {
            return None;
        }

        match event {
            RecognizerEvent::Transcript(t) => {
                if t.is_final {
                    self.accumulator.push_str(&t.transcript);
                    self.accumulator.push(' ');
                    tracing::debug!(segment = %t.transcript, "segment committed");
                    Some(ServerMessage::Partial {
                        transcript: self.accumulator.trim().to_string(),
                        is_final: false,
                    })
                } else {
                    Some(ServerMessage::Partial {
                        transcript: format!("{}{}", self.accumulator, t.transcript),
                        is_final: false,
                    })
                }
            }
            RecognizerEvent::Error(message) => {
                tracing::error!(error = %message, "recognizer stream error");
                self.teardown();
                Some(ServerMessage::Error { message })
            }
        }
    }

    /// Emit the single final transcript and return to `Idle`.
    ///
    /// Only fires from `Finalizing`; calling it twice (grace elapsed and
    /// upstream close racing) yields `None` the second time.
    pub fn finalize(&mut self) -> Option<ServerMessage> {
        if self.state != SessionState::Finalizing {
            return None;
        }

        if let Some(mut stream) = self.stream.take() {
            stream.abort();
        }
        self.state = SessionState::Idle;

        let transcript = self.accumulator.trim().to_string();
        self.accumulator.clear();

        tracing::info!(chars = transcript.len(), "final transcript emitted");
        Some(ServerMessage::Final { transcript })
    }

    /// Handle the upstream event channel closing.
    ///
    /// During `Finalizing` this is the normal end of stream and finalizes
    /// early; during `Streaming` it is an unexpected drop and surfaces as an
    /// error.
    pub fn upstream_closed(&mut self) -> Option<ServerMessage> {
        match self.state {
            SessionState::Finalizing => self.finalize(),
            SessionState::Streaming => {
                tracing::warn!("recognition stream ended while streaming");
                self.teardown();
                Some(ServerMessage::Error {
                    message: "recognition stream ended unexpectedly".to_string(),
                })
            }
            SessionState::Idle => None,
        }
    }

    /// Abort the session without emitting anything (connection closed)
    pub fn abort(&mut self) {
        if self.state != SessionState::Idle {
            tracing::debug!(state = ?self.state, "aborting recognition session");
        }
        self.teardown();
    }

    fn teardown(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.abort();
        }
        self.state = SessionState::Idle;
        self.accumulator.clear();
    }
}
