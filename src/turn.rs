//! Conversation turn coordination
//!
//! The coordinator alternates "AI speaks" and "user records" phases over
//! four collaborator seams, so the conversation loop never touches HTTP,
//! sockets, or audio devices directly and tests can script all of them.

use async_trait::async_trait;

use crate::{Error, Result};

/// AI turns per conversation unless overridden
pub const DEFAULT_MAX_TURNS: u32 = 3;

/// Where the conversation stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    NotStarted,
    /// Generating, synthesizing, and playing AI turn `n` (1-based)
    AiSpeaking(u32),
    /// Waiting on the user to record after AI turn `n`
    UserTurn(u32),
    /// Terminal until an explicit new start
    Complete,
}

/// Produces reply text for AI turns
#[async_trait]
pub trait ReplySource: Send + Sync {
    /// Opening utterance, with no prior user text
    ///
    /// # Errors
    ///
    /// Returns error if generation fails
    async fn opening(&self) -> Result<String>;

    /// Reply to the user's finalized utterance
    ///
    /// # Errors
    ///
    /// Returns error if generation fails
    async fn reply(&self, text: &str) -> Result<String>;
}

/// Converts reply text into playable audio
#[async_trait]
pub trait SpeechSource: Send + Sync {
    /// # Errors
    ///
    /// Returns error if synthesis fails
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>>;
}

/// Plays one audio buffer to completion
#[async_trait]
pub trait SpeechPlayer: Send {
    /// # Errors
    ///
    /// Returns error if decoding or playback fails
    async fn play(&mut self, audio: &[u8]) -> Result<()>;
}

/// Records one user utterance and returns its final transcript
#[async_trait]
pub trait UtteranceSource: Send {
    /// # Errors
    ///
    /// Returns error if capture or the streaming channel fails
    async fn next_utterance(&mut self) -> Result<String>;
}

/// Explicit conversation state, mutated only through transition methods
#[derive(Debug, Clone)]
pub struct ConversationState {
    phase: Phase,
    max_turns: u32,
    last_transcript: Option<String>,
}

impl ConversationState {
    #[must_use]
    pub fn new(max_turns: u32) -> Self {
        Self {
            phase: Phase::NotStarted,
            max_turns,
            last_transcript: None,
        }
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn max_turns(&self) -> u32 {
        self.max_turns
    }

    /// Last non-empty user transcript, input to the next reply
    #[must_use]
    pub fn last_transcript(&self) -> Option<&str> {
        self.last_transcript.as_deref()
    }

    /// Recording is only legal while waiting on the user
    #[must_use]
    pub fn may_record(&self) -> bool {
        matches!(self.phase, Phase::UserTurn(_))
    }

    /// Begin (or restart) the conversation at AI turn 1
    pub fn start(&mut self) -> Phase {
        self.last_transcript = None;
        self.phase = Phase::AiSpeaking(1);
        self.phase
    }

    /// AI turn `n` finished playing; hand over to the user, or complete
    /// when the turn budget is spent
    pub fn ai_finished(&mut self) -> Phase {
        if let Phase::AiSpeaking(n) = self.phase {
            self.phase = if n >= self.max_turns {
                Phase::Complete
            } else {
                Phase::UserTurn(n)
            };
        }
        self.phase
    }

    /// The user finished recording. A non-empty transcript advances to the
    /// next AI turn; an empty one re-arms the same turn.
    pub fn user_finished(&mut self, transcript: &str) -> Phase {
        if let Phase::UserTurn(n) = self.phase {
            let trimmed = transcript.trim();
            if !trimmed.is_empty() {
                self.last_transcript = Some(trimmed.to_string());
                self.phase = Phase::AiSpeaking(n + 1);
            }
        }
        self.phase
    }

    /// Fail-fast exit: any AI-side service failure ends the conversation
    pub fn fail(&mut self) -> Phase {
        self.phase = Phase::Complete;
        self.phase
    }
}

/// Drives the conversation loop across the collaborator seams
pub struct TurnCoordinator<R, S, P, U> {
    state: ConversationState,
    replies: R,
    speech: S,
    player: P,
    recorder: U,
}

impl<R, S, P, U> TurnCoordinator<R, S, P, U>
where
    R: ReplySource,
    S: SpeechSource,
    P: SpeechPlayer,
    U: UtteranceSource,
{
    pub fn new(replies: R, speech: S, player: P, recorder: U) -> Self {
        Self {
            state: ConversationState::new(DEFAULT_MAX_TURNS),
            replies,
            speech,
            player,
            recorder,
        }
    }

    #[must_use]
    pub fn with_max_turns(mut self, max_turns: u32) -> Self {
        self.state = ConversationState::new(max_turns);
        self
    }

    #[must_use]
    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    /// Reset to AI turn 1
    pub fn start(&mut self) -> Phase {
        self.state.start()
    }

    /// Drive the conversation until it completes.
    ///
    /// Starts fresh unless a conversation is already mid-flight (so a
    /// caller can re-enter after a re-armed recording failure). Errors
    /// leave the state where the failure put it: `Complete` for AI-side
    /// failures, the same `UserTurn` for recording failures.
    ///
    /// # Errors
    ///
    /// Returns the first collaborator error encountered
    pub async fn run(&mut self) -> Result<()> {
        if matches!(self.state.phase(), Phase::NotStarted | Phase::Complete) {
            self.start();
        }

        while self.state.phase() != Phase::Complete {
            self.step().await?;
        }
        Ok(())
    }

    /// Advance by one phase transition
    ///
    /// # Errors
    ///
    /// Returns error if the active phase's collaborator fails
    pub async fn step(&mut self) -> Result<Phase> {
        match self.state.phase() {
            Phase::AiSpeaking(n) => self.ai_turn(n).await,
            Phase::UserTurn(n) => self.user_turn(n).await,
            Phase::NotStarted | Phase::Complete => Ok(self.state.phase()),
        }
    }

    async fn ai_turn(&mut self, n: u32) -> Result<Phase> {
        match self.speak_turn(n).await {
            Ok(()) => Ok(self.state.ai_finished()),
            Err(e) => {
                tracing::error!(turn = n, error = %e, "ai turn failed, ending conversation");
                self.state.fail();
                Err(e)
            }
        }
    }

    /// Generate, synthesize, and play one AI turn, in strict sequence
    async fn speak_turn(&mut self, n: u32) -> Result<()> {
        let text = if n == 1 {
            self.replies.opening().await?
        } else {
            let transcript = self
                .state
                .last_transcript()
                .ok_or_else(|| Error::Session("no user transcript to reply to".to_string()))?
                .to_string();
            self.replies.reply(&transcript).await?
        };
        tracing::debug!(turn = n, reply_chars = text.len(), "reply generated");

        let audio = self.speech.synthesize(&text).await?;
        tracing::debug!(turn = n, audio_bytes = audio.len(), "speech synthesized");

        self.player.play(&audio).await?;
        tracing::info!(turn = n, "ai turn played");
        Ok(())
    }

    async fn user_turn(&mut self, n: u32) -> Result<Phase> {
        let transcript = self.recorder.next_utterance().await.map_err(|e| {
            tracing::warn!(turn = n, error = %e, "recording failed, turn re-armed");
            e
        })?;

        let phase = self.state.user_finished(&transcript);
        if matches!(phase, Phase::UserTurn(_)) {
            tracing::info!(turn = n, "no speech detected, turn re-armed");
        } else {
            tracing::info!(turn = n, transcript_chars = transcript.trim().len(), "user turn captured");
        }
        Ok(phase)
    }
}
