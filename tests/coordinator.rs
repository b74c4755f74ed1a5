//! Turn coordinator integration tests
//!
//! All four collaborator seams are scripted doubles; no network or audio
//! hardware is involved.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use colloquy_gateway::turn::{
    Phase, ReplySource, SpeechPlayer, SpeechSource, TurnCoordinator, UtteranceSource,
};
use colloquy_gateway::{Error, Result};

/// Scripted reply source; fails on the n-th generation request when set
struct ScriptedReplies {
    calls: Arc<AtomicUsize>,
    fail_on_call: Option<usize>,
}

impl ScriptedReplies {
    fn reliable(calls: Arc<AtomicUsize>) -> Self {
        Self {
            calls,
            fail_on_call: None,
        }
    }

    fn failing_on(calls: Arc<AtomicUsize>, call: usize) -> Self {
        Self {
            calls,
            fail_on_call: Some(call),
        }
    }

    fn record(&self) -> Result<usize> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on_call == Some(call) {
            return Err(Error::Generation("scripted generation failure".to_string()));
        }
        Ok(call)
    }
}

#[async_trait]
impl ReplySource for ScriptedReplies {
    async fn opening(&self) -> Result<String> {
        self.record().map(|_| "Let me start us off.".to_string())
    }

    async fn reply(&self, text: &str) -> Result<String> {
        self.record().map(|_| format!("Interesting point about {text}."))
    }
}

/// Scripted synthesizer
struct ScriptedSpeech {
    fail: bool,
}

#[async_trait]
impl SpeechSource for ScriptedSpeech {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        if self.fail {
            return Err(Error::Synthesis("scripted synthesis failure".to_string()));
        }
        Ok(text.as_bytes().to_vec())
    }
}

/// Playback double counting completed plays
struct CountingPlayer {
    plays: Arc<AtomicUsize>,
    fail: bool,
}

#[async_trait]
impl SpeechPlayer for CountingPlayer {
    async fn play(&mut self, audio: &[u8]) -> Result<()> {
        if self.fail {
            return Err(Error::Playback("scripted playback failure".to_string()));
        }
        assert!(!audio.is_empty(), "coordinator must not play empty audio");
        self.plays.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Recorder double yielding a scripted sequence of transcripts
struct ScriptedRecorder {
    transcripts: Mutex<Vec<Result<String>>>,
}

impl ScriptedRecorder {
    fn new(transcripts: Vec<&str>) -> Self {
        Self::with_script(transcripts.into_iter().map(|t| Ok(t.to_string())).collect())
    }

    fn with_script(script: Vec<Result<String>>) -> Self {
        Self {
            transcripts: Mutex::new(script.into_iter().rev().collect()),
        }
    }
}

#[async_trait]
impl UtteranceSource for ScriptedRecorder {
    async fn next_utterance(&mut self) -> Result<String> {
        self.transcripts
            .lock()
            .unwrap()
            .pop()
            .unwrap_or_else(|| Err(Error::Channel("recorder script exhausted".to_string())))
    }
}

#[tokio::test]
async fn three_turn_conversation_runs_to_completion() {
    let generations = Arc::new(AtomicUsize::new(0));
    let plays = Arc::new(AtomicUsize::new(0));

    let mut coordinator = TurnCoordinator::new(
        ScriptedReplies::reliable(Arc::clone(&generations)),
        ScriptedSpeech { fail: false },
        CountingPlayer {
            plays: Arc::clone(&plays),
            fail: false,
        },
        ScriptedRecorder::new(vec!["first answer", "second answer"]),
    )
    .with_max_turns(3);

    coordinator.run().await.unwrap();

    assert_eq!(coordinator.state().phase(), Phase::Complete);
    // 3 AI turns (opening + 2 replies), each played once, 2 user turns
    assert_eq!(generations.load(Ordering::SeqCst), 3);
    assert_eq!(plays.load(Ordering::SeqCst), 3);
    assert_eq!(coordinator.state().last_transcript(), Some("second answer"));
}

#[tokio::test]
async fn empty_transcript_rearms_without_advancing() {
    let generations = Arc::new(AtomicUsize::new(0));
    let plays = Arc::new(AtomicUsize::new(0));

    let mut coordinator = TurnCoordinator::new(
        ScriptedReplies::reliable(Arc::clone(&generations)),
        ScriptedSpeech { fail: false },
        CountingPlayer {
            plays: Arc::clone(&plays),
            fail: false,
        },
        // Two empty attempts re-arm turn 1 before real answers land
        ScriptedRecorder::new(vec!["", "   ", "real answer", "closing answer"]),
    )
    .with_max_turns(3);

    coordinator.start();

    // AI turn 1, then two re-armed attempts at user turn 1
    assert_eq!(coordinator.step().await.unwrap(), Phase::UserTurn(1));
    assert_eq!(coordinator.step().await.unwrap(), Phase::UserTurn(1));
    assert_eq!(coordinator.step().await.unwrap(), Phase::UserTurn(1));
    assert_eq!(coordinator.step().await.unwrap(), Phase::AiSpeaking(2));

    coordinator.run().await.unwrap();
    assert_eq!(coordinator.state().phase(), Phase::Complete);
    assert_eq!(generations.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn generation_failure_midway_completes_immediately() {
    let generations = Arc::new(AtomicUsize::new(0));
    let plays = Arc::new(AtomicUsize::new(0));

    let mut coordinator = TurnCoordinator::new(
        ScriptedReplies::failing_on(Arc::clone(&generations), 2),
        ScriptedSpeech { fail: false },
        CountingPlayer {
            plays: Arc::clone(&plays),
            fail: false,
        },
        ScriptedRecorder::new(vec!["an answer"]),
    )
    .with_max_turns(3);

    let err = coordinator.run().await.unwrap_err();
    assert!(matches!(err, Error::Generation(_)));
    assert_eq!(coordinator.state().phase(), Phase::Complete);
    // AI turn 1 played, AI turn 2 failed before synthesis
    assert_eq!(plays.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn synthesis_failure_is_fatal_to_the_conversation() {
    let generations = Arc::new(AtomicUsize::new(0));
    let plays = Arc::new(AtomicUsize::new(0));

    let mut coordinator = TurnCoordinator::new(
        ScriptedReplies::reliable(generations),
        ScriptedSpeech { fail: true },
        CountingPlayer { plays, fail: false },
        ScriptedRecorder::new(vec![]),
    )
    .with_max_turns(3);

    let err = coordinator.run().await.unwrap_err();
    assert!(matches!(err, Error::Synthesis(_)));
    assert_eq!(coordinator.state().phase(), Phase::Complete);
}

#[tokio::test]
async fn playback_failure_is_fatal_to_the_conversation() {
    let generations = Arc::new(AtomicUsize::new(0));
    let plays = Arc::new(AtomicUsize::new(0));

    let mut coordinator = TurnCoordinator::new(
        ScriptedReplies::reliable(generations),
        ScriptedSpeech { fail: false },
        CountingPlayer { plays, fail: true },
        ScriptedRecorder::new(vec![]),
    )
    .with_max_turns(3);

    let err = coordinator.run().await.unwrap_err();
    assert!(matches!(err, Error::Playback(_)));
    assert_eq!(coordinator.state().phase(), Phase::Complete);
}

#[tokio::test]
async fn recording_failure_leaves_turn_rearmed() {
    let generations = Arc::new(AtomicUsize::new(0));
    let plays = Arc::new(AtomicUsize::new(0));

    let mut coordinator = TurnCoordinator::new(
        ScriptedReplies::reliable(generations),
        ScriptedSpeech { fail: false },
        CountingPlayer { plays, fail: false },
        // Script exhausts immediately, simulating a channel failure
        ScriptedRecorder::new(vec![]),
    )
    .with_max_turns(3);

    coordinator.start();
    assert_eq!(coordinator.step().await.unwrap(), Phase::UserTurn(1));

    let err = coordinator.step().await.unwrap_err();
    assert!(matches!(err, Error::Channel(_)));
    // The user can retry the same turn after a channel failure
    assert_eq!(coordinator.state().phase(), Phase::UserTurn(1));
    assert!(coordinator.state().may_record());
}

#[tokio::test]
async fn rerun_after_channel_failure_resumes_the_same_turn() {
    let generations = Arc::new(AtomicUsize::new(0));
    let plays = Arc::new(AtomicUsize::new(0));

    let mut coordinator = TurnCoordinator::new(
        ScriptedReplies::reliable(Arc::clone(&generations)),
        ScriptedSpeech { fail: false },
        CountingPlayer {
            plays: Arc::clone(&plays),
            fail: false,
        },
        // The stream drops once mid-utterance, then the user retries
        ScriptedRecorder::with_script(vec![
            Err(Error::Channel("stream dropped mid-utterance".to_string())),
            Ok("first answer".to_string()),
            Ok("second answer".to_string()),
        ]),
    )
    .with_max_turns(3);

    let err = coordinator.run().await.unwrap_err();
    assert!(matches!(err, Error::Channel(_)));
    assert_eq!(coordinator.state().phase(), Phase::UserTurn(1));

    // Re-entering picks the armed turn back up instead of starting over
    coordinator.run().await.unwrap();
    assert_eq!(coordinator.state().phase(), Phase::Complete);
    assert_eq!(generations.load(Ordering::SeqCst), 3);
    assert_eq!(plays.load(Ordering::SeqCst), 3);
    assert_eq!(coordinator.state().last_transcript(), Some("second answer"));
}

#[tokio::test]
async fn restart_after_completion_begins_at_turn_one() {
    let generations = Arc::new(AtomicUsize::new(0));
    let plays = Arc::new(AtomicUsize::new(0));

    let mut coordinator = TurnCoordinator::new(
        ScriptedReplies::reliable(Arc::clone(&generations)),
        ScriptedSpeech { fail: false },
        CountingPlayer {
            plays: Arc::clone(&plays),
            fail: false,
        },
        ScriptedRecorder::new(vec![]),
    )
    .with_max_turns(1);

    coordinator.run().await.unwrap();
    assert_eq!(coordinator.state().phase(), Phase::Complete);

    // A single-turn conversation never records; restarting runs another one
    coordinator.run().await.unwrap();
    assert_eq!(generations.load(Ordering::SeqCst), 2);
    assert_eq!(plays.load(Ordering::SeqCst), 2);
}
