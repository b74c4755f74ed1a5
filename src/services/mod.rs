//! Upstream generation and synthesis clients

use std::time::Duration;

mod generation;
mod synthesis;

pub use generation::{GenerationReply, TextGenerator};
pub use synthesis::{SpeechSynthesizer, SynthesizedSpeech, VoiceParams};

/// Per-request bound on upstream calls; a timeout is a normal service
/// failure, not a hang.
pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Elapsed time in seconds, rounded to two decimals for response bodies
pub(crate) fn round_seconds(elapsed: Duration) -> f64 {
    (elapsed.as_secs_f64() * 100.0).round() / 100.0
}
