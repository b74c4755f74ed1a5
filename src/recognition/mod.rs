//! Streaming speech recognition
//!
//! One [`RecognitionSession`] per duplex connection drives the
//! `Idle → Streaming → Finalizing → Idle` lifecycle; the upstream service
//! sits behind the [`Recognizer`] trait so tests can script results.

mod deepgram;
mod session;
mod transducer;

pub use deepgram::DeepgramRecognizer;
pub use session::{FINALIZE_GRACE, RecognitionSession, SessionState, StopOutcome};
pub use transducer::{Recognizer, RecognizerEvent, RecognizerStream, TranscriptEvent};
