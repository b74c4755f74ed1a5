//! Group discussion simulation
//!
//! Personas and their voices, prompt builders with the rolling memory
//! window, the topic genre table, append-only session logging, and
//! post-session analysis extraction. The endpoints stay stateless: the
//! client holds the transcript and sends the memory window with each
//! request.

pub mod persona;
pub mod prompt;
pub mod topic;

mod analysis;
mod log;

pub use analysis::{
    Feedback, FlowAssessment, SessionAnalysis, UserContribution, extract_analysis,
    fallback_report,
};
pub use log::SessionLog;
pub use persona::{DEFAULT_VOICE, Speaker};
pub use prompt::{GdTurn, MEMORY_TURNS};
pub use topic::{DEFAULT_TOPIC, GENRES};
