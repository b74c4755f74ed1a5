//! Group discussion speaker roster and voice table

use crate::services::VoiceParams;

/// Voice used when the speaker selector is absent or unknown
pub const DEFAULT_VOICE: VoiceParams = VoiceParams {
    language: "en-US",
    name: "en-US-Neural2-F",
    gender: "FEMALE",
    rate: 1.0,
    pitch: 0.0,
};

/// A named group discussion participant
///
/// Wire payloads carry speaker ids as plain strings (`AI_1`..`AI_4`,
/// `User`); unknown ids are accepted and fall back to pass-through names
/// and the default voice, so lookups go through the free functions below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Speaker {
    Ai1,
    Ai2,
    Ai3,
    Ai4,
    User,
}

impl Speaker {
    /// Parse a wire speaker id
    #[must_use]
    pub fn parse(id: &str) -> Option<Self> {
        match id {
            "AI_1" => Some(Self::Ai1),
            "AI_2" => Some(Self::Ai2),
            "AI_3" => Some(Self::Ai3),
            "AI_4" => Some(Self::Ai4),
            "User" => Some(Self::User),
            _ => None,
        }
    }

    /// Wire id for this speaker
    #[must_use]
    pub fn id(self) -> &'static str {
        match self {
            Self::Ai1 => "AI_1",
            Self::Ai2 => "AI_2",
            Self::Ai3 => "AI_3",
            Self::Ai4 => "AI_4",
            Self::User => "User",
        }
    }

    /// Persona name used when the speaker addresses the group
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Ai1 => "Parth",
            Self::Ai2 => "Sneha",
            Self::Ai3 => "Harsh",
            Self::Ai4 => "Anshika",
            Self::User => "User",
        }
    }

    /// Name used for this speaker inside conversation history context
    #[must_use]
    pub fn history_name(self) -> &'static str {
        match self {
            Self::User => "You (the human participant)",
            other => other.display_name(),
        }
    }

    /// Short name used in the session log
    #[must_use]
    pub fn log_name(self) -> &'static str {
        match self {
            Self::User => "You",
            other => other.display_name(),
        }
    }

    /// Synthesized-voice parameters for this speaker
    #[must_use]
    pub fn voice(self) -> VoiceParams {
        match self {
            Self::Ai1 => VoiceParams {
                language: "en-US",
                name: "en-US-Neural2-D",
                gender: "MALE",
                rate: 0.95,
                pitch: -3.5,
            },
            Self::Ai2 => VoiceParams {
                language: "en-US",
                name: "en-US-Neural2-F",
                gender: "FEMALE",
                rate: 0.9,
                pitch: 2.0,
            },
            Self::Ai3 => VoiceParams {
                language: "en-US",
                name: "en-US-Neural2-A",
                gender: "MALE",
                rate: 1.05,
                pitch: -0.5,
            },
            Self::Ai4 => VoiceParams {
                language: "en-US",
                name: "en-US-Neural2-C",
                gender: "FEMALE",
                rate: 1.0,
                pitch: 1.2,
            },
            Self::User => DEFAULT_VOICE,
        }
    }
}

/// Persona name for prompts; unknown ids pass through unchanged
#[must_use]
pub fn prompt_name(id: &str) -> &str {
    Speaker::parse(id).map_or(id, |s| s.display_name())
}

/// History-context name; unknown ids pass through unchanged
#[must_use]
pub fn history_name(id: &str) -> &str {
    Speaker::parse(id).map_or(id, |s| s.history_name())
}

/// Session-log name; unknown ids pass through unchanged
#[must_use]
pub fn log_name(id: &str) -> &str {
    Speaker::parse(id).map_or(id, |s| s.log_name())
}

/// Voice for a speaker id; absent or unknown ids get the default voice
#[must_use]
pub fn voice_for(id: Option<&str>) -> VoiceParams {
    id.and_then(Speaker::parse)
        .map_or(DEFAULT_VOICE, Speaker::voice)
}
