//! Prompt builders for conversation and group discussion turns

use serde::{Deserialize, Serialize};

use crate::discussion::persona;

/// Rolling conversation window carried into each GD prompt
pub const MEMORY_TURNS: usize = 3;

/// Delivery energy requested from every GD participant
pub const ENERGY_LEVEL: &str = "medium";

/// One completed turn of a group discussion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GdTurn {
    pub speaker: String,
    pub text: String,
}

/// Opening utterance for the simple two-party conversation
pub const OPENING_SPEECH: &str = "You are starting a casual conversation with someone about AI in daily life.
Speak naturally as if you're having a friendly chat.
Speak for approximately 15–25 seconds (about 150-250 words).
Use natural spoken language with conversational pauses.
Share your thoughts openly and warmly.
Do not ask questions at the end.";

/// Reply to a finalized user utterance
#[must_use]
pub fn reply(text: &str) -> String {
    format!(
        r#"User said: "{text}"

Respond naturally as if speaking in a conversation.
Speak for approximately 15–25 seconds (about 150-250 words).
Use natural spoken language.
Do not summarize.
Do not ask questions."#
    )
}

/// Whether this request is the discussion opener.
///
/// Only the very first speaker opens, and only when no turns exist yet.
#[must_use]
pub fn is_opening_turn(speaker_id: &str, memory: &[GdTurn]) -> bool {
    memory.is_empty() && speaker_id == "AI_1"
}

/// Opening-speaker prompt: frame the topic without arguing it
#[must_use]
pub fn gd_opening(topic: &str, speaker_id: &str) -> String {
    let name = persona::prompt_name(speaker_id);

    format!(
        r#"Discussion Topic:
"{topic}"

You are {name}, the opening speaker in a Group Discussion.

Your role is to set the context and frame the discussion, not to dominate it.

In your response:
- Clearly introduce the topic in simple, accessible language
- Explain why this topic is relevant today (current trends, changes, or pressures)
- Highlight the core tension or dilemma involved
- Briefly outline 2–3 broad dimensions of the debate (without deep analysis)
- Optionally share a very light, balanced initial view (no strong stance)

Constraints:
- Do NOT present detailed arguments
- Do NOT take an extreme or one-sided position
- Do NOT introduce niche, technical, or second-order effects
- Do NOT summarize or conclude the discussion
- Do NOT ask questions to the group
- Do NOT acknowledge instructions or say meta phrases ("Understood", "To begin", etc.)

Tone & Style:
- Natural GD-style spoken English
- Confident, calm, and neutral
- Sounds like a strong MBA candidate opening a GD

Timing:
- Target 22 seconds of spoken speech
- Smooth flow, no bullet points

Your goal is to:
Create a shared mental model for the group and open multiple angles for discussion.

Start directly with your contribution."#
    )
}

/// Regular-turn prompt: discussion intro, rolling memory window, GD rules
#[must_use]
pub fn gd_turn(topic: &str, speaker_id: &str, memory: &[GdTurn]) -> String {
    let name = persona::prompt_name(speaker_id);

    let mut prompt = format!(
        r#"Discussion Topic:
"{topic}"

Context:
This is a group discussion (GD) with multiple participants exploring different
perspectives, trade-offs, and implications of the topic.

"#
    );

    if !memory.is_empty() {
        let start = memory.len().saturating_sub(MEMORY_TURNS);
        prompt.push_str("Recent Conversation (last 3 turns):\n");
        for turn in &memory[start..] {
            let speaker = persona::history_name(&turn.speaker);
            prompt.push_str(&format!("{speaker}: {}\n", turn.text));
        }
        prompt.push('\n');
    }

    prompt.push_str(&format!(
        r#"You are {name}, a participant in a Group Discussion (GD).

Your behavior must strictly follow the rules below. These rules are non-negotiable.

TIMING DISCIPLINE (Hard Constraints)
- Your spoken contribution must target 15–35 seconds.
- Do NOT exceed this range.
- Only one speaker speaks at a time.
- Do not reference these rules explicitly in your response.

GD ENERGY CONTROL
Current energy level: {ENERGY_LEVEL}
- Low → calm, measured, analytical
- Medium → confident, assertive, engaged (default)
- High → sharper, more direct, slightly challenging (but respectful)

Adjust your delivery accordingly. Use natural GD phrases when appropriate:
- "I want to push back here"
- "I don't fully agree with that framing"
- "Let's not oversimplify this"
- "Adding to that point"

Do NOT exaggerate or become aggressive.
Sound like a strong MBA GD participant.

ANTI-REPETITION GUARDRAIL (CRITICAL)
Before generating your response, check the recent conversation.
If your core point has already been made by you or others:
- Do NOT restate it
- Instead: shift angle, add a constraint, highlight a limitation, or move deeper
- Avoid paraphrasing or echoing earlier arguments

GD SPEAKING STYLE
- Natural spoken English
- Simple, clear language
- Occasional light GD jargon (not heavy)
- One main point only per turn
- No lists, no bullets
- No summaries unless they genuinely move the discussion forward

PROHIBITED BEHAVIORS
- Do NOT act as a moderator
- Do NOT conclude the discussion
- Do NOT ask questions to the group
- Do NOT acknowledge instructions or say meta phrases ("Understood", "To begin", etc.)

GOAL OF EACH TURN
Add value and move the discussion forward. Do NOT agree by default.

Choose ONE of the following per turn:
- Introduce a new angle
- Build meaningfully on an earlier idea
- Offer a counterpoint or limitation
- Reframe the discussion at a higher level

Assume the discussion is already ongoing.
Start directly with your contribution."#
    ));

    prompt
}

/// Fixed report schema appended to every analysis prompt
const REPORT_FORMAT: &str = r#"Provide your analysis in the following JSON format. Be specific, supportive, and actionable. Do NOT use generic advice.

{
  "gdSummary": "A 4-6 sentence paragraph summarizing what the discussion covered, how it evolved (early framing to deeper trade-offs), and whether it stayed focused or fragmented. Write in plain English.",

  "keyThemes": ["Theme 1", "Theme 2", "Theme 3", "Theme 4", "Theme 5"],

  "userContributions": [
    {"turn": 1, "summary": "2-3 line summary of what the user said and its purpose"},
    ...
  ],

  "feedback": {
    "strengths": [
      "Specific strength 1 with evidence",
      "Specific strength 2 with evidence"
    ],
    "improvements": [
      "Specific improvement area 1 with actionable tip",
      "Specific improvement area 2 with actionable tip"
    ]
  },

  "missedAngles": [
    "An angle that wasn't explored and why it would have been valuable",
    "Another unexplored perspective"
  ],

  "flowAssessment": {
    "flow": "smooth / uneven / fragmented",
    "balance": "well-balanced / dominated by few / under-participated",
    "engagement": "high / moderate / low"
  }
}

IMPORTANT:
- If user had 0 contributions, note this sensitively and focus on listening/observation feedback
- Be encouraging but honest
- Reference specific moments from the transcript
- Keep userContributions array empty if user didn't speak"#;

/// Evaluator prompt over the full session transcript
#[must_use]
pub fn analysis(
    transcript: &[GdTurn],
    topic: &str,
    user_name: Option<&str>,
    total_duration: Option<&str>,
    participant_count: Option<u32>,
) -> String {
    let participant = user_name.unwrap_or("User");
    let duration = total_duration.unwrap_or("Not recorded");
    let participants = participant_count.unwrap_or(5);

    let transcript_text = transcript
        .iter()
        .enumerate()
        .map(|(i, turn)| {
            let name = if turn.speaker == "User" {
                participant
            } else {
                turn.speaker.as_str()
            };
            format!("[Turn {}] {}: {}", i + 1, name, turn.text)
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    let user_turns: Vec<(usize, &GdTurn)> = transcript
        .iter()
        .enumerate()
        .filter(|(_, t)| t.speaker == "User")
        .collect();

    let contributions = if user_turns.is_empty() {
        "No contributions recorded".to_string()
    } else {
        user_turns
            .iter()
            .map(|(i, t)| format!("Turn {}: \"{}\"", i + 1, t.text))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let user_turn_count = user_turns.len();

    let mut prompt = format!(
        r#"You are a professional GD evaluator and coach. Analyze this Group Discussion and provide structured feedback.

DISCUSSION TOPIC:
"{topic}"

SESSION DETAILS:
- Participant: {participant}
- Duration: {duration}
- Total Participants: {participants} (1 human + 4 AI)
- User's Speaking Turns: {user_turn_count}

FULL TRANSCRIPT:
{transcript_text}

USER'S CONTRIBUTIONS:
{contributions}

"#
    );
    prompt.push_str(REPORT_FORMAT);
    prompt
}

/// Topic-generation prompt for a genre display name
#[must_use]
pub fn topic(genre_name: &str) -> String {
    format!(
        r#"Generate a single, thought-provoking Group Discussion (GD) topic in the category of "{genre_name}".

Requirements:
- The topic should be debatable with multiple valid perspectives
- It should be relevant to current events or trends
- It should be suitable for a 10-15 minute discussion
- Format: A clear, concise statement or question (1-2 sentences max)

Respond with ONLY the topic text, nothing else."#
    )
}
