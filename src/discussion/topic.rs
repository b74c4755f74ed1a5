//! Discussion topic genres

use rand::seq::SliceRandom;

/// Topic used when a session starts without one
pub const DEFAULT_TOPIC: &str =
    "In the age of AI, are traditional university degrees becoming obsolete?";

/// Genre key to display name
pub const GENRES: [(&str, &str); 10] = [
    ("politics", "Politics & Governance"),
    ("business", "Business & Economy"),
    ("education", "Education & Careers"),
    ("environment", "Environment & Climate"),
    ("technology", "Technology & AI"),
    ("healthcare", "Healthcare & Wellness"),
    ("society", "Society & Culture"),
    ("ethics", "Ethics & Philosophy"),
    ("innovation", "Innovation & Startups"),
    ("global", "Global Affairs"),
];

/// Display name for a genre key; unknown keys pass through unchanged
#[must_use]
pub fn genre_name(key: &str) -> &str {
    GENRES
        .iter()
        .find(|(k, _)| *k == key)
        .map_or(key, |(_, name)| name)
}

/// Pick a random genre key from the table
#[must_use]
pub fn random_genre() -> &'static str {
    GENRES
        .choose(&mut rand::thread_rng())
        .map_or("technology", |(key, _)| key)
}
