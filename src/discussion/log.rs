//! Append-only session and prompt logs

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{Local, SecondsFormat, Utc};

use crate::discussion::persona;
use crate::{Error, Result};

const SESSION_FILE: &str = "gd_session.log";
const PROMPT_FILE: &str = "prompt.log";

/// Appends session transcripts and prompt exchanges under one directory.
///
/// The directory is created on first write; every entry is a single
/// append so concurrent requests interleave at entry granularity.
#[derive(Debug, Clone)]
pub struct SessionLog {
    dir: PathBuf,
}

impl SessionLog {
    #[must_use]
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Directory the log files live in
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write a session header marking the start of a new discussion
    ///
    /// # Errors
    ///
    /// Returns error if the log cannot be written
    pub fn session_header(&self, topic: Option<&str>, user_name: Option<&str>) -> Result<()> {
        let rule = "═".repeat(60);
        let mut header = format!(
            "\n{rule}\n   NEW GD SESSION - {}\n   GD Mode: Practice\n",
            Local::now().format("%Y-%m-%d %H:%M:%S")
        );
        if let Some(name) = user_name {
            header.push_str(&format!("   Participant: {name}\n"));
        }
        if let Some(topic) = topic {
            header.push_str(&format!("   Topic: {topic}\n"));
        }
        header.push_str(&format!("{rule}\n\n"));

        self.append(SESSION_FILE, &header)
    }

    /// Record one completed speech
    ///
    /// # Errors
    ///
    /// Returns error if the log cannot be written
    pub fn speech(
        &self,
        speaker: &str,
        text: &str,
        turn_number: Option<u32>,
        duration_seconds: Option<f64>,
    ) -> Result<()> {
        let name = persona::log_name(speaker);
        let kind = if speaker.starts_with("AI_") { "AI" } else { "User" };
        let turn = turn_number.map_or_else(|| "?".to_string(), |n| n.to_string());
        let duration = duration_seconds.map_or_else(|| "?".to_string(), |d| d.to_string());

        let entry = format!(
            "[Turn {turn} | {kind} | ~{duration}s]\n[{}] {name}: {text}\n\n",
            Local::now().format("%H:%M:%S")
        );

        self.append(SESSION_FILE, &entry)
    }

    /// Write the end-of-session summary block
    ///
    /// # Errors
    ///
    /// Returns error if the log cannot be written
    pub fn session_summary(
        &self,
        total_duration: Option<&str>,
        total_turns: Option<u32>,
        user_turns: Option<u32>,
        participants: Option<&str>,
    ) -> Result<()> {
        let rule = "─".repeat(60);
        let total_turns = total_turns.map_or_else(|| "N/A".to_string(), |n| n.to_string());
        let user_turns = user_turns.map_or_else(|| "N/A".to_string(), |n| n.to_string());

        let entry = format!(
            "\n{rule}\n   SESSION SUMMARY\n{rule}\n   Total Duration: {}\n   Total Turns: {total_turns}\n   User Turns: {user_turns}\n   Participants: {}\n{rule}\n\n",
            total_duration.unwrap_or("N/A"),
            participants.unwrap_or("N/A"),
        );

        self.append(SESSION_FILE, &entry)
    }

    /// Record one full prompt/response exchange with its latency
    ///
    /// # Errors
    ///
    /// Returns error if the log cannot be written
    pub fn prompt_exchange(
        &self,
        speaker: &str,
        prompt: &str,
        response: &str,
        latency_seconds: f64,
    ) -> Result<()> {
        let rule = "=".repeat(80);
        let entry = format!(
            "\n{rule}\n[{}] Speaker: {speaker}\n{rule}\n--- PROMPT ---\n{prompt}\n\n--- RESPONSE ({latency_seconds}s) ---\n{response}\n",
            Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        );

        self.append(PROMPT_FILE, &entry)
    }

    fn append(&self, file: &str, entry: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| Error::SessionLog(format!("create {}: {e}", self.dir.display())))?;

        let path = self.dir.join(file);
        let mut handle = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| Error::SessionLog(format!("open {}: {e}", path.display())))?;

        handle
            .write_all(entry.as_bytes())
            .map_err(|e| Error::SessionLog(format!("write {}: {e}", path.display())))
    }
}
