//! Persisted session records and the capped session history.

use chrono::{DateTime, Utc};
use meetlog_protocol::{TranscriptSnapshot, UNKNOWN_SPEAKER};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// History keeps the 50 most recent sessions; the oldest is evicted.
pub const MAX_SESSIONS: usize = 50;

/// One persisted, named recording.
///
/// `date` and `title` are set once at creation and survive every later
/// upsert; the derived counts and the transcript are replaced on every save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub title: String,
    pub date: DateTime<Utc>,
    pub participant_count: usize,
    pub entry_count: usize,
    pub transcript: TranscriptSnapshot,
    /// Accumulated recording seconds across all segments of this session.
    pub total_duration: i64,
}

impl Session {
    /// Builds a fresh session record from the current transcript. Derived
    /// counts are always recomputed here, never carried forward.
    pub fn from_transcript(
        id: impl Into<String>,
        title: impl Into<String>,
        date: DateTime<Utc>,
        transcript: TranscriptSnapshot,
        total_duration: i64,
    ) -> Self {
        let participant_count = count_participants(&transcript);
        let entry_count = transcript.messages.len();
        Self {
            id: id.into(),
            title: title.into(),
            date,
            participant_count,
            entry_count,
            transcript,
            total_duration,
        }
    }
}

/// Distinct attributed speakers; the `"Unknown"` sentinel does not count.
pub fn count_participants(transcript: &TranscriptSnapshot) -> usize {
    transcript
        .messages
        .iter()
        .map(|entry| entry.speaker.as_str())
        .filter(|speaker| *speaker != UNKNOWN_SPEAKER && !speaker.is_empty())
        .collect::<BTreeSet<_>>()
        .len()
}

/// Default title for a session anchored at `anchor`.
pub fn default_title(anchor: DateTime<Utc>) -> String {
    format!("Meeting at {}", anchor.format("%H:%M"))
}

/// Ordered list of sessions, most recently updated or created first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionHistory {
    sessions: Vec<Session>,
}

impl SessionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id == id)
    }

    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    /// Inserts or replaces the session with `candidate.id`, moving it to the
    /// front. An existing entry keeps its original `date` and `title`; only
    /// the transcript and the derived fields take the candidate's values.
    /// Trims to [`MAX_SESSIONS`].
    pub fn upsert(&mut self, mut candidate: Session) {
        if let Some(index) = self.sessions.iter().position(|s| s.id == candidate.id) {
            let existing = self.sessions.remove(index);
            candidate.date = existing.date;
            candidate.title = existing.title;
        }
        self.sessions.insert(0, candidate);
        self.sessions.truncate(MAX_SESSIONS);
    }

    pub fn remove(&mut self, id: &str) -> Option<Session> {
        let index = self.sessions.iter().position(|s| s.id == id)?;
        Some(self.sessions.remove(index))
    }

    /// Renames a session. The new title is sticky: later upserts preserve it.
    pub fn rename(&mut self, id: &str, title: impl Into<String>) -> bool {
        match self.sessions.iter_mut().find(|s| s.id == id) {
            Some(session) => {
                session.title = title.into();
                true
            }
            None => false,
        }
    }
}
