//! The session store: single owner of recording state, transcript, filters
//! and history.
//!
//! Every mutation of recorder state goes through one of the operations here;
//! the view layer and the reconciliation loop only read or submit requests.
//! Each operation writes the whole persisted key group in one commit; a
//! failed commit is logged and retried on the next reconciliation tick, with
//! in-memory state staying authoritative until a write lands.
//!
//! Operations take `now` explicitly instead of reading the wall clock, so
//! duration accounting is deterministic under test.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use ulid::Ulid;

use crate::channel::{start_with_timeout, stop_with_timeout, ScanChannel};
use crate::diff::{diff, TranscriptDiff};
use crate::duration::DurationAccountant;
use crate::error::{MeetlogError, Result};
use crate::filter::{visible_entries, FilterState};
use crate::session::{default_title, Session, SessionHistory};
use crate::storage::{PersistedState, StorageBackend};
use meetlog_protocol::{CaptionEntry, TranscriptSnapshot};

/// Process-wide recording mode. A loaded historical session is `Idle` with a
/// transcript present; there is no separate historical mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingMode {
    Idle,
    Recording,
    Paused,
}

/// Result of a start/stop operation. The local transition always succeeded;
/// `channel_error` carries a status message when the scan channel did not
/// cooperate.
#[derive(Debug, Default)]
pub struct ChannelReport {
    pub channel_error: Option<String>,
    /// Set by stop when the scanner's final read was folded in, so the view
    /// can render the last utterances incrementally instead of redrawing.
    pub final_update: Option<SnapshotOutcome>,
}

/// What a snapshot delivery produced.
#[derive(Debug)]
pub enum SnapshotOutcome {
    /// Dropped by the stop guard or because no recording is active.
    Ignored,
    /// Applied; carries the change set and the filtered view for the DOM.
    Applied {
        diff: TranscriptDiff,
        visible: Vec<CaptionEntry>,
    },
}

pub struct SessionStore<S, C> {
    storage: S,
    channel: C,
    mode: RecordingMode,
    current_session_id: Option<String>,
    transcript: Option<TranscriptSnapshot>,
    /// Start of the session as a whole; stable across pause/resume, used
    /// only for the default title.
    session_anchor: Option<DateTime<Utc>>,
    duration: DurationAccountant,
    filter: FilterState,
    history: SessionHistory,
    /// Set by `stop_recording`; snapshots already in flight when the user
    /// pressed stop are dropped at the top of `apply_scan_snapshot`.
    recording_stopped: bool,
    meeting_tab_id: Option<i64>,
    /// True when the last commit failed; the next tick's unconditional
    /// commit doubles as the retry.
    dirty: bool,
}

impl<S: StorageBackend, C: ScanChannel> SessionStore<S, C> {
    pub fn new(storage: S, channel: C) -> Self {
        Self {
            storage,
            channel,
            mode: RecordingMode::Idle,
            current_session_id: None,
            transcript: None,
            session_anchor: None,
            duration: DurationAccountant::new(),
            filter: FilterState::new(),
            history: SessionHistory::new(),
            recording_stopped: false,
            meeting_tab_id: None,
            dirty: false,
        }
    }

    /// Rebuilds state from persistence on popup open. Read failures fall
    /// back to a fresh state; a popup that cannot restore still has to open.
    pub async fn restore(&mut self) {
        let persisted = match self.storage.load().await {
            Ok(state) => state,
            Err(err) => {
                warn!(error = %err, "Failed to restore recorder state; starting fresh");
                PersistedState::default()
            }
        };

        self.current_session_id = persisted.current_session_id;
        self.session_anchor = persisted.session_anchor;
        self.duration =
            DurationAccountant::restore(persisted.accumulated_secs, persisted.segment_start);
        self.history = persisted.history;
        self.meeting_tab_id = persisted.meeting_tab_id;
        self.transcript = persisted.transcript;
        self.recording_stopped = false;

        self.mode = if persisted.realtime_mode && self.duration.is_running() {
            RecordingMode::Recording
        } else if persisted.paused
            && self.current_session_id.is_some()
            && !self.entries().is_empty()
        {
            RecordingMode::Paused
        } else {
            // Covers both the fresh state and a loaded historical session;
            // the latter keeps its transcript but is not resumable.
            RecordingMode::Idle
        };

        // A segment start persisted without realtime mode is stale: the stop
        // that cleared the mode already accounted for it. Drop it rather
        // than double-count.
        if self.mode != RecordingMode::Recording && self.duration.is_running() {
            warn!("Discarding stale segment start from persisted state");
            self.duration
                .load_total(self.duration.accumulated_secs());
        }

        let entries: Vec<CaptionEntry> = self.entries().to_vec();
        self.filter.bootstrap_from_entries(&entries);

        info!(
            mode = ?self.mode,
            session_id = ?self.current_session_id,
            entries = entries.len(),
            "Recorder state restored"
        );
    }

    // ─────────────────────────────────────────────────────────────────────
    // Read side
    // ─────────────────────────────────────────────────────────────────────

    pub fn mode(&self) -> RecordingMode {
        self.mode
    }

    pub fn current_session_id(&self) -> Option<&str> {
        self.current_session_id.as_deref()
    }

    pub fn entries(&self) -> &[CaptionEntry] {
        self.transcript
            .as_ref()
            .map(|t| t.messages.as_slice())
            .unwrap_or(&[])
    }

    pub fn transcript(&self) -> Option<&TranscriptSnapshot> {
        self.transcript.as_ref()
    }

    pub fn history(&self) -> &SessionHistory {
        &self.history
    }

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    /// Total recorded seconds as of `now`. Correct immediately after a popup
    /// reopen, before any tick has elapsed.
    pub fn duration_secs(&self, now: DateTime<Utc>) -> i64 {
        self.duration.current_total(now)
    }

    /// The filtered entry list the view should render.
    pub fn visible(&self) -> Vec<CaptionEntry> {
        visible_entries(self.entries(), &self.filter, self.is_live())
    }

    fn is_live(&self) -> bool {
        self.mode == RecordingMode::Recording
    }

    // ─────────────────────────────────────────────────────────────────────
    // Filter mutations (not part of the persisted key group)
    // ─────────────────────────────────────────────────────────────────────

    pub fn set_search_query(&mut self, query: impl Into<String>) {
        self.filter.set_query(query);
    }

    pub fn set_participant(&mut self, speaker: &str, included: bool) {
        self.filter.set_participant(speaker, included);
    }

    pub fn select_all_participants(&mut self) {
        self.filter.select_all();
    }

    pub fn clear_participant_selection(&mut self) {
        self.filter.clear_selection();
    }

    // ─────────────────────────────────────────────────────────────────────
    // Session lifecycle
    // ─────────────────────────────────────────────────────────────────────

    /// Clears the current session without touching history. No history entry
    /// is persisted until the first caption arrives, so abandoned empty
    /// sessions never pollute the list.
    pub async fn create_new_session(&mut self) -> Result<()> {
        if self.mode == RecordingMode::Recording {
            return Err(MeetlogError::SessionBusy);
        }

        self.clear_current_session();
        self.commit().await;
        info!("New session prepared");
        Ok(())
    }

    /// Starts or resumes recording. `continuation` preserves the session id
    /// and anchor time; a fresh start assigns them. Either way a new segment
    /// opens at `now`. The scan channel is asked to attach afterwards;
    /// channel failure is reported, never rolled back.
    pub async fn start_recording(
        &mut self,
        continuation: bool,
        tab_id: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<ChannelReport> {
        if self.mode == RecordingMode::Recording {
            warn!("start_recording called while already recording; ignoring");
            return Ok(ChannelReport::default());
        }

        if !continuation {
            if self.current_session_id.is_none() {
                self.current_session_id = Some(Ulid::new().to_string());
            }
            self.session_anchor = Some(now);
        }

        self.duration.start_segment(now);
        self.mode = RecordingMode::Recording;
        self.recording_stopped = false;
        if tab_id.is_some() {
            self.meeting_tab_id = tab_id;
        }

        self.commit().await;
        info!(
            session_id = ?self.current_session_id,
            continuation,
            "Recording started"
        );

        let mut report = ChannelReport::default();
        match self.meeting_tab_id {
            Some(tab) => {
                if let Err(err) = start_with_timeout(&self.channel, tab).await {
                    warn!(error = %err, tab, "Scan channel failed to start; recording locally");
                    report.channel_error = Some(err.to_string());
                }
            }
            None => debug!("No meeting tab known; recording without a scan channel"),
        }

        Ok(report)
    }

    /// Reconciliation entry point. Snapshots arriving after stop (or outside
    /// a recording) are dropped here; that is the guard the stop sequence
    /// relies on.
    pub async fn apply_scan_snapshot(
        &mut self,
        snapshot: TranscriptSnapshot,
        now: DateTime<Utc>,
    ) -> Result<SnapshotOutcome> {
        if self.mode != RecordingMode::Recording || self.recording_stopped {
            debug!(
                mode = ?self.mode,
                stopped = self.recording_stopped,
                "Dropping snapshot outside active recording"
            );
            return Ok(SnapshotOutcome::Ignored);
        }

        Ok(self.reconcile(snapshot, now).await)
    }

    /// Stops recording. The guard flag goes up before the channel detach, so
    /// any snapshot already in flight is dropped; the scanner's final read
    /// (carried on the stop acknowledgment) is the one sanctioned late
    /// write. The local transition completes even if the channel never
    /// answers.
    pub async fn stop_recording(&mut self, now: DateTime<Utc>) -> Result<ChannelReport> {
        if self.mode != RecordingMode::Recording {
            warn!(mode = ?self.mode, "stop_recording called while not recording; ignoring");
            return Ok(ChannelReport::default());
        }

        self.duration.end_segment(now);
        self.mode = RecordingMode::Paused;
        self.recording_stopped = true;

        let mut report = ChannelReport::default();
        let final_snapshot = match stop_with_timeout(&self.channel).await {
            Ok(ack) => ack.final_snapshot,
            Err(err) => {
                warn!(error = %err, "Scan channel failed to stop; proceeding with local stop");
                report.channel_error = Some(err.to_string());
                None
            }
        };

        match final_snapshot {
            // Fold in utterances finalized between the last periodic scan
            // and the stop action.
            Some(snapshot) => {
                report.final_update = Some(self.reconcile(snapshot, now).await);
            }
            None => {
                self.upsert_session_history(now);
                self.commit().await;
            }
        }

        info!(
            session_id = ?self.current_session_id,
            total_secs = self.duration.accumulated_secs(),
            "Recording stopped"
        );
        Ok(report)
    }

    /// Resumes a paused recording as a new segment of the same session.
    pub async fn resume_recording(&mut self, now: DateTime<Utc>) -> Result<ChannelReport> {
        if self.mode != RecordingMode::Paused || self.entries().is_empty() {
            warn!(mode = ?self.mode, "resume_recording outside paused session; ignoring");
            return Ok(ChannelReport::default());
        }

        self.recording_stopped = false;
        self.start_recording(true, None, now).await
    }

    /// Replaces the working transcript with a stored session for viewing.
    /// Refused while recording: the caller must stop (with user
    /// confirmation) first.
    pub async fn load_session(&mut self, id: &str) -> Result<()> {
        if self.mode == RecordingMode::Recording {
            return Err(MeetlogError::SessionBusy);
        }
        let session = self
            .history
            .get(id)
            .cloned()
            .ok_or_else(|| MeetlogError::SessionNotFound(id.to_string()))?;

        self.transcript = Some(session.transcript.clone());
        self.current_session_id = Some(session.id.clone());
        self.session_anchor = Some(session.date);
        self.duration.load_total(session.total_duration);
        self.filter.bootstrap_from_entries(&session.transcript.messages);
        self.mode = RecordingMode::Idle;
        self.recording_stopped = false;

        self.commit().await;
        info!(session_id = %id, entries = session.entry_count, "Historical session loaded");
        Ok(())
    }

    /// Removes a session from history. Deleting the session currently open
    /// also stops any active recording and resets to a fresh state.
    pub async fn delete_session(&mut self, id: &str, now: DateTime<Utc>) -> Result<()> {
        if self.history.get(id).is_none() {
            return Err(MeetlogError::SessionNotFound(id.to_string()));
        }

        if self.current_session_id.as_deref() == Some(id) {
            if self.mode == RecordingMode::Recording {
                let _ = self.stop_recording(now).await?;
            }
            self.clear_current_session();
        }

        self.history.remove(id);
        self.commit().await;
        info!(session_id = %id, "Session deleted");
        Ok(())
    }

    /// Renames a stored session. The new title survives later autosaves.
    pub async fn rename_session(&mut self, id: &str, title: &str) -> Result<()> {
        if !self.history.rename(id, title) {
            return Err(MeetlogError::SessionNotFound(id.to_string()));
        }
        self.commit().await;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────

    /// Applies a snapshot to the transcript. Also used by the stop sequence
    /// for the scanner's final read, which deliberately bypasses the guard.
    async fn reconcile(&mut self, snapshot: TranscriptSnapshot, now: DateTime<Utc>) -> SnapshotOutcome {
        // Continuation bootstrap: a resumed session's first re-scrape must
        // appear as newly appended entries, not a diff against nothing.
        let changes = if self.entries().is_empty()
            && (self.duration.is_running() || self.session_anchor.is_some())
        {
            TranscriptDiff {
                added: snapshot.messages.clone(),
                updated: Vec::new(),
                removed: Vec::new(),
            }
        } else {
            diff(self.entries(), &snapshot.messages)
        };

        for entry in &snapshot.messages {
            self.filter.note_speaker(&entry.speaker);
        }

        // The new snapshot wins wholesale, even when the diff is empty.
        self.transcript = Some(snapshot);

        self.upsert_session_history(now);
        self.commit().await;

        let visible = self.visible();
        SnapshotOutcome::Applied {
            diff: changes,
            visible,
        }
    }

    /// Sole autosave path, safe on every tick: builds the current session
    /// record and upserts it into history. `SessionHistory::upsert`
    /// preserves an existing entry's date and title.
    fn upsert_session_history(&mut self, now: DateTime<Utc>) {
        let Some(id) = self.current_session_id.clone() else {
            return;
        };
        let Some(transcript) = self.transcript.clone() else {
            return;
        };
        if transcript.messages.is_empty() {
            return;
        }

        let anchor = self.session_anchor.unwrap_or(now);
        let session = Session::from_transcript(
            id,
            default_title(anchor),
            anchor,
            transcript,
            self.duration.current_total(now),
        );
        self.history.upsert(session);
    }

    fn clear_current_session(&mut self) {
        self.mode = RecordingMode::Idle;
        self.current_session_id = None;
        self.transcript = None;
        self.session_anchor = None;
        self.duration.reset();
        self.filter = FilterState::new();
        self.recording_stopped = false;
        self.meeting_tab_id = None;
    }

    fn persisted_state(&self) -> PersistedState {
        PersistedState {
            realtime_mode: self.mode == RecordingMode::Recording,
            segment_start: self.duration.segment_start(),
            session_anchor: self.session_anchor,
            transcript: self.transcript.clone(),
            current_session_id: self.current_session_id.clone(),
            paused: self.mode == RecordingMode::Paused,
            accumulated_secs: self.duration.accumulated_secs(),
            history: self.history.clone(),
            meeting_tab_id: self.meeting_tab_id,
        }
    }

    /// Writes the whole key group. Failure is non-fatal: in-memory state
    /// stays authoritative and the next tick's commit retries.
    async fn commit(&mut self) {
        match self.storage.commit(&self.persisted_state()).await {
            Ok(()) => self.dirty = false,
            Err(err) => {
                warn!(error = %err, "Failed to persist recorder state; will retry next tick");
                self.dirty = true;
            }
        }
    }

    /// True when the last commit failed and a retry is pending.
    pub fn has_pending_write(&self) -> bool {
        self.dirty
    }
}
