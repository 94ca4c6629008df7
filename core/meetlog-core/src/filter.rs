//! Participant and search filtering for the transcript view.
//!
//! The same rules drive the full-list recompute and the single-entry
//! predicate used for incremental appends, so the two paths can never
//! disagree. Participant sets are `BTreeSet`s: the sorted order makes color
//! assignment deterministic no matter what order speakers arrived in.

use std::collections::{BTreeMap, BTreeSet};

use meetlog_protocol::{CaptionEntry, UNKNOWN_SPEAKER};

/// Number of distinct speaker colors the view can render.
pub const SPEAKER_COLOR_COUNT: u8 = 6;

/// The popup's current filter configuration.
///
/// An empty `active` set with a non-empty `known` set is the explicit
/// "show nothing" state, distinct from the bootstrap state where no
/// participant has been seen yet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    /// Participants currently included in the view.
    pub active: BTreeSet<String>,
    /// All speakers seen so far in the current transcript.
    pub known: BTreeSet<String>,
    /// Case-insensitive substring filter over speaker and text.
    pub query: String,
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a speaker seen in the transcript. New speakers join both
    /// `known` and `active`, so an untouched filter stays in the
    /// "all selected" state as the roster grows. The `"Unknown"` sentinel
    /// never enters participant lists.
    pub fn note_speaker(&mut self, speaker: &str) {
        if speaker == UNKNOWN_SPEAKER || speaker.is_empty() {
            return;
        }
        if self.known.insert(speaker.to_string()) {
            self.active.insert(speaker.to_string());
        }
    }

    /// Resets the filter to "all participants of these entries selected".
    /// Used when loading a historical session.
    pub fn bootstrap_from_entries(&mut self, entries: &[CaptionEntry]) {
        self.known.clear();
        self.active.clear();
        self.query.clear();
        for entry in entries {
            self.note_speaker(&entry.speaker);
        }
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    /// Includes or excludes one participant from the view.
    pub fn set_participant(&mut self, speaker: &str, included: bool) {
        if !self.known.contains(speaker) {
            return;
        }
        if included {
            self.active.insert(speaker.to_string());
        } else {
            self.active.remove(speaker);
        }
    }

    pub fn select_all(&mut self) {
        self.active = self.known.clone();
    }

    pub fn clear_selection(&mut self) {
        self.active.clear();
    }

    /// Filter badge for the participant button: `None` when every known
    /// participant is active (no badge shown), otherwise the selected count,
    /// including the explicit `Some(0)` zero-selection state.
    pub fn badge(&self) -> Option<usize> {
        if self.active == self.known {
            None
        } else {
            Some(self.active.len())
        }
    }
}

/// Single-entry visibility predicate. Applied to incremental appends so the
/// whole list need not be recomputed per snapshot.
pub fn is_visible(entry: &CaptionEntry, state: &FilterState, live_recording: bool) -> bool {
    passes_participant_filter(entry, state, live_recording) && passes_query(entry, &state.query)
}

/// Computes the visible subset of `entries` under the current filter.
pub fn visible_entries(
    entries: &[CaptionEntry],
    state: &FilterState,
    live_recording: bool,
) -> Vec<CaptionEntry> {
    entries
        .iter()
        .filter(|entry| is_visible(entry, state, live_recording))
        .cloned()
        .collect()
}

fn passes_participant_filter(
    entry: &CaptionEntry,
    state: &FilterState,
    live_recording: bool,
) -> bool {
    // Bootstrap exception: while a live recording has not yet seen any
    // participant, hiding entries would swallow the very first utterances.
    if live_recording && state.known.is_empty() {
        return true;
    }
    if state.active.is_empty() {
        return state.known.is_empty();
    }
    if state.active.is_subset(&state.known) && state.active.len() < state.known.len() {
        return state.active.contains(&entry.speaker);
    }
    true
}

fn passes_query(entry: &CaptionEntry, query: &str) -> bool {
    if query.is_empty() {
        return true;
    }
    let needle = query.to_lowercase();
    entry.speaker.to_lowercase().contains(&needle) || entry.text.to_lowercase().contains(&needle)
}

/// Deterministic speaker→color assignment: distinct speakers sorted
/// alphabetically, indices 1..=6 assigned cyclically in that order. Always
/// recomputed from the full entry set so arrival order can never show up as
/// color churn.
pub fn speaker_colors(entries: &[CaptionEntry]) -> BTreeMap<String, u8> {
    let speakers: BTreeSet<&str> = entries.iter().map(|e| e.speaker.as_str()).collect();
    speakers
        .into_iter()
        .enumerate()
        .map(|(i, speaker)| {
            let color = (i as u8 % SPEAKER_COLOR_COUNT) + 1;
            (speaker.to_string(), color)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(speaker: &str, text: &str) -> CaptionEntry {
        CaptionEntry {
            speaker: speaker.to_string(),
            text: text.to_string(),
            timestamp: "0:01".to_string(),
            hash: format!("{speaker}-{text}"),
        }
    }

    fn state_with(known: &[&str], active: &[&str]) -> FilterState {
        FilterState {
            known: known.iter().map(|s| s.to_string()).collect(),
            active: active.iter().map(|s| s.to_string()).collect(),
            query: String::new(),
        }
    }

    #[test]
    fn test_empty_selection_hides_everything() {
        let entries = vec![entry("Ann", "hi"), entry("Bob", "yo")];
        let state = state_with(&["Ann", "Bob"], &[]);
        assert!(visible_entries(&entries, &state, false).is_empty());
    }

    #[test]
    fn test_bootstrap_exception_shows_everything_while_live() {
        let entries = vec![entry("Ann", "hi"), entry("Bob", "yo")];
        let state = FilterState::new();
        assert_eq!(visible_entries(&entries, &state, true), entries);
    }

    #[test]
    fn test_no_bootstrap_exception_when_not_live() {
        let entries = vec![entry("Ann", "hi")];
        let state = FilterState::new();
        // Historical view with no known participants: nothing is hidden
        // either, because there is no roster to filter against.
        assert_eq!(visible_entries(&entries, &state, false), entries);
    }

    #[test]
    fn test_strict_subset_keeps_only_selected_speakers() {
        let entries = vec![entry("Ann", "hi"), entry("Bob", "yo")];
        let state = state_with(&["Ann", "Bob"], &["Ann"]);
        let visible = visible_entries(&entries, &state, true);
        assert_eq!(visible, vec![entry("Ann", "hi")]);
    }

    #[test]
    fn test_full_selection_filters_nothing() {
        let entries = vec![entry("Ann", "hi"), entry("Unknown", "static")];
        let state = state_with(&["Ann"], &["Ann"]);
        assert_eq!(visible_entries(&entries, &state, true), entries);
    }

    #[test]
    fn test_query_matches_speaker_or_text_case_insensitively() {
        let entries = vec![entry("Ann", "the Plan"), entry("Bob", "yo")];
        let mut state = state_with(&["Ann", "Bob"], &["Ann", "Bob"]);
        state.set_query("PLAN");
        assert_eq!(
            visible_entries(&entries, &state, true),
            vec![entry("Ann", "the Plan")]
        );
        state.set_query("bob");
        assert_eq!(
            visible_entries(&entries, &state, true),
            vec![entry("Bob", "yo")]
        );
    }

    #[test]
    fn test_predicate_agrees_with_full_list() {
        let entries = vec![entry("Ann", "hi"), entry("Bob", "yo"), entry("Cleo", "hm")];
        let mut state = state_with(&["Ann", "Bob", "Cleo"], &["Ann", "Cleo"]);
        state.set_query("h");
        let from_list = visible_entries(&entries, &state, false);
        let from_predicate: Vec<_> = entries
            .iter()
            .filter(|e| is_visible(e, &state, false))
            .cloned()
            .collect();
        assert_eq!(from_list, from_predicate);
    }

    #[test]
    fn test_note_speaker_skips_unknown_sentinel() {
        let mut state = FilterState::new();
        state.note_speaker("Unknown");
        state.note_speaker("");
        assert!(state.known.is_empty());
        state.note_speaker("Ann");
        assert!(state.known.contains("Ann"));
        assert!(state.active.contains("Ann"));
    }

    #[test]
    fn test_new_speaker_does_not_rejoin_after_deselection() {
        let mut state = FilterState::new();
        state.note_speaker("Ann");
        state.set_participant("Ann", false);
        state.note_speaker("Ann");
        assert!(!state.active.contains("Ann"));
    }

    #[test]
    fn test_badge_states() {
        let mut state = FilterState::new();
        assert_eq!(state.badge(), None);
        state.note_speaker("Ann");
        state.note_speaker("Bob");
        assert_eq!(state.badge(), None);
        state.set_participant("Bob", false);
        assert_eq!(state.badge(), Some(1));
        state.clear_selection();
        assert_eq!(state.badge(), Some(0));
    }

    #[test]
    fn test_speaker_colors_ignore_arrival_order() {
        let first = vec![entry("Cleo", "a"), entry("Ann", "b"), entry("Bob", "c")];
        let second = vec![entry("Bob", "c"), entry("Cleo", "a"), entry("Ann", "b")];
        assert_eq!(speaker_colors(&first), speaker_colors(&second));
        let colors = speaker_colors(&first);
        assert_eq!(colors["Ann"], 1);
        assert_eq!(colors["Bob"], 2);
        assert_eq!(colors["Cleo"], 3);
    }

    #[test]
    fn test_speaker_colors_cycle_past_six() {
        let entries: Vec<_> = (0..8)
            .map(|i| entry(&format!("Speaker{i}"), "x"))
            .collect();
        let colors = speaker_colors(&entries);
        assert_eq!(colors["Speaker0"], 1);
        assert_eq!(colors["Speaker6"], 1);
        assert_eq!(colors["Speaker7"], 2);
    }
}
