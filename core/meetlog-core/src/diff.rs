//! Snapshot change detection.
//!
//! Diffs the previously displayed caption list against a freshly scraped one.
//! Two passes, in this order:
//!
//! 1. Position-aligned update pass: same index, same speaker, different hash
//!    is an in-place revision of a live-transcribed utterance. Hash-only
//!    diffing would misreport it as a remove+add pair and the view would lose
//!    DOM element identity for the line.
//! 2. Hash-set pass over everything pass 1 did not consume: hashes only in
//!    the new list are additions, hashes only in the old list are removals.
//!
//! Pure function; an unchanged or stale snapshot must produce an empty diff.

use std::collections::HashSet;

use meetlog_protocol::CaptionEntry;

/// An in-place revision of an existing utterance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatedEntry {
    /// The revised entry (carries the new hash and text).
    pub entry: CaptionEntry,
    /// Index of the revised line in both lists.
    pub position: usize,
    /// Text the line showed before the revision.
    pub previous_text: String,
}

/// Result of diffing two snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranscriptDiff {
    pub added: Vec<CaptionEntry>,
    pub updated: Vec<UpdatedEntry>,
    pub removed: Vec<CaptionEntry>,
}

impl TranscriptDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }
}

/// Computes the change set between the current entry list and a new snapshot.
pub fn diff(old: &[CaptionEntry], new: &[CaptionEntry]) -> TranscriptDiff {
    let mut result = TranscriptDiff::default();

    let aligned = old.len().min(new.len());
    let mut old_consumed = vec![false; old.len()];
    let mut new_consumed = vec![false; new.len()];

    // Pass 1: position-aligned comparison over the common prefix.
    for i in 0..aligned {
        if old[i].hash == new[i].hash {
            old_consumed[i] = true;
            new_consumed[i] = true;
        } else if old[i].speaker == new[i].speaker {
            result.updated.push(UpdatedEntry {
                entry: new[i].clone(),
                position: i,
                previous_text: old[i].text.clone(),
            });
            old_consumed[i] = true;
            new_consumed[i] = true;
        }
        // Different speaker at the same index: a genuine insertion or
        // removal shifted the list; leave both for the hash-set pass.
    }

    // Pass 2: hash-set membership over the unconsumed remainder.
    let old_hashes: HashSet<&str> = old
        .iter()
        .zip(&old_consumed)
        .filter(|(_, consumed)| !**consumed)
        .map(|(entry, _)| entry.hash.as_str())
        .collect();
    let new_hashes: HashSet<&str> = new
        .iter()
        .zip(&new_consumed)
        .filter(|(_, consumed)| !**consumed)
        .map(|(entry, _)| entry.hash.as_str())
        .collect();

    for (entry, consumed) in new.iter().zip(&new_consumed) {
        if !consumed && !old_hashes.contains(entry.hash.as_str()) {
            result.added.push(entry.clone());
        }
    }
    for (entry, consumed) in old.iter().zip(&old_consumed) {
        if !consumed && !new_hashes.contains(entry.hash.as_str()) {
            result.removed.push(entry.clone());
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(speaker: &str, text: &str, hash: &str) -> CaptionEntry {
        CaptionEntry {
            speaker: speaker.to_string(),
            text: text.to_string(),
            timestamp: "0:01".to_string(),
            hash: hash.to_string(),
        }
    }

    #[test]
    fn test_identical_lists_produce_empty_diff() {
        let entries = vec![entry("Ann", "hi", "a1"), entry("Bob", "yo", "b1")];
        let result = diff(&entries, &entries);
        assert!(result.is_empty());
    }

    #[test]
    fn test_empty_old_list_is_pure_addition() {
        let new = vec![entry("Ann", "hi", "a1"), entry("Bob", "yo", "b1")];
        let result = diff(&[], &new);
        assert_eq!(result.added, new);
        assert!(result.updated.is_empty());
        assert!(result.removed.is_empty());
    }

    #[test]
    fn test_empty_new_list_is_pure_removal() {
        let old = vec![entry("Ann", "hi", "a1"), entry("Bob", "yo", "b1")];
        let result = diff(&old, &[]);
        assert!(result.added.is_empty());
        assert!(result.updated.is_empty());
        assert_eq!(result.removed, old);
    }

    #[test]
    fn test_in_place_revision_is_an_update_not_add_remove() {
        let old = vec![entry("Ann", "foo", "h1")];
        let new = vec![entry("Ann", "foobar", "h2")];
        let result = diff(&old, &new);

        assert!(result.added.is_empty());
        assert!(result.removed.is_empty());
        assert_eq!(result.updated.len(), 1);
        let update = &result.updated[0];
        assert_eq!(update.position, 0);
        assert_eq!(update.previous_text, "foo");
        assert_eq!(update.entry.hash, "h2");
        assert_eq!(update.entry.text, "foobar");
    }

    #[test]
    fn test_tail_revision_plus_new_entry() {
        // The common live-captioning shape: the last line is still being
        // finalized while a new speaker's line appears below it.
        let old = vec![entry("Ann", "hi", "a1"), entry("Bob", "so I was", "b1")];
        let new = vec![
            entry("Ann", "hi", "a1"),
            entry("Bob", "so I was saying", "b2"),
            entry("Cleo", "right", "c1"),
        ];
        let result = diff(&old, &new);

        assert_eq!(result.updated.len(), 1);
        assert_eq!(result.updated[0].position, 1);
        assert_eq!(result.updated[0].previous_text, "so I was");
        assert_eq!(result.added, vec![entry("Cleo", "right", "c1")]);
        assert!(result.removed.is_empty());
    }

    #[test]
    fn test_speaker_change_at_position_falls_through_to_hash_pass() {
        // A removal shifted the list: index 0 now holds a different speaker.
        let old = vec![entry("Ann", "hi", "a1"), entry("Bob", "yo", "b1")];
        let new = vec![entry("Bob", "yo", "b1")];
        let result = diff(&old, &new);

        assert!(result.updated.is_empty());
        assert!(result.added.is_empty());
        assert_eq!(result.removed, vec![entry("Ann", "hi", "a1")]);
    }

    #[test]
    fn test_reordered_identical_entries_are_not_add_remove_pairs() {
        let old = vec![entry("Ann", "hi", "a1"), entry("Bob", "yo", "b1")];
        let new = vec![entry("Bob", "yo", "b1"), entry("Ann", "hi", "a1")];
        let result = diff(&old, &new);

        // Same physical utterances in a new order: nothing added or removed.
        assert!(result.is_empty());
    }

    #[test]
    fn test_every_new_entry_is_classified_exactly_once() {
        let old = vec![
            entry("Ann", "one", "a1"),
            entry("Bob", "two", "b1"),
            entry("Cleo", "three", "c1"),
        ];
        let new = vec![
            entry("Ann", "one", "a1"),
            entry("Bob", "two more", "b2"),
            entry("Dana", "four", "d1"),
        ];
        let result = diff(&old, &new);

        let classified = result.added.len() + result.updated.len();
        let identical = new
            .iter()
            .filter(|e| old.iter().any(|o| o.hash == e.hash))
            .count();
        assert_eq!(classified + identical, new.len());
        assert_eq!(result.removed, vec![entry("Cleo", "three", "c1")]);
    }
}
