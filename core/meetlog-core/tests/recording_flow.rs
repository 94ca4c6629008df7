//! End-to-end recording flow: new session → record → stop → resume →
//! record more, checking transcript, history, duration and filters at each
//! step.

use chrono::{DateTime, Duration, TimeZone, Utc};
use meetlog_core::{
    CaptionEntry, MemoryStorage, NullScanChannel, RecordingMode, SessionStore, SnapshotOutcome,
    TranscriptSnapshot,
};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 31, 9, 30, 0).unwrap()
}

fn entry(speaker: &str, text: &str, hash: &str, timestamp: &str) -> CaptionEntry {
    CaptionEntry {
        speaker: speaker.to_string(),
        text: text.to_string(),
        timestamp: timestamp.to_string(),
        hash: hash.to_string(),
    }
}

fn snapshot(messages: Vec<CaptionEntry>, at: DateTime<Utc>) -> TranscriptSnapshot {
    TranscriptSnapshot {
        messages,
        scraped_at: at,
        meeting_url: "https://meet.example/xyz-abc".to_string(),
    }
}

#[tokio::test]
async fn full_record_stop_resume_cycle() {
    let mut store = SessionStore::new(MemoryStorage::new(), NullScanChannel);
    store.create_new_session().await.expect("new session");
    store
        .start_recording(false, Some(31), t0())
        .await
        .expect("start");
    assert_eq!(store.mode(), RecordingMode::Recording);

    // First scrape arrives.
    let outcome = store
        .apply_scan_snapshot(
            snapshot(vec![entry("Ann", "hi", "a1", "0:01")], t0()),
            t0() + Duration::seconds(2),
        )
        .await
        .expect("first snapshot");
    match outcome {
        SnapshotOutcome::Applied { diff, visible } => {
            assert_eq!(diff.added.len(), 1);
            assert!(diff.updated.is_empty());
            assert!(diff.removed.is_empty());
            assert_eq!(visible.len(), 1);
        }
        SnapshotOutcome::Ignored => panic!("snapshot must apply during recording"),
    }

    assert_eq!(store.entries().len(), 1);
    let id = store.current_session_id().expect("session id").to_string();
    let saved = store.history().get(&id).expect("autosaved session");
    assert_eq!(saved.entry_count, 1);
    assert_eq!(saved.participant_count, 1);
    assert_eq!(saved.title, "Meeting at 09:30");
    let original_date = saved.date;

    // Stop after 65 seconds of recording.
    store
        .stop_recording(t0() + Duration::seconds(65))
        .await
        .expect("stop");
    assert_eq!(store.mode(), RecordingMode::Paused);
    assert_eq!(store.duration_secs(t0() + Duration::seconds(300)), 65);
    assert_eq!(
        store.history().get(&id).expect("saved").total_duration,
        65
    );

    // Resume; the next scrape re-delivers the old entry plus a new speaker.
    store
        .resume_recording(t0() + Duration::seconds(120))
        .await
        .expect("resume");
    assert_eq!(store.mode(), RecordingMode::Recording);

    let outcome = store
        .apply_scan_snapshot(
            snapshot(
                vec![
                    entry("Ann", "hi", "a1", "0:01"),
                    entry("Bob", "yo", "b1", "0:05"),
                ],
                t0() + Duration::seconds(125),
            ),
            t0() + Duration::seconds(125),
        )
        .await
        .expect("second snapshot");
    match outcome {
        SnapshotOutcome::Applied { diff, .. } => {
            assert_eq!(diff.added.len(), 1);
            assert_eq!(diff.added[0].hash, "b1");
            assert!(diff.updated.is_empty());
            assert!(diff.removed.is_empty());
        }
        SnapshotOutcome::Ignored => panic!("snapshot must apply after resume"),
    }

    let saved = store.history().get(&id).expect("updated session");
    assert_eq!(saved.entry_count, 2);
    assert_eq!(saved.participant_count, 2);
    assert_eq!(saved.date, original_date);
    assert_eq!(saved.title, "Meeting at 09:30");
    assert_eq!(store.history().len(), 1);

    // Both speakers joined the filter roster, all selected.
    assert_eq!(store.filter().badge(), None);
    assert_eq!(store.visible().len(), 2);

    // Recording continues accumulating on top of the first segment.
    assert_eq!(store.duration_secs(t0() + Duration::seconds(150)), 95);
}
