//! # meetlog-core
//!
//! Transcript reconciliation and session-state core for the meetlog popup.
//! Takes periodically rescraped caption snapshots from the content-script
//! scanner, diffs them against the displayed transcript, and keeps the
//! persisted session model and every dependent view (live list, search,
//! participant filter, history, duration timer) consistent.
//!
//! ## Design Principles
//!
//! - **Single writer**: [`SessionStore`] exclusively owns recorder state;
//!   views read it and submit mutations through its operations.
//! - **Idempotent intake**: re-delivered or stale snapshots produce empty
//!   diffs and harmless re-commits, never duplicated entries.
//! - **Graceful degradation**: unreadable persisted state restores to a
//!   fresh session; a failing scan channel never blocks a local state
//!   transition.
//!
//! The wire schema shared with the scanner lives in `meetlog-protocol`.

pub mod channel;
pub mod diff;
pub mod duration;
pub mod error;
pub mod filter;
pub mod reconcile;
pub mod session;
pub mod storage;
pub mod store;

pub use channel::{NullScanChannel, ScanChannel, CHANNEL_TIMEOUT};
pub use diff::{diff, TranscriptDiff, UpdatedEntry};
pub use duration::DurationAccountant;
pub use error::{MeetlogError, Result};
pub use filter::{is_visible, speaker_colors, visible_entries, FilterState};
pub use reconcile::{ReconciliationLoop, SnapshotUpdate};
pub use session::{Session, SessionHistory, MAX_SESSIONS};
pub use storage::{FileStorage, MemoryStorage, PersistedState, StorageBackend, StorageConfig};
pub use store::{ChannelReport, RecordingMode, SessionStore, SnapshotOutcome};

// Re-export the wire types most callers need alongside the core.
pub use meetlog_protocol::{CaptionEntry, ScanAck, TranscriptSnapshot};
