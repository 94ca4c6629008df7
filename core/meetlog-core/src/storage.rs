//! Persistence for the recorder state group.
//!
//! Everything that must stay mutually consistent (transcript, session id,
//! segment timestamps, history) lives in one [`PersistedState`] struct and is
//! written in one commit. The external store offers no multi-key
//! transactions, so the whole-group write is what keeps a concurrently
//! opened second view from seeing a torn read.
//!
//! # Defensive loads
//!
//! The file may be missing, empty, corrupt, or written by a different schema
//! version. All of those degrade to the default (fresh) state with a warning,
//! never an error: a popup that cannot restore still has to open.
//!
//! # Atomic writes
//!
//! Temp file + rename so a crash mid-write cannot leave a half-written file.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::warn;

use crate::error::{MeetlogError, Result};
use crate::session::SessionHistory;
use meetlog_protocol::TranscriptSnapshot;

const STORE_VERSION: u32 = 1;

/// Central configuration for meetlog storage paths.
///
/// Production code uses `StorageConfig::default()` which points to
/// `~/.meetlog/`. Tests use `StorageConfig::with_root(temp_dir)` for
/// isolation.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let home = dirs::home_dir().expect("Could not find home directory");
        Self {
            root: home.join(".meetlog"),
        }
    }
}

impl StorageConfig {
    /// Creates a StorageConfig with a custom root directory.
    /// Used for testing with temp directories.
    pub fn with_root(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path to recorder-state.json (the full persisted state group).
    pub fn state_file(&self) -> PathBuf {
        self.root.join("recorder-state.json")
    }
}

/// The complete persisted key group of the recorder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    /// True while a recording is active; lets a reopened popup resume the
    /// recording display instead of starting fresh.
    #[serde(default)]
    pub realtime_mode: bool,
    /// Absolute start of the in-progress segment. Absolute on purpose: an
    /// elapsed value would go stale the moment the popup closes.
    #[serde(default)]
    pub segment_start: Option<DateTime<Utc>>,
    /// Wall-clock start of the session as a whole, stable across
    /// pause/resume. Only used to generate the default title.
    #[serde(default)]
    pub session_anchor: Option<DateTime<Utc>>,
    #[serde(default)]
    pub transcript: Option<TranscriptSnapshot>,
    #[serde(default)]
    pub current_session_id: Option<String>,
    /// True when the transcript belongs to a paused recording rather than a
    /// loaded historical session. Only a paused one may resume after a
    /// popup reopen; a historical one stays read-only.
    #[serde(default)]
    pub paused: bool,
    /// Seconds from completed segments, excluding the in-progress one.
    #[serde(default)]
    pub accumulated_secs: i64,
    #[serde(default)]
    pub history: SessionHistory,
    #[serde(default)]
    pub meeting_tab_id: Option<i64>,
}

/// The on-disk JSON structure for the state file.
#[derive(Debug, Serialize, Deserialize)]
struct StoreFile {
    version: u32,
    state: PersistedState,
}

/// Asynchronous backend for the persisted state group.
///
/// `commit` writes the whole group; there is no per-key write. A failed
/// commit leaves the in-memory state authoritative and is retried by the
/// caller on the next reconciliation tick.
pub trait StorageBackend: Send + Sync {
    fn load(&self) -> impl std::future::Future<Output = Result<PersistedState>> + Send;
    fn commit(
        &self,
        state: &PersistedState,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// JSON-file backend under the meetlog storage root.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            path: config.state_file(),
        }
    }

    pub fn at_path(path: PathBuf) -> Self {
        Self { path }
    }

    fn read_state(&self) -> PersistedState {
        if !self.path.exists() {
            return PersistedState::default();
        }

        let content = match fs_err::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) => {
                warn!(error = %err, path = %self.path.display(), "Failed to read state file; starting fresh");
                return PersistedState::default();
            }
        };

        if content.trim().is_empty() {
            warn!(path = %self.path.display(), "Empty state file; starting fresh");
            return PersistedState::default();
        }

        match serde_json::from_str::<StoreFile>(&content) {
            Ok(file) if file.version == STORE_VERSION => file.state,
            Ok(file) => {
                warn!(
                    version = file.version,
                    expected = STORE_VERSION,
                    "Unsupported state file version; starting fresh"
                );
                PersistedState::default()
            }
            Err(err) => {
                warn!(error = %err, "Corrupt state file; starting fresh");
                PersistedState::default()
            }
        }
    }

    fn write_state(&self, state: &PersistedState) -> Result<()> {
        let parent = self.path.parent().ok_or_else(|| {
            MeetlogError::persistence("state file path", "path has no parent directory")
        })?;
        fs_err::create_dir_all(parent).map_err(|err| MeetlogError::Io {
            context: "creating storage directory".to_string(),
            source: err.into(),
        })?;

        let file = StoreFile {
            version: STORE_VERSION,
            state: state.clone(),
        };
        let content = serde_json::to_string_pretty(&file).map_err(|err| MeetlogError::Json {
            context: "serializing state file".to_string(),
            source: err,
        })?;

        let mut temp = NamedTempFile::new_in(parent)
            .map_err(|err| MeetlogError::persistence("temp state file", err))?;
        temp.write_all(content.as_bytes())
            .map_err(|err| MeetlogError::persistence("writing temp state file", err))?;
        temp.flush()
            .map_err(|err| MeetlogError::persistence("flushing temp state file", err))?;
        temp.persist(&self.path)
            .map_err(|err| MeetlogError::persistence("persisting state file", err.error))?;

        Ok(())
    }
}

impl StorageBackend for FileStorage {
    async fn load(&self) -> Result<PersistedState> {
        Ok(self.read_state())
    }

    async fn commit(&self, state: &PersistedState) -> Result<()> {
        self.write_state(state)
    }
}

/// In-memory backend for tests and for running without a profile directory.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    inner: std::sync::Mutex<PersistedState>,
    fail_commits: std::sync::atomic::AtomicBool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the last committed state, for assertions.
    pub fn committed(&self) -> PersistedState {
        self.inner.lock().expect("storage mutex poisoned").clone()
    }

    /// Makes every following commit fail until switched off again, to
    /// exercise the write-retry contract.
    pub fn set_fail_commits(&self, fail: bool) {
        self.fail_commits
            .store(fail, std::sync::atomic::Ordering::SeqCst);
    }
}

impl StorageBackend for MemoryStorage {
    async fn load(&self) -> Result<PersistedState> {
        Ok(self.committed())
    }

    async fn commit(&self, state: &PersistedState) -> Result<()> {
        if self.fail_commits.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(MeetlogError::persistence(
                "memory storage",
                "commit failure injected",
            ));
        }
        *self.inner.lock().expect("storage mutex poisoned") = state.clone();
        Ok(())
    }
}
