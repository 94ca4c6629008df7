//! Debug utility for inspecting persisted recorder state in local
//! environments.

use meetlog_core::{FileStorage, NullScanChannel, SessionStore, StorageBackend, StorageConfig};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let config = StorageConfig::default();
    let storage = FileStorage::new(&config);

    println!("═══════════════════════════════════════════════════════════");
    println!("  Meetlog Store Check");
    println!("═══════════════════════════════════════════════════════════");
    println!();
    println!("State file: {}", config.state_file().display());
    println!();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .expect("tokio runtime");

    runtime.block_on(async {
        let raw = storage.load().await.expect("state load never errors");
        println!("── Raw Persisted Keys ────────────────────────────────────");
        println!("  realtime_mode:      {}", raw.realtime_mode);
        println!("  paused:             {}", raw.paused);
        println!("  segment_start:      {:?}", raw.segment_start);
        println!("  session_anchor:     {:?}", raw.session_anchor);
        println!("  current_session_id: {:?}", raw.current_session_id);
        println!("  accumulated_secs:   {}", raw.accumulated_secs);
        println!("  meeting_tab_id:     {:?}", raw.meeting_tab_id);
        println!(
            "  transcript:         {} entries",
            raw.transcript.as_ref().map_or(0, |t| t.messages.len())
        );
        println!("  history:            {} sessions", raw.history.len());
        println!();

        let mut store = SessionStore::new(storage, NullScanChannel);
        store.restore().await;

        println!("── Restored Store ────────────────────────────────────────");
        println!("  mode:     {:?}", store.mode());
        println!(
            "  duration: {}s as of now",
            store.duration_secs(chrono::Utc::now())
        );
        println!("  visible:  {} entries", store.visible().len());
        println!();

        println!("── Session History ───────────────────────────────────────");
        if store.history().is_empty() {
            println!("  (no sessions recorded)");
        }
        for session in store.history().sessions() {
            println!(
                "  {}  {:<24}  {} entries, {} participants, {}s",
                session.date.format("%Y-%m-%d %H:%M"),
                session.title,
                session.entry_count,
                session.participant_count,
                session.total_duration
            );
        }
    });
}
