//! Scan channel boundary.
//!
//! The actual transport (extension messaging between popup, background and
//! content script) lives outside this crate; the core only issues start/stop
//! requests through this trait and imposes its own round-trip timeout. A
//! channel failure never blocks or rolls back a local state transition.

use std::time::Duration;

use tracing::warn;

use crate::error::{MeetlogError, Result};
use meetlog_protocol::ScanAck;

/// Upper bound on a scan start/stop round trip. The transport specifies no
/// timeout of its own; the core proceeds locally once this expires.
pub const CHANNEL_TIMEOUT: Duration = Duration::from_secs(3);

/// Outbound requests to the content-script scanner.
pub trait ScanChannel: Send + Sync {
    /// Asks the scanner to attach to the given meeting tab.
    fn request_scan_start(
        &self,
        tab_id: i64,
    ) -> impl std::future::Future<Output = Result<ScanAck>> + Send;

    /// Asks the scanner to detach. The acknowledgment may carry the
    /// scanner's best-effort final read.
    fn request_scan_stop(&self) -> impl std::future::Future<Output = Result<ScanAck>> + Send;
}

/// Runs a scan-start request under [`CHANNEL_TIMEOUT`]. Timeouts and
/// transport failures come back as [`MeetlogError::Channel`].
pub async fn start_with_timeout<C: ScanChannel>(channel: &C, tab_id: i64) -> Result<ScanAck> {
    match tokio::time::timeout(CHANNEL_TIMEOUT, channel.request_scan_start(tab_id)).await {
        Ok(result) => result,
        Err(_) => {
            warn!(tab_id, "Scan start request timed out");
            Err(MeetlogError::Channel("scan start timed out".to_string()))
        }
    }
}

/// Runs a scan-stop request under [`CHANNEL_TIMEOUT`].
pub async fn stop_with_timeout<C: ScanChannel>(channel: &C) -> Result<ScanAck> {
    match tokio::time::timeout(CHANNEL_TIMEOUT, channel.request_scan_stop()).await {
        Ok(result) => result,
        Err(_) => {
            warn!("Scan stop request timed out");
            Err(MeetlogError::Channel("scan stop timed out".to_string()))
        }
    }
}

/// Always-acknowledging channel for tests and headless use. Never returns a
/// final snapshot on stop.
#[derive(Debug, Clone, Default)]
pub struct NullScanChannel;

impl ScanChannel for NullScanChannel {
    async fn request_scan_start(&self, _tab_id: i64) -> Result<ScanAck> {
        Ok(ScanAck::ok())
    }

    async fn request_scan_stop(&self) -> Result<ScanAck> {
        Ok(ScanAck::ok())
    }
}
