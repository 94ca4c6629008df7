//! Wire types and validation for the meetlog scan channel.
//!
//! This crate is shared by the popup core and the content-script scanner to
//! prevent schema drift. The popup core remains the authority on validation,
//! but the scanner side can reuse the same types to construct valid payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const PROTOCOL_VERSION: u32 = 1;
pub const MAX_SNAPSHOT_BYTES: usize = 1024 * 1024; // 1MB

/// Speaker name used when the scanner could not attribute an utterance.
/// Entries with this speaker are shown but never enter participant lists.
pub const UNKNOWN_SPEAKER: &str = "Unknown";

/// One recognized utterance as scraped from the meeting page.
///
/// `hash` is the stable identity computed by the scanner from speaker, text
/// and position. Equal hashes mean the same logical utterance; the popup core
/// never recomputes content hashes itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionEntry {
    pub speaker: String,
    pub text: String,
    /// Display-formatted time, opaque to ordering logic.
    pub timestamp: String,
    pub hash: String,
}

/// The full caption list as read by the scanner at one point in time.
///
/// Replaced wholesale on every reconciliation; never patched field-by-field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptSnapshot {
    pub messages: Vec<CaptionEntry>,
    pub scraped_at: DateTime<Utc>,
    pub meeting_url: String,
}

// Channel contract; the popup core only consumes PushSnapshot and produces
// ScanStart/ScanStop, but both ends share the full schema to avoid drift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub enum Method {
    /// Scanner pushes a fresh transcript snapshot to the popup.
    PushSnapshot,
    /// Popup asks the scanner to attach to a meeting tab.
    ScanStart,
    /// Popup asks the scanner to detach.
    ScanStop,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Request {
    pub protocol_version: u32,
    pub method: Method,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub params: Option<Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Response {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

impl Response {
    pub fn ok(id: Option<String>, data: Value) -> Self {
        Self {
            ok: true,
            id,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(id: Option<String>, code: &str, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            id,
            data: None,
            error: Some(ErrorInfo::new(code, message)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

/// Scanner acknowledgment for a scan start/stop request.
///
/// A stop acknowledgment carries the scanner's best-effort last read so the
/// popup can fold in utterances finalized between the last periodic push and
/// the stop action.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanAck {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_snapshot: Option<TranscriptSnapshot>,
}

impl ScanAck {
    pub fn ok() -> Self {
        Self {
            success: true,
            final_snapshot: None,
        }
    }
}

/// Parameters for a [`Method::ScanStart`] request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ScanStartParams {
    pub tab_id: i64,
}

/// Validates and decodes a [`Method::PushSnapshot`] payload.
///
/// Rejects oversized payloads, wrong shapes, and entries with a missing or
/// empty identity hash. A snapshot with zero messages is valid (an empty
/// caption region scrapes to an empty list).
pub fn parse_snapshot(params: Value) -> Result<TranscriptSnapshot, ErrorInfo> {
    let raw = serde_json::to_string(&params)
        .map_err(|err| ErrorInfo::new("invalid_snapshot", err.to_string()))?;
    if raw.len() > MAX_SNAPSHOT_BYTES {
        return Err(ErrorInfo::new(
            "snapshot_too_large",
            "snapshot exceeded maximum size",
        ));
    }

    let snapshot: TranscriptSnapshot = serde_json::from_value(params)
        .map_err(|err| ErrorInfo::new("invalid_snapshot", err.to_string()))?;

    for entry in &snapshot.messages {
        if entry.hash.trim().is_empty() {
            return Err(ErrorInfo::new(
                "missing_hash",
                format!("entry for speaker {:?} has no identity hash", entry.speaker),
            ));
        }
    }

    Ok(snapshot)
}

/// Validates and decodes a [`Method::ScanStart`] payload.
pub fn parse_scan_start(params: Value) -> Result<ScanStartParams, ErrorInfo> {
    serde_json::from_value(params)
        .map_err(|err| ErrorInfo::new("invalid_params", err.to_string()))
}
