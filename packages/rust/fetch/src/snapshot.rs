//! Content-addressed snapshot capture.
//!
//! A snapshot is the evidence a run leaves behind: the exact bytes of a
//! validated document, stored under a sha-256 name so the same content is
//! never written twice, plus an append-only metadata log per jurisdiction
//! and day.
//!
//! Layout under the data root:
//!
//! ```text
//! snapshots/<CODE>/<YYYYMMDD>/<sha256>.<html|pdf>
//! snapshots/<CODE>/<YYYYMMDD>/meta.json
//! ```

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use lexhound_shared::config::{AppConfig, DataDirs};
use lexhound_shared::error::LexhoundError;
use lexhound_shared::html;
use lexhound_shared::types::{JurisdictionCode, Reason, Snapshot};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, instrument, warn};

use crate::retry::Retryable;
use crate::transport::UrlFetcher;

/// Content types the store will archive.
const SNAPSHOT_CONTENT_TYPES: &[&str] = &["text/html", "text/plain", "application/pdf"];

// ----------------------------------------------------------------------------
// Outcomes
// ----------------------------------------------------------------------------

/// A capture the policy refused. Carries whatever the probe learned so the
/// report can show status and landing URL next to the reason code.
#[derive(Debug, Clone)]
pub struct CaptureFailure {
    pub reason: Reason,
    pub http_status: Option<u16>,
    pub final_url: Option<String>,
}

impl CaptureFailure {
    fn net(reason: Reason) -> Self {
        Self {
            reason,
            http_status: None,
            final_url: None,
        }
    }

    fn at(reason: Reason, status: u16, final_url: &str) -> Self {
        Self {
            reason,
            http_status: Some(status),
            final_url: Some(final_url.to_string()),
        }
    }
}

#[derive(Debug)]
pub enum CaptureError {
    /// Refused by fetch or viability policy; recorded as a reason code.
    Rejected(CaptureFailure),
    /// Disk or metadata fault. These abort the attempt instead of being
    /// folded into the reason taxonomy.
    Fault(LexhoundError),
}

impl From<LexhoundError> for CaptureError {
    fn from(error: LexhoundError) -> Self {
        Self::Fault(error)
    }
}

impl Retryable for CaptureError {
    fn retry_reason(&self) -> Option<Reason> {
        match self {
            Self::Rejected(failure) => Some(failure.reason),
            Self::Fault(_) => None,
        }
    }
}

// ----------------------------------------------------------------------------
// Store
// ----------------------------------------------------------------------------

/// Everything `capture` needs beyond the bytes themselves.
#[derive(Debug, Clone)]
pub struct CaptureRequest<'a> {
    pub jurisdiction: &'a JurisdictionCode,
    pub url: &'a str,
    pub now: DateTime<Utc>,
    pub timeout: Duration,
    pub run_id: &'a str,
}

pub struct SnapshotStore {
    data_root: PathBuf,
    min_bytes: u64,
    min_text_len: usize,
}

impl SnapshotStore {
    pub fn new(dirs: &DataDirs, config: &AppConfig) -> Self {
        Self {
            data_root: dirs.root().to_path_buf(),
            min_bytes: config.snapshot.min_bytes,
            min_text_len: config.snapshot.min_text_len,
        }
    }

    /// Fetches `req.url` and archives the body if it clears the viability
    /// floor. Re-capturing unchanged content is a no-op on disk; the metadata
    /// log still records the attempt.
    #[instrument(skip_all, fields(jurisdiction = %req.jurisdiction, url = req.url))]
    pub async fn capture(
        &self,
        fetcher: &dyn UrlFetcher,
        req: &CaptureRequest<'_>,
    ) -> Result<Snapshot, CaptureError> {
        let response = fetcher
            .get(req.url, req.timeout)
            .await
            .map_err(|reason| CaptureError::Rejected(CaptureFailure::net(reason)))?;

        let status = response.status;
        let final_url = response.final_url.clone();
        if status == 403 || status == 429 {
            return Err(CaptureError::Rejected(CaptureFailure::at(
                Reason::RateLimited,
                status,
                &final_url,
            )));
        }
        if !response.is_success() {
            return Err(CaptureError::Rejected(CaptureFailure::at(
                Reason::BadStatus,
                status,
                &final_url,
            )));
        }
        let Some(content_type) = response
            .content_type_base()
            .filter(|ct| SNAPSHOT_CONTENT_TYPES.contains(&ct.as_str()))
        else {
            return Err(CaptureError::Rejected(CaptureFailure::at(
                Reason::BadContentType,
                status,
                &final_url,
            )));
        };
        if response.body.is_empty() {
            return Err(CaptureError::Rejected(CaptureFailure::at(
                Reason::EmptyBody,
                status,
                &final_url,
            )));
        }

        let is_pdf = content_type == "application/pdf" || url_path_is_pdf(&final_url);
        if !self.meets_floor(&response.body, is_pdf) {
            return Err(CaptureError::Rejected(CaptureFailure::at(
                Reason::TooSmall,
                status,
                &final_url,
            )));
        }

        let content_hash = sha256_hex(&response.body);
        let day = req.now.format("%Y%m%d").to_string();
        let extension = if is_pdf { "pdf" } else { "html" };
        let relative = format!(
            "snapshots/{}/{}/{}.{}",
            req.jurisdiction.as_str(),
            day,
            content_hash,
            extension
        );
        let absolute = self.data_root.join(&relative);

        if absolute.exists() {
            debug!(path = %relative, "content unchanged, write skipped");
        } else {
            if let Some(parent) = absolute.parent() {
                std::fs::create_dir_all(parent).map_err(|e| LexhoundError::io(parent, e))?;
            }
            std::fs::write(&absolute, &response.body)
                .map_err(|e| LexhoundError::io(&absolute, e))?;
            debug!(path = %relative, bytes = response.body.len(), "snapshot written");
        }

        let snapshot = Snapshot {
            jurisdiction: req.jurisdiction.clone(),
            url: req.url.to_string(),
            final_url,
            http_status: status,
            content_hash,
            content_type,
            byte_size: response.body.len() as u64,
            captured_at: req.now,
            storage_path: relative,
        };
        self.append_meta(&snapshot, &day, req.run_id)?;
        Ok(snapshot)
    }

    /// Placeholder screen: PDFs must clear the byte floor; HTML passes on
    /// either the byte floor or enough visible text after tag stripping.
    fn meets_floor(&self, body: &[u8], is_pdf: bool) -> bool {
        let bytes = body.len() as u64;
        if is_pdf {
            return bytes >= self.min_bytes;
        }
        if bytes >= self.min_bytes {
            return true;
        }
        let text = html::visible_text(&String::from_utf8_lossy(body));
        text.chars().count() >= self.min_text_len
    }

    fn append_meta(
        &self,
        snapshot: &Snapshot,
        day: &str,
        run_id: &str,
    ) -> Result<(), LexhoundError> {
        let meta_path = self
            .data_root
            .join("snapshots")
            .join(snapshot.jurisdiction.as_str())
            .join(day)
            .join("meta.json");
        let mut meta = match std::fs::read_to_string(&meta_path) {
            Ok(raw) => serde_json::from_str::<DayMeta>(&raw).unwrap_or_else(|e| {
                warn!(path = %meta_path.display(), error = %e, "unreadable snapshot meta, starting fresh");
                DayMeta::new(snapshot.jurisdiction.as_str())
            }),
            Err(_) => DayMeta::new(snapshot.jurisdiction.as_str()),
        };
        meta.items.push(MetaEntry {
            url: snapshot.url.clone(),
            final_url: snapshot.final_url.clone(),
            http_status: snapshot.http_status,
            content_hash: snapshot.content_hash.clone(),
            content_type: snapshot.content_type.clone(),
            byte_size: snapshot.byte_size,
            storage_path: snapshot.storage_path.clone(),
            captured_at: snapshot.captured_at,
            run_id: run_id.to_string(),
        });
        if let Some(parent) = meta_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| LexhoundError::io(parent, e))?;
        }
        let rendered = serde_json::to_string_pretty(&meta)
            .map_err(|e| LexhoundError::parse(format!("snapshot meta: {e}")))?;
        std::fs::write(&meta_path, rendered + "\n").map_err(|e| LexhoundError::io(&meta_path, e))
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct DayMeta {
    jurisdiction: String,
    items: Vec<MetaEntry>,
}

impl DayMeta {
    fn new(jurisdiction: &str) -> Self {
        Self {
            jurisdiction: jurisdiction.to_string(),
            items: Vec::new(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct MetaEntry {
    url: String,
    final_url: String,
    http_status: u16,
    content_hash: String,
    content_type: String,
    byte_size: u64,
    storage_path: String,
    captured_at: DateTime<Utc>,
    run_id: String,
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

fn url_path_is_pdf(url: &str) -> bool {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    without_query.to_ascii_lowercase().ends_with(".pdf")
}
