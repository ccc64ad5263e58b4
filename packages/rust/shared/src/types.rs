//! Core domain types for the source discovery pipeline.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{LexhoundError, Result};

/// SHA-256 of zero bytes — a snapshot carrying this hash captured nothing.
pub const EMPTY_SHA256: &str =
    "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

// ---------------------------------------------------------------------------
// JurisdictionCode
// ---------------------------------------------------------------------------

static CODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Z]{2}(-[A-Z0-9]{1,3})?$").expect("jurisdiction code regex")
});

/// Two-letter jurisdiction code, optionally with a region suffix (`US-CA`).
/// The unit of work for the whole pipeline.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct JurisdictionCode(String);

impl JurisdictionCode {
    /// Parse and normalize a code; lowercase input is accepted and uppercased.
    pub fn new(code: &str) -> Result<Self> {
        let normalized = code.trim().to_ascii_uppercase();
        if !CODE_RE.is_match(&normalized) {
            return Err(LexhoundError::validation(format!(
                "jurisdiction code '{code}' not recognized"
            )));
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JurisdictionCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for JurisdictionCode {
    type Err = LexhoundError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::new(s)
    }
}

// ---------------------------------------------------------------------------
// Reason
// ---------------------------------------------------------------------------

/// Closed reason-code taxonomy for pipeline outcomes.
///
/// Stages report these instead of raising errors: the controller decides
/// whether to retry, skip, or advance based on the code alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Reason {
    // Discovery
    NoCandidates,

    // Domain trust
    InvalidUrl,
    HttpsRequired,
    MissingHost,
    DeniedSubstring,
    DeniedHost,
    NotAllowlisted,
    RedirectOffAllowlist,

    // Live fetch / snapshot capture
    BadStatus,
    BadContentType,
    EmptyBody,
    TooSmall,
    RateLimited,
    Timeout,
    FetchFailed,

    // Law-page classification
    DeniedUrl,
    SnapshotMissing,
    NoLawMarker,
    NoLawStructure,
    NoLawPage,

    // Run level
    NetworkDisabled,
}

impl Reason {
    /// Stable SCREAMING_SNAKE_CASE code as written into reports.
    pub fn code(self) -> &'static str {
        match self {
            Self::NoCandidates => "NO_CANDIDATES",
            Self::InvalidUrl => "INVALID_URL",
            Self::HttpsRequired => "HTTPS_REQUIRED",
            Self::MissingHost => "MISSING_HOST",
            Self::DeniedSubstring => "DENIED_SUBSTRING",
            Self::DeniedHost => "DENIED_HOST",
            Self::NotAllowlisted => "NOT_ALLOWLISTED",
            Self::RedirectOffAllowlist => "REDIRECT_OFF_ALLOWLIST",
            Self::BadStatus => "BAD_STATUS",
            Self::BadContentType => "BAD_CONTENT_TYPE",
            Self::EmptyBody => "EMPTY_BODY",
            Self::TooSmall => "TOO_SMALL",
            Self::RateLimited => "RATE_LIMITED",
            Self::Timeout => "TIMEOUT",
            Self::FetchFailed => "FETCH_FAILED",
            Self::DeniedUrl => "DENIED_URL",
            Self::SnapshotMissing => "SNAPSHOT_MISSING",
            Self::NoLawMarker => "NO_LAW_MARKER",
            Self::NoLawStructure => "NO_LAW_STRUCTURE",
            Self::NoLawPage => "NO_LAW_PAGE",
            Self::NetworkDisabled => "NETWORK_DISABLED",
        }
    }

    /// Whether a failure with this reason is worth retrying with backoff.
    ///
    /// Timeouts count as generic fetch failures for retry purposes; 403/429
    /// surface as [`Reason::RateLimited`].
    pub fn is_transient(self) -> bool {
        matches!(self, Self::RateLimited | Self::Timeout | Self::FetchFailed)
    }
}

impl std::fmt::Display for Reason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

// ---------------------------------------------------------------------------
// CandidateUrl
// ---------------------------------------------------------------------------

/// Where a candidate URL came from; drives scan priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OriginKind {
    /// Already on file in the catalog entry (candidates or allow-domains).
    Registry,
    /// Returned by the external structured-data feed.
    ExternalProperty,
    /// A government portal recorded in the catalog.
    CatalogPortal,
    /// An explicit seed URL from `sources/seeds.json`.
    Seed,
}

impl std::fmt::Display for OriginKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Registry => "registry",
            Self::ExternalProperty => "external-property",
            Self::CatalogPortal => "catalog-portal",
            Self::Seed => "seed",
        };
        f.write_str(s)
    }
}

/// An ephemeral candidate URL for one jurisdiction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateUrl {
    pub url: String,
    pub origin: OriginKind,
    /// Crawl-priority score; zero until scored by the orchestrator.
    #[serde(default)]
    pub score: i32,
}

impl CandidateUrl {
    pub fn new(url: impl Into<String>, origin: OriginKind) -> Self {
        Self {
            url: url.into(),
            origin,
            score: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// ValidationResult
// ---------------------------------------------------------------------------

/// Outcome of live-validating a candidate URL. Derived, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<Reason>,
    /// URL after redirects; only meaningful when a fetch happened.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

impl ValidationResult {
    pub fn pass(final_url: impl Into<String>, status: u16, content_type: Option<String>) -> Self {
        Self {
            ok: true,
            reason: None,
            final_url: Some(final_url.into()),
            http_status: Some(status),
            content_type,
        }
    }

    pub fn fail(reason: Reason) -> Self {
        Self {
            ok: false,
            reason: Some(reason),
            final_url: None,
            http_status: None,
            content_type: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// An immutable content-addressed capture of fetched bytes.
///
/// Identified by `content_hash`: re-fetching identical bytes maps to the
/// same storage path and writes nothing new.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub jurisdiction: JurisdictionCode,
    pub url: String,
    pub final_url: String,
    pub http_status: u16,
    /// SHA-256 of the captured bytes, lowercase hex.
    pub content_hash: String,
    pub content_type: String,
    pub byte_size: u64,
    pub captured_at: DateTime<Utc>,
    /// Path relative to the data root (`snapshots/<CODE>/<YYYYMMDD>/<hash>.<ext>`).
    pub storage_path: String,
}

impl Snapshot {
    /// A snapshot qualifies for catalog commits only when it actually
    /// captured something: non-zero size and a non-placeholder hash.
    pub fn is_viable(&self) -> bool {
        self.byte_size > 0 && self.content_hash != EMPTY_SHA256
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jurisdiction_code_parses_and_normalizes() {
        let code = JurisdictionCode::new("de").expect("parse DE");
        assert_eq!(code.as_str(), "DE");

        let region: JurisdictionCode = "us-ca".parse().expect("parse US-CA");
        assert_eq!(region.to_string(), "US-CA");
    }

    #[test]
    fn jurisdiction_code_rejects_garbage() {
        assert!(JurisdictionCode::new("").is_err());
        assert!(JurisdictionCode::new("USA").is_err());
        assert!(JurisdictionCode::new("1A").is_err());
        assert!(JurisdictionCode::new("US_CA").is_err());
    }

    #[test]
    fn reason_codes_are_stable() {
        assert_eq!(Reason::NoLawStructure.code(), "NO_LAW_STRUCTURE");
        assert_eq!(
            serde_json::to_string(&Reason::RedirectOffAllowlist).expect("serialize"),
            "\"REDIRECT_OFF_ALLOWLIST\""
        );
        let parsed: Reason = serde_json::from_str("\"RATE_LIMITED\"").expect("deserialize");
        assert_eq!(parsed, Reason::RateLimited);
    }

    #[test]
    fn transient_reasons_match_retry_contract() {
        assert!(Reason::RateLimited.is_transient());
        assert!(Reason::Timeout.is_transient());
        assert!(Reason::FetchFailed.is_transient());
        assert!(!Reason::BadStatus.is_transient());
        assert!(!Reason::TooSmall.is_transient());
        assert!(!Reason::NotAllowlisted.is_transient());
    }

    #[test]
    fn snapshot_viability() {
        let mut snap = Snapshot {
            jurisdiction: JurisdictionCode::new("AA").expect("code"),
            url: "https://example.gov/".into(),
            final_url: "https://example.gov/".into(),
            http_status: 200,
            content_hash: "ab12".into(),
            content_type: "text/html".into(),
            byte_size: 5000,
            captured_at: Utc::now(),
            storage_path: "snapshots/AA/20250101/ab12.html".into(),
        };
        assert!(snap.is_viable());

        snap.byte_size = 0;
        assert!(!snap.is_viable());

        snap.byte_size = 10;
        snap.content_hash = EMPTY_SHA256.into();
        assert!(!snap.is_viable());
    }
}
