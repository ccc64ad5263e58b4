//! Per-run report records.
//!
//! One [`RunReport`] is written per invocation (`reports/last_run.json`),
//! including skipped runs. It is the machine-readable summary consumed by
//! operators and CI; target exclusion between runs is handled by the attempt
//! ledger, not by re-parsing this file.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{JurisdictionCode, Reason};

// ---------------------------------------------------------------------------
// Run mode / status / verdict
// ---------------------------------------------------------------------------

/// Controller operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// One explicit jurisdiction, processed unconditionally.
    Force,
    /// Work the missing-official backlog up to a per-run success quota.
    MinSources,
    /// Bulk target list fanned out to a bounded worker pool.
    Scale,
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Force => "force",
            Self::MinSources => "min_sources",
            Self::Scale => "scale",
        };
        f.write_str(s)
    }
}

/// How the invocation ended; `Skipped` maps to a distinct CLI exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    Skipped,
}

/// Overall run verdict ladder, most informative failure first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunVerdict {
    /// At least one validated source (and catalog progress where expected).
    Ok,
    /// No targets were eligible for this mode.
    NoTargets,
    /// Targets had no candidates at all.
    NoOfficial,
    /// Candidates existed but none survived domain trust screening.
    AllowlistTooStrict,
    /// Validation succeeded somewhere but nothing could be captured.
    Blocked,
    /// Some progress, below the success quota.
    LowValidated,
    /// The network gate was off; nothing was attempted.
    NetworkDisabled,
}

impl RunVerdict {
    /// Wire code, as serialized into reports.
    pub fn code(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::NoTargets => "NO_TARGETS",
            Self::NoOfficial => "NO_OFFICIAL",
            Self::AllowlistTooStrict => "ALLOWLIST_TOO_STRICT",
            Self::Blocked => "BLOCKED",
            Self::LowValidated => "LOW_VALIDATED",
            Self::NetworkDisabled => "NETWORK_DISABLED",
        }
    }
}

impl std::fmt::Display for RunVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

// ---------------------------------------------------------------------------
// Report records
// ---------------------------------------------------------------------------

/// One bounded failure-list entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportReason {
    pub jurisdiction: JurisdictionCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub reason: Reason,
}

/// Everything that happened for a single picked jurisdiction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JurisdictionOutcome {
    pub jurisdiction: JurisdictionCode,
    /// The candidate that passed live validation, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_path: Option<String>,
    /// Whether this jurisdiction's catalog entry changed this run.
    #[serde(default)]
    pub catalog_added: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub law_page_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub law_page_snapshot_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub law_page_reason: Option<Reason>,
    /// Why nothing was validated, when that is the case.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<Reason>,
}

impl JurisdictionOutcome {
    pub fn new(jurisdiction: JurisdictionCode) -> Self {
        Self {
            jurisdiction,
            url: None,
            final_url: None,
            http_status: None,
            content_hash: None,
            snapshot_path: None,
            catalog_added: false,
            law_page_url: None,
            law_page_snapshot_path: None,
            law_page_reason: None,
            reason: None,
        }
    }

    /// Progress means a validated URL or a stored snapshot.
    pub fn made_progress(&self) -> bool {
        self.url.is_some() || self.snapshot_path.is_some()
    }
}

/// The per-run report, one per invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub mode: RunMode,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Jurisdictions actually attempted, in order.
    pub picked: Vec<JurisdictionCode>,
    pub entries: Vec<JurisdictionOutcome>,
    /// Length-bounded most-informative failures (not every failure).
    pub reasons: Vec<ReportReason>,
    pub targets: usize,
    pub discovered: usize,
    pub candidates: usize,
    pub validated_ok: usize,
    pub snapshots: usize,
    pub law_pages: usize,
    pub catalog_added: usize,
    pub catalog_written: bool,
    pub verdict: RunVerdict,
}

impl RunReport {
    pub fn new(run_id: impl Into<String>, mode: RunMode, started_at: DateTime<Utc>) -> Self {
        Self {
            run_id: run_id.into(),
            mode,
            status: RunStatus::Completed,
            started_at,
            finished_at: started_at,
            picked: Vec::new(),
            entries: Vec::new(),
            reasons: Vec::new(),
            targets: 0,
            discovered: 0,
            candidates: 0,
            validated_ok: 0,
            snapshots: 0,
            law_pages: 0,
            catalog_added: 0,
            catalog_written: false,
            verdict: RunVerdict::NoTargets,
        }
    }

    /// Record a failure, dropping it silently once `cap` entries exist.
    pub fn push_reason(
        &mut self,
        cap: usize,
        jurisdiction: JurisdictionCode,
        url: Option<String>,
        reason: Reason,
    ) {
        if self.reasons.len() >= cap {
            return;
        }
        self.reasons.push(ReportReason {
            jurisdiction,
            url,
            reason,
        });
    }

    /// Fold a finished jurisdiction outcome into the counters.
    pub fn absorb(&mut self, outcome: JurisdictionOutcome) {
        if outcome.url.is_some() {
            self.validated_ok += 1;
        }
        if outcome.snapshot_path.is_some() {
            self.snapshots += 1;
        }
        if outcome.law_page_url.is_some() {
            self.law_pages += 1;
        }
        if outcome.catalog_added {
            self.catalog_added += 1;
        }
        self.picked.push(outcome.jurisdiction.clone());
        self.entries.push(outcome);
    }

    /// Derive the overall verdict from the counters. `quota` is the per-run
    /// success quota when the mode has one.
    pub fn resolve_verdict(&mut self, quota: Option<usize>) {
        self.verdict = if self.status == RunStatus::Skipped {
            RunVerdict::NetworkDisabled
        } else if self.targets == 0 {
            RunVerdict::NoTargets
        } else if self.validated_ok > 0 && self.snapshots > 0 {
            match quota {
                Some(q) if self.catalog_added < q => RunVerdict::LowValidated,
                _ => RunVerdict::Ok,
            }
        } else if self.validated_ok > 0 {
            RunVerdict::Blocked
        } else if self.candidates == 0 {
            RunVerdict::NoOfficial
        } else {
            RunVerdict::AllowlistTooStrict
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(s: &str) -> JurisdictionCode {
        JurisdictionCode::new(s).expect("code")
    }

    #[test]
    fn reasons_are_bounded() {
        let mut report = RunReport::new("r1", RunMode::MinSources, Utc::now());
        for i in 0..20 {
            report.push_reason(
                5,
                code("AA"),
                Some(format!("https://example.gov/{i}")),
                Reason::BadStatus,
            );
        }
        assert_eq!(report.reasons.len(), 5);
    }

    #[test]
    fn absorb_updates_counters() {
        let mut report = RunReport::new("r2", RunMode::Force, Utc::now());
        let mut outcome = JurisdictionOutcome::new(code("AA"));
        outcome.url = Some("https://example.gov/".into());
        outcome.snapshot_path = Some("snapshots/AA/20250101/ab.html".into());
        outcome.catalog_added = true;
        report.absorb(outcome);

        assert_eq!(report.validated_ok, 1);
        assert_eq!(report.snapshots, 1);
        assert_eq!(report.law_pages, 0);
        assert_eq!(report.catalog_added, 1);
        assert_eq!(report.picked, vec![code("AA")]);
    }

    #[test]
    fn verdict_ladder() {
        let mut report = RunReport::new("r3", RunMode::MinSources, Utc::now());
        report.resolve_verdict(None);
        assert_eq!(report.verdict, RunVerdict::NoTargets);

        report.targets = 2;
        report.candidates = 3;
        report.resolve_verdict(None);
        assert_eq!(report.verdict, RunVerdict::AllowlistTooStrict);

        report.validated_ok = 1;
        report.resolve_verdict(None);
        assert_eq!(report.verdict, RunVerdict::Blocked);

        report.snapshots = 1;
        report.resolve_verdict(None);
        assert_eq!(report.verdict, RunVerdict::Ok);

        report.catalog_added = 1;
        report.resolve_verdict(Some(3));
        assert_eq!(report.verdict, RunVerdict::LowValidated);
        report.resolve_verdict(Some(1));
        assert_eq!(report.verdict, RunVerdict::Ok);

        report.status = RunStatus::Skipped;
        report.resolve_verdict(None);
        assert_eq!(report.verdict, RunVerdict::NetworkDisabled);
    }

    #[test]
    fn outcome_progress() {
        let mut outcome = JurisdictionOutcome::new(code("BB"));
        assert!(!outcome.made_progress());
        outcome.url = Some("https://example.gov/".into());
        assert!(outcome.made_progress());
    }
}
