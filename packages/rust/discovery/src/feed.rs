//! The on-disk candidate feed cache.
//!
//! `sources/candidates.json` holds the most recent screened feed results per
//! jurisdiction. Refreshes merge per jurisdiction: a non-empty result list
//! replaces that jurisdiction's entry and everything else is left alone, so
//! one thin refresh never wipes candidates gathered earlier.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use lexhound_shared::{LexhoundError, Result};

/// `source` tag recorded on every feed candidate.
pub const FEED_SOURCE: &str = "wikidata";

/// One screened candidate from the feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedCandidate {
    pub url: String,
    /// Feed identifier, currently always [`FEED_SOURCE`].
    pub source: String,
    /// Property chain that produced the URL (`P856` or `P194`).
    pub prop: String,
    pub fetched_at: DateTime<Utc>,
}

/// The cache file: when it was last generated, and candidates per code.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateFeed {
    /// Absent until the first successful refresh.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub candidates: BTreeMap<String, Vec<FeedCandidate>>,
}

impl CandidateFeed {
    /// Load from disk; a missing file is an empty, stale feed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(?path, "candidate feed not found, starting empty");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| LexhoundError::io(path, e))?;
        serde_json::from_str(&content)
            .map_err(|e| LexhoundError::parse(format!("candidate feed {}: {e}", path.display())))
    }

    /// Write pretty JSON with a trailing newline.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| LexhoundError::io(parent, e))?;
        }
        let mut content = serde_json::to_string_pretty(self)
            .map_err(|e| LexhoundError::parse(format!("candidate feed serialize: {e}")))?;
        content.push('\n');
        std::fs::write(path, content).map_err(|e| LexhoundError::io(path, e))
    }

    /// A feed counts as fresh only when it has content and was generated
    /// within the freshness window.
    pub fn is_fresh(&self, now: DateTime<Utc>, freshness_hours: i64) -> bool {
        if self.candidates.is_empty() {
            return false;
        }
        self.generated_at.is_some_and(|generated| {
            now.signed_duration_since(generated) < chrono::Duration::hours(freshness_hours)
        })
    }

    /// Merge one jurisdiction's refresh results. An empty list leaves the
    /// existing entry in place. Returns whether an entry was set.
    pub fn merge(&mut self, code: &str, entries: Vec<FeedCandidate>) -> bool {
        if entries.is_empty() {
            return false;
        }
        self.candidates.insert(code.to_string(), entries);
        true
    }

    /// Candidate URLs on file for one jurisdiction, in stored order.
    pub fn urls_for(&self, code: &str) -> Vec<&str> {
        self.candidates
            .get(code)
            .map(|entries| entries.iter().map(|c| c.url.as_str()).collect())
            .unwrap_or_default()
    }
}
