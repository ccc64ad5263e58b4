//! Per-jurisdiction crawl diagnostics.
//!
//! When a run asks for tracing, the orchestrator writes one JSON file per
//! jurisdiction describing what the crawl saw: link inventory with scores,
//! SPA fingerprint, detected language, pages scanned. Purely observational;
//! a missing or failed trace never changes the crawl outcome.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::score::ScoredLink;

const TOP_LINKS: usize = 20;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlTrace {
    pub jurisdiction: String,
    pub start_url: String,
    pub final_url: String,
    pub content_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detected_lang: Option<String>,
    pub is_spa: bool,
    pub found_links_count: usize,
    pub top_links: Vec<ScoredLink>,
    pub pages_scanned: usize,
}

impl CrawlTrace {
    /// Keeps the highest-scoring links, rejected ones included, so a trace
    /// shows why nothing was scanned.
    pub fn with_links(mut self, mut scored: Vec<ScoredLink>) -> Self {
        self.found_links_count = scored.len();
        scored.sort_by(|a, b| b.score.cmp(&a.score));
        scored.truncate(TOP_LINKS);
        self.top_links = scored;
        self
    }

    pub fn file_name(jurisdiction: &str) -> String {
        format!("{}_trace.json", jurisdiction.to_lowercase())
    }

    pub fn path_in(&self, traces_dir: &Path) -> PathBuf {
        traces_dir.join(Self::file_name(&self.jurisdiction))
    }

    /// Best-effort write; failures are logged and swallowed.
    pub fn write(&self, traces_dir: &Path) {
        if let Err(e) = self.try_write(traces_dir) {
            warn!(jurisdiction = %self.jurisdiction, error = %e, "failed to write crawl trace");
        }
    }

    fn try_write(&self, traces_dir: &Path) -> std::io::Result<()> {
        std::fs::create_dir_all(traces_dir)?;
        let rendered = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(self.path_in(traces_dir), rendered + "\n")
    }
}
