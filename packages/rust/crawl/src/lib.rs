//! Crawl orchestration: from a validated landing page to an actual law page.
//!
//! The cheap path wins: the base snapshot is classified first and most
//! jurisdictions stop there. Otherwise the orchestrator extracts same-host
//! links, scores them, and scans a prioritized list under a hard page budget:
//!
//! 1. derived legal entry points (justice/legislation/gazette keywords)
//! 2. operator-provided seed URLs
//! 3. scored candidates, highest first
//!
//! Pages that fetch but do not classify contribute their own links to a
//! bounded fallback pool, which gets exactly one additional scan pass. The
//! whole walk is observational beyond its outcome: an optional trace file
//! records what was seen without ever influencing pass/fail.

pub mod links;
pub mod score;
pub mod trace;

use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use lexhound_classify::{LawCheck, LawPageClassifier};
use lexhound_fetch::{CaptureError, CaptureRequest, RetryPolicy, SnapshotStore, UrlFetcher};
use lexhound_shared::config::{CrawlLimits, DataDirs};
use lexhound_shared::html;
use lexhound_shared::types::{JurisdictionCode, Reason, Snapshot};
use serde::Serialize;
use tracing::{debug, instrument, warn};

use links::{detect_lang, detect_spa, extract_same_host_links, LinkRef};
use score::{score_law_candidate, vote_on_candidate, CandidateVote, ScoredLink};
use trace::CrawlTrace;

/// Candidate list cap when scoring the base page's links.
const BASE_CANDIDATE_LIMIT: usize = 40;
/// Candidate cap per nested page feeding the fallback pool.
const NESTED_CANDIDATE_LIMIT: usize = 20;
/// Characters of visible text handed to the vote heuristic.
const SNIPPET_LEN: usize = 2000;
const ENTRYPOINT_SCORE: i32 = 6;
const SEED_SCORE: i32 = 8;

const ENTRYPOINT_KEYWORDS: &[&str] = &[
    "justice",
    "legislation",
    "gazette",
    "parliament",
    "assembly",
    "senate",
    "ministry",
    "health",
    "drug",
    "narcotic",
];

// ----------------------------------------------------------------------------
// Result types
// ----------------------------------------------------------------------------

/// A link promoted to the front of the scan order because its URL or anchor
/// text names a legal institution.
#[derive(Debug, Clone, Serialize)]
pub struct Entrypoint {
    pub from: String,
    pub to: String,
    pub why: String,
}

/// Outcome of one law-page discovery walk.
#[derive(Debug, Clone, Serialize)]
pub struct LawPageResult {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<Reason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
    pub score: i32,
    pub law_marker: bool,
    pub drug_marker: bool,
    pub structure_hits: usize,
    pub ocr_ran: bool,
    pub entrypoints: Vec<Entrypoint>,
    pub candidates: Vec<ScoredLink>,
    pub votes: Vec<CandidateVote>,
    pub pages_scanned: usize,
}

impl LawPageResult {
    fn not_found(reason: Reason) -> Self {
        Self {
            ok: false,
            reason: Some(reason),
            url: None,
            snapshot_path: None,
            content_hash: None,
            score: 0,
            law_marker: false,
            drug_marker: false,
            structure_hits: 0,
            ocr_ran: false,
            entrypoints: Vec::new(),
            candidates: Vec::new(),
            votes: Vec::new(),
            pages_scanned: 0,
        }
    }
}

struct CrawlHit {
    url: String,
    score: i32,
    snapshot: Snapshot,
    check: LawCheck,
}

// ----------------------------------------------------------------------------
// Priority list
// ----------------------------------------------------------------------------

/// Explicit merge of the three scan tiers. Insertion order is the scan
/// order; a URL keeps its first (highest-priority) appearance.
#[derive(Default)]
pub struct PriorityListBuilder {
    items: Vec<ScoredLink>,
    seen: HashSet<String>,
}

impl PriorityListBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, url: &str, text: &str, score: i32) {
        if url.trim().is_empty() || !self.seen.insert(url.to_string()) {
            return;
        }
        self.items.push(ScoredLink {
            url: url.to_string(),
            text: text.to_string(),
            score,
        });
    }

    pub fn entrypoints(mut self, entries: &[Entrypoint]) -> Self {
        for entry in entries {
            self.push(&entry.to, &entry.why, ENTRYPOINT_SCORE);
        }
        self
    }

    pub fn seeds(mut self, seeds: &[String]) -> Self {
        for seed in seeds {
            self.push(seed, "seed", SEED_SCORE);
        }
        self
    }

    pub fn scored(mut self, candidates: &[ScoredLink]) -> Self {
        for candidate in candidates {
            self.push(&candidate.url, &candidate.text, candidate.score);
        }
        self
    }

    pub fn build(self) -> Vec<ScoredLink> {
        self.items
    }
}

/// Entry points are the first links worth following off a generic portal:
/// anything naming a legal or health institution, capped, first keyword wins.
pub fn derive_entrypoints(links: &[LinkRef], base_url: &str, cap: usize) -> Vec<Entrypoint> {
    let mut results = Vec::new();
    for link in links {
        if results.len() >= cap {
            break;
        }
        let target = format!("{} {}", link.url, link.text).to_lowercase();
        let Some(keyword) = ENTRYPOINT_KEYWORDS.iter().find(|k| target.contains(*k)) else {
            continue;
        };
        results.push(Entrypoint {
            from: base_url.to_string(),
            to: link.url.clone(),
            why: format!("keyword:{keyword}"),
        });
    }
    results
}

fn collect_candidates(links: &[LinkRef], limit: usize) -> Vec<ScoredLink> {
    let mut scored: Vec<ScoredLink> = links
        .iter()
        .map(|link| ScoredLink {
            url: link.url.clone(),
            text: link.text.clone(),
            score: score_law_candidate(&link.url, &link.text),
        })
        .filter(|link| link.score >= 0)
        .collect();
    scored.sort_by(|a, b| b.score.cmp(&a.score));
    scored.truncate(limit);
    scored
}

// ----------------------------------------------------------------------------
// Orchestrator
// ----------------------------------------------------------------------------

/// All the inputs for one discovery walk. The base snapshot must already
/// exist; validating and capturing the landing page is the caller's job.
#[derive(Debug, Clone)]
pub struct CrawlRequest<'a> {
    pub jurisdiction: &'a JurisdictionCode,
    pub base_url: &'a str,
    pub base_snapshot: &'a Snapshot,
    pub seeds: &'a [String],
    pub now: DateTime<Utc>,
    pub timeout: Duration,
    pub run_id: &'a str,
    pub trace: bool,
}

pub struct CrawlOrchestrator<'a> {
    fetcher: &'a dyn UrlFetcher,
    store: &'a SnapshotStore,
    classifier: &'a LawPageClassifier,
    policy: RetryPolicy,
    limits: CrawlLimits,
    dirs: DataDirs,
}

struct ScanState {
    scanned: usize,
    votes: Vec<CandidateVote>,
    fallback: Vec<ScoredLink>,
    seen: HashSet<String>,
}

impl ScanState {
    fn new(candidates: &[ScoredLink]) -> Self {
        Self {
            scanned: 0,
            votes: Vec::new(),
            fallback: Vec::new(),
            seen: candidates.iter().map(|c| c.url.clone()).collect(),
        }
    }
}

impl<'a> CrawlOrchestrator<'a> {
    pub fn new(
        fetcher: &'a dyn UrlFetcher,
        store: &'a SnapshotStore,
        classifier: &'a LawPageClassifier,
        policy: RetryPolicy,
        limits: CrawlLimits,
        dirs: DataDirs,
    ) -> Self {
        Self {
            fetcher,
            store,
            classifier,
            policy,
            limits,
            dirs,
        }
    }

    /// Walks from the captured landing page to the first page that classifies
    /// as law. Never fails hard: fetch and disk problems skip the candidate
    /// and the walk continues until the budget runs out.
    #[instrument(skip_all, fields(jurisdiction = %req.jurisdiction, base_url = req.base_url))]
    pub async fn discover(&self, req: &CrawlRequest<'_>) -> LawPageResult {
        let base_probe = self
            .classifier
            .classify(&req.base_snapshot.storage_path, req.base_url);
        let is_html = req.base_snapshot.storage_path.ends_with(".html");
        let base_html = if is_html {
            self.read_snapshot(&req.base_snapshot.storage_path)
        } else {
            String::new()
        };
        let links = if base_html.is_empty() {
            Vec::new()
        } else {
            extract_same_host_links(&base_html, req.base_url, self.limits.allow_subdomains)
        };

        let mut crawl_trace = req.trace.then(|| {
            let scored: Vec<ScoredLink> = links
                .iter()
                .map(|link| ScoredLink {
                    url: link.url.clone(),
                    text: link.text.clone(),
                    score: score_law_candidate(&link.url, &link.text),
                })
                .collect();
            CrawlTrace {
                jurisdiction: req.jurisdiction.as_str().to_string(),
                start_url: req.base_url.to_string(),
                final_url: req.base_snapshot.final_url.clone(),
                content_type: req.base_snapshot.content_type.clone(),
                detected_lang: detect_lang(&base_html),
                is_spa: detect_spa(&base_html),
                found_links_count: 0,
                top_links: Vec::new(),
                pages_scanned: 0,
            }
            .with_links(scored)
        });
        if let Some(t) = &crawl_trace {
            t.write(&self.dirs.traces());
        }

        if base_probe.ok {
            return LawPageResult {
                ok: true,
                reason: None,
                url: Some(req.base_url.to_string()),
                snapshot_path: Some(req.base_snapshot.storage_path.clone()),
                content_hash: Some(req.base_snapshot.content_hash.clone()),
                score: 0,
                law_marker: base_probe.law_marker,
                drug_marker: base_probe.drug_marker,
                structure_hits: base_probe.structure_hits,
                ocr_ran: base_probe.ocr_ran,
                ..LawPageResult::not_found(Reason::NoLawPage)
            };
        }
        if !is_html {
            return LawPageResult::not_found(base_probe.reason.unwrap_or(Reason::NoLawPage));
        }
        if base_html.is_empty() {
            return LawPageResult::not_found(Reason::EmptyBody);
        }

        let entrypoints = derive_entrypoints(&links, req.base_url, self.limits.entrypoint_cap);
        let candidates = collect_candidates(&links, BASE_CANDIDATE_LIMIT);
        debug!(
            links = links.len(),
            entrypoints = entrypoints.len(),
            candidates = candidates.len(),
            "base page did not classify, scanning links"
        );

        let mut scan_list = PriorityListBuilder::new()
            .entrypoints(&entrypoints)
            .seeds(req.seeds)
            .scored(&candidates)
            .build();
        scan_list.truncate(self.limits.scan_limit);

        let mut state = ScanState::new(&candidates);
        if let Some(hit) = self.scan(req, &scan_list, &mut state, true).await {
            self.finish_trace(&mut crawl_trace, state.scanned);
            return Self::found(hit, entrypoints, candidates, state);
        }

        let mut fallback = std::mem::take(&mut state.fallback);
        fallback.sort_by(|a, b| b.score.cmp(&a.score));
        fallback.truncate(self.limits.fallback_limit);
        if let Some(hit) = self.scan(req, &fallback, &mut state, false).await {
            self.finish_trace(&mut crawl_trace, state.scanned);
            return Self::found(hit, entrypoints, candidates, state);
        }

        self.finish_trace(&mut crawl_trace, state.scanned);
        LawPageResult {
            entrypoints,
            candidates,
            votes: state.votes,
            pages_scanned: state.scanned,
            ..LawPageResult::not_found(Reason::NoLawPage)
        }
    }

    async fn scan(
        &self,
        req: &CrawlRequest<'_>,
        list: &[ScoredLink],
        state: &mut ScanState,
        collect_nested: bool,
    ) -> Option<CrawlHit> {
        for candidate in list {
            if !candidate.url.starts_with("https://") {
                continue;
            }
            if state.scanned >= self.limits.max_pages {
                break;
            }
            let capture_req = CaptureRequest {
                jurisdiction: req.jurisdiction,
                url: &candidate.url,
                now: req.now,
                timeout: req.timeout,
                run_id: req.run_id,
            };
            let outcome = self
                .policy
                .run(|_| self.store.capture(self.fetcher, &capture_req))
                .await;
            state.scanned += 1;
            let snapshot = match outcome {
                Ok(snapshot) => snapshot,
                Err(CaptureError::Rejected(failure)) => {
                    debug!(url = %candidate.url, reason = %failure.reason, "candidate fetch rejected");
                    continue;
                }
                Err(CaptureError::Fault(e)) => {
                    warn!(url = %candidate.url, error = %e, "snapshot fault during crawl");
                    continue;
                }
            };

            let candidate_html = if snapshot.storage_path.ends_with(".html") {
                self.read_snapshot(&snapshot.storage_path)
            } else {
                String::new()
            };
            let title = html::extract_title(&candidate_html).unwrap_or_default();
            let snippet: String = html::visible_text(&candidate_html)
                .chars()
                .take(SNIPPET_LEN)
                .collect();
            state
                .votes
                .push(vote_on_candidate(&candidate.url, &title, &snippet));

            let probe = self.classifier.classify(&snapshot.storage_path, &candidate.url);
            if probe.ok {
                return Some(CrawlHit {
                    url: candidate.url.clone(),
                    score: candidate.score,
                    snapshot,
                    check: probe,
                });
            }

            if collect_nested && !candidate_html.is_empty() {
                let nested_links = extract_same_host_links(
                    &candidate_html,
                    &candidate.url,
                    self.limits.allow_subdomains,
                );
                for item in collect_candidates(&nested_links, NESTED_CANDIDATE_LIMIT) {
                    if state.fallback.len() >= self.limits.nested_cap {
                        break;
                    }
                    if !state.seen.insert(item.url.clone()) {
                        continue;
                    }
                    state.fallback.push(item);
                }
            }
        }
        None
    }

    fn found(
        hit: CrawlHit,
        entrypoints: Vec<Entrypoint>,
        candidates: Vec<ScoredLink>,
        state: ScanState,
    ) -> LawPageResult {
        LawPageResult {
            ok: true,
            reason: None,
            url: Some(hit.url),
            snapshot_path: Some(hit.snapshot.storage_path),
            content_hash: Some(hit.snapshot.content_hash),
            score: hit.score,
            law_marker: hit.check.law_marker,
            drug_marker: hit.check.drug_marker,
            structure_hits: hit.check.structure_hits,
            ocr_ran: hit.check.ocr_ran,
            entrypoints,
            candidates,
            votes: state.votes,
            pages_scanned: state.scanned,
        }
    }

    fn finish_trace(&self, crawl_trace: &mut Option<CrawlTrace>, scanned: usize) {
        if let Some(t) = crawl_trace {
            t.pages_scanned = scanned;
            t.write(&self.dirs.traces());
        }
    }

    fn read_snapshot(&self, storage_path: &str) -> String {
        match std::fs::read(self.dirs.root().join(storage_path)) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(_) => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexhound_fetch::{FixtureFetcher, FixtureResponse};
    use lexhound_shared::config::AppConfig;
    use std::path::PathBuf;
    use uuid::Uuid;

    const FILLER: &str = "Municipal services directory with opening hours and \
contact information for local offices across the administrative districts. ";

    fn law_page_html() -> String {
        format!(
            "<html lang=\"en\"><head><title>Act No. 15 on Narcotic Substances</title></head>\
<body><h1>Act No. 15 on Narcotic Substances</h1>\
<p>Article 1. Cultivation and possession of cannabis is prohibited.</p>\
<p>Section 4. The ministry of health issues licences.</p>\
<p>Published in the Official Gazette no. 120, entered into force 1 March 2020.</p>\
<p>{}</p></body></html>",
            FILLER.repeat(8)
        )
    }

    fn portal_html(links: &str) -> String {
        format!(
            "<html lang=\"en\"><head><title>Government of Alandia</title></head>\
<body>{links}<p>{}</p></body></html>",
            FILLER.repeat(8)
        )
    }

    struct CrawlFixture {
        root: PathBuf,
        dirs: DataDirs,
        config: AppConfig,
        store: SnapshotStore,
        classifier: LawPageClassifier,
        code: JurisdictionCode,
    }

    impl CrawlFixture {
        fn new() -> Self {
            let root = std::env::temp_dir().join(format!("lexhound-crawl-{}", Uuid::now_v7()));
            let dirs = DataDirs::new(&root);
            let config = AppConfig::default();
            let store = SnapshotStore::new(&dirs, &config);
            let classifier = LawPageClassifier::new(&dirs, &config);
            Self {
                root,
                dirs,
                config,
                store,
                classifier,
                code: JurisdictionCode::new("AA").expect("code"),
            }
        }

        fn orchestrator<'a>(&'a self, fetcher: &'a FixtureFetcher) -> CrawlOrchestrator<'a> {
            CrawlOrchestrator::new(
                fetcher,
                &self.store,
                &self.classifier,
                RetryPolicy::none(),
                CrawlLimits::from(&self.config),
                self.dirs.clone(),
            )
        }

        async fn capture_base(&self, fetcher: &FixtureFetcher, url: &str) -> Snapshot {
            self.store
                .capture(
                    fetcher,
                    &CaptureRequest {
                        jurisdiction: &self.code,
                        url,
                        now: Utc::now(),
                        timeout: Duration::from_secs(2),
                        run_id: "crawl-test",
                    },
                )
                .await
                .expect("base capture")
        }

        fn request<'a>(
            &'a self,
            base_url: &'a str,
            base_snapshot: &'a Snapshot,
            seeds: &'a [String],
            trace: bool,
        ) -> CrawlRequest<'a> {
            CrawlRequest {
                jurisdiction: &self.code,
                base_url,
                base_snapshot,
                seeds,
                now: Utc::now(),
                timeout: Duration::from_secs(2),
                run_id: "crawl-test",
                trace,
            }
        }
    }

    impl Drop for CrawlFixture {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.root);
        }
    }

    #[test]
    fn builder_merges_tiers_in_order_and_dedupes() {
        let entrypoints = vec![Entrypoint {
            from: "https://www.example.gov/".to_string(),
            to: "https://www.example.gov/legislation".to_string(),
            why: "keyword:legislation".to_string(),
        }];
        let seeds = vec!["https://www.example.gov/seeded".to_string()];
        let candidates = vec![
            ScoredLink {
                url: "https://www.example.gov/legislation".to_string(),
                text: "Legislation".to_string(),
                score: 2,
            },
            ScoredLink {
                url: "https://www.example.gov/laws/narcotics".to_string(),
                text: "Narcotics law".to_string(),
                score: 9,
            },
        ];
        let list = PriorityListBuilder::new()
            .entrypoints(&entrypoints)
            .seeds(&seeds)
            .scored(&candidates)
            .build();

        let urls: Vec<&str> = list.iter().map(|l| l.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://www.example.gov/legislation",
                "https://www.example.gov/seeded",
                "https://www.example.gov/laws/narcotics",
            ]
        );
        assert_eq!(list[0].score, ENTRYPOINT_SCORE, "entrypoint tier wins the dupe");
        assert_eq!(list[1].score, SEED_SCORE);
    }

    #[test]
    fn entrypoints_use_the_first_matching_keyword() {
        let links = vec![
            LinkRef {
                url: "https://www.example.gov/ministry-of-justice".to_string(),
                text: "Ministry of Justice".to_string(),
            },
            LinkRef {
                url: "https://www.example.gov/weather".to_string(),
                text: "Weather".to_string(),
            },
        ];
        let entrypoints = derive_entrypoints(&links, "https://www.example.gov/", 10);
        assert_eq!(entrypoints.len(), 1);
        assert_eq!(entrypoints[0].why, "keyword:justice");
        assert_eq!(entrypoints[0].from, "https://www.example.gov/");
    }

    #[tokio::test]
    async fn base_page_that_classifies_ends_the_walk_immediately() {
        let fx = CrawlFixture::new();
        let fetcher = FixtureFetcher::new()
            .route("https://www.example.gov/laws/15", FixtureResponse::html(&law_page_html()));
        let base = fx.capture_base(&fetcher, "https://www.example.gov/laws/15").await;

        let result = fx
            .orchestrator(&fetcher)
            .discover(&fx.request("https://www.example.gov/laws/15", &base, &[], false))
            .await;

        assert!(result.ok);
        assert_eq!(result.pages_scanned, 0);
        assert_eq!(result.url.as_deref(), Some("https://www.example.gov/laws/15"));
        assert!(result.candidates.is_empty());
        assert!(result.law_marker);
        assert!(result.structure_hits >= 2);
    }

    #[tokio::test]
    async fn portal_walk_finds_the_law_page_behind_an_entrypoint() {
        let fx = CrawlFixture::new();
        let portal = portal_html(
            r#"<a href="/legislation">Legislation</a>
<a href="/ministry-of-justice">Ministry of Justice</a>
<a href="/tourism">Visit Alandia</a>"#,
        );
        let fetcher = FixtureFetcher::new()
            .route("https://www.example.gov/", FixtureResponse::html(&portal))
            .route(
                "https://www.example.gov/legislation",
                FixtureResponse::html(&law_page_html()),
            );
        let base = fx.capture_base(&fetcher, "https://www.example.gov/").await;

        let result = fx
            .orchestrator(&fetcher)
            .discover(&fx.request("https://www.example.gov/", &base, &[], false))
            .await;

        assert!(result.ok, "reason: {:?}", result.reason);
        assert_eq!(result.url.as_deref(), Some("https://www.example.gov/legislation"));
        assert_eq!(result.pages_scanned, 1);
        assert_eq!(result.score, ENTRYPOINT_SCORE);
        assert_eq!(result.entrypoints.len(), 2);
        assert_eq!(result.votes.len(), 1);
        assert!(result.votes[0].likely);
    }

    #[tokio::test]
    async fn seeds_are_scanned_before_scored_candidates() {
        let fx = CrawlFixture::new();
        let portal = portal_html(r#"<a href="/acts/overview">Acts overview</a>"#);
        let fetcher = FixtureFetcher::new()
            .route("https://www.example.gov/", FixtureResponse::html(&portal))
            .route(
                "https://www.example.gov/seeded-law",
                FixtureResponse::html(&law_page_html()),
            );
        let base = fx.capture_base(&fetcher, "https://www.example.gov/").await;
        let seeds = vec!["https://www.example.gov/seeded-law".to_string()];

        let result = fx
            .orchestrator(&fetcher)
            .discover(&fx.request("https://www.example.gov/", &base, &seeds, false))
            .await;

        assert!(result.ok, "reason: {:?}", result.reason);
        assert_eq!(result.url.as_deref(), Some("https://www.example.gov/seeded-law"));
        assert_eq!(result.score, SEED_SCORE);
        assert_eq!(result.pages_scanned, 1, "seed tried before the scored link");
    }

    #[tokio::test]
    async fn nested_fallback_reaches_pages_two_hops_away() {
        let fx = CrawlFixture::new();
        let portal = portal_html(r#"<a href="/legislation">Legislation</a>"#);
        let listing = portal_html(
            r#"<a href="/legislation/acts/narcotics-act-15">Narcotics Act No. 15</a>"#,
        );
        let fetcher = FixtureFetcher::new()
            .route("https://www.example.gov/", FixtureResponse::html(&portal))
            .route("https://www.example.gov/legislation", FixtureResponse::html(&listing))
            .route(
                "https://www.example.gov/legislation/acts/narcotics-act-15",
                FixtureResponse::html(&law_page_html()),
            );
        let base = fx.capture_base(&fetcher, "https://www.example.gov/").await;

        let result = fx
            .orchestrator(&fetcher)
            .discover(&fx.request("https://www.example.gov/", &base, &[], false))
            .await;

        assert!(result.ok, "reason: {:?}", result.reason);
        assert_eq!(
            result.url.as_deref(),
            Some("https://www.example.gov/legislation/acts/narcotics-act-15")
        );
        assert_eq!(result.pages_scanned, 2);
        assert_eq!(result.votes.len(), 2);
    }

    #[tokio::test]
    async fn page_budget_bounds_the_walk() {
        let fx = CrawlFixture::new();
        let portal = portal_html(
            r#"<a href="/laws/one">Law one</a>
<a href="/laws/two">Law two</a>"#,
        );
        let not_law = portal_html("");
        let fetcher = FixtureFetcher::new()
            .route("https://www.example.gov/", FixtureResponse::html(&portal))
            .route("https://www.example.gov/laws/one", FixtureResponse::html(&not_law))
            .route("https://www.example.gov/laws/two", FixtureResponse::html(&not_law));
        let base = fx.capture_base(&fetcher, "https://www.example.gov/").await;

        let mut limits = CrawlLimits::from(&fx.config);
        limits.max_pages = 1;
        let orchestrator = CrawlOrchestrator::new(
            &fetcher,
            &fx.store,
            &fx.classifier,
            RetryPolicy::none(),
            limits,
            fx.dirs.clone(),
        );

        let result = orchestrator
            .discover(&fx.request("https://www.example.gov/", &base, &[], false))
            .await;

        assert!(!result.ok);
        assert_eq!(result.reason, Some(Reason::NoLawPage));
        assert_eq!(result.pages_scanned, 1);
    }

    #[tokio::test]
    async fn no_qualifying_page_reports_no_law_page_with_evidence() {
        let fx = CrawlFixture::new();
        let portal = portal_html(r#"<a href="/legislation">Legislation</a>"#);
        let dead_end = portal_html(r#"<a href="/tourism">Visit</a>"#);
        let fetcher = FixtureFetcher::new()
            .route("https://www.example.gov/", FixtureResponse::html(&portal))
            .route("https://www.example.gov/legislation", FixtureResponse::html(&dead_end));
        let base = fx.capture_base(&fetcher, "https://www.example.gov/").await;

        let result = fx
            .orchestrator(&fetcher)
            .discover(&fx.request("https://www.example.gov/", &base, &[], true))
            .await;

        assert!(!result.ok);
        assert_eq!(result.reason, Some(Reason::NoLawPage));
        assert_eq!(result.pages_scanned, 1);
        assert!(!result.candidates.is_empty());

        let trace_raw = std::fs::read_to_string(fx.dirs.traces().join("aa_trace.json"))
            .expect("trace written");
        let trace: CrawlTrace = serde_json::from_str(&trace_raw).expect("trace parses");
        assert_eq!(trace.pages_scanned, 1);
        assert!(!trace.top_links.is_empty());
        assert_eq!(trace.detected_lang.as_deref(), Some("en"));
    }
}
