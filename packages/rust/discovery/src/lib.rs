//! Candidate discovery: the structured-data feed and candidate assembly.
//!
//! Jurisdictions with no official source on file get their starting URLs
//! from two places: whatever the catalog and config already carry, and a
//! bulk structured-data query (Wikidata) mapping ISO 3166-1 codes to
//! official-website claims. Feed results are screened (HTTPS plus the deny
//! side of the trust rules — no allow rule applies, since the feed exists
//! for jurisdictions the allow tables do not cover yet), cached in
//! `sources/candidates.json`, and merged with registry data into one
//! ordered candidate list per jurisdiction.

mod feed;
mod sparql;

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, instrument};
use url::Url;

use lexhound_catalog::CatalogEntry;
use lexhound_fetch::UrlFetcher;
use lexhound_shared::{
    CandidateUrl, DataDirs, DiscoveryConfig, JurisdictionCode, LexhoundError, OriginKind, Reason,
    Result,
};
use lexhound_trust::TrustRules;

pub use feed::{CandidateFeed, FEED_SOURCE, FeedCandidate};
pub use sparql::{PROP_LEGISLATURE, PROP_OFFICIAL_WEBSITE, query_url};

/// Default per-request timeout for feed refreshes, in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 12;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Knobs for one feed refresh.
#[derive(Debug, Clone)]
pub struct FeedOptions {
    /// SPARQL endpoint the bulk query goes to.
    pub endpoint: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Jurisdiction cap for this refresh.
    pub limit: usize,
}

impl FeedOptions {
    /// Derive options from config; `bulk` picks the scale-mode cap.
    pub fn from_config(config: &DiscoveryConfig, timeout: Duration, bulk: bool) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            timeout,
            limit: if bulk { config.bulk_limit } else { config.limit },
        }
    }
}

impl Default for FeedOptions {
    fn default() -> Self {
        Self::from_config(
            &DiscoveryConfig::default(),
            Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            false,
        )
    }
}

// ---------------------------------------------------------------------------
// Feed refresh
// ---------------------------------------------------------------------------

/// Outcome of one refresh: the merged feed plus counters for logs/reports.
#[derive(Debug)]
pub struct FeedRefresh {
    pub feed: CandidateFeed,
    /// Jurisdictions that received a candidate list this refresh.
    pub candidates_added: usize,
    /// Candidate URLs kept after screening.
    pub kept: usize,
    /// Candidate URLs dropped by screening.
    pub rejected: usize,
}

/// Report row for a screened-out candidate.
#[derive(Debug, Serialize)]
struct RejectedCandidate {
    code: String,
    url: String,
    reason: Reason,
}

/// Flattened report row for a kept candidate.
#[derive(Debug, Serialize)]
struct ReportCandidate<'a> {
    code: &'a str,
    url: &'a str,
    prop: &'a str,
}

/// Debug report written to `reports/candidates.json` after every refresh.
#[derive(Debug, Serialize)]
struct FeedReport<'a> {
    generated_at: DateTime<Utc>,
    iso_total: usize,
    candidates_added: usize,
    kept: usize,
    candidates: Vec<ReportCandidate<'a>>,
    rejected: &'a [RejectedCandidate],
}

/// Refresh the candidate feed for `missing` jurisdictions (capped at
/// `opts.limit`), merge the results into the on-disk cache, and write the
/// flattened debug report.
///
/// Any error leaves the cached feed untouched, so callers can degrade to
/// whatever was on disk before.
#[instrument(skip_all, fields(missing = missing.len(), limit = opts.limit))]
pub async fn refresh_feed(
    fetcher: &dyn UrlFetcher,
    dirs: &DataDirs,
    rules: &TrustRules,
    missing: &[JurisdictionCode],
    opts: &FeedOptions,
    now: DateTime<Utc>,
) -> Result<FeedRefresh> {
    let wanted: BTreeSet<&str> = missing
        .iter()
        .take(opts.limit)
        .map(JurisdictionCode::as_str)
        .collect();

    let url = sparql::query_url(&opts.endpoint);
    debug!(endpoint = %opts.endpoint, "querying candidate feed");
    let response = fetcher
        .get(&url, opts.timeout)
        .await
        .map_err(|reason| LexhoundError::Network(format!("candidate feed: {}", reason.code())))?;
    if !response.is_success() {
        return Err(LexhoundError::Network(format!(
            "candidate feed: HTTP {}",
            response.status
        )));
    }

    let rows = sparql::parse_website_rows(&response.body)?;

    // Group and screen, keeping only the jurisdictions asked about.
    let mut screened: BTreeMap<String, Vec<FeedCandidate>> = BTreeMap::new();
    let mut rejected: Vec<RejectedCandidate> = Vec::new();
    for row in rows {
        if !wanted.contains(row.code.as_str()) {
            continue;
        }
        match screen_candidate(&row.url, rules) {
            Ok(()) => {
                let entries = screened.entry(row.code).or_default();
                if entries.iter().any(|c| c.url == row.url) {
                    continue;
                }
                entries.push(FeedCandidate {
                    url: row.url,
                    source: FEED_SOURCE.to_string(),
                    prop: row.prop.to_string(),
                    fetched_at: now,
                });
            }
            Err(reason) => rejected.push(RejectedCandidate {
                code: row.code,
                url: row.url,
                reason,
            }),
        }
    }

    // Every screened list is non-empty by construction.
    let candidates_added = screened.len();
    let kept: usize = screened.values().map(Vec::len).sum();

    let mut feed = CandidateFeed::load(&dirs.candidates_file())?;
    for (code, entries) in &screened {
        feed.merge(code, entries.clone());
    }
    feed.generated_at = Some(now);
    feed.save(&dirs.candidates_file())?;

    let report = FeedReport {
        generated_at: now,
        iso_total: missing.len(),
        candidates_added,
        kept,
        candidates: screened
            .iter()
            .flat_map(|(code, entries)| {
                entries.iter().map(move |entry| ReportCandidate {
                    code,
                    url: &entry.url,
                    prop: &entry.prop,
                })
            })
            .collect(),
        rejected: &rejected,
    };
    write_report(&dirs.candidates_report_file(), &report)?;

    info!(
        candidates_added,
        kept,
        rejected = rejected.len(),
        "candidate feed refreshed"
    );

    Ok(FeedRefresh {
        feed,
        candidates_added,
        kept,
        rejected: rejected.len(),
    })
}

/// HTTPS plus deny-side screening for one feed URL.
fn screen_candidate(raw: &str, rules: &TrustRules) -> std::result::Result<(), Reason> {
    let Ok(parsed) = Url::parse(raw.trim()) else {
        return Err(Reason::InvalidUrl);
    };
    if parsed.scheme() != "https" {
        return Err(Reason::HttpsRequired);
    }
    let Some(host) = parsed.host_str() else {
        return Err(Reason::MissingHost);
    };
    if let Some(reason) = lexhound_trust::deny_reason(&host.to_ascii_lowercase(), "", rules) {
        return Err(reason);
    }
    Ok(())
}

fn write_report<T: Serialize>(path: &Path, report: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| LexhoundError::io(parent, e))?;
    }
    let mut content = serde_json::to_string_pretty(report)
        .map_err(|e| LexhoundError::parse(format!("feed report serialize: {e}")))?;
    content.push('\n');
    std::fs::write(path, content).map_err(|e| LexhoundError::io(path, e))
}

// ---------------------------------------------------------------------------
// Candidate assembly
// ---------------------------------------------------------------------------

/// Build the ordered candidate list for one jurisdiction.
///
/// Merge order decides scan priority: catalog candidates, then feed URLs,
/// then configured allow-domains synthesized as origins, then known portals.
/// First occurrence of a URL wins and keeps its origin. Allow-domains are
/// operator-curated, so they carry [`OriginKind::Registry`] rather than
/// counting as discoveries.
pub fn candidate_set(
    code: &JurisdictionCode,
    entry: Option<&CatalogEntry>,
    feed: &CandidateFeed,
    rules: &TrustRules,
) -> Vec<CandidateUrl> {
    let mut out = Vec::new();
    let mut seen = BTreeSet::new();

    if let Some(entry) = entry {
        for url in &entry.candidates {
            push_unique(&mut out, &mut seen, url, OriginKind::Registry);
        }
    }

    for url in feed.urls_for(code.as_str()) {
        push_unique(&mut out, &mut seen, url, OriginKind::ExternalProperty);
    }

    if let Some(domains) = rules.allow_domains.get(code.as_str()) {
        for domain in domains {
            let host = domain.trim().trim_start_matches("*.");
            if host.is_empty() {
                continue;
            }
            push_unique(
                &mut out,
                &mut seen,
                &format!("https://{host}/"),
                OriginKind::Registry,
            );
        }
    }

    if let Some(entry) = entry {
        for url in &entry.portals {
            push_unique(&mut out, &mut seen, url, OriginKind::CatalogPortal);
        }
    }

    out
}

fn push_unique(
    out: &mut Vec<CandidateUrl>,
    seen: &mut BTreeSet<String>,
    url: &str,
    origin: OriginKind,
) {
    let url = url.trim();
    if url.is_empty() || !seen.insert(url.to_string()) {
        return;
    }
    out.push(CandidateUrl::new(url, origin));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use lexhound_fetch::{FixtureFetcher, FixtureResponse, HttpFetcher};

    fn code(s: &str) -> JurisdictionCode {
        JurisdictionCode::new(s).expect("code")
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 0).unwrap()
    }

    fn temp_root(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("lexhound-discovery-{}-{name}", uuid::Uuid::now_v7()))
    }

    fn fixture_body() -> Vec<u8> {
        std::fs::read("../../../fixtures/sparql/websites.json").expect("read sparql fixture")
    }

    fn sparql_response(body: Vec<u8>) -> FixtureResponse {
        FixtureResponse {
            status: 200,
            content_type: Some("application/sparql-results+json".to_string()),
            body,
            redirect_to: None,
        }
    }

    #[test]
    fn screening_rules() {
        let rules = TrustRules {
            deny_hosts: vec!["example.org".to_string()],
            ..Default::default()
        };
        assert!(screen_candidate("https://www.example.gov/", &rules).is_ok());
        assert_eq!(
            screen_candidate("http://www.example.gov/", &rules),
            Err(Reason::HttpsRequired)
        );
        assert_eq!(
            screen_candidate("https://blog.example.gov/", &rules),
            Err(Reason::DeniedSubstring)
        );
        assert_eq!(
            screen_candidate("https://sub.example.org/", &rules),
            Err(Reason::DeniedHost)
        );
        assert_eq!(screen_candidate("not a url", &rules), Err(Reason::InvalidUrl));
    }

    #[tokio::test]
    async fn refresh_screens_and_caches() {
        let root = temp_root("refresh");
        let dirs = DataDirs::new(&root);
        let endpoint = "https://sparql.test/sparql";
        let fetcher =
            FixtureFetcher::new().route(&query_url(endpoint), sparql_response(fixture_body()));
        let opts = FeedOptions {
            endpoint: endpoint.to_string(),
            timeout: Duration::from_secs(2),
            limit: 60,
        };
        let missing = [code("AA"), code("BB")];

        let refresh = refresh_feed(
            &fetcher,
            &dirs,
            &TrustRules::default(),
            &missing,
            &opts,
            fixed_now(),
        )
        .await
        .expect("refresh");

        // AA keeps both sites; BB's candidates are http/blog and drop out.
        assert_eq!(refresh.candidates_added, 1);
        assert_eq!(refresh.kept, 2);
        assert_eq!(refresh.rejected, 2);
        assert!(refresh.feed.is_fresh(fixed_now(), 6));
        assert_eq!(
            refresh.feed.urls_for("AA"),
            vec![
                "https://www.example.gov/",
                "https://parliament.example.gov/"
            ]
        );
        assert!(refresh.feed.urls_for("BB").is_empty());

        let cached = CandidateFeed::load(&dirs.candidates_file()).expect("load cache");
        assert_eq!(cached, refresh.feed);

        let report = std::fs::read_to_string(dirs.candidates_report_file()).expect("report");
        assert!(report.contains("\"HTTPS_REQUIRED\""));
        assert!(report.contains("\"DENIED_SUBSTRING\""));
        assert!(report.contains("\"P194\""));

        std::fs::remove_dir_all(&root).ok();
    }

    #[tokio::test]
    async fn refresh_honors_jurisdiction_cap() {
        let root = temp_root("cap");
        let dirs = DataDirs::new(&root);
        let endpoint = "https://sparql.test/sparql";
        let fetcher =
            FixtureFetcher::new().route(&query_url(endpoint), sparql_response(fixture_body()));
        let opts = FeedOptions {
            endpoint: endpoint.to_string(),
            timeout: Duration::from_secs(2),
            limit: 1,
        };
        let missing = [code("AA"), code("BB")];

        let refresh = refresh_feed(
            &fetcher,
            &dirs,
            &TrustRules::default(),
            &missing,
            &opts,
            fixed_now(),
        )
        .await
        .expect("refresh");

        // BB fell outside the cap, so its rows were never even screened.
        assert_eq!(refresh.kept, 2);
        assert_eq!(refresh.rejected, 0);
        assert!(refresh.feed.urls_for("BB").is_empty());

        std::fs::remove_dir_all(&root).ok();
    }

    #[tokio::test]
    async fn refresh_failure_leaves_cache_untouched() {
        let root = temp_root("degrade");
        let dirs = DataDirs::new(&root);

        let mut seeded = CandidateFeed::default();
        seeded.generated_at = Some(fixed_now() - chrono::Duration::hours(30));
        seeded.merge(
            "AA",
            vec![FeedCandidate {
                url: "https://stale.example.gov/".to_string(),
                source: FEED_SOURCE.to_string(),
                prop: PROP_OFFICIAL_WEBSITE.to_string(),
                fetched_at: fixed_now() - chrono::Duration::hours(30),
            }],
        );
        seeded.save(&dirs.candidates_file()).expect("seed cache");

        let endpoint = "https://sparql.test/sparql";
        let fetcher =
            FixtureFetcher::new().route(&query_url(endpoint), FixtureResponse::status(503));
        let opts = FeedOptions {
            endpoint: endpoint.to_string(),
            timeout: Duration::from_secs(2),
            limit: 60,
        };
        let missing = [code("AA")];

        let result = refresh_feed(
            &fetcher,
            &dirs,
            &TrustRules::default(),
            &missing,
            &opts,
            fixed_now(),
        )
        .await;
        assert!(result.is_err());

        let cached = CandidateFeed::load(&dirs.candidates_file()).expect("load cache");
        assert_eq!(cached, seeded);

        std::fs::remove_dir_all(&root).ok();
    }

    #[tokio::test]
    async fn refresh_against_mock_endpoint() {
        let server = wiremock::MockServer::start().await;
        let body = String::from_utf8(fixture_body()).expect("utf8 fixture");

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/sparql"))
            .and(wiremock::matchers::query_param("format", "json"))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .insert_header("content-type", "application/sparql-results+json")
                    .set_body_string(&body),
            )
            .mount(&server)
            .await;

        let root = temp_root("wiremock");
        let dirs = DataDirs::new(&root);
        let fetcher = HttpFetcher::new().expect("client");
        let opts = FeedOptions {
            endpoint: format!("{}/sparql", server.uri()),
            timeout: Duration::from_secs(5),
            limit: 60,
        };
        let missing = [code("AA")];

        let refresh = refresh_feed(
            &fetcher,
            &dirs,
            &TrustRules::default(),
            &missing,
            &opts,
            Utc::now(),
        )
        .await
        .expect("refresh");
        assert_eq!(refresh.kept, 2);

        std::fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn candidate_set_merges_in_priority_order() {
        let entry = CatalogEntry {
            candidates: std::collections::BTreeSet::from(["https://a.example.gov/".to_string()]),
            portals: std::collections::BTreeSet::from(["https://portal.example.gov/".to_string()]),
            ..Default::default()
        };

        let mut feed = CandidateFeed::default();
        feed.merge(
            "AA",
            vec![
                FeedCandidate {
                    url: "https://feed.example.gov/".to_string(),
                    source: FEED_SOURCE.to_string(),
                    prop: PROP_OFFICIAL_WEBSITE.to_string(),
                    fetched_at: fixed_now(),
                },
                // Already on file as a registry candidate; must not repeat.
                FeedCandidate {
                    url: "https://a.example.gov/".to_string(),
                    source: FEED_SOURCE.to_string(),
                    prop: PROP_OFFICIAL_WEBSITE.to_string(),
                    fetched_at: fixed_now(),
                },
            ],
        );

        let mut rules = TrustRules::default();
        rules
            .allow_domains
            .insert("AA".to_string(), vec!["*.example.ad".to_string()]);

        let set = candidate_set(&code("AA"), Some(&entry), &feed, &rules);
        let urls: Vec<&str> = set.iter().map(|c| c.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://a.example.gov/",
                "https://feed.example.gov/",
                "https://example.ad/",
                "https://portal.example.gov/",
            ]
        );
        assert_eq!(set[0].origin, OriginKind::Registry);
        assert_eq!(set[1].origin, OriginKind::ExternalProperty);
        assert_eq!(set[2].origin, OriginKind::Registry);
        assert_eq!(set[3].origin, OriginKind::CatalogPortal);
    }

    #[test]
    fn candidate_set_empty_without_any_source() {
        let set = candidate_set(
            &code("ZZ"),
            None,
            &CandidateFeed::default(),
            &TrustRules::default(),
        );
        assert!(set.is_empty());
    }
}
