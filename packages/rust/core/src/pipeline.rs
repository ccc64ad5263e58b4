//! The run controller: one invocation end to end.
//!
//! A run moves every picked jurisdiction through the same state machine:
//! validate a candidate, capture a snapshot, commit the catalog, then hunt
//! for the actual law page. Orchestration concerns live here:
//!
//! - the network gate (off means zero network I/O and a skipped report)
//! - candidate-feed freshness, degrading to the cached feed on failure
//! - target selection per mode, honoring the ledger cooldown
//! - the scale-mode worker pool with post-join catalog merging
//! - catalog/registry persistence and the per-run report
//!
//! Stage failures are reason codes folded into the report; only environment
//! faults (disk, ledger) abort a run.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, instrument, warn};

use lexhound_catalog::registry::write_registry;
use lexhound_catalog::rules::trust_rules;
use lexhound_catalog::{Catalog, CatalogEntry, load_jurisdictions, load_seeds};
use lexhound_classify::LawPageClassifier;
use lexhound_crawl::{CrawlOrchestrator, CrawlRequest, LawPageResult};
use lexhound_discovery::{CandidateFeed, FeedOptions, candidate_set, refresh_feed};
use lexhound_fetch::{CaptureError, CaptureRequest, LiveValidator, RetryPolicy, SnapshotStore};
use lexhound_shared::{
    AppConfig, CrawlLimits, DataDirs, JurisdictionCode, JurisdictionOutcome, LexhoundError,
    Reason, ReportReason, Result, RunMode, RunReport, RunStatus, Snapshot, ValidationResult,
};
use lexhound_storage::{AttemptRecord, Ledger};
use lexhound_trust::TrustRules;

use crate::context::RunContext;
use crate::select::select_targets;

// ---------------------------------------------------------------------------
// Options & progress
// ---------------------------------------------------------------------------

/// What the caller asked this run to do.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub mode: RunMode,
    /// Explicit target; required by force mode, ignored elsewhere.
    pub jurisdiction: Option<JurisdictionCode>,
    /// Jurisdiction to write a crawl trace for.
    pub trace: Option<JurisdictionCode>,
}

/// Progress notifications for long-running runs.
///
/// Implementations must be cheap; calls happen inline with pipeline work.
pub trait RunProgress: Send + Sync {
    /// Called when a new run phase starts.
    fn phase(&self, message: &str);
    /// Called per jurisdiction (`position` of `total`).
    fn target(&self, code: &JurisdictionCode, position: usize, total: usize);
    /// Called once the run finished.
    fn done(&self, message: &str);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl RunProgress for SilentProgress {
    fn phase(&self, _message: &str) {}
    fn target(&self, _code: &JurisdictionCode, _position: usize, _total: usize) {}
    fn done(&self, _message: &str) {}
}

// ---------------------------------------------------------------------------
// Run entry point
// ---------------------------------------------------------------------------

/// Execute one run and return its report.
///
/// The report is also written to the report file, including for runs the
/// network gate skips.
#[instrument(skip_all, fields(run_id = %ctx.run_id, mode = %options.mode))]
pub async fn run(
    ctx: &RunContext,
    options: &RunOptions,
    progress: &dyn RunProgress,
) -> Result<RunReport> {
    let start = Instant::now();
    let mut report = RunReport::new(ctx.run_id.clone(), options.mode, ctx.now());

    if !ctx.network {
        warn!("network gate is off, skipping run");
        report.status = RunStatus::Skipped;
        if let Some(code) = &options.jurisdiction {
            report.push_reason(
                reason_cap(options.mode, &ctx.config),
                code.clone(),
                None,
                Reason::NetworkDisabled,
            );
        }
        return finalize(ctx, progress, report, None, start);
    }

    ctx.dirs.ensure()?;

    progress.phase("Loading catalog and rules");
    let universe = load_jurisdictions(&ctx.dirs.jurisdictions_file())?;
    let mut catalog = Catalog::load(&ctx.dirs.catalog_file())?;
    let rules = trust_rules(&ctx.dirs, &catalog)?;
    let seeds = load_seeds(&ctx.dirs.seeds_file())?;
    let ledger = Ledger::open(&ctx.dirs.ledger_file(&ctx.config)).await?;

    let missing = match (options.mode, &options.jurisdiction) {
        (RunMode::Force, Some(code)) => vec![code.clone()],
        (RunMode::Force, None) => {
            return Err(LexhoundError::validation(
                "force mode requires a jurisdiction",
            ));
        }
        _ => catalog.missing_official(&universe),
    };

    // Candidate feed: reuse the cache while fresh, refresh otherwise, and
    // fall back to whatever was cached when the refresh fails.
    progress.phase("Refreshing candidate feed");
    let mut feed = CandidateFeed::load(&ctx.dirs.candidates_file())?;
    if !feed.is_fresh(ctx.now(), ctx.config.discovery.freshness_hours) {
        let opts = FeedOptions::from_config(
            &ctx.config.discovery,
            ctx.timeout(),
            options.mode == RunMode::Scale,
        );
        match refresh_feed(
            ctx.fetcher.as_ref(),
            &ctx.dirs,
            &rules,
            &missing,
            &opts,
            ctx.now(),
        )
        .await
        {
            Ok(refresh) => {
                report.discovered = refresh.kept;
                feed = refresh.feed;
            }
            Err(e) => warn!(error = %e, "feed refresh failed, using cached candidates"),
        }
    }

    progress.phase("Selecting targets");
    let cooled = match options.mode {
        RunMode::Force => BTreeSet::new(),
        _ => {
            ledger
                .cooled_down(ctx.now(), ctx.config.ledger.cooldown_hours)
                .await?
        }
    };
    let targets = select_targets(
        options.mode,
        options.jurisdiction.as_ref(),
        &ctx.config.run,
        &catalog,
        &universe,
        &cooled,
    );
    report.targets = targets.len();
    if targets.is_empty() {
        info!(cooling = cooled.len(), "no eligible targets");
        return finalize(ctx, progress, report, quota(options.mode, &ctx.config), start);
    }

    progress.phase("Processing targets");
    let runner = Arc::new(TargetRunner {
        ctx: ctx.clone(),
        rules,
        feed,
        seeds,
        store: SnapshotStore::new(&ctx.dirs, &ctx.config),
        classifier: LawPageClassifier::new(&ctx.dirs, &ctx.config),
        validator: LiveValidator::new(ctx.timeout()),
        policy: RetryPolicy::from_config(&ctx.config),
        trace: options.trace.clone(),
    });
    let cap = reason_cap(options.mode, &ctx.config);

    match options.mode {
        RunMode::Scale => {
            run_pool(ctx, &mut catalog, runner, &targets, &ledger, &mut report, cap, progress)
                .await?;
        }
        _ => {
            run_sequential(
                ctx,
                options.mode,
                &mut catalog,
                runner,
                &targets,
                &ledger,
                &mut report,
                cap,
                progress,
            )
            .await?;
        }
    }

    finalize(ctx, progress, report, quota(options.mode, &ctx.config), start)
}

/// Force gets the tight failure list; the bulk modes get the longer one.
fn reason_cap(mode: RunMode, config: &AppConfig) -> usize {
    match mode {
        RunMode::Force => config.run.reason_cap,
        RunMode::MinSources | RunMode::Scale => config.run.reason_cap_bulk,
    }
}

/// The per-run success quota, where the mode has one.
fn quota(mode: RunMode, config: &AppConfig) -> Option<usize> {
    match mode {
        RunMode::MinSources => Some(config.run.success_quota),
        _ => None,
    }
}

fn finalize(
    ctx: &RunContext,
    progress: &dyn RunProgress,
    mut report: RunReport,
    quota: Option<usize>,
    start: Instant,
) -> Result<RunReport> {
    report.finished_at = ctx.now();
    report.resolve_verdict(quota);
    write_report(&ctx.dirs, &report)?;

    info!(
        status = ?report.status,
        verdict = ?report.verdict,
        targets = report.targets,
        validated_ok = report.validated_ok,
        snapshots = report.snapshots,
        law_pages = report.law_pages,
        catalog_added = report.catalog_added,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "run finished"
    );
    progress.done(&format!(
        "{} targets, {} validated, {} snapshots, {} law pages",
        report.targets, report.validated_ok, report.snapshots, report.law_pages
    ));
    Ok(report)
}

fn write_report(dirs: &DataDirs, report: &RunReport) -> Result<()> {
    let path = dirs.report_file();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| LexhoundError::io(parent, e))?;
    }
    let mut content = serde_json::to_string_pretty(report)
        .map_err(|e| LexhoundError::parse(format!("run report serialize: {e}")))?;
    content.push('\n');
    std::fs::write(&path, content).map_err(|e| LexhoundError::io(&path, e))
}

// ---------------------------------------------------------------------------
// Sequential & pooled execution
// ---------------------------------------------------------------------------

#[allow(clippy::too_many_arguments)]
async fn run_sequential(
    ctx: &RunContext,
    mode: RunMode,
    catalog: &mut Catalog,
    runner: Arc<TargetRunner>,
    targets: &[JurisdictionCode],
    ledger: &Ledger,
    report: &mut RunReport,
    cap: usize,
    progress: &dyn RunProgress,
) -> Result<()> {
    let quota = quota(mode, &ctx.config);
    let mut successes = 0usize;

    for (position, code) in targets.iter().enumerate() {
        if quota.is_some_and(|q| successes >= q) {
            info!(successes, "success quota reached, stopping early");
            break;
        }
        progress.target(code, position + 1, targets.len());

        let entry = catalog.entry(code).cloned();
        let target = runner.process(code, entry.as_ref()).await?;
        let TargetOutcome {
            mut outcome,
            commit,
            candidates,
            failures,
        } = target;

        report.candidates += candidates;
        for failure in failures {
            report.push_reason(cap, failure.jurisdiction, failure.url, failure.reason);
        }

        if let Some(url) = &commit {
            if catalog.commit_official(code, url) {
                outcome.catalog_added = true;
                successes += 1;
                catalog.save(&ctx.dirs.catalog_file())?;
                write_registry(&ctx.dirs.registry_file(), catalog, ctx.now())?;
                report.catalog_written = true;
            }
        }

        ledger.record_attempt(&attempt_for(ctx, &outcome)).await?;
        report.absorb(outcome);
    }
    Ok(())
}

/// Scale mode: workers pull jurisdictions from a shared queue and push
/// outcomes back over a channel. Workers never touch the catalog; commits
/// are merged (and persisted once) only after every worker has finished.
#[allow(clippy::too_many_arguments)]
async fn run_pool(
    ctx: &RunContext,
    catalog: &mut Catalog,
    runner: Arc<TargetRunner>,
    targets: &[JurisdictionCode],
    ledger: &Ledger,
    report: &mut RunReport,
    cap: usize,
    progress: &dyn RunProgress,
) -> Result<()> {
    let queue: Arc<Mutex<VecDeque<(JurisdictionCode, Option<CatalogEntry>)>>> =
        Arc::new(Mutex::new(
            targets
                .iter()
                .map(|code| (code.clone(), catalog.entry(code).cloned()))
                .collect(),
        ));
    let (tx, mut rx) = mpsc::channel::<Result<TargetOutcome>>(targets.len());

    let workers = ctx.config.defaults.workers.max(1);
    info!(workers, targets = targets.len(), "starting worker pool");
    let mut handles = Vec::with_capacity(workers);
    for _ in 0..workers {
        let queue = Arc::clone(&queue);
        let runner = Arc::clone(&runner);
        let tx = tx.clone();
        handles.push(tokio::spawn(async move {
            loop {
                let item = queue.lock().await.pop_front();
                let Some((code, entry)) = item else { break };
                let result = runner.process(&code, entry.as_ref()).await;
                if tx.send(result).await.is_err() {
                    break;
                }
            }
        }));
    }
    drop(tx);

    let total = targets.len();
    let mut outcomes: Vec<TargetOutcome> = Vec::with_capacity(total);
    let mut first_error: Option<LexhoundError> = None;
    while let Some(result) = rx.recv().await {
        match result {
            Ok(target) => {
                progress.target(&target.outcome.jurisdiction, outcomes.len() + 1, total);
                outcomes.push(target);
            }
            Err(e) => {
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
    }
    for handle in handles {
        if let Err(e) = handle.await {
            warn!(error = %e, "worker task failed");
        }
    }
    if let Some(e) = first_error {
        return Err(e);
    }

    // Merge in jurisdiction order so the report and the catalog come out
    // deterministic regardless of completion order.
    outcomes.sort_by(|a, b| a.outcome.jurisdiction.cmp(&b.outcome.jurisdiction));

    let mut changed = 0usize;
    for target in &mut outcomes {
        if let Some(url) = &target.commit {
            if catalog.commit_official(&target.outcome.jurisdiction, url) {
                target.outcome.catalog_added = true;
                changed += 1;
            }
        }
    }
    if changed > 0 {
        catalog.save(&ctx.dirs.catalog_file())?;
        write_registry(&ctx.dirs.registry_file(), catalog, ctx.now())?;
        report.catalog_written = true;
    }

    for target in outcomes {
        let TargetOutcome {
            outcome,
            candidates,
            failures,
            ..
        } = target;
        report.candidates += candidates;
        for failure in failures {
            report.push_reason(cap, failure.jurisdiction, failure.url, failure.reason);
        }
        ledger.record_attempt(&attempt_for(ctx, &outcome)).await?;
        report.absorb(outcome);
    }
    Ok(())
}

fn attempt_for(ctx: &RunContext, outcome: &JurisdictionOutcome) -> AttemptRecord {
    AttemptRecord {
        run_id: ctx.run_id.clone(),
        jurisdiction: outcome.jurisdiction.clone(),
        validated: u32::from(outcome.url.is_some()),
        snapshots: u32::from(outcome.snapshot_path.is_some()),
        law_pages: u32::from(outcome.law_page_url.is_some()),
        catalog_commits: u32::from(outcome.catalog_added),
        attempted_at: ctx.now(),
    }
}

// ---------------------------------------------------------------------------
// Per-target pipeline
// ---------------------------------------------------------------------------

/// Everything a single-target pass needs, bundled so scale workers can share
/// one instance behind an `Arc`.
struct TargetRunner {
    ctx: RunContext,
    rules: TrustRules,
    feed: CandidateFeed,
    seeds: BTreeMap<String, Vec<String>>,
    store: SnapshotStore,
    classifier: LawPageClassifier,
    validator: LiveValidator,
    policy: RetryPolicy,
    trace: Option<JurisdictionCode>,
}

/// What one jurisdiction pass produced, before catalog and ledger
/// bookkeeping.
struct TargetOutcome {
    outcome: JurisdictionOutcome,
    /// Validated final URL to enter the catalog.
    commit: Option<String>,
    /// Candidate URLs considered.
    candidates: usize,
    /// Failures worth surfacing in the bounded report list.
    failures: Vec<ReportReason>,
}

impl TargetRunner {
    /// Walk one jurisdiction's candidates: validate, capture, then hunt for
    /// the law page behind the first candidate that survives both.
    ///
    /// A candidate that validates but refuses capture keeps its validated
    /// details in the outcome while the walk moves on. Only environment
    /// faults return an error.
    #[instrument(skip_all, fields(jurisdiction = %code))]
    async fn process(
        &self,
        code: &JurisdictionCode,
        entry: Option<&CatalogEntry>,
    ) -> Result<TargetOutcome> {
        let mut outcome = JurisdictionOutcome::new(code.clone());
        let mut failures: Vec<ReportReason> = Vec::new();

        let candidates = candidate_set(code, entry, &self.feed, &self.rules);
        if candidates.is_empty() {
            debug!("no candidates on file or in the feed");
            outcome.reason = Some(Reason::NoCandidates);
            failures.push(ReportReason {
                jurisdiction: code.clone(),
                url: None,
                reason: Reason::NoCandidates,
            });
            return Ok(TargetOutcome {
                outcome,
                commit: None,
                candidates: 0,
                failures,
            });
        }
        let candidate_count = candidates.len();
        let fetcher = self.ctx.fetcher.as_ref();

        let mut commit = None;
        for candidate in &candidates {
            let validation = self.validate(&candidate.url, code).await;
            if !validation.ok {
                let reason = validation.reason.unwrap_or(Reason::FetchFailed);
                debug!(url = %candidate.url, reason = %reason, "candidate failed validation");
                failures.push(ReportReason {
                    jurisdiction: code.clone(),
                    url: Some(candidate.url.clone()),
                    reason,
                });
                continue;
            }
            let final_url = validation
                .final_url
                .clone()
                .unwrap_or_else(|| candidate.url.clone());

            // The first validated candidate fixes the validated fields even
            // if its capture fails below.
            if outcome.url.is_none() {
                outcome.url = Some(candidate.url.clone());
                outcome.final_url = Some(final_url.clone());
                outcome.http_status = validation.http_status;
            }

            let req = CaptureRequest {
                jurisdiction: code,
                url: &final_url,
                now: self.ctx.now(),
                timeout: self.ctx.timeout(),
                run_id: &self.ctx.run_id,
            };
            let snapshot = match self.policy.run(|_| self.store.capture(fetcher, &req)).await {
                Ok(snapshot) => snapshot,
                Err(CaptureError::Rejected(failure)) => {
                    warn!(url = %final_url, reason = %failure.reason, "validated candidate refused capture");
                    failures.push(ReportReason {
                        jurisdiction: code.clone(),
                        url: Some(final_url.clone()),
                        reason: failure.reason,
                    });
                    continue;
                }
                Err(CaptureError::Fault(e)) => return Err(e),
            };

            outcome.url = Some(candidate.url.clone());
            outcome.final_url = Some(final_url.clone());
            outcome.http_status = validation.http_status;
            outcome.content_hash = Some(snapshot.content_hash.clone());
            outcome.snapshot_path = Some(snapshot.storage_path.clone());
            commit = Some(final_url.clone());

            let law = self.discover_law_page(code, &final_url, &snapshot).await;
            if law.ok {
                outcome.law_page_url = law.url;
                outcome.law_page_snapshot_path = law.snapshot_path;
            } else {
                outcome.law_page_reason = law.reason;
            }
            break;
        }

        if outcome.url.is_none() {
            outcome.reason = failures.last().map(|f| f.reason);
        }

        Ok(TargetOutcome {
            outcome,
            commit,
            candidates: candidate_count,
            failures,
        })
    }

    /// Live validation through the shared retry policy. Transient failures
    /// retry with backoff; everything else settles on the first answer.
    async fn validate(&self, url: &str, code: &JurisdictionCode) -> ValidationResult {
        let fetcher = self.ctx.fetcher.as_ref();
        let checked = self
            .policy
            .run(|_| async move {
                let result = self.validator.check(fetcher, url, code, &self.rules).await;
                match result.reason {
                    Some(reason) if reason.is_transient() => Err(reason),
                    _ => Ok(result),
                }
            })
            .await;
        match checked {
            Ok(result) => result,
            Err(reason) => ValidationResult::fail(reason),
        }
    }

    async fn discover_law_page(
        &self,
        code: &JurisdictionCode,
        base_url: &str,
        base: &Snapshot,
    ) -> LawPageResult {
        let seeds = self
            .seeds
            .get(code.as_str())
            .map(Vec::as_slice)
            .unwrap_or_default();
        let orchestrator = CrawlOrchestrator::new(
            self.ctx.fetcher.as_ref(),
            &self.store,
            &self.classifier,
            self.policy,
            CrawlLimits::from(&self.ctx.config),
            self.ctx.dirs.clone(),
        );
        orchestrator
            .discover(&CrawlRequest {
                jurisdiction: code,
                base_url,
                base_snapshot: base,
                seeds,
                now: self.ctx.now(),
                timeout: self.ctx.timeout(),
                run_id: &self.ctx.run_id,
                trace: self.trace.as_ref().is_some_and(|traced| traced == code),
            })
            .await
    }
}
