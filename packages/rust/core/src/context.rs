//! Explicit run context.
//!
//! Everything a run can observe from the outside world — configuration, the
//! data directory layout, the transport, the clock, whether the network gate
//! is open — travels through a [`RunContext`] value. No module keeps its own
//! cache or reads ambient state, so a test can swap in a [`FixedClock`] and a
//! fixture transport and replay a whole run deterministically.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use lexhound_fetch::UrlFetcher;
use lexhound_shared::{AppConfig, DataDirs};

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Source of "now" for everything time-dependent in a run: snapshot day
/// partitions, feed freshness, ledger cooldowns, report timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock pinned to one instant, for tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

// ---------------------------------------------------------------------------
// RunContext
// ---------------------------------------------------------------------------

/// Shared state for one invocation of the pipeline.
#[derive(Clone)]
pub struct RunContext {
    pub config: AppConfig,
    pub dirs: DataDirs,
    pub fetcher: Arc<dyn UrlFetcher>,
    pub clock: Arc<dyn Clock>,
    /// When false the run performs zero network I/O and reports itself
    /// skipped.
    pub network: bool,
    /// UUIDv7 identifying this invocation in reports, snapshot metadata, and
    /// the attempt ledger.
    pub run_id: String,
}

impl RunContext {
    pub fn new(
        config: AppConfig,
        dirs: DataDirs,
        fetcher: Arc<dyn UrlFetcher>,
        network: bool,
    ) -> Self {
        Self {
            config,
            dirs,
            fetcher,
            clock: Arc::new(SystemClock),
            network,
            run_id: Uuid::now_v7().to_string(),
        }
    }

    /// Replace the clock (tests).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Per-request timeout from config.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.defaults.timeout_secs)
    }
}
