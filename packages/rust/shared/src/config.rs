//! Application configuration for lexhound.
//!
//! User config lives at `~/.lexhound/lexhound.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{LexhoundError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "lexhound.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".lexhound";

// ---------------------------------------------------------------------------
// Config structs (matching lexhound.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Run-controller knobs.
    #[serde(default)]
    pub run: RunConfig,

    /// Crawl-orchestrator knobs.
    #[serde(default)]
    pub crawl: CrawlConfig,

    /// Snapshot minimum-payload policy.
    #[serde(default)]
    pub snapshot: SnapshotConfig,

    /// Candidate discovery feed settings.
    #[serde(default)]
    pub discovery: DiscoveryConfig,

    /// Attempt-ledger settings.
    #[serde(default)]
    pub ledger: LedgerConfig,

    /// Optional OCR command for PDFs without extracted text.
    #[serde(default)]
    pub ocr: OcrConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Data directory holding catalog, snapshots, reports, ledger.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Max retries for transient fetch failures.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base backoff delay in milliseconds (doubles per attempt).
    #[serde(default = "default_retry_base_ms")]
    pub retry_base_ms: u64,

    /// Worker count for scale mode.
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            retry_base_ms: default_retry_base_ms(),
            workers: default_workers(),
        }
    }
}

fn default_data_dir() -> String {
    "data".into()
}
fn default_timeout_secs() -> u64 {
    12
}
fn default_max_retries() -> u32 {
    2
}
fn default_retry_base_ms() -> u64 {
    300
}
fn default_workers() -> usize {
    8
}

/// `[run]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Successes (catalog commits) per min-sources run before stopping.
    #[serde(default = "default_success_quota")]
    pub success_quota: usize,

    /// Attempt cap per min-sources run.
    #[serde(default = "default_max_tries")]
    pub max_tries: usize,

    /// Target-list bound for scale mode.
    #[serde(default = "default_max_targets")]
    pub max_targets: usize,

    /// Bounded failure-list size.
    #[serde(default = "default_reason_cap")]
    pub reason_cap: usize,

    /// Bounded failure-list size in bulk modes (min-sources/scale).
    #[serde(default = "default_reason_cap_bulk")]
    pub reason_cap_bulk: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            success_quota: default_success_quota(),
            max_tries: default_max_tries(),
            max_targets: default_max_targets(),
            reason_cap: default_reason_cap(),
            reason_cap_bulk: default_reason_cap_bulk(),
        }
    }
}

fn default_success_quota() -> usize {
    3
}
fn default_max_tries() -> usize {
    25
}
fn default_max_targets() -> usize {
    120
}
fn default_reason_cap() -> usize {
    5
}
fn default_reason_cap_bulk() -> usize {
    10
}

/// `[crawl]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    /// Overall fetched-page budget per jurisdiction.
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    /// How many prioritized links the primary pass scans.
    #[serde(default = "default_scan_limit")]
    pub scan_limit: usize,

    /// How many pooled links the single nested expansion scans.
    #[serde(default = "default_fallback_limit")]
    pub fallback_limit: usize,

    /// Cap on the nested-candidate pool.
    #[serde(default = "default_nested_cap")]
    pub nested_cap: usize,

    /// Cap on derived entry points.
    #[serde(default = "default_entrypoint_cap")]
    pub entrypoint_cap: usize,

    /// Treat sibling subdomains of the base host as same-host.
    #[serde(default = "default_true")]
    pub allow_subdomains: bool,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_pages: default_max_pages(),
            scan_limit: default_scan_limit(),
            fallback_limit: default_fallback_limit(),
            nested_cap: default_nested_cap(),
            entrypoint_cap: default_entrypoint_cap(),
            allow_subdomains: true,
        }
    }
}

fn default_max_pages() -> usize {
    25
}
fn default_scan_limit() -> usize {
    10
}
fn default_fallback_limit() -> usize {
    10
}
fn default_nested_cap() -> usize {
    40
}
fn default_entrypoint_cap() -> usize {
    10
}
fn default_true() -> bool {
    true
}

/// `[snapshot]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotConfig {
    /// Byte floor below which a capture is considered a placeholder.
    #[serde(default = "default_min_bytes")]
    pub min_bytes: u64,

    /// De-tagged visible-text floor that lets small HTML pages through.
    #[serde(default = "default_min_text_len")]
    pub min_text_len: usize,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            min_bytes: default_min_bytes(),
            min_text_len: default_min_text_len(),
        }
    }
}

fn default_min_bytes() -> u64 {
    4096
}
fn default_min_text_len() -> usize {
    500
}

/// `[discovery]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// SPARQL endpoint for the structured-data candidate feed.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// How long a cached feed stays fresh.
    #[serde(default = "default_freshness_hours")]
    pub freshness_hours: i64,

    /// Jurisdiction cap per refresh.
    #[serde(default = "default_discovery_limit")]
    pub limit: usize,

    /// Jurisdiction cap per refresh in scale mode.
    #[serde(default = "default_discovery_bulk_limit")]
    pub bulk_limit: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            freshness_hours: default_freshness_hours(),
            limit: default_discovery_limit(),
            bulk_limit: default_discovery_bulk_limit(),
        }
    }
}

fn default_endpoint() -> String {
    "https://query.wikidata.org/sparql".into()
}
fn default_freshness_hours() -> i64 {
    6
}
fn default_discovery_limit() -> usize {
    60
}
fn default_discovery_bulk_limit() -> usize {
    200
}

/// `[ledger]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Database file name under the data directory.
    #[serde(default = "default_ledger_file")]
    pub file: String,

    /// Zero-progress jurisdictions are skipped for this long.
    #[serde(default = "default_cooldown_hours")]
    pub cooldown_hours: i64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            file: default_ledger_file(),
            cooldown_hours: default_cooldown_hours(),
        }
    }
}

fn default_ledger_file() -> String {
    "ledger.db".into()
}
fn default_cooldown_hours() -> i64 {
    6
}

/// `[ocr]` section. The command is invoked as `<command> <pdf> <txt>` and
/// must write extracted text to the second argument.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrConfig {
    /// OCR command; PDFs without a text sidecar stay unreadable when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    /// Seconds before the OCR subprocess is given up on.
    #[serde(default = "default_ocr_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            command: None,
            timeout_secs: default_ocr_timeout_secs(),
        }
    }
}

fn default_ocr_timeout_secs() -> u64 {
    120
}

// ---------------------------------------------------------------------------
// Crawl limits (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime view of the crawl budgets, detached from the serde config so the
/// orchestrator does not carry the whole `AppConfig` around.
#[derive(Debug, Clone)]
pub struct CrawlLimits {
    pub max_pages: usize,
    pub scan_limit: usize,
    pub fallback_limit: usize,
    pub nested_cap: usize,
    pub entrypoint_cap: usize,
    pub allow_subdomains: bool,
}

impl From<&AppConfig> for CrawlLimits {
    fn from(config: &AppConfig) -> Self {
        Self {
            max_pages: config.crawl.max_pages,
            scan_limit: config.crawl.scan_limit,
            fallback_limit: config.crawl.fallback_limit,
            nested_cap: config.crawl.nested_cap,
            entrypoint_cap: config.crawl.entrypoint_cap,
            allow_subdomains: config.crawl.allow_subdomains,
        }
    }
}

// ---------------------------------------------------------------------------
// Data directory layout
// ---------------------------------------------------------------------------

/// Explicit view of the data directory; every component receives this
/// instead of deriving paths on its own.
#[derive(Debug, Clone)]
pub struct DataDirs {
    root: PathBuf,
}

impl DataDirs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn sources(&self) -> PathBuf {
        self.root.join("sources")
    }

    pub fn snapshots(&self) -> PathBuf {
        self.root.join("snapshots")
    }

    pub fn reports(&self) -> PathBuf {
        self.root.join("reports")
    }

    pub fn traces(&self) -> PathBuf {
        self.root.join("traces")
    }

    pub fn catalog_file(&self) -> PathBuf {
        self.sources().join("official_catalog.json")
    }

    pub fn allowlist_file(&self) -> PathBuf {
        self.sources().join("allowlist.json")
    }

    pub fn denylist_file(&self) -> PathBuf {
        self.sources().join("denylist.json")
    }

    pub fn seeds_file(&self) -> PathBuf {
        self.sources().join("seeds.json")
    }

    pub fn candidates_file(&self) -> PathBuf {
        self.sources().join("candidates.json")
    }

    pub fn jurisdictions_file(&self) -> PathBuf {
        self.root.join("jurisdictions.json")
    }

    pub fn registry_file(&self) -> PathBuf {
        self.root.join("sources_registry.json")
    }

    pub fn report_file(&self) -> PathBuf {
        self.reports().join("last_run.json")
    }

    pub fn candidates_report_file(&self) -> PathBuf {
        self.reports().join("candidates.json")
    }

    pub fn ledger_file(&self, config: &AppConfig) -> PathBuf {
        self.root.join(&config.ledger.file)
    }

    /// Create the directory skeleton; idempotent.
    pub fn ensure(&self) -> Result<()> {
        for dir in [
            self.root.clone(),
            self.sources(),
            self.snapshots(),
            self.reports(),
            self.traces(),
        ] {
            std::fs::create_dir_all(&dir).map_err(|e| LexhoundError::io(&dir, e))?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.lexhound/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| LexhoundError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.lexhound/lexhound.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| LexhoundError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| LexhoundError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| LexhoundError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| LexhoundError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| LexhoundError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
