//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use lexhound_catalog::rules::trust_rules;
use lexhound_catalog::{Catalog, load_jurisdictions};
use lexhound_classify::LawPageClassifier;
use lexhound_core::context::RunContext;
use lexhound_core::pipeline::{self, RunOptions, RunProgress};
use lexhound_discovery::{FeedOptions, refresh_feed};
use lexhound_fetch::{HttpFetcher, LiveValidator};
use lexhound_shared::{
    AppConfig, DataDirs, JurisdictionCode, RunMode, RunStatus, init_config, load_config,
    load_config_from,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Lexhound: find, validate, and snapshot official drug-law sources.
#[derive(Parser)]
#[command(
    name = "lexhound",
    version,
    about = "Find, validate, and snapshot official drug-law sources per jurisdiction.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Data directory override.
    #[arg(long, global = true, value_name = "PATH")]
    pub data_dir: Option<String>,

    /// Explicit config file path.
    #[arg(long = "config", global = true, value_name = "PATH")]
    pub config_file: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Execute a discovery and validation run.
    Run {
        /// Force-process one jurisdiction regardless of catalog state.
        #[arg(short, long, value_name = "CODE", conflicts_with = "mode")]
        jurisdiction: Option<String>,

        /// Batch mode for working the backlog.
        #[arg(short, long, default_value = "min-sources")]
        mode: BatchMode,

        /// Skip all network I/O and record the run as skipped.
        #[arg(long)]
        offline: bool,

        /// Override the per-run success quota.
        #[arg(long, value_name = "N")]
        quota: Option<usize>,

        /// Override the scale-mode worker count.
        #[arg(long, value_name = "N")]
        workers: Option<usize>,

        /// Write a crawl trace for this jurisdiction.
        #[arg(long, value_name = "CODE")]
        trace: Option<String>,
    },

    /// Refresh the external candidate feed for missing jurisdictions.
    Discover {
        /// Cap the number of jurisdictions queried.
        #[arg(long, value_name = "N")]
        limit: Option<usize>,
    },

    /// Live-validate a single URL against the trust rules.
    Check {
        /// URL to validate.
        url: String,

        /// Jurisdiction the URL is claimed for.
        #[arg(short, long, value_name = "CODE")]
        jurisdiction: String,
    },

    /// Classify a captured snapshot file as law page or not.
    Classify {
        /// Path to the snapshot file.
        path: String,

        /// URL the snapshot was captured from.
        #[arg(long)]
        url: String,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Batch modes selectable from the CLI.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub(crate) enum BatchMode {
    /// Work jurisdictions lacking an official source until the quota.
    MinSources,
    /// Fan the backlog out to the worker pool.
    Scale,
}

impl From<BatchMode> for RunMode {
    fn from(mode: BatchMode) -> Self {
        match mode {
            BatchMode::MinSources => RunMode::MinSources,
            BatchMode::Scale => RunMode::Scale,
        }
    }
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "lexhound=info",
        1 => "lexhound=debug",
        _ => "lexhound=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Global flags every subcommand resolves its config through.
struct Globals {
    config_file: Option<String>,
    data_dir: Option<String>,
}

impl Globals {
    fn load_config(&self) -> Result<AppConfig> {
        let mut config = match &self.config_file {
            Some(path) => load_config_from(Path::new(path))?,
            None => load_config()?,
        };
        if let Some(dir) = &self.data_dir {
            config.defaults.data_dir = dir.clone();
        }
        Ok(config)
    }
}

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let globals = Globals {
        config_file: cli.config_file.clone(),
        data_dir: cli.data_dir.clone(),
    };
    match cli.command {
        Command::Run {
            jurisdiction,
            mode,
            offline,
            quota,
            workers,
            trace,
        } => {
            cmd_run(
                &globals,
                jurisdiction.as_deref(),
                mode,
                offline,
                quota,
                workers,
                trace.as_deref(),
            )
            .await
        }
        Command::Discover { limit } => cmd_discover(&globals, limit).await,
        Command::Check { url, jurisdiction } => cmd_check(&globals, &url, &jurisdiction).await,
        Command::Classify { path, url } => cmd_classify(&globals, &path, &url).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(&globals).await,
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

#[allow(clippy::too_many_arguments)]
async fn cmd_run(
    globals: &Globals,
    jurisdiction: Option<&str>,
    mode: BatchMode,
    offline: bool,
    quota: Option<usize>,
    workers: Option<usize>,
    trace: Option<&str>,
) -> Result<()> {
    let mut config = globals.load_config()?;
    if let Some(quota) = quota {
        config.run.success_quota = quota;
    }
    if let Some(workers) = workers {
        config.defaults.workers = workers;
    }

    let jurisdiction = jurisdiction.map(JurisdictionCode::new).transpose()?;
    let trace = trace.map(JurisdictionCode::new).transpose()?;
    let mode = match &jurisdiction {
        Some(_) => RunMode::Force,
        None => mode.into(),
    };

    let dirs = DataDirs::new(&config.defaults.data_dir);
    let ctx = RunContext::new(config, dirs, Arc::new(HttpFetcher::new()?), !offline);

    info!(mode = %mode, offline, "starting run");

    let reporter = CliProgress::new();
    let options = RunOptions {
        mode,
        jurisdiction,
        trace,
    };
    let report = pipeline::run(&ctx, &options, &reporter).await?;

    println!();
    println!("  Run:        {}", report.run_id);
    println!("  Mode:       {}", report.mode);
    println!("  Verdict:    {}", report.verdict);
    println!("  Targets:    {}", report.targets);
    println!("  Validated:  {}", report.validated_ok);
    println!("  Snapshots:  {}", report.snapshots);
    println!("  Law pages:  {}", report.law_pages);
    println!("  Committed:  {}", report.catalog_added);
    println!("  Report:     {}", ctx.dirs.report_file().display());
    println!();

    if report.status == RunStatus::Skipped {
        std::process::exit(2);
    }
    Ok(())
}

async fn cmd_discover(globals: &Globals, limit: Option<usize>) -> Result<()> {
    let config = globals.load_config()?;
    let dirs = DataDirs::new(&config.defaults.data_dir);
    dirs.ensure()?;

    let universe = load_jurisdictions(&dirs.jurisdictions_file())?;
    let catalog = Catalog::load(&dirs.catalog_file())?;
    let rules = trust_rules(&dirs, &catalog)?;
    let missing = catalog.missing_official(&universe);

    let mut opts = FeedOptions::from_config(
        &config.discovery,
        Duration::from_secs(config.defaults.timeout_secs),
        true,
    );
    if let Some(limit) = limit {
        opts.limit = limit;
    }

    info!(
        missing = missing.len(),
        limit = opts.limit,
        "refreshing candidate feed"
    );

    let fetcher = HttpFetcher::new()?;
    let refresh = refresh_feed(&fetcher, &dirs, &rules, &missing, &opts, Utc::now()).await?;

    println!();
    println!("  Jurisdictions fed: {}", refresh.candidates_added);
    println!("  Candidates kept:   {}", refresh.kept);
    println!("  Screened out:      {}", refresh.rejected);
    println!("  Candidates file:   {}", dirs.candidates_file().display());
    println!();

    Ok(())
}

async fn cmd_check(globals: &Globals, url: &str, jurisdiction: &str) -> Result<()> {
    let config = globals.load_config()?;
    let dirs = DataDirs::new(&config.defaults.data_dir);
    let code = JurisdictionCode::new(jurisdiction)?;
    let catalog = Catalog::load(&dirs.catalog_file())?;
    let rules = trust_rules(&dirs, &catalog)?;

    let fetcher = HttpFetcher::new()?;
    let validator = LiveValidator::new(Duration::from_secs(config.defaults.timeout_secs));
    let result = validator.check(&fetcher, url, &code, &rules).await;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

async fn cmd_classify(globals: &Globals, path: &str, url: &str) -> Result<()> {
    let config = globals.load_config()?;
    let snapshot = PathBuf::from(path);
    if !snapshot.is_file() {
        return Err(eyre!("no snapshot file at '{path}'"));
    }
    let file_name = snapshot
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| eyre!("'{path}' has no file name"))?;
    let root = snapshot
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or(Path::new("."));

    // The classifier resolves storage paths against a data root; use the
    // file's directory as that root.
    let dirs = DataDirs::new(root);
    let classifier = LawPageClassifier::new(&dirs, &config);
    let check = classifier.classify(&file_name, url);

    println!("{}", serde_json::to_string_pretty(&check)?);
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(globals: &Globals) -> Result<()> {
    let config: AppConfig = globals.load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap()
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl RunProgress for CliProgress {
    fn phase(&self, message: &str) {
        self.spinner.set_message(message.to_string());
    }

    fn target(&self, code: &JurisdictionCode, position: usize, total: usize) {
        self.spinner.set_message(format!("[{position}/{total}] {code}"));
    }

    fn done(&self, _message: &str) {
        self.spinner.finish_and_clear();
    }
}
