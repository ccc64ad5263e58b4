//! Shared types, error model, and configuration for lexhound.
//!
//! This crate is the foundation depended on by all other lexhound crates.
//! It provides:
//! - [`LexhoundError`] — the unified error type
//! - The closed [`Reason`] outcome taxonomy
//! - Domain records ([`JurisdictionCode`], [`CandidateUrl`], [`Snapshot`],
//!   [`ValidationResult`], [`RunReport`])
//! - Configuration ([`AppConfig`], [`DataDirs`], config loading)
//! - HTML text helpers shared by capture and classification

pub mod config;
pub mod error;
pub mod html;
pub mod report;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CrawlConfig, CrawlLimits, DataDirs, DefaultsConfig, DiscoveryConfig, LedgerConfig,
    OcrConfig, RunConfig, SnapshotConfig, config_dir, config_file_path, init_config, load_config,
    load_config_from,
};
pub use error::{LexhoundError, Result};
pub use report::{JurisdictionOutcome, ReportReason, RunMode, RunReport, RunStatus, RunVerdict};
pub use types::{
    CandidateUrl, EMPTY_SHA256, JurisdictionCode, OriginKind, Reason, Snapshot, ValidationResult,
};
