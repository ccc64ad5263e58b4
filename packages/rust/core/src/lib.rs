//! Run orchestration for Lexhound.
//!
//! This crate ties discovery, trust screening, live validation, snapshot
//! capture, law-page crawling, and the attempt ledger into end-to-end runs.

pub mod context;
pub mod pipeline;
pub mod select;
