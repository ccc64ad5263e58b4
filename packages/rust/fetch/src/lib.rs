//! Network layer: transport abstraction, retry policy, live URL validation,
//! and content-addressed snapshot capture.
//!
//! - [`transport`]: the [`UrlFetcher`] trait with HTTP and fixture backends
//! - [`retry`]: the one retry policy every call site shares
//! - [`validate`]: HEAD-then-GET liveness checks on top of the trust rules
//! - [`snapshot`]: sha-256 addressed capture with an append-only meta log

pub mod retry;
pub mod snapshot;
pub mod transport;
pub mod validate;

pub use retry::{RetryPolicy, Retryable};
pub use snapshot::{CaptureError, CaptureFailure, CaptureRequest, SnapshotStore};
pub use transport::{FetchResponse, FixtureFetcher, FixtureResponse, HttpFetcher, UrlFetcher};
pub use validate::{normalize_url, LiveValidator};
