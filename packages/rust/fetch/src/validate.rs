//! Live validation of candidate URLs.
//!
//! Builds on the pure trust decision from `lexhound-trust` and adds what only
//! the network can answer: is the document reachable, is it a content type we
//! archive, and does the server redirect somewhere we no longer trust. The
//! probe is HEAD-first with a GET fallback for servers that reject or
//! misreport HEAD.

use std::time::Duration;

use lexhound_shared::types::{JurisdictionCode, Reason, ValidationResult};
use lexhound_trust::{self as trust, TrustDecision, TrustRules};
use tracing::instrument;
use url::Url;

use crate::transport::{FetchResponse, UrlFetcher};

/// Content types the validator accepts for an official document page.
const VALIDATE_CONTENT_TYPES: &[&str] = &["text/html", "application/pdf"];

// ----------------------------------------------------------------------------
// URL normalization
// ----------------------------------------------------------------------------

fn is_tracking_param(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.starts_with("utm_")
        || matches!(
            lower.as_str(),
            "fbclid" | "gclid" | "yclid" | "mc_cid" | "mc_eid"
        )
}

/// Canonical form used for trust checks, dedup, and storage keys.
///
/// Upgrades `http` to `https`, drops the fragment, and strips tracking
/// parameters. Returns `None` when the input does not parse as an absolute
/// URL.
pub fn normalize_url(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let mut url = Url::parse(trimmed).ok()?;
    if url.scheme() == "http" {
        url.set_scheme("https").ok()?;
    }
    url.set_fragment(None);

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(name, _)| !is_tracking_param(name))
        .map(|(name, value)| (name.into_owned(), value.into_owned()))
        .collect();
    if kept.is_empty() {
        url.set_query(None);
    } else {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(kept.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .finish();
        url.set_query(Some(&query));
    }
    Some(url.to_string())
}

// ----------------------------------------------------------------------------
// Live checking
// ----------------------------------------------------------------------------

/// Network-backed validator. One instance per run; carries only the request
/// timeout so it stays cheap to clone into workers.
#[derive(Debug, Clone, Copy)]
pub struct LiveValidator {
    timeout: Duration,
}

impl LiveValidator {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Full check for one candidate URL.
    ///
    /// Order matters: normalization and the pure trust decision run before
    /// any request is made, so denied URLs never generate traffic. After the
    /// probe, the response's final URL is re-screened because a redirect can
    /// land outside the trusted surface.
    #[instrument(skip_all, fields(jurisdiction = %jurisdiction, url = raw_url))]
    pub async fn check(
        &self,
        fetcher: &dyn UrlFetcher,
        raw_url: &str,
        jurisdiction: &JurisdictionCode,
        rules: &TrustRules,
    ) -> ValidationResult {
        let Some(url) = normalize_url(raw_url) else {
            return ValidationResult::fail(Reason::InvalidUrl);
        };
        if let TrustDecision::Denied { reason } = trust::validate(&url, jurisdiction, rules) {
            return ValidationResult::fail(reason);
        }

        let (response, body_fetched) = match fetcher.head(&url, self.timeout).await {
            Ok(head) if head_is_conclusive(&head) => (head, false),
            _ => match fetcher.get(&url, self.timeout).await {
                Ok(got) => (got, true),
                Err(reason) => return ValidationResult::fail(reason),
            },
        };

        if !response.is_success() {
            return ValidationResult {
                ok: false,
                reason: Some(Reason::BadStatus),
                final_url: Some(response.final_url),
                http_status: Some(response.status),
                content_type: response.content_type,
            };
        }
        let content_type = response.content_type_base();
        if !content_type
            .as_deref()
            .is_some_and(|ct| VALIDATE_CONTENT_TYPES.contains(&ct))
        {
            return ValidationResult {
                ok: false,
                reason: Some(Reason::BadContentType),
                final_url: Some(response.final_url),
                http_status: Some(response.status),
                content_type: response.content_type,
            };
        }
        if body_fetched && response.body.is_empty() {
            return ValidationResult {
                ok: false,
                reason: Some(Reason::EmptyBody),
                final_url: Some(response.final_url),
                http_status: Some(response.status),
                content_type: response.content_type,
            };
        }

        if !final_url_still_trusted(&response.final_url, jurisdiction, rules) {
            return ValidationResult {
                ok: false,
                reason: Some(Reason::RedirectOffAllowlist),
                final_url: Some(response.final_url),
                http_status: Some(response.status),
                content_type: response.content_type,
            };
        }

        ValidationResult::pass(&response.final_url, response.status, content_type)
    }
}

/// A HEAD answer settles the check only when it is positive and complete:
/// success status, an archivable content type, and a non-zero length. Anything
/// else falls through to GET, which covers servers that reject HEAD outright
/// or answer it with junk.
fn head_is_conclusive(response: &FetchResponse) -> bool {
    response.is_success()
        && response
            .content_type_base()
            .is_some_and(|ct| VALIDATE_CONTENT_TYPES.contains(&ct.as_str()))
        && response.content_length.unwrap_or(0) > 0
}

fn final_url_still_trusted(
    final_url: &str,
    jurisdiction: &JurisdictionCode,
    rules: &TrustRules,
) -> bool {
    let Ok(parsed) = Url::parse(final_url) else {
        return false;
    };
    let host = parsed.host_str().unwrap_or_default();
    if trust::has_denied_substring(host, parsed.path(), rules) {
        return false;
    }
    trust::validate(final_url, jurisdiction, rules).is_allowed()
}
