//! Domain trust validation.
//!
//! Decides whether a URL is plausibly an official government source for a
//! jurisdiction. Pure: every call is a function of the URL, the jurisdiction,
//! and a [`TrustRules`] value the caller loaded — no I/O, no hidden caches.
//!
//! Deny rules always win over allow rules. Acceptance goes through, in order:
//! the narrow per-jurisdiction override table, allow-patterns, recognized
//! official host shapes, and root-domain transitive trust against URLs the
//! catalog already holds for that jurisdiction.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use lexhound_shared::{JurisdictionCode, Reason};

/// Substrings that make a host structurally unusable as a primary legal
/// source, regardless of any allow rule.
const BUILTIN_DENIED_SUBSTRINGS: &[&str] = &[
    "wikipedia", "wikidata", "wiki", "blog", "map", "maps", "forum", "news",
];

/// Historical per-jurisdiction exceptions that no general rule covers.
/// Kept deliberately narrow; additions need a documented reason.
const OVERRIDE_HOSTS: &[(&str, &str)] = &[
    // Kosovo's state portal family predates its own TLD arrangements.
    ("XK", "rks-gov.net"),
];

/// Second-level labels that mark a three-part root domain (`x.gov.uk`).
const GOV_SECOND_LEVELS: &[&str] = &["gov", "gouv", "gob", "govt", "go", "gv", "government"];

/// Host keywords accepted as official shapes on their own.
const OFFICIAL_KEYWORDS: &[&str] = &["ministry", "parliament", "legislation", "administration"];

static GOVERN_PORTAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^govern\.[a-z]{2}$").expect("govern portal regex"));

// ---------------------------------------------------------------------------
// Rules & decision types
// ---------------------------------------------------------------------------

/// Everything the validator consults, loaded once by the caller.
#[derive(Debug, Clone, Default)]
pub struct TrustRules {
    /// Wildcard-suffix allow patterns (`*.gov`, `*.gc.ca`).
    pub allow_suffixes: Vec<String>,
    /// Per-jurisdiction allow domains (exact host or suffix).
    pub allow_domains: BTreeMap<String, Vec<String>>,
    /// Denylisted hosts (exact or suffix match).
    pub deny_hosts: Vec<String>,
    /// Extra denied substrings on top of the built-ins.
    pub deny_substrings: Vec<String>,
    /// Hosts already on file per jurisdiction (official + portals).
    pub catalog_hosts: BTreeMap<String, Vec<String>>,
}

/// Which accept path matched; recorded in traces and debug logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchedRule {
    Override,
    Allowlist,
    OfficialShape,
    CatalogDomain,
}

/// The validator's verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustDecision {
    Allowed { rule: MatchedRule },
    Denied { reason: Reason },
}

impl TrustDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }

    pub fn denial_reason(&self) -> Option<Reason> {
        match self {
            Self::Allowed { .. } => None,
            Self::Denied { reason } => Some(*reason),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Classify `url` as official-or-not for `jurisdiction`.
pub fn validate(url: &str, jurisdiction: &JurisdictionCode, rules: &TrustRules) -> TrustDecision {
    let Ok(parsed) = Url::parse(url.trim()) else {
        return TrustDecision::Denied {
            reason: Reason::InvalidUrl,
        };
    };

    if parsed.scheme() != "https" {
        return TrustDecision::Denied {
            reason: Reason::HttpsRequired,
        };
    }

    let Some(host) = parsed.host_str() else {
        return TrustDecision::Denied {
            reason: Reason::MissingHost,
        };
    };
    let host = host.to_ascii_lowercase();
    let path = parsed.path().to_ascii_lowercase();

    // Deny precedes allow, always.
    if let Some(reason) = deny_reason(&host, &path, rules) {
        return TrustDecision::Denied { reason };
    }

    if override_matches(&host, jurisdiction) {
        return TrustDecision::Allowed {
            rule: MatchedRule::Override,
        };
    }

    if allowlist_matches(&host, jurisdiction, rules) {
        return TrustDecision::Allowed {
            rule: MatchedRule::Allowlist,
        };
    }

    if matches_official_shape(&host) {
        return TrustDecision::Allowed {
            rule: MatchedRule::OfficialShape,
        };
    }

    if catalog_domain_matches(&host, jurisdiction, rules) {
        return TrustDecision::Allowed {
            rule: MatchedRule::CatalogDomain,
        };
    }

    TrustDecision::Denied {
        reason: Reason::NotAllowlisted,
    }
}

/// Denied-substring screen alone, for re-checking redirect targets.
pub fn has_denied_substring(host: &str, path: &str, rules: &TrustRules) -> bool {
    let host = host.to_ascii_lowercase();
    let path = path.to_ascii_lowercase();
    BUILTIN_DENIED_SUBSTRINGS
        .iter()
        .copied()
        .chain(rules.deny_substrings.iter().map(String::as_str))
        .any(|needle| {
            let needle = needle.to_ascii_lowercase();
            host.contains(&needle) || path.contains(&needle)
        })
}

/// The deny side on its own: substring screen plus denylisted hosts.
/// Candidate discovery screens feed URLs with this without applying any
/// allow rule, since the feed exists precisely for jurisdictions the allow
/// tables do not cover yet.
pub fn deny_reason(host: &str, path: &str, rules: &TrustRules) -> Option<Reason> {
    if has_denied_substring(host, path, rules) {
        return Some(Reason::DeniedSubstring);
    }
    if rules
        .deny_hosts
        .iter()
        .any(|denied| host_matches_suffix(host, denied))
    {
        return Some(Reason::DeniedHost);
    }
    None
}

fn override_matches(host: &str, jurisdiction: &JurisdictionCode) -> bool {
    OVERRIDE_HOSTS
        .iter()
        .filter(|(code, _)| *code == jurisdiction.as_str())
        .any(|(_, domain)| host_matches_suffix(host, domain))
}

fn allowlist_matches(host: &str, jurisdiction: &JurisdictionCode, rules: &TrustRules) -> bool {
    if rules
        .allow_suffixes
        .iter()
        .any(|pattern| pattern_matches(host, pattern))
    {
        return true;
    }
    rules
        .allow_domains
        .get(jurisdiction.as_str())
        .is_some_and(|domains| {
            domains
                .iter()
                .any(|domain| host_matches_suffix(host, domain))
        })
}

/// Recognized official host shapes: gov/gouv/gob/govt/go TLD conventions, a
/// handful of government keywords, and the bare `govern.xx` portal form.
fn matches_official_shape(host: &str) -> bool {
    if host.ends_with(".gov")
        || host.contains(".gov.")
        || host.ends_with(".gouv")
        || host.contains(".gouv.")
        || host.ends_with(".gob")
        || host.contains(".gob.")
        || host.contains(".govt.")
        || host.contains(".go.")
        || host.contains(".governo.")
    {
        return true;
    }
    if OFFICIAL_KEYWORDS.iter().any(|k| host.contains(k)) {
        return true;
    }
    GOVERN_PORTAL_RE.is_match(host)
}

fn catalog_domain_matches(host: &str, jurisdiction: &JurisdictionCode, rules: &TrustRules) -> bool {
    let Some(known_hosts) = rules.catalog_hosts.get(jurisdiction.as_str()) else {
        return false;
    };
    let root = root_domain(host);
    known_hosts
        .iter()
        .any(|known| known == host || root_domain(known) == root)
}

// ---------------------------------------------------------------------------
// Host matching helpers
// ---------------------------------------------------------------------------

/// Exact host or dot-suffix match (`assembly.gov.xk` matches `gov.xk`).
fn host_matches_suffix(host: &str, domain: &str) -> bool {
    let domain = domain.trim().trim_start_matches("*.").to_ascii_lowercase();
    if domain.is_empty() {
        return false;
    }
    host == domain || host.ends_with(&format!(".{domain}"))
}

/// Wildcard-suffix allow patterns: `*.gov` matches any host under `gov`;
/// a bare pattern matches exactly or as a suffix.
fn pattern_matches(host: &str, pattern: &str) -> bool {
    let pattern = pattern.trim().to_ascii_lowercase();
    if pattern.is_empty() {
        return false;
    }
    match pattern.strip_prefix("*.") {
        Some(suffix) => host == suffix || host.ends_with(&format!(".{suffix}")),
        None => host_matches_suffix(host, &pattern),
    }
}

/// Registrable root domain, aware of two-label government suffixes:
/// `portal.gov.uk` keeps three labels, `www.example.org` keeps two.
pub fn root_domain(host: &str) -> String {
    let parts: Vec<&str> = host.split('.').filter(|p| !p.is_empty()).collect();
    if parts.len() >= 3 {
        let second_level = parts[parts.len() - 2];
        if GOV_SECOND_LEVELS.contains(&second_level) {
            return parts[parts.len() - 3..].join(".");
        }
    }
    if parts.len() >= 2 {
        return parts[parts.len() - 2..].join(".");
    }
    host.to_string()
}
