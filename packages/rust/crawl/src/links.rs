//! Same-host link extraction and page fingerprinting.
//!
//! Works on captured HTML, not the live DOM. Links leaving the base host are
//! dropped immediately; with `allow_subdomains` the comparison widens to the
//! registrable root domain so `legislacion.example.gov` counts as part of
//! `www.example.gov`.

use std::collections::HashSet;
use std::sync::LazyLock;

use lexhound_trust::root_domain;
use regex::Regex;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use url::Url;

static ANCHOR_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("anchor selector"));
static LANG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)<html[^>]*lang=["']([^"']+)["']"#).expect("lang regex"));
static SPA_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r#"(?i)id=["']__next["']"#,
        r"(?i)data-reactroot",
        r#"(?i)id=["']app["']"#,
        r"(?i)ng-version",
        r"(?i)window\.__NUXT__",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("spa regex"))
    .collect()
});

/// An anchor found on a page: absolute URL plus its visible text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkRef {
    pub url: String,
    pub text: String,
}

/// Extracts deduplicated same-host links from `html`, resolving relative
/// hrefs against `base_url`. Fragments are stripped; mailto/tel and
/// non-http(s) schemes are ignored.
pub fn extract_same_host_links(html: &str, base_url: &str, allow_subdomains: bool) -> Vec<LinkRef> {
    let Ok(base) = Url::parse(base_url) else {
        return Vec::new();
    };
    let Some(base_host) = base.host_str().map(str::to_ascii_lowercase) else {
        return Vec::new();
    };

    let document = Html::parse_document(html);
    let mut seen: HashSet<String> = HashSet::new();
    let mut links = Vec::new();
    for anchor in document.select(&ANCHOR_SELECTOR) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        // Whitespace inside hrefs shows up in hand-written government HTML.
        let href: String = href.split_whitespace().collect();
        if href.is_empty() || href.starts_with('#') {
            continue;
        }
        if href.starts_with("mailto:") || href.starts_with("tel:") {
            continue;
        }
        let Ok(mut target) = base.join(&href) else {
            continue;
        };
        if !matches!(target.scheme(), "http" | "https") {
            continue;
        }
        let Some(target_host) = target.host_str().map(str::to_ascii_lowercase) else {
            continue;
        };
        if !is_same_host(&base_host, &target_host, allow_subdomains) {
            continue;
        }
        target.set_fragment(None);
        let clean = target.to_string();
        if !seen.insert(clean.clone()) {
            continue;
        }
        let text = anchor
            .text()
            .collect::<Vec<_>>()
            .join(" ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        links.push(LinkRef { url: clean, text });
    }
    links
}

fn strip_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

pub fn is_same_host(base_host: &str, target_host: &str, allow_subdomains: bool) -> bool {
    if base_host.is_empty() || target_host.is_empty() {
        return false;
    }
    if base_host == target_host {
        return true;
    }
    if !allow_subdomains {
        return false;
    }
    let base_root = root_domain(strip_www(base_host));
    let target_root = root_domain(strip_www(target_host));
    if !base_root.is_empty() && base_root == target_root {
        return true;
    }
    target_host.ends_with(&format!(".{base_host}"))
}

/// `lang` attribute of the root `<html>` element, lowercased.
pub fn detect_lang(html: &str) -> Option<String> {
    LANG_RE
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_ascii_lowercase())
        .filter(|lang| !lang.is_empty())
}

/// Heuristic for client-rendered pages whose captured HTML carries no real
/// content. Diagnostic only.
pub fn detect_spa(html: &str) -> bool {
    SPA_RES.iter().any(|re| re.is_match(html))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PORTAL: &str = r##"<html lang="sq"><body>
<a href="/laws/narcotics">Narcotics law</a>
<a href="/laws/narcotics#art1">Anchor dupe</a>
<a href="https://legislacion.example.gov/acts">Subdomain</a>
<a href="https://other-site.com/laws">External</a>
<a href="mailto:info@example.gov">Mail</a>
<a href="tel:+123">Call</a>
<a href="#top">Top</a>
<a href="/contact"><span>Contact</span> <b>us</b></a>
</body></html>"##;

    #[test]
    fn extraction_resolves_dedupes_and_filters() {
        let links = extract_same_host_links(PORTAL, "https://www.example.gov/", false);
        let urls: Vec<&str> = links.iter().map(|l| l.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://www.example.gov/laws/narcotics",
                "https://www.example.gov/contact",
            ]
        );
        assert_eq!(links[0].text, "Narcotics law");
        assert_eq!(links[1].text, "Contact us");
    }

    #[test]
    fn subdomains_are_included_only_when_allowed() {
        let strict = extract_same_host_links(PORTAL, "https://www.example.gov/", false);
        assert!(!strict.iter().any(|l| l.url.contains("legislacion.")));

        let wide = extract_same_host_links(PORTAL, "https://www.example.gov/", true);
        assert!(wide.iter().any(|l| l.url == "https://legislacion.example.gov/acts"));
        assert!(!wide.iter().any(|l| l.url.contains("other-site.com")));
    }

    #[test]
    fn same_host_handles_gov_second_levels() {
        assert!(is_same_host("www.justice.gov.au", "portal.justice.gov.au", true));
        assert!(!is_same_host("www.justice.gov.au", "portal.justice.gov.au", false));
        // Siblings under gov.au are separate registrants, not subdomains.
        assert!(!is_same_host("www.justice.gov.au", "legislation.gov.au", true));
    }

    #[test]
    fn language_and_spa_fingerprints() {
        assert_eq!(detect_lang(PORTAL).as_deref(), Some("sq"));
        assert_eq!(detect_lang("<html><body></body></html>"), None);

        assert!(detect_spa(r#"<div id="__next"></div>"#));
        assert!(detect_spa("<script>window.__NUXT__={}</script>"));
        assert!(!detect_spa("<html><body><p>plain page</p></body></html>"));
    }
}
