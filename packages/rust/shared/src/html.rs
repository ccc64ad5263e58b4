//! Lightweight HTML text helpers.
//!
//! Used by the snapshot minimum-payload check and the law-page classifier.
//! This is deliberately regex-based tag stripping, not a DOM walk: the
//! callers only need rough visible-text volume and marker matching, and the
//! pages involved are frequently malformed government HTML.

use std::sync::LazyLock;

use regex::Regex;

static SCRIPT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script\b[^>]*>.*?</script>").expect("script regex"));
static STYLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style\b[^>]*>.*?</style>").expect("style regex"));
static NAV_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<nav\b[^>]*>.*?</nav>").expect("nav regex"));
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("tag regex"));
static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("ws regex"));
static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("title regex"));

/// Remove script/style/nav blocks wholesale; keeps the rest of the markup.
pub fn strip_noise(html: &str) -> String {
    let out = SCRIPT_RE.replace_all(html, " ");
    let out = STYLE_RE.replace_all(&out, " ");
    NAV_RE.replace_all(&out, " ").into_owned()
}

/// De-tagged, whitespace-collapsed visible text of an HTML document.
pub fn visible_text(html: &str) -> String {
    let stripped = strip_noise(html);
    let text = TAG_RE.replace_all(&stripped, " ");
    WS_RE.replace_all(&text, " ").trim().to_string()
}

/// Extract the `<title>` text, if any.
pub fn extract_title(html: &str) -> Option<String> {
    let captures = TITLE_RE.captures(html)?;
    let raw = captures.get(1)?.as_str();
    let text = TAG_RE.replace_all(raw, " ");
    let title = WS_RE.replace_all(&text, " ").trim().to_string();
    if title.is_empty() { None } else { Some(title) }
}
