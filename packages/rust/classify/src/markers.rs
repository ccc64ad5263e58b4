//! Lexical marker families for law-page detection.
//!
//! Two independent vocabularies: legal-structure terms (is this shaped like
//! legislation?) and drug terms (is it about the substances we track?).
//! Both carry localized equivalents for the jurisdictions that publish in
//! Albanian, French, German, Italian, Spanish, and Cyrillic-script languages.
//! The structure patterns are counted per distinct pattern, not per
//! occurrence, so a page that repeats "Article" fifty times still scores one.

use std::sync::LazyLock;

use regex::Regex;

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("marker regex"))
        .collect()
}

static LAW_MARKER_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"(?i)\b(act|law|legislation|code|gazette|regulation|statute|ordinance|bill|parliament)\b",
        r"(?i)\b(law no|act no|no\.)\b",
        r"(?i)\b(article|section|chapter)\b",
        r"(?i)\b(published|entered into force)\b",
        r"(?i)\bofficial journal\b",
        r"(?i)\bofficial gazette\b",
        r"(?i)\bjournal officiel\b",
        r"(?i)\bgazette officielle\b",
        r"(?i)\bgazeta zyrtare\b",
        r"(?i)\bgazeta\b",
        r"(?i)\bligj\b",
        r"(?i)\bligji\b",
        r"(?i)\bgesetz\b",
        r"(?i)\bloi\b",
        r"(?i)\blegge\b",
        r"(?i)\bley\b",
    ])
});

static DRUG_MARKER_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"(?i)\b(drug|drugs|narcotic|narcotics|controlled substance|controlled drug)\b",
        r"(?i)\b(cannabis|marijuana|marihuana|hemp|hashish|ganja|thc|cbd|cannabidiol|tetrahydrocannabinol|kanabis|hashash)\b",
        r"(?i)\bmarihuan[aeë]\b",
        r"(?i)\bnarkotik[eë]?\b",
        r"(?i)\bтгк\b",
    ])
});

/// Distinct structural shapes of statutory text. The classifier requires a
/// minimum number of these to fire before accepting a page.
static STRUCTURE_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"(?i)\bsection\b",
        r"(?i)\barticle\b",
        r"(?i)\bchapter\b",
        r"(?i)\blaw no\.?\b",
        r"(?i)\bact no\.?\b",
        r"(?i)\bofficial gazette\b",
        r"(?i)\bofficial journal\b",
        r"(?i)\bentered into force\b",
        r"(?i)\bpublished\b",
        r"(?i)\bgazeta zyrtare\b",
        r"(?i)\bligj\b",
    ])
});

/// URL tokens that disqualify a page before its content is read.
const DENIED_URL_TOKENS: &[&str] = &["news", "press", "blog", "forum", "map", "social"];

/// URL tokens that let a text-free PDF still count as law-marked.
const PDF_LAW_URL_TOKENS: &[&str] = &[
    "law",
    "act",
    "code",
    "gazette",
    "regulation",
    "ordinance",
    "statute",
    "bill",
    "legislation",
    "ligj",
    "gazeta",
];

pub fn has_law_marker(text: &str) -> bool {
    LAW_MARKER_RES.iter().any(|re| re.is_match(text))
}

pub fn has_drug_marker(text: &str) -> bool {
    DRUG_MARKER_RES.iter().any(|re| re.is_match(text))
}

pub fn structure_hits(text: &str) -> usize {
    STRUCTURE_RES.iter().filter(|re| re.is_match(text)).count()
}

pub fn is_denied_url(url: &str) -> bool {
    let target = url.to_ascii_lowercase();
    DENIED_URL_TOKENS.iter().any(|token| target.contains(token))
}

pub fn is_law_shaped_url(url: &str) -> bool {
    let target = url.to_ascii_lowercase();
    PDF_LAW_URL_TOKENS.iter().any(|token| target.contains(token))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn law_markers_cover_localized_vocabulary() {
        assert!(has_law_marker("Gazeta Zyrtare e Republikës"));
        assert!(has_law_marker("Loi relative aux stupéfiants"));
        assert!(has_law_marker("Betäubungsmittelgesetz ist ein Gesetz"));
        assert!(has_law_marker("Ley de estupefacientes"));
        assert!(!has_law_marker("Welcome to the tourist office"));
    }

    #[test]
    fn drug_markers_cover_localized_vocabulary() {
        assert!(has_drug_marker("control of cannabis products"));
        assert!(has_drug_marker("ligji për marihuanë"));
        assert!(has_drug_marker("lëndëve narkotike"));
        assert!(has_drug_marker("содержание тгк в продукции"));
        assert!(!has_drug_marker("agricultural subsidies for wheat"));
    }

    #[test]
    fn structure_hits_count_distinct_patterns_once() {
        assert_eq!(structure_hits("Article 1. Article 2. Article 3."), 1);
        assert_eq!(structure_hits("Article 1 and Section 2, published 2020"), 3);
        assert_eq!(structure_hits("nothing legal here"), 0);
    }

    #[test]
    fn denied_url_tokens_match_anywhere_in_the_url() {
        assert!(is_denied_url("https://example.gov/news/2024"));
        assert!(is_denied_url("https://PRESS.example.gov/"));
        assert!(!is_denied_url("https://example.gov/laws/act-7"));
    }

    #[test]
    fn law_shaped_urls() {
        assert!(is_law_shaped_url("https://example.gov/files/drug-act.pdf"));
        assert!(is_law_shaped_url("https://example.gov/gazeta/2020/15.pdf"));
        assert!(!is_law_shaped_url("https://example.gov/files/report.pdf"));
    }
}
