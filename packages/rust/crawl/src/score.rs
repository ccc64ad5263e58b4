//! Link scoring and topic voting for crawl candidates.
//!
//! Scores are plain substring matches over `url + anchor text`, lowercased.
//! Deny tokens reject outright. Law tokens and drug tokens add two points
//! each; a `.pdf` suffix adds one. A link with no law token is rejected, and
//! a law-only link (no drug token) is floored to a low positive score so it
//! stays scannable but sorts behind topical matches.

use serde::{Deserialize, Serialize};

const LAW_TOKENS: &[&str] = &[
    "act",
    "actdetail",
    "actdocumentdetail",
    "/law",
    "/laws",
    "/legislation",
    "/act",
    "/eli",
    "/gazette",
    "/acts",
    "/decree",
    "/ordinance",
    "/bill",
    "/code",
    "/statute",
    "/regulation",
    "/criminal",
    "official journal",
    "official gazette",
    "gazeta zyrtare",
    "gazeta",
    "ligj",
    "ligji",
    "gesetzblatt",
    "loi",
    "ley",
    "legge",
    "gesetz",
    "criminal",
    "penal",
];

const DRUG_TOKENS: &[&str] = &[
    "drug",
    "drugs",
    "narcotics",
    "narcotic",
    "controlled",
    "substance",
    "controlled-substance",
    "controlledsubstance",
    "controlled substances",
    "controlled-substances",
    "controlled drugs",
    "controlled-drugs",
    "drug control",
    "drug-control",
    "drugcontrol",
    "drug law",
    "drug-law",
    "druglaw",
    "narcotic drugs",
    "narcotics control",
    "narcotics-control",
    "misuse of drugs",
    "misuse-of-drugs",
    "psychotropic substances",
    "psychotropic-substances",
    "controlled substances act",
    "psychotropic",
    "cannabis",
    "hemp",
    "cannabinoid",
    "cannabinoids",
    "cbd",
    "thc",
    "tetrahydrocannabinol",
    "тгк",
    "kanabis",
    "marihuan",
    "hashash",
    "narkotik",
];

const DENY_TOKENS: &[&str] = &[
    "news",
    "press",
    "blog",
    "map",
    "forum",
    "social",
    "tourism",
    "cookie",
    "privacy",
    "facebook",
    "twitter",
];

/// Keywords whose extended vocabulary marks a page as on-topic for the vote
/// heuristic, including brand-name preparations and localized phrases.
const TOPIC_TOKENS: &[&str] = &[
    "cannabis",
    "marijuana",
    "marihuana",
    "hemp",
    "cannabidiol",
    "cbd",
    "thc",
    "tetrahydrocannabinol",
    "тгк",
    "kanabis",
    "marihuan",
    "hashash",
    "narkotik",
    "medical cannabis",
    "medicinal cannabis",
    "cannabis act",
    "narcotic drugs",
    "controlled substances",
    "dronabinol",
    "nabiximols",
    "sativex",
    "epidiolex",
    "cannabis medicinal",
    "estupefacientes",
    "cannabis médical",
    "stupéfiants",
    "cannabisgesetz",
    "betäubungsmittel",
    "entorpecentes",
    "cannabis terapeutica",
    "stupefacenti",
];

/// A link with its crawl priority. Negative scores mean rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredLink {
    pub url: String,
    pub text: String,
    pub score: i32,
}

/// Scores one link. Returns a negative score when a deny token matches or no
/// law token is present at all.
pub fn score_law_candidate(url: &str, text: &str) -> i32 {
    let target = format!("{url} {text}").to_lowercase();
    if DENY_TOKENS.iter().any(|token| target.contains(token)) {
        return -1;
    }
    let mut score = 0;
    let mut law_hits = 0;
    let mut drug_hits = 0;
    for token in LAW_TOKENS {
        if target.contains(token) {
            score += 2;
            law_hits += 1;
        }
    }
    for token in DRUG_TOKENS {
        if target.contains(token) {
            score += 2;
            drug_hits += 1;
        }
    }
    if target.contains(".pdf") {
        score += 1;
    }
    if law_hits == 0 {
        return -1;
    }
    if drug_hits == 0 {
        return law_hits.max(1);
    }
    score
}

/// Lightweight topical vote on an already-fetched page. Observational only;
/// never gates classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateVote {
    pub url: String,
    pub likely: bool,
    pub keywords: Vec<String>,
}

pub fn vote_on_candidate(url: &str, title: &str, snippet: &str) -> CandidateVote {
    let text = format!("{url} {title} {snippet}").to_lowercase();
    let keywords: Vec<String> = TOPIC_TOKENS
        .iter()
        .filter(|token| text.contains(*token))
        .take(3)
        .map(|token| token.to_string())
        .collect();
    CandidateVote {
        url: url.to_string(),
        likely: !keywords.is_empty(),
        keywords,
    }
}
