//! Candidate source registry: the durable per-jurisdiction catalog.
//!
//! The catalog (`sources/official_catalog.json`) is the system of record for
//! validated official URLs. It only ever grows: a URL enters `official` after
//! a viable snapshot exists for it, and nothing here removes one.
//!
//! This crate also loads the surrounding data files (allow/deny rules, seed
//! URLs, the jurisdiction list) and derives the flat sources registry that
//! downstream extraction tooling consumes.

pub mod registry;
pub mod rules;

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use lexhound_shared::{JurisdictionCode, LexhoundError, Result};

/// Note token appended when the pipeline itself seeded an official URL.
const AUTO_SEEDED_NOTE: &str = "auto_seeded";

// ---------------------------------------------------------------------------
// CatalogEntry
// ---------------------------------------------------------------------------

/// Per-jurisdiction record of known and validated source URLs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Unvalidated URLs worth trying, from operators or earlier runs.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub candidates: BTreeSet<String>,

    /// Validated official URLs. Only grows.
    #[serde(default)]
    pub official: BTreeSet<String>,

    /// Known government portals; grant transitive root-domain trust.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub portals: BTreeSet<String>,

    /// True until the first official URL lands.
    #[serde(default)]
    pub missing_official: bool,

    /// Human-review flag; min-sources and scale skip flagged entries.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub needs_review: bool,

    /// Free-form notes, `;`-separated tokens by convention.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub notes: String,
}

impl CatalogEntry {
    /// Every URL on file, validated or not.
    pub fn all_urls(&self) -> impl Iterator<Item = &String> {
        self.official
            .iter()
            .chain(self.portals.iter())
            .chain(self.candidates.iter())
    }

    fn push_note(&mut self, token: &str) {
        let present = self.notes.split(';').any(|n| n.trim() == token);
        if present {
            return;
        }
        if self.notes.is_empty() {
            self.notes = token.to_string();
        } else {
            self.notes.push_str("; ");
            self.notes.push_str(token);
        }
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// The whole catalog, keyed by jurisdiction. Serializes with sorted keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    entries: BTreeMap<JurisdictionCode, CatalogEntry>,
}

impl Catalog {
    /// Load from disk; a missing file is an empty catalog, not an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(?path, "catalog file not found, starting empty");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| LexhoundError::io(path, e))?;
        serde_json::from_str(&content).map_err(|e| {
            LexhoundError::parse(format!("catalog {}: {e}", path.display()))
        })
    }

    /// Write pretty JSON with sorted keys and a trailing newline.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| LexhoundError::io(parent, e))?;
        }
        let mut content = serde_json::to_string_pretty(self)
            .map_err(|e| LexhoundError::parse(format!("catalog serialize: {e}")))?;
        content.push('\n');
        std::fs::write(path, content).map_err(|e| LexhoundError::io(path, e))
    }

    pub fn entry(&self, code: &JurisdictionCode) -> Option<&CatalogEntry> {
        self.entries.get(code)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&JurisdictionCode, &CatalogEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert or replace an entry wholesale (test setup, manual curation).
    pub fn upsert(&mut self, code: JurisdictionCode, entry: CatalogEntry) {
        self.entries.insert(code, entry);
    }

    /// The single mutation path the pipeline uses: record a validated
    /// official URL. Returns whether the entry actually changed.
    pub fn commit_official(&mut self, code: &JurisdictionCode, url: &str) -> bool {
        let entry = self.entries.entry(code.clone()).or_default();
        let mut changed = entry.official.insert(url.to_string());
        if entry.missing_official {
            entry.missing_official = false;
            changed = true;
        }
        if changed {
            entry.push_note(AUTO_SEEDED_NOTE);
        }
        changed
    }

    /// Jurisdictions from `universe` still lacking an official source.
    /// Absent entries count as missing; `needs_review` entries are skipped.
    pub fn missing_official(&self, universe: &[JurisdictionCode]) -> Vec<JurisdictionCode> {
        universe
            .iter()
            .filter(|code| match self.entries.get(code) {
                None => true,
                Some(entry) => {
                    !entry.needs_review && (entry.missing_official || entry.official.is_empty())
                }
            })
            .cloned()
            .collect()
    }

    /// Hosts already on file (official + portals) per jurisdiction, for the
    /// trust validator's transitive root-domain rule.
    pub fn host_view(&self) -> BTreeMap<String, Vec<String>> {
        let mut view = BTreeMap::new();
        for (code, entry) in &self.entries {
            let hosts: Vec<String> = entry
                .official
                .iter()
                .chain(entry.portals.iter())
                .filter_map(|u| url::Url::parse(u).ok())
                .filter_map(|u| u.host_str().map(|h| h.to_ascii_lowercase()))
                .collect();
            if !hosts.is_empty() {
                view.insert(code.as_str().to_string(), hosts);
            }
        }
        view
    }
}

// ---------------------------------------------------------------------------
// Sibling data files
// ---------------------------------------------------------------------------

/// Load the jurisdiction list (`jurisdictions.json`, an array of codes).
/// Missing file means an empty universe.
pub fn load_jurisdictions(path: &Path) -> Result<Vec<JurisdictionCode>> {
    if !path.exists() {
        tracing::warn!(?path, "jurisdiction list not found");
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(path).map_err(|e| LexhoundError::io(path, e))?;
    let raw: Vec<String> = serde_json::from_str(&content)
        .map_err(|e| LexhoundError::parse(format!("jurisdictions {}: {e}", path.display())))?;
    let mut codes = Vec::with_capacity(raw.len());
    for item in raw {
        codes.push(JurisdictionCode::new(&item)?);
    }
    Ok(codes)
}

/// Load explicit seed URLs (`sources/seeds.json`: code → URL list).
pub fn load_seeds(path: &Path) -> Result<BTreeMap<String, Vec<String>>> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }
    let content = std::fs::read_to_string(path).map_err(|e| LexhoundError::io(path, e))?;
    serde_json::from_str(&content)
        .map_err(|e| LexhoundError::parse(format!("seeds {}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(s: &str) -> JurisdictionCode {
        JurisdictionCode::new(s).expect("code")
    }

    fn temp_file(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("lexhound-catalog-{}-{name}", uuid::Uuid::now_v7()))
    }

    #[test]
    fn commit_official_grows_and_clears_missing() {
        let mut catalog = Catalog::default();
        catalog.upsert(
            code("AA"),
            CatalogEntry {
                missing_official: true,
                ..Default::default()
            },
        );

        assert!(catalog.commit_official(&code("AA"), "https://example.gov/"));
        let entry = catalog.entry(&code("AA")).expect("entry");
        assert!(entry.official.contains("https://example.gov/"));
        assert!(!entry.missing_official);
        assert_eq!(entry.notes, "auto_seeded");

        // Same URL again: no change, no duplicate note.
        assert!(!catalog.commit_official(&code("AA"), "https://example.gov/"));
        assert_eq!(catalog.entry(&code("AA")).expect("entry").notes, "auto_seeded");
    }

    #[test]
    fn commit_creates_absent_entries() {
        let mut catalog = Catalog::default();
        assert!(catalog.commit_official(&code("ZZ"), "https://laws.example.gov/"));
        assert_eq!(
            catalog.entry(&code("ZZ")).expect("entry").official.len(),
            1
        );
    }

    #[test]
    fn missing_official_selection() {
        let mut catalog = Catalog::default();
        catalog.upsert(
            code("AA"),
            CatalogEntry {
                missing_official: true,
                ..Default::default()
            },
        );
        catalog.upsert(
            code("BB"),
            CatalogEntry {
                official: BTreeSet::from(["https://example.gov/".to_string()]),
                ..Default::default()
            },
        );
        catalog.upsert(
            code("CC"),
            CatalogEntry {
                missing_official: true,
                needs_review: true,
                ..Default::default()
            },
        );

        let universe = vec![code("AA"), code("BB"), code("CC"), code("DD")];
        let missing = catalog.missing_official(&universe);
        // BB has a source, CC is flagged for review, DD has no entry.
        assert_eq!(missing, vec![code("AA"), code("DD")]);
    }

    #[test]
    fn save_load_roundtrip_sorted_and_newline_terminated() {
        let mut catalog = Catalog::default();
        catalog.commit_official(&code("BB"), "https://b.example.gov/");
        catalog.commit_official(&code("AA"), "https://a.example.gov/");

        let path = temp_file("roundtrip.json");
        catalog.save(&path).expect("save");

        let raw = std::fs::read_to_string(&path).expect("read back");
        assert!(raw.ends_with('\n'));
        // BTreeMap keys serialize sorted.
        let aa = raw.find("\"AA\"").expect("AA present");
        let bb = raw.find("\"BB\"").expect("BB present");
        assert!(aa < bb);

        let loaded = Catalog::load(&path).expect("load");
        assert_eq!(loaded, catalog);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn load_missing_file_is_empty() {
        let catalog = Catalog::load(&temp_file("absent.json")).expect("load");
        assert!(catalog.is_empty());
    }

    #[test]
    fn host_view_covers_official_and_portals() {
        let mut catalog = Catalog::default();
        catalog.upsert(
            code("AD"),
            CatalogEntry {
                official: BTreeSet::from(["https://www.govern.ad/llei".to_string()]),
                portals: BTreeSet::from(["https://portal.exteriors.ad/".to_string()]),
                candidates: BTreeSet::from(["https://unvetted.example.org/".to_string()]),
                ..Default::default()
            },
        );

        let view = catalog.host_view();
        let hosts = view.get("AD").expect("AD hosts");
        assert!(hosts.contains(&"www.govern.ad".to_string()));
        assert!(hosts.contains(&"portal.exteriors.ad".to_string()));
        // Candidates are unvalidated and grant no trust.
        assert!(!hosts.iter().any(|h| h.contains("unvetted")));
    }
}
