//! Derived sources registry.
//!
//! `sources_registry.json` is the flat view of the catalog that unrelated
//! extraction tooling reads. It is regenerated after every catalog write;
//! unknown top-level fields already present in the file are preserved.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use lexhound_shared::{LexhoundError, Result};

use crate::Catalog;

const REGISTRY_SCHEMA_VERSION: u64 = 2;

/// How downstream tooling should treat a registry row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistryKind {
    Verified,
    Candidate,
    Portal,
}

/// One flat registry row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrySource {
    pub url: String,
    #[serde(rename = "type")]
    pub kind: RegistryKind,
    /// Suggested re-fetch cadence for downstream tooling.
    pub frequency: String,
    pub jurisdiction: String,
}

/// Counts returned after a write, for logs and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistrySummary {
    pub total: usize,
    pub verified: usize,
    pub candidates: usize,
    pub portals: usize,
}

/// Flatten the catalog into registry rows, deterministically ordered:
/// jurisdictions sorted, official → portals → candidates within each.
pub fn registry_sources(catalog: &Catalog) -> Vec<RegistrySource> {
    let mut sources = Vec::new();
    for (code, entry) in catalog.iter() {
        let jurisdiction = code.as_str().to_string();
        for (set, kind) in [
            (&entry.official, RegistryKind::Verified),
            (&entry.portals, RegistryKind::Portal),
            (&entry.candidates, RegistryKind::Candidate),
        ] {
            for url in set {
                sources.push(RegistrySource {
                    url: url.clone(),
                    kind,
                    frequency: "weekly".into(),
                    jurisdiction: jurisdiction.clone(),
                });
            }
        }
    }
    sources
}

/// Regenerate `sources_registry.json` from the catalog.
pub fn write_registry(
    path: &Path,
    catalog: &Catalog,
    generated_at: DateTime<Utc>,
) -> Result<RegistrySummary> {
    let sources = registry_sources(catalog);
    let summary = RegistrySummary {
        total: sources.len(),
        verified: sources
            .iter()
            .filter(|s| s.kind == RegistryKind::Verified)
            .count(),
        candidates: sources
            .iter()
            .filter(|s| s.kind == RegistryKind::Candidate)
            .count(),
        portals: sources
            .iter()
            .filter(|s| s.kind == RegistryKind::Portal)
            .count(),
    };

    // Preserve fields other tools may have added at the top level.
    let mut output: Map<String, Value> = if path.exists() {
        let content = std::fs::read_to_string(path).map_err(|e| LexhoundError::io(path, e))?;
        serde_json::from_str(&content)
            .map_err(|e| LexhoundError::parse(format!("registry {}: {e}", path.display())))?
    } else {
        Map::new()
    };

    output
        .entry("schema_version")
        .or_insert(json!(REGISTRY_SCHEMA_VERSION));
    output.insert("generated_at".into(), json!(generated_at));
    output.insert(
        "sources".into(),
        serde_json::to_value(&sources)
            .map_err(|e| LexhoundError::parse(format!("registry serialize: {e}")))?,
    );

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| LexhoundError::io(parent, e))?;
    }
    let mut content = serde_json::to_string_pretty(&Value::Object(output))
        .map_err(|e| LexhoundError::parse(format!("registry serialize: {e}")))?;
    content.push('\n');
    std::fs::write(path, content).map_err(|e| LexhoundError::io(path, e))?;

    tracing::debug!(
        total = summary.total,
        verified = summary.verified,
        "sources registry regenerated"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CatalogEntry;
    use lexhound_shared::JurisdictionCode;
    use std::collections::BTreeSet;

    fn sample_catalog() -> Catalog {
        let mut catalog = Catalog::default();
        catalog.upsert(
            JurisdictionCode::new("BB").expect("code"),
            CatalogEntry {
                official: BTreeSet::from(["https://laws.example.gov/".to_string()]),
                candidates: BTreeSet::from(["https://maybe.example.gov/".to_string()]),
                ..Default::default()
            },
        );
        catalog.upsert(
            JurisdictionCode::new("AA").expect("code"),
            CatalogEntry {
                portals: BTreeSet::from(["https://portal.example.gov/".to_string()]),
                ..Default::default()
            },
        );
        catalog
    }

    #[test]
    fn rows_are_deterministically_ordered() {
        let sources = registry_sources(&sample_catalog());
        let jurisdictions: Vec<&str> =
            sources.iter().map(|s| s.jurisdiction.as_str()).collect();
        assert_eq!(jurisdictions, vec!["AA", "BB", "BB"]);
        assert_eq!(sources[1].kind, RegistryKind::Verified);
        assert_eq!(sources[2].kind, RegistryKind::Candidate);
    }

    #[test]
    fn write_preserves_unknown_fields() {
        let path = std::env::temp_dir().join(format!(
            "lexhound-registry-{}.json",
            uuid::Uuid::now_v7()
        ));
        std::fs::write(&path, r#"{"schema_version": 2, "curator": "ops-team"}"#)
            .expect("seed file");

        let summary =
            write_registry(&path, &sample_catalog(), Utc::now()).expect("write registry");
        assert_eq!(summary.total, 3);
        assert_eq!(summary.verified, 1);
        assert_eq!(summary.portals, 1);

        let raw = std::fs::read_to_string(&path).expect("read back");
        let value: Value = serde_json::from_str(&raw).expect("parse");
        assert_eq!(value["curator"], "ops-team");
        assert_eq!(value["schema_version"], 2);
        assert_eq!(value["sources"].as_array().expect("sources").len(), 3);
        assert!(raw.ends_with('\n'));
        std::fs::remove_file(&path).ok();
    }
}
