//! Allow/deny rule files and [`TrustRules`] assembly.
//!
//! Rule files are optional: a missing file is an empty list. The assembled
//! [`TrustRules`] value also carries the catalog's host view so the trust
//! validator can apply transitive root-domain trust without touching disk.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use lexhound_shared::{DataDirs, LexhoundError, Result};
use lexhound_trust::TrustRules;

use crate::Catalog;

/// `sources/allowlist.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AllowlistFile {
    /// Wildcard-suffix patterns applied to every jurisdiction.
    #[serde(default)]
    pub suffixes: Vec<String>,

    /// Per-jurisdiction allow domains.
    #[serde(default)]
    pub domains: BTreeMap<String, Vec<String>>,
}

/// `sources/denylist.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DenylistFile {
    /// Hosts denied exactly or by suffix.
    #[serde(default)]
    pub hosts: Vec<String>,

    /// Substrings denied anywhere in host or path.
    #[serde(default)]
    pub substrings: Vec<String>,
}

pub fn load_allowlist(path: &Path) -> Result<AllowlistFile> {
    load_optional(path, "allowlist")
}

pub fn load_denylist(path: &Path) -> Result<DenylistFile> {
    load_optional(path, "denylist")
}

fn load_optional<T: Default + serde::de::DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    if !path.exists() {
        tracing::debug!(?path, "{what} file not found, using empty rules");
        return Ok(T::default());
    }
    let content = std::fs::read_to_string(path).map_err(|e| LexhoundError::io(path, e))?;
    serde_json::from_str(&content)
        .map_err(|e| LexhoundError::parse(format!("{what} {}: {e}", path.display())))
}

/// Assemble the full rule set the trust validator consumes.
pub fn trust_rules(dirs: &DataDirs, catalog: &Catalog) -> Result<TrustRules> {
    let allow = load_allowlist(&dirs.allowlist_file())?;
    let deny = load_denylist(&dirs.denylist_file())?;
    Ok(TrustRules {
        allow_suffixes: allow.suffixes,
        allow_domains: allow.domains,
        deny_hosts: deny.hosts,
        deny_substrings: deny.substrings,
        catalog_hosts: catalog.host_view(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CatalogEntry;
    use lexhound_shared::JurisdictionCode;
    use std::collections::BTreeSet;

    fn temp_dirs() -> DataDirs {
        let root = std::env::temp_dir().join(format!("lexhound-rules-{}", uuid::Uuid::now_v7()));
        let dirs = DataDirs::new(&root);
        dirs.ensure().expect("create dirs");
        dirs
    }

    #[test]
    fn missing_rule_files_mean_empty_rules() {
        let dirs = temp_dirs();
        let rules = trust_rules(&dirs, &Catalog::default()).expect("rules");
        assert!(rules.allow_suffixes.is_empty());
        assert!(rules.deny_hosts.is_empty());
        assert!(rules.catalog_hosts.is_empty());
        std::fs::remove_dir_all(dirs.root()).ok();
    }

    #[test]
    fn rules_wire_through_to_the_validator() {
        let dirs = temp_dirs();
        std::fs::write(
            dirs.allowlist_file(),
            r#"{"suffixes": ["*.gc.ca"], "domains": {"AL": ["kuvendi.al"]}}"#,
        )
        .expect("write allowlist");
        std::fs::write(dirs.denylist_file(), r#"{"hosts": ["bad.example"]}"#)
            .expect("write denylist");

        let mut catalog = Catalog::default();
        catalog.upsert(
            JurisdictionCode::new("AD").expect("code"),
            CatalogEntry {
                portals: BTreeSet::from(["https://www.exteriors.ad/".to_string()]),
                ..Default::default()
            },
        );

        let rules = trust_rules(&dirs, &catalog).expect("rules");
        let al = JurisdictionCode::new("AL").expect("code");
        let ad = JurisdictionCode::new("AD").expect("code");

        assert!(lexhound_trust::validate("https://kuvendi.al/ligj", &al, &rules).is_allowed());
        assert!(
            lexhound_trust::validate("https://consell.exteriors.ad/", &ad, &rules).is_allowed()
        );
        assert!(
            !lexhound_trust::validate("https://sub.bad.example/", &al, &rules).is_allowed()
        );
        std::fs::remove_dir_all(dirs.root()).ok();
    }
}
