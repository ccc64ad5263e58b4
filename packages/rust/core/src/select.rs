//! Target selection for the three run modes.

use std::collections::BTreeSet;

use lexhound_catalog::Catalog;
use lexhound_shared::config::RunConfig;
use lexhound_shared::{JurisdictionCode, RunMode};

/// Pick the jurisdictions this run will attempt, in processing order.
///
/// Force trusts the caller completely: the explicit target runs even when it
/// already has an official source or sits in cooldown. The bulk modes work
/// the missing-official backlog in sorted order, drop anything in `cooled`,
/// and bound the list: `max_tries` for min-sources, `max_targets` for scale.
pub fn select_targets(
    mode: RunMode,
    explicit: Option<&JurisdictionCode>,
    config: &RunConfig,
    catalog: &Catalog,
    universe: &[JurisdictionCode],
    cooled: &BTreeSet<JurisdictionCode>,
) -> Vec<JurisdictionCode> {
    if mode == RunMode::Force {
        return explicit.cloned().into_iter().collect();
    }

    let mut targets = catalog.missing_official(universe);
    targets.sort();
    targets.retain(|code| !cooled.contains(code));
    let cap = match mode {
        RunMode::MinSources => config.max_tries,
        _ => config.max_targets,
    };
    targets.truncate(cap);
    targets
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexhound_catalog::CatalogEntry;

    fn code(s: &str) -> JurisdictionCode {
        JurisdictionCode::new(s).expect("code")
    }

    fn backlog_catalog() -> Catalog {
        let mut catalog = Catalog::default();
        for c in ["CC", "AA", "BB", "DD"] {
            catalog.upsert(
                code(c),
                CatalogEntry {
                    missing_official: true,
                    ..Default::default()
                },
            );
        }
        catalog.upsert(
            code("EE"),
            CatalogEntry {
                official: std::collections::BTreeSet::from([
                    "https://laws.example.gov/".to_string()
                ]),
                ..Default::default()
            },
        );
        catalog
    }

    fn universe() -> Vec<JurisdictionCode> {
        ["CC", "AA", "BB", "DD", "EE"].map(code).to_vec()
    }

    #[test]
    fn force_runs_the_explicit_target_unconditionally() {
        let catalog = backlog_catalog();
        // EE already has an official URL and sits in cooldown; force ignores both.
        let cooled = BTreeSet::from([code("EE")]);
        let target = code("EE");
        let picked = select_targets(
            RunMode::Force,
            Some(&target),
            &RunConfig::default(),
            &catalog,
            &universe(),
            &cooled,
        );
        assert_eq!(picked, vec![code("EE")]);
    }

    #[test]
    fn min_sources_sorts_filters_and_caps() {
        let catalog = backlog_catalog();
        let cooled = BTreeSet::from([code("BB")]);
        let config = RunConfig {
            max_tries: 2,
            ..Default::default()
        };
        let picked = select_targets(
            RunMode::MinSources,
            None,
            &config,
            &catalog,
            &universe(),
            &cooled,
        );
        // Sorted backlog is AA BB CC DD; BB is cooling; cap keeps two.
        assert_eq!(picked, vec![code("AA"), code("CC")]);
    }

    #[test]
    fn scale_is_bounded_by_max_targets() {
        let catalog = backlog_catalog();
        let config = RunConfig {
            max_targets: 3,
            ..Default::default()
        };
        let picked = select_targets(
            RunMode::Scale,
            None,
            &config,
            &catalog,
            &universe(),
            &BTreeSet::new(),
        );
        assert_eq!(picked, vec![code("AA"), code("BB"), code("CC")]);
    }

    #[test]
    fn review_flagged_entries_never_get_picked() {
        let mut catalog = backlog_catalog();
        catalog.upsert(
            code("AA"),
            CatalogEntry {
                missing_official: true,
                needs_review: true,
                ..Default::default()
            },
        );
        let picked = select_targets(
            RunMode::MinSources,
            None,
            &RunConfig::default(),
            &catalog,
            &universe(),
            &BTreeSet::new(),
        );
        assert_eq!(picked, vec![code("BB"), code("CC"), code("DD")]);
    }
}
