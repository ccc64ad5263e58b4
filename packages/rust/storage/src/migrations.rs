//! SQL migration definitions for the attempt ledger.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a set of SQL statements executed as one batch.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial schema: attempts",
        sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- One row per processed (run, jurisdiction) pair. Counters record how far
-- the pipeline got; target selection reads them to impose cooldowns.
CREATE TABLE IF NOT EXISTS attempts (
    id              TEXT PRIMARY KEY,
    run_id          TEXT NOT NULL,
    jurisdiction    TEXT NOT NULL,
    validated       INTEGER NOT NULL DEFAULT 0,
    snapshots       INTEGER NOT NULL DEFAULT 0,
    law_pages       INTEGER NOT NULL DEFAULT 0,
    catalog_commits INTEGER NOT NULL DEFAULT 0,
    attempted_at    TEXT NOT NULL,
    UNIQUE(run_id, jurisdiction)
);

CREATE INDEX IF NOT EXISTS idx_attempts_jurisdiction
    ON attempts(jurisdiction, attempted_at);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}
