//! libSQL-backed attempt ledger.
//!
//! Every processed (run, jurisdiction) pair leaves one row recording how far
//! the pipeline got: candidates validated, snapshots captured, law pages
//! found, catalog commits made. Target selection reads the ledger instead of
//! re-parsing the previous run report: a jurisdiction whose most recent
//! attempt made zero progress sits out the cooldown window before it is
//! eligible again.

mod migrations;

use std::collections::BTreeSet;
use std::path::Path;

use chrono::{DateTime, Utc};
use libsql::{Connection, Database, params};
use uuid::Uuid;

use lexhound_shared::{JurisdictionCode, LexhoundError, Result};

// ---------------------------------------------------------------------------
// AttemptRecord
// ---------------------------------------------------------------------------

/// One pipeline attempt against one jurisdiction.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptRecord {
    pub run_id: String,
    pub jurisdiction: JurisdictionCode,
    /// Candidates that passed live validation.
    pub validated: u32,
    /// Snapshots captured.
    pub snapshots: u32,
    /// Law pages found by the crawl.
    pub law_pages: u32,
    /// Catalog entries changed.
    pub catalog_commits: u32,
    pub attempted_at: DateTime<Utc>,
}

impl AttemptRecord {
    /// An attempt that neither validated a candidate nor captured anything.
    /// These trigger the selection cooldown.
    pub fn zero_progress(&self) -> bool {
        self.validated == 0 && self.snapshots == 0
    }
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// Ledger handle wrapping a local libSQL database.
pub struct Ledger {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
}

impl Ledger {
    /// Open or create the ledger database at `path`.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| LexhoundError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| LexhoundError::Ledger(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| LexhoundError::Ledger(e.to_string()))?;

        let ledger = Self { db, conn };
        ledger.run_migrations().await?;
        Ok(ledger)
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying ledger migration"
                );
                self.conn.execute_batch(migration.sql).await.map_err(|e| {
                    LexhoundError::Ledger(format!("migration v{} failed: {e}", migration.version))
                })?;
            }
        }
        Ok(())
    }

    /// Current schema version, or 0 if no migrations have been applied.
    async fn schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    /// Record one attempt. A (run, jurisdiction) pair can only be recorded
    /// once; a second insert is a bug and surfaces as a constraint error.
    pub async fn record_attempt(&self, record: &AttemptRecord) -> Result<()> {
        let id = Uuid::now_v7().to_string();
        self.conn
            .execute(
                "INSERT INTO attempts
                     (id, run_id, jurisdiction, validated, snapshots, law_pages,
                      catalog_commits, attempted_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    id.as_str(),
                    record.run_id.as_str(),
                    record.jurisdiction.as_str(),
                    i64::from(record.validated),
                    i64::from(record.snapshots),
                    i64::from(record.law_pages),
                    i64::from(record.catalog_commits),
                    record.attempted_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| LexhoundError::Ledger(e.to_string()))?;
        Ok(())
    }

    /// Jurisdictions whose most recent attempt made zero progress within the
    /// cooldown window. Target selection skips these.
    pub async fn cooled_down(
        &self,
        now: DateTime<Utc>,
        cooldown_hours: i64,
    ) -> Result<BTreeSet<JurisdictionCode>> {
        let cutoff = (now - chrono::Duration::hours(cooldown_hours)).to_rfc3339();
        let mut rows = self
            .conn
            .query(
                "SELECT a.jurisdiction
                 FROM attempts a
                 JOIN (
                     SELECT jurisdiction, MAX(attempted_at) AS latest
                     FROM attempts
                     GROUP BY jurisdiction
                 ) last
                   ON last.jurisdiction = a.jurisdiction
                  AND last.latest = a.attempted_at
                 WHERE a.validated = 0
                   AND a.snapshots = 0
                   AND a.attempted_at > ?1",
                params![cutoff.as_str()],
            )
            .await
            .map_err(|e| LexhoundError::Ledger(e.to_string()))?;

        let mut codes = BTreeSet::new();
        while let Ok(Some(row)) = rows.next().await {
            let raw: String = row.get(0).map_err(|e| LexhoundError::Ledger(e.to_string()))?;
            codes.insert(JurisdictionCode::new(&raw)?);
        }
        Ok(codes)
    }

    /// Most recent attempt for one jurisdiction, if any.
    pub async fn last_attempt(&self, code: &JurisdictionCode) -> Result<Option<AttemptRecord>> {
        let mut rows = self
            .conn
            .query(
                "SELECT run_id, jurisdiction, validated, snapshots, law_pages,
                        catalog_commits, attempted_at
                 FROM attempts
                 WHERE jurisdiction = ?1
                 ORDER BY attempted_at DESC
                 LIMIT 1",
                params![code.as_str()],
            )
            .await
            .map_err(|e| LexhoundError::Ledger(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_attempt(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(LexhoundError::Ledger(e.to_string())),
        }
    }
}

fn row_to_attempt(row: &libsql::Row) -> Result<AttemptRecord> {
    let raw_code: String = row.get(1).map_err(|e| LexhoundError::Ledger(e.to_string()))?;
    let raw_time: String = row.get(6).map_err(|e| LexhoundError::Ledger(e.to_string()))?;
    Ok(AttemptRecord {
        run_id: row.get(0).map_err(|e| LexhoundError::Ledger(e.to_string()))?,
        jurisdiction: JurisdictionCode::new(&raw_code)?,
        validated: row.get::<u32>(2).map_err(|e| LexhoundError::Ledger(e.to_string()))?,
        snapshots: row.get::<u32>(3).map_err(|e| LexhoundError::Ledger(e.to_string()))?,
        law_pages: row.get::<u32>(4).map_err(|e| LexhoundError::Ledger(e.to_string()))?,
        catalog_commits: row
            .get::<u32>(5)
            .map_err(|e| LexhoundError::Ledger(e.to_string()))?,
        attempted_at: chrono::DateTime::parse_from_rfc3339(&raw_time)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| LexhoundError::Ledger(format!("invalid attempted_at: {e}")))?,
    })
}
