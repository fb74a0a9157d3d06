use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use rand::Rng;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

use crate::engine::lifecycle::{ConfigStore, Variant, VariantAssigner};

pub mod models;
use models::*;

/// Thread-safe SQLite handle (single connection with mutex)
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the SQLite database at the given path
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database {}", path))?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        let db = Database {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("database connection mutex poisoned"))
    }

    /// Run schema migrations (idempotent)
    fn run_migrations(&self) -> Result<()> {
        self.conn()?.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    // ── Key-value records ─────────────────────────────────────────────────────

    pub fn get_record(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn()?;
        let value: Option<String> = conn
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn upsert_record(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET
                value=excluded.value,
                updated_at=excluded.updated_at",
            params![key, value, Utc::now()],
        )?;
        Ok(())
    }

    // ── Graded picks ──────────────────────────────────────────────────────────

    pub fn insert_graded_pick(&self, pick: &GradedPick) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO graded_picks (
                sport, home_team, away_team, predicted_spread,
                predicted_total, confidence, outcome, graded_at
             ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8)",
            params![
                pick.sport,
                pick.home_team,
                pick.away_team,
                pick.predicted_spread,
                pick.predicted_total,
                pick.confidence,
                pick.outcome.as_str(),
                pick.graded_at,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn list_graded_picks(&self) -> Result<Vec<GradedPick>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, sport, home_team, away_team, predicted_spread,
                    predicted_total, confidence, outcome, graded_at
             FROM graded_picks ORDER BY graded_at ASC, id ASC",
        )?;
        let picks = stmt
            .query_map([], map_graded_pick)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(picks)
    }

    // ── Experiment assignments ────────────────────────────────────────────────

    pub fn get_assignment(
        &self,
        caller_id: &str,
        experiment: &str,
    ) -> Result<Option<ExperimentAssignment>> {
        let conn = self.conn()?;
        let assignment = conn
            .query_row(
                "SELECT caller_id, experiment, variant, assigned_at
                 FROM experiment_assignments WHERE caller_id = ?1 AND experiment = ?2",
                params![caller_id, experiment],
                |row| {
                    Ok(ExperimentAssignment {
                        caller_id: row.get(0)?,
                        experiment: row.get(1)?,
                        variant: row.get(2)?,
                        assigned_at: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(assignment)
    }

    /// Insert an assignment unless one already exists; returns the stored one.
    pub fn insert_assignment_if_absent(
        &self,
        assignment: &ExperimentAssignment,
    ) -> Result<ExperimentAssignment> {
        {
            let conn = self.conn()?;
            conn.execute(
                "INSERT OR IGNORE INTO experiment_assignments
                    (caller_id, experiment, variant, assigned_at)
                 VALUES (?1,?2,?3,?4)",
                params![
                    assignment.caller_id,
                    assignment.experiment,
                    assignment.variant,
                    assignment.assigned_at,
                ],
            )?;
        }
        self.get_assignment(&assignment.caller_id, &assignment.experiment)?
            .context("assignment missing right after insert")
    }
}

impl ConfigStore for Database {
    fn load(&self, key: &str) -> Result<Option<serde_json::Value>> {
        self.get_record(key)?
            .map(|raw| {
                serde_json::from_str(&raw)
                    .with_context(|| format!("Stored record {} is not valid JSON", key))
            })
            .transpose()
    }

    fn upsert(&self, key: &str, value: &serde_json::Value) -> Result<()> {
        self.upsert_record(key, &value.to_string())
    }
}

impl VariantAssigner for Database {
    /// First sight of a caller draws a 50/50 variant; afterwards the stored
    /// variant is returned.
    fn assign(&self, caller_id: &str, experiment: &str) -> Result<Variant> {
        if let Some(existing) = self.get_assignment(caller_id, experiment)? {
            return Variant::parse(&existing.variant)
                .with_context(|| format!("Unknown stored variant {}", existing.variant));
        }

        let drawn = if rand::thread_rng().gen_bool(0.5) {
            Variant::Treatment
        } else {
            Variant::Control
        };
        let stored = self.insert_assignment_if_absent(&ExperimentAssignment {
            caller_id: caller_id.to_string(),
            experiment: experiment.to_string(),
            variant: drawn.as_str().to_string(),
            assigned_at: Utc::now(),
        })?;
        debug!(
            "Assigned {} to {} in experiment {}",
            caller_id, stored.variant, experiment
        );
        Variant::parse(&stored.variant)
            .with_context(|| format!("Unknown stored variant {}", stored.variant))
    }
}

// ── SQL helpers ────────────────────────────────────────────────────────────────

fn map_graded_pick(row: &rusqlite::Row) -> rusqlite::Result<GradedPick> {
    let outcome: String = row.get(7)?;
    let outcome = PickOutcome::parse(&outcome).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            7,
            rusqlite::types::Type::Text,
            format!("unknown pick outcome {}", outcome).into(),
        )
    })?;
    Ok(GradedPick {
        id: row.get(0)?,
        sport: row.get(1)?,
        home_team: row.get(2)?,
        away_team: row.get(3)?,
        predicted_spread: row.get(4)?,
        predicted_total: row.get(5)?,
        confidence: row.get(6)?,
        outcome,
        graded_at: row.get(8)?,
    })
}

/// SQLite schema (idempotent CREATE IF NOT EXISTS)
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS kv_store (
    key         TEXT    PRIMARY KEY,
    value       TEXT    NOT NULL,
    updated_at  TEXT    NOT NULL
);

CREATE TABLE IF NOT EXISTS graded_picks (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    sport             TEXT    NOT NULL,
    home_team         TEXT    NOT NULL,
    away_team         TEXT    NOT NULL,
    predicted_spread  REAL    NOT NULL,
    predicted_total   REAL,
    confidence        REAL    NOT NULL,
    outcome           TEXT    NOT NULL,
    graded_at         TEXT    NOT NULL
);

CREATE TABLE IF NOT EXISTS experiment_assignments (
    caller_id   TEXT    NOT NULL,
    experiment  TEXT    NOT NULL,
    variant     TEXT    NOT NULL,
    assigned_at TEXT    NOT NULL,
    PRIMARY KEY (caller_id, experiment)
);

CREATE INDEX IF NOT EXISTS idx_graded_picks_sport ON graded_picks(sport);
"#;
