use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result, anyhow};
use rusqlite::{Connection, params};

pub const MIGRATIONS_POLICY_MESSAGE: &str =
    "Run `camwiki db migrate` to apply pending schema migrations.";

/// Embedded schema steps, applied in order. Each applied step is recorded
/// in `schema_migrations`.
const SCHEMA_STEPS: &[(u32, &str, &str)] = &[
    (1, "baseline", include_str!("migrations/v001_baseline.sql")),
    (2, "indexes", include_str!("migrations/v002_indexes.sql")),
];

#[derive(Debug, Clone)]
pub struct MigrateReport {
    pub applied: Vec<AppliedMigration>,
    pub current_version: u32,
}

#[derive(Debug, Clone)]
pub struct AppliedMigration {
    pub version: u32,
    pub name: String,
}

/// Bring the database at `db_path` up to the latest schema version,
/// creating the file and its parent directory on first run. Every step
/// runs inside its own savepoint; a failing step rolls back and nothing
/// records it as applied.
pub fn run_migrations(db_path: &Path) -> Result<MigrateReport> {
    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let mut connection = open_connection(db_path)?;
    let from_version = schema_version(&connection)?;

    let mut applied = Vec::new();
    for &(version, name, sql) in SCHEMA_STEPS {
        if version <= from_version {
            continue;
        }
        apply_step(&mut connection, version, name, sql)
            .with_context(|| format!("failed to apply migration v{version:03}_{name}"))?;
        applied.push(AppliedMigration {
            version,
            name: name.to_string(),
        });
    }

    Ok(MigrateReport {
        current_version: schema_version(&connection)?,
        applied,
    })
}

/// How many schema steps the database at `db_path` still needs. A missing
/// file needs all of them.
pub fn pending_migration_count(db_path: &Path) -> Result<usize> {
    if !db_path.exists() {
        return Ok(SCHEMA_STEPS.len());
    }
    let connection = open_connection(db_path)?;
    let current = schema_version(&connection)?;
    Ok(SCHEMA_STEPS
        .iter()
        .filter(|(version, _, _)| *version > current)
        .count())
}

fn apply_step(connection: &mut Connection, version: u32, name: &str, sql: &str) -> Result<()> {
    let savepoint = connection.savepoint()?;
    savepoint.execute_batch(sql)?;
    savepoint.execute(
        "INSERT INTO schema_migrations (version, name, applied_at_unix) VALUES (?1, ?2, ?3)",
        params![i64::from(version), name, applied_at_unix()?],
    )?;
    // Dropping an uncommitted savepoint rolls the step back.
    savepoint.commit()?;
    Ok(())
}

fn schema_version(connection: &Connection) -> Result<u32> {
    let version: i64 = connection
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .context("failed to read schema version")?;
    u32::try_from(version).map_err(|_| anyhow!("schema version out of range: {version}"))
}

fn applied_at_unix() -> Result<i64> {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("system clock is before UNIX_EPOCH")?;
    i64::try_from(elapsed.as_secs()).context("timestamp does not fit into i64")
}

fn open_connection(db_path: &Path) -> Result<Connection> {
    let connection = Connection::open(db_path)
        .with_context(|| format!("failed to open {}", db_path.display()))?;
    connection.pragma_update(None, "foreign_keys", "ON")?;
    connection.pragma_update(None, "journal_mode", "WAL")?;
    connection
        .execute_batch(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                applied_at_unix INTEGER NOT NULL
            );",
        )
        .context("failed to create schema_migrations table")?;
    Ok(connection)
}
