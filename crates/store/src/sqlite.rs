use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use domain::{
    DomainError, DomainResult, InventoryRepository, InventorySnapshot, Migration,
    MigrationRepository, MigrationStatus,
};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};
use uuid::Uuid;

type DbPool = Pool<SqliteConnectionManager>;

const MIGRATION_COLUMNS: &str = "id, name, source_agent_id, target_agent_id, status, plan, \
     current_task, progress_percent, completed_tasks, failed_tasks, created_at, started_at, \
     completed_at, success_message, error_message";

/// SQLite-backed inventory and migration store
///
/// Snapshots are kept whole as a JSON payload next to the columns used for
/// lookup. Migrations keep scalar fields in columns and the plan and task
/// lists as JSON.
#[derive(Clone)]
pub struct SqliteStore {
    pool: Arc<DbPool>,
}

impl SqliteStore {
    /// Open (or create) the database file and prepare the schema
    pub fn open<P: AsRef<Path>>(path: P, pool_size: u32) -> DomainResult<Self> {
        let manager = SqliteConnectionManager::file(path.as_ref())
            .with_init(|conn| conn.busy_timeout(Duration::from_secs(5)));
        let pool = Pool::builder()
            .max_size(pool_size.max(1))
            .build(manager)
            .map_err(storage)?;

        {
            let conn = pool.get().map_err(storage)?;
            Self::init_schema(&conn)?;
        }

        info!(path = %path.as_ref().display(), pool_size, "SQLite store ready");
        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    fn init_schema(conn: &Connection) -> DomainResult<()> {
        // journal_mode answers with a row, so it cannot go through execute_batch
        let mode: String = conn
            .query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))
            .map_err(storage)?;
        debug!("journal mode: {}", mode);

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS inventories (
                id TEXT PRIMARY KEY,
                agent_id TEXT NOT NULL,
                captured_at TEXT NOT NULL,
                payload TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS migrations (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                source_agent_id TEXT NOT NULL,
                target_agent_id TEXT,
                status TEXT NOT NULL,
                plan TEXT,
                current_task TEXT,
                progress_percent REAL NOT NULL DEFAULT 0,
                completed_tasks TEXT NOT NULL DEFAULT '[]',
                failed_tasks TEXT NOT NULL DEFAULT '[]',
                created_at TEXT NOT NULL,
                started_at TEXT,
                completed_at TEXT,
                success_message TEXT,
                error_message TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_inventories_agent ON inventories(agent_id, captured_at DESC);
            CREATE INDEX IF NOT EXISTS idx_migrations_status ON migrations(status, created_at ASC);

            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            "#,
        )
        .map_err(storage)?;

        Ok(())
    }

    fn conn(&self) -> DomainResult<PooledConnection<SqliteConnectionManager>> {
        self.pool.get().map_err(storage)
    }

    fn parse_migration_row(row: &Row) -> rusqlite::Result<Migration> {
        let id: String = row.get(0)?;
        let status: String = row.get(4)?;
        let plan: Option<String> = row.get(5)?;
        let completed: String = row.get(8)?;
        let failed: String = row.get(9)?;
        let created_at: String = row.get(10)?;
        let started_at: Option<String> = row.get(11)?;
        let completed_at: Option<String> = row.get(12)?;

        Ok(Migration {
            id: Uuid::parse_str(&id).map_err(|e| conversion(0, e))?,
            name: row.get(1)?,
            source_agent_id: row.get(2)?,
            target_agent_id: row.get(3)?,
            status: status
                .parse::<MigrationStatus>()
                .map_err(|e| conversion(4, e))?,
            plan: plan
                .map(|text| serde_json::from_str(&text))
                .transpose()
                .map_err(|e| conversion(5, e))?,
            current_task: row.get(6)?,
            progress_percent: row.get(7)?,
            completed_tasks: serde_json::from_str(&completed).map_err(|e| conversion(8, e))?,
            failed_tasks: serde_json::from_str(&failed).map_err(|e| conversion(9, e))?,
            created_at: parse_timestamp(&created_at).map_err(|e| conversion(10, e))?,
            started_at: started_at
                .as_deref()
                .map(parse_timestamp)
                .transpose()
                .map_err(|e| conversion(11, e))?,
            completed_at: completed_at
                .as_deref()
                .map(parse_timestamp)
                .transpose()
                .map_err(|e| conversion(12, e))?,
            success_message: row.get(13)?,
            error_message: row.get(14)?,
        })
    }
}

#[async_trait]
impl InventoryRepository for SqliteStore {
    #[instrument(skip(self, snapshot), fields(agent_id = %snapshot.agent_id))]
    async fn insert_snapshot(&self, snapshot: InventorySnapshot) -> DomainResult<()> {
        let payload = serde_json::to_string(&snapshot)?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO inventories (id, agent_id, captured_at, payload) VALUES (?1, ?2, ?3, ?4)",
            params![
                snapshot.id.to_string(),
                snapshot.agent_id,
                format_timestamp(&snapshot.captured_at),
                payload,
            ],
        )
        .map_err(storage)?;

        debug!("Stored inventory snapshot {}", snapshot.id);
        Ok(())
    }

    #[instrument(skip(self, snapshot), fields(snapshot_id = %snapshot.id))]
    async fn update_snapshot(&self, snapshot: InventorySnapshot) -> DomainResult<()> {
        let payload = serde_json::to_string(&snapshot)?;
        let conn = self.conn()?;
        let updated = conn
            .execute(
                "UPDATE inventories SET agent_id = ?2, captured_at = ?3, payload = ?4 WHERE id = ?1",
                params![
                    snapshot.id.to_string(),
                    snapshot.agent_id,
                    format_timestamp(&snapshot.captured_at),
                    payload,
                ],
            )
            .map_err(storage)?;

        if updated == 0 {
            return Err(DomainError::NotFound(format!(
                "inventory snapshot {}",
                snapshot.id
            )));
        }
        Ok(())
    }

    async fn latest_snapshot(&self, agent_id: &str) -> DomainResult<Option<InventorySnapshot>> {
        let conn = self.conn()?;
        let payload: Option<String> = conn
            .query_row(
                "SELECT payload FROM inventories WHERE agent_id = ?1
                 ORDER BY captured_at DESC, rowid DESC LIMIT 1",
                params![agent_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(storage)?;

        payload
            .map(|text| serde_json::from_str(&text).map_err(DomainError::from))
            .transpose()
    }
}

#[async_trait]
impl MigrationRepository for SqliteStore {
    async fn get(&self, id: Uuid) -> DomainResult<Option<Migration>> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {MIGRATION_COLUMNS} FROM migrations WHERE id = ?1"),
            params![id.to_string()],
            Self::parse_migration_row,
        )
        .optional()
        .map_err(storage)
    }

    #[instrument(skip(self, migration), fields(migration_id = %migration.id, status = %migration.status))]
    async fn save(&self, migration: &Migration) -> DomainResult<()> {
        let (plan, completed, failed) = encode_json_columns(migration)?;

        let conn = self.conn()?;
        conn.execute(
            &format!(
                "INSERT INTO migrations ({MIGRATION_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
                 ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name,
                    source_agent_id = excluded.source_agent_id,
                    target_agent_id = excluded.target_agent_id,
                    status = excluded.status,
                    plan = excluded.plan,
                    current_task = excluded.current_task,
                    progress_percent = excluded.progress_percent,
                    completed_tasks = excluded.completed_tasks,
                    failed_tasks = excluded.failed_tasks,
                    created_at = excluded.created_at,
                    started_at = excluded.started_at,
                    completed_at = excluded.completed_at,
                    success_message = excluded.success_message,
                    error_message = excluded.error_message"
            ),
            params![
                migration.id.to_string(),
                migration.name,
                migration.source_agent_id,
                migration.target_agent_id,
                migration.status.as_str(),
                plan,
                migration.current_task,
                migration.progress_percent,
                completed,
                failed,
                format_timestamp(&migration.created_at),
                migration.started_at.as_ref().map(format_timestamp),
                migration.completed_at.as_ref().map(format_timestamp),
                migration.success_message,
                migration.error_message,
            ],
        )
        .map_err(storage)?;

        Ok(())
    }

    #[instrument(skip(self, migration), fields(migration_id = %migration.id, status = %migration.status))]
    async fn save_if_status(
        &self,
        migration: &Migration,
        expected: MigrationStatus,
    ) -> DomainResult<bool> {
        let (plan, completed, failed) = encode_json_columns(migration)?;

        let conn = self.conn()?;
        // a single UPDATE is atomic across connections and processes
        let updated = conn
            .execute(
                "UPDATE migrations SET
                    name = ?2, source_agent_id = ?3, target_agent_id = ?4, status = ?5,
                    plan = ?6, current_task = ?7, progress_percent = ?8,
                    completed_tasks = ?9, failed_tasks = ?10, created_at = ?11,
                    started_at = ?12, completed_at = ?13, success_message = ?14,
                    error_message = ?15
                 WHERE id = ?1 AND status = ?16",
                params![
                    migration.id.to_string(),
                    migration.name,
                    migration.source_agent_id,
                    migration.target_agent_id,
                    migration.status.as_str(),
                    plan,
                    migration.current_task,
                    migration.progress_percent,
                    completed,
                    failed,
                    format_timestamp(&migration.created_at),
                    migration.started_at.as_ref().map(format_timestamp),
                    migration.completed_at.as_ref().map(format_timestamp),
                    migration.success_message,
                    migration.error_message,
                    expected.as_str(),
                ],
            )
            .map_err(storage)?;

        if updated == 0 {
            debug!(expected = %expected, "Conditional save skipped");
        }
        Ok(updated == 1)
    }

    async fn list(&self, status: Option<MigrationStatus>) -> DomainResult<Vec<Migration>> {
        let conn = self.conn()?;
        let migrations = match status {
            Some(status) => {
                let mut stmt = conn
                    .prepare(&format!(
                        "SELECT {MIGRATION_COLUMNS} FROM migrations WHERE status = ?1
                         ORDER BY created_at ASC, rowid ASC"
                    ))
                    .map_err(storage)?;
                let rows = stmt
                    .query_map(params![status.as_str()], Self::parse_migration_row)
                    .map_err(storage)?;
                rows.collect::<Result<Vec<_>, _>>().map_err(storage)?
            }
            None => {
                let mut stmt = conn
                    .prepare(&format!(
                        "SELECT {MIGRATION_COLUMNS} FROM migrations ORDER BY created_at ASC, rowid ASC"
                    ))
                    .map_err(storage)?;
                let rows = stmt
                    .query_map([], Self::parse_migration_row)
                    .map_err(storage)?;
                rows.collect::<Result<Vec<_>, _>>().map_err(storage)?
            }
        };

        Ok(migrations)
    }
}

/// Plan, completed and failed task lists as stored JSON text
fn encode_json_columns(migration: &Migration) -> DomainResult<(Option<String>, String, String)> {
    let plan = migration
        .plan
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;
    let completed = serde_json::to_string(&migration.completed_tasks)?;
    let failed = serde_json::to_string(&migration.failed_tasks)?;
    Ok((plan, completed, failed))
}

/// Fixed-width UTC text so lexical order matches time order
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_timestamp(text: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(text).map(|ts| ts.with_timezone(&Utc))
}

fn conversion<E>(column: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(err))
}

fn storage(err: impl std::fmt::Display) -> DomainError {
    DomainError::Storage(err.to_string())
}
