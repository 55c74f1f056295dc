//! SQLite storage backend for sync-store.

use crate::error::{StoreError, StoreResult};
use crate::{admit, EventStore, UpsertSummary};
use async_trait::async_trait;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use std::path::Path;
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use sync_types::Event;
use tracing::{debug, warn};

/// SQLite-based event store.
///
/// Uses WAL mode so readers never block on a sync pass writing.
#[derive(Clone)]
pub struct SqliteEventStore {
    pool: SqlitePool,
}

impl SqliteEventStore {
    /// Open (or create) a replica database at `path`.
    pub async fn open(path: &Path) -> StoreResult<Self> {
        if path.as_os_str().is_empty() || path.is_dir() {
            return Err(StoreError::InvalidPath {
                path: path.to_path_buf(),
            });
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Create an in-memory store (for testing).
    pub async fn in_memory() -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(":memory:")?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        // One connection: every connection to :memory: is its own database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> StoreResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS events (
                id TEXT PRIMARY KEY,
                pubkey TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                kind INTEGER NOT NULL,
                tags TEXT NOT NULL,
                content TEXT NOT NULL,
                sig TEXT NOT NULL,
                received_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_events_created_at ON events(created_at)")
            .execute(&self.pool)
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_events_pubkey ON events(pubkey)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    fn current_timestamp() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0)
    }
}

#[async_trait]
impl EventStore for SqliteEventStore {
    async fn upsert_many(&self, events: &[Event]) -> StoreResult<UpsertSummary> {
        let mut summary = UpsertSummary::default();
        if events.is_empty() {
            return Ok(summary);
        }

        let received_at = Self::current_timestamp();
        let mut tx = self.pool.begin().await?;

        for event in events {
            if let Err(rejected) = admit(event) {
                warn!(id = %rejected.id, reason = %rejected.reason, "Rejected malformed event");
                summary.rejected.push(rejected);
                continue;
            }

            let tags = serde_json::to_string(&event.tags)?;
            let result = sqlx::query(
                r#"
                INSERT INTO events (id, pubkey, created_at, kind, tags, content, sig, received_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                ON CONFLICT(id) DO NOTHING
                "#,
            )
            .bind(&event.id)
            .bind(&event.author)
            .bind(event.created_at as i64)
            .bind(i64::from(event.kind))
            .bind(tags)
            .bind(&event.content)
            .bind(&event.sig)
            .bind(received_at)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                summary.duplicates += 1;
            } else {
                summary.inserted += 1;
            }
        }

        tx.commit().await?;

        debug!(
            inserted = summary.inserted,
            duplicates = summary.duplicates,
            rejected = summary.rejected.len(),
            "Upserted batch"
        );
        Ok(summary)
    }

    async fn get_all(&self) -> StoreResult<Vec<Event>> {
        let rows = sqlx::query_as::<_, EventRow>(
            r#"
            SELECT id, pubkey, created_at, kind, tags, content, sig
            FROM events
            ORDER BY created_at DESC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Event::try_from).collect()
    }

    async fn latest_timestamp(&self) -> StoreResult<Option<u64>> {
        let latest: Option<i64> = sqlx::query_scalar("SELECT MAX(created_at) FROM events")
            .fetch_one(&self.pool)
            .await?;

        Ok(latest.map(|ts| ts.max(0) as u64))
    }

    async fn count(&self) -> StoreResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM events")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.max(0) as u64)
    }
}

/// Internal row type for SQLite queries.
#[derive(sqlx::FromRow)]
struct EventRow {
    id: String,
    pubkey: String,
    created_at: i64,
    kind: i64,
    tags: String,
    content: String,
    sig: String,
}

impl TryFrom<EventRow> for Event {
    type Error = StoreError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        let corrupt = |reason: &str| StoreError::CorruptRow {
            id: row.id.clone(),
            reason: reason.to_string(),
        };
        let created_at =
            u64::try_from(row.created_at).map_err(|_| corrupt("negative created_at"))?;
        let kind = u32::try_from(row.kind).map_err(|_| corrupt("kind out of range"))?;
        let tags = serde_json::from_str(&row.tags)?;

        Ok(Event {
            id: row.id,
            author: row.pubkey,
            created_at,
            kind,
            tags,
            content: row.content,
            sig: row.sig,
        })
    }
}
