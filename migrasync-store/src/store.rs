//! SQLite-backed artifact log.
//!
//! The log is the authority for artifact identity and content. Identity is
//! `(namespace, name)`, enforced by a unique index; every get-or-create runs
//! inside an `IMMEDIATE` transaction so concurrent writers on the same
//! database file serialize on SQLite's write lock instead of an external one.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{
    params, Connection, ErrorCode, OpenFlags, OptionalExtension, Row, Transaction,
    TransactionBehavior,
};

use migrasync_core::config::is_sql_identifier;
use migrasync_core::types::{ArtifactRecord, NamespaceName};

use crate::error::StoreError;
use crate::schema;

/// Result of [`LogStore::ensure_table`]. Failures are reported, not raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapOutcome {
    AlreadyPresent,
    Created,
    Failed(String),
}

/// Handle on one artifact log table.
#[derive(Debug)]
pub struct LogStore {
    conn: Connection,
    table: String,
}

impl LogStore {
    /// Open (or create) the database file at `path`.
    ///
    /// `busy_timeout` bounds how long a writer waits for another process's
    /// transaction before failing with `SQLITE_BUSY`.
    pub fn open(path: &Path, table: &str, busy_timeout: Duration) -> Result<Self, StoreError> {
        check_table(table)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| StoreError::Io {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
            }
        }
        let conn = Connection::open(path)?;
        conn.busy_timeout(busy_timeout)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
            ",
        )?;
        Ok(Self {
            conn,
            table: table.to_string(),
        })
    }

    /// Open the database at `path` for reading only.
    ///
    /// Nothing is created and the journal mode is left alone. A missing file
    /// opens an empty in-memory database, so callers see a log without a
    /// table.
    pub fn open_read_only(path: &Path, table: &str, busy_timeout: Duration) -> Result<Self, StoreError> {
        check_table(table)?;
        if !path.is_file() {
            tracing::debug!("{} does not exist, reading an empty log", path.display());
            return Self::open_in_memory(table);
        }
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.busy_timeout(busy_timeout)?;
        Ok(Self {
            conn,
            table: table.to_string(),
        })
    }

    /// In-memory log (tests and dry experiments).
    pub fn open_in_memory(table: &str) -> Result<Self, StoreError> {
        check_table(table)?;
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn,
            table: table.to_string(),
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    // ── Bootstrap ────────────────────────────────────────────────

    pub fn table_exists(&self) -> Result<bool, StoreError> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
                params![self.table],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Create the table and its indexes when absent.
    ///
    /// Never fails: a table created out-of-band is the common case, so any
    /// database error is logged and returned as [`BootstrapOutcome::Failed`].
    /// Two processes racing here may both attempt creation; the loser's error
    /// is swallowed the same way.
    pub fn ensure_table(&self) -> BootstrapOutcome {
        match self.table_exists() {
            Ok(true) => return BootstrapOutcome::AlreadyPresent,
            Ok(false) => {}
            Err(e) => {
                tracing::warn!("could not inspect artifact log table {}: {e}", self.table);
                return BootstrapOutcome::Failed(e.to_string());
            }
        }

        tracing::info!("creating artifact log table {}", self.table);
        match self.create_table() {
            Ok(()) => BootstrapOutcome::Created,
            Err(e) => {
                tracing::warn!("failed to create artifact log table {}: {e}", self.table);
                BootstrapOutcome::Failed(e.to_string())
            }
        }
    }

    fn create_table(&self) -> Result<(), StoreError> {
        self.conn.execute(&schema::create_table_sql(&self.table), [])?;
        for sql in schema::create_index_sql(&self.table) {
            self.conn.execute(&sql, [])?;
            tracing::debug!("index created: {sql}");
        }
        Ok(())
    }

    // ── Queries ──────────────────────────────────────────────────

    pub fn exists(&self, namespace: &NamespaceName, name: &str) -> Result<bool, StoreError> {
        Ok(find(&self.conn, &self.table, namespace, name)?.is_some())
    }

    pub fn get(
        &self,
        namespace: &NamespaceName,
        name: &str,
    ) -> Result<Option<ArtifactRecord>, StoreError> {
        find(&self.conn, &self.table, namespace, name)
    }

    /// All records of `namespace`, oldest first (ties by insertion order).
    ///
    /// The order is the materialization order: artifacts that reference an
    /// earlier one in the same namespace must come after it.
    pub fn list_by_namespace(
        &self,
        namespace: &NamespaceName,
    ) -> Result<Vec<ArtifactRecord>, StoreError> {
        let sql = format!(
            "SELECT namespace, name, content, published_at FROM {} \
             WHERE namespace = ?1 ORDER BY published_at ASC, id ASC",
            self.table
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![namespace.as_str()], record_from_row)?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    // ── Writes ───────────────────────────────────────────────────

    /// Return the record for `(namespace, name)`, inserting it first if absent.
    ///
    /// First writer wins: on the existing-record path `content` and
    /// `published_at` are ignored. The bool is `true` only when this call
    /// inserted the row.
    pub fn get_or_create(
        &mut self,
        namespace: &NamespaceName,
        name: &str,
        content: &str,
        published_at: DateTime<Utc>,
    ) -> Result<(ArtifactRecord, bool), StoreError> {
        self.publish_with(namespace, name, content, published_at, |_| {
            Ok::<(), StoreError>(())
        })
    }

    /// [`get_or_create`](Self::get_or_create) that runs `on_created` before
    /// committing when the row is new.
    ///
    /// If `on_created` fails the transaction rolls back and the record is
    /// not published.
    pub fn publish_with<F, E>(
        &mut self,
        namespace: &NamespaceName,
        name: &str,
        content: &str,
        published_at: DateTime<Utc>,
        on_created: F,
    ) -> Result<(ArtifactRecord, bool), E>
    where
        F: FnOnce(&ArtifactRecord) -> Result<(), E>,
        E: From<StoreError>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(StoreError::from)?;
        let (record, created) =
            get_or_create_tx(&tx, &self.table, namespace, name, content, published_at)?;
        if created {
            on_created(&record)?;
        }
        tx.commit().map_err(StoreError::from)?;
        Ok((record, created))
    }
}

/// Get-or-create inside a caller-owned transaction.
pub fn get_or_create_tx(
    tx: &Transaction<'_>,
    table: &str,
    namespace: &NamespaceName,
    name: &str,
    content: &str,
    published_at: DateTime<Utc>,
) -> Result<(ArtifactRecord, bool), StoreError> {
    if let Some(existing) = find(tx, table, namespace, name)? {
        return Ok((existing, false));
    }

    let sql = format!(
        "INSERT INTO {table} (namespace, name, content, published_at) VALUES (?1, ?2, ?3, ?4)"
    );
    let inserted = tx.execute(
        &sql,
        params![namespace.as_str(), name, content, format_timestamp(published_at)],
    );
    match inserted {
        Ok(_) => Ok((
            ArtifactRecord {
                namespace: namespace.clone(),
                name: name.to_string(),
                content: content.to_string(),
                published_at: parse_timestamp(&format_timestamp(published_at))
                    .unwrap_or(published_at),
            },
            true,
        )),
        // Someone else's row satisfied the unique index first.
        Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
            match find(tx, table, namespace, name)? {
                Some(existing) => Ok((existing, false)),
                None => Err(StoreError::Database(rusqlite::Error::SqliteFailure(e, None))),
            }
        }
        Err(e) => Err(e.into()),
    }
}

fn find(
    conn: &Connection,
    table: &str,
    namespace: &NamespaceName,
    name: &str,
) -> Result<Option<ArtifactRecord>, StoreError> {
    let sql = format!(
        "SELECT namespace, name, content, published_at FROM {table} \
         WHERE namespace = ?1 AND name = ?2"
    );
    let record = conn
        .query_row(&sql, params![namespace.as_str(), name], record_from_row)
        .optional()?;
    Ok(record)
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<ArtifactRecord> {
    let namespace: String = row.get(0)?;
    let ts: String = row.get(3)?;
    let published_at = parse_timestamp(&ts).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(ArtifactRecord {
        namespace: NamespaceName::from(namespace),
        name: row.get(1)?,
        content: row.get(2)?,
        published_at,
    })
}

/// Fixed-width RFC 3339 (`2024-01-02T03:04:05.123456Z`) so text order is
/// chronological order.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw).map(|d| d.with_timezone(&Utc))
}

fn check_table(table: &str) -> Result<(), StoreError> {
    if is_sql_identifier(table) {
        Ok(())
    } else {
        Err(StoreError::InvalidTable(table.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
