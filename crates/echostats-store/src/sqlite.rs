//! SQLite implementation of the RecordStore trait.
//!
//! This is the primary storage backend for echostats. It uses rusqlite with
//! bundled SQLite, wrapped in async via tokio::spawn_blocking.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::types::{Value, ValueRef};
use rusqlite::{params, params_from_iter, Connection, Transaction};

use echostats_core::{union_columns, FieldValue, Record};

use crate::error::{Result, StoreError};
use crate::migration::{self, RECEPTIONS_TABLE};
use crate::traits::{RecordStore, SessionSummary};

/// Upper bound on bound parameters per statement (SQLITE_MAX_VARIABLE_NUMBER
/// of the bundled library).
const MAX_BIND_PARAMS: usize = 32_766;

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteStore {
    /// The SQLite connection, protected by a mutex.
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a blocking operation on the connection off the async runtime.
    async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().map_err(|e| {
                StoreError::Database(rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_LOCKED),
                    Some(format!("mutex poisoned: {}", e)),
                ))
            })?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Join(format!("spawn_blocking failed: {}", e)))?
    }
}

fn to_sql_value(value: &FieldValue) -> Value {
    match value {
        FieldValue::Null => Value::Null,
        FieldValue::Integer(v) => Value::Integer(*v),
        FieldValue::Text(s) => Value::Text(s.clone()),
    }
}

fn from_sql_value(value: ValueRef<'_>) -> Result<FieldValue> {
    match value {
        ValueRef::Null => Ok(FieldValue::Null),
        ValueRef::Integer(v) => Ok(FieldValue::Integer(v)),
        ValueRef::Real(v) => Ok(FieldValue::Text(v.to_string())),
        ValueRef::Text(bytes) => Ok(FieldValue::Text(String::from_utf8_lossy(bytes).into_owned())),
        ValueRef::Blob(_) => Err(StoreError::InvalidData("unexpected blob column".into())),
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Write a batch inside one transaction.
///
/// The transaction is closed on every path: committed when all rows were
/// written, rolled back otherwise, so a failed batch leaves nothing behind
/// and never holds the database open.
fn insert_records(conn: &mut Connection, records: &[Record]) -> Result<usize> {
    if records.is_empty() {
        return Ok(0);
    }

    let tx = conn.transaction()?;
    match write_rows(&tx, records) {
        Ok(written) => {
            tx.commit()?;
            Ok(written)
        }
        Err(e) => {
            if let Err(rollback) = tx.rollback() {
                tracing::warn!(error = %rollback, "rollback after failed batch also failed");
            }
            Err(e)
        }
    }
}

fn write_rows(tx: &Transaction<'_>, records: &[Record]) -> Result<usize> {
    let columns = union_columns(records);

    if columns.is_empty() {
        let sql = format!("INSERT INTO {RECEPTIONS_TABLE} DEFAULT VALUES");
        for _ in records {
            tx.execute(&sql, [])?;
        }
        return Ok(records.len());
    }

    let column_list = columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ");
    let row_placeholders = format!("({})", vec!["?"; columns.len()].join(", "));
    let rows_per_statement = (MAX_BIND_PARAMS / columns.len()).max(1);

    let mut written = 0;
    for chunk in records.chunks(rows_per_statement) {
        let sql = format!(
            "INSERT INTO {RECEPTIONS_TABLE} ({column_list}) VALUES {}",
            vec![row_placeholders.as_str(); chunk.len()].join(", ")
        );
        let values = chunk
            .iter()
            .flat_map(|record| columns.iter().map(move |c| to_sql_value(record.get_or_null(c))));
        written += tx.execute(&sql, params_from_iter(values))?;
    }

    Ok(written)
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn insert_batch(&self, records: Vec<Record>) -> Result<usize> {
        self.with_conn(move |conn| insert_records(conn, &records)).await
    }

    async fn count_receptions(&self) -> Result<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                &format!("SELECT COUNT(*) FROM {RECEPTIONS_TABLE}"),
                [],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
        .await
    }

    async fn receptions_for(&self, nonce: &str) -> Result<Vec<Record>> {
        let nonce = nonce.to_string();

        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT * FROM {RECEPTIONS_TABLE} WHERE nonce = ?1 ORDER BY id"
            ))?;
            let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

            let mut rows = stmt.query(params![nonce])?;
            let mut records = Vec::new();
            while let Some(row) = rows.next()? {
                let mut record = Record::new();
                for (i, name) in names.iter().enumerate() {
                    if name == "id" {
                        continue;
                    }
                    record.insert(name.as_str(), from_sql_value(row.get_ref(i)?)?);
                }
                records.push(record);
            }

            Ok(records)
        })
        .await
    }

    async fn session_summaries(&self) -> Result<Vec<SessionSummary>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                r#"SELECT nonce,
                          MIN(address),
                          MIN("time"),
                          MAX("time"),
                          MAX(total_expected),
                          COUNT(DISTINCT packet_num),
                          COUNT(*)
                   FROM {RECEPTIONS_TABLE}
                   WHERE nonce IS NOT NULL
                   GROUP BY nonce
                   ORDER BY MIN("time") DESC, nonce"#
            ))?;

            let summaries = stmt
                .query_map([], |row| {
                    Ok(SessionSummary {
                        nonce: row.get(0)?,
                        address: row.get(1)?,
                        first_packet: row.get(2)?,
                        last_packet: row.get(3)?,
                        packets_expected: row.get(4)?,
                        unique_received: row.get::<_, i64>(5)? as u64,
                        received_including_duplicates: row.get::<_, i64>(6)? as u64,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            Ok(summaries)
        })
        .await
    }
}
