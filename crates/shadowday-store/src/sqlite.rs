//! SQLite-backed record store implementation.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};

use crate::error::StoreError;
use crate::record::{
    Cursor, IndexKey, Page, QueryOptions, RecordFilter, RecordStore, SecondaryIndex, StoredRecord,
    decode_token, encode_token,
};

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

const RECORD_COLUMNS: &str =
    "pk, sk, index_a_pk, index_a_sk, index_b_pk, index_b_sk, attributes";

/// SQLite-backed `RecordStore`.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Create a store from an existing pool. Migrations must already have run.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database URL (e.g. `sqlite:.data/shadowday.db`)
    /// and run migrations.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| StoreError::unavailable("connect", e))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::unavailable("connect", e))?;

        MIGRATOR
            .run(&pool)
            .await
            .map_err(|e| StoreError::unavailable("migrate", e))?;

        Ok(Self { pool })
    }

    /// Create and initialize a store from a database file path.
    ///
    /// Creates parent directories if they don't exist, creates the database
    /// file if needed, and runs all migrations.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::unavailable(
                    "create_dir",
                    format!("failed to create directory {:?}: {}", parent, e),
                )
            })?;
        }

        let url = format!("sqlite:{}?mode=rwc", path.to_string_lossy());
        Self::connect(&url).await
    }

    /// The underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[derive(sqlx::FromRow)]
struct RecordRow {
    pk: String,
    sk: String,
    index_a_pk: Option<String>,
    index_a_sk: Option<String>,
    index_b_pk: Option<String>,
    index_b_sk: Option<String>,
    attributes: String,
}

impl RecordRow {
    fn into_record(self) -> StoredRecord {
        // Attributes that fail to parse degrade to an empty object rather
        // than failing the read; the codec layer owns defensive defaults.
        let attributes = serde_json::from_str(&self.attributes).unwrap_or_else(|err| {
            tracing::warn!(pk = %self.pk, error = %err, "record attributes failed to parse");
            serde_json::Value::Object(serde_json::Map::new())
        });
        StoredRecord {
            pk: self.pk,
            sk: self.sk,
            index_a: zip_index(self.index_a_pk, self.index_a_sk),
            index_b: zip_index(self.index_b_pk, self.index_b_sk),
            attributes,
        }
    }

    fn index_sort(&self, index: SecondaryIndex) -> String {
        match index {
            SecondaryIndex::A => self.index_a_sk.clone().unwrap_or_default(),
            SecondaryIndex::B => self.index_b_sk.clone().unwrap_or_default(),
        }
    }
}

fn zip_index(partition: Option<String>, sort: Option<String>) -> Option<IndexKey> {
    match (partition, sort) {
        (Some(partition), Some(sort)) => Some(IndexKey { partition, sort }),
        _ => None,
    }
}

fn index_columns(index: SecondaryIndex) -> (&'static str, &'static str) {
    match index {
        SecondaryIndex::A => ("index_a_pk", "index_a_sk"),
        SecondaryIndex::B => ("index_b_pk", "index_b_sk"),
    }
}

/// Turn fetched rows into a page: detect whether more rows exist beyond the
/// limit, emit a continuation cursor for the last retained row, then apply
/// the in-memory filter.
fn page_from_rows(
    mut rows: Vec<RecordRow>,
    limit: Option<u32>,
    sort_for_cursor: Option<SecondaryIndex>,
) -> Page {
    let mut next_token = None;
    if let Some(limit) = limit {
        let limit = limit as usize;
        if rows.len() > limit {
            rows.truncate(limit);
            if let Some(last) = rows.last() {
                next_token = Some(encode_token(&Cursor {
                    p: last.pk.clone(),
                    k: last.sk.clone(),
                    x: sort_for_cursor.map(|index| last.index_sort(index)),
                }));
            }
        }
    }
    Page {
        records: rows.into_iter().map(RecordRow::into_record).collect(),
        next_token,
    }
}

fn apply_filter(page: Page, filter: Option<&RecordFilter<'_>>) -> Page {
    match filter {
        Some(f) => Page {
            records: page.records.into_iter().filter(|r| f(r)).collect(),
            next_token: page.next_token,
        },
        None => page,
    }
}

/// SQL LIMIT value that fetches one extra row for continuation detection.
fn fetch_limit(limit: Option<u32>) -> i64 {
    match limit {
        Some(limit) => i64::from(limit) + 1,
        None => -1,
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn get(&self, pk: &str, sk: &str) -> Result<Option<StoredRecord>, StoreError> {
        let row = sqlx::query_as::<_, RecordRow>(&format!(
            "SELECT {RECORD_COLUMNS} FROM records WHERE pk = ? AND sk = ?"
        ))
        .bind(pk)
        .bind(sk)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(RecordRow::into_record))
    }

    async fn put(&self, record: StoredRecord) -> Result<(), StoreError> {
        let attributes = serde_json::to_string(&record.attributes)
            .map_err(|e| StoreError::unavailable("put", e))?;

        sqlx::query(
            r#"
            INSERT INTO records (pk, sk, index_a_pk, index_a_sk, index_b_pk, index_b_sk, attributes)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(pk, sk) DO UPDATE SET
                index_a_pk = excluded.index_a_pk,
                index_a_sk = excluded.index_a_sk,
                index_b_pk = excluded.index_b_pk,
                index_b_sk = excluded.index_b_sk,
                attributes = excluded.attributes,
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(&record.pk)
        .bind(&record.sk)
        .bind(record.index_a.as_ref().map(|k| k.partition.as_str()))
        .bind(record.index_a.as_ref().map(|k| k.sort.as_str()))
        .bind(record.index_b.as_ref().map(|k| k.partition.as_str()))
        .bind(record.index_b.as_ref().map(|k| k.sort.as_str()))
        .bind(&attributes)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn put_if_absent(&self, record: StoredRecord) -> Result<bool, StoreError> {
        let attributes = serde_json::to_string(&record.attributes)
            .map_err(|e| StoreError::unavailable("put_if_absent", e))?;

        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO records
                (pk, sk, index_a_pk, index_a_sk, index_b_pk, index_b_sk, attributes)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.pk)
        .bind(&record.sk)
        .bind(record.index_a.as_ref().map(|k| k.partition.as_str()))
        .bind(record.index_a.as_ref().map(|k| k.sort.as_str()))
        .bind(record.index_b.as_ref().map(|k| k.partition.as_str()))
        .bind(record.index_b.as_ref().map(|k| k.sort.as_str()))
        .bind(&attributes)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete(&self, pk: &str, sk: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM records WHERE pk = ? AND sk = ?")
            .bind(pk)
            .bind(sk)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn query_by_index(
        &self,
        index: SecondaryIndex,
        key: &str,
        filter: Option<&RecordFilter<'_>>,
        options: &QueryOptions,
    ) -> Result<Page, StoreError> {
        let cursor = options
            .start_token
            .as_deref()
            .map(decode_token)
            .transpose()?;
        let (ipk, isk) = index_columns(index);

        let rows = match cursor {
            Some(cursor) => {
                let sort = cursor.x.unwrap_or_default();
                sqlx::query_as::<_, RecordRow>(&format!(
                    r#"
                    SELECT {RECORD_COLUMNS} FROM records
                    WHERE {ipk} = ?
                      AND ({isk} > ? OR ({isk} = ? AND (pk > ? OR (pk = ? AND sk > ?))))
                    ORDER BY {isk} ASC, pk ASC, sk ASC
                    LIMIT ?
                    "#
                ))
                .bind(key)
                .bind(&sort)
                .bind(&sort)
                .bind(&cursor.p)
                .bind(&cursor.p)
                .bind(&cursor.k)
                .bind(fetch_limit(options.limit))
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, RecordRow>(&format!(
                    r#"
                    SELECT {RECORD_COLUMNS} FROM records
                    WHERE {ipk} = ?
                    ORDER BY {isk} ASC, pk ASC, sk ASC
                    LIMIT ?
                    "#
                ))
                .bind(key)
                .bind(fetch_limit(options.limit))
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(apply_filter(
            page_from_rows(rows, options.limit, Some(index)),
            filter,
        ))
    }

    async fn scan_all(
        &self,
        filter: Option<&RecordFilter<'_>>,
        options: &QueryOptions,
    ) -> Result<Page, StoreError> {
        let cursor = options
            .start_token
            .as_deref()
            .map(decode_token)
            .transpose()?;

        let rows = match cursor {
            Some(cursor) => {
                sqlx::query_as::<_, RecordRow>(&format!(
                    r#"
                    SELECT {RECORD_COLUMNS} FROM records
                    WHERE pk > ? OR (pk = ? AND sk > ?)
                    ORDER BY pk ASC, sk ASC
                    LIMIT ?
                    "#
                ))
                .bind(&cursor.p)
                .bind(&cursor.p)
                .bind(&cursor.k)
                .bind(fetch_limit(options.limit))
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, RecordRow>(&format!(
                    "SELECT {RECORD_COLUMNS} FROM records ORDER BY pk ASC, sk ASC LIMIT ?"
                ))
                .bind(fetch_limit(options.limit))
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(apply_filter(page_from_rows(rows, options.limit, None), filter))
    }
}
