//! Postgres-backed ledger entry store.
//!
//! Expects a `ledger_entries` table:
//!
//! ```sql
//! CREATE TABLE ledger_entries (
//!     id             UUID PRIMARY KEY,
//!     stock_card_id  UUID NOT NULL,
//!     location_code  TEXT,
//!     area           TEXT,
//!     occurred_date  DATE NOT NULL,
//!     stock_on_hand  BIGINT NOT NULL CHECK (stock_on_hand >= 0),
//!     parent_id      UUID
//! );
//! CREATE UNIQUE INDEX ledger_entries_natural_key
//!     ON ledger_entries (stock_card_id, coalesce(location_code, ''), coalesce(area, ''), occurred_date);
//! ```
//!
//! `location_code IS NULL` rows are facility-wide entries: read for
//! parent-link resolution, never written or deleted here.

use std::sync::Arc;

use chrono::NaiveDate;
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::Span;
use uuid::Uuid;

use stockledger_core::{LedgerEntryId, Location, StockCardId};
use stockledger_engine::{LedgerEntry, LedgerKey};

use super::{LedgerMutation, LedgerStore, StoreError};

/// Ledger entry store on PostgreSQL.
///
/// Uses the SQLx connection pool (thread-safe); `apply` runs inside a
/// single SQL transaction so a batch's deletions and insertions commit or
/// roll back together.
pub struct PostgresLedgerStore {
    pool: Arc<PgPool>,
}

impl PostgresLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

fn entry_from_row(row: &PgRow) -> Option<LedgerEntry> {
    let id = row.try_get::<Uuid, _>("id").ok()?;
    let stock_card_id = row.try_get::<Uuid, _>("stock_card_id").ok()?;
    let location_code = row.try_get::<Option<String>, _>("location_code").ok()?;
    let area = row.try_get::<Option<String>, _>("area").ok()?;
    let occurred_date = row.try_get::<NaiveDate, _>("occurred_date").ok()?;
    let stock_on_hand = row.try_get::<i64, _>("stock_on_hand").ok()?;
    let parent_id = row.try_get::<Option<Uuid>, _>("parent_id").ok()?;

    Some(LedgerEntry {
        id: LedgerEntryId::from_uuid(id),
        stock_card_id: StockCardId::from_uuid(stock_card_id),
        location: location_code.map(|code| Location { code, area }),
        occurred_date,
        stock_on_hand,
        parent_id: parent_id.map(LedgerEntryId::from_uuid),
    })
}

fn map_sql_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err
        && db.is_unique_violation()
    {
        return StoreError::Conflict(db.message().to_string());
    }
    StoreError::Storage(err.to_string())
}

const SELECT_COLUMNS: &str = r#"
    SELECT
        id,
        stock_card_id,
        location_code,
        area,
        occurred_date,
        stock_on_hand,
        parent_id
    FROM ledger_entries
"#;

impl LedgerStore for PostgresLedgerStore {
    fn entries_for_key(&self, key: &LedgerKey) -> Vec<LedgerEntry> {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(h) => h,
            Err(_) => return vec![],
        };
        let pool = self.pool.clone();
        let sql = format!(
            "{SELECT_COLUMNS}
            WHERE stock_card_id = $1
              AND location_code = $2
              AND area IS NOT DISTINCT FROM $3
            ORDER BY occurred_date"
        );

        handle.block_on(async {
            let span = Span::current();
            span.record("operation", "ledger_entries_for_key");

            match sqlx::query(&sql)
                .bind(key.stock_card_id.as_uuid())
                .bind(&key.location.code)
                .bind(key.location.area.as_deref())
                .fetch_all(&*pool)
                .await
            {
                Ok(rows) => rows.iter().filter_map(entry_from_row).collect(),
                Err(_) => vec![],
            }
        })
    }

    fn entries_for_card(&self, stock_card_id: StockCardId) -> Vec<LedgerEntry> {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(h) => h,
            Err(_) => return vec![],
        };
        let pool = self.pool.clone();
        let sql = format!("{SELECT_COLUMNS} WHERE stock_card_id = $1 ORDER BY occurred_date");

        handle.block_on(async {
            let span = Span::current();
            span.record("operation", "ledger_entries_for_card");

            match sqlx::query(&sql)
                .bind(stock_card_id.as_uuid())
                .fetch_all(&*pool)
                .await
            {
                Ok(rows) => rows.iter().filter_map(entry_from_row).collect(),
                Err(_) => vec![],
            }
        })
    }

    fn entry_before(&self, key: &LedgerKey, date: NaiveDate) -> Option<LedgerEntry> {
        let handle = tokio::runtime::Handle::try_current().ok()?;
        let pool = self.pool.clone();
        let sql = format!(
            "{SELECT_COLUMNS}
            WHERE stock_card_id = $1
              AND location_code = $2
              AND area IS NOT DISTINCT FROM $3
              AND occurred_date < $4
            ORDER BY occurred_date DESC
            LIMIT 1"
        );

        handle.block_on(async {
            let span = Span::current();
            span.record("operation", "ledger_entry_before");

            match sqlx::query(&sql)
                .bind(key.stock_card_id.as_uuid())
                .bind(&key.location.code)
                .bind(key.location.area.as_deref())
                .bind(date)
                .fetch_optional(&*pool)
                .await
            {
                Ok(Some(row)) => entry_from_row(&row),
                _ => None,
            }
        })
    }

    fn facility_entry(
        &self,
        stock_card_id: StockCardId,
        occurred_date: NaiveDate,
    ) -> Option<LedgerEntry> {
        let handle = tokio::runtime::Handle::try_current().ok()?;
        let pool = self.pool.clone();
        let sql = format!(
            "{SELECT_COLUMNS}
            WHERE stock_card_id = $1
              AND location_code IS NULL
              AND occurred_date = $2"
        );

        handle.block_on(async {
            let span = Span::current();
            span.record("operation", "ledger_facility_entry");

            match sqlx::query(&sql)
                .bind(stock_card_id.as_uuid())
                .bind(occurred_date)
                .fetch_optional(&*pool)
                .await
            {
                Ok(Some(row)) => entry_from_row(&row),
                _ => None,
            }
        })
    }

    fn apply(&self, mutation: LedgerMutation) -> Result<(), StoreError> {
        if mutation.is_empty() {
            return Ok(());
        }

        let handle = tokio::runtime::Handle::try_current()
            .map_err(|_| StoreError::Storage("no tokio runtime available".to_string()))?;
        let pool = self.pool.clone();

        handle.block_on(async move {
            let span = Span::current();
            span.record("operation", "ledger_apply_mutation");

            let mut tx = pool.begin().await.map_err(map_sql_error)?;

            for (key, since) in &mutation.deletions {
                sqlx::query(
                    r#"
                    DELETE FROM ledger_entries
                    WHERE stock_card_id = $1
                      AND location_code = $2
                      AND area IS NOT DISTINCT FROM $3
                      AND occurred_date >= $4
                    "#,
                )
                .bind(key.stock_card_id.as_uuid())
                .bind(&key.location.code)
                .bind(key.location.area.as_deref())
                .bind(*since)
                .execute(&mut *tx)
                .await
                .map_err(map_sql_error)?;
            }

            for entry in &mutation.insertions {
                let (location_code, area) = match &entry.location {
                    Some(location) => (Some(location.code.as_str()), location.area.as_deref()),
                    None => (None, None),
                };

                sqlx::query(
                    r#"
                    INSERT INTO ledger_entries (
                        id,
                        stock_card_id,
                        location_code,
                        area,
                        occurred_date,
                        stock_on_hand,
                        parent_id
                    )
                    VALUES ($1, $2, $3, $4, $5, $6, $7)
                    "#,
                )
                .bind(entry.id.as_uuid())
                .bind(entry.stock_card_id.as_uuid())
                .bind(location_code)
                .bind(area)
                .bind(entry.occurred_date)
                .bind(entry.stock_on_hand)
                .bind(entry.parent_id.map(|id| *id.as_uuid()))
                .execute(&mut *tx)
                .await
                .map_err(map_sql_error)?;
            }

            tx.commit().await.map_err(map_sql_error)
        })
    }
}
