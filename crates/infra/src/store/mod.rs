//! Storage seams for the recomputation engine.
//!
//! The engine exclusively owns derived `LedgerEntry` rows (`LedgerStore`);
//! movement records and location transfers are read-only inputs owned
//! upstream (`MovementSource`). Product codes (`ProductCatalog`) are used
//! only to enrich violation messages.

pub mod in_memory;
pub mod postgres;

use std::sync::Arc;

use chrono::NaiveDate;
use thiserror::Error;

use stockledger_core::{OrderableId, ReferenceDataError, StockCardId};
use stockledger_engine::{LedgerEntry, LedgerKey};
use stockledger_movements::{LocationTransfer, MovementRecord};

pub use in_memory::{InMemoryLedgerStore, InMemoryMovementSource, InMemoryProductCatalog};
pub use postgres::PostgresLedgerStore;

/// Ledger storage operation error.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying storage failed (connection, transaction, lock).
    #[error("storage failure: {0}")]
    Storage(String),

    /// The mutation would violate the one-entry-per-(stock card, location,
    /// date) invariant.
    #[error("conflict: {0}")]
    Conflict(String),
}

/// All ledger changes derived from one stock event batch.
///
/// A mutation is the unit of atomicity: implementations commit every
/// deletion and insertion together or not at all. Partial ledger states are
/// never visible to readers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerMutation {
    /// Per key: delete every entry dated on/after the given date.
    pub deletions: Vec<(LedgerKey, NaiveDate)>,
    pub insertions: Vec<LedgerEntry>,
}

impl LedgerMutation {
    pub fn is_empty(&self) -> bool {
        self.deletions.is_empty() && self.insertions.is_empty()
    }
}

/// Persisted per-(stock card, location, date) balances.
///
/// Only the recomputation coordinator writes through this trait; downstream
/// summary/report features read the same rows.
pub trait LedgerStore: Send + Sync {
    /// All entries for one per-location series, ordered by occurred date.
    fn entries_for_key(&self, key: &LedgerKey) -> Vec<LedgerEntry>;

    /// Every entry for a stock card (all locations, facility-wide rows
    /// included), ordered by occurred date.
    fn entries_for_card(&self, stock_card_id: StockCardId) -> Vec<LedgerEntry>;

    /// The surviving entry immediately before `date` for the key, if any.
    fn entry_before(&self, key: &LedgerKey, date: NaiveDate) -> Option<LedgerEntry>;

    /// The facility-wide (non-location) entry for the stock card and date,
    /// used for parent-link resolution at persistence time.
    fn facility_entry(
        &self,
        stock_card_id: StockCardId,
        occurred_date: NaiveDate,
    ) -> Option<LedgerEntry>;

    /// Commit a mutation atomically: all deletions and insertions take
    /// effect together, or the store is left untouched.
    fn apply(&self, mutation: LedgerMutation) -> Result<(), StoreError>;
}

/// Read-only access to previously persisted movements, queryable from a
/// given date onward.
///
/// Contract: results reflect what was persisted *before* the batch being
/// recomputed — the batch's own records are supplied separately by the
/// normalizer, never read back through this trait.
pub trait MovementSource: Send + Sync {
    fn movements_since(&self, stock_card_id: StockCardId, since: NaiveDate) -> Vec<MovementRecord>;

    fn transfers_since(
        &self,
        stock_card_id: StockCardId,
        since: NaiveDate,
    ) -> Vec<LocationTransfer>;
}

/// Product metadata lookup (diagnostic enrichment only).
pub trait ProductCatalog: Send + Sync {
    fn product_code(&self, orderable_id: OrderableId) -> Result<String, ReferenceDataError>;
}

impl<S> LedgerStore for Arc<S>
where
    S: LedgerStore + ?Sized,
{
    fn entries_for_key(&self, key: &LedgerKey) -> Vec<LedgerEntry> {
        (**self).entries_for_key(key)
    }

    fn entries_for_card(&self, stock_card_id: StockCardId) -> Vec<LedgerEntry> {
        (**self).entries_for_card(stock_card_id)
    }

    fn entry_before(&self, key: &LedgerKey, date: NaiveDate) -> Option<LedgerEntry> {
        (**self).entry_before(key, date)
    }

    fn facility_entry(
        &self,
        stock_card_id: StockCardId,
        occurred_date: NaiveDate,
    ) -> Option<LedgerEntry> {
        (**self).facility_entry(stock_card_id, occurred_date)
    }

    fn apply(&self, mutation: LedgerMutation) -> Result<(), StoreError> {
        (**self).apply(mutation)
    }
}

impl<M> MovementSource for Arc<M>
where
    M: MovementSource + ?Sized,
{
    fn movements_since(&self, stock_card_id: StockCardId, since: NaiveDate) -> Vec<MovementRecord> {
        (**self).movements_since(stock_card_id, since)
    }

    fn transfers_since(
        &self,
        stock_card_id: StockCardId,
        since: NaiveDate,
    ) -> Vec<LocationTransfer> {
        (**self).transfers_since(stock_card_id, since)
    }
}

impl<C> ProductCatalog for Arc<C>
where
    C: ProductCatalog + ?Sized,
{
    fn product_code(&self, orderable_id: OrderableId) -> Result<String, ReferenceDataError> {
        (**self).product_code(orderable_id)
    }
}
