//! Invalidation & persistence coordinator.
//!
//! Orchestrates one stock event batch end to end:
//!
//! ```text
//! StockEventBatch
//!   ↓
//! 1. Normalize (lines + fresh transfers → MovementRecords)
//!   ↓
//! 2. Partition by (stock card, location) key, lock touched cards
//!   ↓
//! 3. Per key: fetch prior balance + stored chronology, merge, replay
//!   ↓
//! 4. Persist one atomic mutation (delete suffix, insert fresh entries)
//! ```
//!
//! The batch is one unit of work: a negativity violation or validation
//! failure anywhere rejects the whole batch and persists nothing.
//! Re-running on identical input state yields identical rows
//! (delete-and-recreate with natural-key-derived entry ids).

use std::collections::HashMap;

use thiserror::Error;

use stockledger_core::{LedgerEntryId, LedgerError, NegativeStockOnHand, StockCardId};
use stockledger_engine::{
    LedgerEntry, LedgerKey, merge_chronology, partition_by_key, replay_balances,
};
use stockledger_movements::{
    MovementRecord, RecomputeTrigger, StockCardIndex, StockEventBatch, normalize_batch,
};

use crate::locks::StockCardLocks;
use crate::store::{LedgerMutation, LedgerStore, MovementSource, ProductCatalog, StoreError};

/// Batch processing error.
#[derive(Debug, Error)]
pub enum BatchError {
    /// Malformed input; rejected before persistence, no side effects.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A debit would drive a balance negative; the whole batch transaction
    /// is aborted and nothing is persisted.
    #[error("{0}")]
    DebitExceedsStockOnHand(NegativeStockOnHand),

    /// Duplicate entry for the same key/date or a non-convergent recompute.
    /// Fatal, internal, not user-recoverable.
    #[error("inconsistent ledger state: {0}")]
    InconsistentState(String),

    /// Underlying storage failed; the transaction is discarded.
    #[error(transparent)]
    Store(StoreError),
}

impl From<LedgerError> for BatchError {
    fn from(value: LedgerError) -> Self {
        match value {
            LedgerError::Validation(msg) => BatchError::Validation(msg),
            LedgerError::DebitExceedsStockOnHand(v) => BatchError::DebitExceedsStockOnHand(v),
            LedgerError::InconsistentState(msg) => BatchError::InconsistentState(msg),
        }
    }
}

impl From<StoreError> for BatchError {
    fn from(value: StoreError) -> Self {
        match value {
            // A conflicting insert means the invalidate-then-recompute
            // sequence produced a duplicate (key, date) row.
            StoreError::Conflict(msg) => BatchError::InconsistentState(msg),
            StoreError::Storage(_) => BatchError::Store(value),
        }
    }
}

/// Coordinates invalidation, recomputation, and persistence for stock
/// event batches.
///
/// Generic over the storage seams so tests run against the in-memory
/// implementations and production runs against Postgres, without touching
/// the recomputation logic.
#[derive(Debug)]
pub struct RecomputationCoordinator<S, M, C> {
    store: S,
    movements: M,
    catalog: C,
    locks: StockCardLocks,
}

impl<S, M, C> RecomputationCoordinator<S, M, C> {
    pub fn new(store: S, movements: M, catalog: C) -> Self {
        Self {
            store,
            movements,
            catalog,
            locks: StockCardLocks::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S, M, C> RecomputationCoordinator<S, M, C>
where
    S: LedgerStore,
    M: MovementSource,
    C: ProductCatalog,
{
    /// Process one stock event batch: normalize, invalidate, recompute,
    /// persist. Returns the freshly persisted entries.
    ///
    /// Batches touching the same stock card are serialized on its lock;
    /// everything needed by the walk is fetched before it starts, and the
    /// resulting mutation is committed atomically by the store.
    pub fn process_batch(
        &self,
        batch: &StockEventBatch,
        index: &StockCardIndex,
        trigger: RecomputeTrigger,
    ) -> Result<Vec<LedgerEntry>, BatchError> {
        let records = normalize_batch(batch, index, trigger)?;
        if records.is_empty() {
            return Ok(vec![]);
        }

        let partitions = partition_by_key(records);
        let mut cards: Vec<StockCardId> =
            partitions.keys().map(|key| key.stock_card_id).collect();
        cards.sort_by_key(|card| *card.as_uuid().as_bytes());
        cards.dedup();

        tracing::debug!(
            facility = %batch.facility_id,
            stock_cards = cards.len(),
            keys = partitions.len(),
            "recomputing stock on hand"
        );

        self.locks
            .with_serialized(&cards, || self.recompute_locked(partitions, index))
    }

    fn recompute_locked(
        &self,
        partitions: HashMap<LedgerKey, Vec<MovementRecord>>,
        index: &StockCardIndex,
    ) -> Result<Vec<LedgerEntry>, BatchError> {
        // Deterministic key order keeps persistence reproducible.
        let mut keyed: Vec<(LedgerKey, Vec<MovementRecord>)> = partitions.into_iter().collect();
        keyed.sort_by_key(|(key, _)| key.sort_token());

        let mut mutation = LedgerMutation::default();
        let mut fresh = Vec::new();

        for (key, incoming) in keyed {
            let Some(earliest) = incoming.iter().map(|r| r.occurred_date).min() else {
                continue;
            };

            let opening = self
                .store
                .entry_before(&key, earliest)
                .map(|entry| entry.stock_on_hand)
                .unwrap_or(0);

            let existing = self.stored_chronology(&key, earliest);
            let merged = merge_chronology(existing, incoming);

            let balances = replay_balances(&key, &merged, opening)
                .map_err(|violation| self.negativity_violation(violation, index))?;

            mutation.deletions.push((key.clone(), earliest));
            for balance in balances {
                let parent_id = self
                    .store
                    .facility_entry(key.stock_card_id, balance.occurred_date)
                    .map(|entry| entry.id);
                let entry = LedgerEntry {
                    id: LedgerEntryId::derived(
                        key.stock_card_id,
                        &key.location,
                        balance.occurred_date,
                    ),
                    stock_card_id: key.stock_card_id,
                    location: Some(key.location.clone()),
                    occurred_date: balance.occurred_date,
                    stock_on_hand: balance.stock_on_hand,
                    parent_id,
                };
                mutation.insertions.push(entry.clone());
                fresh.push(entry);
            }
        }

        self.store.apply(mutation)?;
        Ok(fresh)
    }

    /// Previously persisted chronology for one key from `since` onward:
    /// stored movement records plus the legs of stored transfers landing on
    /// this key's location.
    fn stored_chronology(&self, key: &LedgerKey, since: chrono::NaiveDate) -> Vec<MovementRecord> {
        let mut records: Vec<MovementRecord> = self
            .movements
            .movements_since(key.stock_card_id, since)
            .into_iter()
            .filter(|record| record.location == key.location)
            .collect();

        records.extend(
            self.movements
                .transfers_since(key.stock_card_id, since)
                .iter()
                .flat_map(|transfer| transfer.legs())
                .filter(|leg| leg.location == key.location),
        );

        records.sort_by_key(MovementRecord::chronology_key);
        records
    }

    /// Enrich a negativity violation with the product code where the
    /// catalog can supply one; a failed lookup only degrades the message.
    fn negativity_violation(
        &self,
        violation: NegativeStockOnHand,
        index: &StockCardIndex,
    ) -> BatchError {
        let enriched = match index.orderable_of(violation.stock_card_id) {
            Some(orderable_id) => match self.catalog.product_code(orderable_id) {
                Ok(code) => violation.with_product_code(code),
                Err(err) => {
                    tracing::warn!(
                        orderable = %orderable_id,
                        error = %err,
                        "product code lookup failed; reporting violation without it"
                    );
                    violation
                }
            },
            None => violation,
        };
        BatchError::DebitExceedsStockOnHand(enriched)
    }
}
