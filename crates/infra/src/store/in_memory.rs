//! In-memory storage implementations for tests/dev. Not optimized for
//! performance.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use chrono::NaiveDate;

use stockledger_core::{OrderableId, ReferenceDataError, StockCardId};
use stockledger_engine::{LedgerEntry, LedgerKey};
use stockledger_movements::{LocationTransfer, MovementRecord};

use super::{LedgerMutation, LedgerStore, MovementSource, ProductCatalog, StoreError};

/// In-memory ledger entry store.
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    rows: RwLock<Vec<LedgerEntry>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a row directly, bypassing recomputation (e.g. facility-wide
    /// entries owned by the facility-level pipeline).
    pub fn seed(&self, entry: LedgerEntry) -> Result<(), StoreError> {
        let mut rows = self
            .rows
            .write()
            .map_err(|_| StoreError::Storage("lock poisoned".to_string()))?;
        let duplicate = rows.iter().any(|e| {
            e.stock_card_id == entry.stock_card_id
                && e.location == entry.location
                && e.occurred_date == entry.occurred_date
        });
        if duplicate {
            return Err(StoreError::Conflict(format!(
                "entry already exists for stock card {} at {:?} on {}",
                entry.stock_card_id, entry.location, entry.occurred_date
            )));
        }
        rows.push(entry);
        Ok(())
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn entries_for_key(&self, key: &LedgerKey) -> Vec<LedgerEntry> {
        let rows = match self.rows.read() {
            Ok(rows) => rows,
            Err(_) => return vec![],
        };
        let mut out: Vec<_> = rows
            .iter()
            .filter(|e| e.key().as_ref() == Some(key))
            .cloned()
            .collect();
        out.sort_by_key(|e| e.occurred_date);
        out
    }

    fn entries_for_card(&self, stock_card_id: StockCardId) -> Vec<LedgerEntry> {
        let rows = match self.rows.read() {
            Ok(rows) => rows,
            Err(_) => return vec![],
        };
        let mut out: Vec<_> = rows
            .iter()
            .filter(|e| e.stock_card_id == stock_card_id)
            .cloned()
            .collect();
        out.sort_by_key(|e| e.occurred_date);
        out
    }

    fn entry_before(&self, key: &LedgerKey, date: NaiveDate) -> Option<LedgerEntry> {
        let rows = self.rows.read().ok()?;
        rows.iter()
            .filter(|e| e.key().as_ref() == Some(key) && e.occurred_date < date)
            .max_by_key(|e| e.occurred_date)
            .cloned()
    }

    fn facility_entry(
        &self,
        stock_card_id: StockCardId,
        occurred_date: NaiveDate,
    ) -> Option<LedgerEntry> {
        let rows = self.rows.read().ok()?;
        rows.iter()
            .find(|e| {
                e.is_facility_wide()
                    && e.stock_card_id == stock_card_id
                    && e.occurred_date == occurred_date
            })
            .cloned()
    }

    fn apply(&self, mutation: LedgerMutation) -> Result<(), StoreError> {
        let mut rows = self
            .rows
            .write()
            .map_err(|_| StoreError::Storage("lock poisoned".to_string()))?;

        // Build the post-mutation state first; the stored rows are swapped
        // only once the whole mutation validates (all-or-nothing).
        let mut next: Vec<LedgerEntry> = rows
            .iter()
            .filter(|e| {
                let Some(key) = e.key() else {
                    // Facility-wide rows are not owned by this engine.
                    return true;
                };
                !mutation
                    .deletions
                    .iter()
                    .any(|(k, since)| *k == key && e.occurred_date >= *since)
            })
            .cloned()
            .collect();
        next.extend(mutation.insertions.iter().cloned());

        let mut seen = HashSet::new();
        for entry in &next {
            let slot = (
                entry.stock_card_id,
                entry.location.clone(),
                entry.occurred_date,
            );
            if !seen.insert(slot) {
                return Err(StoreError::Conflict(format!(
                    "duplicate entry for stock card {} at {:?} on {}",
                    entry.stock_card_id, entry.location, entry.occurred_date
                )));
            }
        }

        *rows = next;
        Ok(())
    }
}

/// In-memory movement/transfer source. Tests seed it with what the
/// ingestion layer would have persisted before the batch under test.
#[derive(Debug, Default)]
pub struct InMemoryMovementSource {
    movements: RwLock<Vec<MovementRecord>>,
    transfers: RwLock<Vec<LocationTransfer>>,
}

impl InMemoryMovementSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_movements(&self, records: impl IntoIterator<Item = MovementRecord>) {
        if let Ok(mut movements) = self.movements.write() {
            movements.extend(records);
        }
    }

    pub fn seed_transfers(&self, transfers: impl IntoIterator<Item = LocationTransfer>) {
        if let Ok(mut stored) = self.transfers.write() {
            stored.extend(transfers);
        }
    }
}

impl MovementSource for InMemoryMovementSource {
    fn movements_since(&self, stock_card_id: StockCardId, since: NaiveDate) -> Vec<MovementRecord> {
        let movements = match self.movements.read() {
            Ok(m) => m,
            Err(_) => return vec![],
        };
        let mut out: Vec<_> = movements
            .iter()
            .filter(|r| r.stock_card_id == stock_card_id && r.occurred_date >= since)
            .cloned()
            .collect();
        out.sort_by_key(MovementRecord::chronology_key);
        out
    }

    fn transfers_since(
        &self,
        stock_card_id: StockCardId,
        since: NaiveDate,
    ) -> Vec<LocationTransfer> {
        let transfers = match self.transfers.read() {
            Ok(t) => t,
            Err(_) => return vec![],
        };
        let mut out: Vec<_> = transfers
            .iter()
            .filter(|t| t.stock_card_id == stock_card_id && t.occurred_date >= since)
            .cloned()
            .collect();
        out.sort_by_key(|t| (t.occurred_date, t.processed_at));
        out
    }
}

/// In-memory product code catalog.
#[derive(Debug, Default)]
pub struct InMemoryProductCatalog {
    codes: RwLock<HashMap<OrderableId, String>>,
}

impl InMemoryProductCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, orderable_id: OrderableId, code: impl Into<String>) {
        if let Ok(mut codes) = self.codes.write() {
            codes.insert(orderable_id, code.into());
        }
    }
}

impl ProductCatalog for InMemoryProductCatalog {
    fn product_code(&self, orderable_id: OrderableId) -> Result<String, ReferenceDataError> {
        let codes = self
            .codes
            .read()
            .map_err(|_| ReferenceDataError::new("catalog lock poisoned"))?;
        codes
            .get(&orderable_id)
            .cloned()
            .ok_or_else(|| ReferenceDataError::new(format!("no product code for {orderable_id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockledger_core::{LedgerEntryId, Location};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn entry(card: StockCardId, location: Option<Location>, d: u32, soh: i64) -> LedgerEntry {
        let id = match &location {
            Some(loc) => LedgerEntryId::derived(card, loc, day(d)),
            None => LedgerEntryId::new(),
        };
        LedgerEntry {
            id,
            stock_card_id: card,
            location,
            occurred_date: day(d),
            stock_on_hand: soh,
            parent_id: None,
        }
    }

    #[test]
    fn apply_deletes_suffix_then_inserts() {
        let store = InMemoryLedgerStore::new();
        let card = StockCardId::new();
        let key = LedgerKey::new(card, Location::new("A1"));

        store.seed(entry(card, Some(key.location.clone()), 1, 10)).unwrap();
        store.seed(entry(card, Some(key.location.clone()), 2, 7)).unwrap();

        store
            .apply(LedgerMutation {
                deletions: vec![(key.clone(), day(2))],
                insertions: vec![entry(card, Some(key.location.clone()), 2, 12)],
            })
            .unwrap();

        let rows = store.entries_for_key(&key);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].stock_on_hand, 10);
        assert_eq!(rows[1].stock_on_hand, 12);
    }

    #[test]
    fn apply_rejects_duplicate_slot_and_leaves_store_untouched() {
        let store = InMemoryLedgerStore::new();
        let card = StockCardId::new();
        let key = LedgerKey::new(card, Location::new("A1"));
        store.seed(entry(card, Some(key.location.clone()), 1, 10)).unwrap();

        let err = store
            .apply(LedgerMutation {
                deletions: vec![],
                insertions: vec![entry(card, Some(key.location.clone()), 1, 99)],
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        // Nothing from the failed mutation leaked.
        let rows = store.entries_for_key(&key);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].stock_on_hand, 10);
    }

    #[test]
    fn deletions_never_touch_facility_wide_rows() {
        let store = InMemoryLedgerStore::new();
        let card = StockCardId::new();
        let key = LedgerKey::new(card, Location::new("A1"));

        store.seed(entry(card, None, 2, 7)).unwrap();
        store.seed(entry(card, Some(key.location.clone()), 2, 7)).unwrap();

        store
            .apply(LedgerMutation {
                deletions: vec![(key.clone(), day(1))],
                insertions: vec![],
            })
            .unwrap();

        assert!(store.facility_entry(card, day(2)).is_some());
        assert!(store.entries_for_key(&key).is_empty());
    }

    #[test]
    fn entry_before_picks_the_closest_prior_date() {
        let store = InMemoryLedgerStore::new();
        let card = StockCardId::new();
        let key = LedgerKey::new(card, Location::new("A1"));

        store.seed(entry(card, Some(key.location.clone()), 1, 10)).unwrap();
        store.seed(entry(card, Some(key.location.clone()), 3, 4)).unwrap();

        assert_eq!(store.entry_before(&key, day(5)).unwrap().stock_on_hand, 4);
        assert_eq!(store.entry_before(&key, day(3)).unwrap().stock_on_hand, 10);
        assert!(store.entry_before(&key, day(1)).is_none());
    }

    #[test]
    fn catalog_misses_surface_as_reference_data_errors() {
        let catalog = InMemoryProductCatalog::new();
        let orderable = OrderableId::new();
        assert!(catalog.product_code(orderable).is_err());

        catalog.register(orderable, "ORAL-REHYDRATION-SALT");
        assert_eq!(
            catalog.product_code(orderable).unwrap(),
            "ORAL-REHYDRATION-SALT"
        );
    }
}
