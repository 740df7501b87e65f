use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use stockledger_core::{Entity, LedgerEntryId, Location, StockCardId};

/// Composite key of one per-location balance series: a stock card at one
/// storage location.
///
/// Structural equality; used directly as a map key (never a concatenated
/// string).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LedgerKey {
    pub stock_card_id: StockCardId,
    pub location: Location,
}

impl LedgerKey {
    pub fn new(stock_card_id: StockCardId, location: Location) -> Self {
        Self {
            stock_card_id,
            location,
        }
    }

    /// Deterministic ordering token (UUID bytes, then location) for
    /// reproducible iteration over keyed partitions.
    pub fn sort_token(&self) -> ([u8; 16], String, Option<String>) {
        (
            *self.stock_card_id.as_uuid().as_bytes(),
            self.location.code.clone(),
            self.location.area.clone(),
        )
    }
}

/// One recomputed closing balance: the stock on hand for a key at the end
/// of one occurred date.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyBalance {
    pub occurred_date: NaiveDate,
    pub stock_on_hand: i64,
}

/// A persisted, dated on-hand balance snapshot.
///
/// `location: None` denotes a facility-wide entry; the recomputation engine
/// only ever *creates* location-scoped rows, but links them to the
/// facility-wide row for the same stock card and date via `parent_id` when
/// one exists.
///
/// Invariants: at most one entry per (stock card, location, occurred date);
/// `stock_on_hand >= 0` always.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: LedgerEntryId,
    pub stock_card_id: StockCardId,
    pub location: Option<Location>,
    pub occurred_date: NaiveDate,
    pub stock_on_hand: i64,
    pub parent_id: Option<LedgerEntryId>,
}

impl LedgerEntry {
    pub fn is_facility_wide(&self) -> bool {
        self.location.is_none()
    }

    /// The per-location key this entry belongs to, if location-scoped.
    pub fn key(&self) -> Option<LedgerKey> {
        self.location
            .clone()
            .map(|location| LedgerKey::new(self.stock_card_id, location))
    }
}

impl Entity for LedgerEntry {
    type Id = LedgerEntryId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
