use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use stockledger_core::{Location, StockCardId};

/// Where a normalized movement record came from.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// A regular stock event line (receipt, issue, adjustment).
    Movement,
    /// An authoritative physical inventory count.
    PhysicalInventory,
    /// Debit leg of a location-to-location transfer.
    TransferDebit,
    /// Credit leg of a location-to-location transfer.
    TransferCredit,
}

/// The quantity effect of one movement record.
///
/// Exactly one representation applies per record: physical inventory counts
/// are absolute and reset the running balance; everything else is a signed
/// change.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quantity {
    /// Signed on-hand change.
    Delta(i64),
    /// Absolute count. Non-negative by construction (validated during
    /// normalization).
    Count(i64),
}

/// One dated, location-resolved quantity change for a stock card.
///
/// This is the uniform representation the chronology merger and the balance
/// walk operate on; heterogeneous inputs (stock event lines, transfer legs)
/// are converted into it by the normalizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementRecord {
    pub stock_card_id: StockCardId,
    pub location: Location,
    pub occurred_date: NaiveDate,
    pub processed_at: DateTime<Utc>,
    pub quantity: Quantity,
    pub source: SourceKind,
}

impl MovementRecord {
    /// Primary/secondary ordering key for the chronology merge.
    pub fn chronology_key(&self) -> (NaiveDate, DateTime<Utc>) {
        (self.occurred_date, self.processed_at)
    }
}
