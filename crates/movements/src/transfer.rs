use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use stockledger_core::{Location, StockCardId};

use crate::movement::{MovementRecord, Quantity, SourceKind};

/// A location-to-location transfer of `quantity` units of one stock card
/// within a facility.
///
/// Decomposes into two balanced movement records (debit at the source,
/// credit at the destination) sharing the transfer's own dates, so the
/// facility-wide total is unchanged and both legs sort in the chronology
/// like any other record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationTransfer {
    pub stock_card_id: StockCardId,
    pub source: Location,
    pub destination: Location,
    pub quantity: i64,
    pub occurred_date: NaiveDate,
    pub processed_at: DateTime<Utc>,
}

impl LocationTransfer {
    /// Split into the debit leg (source) and credit leg (destination).
    pub fn legs(&self) -> [MovementRecord; 2] {
        [
            MovementRecord {
                stock_card_id: self.stock_card_id,
                location: self.source.clone(),
                occurred_date: self.occurred_date,
                processed_at: self.processed_at,
                quantity: Quantity::Delta(-self.quantity),
                source: SourceKind::TransferDebit,
            },
            MovementRecord {
                stock_card_id: self.stock_card_id,
                location: self.destination.clone(),
                occurred_date: self.occurred_date,
                processed_at: self.processed_at,
                quantity: Quantity::Delta(self.quantity),
                source: SourceKind::TransferCredit,
            },
        ]
    }
}
