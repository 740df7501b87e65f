use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use stockledger_core::{FacilityId, Location, LotId, OrderableId};

use crate::transfer::LocationTransfer;

/// Why a stock event line changes (or resets) a balance.
///
/// Credit reasons add to the on-hand quantity, debit reasons subtract from
/// it; the line's own `quantity` field is always non-negative.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonKind {
    Receive,
    Issue,
    CreditAdjustment,
    DebitAdjustment,
    TransferIn,
    TransferOut,
    PhysicalInventory,
}

impl ReasonKind {
    /// Whether this reason increases stock on hand.
    ///
    /// Meaningless for `PhysicalInventory`, which is absolute rather than
    /// signed; callers check `is_physical_inventory` first.
    pub fn is_credit(self) -> bool {
        matches!(
            self,
            ReasonKind::Receive | ReasonKind::CreditAdjustment | ReasonKind::TransferIn
        )
    }

    pub fn is_physical_inventory(self) -> bool {
        matches!(self, ReasonKind::PhysicalInventory)
    }
}

/// One reported line of a stock event batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockEventLine {
    pub orderable_id: OrderableId,
    pub lot_id: Option<LotId>,
    pub occurred_date: NaiveDate,
    pub processed_at: DateTime<Utc>,
    /// Non-negative; the sign is carried by `reason`.
    pub quantity: i64,
    pub reason: ReasonKind,
    pub location_code: Option<String>,
    pub area: Option<String>,
}

/// An incoming stock event batch for one facility.
///
/// Lines may span several stock cards. `default_location` is the
/// batch-level fallback for lines reported without a location tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockEventBatch {
    pub facility_id: FacilityId,
    pub lines: Vec<StockEventLine>,
    /// Fresh transfers submitted alongside the lines. Previously persisted
    /// transfers are *not* repeated here; they are fetched from storage
    /// during recomputation.
    pub transfers: Vec<LocationTransfer>,
    pub default_location: Option<Location>,
}

impl StockEventBatch {
    /// Earliest occurred date across lines and transfers, if any.
    pub fn earliest_occurred_date(&self) -> Option<NaiveDate> {
        let lines = self.lines.iter().map(|l| l.occurred_date);
        let transfers = self.transfers.iter().map(|t| t.occurred_date);
        lines.chain(transfers).min()
    }
}
