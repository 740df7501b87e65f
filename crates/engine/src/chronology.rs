//! Chronology merger: one total order per (stock card, location) key.

use std::collections::HashMap;

use stockledger_movements::MovementRecord;

use crate::entry::LedgerKey;

/// Merge pre-existing records with newly reported ones into a single total
/// order for one key.
///
/// Ordering: `occurred_date` ascending, then `processed_at` ascending. A
/// new same-day record lands after exactly as many pre-existing same-day
/// records as have both occurred date and processed timestamp not-after it
/// — i.e. new records insert in arrival order among same-day events. That
/// rule is upper-bound insertion, which a stable sort of
/// `existing ++ incoming` reproduces exactly: equal keys keep input order,
/// existing before incoming and incoming in arrival order. Transfer legs
/// sort by the same rule, no special-casing.
///
/// Deterministic and stable for identical inputs (required for idempotent
/// replay).
pub fn merge_chronology(
    existing: Vec<MovementRecord>,
    incoming: Vec<MovementRecord>,
) -> Vec<MovementRecord> {
    let mut merged = existing;
    merged.extend(incoming);
    // Vec::sort_by_key is stable.
    merged.sort_by_key(MovementRecord::chronology_key);
    merged
}

/// Group a normalized batch by (stock card, location) key, preserving the
/// arrival order of records within each partition.
pub fn partition_by_key(records: Vec<MovementRecord>) -> HashMap<LedgerKey, Vec<MovementRecord>> {
    let mut partitions: HashMap<LedgerKey, Vec<MovementRecord>> = HashMap::new();
    for record in records {
        let key = LedgerKey::new(record.stock_card_id, record.location.clone());
        partitions.entry(key).or_default().push(record);
    }
    partitions
}
