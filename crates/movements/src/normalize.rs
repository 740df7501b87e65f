//! Movement normalizer: heterogeneous stock event inputs become one flat,
//! uniform `MovementRecord` sequence per batch.

use stockledger_core::{LedgerError, LedgerResult, Location};

use crate::card::StockCardIndex;
use crate::event::{ReasonKind, StockEventBatch, StockEventLine};
use crate::movement::{MovementRecord, Quantity, SourceKind};

/// What kind of stock event triggered this recomputation.
///
/// The merge/walk/invalidate core is identical for both; only the set of
/// line items admitted as "new" differs. Transfers are admitted by both
/// triggers — a transfer always moves real stock.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RecomputeTrigger {
    /// Any movement line is new.
    AnyMovement,
    /// Only physical-inventory lines are new.
    PhysicalInventoryOnly,
}

impl RecomputeTrigger {
    pub fn admits(self, reason: ReasonKind) -> bool {
        match self {
            RecomputeTrigger::AnyMovement => true,
            RecomputeTrigger::PhysicalInventoryOnly => reason.is_physical_inventory(),
        }
    }
}

/// Normalize a raw batch into movement records, resolving stock cards and
/// locations up front.
///
/// Physical-inventory lines become absolute counts, credit reasons become
/// positive deltas, debit reasons negative deltas; transfers split into
/// their two legs. Lines not admitted by `trigger` are skipped.
///
/// Fails with a `ValidationError` on a dangling stock card reference, an
/// unresolvable location with no batch fallback, a negative line quantity,
/// or a non-positive transfer quantity. Nothing is persisted on failure.
pub fn normalize_batch(
    batch: &StockEventBatch,
    index: &StockCardIndex,
    trigger: RecomputeTrigger,
) -> LedgerResult<Vec<MovementRecord>> {
    let mut records = Vec::with_capacity(batch.lines.len() + batch.transfers.len() * 2);

    for line in &batch.lines {
        if !trigger.admits(line.reason) {
            continue;
        }
        records.push(normalize_line(line, batch.default_location.as_ref(), index)?);
    }

    for transfer in &batch.transfers {
        if transfer.quantity <= 0 {
            return Err(LedgerError::validation(format!(
                "transfer quantity must be positive, got {}",
                transfer.quantity
            )));
        }
        records.extend(transfer.legs());
    }

    Ok(records)
}

fn normalize_line(
    line: &StockEventLine,
    default_location: Option<&Location>,
    index: &StockCardIndex,
) -> LedgerResult<MovementRecord> {
    let stock_card_id = index
        .resolve(line.orderable_id, line.lot_id)
        .ok_or_else(|| {
            LedgerError::validation(format!(
                "no stock card for orderable {} (lot {:?})",
                line.orderable_id, line.lot_id
            ))
        })?;

    let location = resolve_location(line, default_location)?;

    if line.quantity < 0 {
        return Err(LedgerError::validation(format!(
            "line quantity cannot be negative, got {}",
            line.quantity
        )));
    }

    let (quantity, source) = if line.reason.is_physical_inventory() {
        (Quantity::Count(line.quantity), SourceKind::PhysicalInventory)
    } else if line.reason.is_credit() {
        (Quantity::Delta(line.quantity), SourceKind::Movement)
    } else {
        (Quantity::Delta(-line.quantity), SourceKind::Movement)
    };

    Ok(MovementRecord {
        stock_card_id,
        location,
        occurred_date: line.occurred_date,
        processed_at: line.processed_at,
        quantity,
        source,
    })
}

fn resolve_location(
    line: &StockEventLine,
    default_location: Option<&Location>,
) -> LedgerResult<Location> {
    if let Some(code) = &line.location_code {
        return Ok(Location {
            code: code.clone(),
            area: line.area.clone(),
        });
    }

    // No location tag on the line: a batch-level fallback is a hard
    // requirement, not a user-correctable condition.
    default_location.cloned().ok_or_else(|| {
        LedgerError::validation(format!(
            "line for orderable {} has no location and the batch has no fallback location",
            line.orderable_id
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use stockledger_core::{FacilityId, OrderableId, StockCardId};

    use crate::card::StockCard;
    use crate::transfer::LocationTransfer;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn processed(d: u32, h: u32) -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, d, h, 0, 0).unwrap()
    }

    fn line(orderable_id: OrderableId, reason: ReasonKind, quantity: i64) -> StockEventLine {
        StockEventLine {
            orderable_id,
            lot_id: None,
            occurred_date: day(1),
            processed_at: processed(1, 10),
            quantity,
            reason,
            location_code: Some("A1".to_string()),
            area: None,
        }
    }

    fn setup() -> (StockCard, StockCardIndex) {
        let card = StockCard::new(
            StockCardId::new(),
            FacilityId::new(),
            OrderableId::new(),
            None,
        );
        let index = StockCardIndex::from_cards([&card]);
        (card, index)
    }

    fn batch(card: &StockCard, lines: Vec<StockEventLine>) -> StockEventBatch {
        StockEventBatch {
            facility_id: card.facility_id,
            lines,
            transfers: vec![],
            default_location: None,
        }
    }

    #[test]
    fn credit_and_debit_reasons_become_signed_deltas() {
        let (card, index) = setup();
        let records = normalize_batch(
            &batch(
                &card,
                vec![
                    line(card.orderable_id, ReasonKind::Receive, 10),
                    line(card.orderable_id, ReasonKind::Issue, 3),
                ],
            ),
            &index,
            RecomputeTrigger::AnyMovement,
        )
        .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].quantity, Quantity::Delta(10));
        assert_eq!(records[1].quantity, Quantity::Delta(-3));
        assert!(records.iter().all(|r| r.stock_card_id == card.id));
        assert!(records.iter().all(|r| r.source == SourceKind::Movement));
    }

    #[test]
    fn physical_inventory_becomes_absolute_count() {
        let (card, index) = setup();
        let records = normalize_batch(
            &batch(
                &card,
                vec![line(card.orderable_id, ReasonKind::PhysicalInventory, 7)],
            ),
            &index,
            RecomputeTrigger::AnyMovement,
        )
        .unwrap();

        assert_eq!(records[0].quantity, Quantity::Count(7));
        assert_eq!(records[0].source, SourceKind::PhysicalInventory);
    }

    #[test]
    fn missing_location_falls_back_to_batch_default() {
        let (card, index) = setup();
        let mut untagged = line(card.orderable_id, ReasonKind::Receive, 5);
        untagged.location_code = None;

        let mut b = batch(&card, vec![untagged]);
        b.default_location = Some(Location::with_area("MAIN", "dry"));

        let records = normalize_batch(&b, &index, RecomputeTrigger::AnyMovement).unwrap();
        assert_eq!(records[0].location, Location::with_area("MAIN", "dry"));
    }

    #[test]
    fn missing_location_without_fallback_is_fatal() {
        let (card, index) = setup();
        let mut untagged = line(card.orderable_id, ReasonKind::Receive, 5);
        untagged.location_code = None;

        let err = normalize_batch(
            &batch(&card, vec![untagged]),
            &index,
            RecomputeTrigger::AnyMovement,
        )
        .unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
    }

    #[test]
    fn dangling_stock_card_reference_is_rejected() {
        let (card, index) = setup();
        let err = normalize_batch(
            &batch(&card, vec![line(OrderableId::new(), ReasonKind::Receive, 5)]),
            &index,
            RecomputeTrigger::AnyMovement,
        )
        .unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
    }

    #[test]
    fn physical_inventory_trigger_skips_regular_movements() {
        let (card, index) = setup();
        let records = normalize_batch(
            &batch(
                &card,
                vec![
                    line(card.orderable_id, ReasonKind::Receive, 10),
                    line(card.orderable_id, ReasonKind::PhysicalInventory, 4),
                ],
            ),
            &index,
            RecomputeTrigger::PhysicalInventoryOnly,
        )
        .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].quantity, Quantity::Count(4));
    }

    #[test]
    fn batch_transfers_expand_into_two_legs() {
        let (card, index) = setup();
        let mut b = batch(&card, vec![]);
        b.transfers.push(LocationTransfer {
            stock_card_id: card.id,
            source: Location::new("A1"),
            destination: Location::new("B1"),
            quantity: 4,
            occurred_date: day(2),
            processed_at: processed(2, 9),
        });

        let records = normalize_batch(&b, &index, RecomputeTrigger::AnyMovement).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].quantity, Quantity::Delta(-4));
        assert_eq!(records[1].quantity, Quantity::Delta(4));
    }

    #[test]
    fn non_positive_transfer_quantity_is_rejected() {
        let (card, index) = setup();
        let mut b = batch(&card, vec![]);
        b.transfers.push(LocationTransfer {
            stock_card_id: card.id,
            source: Location::new("A1"),
            destination: Location::new("B1"),
            quantity: 0,
            occurred_date: day(2),
            processed_at: processed(2, 9),
        });

        let err = normalize_batch(&b, &index, RecomputeTrigger::AnyMovement).unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
    }

    #[test]
    fn negative_line_quantity_is_rejected() {
        let (card, index) = setup();
        let err = normalize_batch(
            &batch(&card, vec![line(card.orderable_id, ReasonKind::Receive, -1)]),
            &index,
            RecomputeTrigger::AnyMovement,
        )
        .unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
    }
}
