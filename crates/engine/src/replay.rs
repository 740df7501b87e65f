//! Balance recomputation: a single forward walk over a merged chronology.

use chrono::NaiveDate;

use stockledger_core::NegativeStockOnHand;
use stockledger_movements::{MovementRecord, Quantity};

use crate::entry::{DailyBalance, LedgerKey};

/// Walk `chronology` (already merged and totally ordered) carrying a
/// running balance, emitting one closing balance per occurred date.
///
/// `opening_balance` is the last known balance strictly before the
/// chronology's earliest date (0 if none). An absolute count sets the
/// running balance outright — counts are non-negative by construction, so
/// no negativity check applies. A signed delta adds to it, and a negative
/// result rejects the whole batch with the violating record's date, the
/// unmet delta, and the balance it found.
///
/// Deterministic: identical chronology + opening balance always yields
/// identical output. The engine re-runs on every batch touching a stock
/// card, including ones that only add historical records.
pub fn replay_balances(
    key: &LedgerKey,
    chronology: &[MovementRecord],
    opening_balance: i64,
) -> Result<Vec<DailyBalance>, NegativeStockOnHand> {
    let mut balances: Vec<DailyBalance> = Vec::new();
    let mut running = opening_balance;
    let mut open_date: Option<NaiveDate> = None;

    for record in chronology {
        debug_assert!(
            open_date.is_none_or(|d| d <= record.occurred_date),
            "chronology must be sorted before replay"
        );

        // Date boundary: the previous date's closing balance is final.
        if let Some(date) = open_date
            && date != record.occurred_date
        {
            balances.push(DailyBalance {
                occurred_date: date,
                stock_on_hand: running,
            });
        }

        match record.quantity {
            Quantity::Count(count) => running = count,
            Quantity::Delta(delta) => {
                let next = running + delta;
                if next < 0 {
                    return Err(NegativeStockOnHand {
                        stock_card_id: key.stock_card_id,
                        product_code: None,
                        occurred_date: record.occurred_date,
                        delta,
                        prior_balance: running,
                    });
                }
                running = next;
            }
        }

        open_date = Some(record.occurred_date);
    }

    if let Some(date) = open_date {
        balances.push(DailyBalance {
            occurred_date: date,
            stock_on_hand: running,
        });
    }

    Ok(balances)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use proptest::prelude::*;
    use stockledger_core::{Location, StockCardId};
    use stockledger_movements::SourceKind;

    use crate::chronology::merge_chronology;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn at(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, d, h, 0, 0).unwrap()
    }

    fn test_key() -> LedgerKey {
        LedgerKey::new(StockCardId::new(), Location::new("A1"))
    }

    fn movement(key: &LedgerKey, d: u32, h: u32, quantity: Quantity) -> MovementRecord {
        MovementRecord {
            stock_card_id: key.stock_card_id,
            location: key.location.clone(),
            occurred_date: day(d),
            processed_at: at(d, h),
            quantity,
            source: match quantity {
                Quantity::Count(_) => SourceKind::PhysicalInventory,
                Quantity::Delta(_) => SourceKind::Movement,
            },
        }
    }

    #[test]
    fn emits_one_closing_balance_per_date() {
        let key = test_key();
        let chronology = vec![
            movement(&key, 1, 9, Quantity::Delta(10)),
            movement(&key, 2, 9, Quantity::Delta(-3)),
        ];

        let balances = replay_balances(&key, &chronology, 0).unwrap();
        assert_eq!(
            balances,
            vec![
                DailyBalance {
                    occurred_date: day(1),
                    stock_on_hand: 10
                },
                DailyBalance {
                    occurred_date: day(2),
                    stock_on_hand: 7
                },
            ]
        );
    }

    #[test]
    fn same_day_records_collapse_into_one_entry() {
        let key = test_key();
        let chronology = vec![
            movement(&key, 1, 9, Quantity::Delta(10)),
            movement(&key, 1, 10, Quantity::Delta(-4)),
            movement(&key, 1, 11, Quantity::Delta(1)),
        ];

        let balances = replay_balances(&key, &chronology, 0).unwrap();
        assert_eq!(balances.len(), 1);
        assert_eq!(balances[0].stock_on_hand, 7);
    }

    #[test]
    fn backdated_insertion_shifts_downstream_balances() {
        let key = test_key();
        let existing = vec![
            movement(&key, 1, 9, Quantity::Delta(10)),
            movement(&key, 2, 9, Quantity::Delta(-3)),
        ];
        // Reported after the day-2 issue but occurred on day 1.
        let mut backdated = movement(&key, 1, 9, Quantity::Delta(5));
        backdated.processed_at = at(3, 9);

        let merged = merge_chronology(existing, vec![backdated]);
        let balances = replay_balances(&key, &merged, 0).unwrap();
        assert_eq!(
            balances,
            vec![
                DailyBalance {
                    occurred_date: day(1),
                    stock_on_hand: 15
                },
                DailyBalance {
                    occurred_date: day(2),
                    stock_on_hand: 12
                },
            ]
        );
    }

    #[test]
    fn physical_inventory_resets_the_running_balance() {
        let key = test_key();
        let chronology = vec![
            movement(&key, 1, 9, Quantity::Delta(10)),
            movement(&key, 2, 9, Quantity::Delta(-3)),
            movement(&key, 3, 9, Quantity::Count(2)),
            movement(&key, 4, 9, Quantity::Delta(1)),
        ];

        let balances = replay_balances(&key, &chronology, 0).unwrap();
        assert_eq!(balances[2].stock_on_hand, 2);
        assert_eq!(balances[3].stock_on_hand, 3);
    }

    #[test]
    fn count_applies_without_negativity_check_on_prior_balance() {
        let key = test_key();
        // Count below the running balance is authoritative, not a debit.
        let chronology = vec![
            movement(&key, 1, 9, Quantity::Delta(7)),
            movement(&key, 2, 9, Quantity::Count(0)),
        ];

        let balances = replay_balances(&key, &chronology, 0).unwrap();
        assert_eq!(balances[1].stock_on_hand, 0);
    }

    #[test]
    fn overdrawn_debit_carries_violation_detail() {
        let key = test_key();
        let chronology = vec![
            movement(&key, 1, 9, Quantity::Delta(7)),
            movement(&key, 2, 9, Quantity::Delta(-20)),
        ];

        let violation = replay_balances(&key, &chronology, 0).unwrap_err();
        assert_eq!(violation.stock_card_id, key.stock_card_id);
        assert_eq!(violation.occurred_date, day(2));
        assert_eq!(violation.delta, -20);
        assert_eq!(violation.prior_balance, 7);
        assert_eq!(violation.product_code, None);
    }

    #[test]
    fn opening_balance_seeds_the_walk() {
        let key = test_key();
        let chronology = vec![movement(&key, 5, 9, Quantity::Delta(-4))];

        let balances = replay_balances(&key, &chronology, 10).unwrap();
        assert_eq!(balances[0].stock_on_hand, 6);
    }

    #[test]
    fn empty_chronology_emits_nothing() {
        let key = test_key();
        assert_eq!(replay_balances(&key, &[], 3).unwrap(), vec![]);
    }

    fn arb_quantity() -> impl Strategy<Value = Quantity> {
        prop_oneof![
            (-50i64..50).prop_map(Quantity::Delta),
            (0i64..100).prop_map(Quantity::Count),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Every accepted chronology yields only non-negative balances, and
        /// replaying it is deterministic.
        #[test]
        fn accepted_walks_never_go_negative(
            quantities in prop::collection::vec((1u32..28, 0u32..24, arb_quantity()), 0..40),
            opening in 0i64..100,
        ) {
            let key = test_key();
            let chronology = merge_chronology(
                quantities
                    .iter()
                    .map(|&(d, h, q)| movement(&key, d, h, q))
                    .collect(),
                vec![],
            );

            if let Ok(balances) = replay_balances(&key, &chronology, opening) {
                for balance in &balances {
                    prop_assert!(balance.stock_on_hand >= 0);
                }
                for pair in balances.windows(2) {
                    prop_assert!(pair[0].occurred_date < pair[1].occurred_date);
                }
                prop_assert_eq!(
                    replay_balances(&key, &chronology, opening).unwrap(),
                    balances
                );
            }
        }
    }
}
