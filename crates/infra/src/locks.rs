//! Per-stock-card serialization.
//!
//! Batches touching different stock cards may run concurrently; batches
//! touching the same stock card must not interleave their
//! invalidate-then-recompute sequences.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use stockledger_core::StockCardId;

/// Keyed mutexes, one per stock card.
#[derive(Debug, Default)]
pub struct StockCardLocks {
    inner: Mutex<HashMap<StockCardId, Arc<Mutex<()>>>>,
}

impl StockCardLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn handle(&self, stock_card_id: StockCardId) -> Arc<Mutex<()>> {
        let mut map = self
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        map.entry(stock_card_id).or_default().clone()
    }

    /// Run `f` while holding the lock of every given stock card.
    ///
    /// Locks are acquired in sorted UUID order so two batches touching
    /// overlapping card sets cannot deadlock.
    pub fn with_serialized<R>(&self, stock_card_ids: &[StockCardId], f: impl FnOnce() -> R) -> R {
        let mut sorted = stock_card_ids.to_vec();
        sorted.sort_by_key(|c| *c.as_uuid().as_bytes());
        sorted.dedup();

        let handles: Vec<_> = sorted.iter().map(|&card| self.handle(card)).collect();
        let _guards: Vec<_> = handles
            .iter()
            .map(|m| m.lock().unwrap_or_else(PoisonError::into_inner))
            .collect();

        f()
    }
}
