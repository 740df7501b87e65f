use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use stockledger_core::{Entity, FacilityId, LotId, OrderableId, StockCardId};

/// Identity of one trackable inventory unit: facility x product x lot, or
/// facility x product for non-lot kits. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockCard {
    pub id: StockCardId,
    pub facility_id: FacilityId,
    pub orderable_id: OrderableId,
    pub lot_id: Option<LotId>,
}

impl StockCard {
    pub fn new(
        id: StockCardId,
        facility_id: FacilityId,
        orderable_id: OrderableId,
        lot_id: Option<LotId>,
    ) -> Self {
        Self {
            id,
            facility_id,
            orderable_id,
            lot_id,
        }
    }
}

impl Entity for StockCard {
    type Id = StockCardId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Resolves batch line items to stock cards.
///
/// Built by the caller from the stock cards belonging to the batch's
/// facility. A line referencing a (product, lot) pair that is absent here is
/// a dangling reference and fails validation during normalization.
#[derive(Debug, Clone, Default)]
pub struct StockCardIndex {
    by_product: HashMap<(OrderableId, Option<LotId>), StockCardId>,
    orderables: HashMap<StockCardId, OrderableId>,
}

impl StockCardIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, card: &StockCard) {
        self.by_product
            .insert((card.orderable_id, card.lot_id), card.id);
        self.orderables.insert(card.id, card.orderable_id);
    }

    pub fn from_cards<'a>(cards: impl IntoIterator<Item = &'a StockCard>) -> Self {
        let mut index = Self::new();
        for card in cards {
            index.insert(card);
        }
        index
    }

    pub fn resolve(&self, orderable_id: OrderableId, lot_id: Option<LotId>) -> Option<StockCardId> {
        self.by_product.get(&(orderable_id, lot_id)).copied()
    }

    /// Reverse lookup used to enrich violation messages with a product code.
    pub fn orderable_of(&self, stock_card_id: StockCardId) -> Option<OrderableId> {
        self.orderables.get(&stock_card_id).copied()
    }
}
