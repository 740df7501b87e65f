//! Infrastructure layer: ledger persistence, per-card serialization, and
//! the batch recomputation coordinator.

pub mod coordinator;
pub mod locks;
pub mod store;


pub use coordinator::{BatchError, RecomputationCoordinator};
pub use locks::StockCardLocks;
pub use store::{
    InMemoryLedgerStore, InMemoryMovementSource, InMemoryProductCatalog, LedgerMutation,
    LedgerStore, MovementSource, PostgresLedgerStore, ProductCatalog, StoreError,
};
