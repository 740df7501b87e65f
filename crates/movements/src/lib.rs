//! `stockledger-movements` — stock cards, movement records, and the
//! movement normalizer.
//!
//! Everything here is pure data + conversion; balances are computed by
//! `stockledger-engine` and persisted by `stockledger-infra`.

pub mod card;
pub mod event;
pub mod movement;
pub mod normalize;
pub mod transfer;

pub use card::{StockCard, StockCardIndex};
pub use event::{ReasonKind, StockEventBatch, StockEventLine};
pub use movement::{MovementRecord, Quantity, SourceKind};
pub use normalize::{RecomputeTrigger, normalize_batch};
pub use transfer::LocationTransfer;
