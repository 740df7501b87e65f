//! `stockledger-engine` — chronology merging and balance recomputation.
//!
//! Pure and deterministic: no IO happens inside the walk. Inputs (prior
//! balance, pre-existing records) are fetched up front by the coordinator
//! in `stockledger-infra`.

pub mod chronology;
pub mod entry;
pub mod replay;

pub use chronology::{merge_chronology, partition_by_key};
pub use entry::{DailyBalance, LedgerEntry, LedgerKey};
pub use replay::replay_balances;
