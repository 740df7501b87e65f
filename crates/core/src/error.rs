//! Domain error model.

use chrono::NaiveDate;
use thiserror::Error;

use crate::id::StockCardId;

/// Result type used across the ledger domain.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Details of a rejected debit: applying `delta` to `prior_balance` would
/// drive the stock card's on-hand quantity below zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NegativeStockOnHand {
    pub stock_card_id: StockCardId,
    /// Product code for diagnostics. `None` when the reference-data lookup
    /// failed; the violation itself is unaffected.
    pub product_code: Option<String>,
    pub occurred_date: NaiveDate,
    pub delta: i64,
    pub prior_balance: i64,
}

impl NegativeStockOnHand {
    pub fn with_product_code(mut self, code: impl Into<String>) -> Self {
        self.product_code = Some(code.into());
        self
    }
}

impl core::fmt::Display for NegativeStockOnHand {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match &self.product_code {
            Some(code) => write!(
                f,
                "debit exceeds stock on hand for product {} (stock card {}) on {}: balance {}, change {}",
                code, self.stock_card_id, self.occurred_date, self.prior_balance, self.delta
            ),
            None => write!(
                f,
                "debit exceeds stock on hand for stock card {} on {}: balance {}, change {}",
                self.stock_card_id, self.occurred_date, self.prior_balance, self.delta
            ),
        }
    }
}

/// Domain-level error.
///
/// Keep this focused on deterministic failures of the recomputation core
/// (malformed input, violated balance invariants, corrupted ledger state).
/// Storage concerns belong to the infrastructure layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// A value failed validation (e.g. malformed input, unresolvable
    /// location, dangling stock card reference). Rejected before any
    /// persistence happens.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A debit would drive a balance negative. The whole batch is rejected
    /// and nothing is persisted.
    #[error("{0}")]
    DebitExceedsStockOnHand(NegativeStockOnHand),

    /// Duplicate entry for the same (stock card, location, date), or a
    /// non-convergent recompute. Fatal and internal; should never occur
    /// under correct operation.
    #[error("inconsistent ledger state: {0}")]
    InconsistentState(String),
}

impl LedgerError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn inconsistent(msg: impl Into<String>) -> Self {
        Self::InconsistentState(msg.into())
    }
}

impl From<NegativeStockOnHand> for LedgerError {
    fn from(value: NegativeStockOnHand) -> Self {
        Self::DebitExceedsStockOnHand(value)
    }
}

/// A diagnostic reference-data lookup failed (e.g. product code).
///
/// Non-fatal: callers catch this locally and continue with degraded
/// error-message detail.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("reference data unavailable: {0}")]
pub struct ReferenceDataError(pub String);

impl ReferenceDataError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}
