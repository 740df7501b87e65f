//! Strongly-typed identifiers used across the domain.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::LedgerError;

/// Identifier of a health facility.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FacilityId(Uuid);

/// Identifier of an orderable product.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderableId(Uuid);

/// Identifier of a product lot (manufacturing batch).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LotId(Uuid);

/// Identifier of a stock card (facility x product x optional lot).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StockCardId(Uuid);

/// Identifier of a persisted ledger entry row.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LedgerEntryId(Uuid);

macro_rules! impl_uuid_newtype {
    ($t:ty, $name:literal) => {
        impl $t {
            /// Create a new identifier.
            ///
            /// Uses UUIDv7 (time-ordered). Prefer passing IDs explicitly in tests
            /// for determinism.
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<Uuid> for $t {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl From<$t> for Uuid {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = LedgerError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let uuid = Uuid::from_str(s)
                    .map_err(|e| LedgerError::validation(format!("{}: {}", $name, e)))?;
                Ok(Self(uuid))
            }
        }
    };
}

impl_uuid_newtype!(FacilityId, "FacilityId");
impl_uuid_newtype!(OrderableId, "OrderableId");
impl_uuid_newtype!(LotId, "LotId");
impl_uuid_newtype!(StockCardId, "StockCardId");
impl_uuid_newtype!(LedgerEntryId, "LedgerEntryId");

/// Namespace for deterministic ledger entry identifiers.
const LEDGER_ENTRY_NAMESPACE: Uuid = Uuid::from_u128(0x8f2f_1c6a_5d04_4b7e_9b0a_3d6e_2c81_7f45);

impl LedgerEntryId {
    /// Deterministic identifier for the (stock card, location, date) row.
    ///
    /// Recomputation deletes and recreates rows; deriving the id from the
    /// row's natural key makes identical recomputations produce identical
    /// rows, which keeps replay idempotent down to the byte level.
    pub fn derived(
        stock_card_id: StockCardId,
        location: &crate::location::Location,
        occurred_date: chrono::NaiveDate,
    ) -> Self {
        let mut name = Vec::with_capacity(64);
        name.extend_from_slice(stock_card_id.as_uuid().as_bytes());
        name.extend_from_slice(location.code.as_bytes());
        name.push(0);
        if let Some(area) = &location.area {
            name.extend_from_slice(area.as_bytes());
        }
        name.push(0);
        name.extend_from_slice(occurred_date.to_string().as_bytes());
        Self(Uuid::new_v5(&LEDGER_ENTRY_NAMESPACE, &name))
    }
}
