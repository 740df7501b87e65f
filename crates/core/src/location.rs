//! Storage locations inside a facility.

use serde::{Deserialize, Serialize};

use crate::value_object::ValueObject;

/// A storage location within a facility (e.g. shelf "A1" in area "cold").
///
/// Compared structurally; usable directly as a map key. Normalized movement
/// records always carry a resolved `Location` — optional location tags are
/// resolved once, during normalization, never inside the balance walk.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Location {
    pub code: String,
    pub area: Option<String>,
}

impl Location {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            area: None,
        }
    }

    pub fn with_area(code: impl Into<String>, area: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            area: Some(area.into()),
        }
    }
}

impl ValueObject for Location {}

impl core::fmt::Display for Location {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match &self.area {
            Some(area) => write!(f, "{}/{}", area, self.code),
            None => write!(f, "{}", self.code),
        }
    }
}
