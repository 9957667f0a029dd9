use serde::{Deserialize, Serialize};

use crate::db_types::ListingStatus;

/// The result of applying one order line to a listing's stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum InventoryOutcome {
    Adjusted { new_available: i64, new_status: ListingStatus },
    /// Fewer units were available than ordered. Nothing was changed.
    Shortfall { available: i64 },
    /// This payment has already decremented this listing.
    AlreadyApplied,
    ListingNotFound,
}

impl InventoryOutcome {
    pub fn is_shortfall(&self) -> bool {
        matches!(self, InventoryOutcome::Shortfall { .. })
    }
}
