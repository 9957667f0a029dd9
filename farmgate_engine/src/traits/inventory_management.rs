use thiserror::Error;

use crate::{
    db_types::{Listing, NewListing},
    traits::InventoryOutcome,
};

#[allow(async_fn_in_trait)]
pub trait InventoryManagement: Clone {
    async fn fetch_listing(&self, listing_id: i64) -> Result<Option<Listing>, InventoryError>;

    async fn insert_listing(&self, listing: NewListing) -> Result<Listing, InventoryError>;

    /// Removes `quantity` units from the listing on behalf of the payment `reference`, in one atomic step:
    ///
    /// * A fence row for `(reference, listing_id)` is claimed. If it already exists the call returns
    ///   [`InventoryOutcome::AlreadyApplied`] and changes nothing.
    /// * `available_quantity` is decremented only if at least `quantity` units are available. The listing is marked
    ///   `sold_out` when nothing is left.
    ///
    /// A shortfall or a missing listing leaves no trace, so the adjustment can be retried later.
    async fn apply_inventory_adjustment(
        &self,
        reference: &str,
        listing_id: i64,
        quantity: i64,
    ) -> Result<InventoryOutcome, InventoryError>;
}

#[derive(Debug, Clone, Error)]
pub enum InventoryError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Cannot adjust stock by {0} units")]
    InvalidQuantity(i64),
}

impl From<sqlx::Error> for InventoryError {
    fn from(e: sqlx::Error) -> Self {
        InventoryError::DatabaseError(e.to_string())
    }
}
