use log::*;

use crate::{
    db_types::ListingStatus,
    traits::{InventoryError, InventoryManagement, InventoryOutcome},
};

/// Applies settled order lines to listing stock.
///
/// Stock is never read and then written. The backend performs one conditional decrement that only succeeds if
/// enough units are available, and fences it on the payment reference so that a payment can only ever take stock
/// from a listing once.
#[derive(Clone)]
pub struct InventoryReconciler<B> {
    db: B,
}

impl<B> InventoryReconciler<B>
where B: InventoryManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub async fn reconcile(
        &self,
        reference: &str,
        listing_id: i64,
        quantity: i64,
    ) -> Result<InventoryOutcome, InventoryError> {
        let outcome = self.db.apply_inventory_adjustment(reference, listing_id, quantity).await?;
        match outcome {
            InventoryOutcome::Adjusted { new_available, new_status: ListingStatus::SoldOut } => {
                info!("🥕️ Listing #{listing_id} is sold out ({new_available} left) after [{reference}]");
            },
            InventoryOutcome::Adjusted { new_available, .. } => {
                debug!("🥕️ Listing #{listing_id} reduced by {quantity} to {new_available} for [{reference}]");
            },
            InventoryOutcome::Shortfall { available } => {
                warn!(
                    "🥕️ Listing #{listing_id} only has {available} units but [{reference}] paid for {quantity}. The \
                     stock has not been adjusted."
                );
            },
            InventoryOutcome::AlreadyApplied => {
                debug!("🥕️ Listing #{listing_id} was already adjusted for [{reference}]");
            },
            InventoryOutcome::ListingNotFound => {
                warn!("🥕️ Listing #{listing_id} no longer exists. [{reference}] cannot take stock from it.");
            },
        }
        Ok(outcome)
    }
}
