use log::{debug, trace};
use sqlx::{Row, SqliteConnection};

use crate::{
    db_types::{Listing, ListingStatus, NewListing},
    sqlite::db::is_unique_violation,
    traits::{InventoryError, InventoryOutcome},
};

pub async fn fetch_listing(listing_id: i64, conn: &mut SqliteConnection) -> Result<Option<Listing>, sqlx::Error> {
    let listing =
        sqlx::query_as("SELECT * FROM listings WHERE id = $1").bind(listing_id).fetch_optional(conn).await?;
    Ok(listing)
}

pub async fn insert_listing(listing: NewListing, conn: &mut SqliteConnection) -> Result<Listing, sqlx::Error> {
    let listing: Listing = sqlx::query_as(
        r#"
            INSERT INTO listings (farmer_id, title, quantity, available_quantity, price, status)
            VALUES ($1, $2, $3, $3, $4, 'active')
            RETURNING *;
        "#,
    )
    .bind(listing.farmer_id)
    .bind(listing.title)
    .bind(listing.quantity)
    .bind(listing.price)
    .fetch_one(conn)
    .await?;
    debug!("🥕️ Listing #{} created with {} units", listing.id, listing.available_quantity);
    Ok(listing)
}

/// Claims the `(reference, listing_id)` fence. Returns `false` if it was already claimed.
pub async fn claim_adjustment_fence(
    reference: &str,
    listing_id: i64,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("INSERT INTO inventory_adjustments (reference, listing_id, quantity) VALUES ($1, $2, $3)")
        .bind(reference)
        .bind(listing_id)
        .bind(quantity)
        .execute(conn)
        .await;
    match result {
        Ok(_) => Ok(true),
        Err(e) if is_unique_violation(&e) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Decrements `available_quantity` by `quantity`, but only if that many units are available. The precondition and
/// the mutation are a single statement, so concurrent decrements can never take the stock below zero.
///
/// Returns the new available quantity and status, or `None` if the guard failed (or the listing does not exist).
pub async fn conditional_decrement(
    listing_id: i64,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<(i64, ListingStatus)>, sqlx::Error> {
    let row = sqlx::query(
        r#"
            UPDATE listings SET
                available_quantity = available_quantity - $1,
                status = CASE WHEN available_quantity - $1 <= 0 THEN 'sold_out' ELSE status END,
                sold_out_at = CASE WHEN available_quantity - $1 <= 0 THEN CURRENT_TIMESTAMP ELSE sold_out_at END,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $2 AND available_quantity >= $1
            RETURNING available_quantity, status
        "#,
    )
    .bind(quantity)
    .bind(listing_id)
    .fetch_optional(conn)
    .await?;
    match row {
        Some(row) => {
            let available: i64 = row.try_get("available_quantity")?;
            let status: ListingStatus = row.try_get("status")?;
            Ok(Some((available, status)))
        },
        None => Ok(None),
    }
}

pub async fn fetch_available_quantity(listing_id: i64, conn: &mut SqliteConnection) -> Result<Option<i64>, sqlx::Error> {
    let available = sqlx::query_scalar("SELECT available_quantity FROM listings WHERE id = $1")
        .bind(listing_id)
        .fetch_optional(conn)
        .await?;
    Ok(available)
}

/// The fenced decrement described in [`crate::traits::InventoryManagement::apply_inventory_adjustment`]. Must be
/// called inside a database transaction; the caller commits only for [`InventoryOutcome::Adjusted`].
pub async fn fenced_decrement(
    reference: &str,
    listing_id: i64,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<InventoryOutcome, InventoryError> {
    if !claim_adjustment_fence(reference, listing_id, quantity, conn).await? {
        trace!("🥕️ Listing #{listing_id} has already been adjusted for {reference}");
        return Ok(InventoryOutcome::AlreadyApplied);
    }
    if let Some((new_available, new_status)) = conditional_decrement(listing_id, quantity, conn).await? {
        return Ok(InventoryOutcome::Adjusted { new_available, new_status });
    }
    let outcome = match fetch_available_quantity(listing_id, conn).await? {
        Some(available) => InventoryOutcome::Shortfall { available },
        None => InventoryOutcome::ListingNotFound,
    };
    Ok(outcome)
}
