use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewOrder, NewOrderItem, Order, OrderItem},
    traits::SettlementDatabaseError,
};

/// Inserts a new order and its lines using the given connection. This is not atomic. You can embed this call
/// inside a transaction if you need to ensure atomicity, and pass `&mut *tx` as the connection argument.
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, SettlementDatabaseError> {
    if order.items.is_empty() {
        return Err(SettlementDatabaseError::InvalidOrder("An order must have at least one item".into()));
    }
    if let Some(item) = order.items.iter().find(|i| i.quantity <= 0) {
        return Err(SettlementDatabaseError::InvalidOrder(format!(
            "Listing {} was ordered with a quantity of {}",
            item.listing_id, item.quantity
        )));
    }
    let items = merge_duplicate_lines(&order.items)?;
    let new_order: Order = sqlx::query_as(
        r#"
            INSERT INTO orders (buyer_id, subtotal, shipping, tax, total)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *;
        "#,
    )
    .bind(order.buyer_id)
    .bind(order.subtotal())
    .bind(order.shipping)
    .bind(order.tax)
    .bind(order.total())
    .fetch_one(&mut *conn)
    .await?;
    for item in &items {
        sqlx::query(
            r#"
                INSERT INTO order_items (order_id, listing_id, quantity, price, total)
                VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(new_order.id)
        .bind(item.listing_id)
        .bind(item.quantity)
        .bind(item.price)
        .bind(item.price * item.quantity)
        .execute(&mut *conn)
        .await?;
    }
    debug!("📝️ Order #{} inserted with {} items for {}", new_order.id, items.len(), new_order.total);
    Ok(new_order)
}

/// Folds lines for the same listing into a single line. Stock fences and commissions are keyed on the listing, so
/// an order carries at most one line per listing.
fn merge_duplicate_lines(items: &[NewOrderItem]) -> Result<Vec<NewOrderItem>, SettlementDatabaseError> {
    let mut merged: Vec<NewOrderItem> = Vec::with_capacity(items.len());
    for item in items {
        match merged.iter_mut().find(|m| m.listing_id == item.listing_id) {
            Some(line) if line.price != item.price => {
                return Err(SettlementDatabaseError::InvalidOrder(format!(
                    "Listing {} appears more than once with different prices ({} and {})",
                    item.listing_id, line.price, item.price
                )));
            },
            Some(line) => line.quantity += item.quantity,
            None => merged.push(item.clone()),
        }
    }
    Ok(merged)
}

pub async fn fetch_order(order_id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(order_id).fetch_optional(conn).await?;
    Ok(order)
}

pub async fn fetch_order_items(order_id: i64, conn: &mut SqliteConnection) -> Result<Vec<OrderItem>, sqlx::Error> {
    let items = sqlx::query_as(
        r#"
            SELECT order_items.*, listings.farmer_id AS farmer_id
            FROM order_items LEFT JOIN listings ON listings.id = order_items.listing_id
            WHERE order_items.order_id = $1
            ORDER BY order_items.id ASC
        "#,
    )
    .bind(order_id)
    .fetch_all(conn)
    .await?;
    Ok(items)
}

/// Sets the order to `confirmed/paid`. Orders whose payment status has already moved on from `pending` are left alone.
/// Returns `true` if the order was updated.
pub async fn confirm_payment(order_id: i64, reference: &str, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
            UPDATE orders SET
                status = 'confirmed',
                payment_status = 'paid',
                payment_reference = $1,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $2 AND payment_status = 'pending'
        "#,
    )
    .bind(reference)
    .bind(order_id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}
