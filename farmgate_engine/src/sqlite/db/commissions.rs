use log::debug;
use sqlx::{types::Json, SqliteConnection};

use crate::{
    db_types::{Commission, CommissionKey, NewCommission},
    sqlite::db::is_unique_violation,
    traits::CommissionError,
};

pub async fn commission_exists(key: &CommissionKey, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let count: i64 = sqlx::query_scalar(
        r#"
            SELECT COUNT(*) FROM commissions
            WHERE partner_id = $1 AND farmer_id = $2 AND order_id = $3 AND listing_id = $4
        "#,
    )
    .bind(key.partner_id)
    .bind(key.farmer_id)
    .bind(key.order_id)
    .bind(key.listing_id)
    .fetch_one(conn)
    .await?;
    Ok(count > 0)
}

/// Inserts a `pending` commission row. The unique index on the commission key turns a concurrent duplicate into
/// [`CommissionError::AlreadyExists`].
pub async fn insert_commission(
    commission: NewCommission,
    conn: &mut SqliteConnection,
) -> Result<Commission, CommissionError> {
    let key = commission.key;
    let result: Result<Commission, sqlx::Error> = sqlx::query_as(
        r#"
            INSERT INTO commissions (
                partner_id,
                farmer_id,
                order_id,
                listing_id,
                amount,
                rate_bps,
                order_amount,
                metadata
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *;
        "#,
    )
    .bind(key.partner_id)
    .bind(key.farmer_id)
    .bind(key.order_id)
    .bind(key.listing_id)
    .bind(commission.amount)
    .bind(commission.rate)
    .bind(commission.order_amount)
    .bind(Json(commission.metadata))
    .fetch_one(conn)
    .await;
    match result {
        Ok(c) => {
            debug!("💸️ Commission #{} of {} recorded for partner #{}", c.id, c.amount, c.partner_id);
            Ok(c)
        },
        Err(e) if is_unique_violation(&e) => Err(CommissionError::AlreadyExists(key)),
        Err(e) => Err(e.into()),
    }
}

pub async fn fetch_commissions_for_order(
    order_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<Commission>, sqlx::Error> {
    let commissions = sqlx::query_as("SELECT * FROM commissions WHERE order_id = $1 ORDER BY id ASC")
        .bind(order_id)
        .fetch_all(conn)
        .await?;
    Ok(commissions)
}
