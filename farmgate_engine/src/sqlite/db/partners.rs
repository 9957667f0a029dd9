use chrono::{DateTime, Utc};
use fg_common::{Kobo, Rate};
use log::debug;
use sqlx::SqliteConnection;

use crate::db_types::{NewReferral, Partner, Referral};

pub async fn insert_partner(
    user_id: i64,
    commission_rate: Option<Rate>,
    conn: &mut SqliteConnection,
) -> Result<Partner, sqlx::Error> {
    let partner: Partner =
        sqlx::query_as("INSERT INTO partners (user_id, commission_rate_bps) VALUES ($1, $2) RETURNING *")
            .bind(user_id)
            .bind(commission_rate)
            .fetch_one(conn)
            .await?;
    debug!("🤝️ Partner #{} created for user #{user_id}", partner.id);
    Ok(partner)
}

pub async fn fetch_partner(partner_id: i64, conn: &mut SqliteConnection) -> Result<Option<Partner>, sqlx::Error> {
    let partner =
        sqlx::query_as("SELECT * FROM partners WHERE id = $1").bind(partner_id).fetch_optional(conn).await?;
    Ok(partner)
}

pub async fn fetch_direct_partner(farmer_id: i64, conn: &mut SqliteConnection) -> Result<Option<Partner>, sqlx::Error> {
    let partner = sqlx::query_as(
        r#"
            SELECT partners.* FROM partners JOIN users ON users.partner_id = partners.id
            WHERE users.id = $1
        "#,
    )
    .bind(farmer_id)
    .fetch_optional(conn)
    .await?;
    Ok(partner)
}

pub async fn insert_referral(referral: NewReferral, conn: &mut SqliteConnection) -> Result<Referral, sqlx::Error> {
    let referral = sqlx::query_as(
        r#"
            INSERT INTO referrals (partner_id, farmer_id, commission_rate_bps, status, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *;
        "#,
    )
    .bind(referral.partner_id)
    .bind(referral.farmer_id)
    .bind(referral.commission_rate)
    .bind(referral.status)
    .bind(referral.expires_at)
    .fetch_one(conn)
    .await?;
    Ok(referral)
}

/// The newest active referral for the farmer that has no expiry, or expires after `now`.
pub async fn fetch_active_referral(
    farmer_id: i64,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<Referral>, sqlx::Error> {
    let referral = sqlx::query_as(
        r#"
            SELECT * FROM referrals
            WHERE farmer_id = $1
              AND status = 'active'
              AND (expires_at IS NULL OR julianday(expires_at) > julianday($2))
            ORDER BY created_at DESC, id DESC
            LIMIT 1
        "#,
    )
    .bind(farmer_id)
    .bind(now)
    .fetch_optional(conn)
    .await?;
    Ok(referral)
}

/// Adds `amount` to the partner's running total in a single statement and returns the new total.
pub async fn increment_total_commissions(
    partner_id: i64,
    amount: Kobo,
    conn: &mut SqliteConnection,
) -> Result<Option<Kobo>, sqlx::Error> {
    let total = sqlx::query_scalar(
        r#"
            UPDATE partners SET
                total_commissions = total_commissions + $1,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $2
            RETURNING total_commissions
        "#,
    )
    .bind(amount)
    .bind(partner_id)
    .fetch_optional(conn)
    .await?;
    Ok(total)
}

pub async fn set_total_commissions(
    partner_id: i64,
    total: Kobo,
    conn: &mut SqliteConnection,
) -> Result<u64, sqlx::Error> {
    let result =
        sqlx::query("UPDATE partners SET total_commissions = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2")
            .bind(total)
            .bind(partner_id)
            .execute(conn)
            .await?;
    Ok(result.rows_affected())
}
