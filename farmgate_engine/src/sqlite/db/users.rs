use sqlx::SqliteConnection;

use crate::{
    db_types::{NewUser, User},
    sqlite::db::is_unique_violation,
    traits::SettlementDatabaseError,
};

pub async fn insert_user(user: NewUser, conn: &mut SqliteConnection) -> Result<User, SettlementDatabaseError> {
    let email = user.email.clone();
    sqlx::query_as("INSERT INTO users (name, email, role, partner_id) VALUES ($1, $2, $3, $4) RETURNING *")
        .bind(user.name)
        .bind(user.email)
        .bind(user.role)
        .bind(user.partner_id)
        .fetch_one(conn)
        .await
        .map_err(|e| match is_unique_violation(&e) {
            true => SettlementDatabaseError::UserAlreadyExists(email),
            false => SettlementDatabaseError::from(e),
        })
}

pub async fn fetch_user(user_id: i64, conn: &mut SqliteConnection) -> Result<Option<User>, sqlx::Error> {
    let user = sqlx::query_as("SELECT * FROM users WHERE id = $1").bind(user_id).fetch_optional(conn).await?;
    Ok(user)
}

pub async fn fetch_admin_ids(conn: &mut SqliteConnection) -> Result<Vec<i64>, sqlx::Error> {
    let ids = sqlx::query_scalar("SELECT id FROM users WHERE role = 'admin' ORDER BY id").fetch_all(conn).await?;
    Ok(ids)
}

/// Assigns the farmer to a partner directly.
pub async fn assign_partner(farmer_id: i64, partner_id: i64, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET partner_id = $1 WHERE id = $2").bind(partner_id).bind(farmer_id).execute(conn).await?;
    Ok(())
}
