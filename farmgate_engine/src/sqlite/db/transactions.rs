use chrono::Duration;
use fg_common::{Kobo, Provider};
use log::{debug, trace};
use sqlx::{types::Json, SqliteConnection};

use crate::{
    db_types::{NewTransaction, Transaction, TransactionMetadata},
    traits::SettlementDatabaseError,
};

pub async fn fetch_transaction(reference: &str, conn: &mut SqliteConnection) -> Result<Option<Transaction>, sqlx::Error> {
    let tx = sqlx::query_as("SELECT * FROM transactions WHERE reference = $1")
        .bind(reference)
        .fetch_optional(conn)
        .await?;
    Ok(tx)
}

/// Inserts the transaction, returning `false` in the second parameter if the reference already exists.
pub async fn idempotent_insert(
    tx: NewTransaction,
    conn: &mut SqliteConnection,
) -> Result<(Transaction, bool), SettlementDatabaseError> {
    let reference = tx.reference.clone();
    let inserted: Option<Transaction> = sqlx::query_as(
        r#"
            INSERT INTO transactions (reference, provider, order_id, amount, currency, metadata)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (reference) DO NOTHING
            RETURNING *;
        "#,
    )
    .bind(tx.reference)
    .bind(tx.provider)
    .bind(tx.order_id)
    .bind(tx.amount)
    .bind(tx.currency)
    .bind(Json(tx.metadata))
    .fetch_optional(&mut *conn)
    .await?;
    match inserted {
        Some(tx) => {
            debug!("🧾️ Transaction [{}] created with id {}", tx.reference, tx.id);
            Ok((tx, true))
        },
        None => {
            let existing = fetch_transaction(&reference, conn).await?.ok_or_else(|| {
                SettlementDatabaseError::DatabaseError(format!("Transaction {reference} vanished after a conflict"))
            })?;
            trace!("🧾️ Transaction [{reference}] already exists");
            Ok((existing, false))
        },
    }
}

pub async fn insert_shell(
    reference: &str,
    provider: Provider,
    conn: &mut SqliteConnection,
) -> Result<Transaction, SettlementDatabaseError> {
    let shell = NewTransaction {
        reference: reference.to_string(),
        provider,
        order_id: None,
        amount: Kobo::default(),
        currency: fg_common::NAIRA_CURRENCY_CODE.to_string(),
        metadata: TransactionMetadata { shell: true, ..Default::default() },
    };
    let (tx, _) = idempotent_insert(shell, conn).await?;
    Ok(tx)
}

/// The single conditional write that decides the settlement winner. Returns `true` if this call flipped the status.
pub async fn try_complete(
    reference: &str,
    metadata: &TransactionMetadata,
    verified_amount: Kobo,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
            UPDATE transactions SET
                status = 'completed',
                metadata = $1,
                amount = CASE WHEN amount = 0 THEN $2 ELSE amount END,
                processed_at = CURRENT_TIMESTAMP,
                updated_at = CURRENT_TIMESTAMP
            WHERE reference = $3 AND status = 'pending'
        "#,
    )
    .bind(Json(metadata))
    .bind(verified_amount)
    .bind(reference)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn try_fail(
    reference: &str,
    metadata: &TransactionMetadata,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
            UPDATE transactions SET
                status = 'failed',
                metadata = $1,
                processed_at = CURRENT_TIMESTAMP,
                updated_at = CURRENT_TIMESTAMP
            WHERE reference = $2 AND status = 'pending'
        "#,
    )
    .bind(Json(metadata))
    .bind(reference)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn fetch_pending_older_than(
    older_than: Duration,
    conn: &mut SqliteConnection,
) -> Result<Vec<Transaction>, sqlx::Error> {
    let modifier = format!("-{} seconds", older_than.num_seconds().max(0));
    let txs = sqlx::query_as(
        r#"
            SELECT * FROM transactions
            WHERE status = 'pending' AND julianday(created_at) <= julianday('now', $1)
            ORDER BY created_at ASC, id ASC
        "#,
    )
    .bind(modifier)
    .fetch_all(conn)
    .await?;
    Ok(txs)
}
