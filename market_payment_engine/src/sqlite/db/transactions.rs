use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection};

use crate::{
    db_types::{IntentId, NewPaymentTransaction, OrderId, PaymentStatus, PaymentTransaction},
    traits::LedgerError,
};

#[derive(Debug, Clone, FromRow)]
pub struct TransactionRow {
    pub id: i64,
    pub order_id: i64,
    pub intent_id: String,
    pub amount: String,
    pub currency: String,
    pub status: String,
    pub gateway_response: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for PaymentTransaction {
    type Error = LedgerError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        let amount = row
            .amount
            .parse()
            .map_err(|e| LedgerError::Unavailable(format!("corrupt amount on transaction row {}: {e}", row.id)))?;
        let status = row
            .status
            .parse()
            .map_err(|e| LedgerError::Unavailable(format!("corrupt status on transaction row {}: {e}", row.id)))?;
        Ok(PaymentTransaction {
            id: row.id,
            order_id: OrderId(row.order_id),
            intent_id: IntentId(row.intent_id),
            amount,
            currency: row.currency,
            status,
            gateway_response: row.gateway_response,
            updated_at: row.updated_at,
        })
    }
}

pub async fn fetch_by_intent_id(
    intent_id: &IntentId,
    conn: &mut SqliteConnection,
) -> Result<Option<PaymentTransaction>, LedgerError> {
    let row: Option<TransactionRow> =
        sqlx::query_as("SELECT * FROM payment_transactions WHERE intent_id = $1")
            .bind(intent_id.as_str())
            .fetch_optional(conn)
            .await?;
    row.map(PaymentTransaction::try_from).transpose()
}

pub async fn fetch_for_order(
    order_id: OrderId,
    conn: &mut SqliteConnection,
) -> Result<Vec<PaymentTransaction>, LedgerError> {
    let rows: Vec<TransactionRow> =
        sqlx::query_as("SELECT * FROM payment_transactions WHERE order_id = $1 ORDER BY id")
            .bind(order_id)
            .fetch_all(conn)
            .await?;
    rows.into_iter().map(PaymentTransaction::try_from).collect()
}

/// Inserts a new transaction in `Pending` status. The caller must have checked for an existing
/// transaction with the same intent id; the unique index is the backstop.
pub async fn insert_transaction(
    transaction: NewPaymentTransaction,
    conn: &mut SqliteConnection,
) -> Result<PaymentTransaction, LedgerError> {
    let row: TransactionRow = sqlx::query_as(
        r#"
            INSERT INTO payment_transactions (
                order_id,
                intent_id,
                amount,
                currency,
                status,
                gateway_response,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *;
        "#,
    )
    .bind(transaction.order_id)
    .bind(transaction.intent_id)
    .bind(transaction.amount.to_string())
    .bind(transaction.currency)
    .bind(PaymentStatus::Pending.to_string())
    .bind(transaction.gateway_response)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    row.try_into()
}

/// Applies the transaction part of a reconciliation write: status, diagnostic text and a fresh
/// timestamp. Returns `None` if no transaction matches the intent id.
pub async fn update_status(
    intent_id: &IntentId,
    status: PaymentStatus,
    gateway_response: Option<String>,
    conn: &mut SqliteConnection,
) -> Result<Option<PaymentTransaction>, LedgerError> {
    let row: Option<TransactionRow> = sqlx::query_as(
        r#"
            UPDATE payment_transactions
            SET status = $1,
                gateway_response = COALESCE($2, gateway_response),
                updated_at = $3
            WHERE intent_id = $4
            RETURNING *;
        "#,
    )
    .bind(status.to_string())
    .bind(gateway_response)
    .bind(Utc::now())
    .bind(intent_id.as_str())
    .fetch_optional(conn)
    .await?;
    row.map(PaymentTransaction::try_from).transpose()
}
