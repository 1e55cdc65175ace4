use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection};

use crate::{
    db_types::{ListingId, NewOrder, Order, OrderId, OrderStatus, UserId},
    traits::LedgerError,
};

#[derive(Debug, Clone, FromRow)]
pub struct OrderRow {
    pub id: i64,
    pub listing_id: i64,
    pub client_id: String,
    pub provider_id: String,
    pub price_at_order: String,
    pub currency: String,
    pub created_at: DateTime<Utc>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub client_note: Option<String>,
    pub status: String,
}

impl TryFrom<OrderRow> for Order {
    type Error = LedgerError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let price_at_order = row
            .price_at_order
            .parse()
            .map_err(|e| LedgerError::Unavailable(format!("corrupt price on order row {}: {e}", row.id)))?;
        let status = row
            .status
            .parse()
            .map_err(|e| LedgerError::Unavailable(format!("corrupt status on order row {}: {e}", row.id)))?;
        Ok(Order {
            id: OrderId(row.id),
            listing_id: ListingId(row.listing_id),
            client_id: UserId(row.client_id),
            provider_id: UserId(row.provider_id),
            price_at_order,
            currency: row.currency,
            created_at: row.created_at,
            scheduled_at: row.scheduled_at,
            client_note: row.client_note,
            status,
        })
    }
}

/// Inserts a new order in `PendingPayment` status. Not atomic on its own; embed in a transaction
/// and pass `&mut *tx` if the caller needs atomicity with other writes.
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, LedgerError> {
    let row: OrderRow = sqlx::query_as(
        r#"
            INSERT INTO orders (
                listing_id,
                client_id,
                provider_id,
                price_at_order,
                currency,
                created_at,
                scheduled_at,
                client_note,
                status
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *;
        "#,
    )
    .bind(order.listing_id)
    .bind(order.client_id)
    .bind(order.provider_id)
    .bind(order.price_at_order.to_string())
    .bind(order.currency)
    .bind(order.created_at)
    .bind(order.scheduled_at)
    .bind(order.client_note)
    .bind(OrderStatus::PendingPayment.to_string())
    .fetch_one(conn)
    .await?;
    row.try_into()
}

pub async fn fetch_order(id: OrderId, conn: &mut SqliteConnection) -> Result<Option<Order>, LedgerError> {
    let row: Option<OrderRow> =
        sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(id).fetch_optional(conn).await?;
    row.map(Order::try_from).transpose()
}

/// Sets the order's status, returning the updated record, or `None` if the order is missing.
pub async fn update_order_status(
    id: OrderId,
    status: OrderStatus,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, LedgerError> {
    let row: Option<OrderRow> = sqlx::query_as("UPDATE orders SET status = $1 WHERE id = $2 RETURNING *")
        .bind(status.to_string())
        .bind(id)
        .fetch_optional(conn)
        .await?;
    row.map(Order::try_from).transpose()
}
