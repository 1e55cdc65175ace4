use sqlx::{FromRow, SqliteConnection};

use crate::{
    db_types::{Listing, ListingId, ProviderAccount, UserId},
    traits::LedgerError,
};

#[derive(Debug, Clone, FromRow)]
pub struct ListingRow {
    pub id: i64,
    pub provider_id: String,
    pub title: String,
    pub price: String,
    pub is_active: bool,
}

impl TryFrom<ListingRow> for Listing {
    type Error = LedgerError;

    fn try_from(row: ListingRow) -> Result<Self, Self::Error> {
        let price = row
            .price
            .parse()
            .map_err(|e| LedgerError::Unavailable(format!("corrupt price on listing row {}: {e}", row.id)))?;
        Ok(Listing {
            id: ListingId(row.id),
            provider_id: UserId(row.provider_id),
            title: row.title,
            price,
            is_active: row.is_active,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct ProviderRow {
    pub user_id: String,
    pub connected_account_id: Option<String>,
    pub onboarding_complete: bool,
    pub details_submitted: bool,
}

impl From<ProviderRow> for ProviderAccount {
    fn from(row: ProviderRow) -> Self {
        ProviderAccount {
            user_id: UserId(row.user_id),
            connected_account_id: row.connected_account_id,
            onboarding_complete: row.onboarding_complete,
            details_submitted: row.details_submitted,
        }
    }
}

pub async fn fetch_listing(id: ListingId, conn: &mut SqliteConnection) -> Result<Option<Listing>, LedgerError> {
    let row: Option<ListingRow> =
        sqlx::query_as("SELECT * FROM listings WHERE id = $1").bind(id).fetch_optional(conn).await?;
    row.map(Listing::try_from).transpose()
}

pub async fn upsert_listing(listing: Listing, conn: &mut SqliteConnection) -> Result<(), LedgerError> {
    sqlx::query(
        r#"
            INSERT INTO listings (id, provider_id, title, price, is_active)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE
            SET provider_id = excluded.provider_id,
                title = excluded.title,
                price = excluded.price,
                is_active = excluded.is_active;
        "#,
    )
    .bind(listing.id)
    .bind(listing.provider_id)
    .bind(listing.title)
    .bind(listing.price.to_string())
    .bind(listing.is_active)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn fetch_provider(user_id: &UserId, conn: &mut SqliteConnection) -> Result<Option<ProviderAccount>, LedgerError> {
    let row: Option<ProviderRow> =
        sqlx::query_as("SELECT * FROM providers WHERE user_id = $1").bind(user_id.as_str()).fetch_optional(conn).await?;
    Ok(row.map(ProviderAccount::from))
}

pub async fn upsert_provider(provider: ProviderAccount, conn: &mut SqliteConnection) -> Result<(), LedgerError> {
    sqlx::query(
        r#"
            INSERT INTO providers (user_id, connected_account_id, onboarding_complete, details_submitted)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id) DO UPDATE
            SET connected_account_id = excluded.connected_account_id,
                onboarding_complete = excluded.onboarding_complete,
                details_submitted = excluded.details_submitted;
        "#,
    )
    .bind(provider.user_id)
    .bind(provider.connected_account_id)
    .bind(provider.onboarding_complete)
    .bind(provider.details_submitted)
    .execute(conn)
    .await?;
    Ok(())
}

/// Applies fresh capability flags from an account event, keyed by connected account id.
pub async fn update_provider_readiness(
    connected_account_id: &str,
    onboarding_complete: bool,
    details_submitted: bool,
    conn: &mut SqliteConnection,
) -> Result<Option<ProviderAccount>, LedgerError> {
    let row: Option<ProviderRow> = sqlx::query_as(
        r#"
            UPDATE providers
            SET onboarding_complete = $1,
                details_submitted = $2
            WHERE connected_account_id = $3
            RETURNING *;
        "#,
    )
    .bind(onboarding_complete)
    .bind(details_submitted)
    .bind(connected_account_id)
    .fetch_optional(conn)
    .await?;
    Ok(row.map(ProviderAccount::from))
}
