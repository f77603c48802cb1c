use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

/// Party kind enum matching database party_kind
#[derive(Debug, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "party_kind", rename_all = "lowercase")]
pub enum PartyKind {
    Customer,
    Supplier,
}

/// Party model (a customer or supplier as the ledger sees it)
///
/// `balance_minor` is a cache over the ledger fold; it is written only by
/// the recalculator, never directly by business-event code.
#[derive(Debug, Clone, FromRow)]
pub struct Party {
    pub id: Uuid,
    pub name: String,
    pub kind: PartyKind,
    pub balance_minor: i64,
    pub balance_refreshed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

pub async fn find_by_id(pool: &PgPool, party_id: Uuid) -> Result<Option<Party>, sqlx::Error> {
    sqlx::query_as::<_, Party>(
        r#"
        SELECT id, name, kind, balance_minor, balance_refreshed_at, created_at
        FROM parties
        WHERE id = $1
        "#,
    )
    .bind(party_id)
    .fetch_optional(pool)
    .await
}

/// Lock the party row for the duration of the transaction.
///
/// This is the per-party serialization point: two writers recalculating the
/// same party queue here instead of racing on `balance_after_minor`.
/// Returns false when the party does not exist.
pub async fn lock_for_update(
    tx: &mut Transaction<'_, Postgres>,
    party_id: Uuid,
) -> Result<bool, sqlx::Error> {
    let row = sqlx::query_scalar::<_, Uuid>("SELECT id FROM parties WHERE id = $1 FOR UPDATE")
        .bind(party_id)
        .fetch_optional(&mut **tx)
        .await?;

    Ok(row.is_some())
}

/// Persist the recalculated cached balance for a party
pub async fn update_cached_balance(
    tx: &mut Transaction<'_, Postgres>,
    party_id: Uuid,
    balance_minor: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE parties
        SET balance_minor = $2, balance_refreshed_at = now()
        WHERE id = $1
        "#,
    )
    .bind(party_id)
    .bind(balance_minor)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// List all party ids (used by the rebuild tool)
pub async fn list_ids(pool: &PgPool) -> Result<Vec<Uuid>, sqlx::Error> {
    sqlx::query_scalar::<_, Uuid>("SELECT id FROM parties ORDER BY created_at")
        .fetch_all(pool)
        .await
}

/// Insert a party (used by provisioning and tests)
pub async fn insert(
    pool: &PgPool,
    name: &str,
    kind: PartyKind,
) -> Result<Uuid, sqlx::Error> {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO parties (id, name, kind) VALUES ($1, $2, $3)")
        .bind(id)
        .bind(name)
        .bind(kind)
        .execute(pool)
        .await?;

    Ok(id)
}
