use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::contracts::posting_event_v1::Direction;

/// Party ledger entry (for reading from DB)
#[derive(Debug, Clone, FromRow)]
pub struct PartyLedgerEntry {
    pub id: Uuid,
    pub entry_number: String,
    pub party_id: Uuid,
    pub entry_date: NaiveDate,
    pub event_kind: String,
    pub direction: Direction,
    pub amount_minor: i64,
    pub reference_type: Option<String>,
    pub reference_id: Option<String>,
    pub description: String,
    pub balance_after_minor: i64,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

/// Struct for inserting a party ledger entry
#[derive(Debug, Clone)]
pub struct PartyLedgerInsert {
    pub id: Uuid,
    pub entry_number: String,
    pub party_id: Uuid,
    pub entry_date: NaiveDate,
    pub event_kind: String,
    pub direction: Direction,
    pub amount_minor: i64,
    pub reference_type: Option<String>,
    pub reference_id: Option<String>,
    pub description: String,
    pub created_by: String,
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, entry_number, party_id, entry_date, event_kind, direction,
           amount_minor, reference_type, reference_id, description,
           balance_after_minor, created_by, created_at
    FROM party_ledger_entries
"#;

/// Insert a party ledger entry within a transaction
///
/// `balance_after_minor` starts at 0; only the recalculator writes it.
pub async fn insert(
    tx: &mut Transaction<'_, Postgres>,
    entry: &PartyLedgerInsert,
) -> Result<Uuid, sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO party_ledger_entries
            (id, entry_number, party_id, entry_date, event_kind, direction,
             amount_minor, reference_type, reference_id, description, created_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        "#,
    )
    .bind(entry.id)
    .bind(&entry.entry_number)
    .bind(entry.party_id)
    .bind(entry.entry_date)
    .bind(&entry.event_kind)
    .bind(entry.direction)
    .bind(entry.amount_minor)
    .bind(&entry.reference_type)
    .bind(&entry.reference_id)
    .bind(&entry.description)
    .bind(&entry.created_by)
    .execute(&mut **tx)
    .await?;

    Ok(entry.id)
}

pub async fn find_by_id(
    pool: &PgPool,
    entry_id: Uuid,
) -> Result<Option<PartyLedgerEntry>, sqlx::Error> {
    let sql = format!("{SELECT_COLUMNS} WHERE id = $1");
    sqlx::query_as::<_, PartyLedgerEntry>(&sql)
        .bind(entry_id)
        .fetch_optional(pool)
        .await
}

/// Check whether a reference is already posted on a party's ledger
pub async fn exists_by_reference(
    pool: &PgPool,
    party_id: Uuid,
    reference_type: &str,
    reference_id: &str,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM party_ledger_entries
            WHERE party_id = $1 AND reference_type = $2 AND reference_id = $3
        )
        "#,
    )
    .bind(party_id)
    .bind(reference_type)
    .bind(reference_id)
    .fetch_one(pool)
    .await
}

/// Fetch one page of a party's ledger in replay order.
///
/// Replay order is (entry_date, created_at, id); the id tie-break keeps the
/// fold stable when two entries share a timestamp. Keyset pagination keeps
/// the recalculation fold boundable on very large histories.
pub async fn fetch_page_ordered(
    tx: &mut Transaction<'_, Postgres>,
    party_id: Uuid,
    after: Option<(NaiveDate, DateTime<Utc>, Uuid)>,
    limit: i64,
) -> Result<Vec<PartyLedgerEntry>, sqlx::Error> {
    let sql = format!(
        r#"{SELECT_COLUMNS}
        WHERE party_id = $1
          AND ($2::date IS NULL OR (entry_date, created_at, id) > ($2, $3, $4))
        ORDER BY entry_date, created_at, id
        LIMIT $5
        "#
    );

    let (after_date, after_at, after_id) = match after {
        Some((d, t, i)) => (Some(d), Some(t), Some(i)),
        None => (None, None, None),
    };

    sqlx::query_as::<_, PartyLedgerEntry>(&sql)
        .bind(party_id)
        .bind(after_date)
        .bind(after_at)
        .bind(after_id)
        .bind(limit)
        .fetch_all(&mut **tx)
        .await
}

/// Fetch a party's entries in replay order, optionally bounded by date
pub async fn fetch_range_ordered(
    pool: &PgPool,
    party_id: Uuid,
    date_from: Option<NaiveDate>,
    date_to: Option<NaiveDate>,
) -> Result<Vec<PartyLedgerEntry>, sqlx::Error> {
    let sql = format!(
        r#"{SELECT_COLUMNS}
        WHERE party_id = $1
          AND ($2::date IS NULL OR entry_date >= $2)
          AND ($3::date IS NULL OR entry_date <= $3)
        ORDER BY entry_date, created_at, id
        "#
    );

    sqlx::query_as::<_, PartyLedgerEntry>(&sql)
        .bind(party_id)
        .bind(date_from)
        .bind(date_to)
        .fetch_all(pool)
        .await
}

/// Fold the signed sum of a party's entries strictly before a date.
///
/// Used for the opening balance of a ranged statement: folding the prefix
/// instead of reading a snapshot keeps the range and the unranged total
/// mutually consistent.
pub async fn fold_before(
    pool: &PgPool,
    party_id: Uuid,
    before: NaiveDate,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COALESCE(SUM(
            CASE WHEN direction = 'debit' THEN amount_minor ELSE -amount_minor END
        ), 0)::bigint
        FROM party_ledger_entries
        WHERE party_id = $1 AND entry_date < $2
        "#,
    )
    .bind(party_id)
    .bind(before)
    .fetch_one(pool)
    .await
}

/// Write the running balance on one entry during recalculation
pub async fn update_balance_after(
    tx: &mut Transaction<'_, Postgres>,
    entry_id: Uuid,
    balance_after_minor: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE party_ledger_entries SET balance_after_minor = $2 WHERE id = $1")
        .bind(entry_id)
        .bind(balance_after_minor)
        .execute(&mut **tx)
        .await?;

    Ok(())
}

/// Distinct parties carrying entries tagged with a reference
///
/// Must be collected before the delete; afterwards the set would be empty.
pub async fn parties_by_reference(
    tx: &mut Transaction<'_, Postgres>,
    reference_type: &str,
    reference_id: &str,
) -> Result<Vec<Uuid>, sqlx::Error> {
    sqlx::query_scalar::<_, Uuid>(
        r#"
        SELECT DISTINCT party_id FROM party_ledger_entries
        WHERE reference_type = $1 AND reference_id = $2
        "#,
    )
    .bind(reference_type)
    .bind(reference_id)
    .fetch_all(&mut **tx)
    .await
}

/// Delete all entries tagged with a reference; returns rows removed
pub async fn delete_by_reference(
    tx: &mut Transaction<'_, Postgres>,
    reference_type: &str,
    reference_id: &str,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "DELETE FROM party_ledger_entries WHERE reference_type = $1 AND reference_id = $2",
    )
    .bind(reference_type)
    .bind(reference_id)
    .execute(&mut **tx)
    .await?;

    Ok(result.rows_affected())
}

/// Fetch entries tagged with a reference (for reversal)
pub async fn fetch_by_reference(
    pool: &PgPool,
    reference_type: &str,
    reference_id: &str,
) -> Result<Vec<PartyLedgerEntry>, sqlx::Error> {
    let sql = format!(
        r#"{SELECT_COLUMNS}
        WHERE reference_type = $1 AND reference_id = $2
        ORDER BY created_at, id
        "#
    );

    sqlx::query_as::<_, PartyLedgerEntry>(&sql)
        .bind(reference_type)
        .bind(reference_id)
        .fetch_all(pool)
        .await
}

/// A distinct (reference_type, reference_id) pair present on the ledger
#[derive(Debug, Clone, FromRow)]
pub struct LedgerReference {
    pub reference_type: String,
    pub reference_id: String,
}

/// All distinct non-empty references on the ledger (orphan audit input)
pub async fn list_distinct_references(
    pool: &PgPool,
) -> Result<Vec<LedgerReference>, sqlx::Error> {
    sqlx::query_as::<_, LedgerReference>(
        r#"
        SELECT DISTINCT reference_type, reference_id
        FROM party_ledger_entries
        WHERE reference_type IS NOT NULL AND reference_id IS NOT NULL
        ORDER BY reference_type, reference_id
        "#,
    )
    .fetch_all(pool)
    .await
}
