use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// Instrument status enum matching database instrument_status
///
/// State machine: pending -> collected, or pending -> bounced.
#[derive(Debug, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "instrument_status", rename_all = "lowercase")]
pub enum InstrumentStatus {
    Pending,
    Collected,
    Bounced,
}

/// Deferred-payment instrument (check) model
#[derive(Debug, Clone, FromRow)]
pub struct Instrument {
    pub id: Uuid,
    pub party_id: Uuid,
    pub face_amount_minor: i64,
    pub due_date: NaiveDate,
    pub status: InstrumentStatus,
    pub collected_on: Option<NaiveDate>,
    pub expected_loss_minor: Option<i64>,
    pub loss_method: Option<String>,
    pub loss_computed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// A party's historical check record, used for the risk factor
#[derive(Debug, Clone, Copy, Default, FromRow)]
pub struct BounceHistory {
    pub total: i64,
    pub bounced: i64,
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, party_id, face_amount_minor, due_date, status, collected_on,
           expected_loss_minor, loss_method, loss_computed_at, created_at
    FROM instruments
"#;

pub async fn find_by_id(
    pool: &PgPool,
    instrument_id: Uuid,
) -> Result<Option<Instrument>, sqlx::Error> {
    let sql = format!("{SELECT_COLUMNS} WHERE id = $1");
    sqlx::query_as::<_, Instrument>(&sql)
        .bind(instrument_id)
        .fetch_optional(pool)
        .await
}

/// Instruments not yet collected (pending or bounced), for the scheduled sweep
pub async fn list_open(pool: &PgPool) -> Result<Vec<Instrument>, sqlx::Error> {
    let sql = format!("{SELECT_COLUMNS} WHERE status <> 'collected' ORDER BY due_date, id");
    sqlx::query_as::<_, Instrument>(&sql).fetch_all(pool).await
}

/// Count a party's total and bounced checks
pub async fn bounce_history(pool: &PgPool, party_id: Uuid) -> Result<BounceHistory, sqlx::Error> {
    sqlx::query_as::<_, BounceHistory>(
        r#"
        SELECT COUNT(*)::bigint AS total,
               COUNT(*) FILTER (WHERE status = 'bounced')::bigint AS bounced
        FROM instruments
        WHERE party_id = $1
        "#,
    )
    .bind(party_id)
    .fetch_one(pool)
    .await
}

/// Overwrite the stored loss estimate for an instrument
pub async fn store_loss_estimate(
    pool: &PgPool,
    instrument_id: Uuid,
    expected_loss_minor: i64,
    method: &str,
    computed_at: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE instruments
        SET expected_loss_minor = $2, loss_method = $3, loss_computed_at = $4
        WHERE id = $1
        "#,
    )
    .bind(instrument_id)
    .bind(expected_loss_minor)
    .bind(method)
    .bind(computed_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Insert an instrument (used by provisioning and tests)
pub async fn insert(
    pool: &PgPool,
    party_id: Uuid,
    face_amount_minor: i64,
    due_date: NaiveDate,
    status: InstrumentStatus,
    collected_on: Option<NaiveDate>,
) -> Result<Uuid, sqlx::Error> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO instruments (id, party_id, face_amount_minor, due_date, status, collected_on)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(id)
    .bind(party_id)
    .bind(face_amount_minor)
    .bind(due_date)
    .bind(status)
    .bind(collected_on)
    .execute(pool)
    .await?;

    Ok(id)
}
