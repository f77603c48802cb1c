use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

/// Journal entry header (for reading from DB)
#[derive(Debug, Clone, FromRow)]
pub struct JournalEntry {
    pub id: Uuid,
    pub entry_number: String,
    pub entry_date: NaiveDate,
    pub reference_type: Option<String>,
    pub reference_id: Option<String>,
    pub description: String,
    pub is_reversed: bool,
    pub reversal_of: Option<Uuid>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

/// Journal line (for reading from DB)
#[derive(Debug, Clone, FromRow)]
pub struct JournalLine {
    pub id: Uuid,
    pub journal_entry_id: Uuid,
    pub line_no: i32,
    pub account_code: String,
    pub debit_minor: i64,
    pub credit_minor: i64,
    pub memo: Option<String>,
}

/// Struct for inserting a journal line
#[derive(Debug, Clone)]
pub struct JournalLineInsert {
    pub id: Uuid,
    pub line_no: i32,
    pub account_code: String,
    pub debit_minor: i64,
    pub credit_minor: i64,
    pub memo: Option<String>,
}

const ENTRY_COLUMNS: &str = r#"
    SELECT id, entry_number, entry_date, reference_type, reference_id,
           description, is_reversed, reversal_of, created_by, created_at
    FROM journal_entries
"#;

/// Insert a journal entry header
pub async fn insert_entry(
    tx: &mut Transaction<'_, Postgres>,
    entry_id: Uuid,
    entry_number: &str,
    entry_date: NaiveDate,
    reference_type: Option<&str>,
    reference_id: Option<&str>,
    description: &str,
    reversal_of: Option<Uuid>,
    created_by: &str,
) -> Result<Uuid, sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO journal_entries
            (id, entry_number, entry_date, reference_type, reference_id,
             description, reversal_of, created_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(entry_id)
    .bind(entry_number)
    .bind(entry_date)
    .bind(reference_type)
    .bind(reference_id)
    .bind(description)
    .bind(reversal_of)
    .bind(created_by)
    .execute(&mut **tx)
    .await?;

    Ok(entry_id)
}

/// Bulk insert journal lines for a journal entry
pub async fn bulk_insert_lines(
    tx: &mut Transaction<'_, Postgres>,
    journal_entry_id: Uuid,
    lines: Vec<JournalLineInsert>,
) -> Result<(), sqlx::Error> {
    for line in lines {
        sqlx::query(
            r#"
            INSERT INTO journal_lines
                (id, journal_entry_id, line_no, account_code, debit_minor, credit_minor, memo)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(line.id)
        .bind(journal_entry_id)
        .bind(line.line_no)
        .bind(&line.account_code)
        .bind(line.debit_minor)
        .bind(line.credit_minor)
        .bind(&line.memo)
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}

/// Fetch a journal entry by ID with its lines
pub async fn fetch_entry_with_lines(
    pool: &PgPool,
    entry_id: Uuid,
) -> Result<Option<(JournalEntry, Vec<JournalLine>)>, sqlx::Error> {
    let sql = format!("{ENTRY_COLUMNS} WHERE id = $1");
    let entry = sqlx::query_as::<_, JournalEntry>(&sql)
        .bind(entry_id)
        .fetch_optional(pool)
        .await?;

    let Some(entry) = entry else {
        return Ok(None);
    };

    let lines = fetch_lines(pool, entry_id).await?;
    Ok(Some((entry, lines)))
}

/// Fetch the lines of a journal entry ordered by line number
pub async fn fetch_lines(
    pool: &PgPool,
    journal_entry_id: Uuid,
) -> Result<Vec<JournalLine>, sqlx::Error> {
    sqlx::query_as::<_, JournalLine>(
        r#"
        SELECT id, journal_entry_id, line_no, account_code, debit_minor, credit_minor, memo
        FROM journal_lines
        WHERE journal_entry_id = $1
        ORDER BY line_no
        "#,
    )
    .bind(journal_entry_id)
    .fetch_all(pool)
    .await
}

/// Find the journal entry posted for a reference, if any
pub async fn find_by_reference(
    pool: &PgPool,
    reference_type: &str,
    reference_id: &str,
) -> Result<Option<JournalEntry>, sqlx::Error> {
    let sql = format!(
        r#"{ENTRY_COLUMNS}
        WHERE reference_type = $1 AND reference_id = $2 AND reversal_of IS NULL
        ORDER BY created_at
        LIMIT 1
        "#
    );

    sqlx::query_as::<_, JournalEntry>(&sql)
        .bind(reference_type)
        .bind(reference_id)
        .fetch_optional(pool)
        .await
}

/// Check whether a reference already has a journal entry (duplicate guard)
pub async fn exists_by_reference(
    pool: &PgPool,
    reference_type: &str,
    reference_id: &str,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM journal_entries
            WHERE reference_type = $1 AND reference_id = $2 AND reversal_of IS NULL
        )
        "#,
    )
    .bind(reference_type)
    .bind(reference_id)
    .fetch_one(pool)
    .await
}

/// Flag a journal entry as reversed (the only in-place mutation reversal makes)
pub async fn mark_reversed(
    tx: &mut Transaction<'_, Postgres>,
    entry_id: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE journal_entries SET is_reversed = TRUE WHERE id = $1")
        .bind(entry_id)
        .execute(&mut **tx)
        .await?;

    Ok(())
}

/// Distinct account codes appearing on lines of entries with a reference
pub async fn account_codes_by_reference(
    tx: &mut Transaction<'_, Postgres>,
    reference_type: &str,
    reference_id: &str,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        r#"
        SELECT DISTINCT l.account_code
        FROM journal_lines l
        JOIN journal_entries e ON e.id = l.journal_entry_id
        WHERE e.reference_type = $1 AND e.reference_id = $2
        ORDER BY l.account_code
        "#,
    )
    .bind(reference_type)
    .bind(reference_id)
    .fetch_all(&mut **tx)
    .await
}

/// Delete journal entries (lines cascade) for a reference; returns rows removed
pub async fn delete_by_reference(
    tx: &mut Transaction<'_, Postgres>,
    reference_type: &str,
    reference_id: &str,
) -> Result<u64, sqlx::Error> {
    let result =
        sqlx::query("DELETE FROM journal_entries WHERE reference_type = $1 AND reference_id = $2")
            .bind(reference_type)
            .bind(reference_id)
            .execute(&mut **tx)
            .await?;

    Ok(result.rows_affected())
}
