use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use thiserror::Error;
use uuid::Uuid;

/// Account type enum matching database account_type
#[derive(Debug, Clone, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "account_type", rename_all = "lowercase")]
pub enum AccountType {
    Asset,
    Liability,
    Equity,
    Revenue,
    Expense,
}

/// Account model representing a chart of accounts entry
#[derive(Debug, Clone, FromRow)]
pub struct Account {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    #[sqlx(rename = "type")]
    pub account_type: AccountType,
    pub parent_id: Option<Uuid>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Errors that can occur during account repository operations
#[derive(Debug, Error)]
pub enum AccountError {
    #[error("Account not found: code={code}")]
    NotFound { code: String },

    #[error("Account is inactive: code={code}")]
    Inactive { code: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Find an account by code
/// Returns None if account doesn't exist
pub async fn find_by_code(pool: &PgPool, code: &str) -> Result<Option<Account>, AccountError> {
    let account = sqlx::query_as::<_, Account>(
        r#"
        SELECT id, code, name, type, parent_id, is_active, created_at
        FROM accounts
        WHERE code = $1
        "#,
    )
    .bind(code)
    .fetch_optional(pool)
    .await?;

    Ok(account)
}

/// Find an account by code within a transaction
pub async fn find_by_code_tx(
    tx: &mut Transaction<'_, Postgres>,
    code: &str,
) -> Result<Option<Account>, AccountError> {
    let account = sqlx::query_as::<_, Account>(
        r#"
        SELECT id, code, name, type, parent_id, is_active, created_at
        FROM accounts
        WHERE code = $1
        "#,
    )
    .bind(code)
    .fetch_optional(&mut **tx)
    .await?;

    Ok(account)
}

/// Find an active account by code
/// Returns error if account doesn't exist or is inactive
pub async fn find_active_by_code(pool: &PgPool, code: &str) -> Result<Account, AccountError> {
    let account = find_by_code(pool, code).await?;

    match account {
        Some(acc) if acc.is_active => Ok(acc),
        Some(_) => Err(AccountError::Inactive {
            code: code.to_string(),
        }),
        None => Err(AccountError::NotFound {
            code: code.to_string(),
        }),
    }
}

/// Find an active account by code within a transaction
pub async fn find_active_by_code_tx(
    tx: &mut Transaction<'_, Postgres>,
    code: &str,
) -> Result<Account, AccountError> {
    let account = find_by_code_tx(tx, code).await?;

    match account {
        Some(acc) if acc.is_active => Ok(acc),
        Some(_) => Err(AccountError::Inactive {
            code: code.to_string(),
        }),
        None => Err(AccountError::NotFound {
            code: code.to_string(),
        }),
    }
}

/// Insert an account (used by provisioning and tests)
pub async fn insert(
    pool: &PgPool,
    code: &str,
    name: &str,
    account_type: AccountType,
    parent_id: Option<Uuid>,
) -> Result<Uuid, AccountError> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO accounts (id, code, name, type, parent_id, is_active)
        VALUES ($1, $2, $3, $4, $5, TRUE)
        "#,
    )
    .bind(id)
    .bind(code)
    .bind(name)
    .bind(account_type)
    .bind(parent_id)
    .execute(pool)
    .await?;

    Ok(id)
}

/// Resolve the adjustment account for a given adjustment kind, creating it
/// when absent.
///
/// Manual balance adjustments post against a dedicated expense/revenue
/// account per kind; first use of a kind provisions the account so posting
/// never fails on a missing adjustment target.
pub async fn resolve_or_create_adjustment_account(
    tx: &mut Transaction<'_, Postgres>,
    code: &str,
    name: &str,
    account_type: AccountType,
) -> Result<Account, AccountError> {
    if let Some(existing) = find_by_code_tx(tx, code).await? {
        if !existing.is_active {
            return Err(AccountError::Inactive {
                code: code.to_string(),
            });
        }
        return Ok(existing);
    }

    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO accounts (id, code, name, type, is_active)
        VALUES ($1, $2, $3, $4, TRUE)
        "#,
    )
    .bind(id)
    .bind(code)
    .bind(name)
    .bind(&account_type)
    .execute(&mut **tx)
    .await?;

    tracing::info!(code = %code, name = %name, "Provisioned adjustment account");

    find_by_code_tx(tx, code).await?.ok_or(AccountError::NotFound {
        code: code.to_string(),
    })
}
