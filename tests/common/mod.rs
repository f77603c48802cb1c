use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use ledger_rs::contracts::posting_event_v1::{DocKind, DocRef, EventKind, PostingEventV1};
use ledger_rs::db;
use ledger_rs::repos::party_repo::{self, PartyKind};
use ledger_rs::services::recipes::ChartRoles;

/// Connect to the test database, or skip the test when none is configured.
///
/// Integration suites in this crate need a reachable PostgreSQL instance;
/// without DATABASE_URL they no-op so the pure suites still run everywhere.
pub async fn try_pool() -> Option<PgPool> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set; skipping DB-backed test");
        return None;
    };

    let pool = db::init_pool(&database_url)
        .await
        .expect("Failed to create test pool");

    db::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");

    Some(pool)
}

/// Seed the default chart roles, ignoring accounts that already exist
pub async fn seed_chart(pool: &PgPool) {
    let roles = ChartRoles::default();
    let accounts = [
        (roles.cash.as_str(), "Cash", "asset"),
        (roles.accounts_receivable.as_str(), "Accounts Receivable", "asset"),
        (roles.inventory.as_str(), "Inventory", "asset"),
        (roles.tax_receivable.as_str(), "Tax Receivable", "asset"),
        (roles.accounts_payable.as_str(), "Accounts Payable", "liability"),
        (roles.tax_payable.as_str(), "Tax Payable", "liability"),
        (roles.revenue.as_str(), "Revenue", "revenue"),
        (roles.adjustment.as_str(), "Balance adjustments", "expense"),
    ];

    for (code, name, account_type) in accounts {
        sqlx::query(
            r#"
            INSERT INTO accounts (id, code, name, type, is_active)
            VALUES ($1, $2, $3, $4::account_type, TRUE)
            ON CONFLICT (code) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(code)
        .bind(name)
        .bind(account_type)
        .execute(pool)
        .await
        .expect("Failed to seed chart account");
    }
}

pub async fn new_party(pool: &PgPool, kind: PartyKind) -> Uuid {
    let name = format!("test-party-{}", Uuid::new_v4().simple());
    party_repo::insert(pool, &name, kind)
        .await
        .expect("Failed to insert test party")
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Build a posting event with a fresh unique reference id
pub fn event(
    kind: EventKind,
    doc_kind: DocKind,
    party_id: Uuid,
    entry_date: NaiveDate,
    net_minor: i64,
    tax_minor: i64,
) -> PostingEventV1 {
    PostingEventV1 {
        kind,
        party_id,
        entry_date,
        net_minor,
        tax_minor,
        reference: DocRef::new(doc_kind, format!("doc-{}", Uuid::new_v4().simple())),
        description: format!("{} test posting", kind.as_str()),
        adjustment_direction: None,
        actor: "test".to_string(),
    }
}
