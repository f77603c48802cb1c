//! Orphan auditor behavior: purge unresolvable references, keep resolvable
//! ones, and treat unknown reference types as skip-and-report.

mod common;

use serial_test::serial;
use uuid::Uuid;

use ledger_rs::contracts::posting_event_v1::{Direction, DocKind, DocRef, EventKind};
use ledger_rs::repos::party_repo::{self, PartyKind};
use ledger_rs::resolver::{ResolverRegistry, TableResolver};
use ledger_rs::services::orphan_auditor;
use ledger_rs::services::party_ledger_service::{self, NewLedgerEntry};

async fn ensure_invoice_table(pool: &sqlx::PgPool) {
    sqlx::query("CREATE TABLE IF NOT EXISTS sales_invoices (id TEXT PRIMARY KEY)")
        .execute(pool)
        .await
        .expect("create document table");
}

fn registry() -> ResolverRegistry {
    let mut registry = ResolverRegistry::new();
    registry.register(DocKind::SalesInvoice, Box::new(TableResolver::new("sales_invoices")));
    registry
}

async fn append(
    pool: &sqlx::PgPool,
    party_id: Uuid,
    amount: i64,
    reference: Option<DocRef>,
) -> Uuid {
    party_ledger_service::append_entry(
        pool,
        NewLedgerEntry {
            party_id,
            entry_date: common::date(2025, 1, 15),
            kind: EventKind::SalesInvoice,
            direction: Direction::Debit,
            amount_minor: amount,
            reference,
            description: "orphan audit fixture".to_string(),
            created_by: "test".to_string(),
        },
    )
    .await
    .expect("append entry")
    .id
}

#[tokio::test]
#[serial]
async fn orphans_are_purged_and_balances_recalculated() {
    let Some(pool) = common::try_pool().await else {
        return;
    };
    ensure_invoice_table(&pool).await;

    let party_id = common::new_party(&pool, PartyKind::Customer).await;

    // A live document...
    let live_doc = format!("inv-live-{}", Uuid::new_v4().simple());
    sqlx::query("INSERT INTO sales_invoices (id) VALUES ($1)")
        .bind(&live_doc)
        .execute(&pool)
        .await
        .expect("insert live document");
    append(&pool, party_id, 100_000, Some(DocRef::new(DocKind::SalesInvoice, live_doc))).await;

    // ...and one whose document was deleted out from under the ledger.
    let dead_doc = format!("inv-dead-{}", Uuid::new_v4().simple());
    append(&pool, party_id, 40_000, Some(DocRef::new(DocKind::SalesInvoice, dead_doc))).await;

    let party = party_repo::find_by_id(&pool, party_id)
        .await
        .expect("query")
        .expect("party exists");
    assert_eq!(party.balance_minor, 140_000);

    let report = orphan_auditor::find_and_purge_orphans(&pool, &registry(), "auditor")
        .await
        .expect("audit runs");
    assert!(report.purged_references >= 1);
    assert!(report.purged_rows >= 1);

    // The orphan is gone and the balance was refolded.
    let party = party_repo::find_by_id(&pool, party_id)
        .await
        .expect("query")
        .expect("party exists");
    assert_eq!(party.balance_minor, 100_000);
}

#[tokio::test]
#[serial]
async fn unknown_reference_types_are_skipped_not_deleted() {
    let Some(pool) = common::try_pool().await else {
        return;
    };
    ensure_invoice_table(&pool).await;

    let party_id = common::new_party(&pool, PartyKind::Customer).await;
    let entry_id = append(&pool, party_id, 55_000, None).await;

    // Tag the entry with a reference type the auditor has never heard of,
    // the way a legacy import would.
    sqlx::query(
        "UPDATE party_ledger_entries SET reference_type = 'legacy_import', reference_id = 'row-7' WHERE id = $1",
    )
    .bind(entry_id)
    .execute(&pool)
    .await
    .expect("tag entry");

    let report = orphan_auditor::find_and_purge_orphans(&pool, &registry(), "auditor")
        .await
        .expect("audit runs");
    assert!(report.skipped_unknown >= 1);

    // Unknown is not orphaned: the entry survives, balance untouched.
    let party = party_repo::find_by_id(&pool, party_id)
        .await
        .expect("query")
        .expect("party exists");
    assert_eq!(party.balance_minor, 55_000);
}

#[tokio::test]
#[serial]
async fn internal_reference_kinds_always_resolve() {
    let Some(pool) = common::try_pool().await else {
        return;
    };
    ensure_invoice_table(&pool).await;

    let party_id = common::new_party(&pool, PartyKind::Customer).await;
    append(
        &pool,
        party_id,
        75_000,
        Some(DocRef::new(DocKind::OpeningBalance, Uuid::new_v4().to_string())),
    )
    .await;

    orphan_auditor::find_and_purge_orphans(&pool, &registry(), "auditor")
        .await
        .expect("audit runs");

    // Opening balance entries have no backing document table and must
    // never be purged.
    let party = party_repo::find_by_id(&pool, party_id)
        .await
        .expect("query")
        .expect("party exists");
    assert_eq!(party.balance_minor, 75_000);
}
