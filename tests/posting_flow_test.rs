//! End-to-end posting and balance flow against a real database.
//!
//! Covers the core round trip: post a business event, watch the party
//! balance move, delete by reference, and see the prior balance restored
//! exactly.

mod common;

use serial_test::serial;

use ledger_rs::contracts::posting_event_v1::{Direction, DocKind, EventKind};
use ledger_rs::repos::party_repo::{self, PartyKind};
use ledger_rs::services::party_ledger_service::{self, NewLedgerEntry};
use ledger_rs::services::posting_service::{self, PostingError};
use ledger_rs::services::recipes::ChartRoles;
use ledger_rs::services::reversal_service;

#[tokio::test]
#[serial]
async fn post_delete_recalculate_round_trip() {
    let Some(pool) = common::try_pool().await else {
        return;
    };
    common::seed_chart(&pool).await;

    let roles = ChartRoles::default();
    let party_id = common::new_party(&pool, PartyKind::Customer).await;

    // Sales invoice 230.000 raises the receivable.
    let invoice = common::event(
        EventKind::SalesInvoice,
        DocKind::SalesInvoice,
        party_id,
        common::date(2025, 1, 10),
        200_000,
        30_000,
    );
    let posted = posting_service::post_business_event(&pool, &roles, &invoice)
        .await
        .expect("invoice must post");
    assert_eq!(posted.balance_minor, 230_000);

    // Receipt 100.000 brings it down to 130.000.
    let receipt = common::event(
        EventKind::Receipt,
        DocKind::Receipt,
        party_id,
        common::date(2025, 2, 5),
        100_000,
        0,
    );
    let posted = posting_service::post_business_event(&pool, &roles, &receipt)
        .await
        .expect("receipt must post");
    assert_eq!(posted.balance_minor, 130_000);

    // Deleting the receipt restores the pre-receipt balance exactly.
    let deleted = reversal_service::delete_by_reference(&pool, &receipt.reference, "test")
        .await
        .expect("delete must succeed");
    assert!(deleted >= 2, "ledger entry and journal entry removed");

    let party = party_repo::find_by_id(&pool, party_id)
        .await
        .expect("query")
        .expect("party exists");
    assert_eq!(party.balance_minor, 230_000);
}

#[tokio::test]
#[serial]
async fn duplicate_posting_is_rejected() {
    let Some(pool) = common::try_pool().await else {
        return;
    };
    common::seed_chart(&pool).await;

    let roles = ChartRoles::default();
    let party_id = common::new_party(&pool, PartyKind::Customer).await;

    let invoice = common::event(
        EventKind::SalesInvoice,
        DocKind::SalesInvoice,
        party_id,
        common::date(2025, 3, 1),
        100_000,
        0,
    );

    posting_service::post_business_event(&pool, &roles, &invoice)
        .await
        .expect("first post succeeds");

    let second = posting_service::post_business_event(&pool, &roles, &invoice).await;
    assert!(
        matches!(second, Err(PostingError::DuplicateReference(_))),
        "second post for the same reference must be rejected, got {second:?}"
    );

    // The duplicate attempt must not have moved the balance.
    let party = party_repo::find_by_id(&pool, party_id)
        .await
        .expect("query")
        .expect("party exists");
    assert_eq!(party.balance_minor, 100_000);
}

#[tokio::test]
#[serial]
async fn recalculate_is_idempotent() {
    let Some(pool) = common::try_pool().await else {
        return;
    };
    common::seed_chart(&pool).await;

    let roles = ChartRoles::default();
    let party_id = common::new_party(&pool, PartyKind::Customer).await;

    for (day, net) in [(10, 50_000), (11, 70_000), (12, 30_000)] {
        let invoice = common::event(
            EventKind::SalesInvoice,
            DocKind::SalesInvoice,
            party_id,
            common::date(2025, 4, day),
            net,
            0,
        );
        posting_service::post_business_event(&pool, &roles, &invoice)
            .await
            .expect("invoice must post");
    }

    let first = party_ledger_service::recalculate_party(&pool, party_id)
        .await
        .expect("first recalculation");
    let second = party_ledger_service::recalculate_party(&pool, party_id)
        .await
        .expect("second recalculation");
    assert_eq!(first, second);
    assert_eq!(first, 150_000);

    // The fold agrees with the cache.
    let verified = party_ledger_service::verify_party_balance(&pool, party_id)
        .await
        .expect("verification passes");
    assert_eq!(verified, 150_000);
}

#[tokio::test]
#[serial]
async fn divergent_cache_is_flagged_not_corrected() {
    let Some(pool) = common::try_pool().await else {
        return;
    };
    common::seed_chart(&pool).await;

    let roles = ChartRoles::default();
    let party_id = common::new_party(&pool, PartyKind::Customer).await;

    let invoice = common::event(
        EventKind::SalesInvoice,
        DocKind::SalesInvoice,
        party_id,
        common::date(2025, 5, 1),
        80_000,
        0,
    );
    posting_service::post_business_event(&pool, &roles, &invoice)
        .await
        .expect("invoice must post");

    // Corrupt the cache the way a rogue writer would.
    sqlx::query("UPDATE parties SET balance_minor = 999 WHERE id = $1")
        .bind(party_id)
        .execute(&pool)
        .await
        .expect("corrupt cache");

    let result = party_ledger_service::verify_party_balance(&pool, party_id).await;
    assert!(
        matches!(
            result,
            Err(party_ledger_service::LedgerError::RecalculationDivergence { .. })
        ),
        "divergence must be flagged, got {result:?}"
    );

    // Still 999: verification reports, it does not repair.
    let party = party_repo::find_by_id(&pool, party_id)
        .await
        .expect("query")
        .expect("party exists");
    assert_eq!(party.balance_minor, 999);
}

#[tokio::test]
#[serial]
async fn statement_range_agrees_with_unranged_total() {
    let Some(pool) = common::try_pool().await else {
        return;
    };
    common::seed_chart(&pool).await;

    let roles = ChartRoles::default();
    let party_id = common::new_party(&pool, PartyKind::Customer).await;

    let invoice = common::event(
        EventKind::SalesInvoice,
        DocKind::SalesInvoice,
        party_id,
        common::date(2025, 1, 10),
        200_000,
        30_000,
    );
    posting_service::post_business_event(&pool, &roles, &invoice)
        .await
        .expect("invoice must post");

    let receipt = common::event(
        EventKind::Receipt,
        DocKind::Receipt,
        party_id,
        common::date(2025, 2, 5),
        100_000,
        0,
    );
    posting_service::post_business_event(&pool, &roles, &receipt)
        .await
        .expect("receipt must post");

    // Ranged statement: opening balance is the fold of everything before
    // the range, so range + opening always equals the unranged closing.
    let ranged = party_ledger_service::statement(
        &pool,
        party_id,
        Some(common::date(2025, 2, 1)),
        None,
    )
    .await
    .expect("ranged statement");
    assert_eq!(ranged.opening_balance_minor, 230_000);
    assert_eq!(ranged.lines.len(), 1);
    assert_eq!(ranged.total_credit_minor, 100_000);
    assert_eq!(ranged.closing_balance_minor, 130_000);

    let full = party_ledger_service::statement(&pool, party_id, None, None)
        .await
        .expect("full statement");
    assert_eq!(full.opening_balance_minor, 0);
    assert_eq!(full.closing_balance_minor, ranged.closing_balance_minor);
    assert_eq!(full.lines.last().unwrap().running_balance_minor, 130_000);

    let party = party_repo::find_by_id(&pool, party_id)
        .await
        .expect("query")
        .expect("party exists");
    assert_eq!(full.closing_balance_minor, party.balance_minor);
}

#[tokio::test]
#[serial]
async fn append_returns_the_persisted_entry() {
    let Some(pool) = common::try_pool().await else {
        return;
    };

    let party_id = common::new_party(&pool, PartyKind::Customer).await;

    let entry = party_ledger_service::append_entry(
        &pool,
        NewLedgerEntry {
            party_id,
            entry_date: common::date(2025, 6, 1),
            kind: EventKind::Adjustment,
            direction: Direction::Debit,
            amount_minor: 60_000,
            reference: None,
            description: "manual opening adjustment".to_string(),
            created_by: "test".to_string(),
        },
    )
    .await
    .expect("append succeeds");

    // The returned row is the committed one, running balance included.
    assert_eq!(entry.party_id, party_id);
    assert_eq!(entry.amount_minor, 60_000);
    assert_eq!(entry.balance_after_minor, 60_000);
    assert!(entry.entry_number.starts_with("PLE-"));
}

#[tokio::test]
#[serial]
async fn posting_emits_audit_record_with_structured_payload() {
    let Some(pool) = common::try_pool().await else {
        return;
    };
    common::seed_chart(&pool).await;

    let roles = ChartRoles::default();
    let party_id = common::new_party(&pool, PartyKind::Customer).await;

    let invoice = common::event(
        EventKind::SalesInvoice,
        DocKind::SalesInvoice,
        party_id,
        common::date(2025, 6, 10),
        200_000,
        30_000,
    );
    let posted = posting_service::post_business_event(&pool, &roles, &invoice)
        .await
        .expect("invoice must post");

    let payload: serde_json::Value = sqlx::query_scalar(
        "SELECT payload FROM audit_log WHERE content_type = 'journal_entry' AND object_id = $1",
    )
    .bind(posted.journal_entry_id.to_string())
    .fetch_one(&pool)
    .await
    .expect("audit record exists");

    assert_eq!(payload["reference"], serde_json::json!(invoice.reference.to_string()));
    assert_eq!(payload["kind"], serde_json::json!("sales_invoice"));
    assert_eq!(payload["net_minor"], serde_json::json!(200_000));
    assert_eq!(payload["tax_minor"], serde_json::json!(30_000));

    let ledger_payload: serde_json::Value = sqlx::query_scalar(
        "SELECT payload FROM audit_log WHERE content_type = 'party_ledger_entry' AND object_id = $1",
    )
    .bind(posted.ledger_entry_id.to_string())
    .fetch_one(&pool)
    .await
    .expect("ledger audit record exists");
    assert_eq!(ledger_payload["balance_minor"], serde_json::json!(posted.balance_minor));
}
