//! Stored expected-loss estimates: refresh overwrites the persisted
//! amount, method, and timestamp, and the sweep walks every open
//! instrument without letting one failure abort the batch.

mod common;

use serial_test::serial;

use ledger_rs::repos::instrument_repo::{self, InstrumentStatus};
use ledger_rs::repos::party_repo::PartyKind;
use ledger_rs::services::risk_service;

#[tokio::test]
#[serial]
async fn refresh_overwrites_amount_method_and_timestamp() {
    let Some(pool) = common::try_pool().await else {
        return;
    };

    let party_id = common::new_party(&pool, PartyKind::Customer).await;

    // Give the party a 10-check history with exactly one bounce (10%), so
    // the risk factor lands on the neutral 1.0 tier.
    for _ in 0..8 {
        instrument_repo::insert(
            &pool,
            party_id,
            500_000,
            common::date(2026, 1, 1),
            InstrumentStatus::Pending,
            None,
        )
        .await
        .expect("insert pending instrument");
    }
    instrument_repo::insert(
        &pool,
        party_id,
        500_000,
        common::date(2024, 6, 1),
        InstrumentStatus::Bounced,
        None,
    )
    .await
    .expect("insert bounced instrument");

    // The check under estimate: 1000.000 due 2025-01-01, collected 45 days
    // late on 2025-02-15, so the <=90d tier (15%) applies at factor 1.0.
    let instrument_id = instrument_repo::insert(
        &pool,
        party_id,
        1_000_000,
        common::date(2025, 1, 1),
        InstrumentStatus::Collected,
        Some(common::date(2025, 2, 15)),
    )
    .await
    .expect("insert collected instrument");

    let estimate = risk_service::refresh_expected_loss(&pool, instrument_id, common::date(2025, 6, 1))
        .await
        .expect("refresh succeeds");
    assert_eq!(estimate.amount_minor, 150_000);
    assert!(estimate.method.contains("<=90d"), "method was: {}", estimate.method);

    let stored = instrument_repo::find_by_id(&pool, instrument_id)
        .await
        .expect("query")
        .expect("instrument exists");
    assert_eq!(stored.expected_loss_minor, Some(150_000));
    assert_eq!(stored.loss_method.as_deref(), Some(estimate.method.as_str()));
    assert!(stored.loss_computed_at.is_some());

    // The check later bounces; recomputation overwrites all three fields.
    sqlx::query("UPDATE instruments SET status = 'bounced', collected_on = NULL WHERE id = $1")
        .bind(instrument_id)
        .execute(&pool)
        .await
        .expect("bounce instrument");

    let first_computed_at = stored.loss_computed_at;
    let estimate = risk_service::refresh_expected_loss(&pool, instrument_id, common::date(2025, 6, 1))
        .await
        .expect("second refresh succeeds");
    assert_eq!(estimate.amount_minor, 1_000_000);

    let stored = instrument_repo::find_by_id(&pool, instrument_id)
        .await
        .expect("query")
        .expect("instrument exists");
    assert_eq!(stored.expected_loss_minor, Some(1_000_000));
    assert!(
        stored
            .loss_method
            .as_deref()
            .is_some_and(|m| m.contains("risk factor not applied")),
        "method was: {:?}",
        stored.loss_method
    );
    assert!(stored.loss_computed_at >= first_computed_at);
}

#[tokio::test]
#[serial]
async fn sweep_refreshes_open_instruments_and_leaves_collected_alone() {
    let Some(pool) = common::try_pool().await else {
        return;
    };

    let party_id = common::new_party(&pool, PartyKind::Supplier).await;

    let overdue_id = instrument_repo::insert(
        &pool,
        party_id,
        400_000,
        common::date(2025, 1, 1),
        InstrumentStatus::Pending,
        None,
    )
    .await
    .expect("insert overdue instrument");

    let bounced_id = instrument_repo::insert(
        &pool,
        party_id,
        250_000,
        common::date(2025, 2, 1),
        InstrumentStatus::Bounced,
        None,
    )
    .await
    .expect("insert bounced instrument");

    let collected_id = instrument_repo::insert(
        &pool,
        party_id,
        300_000,
        common::date(2025, 3, 1),
        InstrumentStatus::Collected,
        Some(common::date(2025, 3, 1)),
    )
    .await
    .expect("insert collected instrument");

    let report = risk_service::refresh_open_instruments(&pool, common::date(2025, 6, 1))
        .await
        .expect("sweep runs");
    assert!(report.refreshed >= 2);
    assert_eq!(report.failed, 0);

    // Both open instruments now carry stored estimates.
    let overdue = instrument_repo::find_by_id(&pool, overdue_id)
        .await
        .expect("query")
        .expect("instrument exists");
    assert!(overdue.expected_loss_minor.is_some());
    assert!(overdue.loss_computed_at.is_some());

    let bounced = instrument_repo::find_by_id(&pool, bounced_id)
        .await
        .expect("query")
        .expect("instrument exists");
    assert_eq!(bounced.expected_loss_minor, Some(250_000));

    // Collected instruments are not the sweep's concern.
    let collected = instrument_repo::find_by_id(&pool, collected_id)
        .await
        .expect("query")
        .expect("instrument exists");
    assert_eq!(collected.expected_loss_minor, None);
    assert_eq!(collected.loss_computed_at, None);
}
