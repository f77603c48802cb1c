//! Orphan auditor
//!
//! Offline batch job that finds ledger rows whose referenced source
//! document no longer exists, purges them, and recalculates the parties
//! they touched. A reference type with no registered resolver is skipped
//! and reported; unknown is never treated as orphaned.

use sqlx::PgPool;

use crate::repos::audit_repo::{self, AuditEvent};
use crate::repos::{journal_repo, party_ledger_repo};
use crate::resolver::{Resolution, ResolverRegistry};
use crate::services::party_ledger_service;

/// Outcome of one orphan audit run
#[derive(Debug, Clone, Copy, Default)]
pub struct OrphanReport {
    pub scanned: u64,
    pub purged_references: u64,
    pub purged_rows: u64,
    pub skipped_unknown: u64,
    pub failed: u64,
}

/// Scan every distinct ledger reference and purge the orphaned ones.
///
/// Each orphaned reference is purged in its own transaction so one bad
/// record cannot abort the whole batch; failures are logged and skipped.
pub async fn find_and_purge_orphans(
    pool: &PgPool,
    registry: &ResolverRegistry,
    actor: &str,
) -> Result<OrphanReport, sqlx::Error> {
    let references = party_ledger_repo::list_distinct_references(pool).await?;
    let mut report = OrphanReport::default();

    for reference in references {
        report.scanned += 1;

        let resolution = match registry
            .resolve(pool, &reference.reference_type, &reference.reference_id)
            .await
        {
            Ok(r) => r,
            Err(e) => {
                report.failed += 1;
                tracing::warn!(
                    reference_type = %reference.reference_type,
                    reference_id = %reference.reference_id,
                    error = %e,
                    "Resolution failed; skipping reference"
                );
                continue;
            }
        };

        match resolution {
            Resolution::Exists => {}
            Resolution::UnknownKind => {
                report.skipped_unknown += 1;
                tracing::warn!(
                    reference_type = %reference.reference_type,
                    reference_id = %reference.reference_id,
                    "Unknown reference type; skipping (unknown is not orphaned)"
                );
            }
            Resolution::Missing => {
                match purge_reference(pool, &reference.reference_type, &reference.reference_id)
                    .await
                {
                    Ok(rows) => {
                        report.purged_references += 1;
                        report.purged_rows += rows;
                        audit_repo::emit(
                            pool,
                            AuditEvent {
                                action: "delete",
                                content_type: "orphaned_posting",
                                object_id: format!(
                                    "{}:{}",
                                    reference.reference_type, reference.reference_id
                                ),
                                description: format!("Purged {rows} orphaned ledger row(s)"),
                                payload: serde_json::json!({
                                    "reference_type": &reference.reference_type,
                                    "reference_id": &reference.reference_id,
                                    "rows": rows,
                                }),
                                actor,
                            },
                        )
                        .await;
                    }
                    Err(e) => {
                        report.failed += 1;
                        tracing::warn!(
                            reference_type = %reference.reference_type,
                            reference_id = %reference.reference_id,
                            error = %e,
                            "Purge failed; skipping reference"
                        );
                    }
                }
            }
        }
    }

    tracing::info!(
        scanned = report.scanned,
        purged_references = report.purged_references,
        purged_rows = report.purged_rows,
        skipped_unknown = report.skipped_unknown,
        failed = report.failed,
        "Orphan audit complete"
    );

    Ok(report)
}

/// Purge one orphaned reference atomically: collect affected parties,
/// delete its rows, recalculate.
async fn purge_reference(
    pool: &PgPool,
    reference_type: &str,
    reference_id: &str,
) -> Result<u64, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let affected_parties =
        party_ledger_repo::parties_by_reference(&mut tx, reference_type, reference_id).await?;

    let ledger_rows =
        party_ledger_repo::delete_by_reference(&mut tx, reference_type, reference_id).await?;
    let journal_rows =
        journal_repo::delete_by_reference(&mut tx, reference_type, reference_id).await?;

    for party_id in affected_parties {
        party_ledger_service::recalculate(&mut tx, party_id)
            .await
            .map_err(|e| match e {
                party_ledger_service::LedgerError::Database(db) => db,
                other => sqlx::Error::Protocol(other.to_string()),
            })?;
    }

    tx.commit().await?;

    Ok(ledger_rows + journal_rows)
}
