//! Reversal and deletion coordination
//!
//! Deleting a document removes its ledger rows and recalculates every
//! affected party; reversing a document keeps history intact and nets the
//! financial effect with equal-and-opposite postings. Both run inside one
//! transaction so a failure can never leave a party with stale balances.

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::contracts::posting_event_v1::{DocKind, DocRef};
use crate::contracts::reversal_request_v1::{ReversalOutcome, ReversalRequestV1};
use crate::repos::audit_repo::{self, AuditEvent};
use crate::repos::journal_repo::{self, JournalLineInsert};
use crate::repos::party_ledger_repo::{self, PartyLedgerInsert};
use crate::services::party_ledger_service::{self, generate_entry_number, LedgerError};

/// Errors that can occur during reversal or deletion
#[derive(Debug, thiserror::Error)]
pub enum ReversalError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("No posted entry found for reference: {0}")]
    EntryNotFound(DocRef),

    #[error("Entry already reversed: {0}")]
    AlreadyReversed(Uuid),

    #[error("Entry is itself a reversal and cannot be reversed: {0}")]
    IsReversal(Uuid),
}

/// Result type for reversal operations
pub type ReversalResult<T> = Result<T, ReversalError>;

/// Delete every ledger row posted for a reference and recalculate the
/// parties it touched.
///
/// The affected party set is collected *before* the delete; collecting
/// afterwards would find nothing. Returns the number of rows removed.
pub async fn delete_by_reference(
    pool: &PgPool,
    reference: &DocRef,
    actor: &str,
) -> ReversalResult<u64> {
    let mut tx = pool.begin().await?;

    let reference_type = reference.kind.as_str();
    let affected_parties =
        party_ledger_repo::parties_by_reference(&mut tx, reference_type, &reference.id).await?;
    let affected_accounts =
        journal_repo::account_codes_by_reference(&mut tx, reference_type, &reference.id).await?;

    let ledger_deleted =
        party_ledger_repo::delete_by_reference(&mut tx, reference_type, &reference.id).await?;
    let journal_deleted =
        journal_repo::delete_by_reference(&mut tx, reference_type, &reference.id).await?;

    for party_id in &affected_parties {
        party_ledger_service::recalculate(&mut tx, *party_id).await?;
    }

    tx.commit().await?;

    let deleted = ledger_deleted + journal_deleted;
    if deleted > 0 {
        audit_repo::emit(
            pool,
            AuditEvent {
                action: "delete",
                content_type: "ledger_posting",
                object_id: reference.to_string(),
                description: format!("Deleted {deleted} ledger row(s) for {reference}"),
                payload: serde_json::json!({
                    "reference": reference.to_string(),
                    "ledger_rows": ledger_deleted,
                    "journal_rows": journal_deleted,
                    "parties": &affected_parties,
                    "accounts": &affected_accounts,
                }),
                actor,
            },
        )
        .await;
    }

    tracing::info!(
        reference = %reference,
        ledger_deleted = ledger_deleted,
        journal_deleted = journal_deleted,
        parties = affected_parties.len(),
        accounts = affected_accounts.len(),
        "Deleted postings by reference and recalculated parties"
    );

    Ok(deleted)
}

/// Reverse a posted document without deleting history.
///
/// Creates an equal-and-opposite journal entry dated at reversal time with
/// lines swapped, mirrors every party ledger entry with its direction
/// flipped, recalculates the touched parties, and flags the original entry
/// `is_reversed`. The flag is the only in-place change reversal makes.
pub async fn reverse(
    pool: &PgPool,
    request: &ReversalRequestV1,
) -> ReversalResult<ReversalOutcome> {
    let reference = &request.reference;
    let original = journal_repo::find_by_reference(pool, reference.kind.as_str(), &reference.id)
        .await?
        .ok_or_else(|| ReversalError::EntryNotFound(reference.clone()))?;

    if original.is_reversed {
        return Err(ReversalError::AlreadyReversed(original.id));
    }
    if original.reversal_of.is_some() {
        return Err(ReversalError::IsReversal(original.id));
    }

    let original_lines = journal_repo::fetch_lines(pool, original.id).await?;
    let original_ledger_entries =
        party_ledger_repo::fetch_by_reference(pool, reference.kind.as_str(), &reference.id).await?;

    let reversal_date = Utc::now().date_naive();
    let description = format!(
        "Reversal of {}: {}",
        original.entry_number, request.reason
    );

    let mut tx = pool.begin().await?;

    let reversal_entry_id = Uuid::new_v4();
    journal_repo::insert_entry(
        &mut tx,
        reversal_entry_id,
        &generate_entry_number("JE"),
        reversal_date,
        Some(DocKind::Reversal.as_str()),
        Some(&original.id.to_string()),
        &description,
        Some(original.id),
        &request.actor,
    )
    .await?;

    let reversal_lines: Vec<JournalLineInsert> = original_lines
        .iter()
        .map(|line| JournalLineInsert {
            id: Uuid::new_v4(),
            line_no: line.line_no,
            account_code: line.account_code.clone(),
            // Swap sides so the net effect on every account is zero
            debit_minor: line.credit_minor,
            credit_minor: line.debit_minor,
            memo: line.memo.clone(),
        })
        .collect();
    journal_repo::bulk_insert_lines(&mut tx, reversal_entry_id, reversal_lines).await?;

    let mut recalculated_parties: Vec<Uuid> = Vec::new();
    for entry in &original_ledger_entries {
        let mirror = PartyLedgerInsert {
            id: Uuid::new_v4(),
            entry_number: generate_entry_number("PLE"),
            party_id: entry.party_id,
            entry_date: reversal_date,
            event_kind: entry.event_kind.clone(),
            direction: entry.direction.opposite(),
            amount_minor: entry.amount_minor,
            reference_type: Some(DocKind::Reversal.as_str().to_string()),
            reference_id: Some(original.id.to_string()),
            description: description.clone(),
            created_by: request.actor.clone(),
        };
        party_ledger_repo::insert(&mut tx, &mirror).await?;
        if !recalculated_parties.contains(&entry.party_id) {
            recalculated_parties.push(entry.party_id);
        }
    }

    for party_id in &recalculated_parties {
        party_ledger_service::recalculate(&mut tx, *party_id).await?;
    }

    journal_repo::mark_reversed(&mut tx, original.id).await?;

    tx.commit().await?;

    audit_repo::emit(
        pool,
        AuditEvent {
            action: "reverse",
            content_type: "journal_entry",
            object_id: original.id.to_string(),
            description,
            payload: serde_json::json!({
                "reference": reference.to_string(),
                "original_entry_id": original.id,
                "reversal_entry_id": reversal_entry_id,
                "reason": &request.reason,
                "parties": &recalculated_parties,
            }),
            actor: &request.actor,
        },
    )
    .await;

    tracing::info!(
        original_entry_id = %original.id,
        reversal_entry_id = %reversal_entry_id,
        reference = %reference,
        parties = recalculated_parties.len(),
        "Reversal entry created"
    );

    Ok(ReversalOutcome {
        original_entry_id: original.id,
        reversal_entry_id,
        recalculated_parties,
    })
}
