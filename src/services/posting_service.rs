//! Journal posting service
//!
//! Turns a typed business event into one balanced journal entry, and
//! optionally into the matching party ledger entry in the same transaction.
//! The service either persists a fully balanced entry or persists nothing.

use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::contracts::posting_event_v1::{DocRef, EventKind, PostingEventV1};
use crate::repos::account_repo::{self, AccountError, AccountType};
use crate::repos::audit_repo::{self, AuditEvent};
use crate::repos::journal_repo::{self, JournalLineInsert};
use crate::repos::party_ledger_repo::{self, PartyLedgerInsert};
use crate::repos::party_repo::{self, PartyKind};
use crate::services::party_ledger_service::{self, generate_entry_number, LedgerError};
use crate::services::recipes::{self, ChartRoles};
use crate::validation::{validate_journal_lines, LineAmounts, ValidationError};

/// Errors that can occur during posting
#[derive(Debug, thiserror::Error)]
pub enum PostingError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Account error: {0}")]
    Account(#[from] AccountError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Reference already posted: {0}")]
    DuplicateReference(DocRef),

    #[error("Party not found: {0}")]
    PartyNotFound(Uuid),
}

/// Result type for posting operations
pub type PostingResult<T> = Result<T, PostingError>;

/// Identifiers produced by posting one business event
#[derive(Debug, Clone)]
pub struct PostedEvent {
    pub journal_entry_id: Uuid,
    pub ledger_entry_id: Uuid,
    /// Party balance after recalculation, minor units
    pub balance_minor: i64,
}

/// Post the journal entry for a business event.
///
/// Duplicate postings for the same reference are a caller error and are
/// rejected before any write. On success exactly one balanced entry
/// (at least two lines, debits == credits to the minor unit) is persisted
/// and one audit record is emitted.
pub async fn post_journal(
    pool: &PgPool,
    roles: &ChartRoles,
    event: &PostingEventV1,
) -> PostingResult<Uuid> {
    let reference = &event.reference;
    if journal_repo::exists_by_reference(pool, reference.kind.as_str(), &reference.id).await? {
        return Err(PostingError::DuplicateReference(reference.clone()));
    }

    let party = party_repo::find_by_id(pool, event.party_id)
        .await?
        .ok_or(PostingError::PartyNotFound(event.party_id))?;

    let mut tx = pool.begin().await?;
    let entry_id = insert_journal_tx(&mut tx, roles, event, party.kind).await?;
    tx.commit().await?;

    audit_repo::emit(
        pool,
        AuditEvent {
            action: "create",
            content_type: "journal_entry",
            object_id: entry_id.to_string(),
            description: event.description.clone(),
            payload: serde_json::json!({
                "kind": event.kind.as_str(),
                "reference": reference.to_string(),
                "entry_date": event.entry_date,
                "net_minor": event.net_minor,
                "tax_minor": event.tax_minor,
            }),
            actor: &event.actor,
        },
    )
    .await;

    tracing::info!(
        entry_id = %entry_id,
        reference = %reference,
        kind = event.kind.as_str(),
        "Journal entry posted"
    );

    Ok(entry_id)
}

/// Post a business event end to end: journal entry, party ledger entry,
/// and balance recalculation in one atomic unit.
///
/// This is the call document producers make at document-save time. If any
/// step fails, nothing is committed.
pub async fn post_business_event(
    pool: &PgPool,
    roles: &ChartRoles,
    event: &PostingEventV1,
) -> PostingResult<PostedEvent> {
    let reference = &event.reference;
    if journal_repo::exists_by_reference(pool, reference.kind.as_str(), &reference.id).await? {
        return Err(PostingError::DuplicateReference(reference.clone()));
    }
    if party_ledger_repo::exists_by_reference(
        pool,
        event.party_id,
        reference.kind.as_str(),
        &reference.id,
    )
    .await?
    {
        return Err(PostingError::DuplicateReference(reference.clone()));
    }

    let party = party_repo::find_by_id(pool, event.party_id)
        .await?
        .ok_or(PostingError::PartyNotFound(event.party_id))?;

    let direction = event
        .ledger_direction()
        .ok_or(ValidationError::MissingAdjustmentDirection)?;

    let mut tx = pool.begin().await?;

    let journal_entry_id = insert_journal_tx(&mut tx, roles, event, party.kind).await?;

    let ledger_insert = PartyLedgerInsert {
        id: Uuid::new_v4(),
        entry_number: generate_entry_number("PLE"),
        party_id: event.party_id,
        entry_date: event.entry_date,
        event_kind: event.kind.as_str().to_string(),
        direction,
        amount_minor: event.gross_minor(),
        reference_type: Some(reference.kind.as_str().to_string()),
        reference_id: Some(reference.id.clone()),
        description: event.description.clone(),
        created_by: event.actor.clone(),
    };
    let ledger_entry_id = party_ledger_repo::insert(&mut tx, &ledger_insert).await?;

    let balance_minor = party_ledger_service::recalculate(&mut tx, event.party_id).await?;

    tx.commit().await?;

    audit_repo::emit(
        pool,
        AuditEvent {
            action: "create",
            content_type: "journal_entry",
            object_id: journal_entry_id.to_string(),
            description: event.description.clone(),
            payload: serde_json::json!({
                "kind": event.kind.as_str(),
                "reference": reference.to_string(),
                "entry_date": event.entry_date,
                "net_minor": event.net_minor,
                "tax_minor": event.tax_minor,
            }),
            actor: &event.actor,
        },
    )
    .await;
    audit_repo::emit(
        pool,
        AuditEvent {
            action: "create",
            content_type: "party_ledger_entry",
            object_id: ledger_entry_id.to_string(),
            description: event.description.clone(),
            payload: serde_json::json!({
                "party_id": event.party_id,
                "kind": event.kind.as_str(),
                "direction": direction,
                "amount_minor": event.gross_minor(),
                "reference": reference.to_string(),
                "balance_minor": balance_minor,
            }),
            actor: &event.actor,
        },
    )
    .await;

    tracing::info!(
        journal_entry_id = %journal_entry_id,
        ledger_entry_id = %ledger_entry_id,
        party_id = %event.party_id,
        reference = %reference,
        balance_minor = balance_minor,
        "Business event posted"
    );

    Ok(PostedEvent {
        journal_entry_id,
        ledger_entry_id,
        balance_minor,
    })
}

/// Build, validate, and insert the journal entry inside the caller's
/// transaction. Never commits.
async fn insert_journal_tx(
    tx: &mut Transaction<'_, Postgres>,
    roles: &ChartRoles,
    event: &PostingEventV1,
    party_kind: PartyKind,
) -> PostingResult<Uuid> {
    let recipe = recipes::build_recipe(event, party_kind)?;

    let lines: Vec<LineAmounts> = recipe
        .iter()
        .map(|line| LineAmounts {
            account_code: roles.code_for(line.role).to_string(),
            debit_minor: line.debit_minor,
            credit_minor: line.credit_minor,
            memo: None,
        })
        .collect();

    validate_journal_lines(&event.description, &lines)?;

    // Adjustment postings may target an account that does not exist yet.
    if event.kind == EventKind::Adjustment {
        account_repo::resolve_or_create_adjustment_account(
            tx,
            &roles.adjustment,
            "Balance adjustments",
            AccountType::Expense,
        )
        .await?;
    }

    for line in &lines {
        account_repo::find_active_by_code_tx(tx, &line.account_code).await?;
    }

    let entry_id = Uuid::new_v4();
    journal_repo::insert_entry(
        tx,
        entry_id,
        &generate_entry_number("JE"),
        event.entry_date,
        Some(event.reference.kind.as_str()),
        Some(&event.reference.id),
        &event.description,
        None,
        &event.actor,
    )
    .await?;

    let inserts: Vec<JournalLineInsert> = lines
        .into_iter()
        .enumerate()
        .map(|(idx, line)| JournalLineInsert {
            id: Uuid::new_v4(),
            line_no: (idx + 1) as i32,
            account_code: line.account_code,
            debit_minor: line.debit_minor,
            credit_minor: line.credit_minor,
            memo: line.memo,
        })
        .collect();

    journal_repo::bulk_insert_lines(tx, entry_id, inserts).await?;

    Ok(entry_id)
}
