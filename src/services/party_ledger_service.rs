//! Party ledger append, balance recalculation, and statements
//!
//! The recalculator is the single source of truth for balances: it replays
//! a party's entries in (entry_date, created_at, id) order and rewrites
//! every cached `balance_after_minor` plus the party's cached balance.
//! Append never computes balances itself.

use chrono::NaiveDate;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::contracts::posting_event_v1::{Direction, DocRef, EventKind};
use crate::repos::audit_repo::{self, AuditEvent};
use crate::repos::party_ledger_repo::{self, PartyLedgerEntry, PartyLedgerInsert};
use crate::repos::party_repo;
use crate::validation::ValidationError;

/// Page size for the recalculation fold. The fold stays atomic; paging only
/// bounds the size of any single fetch over a very large history.
const RECALC_PAGE_SIZE: i64 = 500;

/// Errors that can occur during party ledger operations
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Party not found: {0}")]
    PartyNotFound(Uuid),

    #[error("Reference already posted on this party's ledger: {reference}")]
    DuplicateReference { party_id: Uuid, reference: DocRef },

    #[error(
        "Recalculation divergence for party {party_id}: cached {cached_minor}, fold produced {computed_minor}"
    )]
    RecalculationDivergence {
        party_id: Uuid,
        cached_minor: i64,
        computed_minor: i64,
    },
}

/// Result type for party ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Input for appending one party ledger entry
#[derive(Debug, Clone)]
pub struct NewLedgerEntry {
    pub party_id: Uuid,
    pub entry_date: NaiveDate,
    pub kind: EventKind,
    pub direction: Direction,
    pub amount_minor: i64,
    pub reference: Option<DocRef>,
    pub description: String,
    pub created_by: String,
}

/// Append an entry to a party's ledger and recalculate that party.
///
/// Validates the amount, rejects a duplicate reference for the same party,
/// then inserts and recalculates inside one transaction. The returned entry
/// carries the recalculated running balance.
pub async fn append_entry(pool: &PgPool, new: NewLedgerEntry) -> LedgerResult<PartyLedgerEntry> {
    if new.amount_minor <= 0 {
        return Err(ValidationError::NonPositiveAmount(new.amount_minor).into());
    }

    let desc_len = new.description.chars().count();
    if desc_len == 0 || desc_len > 500 {
        return Err(ValidationError::InvalidDescriptionLength(desc_len).into());
    }

    if let Some(ref reference) = new.reference {
        let already = party_ledger_repo::exists_by_reference(
            pool,
            new.party_id,
            reference.kind.as_str(),
            &reference.id,
        )
        .await?;
        if already {
            return Err(LedgerError::DuplicateReference {
                party_id: new.party_id,
                reference: reference.clone(),
            });
        }
    }

    let mut tx = pool.begin().await?;

    let insert = PartyLedgerInsert {
        id: Uuid::new_v4(),
        entry_number: generate_entry_number("PLE"),
        party_id: new.party_id,
        entry_date: new.entry_date,
        event_kind: new.kind.as_str().to_string(),
        direction: new.direction,
        amount_minor: new.amount_minor,
        reference_type: new.reference.as_ref().map(|r| r.kind.as_str().to_string()),
        reference_id: new.reference.as_ref().map(|r| r.id.clone()),
        description: new.description.clone(),
        created_by: new.created_by.clone(),
    };

    let entry_id = party_ledger_repo::insert(&mut tx, &insert).await?;
    let balance = recalculate(&mut tx, new.party_id).await?;

    tx.commit().await?;

    audit_repo::emit(
        pool,
        AuditEvent {
            action: "create",
            content_type: "party_ledger_entry",
            object_id: entry_id.to_string(),
            description: new.description.clone(),
            payload: serde_json::json!({
                "party_id": new.party_id,
                "kind": new.kind.as_str(),
                "direction": new.direction,
                "amount_minor": new.amount_minor,
                "reference": new.reference.as_ref().map(|r| r.to_string()),
                "balance_minor": balance,
            }),
            actor: &new.created_by,
        },
    )
    .await;

    tracing::info!(
        entry_id = %entry_id,
        party_id = %new.party_id,
        kind = new.kind.as_str(),
        amount_minor = new.amount_minor,
        balance_minor = balance,
        "Party ledger entry appended"
    );

    // The row was just committed; failing to read it back is a storage
    // fault, not a lookup miss.
    party_ledger_repo::find_by_id(pool, entry_id)
        .await?
        .ok_or(LedgerError::Database(sqlx::Error::RowNotFound))
}

/// Replay a party's ledger and rewrite its cached balances.
///
/// Locks the party row first, so two writers touching the same party are
/// serialized; different parties proceed in parallel. Returns the fold
/// result, which is also persisted as the party's cached balance.
pub async fn recalculate(
    tx: &mut Transaction<'_, Postgres>,
    party_id: Uuid,
) -> LedgerResult<i64> {
    recalculate_paged(tx, party_id, RECALC_PAGE_SIZE).await
}

/// Recalculate with an explicit page size (maintenance tools)
pub async fn recalculate_paged(
    tx: &mut Transaction<'_, Postgres>,
    party_id: Uuid,
    page_size: i64,
) -> LedgerResult<i64> {
    if !party_repo::lock_for_update(tx, party_id).await? {
        return Err(LedgerError::PartyNotFound(party_id));
    }

    let mut balance: i64 = 0;
    let mut cursor = None;
    let mut entries_seen: u64 = 0;

    loop {
        let page =
            party_ledger_repo::fetch_page_ordered(tx, party_id, cursor, page_size).await?;
        if page.is_empty() {
            break;
        }

        for entry in &page {
            balance += signed_amount(entry.direction, entry.amount_minor);
            if entry.balance_after_minor != balance {
                party_ledger_repo::update_balance_after(tx, entry.id, balance).await?;
            }
            entries_seen += 1;
        }

        let last = &page[page.len() - 1];
        cursor = Some((last.entry_date, last.created_at, last.id));

        if (page.len() as i64) < page_size {
            break;
        }
    }

    party_repo::update_cached_balance(tx, party_id, balance).await?;

    tracing::debug!(
        party_id = %party_id,
        entries = entries_seen,
        balance_minor = balance,
        "Recalculated party balance"
    );

    Ok(balance)
}

/// Recalculate one party in its own transaction
pub async fn recalculate_party(pool: &PgPool, party_id: Uuid) -> LedgerResult<i64> {
    let mut tx = pool.begin().await?;
    let balance = recalculate(&mut tx, party_id).await?;
    tx.commit().await?;
    Ok(balance)
}

/// Re-fold a party's ledger without writing and compare against the cache.
///
/// A mismatch means some code path wrote balances outside the recalculator;
/// it is flagged for manual review, never auto-corrected here.
pub async fn verify_party_balance(pool: &PgPool, party_id: Uuid) -> LedgerResult<i64> {
    let party = party_repo::find_by_id(pool, party_id)
        .await?
        .ok_or(LedgerError::PartyNotFound(party_id))?;

    let entries = party_ledger_repo::fetch_range_ordered(pool, party_id, None, None).await?;
    let computed: i64 = entries
        .iter()
        .map(|e| signed_amount(e.direction, e.amount_minor))
        .sum();

    if computed != party.balance_minor {
        tracing::error!(
            party_id = %party_id,
            cached_minor = party.balance_minor,
            computed_minor = computed,
            "Cached balance diverges from ledger fold"
        );
        return Err(LedgerError::RecalculationDivergence {
            party_id,
            cached_minor: party.balance_minor,
            computed_minor: computed,
        });
    }

    Ok(computed)
}

/// One statement line: a ledger entry with its running balance
#[derive(Debug, Clone)]
pub struct StatementLine {
    pub entry: PartyLedgerEntry,
    pub running_balance_minor: i64,
}

/// A party statement over an optional date range
#[derive(Debug, Clone)]
pub struct Statement {
    pub party_id: Uuid,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub opening_balance_minor: i64,
    pub lines: Vec<StatementLine>,
    pub total_debit_minor: i64,
    pub total_credit_minor: i64,
    pub closing_balance_minor: i64,
}

/// Build a party statement.
///
/// The opening balance of a ranged statement is the fold of all entries
/// strictly before `date_from`, not a stored snapshot, so the ranged view
/// and the unranged total always agree.
pub async fn statement(
    pool: &PgPool,
    party_id: Uuid,
    date_from: Option<NaiveDate>,
    date_to: Option<NaiveDate>,
) -> LedgerResult<Statement> {
    if party_repo::find_by_id(pool, party_id).await?.is_none() {
        return Err(LedgerError::PartyNotFound(party_id));
    }

    let opening = match date_from {
        Some(from) => party_ledger_repo::fold_before(pool, party_id, from).await?,
        None => 0,
    };

    let entries =
        party_ledger_repo::fetch_range_ordered(pool, party_id, date_from, date_to).await?;

    let mut running = opening;
    let mut total_debit: i64 = 0;
    let mut total_credit: i64 = 0;
    let mut lines = Vec::with_capacity(entries.len());

    for entry in entries {
        match entry.direction {
            Direction::Debit => total_debit += entry.amount_minor,
            Direction::Credit => total_credit += entry.amount_minor,
        }
        running += signed_amount(entry.direction, entry.amount_minor);
        lines.push(StatementLine {
            entry,
            running_balance_minor: running,
        });
    }

    Ok(Statement {
        party_id,
        date_from,
        date_to,
        opening_balance_minor: opening,
        lines,
        total_debit_minor: total_debit,
        total_credit_minor: total_credit,
        closing_balance_minor: running,
    })
}

fn signed_amount(direction: Direction, amount_minor: i64) -> i64 {
    match direction {
        Direction::Debit => amount_minor,
        Direction::Credit => -amount_minor,
    }
}

pub(crate) fn generate_entry_number(prefix: &str) -> String {
    format!("{}-{}", prefix, Uuid::new_v4().simple())
}
