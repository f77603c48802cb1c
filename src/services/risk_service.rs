//! Expected credit loss estimation for deferred-payment instruments
//!
//! A check moves pending -> collected or pending -> bounced. The estimator
//! applies a loss-percentage ladder to the face amount, scaled by a risk
//! factor derived from the party's historical bounce rate. The computation
//! method is recorded next to the amount so any stored estimate can be
//! reproduced.

use chrono::{NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::repos::instrument_repo::{self, BounceHistory, Instrument, InstrumentStatus};

/// Basis points denominator: 10_000 bp = 100%
const BP: i64 = 10_000;

/// Errors that can occur during risk estimation
#[derive(Debug, thiserror::Error)]
pub enum RiskError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Instrument not found: {0}")]
    InstrumentNotFound(Uuid),
}

/// Result type for risk operations
pub type RiskResult<T> = Result<T, RiskError>;

/// A computed loss estimate with its audit-reproducible method string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LossEstimate {
    pub amount_minor: i64,
    pub method: String,
}

/// Risk factor in basis points from a party's bounce history.
///
/// No history is neutral (1.0x), distinct from the trusted zero-bounce
/// tier (0.8x) a party earns only by having checks on record.
pub fn risk_factor_bp(history: BounceHistory) -> i64 {
    if history.total == 0 {
        return 10_000;
    }
    if history.bounced == 0 {
        return 8_000;
    }
    // bounced/total <= 10%
    if history.bounced * 10 <= history.total {
        return 10_000;
    }
    // bounced/total <= 25%
    if history.bounced * 4 <= history.total {
        return 13_000;
    }
    15_000
}

/// Minimal view of an instrument for the pure estimator
#[derive(Debug, Clone, Copy)]
pub struct InstrumentView {
    pub face_amount_minor: i64,
    pub due_date: NaiveDate,
    pub status: InstrumentStatus,
    pub collected_on: Option<NaiveDate>,
}

impl From<&Instrument> for InstrumentView {
    fn from(i: &Instrument) -> Self {
        InstrumentView {
            face_amount_minor: i.face_amount_minor,
            due_date: i.due_date,
            status: i.status,
            collected_on: i.collected_on,
        }
    }
}

/// Estimate the expected loss for one instrument as of a date.
///
/// Ladder:
/// - bounced: 100% of face, risk factor not applied
/// - collected late: <=30d 5%, <=90d 15%, <=180d 30%, >180d 50%, x factor
/// - collected on/before due date: 0
/// - pending past due: <=30d 5%, <=90d 15%, >90d capped at 20%, x factor
/// - pending not yet due: 1% x factor
pub fn estimate_expected_loss(
    view: InstrumentView,
    history: BounceHistory,
    as_of: NaiveDate,
) -> LossEstimate {
    let factor_bp = risk_factor_bp(history);
    let face = view.face_amount_minor;

    match view.status {
        InstrumentStatus::Bounced => LossEstimate {
            amount_minor: face,
            method: "bounced: 100% of face, risk factor not applied".to_string(),
        },
        InstrumentStatus::Collected => {
            let collected_on = view.collected_on.unwrap_or(as_of);
            let days_late = (collected_on - view.due_date).num_days();
            if days_late <= 0 {
                return LossEstimate {
                    amount_minor: 0,
                    method: "collected on/before due date: 0%".to_string(),
                };
            }
            let (base_bp, tier) = match days_late {
                1..=30 => (500, "<=30d"),
                31..=90 => (1_500, "<=90d"),
                91..=180 => (3_000, "<=180d"),
                _ => (5_000, ">180d"),
            };
            LossEstimate {
                amount_minor: scaled_loss(face, base_bp, factor_bp),
                method: format!(
                    "collected {}d late ({} tier): {}% x risk factor {}",
                    days_late,
                    tier,
                    base_bp / 100,
                    format_factor(factor_bp)
                ),
            }
        }
        InstrumentStatus::Pending => {
            let days_overdue = (as_of - view.due_date).num_days();
            if days_overdue <= 0 {
                return LossEstimate {
                    amount_minor: scaled_loss(face, 100, factor_bp),
                    method: format!(
                        "pending, not yet due: 1% x risk factor {}",
                        format_factor(factor_bp)
                    ),
                };
            }
            let (base_bp, tier) = match days_overdue {
                1..=30 => (500, "<=30d"),
                31..=90 => (1_500, "<=90d"),
                _ => (2_000, ">90d, capped"),
            };
            LossEstimate {
                amount_minor: scaled_loss(face, base_bp, factor_bp),
                method: format!(
                    "pending {}d overdue ({} tier): {}% x risk factor {}",
                    days_overdue,
                    tier,
                    base_bp / 100,
                    format_factor(factor_bp)
                ),
            }
        }
    }
}

/// face * base_bp * factor_bp, truncating division at each scale step
fn scaled_loss(face_minor: i64, base_bp: i64, factor_bp: i64) -> i64 {
    let base = (face_minor as i128) * (base_bp as i128) / (BP as i128);
    (base * (factor_bp as i128) / (BP as i128)) as i64
}

fn format_factor(factor_bp: i64) -> String {
    format!("{:.2}", factor_bp as f64 / BP as f64)
}

/// Recompute and overwrite the stored estimate for one instrument
pub async fn refresh_expected_loss(
    pool: &PgPool,
    instrument_id: Uuid,
    as_of: NaiveDate,
) -> RiskResult<LossEstimate> {
    let instrument = instrument_repo::find_by_id(pool, instrument_id)
        .await?
        .ok_or(RiskError::InstrumentNotFound(instrument_id))?;

    let history = instrument_repo::bounce_history(pool, instrument.party_id).await?;
    let estimate = estimate_expected_loss((&instrument).into(), history, as_of);

    instrument_repo::store_loss_estimate(
        pool,
        instrument_id,
        estimate.amount_minor,
        &estimate.method,
        Utc::now(),
    )
    .await?;

    tracing::info!(
        instrument_id = %instrument_id,
        party_id = %instrument.party_id,
        expected_loss_minor = estimate.amount_minor,
        method = %estimate.method,
        "Expected loss refreshed"
    );

    Ok(estimate)
}

/// Outcome of a scheduled sweep over open instruments
#[derive(Debug, Clone, Copy, Default)]
pub struct RefreshReport {
    pub refreshed: u64,
    pub failed: u64,
}

/// Refresh every open (non-collected) instrument, one at a time.
///
/// Each instrument is its own unit of work; a failure is logged and
/// skipped so one bad record cannot abort the sweep.
pub async fn refresh_open_instruments(pool: &PgPool, as_of: NaiveDate) -> RiskResult<RefreshReport> {
    let open = instrument_repo::list_open(pool).await?;
    let mut report = RefreshReport::default();

    for instrument in open {
        match refresh_expected_loss(pool, instrument.id, as_of).await {
            Ok(_) => report.refreshed += 1,
            Err(e) => {
                report.failed += 1;
                tracing::warn!(
                    instrument_id = %instrument.id,
                    error = %e,
                    "Skipping instrument after refresh failure"
                );
            }
        }
    }

    tracing::info!(
        refreshed = report.refreshed,
        failed = report.failed,
        "Open instrument sweep complete"
    );

    Ok(report)
}
