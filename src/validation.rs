//! Validation logic for journal line sets
//!
//! Every journal entry must balance exactly in minor units before anything
//! is written. Amounts are integers, so there is no epsilon: an entry that
//! is off by one minor unit is rejected.

use thiserror::Error;

/// A journal line as seen by validation: one account, one side carrying
/// the amount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineAmounts {
    pub account_code: String,
    pub debit_minor: i64,
    pub credit_minor: i64,
    pub memo: Option<String>,
}

/// Validation errors for journal posting
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Description must be between 1 and 500 characters, got {0} characters")]
    InvalidDescriptionLength(usize),

    #[error("Lines must have at least 2 items, got {0}")]
    InsufficientLines(usize),

    #[error("Line {0}: account_code cannot be empty")]
    EmptyAccountCode(usize),

    #[error("Line {0}: debit must be non-negative, got {1}")]
    NegativeDebit(usize, i64),

    #[error("Line {0}: credit must be non-negative, got {1}")]
    NegativeCredit(usize, i64),

    #[error("Line {0}: exactly one of debit or credit must be positive (debit={1}, credit={2})")]
    AmbiguousLineSide(usize, i64, i64),

    #[error("Line {0}: memo exceeds 500 characters, got {1}")]
    MemoTooLong(usize, usize),

    #[error("Total debits ({0}) must equal total credits ({1}) exactly")]
    UnbalancedEntry(i64, i64),

    #[error("Amount must be positive, got {0}")]
    NonPositiveAmount(i64),

    #[error("Tax must be non-negative, got {0}")]
    NegativeTax(i64),

    #[error("Adjustment events must carry an explicit direction")]
    MissingAdjustmentDirection,
}

/// Validate a journal line set before posting
///
/// # Validation Rules
///
/// - `description`: 1-500 characters
/// - at least 2 lines
/// - each line: non-empty account code, non-negative amounts, exactly one
///   of debit xor credit positive, memo <= 500 chars if present
/// - total debits == total credits, exact integer comparison
pub fn validate_journal_lines(
    description: &str,
    lines: &[LineAmounts],
) -> Result<(), ValidationError> {
    let desc_len = description.chars().count();
    if desc_len == 0 || desc_len > 500 {
        return Err(ValidationError::InvalidDescriptionLength(desc_len));
    }

    if lines.len() < 2 {
        return Err(ValidationError::InsufficientLines(lines.len()));
    }

    let mut total_debits: i64 = 0;
    let mut total_credits: i64 = 0;

    for (idx, line) in lines.iter().enumerate() {
        validate_line(line, idx)?;
        total_debits += line.debit_minor;
        total_credits += line.credit_minor;
    }

    if total_debits != total_credits {
        return Err(ValidationError::UnbalancedEntry(total_debits, total_credits));
    }

    Ok(())
}

fn validate_line(line: &LineAmounts, index: usize) -> Result<(), ValidationError> {
    if line.account_code.is_empty() {
        return Err(ValidationError::EmptyAccountCode(index));
    }

    if line.debit_minor < 0 {
        return Err(ValidationError::NegativeDebit(index, line.debit_minor));
    }

    if line.credit_minor < 0 {
        return Err(ValidationError::NegativeCredit(index, line.credit_minor));
    }

    // Zero-zero lines and both-nonzero lines are both invalid.
    if (line.debit_minor > 0) == (line.credit_minor > 0) {
        return Err(ValidationError::AmbiguousLineSide(
            index,
            line.debit_minor,
            line.credit_minor,
        ));
    }

    if let Some(ref memo) = line.memo {
        let memo_len = memo.chars().count();
        if memo_len > 500 {
            return Err(ValidationError::MemoTooLong(index, memo_len));
        }
    }

    Ok(())
}
