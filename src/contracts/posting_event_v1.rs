//! Posting Event V1 Contract Types
//!
//! A posting event describes one business event in terms the ledger core
//! understands: the event kind, the party, the amounts split into net and
//! tax, and a polymorphic reference to the originating document.
//! Amounts are i64 minor units with 3 fractional digits (230.000 = 230_000).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Business event kinds the posting engine knows recipes for
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    SalesInvoice,
    PurchaseInvoice,
    SalesReturn,
    PurchaseReturn,
    Payment,
    Receipt,
    Adjustment,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SalesInvoice => "sales_invoice",
            Self::PurchaseInvoice => "purchase_invoice",
            Self::SalesReturn => "sales_return",
            Self::PurchaseReturn => "purchase_return",
            Self::Payment => "payment",
            Self::Receipt => "receipt",
            Self::Adjustment => "adjustment",
        }
    }
}

/// Debit/credit direction of a party ledger entry
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "entry_direction", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Debit,
    Credit,
}

impl Direction {
    pub fn opposite(&self) -> Direction {
        match self {
            Self::Debit => Direction::Credit,
            Self::Credit => Direction::Debit,
        }
    }
}

/// Document kinds a ledger reference can point at
///
/// There is no foreign key to the many document tables; this tag plus the
/// document id is the only link, resolved procedurally (see `resolver`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DocKind {
    SalesInvoice,
    PurchaseInvoice,
    SalesReturn,
    PurchaseReturn,
    Payment,
    Receipt,
    OpeningBalance,
    BalanceAdjustment,
    Reversal,
}

impl DocKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SalesInvoice => "sales_invoice",
            Self::PurchaseInvoice => "purchase_invoice",
            Self::SalesReturn => "sales_return",
            Self::PurchaseReturn => "purchase_return",
            Self::Payment => "payment",
            Self::Receipt => "receipt",
            Self::OpeningBalance => "opening_balance",
            Self::BalanceAdjustment => "balance_adjustment",
            Self::Reversal => "reversal",
        }
    }

    pub fn from_str_tag(tag: &str) -> Option<DocKind> {
        match tag {
            "sales_invoice" => Some(Self::SalesInvoice),
            "purchase_invoice" => Some(Self::PurchaseInvoice),
            "sales_return" => Some(Self::SalesReturn),
            "purchase_return" => Some(Self::PurchaseReturn),
            "payment" => Some(Self::Payment),
            "receipt" => Some(Self::Receipt),
            "opening_balance" => Some(Self::OpeningBalance),
            "balance_adjustment" => Some(Self::BalanceAdjustment),
            "reversal" => Some(Self::Reversal),
            _ => None,
        }
    }

    /// Ledger-internal kinds have no backing document table; a reference to
    /// one is always considered resolvable.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::OpeningBalance | Self::BalanceAdjustment | Self::Reversal
        )
    }
}

impl std::fmt::Display for DocKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Polymorphic reference to a source document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct DocRef {
    pub kind: DocKind,
    pub id: String,
}

impl DocRef {
    pub fn new(kind: DocKind, id: impl Into<String>) -> Self {
        DocRef { kind, id: id.into() }
    }
}

impl std::fmt::Display for DocRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// Payload describing one business event to post
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostingEventV1 {
    /// Business event kind (selects the journal recipe)
    pub kind: EventKind,

    /// Party (customer or supplier) whose ledger the event affects
    pub party_id: Uuid,

    /// Accounting date of the event
    pub entry_date: NaiveDate,

    /// Amount excluding tax, minor units
    pub net_minor: i64,

    /// Tax portion, minor units (0 when the event carries no tax)
    pub tax_minor: i64,

    /// Identity of the originating document
    pub reference: DocRef,

    /// Human-readable description (1-500 chars)
    pub description: String,

    /// Ledger direction for adjustments; ignored for recipe-driven kinds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adjustment_direction: Option<Direction>,

    /// User or process that produced the event
    pub actor: String,
}

impl PostingEventV1 {
    /// Total amount the party ledger records for this event.
    pub fn gross_minor(&self) -> i64 {
        self.net_minor + self.tax_minor
    }

    /// Direction of the party ledger entry implied by the event kind.
    ///
    /// An invoice raises the receivable (debit on the customer ledger);
    /// cash in, returns, and payables move the other way. Adjustments carry
    /// their own direction.
    pub fn ledger_direction(&self) -> Option<Direction> {
        match self.kind {
            EventKind::SalesInvoice => Some(Direction::Debit),
            EventKind::SalesReturn => Some(Direction::Credit),
            EventKind::Receipt => Some(Direction::Credit),
            EventKind::PurchaseInvoice => Some(Direction::Credit),
            EventKind::PurchaseReturn => Some(Direction::Debit),
            EventKind::Payment => Some(Direction::Debit),
            EventKind::Adjustment => self.adjustment_direction,
        }
    }
}
