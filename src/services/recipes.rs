//! Journal recipes: business event -> balanced line set
//!
//! Each business event kind has a fixed recipe of debit/credit account
//! selections. Recipes are pure functions of the event descriptor's
//! amounts; they produce role-tagged lines which the posting service maps
//! to concrete account codes through the chart.

use crate::contracts::posting_event_v1::{Direction, EventKind, PostingEventV1};
use crate::repos::party_repo::PartyKind;
use crate::validation::ValidationError;

/// Role an account plays in a recipe, independent of concrete codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccountRole {
    Cash,
    AccountsReceivable,
    Inventory,
    TaxReceivable,
    AccountsPayable,
    TaxPayable,
    Revenue,
    Adjustment,
}

/// Mapping from recipe roles to chart of accounts codes
#[derive(Debug, Clone)]
pub struct ChartRoles {
    pub cash: String,
    pub accounts_receivable: String,
    pub inventory: String,
    pub tax_receivable: String,
    pub accounts_payable: String,
    pub tax_payable: String,
    pub revenue: String,
    pub adjustment: String,
}

impl Default for ChartRoles {
    fn default() -> Self {
        ChartRoles {
            cash: "1000".to_string(),
            accounts_receivable: "1100".to_string(),
            inventory: "1200".to_string(),
            tax_receivable: "1400".to_string(),
            accounts_payable: "2100".to_string(),
            tax_payable: "2300".to_string(),
            revenue: "4000".to_string(),
            adjustment: "5900".to_string(),
        }
    }
}

impl ChartRoles {
    pub fn code_for(&self, role: AccountRole) -> &str {
        match role {
            AccountRole::Cash => &self.cash,
            AccountRole::AccountsReceivable => &self.accounts_receivable,
            AccountRole::Inventory => &self.inventory,
            AccountRole::TaxReceivable => &self.tax_receivable,
            AccountRole::AccountsPayable => &self.accounts_payable,
            AccountRole::TaxPayable => &self.tax_payable,
            AccountRole::Revenue => &self.revenue,
            AccountRole::Adjustment => &self.adjustment,
        }
    }
}

/// One role-tagged line produced by a recipe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeLine {
    pub role: AccountRole,
    pub debit_minor: i64,
    pub credit_minor: i64,
}

impl RecipeLine {
    fn debit(role: AccountRole, amount: i64) -> Self {
        RecipeLine {
            role,
            debit_minor: amount,
            credit_minor: 0,
        }
    }

    fn credit(role: AccountRole, amount: i64) -> Self {
        RecipeLine {
            role,
            debit_minor: 0,
            credit_minor: amount,
        }
    }
}

/// The party-side control account for a party kind
fn control_role(party_kind: PartyKind) -> AccountRole {
    match party_kind {
        PartyKind::Customer => AccountRole::AccountsReceivable,
        PartyKind::Supplier => AccountRole::AccountsPayable,
    }
}

/// Build the balanced line set for a business event
///
/// Tax-carrying recipes split the gross amount into a net line and a tax
/// line; when the tax portion is zero the tax line is omitted so no
/// zero-zero line ever reaches validation.
pub fn build_recipe(
    event: &PostingEventV1,
    party_kind: PartyKind,
) -> Result<Vec<RecipeLine>, ValidationError> {
    if event.net_minor <= 0 {
        return Err(ValidationError::NonPositiveAmount(event.net_minor));
    }
    if event.tax_minor < 0 {
        return Err(ValidationError::NegativeTax(event.tax_minor));
    }

    let net = event.net_minor;
    let tax = event.tax_minor;
    let gross = event.gross_minor();

    let lines = match event.kind {
        EventKind::SalesInvoice => {
            let mut lines = vec![
                RecipeLine::debit(AccountRole::AccountsReceivable, gross),
                RecipeLine::credit(AccountRole::Revenue, net),
            ];
            if tax > 0 {
                lines.push(RecipeLine::credit(AccountRole::TaxPayable, tax));
            }
            lines
        }
        EventKind::PurchaseInvoice => {
            let mut lines = vec![RecipeLine::debit(AccountRole::Inventory, net)];
            if tax > 0 {
                lines.push(RecipeLine::debit(AccountRole::TaxReceivable, tax));
            }
            lines.push(RecipeLine::credit(AccountRole::AccountsPayable, gross));
            lines
        }
        EventKind::SalesReturn => {
            let mut lines = vec![RecipeLine::debit(AccountRole::Revenue, net)];
            if tax > 0 {
                lines.push(RecipeLine::debit(AccountRole::TaxPayable, tax));
            }
            lines.push(RecipeLine::credit(AccountRole::AccountsReceivable, gross));
            lines
        }
        EventKind::PurchaseReturn => {
            let mut lines = vec![
                RecipeLine::debit(AccountRole::AccountsPayable, gross),
                RecipeLine::credit(AccountRole::Inventory, net),
            ];
            if tax > 0 {
                lines.push(RecipeLine::credit(AccountRole::TaxReceivable, tax));
            }
            lines
        }
        EventKind::Receipt => vec![
            RecipeLine::debit(AccountRole::Cash, gross),
            RecipeLine::credit(AccountRole::AccountsReceivable, gross),
        ],
        EventKind::Payment => vec![
            RecipeLine::debit(AccountRole::AccountsPayable, gross),
            RecipeLine::credit(AccountRole::Cash, gross),
        ],
        EventKind::Adjustment => {
            let control = control_role(party_kind);
            match event
                .adjustment_direction
                .ok_or(ValidationError::MissingAdjustmentDirection)?
            {
                Direction::Debit => vec![
                    RecipeLine::debit(control, gross),
                    RecipeLine::credit(AccountRole::Adjustment, gross),
                ],
                Direction::Credit => vec![
                    RecipeLine::debit(AccountRole::Adjustment, gross),
                    RecipeLine::credit(control, gross),
                ],
            }
        }
    };

    Ok(lines)
}
