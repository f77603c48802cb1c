pub mod orphan_auditor;
pub mod party_ledger_service;
pub mod posting_service;
pub mod recipes;
pub mod reversal_service;
pub mod risk_service;
