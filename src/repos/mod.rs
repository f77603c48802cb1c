pub mod account_repo;
pub mod audit_repo;
pub mod instrument_repo;
pub mod journal_repo;
pub mod party_ledger_repo;
pub mod party_repo;
