pub mod config;
pub mod contracts;
pub mod db;
pub mod repos;
pub mod resolver;
pub mod services;
pub mod validation;

pub use services::party_ledger_service::{recalculate, statement};
pub use services::posting_service::post_journal;
pub use services::reversal_service::{delete_by_reference, reverse};
