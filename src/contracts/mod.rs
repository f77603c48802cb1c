//! Contract types for the posting engine
//!
//! These are the typed event descriptors that document-producing modules
//! (sales, purchases, payments, receipts, adjustments) hand to the core.
//! They carry amounts and a reference to the source document's identity,
//! never the document object itself.

pub mod posting_event_v1;
pub mod reversal_request_v1;

pub use posting_event_v1::*;
pub use reversal_request_v1::*;
