use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::posting_event_v1::DocRef;

/// Payload for a document reversal request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReversalRequestV1 {
    /// Reference of the posted document to reverse
    pub reference: DocRef,
    pub reason: String,
    pub actor: String,
}

/// Outcome of a completed reversal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReversalOutcome {
    pub original_entry_id: Uuid,
    pub reversal_entry_id: Uuid,
    /// Parties whose balances were recalculated as part of the reversal
    pub recalculated_parties: Vec<Uuid>,
}
